//! Driver / Harness.
//!
//! Builds every agent, registers cache nodes as database subscribers, then
//! iterates `engine.advance` in fixed-size chunks, emitting a state-update
//! record and up to 10 new log records per chunk, and a final record when
//! the run ends. Per-chunk progress/queue-size diagnostics are kept as
//! `tracing::debug!` fields rather than wire payload.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::broadcast;
use tracing::debug;

use crate::byzantine::ByzantineNode;
use crate::chaos::{AttackInterval, ChaosMonkey};
use crate::client::{Client, Interarrival};
use crate::config::SimConfig;
use crate::database::Database;
use crate::engine::{AgentKind, World};
use crate::error::SimResult;
use crate::load_balancer::LoadBalancer;
use crate::network::{LatencyModel, Network};
use crate::observer::{LogRecord, NodeStats};
use crate::service_node::ServiceNode;
use crate::time::VirtualTime;

/// The three wire record shapes the telemetry sink carries.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type")]
pub enum TelemetryRecord {
    #[serde(rename = "SIM_UPDATE")]
    Update {
        time: f64,
        progress: f64,
        metrics: MetricsSnapshot,
        agent_states: BTreeMap<String, bool>,
    },
    #[serde(rename = "LOG")]
    Log { time: f64, log_type: String, msg: String },
    #[serde(rename = "SIM_FINISHED")]
    Finished { final_metrics: MetricsSnapshot, final_time: f64 },
}

/// One entry of the `recent_logs` ring as carried inside `MetricsSnapshot`,
/// matching the original's `{"time", "type", "details": {"node", "key"}}`
/// log-entry shape (`backend/src/core/agents/observer.py:29-33`), flattened
/// since this crate's `LogRecord` already keeps `node`/`key` as separate
/// fields rather than a nested `details` map.
#[derive(Debug, Clone, Serialize)]
pub struct LogEntry {
    pub time: f64,
    #[serde(rename = "type")]
    pub event_type: String,
    pub node: Option<String>,
    pub key: Option<String>,
}

impl From<&LogRecord> for LogEntry {
    fn from(record: &LogRecord) -> Self {
        Self {
            time: record.time.as_f64(),
            event_type: record.event_type.to_string(),
            node: record.node.map(|id| id.to_string()),
            key: record.key.clone(),
        }
    }
}

/// A point-in-time copy of the observer's counters, suitable for
/// serialization onto the telemetry channel. `agent_stats` and `recent_logs`
/// mirror the full shape spec.md §6 documents for the `metrics` object
/// (`{hits, misses, total_reads, agent_stats, recent_logs}`) — the diffed
/// `LOG` records emitted alongside a `SIM_UPDATE` are a separate stream, not
/// a substitute for the full ring carried here.
#[derive(Debug, Clone, Serialize)]
pub struct MetricsSnapshot {
    pub total_reads: u64,
    pub hits: u64,
    pub misses: u64,
    pub agent_stats: BTreeMap<String, NodeStats>,
    pub recent_logs: Vec<LogEntry>,
}

impl MetricsSnapshot {
    fn hit_ratio(&self) -> f64 {
        if self.total_reads == 0 {
            0.0
        } else {
            self.hits as f64 / self.total_reads as f64
        }
    }
}

/// External cooperative stop signal, set by `POST /simulate/stop`.
#[derive(Clone, Default)]
pub struct StopSignal(Arc<AtomicBool>);

impl StopSignal {
    #[must_use]
    pub fn new() -> Self {
        Self(Arc::new(AtomicBool::new(false)))
    }

    pub fn stop(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    #[must_use]
    pub fn is_stopped(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

fn build_world(config: &SimConfig) -> World {
    let latency = LatencyModel::Uniform {
        lo: config.latency_lo,
        hi: config.latency_hi,
    };
    let network = Network::new(latency, config.drop_prob);
    let mut world = World::new(network, config.seed);

    let db_id = world.push_agent(AgentKind::Database(Database::new(world.next_id())));

    let mut node_ids = Vec::with_capacity(config.nodes as usize);
    for i in 0..config.nodes {
        let id = world.next_id();
        let plain = ServiceNode::new(id, db_id, config.cache_size as usize, config.ttl);
        let kind = if i < config.byzantine_nodes {
            AgentKind::Byzantine(ByzantineNode::new(plain, config.byzantine_corrupt_prob))
        } else {
            AgentKind::ServiceNode(plain)
        };
        let assigned = world.push_agent(kind);
        node_ids.push(assigned);
    }

    if let Some(AgentKind::Database(db)) = world.agent_mut(db_id) {
        for node_id in &node_ids {
            db.subscribe(*node_id);
        }
        for i in 1..=config.key_space {
            db.seed(format!("key_{i}"), format!("value_{i}"));
        }
    }

    let lb_id = world.push_agent(AgentKind::LoadBalancer(LoadBalancer::new(node_ids.clone())));

    let client_id = world.push_agent(AgentKind::Client(Client::new(
        world.next_id(),
        lb_id,
        Some(VirtualTime::new(config.duration)),
        u64::from(config.key_space),
        Interarrival::default(),
    )));
    world.bootstrap_client(client_id);

    if config.chaos_enabled {
        let chaos = ChaosMonkey::new(world.next_id(), node_ids, config.chaos_kill_prob, AttackInterval::default());
        world.install_chaos(chaos);
    }

    world
}

/// Run a whole simulation to completion (or until `stop` is set),
/// publishing telemetry records to `sink` as it goes. Returns the final
/// metrics snapshot.
pub async fn run(config: SimConfig, stop: StopSignal, sink: broadcast::Sender<TelemetryRecord>) -> SimResult<MetricsSnapshot> {
    config.validate()?;
    let mut world = build_world(&config);

    let duration = VirtualTime::new(config.duration);
    let mut last_report_count = 0u64;
    let mut iteration: u64 = 0;

    while world.now() < duration {
        if stop.is_stopped() {
            debug!(time = %world.now(), "simulation stopped externally");
            break;
        }
        iteration += 1;

        let next_chunk = VirtualTime::new((world.now().as_f64() + config.chunk_size).min(config.duration));
        world.advance(next_chunk)?;

        let snapshot = snapshot_metrics(&world);
        let progress = (world.now().as_f64() / config.duration * 100.0).min(100.0);
        debug!(
            iteration,
            time = %world.now(),
            hits = snapshot.hits,
            misses = snapshot.misses,
            ratio = snapshot.hit_ratio(),
            "chunk advanced"
        );

        let agent_states = world
            .node_liveness()
            .into_iter()
            .map(|(id, active)| (id.to_string(), active))
            .collect();

        publish(&sink, TelemetryRecord::Update {
            time: world.now().as_f64(),
            progress,
            metrics: snapshot,
            agent_states,
        });

        // `recent_logs` is a ring capped at 21, so its length alone can't say
        // how many records are new once the cap is reached.
        // `total_reports` is the uncapped lifetime count; clamping the
        // difference to the ring's current length handles a chunk that
        // produced more events than the ring can hold (we lose the oldest of
        // those, which is the same loss the ring itself already accepts).
        let total_reports = world.observer().total_reports();
        let logs = world.observer().recent_logs();
        let new_count = total_reports.saturating_sub(last_report_count).min(logs.len() as u64) as usize;
        for record in logs.iter().take(new_count.min(10)).rev() {
            let msg = format!(
                "{} on {}",
                record.key.as_deref().unwrap_or("N/A"),
                record.node.map_or_else(|| "N/A".to_string(), |n| n.to_string())
            );
            publish(&sink, TelemetryRecord::Log {
                time: record.time.as_f64(),
                log_type: record.event_type.to_string(),
                msg,
            });
        }
        last_report_count = total_reports;

        // Yield between chunks so the host scheduler can service the control
        // plane and other tasks; advancing never suspends mid-chunk.
        tokio::task::yield_now().await;
    }

    let final_metrics = snapshot_metrics(&world);
    publish(&sink, TelemetryRecord::Finished {
        final_metrics: final_metrics.clone(),
        final_time: world.now().as_f64(),
    });
    Ok(final_metrics)
}

/// Publish one record to the telemetry channel. A send failure just means
/// no one is currently subscribed (`/ws/simulation` has no open sockets, or
/// a CLI-driven run never attached a receiver) — routine, not fatal, but
/// still logged rather than silently swallowed; the run always continues
/// either way.
fn publish(sink: &broadcast::Sender<TelemetryRecord>, record: TelemetryRecord) {
    if sink.send(record).is_err() {
        debug!("telemetry sink has no subscribers; dropping record");
    }
}

fn snapshot_metrics(world: &World) -> MetricsSnapshot {
    let observer = world.observer();
    MetricsSnapshot {
        total_reads: observer.total_reads(),
        hits: observer.hits(),
        misses: observer.misses(),
        agent_stats: observer
            .agent_stats()
            .iter()
            .map(|(id, stats)| (id.to_string(), *stats))
            .collect(),
        recent_logs: observer.recent_logs().iter().map(LogEntry::from).collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test_log::test(tokio::test)]
    async fn a_short_run_reaches_completion_and_emits_a_finished_record() {
        let config = SimConfig {
            nodes: 2,
            duration: 40.0,
            chaos_enabled: false,
            ..SimConfig::default()
        };
        let (tx, mut rx) = broadcast::channel(256);
        let stop = StopSignal::new();
        let metrics = run(config, stop, tx).await.unwrap();
        assert!(metrics.total_reads >= 1);

        let mut saw_finished = false;
        while let Ok(record) = rx.try_recv() {
            if matches!(record, TelemetryRecord::Finished { .. }) {
                saw_finished = true;
            }
        }
        assert!(saw_finished, "a SIM_FINISHED record should have been published");
    }

    #[tokio::test]
    async fn byzantine_corrupt_prob_is_wired_from_config_into_the_node() {
        // A single node, fully Byzantine, always-corrupt: every read is
        // answered from the corruption branch, which bypasses the observer
        // entirely, so no hits/misses should ever be recorded despite the
        // client issuing many reads over the run.
        let config = SimConfig {
            nodes: 1,
            byzantine_nodes: 1,
            byzantine_corrupt_prob: 1.0,
            duration: 500.0,
            chaos_enabled: false,
            ..SimConfig::default()
        };
        let (tx, _rx) = broadcast::channel(1024);
        let metrics = run(config, StopSignal::new(), tx).await.unwrap();
        assert_eq!(metrics.total_reads, 0, "an always-corrupt node should never report a hit or miss");
    }

    #[tokio::test]
    async fn metrics_snapshot_carries_the_full_recent_logs_ring() {
        let config = SimConfig {
            nodes: 2,
            duration: 100.0,
            chaos_enabled: false,
            ..SimConfig::default()
        };
        let (tx, _rx) = broadcast::channel(1024);
        let metrics = run(config, StopSignal::new(), tx).await.unwrap();
        assert!(metrics.total_reads > 0);
        assert!(
            !metrics.recent_logs.is_empty(),
            "SIM_FINISHED's metrics.recent_logs should mirror the observer's ring, matching spec.md §6"
        );
        assert!(metrics.recent_logs.len() <= 21);
    }

    #[tokio::test]
    async fn invalid_config_is_refused_before_any_world_is_built() {
        let config = SimConfig { nodes: 0, ..SimConfig::default() };
        let (tx, _rx) = broadcast::channel(16);
        let result = run(config, StopSignal::new(), tx).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn log_emission_keeps_flowing_past_the_recent_logs_cap() {
        // Enough nodes, key space, and duration to blow well past the 21-slot
        // `recent_logs` ring: this regresses the bug where the chunk loop's
        // diffing went quiet forever once `recent_logs().len()` saturated.
        let config = SimConfig {
            nodes: 3,
            duration: 2_000.0,
            key_space: 5,
            chaos_enabled: false,
            ..SimConfig::default()
        };
        let (tx, mut rx) = broadcast::channel(4096);
        let metrics = run(config, StopSignal::new(), tx).await.unwrap();
        assert!(metrics.total_reads > 21);

        let mut log_records = 0u64;
        while let Ok(record) = rx.try_recv() {
            if matches!(record, TelemetryRecord::Log { .. }) {
                log_records += 1;
            }
        }
        assert!(log_records > 21, "expected more than {log_records} log records across a run with {} reads", metrics.total_reads);
    }

    #[tokio::test]
    async fn external_stop_signal_halts_before_duration_elapses() {
        let config = SimConfig {
            nodes: 2,
            duration: 10_000.0,
            chunk_size: 5.0,
            chaos_enabled: false,
            ..SimConfig::default()
        };
        let stop = StopSignal::new();
        stop.stop();
        let (tx, _rx) = broadcast::channel(16);
        let metrics = run(config, stop, tx).await.unwrap();
        // Stopped on the very first chunk check; no progress should have
        // accrued beyond whatever the first advance touched.
        assert!(metrics.total_reads < 1000);
    }

    #[tokio::test]
    async fn zero_duration_run_emits_only_the_terminal_record() {
        let config = SimConfig {
            nodes: 2,
            duration: 0.0,
            chaos_enabled: false,
            ..SimConfig::default()
        };
        let (tx, mut rx) = broadcast::channel(16);
        let metrics = run(config, StopSignal::new(), tx).await.unwrap();
        assert_eq!(metrics.total_reads, 0, "a horizon-zero run never advances past t=0");

        let mut records = Vec::new();
        while let Ok(record) = rx.try_recv() {
            records.push(record);
        }
        assert_eq!(records.len(), 1, "only SIM_FINISHED should be published for duration: 0");
        assert!(matches!(records[0], TelemetryRecord::Finished { .. }));
    }
}
