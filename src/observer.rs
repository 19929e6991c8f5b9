//! Observer: a push-only sink that bumps per-event-type counters, keeps a
//! bounded ring of recent log records, and tracks per-node hit/miss stats.
//! Invoked via direct `report` calls rather than message dispatch — it
//! never replies to anything, and is not a member of the agent arena's
//! closed `AgentKind`, just a field the engine holds alongside it.

use std::collections::HashMap;

use serde::Serialize;

use crate::message::AgentId;
use crate::time::VirtualTime;

/// The closed set of telemetry events service nodes and the engine report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportEvent {
    CacheHit,
    CacheMiss,
}

impl ReportEvent {
    fn as_str(self) -> &'static str {
        match self {
            ReportEvent::CacheHit => "CACHE_HIT",
            ReportEvent::CacheMiss => "CACHE_MISS",
        }
    }
}

/// One entry in the bounded recent-activity ring.
#[derive(Debug, Clone)]
pub struct LogRecord {
    pub time: VirtualTime,
    pub event_type: &'static str,
    pub node: Option<AgentId>,
    pub key: Option<String>,
}

/// Per-node hit/miss tally.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct NodeStats {
    pub hits: u64,
    pub misses: u64,
}

/// Maximum number of records kept in `recent_logs`.
const RECENT_LOGS_CAP: usize = 21;

/// Collects counters and a rolling log of simulation events. Mutation only
/// ever happens from inside the engine's single-threaded dispatch loop, so
/// no synchronization is needed here.
#[derive(Default)]
pub struct Observer {
    event_counts: HashMap<&'static str, u64>,
    recent_logs: Vec<LogRecord>,
    agent_stats: HashMap<AgentId, NodeStats>,
    hits: u64,
    misses: u64,
    total_reads: u64,
    /// Lifetime count of `report` calls, never truncated (unlike
    /// `recent_logs`). The driver needs this to tell how many new records
    /// landed since its last telemetry emission — `recent_logs.len()` alone
    /// saturates at `RECENT_LOGS_CAP` and can't answer that past the cap.
    total_reports: u64,
}

impl Observer {
    /// A fresh observer with all counters at zero.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one occurrence of `event`, optionally tagged with the node
    /// and key it concerns. Bumps the generic counter, prepends a log
    /// record (truncating the ring), and for `CACHE_HIT`/`CACHE_MISS`
    /// updates both the global and per-node tallies.
    pub fn report(&mut self, event: ReportEvent, now: VirtualTime, node: Option<AgentId>, key: Option<String>) {
        *self.event_counts.entry(event.as_str()).or_insert(0) += 1;
        self.total_reports += 1;

        self.recent_logs.insert(
            0,
            LogRecord {
                time: now,
                event_type: event.as_str(),
                node,
                key,
            },
        );
        self.recent_logs.truncate(RECENT_LOGS_CAP);

        if let Some(node_id) = node {
            let stats = self.agent_stats.entry(node_id).or_default();
            match event {
                ReportEvent::CacheHit => stats.hits += 1,
                ReportEvent::CacheMiss => stats.misses += 1,
            }
        }

        match event {
            ReportEvent::CacheHit => {
                self.hits += 1;
                self.total_reads += 1;
            }
            ReportEvent::CacheMiss => {
                self.misses += 1;
                self.total_reads += 1;
            }
        }
    }

    #[must_use]
    pub fn hits(&self) -> u64 {
        self.hits
    }

    #[must_use]
    pub fn misses(&self) -> u64 {
        self.misses
    }

    #[must_use]
    pub fn total_reads(&self) -> u64 {
        self.total_reads
    }

    #[must_use]
    pub fn count_of(&self, event: ReportEvent) -> u64 {
        *self.event_counts.get(event.as_str()).unwrap_or(&0)
    }

    #[must_use]
    pub fn recent_logs(&self) -> &[LogRecord] {
        &self.recent_logs
    }

    /// Lifetime count of `report` calls. Monotonic, unlike `recent_logs().len()`
    /// which saturates at `RECENT_LOGS_CAP`.
    #[must_use]
    pub fn total_reports(&self) -> u64 {
        self.total_reports
    }

    #[must_use]
    pub fn agent_stats(&self) -> &HashMap<AgentId, NodeStats> {
        &self.agent_stats
    }
}
