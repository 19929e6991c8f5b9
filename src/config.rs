//! Simulation configuration: the driver-configurable run parameters
//! (`nodes`, `cache_size`, `duration`, `chaos_enabled`, `key_space`, and
//! friends), each validated through a bounds-checked `nutype` newtype.
//! Exposed both as a `clap` CLI struct for `src/main.rs` and as the type the
//! axum control plane deserializes `POST /simulate/start` bodies into.

use clap::Parser;
use nutype::nutype;
use serde::{Deserialize, Serialize};

use crate::error::{SimError, SimResult};

/// Number of cache nodes in the cluster. Zero nodes would leave the load
/// balancer with nothing to route to.
#[nutype(
    validate(greater = 0),
    derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, Display, TryFrom, Into)
)]
pub struct NodeCount(u32);

/// Per-node LRU cache capacity.
#[nutype(
    validate(greater = 0),
    derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, Display, TryFrom, Into)
)]
pub struct CacheSize(u32);

/// Total run length in virtual-time units. Zero is a legal horizon — a
/// run that produces only the terminal `SIM_FINISHED` record.
#[nutype(
    validate(greater_or_equal = 0.0),
    derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Display, TryFrom, Into)
)]
pub struct Duration(f64);

/// Number of distinct keys (`key_1..key_K`) the database is seeded with and
/// clients draw from.
#[nutype(
    validate(greater = 0),
    derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, Display, TryFrom, Into)
)]
pub struct KeySpace(u32);

/// How many of the first `N` nodes are Byzantine variants.
#[nutype(
    validate(greater_or_equal = 0),
    derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, Display, TryFrom, Into)
)]
pub struct ByzantineCount(u32);

/// Chunk size `Δ` between telemetry emissions.
#[nutype(
    validate(greater = 0.0),
    derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Display, TryFrom, Into)
)]
pub struct ChunkSize(f64);

/// Full configuration for one simulation run.
///
/// `#[serde(default)]` lets `POST /simulate/start` accept a partial JSON
/// body — any field the caller omits falls back to `SimConfig::default()`
/// rather than failing deserialization outright; `validate()` is still the
/// single place that rejects a bad value.
#[derive(Debug, Clone, Serialize, Deserialize, Parser)]
#[command(name = "cachesim", about = "Discrete-event simulator of a distributed caching fabric")]
#[serde(default)]
pub struct SimConfig {
    /// Number of cache nodes.
    #[arg(long, default_value = "3")]
    pub nodes: u32,

    /// Per-node cache capacity.
    #[arg(long, default_value = "100")]
    pub cache_size: u32,

    /// Total run length in virtual-time units.
    #[arg(long, default_value = "1000")]
    pub duration: f64,

    /// Whether the chaos monkey is installed at all.
    #[arg(long, default_value = "true")]
    pub chaos_enabled: bool,

    /// Size of the key space (`key_1..key_K`).
    #[arg(long, default_value = "10")]
    pub key_space: u32,

    /// How many of the first `N` nodes are Byzantine variants.
    #[arg(long, default_value = "0")]
    pub byzantine_nodes: u32,

    /// Per-read probability a Byzantine node fabricates a response instead
    /// of behaving like a plain service node.
    #[arg(long, default_value = "0.2")]
    pub byzantine_corrupt_prob: f64,

    /// Per-node cache entry TTL.
    #[arg(long, default_value = "500")]
    pub ttl: f64,

    /// Network drop probability, in `[0, 1]`.
    #[arg(long, default_value = "0.0")]
    pub drop_prob: f64,

    /// Minimum network latency.
    #[arg(long, default_value = "1.0")]
    pub latency_lo: f64,

    /// Maximum network latency.
    #[arg(long, default_value = "5.0")]
    pub latency_hi: f64,

    /// Chaos monkey's kill probability per tick.
    #[arg(long, default_value = "0.1")]
    pub chaos_kill_prob: f64,

    /// RNG seed; fixing this makes a run reproducible.
    #[arg(long, default_value = "42")]
    pub seed: u64,

    /// Telemetry chunk size `Δ`.
    #[arg(long, default_value = "20")]
    pub chunk_size: f64,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            nodes: 3,
            cache_size: 100,
            duration: 1000.0,
            chaos_enabled: true,
            key_space: 10,
            byzantine_nodes: 0,
            byzantine_corrupt_prob: 0.2,
            ttl: 500.0,
            drop_prob: 0.0,
            latency_lo: 1.0,
            latency_hi: 5.0,
            chaos_kill_prob: 0.1,
            seed: 42,
            chunk_size: 20.0,
        }
    }
}

impl SimConfig {
    /// Validate every field through its `nutype` wrapper and check the
    /// cross-field invariant `latency_lo <= latency_hi`. Run before a
    /// simulation starts; a config that fails here never reaches
    /// `World::new` — the run is refused outright.
    pub fn validate(&self) -> SimResult<()> {
        NodeCount::try_new(self.nodes).map_err(|e| SimError::Config(e.to_string()))?;
        CacheSize::try_new(self.cache_size).map_err(|e| SimError::Config(e.to_string()))?;
        Duration::try_new(self.duration).map_err(|e| SimError::Config(e.to_string()))?;
        KeySpace::try_new(self.key_space).map_err(|e| SimError::Config(e.to_string()))?;
        ChunkSize::try_new(self.chunk_size).map_err(|e| SimError::Config(e.to_string()))?;
        ByzantineCount::try_new(self.byzantine_nodes).map_err(|e| SimError::Config(e.to_string()))?;

        if self.byzantine_nodes > self.nodes {
            return Err(SimError::Config(format!(
                "byzantine_nodes ({}) must not exceed nodes ({})",
                self.byzantine_nodes, self.nodes
            )));
        }
        if !(0.0..=1.0).contains(&self.drop_prob) {
            return Err(SimError::Config(format!("drop_prob {} out of range [0, 1]", self.drop_prob)));
        }
        if !(0.0..=1.0).contains(&self.chaos_kill_prob) {
            return Err(SimError::Config(format!(
                "chaos_kill_prob {} out of range [0, 1]",
                self.chaos_kill_prob
            )));
        }
        if !(0.0..=1.0).contains(&self.byzantine_corrupt_prob) {
            return Err(SimError::Config(format!(
                "byzantine_corrupt_prob {} out of range [0, 1]",
                self.byzantine_corrupt_prob
            )));
        }
        if self.latency_lo > self.latency_hi {
            return Err(SimError::Config(format!(
                "latency_lo ({}) must not exceed latency_hi ({})",
                self.latency_lo, self.latency_hi
            )));
        }
        if self.latency_lo < 0.0 {
            return Err(SimError::Config("latency_lo must be non-negative".to_string()));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_validates() {
        assert!(SimConfig::default().validate().is_ok());
    }

    #[test]
    fn zero_nodes_is_rejected() {
        let cfg = SimConfig { nodes: 0, ..SimConfig::default() };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn zero_duration_is_accepted() {
        let cfg = SimConfig { duration: 0.0, ..SimConfig::default() };
        assert!(cfg.validate().is_ok(), "duration: 0 is a legal horizon-zero run per spec.md §6");
    }

    #[test]
    fn negative_duration_is_rejected() {
        let cfg = SimConfig { duration: -1.0, ..SimConfig::default() };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn latency_lo_above_hi_is_rejected() {
        let cfg = SimConfig {
            latency_lo: 10.0,
            latency_hi: 5.0,
            ..SimConfig::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn byzantine_nodes_exceeding_node_count_is_rejected() {
        let cfg = SimConfig {
            nodes: 3,
            byzantine_nodes: 4,
            ..SimConfig::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn byzantine_nodes_equal_to_node_count_is_accepted() {
        let cfg = SimConfig {
            nodes: 3,
            byzantine_nodes: 3,
            ..SimConfig::default()
        };
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn byzantine_corrupt_prob_out_of_range_is_rejected() {
        let cfg = SimConfig {
            byzantine_corrupt_prob: 1.5,
            ..SimConfig::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn partial_json_body_fills_omitted_fields_from_defaults() {
        let partial: SimConfig = serde_json::from_str(r#"{"nodes": 5}"#).unwrap();
        assert_eq!(partial.nodes, 5);
        assert_eq!(partial.cache_size, SimConfig::default().cache_size);
        assert_eq!(partial.duration, SimConfig::default().duration);
    }
}
