//! # cachesim — discrete-event simulator of a distributed caching fabric
//!
//! `cachesim` models clients issuing reads through a load balancer to a tier
//! of cache nodes fronting a single authoritative database. Some cache nodes
//! are Byzantine, a chaos monkey randomly disables nodes, and an observer
//! records cache-hit telemetry. A driving harness streams progress and
//! per-event logs to an external consumer while the simulation advances in
//! bounded virtual-time chunks.
//!
//! ## Core model
//!
//! - [`event`] / [`engine`] — the virtual-time scheduler: a stable priority
//!   queue (`(time, seq)` ordering, FIFO tie-break) and the `World` that
//!   drains it in chunked `advance` calls.
//! - [`message`] / [`network`] — addressable agents, an immutable message
//!   envelope, and a lossy/variable-latency network that schedules
//!   deliveries as future events.
//! - [`cache`] / [`database`] / [`service_node`] / [`byzantine`] /
//!   [`load_balancer`] / [`client`] / [`chaos`] — the cache-coherence
//!   protocol: write-invalidate with per-entry TTL, LRU eviction,
//!   consistent-hash routing across live/dead nodes, single-flight
//!   coalescing of concurrent misses, Byzantine deviations, and
//!   chaos-induced node failures.
//! - [`observer`] — push-only telemetry: hit/miss counters, per-node
//!   breakdown, and a bounded recent-event ring.
//! - [`rng`] — the single seeded source of randomness every stochastic
//!   choice in the simulation draws from, for reproducibility.
//!
//! ## Ambient stack
//!
//! - [`config`] — validated run configuration, shared between the CLI and
//!   the HTTP control plane.
//! - [`driver`] — the chunked harness that owns a `World` for one run and
//!   publishes telemetry to a broadcast channel.
//! - [`server`] — the thin axum control plane (`/simulate/start`,
//!   `/simulate/stop`, `/ws/simulation`) that is the core's one real-world
//!   collaborator; configuration parsing beyond `SimConfig`, the
//!   natural-language analyst, and persistent storage are explicit
//!   non-goals and are not part of this crate.
//! - [`error`] — the crate-wide error taxonomy.

pub mod byzantine;
pub mod cache;
pub mod chaos;
pub mod client;
pub mod config;
pub mod database;
pub mod driver;
pub mod engine;
pub mod error;
pub mod event;
pub mod load_balancer;
pub mod message;
pub mod network;
pub mod observer;
pub mod rng;
pub mod server;
pub mod service_node;
pub mod time;

pub use config::SimConfig;
pub use driver::{LogEntry, MetricsSnapshot, StopSignal, TelemetryRecord};
pub use engine::{AgentKind, World};
pub use error::{SimError, SimResult};
pub use message::{AgentId, Message, Payload};
pub use time::VirtualTime;
