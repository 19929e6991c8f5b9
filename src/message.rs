//! Message & addressing.
//!
//! Agents are addressed by an arena index into `World::agents` rather than
//! by a shared reference — the object graph never needs to outlive the
//! `World` that owns it, and arena indices are trivially `Send`. A message
//! carries direct handles; there is no name resolution.

use serde::{Deserialize, Serialize};

/// Opaque identity of an agent: an index into the simulation's agent arena.
///
/// Carries no handler capability itself — dispatch always goes through
/// `World::dispatch`, matching the closed `AgentKind` sum type rather than
/// a `dyn Agent` trait object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AgentId(pub usize);

impl AgentId {
    /// Sentinel source for messages not emitted by any agent in the arena,
    /// such as an external write arriving straight at the database. Never
    /// used as a dispatch destination.
    pub const EXTERNAL: AgentId = AgentId(usize::MAX);
}

impl std::fmt::Display for AgentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if *self == AgentId::EXTERNAL {
            write!(f, "external")
        } else {
            write!(f, "agent_{}", self.0)
        }
    }
}

/// The tagged union of payloads agents exchange.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Payload {
    /// Client/router → node: request to read `key`.
    Read { key: String },
    /// Node → client, or database → node: the value and version for `key`.
    ReadResponse {
        key: String,
        value: String,
        version: i64,
    },
    /// Node → database: a cache miss that needs an authoritative read.
    ReadDb { key: String },
    /// External → database: a write that bumps `key`'s version.
    Write { key: String, value: String },
    /// Database → node: `key` changed to `version`; drop any cached copy.
    Invalidate { key: String, version: u64 },
}

/// An immutable envelope: who sent it, who it's for, and what it carries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub src: AgentId,
    pub dst: AgentId,
    pub payload: Payload,
}

impl Message {
    /// Construct a new envelope.
    #[must_use]
    pub fn new(src: AgentId, dst: AgentId, payload: Payload) -> Self {
        Self { src, dst, payload }
    }
}
