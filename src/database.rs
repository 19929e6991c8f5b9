//! Database agent: the single source of truth nodes cache against.
//!
//! A `WRITE` bumps a monotonic version counter and fans out `INVALIDATE` to
//! every subscribed service node; a `READ_DB` answers from `data` if present
//! and is silently ignored otherwise — the requester's pending slot then
//! stays open until a later write, a known limitation.

use std::collections::HashMap;

use crate::event::EventQueue;
use crate::message::{AgentId, Message, Payload};
use crate::network::Network;
use crate::rng::SimRng;
use crate::time::VirtualTime;

/// The single source of truth nodes cache against.
pub struct Database {
    id: AgentId,
    data: HashMap<String, (String, i64)>,
    version_counter: i64,
    subscribers: Vec<AgentId>,
}

impl Database {
    /// An empty database with no seeded keys and no subscribers yet.
    #[must_use]
    pub fn new(id: AgentId) -> Self {
        Self {
            id,
            data: HashMap::new(),
            version_counter: 0,
            subscribers: Vec::new(),
        }
    }

    /// Register `node` to receive `INVALIDATE` on every future write.
    pub fn subscribe(&mut self, node: AgentId) {
        self.subscribers.push(node);
    }

    /// Seed `key` at version 1 without consuming any randomness or sending
    /// invalidations — matches the original's deterministic preload, which
    /// runs before any service node has cached anything. Every seeded key
    /// gets version 1 directly (`backend/src/simulation_manager.py:37`
    /// hardcodes version 1 per key rather than drawing from a counter) —
    /// `seed` no longer increments `version_counter` once per call, so
    /// seeding `key_1..key_K` no longer hands out versions `1..K`. The
    /// counter itself is raised to at least 1 the first time `seed` is
    /// called, so it still starts post-seed exactly where it would have
    /// landed after a single real version-1 write: the first real `WRITE`
    /// following a seeded run produces version 2, not version 1.
    pub fn seed(&mut self, key: String, value: String) {
        self.data.insert(key, (value, 1));
        self.version_counter = self.version_counter.max(1);
    }

    /// Dispatch an incoming message, producing network sends as a side
    /// effect of pushing delivery events onto `queue`.
    pub fn handle(
        &mut self,
        msg: &Message,
        now: VirtualTime,
        rng: &mut SimRng,
        net: &Network,
        queue: &mut EventQueue,
    ) {
        match &msg.payload {
            Payload::Write { key, value } => {
                self.version_counter += 1;
                let version = self.version_counter;
                self.data.insert(key.clone(), (value.clone(), version));
                for &node in &self.subscribers {
                    let invalidate = Message::new(
                        self.id,
                        node,
                        Payload::Invalidate {
                            key: key.clone(),
                            version: version as u64,
                        },
                    );
                    net.send(invalidate, now, rng, queue);
                }
            }
            Payload::ReadDb { key } => {
                if let Some((value, version)) = self.data.get(key) {
                    let response = Message::new(
                        self.id,
                        msg.src,
                        Payload::ReadResponse {
                            key: key.clone(),
                            value: value.clone(),
                            version: *version,
                        },
                    );
                    net.send(response, now, rng, queue);
                }
                // Absent key: no reply.
            }
            _ => {}
        }
    }

    /// Current value and version for `key`, if present. Test/inspection
    /// helper — production dispatch only goes through messages.
    #[must_use]
    pub fn peek(&self, key: &str) -> Option<&(String, i64)> {
        self.data.get(key)
    }
}
