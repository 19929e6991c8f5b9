//! Load Balancer: consistent-hash routing with linear-probe failover.
//!
//! Forwards with the original client preserved as `src`. `stable_hash` is
//! hand-rolled FNV-1a rather than `std::collections::hash_map::DefaultHasher`,
//! whose algorithm is explicitly not guaranteed stable across Rust releases —
//! this simulation needs the same key to always hash to the same bucket for
//! reproducibility across runs with a fixed seed.

use crate::message::{AgentId, Message, Payload};

const FNV_OFFSET_BASIS: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;

/// A deterministic, process-independent hash. Same algorithm every build,
/// every run, every process — unlike `DefaultHasher`.
#[must_use]
pub fn stable_hash(s: &str) -> u64 {
    let mut hash = FNV_OFFSET_BASIS;
    for byte in s.as_bytes() {
        hash ^= u64::from(*byte);
        hash = hash.wrapping_mul(FNV_PRIME);
    }
    hash
}

/// Consistent-hash routing across a fixed, ordered list of node handles.
pub struct LoadBalancer {
    nodes: Vec<AgentId>,
}

impl LoadBalancer {
    #[must_use]
    pub fn new(nodes: Vec<AgentId>) -> Self {
        Self { nodes }
    }

    /// Pick the destination for `key`: probe `h, h+1, ..., h+N-1` (mod N)
    /// for the first live node, falling back to position `h` if every node
    /// is dead.
    pub fn select<F>(&self, key: &str, is_active: F) -> AgentId
    where
        F: Fn(AgentId) -> bool,
    {
        let n = self.nodes.len();
        assert!(n > 0, "load balancer has no nodes to route to");
        let h = (stable_hash(key) % n as u64) as usize;

        for offset in 0..n {
            let idx = (h + offset) % n;
            if is_active(self.nodes[idx]) {
                return self.nodes[idx];
            }
        }
        self.nodes[h]
    }

    /// Rebuild `msg` addressed to the chosen node for `key`, preserving the
    /// original client as `src`; the payload itself is never rewritten.
    pub fn forward<F>(&self, msg: &Message, is_active: F) -> Message
    where
        F: Fn(AgentId) -> bool,
    {
        let key = match &msg.payload {
            Payload::Read { key } => key.clone(),
            other => unreachable!("load balancer only routes READ, got {other:?}"),
        };
        let dst = self.select(&key, is_active);
        Message::new(msg.src, dst, msg.payload.clone())
    }
}
