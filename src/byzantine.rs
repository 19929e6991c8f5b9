//! Byzantine Node: a fault-injection variant of the service node.
//!
//! With probability `q` a `READ` is answered immediately with a corrupted
//! value, bypassing cache and database entirely; otherwise it delegates to
//! a normal `ServiceNode`. Composition rather than inheritance keeps the
//! agent-kind set closed — a `ByzantineNode` wraps a `ServiceNode` instead
//! of subclassing it.

use crate::event::EventQueue;
use crate::message::{AgentId, Message, Payload};
use crate::network::Network;
use crate::observer::Observer;
use crate::rng::SimRng;
use crate::service_node::ServiceNode;
use crate::time::VirtualTime;

/// Sentinel value substituted for the real payload when a Byzantine node
/// corrupts a response.
pub const CORRUPTED_VALUE: &str = "CORRUPTED";
/// Sentinel version accompanying a corrupted response.
pub const CORRUPTED_VERSION: i64 = -1;

/// A service node that lies with probability `q`.
pub struct ByzantineNode {
    inner: ServiceNode,
    corrupt_prob: f64,
}

impl ByzantineNode {
    /// `corrupt_prob` is clamped to `[0, 1]` by `SimRng::bernoulli` at use.
    #[must_use]
    pub fn new(inner: ServiceNode, corrupt_prob: f64) -> Self {
        Self { inner, corrupt_prob }
    }

    #[must_use]
    pub fn id(&self) -> AgentId {
        self.inner.id()
    }

    #[must_use]
    pub fn is_active(&self) -> bool {
        self.inner.is_active()
    }

    pub fn deactivate(&mut self) {
        self.inner.deactivate();
    }

    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.inner.pending_count()
    }

    pub fn handle(
        &mut self,
        msg: &Message,
        now: VirtualTime,
        rng: &mut SimRng,
        net: &Network,
        queue: &mut EventQueue,
        observer: &mut Observer,
    ) {
        if !self.inner.is_active() {
            return;
        }

        if let Payload::Read { key } = &msg.payload {
            if rng.bernoulli(self.corrupt_prob) {
                let corrupted = Message::new(
                    self.inner.id(),
                    msg.src,
                    Payload::ReadResponse {
                        key: key.clone(),
                        value: CORRUPTED_VALUE.to_string(),
                        version: CORRUPTED_VERSION,
                    },
                );
                net.send(corrupted, now, rng, queue);
                return;
            }
        }

        self.inner.handle(msg, now, rng, net, queue, observer);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::LatencyModel;

    fn harness() -> (ByzantineNode, Network, SimRng, EventQueue, Observer) {
        (
            ByzantineNode::new(ServiceNode::new(AgentId(1), AgentId(0), 10, 500.0), 1.0),
            Network::new(LatencyModel::Fixed(1.0), 0.0),
            SimRng::new(1),
            EventQueue::new(),
            Observer::new(),
        )
    }

    #[test]
    fn always_corrupt_node_never_touches_database_or_observer() {
        let (mut node, net, mut rng, mut q, mut obs) = harness();
        let read = Message::new(AgentId(2), AgentId(1), Payload::Read { key: "k".into() });
        node.handle(&read, VirtualTime::ZERO, &mut rng, &net, &mut q, &mut obs);

        assert_eq!(obs.total_reads(), 0, "corruption bypasses cache/db bookkeeping");
        let ev = q.pop().expect("a corrupted reply should be queued");
        match ev.action {
            crate::event::EventAction::Deliver(reply) => match reply.payload {
                Payload::ReadResponse { value, version, .. } => {
                    assert_eq!(value, CORRUPTED_VALUE);
                    assert_eq!(version, CORRUPTED_VERSION);
                }
                _ => panic!("expected ReadResponse"),
            },
            _ => panic!("expected Deliver"),
        }
    }

    #[test]
    fn never_corrupt_node_behaves_like_a_plain_service_node() {
        let (mut node, net, mut rng, mut q, mut obs) = (
            ByzantineNode::new(ServiceNode::new(AgentId(1), AgentId(0), 10, 500.0), 0.0),
            Network::new(LatencyModel::Fixed(1.0), 0.0),
            SimRng::new(1),
            EventQueue::new(),
            Observer::new(),
        );
        let read = Message::new(AgentId(2), AgentId(1), Payload::Read { key: "k".into() });
        node.handle(&read, VirtualTime::ZERO, &mut rng, &net, &mut q, &mut obs);
        assert_eq!(obs.misses(), 1);
    }

    #[test]
    fn inactive_byzantine_node_drops_everything() {
        let (mut node, net, mut rng, mut q, mut obs) = harness();
        node.deactivate();
        let read = Message::new(AgentId(2), AgentId(1), Payload::Read { key: "k".into() });
        node.handle(&read, VirtualTime::ZERO, &mut rng, &net, &mut q, &mut obs);
        assert!(q.is_empty());
    }
}
