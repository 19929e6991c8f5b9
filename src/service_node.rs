//! Service Node: cache-then-database fallback with single-flight coalescing
//! on concurrent misses. The pending-requests map keeps at most one
//! (last-writer-wins) requester per key in flight.

use std::collections::HashMap;

use crate::cache::{CacheEntry, LruCache};
use crate::event::EventQueue;
use crate::message::{AgentId, Message, Payload};
use crate::network::Network;
use crate::observer::{Observer, ReportEvent};
use crate::rng::SimRng;
use crate::time::VirtualTime;

/// A cache node sitting in front of the shared database.
pub struct ServiceNode {
    id: AgentId,
    db_id: AgentId,
    cache: LruCache,
    pending: HashMap<String, AgentId>,
    active: bool,
    ttl: f64,
}

impl ServiceNode {
    /// A freshly started node with an empty cache and no in-flight misses.
    /// `db_id` is the database agent this node sends `READ_DB` to.
    #[must_use]
    pub fn new(id: AgentId, db_id: AgentId, capacity: usize, ttl: f64) -> Self {
        Self {
            id,
            db_id,
            cache: LruCache::new(capacity),
            pending: HashMap::new(),
            active: true,
            ttl,
        }
    }

    #[must_use]
    pub fn id(&self) -> AgentId {
        self.id
    }

    #[must_use]
    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Kill this node. Dead nodes never come back — there is deliberately
    /// no `revive`.
    pub fn deactivate(&mut self) {
        self.active = false;
    }

    /// Number of keys currently awaiting a database response. Exposed so
    /// the driver can report an otherwise-invisible consequence of the
    /// database-drops-unknown-keys limitation.
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Dispatch one incoming message. A dead node silently drops
    /// everything, including `INVALIDATE` and `READ_RESPONSE` — per the
    /// original's `active` guard at handler entry.
    #[allow(clippy::too_many_arguments)]
    pub fn handle(
        &mut self,
        msg: &Message,
        now: VirtualTime,
        rng: &mut SimRng,
        net: &Network,
        queue: &mut EventQueue,
        observer: &mut Observer,
    ) {
        if !self.active {
            return;
        }

        match &msg.payload {
            Payload::Read { key } => self.handle_read(key, msg.src, now, rng, net, queue, observer),
            Payload::Invalidate { key, .. } => {
                self.cache.invalidate(key);
            }
            Payload::ReadResponse { key, value, version } => {
                let entry = CacheEntry::new(key.clone(), value.clone(), *version, self.ttl, now);
                self.cache.put(key.clone(), entry);
                if let Some(requester) = self.pending.remove(key) {
                    let response = Message::new(
                        self.id,
                        requester,
                        Payload::ReadResponse {
                            key: key.clone(),
                            value: value.clone(),
                            version: *version,
                        },
                    );
                    net.send(response, now, rng, queue);
                }
            }
            _ => {}
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn handle_read(
        &mut self,
        key: &str,
        requester: AgentId,
        now: VirtualTime,
        rng: &mut SimRng,
        net: &Network,
        queue: &mut EventQueue,
        observer: &mut Observer,
    ) {
        if let Some(entry) = self.cache.get(key) {
            if entry.is_live(now) {
                observer.report(ReportEvent::CacheHit, now, Some(self.id), Some(key.to_string()));
                let response = Message::new(
                    self.id,
                    requester,
                    Payload::ReadResponse {
                        key: key.to_string(),
                        value: entry.value.clone(),
                        version: entry.version,
                    },
                );
                net.send(response, now, rng, queue);
                return;
            }
        }

        observer.report(ReportEvent::CacheMiss, now, Some(self.id), Some(key.to_string()));
        let already_in_flight = self.pending.insert(key.to_string(), requester).is_some();
        if !already_in_flight {
            let db_request = Message::new(self.id, self.db_id, Payload::ReadDb { key: key.to_string() });
            net.send(db_request, now, rng, queue);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::LatencyModel;

    fn harness() -> (ServiceNode, Network, SimRng, EventQueue, Observer) {
        (
            ServiceNode::new(AgentId(1), AgentId(0), 10, 500.0),
            Network::new(LatencyModel::Fixed(1.0), 0.0),
            SimRng::new(1),
            EventQueue::new(),
            Observer::new(),
        )
    }

    #[test]
    fn inactive_node_drops_read_silently() {
        let (mut node, net, mut rng, mut q, mut obs) = harness();
        node.deactivate();
        let msg = Message::new(AgentId(2), AgentId(1), Payload::Read { key: "k".into() });
        node.handle(&msg, VirtualTime::ZERO, &mut rng, &net, &mut q, &mut obs);
        assert!(q.is_empty());
        assert_eq!(obs.total_reads(), 0);
    }

    #[test]
    fn cold_read_is_a_miss_and_issues_one_read_db() {
        let (mut node, net, mut rng, mut q, mut obs) = harness();
        let msg = Message::new(AgentId(2), AgentId(1), Payload::Read { key: "k".into() });
        node.handle(&msg, VirtualTime::ZERO, &mut rng, &net, &mut q, &mut obs);
        assert_eq!(obs.misses(), 1);
        assert_eq!(q.len(), 1);
        assert_eq!(node.pending_count(), 1);
    }

    #[test]
    fn second_concurrent_miss_coalesces_and_overwrites_requester() {
        let (mut node, net, mut rng, mut q, mut obs) = harness();
        let first = Message::new(AgentId(2), AgentId(1), Payload::Read { key: "k".into() });
        let second = Message::new(AgentId(3), AgentId(1), Payload::Read { key: "k".into() });
        node.handle(&first, VirtualTime::ZERO, &mut rng, &net, &mut q, &mut obs);
        node.handle(&second, VirtualTime::ZERO, &mut rng, &net, &mut q, &mut obs);

        assert_eq!(obs.misses(), 2);
        // Only one READ_DB should have been sent.
        assert_eq!(q.len(), 1);
        assert_eq!(node.pending_count(), 1);
    }

    #[test]
    fn read_response_fills_cache_and_answers_last_writer() {
        let (mut node, net, mut rng, mut q, mut obs) = harness();
        let read = Message::new(AgentId(2), AgentId(1), Payload::Read { key: "k".into() });
        node.handle(&read, VirtualTime::ZERO, &mut rng, &net, &mut q, &mut obs);
        q.pop(); // discard the READ_DB event

        let resp = Message::new(
            AgentId::EXTERNAL,
            AgentId(1),
            Payload::ReadResponse {
                key: "k".into(),
                value: "v1".into(),
                version: 1,
            },
        );
        node.handle(&resp, VirtualTime::new(1.0), &mut rng, &net, &mut q, &mut obs);

        assert_eq!(node.pending_count(), 0);
        let ev = q.pop().expect("a reply should be queued");
        match ev.action {
            crate::event::EventAction::Deliver(reply) => {
                assert_eq!(reply.dst, AgentId(2));
                assert!(matches!(reply.payload, Payload::ReadResponse { .. }));
            }
            _ => panic!("expected Deliver"),
        }
    }

    #[test]
    fn warm_hit_serves_from_cache_without_touching_database() {
        let (mut node, net, mut rng, mut q, mut obs) = harness();
        let read = Message::new(AgentId(2), AgentId(1), Payload::Read { key: "k".into() });
        node.handle(&read, VirtualTime::ZERO, &mut rng, &net, &mut q, &mut obs);
        q.pop();
        let resp = Message::new(
            AgentId::EXTERNAL,
            AgentId(1),
            Payload::ReadResponse {
                key: "k".into(),
                value: "v1".into(),
                version: 1,
            },
        );
        node.handle(&resp, VirtualTime::new(1.0), &mut rng, &net, &mut q, &mut obs);
        q.pop();

        let second_read = Message::new(AgentId(3), AgentId(1), Payload::Read { key: "k".into() });
        node.handle(&second_read, VirtualTime::new(2.0), &mut rng, &net, &mut q, &mut obs);
        assert_eq!(obs.hits(), 1);
        assert_eq!(q.len(), 1);
    }

    #[test]
    fn invalidate_unconditionally_clears_entry_regardless_of_version() {
        let (mut node, net, mut rng, mut q, mut obs) = harness();
        let read = Message::new(AgentId(2), AgentId(1), Payload::Read { key: "k".into() });
        node.handle(&read, VirtualTime::ZERO, &mut rng, &net, &mut q, &mut obs);
        q.pop();
        let resp = Message::new(
            AgentId::EXTERNAL,
            AgentId(1),
            Payload::ReadResponse {
                key: "k".into(),
                value: "v1".into(),
                version: 1,
            },
        );
        node.handle(&resp, VirtualTime::new(1.0), &mut rng, &net, &mut q, &mut obs);
        q.pop();

        let invalidate = Message::new(
            AgentId::EXTERNAL,
            AgentId(1),
            Payload::Invalidate {
                key: "k".into(),
                version: 999,
            },
        );
        node.handle(&invalidate, VirtualTime::new(2.0), &mut rng, &net, &mut q, &mut obs);

        let next_read = Message::new(AgentId(2), AgentId(1), Payload::Read { key: "k".into() });
        node.handle(&next_read, VirtualTime::new(3.0), &mut rng, &net, &mut q, &mut obs);
        assert_eq!(obs.misses(), 2, "entry should have been evicted by invalidate");
    }
}
