//! Client: a self-scheduling read generator.
//!
//! Bootstrapped at `now + 0.1`, it draws a key from a fixed key space and an
//! inter-arrival delay each time it fires, halting once `max_time` is
//! exceeded. Responses are counted but not otherwise inspected — this
//! client performs no correctness check of its own.

use crate::event::{EventAction, EventQueue};
use crate::message::{AgentId, Message, Payload};
use crate::network::Network;
use crate::rng::SimRng;
use crate::time::VirtualTime;

/// Inter-arrival distribution for successive reads. Defaults to uniform on
/// `[5, 25]`.
#[derive(Debug, Clone, Copy)]
pub struct Interarrival {
    pub lo: f64,
    pub hi: f64,
}

impl Default for Interarrival {
    fn default() -> Self {
        Self { lo: 5.0, hi: 25.0 }
    }
}

impl Interarrival {
    fn sample(self, rng: &mut SimRng) -> f64 {
        rng.uniform(self.lo, self.hi)
    }
}

/// Bootstrap delay before the first read.
const BOOTSTRAP_DELAY: f64 = 0.1;

/// A synthetic read generator targeting a node or load balancer.
pub struct Client {
    id: AgentId,
    target: AgentId,
    max_time: Option<VirtualTime>,
    key_space: u64,
    interarrival: Interarrival,
    responses_received: u64,
}

impl Client {
    #[must_use]
    pub fn new(id: AgentId, target: AgentId, max_time: Option<VirtualTime>, key_space: u64, interarrival: Interarrival) -> Self {
        Self {
            id,
            target,
            max_time,
            key_space,
            interarrival,
            responses_received: 0,
        }
    }

    #[must_use]
    pub fn id(&self) -> AgentId {
        self.id
    }

    #[must_use]
    pub fn responses_received(&self) -> u64 {
        self.responses_received
    }

    /// Queue the first `ClientTick` at `now + 0.1`, kickstarting the read
    /// generator.
    pub fn bootstrap(&self, now: VirtualTime, queue: &mut EventQueue) {
        queue.push(now + BOOTSTRAP_DELAY, EventAction::ClientTick(self.id));
    }

    fn exceeded_max_time(&self, now: VirtualTime) -> bool {
        self.max_time.is_some_and(|max| now > max)
    }

    /// Respond to a scheduled `ClientTick`: if past `max_time`, halt (no
    /// further self-scheduling); otherwise draw a key, send a `READ`, and
    /// schedule the next tick.
    pub fn on_tick(&self, now: VirtualTime, rng: &mut SimRng, net: &Network, queue: &mut EventQueue) {
        if self.exceeded_max_time(now) {
            return;
        }

        let key_index = rng.uniform_inclusive(1, self.key_space.max(1));
        let key = format!("key_{key_index}");
        let read = Message::new(self.id, self.target, Payload::Read { key });
        net.send(read, now, rng, queue);

        let next_time = now + self.interarrival.sample(rng);
        if !self.exceeded_max_time(next_time) {
            queue.push(next_time, EventAction::ClientTick(self.id));
        }
    }

    /// Count an arriving response without inspecting its contents.
    pub fn on_response(&mut self, _msg: &Message) {
        self.responses_received += 1;
    }
}
