//! Network agent: a `send` that rolls for a drop, otherwise samples a
//! latency and schedules delivery. Deliveries are pushed as an
//! `EventAction::Deliver`, keeping events inspectable rather than opaque
//! thunks.

use crate::event::{EventAction, EventQueue};
use crate::message::Message;
use crate::rng::SimRng;
use crate::time::VirtualTime;

/// How a send's delay is sampled. A closed set rather than a boxed closure,
/// so a `Network` stays `Send`/`Clone`-friendly and its configuration stays
/// inspectable.
#[derive(Debug, Clone, Copy)]
pub enum LatencyModel {
    /// Every delivery takes exactly this long.
    Fixed(f64),
    /// Delay drawn uniformly from `[lo, hi)`.
    Uniform { lo: f64, hi: f64 },
}

impl LatencyModel {
    fn sample(self, rng: &mut SimRng) -> f64 {
        match self {
            LatencyModel::Fixed(d) => d,
            LatencyModel::Uniform { lo, hi } => rng.uniform(lo, hi),
        }
    }
}

/// Probabilistic drop + sampled latency.
pub struct Network {
    latency: LatencyModel,
    drop_prob: f64,
}

impl Network {
    /// `drop_prob` is clamped to `[0, 1]`.
    #[must_use]
    pub fn new(latency: LatencyModel, drop_prob: f64) -> Self {
        Self {
            latency,
            drop_prob: drop_prob.clamp(0.0, 1.0),
        }
    }

    /// Roll for a drop; on survival, sample a latency and schedule
    /// `EventAction::Deliver(msg)` at `now + delay`. Ordering between
    /// distinct sends is not guaranteed — only the FIFO tie-break at equal
    /// delivery times.
    pub fn send(&self, msg: Message, now: VirtualTime, rng: &mut SimRng, queue: &mut EventQueue) {
        if rng.bernoulli(self.drop_prob) {
            return;
        }
        let delay = self.latency.sample(rng);
        queue.push(now + delay, EventAction::Deliver(msg));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::{AgentId, Payload};

    fn msg() -> Message {
        Message::new(AgentId(0), AgentId(1), Payload::Read { key: "k".into() })
    }

    #[test]
    fn drop_probability_one_never_enqueues() {
        let net = Network::new(LatencyModel::Fixed(1.0), 1.0);
        let mut rng = SimRng::new(1);
        let mut q = EventQueue::new();
        for _ in 0..50 {
            net.send(msg(), VirtualTime::ZERO, &mut rng, &mut q);
        }
        assert!(q.is_empty());
    }

    #[test]
    fn drop_probability_zero_always_enqueues() {
        let net = Network::new(LatencyModel::Fixed(2.5), 0.0);
        let mut rng = SimRng::new(1);
        let mut q = EventQueue::new();
        net.send(msg(), VirtualTime::ZERO, &mut rng, &mut q);
        let ev = q.pop().expect("message should have been scheduled");
        assert_eq!(ev.time.as_f64(), 2.5);
    }

    #[test]
    fn fixed_latency_delivers_at_now_plus_delay() {
        let net = Network::new(LatencyModel::Fixed(3.0), 0.0);
        let mut rng = SimRng::new(1);
        let mut q = EventQueue::new();
        net.send(msg(), VirtualTime::new(10.0), &mut rng, &mut q);
        let ev = q.pop().unwrap();
        assert_eq!(ev.time.as_f64(), 13.0);
    }

    #[test]
    fn uniform_latency_stays_in_range() {
        let net = Network::new(LatencyModel::Uniform { lo: 1.0, hi: 2.0 }, 0.0);
        let mut rng = SimRng::new(1);
        let mut q = EventQueue::new();
        for _ in 0..50 {
            net.send(msg(), VirtualTime::ZERO, &mut rng, &mut q);
        }
        while let Some(ev) = q.pop() {
            assert!(ev.time.as_f64() >= 1.0 && ev.time.as_f64() < 2.0);
        }
    }
}
