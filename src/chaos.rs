//! Chaos Monkey: a fault-injection agent that randomly disables nodes.
//!
//! Self-schedules at a random interval, and on each firing rolls once for
//! whether to attack at all before picking a uniformly random target. This
//! is a deliberate double gate — interval *and* per-tick probability —
//! rather than a single draw; it widens the gap between "tick happens" and
//! "a node actually dies" so attacks don't cluster immediately after a
//! restart.

use crate::event::{EventAction, EventQueue};
use crate::message::AgentId;
use crate::rng::SimRng;
use crate::time::VirtualTime;

/// Inter-attack distribution. Defaults to uniform on `[50, 200]`.
#[derive(Debug, Clone, Copy)]
pub struct AttackInterval {
    pub lo: f64,
    pub hi: f64,
}

impl Default for AttackInterval {
    fn default() -> Self {
        Self { lo: 50.0, hi: 200.0 }
    }
}

impl AttackInterval {
    fn sample(self, rng: &mut SimRng) -> f64 {
        rng.uniform(self.lo, self.hi)
    }
}

/// Periodically kills a uniformly random live target. Killed nodes never
/// come back in this model.
pub struct ChaosMonkey {
    id: AgentId,
    targets: Vec<AgentId>,
    kill_prob: f64,
    interval: AttackInterval,
}

impl ChaosMonkey {
    #[must_use]
    pub fn new(id: AgentId, targets: Vec<AgentId>, kill_prob: f64, interval: AttackInterval) -> Self {
        Self {
            id,
            targets,
            kill_prob: kill_prob.clamp(0.0, 1.0),
            interval,
        }
    }

    #[must_use]
    pub fn id(&self) -> AgentId {
        self.id
    }

    /// Schedule the first attack tick.
    pub fn bootstrap(&self, now: VirtualTime, rng: &mut SimRng, queue: &mut EventQueue) {
        queue.push(now + self.interval.sample(rng), EventAction::ChaosTick(self.id));
    }

    /// Roll once for whether to attack this tick; if so, pick a uniformly
    /// random target and return it for the engine to deactivate. Always
    /// reschedules the next tick regardless of whether this one attacked.
    pub fn on_tick(&self, now: VirtualTime, rng: &mut SimRng, queue: &mut EventQueue) -> Option<AgentId> {
        let victim = if !self.targets.is_empty() && rng.bernoulli(self.kill_prob) {
            Some(self.targets[rng.index(self.targets.len())])
        } else {
            None
        };

        queue.push(now + self.interval.sample(rng), EventAction::ChaosTick(self.id));
        victim
    }
}
