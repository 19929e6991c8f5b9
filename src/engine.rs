//! Simulation engine: owns the agent arena and drives the event queue in
//! chunked `advance` calls.
//!
//! Agents live in a single arena (`World::agents`), addressed by `AgentId`
//! rather than shared references — there are no ownership cycles to worry
//! about. Dispatch goes through the closed `AgentKind` sum type instead of a
//! `dyn Agent` trait object. The Observer and the Chaos Monkey are not arena
//! members: the observer is invoked via direct `report` calls and never
//! receives routed messages, and the chaos monkey only ever self-schedules
//! (`ChaosTick`) so it needs no message-routed dispatch either.

use crate::byzantine::ByzantineNode;
use crate::chaos::ChaosMonkey;
use crate::client::Client;
use crate::database::Database;
use crate::error::SimResult;
use crate::event::{EventAction, EventQueue};
use crate::load_balancer::LoadBalancer;
use crate::message::{AgentId, Message};
use crate::network::Network;
use crate::observer::Observer;
use crate::rng::SimRng;
use crate::service_node::ServiceNode;
use crate::time::VirtualTime;

use tracing::{debug, warn};

/// The fixed set of message-addressable agent kinds.
pub enum AgentKind {
    ServiceNode(ServiceNode),
    Byzantine(ByzantineNode),
    LoadBalancer(LoadBalancer),
    Database(Database),
    Client(Client),
}

impl AgentKind {
    fn as_liveness(&self) -> Option<(AgentId, bool)> {
        match self {
            AgentKind::ServiceNode(n) => Some((n.id(), n.is_active())),
            AgentKind::Byzantine(b) => Some((b.id(), b.is_active())),
            _ => None,
        }
    }

}

/// Owns every agent, the event queue, the shared RNG, and the telemetry
/// sink for one simulation run.
pub struct World {
    agents: Vec<AgentKind>,
    queue: EventQueue,
    rng: SimRng,
    network: Network,
    observer: Observer,
    chaos: Option<ChaosMonkey>,
    now: VirtualTime,
}

impl World {
    /// Build an empty world. Agents are added with `push_agent` in
    /// `AgentId(0), AgentId(1), ...` order — callers are responsible for
    /// wiring `db_id`/`target` fields to the indices they'll occupy before
    /// pushing, since `AgentId` is assigned by position.
    #[must_use]
    pub fn new(network: Network, seed: u64) -> Self {
        Self {
            agents: Vec::new(),
            queue: EventQueue::new(),
            rng: SimRng::new(seed),
            network,
            observer: Observer::new(),
            chaos: None,
            now: VirtualTime::ZERO,
        }
    }

    /// The `AgentId` the next `push_agent` call will receive.
    #[must_use]
    pub fn next_id(&self) -> AgentId {
        AgentId(self.agents.len())
    }

    /// Add an agent to the arena, returning the `AgentId` it was assigned.
    pub fn push_agent(&mut self, kind: AgentKind) -> AgentId {
        let id = self.next_id();
        self.agents.push(kind);
        id
    }

    /// Mutable access to an already-pushed agent, for driver-side wiring
    /// (subscribing nodes to the database, seeding keys) that must happen
    /// after construction but before the run starts.
    pub fn agent_mut(&mut self, id: AgentId) -> Option<&mut AgentKind> {
        self.agents.get_mut(id.0)
    }

    /// Install the chaos monkey and queue its first attack tick.
    pub fn install_chaos(&mut self, chaos: ChaosMonkey) {
        chaos.bootstrap(self.now, &mut self.rng, &mut self.queue);
        self.chaos = Some(chaos);
    }

    /// Bootstrap `client_id`'s first read tick. `client_id` must name a
    /// `AgentKind::Client` already pushed into the arena.
    pub fn bootstrap_client(&mut self, client_id: AgentId) {
        if let Some(AgentKind::Client(client)) = self.agents.get(client_id.0) {
            client.bootstrap(self.now, &mut self.queue);
        }
    }

    #[must_use]
    pub fn now(&self) -> VirtualTime {
        self.now
    }

    #[must_use]
    pub fn observer(&self) -> &Observer {
        &self.observer
    }

    /// Per-node liveness as of right now, keyed by `AgentId`. Used by the
    /// driver to snapshot the cluster for telemetry.
    #[must_use]
    pub fn node_liveness(&self) -> Vec<(AgentId, bool)> {
        self.agents.iter().filter_map(AgentKind::as_liveness).collect()
    }

    fn liveness_snapshot(&self) -> Vec<(AgentId, bool)> {
        self.agents.iter().filter_map(AgentKind::as_liveness).collect()
    }

    /// Drain and dispatch every event with `time <= until`, advancing
    /// `self.now` to `until` even if the queue runs dry before then —
    /// virtual time always advances at least to the chunk boundary. A
    /// handler fault is logged and the run continues; one poisoned event
    /// must not abort the simulation.
    pub fn advance(&mut self, until: VirtualTime) -> SimResult<()> {
        loop {
            match self.queue.peek() {
                Some(event) if event.time <= until => {
                    let event = self.queue.pop().expect("peeked event must still be present");
                    self.now = event.time;
                    if let Err(err) = self.dispatch(event.action) {
                        warn!(error = %err, "agent handler faulted; continuing simulation");
                    }
                }
                _ => break,
            }
        }
        self.now = until;
        Ok(())
    }

    fn dispatch(&mut self, action: EventAction) -> SimResult<()> {
        match action {
            EventAction::Deliver(msg) => self.deliver(msg),
            EventAction::ClientTick(id) => self.client_tick(id),
            EventAction::ChaosTick(id) => self.chaos_tick(id),
        }
        Ok(())
    }

    fn deliver(&mut self, msg: Message) {
        let idx = msg.dst.0;
        let Some(kind) = self.agents.get_mut(idx) else {
            debug!(dst = %msg.dst, "message addressed to unknown agent, dropping");
            return;
        };

        match kind {
            AgentKind::ServiceNode(node) => {
                node.handle(&msg, self.now, &mut self.rng, &self.network, &mut self.queue, &mut self.observer);
            }
            AgentKind::Byzantine(node) => {
                node.handle(&msg, self.now, &mut self.rng, &self.network, &mut self.queue, &mut self.observer);
            }
            AgentKind::Database(db) => {
                db.handle(&msg, self.now, &mut self.rng, &self.network, &mut self.queue);
            }
            AgentKind::LoadBalancer(_) => self.deliver_to_load_balancer(idx, msg),
            AgentKind::Client(client) => client.on_response(&msg),
        }
    }

    fn deliver_to_load_balancer(&mut self, idx: usize, msg: Message) {
        let liveness = self.liveness_snapshot();
        let routed = match &self.agents[idx] {
            AgentKind::LoadBalancer(lb) => lb.forward(&msg, |id| {
                liveness.iter().any(|(live_id, active)| *live_id == id && *active)
            }),
            _ => unreachable!("deliver_to_load_balancer called on a non-LoadBalancer index"),
        };
        self.network.send(routed, self.now, &mut self.rng, &mut self.queue);
    }

    fn client_tick(&mut self, id: AgentId) {
        let Some(AgentKind::Client(client)) = self.agents.get(id.0) else {
            return;
        };
        client.on_tick(self.now, &mut self.rng, &self.network, &mut self.queue);
    }

    fn chaos_tick(&mut self, _id: AgentId) {
        let Some(chaos) = self.chaos.take() else {
            return;
        };
        let victim = chaos.on_tick(self.now, &mut self.rng, &mut self.queue);
        self.chaos = Some(chaos);

        if let Some(victim) = victim {
            if let Some(kind) = self.agents.get_mut(victim.0) {
                match kind {
                    AgentKind::ServiceNode(node) => node.deactivate(),
                    AgentKind::Byzantine(node) => node.deactivate(),
                    _ => {}
                }
            }
        }
    }
}

/// Whether the queue still has work scheduled at or before `duration`.
#[must_use]
pub fn has_pending_work(world: &World, duration: VirtualTime) -> bool {
    world.queue.peek().is_some_and(|e| e.time <= duration)
}
