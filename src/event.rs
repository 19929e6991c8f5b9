//! Event & Event Queue.
//!
//! A min-heap keyed by `(time, seq)` with no removal or reprioritization;
//! cancellation is modelled elsewhere, via agent-level `active` flags.
//! `seq` is assigned at push time and totally orders events that share a
//! `time`, giving a deterministic FIFO tie-break.
//!
//! Event actions are small inspectable variants rather than closures, to
//! keep events inspectable, serialisable for debugging, and free of
//! captured mutable aliases.

use crate::message::{AgentId, Message};
use crate::time::VirtualTime;
use std::cmp::Ordering;
use std::collections::BinaryHeap;

/// What an event does when dispatched. A closed set.
#[derive(Debug, Clone)]
pub enum EventAction {
    /// Deliver a message to its destination (the network's doing, after a
    /// latency sample).
    Deliver(Message),
    /// A client's self-scheduled read generator firing.
    ClientTick(AgentId),
    /// The chaos monkey's self-scheduled attack firing.
    ChaosTick(AgentId),
}

/// A scheduled unit of work: when it fires, in what order relative to its
/// same-time siblings, and what it does.
#[derive(Debug, Clone)]
pub struct Event {
    pub time: VirtualTime,
    pub seq: u64,
    pub action: EventAction,
}

impl PartialEq for Event {
    fn eq(&self, other: &Self) -> bool {
        self.time == other.time && self.seq == other.seq
    }
}

impl Eq for Event {}

impl PartialOrd for Event {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Event {
    /// Reversed so that `BinaryHeap`, a max-heap, pops the smallest
    /// `(time, seq)` first.
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .time
            .cmp(&self.time)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

/// The simulation's priority queue of pending events.
#[derive(Default)]
pub struct EventQueue {
    heap: BinaryHeap<Event>,
    next_seq: u64,
}

impl EventQueue {
    /// An empty queue.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedule `action` to fire at `time`, assigning it the next sequence
    /// number so it breaks ties in push order against any other event
    /// already scheduled for the same `time`.
    pub fn push(&mut self, time: VirtualTime, action: EventAction) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.heap.push(Event { time, seq, action });
    }

    /// Remove and return the least `(time, seq)` event, if any.
    pub fn pop(&mut self) -> Option<Event> {
        self.heap.pop()
    }

    /// The least `(time, seq)` event, without removing it.
    #[must_use]
    pub fn peek(&self) -> Option<&Event> {
        self.heap.peek()
    }

    /// Whether any events remain.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    /// Number of events currently queued.
    #[must_use]
    pub fn len(&self) -> usize {
        self.heap.len()
    }
}
