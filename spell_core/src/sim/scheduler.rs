//! Discrete-event clock
//!
//! Actions scheduled for the same instant run in the order they were
//! scheduled.

use super::Simulation;
use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::time::Duration;

/// Deferred work executed when the clock reaches its timestamp
pub type Action = Box<dyn FnOnce(&mut Simulation)>;

struct Scheduled {
    at: Duration,
    seq: u64,
    action: Action,
}

impl PartialEq for Scheduled {
    fn eq(&self, other: &Self) -> bool {
        self.at == other.at && self.seq == other.seq
    }
}

impl Eq for Scheduled {}

impl PartialOrd for Scheduled {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Scheduled {
    // Reversed so the BinaryHeap pops the earliest (time, sequence) first
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .at
            .cmp(&self.at)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

/// Pending actions ordered by time, then by insertion
#[derive(Default)]
pub struct Scheduler {
    now: Duration,
    next_seq: u64,
    queue: BinaryHeap<Scheduled>,
}

impl Scheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn now(&self) -> Duration {
        self.now
    }

    /// Queue an action. Times in the past run at the current instant.
    pub fn schedule(&mut self, at: Duration, action: Action) {
        let at = at.max(self.now);
        let seq = self.next_seq;
        self.next_seq += 1;
        self.queue.push(Scheduled { at, seq, action });
    }

    /// Remove the next action due at or before `until`, advancing the clock to it
    pub(crate) fn pop_due(&mut self, until: Duration) -> Option<Action> {
        if self.queue.peek().map(|s| s.at <= until) != Some(true) {
            return None;
        }
        let next = self.queue.pop()?;
        self.now = next.at;
        Some(next.action)
    }

    pub(crate) fn advance_to(&mut self, at: Duration) {
        self.now = self.now.max(at);
    }

    pub fn next_event_at(&self) -> Option<Duration> {
        self.queue.peek().map(|s| s.at)
    }

    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    /// Drop every pending action and rewind the clock
    pub fn clear(&mut self) {
        self.queue.clear();
        self.now = Duration::ZERO;
        self.next_seq = 0;
    }
}

impl std::fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scheduler")
            .field("now", &self.now)
            .field("pending", &self.queue.len())
            .finish()
    }
}
