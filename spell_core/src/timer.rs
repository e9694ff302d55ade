//! Timers and cooldowns
//!
//! A timer stores the simulation time at which it becomes ready again. Spells
//! that bind the same timer share one cooldown resource.

use crate::types::TimerId;
use std::collections::HashMap;
use std::time::Duration;

/// Countdown resource owned by a unit
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Timer {
    ready_at: Duration,
}

impl Timer {
    pub fn ready_at(&self) -> Duration {
        self.ready_at
    }

    pub fn set_ready_at(&mut self, at: Duration) {
        self.ready_at = at;
    }

    pub fn is_ready(&self, now: Duration) -> bool {
        self.ready_at <= now
    }

    pub fn time_to_ready(&self, now: Duration) -> Duration {
        self.ready_at.saturating_sub(now)
    }

    pub fn reset(&mut self) {
        self.ready_at = Duration::ZERO;
    }

    /// Bring the ready time forward, never past `now`
    pub fn reduce(&mut self, now: Duration, by: Duration) {
        self.ready_at = self.ready_at.saturating_sub(by).max(now.min(self.ready_at));
    }
}

/// A timer bound to a default duration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cooldown {
    pub timer: TimerId,
    pub duration: Duration,
}

/// Every timer of one unit, including named shared timers
#[derive(Debug, Clone, Default)]
pub struct TimerSet {
    timers: Vec<Timer>,
    named: HashMap<String, TimerId>,
}

/// Guard against content that allocates a timer on every trial
const MAX_TIMERS: usize = 256;

impl TimerSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate a private timer
    pub fn new_timer(&mut self) -> TimerId {
        debug_assert!(
            self.timers.len() < MAX_TIMERS,
            "over {} timers, one is probably registered every trial",
            MAX_TIMERS
        );
        let id = TimerId(self.timers.len());
        self.timers.push(Timer::default());
        id
    }

    /// Get or create the shared timer with this name
    pub fn named_timer(&mut self, name: &str) -> TimerId {
        if let Some(id) = self.named.get(name) {
            return *id;
        }
        let id = self.new_timer();
        self.named.insert(name.to_string(), id);
        id
    }

    pub fn lookup(&self, name: &str) -> Option<TimerId> {
        self.named.get(name).copied()
    }

    pub fn get(&self, id: TimerId) -> Option<&Timer> {
        self.timers.get(id.0)
    }

    pub fn get_mut(&mut self, id: TimerId) -> Option<&mut Timer> {
        self.timers.get_mut(id.0)
    }

    pub fn is_ready(&self, id: TimerId, now: Duration) -> bool {
        self.get(id).map(|t| t.is_ready(now)).unwrap_or(true)
    }

    pub fn time_to_ready(&self, id: TimerId, now: Duration) -> Duration {
        self.get(id).map(|t| t.time_to_ready(now)).unwrap_or_default()
    }

    pub fn reset_all(&mut self) {
        for timer in &mut self.timers {
            timer.reset();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timer_ready() {
        let mut timer = Timer::default();
        assert!(timer.is_ready(Duration::ZERO));

        timer.set_ready_at(Duration::from_secs(10));
        assert!(!timer.is_ready(Duration::from_secs(5)));
        assert_eq!(timer.time_to_ready(Duration::from_secs(5)), Duration::from_secs(5));
        assert!(timer.is_ready(Duration::from_secs(10)));
    }

    #[test]
    fn test_timer_reduce() {
        let mut timer = Timer::default();
        timer.set_ready_at(Duration::from_secs(10));
        timer.reduce(Duration::from_secs(2), Duration::from_secs(3));
        assert_eq!(timer.ready_at(), Duration::from_secs(7));

        timer.reduce(Duration::from_secs(6), Duration::from_secs(30));
        assert_eq!(timer.ready_at(), Duration::from_secs(6));
    }

    #[test]
    fn test_named_timers_are_shared() {
        let mut set = TimerSet::new();
        let a = set.named_timer("trinket");
        let b = set.named_timer("trinket");
        let c = set.named_timer("potion");
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(set.lookup("trinket"), Some(a));
    }
}
