//! Running periodic effect instances

use crate::types::{AuraId, UnitId};
use std::time::Duration;

/// Magnitude captured when a snapshotting effect is applied
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DotSnapshot {
    pub per_tick: f64,
    pub crit_chance: f64,
}

/// One periodic effect instance on one target
#[derive(Debug, Clone)]
pub struct Dot {
    pub target: UnitId,
    /// Backing aura on the target
    pub aura: AuraId,
    pub(crate) remaining_ticks: u32,
    pub(crate) ticks_done: u32,
    pub(crate) tick_length: Duration,
    pub(crate) next_tick_at: Option<Duration>,
    pub(crate) snapshot: Option<DotSnapshot>,
    pub(crate) active: bool,
    /// Bumped on every fresh application and cancel so stale ticks are dropped
    pub(crate) generation: u64,
}

impl Dot {
    pub(crate) fn new(target: UnitId, aura: AuraId, tick_length: Duration) -> Self {
        Dot {
            target,
            aura,
            remaining_ticks: 0,
            ticks_done: 0,
            tick_length,
            next_tick_at: None,
            snapshot: None,
            active: false,
            generation: 0,
        }
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn remaining_ticks(&self) -> u32 {
        self.remaining_ticks
    }

    /// Scheduled ticks resolved since the last fresh application
    pub fn ticks_done(&self) -> u32 {
        self.ticks_done
    }

    pub fn tick_length(&self) -> Duration {
        self.tick_length
    }

    pub fn next_tick_at(&self) -> Option<Duration> {
        self.next_tick_at
    }

    /// `None` for effects that recompute every tick
    pub fn snapshot(&self) -> Option<DotSnapshot> {
        self.snapshot
    }

    /// Time of the last remaining tick
    pub fn expires_at(&self) -> Option<Duration> {
        let next = self.next_tick_at?;
        if self.remaining_ticks == 0 {
            return None;
        }
        Some(next + self.tick_length * (self.remaining_ticks - 1))
    }

    pub(crate) fn stop(&mut self) {
        self.active = false;
        self.remaining_ticks = 0;
        self.next_tick_at = None;
        self.generation += 1;
    }
}
