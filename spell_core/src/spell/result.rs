//! Spell outcomes and per-spell metrics

use crate::types::{HitOutcome, SpellRef, UnitId};
use serde::{Deserialize, Serialize};

/// Outcome of one spell effect against one target
#[derive(Debug, Clone, PartialEq)]
pub struct SpellResult {
    pub spell: SpellRef,
    pub target: UnitId,
    pub outcome: HitOutcome,
    pub damage: f64,
    pub healing: f64,
    pub threat: f64,
    /// Produced by a periodic tick rather than a cast
    pub periodic: bool,
}

impl SpellResult {
    pub fn landed(&self) -> bool {
        self.outcome.landed()
    }

    pub fn is_crit(&self) -> bool {
        self.outcome.is_crit()
    }
}

/// Counters accumulated by one spell during a trial
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SpellMetrics {
    pub casts: u64,
    pub hits: u64,
    pub crits: u64,
    pub misses: u64,
    pub resists: u64,
    pub ticks: u64,
    pub damage: f64,
    pub healing: f64,
    pub threat: f64,
}

impl SpellMetrics {
    pub fn record(&mut self, result: &SpellResult) {
        if result.periodic {
            self.ticks += 1;
        }
        match result.outcome {
            HitOutcome::Hit => self.hits += 1,
            HitOutcome::Crit => {
                self.hits += 1;
                self.crits += 1;
            }
            HitOutcome::Miss => self.misses += 1,
            HitOutcome::Resist => self.resists += 1,
        }
        self.damage += result.damage;
        self.healing += result.healing;
        self.threat += result.threat;
    }

    pub fn merge(&mut self, other: &SpellMetrics) {
        self.casts += other.casts;
        self.hits += other.hits;
        self.crits += other.crits;
        self.misses += other.misses;
        self.resists += other.resists;
        self.ticks += other.ticks;
        self.damage += other.damage;
        self.healing += other.healing;
        self.threat += other.threat;
    }

    pub fn crit_rate(&self) -> f64 {
        if self.hits == 0 {
            return 0.0;
        }
        self.crits as f64 / self.hits as f64
    }
}
