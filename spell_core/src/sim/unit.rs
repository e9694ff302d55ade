//! Units - casters, targets and pets

use crate::aura::AuraSet;
use crate::modifier::ModifierStack;
use crate::pet::PetState;
use crate::procs::ProcState;
use crate::spell::{CastContext, Spellbook};
use crate::stats::StatSheet;
use crate::timer::TimerSet;
use crate::types::{SpellId, TimerId, UnitId, UnitKind};
use std::collections::BTreeMap;
use std::time::Duration;

/// A bounded pool such as mana or health
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResourcePool {
    pub current: f64,
    pub max: f64,
    /// Amount credited per source id
    pub gains: BTreeMap<String, f64>,
}

impl ResourcePool {
    pub fn new(max: f64) -> Self {
        ResourcePool {
            current: max,
            max,
            gains: BTreeMap::new(),
        }
    }

    /// Spend `amount` if available
    pub fn spend(&mut self, amount: f64) -> bool {
        if amount > self.current {
            return false;
        }
        self.current -= amount;
        true
    }

    /// Credit the pool up to its maximum. Returns the amount actually gained.
    pub fn add(&mut self, amount: f64, source: &str) -> f64 {
        let gained = amount.min(self.max - self.current).max(0.0);
        self.current += gained;
        *self.gains.entry(source.to_string()).or_insert(0.0) += gained;
        gained
    }

    /// Remove up to `amount`. Returns the amount actually removed.
    pub fn drain(&mut self, amount: f64) -> f64 {
        let removed = amount.min(self.current).max(0.0);
        self.current -= removed;
        removed
    }

    pub fn reset(&mut self) {
        self.current = self.max;
        self.gains.clear();
    }
}

/// A cast in progress
#[derive(Debug, Clone, Copy)]
pub struct Hardcast {
    pub spell: SpellId,
    pub target: UnitId,
    pub completes_at: Duration,
    pub(crate) context: CastContext,
    pub(crate) generation: u64,
}

/// A channeled spell holding its caster until the last tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Channel {
    pub spell: SpellId,
    pub target: UnitId,
    pub until: Duration,
}

/// One combatant and everything it owns
#[derive(Debug)]
pub struct Unit {
    pub id: UnitId,
    pub name: String,
    pub kind: UnitKind,
    pub stats: StatSheet,
    /// Mana-equivalent resource
    pub resource: ResourcePool,
    pub health: ResourcePool,
    /// Preferred target for autonomous behaviour
    pub current_target: Option<UnitId>,

    pub(crate) spellbook: Spellbook,
    pub(crate) auras: AuraSet,
    pub(crate) timers: TimerSet,
    pub(crate) gcd: TimerId,
    pub(crate) modifiers: ModifierStack,
    pub(crate) procs: Vec<ProcState>,
    pub(crate) hardcast: Option<Hardcast>,
    pub(crate) hardcast_generation: u64,
    pub(crate) channel: Option<Channel>,
    pub(crate) pet: Option<PetState>,

    pub damage_taken: f64,
    pub healing_taken: f64,
}

impl Unit {
    pub(crate) fn new(id: UnitId, name: String, kind: UnitKind, stats: StatSheet) -> Self {
        let mut timers = TimerSet::new();
        let gcd = timers.new_timer();
        Unit {
            id,
            name,
            kind,
            stats,
            resource: ResourcePool::default(),
            health: ResourcePool::default(),
            current_target: None,
            spellbook: Spellbook::new(),
            auras: AuraSet::new(),
            timers,
            gcd,
            modifiers: ModifierStack::new(),
            procs: Vec::new(),
            hardcast: None,
            hardcast_generation: 0,
            channel: None,
            pet: None,
            damage_taken: 0.0,
            healing_taken: 0.0,
        }
    }

    pub fn spellbook(&self) -> &Spellbook {
        &self.spellbook
    }

    pub fn auras(&self) -> &AuraSet {
        &self.auras
    }

    pub fn timers(&self) -> &TimerSet {
        &self.timers
    }

    pub fn modifiers(&self) -> &ModifierStack {
        &self.modifiers
    }

    pub fn gcd_timer(&self) -> TimerId {
        self.gcd
    }

    pub fn hardcast(&self) -> Option<&Hardcast> {
        self.hardcast.as_ref()
    }

    pub fn channel(&self) -> Option<&Channel> {
        self.channel.as_ref()
    }

    /// Hardcasting or channeling
    pub fn is_casting(&self) -> bool {
        self.hardcast.is_some() || self.channel.is_some()
    }

    /// When the current hardcast or channel releases the unit
    pub fn busy_until(&self) -> Option<Duration> {
        let hardcast = self.hardcast.map(|h| h.completes_at);
        let channel = self.channel.map(|c| c.until);
        hardcast.max(channel)
    }

    pub fn pet_state(&self) -> Option<&PetState> {
        self.pet.as_ref()
    }

    /// Number of times each proc trigger has fired, in registration order
    pub fn proc_counts(&self) -> Vec<(&str, u64)> {
        self.procs
            .iter()
            .map(|p| (p.trigger.name.as_str(), p.procs))
            .collect()
    }

    pub fn is_alive(&self) -> bool {
        self.health.max <= 0.0 || self.health.current > 0.0
    }

    /// Total damage dealt by this unit's spells
    pub fn damage_done(&self) -> f64 {
        self.spellbook.iter().map(|s| s.metrics.damage).sum()
    }

    pub fn healing_done(&self) -> f64 {
        self.spellbook.iter().map(|s| s.metrics.healing).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pool_spend() {
        let mut pool = ResourcePool::new(100.0);
        assert!(pool.spend(60.0));
        assert!(!pool.spend(50.0));
        assert!((pool.current - 40.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_pool_add_clamps_and_tracks_source() {
        let mut pool = ResourcePool::new(100.0);
        pool.spend(30.0);
        let gained = pool.add(50.0, "Mana Spring");
        assert!((gained - 30.0).abs() < f64::EPSILON);
        assert!((pool.current - 100.0).abs() < f64::EPSILON);
        assert!((pool.gains["Mana Spring"] - 30.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_pool_drain() {
        let mut pool = ResourcePool::new(50.0);
        assert!((pool.drain(80.0) - 50.0).abs() < f64::EPSILON);
        assert_eq!(pool.current, 0.0);
    }
}
