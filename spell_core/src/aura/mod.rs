//! Auras - timed, stackable state objects with lifecycle hooks

mod exclusive;
mod hooks;
mod lifecycle;

pub use exclusive::ExclusiveEffect;
pub use hooks::{AuraHooks, HookSet, Hooks, ModifierToggle, NoHooks, StackScaledModifier, StatBonus};

use crate::types::{saturating_secs, AuraId};
use std::collections::HashMap;
use std::time::Duration;

/// How long an aura lasts once activated
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuraDuration {
    Finite(Duration),
    /// Passive and tracking auras that only end on explicit deactivation
    NeverExpires,
}

impl AuraDuration {
    pub fn from_secs_f64(secs: f64) -> Self {
        AuraDuration::Finite(saturating_secs(secs))
    }

    pub fn is_finite(&self) -> bool {
        matches!(self, AuraDuration::Finite(_))
    }
}

/// Input for registering an aura
#[derive(Debug, Clone)]
pub struct AuraConfig {
    /// Unique per owning unit
    pub label: String,
    pub duration: AuraDuration,
    /// 0 for auras without stacks
    pub max_stacks: u32,
    /// Activated by `Simulation::reset`, used by tracking auras
    pub activate_on_reset: bool,
    pub hooks: Hooks,
    pub exclusive: Option<ExclusiveEffect>,
}

impl AuraConfig {
    pub fn new(label: impl Into<String>, duration: AuraDuration) -> Self {
        AuraConfig {
            label: label.into(),
            duration,
            max_stacks: 0,
            activate_on_reset: false,
            hooks: Hooks::default(),
            exclusive: None,
        }
    }

    /// A never-expiring aura activated at reset that only receives events
    pub fn tracking(label: impl Into<String>, hooks: impl AuraHooks + 'static) -> Self {
        AuraConfig {
            label: label.into(),
            duration: AuraDuration::NeverExpires,
            max_stacks: 0,
            activate_on_reset: true,
            hooks: Hooks::new(hooks),
            exclusive: None,
        }
    }

    pub fn with_max_stacks(mut self, max_stacks: u32) -> Self {
        self.max_stacks = max_stacks;
        self
    }

    pub fn with_hooks(mut self, hooks: impl AuraHooks + 'static) -> Self {
        self.hooks = Hooks::new(hooks);
        self
    }

    /// Compete with same-category auras on the owner; only the strongest effect applies
    pub fn with_exclusive(mut self, exclusive: ExclusiveEffect) -> Self {
        self.exclusive = Some(exclusive);
        self
    }

    /// Whether a second registration under the same label describes the same aura
    pub(crate) fn is_compatible(&self, aura: &Aura) -> bool {
        self.duration == aura.duration
            && self.max_stacks == aura.max_stacks
            && self.activate_on_reset == aura.activate_on_reset
            && self.exclusive.as_ref().map(|e| &e.category) == aura.exclusive.as_ref().map(|e| &e.category)
    }
}

/// A registered aura and its runtime state
#[derive(Debug, Clone)]
pub struct Aura {
    pub label: String,
    pub duration: AuraDuration,
    pub max_stacks: u32,
    pub activate_on_reset: bool,
    pub(crate) hooks: Hooks,
    pub(crate) exclusive: Option<ExclusiveEffect>,
    pub(crate) effect_enabled: bool,

    active: bool,
    stacks: u32,
    expires_at: Option<Duration>,
    started_at: Duration,
    /// Bumped on every activation or refresh so superseded expiry events are ignored
    pub(crate) generation: u64,

    gains: u64,
    expirations: u64,
    uptime: Duration,
}

impl Aura {
    pub(crate) fn from_config(config: AuraConfig) -> Self {
        Aura {
            label: config.label,
            duration: config.duration,
            max_stacks: config.max_stacks,
            activate_on_reset: config.activate_on_reset,
            hooks: config.hooks,
            exclusive: config.exclusive,
            effect_enabled: false,
            active: false,
            stacks: 0,
            expires_at: None,
            started_at: Duration::ZERO,
            generation: 0,
            gains: 0,
            expirations: 0,
            uptime: Duration::ZERO,
        }
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn exclusive(&self) -> Option<&ExclusiveEffect> {
        self.exclusive.as_ref()
    }

    /// Whether the aura's exclusive effect currently applies
    pub fn is_effect_enabled(&self) -> bool {
        self.effect_enabled
    }

    pub(crate) fn in_category(&self, category: &str) -> bool {
        self.exclusive.as_ref().map_or(false, |e| e.category == category)
    }

    pub fn stacks(&self) -> u32 {
        self.stacks
    }

    /// `None` while inactive or for never-expiring auras
    pub fn expires_at(&self) -> Option<Duration> {
        self.expires_at
    }

    pub fn remaining(&self, now: Duration) -> Option<Duration> {
        self.expires_at.map(|at| at.saturating_sub(now))
    }

    /// Number of Inactive→Active transitions
    pub fn gains(&self) -> u64 {
        self.gains
    }

    /// Number of on-expire invocations
    pub fn expirations(&self) -> u64 {
        self.expirations
    }

    /// Total time spent active, including the current activation
    pub fn uptime(&self, now: Duration) -> Duration {
        if self.active {
            self.uptime + now.saturating_sub(self.started_at)
        } else {
            self.uptime
        }
    }

    pub(crate) fn mark_gained(&mut self, now: Duration, expires_at: Option<Duration>) {
        self.active = true;
        self.stacks = 0;
        self.started_at = now;
        self.expires_at = expires_at;
        self.generation += 1;
        self.gains += 1;
    }

    pub(crate) fn mark_refreshed(&mut self, expires_at: Option<Duration>) {
        self.expires_at = expires_at;
        self.generation += 1;
    }

    pub(crate) fn mark_expired(&mut self, now: Duration) {
        self.active = false;
        self.expires_at = None;
        self.generation += 1;
        self.expirations += 1;
        self.uptime += now.saturating_sub(self.started_at);
    }

    pub(crate) fn set_stacks_raw(&mut self, stacks: u32) {
        self.stacks = stacks;
    }
}

/// Every aura owned by one unit
#[derive(Debug, Clone, Default)]
pub struct AuraSet {
    auras: Vec<Aura>,
    by_label: HashMap<String, AuraId>,
}

impl AuraSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: AuraId) -> Option<&Aura> {
        self.auras.get(id.0)
    }

    pub(crate) fn get_mut(&mut self, id: AuraId) -> Option<&mut Aura> {
        self.auras.get_mut(id.0)
    }

    pub fn by_label(&self, label: &str) -> Option<AuraId> {
        self.by_label.get(label).copied()
    }

    pub(crate) fn insert(&mut self, aura: Aura) -> AuraId {
        let id = AuraId(self.auras.len());
        self.by_label.insert(aura.label.clone(), id);
        self.auras.push(aura);
        id
    }

    pub fn iter(&self) -> impl Iterator<Item = (AuraId, &Aura)> {
        self.auras.iter().enumerate().map(|(i, a)| (AuraId(i), a))
    }

    /// Ids of active auras in registration order
    pub fn active_ids(&self) -> Vec<AuraId> {
        self.iter()
            .filter(|(_, a)| a.is_active())
            .map(|(id, _)| id)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.auras.len()
    }

    pub fn is_empty(&self) -> bool {
        self.auras.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compatibility() {
        let config = AuraConfig::new("Nightfall", AuraDuration::from_secs_f64(10.0)).with_max_stacks(1);
        let aura = Aura::from_config(config.clone());
        assert!(config.is_compatible(&aura));

        let other = AuraConfig::new("Nightfall", AuraDuration::from_secs_f64(12.0)).with_max_stacks(1);
        assert!(!other.is_compatible(&aura));
    }

    #[test]
    fn test_uptime_accumulates() {
        let mut aura = Aura::from_config(AuraConfig::new("Test", AuraDuration::NeverExpires));
        aura.mark_gained(Duration::from_secs(2), None);
        assert_eq!(aura.uptime(Duration::from_secs(5)), Duration::from_secs(3));
        aura.mark_expired(Duration::from_secs(6));
        aura.mark_gained(Duration::from_secs(10), None);
        aura.mark_expired(Duration::from_secs(11));
        assert_eq!(aura.uptime(Duration::from_secs(20)), Duration::from_secs(5));
        assert_eq!(aura.gains(), 2);
        assert_eq!(aura.expirations(), 2);
    }

    #[test]
    fn test_label_lookup() {
        let mut set = AuraSet::new();
        let id = set.insert(Aura::from_config(AuraConfig::new(
            "Clearcasting",
            AuraDuration::from_secs_f64(15.0),
        )));
        assert_eq!(set.by_label("Clearcasting"), Some(id));
        assert!(set.by_label("Missing").is_none());
        assert!(set.active_ids().is_empty());
    }
}
