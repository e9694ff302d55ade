//! Modifier stack - composable spell adjustments from talents, runes and set bonuses
//!
//! Every modifier is a named entry that can be toggled on and off. Effective
//! values are computed on demand from the base value and the currently active
//! entries, so there is never any in-place multiplier arithmetic to undo.
//!
//! Resolution order is fixed:
//!
//! 1. base value
//! 2. plus the sum of every active [`ModKind::FlatAdd`]
//! 3. times `1 + Σ` of every active [`ModKind::PercentAdd`]
//! 4. times `Π(1 + v)` of every active [`ModKind::PercentMultiply`]

use crate::spell::Spell;
use crate::stats::{ModKind, StatValue};
use crate::types::{saturating_secs, ModifierId, SpellFlags, SpellSchool};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Spell property a modifier adjusts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModTarget {
    /// All damage, direct and periodic
    Damage,
    /// Direct damage only
    ImpactDamage,
    /// Periodic damage only
    PeriodicDamage,
    /// Direct and periodic healing
    Healing,
    /// Resource cost
    Cost,
    /// Cast time, in seconds
    CastTime,
    /// Cooldown duration, in seconds
    Cooldown,
    /// Global cooldown triggered by the spell, in seconds
    GlobalCooldown,
    /// Added crit chance (fraction)
    CritChance,
    /// Crit damage multiplier
    CritMultiplier,
    /// Threat multiplier
    Threat,
    /// Number of periodic ticks
    DotTicks,
}

/// Which spells a modifier applies to
///
/// Every populated field must match. An empty selector matches every spell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SpellSelector {
    /// Bitmask of class spell masks; 0 matches any spell
    #[serde(default)]
    pub class_mask: u64,
    #[serde(default)]
    pub school: Option<SpellSchool>,
    /// Spell must carry at least one of these flags
    #[serde(default)]
    pub flags: SpellFlags,
    /// Spell must carry none of these flags
    #[serde(default)]
    pub exclude_flags: SpellFlags,
}

impl SpellSelector {
    /// Selector matching every spell
    pub fn all() -> Self {
        Self::default()
    }

    pub fn class_mask(mask: u64) -> Self {
        SpellSelector {
            class_mask: mask,
            ..Self::default()
        }
    }

    pub fn school(school: SpellSchool) -> Self {
        SpellSelector {
            school: Some(school),
            ..Self::default()
        }
    }

    pub fn matches(&self, spell: &Spell) -> bool {
        if self.class_mask != 0 && spell.class_mask & self.class_mask == 0 {
            return false;
        }
        if let Some(school) = self.school {
            if spell.school != school {
                return false;
            }
        }
        if self.flags != SpellFlags::NONE && !spell.flags.matches(self.flags) {
            return false;
        }
        if self.exclude_flags != SpellFlags::NONE && spell.flags.matches(self.exclude_flags) {
            return false;
        }
        true
    }
}

/// Input for registering a modifier
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModifierConfig {
    /// Name shown in logs (e.g. "Improved Shadow Bolt")
    pub name: String,
    #[serde(default)]
    pub selector: SpellSelector,
    pub target: ModTarget,
    pub kind: ModKind,
    pub value: f64,
}

impl ModifierConfig {
    pub fn new(name: impl Into<String>, target: ModTarget, kind: ModKind, value: f64) -> Self {
        ModifierConfig {
            name: name.into(),
            selector: SpellSelector::all(),
            target,
            kind,
            value,
        }
    }

    pub fn with_selector(mut self, selector: SpellSelector) -> Self {
        self.selector = selector;
        self
    }
}

/// A registered modifier
#[derive(Debug, Clone)]
pub struct SpellModifier {
    pub name: String,
    pub selector: SpellSelector,
    pub target: ModTarget,
    pub kind: ModKind,
    value: f64,
    active: bool,
}

impl SpellModifier {
    pub fn value(&self) -> f64 {
        self.value
    }

    pub fn is_active(&self) -> bool {
        self.active
    }
}

/// All modifiers owned by a unit
#[derive(Debug, Clone, Default)]
pub struct ModifierStack {
    modifiers: Vec<SpellModifier>,
}

impl ModifierStack {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a modifier in the inactive state
    pub fn add(&mut self, config: ModifierConfig) -> ModifierId {
        let id = ModifierId(self.modifiers.len());
        self.modifiers.push(SpellModifier {
            name: config.name,
            selector: config.selector,
            target: config.target,
            kind: config.kind,
            value: config.value,
            active: false,
        });
        id
    }

    pub fn get(&self, id: ModifierId) -> Option<&SpellModifier> {
        self.modifiers.get(id.0)
    }

    /// Turn a modifier on. Returns true if its state changed.
    pub fn activate(&mut self, id: ModifierId) -> bool {
        match self.modifiers.get_mut(id.0) {
            Some(m) if !m.active => {
                m.active = true;
                true
            }
            _ => false,
        }
    }

    /// Turn a modifier off. Returns true if its state changed.
    pub fn deactivate(&mut self, id: ModifierId) -> bool {
        match self.modifiers.get_mut(id.0) {
            Some(m) if m.active => {
                m.active = false;
                true
            }
            _ => false,
        }
    }

    /// Replace a modifier's value, keeping its active state
    pub fn update_value(&mut self, id: ModifierId, value: f64) {
        if let Some(m) = self.modifiers.get_mut(id.0) {
            m.value = value;
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &SpellModifier> {
        self.modifiers.iter()
    }

    pub fn len(&self) -> usize {
        self.modifiers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modifiers.is_empty()
    }

    /// Collect every active modifier that applies to `spell` for any of `targets`
    pub fn collect(&self, base: f64, spell: &Spell, targets: &[ModTarget]) -> StatValue {
        let mut value = StatValue::with_base(base);
        if spell.flags.matches(SpellFlags::NO_MODIFIERS) {
            return value;
        }
        for m in self
            .modifiers
            .iter()
            .filter(|m| m.active && targets.contains(&m.target) && m.selector.matches(spell))
        {
            value.add(m.kind, m.value);
        }
        value
    }

    /// Effective value of a spell property
    pub fn resolve(&self, base: f64, spell: &Spell, targets: &[ModTarget]) -> f64 {
        self.collect(base, spell, targets).compute()
    }

    /// Effective duration of a time-valued spell property, clamped to `0..=MAX_DURATION`
    pub fn resolve_duration(&self, base: Duration, spell: &Spell, target: ModTarget) -> Duration {
        saturating_secs(self.resolve(base.as_secs_f64(), spell, &[target]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spell::SpellConfig;
    use crate::types::ActionId;

    fn shadow_bolt() -> Spell {
        let config = SpellConfig::new(ActionId::new(686), "Shadow Bolt", SpellSchool::Shadow)
            .with_class_mask(1 << 2);
        Spell::from_config(crate::types::SpellId(0), config)
    }

    fn composition_mods() -> Vec<ModifierConfig> {
        vec![
            ModifierConfig::new("flat", ModTarget::Damage, ModKind::FlatAdd, 10.0),
            ModifierConfig::new("pct", ModTarget::Damage, ModKind::PercentAdd, 0.20),
            ModifierConfig::new("mult", ModTarget::Damage, ModKind::PercentMultiply, 0.10),
        ]
    }

    #[test]
    fn test_resolution_order_independent_of_registration() {
        let spell = shadow_bolt();
        let orders: [[usize; 3]; 6] = [
            [0, 1, 2],
            [0, 2, 1],
            [1, 0, 2],
            [1, 2, 0],
            [2, 0, 1],
            [2, 1, 0],
        ];

        for order in orders {
            let configs = composition_mods();
            let mut stack = ModifierStack::new();
            for idx in order {
                let id = stack.add(configs[idx].clone());
                stack.activate(id);
            }
            let value = stack.resolve(100.0, &spell, &[ModTarget::Damage]);
            assert!((value - 145.2).abs() < 1e-9, "order {:?} gave {}", order, value);
        }
    }

    #[test]
    fn test_activation_is_idempotent() {
        let spell = shadow_bolt();
        let mut stack = ModifierStack::new();
        let id = stack.add(ModifierConfig::new(
            "Shadow Mastery",
            ModTarget::Damage,
            ModKind::PercentAdd,
            0.10,
        ));

        assert!(stack.activate(id));
        assert!(!stack.activate(id));
        let value = stack.resolve(100.0, &spell, &[ModTarget::Damage]);
        assert!((value - 110.0).abs() < 1e-9);

        assert!(stack.deactivate(id));
        assert!(!stack.deactivate(id));
        let value = stack.resolve(100.0, &spell, &[ModTarget::Damage]);
        assert!((value - 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_selector_filters() {
        let spell = shadow_bolt();
        let mut stack = ModifierStack::new();
        let fire = stack.add(
            ModifierConfig::new("fire only", ModTarget::Damage, ModKind::PercentAdd, 0.5)
                .with_selector(SpellSelector::school(SpellSchool::Fire)),
        );
        let masked = stack.add(
            ModifierConfig::new("warlock", ModTarget::Damage, ModKind::PercentAdd, 0.25)
                .with_selector(SpellSelector::class_mask(1 << 2)),
        );
        stack.activate(fire);
        stack.activate(masked);

        let value = stack.resolve(100.0, &spell, &[ModTarget::Damage]);
        assert!((value - 125.0).abs() < 1e-9);
    }

    #[test]
    fn test_duration_clamps_at_zero() {
        let spell = shadow_bolt();
        let mut stack = ModifierStack::new();
        let id = stack.add(ModifierConfig::new(
            "instant",
            ModTarget::CastTime,
            ModKind::FlatAdd,
            -5.0,
        ));
        stack.activate(id);
        let cast = stack.resolve_duration(Duration::from_secs(3), &spell, ModTarget::CastTime);
        assert_eq!(cast, Duration::ZERO);
    }

    #[test]
    fn test_duration_clamps_at_max() {
        let spell = shadow_bolt();
        let mut stack = ModifierStack::new();
        let id = stack.add(ModifierConfig::new(
            "endless",
            ModTarget::CastTime,
            ModKind::PercentMultiply,
            1e300,
        ));
        stack.activate(id);
        let cast = stack.resolve_duration(Duration::from_secs(3), &spell, ModTarget::CastTime);
        assert_eq!(cast, crate::types::MAX_DURATION);
    }

    #[test]
    fn test_targets_are_separate() {
        let spell = shadow_bolt();
        let mut stack = ModifierStack::new();
        let id = stack.add(ModifierConfig::new(
            "cheap",
            ModTarget::Cost,
            ModKind::PercentAdd,
            -0.5,
        ));
        stack.activate(id);
        assert!((stack.resolve(100.0, &spell, &[ModTarget::Damage]) - 100.0).abs() < 1e-9);
        assert!((stack.resolve(100.0, &spell, &[ModTarget::Cost]) - 50.0).abs() < 1e-9);
    }
}
