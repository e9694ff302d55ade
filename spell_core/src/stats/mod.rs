//! Stat sheet for a unit, built on [`StatValue`]

mod stat_value;

pub use stat_value::{ModKind, StatValue};

use crate::types::SpellSchool;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Character statistics readable by spells and outcome tables
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stat {
    // Attributes
    Strength,
    Agility,
    Stamina,
    Intellect,
    Spirit,
    // Offense
    AttackPower,
    RangedAttackPower,
    SpellPower,
    HealingPower,
    /// Melee crit chance as a fraction (0.05 = 5%)
    MeleeCrit,
    /// Spell crit chance as a fraction
    SpellCrit,
    /// Melee hit bonus as a fraction
    MeleeHit,
    /// Spell hit bonus as a fraction
    SpellHit,
    // Defense
    Armor,
    /// Chance to fully resist a spell, as a fraction
    SpellResistance,
}

impl Stat {
    /// The power stat that scales spells of a school by default
    pub fn power_for_school(school: SpellSchool) -> Stat {
        match school {
            SpellSchool::Physical => Stat::AttackPower,
            _ => Stat::SpellPower,
        }
    }

    /// The crit stat used by spells of a school
    pub fn crit_for_school(school: SpellSchool) -> Stat {
        match school {
            SpellSchool::Physical => Stat::MeleeCrit,
            _ => Stat::SpellCrit,
        }
    }

    /// The hit stat used by spells of a school
    pub fn hit_for_school(school: SpellSchool) -> Stat {
        match school {
            SpellSchool::Physical => Stat::MeleeHit,
            _ => Stat::SpellHit,
        }
    }
}

/// All stats of one unit
///
/// Missing stats read as zero.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StatSheet {
    values: HashMap<Stat, StatValue>,
}

impl StatSheet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder form of [`StatSheet::set_base`]
    pub fn with(mut self, stat: Stat, base: f64) -> Self {
        self.set_base(stat, base);
        self
    }

    /// Current value of a stat with every bonus applied
    pub fn get(&self, stat: Stat) -> f64 {
        self.values.get(&stat).map(StatValue::compute).unwrap_or(0.0)
    }

    pub fn base(&self, stat: Stat) -> f64 {
        self.values.get(&stat).map(|v| v.base).unwrap_or(0.0)
    }

    pub fn set_base(&mut self, stat: Stat, base: f64) {
        self.values.entry(stat).or_default().base = base;
    }

    pub fn add_bonus(&mut self, stat: Stat, kind: ModKind, value: f64) {
        self.values.entry(stat).or_default().add(kind, value);
    }

    /// Remove a bonus added with [`StatSheet::add_bonus`]
    pub fn remove_bonus(&mut self, stat: Stat, kind: ModKind, value: f64) -> bool {
        match self.values.get_mut(&stat) {
            Some(v) => v.remove(kind, value),
            None => false,
        }
    }

    /// Raw container for a stat, if any value was ever set
    pub fn value(&self, stat: Stat) -> Option<&StatValue> {
        self.values.get(&stat)
    }

    /// Drop every bonus, keeping only base values
    pub fn clear_bonuses(&mut self) {
        for value in self.values.values_mut() {
            value.reset_to_base();
        }
    }
}
