//! Spells - registry, definitions and the cast pipeline

mod cast;
mod registry;
mod result;

pub use cast::{CastContext, CastError, CastStatus, GCD_DEFAULT, GCD_MIN};
pub use registry::Spellbook;
pub use result::{SpellMetrics, SpellResult};

use crate::config::ConfigError;
use crate::dot::{Dot, DotConfig};
use crate::stats::Stat;
use crate::timer::Cooldown;
use crate::types::{seconds, ActionId, SpellFlags, SpellId, SpellSchool, UnitId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;

/// Inclusive-exclusive range a base amount is rolled from
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct DamageRange {
    pub min: f64,
    pub max: f64,
}

impl DamageRange {
    pub fn new(min: f64, max: f64) -> Self {
        DamageRange { min, max }
    }

    pub fn fixed(value: f64) -> Self {
        DamageRange {
            min: value,
            max: value,
        }
    }

    pub fn is_zero(&self) -> bool {
        self.min == 0.0 && self.max == 0.0
    }
}

/// Which units a cast affects
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetMode {
    #[default]
    Single,
    /// Every enemy in the simulation
    AllEnemies,
}

/// A spell's own cooldown
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CooldownConfig {
    #[serde(with = "seconds")]
    pub duration: Duration,
}

/// A cooldown on a named timer; spells naming the same timer lock each other out
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SharedCooldownConfig {
    pub timer: String,
    #[serde(with = "seconds")]
    pub duration: Duration,
}

fn default_gcd() -> Duration {
    GCD_DEFAULT
}

fn default_multiplier() -> f64 {
    1.0
}

fn default_crit_multiplier() -> f64 {
    1.5
}

/// Input for registering a spell
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpellConfig {
    pub action_id: ActionId,
    pub label: String,
    pub school: SpellSchool,
    #[serde(default)]
    pub class_mask: u64,
    #[serde(default)]
    pub flags: SpellFlags,
    #[serde(default, with = "seconds")]
    pub cast_time: Duration,
    /// Zero for spells off the global cooldown
    #[serde(default = "default_gcd", with = "seconds")]
    pub gcd: Duration,
    #[serde(default)]
    pub cost: f64,
    #[serde(default)]
    pub base_damage: DamageRange,
    #[serde(default)]
    pub base_healing: DamageRange,
    #[serde(default)]
    pub bonus_coefficient: f64,
    /// Defaults to the school's power stat, or healing power for helpful spells
    #[serde(default)]
    pub scaling_stat: Option<Stat>,
    #[serde(default = "default_multiplier")]
    pub damage_multiplier: f64,
    #[serde(default = "default_multiplier")]
    pub threat_multiplier: f64,
    #[serde(default = "default_crit_multiplier")]
    pub crit_multiplier: f64,
    #[serde(default)]
    pub cooldown: Option<CooldownConfig>,
    /// Checked and started alongside `cooldown`
    #[serde(default)]
    pub shared_cooldown: Option<SharedCooldownConfig>,
    #[serde(default)]
    pub dot: Option<DotConfig>,
    #[serde(default)]
    pub target_mode: TargetMode,
}

impl SpellConfig {
    pub fn new(action_id: ActionId, label: impl Into<String>, school: SpellSchool) -> Self {
        SpellConfig {
            action_id,
            label: label.into(),
            school,
            class_mask: 0,
            flags: SpellFlags::NONE,
            cast_time: Duration::ZERO,
            gcd: GCD_DEFAULT,
            cost: 0.0,
            base_damage: DamageRange::default(),
            base_healing: DamageRange::default(),
            bonus_coefficient: 0.0,
            scaling_stat: None,
            damage_multiplier: 1.0,
            threat_multiplier: 1.0,
            crit_multiplier: 1.5,
            cooldown: None,
            shared_cooldown: None,
            dot: None,
            target_mode: TargetMode::Single,
        }
    }

    pub fn with_class_mask(mut self, class_mask: u64) -> Self {
        self.class_mask = class_mask;
        self
    }

    pub fn with_flags(mut self, flags: SpellFlags) -> Self {
        self.flags = flags;
        self
    }

    pub fn with_cast_time(mut self, cast_time: Duration) -> Self {
        self.cast_time = cast_time;
        self
    }

    pub fn with_gcd(mut self, gcd: Duration) -> Self {
        self.gcd = gcd;
        self
    }

    pub fn with_cost(mut self, cost: f64) -> Self {
        self.cost = cost;
        self
    }

    pub fn with_damage(mut self, min: f64, max: f64) -> Self {
        self.base_damage = DamageRange::new(min, max);
        self
    }

    pub fn with_healing(mut self, min: f64, max: f64) -> Self {
        self.base_healing = DamageRange::new(min, max);
        self.flags = self.flags | SpellFlags::HELPFUL;
        self
    }

    pub fn with_coefficient(mut self, coefficient: f64) -> Self {
        self.bonus_coefficient = coefficient;
        self
    }

    pub fn with_scaling_stat(mut self, stat: Stat) -> Self {
        self.scaling_stat = Some(stat);
        self
    }

    pub fn with_crit_multiplier(mut self, multiplier: f64) -> Self {
        self.crit_multiplier = multiplier;
        self
    }

    pub fn with_cooldown(mut self, duration: Duration) -> Self {
        self.cooldown = Some(CooldownConfig { duration });
        self
    }

    pub fn with_shared_cooldown(mut self, timer: impl Into<String>, duration: Duration) -> Self {
        self.shared_cooldown = Some(SharedCooldownConfig {
            timer: timer.into(),
            duration,
        });
        self
    }

    pub fn with_dot(mut self, dot: DotConfig) -> Self {
        self.dot = Some(dot);
        self
    }

    pub fn with_target_mode(mut self, target_mode: TargetMode) -> Self {
        self.target_mode = target_mode;
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.label.is_empty() {
            return Err(ConfigError::ValidationError(format!(
                "spell {} has an empty label",
                self.action_id
            )));
        }
        if self.cost < 0.0 {
            return Err(ConfigError::ValidationError(format!(
                "{}: cost must not be negative",
                self.label
            )));
        }
        for range in [self.base_damage, self.base_healing] {
            if range.min > range.max || range.min < 0.0 {
                return Err(ConfigError::ValidationError(format!(
                    "{}: invalid base range {}..{}",
                    self.label, range.min, range.max
                )));
            }
        }
        if let Some(dot) = &self.dot {
            dot.validate(&self.label)?;
        }
        Ok(())
    }
}

/// A registered spell and its per-trial state
#[derive(Debug, Clone)]
pub struct Spell {
    pub id: SpellId,
    pub action_id: ActionId,
    pub label: String,
    pub class_mask: u64,
    pub school: SpellSchool,
    pub flags: SpellFlags,
    pub cast_time: Duration,
    pub gcd: Duration,
    pub cost: f64,
    pub base_damage: DamageRange,
    pub base_healing: DamageRange,
    pub bonus_coefficient: f64,
    pub scaling_stat: Stat,
    pub damage_multiplier: f64,
    pub threat_multiplier: f64,
    pub crit_multiplier: f64,
    pub cooldown: Option<Cooldown>,
    pub shared_cooldown: Option<Cooldown>,
    pub dot: Option<DotConfig>,
    pub target_mode: TargetMode,
    pub metrics: SpellMetrics,

    /// Periodic effect instances keyed by target
    pub(crate) dots: BTreeMap<UnitId, Dot>,
}

impl Spell {
    /// Build a spell without cooldown timers; the registry binds timers
    pub fn from_config(id: SpellId, config: SpellConfig) -> Self {
        let helpful = config.flags.matches(SpellFlags::HELPFUL);
        let scaling_stat = config.scaling_stat.unwrap_or(if helpful {
            Stat::HealingPower
        } else {
            Stat::power_for_school(config.school)
        });
        Spell {
            id,
            action_id: config.action_id,
            label: config.label,
            class_mask: config.class_mask,
            school: config.school,
            flags: config.flags,
            cast_time: config.cast_time,
            gcd: config.gcd,
            cost: config.cost,
            base_damage: config.base_damage,
            base_healing: config.base_healing,
            bonus_coefficient: config.bonus_coefficient,
            scaling_stat,
            damage_multiplier: config.damage_multiplier,
            threat_multiplier: config.threat_multiplier,
            crit_multiplier: config.crit_multiplier,
            cooldown: None,
            shared_cooldown: None,
            dot: config.dot,
            target_mode: config.target_mode,
            metrics: SpellMetrics::default(),
            dots: BTreeMap::new(),
        }
    }

    pub fn is_helpful(&self) -> bool {
        self.flags.matches(SpellFlags::HELPFUL)
    }

    pub fn uses_gcd(&self) -> bool {
        !self.gcd.is_zero()
    }

    /// Own and shared cooldowns, in that order
    pub fn cooldowns(&self) -> impl Iterator<Item = Cooldown> {
        self.cooldown.into_iter().chain(self.shared_cooldown)
    }

    pub fn is_channeled(&self) -> bool {
        self.flags.matches(SpellFlags::CHANNELED)
    }

    pub fn is_periodic(&self) -> bool {
        self.dot.is_some()
    }

    /// A periodic-only spell: its cast lands or misses but never crits
    pub fn is_pure_dot(&self) -> bool {
        self.flags.matches(SpellFlags::PURE_DOT) || (self.dot.is_some() && !self.has_direct_component())
    }

    pub fn has_direct_component(&self) -> bool {
        if self.flags.matches(SpellFlags::PURE_DOT) {
            return false;
        }
        let base = if self.is_helpful() {
            self.base_healing
        } else {
            self.base_damage
        };
        !base.is_zero() || self.bonus_coefficient > 0.0
    }

    /// Periodic effect on `target`, if one was ever applied this trial
    pub fn dot_on(&self, target: UnitId) -> Option<&Dot> {
        self.dots.get(&target)
    }

    pub(crate) fn reset(&mut self) {
        self.metrics = SpellMetrics::default();
        self.dots.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_scaling_stat() {
        let bolt = Spell::from_config(
            SpellId(0),
            SpellConfig::new(ActionId::new(133), "Fireball", SpellSchool::Fire).with_damage(10.0, 20.0),
        );
        assert_eq!(bolt.scaling_stat, Stat::SpellPower);
        assert!(bolt.has_direct_component());

        let heal = Spell::from_config(
            SpellId(1),
            SpellConfig::new(ActionId::new(2050), "Lesser Heal", SpellSchool::Holy).with_healing(50.0, 60.0),
        );
        assert!(heal.is_helpful());
        assert_eq!(heal.scaling_stat, Stat::HealingPower);

        let strike = Spell::from_config(
            SpellId(2),
            SpellConfig::new(ActionId::new(78), "Heroic Strike", SpellSchool::Physical).with_damage(11.0, 11.0),
        );
        assert_eq!(strike.scaling_stat, Stat::AttackPower);
    }

    #[test]
    fn test_validation() {
        let bad = SpellConfig::new(ActionId::new(1), "Broken", SpellSchool::Arcane).with_damage(20.0, 10.0);
        assert!(matches!(bad.validate(), Err(ConfigError::ValidationError(_))));

        let good = SpellConfig::new(ActionId::new(1), "Fine", SpellSchool::Arcane).with_damage(10.0, 20.0);
        assert!(good.validate().is_ok());
    }

    #[test]
    fn test_parse_spell_toml() {
        let config: SpellConfig = crate::config::parse_toml(
            r#"
label = "Immolate"
school = "fire"
cast_time = 2.0
cost = 380.0
bonus_coefficient = 0.2

[action_id]
spell_id = 348
rank = 8

[base_damage]
min = 279.0
max = 279.0

[dot]
number_of_ticks = 5
tick_length = 3.0
base_tick = 102.0
bonus_coefficient = 0.13
"#,
        )
        .unwrap();
        assert_eq!(config.action_id, ActionId::new(348).with_rank(8));
        assert_eq!(config.cast_time, Duration::from_secs(2));
        assert_eq!(config.gcd, GCD_DEFAULT);
        let dot = config.dot.as_ref().unwrap();
        assert_eq!(dot.number_of_ticks, 5);
        assert!(dot.snapshot);
        assert!(config.validate().is_ok());
    }
}
