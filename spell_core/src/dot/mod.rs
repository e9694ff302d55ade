//! Periodic effects (damage and healing over time)
//!
//! A periodic effect is owned by one (spell, target) pair and is backed by an
//! aura on the target. Applying it again while it runs is a rollover: the
//! tick phase is kept and the remaining tick count starts over.

mod active;
mod tick;

pub use active::{Dot, DotSnapshot};

use crate::aura::{AuraHooks, Hooks};
use crate::config::ConfigError;
use crate::types::seconds;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Whether a rollover recomputes a snapshotted magnitude
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RolloverPolicy {
    #[default]
    Resnapshot,
    /// Keep the magnitude captured at first application
    Preserve,
}

/// How each tick's outcome is decided
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TickOutcome {
    #[default]
    AlwaysHit,
    /// Crit roll against the snapshotted crit chance
    HitOrCrit,
    /// Full outcome roll through the outcome resolver
    Rolled,
}

fn default_snapshot() -> bool {
    true
}

/// Periodic component of a spell
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DotConfig {
    /// Aura label on the target; the spell label when unset
    #[serde(default)]
    pub label: Option<String>,
    pub number_of_ticks: u32,
    #[serde(with = "seconds")]
    pub tick_length: Duration,
    #[serde(default)]
    pub base_tick: f64,
    #[serde(default)]
    pub bonus_coefficient: f64,
    /// Capture the per-tick magnitude at application instead of every tick
    #[serde(default = "default_snapshot")]
    pub snapshot: bool,
    #[serde(default)]
    pub rollover: RolloverPolicy,
    /// One extra tick immediately on fresh application
    #[serde(default)]
    pub tick_on_apply: bool,
    #[serde(default)]
    pub tick_outcome: TickOutcome,
    /// Applied to every enemy at once
    #[serde(default)]
    pub aoe: bool,
    #[serde(skip)]
    pub hooks: Hooks,
}

impl DotConfig {
    pub fn new(number_of_ticks: u32, tick_length: Duration) -> Self {
        DotConfig {
            label: None,
            number_of_ticks,
            tick_length,
            base_tick: 0.0,
            bonus_coefficient: 0.0,
            snapshot: true,
            rollover: RolloverPolicy::Resnapshot,
            tick_on_apply: false,
            tick_outcome: TickOutcome::AlwaysHit,
            aoe: false,
            hooks: Hooks::default(),
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn with_tick(mut self, base_tick: f64, bonus_coefficient: f64) -> Self {
        self.base_tick = base_tick;
        self.bonus_coefficient = bonus_coefficient;
        self
    }

    /// Recompute the magnitude on every tick
    pub fn dynamic(mut self) -> Self {
        self.snapshot = false;
        self
    }

    pub fn with_rollover(mut self, rollover: RolloverPolicy) -> Self {
        self.rollover = rollover;
        self
    }

    pub fn with_tick_on_apply(mut self) -> Self {
        self.tick_on_apply = true;
        self
    }

    pub fn with_tick_outcome(mut self, tick_outcome: TickOutcome) -> Self {
        self.tick_outcome = tick_outcome;
        self
    }

    pub fn with_aoe(mut self) -> Self {
        self.aoe = true;
        self
    }

    /// Hooks installed on the backing aura of every instance
    pub fn with_hooks(mut self, hooks: impl AuraHooks + 'static) -> Self {
        self.hooks = Hooks::new(hooks);
        self
    }

    /// Nominal duration before tick-count modifiers
    pub fn duration(&self) -> Duration {
        self.tick_length * self.number_of_ticks
    }

    pub fn validate(&self, spell: &str) -> Result<(), ConfigError> {
        if self.number_of_ticks == 0 {
            return Err(ConfigError::ValidationError(format!(
                "{}: periodic effect needs at least one tick",
                spell
            )));
        }
        if self.tick_length.is_zero() {
            return Err(ConfigError::ValidationError(format!(
                "{}: tick length must be positive",
                spell
            )));
        }
        Ok(())
    }
}
