//! spell_core - Spell, aura and periodic effect engine for combat simulation
//!
//! This library provides:
//! - Simulation: discrete-event clock, seeded RNG and units for one trial
//! - Spells: registry and cast pipeline with cooldowns and resources
//! - Auras: timed, stackable state with lifecycle hooks
//! - Periodic effects: snapshotted or dynamic damage and healing over time
//! - Modifier stack: composable adjustments resolved in a fixed order
//! - Procs and pets, plus a parallel trial runner

pub mod aura;
pub mod config;
pub mod dot;
pub mod modifier;
pub mod pet;
pub mod prelude;
pub mod procs;
pub mod sim;
pub mod spell;
pub mod stats;
pub mod timer;
pub mod types;

// Re-export core types for convenience
pub use aura::{Aura, AuraConfig, AuraDuration, AuraHooks, ExclusiveEffect, Hooks};
pub use config::{ConfigError, SimConfig};
pub use dot::{Dot, DotConfig, RolloverPolicy, TickOutcome};
pub use modifier::{ModTarget, ModifierConfig, SpellSelector};
pub use procs::{OutcomeFilter, ProcChance, ProcContext, ProcEvent, ProcTrigger};
pub use sim::{run_trials, OutcomeResolver, Simulation, TrialReport, Unit};
pub use spell::{CastContext, CastError, CastStatus, Spell, SpellConfig, SpellResult};
pub use stats::{ModKind, Stat, StatSheet, StatValue};
pub use types::{ActionId, AuraRef, HitOutcome, ModifierRef, SpellFlags, SpellRef, SpellSchool, UnitId, UnitKind};
