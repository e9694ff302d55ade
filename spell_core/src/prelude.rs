//! Prelude module for convenient imports
//!
//! ```rust
//! use spell_core::prelude::*;
//! ```

// Simulation
pub use crate::sim::{OutcomeResolver, Simulation, TableOutcomeResolver, Unit};

// Spells
pub use crate::spell::{CastContext, CastError, CastStatus, SpellConfig, SpellResult};

// Auras
pub use crate::aura::{AuraConfig, AuraDuration, AuraHooks, ExclusiveEffect, HookSet, ModifierToggle, StackScaledModifier, StatBonus};

// Periodic effects
pub use crate::dot::{DotConfig, RolloverPolicy, TickOutcome};

// Modifiers and stats
pub use crate::modifier::{ModTarget, ModifierConfig, SpellSelector};
pub use crate::stats::{ModKind, Stat, StatSheet};

// Procs
pub use crate::procs::{OutcomeFilter, ProcChance, ProcContext, ProcEvent, ProcTrigger};

// Core identifiers
pub use crate::types::{ActionId, AuraRef, HitOutcome, ModifierRef, SpellFlags, SpellRef, SpellSchool, UnitId, UnitKind};
