//! Simulation - one trial's clock, RNG and units
//!
//! All state of a trial lives in a single [`Simulation`] and is mutated on one
//! logical timeline. Independent trials each get their own simulation (see
//! [`trials`]).

mod events;
mod outcome;
mod scheduler;
pub mod trials;
mod unit;

pub use outcome::{OutcomeResolver, TableOutcomeResolver};
pub use scheduler::{Action, Scheduler};
pub use trials::{run_trials, Distribution, TrialReport, TrialSummary};
pub use unit::{Channel, Hardcast, ResourcePool, Unit};

pub(crate) use outcome::roll_chance;

use crate::config::{ConfigError, UnitConfig};
use crate::modifier::ModifierConfig;
use crate::stats::StatSheet;
use crate::types::{ModifierRef, UnitId, UnitKind};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::rc::Rc;
use std::time::Duration;
use tracing::{debug, warn};

/// Callback run at the end of every [`Simulation::reset`]
pub type ResetHook = Rc<dyn Fn(&mut Simulation)>;

/// Upper bound on passes made by [`Simulation::finish`] when expire hooks
/// keep activating other auras
const MAX_FINISH_PASSES: usize = 8;

/// State of one simulation trial
pub struct Simulation {
    pub(crate) scheduler: Scheduler,
    pub(crate) rng: ChaCha8Rng,
    pub(crate) units: Vec<Unit>,
    pub(crate) resolver: Box<dyn OutcomeResolver>,
    pub(crate) proc_depth: u32,
    reset_hooks: Vec<ResetHook>,
    seed: u64,
}

impl std::fmt::Debug for Simulation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Simulation")
            .field("seed", &self.seed)
            .field("scheduler", &self.scheduler)
            .field("units", &self.units.len())
            .finish()
    }
}

impl Simulation {
    /// Create an empty simulation with the default outcome table
    pub fn new(seed: u64) -> Self {
        Simulation {
            scheduler: Scheduler::new(),
            rng: ChaCha8Rng::seed_from_u64(seed),
            units: Vec::new(),
            resolver: Box::new(TableOutcomeResolver::default()),
            proc_depth: 0,
            reset_hooks: Vec::new(),
            seed,
        }
    }

    pub fn with_resolver(mut self, resolver: impl OutcomeResolver + 'static) -> Self {
        self.resolver = Box::new(resolver);
        self
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    // === Clock ===

    pub fn now(&self) -> Duration {
        self.scheduler.now()
    }

    pub fn schedule_at(&mut self, at: Duration, action: impl FnOnce(&mut Simulation) + 'static) {
        self.scheduler.schedule(at, Box::new(action));
    }

    /// Schedule relative to now. A zero delay runs after everything already
    /// queued for the current instant.
    pub fn schedule_after(
        &mut self,
        delay: Duration,
        action: impl FnOnce(&mut Simulation) + 'static,
    ) {
        let at = self.now() + delay;
        self.schedule_at(at, action);
    }

    /// Execute every action due up to and including `end`, then move the clock to `end`
    pub fn run_until(&mut self, end: Duration) {
        while let Some(action) = self.scheduler.pop_due(end) {
            action(self);
        }
        self.scheduler.advance_to(end);
    }

    /// Advance the clock by `delta`
    pub fn advance(&mut self, delta: Duration) {
        let end = self.now() + delta;
        self.run_until(end);
    }

    // === Randomness ===

    /// Uniform roll in `[low, high)`; returns `low` for an empty range
    pub fn roll_uniform(&mut self, low: f64, high: f64) -> f64 {
        if high <= low {
            return low;
        }
        self.rng.gen_range(low..high)
    }

    /// True with probability `p`. Certain outcomes draw no random number.
    pub fn roll_chance(&mut self, p: f64) -> bool {
        roll_chance(&mut self.rng, p)
    }

    // === Units ===

    pub fn add_unit(&mut self, name: impl Into<String>, kind: UnitKind, stats: StatSheet) -> UnitId {
        let id = UnitId(self.units.len());
        let name = name.into();
        debug!(unit = id.0, name = %name, ?kind, "unit added");
        self.units.push(Unit::new(id, name, kind, stats));
        id
    }

    pub fn add_player(&mut self, name: impl Into<String>, stats: StatSheet, resource: f64) -> UnitId {
        let id = self.add_unit(name, UnitKind::Player, stats);
        self.units[id.0].resource = ResourcePool::new(resource);
        id
    }

    pub fn add_enemy(&mut self, name: impl Into<String>, health: f64) -> UnitId {
        let id = self.add_unit(name, UnitKind::Enemy, StatSheet::new());
        self.units[id.0].health = ResourcePool::new(health);
        id
    }

    /// Add a unit described by configuration
    pub fn add_unit_from_config(&mut self, config: &UnitConfig) -> UnitId {
        let id = self.add_unit(config.name.clone(), config.kind, config.stat_sheet());
        let unit = &mut self.units[id.0];
        unit.resource = ResourcePool::new(config.resource);
        unit.health = ResourcePool::new(config.health);
        id
    }

    pub fn unit(&self, id: UnitId) -> Option<&Unit> {
        self.units.get(id.0)
    }

    pub fn unit_mut(&mut self, id: UnitId) -> Option<&mut Unit> {
        self.units.get_mut(id.0)
    }

    pub fn units(&self) -> &[Unit] {
        &self.units
    }

    pub(crate) fn require_unit(&self, id: UnitId) -> Result<&Unit, ConfigError> {
        self.units.get(id.0).ok_or(ConfigError::UnknownUnit(id))
    }

    pub(crate) fn require_unit_mut(&mut self, id: UnitId) -> Result<&mut Unit, ConfigError> {
        self.units.get_mut(id.0).ok_or(ConfigError::UnknownUnit(id))
    }

    /// Every enemy unit, in creation order
    pub fn enemies(&self) -> Vec<UnitId> {
        self.units
            .iter()
            .filter(|u| u.kind == UnitKind::Enemy)
            .map(|u| u.id)
            .collect()
    }

    /// The first enemy unit, used by autonomous behaviour without an explicit target
    pub fn primary_target(&self) -> Option<UnitId> {
        self.units.iter().find(|u| u.kind == UnitKind::Enemy).map(|u| u.id)
    }

    // === Resources ===

    /// Credit a unit's own resource pool. Returns the amount gained.
    pub fn add_resource(&mut self, unit: UnitId, amount: f64, source: &str) -> f64 {
        match self.units.get_mut(unit.0) {
            Some(u) => u.resource.add(amount, source),
            None => 0.0,
        }
    }

    /// Credit `to`'s pool on behalf of `from`. `from`'s pool is never touched.
    pub fn grant_resource(&mut self, from: UnitId, to: UnitId, amount: f64) -> f64 {
        let source = match self.unit(from) {
            Some(u) => u.name.clone(),
            None => return 0.0,
        };
        self.add_resource(to, amount, &source)
    }

    pub fn gain_health(&mut self, unit: UnitId, amount: f64, source: &str) -> f64 {
        match self.units.get_mut(unit.0) {
            Some(u) => {
                let gained = u.health.add(amount, source);
                u.healing_taken += amount;
                gained
            }
            None => 0.0,
        }
    }

    pub fn take_damage(&mut self, unit: UnitId, amount: f64) {
        if let Some(u) = self.units.get_mut(unit.0) {
            u.health.drain(amount);
            u.damage_taken += amount;
        }
    }

    // === Modifiers ===

    /// Register a dynamic modifier, initially inactive
    pub fn add_modifier(
        &mut self,
        unit: UnitId,
        config: ModifierConfig,
    ) -> Result<ModifierRef, ConfigError> {
        let owner = self.require_unit_mut(unit)?;
        let id = owner.modifiers.add(config);
        Ok(ModifierRef::new(unit, id))
    }

    /// Register a modifier that stays active for the unit's lifetime
    pub fn add_static_modifier(
        &mut self,
        unit: UnitId,
        config: ModifierConfig,
    ) -> Result<ModifierRef, ConfigError> {
        let modifier = self.add_modifier(unit, config)?;
        self.activate_modifier(modifier);
        Ok(modifier)
    }

    /// Idempotent: activating an active modifier changes nothing
    pub fn activate_modifier(&mut self, modifier: ModifierRef) -> bool {
        match self.units.get_mut(modifier.unit.0) {
            Some(u) => u.modifiers.activate(modifier.modifier),
            None => false,
        }
    }

    pub fn deactivate_modifier(&mut self, modifier: ModifierRef) -> bool {
        match self.units.get_mut(modifier.unit.0) {
            Some(u) => u.modifiers.deactivate(modifier.modifier),
            None => false,
        }
    }

    pub fn update_modifier_value(&mut self, modifier: ModifierRef, value: f64) {
        if let Some(u) = self.units.get_mut(modifier.unit.0) {
            u.modifiers.update_value(modifier.modifier, value);
        }
    }

    pub fn is_modifier_active(&self, modifier: ModifierRef) -> bool {
        self.unit(modifier.unit)
            .and_then(|u| u.modifiers.get(modifier.modifier))
            .map(|m| m.is_active())
            .unwrap_or(false)
    }

    // === Lifecycle ===

    /// Register a callback run at the end of every reset, e.g. to start a rotation loop
    pub fn on_reset(&mut self, hook: impl Fn(&mut Simulation) + 'static) {
        self.reset_hooks.push(Rc::new(hook));
    }

    /// Prepare for a new trial
    ///
    /// Force-expires anything still active, rewinds the clock, refills pools,
    /// readies every timer and activates tracking auras.
    pub fn reset(&mut self) {
        self.finish();
        self.scheduler.clear();
        self.proc_depth = 0;

        for unit in &mut self.units {
            unit.timers.reset_all();
            unit.resource.reset();
            unit.health.reset();
            unit.hardcast = None;
            unit.channel = None;
            unit.damage_taken = 0.0;
            unit.healing_taken = 0.0;
            for trigger in &mut unit.procs {
                trigger.reset();
            }
            for spell in unit.spellbook.iter_mut() {
                spell.reset();
            }
        }

        self.reset_auras();

        let hooks = self.reset_hooks.clone();
        for hook in hooks {
            hook(self);
        }
    }

    /// End the trial: cancel periodic effects, disable pets and force-expire
    /// every aura so gains and expirations are paired
    pub fn finish(&mut self) {
        self.cancel_all_dots();
        let pets: Vec<UnitId> = self
            .units
            .iter()
            .filter(|u| u.pet.is_some())
            .map(|u| u.id)
            .collect();
        for pet in pets {
            self.disable_pet(pet);
        }

        for pass in 0..MAX_FINISH_PASSES {
            let mut expired_any = false;
            for idx in 0..self.units.len() {
                expired_any |= self.deactivate_all_auras(UnitId(idx)) > 0;
            }
            if !expired_any {
                return;
            }
            if pass + 1 == MAX_FINISH_PASSES {
                warn!("auras still being activated by expire hooks after {} passes", MAX_FINISH_PASSES);
            }
        }
    }
}
