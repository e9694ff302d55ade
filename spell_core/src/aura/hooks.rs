//! Aura hook points
//!
//! Content attaches behaviour to an aura by implementing [`AuraHooks`]. Every
//! method has an empty default so an implementation only names the hook
//! points it cares about.

use crate::sim::Simulation;
use crate::spell::SpellResult;
use crate::stats::{ModKind, Stat};
use crate::types::{AuraRef, ModifierRef, SpellRef};
use std::fmt;
use std::rc::Rc;

/// Lifecycle and event callbacks of an aura
///
/// Gain and expire are paired one to one per activation. Side effects made in
/// `on_gain` on other spells or units must be reversed by the same
/// implementation in `on_expire`; the engine does not undo them.
pub trait AuraHooks {
    /// Called for every registered aura when the simulation resets
    fn on_reset(&self, _sim: &mut Simulation, _aura: AuraRef) {}

    /// Inactive → Active only, never on a refresh
    fn on_gain(&self, _sim: &mut Simulation, _aura: AuraRef) {}

    /// Active → Inactive, at most once per activation
    fn on_expire(&self, _sim: &mut Simulation, _aura: AuraRef) {}

    fn on_stacks_change(&self, _sim: &mut Simulation, _aura: AuraRef, _old: u32, _new: u32) {}

    /// Owner finished casting a spell
    fn on_cast_complete(&self, _sim: &mut Simulation, _aura: AuraRef, _spell: SpellRef) {}

    /// Owner's spell resolved a direct outcome against a target
    fn on_spell_hit_dealt(&self, _sim: &mut Simulation, _aura: AuraRef, _result: &SpellResult) {}

    /// A spell resolved a direct outcome against the owner
    fn on_spell_hit_taken(&self, _sim: &mut Simulation, _aura: AuraRef, _result: &SpellResult) {}

    /// Owner's periodic damage effect ticked
    fn on_periodic_damage_dealt(
        &self,
        _sim: &mut Simulation,
        _aura: AuraRef,
        _result: &SpellResult,
    ) {
    }

    /// Owner healed a target, directly or periodically
    fn on_heal_dealt(&self, _sim: &mut Simulation, _aura: AuraRef, _result: &SpellResult) {}
}

/// Hooks that do nothing
#[derive(Debug, Clone, Copy, Default)]
pub struct NoHooks;

impl AuraHooks for NoHooks {}

/// Shared handle to an aura's hook implementation
#[derive(Clone)]
pub struct Hooks(Rc<dyn AuraHooks>);

impl Hooks {
    pub fn new(hooks: impl AuraHooks + 'static) -> Self {
        Hooks(Rc::new(hooks))
    }

    /// A clone of the handle that can be called while the simulation is borrowed mutably
    pub(crate) fn handle(&self) -> Rc<dyn AuraHooks> {
        Rc::clone(&self.0)
    }
}

impl Default for Hooks {
    fn default() -> Self {
        Hooks::new(NoHooks)
    }
}

impl fmt::Debug for Hooks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Hooks(..)")
    }
}

/// Turns modifiers on while the aura is active
#[derive(Debug, Clone, Default)]
pub struct ModifierToggle {
    pub modifiers: Vec<ModifierRef>,
}

impl ModifierToggle {
    pub fn new(modifiers: Vec<ModifierRef>) -> Self {
        ModifierToggle { modifiers }
    }
}

impl AuraHooks for ModifierToggle {
    fn on_gain(&self, sim: &mut Simulation, _aura: AuraRef) {
        for m in &self.modifiers {
            sim.activate_modifier(*m);
        }
    }

    fn on_expire(&self, sim: &mut Simulation, _aura: AuraRef) {
        for m in &self.modifiers {
            sim.deactivate_modifier(*m);
        }
    }
}

/// Keeps a modifier's value at `per_stack × stacks`, active while stacks > 0
#[derive(Debug, Clone, Copy)]
pub struct StackScaledModifier {
    pub modifier: ModifierRef,
    pub per_stack: f64,
}

impl AuraHooks for StackScaledModifier {
    fn on_stacks_change(&self, sim: &mut Simulation, _aura: AuraRef, _old: u32, new: u32) {
        sim.update_modifier_value(self.modifier, self.per_stack * new as f64);
        if new > 0 {
            sim.activate_modifier(self.modifier);
        } else {
            sim.deactivate_modifier(self.modifier);
        }
    }

    fn on_expire(&self, sim: &mut Simulation, _aura: AuraRef) {
        sim.deactivate_modifier(self.modifier);
    }
}

/// Grants a stat bonus to the aura's owner while active
#[derive(Debug, Clone, Copy)]
pub struct StatBonus {
    pub stat: Stat,
    pub kind: ModKind,
    pub value: f64,
}

impl AuraHooks for StatBonus {
    fn on_gain(&self, sim: &mut Simulation, aura: AuraRef) {
        if let Some(unit) = sim.unit_mut(aura.unit) {
            unit.stats.add_bonus(self.stat, self.kind, self.value);
        }
    }

    fn on_expire(&self, sim: &mut Simulation, aura: AuraRef) {
        if let Some(unit) = sim.unit_mut(aura.unit) {
            unit.stats.remove_bonus(self.stat, self.kind, self.value);
        }
    }
}

/// Several hook implementations invoked in order
#[derive(Debug, Clone, Default)]
pub struct HookSet(pub Vec<Hooks>);

impl HookSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, hooks: impl AuraHooks + 'static) -> Self {
        self.0.push(Hooks::new(hooks));
        self
    }
}

impl AuraHooks for HookSet {
    fn on_reset(&self, sim: &mut Simulation, aura: AuraRef) {
        for h in &self.0 {
            h.0.on_reset(sim, aura);
        }
    }

    fn on_gain(&self, sim: &mut Simulation, aura: AuraRef) {
        for h in &self.0 {
            h.0.on_gain(sim, aura);
        }
    }

    fn on_expire(&self, sim: &mut Simulation, aura: AuraRef) {
        for h in &self.0 {
            h.0.on_expire(sim, aura);
        }
    }

    fn on_stacks_change(&self, sim: &mut Simulation, aura: AuraRef, old: u32, new: u32) {
        for h in &self.0 {
            h.0.on_stacks_change(sim, aura, old, new);
        }
    }

    fn on_cast_complete(&self, sim: &mut Simulation, aura: AuraRef, spell: SpellRef) {
        for h in &self.0 {
            h.0.on_cast_complete(sim, aura, spell);
        }
    }

    fn on_spell_hit_dealt(&self, sim: &mut Simulation, aura: AuraRef, result: &SpellResult) {
        for h in &self.0 {
            h.0.on_spell_hit_dealt(sim, aura, result);
        }
    }

    fn on_spell_hit_taken(&self, sim: &mut Simulation, aura: AuraRef, result: &SpellResult) {
        for h in &self.0 {
            h.0.on_spell_hit_taken(sim, aura, result);
        }
    }

    fn on_periodic_damage_dealt(&self, sim: &mut Simulation, aura: AuraRef, result: &SpellResult) {
        for h in &self.0 {
            h.0.on_periodic_damage_dealt(sim, aura, result);
        }
    }

    fn on_heal_dealt(&self, sim: &mut Simulation, aura: AuraRef, result: &SpellResult) {
        for h in &self.0 {
            h.0.on_heal_dealt(sim, aura, result);
        }
    }
}
