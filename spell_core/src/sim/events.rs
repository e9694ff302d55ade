//! Event dispatch to aura hooks and proc triggers
//!
//! Auras see an event before proc triggers do. Only auras active when the
//! event is raised receive it, and an aura deactivated by an earlier hook in
//! the same dispatch is skipped.

use super::Simulation;
use crate::aura::AuraHooks;
use crate::procs::ProcEvent;
use crate::spell::SpellResult;
use crate::types::{AuraRef, SpellFlags, SpellRef, UnitId};

impl Simulation {
    fn for_each_active_aura(
        &mut self,
        unit: UnitId,
        mut f: impl FnMut(&mut Simulation, &dyn AuraHooks, AuraRef),
    ) {
        let ids = match self.unit(unit) {
            Some(u) => u.auras.active_ids(),
            None => return,
        };
        for id in ids {
            let hooks = match self.units[unit.0].auras.get(id) {
                Some(aura) if aura.is_active() => aura.hooks.handle(),
                _ => continue,
            };
            f(self, hooks.as_ref(), AuraRef::new(unit, id));
        }
    }

    fn spell_triggers_procs(&self, spell: SpellRef) -> bool {
        self.spell(spell)
            .map(|s| !s.flags.matches(SpellFlags::NO_PROCS))
            .unwrap_or(false)
    }

    pub(crate) fn emit_cast_complete(&mut self, spell: SpellRef) {
        self.for_each_active_aura(spell.unit, |sim, hooks, aura| {
            hooks.on_cast_complete(sim, aura, spell)
        });
        if self.spell_triggers_procs(spell) {
            self.dispatch_procs(spell.unit, ProcEvent::CastComplete, spell, None);
        }
    }

    /// Direct outcome of a cast against one target
    pub(crate) fn emit_spell_result(&mut self, result: &SpellResult) {
        let caster = result.spell.unit;
        let procs = self.spell_triggers_procs(result.spell);
        let helpful = self.spell(result.spell).map(|s| s.is_helpful()).unwrap_or(false);

        if helpful {
            self.for_each_active_aura(caster, |sim, hooks, aura| {
                hooks.on_heal_dealt(sim, aura, result)
            });
            if procs {
                self.dispatch_procs(caster, ProcEvent::HealDealt, result.spell, Some(result));
            }
            return;
        }

        self.for_each_active_aura(caster, |sim, hooks, aura| {
            hooks.on_spell_hit_dealt(sim, aura, result)
        });
        self.for_each_active_aura(result.target, |sim, hooks, aura| {
            hooks.on_spell_hit_taken(sim, aura, result)
        });
        if procs {
            self.dispatch_procs(caster, ProcEvent::SpellHitDealt, result.spell, Some(result));
            self.dispatch_procs(result.target, ProcEvent::SpellHitTaken, result.spell, Some(result));
        }
    }

    /// One periodic tick
    pub(crate) fn emit_periodic_result(&mut self, result: &SpellResult) {
        let caster = result.spell.unit;
        let procs = self.spell_triggers_procs(result.spell);
        let helpful = self.spell(result.spell).map(|s| s.is_helpful()).unwrap_or(false);

        if helpful {
            self.for_each_active_aura(caster, |sim, hooks, aura| {
                hooks.on_heal_dealt(sim, aura, result)
            });
            if procs {
                self.dispatch_procs(caster, ProcEvent::HealDealt, result.spell, Some(result));
            }
        } else {
            self.for_each_active_aura(caster, |sim, hooks, aura| {
                hooks.on_periodic_damage_dealt(sim, aura, result)
            });
            if procs {
                self.dispatch_procs(
                    caster,
                    ProcEvent::PeriodicDamageDealt,
                    result.spell,
                    Some(result),
                );
            }
        }
    }
}
