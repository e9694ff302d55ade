//! Cast pipeline
//!
//! Checks run in a fixed order: target, hardcast or channel, cooldowns,
//! global cooldown, resource. Nothing is committed until every check passes.

use super::{SpellResult, TargetMode};
use crate::modifier::ModTarget;
use crate::sim::{roll_chance, Hardcast, Simulation};
use crate::stats::Stat;
use crate::types::{HitOutcome, SpellRef, UnitId};
use rand::Rng;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, trace};

/// Global cooldown of a spell that does not set its own
pub const GCD_DEFAULT: Duration = Duration::from_millis(1500);

/// Floor applied to a triggered global cooldown after modifiers
pub const GCD_MIN: Duration = Duration::from_secs(1);

/// Why a cast was rejected. Nothing was spent.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CastError {
    #[error("Spell is on cooldown for another {remaining:?}")]
    OnCooldown { remaining: Duration },
    #[error("Global cooldown active for another {remaining:?}")]
    OnGlobalCooldown { remaining: Duration },
    #[error("Not enough resource: {required} required, {available} available")]
    InsufficientResource { required: f64, available: f64 },
    #[error("Invalid target")]
    InvalidTarget,
    #[error("Already casting until {until:?}")]
    Busy { until: Duration },
    #[error("Unknown spell")]
    UnknownSpell,
}

/// Accepted cast
#[derive(Debug, Clone, PartialEq)]
pub enum CastStatus {
    /// Instant cast, effects already applied
    Completed(Vec<SpellResult>),
    /// Effects apply when the cast completes
    Casting { completes_at: Duration },
}

/// Per-call adjustments passed through the pipeline instead of mutating
/// shared spell fields
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CastContext {
    /// Extra multiplier on direct damage and healing
    pub damage_multiplier: f64,
}

impl Default for CastContext {
    fn default() -> Self {
        CastContext {
            damage_multiplier: 1.0,
        }
    }
}

impl Simulation {
    pub fn cast(&mut self, spell: SpellRef, target: UnitId) -> Result<CastStatus, CastError> {
        self.cast_with_context(spell, target, CastContext::default())
    }

    pub fn cast_with_context(
        &mut self,
        spell_ref: SpellRef,
        target: UnitId,
        context: CastContext,
    ) -> Result<CastStatus, CastError> {
        let now = self.now();
        let caster = self.unit(spell_ref.unit).ok_or(CastError::UnknownSpell)?;
        let spell = caster
            .spellbook
            .get(spell_ref.spell)
            .ok_or(CastError::UnknownSpell)?;

        let target_unit = self.unit(target).ok_or(CastError::InvalidTarget)?;
        if !target_unit.is_alive() || (!spell.is_helpful() && target == spell_ref.unit) {
            return Err(CastError::InvalidTarget);
        }

        let cast_time = caster
            .modifiers
            .resolve_duration(spell.cast_time, spell, ModTarget::CastTime);
        if let Some(hardcast) = &caster.hardcast {
            if spell.uses_gcd() || !cast_time.is_zero() {
                return Err(CastError::Busy {
                    until: hardcast.completes_at,
                });
            }
        }
        if let Some(channel) = caster.channel.filter(|c| c.until > now) {
            return Err(CastError::Busy { until: channel.until });
        }

        let cooling = spell
            .cooldowns()
            .filter(|cd| !caster.timers.is_ready(cd.timer, now))
            .map(|cd| caster.timers.time_to_ready(cd.timer, now))
            .max();
        if let Some(remaining) = cooling {
            return Err(CastError::OnCooldown { remaining });
        }

        if spell.uses_gcd() && !caster.timers.is_ready(caster.gcd, now) {
            return Err(CastError::OnGlobalCooldown {
                remaining: caster.timers.time_to_ready(caster.gcd, now),
            });
        }

        let cost = caster
            .modifiers
            .resolve(spell.cost, spell, &[ModTarget::Cost])
            .max(0.0);
        if cost > 0.0 && cost > caster.resource.current {
            return Err(CastError::InsufficientResource {
                required: cost,
                available: caster.resource.current,
            });
        }

        // Modifiers scale the spell's own cooldown; a shared lockout is fixed
        let own = spell.cooldown.map(|cd| {
            let duration = caster
                .modifiers
                .resolve_duration(cd.duration, spell, ModTarget::Cooldown);
            (cd.timer, duration)
        });
        let shared = spell.shared_cooldown.map(|cd| (cd.timer, cd.duration));
        let gcd = spell.uses_gcd().then(|| {
            caster
                .modifiers
                .resolve_duration(spell.gcd, spell, ModTarget::GlobalCooldown)
                .max(GCD_MIN)
        });
        let label = spell.label.clone();

        // Commit
        let caster = &mut self.units[spell_ref.unit.0];
        caster.resource.spend(cost);
        for (timer, duration) in own.into_iter().chain(shared) {
            if let Some(t) = caster.timers.get_mut(timer) {
                t.set_ready_at(now + cast_time + duration);
            }
        }
        if let Some(gcd) = gcd {
            let timer = caster.gcd;
            if let Some(t) = caster.timers.get_mut(timer) {
                t.set_ready_at(now + gcd);
            }
        }
        if let Some(spell) = caster.spellbook.get_mut(spell_ref.spell) {
            spell.metrics.casts += 1;
        }

        if cast_time.is_zero() {
            debug!(unit = spell_ref.unit.0, spell = %label, target = target.0, "cast");
            let results = self.finish_cast(spell_ref, target, context);
            return Ok(CastStatus::Completed(results));
        }

        let completes_at = now + cast_time;
        caster.hardcast_generation += 1;
        let generation = caster.hardcast_generation;
        caster.hardcast = Some(Hardcast {
            spell: spell_ref.spell,
            target,
            completes_at,
            context,
            generation,
        });
        debug!(unit = spell_ref.unit.0, spell = %label, ?completes_at, "cast started");
        self.schedule_at(completes_at, move |sim| {
            sim.complete_hardcast(spell_ref.unit, generation);
        });
        Ok(CastStatus::Casting { completes_at })
    }

    /// Abandon the current hardcast or channel. Spent resource and cooldowns are not refunded.
    ///
    /// An interrupted channel cancels its periodic effects; ticks already dealt stand.
    pub fn interrupt_cast(&mut self, unit: UnitId) -> bool {
        let (hardcast, channel) = match self.unit_mut(unit) {
            Some(u) => {
                let hardcast = u.hardcast.take().is_some();
                if hardcast {
                    u.hardcast_generation += 1;
                }
                (hardcast, u.channel.take())
            }
            None => return false,
        };
        if hardcast {
            debug!(unit = unit.0, "cast interrupted");
        }
        if let Some(channel) = channel {
            let spell = SpellRef::new(unit, channel.spell);
            let targets: Vec<UnitId> = self
                .spell(spell)
                .map(|s| s.dots.iter().filter(|(_, d)| d.is_active()).map(|(t, _)| *t).collect())
                .unwrap_or_default();
            for target in targets {
                self.cancel_dot(spell, target);
            }
            debug!(unit = unit.0, "channel interrupted");
        }
        hardcast || channel.is_some()
    }

    /// Earliest time the spell passes its cooldown, global cooldown, hardcast and channel checks
    pub fn ready_at(&self, spell_ref: SpellRef) -> Option<Duration> {
        let caster = self.unit(spell_ref.unit)?;
        let spell = caster.spellbook.get(spell_ref.spell)?;
        let mut ready = self.now();
        for cooldown in spell.cooldowns() {
            if let Some(timer) = caster.timers.get(cooldown.timer) {
                ready = ready.max(timer.ready_at());
            }
        }
        if spell.uses_gcd() {
            if let Some(timer) = caster.timers.get(caster.gcd) {
                ready = ready.max(timer.ready_at());
            }
        }
        if let Some(until) = caster.busy_until() {
            ready = ready.max(until);
        }
        Some(ready)
    }

    fn complete_hardcast(&mut self, unit: UnitId, generation: u64) {
        let hardcast = match self.unit_mut(unit) {
            Some(u) => match u.hardcast {
                Some(h) if h.generation == generation => {
                    u.hardcast = None;
                    h
                }
                _ => return,
            },
            None => return,
        };
        self.finish_cast(SpellRef::new(unit, hardcast.spell), hardcast.target, hardcast.context);
    }

    /// Apply a cast's effects to every affected target, then emit its events
    pub(crate) fn finish_cast(
        &mut self,
        spell_ref: SpellRef,
        target: UnitId,
        context: CastContext,
    ) -> Vec<SpellResult> {
        let (mode, aoe_dot) = match self.spell(spell_ref) {
            Some(spell) => (
                spell.target_mode,
                spell.dot.as_ref().map(|d| d.aoe),
            ),
            None => return Vec::new(),
        };
        let targets = match mode {
            TargetMode::Single => vec![target],
            TargetMode::AllEnemies => self.enemies(),
        };

        let mut results = Vec::with_capacity(targets.len());
        for t in targets {
            let result = self.resolve_spell_effect(spell_ref, t, context);
            if aoe_dot == Some(false) && result.landed() {
                self.apply_dot(spell_ref, t);
            }
            results.push(result);
        }
        if aoe_dot == Some(true) && results.iter().any(SpellResult::landed) {
            self.apply_dot(spell_ref, target);
        }

        self.emit_cast_complete(spell_ref);
        for result in &results {
            self.emit_spell_result(result);
        }
        results
    }

    /// Roll the outcome and apply direct damage or healing to one target
    fn resolve_spell_effect(
        &mut self,
        spell_ref: SpellRef,
        target: UnitId,
        context: CastContext,
    ) -> SpellResult {
        let caster = &self.units[spell_ref.unit.0];
        let spell = match caster.spellbook.get(spell_ref.spell) {
            Some(s) => s,
            None => return unresolved(spell_ref, target),
        };
        let helpful = spell.is_helpful();
        let crit_bonus = caster.modifiers.resolve(0.0, spell, &[ModTarget::CritChance]);

        let mut outcome = if helpful {
            let chance = caster.stats.get(Stat::crit_for_school(spell.school)) + crit_bonus;
            if roll_chance(&mut self.rng, chance) {
                HitOutcome::Crit
            } else {
                HitOutcome::Hit
            }
        } else {
            self.resolver.resolve_hit_outcome(
                &mut self.rng,
                caster,
                &self.units[target.0],
                spell.school,
                crit_bonus,
            )
        };
        if spell.is_pure_dot() && outcome == HitOutcome::Crit {
            outcome = HitOutcome::Hit;
        }

        let mut amount = 0.0;
        if outcome.landed() && spell.has_direct_component() {
            let range = if helpful { spell.base_healing } else { spell.base_damage };
            let scaling = caster.stats.get(spell.scaling_stat);
            let coefficient = spell.bonus_coefficient;
            let targets: &[ModTarget] = if helpful {
                &[ModTarget::Healing]
            } else {
                &[ModTarget::Damage, ModTarget::ImpactDamage]
            };
            let crit_multiplier = caster
                .modifiers
                .resolve(spell.crit_multiplier, spell, &[ModTarget::CritMultiplier]);

            let base = if range.max > range.min {
                self.rng.gen_range(range.min..range.max)
            } else {
                range.min
            };
            amount = caster
                .modifiers
                .resolve(base + coefficient * scaling, spell, targets)
                * spell.damage_multiplier
                * context.damage_multiplier;
            if outcome.is_crit() {
                amount *= crit_multiplier;
            }
            amount = amount.max(0.0);
        }

        let threat = if helpful {
            0.0
        } else {
            caster
                .modifiers
                .resolve(spell.threat_multiplier, spell, &[ModTarget::Threat])
                * amount
        };
        let source = caster.name.clone();

        let (damage, healing) = if helpful { (0.0, amount) } else { (amount, 0.0) };
        if healing > 0.0 {
            self.gain_health(target, healing, &source);
        }
        if damage > 0.0 {
            self.take_damage(target, damage);
        }

        let result = SpellResult {
            spell: spell_ref,
            target,
            outcome,
            damage,
            healing,
            threat,
            periodic: false,
        };
        if let Some(spell) = self.spell_mut(spell_ref) {
            spell.metrics.record(&result);
        }
        trace!(unit = spell_ref.unit.0, target = target.0, ?outcome, damage, healing, "spell resolved");
        result
    }
}

fn unresolved(spell: SpellRef, target: UnitId) -> SpellResult {
    SpellResult {
        spell,
        target,
        outcome: HitOutcome::Miss,
        damage: 0.0,
        healing: 0.0,
        threat: 0.0,
        periodic: false,
    }
}
