//! Applying, rolling over, ticking and cancelling periodic effects

use super::{Dot, DotConfig, DotSnapshot, RolloverPolicy, TickOutcome};
use crate::aura::{AuraConfig, AuraDuration};
use crate::config::ConfigError;
use crate::modifier::ModTarget;
use crate::sim::{roll_chance, Channel, Simulation, Unit};
use crate::spell::{Spell, SpellResult};
use crate::stats::Stat;
use crate::types::{AuraRef, HitOutcome, SpellRef, UnitId};
use std::time::Duration;
use tracing::{debug, trace, warn};

/// Per-tick magnitude and crit chance from the caster's current state
fn snapshot_for(caster: &Unit, spell: &Spell, config: &DotConfig) -> DotSnapshot {
    let scaling = caster.stats.get(spell.scaling_stat);
    let raw = config.base_tick + config.bonus_coefficient * scaling;
    let targets: &[ModTarget] = if spell.is_helpful() {
        &[ModTarget::Healing]
    } else {
        &[ModTarget::Damage, ModTarget::PeriodicDamage]
    };
    let per_tick = caster.modifiers.resolve(raw, spell, targets) * spell.damage_multiplier;
    let crit_chance = caster.stats.get(Stat::crit_for_school(spell.school))
        + caster.modifiers.resolve(0.0, spell, &[ModTarget::CritChance]);
    DotSnapshot {
        per_tick: per_tick.max(0.0),
        crit_chance,
    }
}

impl Simulation {
    /// Start the spell's periodic effect on `target`, or roll it over if running
    ///
    /// Area effects are applied to every enemy regardless of `target`.
    /// Returns false when the spell has no periodic component.
    pub fn apply_dot(&mut self, spell: SpellRef, target: UnitId) -> bool {
        let config = match self.spell(spell).and_then(|s| s.dot.clone()) {
            Some(c) => c,
            None => return false,
        };
        if config.aoe {
            let enemies = self.enemies();
            for enemy in &enemies {
                self.apply_dot_to(spell, *enemy, &config);
            }
            !enemies.is_empty()
        } else {
            self.apply_dot_to(spell, target, &config)
        }
    }

    pub fn dot(&self, spell: SpellRef, target: UnitId) -> Option<&Dot> {
        self.spell(spell)?.dots.get(&target)
    }

    pub fn is_dot_active(&self, spell: SpellRef, target: UnitId) -> bool {
        self.dot(spell, target).map(Dot::is_active).unwrap_or(false)
    }

    /// Stop a running effect. Future ticks are dropped and on_expire fires;
    /// no partial tick is dealt.
    pub fn cancel_dot(&mut self, spell: SpellRef, target: UnitId) -> bool {
        let aura = match self.spell_mut(spell).and_then(|s| s.dots.get_mut(&target)) {
            Some(dot) if dot.active => {
                dot.stop();
                AuraRef::new(target, dot.aura)
            }
            _ => return false,
        };
        debug!(unit = spell.unit.0, target = target.0, "periodic effect cancelled");
        self.end_channel(spell);
        self.deactivate_aura(aura);
        true
    }

    /// Hold the caster of a channeled spell until `until`
    fn hold_channel(&mut self, spell_ref: SpellRef, target: UnitId, until: Option<Duration>) {
        let channeled = self.spell(spell_ref).map(Spell::is_channeled).unwrap_or(false);
        if let (true, Some(until)) = (channeled, until) {
            if let Some(caster) = self.unit_mut(spell_ref.unit) {
                caster.channel = Some(Channel {
                    spell: spell_ref.spell,
                    target,
                    until,
                });
                trace!(unit = spell_ref.unit.0, ?until, "channeling");
            }
        }
    }

    fn end_channel(&mut self, spell_ref: SpellRef) {
        if let Some(caster) = self.unit_mut(spell_ref.unit) {
            if caster.channel.map(|c| c.spell) == Some(spell_ref.spell) {
                caster.channel = None;
            }
        }
    }

    pub(crate) fn cancel_all_dots(&mut self) {
        let mut running = Vec::new();
        for unit in &self.units {
            for spell in unit.spellbook.iter() {
                for (target, dot) in &spell.dots {
                    if dot.active {
                        running.push((SpellRef::new(unit.id, spell.id), *target));
                    }
                }
            }
        }
        for (spell, target) in running {
            self.cancel_dot(spell, target);
        }
    }

    fn ensure_dot_aura(
        &mut self,
        spell_ref: SpellRef,
        target: UnitId,
        config: &DotConfig,
    ) -> Result<AuraRef, ConfigError> {
        let spell = self.spell(spell_ref).ok_or(ConfigError::UnknownUnit(spell_ref.unit))?;
        let label = format!(
            "{} [{}]",
            config.label.as_deref().unwrap_or(&spell.label),
            spell_ref.unit.0
        );
        self.register_aura(
            target,
            AuraConfig {
                hooks: config.hooks.clone(),
                ..AuraConfig::new(label, AuraDuration::NeverExpires)
            },
        )
    }

    fn resolved_ticks(&self, spell_ref: SpellRef, config: &DotConfig) -> u32 {
        let caster = match self.unit(spell_ref.unit) {
            Some(u) => u,
            None => return config.number_of_ticks,
        };
        match caster.spellbook.get(spell_ref.spell) {
            Some(spell) => caster
                .modifiers
                .resolve(config.number_of_ticks as f64, spell, &[ModTarget::DotTicks])
                .round()
                .max(1.0) as u32,
            None => config.number_of_ticks,
        }
    }

    fn current_snapshot(&self, spell_ref: SpellRef, config: &DotConfig) -> Option<DotSnapshot> {
        let caster = self.unit(spell_ref.unit)?;
        let spell = caster.spellbook.get(spell_ref.spell)?;
        Some(snapshot_for(caster, spell, config))
    }

    fn apply_dot_to(&mut self, spell_ref: SpellRef, target: UnitId, config: &DotConfig) -> bool {
        let aura = match self.ensure_dot_aura(spell_ref, target, config) {
            Ok(aura) => aura,
            Err(err) => {
                warn!(error = %err, "periodic effect aura unavailable");
                return false;
            }
        };
        let ticks = self.resolved_ticks(spell_ref, config);
        let running = self.is_dot_active(spell_ref, target) && self.is_aura_active(aura);
        if running {
            self.roll_over_dot(spell_ref, target, aura, ticks, config);
            return true;
        }

        let snapshot = if config.snapshot {
            self.current_snapshot(spell_ref, config)
        } else {
            None
        };
        let tick_length = config.tick_length;
        let next = self.now() + tick_length;
        let generation = match self.spell_mut(spell_ref) {
            Some(spell) => {
                let dot = spell
                    .dots
                    .entry(target)
                    .or_insert_with(|| Dot::new(target, aura.aura, tick_length));
                dot.generation += 1;
                dot.active = true;
                dot.aura = aura.aura;
                dot.remaining_ticks = ticks;
                dot.ticks_done = 0;
                dot.tick_length = tick_length;
                dot.next_tick_at = Some(next);
                dot.snapshot = snapshot;
                dot.generation
            }
            None => return false,
        };

        debug!(unit = spell_ref.unit.0, target = target.0, ticks, "periodic effect applied");
        self.schedule_at(next, move |sim| sim.process_dot_tick(spell_ref, target, generation));
        let expires_at = next + tick_length * (ticks - 1);
        self.hold_channel(spell_ref, target, Some(expires_at));
        self.start_aura(aura, Some(expires_at), false);
        if config.tick_on_apply {
            self.resolve_dot_tick(spell_ref, target);
        }
        true
    }

    /// Keep the tick phase, restart the tick count and apply the rollover policy
    fn roll_over_dot(
        &mut self,
        spell_ref: SpellRef,
        target: UnitId,
        aura: AuraRef,
        ticks: u32,
        config: &DotConfig,
    ) {
        let resnapshot = match (config.snapshot, config.rollover) {
            (true, RolloverPolicy::Resnapshot) => self.current_snapshot(spell_ref, config),
            _ => None,
        };
        let expires_at = match self.spell_mut(spell_ref).and_then(|s| s.dots.get_mut(&target)) {
            Some(dot) => {
                debug_assert!(dot.active, "rollover of an inactive periodic effect");
                dot.remaining_ticks = ticks;
                if resnapshot.is_some() {
                    dot.snapshot = resnapshot;
                }
                dot.expires_at()
            }
            None => return,
        };
        debug!(unit = spell_ref.unit.0, target = target.0, ticks, "periodic effect rolled over");
        self.hold_channel(spell_ref, target, expires_at);
        self.start_aura(aura, expires_at, false);
    }

    fn process_dot_tick(&mut self, spell_ref: SpellRef, target: UnitId, generation: u64) {
        let (aura, tick_length) = match self.dot(spell_ref, target) {
            Some(dot) if dot.active && dot.generation == generation => {
                (AuraRef::new(target, dot.aura), dot.tick_length)
            }
            _ => return,
        };

        let now = self.now();
        let aura_active = self.is_aura_active(aura);
        let dot = match self.spell_mut(spell_ref).and_then(|s| s.dots.get_mut(&target)) {
            Some(dot) => dot,
            None => return,
        };
        if !aura_active {
            dot.stop();
            debug!(unit = spell_ref.unit.0, target = target.0, "periodic effect aura removed");
            self.end_channel(spell_ref);
            return;
        }
        dot.remaining_ticks = dot.remaining_ticks.saturating_sub(1);
        dot.ticks_done += 1;
        dot.next_tick_at = Some(now + tick_length);

        self.resolve_dot_tick(spell_ref, target);

        // Handlers may have cancelled, reapplied or rolled over the effect
        let (remaining, next) = match self.dot(spell_ref, target) {
            Some(dot) if dot.active && dot.generation == generation => {
                (dot.remaining_ticks, dot.next_tick_at)
            }
            _ => return,
        };
        if remaining == 0 {
            if let Some(dot) = self.spell_mut(spell_ref).and_then(|s| s.dots.get_mut(&target)) {
                dot.stop();
            }
            self.end_channel(spell_ref);
            self.deactivate_aura(aura);
        } else if let Some(next) = next {
            self.schedule_at(next, move |sim| sim.process_dot_tick(spell_ref, target, generation));
        }
    }

    /// Deal one tick without touching the tick count
    fn resolve_dot_tick(&mut self, spell_ref: SpellRef, target: UnitId) -> Option<SpellResult> {
        let caster = self.units.get(spell_ref.unit.0)?;
        let spell = caster.spellbook.get(spell_ref.spell)?;
        let config = spell.dot.as_ref()?;
        let dot = spell.dots.get(&target)?;
        let snapshot = dot
            .snapshot
            .unwrap_or_else(|| snapshot_for(caster, spell, config));
        let helpful = spell.is_helpful();
        let school = spell.school;
        let tick_outcome = config.tick_outcome;
        let crit_multiplier = caster
            .modifiers
            .resolve(spell.crit_multiplier, spell, &[ModTarget::CritMultiplier]);
        let threat_multiplier = caster
            .modifiers
            .resolve(spell.threat_multiplier, spell, &[ModTarget::Threat]);
        let crit_bonus = caster.modifiers.resolve(0.0, spell, &[ModTarget::CritChance]);

        let outcome = match tick_outcome {
            TickOutcome::AlwaysHit => HitOutcome::Hit,
            TickOutcome::HitOrCrit => {
                if roll_chance(&mut self.rng, snapshot.crit_chance) {
                    HitOutcome::Crit
                } else {
                    HitOutcome::Hit
                }
            }
            TickOutcome::Rolled => self.resolver.resolve_hit_outcome(
                &mut self.rng,
                caster,
                self.units.get(target.0)?,
                school,
                crit_bonus,
            ),
        };

        let amount = match outcome {
            HitOutcome::Crit => snapshot.per_tick * crit_multiplier,
            HitOutcome::Hit => snapshot.per_tick,
            HitOutcome::Miss | HitOutcome::Resist => 0.0,
        };
        let source = caster.name.clone();
        let (damage, healing, threat) = if helpful {
            (0.0, amount, 0.0)
        } else {
            (amount, 0.0, amount * threat_multiplier)
        };
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
            periodic: true,
        };
        if let Some(spell) = self.spell_mut(spell_ref) {
            spell.metrics.record(&result);
        }
        trace!(unit = spell_ref.unit.0, target = target.0, ?outcome, amount, "periodic tick");
        self.emit_periodic_result(&result);
        Some(result)
    }
}
