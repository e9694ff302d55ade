//! Proc triggers - conditional handlers fired by spell events
//!
//! Triggers on a unit are evaluated in registration order. Filters are
//! checked in a fixed order (event, spell selector, outcome, internal
//! cooldown, chance) so a chance roll is only drawn once everything else
//! matched.
//!
//! A procs-per-minute chance is converted at dispatch time from the speed of
//! the triggering action: the swing interval of a pet autoattack, otherwise
//! the spell's cast time after modifiers, floored at [`GCD_DEFAULT`].

use crate::config::ConfigError;
use crate::modifier::{ModTarget, SpellSelector};
use crate::sim::{roll_chance, Simulation};
use crate::spell::{SpellResult, GCD_DEFAULT};
use crate::types::{SpellRef, UnitId};
use std::fmt;
use std::rc::Rc;
use std::time::Duration;
use tracing::{trace, warn};

/// Nesting limit for procs triggered from proc handlers
pub const MAX_PROC_DEPTH: u32 = 32;

/// Event a trigger listens for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProcEvent {
    CastComplete,
    SpellHitDealt,
    PeriodicDamageDealt,
    HealDealt,
    SpellHitTaken,
}

/// Outcome a trigger requires
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OutcomeFilter {
    #[default]
    Any,
    Landed,
    Crit,
}

impl OutcomeFilter {
    fn accepts(self, result: Option<&SpellResult>) -> bool {
        match self {
            OutcomeFilter::Any => true,
            OutcomeFilter::Landed => result.map(SpellResult::landed).unwrap_or(false),
            OutcomeFilter::Crit => result.map(SpellResult::is_crit).unwrap_or(false),
        }
    }
}

/// How likely a matching event is to fire a trigger
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ProcChance {
    /// Probability per event; at 1.0 or above the trigger fires without a roll
    Flat(f64),
    /// Average procs per minute, scaled by the speed of the triggering action
    PerMinute(f64),
}

impl ProcChance {
    /// Probability for an action that takes `speed`
    pub fn resolve(self, speed: Duration) -> f64 {
        match self {
            ProcChance::Flat(chance) => chance,
            ProcChance::PerMinute(ppm) => ppm * speed.as_secs_f64() / 60.0,
        }
    }
}

impl Default for ProcChance {
    fn default() -> Self {
        ProcChance::Flat(1.0)
    }
}

/// What a handler is told about the triggering event
#[derive(Debug, Clone, Copy)]
pub struct ProcContext<'a> {
    /// Unit owning the trigger
    pub owner: UnitId,
    pub event: ProcEvent,
    pub spell: SpellRef,
    /// `None` for cast-complete events
    pub result: Option<&'a SpellResult>,
}

pub type ProcHandler = Rc<dyn Fn(&mut Simulation, &ProcContext<'_>)>;

/// A registered reaction to spell events
#[derive(Clone)]
pub struct ProcTrigger {
    pub name: String,
    pub events: Vec<ProcEvent>,
    pub selector: SpellSelector,
    pub outcome: OutcomeFilter,
    pub chance: ProcChance,
    pub icd: Option<Duration>,
    pub handler: ProcHandler,
}

impl ProcTrigger {
    pub fn new(
        name: impl Into<String>,
        events: Vec<ProcEvent>,
        handler: impl Fn(&mut Simulation, &ProcContext<'_>) + 'static,
    ) -> Self {
        ProcTrigger {
            name: name.into(),
            events,
            selector: SpellSelector::all(),
            outcome: OutcomeFilter::Any,
            chance: ProcChance::default(),
            icd: None,
            handler: Rc::new(handler),
        }
    }

    pub fn with_chance(mut self, chance: f64) -> Self {
        self.chance = ProcChance::Flat(chance);
        self
    }

    pub fn with_ppm(mut self, ppm: f64) -> Self {
        self.chance = ProcChance::PerMinute(ppm);
        self
    }

    pub fn with_selector(mut self, selector: SpellSelector) -> Self {
        self.selector = selector;
        self
    }

    pub fn with_outcome(mut self, outcome: OutcomeFilter) -> Self {
        self.outcome = outcome;
        self
    }

    pub fn with_icd(mut self, icd: Duration) -> Self {
        self.icd = Some(icd);
        self
    }
}

impl fmt::Debug for ProcTrigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProcTrigger")
            .field("name", &self.name)
            .field("events", &self.events)
            .field("selector", &self.selector)
            .field("outcome", &self.outcome)
            .field("chance", &self.chance)
            .field("icd", &self.icd)
            .finish()
    }
}

/// A trigger and its runtime state
#[derive(Debug, Clone)]
pub struct ProcState {
    pub trigger: ProcTrigger,
    pub(crate) icd_ready_at: Duration,
    pub(crate) firing: bool,
    pub procs: u64,
}

impl ProcState {
    fn new(trigger: ProcTrigger) -> Self {
        ProcState {
            trigger,
            icd_ready_at: Duration::ZERO,
            firing: false,
            procs: 0,
        }
    }

    pub(crate) fn reset(&mut self) {
        self.icd_ready_at = Duration::ZERO;
        self.firing = false;
        self.procs = 0;
    }
}

impl Simulation {
    pub fn register_proc(&mut self, unit: UnitId, trigger: ProcTrigger) -> Result<(), ConfigError> {
        if trigger.events.is_empty() {
            return Err(ConfigError::ValidationError(format!(
                "proc '{}' listens for no events",
                trigger.name
            )));
        }
        let (ProcChance::Flat(rate) | ProcChance::PerMinute(rate)) = trigger.chance;
        if !rate.is_finite() || rate < 0.0 {
            return Err(ConfigError::ValidationError(format!(
                "proc '{}' has an invalid chance {}",
                trigger.name, rate
            )));
        }
        let owner = self.require_unit_mut(unit)?;
        trace!(unit = unit.0, proc = %trigger.name, "proc registered");
        owner.procs.push(ProcState::new(trigger));
        Ok(())
    }

    /// Offer an event to every trigger of `owner`
    pub(crate) fn dispatch_procs(
        &mut self,
        owner: UnitId,
        event: ProcEvent,
        spell: SpellRef,
        result: Option<&SpellResult>,
    ) {
        if self.proc_depth >= MAX_PROC_DEPTH {
            warn!(unit = owner.0, ?event, "proc chain depth limit reached");
            return;
        }
        let count = match self.unit(owner) {
            Some(u) => u.procs.len(),
            None => return,
        };

        for idx in 0..count {
            if !self.proc_matches(owner, idx, event, spell, result) {
                continue;
            }
            let chance = match self.units[owner.0].procs[idx].trigger.chance {
                ProcChance::Flat(chance) => chance,
                ProcChance::PerMinute(ppm) => ProcChance::PerMinute(ppm).resolve(self.action_speed(spell)),
            };
            if !roll_chance(&mut self.rng, chance) {
                continue;
            }

            let now = self.now();
            let state = &mut self.units[owner.0].procs[idx];
            state.firing = true;
            state.procs += 1;
            if let Some(icd) = state.trigger.icd {
                state.icd_ready_at = now + icd;
            }
            let handler = Rc::clone(&state.trigger.handler);
            trace!(unit = owner.0, proc = %state.trigger.name, "proc fired");

            let context = ProcContext {
                owner,
                event,
                spell,
                result,
            };
            self.proc_depth += 1;
            handler(self, &context);
            self.proc_depth -= 1;
            if let Some(state) = self.units.get_mut(owner.0).and_then(|u| u.procs.get_mut(idx)) {
                state.firing = false;
            }
        }
    }

    /// Nesting depth of proc handlers currently running
    pub fn proc_depth(&self) -> u32 {
        self.proc_depth
    }

    /// Time one use of `spell` takes, for procs-per-minute conversion
    fn action_speed(&self, spell_ref: SpellRef) -> Duration {
        let caster = match self.unit(spell_ref.unit) {
            Some(u) => u,
            None => return GCD_DEFAULT,
        };
        if let Some(interval) = caster.pet_state().and_then(|p| p.swing_interval(spell_ref.spell)) {
            return interval;
        }
        caster
            .spellbook
            .get(spell_ref.spell)
            .map(|spell| {
                caster
                    .modifiers
                    .resolve_duration(spell.cast_time, spell, ModTarget::CastTime)
            })
            .unwrap_or_default()
            .max(GCD_DEFAULT)
    }

    fn proc_matches(
        &self,
        owner: UnitId,
        idx: usize,
        event: ProcEvent,
        spell: SpellRef,
        result: Option<&SpellResult>,
    ) -> bool {
        let state = match self.unit(owner).and_then(|u| u.procs.get(idx)) {
            Some(s) => s,
            None => return false,
        };
        let trigger = &state.trigger;
        if state.firing || !trigger.events.contains(&event) {
            return false;
        }
        match self.spell(spell) {
            Some(s) if trigger.selector.matches(s) => {}
            _ => return false,
        }
        trigger.outcome.accepts(result) && state.icd_ready_at <= self.now()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spell::SpellConfig;
    use crate::stats::{Stat, StatSheet};
    use crate::types::{ActionId, SpellSchool};
    use std::cell::Cell;

    fn setup() -> (Simulation, SpellRef, UnitId) {
        let mut sim = Simulation::new(11);
        let caster = sim.add_player("Mage", StatSheet::new(), 10_000.0);
        let target = sim.add_enemy("Dummy", 1_000_000.0);
        let spell = sim
            .register_spell(
                caster,
                SpellConfig::new(ActionId::new(133), "Fireball", SpellSchool::Fire)
                    .with_damage(100.0, 100.0)
                    .with_class_mask(1)
                    .with_gcd(Duration::ZERO),
            )
            .unwrap();
        (sim, spell, target)
    }

    #[test]
    fn test_guaranteed_proc_fires_in_order() {
        let (mut sim, spell, target) = setup();
        let log = Rc::new(std::cell::RefCell::new(Vec::new()));
        for name in ["first", "second"] {
            let log = Rc::clone(&log);
            sim.register_proc(
                spell.unit,
                ProcTrigger::new(name, vec![ProcEvent::SpellHitDealt], move |_, ctx| {
                    log.borrow_mut().push((name, ctx.result.map(|r| r.damage)));
                }),
            )
            .unwrap();
        }
        sim.cast(spell, target).unwrap();
        assert_eq!(*log.borrow(), vec![("first", Some(100.0)), ("second", Some(100.0))]);
    }

    #[test]
    fn test_icd_blocks_refire() {
        let (mut sim, spell, target) = setup();
        let fired = Rc::new(Cell::new(0));
        let counter = Rc::clone(&fired);
        sim.register_proc(
            spell.unit,
            ProcTrigger::new("Trinket", vec![ProcEvent::CastComplete], move |_, _| {
                counter.set(counter.get() + 1)
            })
            .with_icd(Duration::from_secs(45)),
        )
        .unwrap();

        sim.cast(spell, target).unwrap();
        sim.cast(spell, target).unwrap();
        assert_eq!(fired.get(), 1);
        sim.run_until(Duration::from_secs(45));
        sim.cast(spell, target).unwrap();
        assert_eq!(fired.get(), 2);
        assert_eq!(sim.unit(spell.unit).unwrap().proc_counts(), vec![("Trinket", 2)]);
    }

    #[test]
    fn test_crit_filter_and_selector() {
        let (mut sim, spell, target) = setup();
        let fired = Rc::new(Cell::new(0));
        let counter = Rc::clone(&fired);
        sim.register_proc(
            spell.unit,
            ProcTrigger::new("Ignite", vec![ProcEvent::SpellHitDealt], move |_, _| {
                counter.set(counter.get() + 1)
            })
            .with_outcome(OutcomeFilter::Crit)
            .with_selector(SpellSelector::school(SpellSchool::Fire)),
        )
        .unwrap();

        sim.cast(spell, target).unwrap();
        assert_eq!(fired.get(), 0);

        sim.unit_mut(spell.unit).unwrap().stats.set_base(Stat::SpellCrit, 1.0);
        sim.cast(spell, target).unwrap();
        assert_eq!(fired.get(), 1);
    }

    #[test]
    fn test_self_trigger_is_not_reentered() {
        let (mut sim, spell, target) = setup();
        let fired = Rc::new(Cell::new(0));
        let counter = Rc::clone(&fired);
        sim.register_proc(
            spell.unit,
            ProcTrigger::new("Echo", vec![ProcEvent::SpellHitDealt], move |sim, ctx| {
                counter.set(counter.get() + 1);
                let _ = sim.cast(ctx.spell, target);
            }),
        )
        .unwrap();

        sim.cast(spell, target).unwrap();
        assert_eq!(fired.get(), 1);
        assert_eq!(sim.spell(spell).unwrap().metrics.casts, 2);
    }

    #[test]
    fn test_empty_event_set_rejected() {
        let (mut sim, spell, _) = setup();
        let result = sim.register_proc(spell.unit, ProcTrigger::new("Nothing", vec![], |_, _| {}));
        assert!(matches!(result, Err(ConfigError::ValidationError(_))));
    }

    #[test]
    fn test_per_minute_chance_scales_with_speed() {
        assert_eq!(ProcChance::Flat(0.3).resolve(Duration::from_secs(3)), 0.3);
        assert!((ProcChance::PerMinute(20.0).resolve(Duration::from_secs(3)) - 1.0).abs() < 1e-12);
        assert!((ProcChance::PerMinute(2.0).resolve(Duration::from_millis(1500)) - 0.05).abs() < 1e-12);
    }

    #[test]
    fn test_per_minute_uses_cast_time_with_gcd_floor() {
        let (mut sim, instant, target) = setup();
        let slow = sim
            .register_spell(
                instant.unit,
                SpellConfig::new(ActionId::new(11366), "Pyroblast", SpellSchool::Fire)
                    .with_damage(10.0, 10.0)
                    .with_cast_time(Duration::from_secs(3))
                    .with_gcd(Duration::ZERO)
                    .with_class_mask(2),
            )
            .unwrap();
        let fired = Rc::new(Cell::new(0));
        for (name, mask, ppm) in [("Instant", 1, 40.0), ("Slow", 2, 20.0), ("Never", 2, 0.0)] {
            let counter = Rc::clone(&fired);
            sim.register_proc(
                instant.unit,
                ProcTrigger::new(name, vec![ProcEvent::CastComplete], move |_, _| {
                    counter.set(counter.get() + 1)
                })
                .with_selector(SpellSelector::class_mask(mask))
                .with_ppm(ppm),
            )
            .unwrap();
        }

        sim.cast(instant, target).unwrap();
        sim.cast(slow, target).unwrap();
        sim.run_until(Duration::from_secs(3));
        assert_eq!(fired.get(), 2);
        assert_eq!(
            sim.unit(instant.unit).unwrap().proc_counts(),
            vec![("Instant", 1), ("Slow", 1), ("Never", 0)]
        );
    }

    #[test]
    fn test_invalid_chance_rejected() {
        let (mut sim, spell, _) = setup();
        let result = sim.register_proc(
            spell.unit,
            ProcTrigger::new("Broken", vec![ProcEvent::CastComplete], |_, _| {}).with_ppm(f64::NAN),
        );
        assert!(matches!(result, Err(ConfigError::ValidationError(_))));
    }

    #[test]
    fn test_proc_chain_stops_at_depth_limit() {
        const LINKS: usize = 40;
        let mut sim = Simulation::new(11);
        let caster = sim.add_player("Mage", StatSheet::new(), 10_000.0);
        let target = sim.add_enemy("Dummy", 1_000_000.0);
        let spells: Vec<SpellRef> = (0..LINKS)
            .map(|i| {
                sim.register_spell(
                    caster,
                    SpellConfig::new(ActionId::new(1000 + i as i32), format!("Link {}", i), SpellSchool::Arcane)
                        .with_class_mask(1 << i)
                        .with_gcd(Duration::ZERO),
                )
                .unwrap()
            })
            .collect();
        for i in 0..LINKS {
            let next = spells[(i + 1) % LINKS];
            sim.register_proc(
                caster,
                ProcTrigger::new(format!("Chain {}", i), vec![ProcEvent::CastComplete], move |sim, _| {
                    let _ = sim.cast(next, target);
                })
                .with_selector(SpellSelector::class_mask(1 << i)),
            )
            .unwrap();
        }

        sim.cast(spells[0], target).unwrap();
        assert_eq!(sim.proc_depth(), 0);
        let casts: Vec<u64> = spells
            .iter()
            .map(|s| sim.spell(*s).unwrap().metrics.casts)
            .collect();
        let depth = MAX_PROC_DEPTH as usize;
        assert!(casts[..=depth].iter().all(|c| *c == 1));
        assert!(casts[depth + 1..].iter().all(|c| *c == 0));
        let fired: u64 = sim.unit(caster).unwrap().proc_counts().iter().map(|(_, n)| n).sum();
        assert_eq!(fired, MAX_PROC_DEPTH as u64);
    }
}
