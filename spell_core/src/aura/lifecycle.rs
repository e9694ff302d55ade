//! Aura state machine
//!
//! ```text
//! Inactive --activate--> Active(stacks = 0)
//! Active --activate/refresh--> Active (expiry reset, no on_gain)
//! Active --add_stack--> Active(min(stacks + 1, max))
//! Active --expiry/deactivate/remove last stack--> Inactive (on_expire once)
//! ```
//!
//! Auras with an exclusive category hand their effect over on every gain and
//! expiry; see [`super::ExclusiveEffect`].

use super::{Aura, AuraConfig, AuraDuration};
use crate::config::ConfigError;
use crate::sim::Simulation;
use crate::types::{AuraRef, UnitId};
use std::time::Duration;
use tracing::{debug, trace, warn};

impl Simulation {
    /// Register an aura on a unit
    ///
    /// Registering the same label again returns the existing aura when the
    /// settings agree and fails otherwise.
    pub fn register_aura(&mut self, unit: UnitId, config: AuraConfig) -> Result<AuraRef, ConfigError> {
        let owner = self.require_unit_mut(unit)?;
        if let Some(id) = owner.auras.by_label(&config.label) {
            let existing = owner.auras.get(id).ok_or(ConfigError::UnknownUnit(unit))?;
            if !config.is_compatible(existing) {
                return Err(ConfigError::ConflictingAura {
                    label: config.label,
                });
            }
            return Ok(AuraRef::new(unit, id));
        }
        trace!(unit = unit.0, aura = %config.label, "aura registered");
        let id = owner.auras.insert(Aura::from_config(config));
        Ok(AuraRef::new(unit, id))
    }

    pub fn aura(&self, aura: AuraRef) -> Option<&Aura> {
        self.unit(aura.unit)?.auras.get(aura.aura)
    }

    fn aura_mut(&mut self, aura: AuraRef) -> Option<&mut Aura> {
        self.unit_mut(aura.unit)?.auras.get_mut(aura.aura)
    }

    pub fn find_aura(&self, unit: UnitId, label: &str) -> Option<AuraRef> {
        self.unit(unit)?
            .auras
            .by_label(label)
            .map(|id| AuraRef::new(unit, id))
    }

    pub fn is_aura_active(&self, aura: AuraRef) -> bool {
        self.aura(aura).map(Aura::is_active).unwrap_or(false)
    }

    /// Activate an inactive aura, or refresh the duration of an active one
    pub fn activate_aura(&mut self, aura: AuraRef) {
        let duration = match self.aura(aura) {
            Some(a) => a.duration,
            None => return,
        };
        let expires_at = match duration {
            AuraDuration::Finite(d) => Some(self.now() + d),
            AuraDuration::NeverExpires => None,
        };
        self.start_aura(aura, expires_at, true);
    }

    /// Reset an active aura's duration. Inactive auras are left alone.
    pub fn refresh_aura(&mut self, aura: AuraRef) {
        if self.is_aura_active(aura) {
            self.activate_aura(aura);
        }
    }

    /// Activate or refresh with an explicit expiry
    ///
    /// When `schedule_expiry` is false the caller owns expiry, as periodic
    /// effects do. Returns true on an Inactive→Active transition.
    pub(crate) fn start_aura(
        &mut self,
        aura: AuraRef,
        expires_at: Option<Duration>,
        schedule_expiry: bool,
    ) -> bool {
        let now = self.now();
        let state = match self.aura_mut(aura) {
            Some(a) => a,
            None => return false,
        };

        let gained = !state.is_active();
        if gained {
            state.mark_gained(now, expires_at);
        } else {
            state.mark_refreshed(expires_at);
        }
        let generation = state.generation;
        let hooks = state.hooks.handle();
        let label = state.label.clone();
        let category = state.exclusive.as_ref().map(|e| e.category.clone());

        if schedule_expiry {
            if let Some(at) = expires_at {
                self.schedule_at(at, move |sim| sim.expire_aura_if_current(aura, generation));
            }
        }

        if gained {
            debug!(unit = aura.unit.0, aura = %label, "aura gained");
            hooks.on_gain(self, aura);
            if let Some(category) = category {
                self.rebalance_exclusive(aura.unit, &category);
            }
        } else {
            trace!(unit = aura.unit.0, aura = %label, "aura refreshed");
        }
        gained
    }

    fn expire_aura_if_current(&mut self, aura: AuraRef, generation: u64) {
        let current = self
            .aura(aura)
            .map(|a| a.is_active() && a.generation == generation)
            .unwrap_or(false);
        if current {
            self.deactivate_aura(aura);
        }
    }

    /// Deactivate an active aura. Returns false, doing nothing, when it was already inactive.
    pub fn deactivate_aura(&mut self, aura: AuraRef) -> bool {
        let now = self.now();
        let state = match self.aura_mut(aura) {
            Some(a) if a.is_active() => a,
            _ => return false,
        };

        let old_stacks = state.stacks();
        state.mark_expired(now);
        state.set_stacks_raw(0);
        let hooks = state.hooks.handle();
        let category = state.exclusive.as_ref().map(|e| e.category.clone());
        debug!(unit = aura.unit.0, aura = %state.label, "aura expired");

        if let Some(category) = category {
            self.set_effect_enabled(aura, false);
            self.rebalance_exclusive(aura.unit, &category);
        }
        if old_stacks > 0 {
            hooks.on_stacks_change(self, aura, old_stacks, 0);
        }
        hooks.on_expire(self, aura);
        true
    }

    /// Activate or refresh, then add one stack up to the maximum
    pub fn add_stack(&mut self, aura: AuraRef) {
        self.activate_aura(aura);
        let (old, max) = match self.aura(aura) {
            Some(a) if a.is_active() => (a.stacks(), a.max_stacks),
            _ => return,
        };
        if old < max {
            self.change_stacks(aura, old, old + 1);
        }
    }

    /// Remove one stack; removing the last stack deactivates the aura
    pub fn remove_stack(&mut self, aura: AuraRef) {
        let old = match self.aura(aura) {
            Some(a) if a.is_active() => a.stacks(),
            _ => return,
        };
        if old <= 1 {
            self.deactivate_aura(aura);
        } else {
            self.change_stacks(aura, old, old - 1);
        }
    }

    /// Set the stack count of an active aura
    ///
    /// A count above the maximum is a caller bug: it panics in debug builds
    /// and is clamped in release builds.
    pub fn set_stacks(&mut self, aura: AuraRef, stacks: u32) {
        let (old, max) = match self.aura(aura) {
            Some(a) if a.is_active() => (a.stacks(), a.max_stacks),
            Some(a) => {
                warn!(aura = %a.label, "set_stacks on inactive aura ignored");
                return;
            }
            None => return,
        };
        debug_assert!(stacks <= max, "{} stacks requested, max is {}", stacks, max);
        let new = if stacks > max {
            warn!(unit = aura.unit.0, stacks, max, "stack count clamped");
            max
        } else {
            stacks
        };
        if new != old {
            self.change_stacks(aura, old, new);
        }
    }

    fn change_stacks(&mut self, aura: AuraRef, old: u32, new: u32) {
        let hooks = match self.aura_mut(aura) {
            Some(a) => {
                debug_assert!(new <= a.max_stacks);
                a.set_stacks_raw(new);
                a.hooks.handle()
            }
            None => return,
        };
        trace!(unit = aura.unit.0, aura = aura.aura.0, old, new, "stacks changed");
        hooks.on_stacks_change(self, aura, old, new);
    }

    /// Deactivate every active aura of a unit. Returns how many were deactivated.
    pub fn deactivate_all_auras(&mut self, unit: UnitId) -> usize {
        let ids = match self.unit(unit) {
            Some(u) => u.auras.active_ids(),
            None => return 0,
        };
        ids.into_iter()
            .filter(|id| self.deactivate_aura(AuraRef::new(unit, *id)))
            .count()
    }

    /// Run every on_reset hook, then activate tracking auras
    pub(crate) fn reset_auras(&mut self) {
        for idx in 0..self.units.len() {
            let unit = UnitId(idx);
            let hooks: Vec<_> = self.units[idx]
                .auras
                .iter()
                .map(|(id, a)| (id, a.hooks.handle()))
                .collect();
            for (id, h) in &hooks {
                h.on_reset(self, AuraRef::new(unit, *id));
            }

            let tracking: Vec<_> = self.units[idx]
                .auras
                .iter()
                .filter(|(_, a)| a.activate_on_reset)
                .map(|(id, _)| id)
                .collect();
            for id in tracking {
                self.activate_aura(AuraRef::new(unit, id));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aura::AuraHooks;
    use crate::stats::StatSheet;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[derive(Default)]
    struct Recorder {
        log: RefCell<Vec<String>>,
    }

    impl AuraHooks for Rc<Recorder> {
        fn on_gain(&self, _sim: &mut Simulation, _aura: AuraRef) {
            self.log.borrow_mut().push("gain".to_string());
        }

        fn on_expire(&self, _sim: &mut Simulation, _aura: AuraRef) {
            self.log.borrow_mut().push("expire".to_string());
        }

        fn on_stacks_change(&self, _sim: &mut Simulation, _aura: AuraRef, old: u32, new: u32) {
            self.log.borrow_mut().push(format!("stacks {}->{}", old, new));
        }
    }

    fn setup(config: AuraConfig) -> (Simulation, AuraRef, Rc<Recorder>) {
        let mut sim = Simulation::new(1);
        let unit = sim.add_player("Priest", StatSheet::new(), 100.0);
        let recorder = Rc::new(Recorder::default());
        let aura = sim
            .register_aura(unit, config.with_hooks(Rc::clone(&recorder)))
            .unwrap();
        (sim, aura, recorder)
    }

    #[test]
    fn test_expires_after_duration() {
        let (mut sim, aura, recorder) =
            setup(AuraConfig::new("Inner Focus", AuraDuration::from_secs_f64(10.0)));
        sim.activate_aura(aura);
        sim.run_until(Duration::from_secs(9));
        assert!(sim.is_aura_active(aura));
        sim.run_until(Duration::from_secs(10));
        assert!(!sim.is_aura_active(aura));
        assert_eq!(*recorder.log.borrow(), vec!["gain", "expire"]);
    }

    #[test]
    fn test_refresh_supersedes_old_expiry() {
        let (mut sim, aura, recorder) =
            setup(AuraConfig::new("Shadow Weaving", AuraDuration::from_secs_f64(10.0)));
        sim.activate_aura(aura);
        sim.run_until(Duration::from_secs(5));
        sim.activate_aura(aura);
        sim.run_until(Duration::from_secs(12));
        assert!(sim.is_aura_active(aura));
        assert_eq!(sim.aura(aura).unwrap().expires_at(), Some(Duration::from_secs(15)));
        sim.run_until(Duration::from_secs(15));
        assert!(!sim.is_aura_active(aura));
        assert_eq!(*recorder.log.borrow(), vec!["gain", "expire"]);
    }

    #[test]
    fn test_double_deactivate_expires_once() {
        let (mut sim, aura, recorder) = setup(AuraConfig::new("Power Infusion", AuraDuration::NeverExpires));
        sim.activate_aura(aura);
        assert!(sim.deactivate_aura(aura));
        assert!(!sim.deactivate_aura(aura));
        assert_eq!(sim.aura(aura).unwrap().expirations(), 1);
        assert_eq!(*recorder.log.borrow(), vec!["gain", "expire"]);
    }

    #[test]
    fn test_stacks_clamp_and_notify() {
        let (mut sim, aura, recorder) = setup(
            AuraConfig::new("Shadow Weaving", AuraDuration::from_secs_f64(15.0)).with_max_stacks(2),
        );
        sim.add_stack(aura);
        sim.add_stack(aura);
        sim.add_stack(aura);
        assert_eq!(sim.aura(aura).unwrap().stacks(), 2);
        sim.remove_stack(aura);
        sim.remove_stack(aura);
        assert!(!sim.is_aura_active(aura));
        assert_eq!(
            *recorder.log.borrow(),
            vec!["gain", "stacks 0->1", "stacks 1->2", "stacks 2->1", "stacks 1->0", "expire"]
        );
    }

    #[test]
    fn test_expiry_clears_stacks_before_expire() {
        let (mut sim, aura, recorder) = setup(
            AuraConfig::new("Molten Core", AuraDuration::from_secs_f64(5.0)).with_max_stacks(3),
        );
        sim.add_stack(aura);
        sim.set_stacks(aura, 3);
        sim.run_until(Duration::from_secs(5));
        assert_eq!(sim.aura(aura).unwrap().stacks(), 0);
        assert_eq!(
            *recorder.log.borrow(),
            vec!["gain", "stacks 0->1", "stacks 1->3", "stacks 3->0", "expire"]
        );
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "max is 3")]
    fn test_set_stacks_above_max_panics_in_debug() {
        let (mut sim, aura, _) = setup(
            AuraConfig::new("Molten Core", AuraDuration::from_secs_f64(5.0)).with_max_stacks(3),
        );
        sim.activate_aura(aura);
        sim.set_stacks(aura, 4);
    }

    #[test]
    fn test_conflicting_registration() {
        let mut sim = Simulation::new(1);
        let unit = sim.add_player("Rogue", StatSheet::new(), 100.0);
        let first = sim
            .register_aura(unit, AuraConfig::new("Slice and Dice", AuraDuration::from_secs_f64(9.0)))
            .unwrap();
        let again = sim
            .register_aura(unit, AuraConfig::new("Slice and Dice", AuraDuration::from_secs_f64(9.0)))
            .unwrap();
        assert_eq!(first, again);
        let conflict = sim.register_aura(
            unit,
            AuraConfig::new("Slice and Dice", AuraDuration::from_secs_f64(21.0)),
        );
        assert!(matches!(conflict, Err(ConfigError::ConflictingAura { .. })));
    }

    #[test]
    fn test_tracking_aura_activated_on_reset() {
        let mut sim = Simulation::new(1);
        let unit = sim.add_player("Druid", StatSheet::new(), 100.0);
        let aura = sim
            .register_aura(unit, AuraConfig::tracking("Omen Tracker", crate::aura::NoHooks))
            .unwrap();
        assert!(!sim.is_aura_active(aura));
        sim.reset();
        assert!(sim.is_aura_active(aura));
        sim.finish();
        let state = sim.aura(aura).unwrap();
        assert_eq!(state.gains(), state.expirations());
    }
}
