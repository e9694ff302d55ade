//! Exclusive effects - auras of one category whose effects do not stack
//!
//! Active auras of a unit that share a category compete by priority and only
//! the strongest has its effect enabled. The effect hooks receive `on_gain`
//! when their aura becomes the strongest and `on_expire` when it stops being
//! it. A newcomer must beat the current holder outright to replace it.

use super::{AuraHooks, Hooks};
use crate::sim::Simulation;
use crate::types::{AuraId, AuraRef, UnitId};
use tracing::trace;

/// Category membership of an aura and the effect it competes to apply
#[derive(Debug, Clone)]
pub struct ExclusiveEffect {
    pub category: String,
    pub priority: f64,
    pub(crate) effect: Hooks,
}

impl ExclusiveEffect {
    pub fn new(category: impl Into<String>, priority: f64, effect: impl AuraHooks + 'static) -> Self {
        ExclusiveEffect {
            category: category.into(),
            priority,
            effect: Hooks::new(effect),
        }
    }
}

impl Simulation {
    /// Aura whose effect currently applies for `category` on `unit`
    pub fn exclusive_holder(&self, unit: UnitId, category: &str) -> Option<AuraRef> {
        self.unit(unit)?
            .auras
            .iter()
            .find(|(_, a)| a.effect_enabled && a.in_category(category))
            .map(|(id, _)| AuraRef::new(unit, id))
    }

    /// Change an aura's priority and re-run the competition if it is active
    pub fn set_exclusive_priority(&mut self, aura: AuraRef, priority: f64) {
        let category = match self
            .unit_mut(aura.unit)
            .and_then(|u| u.auras.get_mut(aura.aura))
            .and_then(|a| a.exclusive.as_mut())
        {
            Some(exclusive) => {
                exclusive.priority = priority;
                exclusive.category.clone()
            }
            None => return,
        };
        self.rebalance_exclusive(aura.unit, &category);
    }

    /// Hand the category's effect to the strongest active aura
    pub(crate) fn rebalance_exclusive(&mut self, unit: UnitId, category: &str) {
        let auras = match self.unit(unit) {
            Some(u) => &u.auras,
            None => return,
        };
        let priority = |id: AuraId| {
            auras
                .get(id)
                .and_then(|a| a.exclusive.as_ref())
                .map(|e| e.priority)
                .unwrap_or(f64::NEG_INFINITY)
        };

        let holder = auras
            .iter()
            .find(|(_, a)| a.effect_enabled && a.in_category(category))
            .map(|(id, _)| id);
        let mut challenger: Option<AuraId> = None;
        for (id, aura) in auras.iter() {
            if !aura.is_active() || !aura.in_category(category) || Some(id) == holder {
                continue;
            }
            if challenger.map_or(true, |best| priority(id) > priority(best)) {
                challenger = Some(id);
            }
        }

        let replace = match (holder, challenger) {
            (_, None) => None,
            (None, Some(c)) => Some((None, c)),
            (Some(h), Some(c)) if priority(c) > priority(h) => Some((Some(h), c)),
            _ => None,
        };
        if let Some((old, new)) = replace {
            if let Some(old) = old {
                self.set_effect_enabled(AuraRef::new(unit, old), false);
            }
            self.set_effect_enabled(AuraRef::new(unit, new), true);
        }
    }

    /// Flip an aura's effect and run the matching effect hook
    pub(crate) fn set_effect_enabled(&mut self, aura: AuraRef, enabled: bool) {
        let effect = match self.unit_mut(aura.unit).and_then(|u| u.auras.get_mut(aura.aura)) {
            Some(a) if a.effect_enabled != enabled => match &a.exclusive {
                Some(exclusive) => {
                    a.effect_enabled = enabled;
                    exclusive.effect.handle()
                }
                None => return,
            },
            _ => return,
        };
        trace!(unit = aura.unit.0, aura = aura.aura.0, enabled, "exclusive effect");
        if enabled {
            effect.on_gain(self, aura);
        } else {
            effect.on_expire(self, aura);
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::aura::{AuraConfig, AuraDuration, ExclusiveEffect, StatBonus};
    use crate::sim::Simulation;
    use crate::stats::{ModKind, Stat, StatSheet};
    use crate::types::{AuraRef, UnitId};
    use std::time::Duration;

    fn armor_buff(sim: &mut Simulation, unit: UnitId, label: &str, armor: f64, secs: f64) -> AuraRef {
        sim.register_aura(
            unit,
            AuraConfig::new(label, AuraDuration::from_secs_f64(secs)).with_exclusive(ExclusiveEffect::new(
                "armor",
                armor,
                StatBonus {
                    stat: Stat::Armor,
                    kind: ModKind::FlatAdd,
                    value: armor,
                },
            )),
        )
        .unwrap()
    }

    fn armor(sim: &Simulation, unit: UnitId) -> f64 {
        sim.unit(unit).unwrap().stats.get(Stat::Armor)
    }

    #[test]
    fn test_only_strongest_applies() {
        let mut sim = Simulation::new(1);
        let unit = sim.add_player("Warrior", StatSheet::new(), 100.0);
        let weak = armor_buff(&mut sim, unit, "Devotion Aura", 100.0, 30.0);
        let strong = armor_buff(&mut sim, unit, "Stoneskin", 250.0, 10.0);

        sim.activate_aura(weak);
        assert_eq!(armor(&sim, unit), 100.0);
        sim.activate_aura(strong);
        assert_eq!(armor(&sim, unit), 250.0);
        assert_eq!(sim.exclusive_holder(unit, "armor"), Some(strong));

        sim.run_until(Duration::from_secs(10));
        assert!(!sim.is_aura_active(strong));
        assert_eq!(armor(&sim, unit), 100.0);
        assert_eq!(sim.exclusive_holder(unit, "armor"), Some(weak));

        sim.run_until(Duration::from_secs(30));
        assert_eq!(armor(&sim, unit), 0.0);
        assert_eq!(sim.exclusive_holder(unit, "armor"), None);
    }

    #[test]
    fn test_weaker_newcomer_waits() {
        let mut sim = Simulation::new(1);
        let unit = sim.add_player("Warrior", StatSheet::new(), 100.0);
        let strong = armor_buff(&mut sim, unit, "Stoneskin", 250.0, 30.0);
        let weak = armor_buff(&mut sim, unit, "Devotion Aura", 100.0, 30.0);
        let equal = armor_buff(&mut sim, unit, "Ironskin", 250.0, 30.0);

        sim.activate_aura(strong);
        sim.activate_aura(weak);
        sim.activate_aura(equal);
        assert_eq!(armor(&sim, unit), 250.0);
        assert_eq!(sim.exclusive_holder(unit, "armor"), Some(strong));

        sim.deactivate_aura(strong);
        assert_eq!(sim.exclusive_holder(unit, "armor"), Some(equal));
        assert_eq!(armor(&sim, unit), 250.0);
    }

    #[test]
    fn test_priority_change_rebalances() {
        let mut sim = Simulation::new(1);
        let unit = sim.add_player("Warrior", StatSheet::new(), 100.0);
        let a = armor_buff(&mut sim, unit, "Devotion Aura", 100.0, 30.0);
        let b = armor_buff(&mut sim, unit, "Stoneskin", 50.0, 30.0);
        sim.activate_aura(a);
        sim.activate_aura(b);
        assert_eq!(sim.exclusive_holder(unit, "armor"), Some(a));

        sim.set_exclusive_priority(b, 500.0);
        assert_eq!(sim.exclusive_holder(unit, "armor"), Some(b));
        assert_eq!(armor(&sim, unit), 50.0);
    }

    #[test]
    fn test_finish_disables_every_effect() {
        let mut sim = Simulation::new(1);
        let unit = sim.add_player("Warrior", StatSheet::new(), 100.0);
        let a = armor_buff(&mut sim, unit, "Devotion Aura", 100.0, 30.0);
        let b = armor_buff(&mut sim, unit, "Stoneskin", 250.0, 30.0);
        sim.activate_aura(a);
        sim.activate_aura(b);
        sim.finish();
        assert_eq!(armor(&sim, unit), 0.0);
        assert_eq!(sim.exclusive_holder(unit, "armor"), None);
    }
}
