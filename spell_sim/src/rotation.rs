//! Priority-list driver for the simulated player
//!
//! On every decision point the first castable spell in the list is cast.
//! Periodic spells are skipped while their effect is still running on the
//! target. The next decision point is the earliest time any listed spell
//! becomes ready.

use spell_core::types::{SpellRef, UnitId};
use spell_core::Simulation;
use std::rc::Rc;
use std::time::Duration;
use tracing::trace;

/// Poll interval when nothing in the list will become ready by itself
const IDLE_POLL: Duration = Duration::from_millis(250);

#[derive(Debug, Clone)]
pub struct PriorityList {
    caster: UnitId,
    target: UnitId,
    spells: Vec<SpellRef>,
}

impl PriorityList {
    pub fn new(caster: UnitId, target: UnitId, spells: Vec<SpellRef>) -> Self {
        PriorityList {
            caster,
            target,
            spells,
        }
    }

    /// Start driving the caster at every reset
    pub fn install(self, sim: &mut Simulation) {
        let list = Rc::new(self);
        sim.on_reset(move |sim| Rc::clone(&list).act(sim));
    }

    fn act(self: Rc<Self>, sim: &mut Simulation) {
        let alive = |id| sim.unit(id).map(|u| u.is_alive()).unwrap_or(false);
        if !alive(self.caster) || !alive(self.target) {
            return;
        }
        let now = sim.now();
        for spell in &self.spells {
            let periodic = sim.spell(*spell).map(|s| s.is_periodic()).unwrap_or(false);
            if periodic && sim.is_dot_active(*spell, self.target) {
                continue;
            }
            match sim.cast(*spell, self.target) {
                Ok(_) => break,
                Err(e) => trace!(spell = spell.spell.0, error = %e, "skipped"),
            }
        }

        let next = self
            .spells
            .iter()
            .filter_map(|s| sim.ready_at(*s))
            .filter(|at| *at > now)
            .min()
            .unwrap_or(now + IDLE_POLL);
        sim.schedule_at(next, move |sim| self.act(sim));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use spell_core::dot::DotConfig;
    use spell_core::prelude::*;

    #[test]
    fn test_keeps_dot_up_and_fills() {
        let mut sim = Simulation::new(3);
        let caster = sim.add_player("Warlock", StatSheet::new(), 100_000.0);
        let target = sim.add_enemy("Dummy", 1_000_000.0);
        let corruption = sim
            .register_spell(
                caster,
                SpellConfig::new(ActionId::new(172), "Corruption", SpellSchool::Shadow)
                    .with_flags(SpellFlags::PURE_DOT)
                    .with_dot(DotConfig::new(6, Duration::from_secs(3)).with_tick(10.0, 0.0)),
            )
            .unwrap();
        let bolt = sim
            .register_spell(
                caster,
                SpellConfig::new(ActionId::new(686), "Shadow Bolt", SpellSchool::Shadow)
                    .with_damage(100.0, 100.0)
                    .with_cast_time(Duration::from_millis(2500)),
            )
            .unwrap();
        PriorityList::new(caster, target, vec![corruption, bolt]).install(&mut sim);

        sim.reset();
        sim.run_until(Duration::from_secs(30));

        // Corruption at 0 and again once it ends at 18
        assert_eq!(sim.spell(corruption).unwrap().metrics.casts, 2);
        assert!(sim.spell(bolt).unwrap().metrics.casts >= 10);
        assert!(sim.is_dot_active(corruption, target));
    }
}
