//! Outcome resolution - miss, resist, hit and crit rolls

use super::unit::Unit;
use crate::stats::Stat;
use crate::types::{HitOutcome, SpellSchool};
use rand::{Rng, RngCore};

/// Decides how a spell connects with its target
///
/// Implementations must draw every random number from `rng` so trials stay
/// reproducible from their seed.
pub trait OutcomeResolver {
    fn resolve_hit_outcome(
        &self,
        rng: &mut dyn RngCore,
        attacker: &Unit,
        defender: &Unit,
        school: SpellSchool,
        crit_bonus: f64,
    ) -> HitOutcome;
}

/// Two-roll table: first miss/resist, then crit on a landed hit
///
/// - miss chance = `base_miss` minus the attacker's hit stat, floored at 0
/// - resist chance = the defender's [`Stat::SpellResistance`] for non-physical schools
/// - crit chance = the attacker's crit stat plus `crit_bonus`
///
/// A roll is only drawn when its chance is strictly between 0 and 1.
#[derive(Debug, Clone, Copy)]
pub struct TableOutcomeResolver {
    pub base_miss: f64,
}

impl Default for TableOutcomeResolver {
    fn default() -> Self {
        TableOutcomeResolver { base_miss: 0.0 }
    }
}

/// Roll against a probability without drawing for certain outcomes
pub(crate) fn roll_chance(rng: &mut dyn RngCore, chance: f64) -> bool {
    if chance >= 1.0 {
        return true;
    }
    if chance <= 0.0 {
        return false;
    }
    rng.gen::<f64>() < chance
}

impl OutcomeResolver for TableOutcomeResolver {
    fn resolve_hit_outcome(
        &self,
        rng: &mut dyn RngCore,
        attacker: &Unit,
        defender: &Unit,
        school: SpellSchool,
        crit_bonus: f64,
    ) -> HitOutcome {
        let miss = (self.base_miss - attacker.stats.get(Stat::hit_for_school(school))).max(0.0);
        let resist = if school == SpellSchool::Physical {
            0.0
        } else {
            defender.stats.get(Stat::SpellResistance).max(0.0)
        };

        let avoid = (miss + resist).min(1.0);
        if avoid > 0.0 {
            let roll = if avoid >= 1.0 { 0.0 } else { rng.gen::<f64>() };
            if roll < miss {
                return HitOutcome::Miss;
            }
            if roll < avoid {
                return HitOutcome::Resist;
            }
        }

        let crit = attacker.stats.get(Stat::crit_for_school(school)) + crit_bonus;
        if roll_chance(rng, crit) {
            HitOutcome::Crit
        } else {
            HitOutcome::Hit
        }
    }
}
