//! Spellbook and spell registration

use super::{Spell, SpellConfig};
use crate::config::ConfigError;
use crate::sim::Simulation;
use crate::timer::{Cooldown, Timer};
use crate::types::{ActionId, SpellId, SpellRef, UnitId};
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, trace};

/// Every spell known to one unit
#[derive(Debug, Clone, Default)]
pub struct Spellbook {
    spells: Vec<Spell>,
    by_action: HashMap<ActionId, SpellId>,
}

impl Spellbook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: SpellId) -> Option<&Spell> {
        self.spells.get(id.0)
    }

    pub(crate) fn get_mut(&mut self, id: SpellId) -> Option<&mut Spell> {
        self.spells.get_mut(id.0)
    }

    pub fn lookup(&self, action_id: ActionId) -> Option<SpellId> {
        self.by_action.get(&action_id).copied()
    }

    pub fn by_label(&self, label: &str) -> Option<SpellId> {
        self.spells.iter().find(|s| s.label == label).map(|s| s.id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Spell> {
        self.spells.iter()
    }

    pub(crate) fn iter_mut(&mut self) -> impl Iterator<Item = &mut Spell> {
        self.spells.iter_mut()
    }

    /// Spells whose class mask shares a bit with `mask`
    pub fn matching(&self, mask: u64) -> Vec<SpellId> {
        self.spells
            .iter()
            .filter(|s| s.class_mask & mask != 0)
            .map(|s| s.id)
            .collect()
    }

    /// Spells carrying a periodic effect
    pub fn periodic_spells(&self) -> Vec<SpellId> {
        self.spells
            .iter()
            .filter(|s| s.is_periodic())
            .map(|s| s.id)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.spells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.spells.is_empty()
    }

    fn insert(&mut self, spell: Spell) -> SpellId {
        let id = spell.id;
        self.by_action.insert(spell.action_id, id);
        self.spells.push(spell);
        id
    }

    fn next_id(&self) -> SpellId {
        SpellId(self.spells.len())
    }
}

impl Simulation {
    /// Register a spell on a unit
    ///
    /// Registering the same [`ActionId`] again returns the existing spell
    /// untouched.
    pub fn register_spell(&mut self, unit: UnitId, config: SpellConfig) -> Result<SpellRef, ConfigError> {
        config.validate()?;
        let owner = self.require_unit_mut(unit)?;
        if let Some(id) = owner.spellbook.lookup(config.action_id) {
            trace!(unit = unit.0, action = %config.action_id, "spell already registered");
            return Ok(SpellRef::new(unit, id));
        }

        let cooldown = config.cooldown.as_ref().map(|cd| Cooldown {
            timer: owner.timers.new_timer(),
            duration: cd.duration,
        });
        let shared_cooldown = config.shared_cooldown.as_ref().map(|cd| Cooldown {
            timer: owner.timers.named_timer(&cd.timer),
            duration: cd.duration,
        });

        let id = owner.spellbook.next_id();
        let mut spell = Spell::from_config(id, config);
        spell.cooldown = cooldown;
        spell.shared_cooldown = shared_cooldown;
        debug!(unit = unit.0, spell = %spell.label, action = %spell.action_id, "spell registered");
        owner.spellbook.insert(spell);
        Ok(SpellRef::new(unit, id))
    }

    pub fn get_spell(&self, unit: UnitId, action_id: ActionId) -> Option<SpellRef> {
        self.unit(unit)?
            .spellbook
            .lookup(action_id)
            .map(|id| SpellRef::new(unit, id))
    }

    pub fn spell(&self, spell: SpellRef) -> Option<&Spell> {
        self.unit(spell.unit)?.spellbook.get(spell.spell)
    }

    pub(crate) fn spell_mut(&mut self, spell: SpellRef) -> Option<&mut Spell> {
        self.unit_mut(spell.unit)?.spellbook.get_mut(spell.spell)
    }

    /// Every spell registered on `unit`, in registration order
    pub fn spells(&self, unit: UnitId) -> Vec<SpellRef> {
        self.unit(unit)
            .map(|u| u.spellbook.iter().map(|s| SpellRef::new(unit, s.id)).collect())
            .unwrap_or_default()
    }

    /// Make the spell's own cooldown ready now, or its shared one when it has no own cooldown
    ///
    /// Spells sharing the timer are reset too.
    pub fn reset_cooldown(&mut self, spell: SpellRef) {
        let now = self.now();
        if let Some(timer) = self.cooldown_timer_mut(spell) {
            timer.set_ready_at(timer.ready_at().min(now));
        }
    }

    /// Bring the spell's cooldown forward by `by`
    pub fn reduce_cooldown(&mut self, spell: SpellRef, by: Duration) {
        let now = self.now();
        if let Some(timer) = self.cooldown_timer_mut(spell) {
            timer.reduce(now, by);
        }
    }

    fn cooldown_timer_mut(&mut self, spell: SpellRef) -> Option<&mut Timer> {
        let unit = self.unit_mut(spell.unit)?;
        let id = unit.spellbook.get(spell.spell)?.cooldowns().next()?.timer;
        unit.timers.get_mut(id)
    }
}
