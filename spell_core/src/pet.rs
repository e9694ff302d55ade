//! Pets and summoned minions
//!
//! A pet is a unit of kind [`UnitKind::Pet`] whose stats are derived from its
//! owner each time it is enabled. While enabled it runs an autoattack loop and
//! a priority rotation; disabling stops both through a generation counter.

use crate::config::ConfigError;
use crate::sim::{Simulation, Unit};
use crate::stats::StatSheet;
use crate::types::{SpellId, SpellRef, UnitId, UnitKind};
use std::fmt;
use std::rc::Rc;
use std::time::Duration;
use tracing::{debug, trace};

/// Wait before a rotation retries when nothing was castable and nothing is cooling down
const PET_IDLE_POLL: Duration = Duration::from_millis(500);

/// Pure mapping from owner stats to pet stats
pub type StatInheritance = Rc<dyn Fn(&StatSheet) -> StatSheet>;

/// Pet-specific state of a unit
#[derive(Clone)]
pub struct PetState {
    pub owner: UnitId,
    inheritance: StatInheritance,
    enabled: bool,
    generation: u64,
    timeout_generation: u64,
    autoattack: Option<(SpellId, Duration)>,
    rotation: Vec<SpellId>,
    expires_at: Option<Duration>,
    enables: u64,
}

impl PetState {
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Swing interval when `spell` is this pet's autoattack
    pub fn swing_interval(&self, spell: SpellId) -> Option<Duration> {
        self.autoattack
            .filter(|(autoattack, _)| *autoattack == spell)
            .map(|(_, interval)| interval)
    }

    /// Scheduled disable time of a timed summon
    pub fn expires_at(&self) -> Option<Duration> {
        self.expires_at
    }

    /// Number of times the pet was summoned
    pub fn enables(&self) -> u64 {
        self.enables
    }

    pub fn rotation(&self) -> &[SpellId] {
        &self.rotation
    }
}

impl fmt::Debug for PetState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PetState")
            .field("owner", &self.owner)
            .field("enabled", &self.enabled)
            .field("generation", &self.generation)
            .field("autoattack", &self.autoattack)
            .field("rotation", &self.rotation)
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

impl Simulation {
    /// Add a disabled pet owned by `owner`
    pub fn add_pet(
        &mut self,
        owner: UnitId,
        name: impl Into<String>,
        inheritance: impl Fn(&StatSheet) -> StatSheet + 'static,
    ) -> Result<UnitId, ConfigError> {
        self.require_unit(owner)?;
        let pet = self.add_unit(name, UnitKind::Pet, StatSheet::new());
        self.units[pet.0].pet = Some(PetState {
            owner,
            inheritance: Rc::new(inheritance),
            enabled: false,
            generation: 0,
            timeout_generation: 0,
            autoattack: None,
            rotation: Vec::new(),
            expires_at: None,
            enables: 0,
        });
        Ok(pet)
    }

    fn pet_state_mut(&mut self, pet: UnitId) -> Result<&mut PetState, ConfigError> {
        self.require_unit_mut(pet)?.pet.as_mut().ok_or_else(|| {
            ConfigError::ValidationError(format!("unit {} is not a pet", pet.0))
        })
    }

    pub fn set_pet_autoattack(&mut self, pet: UnitId, spell: SpellId, interval: Duration) -> Result<(), ConfigError> {
        if interval.is_zero() {
            return Err(ConfigError::ValidationError(
                "autoattack interval must be positive".to_string(),
            ));
        }
        self.pet_state_mut(pet)?.autoattack = Some((spell, interval));
        Ok(())
    }

    /// Spells tried in order each time the pet is free to act
    pub fn set_pet_rotation(&mut self, pet: UnitId, spells: Vec<SpellId>) -> Result<(), ConfigError> {
        self.pet_state_mut(pet)?.rotation = spells;
        Ok(())
    }

    pub fn is_pet_enabled(&self, pet: UnitId) -> bool {
        self.unit(pet)
            .and_then(|u| u.pet.as_ref())
            .map(|p| p.enabled)
            .unwrap_or(false)
    }

    pub fn pets_of(&self, owner: UnitId) -> Vec<UnitId> {
        self.units
            .iter()
            .filter(|u| u.pet.as_ref().map(|p| p.owner == owner).unwrap_or(false))
            .map(|u| u.id)
            .collect()
    }

    /// Summon a permanent pet
    pub fn enable_pet(&mut self, pet: UnitId) -> Result<(), ConfigError> {
        self.enable_pet_inner(pet, None)
    }

    /// Summon a pet that disables itself after `timeout`
    ///
    /// Enabling an already enabled pet only reschedules the timeout.
    pub fn enable_pet_with_timeout(&mut self, pet: UnitId, timeout: Duration) -> Result<(), ConfigError> {
        self.enable_pet_inner(pet, Some(timeout))
    }

    fn enable_pet_inner(&mut self, pet: UnitId, timeout: Option<Duration>) -> Result<(), ConfigError> {
        let now = self.now();
        let state = self.pet_state_mut(pet)?;
        let already_enabled = state.enabled;
        state.timeout_generation += 1;
        state.expires_at = timeout.map(|t| now + t);
        let timeout_generation = state.timeout_generation;
        let generation = if already_enabled {
            state.generation
        } else {
            state.enabled = true;
            state.generation += 1;
            state.enables += 1;
            state.generation
        };
        let owner = state.owner;
        let inheritance = Rc::clone(&state.inheritance);
        let autoattack = state.autoattack;

        if let Some(timeout) = timeout {
            self.schedule_at(now + timeout, move |sim| {
                let current = sim
                    .unit(pet)
                    .and_then(|u| u.pet.as_ref())
                    .map(|p| p.enabled && p.generation == generation && p.timeout_generation == timeout_generation)
                    .unwrap_or(false);
                if current {
                    sim.disable_pet(pet);
                }
            });
        }
        if already_enabled {
            trace!(pet = pet.0, "pet timeout rescheduled");
            return Ok(());
        }

        let owner_stats = self.require_unit(owner)?.stats.clone();
        let stats = inheritance(&owner_stats);
        let owner_target = self.unit(owner).and_then(|u| u.current_target);
        let unit = self.require_unit_mut(pet)?;
        unit.stats = stats;
        if unit.current_target.is_none() {
            unit.current_target = owner_target;
        }
        debug!(pet = pet.0, owner = owner.0, ?timeout, "pet enabled");

        if autoattack.is_some() {
            self.schedule_at(now, move |sim| sim.pet_autoattack(pet, generation));
        }
        self.schedule_at(now, move |sim| sim.pet_act(pet, generation));
        Ok(())
    }

    /// Stop loops, drop the current cast and remove every aura on the pet
    pub fn disable_pet(&mut self, pet: UnitId) {
        let unit = match self.unit_mut(pet) {
            Some(u) => u,
            None => return,
        };
        match unit.pet.as_mut() {
            Some(state) if state.enabled => {
                state.enabled = false;
                state.generation += 1;
                state.expires_at = None;
            }
            _ => return,
        }
        self.interrupt_cast(pet);
        debug!(pet = pet.0, "pet disabled");
        self.deactivate_all_auras(pet);
    }

    fn pet_is_current(&self, pet: UnitId, generation: u64) -> bool {
        self.unit(pet)
            .and_then(|u| u.pet.as_ref())
            .map(|p| p.enabled && p.generation == generation)
            .unwrap_or(false)
    }

    fn pet_target(&self, pet: UnitId) -> Option<UnitId> {
        let unit = self.unit(pet)?;
        unit.current_target.or_else(|| self.primary_target())
    }

    fn pet_autoattack(&mut self, pet: UnitId, generation: u64) {
        if !self.pet_is_current(pet, generation) {
            return;
        }
        let (spell, interval) = match self.unit(pet).and_then(|u| u.pet.as_ref()).and_then(|p| p.autoattack) {
            Some(a) => a,
            None => return,
        };
        if let Some(target) = self.pet_target(pet) {
            if let Err(err) = self.cast(SpellRef::new(pet, spell), target) {
                trace!(pet = pet.0, error = %err, "autoattack skipped");
            }
        }
        let next = self.now() + interval;
        self.schedule_at(next, move |sim| sim.pet_autoattack(pet, generation));
    }

    fn pet_act(&mut self, pet: UnitId, generation: u64) {
        if !self.pet_is_current(pet, generation) {
            return;
        }
        let now = self.now();
        if let Some(until) = self.unit(pet).and_then(Unit::busy_until).filter(|until| *until >= now) {
            self.schedule_at(until, move |sim| sim.pet_act(pet, generation));
            return;
        }

        let rotation = self
            .unit(pet)
            .and_then(|u| u.pet.as_ref())
            .map(|p| p.rotation.clone())
            .unwrap_or_default();
        if rotation.is_empty() {
            return;
        }
        if let Some(target) = self.pet_target(pet) {
            for spell in &rotation {
                if self.cast(SpellRef::new(pet, *spell), target).is_ok() {
                    break;
                }
            }
        }

        let next = rotation
            .iter()
            .filter_map(|s| self.ready_at(SpellRef::new(pet, *s)))
            .filter(|at| *at > now)
            .min()
            .unwrap_or(now + PET_IDLE_POLL);
        self.schedule_at(next, move |sim| sim.pet_act(pet, generation));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aura::{AuraConfig, AuraDuration};
    use crate::spell::SpellConfig;
    use crate::stats::Stat;
    use crate::types::{ActionId, SpellFlags, SpellSchool};

    fn setup() -> (Simulation, UnitId, UnitId, UnitId) {
        let mut sim = Simulation::new(9);
        let owner = sim.add_player("Hunter", StatSheet::new().with(Stat::AttackPower, 1000.0), 5000.0);
        let target = sim.add_enemy("Boar", 1_000_000.0);
        let pet = sim
            .add_pet(owner, "Cat", |owner| {
                StatSheet::new().with(Stat::AttackPower, owner.get(Stat::AttackPower) * 0.22)
            })
            .unwrap();
        let claw = sim
            .register_spell(
                pet,
                SpellConfig::new(ActionId::new(1), "Melee", SpellSchool::Physical)
                    .with_flags(SpellFlags::AUTO_ATTACK)
                    .with_gcd(Duration::ZERO)
                    .with_damage(10.0, 10.0),
            )
            .unwrap();
        sim.set_pet_autoattack(pet, claw.spell, Duration::from_secs(2)).unwrap();
        (sim, owner, pet, target)
    }

    #[test]
    fn test_stats_inherited_on_enable() {
        let (mut sim, _owner, pet, _target) = setup();
        assert_eq!(sim.unit(pet).unwrap().stats.get(Stat::AttackPower), 0.0);
        sim.enable_pet(pet).unwrap();
        assert!((sim.unit(pet).unwrap().stats.get(Stat::AttackPower) - 220.0).abs() < 1e-9);
    }

    #[test]
    fn test_timeout_disables_and_stops_loops() {
        let (mut sim, owner, pet, target) = setup();
        sim.enable_pet_with_timeout(pet, Duration::from_secs(5)).unwrap();
        sim.run_until(Duration::from_secs(5));
        assert!(!sim.is_pet_enabled(pet));
        // swings at 0, 2, 4
        assert!((sim.unit(target).unwrap().damage_taken - 30.0).abs() < 1e-9);
        sim.run_until(Duration::from_secs(20));
        assert!((sim.unit(target).unwrap().damage_taken - 30.0).abs() < 1e-9);
        assert_eq!(sim.pets_of(owner), vec![pet]);
    }

    #[test]
    fn test_reenable_reschedules_timeout() {
        let (mut sim, _owner, pet, _target) = setup();
        sim.enable_pet_with_timeout(pet, Duration::from_secs(5)).unwrap();
        sim.run_until(Duration::from_secs(3));
        sim.enable_pet_with_timeout(pet, Duration::from_secs(5)).unwrap();
        sim.run_until(Duration::from_secs(6));
        assert!(sim.is_pet_enabled(pet));
        sim.run_until(Duration::from_secs(8));
        assert!(!sim.is_pet_enabled(pet));
        assert_eq!(sim.unit(pet).unwrap().pet_state().unwrap().enables(), 1);
    }

    #[test]
    fn test_disable_removes_pet_auras() {
        let (mut sim, _owner, pet, _target) = setup();
        let frenzy = sim
            .register_aura(pet, AuraConfig::new("Frenzy", AuraDuration::from_secs_f64(8.0)))
            .unwrap();
        sim.enable_pet(pet).unwrap();
        sim.activate_aura(frenzy);
        sim.disable_pet(pet);
        assert!(!sim.is_aura_active(frenzy));
        let state = sim.aura(frenzy).unwrap();
        assert_eq!(state.gains(), state.expirations());
    }

    #[test]
    fn test_rotation_casts_when_ready() {
        let (mut sim, _owner, pet, _target) = setup();
        let bite = sim
            .register_spell(
                pet,
                SpellConfig::new(ActionId::new(17253), "Bite", SpellSchool::Physical)
                    .with_damage(50.0, 50.0)
                    .with_cooldown(Duration::from_secs(10)),
            )
            .unwrap();
        sim.set_pet_rotation(pet, vec![bite.spell]).unwrap();
        sim.enable_pet(pet).unwrap();
        sim.run_until(Duration::from_secs(25));
        assert_eq!(sim.spell(bite).unwrap().metrics.casts, 3);
    }
}
