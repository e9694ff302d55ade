//! Core identifiers and enums shared across the engine

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Index of a unit inside a simulation
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct UnitId(pub usize);

/// Index of a spell inside its owner's spellbook
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SpellId(pub usize);

/// Index of an aura inside its owner's aura set
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct AuraId(pub usize);

/// Index of a modifier inside its owner's modifier stack
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ModifierId(pub usize);

/// Index of a timer inside its owner's timer list
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TimerId(pub usize);

/// A spell owned by a specific unit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SpellRef {
    pub unit: UnitId,
    pub spell: SpellId,
}

impl SpellRef {
    pub fn new(unit: UnitId, spell: SpellId) -> Self {
        SpellRef { unit, spell }
    }
}

/// An aura owned by a specific unit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AuraRef {
    pub unit: UnitId,
    pub aura: AuraId,
}

impl AuraRef {
    pub fn new(unit: UnitId, aura: AuraId) -> Self {
        AuraRef { unit, aura }
    }
}

/// A modifier owned by a specific unit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ModifierRef {
    pub unit: UnitId,
    pub modifier: ModifierId,
}

impl ModifierRef {
    pub fn new(unit: UnitId, modifier: ModifierId) -> Self {
        ModifierRef { unit, modifier }
    }
}

/// Spell identity: base spell id, rank and tag
///
/// Two registrations with the same `ActionId` on the same unit resolve to
/// the same spell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ActionId {
    pub spell_id: i32,
    #[serde(default)]
    pub rank: u8,
    #[serde(default)]
    pub tag: i32,
}

impl ActionId {
    pub fn new(spell_id: i32) -> Self {
        ActionId {
            spell_id,
            rank: 0,
            tag: 0,
        }
    }

    pub fn with_rank(self, rank: u8) -> Self {
        ActionId { rank, ..self }
    }

    pub fn with_tag(self, tag: i32) -> Self {
        ActionId { tag, ..self }
    }
}

impl fmt::Display for ActionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.spell_id)?;
        if self.rank > 0 {
            write!(f, "r{}", self.rank)?;
        }
        if self.tag != 0 {
            write!(f, "#{}", self.tag)?;
        }
        Ok(())
    }
}

/// Magic school of a spell
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpellSchool {
    Physical,
    Arcane,
    Fire,
    Frost,
    Nature,
    Shadow,
    Holy,
}

/// Result of an outcome roll
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HitOutcome {
    Miss,
    Hit,
    Crit,
    Resist,
}

impl HitOutcome {
    /// Whether the effect connected with its target
    pub fn landed(self) -> bool {
        matches!(self, HitOutcome::Hit | HitOutcome::Crit)
    }

    pub fn is_crit(self) -> bool {
        self == HitOutcome::Crit
    }
}

/// Kind of unit inside a simulation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnitKind {
    Player,
    Enemy,
    Pet,
}

/// Spell flag bits used by modifier and proc selectors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SpellFlags(pub u32);

impl SpellFlags {
    pub const NONE: SpellFlags = SpellFlags(0);
    /// Spell is a periodic-only effect (no direct component)
    pub const PURE_DOT: SpellFlags = SpellFlags(1 << 0);
    /// Spell is channeled
    pub const CHANNELED: SpellFlags = SpellFlags(1 << 1);
    /// Spell heals instead of damaging
    pub const HELPFUL: SpellFlags = SpellFlags(1 << 2);
    /// Spell ignores every modifier
    pub const NO_MODIFIERS: SpellFlags = SpellFlags(1 << 3);
    /// Spell is a pet autoattack
    pub const AUTO_ATTACK: SpellFlags = SpellFlags(1 << 4);
    /// Spell was cast by a proc and cannot itself trigger procs
    pub const NO_PROCS: SpellFlags = SpellFlags(1 << 5);

    /// True when any bit of `other` is set
    pub fn matches(self, other: SpellFlags) -> bool {
        self.0 & other.0 != 0
    }

    pub fn contains(self, other: SpellFlags) -> bool {
        self.0 & other.0 == other.0
    }
}

impl std::ops::BitOr for SpellFlags {
    type Output = SpellFlags;

    fn bitor(self, rhs: SpellFlags) -> SpellFlags {
        SpellFlags(self.0 | rhs.0)
    }
}

/// Longest duration any timer or effect may run; keeps `now + duration` from overflowing
pub const MAX_DURATION: Duration = Duration::from_secs(u32::MAX as u64);

/// Seconds to a duration, saturating at zero and `MAX_DURATION`
pub fn saturating_secs(secs: f64) -> Duration {
    if secs.is_nan() || secs <= 0.0 {
        return Duration::ZERO;
    }
    Duration::try_from_secs_f64(secs).map_or(MAX_DURATION, |d| d.min(MAX_DURATION))
}

/// Serde adapters for durations expressed as seconds in configuration files
pub mod seconds {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(value.as_secs_f64())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let secs = f64::deserialize(deserializer)?;
        from_secs(secs).map_err(serde::de::Error::custom)
    }

    pub(crate) fn from_secs(secs: f64) -> Result<Duration, String> {
        let duration =
            Duration::try_from_secs_f64(secs).map_err(|e| format!("invalid duration of {} seconds: {}", secs, e))?;
        if duration > super::MAX_DURATION {
            return Err(format!("duration of {} seconds is out of range", secs));
        }
        Ok(duration)
    }

    /// Same as the parent module for `Option<Duration>`
    pub mod option {
        use serde::{Deserialize, Deserializer, Serializer};
        use std::time::Duration;

        pub fn serialize<S: Serializer>(
            value: &Option<Duration>,
            serializer: S,
        ) -> Result<S::Ok, S::Error> {
            match value {
                Some(d) => serializer.serialize_some(&d.as_secs_f64()),
                None => serializer.serialize_none(),
            }
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(
            deserializer: D,
        ) -> Result<Option<Duration>, D::Error> {
            let secs = Option::<f64>::deserialize(deserializer)?;
            secs.map(super::from_secs).transpose().map_err(serde::de::Error::custom)
        }
    }
}
