//! StatValue - The triple modifier container (Flat → Increased → More)

use serde::{Deserialize, Serialize};

/// How a bonus combines with the value it modifies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModKind {
    /// Added to the base before any percentage is applied
    FlatAdd,
    /// Summed with every other percent-add bonus, applied as `1 + Σ`
    PercentAdd,
    /// Applied as its own `(1 + value)` factor
    PercentMultiply,
}

/// Represents a value that follows the Flat → Increased → More model
///
/// Final value is calculated as:
/// `(base + flat) × (1 + increased) × Π(1 + more)`
///
/// - `base`: The base value (from the spell or the character)
/// - `flat`: Sum of all flat additions
/// - `increased`: Sum of all percent-add bonuses (as decimal, e.g., 0.40 = 40%)
/// - `more`: List of percent-multiply factors (as decimal, each multiplies the result)
///
/// The order is fixed. Bonuses from independent sources therefore combine to
/// the same result whatever order they were added in.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StatValue {
    pub base: f64,
    pub flat: f64,
    pub increased: f64,
    pub more: Vec<f64>,
}

impl StatValue {
    /// Create a new StatValue with the given base
    pub fn with_base(base: f64) -> Self {
        StatValue {
            base,
            flat: 0.0,
            increased: 0.0,
            more: Vec::new(),
        }
    }

    /// Calculate final value: (base + flat) × (1 + increased) × Π(1 + more)
    pub fn compute(&self) -> f64 {
        let base_total = self.base + self.flat;
        let increased_mult = 1.0 + self.increased;
        let more_mult: f64 = self.more.iter().map(|m| 1.0 + m).product();
        base_total * increased_mult * more_mult
    }

    pub fn add_flat(&mut self, value: f64) {
        self.flat += value;
    }

    pub fn add_increased(&mut self, value: f64) {
        self.increased += value;
    }

    pub fn add_more(&mut self, value: f64) {
        self.more.push(value);
    }

    /// Add a bonus of the given kind
    pub fn add(&mut self, kind: ModKind, value: f64) {
        match kind {
            ModKind::FlatAdd => self.add_flat(value),
            ModKind::PercentAdd => self.add_increased(value),
            ModKind::PercentMultiply => self.add_more(value),
        }
    }

    /// Remove a bonus previously added with [`StatValue::add`]
    ///
    /// Returns false if a percent-multiply factor with that value was not present.
    pub fn remove(&mut self, kind: ModKind, value: f64) -> bool {
        match kind {
            ModKind::FlatAdd => {
                self.flat -= value;
                true
            }
            ModKind::PercentAdd => {
                self.increased -= value;
                true
            }
            ModKind::PercentMultiply => {
                match self.more.iter().position(|m| m.to_bits() == value.to_bits()) {
                    Some(idx) => {
                        self.more.remove(idx);
                        true
                    }
                    None => false,
                }
            }
        }
    }

    /// Reset to just the base value
    pub fn reset_to_base(&mut self) {
        self.flat = 0.0;
        self.increased = 0.0;
        self.more.clear();
    }

    /// Get the total flat value (base + flat additions)
    pub fn total_flat(&self) -> f64 {
        self.base + self.flat
    }

    /// Get the total increased multiplier (1 + sum of increased%)
    pub fn total_increased_multiplier(&self) -> f64 {
        1.0 + self.increased
    }

    /// Get the total more multiplier (product of all more multipliers)
    pub fn total_more_multiplier(&self) -> f64 {
        self.more.iter().map(|m| 1.0 + m).product()
    }
}
