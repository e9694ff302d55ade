//! Spell configuration loading

use super::ConfigError;
use crate::spell::SpellConfig;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

/// Container for spell configurations
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpellsConfig {
    #[serde(rename = "spell")]
    pub spells: Vec<SpellConfig>,
}

impl SpellsConfig {
    /// Validate every spell and reject repeated action ids
    fn into_validated(self) -> Result<Vec<SpellConfig>, ConfigError> {
        let mut seen = HashSet::new();
        for spell in &self.spells {
            spell.validate()?;
            if !seen.insert(spell.action_id) {
                return Err(ConfigError::ValidationError(format!(
                    "{}: action id {} defined twice",
                    spell.label, spell.action_id
                )));
            }
        }
        Ok(self.spells)
    }
}

/// Load spell configurations from a TOML file
pub fn load_spell_configs(path: &Path) -> Result<Vec<SpellConfig>, ConfigError> {
    let config: SpellsConfig = super::load_toml(path)?;
    config.into_validated()
}

/// Load spell configurations from a TOML string
pub fn parse_spell_configs(content: &str) -> Result<Vec<SpellConfig>, ConfigError> {
    let config: SpellsConfig = super::parse_toml(content)?;
    config.into_validated()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dot::RolloverPolicy;
    use crate::types::ActionId;
    use std::time::Duration;

    const SPELLS: &str = r#"
[[spell]]
label = "Shadow Bolt"
school = "shadow"
class_mask = 1
cast_time = 3.0
cost = 420.0
bonus_coefficient = 0.857
action_id = { spell_id = 686, rank = 9 }
base_damage = { min = 455.0, max = 507.0 }

[[spell]]
label = "Corruption"
school = "shadow"
flags = 1
cost = 340.0
action_id = { spell_id = 172 }

[spell.dot]
number_of_ticks = 6
tick_length = 3.0
base_tick = 137.0
bonus_coefficient = 0.156
rollover = "preserve"
"#;

    #[test]
    fn test_parse_spells() {
        let spells = parse_spell_configs(SPELLS).unwrap();
        assert_eq!(spells.len(), 2);
        assert_eq!(spells[0].action_id, ActionId::new(686).with_rank(9));
        assert_eq!(spells[0].cast_time, Duration::from_secs(3));
        assert!(spells[0].dot.is_none());

        let dot = spells[1].dot.as_ref().unwrap();
        assert_eq!(dot.duration(), Duration::from_secs(18));
        assert_eq!(dot.rollover, RolloverPolicy::Preserve);
    }

    #[test]
    fn test_duplicate_action_id_rejected() {
        let content = r#"
[[spell]]
label = "Fireball"
school = "fire"
action_id = { spell_id = 133 }

[[spell]]
label = "Fireball Again"
school = "fire"
action_id = { spell_id = 133 }
"#;
        assert!(matches!(
            parse_spell_configs(content),
            Err(ConfigError::ValidationError(_))
        ));
    }

    #[test]
    fn test_invalid_dot_rejected() {
        let content = r#"
[[spell]]
label = "Broken"
school = "shadow"
action_id = { spell_id = 1 }

[spell.dot]
number_of_ticks = 0
tick_length = 3.0
"#;
        assert!(parse_spell_configs(content).is_err());
    }

    #[test]
    fn test_oversized_cast_time_is_a_parse_error() {
        let content = r#"
[[spell]]
label = "Forever"
school = "arcane"
cast_time = 1e30
action_id = { spell_id = 2 }
"#;
        assert!(matches!(
            parse_spell_configs(content),
            Err(ConfigError::ParseError(_))
        ));
    }
}
