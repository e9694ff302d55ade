//! Unit configuration

use crate::stats::{Stat, StatSheet};
use crate::types::UnitKind;
use serde::{Deserialize, Serialize};

/// One base stat value
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StatEntry {
    pub stat: Stat,
    pub value: f64,
}

fn default_kind() -> UnitKind {
    UnitKind::Player
}

/// A unit described in configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnitConfig {
    pub name: String,
    #[serde(default = "default_kind")]
    pub kind: UnitKind,
    #[serde(default)]
    pub resource: f64,
    #[serde(default)]
    pub health: f64,
    #[serde(default)]
    pub stats: Vec<StatEntry>,
}

impl UnitConfig {
    pub fn stat_sheet(&self) -> StatSheet {
        let mut sheet = StatSheet::new();
        for entry in &self.stats {
            sheet.set_base(entry.stat, entry.value);
        }
        sheet
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_unit() {
        let config: UnitConfig = crate::config::parse_toml(
            r#"
name = "Warlock"
resource = 8000.0

[[stats]]
stat = "spell_power"
value = 600.0

[[stats]]
stat = "spell_crit"
value = 0.1
"#,
        )
        .unwrap();
        assert_eq!(config.kind, UnitKind::Player);
        let sheet = config.stat_sheet();
        assert!((sheet.get(Stat::SpellPower) - 600.0).abs() < f64::EPSILON);
        assert!((sheet.get(Stat::SpellCrit) - 0.1).abs() < f64::EPSILON);
    }
}
