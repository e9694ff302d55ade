//! Trial run configuration

use crate::error::SimError;
use serde::{Deserialize, Serialize};
use spell_core::config::{load_toml, SimConfig, UnitConfig};
use std::path::Path;

/// Everything needed to build one trial besides the spell list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunConfig {
    #[serde(default)]
    pub sim: SimConfig,
    pub player: UnitConfig,
    /// A target with `SimConfig::target_health` when unset
    #[serde(default)]
    pub target: Option<UnitConfig>,
    /// Spell labels in priority order
    pub rotation: Vec<String>,
}

impl RunConfig {
    pub fn load(path: &Path) -> Result<Self, SimError> {
        let config: RunConfig = load_toml(path)?;
        config.sim.validate()?;
        Ok(config)
    }

    pub fn target_health(&self) -> f64 {
        match &self.target {
            Some(target) if target.health > 0.0 => target.health,
            _ => self.sim.target_health,
        }
    }

    pub fn target_name(&self) -> &str {
        self.target.as_ref().map(|t| t.name.as_str()).unwrap_or("Target")
    }
}
