//! Trial configuration

use super::ConfigError;
use crate::types::seconds;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

fn default_trials() -> u32 {
    1000
}

fn default_duration() -> Duration {
    Duration::from_secs(180)
}

fn default_target_health() -> f64 {
    1_000_000.0
}

/// How many trials to run and for how long
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimConfig {
    #[serde(default = "default_trials")]
    pub trials: u32,
    /// Trial `i` is seeded with `seed + i`
    #[serde(default)]
    pub seed: u64,
    /// Simulated fight length, in seconds
    #[serde(default = "default_duration", with = "seconds")]
    pub duration: Duration,
    #[serde(default = "default_target_health")]
    pub target_health: f64,
    /// Worker threads; the global rayon pool when unset
    #[serde(default)]
    pub threads: Option<usize>,
}

impl Default for SimConfig {
    fn default() -> Self {
        SimConfig {
            trials: default_trials(),
            seed: 0,
            duration: default_duration(),
            target_health: default_target_health(),
            threads: None,
        }
    }
}

impl SimConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.trials == 0 {
            return Err(ConfigError::ValidationError(
                "trials must be at least 1".to_string(),
            ));
        }
        if self.duration.is_zero() {
            return Err(ConfigError::ValidationError(
                "duration must be positive".to_string(),
            ));
        }
        if self.threads == Some(0) {
            return Err(ConfigError::ValidationError(
                "threads must be at least 1 when set".to_string(),
            ));
        }
        Ok(())
    }
}

/// Load a trial configuration from a TOML file
pub fn load_sim_config(path: &Path) -> Result<SimConfig, ConfigError> {
    let config: SimConfig = super::load_toml(path)?;
    config.validate()?;
    Ok(config)
}

/// Load a trial configuration from a TOML string
pub fn parse_sim_config(content: &str) -> Result<SimConfig, ConfigError> {
    let config: SimConfig = super::parse_toml(content)?;
    config.validate()?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = parse_sim_config("").unwrap();
        assert_eq!(config.trials, 1000);
        assert_eq!(config.duration, Duration::from_secs(180));
        assert!(config.threads.is_none());
    }

    #[test]
    fn test_parse_sim() {
        let config = parse_sim_config(
            r#"
trials = 50
seed = 7
duration = 60.5
threads = 2
"#,
        )
        .unwrap();
        assert_eq!(config.trials, 50);
        assert_eq!(config.seed, 7);
        assert_eq!(config.duration, Duration::from_secs_f64(60.5));
        assert_eq!(config.threads, Some(2));
    }

    #[test]
    fn test_rejects_zero_trials() {
        assert!(matches!(
            parse_sim_config("trials = 0"),
            Err(ConfigError::ValidationError(_))
        ));
        assert!(matches!(
            parse_sim_config("duration = -1.0"),
            Err(ConfigError::ParseError(_))
        ));
    }
}
