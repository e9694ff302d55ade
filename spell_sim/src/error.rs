//! Error type of the trial runner

use spell_core::ConfigError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SimError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("Failed to serialize report: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Rotation names unknown spell '{0}'")]
    UnknownSpell(String),
    #[error("Usage: spell_sim [run.toml] [spells.toml] [--json]")]
    Usage,
}
