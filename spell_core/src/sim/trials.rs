//! Independent trials run in parallel
//!
//! Every trial builds its own [`Simulation`] inside the worker that runs it,
//! seeded with `seed + trial index`, so results do not depend on the number
//! of threads.

use super::Simulation;
use crate::config::{ConfigError, SimConfig};
use crate::spell::SpellMetrics;
use crate::types::UnitKind;
use rayon::prelude::*;
use rayon::ThreadPoolBuilder;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::info;

/// Outcome of one trial
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrialSummary {
    pub seed: u64,
    pub damage: f64,
    pub healing: f64,
    pub dps: f64,
    pub hps: f64,
    /// Metrics of every non-enemy spell, keyed by label
    pub spells: BTreeMap<String, SpellMetrics>,
}

/// Mean, standard deviation and range of a sample
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Distribution {
    pub mean: f64,
    pub stddev: f64,
    pub min: f64,
    pub max: f64,
}

impl Distribution {
    pub fn from_samples(samples: &[f64]) -> Self {
        if samples.is_empty() {
            return Self::default();
        }
        let n = samples.len() as f64;
        let mean = samples.iter().sum::<f64>() / n;
        let variance = samples.iter().map(|s| (s - mean).powi(2)).sum::<f64>() / n;
        Distribution {
            mean,
            stddev: variance.sqrt(),
            min: samples.iter().copied().fold(f64::INFINITY, f64::min),
            max: samples.iter().copied().fold(f64::NEG_INFINITY, f64::max),
        }
    }
}

/// Aggregate over every trial
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrialReport {
    pub trials: u32,
    pub duration_secs: f64,
    pub dps: Distribution,
    pub hps: Distribution,
    /// Per-spell metrics summed over every trial
    pub spells: BTreeMap<String, SpellMetrics>,
    #[serde(skip)]
    pub summaries: Vec<TrialSummary>,
}

impl TrialReport {
    fn from_summaries(config: &SimConfig, summaries: Vec<TrialSummary>) -> Self {
        let dps: Vec<f64> = summaries.iter().map(|s| s.dps).collect();
        let hps: Vec<f64> = summaries.iter().map(|s| s.hps).collect();
        let mut spells: BTreeMap<String, SpellMetrics> = BTreeMap::new();
        for summary in &summaries {
            for (label, metrics) in &summary.spells {
                spells.entry(label.clone()).or_default().merge(metrics);
            }
        }
        TrialReport {
            trials: config.trials,
            duration_secs: config.duration.as_secs_f64(),
            dps: Distribution::from_samples(&dps),
            hps: Distribution::from_samples(&hps),
            spells,
            summaries,
        }
    }
}

/// Run one trial on an already built simulation
pub fn run_trial(sim: &mut Simulation, config: &SimConfig) -> TrialSummary {
    sim.reset();
    sim.run_until(config.duration);
    sim.finish();

    let secs = config.duration.as_secs_f64().max(f64::EPSILON);
    let mut damage = 0.0;
    let mut healing = 0.0;
    let mut spells: BTreeMap<String, SpellMetrics> = BTreeMap::new();
    for unit in sim.units().iter().filter(|u| u.kind != UnitKind::Enemy) {
        damage += unit.damage_done();
        healing += unit.healing_done();
        for spell in unit.spellbook().iter() {
            spells
                .entry(spell.label.clone())
                .or_default()
                .merge(&spell.metrics);
        }
    }
    TrialSummary {
        seed: sim.seed(),
        damage,
        healing,
        dps: damage / secs,
        hps: healing / secs,
        spells,
    }
}

/// Run `config.trials` independent trials in parallel
///
/// `build` receives the trial seed and returns a fully set up simulation.
pub fn run_trials<F>(config: &SimConfig, build: F) -> Result<TrialReport, ConfigError>
where
    F: Fn(u64) -> Result<Simulation, ConfigError> + Sync,
{
    config.validate()?;
    let run = || {
        (0..config.trials)
            .into_par_iter()
            .map(|i| -> Result<TrialSummary, ConfigError> {
                let mut sim = build(config.seed.wrapping_add(i as u64))?;
                Ok(run_trial(&mut sim, config))
            })
            .collect::<Result<Vec<_>, ConfigError>>()
    };

    let summaries = match config.threads {
        Some(threads) => ThreadPoolBuilder::new()
            .num_threads(threads)
            .build()
            .map_err(|e| ConfigError::ValidationError(format!("thread pool: {}", e)))?
            .install(run)?,
        None => run()?,
    };

    let report = TrialReport::from_summaries(config, summaries);
    info!(
        trials = report.trials,
        dps = report.dps.mean,
        stddev = report.dps.stddev,
        "trials complete"
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_distribution() {
        let d = Distribution::from_samples(&[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]);
        assert!((d.mean - 5.0).abs() < 1e-9);
        assert!((d.stddev - 2.0).abs() < 1e-9);
        assert_eq!(d.min, 2.0);
        assert_eq!(d.max, 9.0);
        assert_eq!(Distribution::from_samples(&[]), Distribution::default());
    }
}
