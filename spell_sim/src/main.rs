//! spell_sim - Headless trial runner for spell_core
//!
//! Usage: `spell_sim [run.toml] [spells.toml] [--json]`
//!
//! Builds the configured player and target, drives the player with its
//! priority list and prints an aggregate over every trial.

mod error;
mod report;
mod rotation;
mod run_config;

use error::SimError;
use rotation::PriorityList;
use run_config::RunConfig;
use spell_core::config::parse_spell_configs;
use spell_core::{run_trials, ConfigError, Simulation, TrialReport};
use std::fs;
use std::path::PathBuf;
use tracing_subscriber::filter::EnvFilter;

const DEFAULT_RUN: &str = "config/sim.toml";
const DEFAULT_SPELLS: &str = "config/spells.toml";

fn init_logging() {
    let filter = EnvFilter::builder()
        .with_default_directive(tracing::Level::INFO.into())
        .from_env_lossy();
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();
}

struct Args {
    run: PathBuf,
    spells: PathBuf,
    json: bool,
}

fn parse_args() -> Result<Args, SimError> {
    let mut paths = Vec::new();
    let mut json = false;
    for arg in std::env::args().skip(1) {
        match arg.as_str() {
            "--json" => json = true,
            "-h" | "--help" => return Err(SimError::Usage),
            _ if arg.starts_with('-') => return Err(SimError::Usage),
            _ => paths.push(PathBuf::from(arg)),
        }
    }
    if paths.len() > 2 {
        return Err(SimError::Usage);
    }
    let mut paths = paths.into_iter();
    Ok(Args {
        run: paths.next().unwrap_or_else(|| PathBuf::from(DEFAULT_RUN)),
        spells: paths.next().unwrap_or_else(|| PathBuf::from(DEFAULT_SPELLS)),
        json,
    })
}

/// Build one trial's simulation
///
/// Spell configs hold `Rc` hook handles, so every worker parses its own copy.
fn build(run: &RunConfig, spells: &str, seed: u64) -> Result<Simulation, ConfigError> {
    let mut sim = Simulation::new(seed);
    let player = sim.add_unit_from_config(&run.player);
    let target = sim.add_enemy(run.target_name(), run.target_health());
    if let Some(config) = &run.target {
        if let Some(unit) = sim.unit_mut(target) {
            unit.stats = config.stat_sheet();
        }
    }
    if let Some(unit) = sim.unit_mut(player) {
        unit.current_target = Some(target);
    }

    let mut registered = Vec::new();
    for config in parse_spell_configs(spells)? {
        let label = config.label.clone();
        registered.push((label, sim.register_spell(player, config)?));
    }
    let mut priority = Vec::new();
    for label in &run.rotation {
        match registered.iter().find(|(l, _)| l == label) {
            Some((_, spell)) => priority.push(*spell),
            None => {
                return Err(ConfigError::ValidationError(format!(
                    "rotation names unknown spell '{}'",
                    label
                )))
            }
        }
    }
    PriorityList::new(player, target, priority).install(&mut sim);
    Ok(sim)
}

fn run(args: &Args) -> Result<TrialReport, SimError> {
    let config = RunConfig::load(&args.run)?;
    let spells = fs::read_to_string(&args.spells).map_err(ConfigError::from)?;

    // Fail on bad content before any worker starts
    let labels: Vec<String> = parse_spell_configs(&spells)?
        .into_iter()
        .map(|s| s.label)
        .collect();
    if let Some(missing) = config.rotation.iter().find(|l| !labels.contains(l)) {
        return Err(SimError::UnknownSpell(missing.clone()));
    }

    tracing::info!(
        run = %args.run.display(),
        spells = labels.len(),
        trials = config.sim.trials,
        "starting trials"
    );
    let report = run_trials(&config.sim, |seed| build(&config, &spells, seed))?;
    Ok(report)
}

fn main() {
    init_logging();

    let args = match parse_args() {
        Ok(args) => args,
        Err(e) => {
            eprintln!("{}", e);
            std::process::exit(2);
        }
    };

    let report = match run(&args) {
        Ok(report) => report,
        Err(e) => {
            tracing::error!(error = %e, "simulation failed");
            std::process::exit(1);
        }
    };

    if args.json {
        match serde_json::to_string_pretty(&report) {
            Ok(json) => println!("{}", json),
            Err(e) => {
                tracing::error!(error = %SimError::from(e), "report output failed");
                std::process::exit(1);
            }
        }
    } else {
        print!("{}", report::render(&report));
    }
}
