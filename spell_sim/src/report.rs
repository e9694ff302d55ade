//! Plain-text rendering of a trial report

use spell_core::TrialReport;
use std::fmt::Write;

pub fn render(report: &TrialReport) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{} trials of {:.0}s",
        report.trials, report.duration_secs
    );
    let _ = writeln!(
        out,
        "DPS  mean {:>9.1}  stddev {:>7.1}  min {:>9.1}  max {:>9.1}",
        report.dps.mean, report.dps.stddev, report.dps.min, report.dps.max
    );
    if report.hps.max > 0.0 {
        let _ = writeln!(
            out,
            "HPS  mean {:>9.1}  stddev {:>7.1}  min {:>9.1}  max {:>9.1}",
            report.hps.mean, report.hps.stddev, report.hps.min, report.hps.max
        );
    }

    let total: f64 = report.spells.values().map(|m| m.damage + m.healing).sum();
    let trials = report.trials.max(1) as f64;
    let _ = writeln!(out);
    let _ = writeln!(
        out,
        "{:<24} {:>8} {:>8} {:>7} {:>12} {:>7}",
        "Spell", "Casts", "Ticks", "Crit%", "Per trial", "Share"
    );
    for (label, metrics) in &report.spells {
        let amount = metrics.damage + metrics.healing;
        let share = if total > 0.0 { amount / total * 100.0 } else { 0.0 };
        let _ = writeln!(
            out,
            "{:<24} {:>8.1} {:>8.1} {:>6.1}% {:>12.1} {:>6.1}%",
            label,
            metrics.casts as f64 / trials,
            metrics.ticks as f64 / trials,
            metrics.crit_rate() * 100.0,
            amount / trials,
            share
        );
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use spell_core::sim::Distribution;
    use spell_core::spell::SpellMetrics;
    use std::collections::BTreeMap;

    #[test]
    fn test_render_lists_spells() {
        let mut spells = BTreeMap::new();
        spells.insert(
            "Shadow Bolt".to_string(),
            SpellMetrics {
                casts: 20,
                hits: 20,
                damage: 10_000.0,
                ..SpellMetrics::default()
            },
        );
        let report = TrialReport {
            trials: 2,
            duration_secs: 60.0,
            dps: Distribution::from_samples(&[80.0, 90.0]),
            hps: Distribution::default(),
            spells,
            summaries: Vec::new(),
        };
        let text = render(&report);
        assert!(text.contains("2 trials of 60s"));
        assert!(text.contains("Shadow Bolt"));
        assert!(text.contains("100.0%"));
        assert!(!text.contains("HPS"));
    }
}
