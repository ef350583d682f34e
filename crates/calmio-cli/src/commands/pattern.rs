use calmio_core::{builtin_patterns, BreathPattern, Config, KeyState};
use clap::Subcommand;
use serde::Serialize;

use super::{print_json, CliResult};

#[derive(Subcommand)]
pub enum PatternAction {
    /// List built-in and custom patterns
    List,
    /// Show one pattern with its expected key states
    Show {
        /// Pattern id
        id: String,
    },
}

#[derive(Serialize)]
struct PatternSummary {
    id: String,
    label: String,
    custom: bool,
    cycle_seconds: f64,
    breaths_per_minute: f64,
}

#[derive(Serialize)]
struct PatternDetail<'a> {
    #[serde(flatten)]
    pattern: &'a BreathPattern,
    expected_key_states: &'a [KeyState],
    cycle_seconds: f64,
}

fn summary(id: String, label: String, custom: bool, pattern: &BreathPattern) -> PatternSummary {
    PatternSummary {
        id,
        label,
        custom,
        cycle_seconds: pattern.cycle_duration_ms() as f64 / 1000.0,
        breaths_per_minute: pattern.breaths_per_minute(),
    }
}

pub fn run(action: PatternAction) -> CliResult {
    let config = Config::load()?;

    match action {
        PatternAction::List => {
            let mut list: Vec<PatternSummary> = builtin_patterns()
                .iter()
                .map(|info| summary(info.id.into(), info.label.into(), false, &info.pattern))
                .collect();
            for custom in &config.patterns {
                // Invalid custom patterns are rejected when the config loads.
                if let Ok(pattern) = custom.to_pattern() {
                    list.push(summary(custom.id.clone(), custom.id.clone(), true, &pattern));
                }
            }
            print_json(&list)?;
        }
        PatternAction::Show { id } => {
            let pattern = config.find_pattern(&id)?;
            print_json(&PatternDetail {
                pattern: &pattern,
                expected_key_states: pattern.expected_key_states(),
                cycle_seconds: pattern.cycle_duration_ms() as f64 / 1000.0,
            })?;
        }
    }
    Ok(())
}
