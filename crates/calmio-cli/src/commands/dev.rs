use calmio_core::Config;
use clap::Subcommand;
use tracing::info;

use super::{print_json, system_clock, CliResult};

#[derive(Subcommand)]
pub enum DevAction {
    /// Pretend `days` more days have passed
    AdvanceDay {
        #[arg(long, default_value_t = 1)]
        days: i64,
    },
    /// Back to the real date
    ResetOffset,
}

pub fn run(action: DevAction) -> CliResult {
    let mut config = Config::load()?;

    match action {
        DevAction::AdvanceDay { days } => {
            config.developer.day_offset = config.developer.day_offset.saturating_add(days);
        }
        DevAction::ResetOffset => {
            config.developer.day_offset = 0;
        }
    }
    config.save()?;
    info!(day_offset = config.developer.day_offset, "developer day offset changed");

    let today = system_clock(&config).today();
    print_json(&serde_json::json!({
        "day_offset": config.developer.day_offset,
        "today": today,
    }))
}
