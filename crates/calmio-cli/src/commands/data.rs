use calmio_core::Config;
use clap::Subcommand;

use super::{open_store, print_json, CliResult};

#[derive(Subcommand)]
pub enum DataAction {
    /// Erase all sessions, totals, streak and badges
    Clear {
        /// Confirm the irreversible reset
        #[arg(long)]
        yes: bool,
    },
    /// Print the stats document as JSON
    Export,
}

pub fn run(action: DataAction) -> CliResult {
    let config = Config::load()?;
    let mut store = open_store(&config)?;

    match action {
        DataAction::Clear { yes } => {
            if !yes {
                return Err("refusing to clear data without --yes".into());
            }
            store.clear_data()?;
            println!("data cleared");
        }
        DataAction::Export => print_json(store.document())?,
    }
    Ok(())
}
