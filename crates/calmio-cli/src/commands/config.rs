use calmio_core::{Config, ConfigError};
use clap::Subcommand;
use serde::Serialize;

use super::{print_json, CliResult};

/// Dot-path access to `config.toml`, e.g. `breathing.inhale_ms` or
/// `developer.day_offset`.
#[derive(Subcommand)]
pub enum ConfigAction {
    /// Print one value
    Get { key: String },
    /// Change one value and save; "" or "none" clears `breathing.pattern`
    Set { key: String, value: String },
    /// Print the whole config as JSON
    List,
    /// Overwrite config.toml with the defaults
    Reset,
    /// Print where config.toml lives
    Path,
}

#[derive(Serialize)]
struct Updated<'a> {
    key: &'a str,
    value: Option<String>,
}

pub fn run(action: ConfigAction) -> CliResult {
    match action {
        ConfigAction::Get { key } => {
            let value = Config::load()?
                .get(&key)
                .ok_or(ConfigError::UnknownKey(key))?;
            println!("{value}");
        }
        ConfigAction::Set { key, value } => {
            let mut config = Config::load()?;
            config.set(&key, &value)?;
            config.save()?;
            print_json(&Updated {
                key: &key,
                value: config.get(&key),
            })?;
        }
        ConfigAction::List => print_json(&Config::load()?)?,
        ConfigAction::Reset => {
            Config::default().save()?;
            println!("{}", Config::path()?.display());
        }
        ConfigAction::Path => println!("{}", Config::path()?.display()),
    }
    Ok(())
}
