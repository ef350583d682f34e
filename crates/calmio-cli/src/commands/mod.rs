pub mod config;
pub mod data;
pub mod dev;
pub mod pattern;
pub mod session;
pub mod stats;

use std::error::Error;
use std::sync::Arc;

use calmio_core::{BadgeCode, BadgeInfo, Clock, Config, JsonFilePersistence, StatsStore, SystemClock};
use chrono::{NaiveDate, NaiveDateTime};
use serde::Serialize;

pub type CliResult = Result<(), Box<dyn Error>>;

/// Wall clock shifted by the configured developer day offset.
pub fn system_clock(config: &Config) -> Arc<dyn Clock> {
    Arc::new(SystemClock::with_offset_days(config.developer.day_offset))
}

pub fn open_store(config: &Config) -> Result<StatsStore, Box<dyn Error>> {
    let persistence = JsonFilePersistence::open_default()?;
    Ok(StatsStore::open(system_clock(config), Box::new(persistence)))
}

pub fn print_json<T: Serialize>(value: &T) -> CliResult {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

pub fn badge_infos(codes: &[BadgeCode]) -> Vec<BadgeInfo> {
    codes.iter().copied().map(BadgeInfo::from).collect()
}

pub fn parse_date(raw: &str) -> Result<NaiveDate, Box<dyn Error>> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map_err(|e| format!("invalid date '{raw}' (expected YYYY-MM-DD): {e}").into())
}

/// Accepts `YYYY-MM-DD HH:MM[:SS]` or `YYYY-MM-DDTHH:MM[:SS]`.
pub fn parse_datetime(raw: &str) -> Result<NaiveDateTime, Box<dyn Error>> {
    ["%Y-%m-%d %H:%M:%S", "%Y-%m-%d %H:%M", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .ok_or_else(|| format!("invalid start '{raw}' (expected YYYY-MM-DD HH:MM[:SS])").into())
}
