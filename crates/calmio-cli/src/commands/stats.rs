use std::collections::BTreeMap;

use calmio_core::{BadgeCode, Config};
use chrono::Datelike;
use clap::Subcommand;
use serde::Serialize;

use super::{open_store, parse_date, print_json, CliResult};

#[derive(Subcommand)]
pub enum StatsAction {
    /// Today's total
    Today,
    /// Current streak in days
    Streak,
    /// Monday-based weekly summary
    Week {
        /// Any day of the week, "YYYY-MM-DD" (defaults to today)
        #[arg(long)]
        date: Option<String>,
    },
    /// Monthly summary with goal progress
    Month {
        #[arg(long)]
        year: Option<i32>,
        #[arg(long)]
        month: Option<u32>,
    },
    /// Badge counts, all-time or for one day
    Badges {
        /// "YYYY-MM-DD"
        #[arg(long)]
        date: Option<String>,
    },
}

#[derive(Serialize)]
struct TodayStats {
    date: chrono::NaiveDate,
    seconds: u32,
    minutes: f64,
    sessions: usize,
    streak: u32,
}

/// Codes written by newer versions have no catalog entry.
#[derive(Serialize)]
struct BadgeCount {
    code: String,
    count: u32,
    catalog_id: Option<u32>,
    title: Option<&'static str>,
    emoji: Option<&'static str>,
}

fn badge_counts(counts: &BTreeMap<String, u32>) -> Vec<BadgeCount> {
    counts
        .iter()
        .map(|(code, count)| {
            let known = code.parse::<BadgeCode>().ok();
            BadgeCount {
                code: code.clone(),
                count: *count,
                catalog_id: known.map(|c| c.catalog_id()),
                title: known.map(|c| c.title()),
                emoji: known.map(|c| c.emoji()),
            }
        })
        .collect()
}

pub fn run(action: StatsAction) -> CliResult {
    let config = Config::load()?;
    let store = open_store(&config)?;
    let today = store.clock().today();

    match action {
        StatsAction::Today => {
            let seconds = store.get_today_seconds();
            print_json(&TodayStats {
                date: today,
                seconds,
                minutes: f64::from(seconds) / 60.0,
                sessions: store.get_sessions_for_date(today).len(),
                streak: store.get_streak(),
            })?;
        }
        StatsAction::Streak => {
            print_json(&serde_json::json!({ "streak": store.get_streak() }))?;
        }
        StatsAction::Week { date } => {
            let reference = date.as_deref().map(parse_date).transpose()?.unwrap_or(today);
            print_json(&store.get_weekly_summary(reference))?;
        }
        StatsAction::Month { year, month } => {
            let summary = store.get_monthly_summary(
                year.unwrap_or(today.year()),
                month.unwrap_or(today.month()),
                config.goals.monthly_minutes,
            )?;
            print_json(&summary)?;
        }
        StatsAction::Badges { date } => match date {
            Some(raw) => {
                let date = parse_date(&raw)?;
                print_json(&badge_counts(&store.get_badges_for_date(date)))?;
            }
            None => print_json(&badge_counts(store.badge_counts()))?,
        },
    }
    Ok(())
}
