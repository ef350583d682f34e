//! Calendar-month rollup with fixed week buckets.

use std::collections::BTreeMap;

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use super::streak::longest_streak_in_month;
use crate::error::ValidationError;

/// Default monthly goal.
pub const MONTHLY_GOAL_MINUTES: f64 = 600.0;

/// Buckets are days 1-7, 8-14, 15-21 and 22 to month end.
pub const WEEK_BUCKETS: usize = 4;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthlySummary {
    pub year: i32,
    pub month: u32,
    pub minutes_per_week: Vec<f64>,
    pub total_minutes: f64,
    /// Per calendar day of the month.
    pub average_minutes: f64,
    /// 0-based; the first bucket wins ties.
    pub best_week_index: usize,
    pub longest_streak_in_month: u32,
    pub goal_minutes: f64,
    /// `total_minutes / goal_minutes`, capped at 1.
    pub goal_progress: f64,
}

pub fn week_bucket(day_of_month: u32) -> usize {
    (((day_of_month.max(1) - 1) / 7) as usize).min(WEEK_BUCKETS - 1)
}

pub fn days_in_month(year: i32, month: u32) -> Result<u32, ValidationError> {
    let first = NaiveDate::from_ymd_opt(year, month, 1)
        .ok_or_else(|| ValidationError::invalid("month", format!("{year}-{month:02} is not a valid month")))?;
    let next = if month == 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1)
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1)
    }
    .ok_or_else(|| ValidationError::invalid("year", format!("{year} is out of range")))?;
    Ok((next - first).num_days() as u32)
}

/// # Errors
/// Invalid `year`/`month`, or a goal that is not a positive number.
pub fn monthly_summary(
    daily_seconds: &BTreeMap<NaiveDate, u32>,
    year: i32,
    month: u32,
    goal_minutes: f64,
) -> Result<MonthlySummary, ValidationError> {
    if !goal_minutes.is_finite() || goal_minutes <= 0.0 {
        return Err(ValidationError::invalid("goal_minutes", "must be a positive number"));
    }
    let days = days_in_month(year, month)?;

    let mut minutes_per_week = vec![0.0; WEEK_BUCKETS];
    for (date, secs) in daily_seconds
        .iter()
        .filter(|(date, _)| date.year() == year && date.month() == month)
    {
        minutes_per_week[week_bucket(date.day())] += f64::from(*secs) / 60.0;
    }
    let total_minutes: f64 = minutes_per_week.iter().sum();

    let best_week_index = minutes_per_week
        .iter()
        .enumerate()
        .fold(0, |best, (i, m)| if *m > minutes_per_week[best] { i } else { best });

    Ok(MonthlySummary {
        year,
        month,
        total_minutes,
        average_minutes: total_minutes / f64::from(days),
        best_week_index,
        longest_streak_in_month: longest_streak_in_month(daily_seconds, year, month),
        goal_minutes,
        goal_progress: (total_minutes / goal_minutes).min(1.0),
        minutes_per_week,
    })
}
