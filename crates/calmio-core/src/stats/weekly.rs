//! Monday-based weekly rollup.

use std::collections::BTreeMap;

use chrono::{Datelike, Duration, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};

use crate::session::SessionRecord;

/// The week's longest single session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LongestSession {
    pub date: NaiveDate,
    /// English day name, e.g. "Tuesday".
    pub weekday: String,
    /// Start time as `HH:MM`.
    pub start_time: String,
    pub minutes: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeeklySummary {
    pub week_start: NaiveDate,
    /// Monday first.
    pub minutes_per_day: [f64; 7],
    pub total_minutes: f64,
    pub total_seconds: u64,
    /// Total over all seven days, empty days included.
    pub average_minutes: f64,
    pub longest_session: Option<LongestSession>,
}

/// Monday of the week containing `date`.
pub fn week_start(date: NaiveDate) -> NaiveDate {
    date - Duration::days(i64::from(date.weekday().num_days_from_monday()))
}

pub fn weekday_name(day: Weekday) -> &'static str {
    match day {
        Weekday::Mon => "Monday",
        Weekday::Tue => "Tuesday",
        Weekday::Wed => "Wednesday",
        Weekday::Thu => "Thursday",
        Weekday::Fri => "Friday",
        Weekday::Sat => "Saturday",
        Weekday::Sun => "Sunday",
    }
}

/// Summarize the week containing `reference`.
pub fn weekly_summary(
    daily_seconds: &BTreeMap<NaiveDate, u32>,
    sessions: &[SessionRecord],
    reference: NaiveDate,
) -> WeeklySummary {
    let start = week_start(reference);
    let end = start + Duration::days(6);

    let mut minutes_per_day = [0.0; 7];
    let mut total_seconds: u64 = 0;
    for (offset, slot) in minutes_per_day.iter_mut().enumerate() {
        let day = start + Duration::days(offset as i64);
        let secs = daily_seconds.get(&day).copied().unwrap_or(0);
        total_seconds += u64::from(secs);
        *slot = f64::from(secs) / 60.0;
    }
    let total_minutes = total_seconds as f64 / 60.0;

    // First session wins ties.
    let longest = sessions
        .iter()
        .filter(|s| (start..=end).contains(&s.date()))
        .fold(None::<&SessionRecord>, |best, s| match best {
            Some(b) if b.duration_seconds >= s.duration_seconds => Some(b),
            _ => Some(s),
        });

    WeeklySummary {
        week_start: start,
        minutes_per_day,
        total_minutes,
        total_seconds,
        average_minutes: total_minutes / 7.0,
        longest_session: longest.map(|s| LongestSession {
            date: s.date(),
            weekday: weekday_name(s.start.weekday()).to_string(),
            start_time: s.start.format("%H:%M").to_string(),
            minutes: s.minutes(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2023, 5, day).unwrap()
    }

    #[test]
    fn week_starts_on_monday() {
        assert_eq!(week_start(d(7)), d(1));
        assert_eq!(week_start(d(1)), d(1));
        assert_eq!(week_start(d(10)), d(8));
    }

    #[test]
    fn empty_week_is_zeroed() {
        let summary = weekly_summary(&BTreeMap::new(), &[], d(3));
        assert_eq!(summary.minutes_per_day, [0.0; 7]);
        assert_eq!(summary.total_seconds, 0);
        assert_eq!(summary.average_minutes, 0.0);
        assert!(summary.longest_session.is_none());
    }

    #[test]
    fn sessions_outside_the_week_are_ignored() {
        let inside = SessionRecord::new(d(2).and_hms_opt(11, 0, 0).unwrap(), 120, 1);
        let outside = SessionRecord::new(d(8).and_hms_opt(9, 0, 0).unwrap(), 900, 1);
        let daily: BTreeMap<_, _> = [(d(2), 120), (d(8), 900)].into_iter().collect();

        let summary = weekly_summary(&daily, &[inside, outside], d(4));
        assert_eq!(summary.total_seconds, 120);
        let longest = summary.longest_session.unwrap();
        assert_eq!(longest.weekday, "Tuesday");
        assert_eq!(longest.start_time, "11:00");
        assert_eq!(longest.minutes, 2.0);
    }
}
