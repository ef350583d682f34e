//! Consecutive-day runs over daily totals.

use std::collections::BTreeMap;

use chrono::{Datelike, Duration, NaiveDate};

/// Days in the run ending at the most recent day with nonzero seconds.
///
/// Zero-second entries are treated as missing days. The result does not
/// depend on today's date: a run that ended last week still counts.
pub fn compute_streak(daily_seconds: &BTreeMap<NaiveDate, u32>) -> u32 {
    let mut active = daily_seconds
        .iter()
        .rev()
        .filter(|(_, secs)| **secs > 0)
        .map(|(date, _)| *date);

    let Some(mut previous) = active.next() else {
        return 0;
    };
    let mut streak = 1;
    for date in active {
        if previous - date != Duration::days(1) {
            break;
        }
        streak += 1;
        previous = date;
    }
    streak
}

/// Longest run of active days that lies entirely inside `year`/`month`.
pub fn longest_streak_in_month(
    daily_seconds: &BTreeMap<NaiveDate, u32>,
    year: i32,
    month: u32,
) -> u32 {
    let mut longest = 0;
    let mut current = 0;
    let mut previous: Option<NaiveDate> = None;

    let in_month = daily_seconds
        .iter()
        .filter(|(date, secs)| date.year() == year && date.month() == month && **secs > 0)
        .map(|(date, _)| *date);

    for date in in_month {
        current = match previous {
            Some(prev) if date - prev == Duration::days(1) => current + 1,
            _ => 1,
        };
        longest = longest.max(current);
        previous = Some(date);
    }
    longest
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn totals(days: &[(NaiveDate, u32)]) -> BTreeMap<NaiveDate, u32> {
        days.iter().copied().collect()
    }

    #[test]
    fn empty_history_has_no_streak() {
        assert_eq!(compute_streak(&BTreeMap::new()), 0);
    }

    #[test]
    fn streak_ends_at_latest_active_day() {
        let daily = totals(&[
            (d(2023, 1, 1), 60),
            (d(2023, 1, 3), 60),
            (d(2023, 1, 4), 60),
            (d(2023, 1, 5), 60),
        ]);
        assert_eq!(compute_streak(&daily), 3);
    }

    #[test]
    fn zero_days_break_the_run() {
        let daily = totals(&[
            (d(2023, 1, 1), 60),
            (d(2023, 1, 2), 0),
            (d(2023, 1, 3), 60),
        ]);
        assert_eq!(compute_streak(&daily), 1);

        let trailing_zero = totals(&[(d(2023, 1, 1), 60), (d(2023, 1, 2), 60), (d(2023, 1, 3), 0)]);
        assert_eq!(compute_streak(&trailing_zero), 2);
    }

    #[test]
    fn streak_crosses_month_boundary() {
        let daily = totals(&[(d(2023, 1, 31), 60), (d(2023, 2, 1), 60)]);
        assert_eq!(compute_streak(&daily), 2);
    }

    #[test]
    fn month_run_does_not_carry_over() {
        let daily = totals(&[
            (d(2023, 1, 30), 60),
            (d(2023, 1, 31), 60),
            (d(2023, 2, 1), 60),
            (d(2023, 2, 2), 60),
            (d(2023, 2, 10), 60),
        ]);
        assert_eq!(longest_streak_in_month(&daily, 2023, 2), 2);
        assert_eq!(longest_streak_in_month(&daily, 2023, 1), 2);
        assert_eq!(longest_streak_in_month(&daily, 2023, 3), 0);
    }
}
