//! Pure rollups over the stored history.
//!
//! Nothing here touches persistence; [`crate::storage::StatsStore`] feeds
//! its daily totals and sessions in.

mod monthly;
mod streak;
mod weekly;

pub use monthly::{days_in_month, monthly_summary, week_bucket, MonthlySummary, MONTHLY_GOAL_MINUTES, WEEK_BUCKETS};
pub use streak::{compute_streak, longest_streak_in_month};
pub use weekly::{week_start, weekday_name, weekly_summary, LongestSession, WeeklySummary};
