//! Badge catalog and the rules that award them.
//!
//! [`AchievementEngine::evaluate`] is pure: it reports every badge the given
//! numbers qualify for. Deciding which of those actually count (one-time
//! badges are credited once) is up to [`crate::storage::StatsStore`].

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use tracing::warn;

use crate::session::SessionRecord;

/// Cumulative seconds that unlock [`BadgeCode::FiveMinTotal`].
pub const FIVE_MIN_TOTAL_SECONDS: u64 = 300;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum BadgeCode {
    OneBreathSession,
    FiveBreathsSession,
    TenBreaths,
    TwentyBreathsSession,
    ThirtyBreathsSession,
    FortyBreathsSession,
    FiftyBreathsSession,
    SixtyBreathsSession,
    EightyBreathsSession,
    HundredBreathsSession,
    OneSessionDay,
    TwoSessionsDay,
    ThreeSessionsDay,
    FiveMinTotal,
    ThreeDayStreak,
    SevenDayStreak,
    ThirtyDayStreak,
}

/// Whether a badge may be credited more than once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Recurrence {
    Repeatable,
    OneTime,
}

const BREATH_THRESHOLDS: [(u32, BadgeCode); 10] = [
    (1, BadgeCode::OneBreathSession),
    (5, BadgeCode::FiveBreathsSession),
    (10, BadgeCode::TenBreaths),
    (20, BadgeCode::TwentyBreathsSession),
    (30, BadgeCode::ThirtyBreathsSession),
    (40, BadgeCode::FortyBreathsSession),
    (50, BadgeCode::FiftyBreathsSession),
    (60, BadgeCode::SixtyBreathsSession),
    (80, BadgeCode::EightyBreathsSession),
    (100, BadgeCode::HundredBreathsSession),
];

const SESSION_THRESHOLDS: [(u32, BadgeCode); 3] = [
    (1, BadgeCode::OneSessionDay),
    (2, BadgeCode::TwoSessionsDay),
    (3, BadgeCode::ThreeSessionsDay),
];

const STREAK_THRESHOLDS: [(u32, BadgeCode); 3] = [
    (3, BadgeCode::ThreeDayStreak),
    (7, BadgeCode::SevenDayStreak),
    (30, BadgeCode::ThirtyDayStreak),
];

impl BadgeCode {
    pub const ALL: [BadgeCode; 17] = [
        BadgeCode::OneBreathSession,
        BadgeCode::FiveBreathsSession,
        BadgeCode::TenBreaths,
        BadgeCode::TwentyBreathsSession,
        BadgeCode::ThirtyBreathsSession,
        BadgeCode::FortyBreathsSession,
        BadgeCode::FiftyBreathsSession,
        BadgeCode::SixtyBreathsSession,
        BadgeCode::EightyBreathsSession,
        BadgeCode::HundredBreathsSession,
        BadgeCode::OneSessionDay,
        BadgeCode::TwoSessionsDay,
        BadgeCode::ThreeSessionsDay,
        BadgeCode::FiveMinTotal,
        BadgeCode::ThreeDayStreak,
        BadgeCode::SevenDayStreak,
        BadgeCode::ThirtyDayStreak,
    ];

    /// Code string used in the persisted document.
    pub fn as_str(&self) -> &'static str {
        match self {
            BadgeCode::OneBreathSession => "1_breath_session",
            BadgeCode::FiveBreathsSession => "5_breaths_session",
            BadgeCode::TenBreaths => "10_breaths",
            BadgeCode::TwentyBreathsSession => "20_breaths_session",
            BadgeCode::ThirtyBreathsSession => "30_breaths_session",
            BadgeCode::FortyBreathsSession => "40_breaths_session",
            BadgeCode::FiftyBreathsSession => "50_breaths_session",
            BadgeCode::SixtyBreathsSession => "60_breaths_session",
            BadgeCode::EightyBreathsSession => "80_breaths_session",
            BadgeCode::HundredBreathsSession => "100_breaths_session",
            BadgeCode::OneSessionDay => "1_session_day",
            BadgeCode::TwoSessionsDay => "2_sessions_day",
            BadgeCode::ThreeSessionsDay => "3_sessions_day",
            BadgeCode::FiveMinTotal => "5_min_total",
            BadgeCode::ThreeDayStreak => "3_day_streak",
            BadgeCode::SevenDayStreak => "7_day_streak",
            BadgeCode::ThirtyDayStreak => "30_day_streak",
        }
    }

    pub fn recurrence(&self) -> Recurrence {
        match self {
            BadgeCode::FiveMinTotal
            | BadgeCode::ThreeDayStreak
            | BadgeCode::SevenDayStreak
            | BadgeCode::ThirtyDayStreak => Recurrence::OneTime,
            _ => Recurrence::Repeatable,
        }
    }

    /// Id in the achievements catalog shown by the UI.
    ///
    /// Several codes share an entry (`10_breaths` and `5_min_total` both
    /// map to 3).
    pub fn catalog_id(&self) -> u32 {
        match self {
            BadgeCode::OneBreathSession => 1,
            BadgeCode::FiveBreathsSession => 2,
            BadgeCode::TenBreaths => 3,
            BadgeCode::TwentyBreathsSession => 4,
            BadgeCode::ThirtyBreathsSession => 5,
            BadgeCode::FortyBreathsSession => 6,
            BadgeCode::FiftyBreathsSession => 7,
            BadgeCode::SixtyBreathsSession => 8,
            BadgeCode::EightyBreathsSession => 9,
            BadgeCode::HundredBreathsSession => 30,
            BadgeCode::OneSessionDay => 10,
            BadgeCode::TwoSessionsDay => 27,
            BadgeCode::ThreeSessionsDay => 28,
            BadgeCode::FiveMinTotal => 3,
            BadgeCode::ThreeDayStreak => 21,
            BadgeCode::SevenDayStreak => 22,
            BadgeCode::ThirtyDayStreak => 23,
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            BadgeCode::OneBreathSession => "First mindful breath",
            BadgeCode::FiveBreathsSession => "5 breaths in one session",
            BadgeCode::TenBreaths => "10 breaths in one session",
            BadgeCode::TwentyBreathsSession => "20 breaths in one session",
            BadgeCode::ThirtyBreathsSession => "30 breaths in one session",
            BadgeCode::FortyBreathsSession => "40 breaths in one session",
            BadgeCode::FiftyBreathsSession => "50 breaths in one session",
            BadgeCode::SixtyBreathsSession => "60 breaths in one session",
            BadgeCode::EightyBreathsSession => "80 breaths in one session",
            BadgeCode::HundredBreathsSession => "100 breaths in one session",
            BadgeCode::OneSessionDay => "Completed a session today",
            BadgeCode::TwoSessionsDay => "2 sessions in one day",
            BadgeCode::ThreeSessionsDay => "3 sessions in one day",
            BadgeCode::FiveMinTotal => "5 minutes meditated in total",
            BadgeCode::ThreeDayStreak => "3 days in a row",
            BadgeCode::SevenDayStreak => "A full week in a row",
            BadgeCode::ThirtyDayStreak => "30 days in a row",
        }
    }

    pub fn emoji(&self) -> &'static str {
        match self.catalog_id() {
            1 => "🌬️",
            2 => "⏱️",
            3 => "🕔",
            4 => "🔟",
            5 => "🕒",
            6 => "🧘",
            7 => "🌀",
            8 => "🌅",
            9 => "⛰️",
            10 => "🎉",
            21 => "📅",
            22 => "🗓️",
            23 => "📆",
            27 => "🌓",
            28 => "🌔",
            30 => "🛡️",
            _ => "✨",
        }
    }
}

impl fmt::Display for BadgeCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown badge code: {0}")]
pub struct UnknownBadge(pub String);

impl FromStr for BadgeCode {
    type Err = UnknownBadge;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        BadgeCode::ALL
            .into_iter()
            .find(|code| code.as_str() == s)
            .ok_or_else(|| UnknownBadge(s.to_string()))
    }
}

impl Serialize for BadgeCode {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for BadgeCode {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// Decode a list of badge codes, skipping codes this build does not know.
pub(crate) fn deserialize_known_codes<'de, D>(deserializer: D) -> Result<Vec<BadgeCode>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Vec::<String>::deserialize(deserializer)?;
    Ok(raw
        .into_iter()
        .filter_map(|code| match code.parse() {
            Ok(badge) => Some(badge),
            Err(err) => {
                warn!("{err}, skipped");
                None
            }
        })
        .collect())
}

/// Catalog row for listing badges.
#[derive(Debug, Clone, Serialize)]
pub struct BadgeInfo {
    pub code: BadgeCode,
    pub catalog_id: u32,
    pub title: &'static str,
    pub emoji: &'static str,
    pub recurrence: Recurrence,
}

impl From<BadgeCode> for BadgeInfo {
    fn from(code: BadgeCode) -> Self {
        Self {
            code,
            catalog_id: code.catalog_id(),
            title: code.title(),
            emoji: code.emoji(),
            recurrence: code.recurrence(),
        }
    }
}

/// Stateless badge rules.
#[derive(Debug, Clone, Copy, Default)]
pub struct AchievementEngine;

impl AchievementEngine {
    pub fn new() -> Self {
        Self
    }

    /// Every badge `session` qualifies for.
    ///
    /// `total_seconds_before` excludes the session; `sessions_today` and
    /// `streak` include it.
    pub fn evaluate(
        &self,
        total_seconds_before: u64,
        session: &SessionRecord,
        sessions_today: u32,
        streak: u32,
    ) -> BTreeSet<BadgeCode> {
        let mut earned = BTreeSet::new();

        let total_after = total_seconds_before + u64::from(session.duration_seconds);
        if total_seconds_before < FIVE_MIN_TOTAL_SECONDS && total_after >= FIVE_MIN_TOTAL_SECONDS {
            earned.insert(BadgeCode::FiveMinTotal);
        }

        earned.extend(
            BREATH_THRESHOLDS
                .iter()
                .filter(|(n, _)| session.breath_count >= *n)
                .map(|(_, code)| *code),
        );

        earned.extend(
            SESSION_THRESHOLDS
                .iter()
                .filter(|(n, _)| sessions_today == *n)
                .map(|(_, code)| *code),
        );

        earned.extend(
            STREAK_THRESHOLDS
                .iter()
                .filter(|(n, _)| streak >= *n)
                .map(|(_, code)| *code),
        );

        earned
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn session(seconds: u32, breaths: u32) -> SessionRecord {
        let start = NaiveDate::from_ymd_opt(2023, 1, 1)
            .unwrap()
            .and_hms_opt(8, 0, 0)
            .unwrap();
        SessionRecord::new(start, seconds, breaths)
    }

    #[test]
    fn code_strings_round_trip() {
        for code in BadgeCode::ALL {
            assert_eq!(code.as_str().parse::<BadgeCode>(), Ok(code));
        }
        assert!("11_11_session".parse::<BadgeCode>().is_err());
    }

    #[test]
    fn five_minutes_fires_only_on_crossing() {
        let engine = AchievementEngine::new();
        let crossed = engine.evaluate(0, &session(300, 0), 1, 1);
        assert!(crossed.contains(&BadgeCode::FiveMinTotal));

        let already = engine.evaluate(300, &session(60, 0), 1, 1);
        assert!(!already.contains(&BadgeCode::FiveMinTotal));

        let short = engine.evaluate(100, &session(100, 0), 1, 1);
        assert!(!short.contains(&BadgeCode::FiveMinTotal));
    }

    #[test]
    fn all_breath_thresholds_below_count_fire() {
        let earned = AchievementEngine::new().evaluate(0, &session(60, 10), 2, 1);
        assert!(earned.contains(&BadgeCode::OneBreathSession));
        assert!(earned.contains(&BadgeCode::FiveBreathsSession));
        assert!(earned.contains(&BadgeCode::TenBreaths));
        assert!(!earned.contains(&BadgeCode::TwentyBreathsSession));
    }

    #[test]
    fn sessions_per_day_match_exactly() {
        let engine = AchievementEngine::new();
        let second = engine.evaluate(0, &session(60, 0), 2, 1);
        assert!(second.contains(&BadgeCode::TwoSessionsDay));
        assert!(!second.contains(&BadgeCode::OneSessionDay));

        let fourth = engine.evaluate(0, &session(60, 0), 4, 1);
        assert!(!fourth.iter().any(|c| matches!(
            c,
            BadgeCode::OneSessionDay | BadgeCode::TwoSessionsDay | BadgeCode::ThreeSessionsDay
        )));
    }

    #[test]
    fn streak_thresholds_accumulate() {
        let earned = AchievementEngine::new().evaluate(1000, &session(60, 0), 1, 7);
        assert!(earned.contains(&BadgeCode::ThreeDayStreak));
        assert!(earned.contains(&BadgeCode::SevenDayStreak));
        assert!(!earned.contains(&BadgeCode::ThirtyDayStreak));
    }

    #[test]
    fn recurrence_split() {
        assert_eq!(BadgeCode::TenBreaths.recurrence(), Recurrence::Repeatable);
        assert_eq!(BadgeCode::OneSessionDay.recurrence(), Recurrence::Repeatable);
        assert_eq!(BadgeCode::FiveMinTotal.recurrence(), Recurrence::OneTime);
        assert_eq!(BadgeCode::ThirtyDayStreak.recurrence(), Recurrence::OneTime);
    }

    #[test]
    fn unknown_codes_are_skipped_in_session_lists() {
        let json = r#"{"start":"2023-01-01 08:00:00","duration":60,"breaths":1,"badges":["1_breath_session","moon_badge"]}"#;
        let record: SessionRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.badges, vec![BadgeCode::OneBreathSession]);
    }
}
