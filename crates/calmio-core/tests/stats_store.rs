//! Integration tests for the stats store.
//!
//! Covers recording sessions, badges, summaries and persistence through
//! both the in-memory and the JSON file backends.

use std::sync::Arc;

use calmio_core::storage::DATA_FILE;
use calmio_core::{
    BadgeCode, JsonFilePersistence, ManualClock, MemoryPersistence, SessionRecord, StatsDocument,
    StatsStore,
};
use chrono::{NaiveDate, NaiveDateTime};
use indoc::indoc;

fn at(y: i32, m: u32, d: u32, h: u32, min: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(y, m, d)
        .unwrap()
        .and_hms_opt(h, min, 0)
        .unwrap()
}

fn clock() -> Arc<ManualClock> {
    Arc::new(ManualClock::new(at(2023, 5, 7, 21, 0)))
}

fn memory_store() -> (MemoryPersistence, StatsStore) {
    let persistence = MemoryPersistence::new();
    let store = StatsStore::open(clock(), Box::new(persistence.clone()));
    (persistence, store)
}

fn session(start: NaiveDateTime, seconds: u32, breaths: u32) -> SessionRecord {
    SessionRecord::new(start, seconds, breaths).with_last_cycle(3.0, 3.0)
}

#[test]
fn test_consecutive_days_build_a_streak() {
    let (_, mut store) = memory_store();
    store.add_session(session(at(2023, 1, 1, 8, 0), 60, 5)).unwrap();
    store.add_session(session(at(2023, 1, 2, 9, 0), 120, 6)).unwrap();

    assert_eq!(store.get_streak(), 2);
    let last = store.get_last_session().unwrap();
    assert_eq!(last.duration_seconds, 120);
    assert_eq!(last.last_inhale, 3.0);
}

#[test]
fn test_first_five_minutes_and_ten_breaths() {
    let (_, mut store) = memory_store();
    store.add_session(session(at(2023, 1, 1, 8, 0), 200, 1)).unwrap();

    let badges = store.add_session(session(at(2023, 1, 1, 9, 0), 150, 10)).unwrap();
    assert!(badges.contains(&BadgeCode::TenBreaths));
    assert!(badges.contains(&BadgeCode::FiveMinTotal));
    assert!(badges.contains(&BadgeCode::TwoSessionsDay));

    let day = store.get_badges_for_date(at(2023, 1, 1, 0, 0).date());
    assert_eq!(day.get("5_min_total"), Some(&1));
    assert_eq!(day.get("1_breath_session"), Some(&2));
}

#[test]
fn test_weekly_summary_matches_daily_minutes() {
    let (_, mut store) = memory_store();
    let sessions = [
        (at(2023, 5, 1, 10, 0), 120), // Monday
        (at(2023, 5, 2, 11, 0), 300), // Tuesday
        (at(2023, 5, 3, 9, 0), 60),   // Wednesday
        (at(2023, 5, 4, 20, 0), 180), // Thursday
        (at(2023, 5, 5, 14, 0), 90),  // Friday
        (at(2023, 5, 7, 18, 0), 240), // Sunday
    ];
    for (start, secs) in sessions {
        store.add_session(session(start, secs, 1)).unwrap();
    }

    let summary = store.get_weekly_summary(NaiveDate::from_ymd_opt(2023, 5, 7).unwrap());
    assert_eq!(summary.week_start, NaiveDate::from_ymd_opt(2023, 5, 1).unwrap());
    assert_eq!(summary.minutes_per_day, [2.0, 5.0, 1.0, 3.0, 1.5, 0.0, 4.0]);
    assert_eq!(summary.total_minutes, 16.5);
    assert!((summary.average_minutes - 16.5 / 7.0).abs() < 1e-9);
    assert_eq!(summary.total_seconds, 990);

    let longest = summary.longest_session.unwrap();
    assert_eq!(longest.weekday, "Tuesday");
    assert_eq!(longest.start_time, "11:00");
    assert_eq!(longest.minutes, 5.0);
}

#[test]
fn test_monthly_summary_uses_fixed_buckets() {
    let (_, mut store) = memory_store();
    for (day, secs) in [(1, 600), (2, 600), (3, 600), (9, 1200), (30, 1800)] {
        store.add_session(session(at(2023, 4, day, 7, 0), secs, 3)).unwrap();
    }
    store.add_session(session(at(2023, 3, 31, 7, 0), 6000, 3)).unwrap();

    let month = store.get_monthly_summary(2023, 4, 600.0).unwrap();
    assert_eq!(month.minutes_per_week, vec![30.0, 20.0, 0.0, 30.0]);
    assert_eq!(month.total_minutes, 80.0);
    assert_eq!(month.best_week_index, 0);
    assert_eq!(month.longest_streak_in_month, 3);
    assert!((month.average_minutes - 80.0 / 30.0).abs() < 1e-9);
    assert!((month.goal_progress - 80.0 / 600.0).abs() < 1e-9);
}

#[test]
fn test_clear_data_is_idempotent() {
    let (persistence, mut store) = memory_store();
    store.add_session(session(at(2023, 1, 1, 8, 0), 300, 10)).unwrap();

    store.clear_data().unwrap();
    let once = persistence.snapshot().unwrap();
    store.clear_data().unwrap();
    let twice = persistence.snapshot().unwrap();

    assert_eq!(once, twice);
    assert_eq!(store.document(), &StatsDocument::default());
    assert_eq!(store.get_streak(), 0);
    assert!(store.get_last_session().is_none());
}

#[test]
fn test_file_round_trip_preserves_ledger() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join(DATA_FILE);

    let mut store = StatsStore::open(clock(), Box::new(JsonFilePersistence::new(&path)));
    store.add_session(session(at(2023, 1, 1, 8, 0), 60, 5)).unwrap();
    store.add_session(session(at(2023, 1, 2, 9, 30), 400, 12)).unwrap();

    let reloaded = StatsStore::open(clock(), Box::new(JsonFilePersistence::new(&path)));
    assert_eq!(reloaded.document().daily_seconds, store.document().daily_seconds);
    assert_eq!(reloaded.sessions(), store.sessions());
    assert_eq!(reloaded.badge_counts(), store.badge_counts());
    assert_eq!(reloaded.document(), store.document());

    let bytes = |store: &StatsStore| {
        let doc = store.document();
        (
            serde_json::to_string(&doc.daily_seconds).unwrap(),
            serde_json::to_string(&doc.sessions).unwrap(),
            serde_json::to_string(&doc.badges).unwrap(),
        )
    };
    assert_eq!(bytes(&reloaded), bytes(&store));
}

#[test]
fn test_legacy_file_is_migrated() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join(DATA_FILE);
    std::fs::write(
        &path,
        indoc! {r#"
            {
              "daily_minutes": {
                "2023-01-01": 2,
                "2023-01-02": 4.5
              },
              "last_session": {
                "start": "2023-01-02 19:45",
                "minutes": 4.5,
                "breaths": 20,
                "last_cycle": {"inhale": 4.4, "exhale": 6.4}
              },
              "badges": ["1_breath_session", "5_min_total", "1_breath_session"],
              "daily_badges": {"2023-01-02": ["5_min_total"]}
            }
        "#},
    )
    .unwrap();

    let store = StatsStore::open(clock(), Box::new(JsonFilePersistence::new(&path)));
    assert_eq!(store.total_seconds(), 390);
    assert_eq!(store.get_streak(), 2);

    let last = store.get_last_session().unwrap();
    assert_eq!(last.duration_seconds, 270);
    assert_eq!(last.start, at(2023, 1, 2, 19, 45));
    assert_eq!(last.last_exhale, 6.4);
    assert_eq!(store.badge_counts()["1_breath_session"], 2);

    // The total was already past five minutes before this session.
    let mut store = store;
    let badges = store.add_session(session(at(2023, 1, 3, 8, 0), 60, 1)).unwrap();
    assert!(!badges.contains(&BadgeCode::FiveMinTotal));
    assert!(badges.contains(&BadgeCode::ThreeDayStreak));

    let on_disk: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    assert!(on_disk.get("daily_minutes").is_none());
    assert_eq!(on_disk["daily_seconds"]["2023-01-02"], 270);
    assert_eq!(on_disk["streak"], 3);
}

#[test]
fn test_unreadable_file_starts_empty() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join(DATA_FILE);
    std::fs::write(&path, "{\"daily_seconds\": ").unwrap();

    let mut store = StatsStore::open(clock(), Box::new(JsonFilePersistence::new(&path)));
    assert_eq!(store.document(), &StatsDocument::default());
    assert!(dir.path().join("calmio_data.json.corrupt").exists());

    store.add_session(session(at(2023, 1, 1, 8, 0), 60, 1)).unwrap();
    let reloaded = StatsStore::open(clock(), Box::new(JsonFilePersistence::new(&path)));
    assert_eq!(reloaded.total_seconds(), 60);
}

#[test]
fn test_undecodable_history_is_kept_aside() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join(DATA_FILE);
    let original = indoc! {r#"
        {
          "daily_seconds": {"2023-01-01": 1200},
          "sessions": [
            {"start": "01/02/2023 08:00", "duration": 1200, "breaths": 30}
          ]
        }
    "#};
    std::fs::write(&path, original).unwrap();

    let persistence = JsonFilePersistence::new(&path);
    let corrupt_path = persistence.corrupt_path();
    let mut store = StatsStore::open(clock(), Box::new(persistence));
    assert_eq!(store.total_seconds(), 0);

    store.add_session(session(at(2023, 1, 3, 8, 0), 60, 1)).unwrap();
    assert_eq!(std::fs::read_to_string(&corrupt_path).unwrap(), original);

    let reloaded = StatsStore::open(clock(), Box::new(JsonFilePersistence::new(&path)));
    assert_eq!(reloaded.total_seconds(), 60);
}
