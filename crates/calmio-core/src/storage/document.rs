use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::achievements::BadgeCode;
use crate::session::SessionRecord;

/// The whole persisted ledger.
///
/// Badge maps are keyed by code string so documents carrying codes this build
/// does not know still load.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StatsDocument {
    pub daily_seconds: BTreeMap<NaiveDate, u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_session: Option<SessionRecord>,
    pub streak: u32,
    pub sessions: Vec<SessionRecord>,
    pub badges: BTreeMap<String, u32>,
    pub daily_badges: BTreeMap<NaiveDate, BTreeMap<String, u32>>,
}

impl StatsDocument {
    pub fn total_seconds(&self) -> u64 {
        self.daily_seconds.values().map(|s| u64::from(*s)).sum()
    }

    pub fn has_badge(&self, code: BadgeCode) -> bool {
        self.badges.get(code.as_str()).is_some_and(|n| *n > 0)
    }

    pub fn badge_count(&self, code: BadgeCode) -> u32 {
        self.badges.get(code.as_str()).copied().unwrap_or(0)
    }

    /// Bump the cumulative and per-day counts for `code`.
    pub fn credit_badge(&mut self, date: NaiveDate, code: BadgeCode) {
        let key = code.as_str().to_string();
        *self.badges.entry(key.clone()).or_insert(0) += 1;
        *self
            .daily_badges
            .entry(date)
            .or_default()
            .entry(key)
            .or_insert(0) += 1;
    }

    pub fn sessions_on(&self, date: NaiveDate) -> impl Iterator<Item = &SessionRecord> {
        self.sessions.iter().filter(move |s| s.date() == date)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn empty_document_shape() {
        let value = serde_json::to_value(StatsDocument::default()).unwrap();
        assert_eq!(
            value,
            json!({
                "daily_seconds": {},
                "streak": 0,
                "sessions": [],
                "badges": {},
                "daily_badges": {}
            })
        );
    }

    #[test]
    fn missing_fields_default() {
        let doc: StatsDocument = serde_json::from_value(json!({"streak": 4})).unwrap();
        assert_eq!(doc.streak, 4);
        assert!(doc.sessions.is_empty());
        assert!(doc.last_session.is_none());
    }

    #[test]
    fn credit_badge_counts_both_maps() {
        let day = NaiveDate::from_ymd_opt(2023, 1, 1).unwrap();
        let mut doc = StatsDocument::default();
        doc.credit_badge(day, BadgeCode::TenBreaths);
        doc.credit_badge(day, BadgeCode::TenBreaths);
        assert_eq!(doc.badge_count(BadgeCode::TenBreaths), 2);
        assert_eq!(doc.daily_badges[&day]["10_breaths"], 2);
        assert!(!doc.has_badge(BadgeCode::FiveMinTotal));
    }

    #[test]
    fn dates_serialize_as_iso_keys() {
        let mut doc = StatsDocument::default();
        doc.daily_seconds
            .insert(NaiveDate::from_ymd_opt(2023, 5, 1).unwrap(), 120);
        let value = serde_json::to_value(&doc).unwrap();
        assert_eq!(value["daily_seconds"]["2023-05-01"], 120);
    }
}
