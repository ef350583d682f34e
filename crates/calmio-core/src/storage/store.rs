use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::NaiveDate;
use serde_json::Value;
use tracing::{debug, info, warn};

use super::document::StatsDocument;
use super::migrations;
use super::Persistence;
use crate::achievements::{AchievementEngine, BadgeCode, Recurrence};
use crate::clock::Clock;
use crate::error::{PersistenceError, Result};
use crate::session::SessionRecord;
use crate::stats::{self, MonthlySummary, WeeklySummary};

/// Persistent ledger of sessions, daily totals, streak and badges.
///
/// Every mutating call writes the document back before returning.
pub struct StatsStore {
    clock: Arc<dyn Clock>,
    persistence: Box<dyn Persistence>,
    achievements: AchievementEngine,
    doc: StatsDocument,
}

impl std::fmt::Debug for StatsStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StatsStore")
            .field("clock", &self.clock)
            .field("doc", &self.doc)
            .finish_non_exhaustive()
    }
}

impl StatsStore {
    /// Load (and migrate) the document behind `persistence`.
    ///
    /// A missing, unreadable or corrupt document yields an empty ledger; the
    /// problem is logged, never returned. A document that exists but cannot be
    /// decoded is first handed to [`Persistence::preserve_unreadable`].
    pub fn open(clock: Arc<dyn Clock>, persistence: Box<dyn Persistence>) -> Self {
        let (doc, migrated) = match persistence.load() {
            Ok(Some(raw)) => Self::decode(raw).unwrap_or_else(|| {
                Self::set_aside(persistence.as_ref());
                (StatsDocument::default(), false)
            }),
            Ok(None) => (StatsDocument::default(), false),
            Err(e) => {
                warn!("failed to read stats document, starting empty: {e}");
                if matches!(e, PersistenceError::Corrupt { .. }) {
                    Self::set_aside(persistence.as_ref());
                }
                (StatsDocument::default(), false)
            }
        };

        let store = Self {
            clock,
            persistence,
            achievements: AchievementEngine::new(),
            doc,
        };
        if migrated {
            if let Err(e) = store.save() {
                warn!("failed to write migrated stats document: {e}");
            }
        }
        store
    }

    /// `None` when the document does not decode even after migration.
    fn decode(mut raw: Value) -> Option<(StatsDocument, bool)> {
        let applied = migrations::migrate(&mut raw);
        match serde_json::from_value::<StatsDocument>(raw) {
            Ok(mut doc) => {
                let streak_changed = migrations::recompute_streak(&mut doc);
                Some((doc, !applied.is_empty() || streak_changed))
            }
            Err(e) => {
                warn!("corrupt stats document, starting empty: {e}");
                None
            }
        }
    }

    fn set_aside(persistence: &dyn Persistence) {
        match persistence.preserve_unreadable() {
            Ok(()) => info!("unreadable stats document preserved"),
            Err(e) => warn!("failed to preserve unreadable stats document: {e}"),
        }
    }

    fn save(&self) -> Result<()> {
        let value = serde_json::to_value(&self.doc)?;
        self.persistence.save(&value)?;
        Ok(())
    }

    // ── Commands ──

    /// Record a finished session and return the badges it newly credits.
    ///
    /// Total-time badges look at the total before this session; session-count
    /// and streak badges include it. One-time badges already held are not
    /// credited again.
    pub fn add_session(&mut self, mut record: SessionRecord) -> Result<Vec<BadgeCode>> {
        let date = record.date();
        let total_before = self.doc.total_seconds();

        let day = self.doc.daily_seconds.entry(date).or_insert(0);
        *day = day.saturating_add(record.duration_seconds);
        self.doc.streak = stats::compute_streak(&self.doc.daily_seconds);

        let sessions_today = self.doc.sessions_on(date).count() as u32 + 1;
        let earned = self
            .achievements
            .evaluate(total_before, &record, sessions_today, self.doc.streak);

        let credited: Vec<BadgeCode> = earned
            .into_iter()
            .filter(|code| code.recurrence() == Recurrence::Repeatable || !self.doc.has_badge(*code))
            .collect();
        for code in &credited {
            self.doc.credit_badge(date, *code);
        }

        record.badges = credited.clone();
        debug!(
            %date,
            duration = record.duration_seconds,
            breaths = record.breath_count,
            streak = self.doc.streak,
            badges = credited.len(),
            "session recorded"
        );
        self.doc.last_session = Some(record.clone());
        self.doc.sessions.push(record);

        self.save()?;
        Ok(credited)
    }

    /// Reset to an empty document and persist it.
    pub fn clear_data(&mut self) -> Result<()> {
        self.doc = StatsDocument::default();
        self.save()?;
        info!("stats data cleared");
        Ok(())
    }

    // ── Queries ──

    pub fn get_weekly_summary(&self, reference: NaiveDate) -> WeeklySummary {
        stats::weekly_summary(&self.doc.daily_seconds, &self.doc.sessions, reference)
    }

    /// # Errors
    /// `Validation` for an invalid year/month or non-positive goal.
    pub fn get_monthly_summary(&self, year: i32, month: u32, goal_minutes: f64) -> Result<MonthlySummary> {
        Ok(stats::monthly_summary(&self.doc.daily_seconds, year, month, goal_minutes)?)
    }

    pub fn get_streak(&self) -> u32 {
        self.doc.streak
    }

    pub fn get_last_session(&self) -> Option<&SessionRecord> {
        self.doc.last_session.as_ref()
    }

    /// Seconds meditated on the clock's current day.
    pub fn get_today_seconds(&self) -> u32 {
        self.seconds_for_date(self.clock.today())
    }

    pub fn seconds_for_date(&self, date: NaiveDate) -> u32 {
        self.doc.daily_seconds.get(&date).copied().unwrap_or(0)
    }

    pub fn total_seconds(&self) -> u64 {
        self.doc.total_seconds()
    }

    pub fn get_sessions_for_date(&self, date: NaiveDate) -> Vec<&SessionRecord> {
        self.doc.sessions_on(date).collect()
    }

    /// Badge counts credited on `date`, keyed by code.
    pub fn get_badges_for_date(&self, date: NaiveDate) -> BTreeMap<String, u32> {
        self.doc.daily_badges.get(&date).cloned().unwrap_or_default()
    }

    pub fn badge_counts(&self) -> &BTreeMap<String, u32> {
        &self.doc.badges
    }

    pub fn sessions(&self) -> &[SessionRecord] {
        &self.doc.sessions
    }

    pub fn document(&self) -> &StatsDocument {
        &self.doc
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }
}
