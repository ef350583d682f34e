//! Session bookkeeping.
//!
//! A [`SessionLedger`] collects the cycles of the session in progress and
//! hands a finished [`SessionRecord`] to the caller, who passes it on to
//! [`crate::storage::StatsStore::add_session`].

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::achievements::{deserialize_known_codes, BadgeCode};
use crate::breath::PhaseKind;
use crate::error::SessionError;
use crate::events::BreathEvent;

/// Timings of one valid breath cycle.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CycleRecord {
    #[serde(rename = "inhale")]
    pub inhale_seconds: f64,
    #[serde(rename = "exhale")]
    pub exhale_seconds: f64,
}

impl CycleRecord {
    pub fn new(inhale_seconds: f64, exhale_seconds: f64) -> Self {
        Self {
            inhale_seconds,
            exhale_seconds,
        }
    }
}

/// A finished session. Never mutated once stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionRecord {
    #[serde(with = "start_format")]
    pub start: NaiveDateTime,
    #[serde(rename = "duration")]
    pub duration_seconds: u32,
    #[serde(rename = "breaths")]
    pub breath_count: u32,
    #[serde(default)]
    pub last_inhale: f64,
    #[serde(default)]
    pub last_exhale: f64,
    #[serde(default)]
    pub cycles: Vec<CycleRecord>,
    #[serde(default, deserialize_with = "deserialize_known_codes")]
    pub badges: Vec<BadgeCode>,
}

impl SessionRecord {
    pub fn new(start: NaiveDateTime, duration_seconds: u32, breath_count: u32) -> Self {
        Self {
            start,
            duration_seconds,
            breath_count,
            last_inhale: 0.0,
            last_exhale: 0.0,
            cycles: Vec::new(),
            badges: Vec::new(),
        }
    }

    /// Record the final cycle's timings without a full cycle list.
    pub fn with_last_cycle(mut self, inhale: f64, exhale: f64) -> Self {
        self.last_inhale = inhale;
        self.last_exhale = exhale;
        self
    }

    /// Attach the cycle list; the last entry also fills `last_inhale`/`last_exhale`.
    pub fn with_cycles(mut self, cycles: Vec<CycleRecord>) -> Self {
        if let Some(last) = cycles.last() {
            self.last_inhale = last.inhale_seconds;
            self.last_exhale = last.exhale_seconds;
        }
        self.cycles = cycles;
        self
    }

    pub fn date(&self) -> NaiveDate {
        self.start.date()
    }

    pub fn minutes(&self) -> f64 {
        self.duration_seconds as f64 / 60.0
    }
}

#[derive(Debug, Clone)]
struct ActiveSession {
    start: NaiveDateTime,
    cycles: Vec<CycleRecord>,
}

/// Accumulates the in-progress session.
#[derive(Debug, Clone, Default)]
pub struct SessionLedger {
    active: Option<ActiveSession>,
}

impl SessionLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a session unless one is already running.
    ///
    /// Returns `true` when a new session was started.
    pub fn begin_session(&mut self, now: NaiveDateTime) -> bool {
        if self.active.is_some() {
            return false;
        }
        debug!(start = %now, "session started");
        self.active = Some(ActiveSession {
            start: now,
            cycles: Vec::new(),
        });
        true
    }

    pub fn is_active(&self) -> bool {
        self.active.is_some()
    }

    pub fn start(&self) -> Option<NaiveDateTime> {
        self.active.as_ref().map(|s| s.start)
    }

    pub fn cycles(&self) -> &[CycleRecord] {
        self.active.as_ref().map(|s| s.cycles.as_slice()).unwrap_or(&[])
    }

    pub fn breath_count(&self) -> u32 {
        self.cycles().len() as u32
    }

    /// # Errors
    /// `NoActiveSession` if no session is running.
    pub fn record_cycle(&mut self, cycle: CycleRecord) -> Result<(), SessionError> {
        let session = self.active.as_mut().ok_or(SessionError::NoActiveSession)?;
        session.cycles.push(cycle);
        Ok(())
    }

    /// Feed an engine event.
    ///
    /// The first inhale opens the session and each completed breath is
    /// recorded; other events are ignored.
    pub fn observe(&mut self, event: &BreathEvent, now: NaiveDateTime) {
        match event {
            BreathEvent::PhaseStarted {
                kind: PhaseKind::Inhale,
                ..
            } => {
                self.begin_session(now);
            }
            BreathEvent::BreathCompleted {
                inhale_secs,
                exhale_secs,
                ..
            } => {
                if self
                    .record_cycle(CycleRecord::new(*inhale_secs, *exhale_secs))
                    .is_err()
                {
                    debug!("breath completed outside a session, ignored");
                }
            }
            _ => {}
        }
    }

    /// Close the running session and package it.
    ///
    /// # Errors
    /// `NoActiveSession` if no session is running.
    pub fn end_session(&mut self, now: NaiveDateTime) -> Result<SessionRecord, SessionError> {
        let session = self.active.take().ok_or(SessionError::NoActiveSession)?;
        let elapsed = (now - session.start).num_seconds().max(0);
        let duration_seconds = u32::try_from(elapsed).unwrap_or(u32::MAX);
        let breath_count = session.cycles.len() as u32;
        debug!(duration_seconds, breath_count, "session ended");
        Ok(SessionRecord::new(session.start, duration_seconds, breath_count).with_cycles(session.cycles))
    }
}

/// `start` timestamps: written as `%Y-%m-%d %H:%M:%S`, older files used
/// `%Y-%m-%d %H:%M`.
pub(crate) mod start_format {
    use chrono::NaiveDateTime;
    use serde::{Deserialize, Deserializer, Serializer};

    pub const FORMAT: &str = "%Y-%m-%d %H:%M:%S";
    const ACCEPTED: [&str; 4] = [FORMAT, "%Y-%m-%d %H:%M", "%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M"];

    pub fn serialize<S: Serializer>(value: &NaiveDateTime, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(&value.format(FORMAT))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveDateTime, D::Error> {
        let raw = String::deserialize(deserializer)?;
        parse(&raw).ok_or_else(|| serde::de::Error::custom(format!("invalid session start: {raw}")))
    }

    pub fn parse(raw: &str) -> Option<NaiveDateTime> {
        ACCEPTED
            .iter()
            .find_map(|fmt| NaiveDateTime::parse_from_str(raw.trim(), fmt).ok())
    }
}
