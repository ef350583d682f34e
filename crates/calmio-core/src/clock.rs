//! Time sources.
//!
//! Everything that needs "now" receives a [`Clock`] handle instead of calling
//! `Local::now()` directly. The developer day offset lets the app simulate
//! consecutive days without touching the system clock.

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Mutex;

use chrono::{Duration, Local, NaiveDate, NaiveDateTime};

/// Supplies the current local wall-clock time.
pub trait Clock: Send + Sync + std::fmt::Debug {
    /// Current time, including any developer day offset.
    fn now(&self) -> NaiveDateTime;

    /// Shift every future `now()` by `days` (developer fast-forward).
    fn advance_days(&self, days: i64);

    /// Drop the developer day offset.
    fn reset_offset(&self);

    /// Days currently added to the underlying time.
    fn offset_days(&self) -> i64;

    fn today(&self) -> NaiveDate {
        self.now().date()
    }
}

/// Local system time plus an optional day offset.
#[derive(Debug, Default)]
pub struct SystemClock {
    offset_days: AtomicI64,
}

impl SystemClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start with an offset restored from configuration.
    pub fn with_offset_days(days: i64) -> Self {
        Self {
            offset_days: AtomicI64::new(days),
        }
    }
}

impl Clock for SystemClock {
    fn now(&self) -> NaiveDateTime {
        Local::now().naive_local() + Duration::days(self.offset_days())
    }

    fn advance_days(&self, days: i64) {
        self.offset_days.fetch_add(days, Ordering::SeqCst);
    }

    fn reset_offset(&self) {
        self.offset_days.store(0, Ordering::SeqCst);
    }

    fn offset_days(&self) -> i64 {
        self.offset_days.load(Ordering::SeqCst)
    }
}

/// Clock that only moves when told to.
///
/// Used by tests and by the CLI's simulated sessions, where the breath engine
/// is driven by logical timers and the measured cycle durations must line up
/// with them exactly.
#[derive(Debug)]
pub struct ManualClock {
    base: Mutex<NaiveDateTime>,
    offset_days: AtomicI64,
}

impl ManualClock {
    pub fn new(start: NaiveDateTime) -> Self {
        Self {
            base: Mutex::new(start),
            offset_days: AtomicI64::new(0),
        }
    }

    pub fn set(&self, at: NaiveDateTime) {
        *self.lock() = at;
    }

    pub fn advance(&self, by: Duration) {
        let mut base = self.lock();
        *base += by;
    }

    pub fn advance_ms(&self, ms: u64) {
        self.advance(Duration::milliseconds(ms as i64));
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, NaiveDateTime> {
        // A poisoned guard still holds a valid timestamp.
        self.base.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Clock for ManualClock {
    fn now(&self) -> NaiveDateTime {
        *self.lock() + Duration::days(self.offset_days())
    }

    fn advance_days(&self, days: i64) {
        self.offset_days.fetch_add(days, Ordering::SeqCst);
    }

    fn reset_offset(&self) {
        self.offset_days.store(0, Ordering::SeqCst);
    }

    fn offset_days(&self) -> i64 {
        self.offset_days.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(y: i32, m: u32, d: u32, h: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(h, 0, 0)
            .unwrap()
    }

    #[test]
    fn manual_clock_moves_only_when_told() {
        let clock = ManualClock::new(at(2023, 1, 1, 8));
        assert_eq!(clock.now(), at(2023, 1, 1, 8));
        clock.advance_ms(1500);
        assert_eq!(clock.now(), at(2023, 1, 1, 8) + Duration::milliseconds(1500));
    }

    #[test]
    fn day_offset_applies_and_resets() {
        let clock = ManualClock::new(at(2023, 1, 1, 8));
        clock.advance_days(2);
        clock.advance_days(1);
        assert_eq!(clock.offset_days(), 3);
        assert_eq!(clock.today(), NaiveDate::from_ymd_opt(2023, 1, 4).unwrap());
        clock.reset_offset();
        assert_eq!(clock.today(), NaiveDate::from_ymd_opt(2023, 1, 1).unwrap());
    }

    #[test]
    fn system_clock_offset_shifts_today() {
        let clock = SystemClock::with_offset_days(0);
        let before = clock.today();
        clock.advance_days(1);
        // Allow for a midnight rollover between the two reads.
        let after = clock.today();
        assert!(after == before + Duration::days(1) || after == before + Duration::days(2));
        clock.reset_offset();
        assert_eq!(clock.offset_days(), 0);
    }
}
