//! # Clock Abstraction
//!
//! Every service reads the current time through the [`Clock`] trait
//! instead of calling `Utc::now()` directly. Deadlines, check-in days,
//! content-publish windows and flower grace periods all hinge on
//! "today", so tests pin the clock to a fixed date and walk it forward
//! day by day to exercise every boundary deterministically.

use std::sync::RwLock;

use chrono::{DateTime, Duration, NaiveDate, Utc};

/// Source of the current date and time.
pub trait Clock: Send + Sync {
    /// Current instant in UTC.
    fn now(&self) -> DateTime<Utc>;

    /// Current calendar date in UTC.
    fn today(&self) -> NaiveDate {
        self.now().date_naive()
    }
}

/// Production clock backed by the system time.
#[derive(Debug, Default, Clone)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Manually controlled clock for tests and demos.
///
/// ## Example
///
/// ```rust,ignore
/// let clock = FixedClock::at_date(2025, 1, 10);
/// assert_eq!(clock.today().to_string(), "2025-01-10");
/// clock.advance_days(1);
/// assert_eq!(clock.today().to_string(), "2025-01-11");
/// ```
#[derive(Debug)]
pub struct FixedClock {
    now: RwLock<DateTime<Utc>>,
}

impl FixedClock {
    /// Create a clock pinned to the given instant.
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            now: RwLock::new(now),
        }
    }

    /// Create a clock pinned to noon UTC on the given date.
    ///
    /// Panics on an impossible calendar date; callers pass literals.
    pub fn at_date(year: i32, month: u32, day: u32) -> Self {
        let date = NaiveDate::from_ymd_opt(year, month, day).expect("valid calendar date");
        let now = date.and_hms_opt(12, 0, 0).expect("valid time").and_utc();
        Self::new(now)
    }

    /// Move the clock to a new instant.
    pub fn set(&self, now: DateTime<Utc>) {
        *self.now.write().expect("clock lock poisoned") = now;
    }

    /// Move the clock to noon UTC on the given date.
    pub fn set_date(&self, date: NaiveDate) {
        let now = date.and_hms_opt(12, 0, 0).expect("valid time").and_utc();
        self.set(now);
    }

    /// Advance the clock by whole days (negative moves it back).
    pub fn advance_days(&self, days: i64) {
        let mut guard = self.now.write().expect("clock lock poisoned");
        *guard += Duration::days(days);
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.read().expect("clock lock poisoned")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_clock_advances() {
        let clock = FixedClock::at_date(2025, 1, 10);
        assert_eq!(clock.today(), NaiveDate::from_ymd_opt(2025, 1, 10).unwrap());

        clock.advance_days(2);
        assert_eq!(clock.today(), NaiveDate::from_ymd_opt(2025, 1, 12).unwrap());

        clock.advance_days(-3);
        assert_eq!(clock.today(), NaiveDate::from_ymd_opt(2025, 1, 9).unwrap());
    }

    #[test]
    fn test_system_clock_is_roughly_now() {
        let clock = SystemClock;
        let before = Utc::now();
        let observed = clock.now();
        assert!(observed >= before);
    }
}
