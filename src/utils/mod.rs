//! # Utilities Module
//!
//! This module contains the calendar helpers used across the backend
//! service. Club schedules are pure date arithmetic, so everything in
//! here is synchronous and storage-free.

use chrono::{Datelike, NaiveDate, Weekday};

/// Check whether a date falls on a weekend.
pub fn is_weekend(date: NaiveDate) -> bool {
    matches!(date.weekday(), Weekday::Sat | Weekday::Sun)
}

/// List the club days between two dates (inclusive).
///
/// When `weekend_rest` is set, Saturdays and Sundays are skipped:
/// they are neither scheduled nor counted toward completion.
///
/// ## Arguments
///
/// * `start` - First day of the range
/// * `end` - Last day of the range (inclusive)
/// * `weekend_rest` - Skip Saturdays and Sundays
///
/// ## Returns
///
/// The qualifying dates in ascending order. Empty when `end < start`.
///
/// ## Examples
///
/// ```rust,ignore
/// // Mon 2025-01-06 .. Sun 2025-01-12 with weekend rest
/// let days = club_days(start, end, true);
/// assert_eq!(days.len(), 5); // Mon-Fri only
/// ```
pub fn club_days(start: NaiveDate, end: NaiveDate, weekend_rest: bool) -> Vec<NaiveDate> {
    if end < start {
        return Vec::new();
    }

    start
        .iter_days()
        .take_while(|d| *d <= end)
        .filter(|d| !weekend_rest || !is_weekend(*d))
        .collect()
}

/// Count the days that qualify for participation between two dates.
///
/// This is the denominator of the completion rate: every scheduled
/// club day a member could have checked in on.
pub fn eligible_days(start: NaiveDate, end: NaiveDate, weekend_rest: bool) -> i32 {
    club_days(start, end, weekend_rest).len() as i32
}

/// Round a percentage to two decimal places.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn test_is_weekend() {
        assert!(!is_weekend(d(2025, 1, 6))); // Monday
        assert!(!is_weekend(d(2025, 1, 10))); // Friday
        assert!(is_weekend(d(2025, 1, 11))); // Saturday
        assert!(is_weekend(d(2025, 1, 12))); // Sunday
    }

    #[test]
    fn test_club_days_with_weekend_rest() {
        let days = club_days(d(2025, 1, 6), d(2025, 1, 12), true);
        assert_eq!(days.len(), 5);
        assert_eq!(days.first(), Some(&d(2025, 1, 6)));
        assert_eq!(days.last(), Some(&d(2025, 1, 10)));
    }

    #[test]
    fn test_club_days_without_weekend_rest() {
        let days = club_days(d(2025, 1, 6), d(2025, 1, 12), false);
        assert_eq!(days.len(), 7);
        assert_eq!(days.last(), Some(&d(2025, 1, 12)));
    }

    #[test]
    fn test_club_days_inverted_range_is_empty() {
        assert!(club_days(d(2025, 1, 12), d(2025, 1, 6), false).is_empty());
    }

    #[test]
    fn test_eligible_days_single_day() {
        assert_eq!(eligible_days(d(2025, 1, 6), d(2025, 1, 6), true), 1);
        // A weekend-only range with weekend rest has nothing to count.
        assert_eq!(eligible_days(d(2025, 1, 11), d(2025, 1, 12), true), 0);
    }

    #[test]
    fn test_round2() {
        assert_eq!(round2(66.66666), 66.67);
        assert_eq!(round2(100.0), 100.0);
        assert_eq!(round2(0.004), 0.0);
    }
}
