//! # Completion Rate
//!
//! Completion percentage over an event's eligible days:
//!
//! ```text
//! rate = (check_ins + leader_days) / eligible_days × 100
//! ```
//!
//! Eligible days exclude weekends for weekend-rest events. The same
//! formula serves every activity mode; for the meeting-based modes
//! the check-in counter records session attendance instead of reading
//! notes, so the inputs already mean the right thing.
//!
//! Results are rounded to two decimals and clamped to [0, 100]. A day
//! both led and checked in counts twice, which is why the clamp
//! matters.

use crate::utils::round2;

/// Completion percentage from a member's counters.
///
/// Zero eligible days yields 0. Monotonically non-decreasing in both
/// counters.
pub fn completion_rate(check_ins: i32, leader_days: i32, eligible_days: i32) -> f64 {
    if eligible_days <= 0 {
        return 0.0;
    }
    let fulfilled = (check_ins + leader_days).clamp(0, eligible_days);
    round2(fulfilled as f64 / eligible_days as f64 * 100.0)
}

/// Whether a rate satisfies the event's completion standard.
pub fn meets_standard(rate: f64, standard: i32) -> bool {
    rate >= standard as f64
}
