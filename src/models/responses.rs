//! # Operation Outputs
//!
//! Shaped results returned by the service layer.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::db::models::{EnrollmentRecord, EventRecord, ScheduleSlotRecord};

/// An event together with its schedule and admission state.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventDetailResponse {
    /// The event row.
    pub event: EventRecord,

    /// Slots ordered by day number. Empty until the event starts
    /// (slots are generated at start time).
    pub slots: Vec<ScheduleSlotRecord>,

    /// Enrolled participant count against `event.max_participants`.
    pub enrolled_participants: i64,
}

/// One member's standing within an event.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberProgressResponse {
    /// The enrollment row with its running counters.
    pub enrollment: EnrollmentRecord,

    /// Eligible days for the whole event (weekends excluded when the
    /// event rests on weekends).
    pub eligible_days: i32,

    /// Completion percentage over the whole event's eligible days,
    /// computed from the counters as they stand now.
    pub completion_rate: f64,

    /// Whether the current rate meets the event's standard.
    pub meets_standard: bool,
}

/// A giver's remaining allowance for one calendar date.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuotaStatusResponse {
    /// The date the quota applies to.
    pub quota_date: NaiveDate,

    /// Flowers already given on that date.
    pub used: i32,

    /// The day's allowance.
    pub max: i32,

    /// `max - used`.
    pub remaining: i32,
}

/// Result of a successful flower give.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GiveFlowerResponse {
    /// The recorded flower ID.
    pub flower_id: uuid::Uuid,

    /// The recipient.
    pub recipient_id: uuid::Uuid,

    /// Flowers given.
    pub amount: i32,

    /// The giver's quota state after this give.
    pub quota: QuotaStatusResponse,
}

/// Why a slot surfaced in the backup scan.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum BackupReason {
    /// No leader assigned at all.
    Unassigned,

    /// A leader is assigned but published nothing, and the slot's
    /// day has arrived.
    ContentMissing,

    /// Check-ins exist but none has received a flower yet.
    FlowersMissing,
}

impl std::fmt::Display for BackupReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            BackupReason::Unassigned => "unassigned",
            BackupReason::ContentMissing => "content_missing",
            BackupReason::FlowersMissing => "flowers_missing",
        };
        write!(f, "{label}")
    }
}

/// A slot needing attention from the overall leader or organizer.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackupCandidate {
    /// The slot in question.
    pub slot: ScheduleSlotRecord,

    /// What is missing.
    pub reason: BackupReason,
}
