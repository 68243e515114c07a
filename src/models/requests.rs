//! # Operation Inputs
//!
//! Structures handed to the service layer by callers.
//! Each struct carries the caller-supplied fields of one operation;
//! caller identity travels separately as a [`super::UserRef`].

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::db::models::{ActivityMode, EnrollmentKind, FeeKind, LeaderStrategy};

/// Input for creating an event, and for amending one still in a
/// pre-approval state.
///
/// ## Example JSON
///
/// ```json
/// {
///     "title": "February Tolstoy",
///     "bookTitle": "Anna Karenina",
///     "bookAuthor": "Leo Tolstoy",
///     "startDate": "2025-02-03",
///     "endDate": "2025-02-21",
///     "enrollDeadline": "2025-02-01",
///     "minParticipants": 3,
///     "maxParticipants": 20,
///     "feeKind": "deposit",
///     "feeAmount": 500,
///     "completionStandard": 80,
///     "activityMode": "note_check_in",
///     "leaderStrategy": "rotation",
///     "weekendRest": true
/// }
/// ```
///
/// ## Validation
///
/// - `endDate` >= `startDate`, `enrollDeadline` < `startDate`
/// - `minParticipants` <= `maxParticipants`, both >= 1
/// - `completionStandard` in 60..=100
/// - `feeAmount` > 0 required for deposit/paid, 0 for free
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateEventRequest {
    /// Display title of the event.
    pub title: String,

    /// Title of the book being read.
    pub book_title: String,

    /// Author of the book.
    #[serde(default)]
    pub book_author: Option<String>,

    /// First reading day (inclusive).
    pub start_date: NaiveDate,

    /// Last reading day (inclusive).
    pub end_date: NaiveDate,

    /// Last day to join. Must fall strictly before `start_date`.
    pub enroll_deadline: NaiveDate,

    /// Minimum participants required to start.
    pub min_participants: i32,

    /// Hard cap on enrolled participants.
    pub max_participants: i32,

    /// Fee model.
    pub fee_kind: FeeKind,

    /// Fee or deposit amount in cents. Zero for free events.
    #[serde(default)]
    pub fee_amount: i64,

    /// Share of collected fees earmarked for leaders (0-100).
    #[serde(default)]
    pub leader_reward_percent: i32,

    /// Completion percentage (60-100) a participant must reach.
    pub completion_standard: i32,

    /// How members participate each day.
    pub activity_mode: ActivityMode,

    /// How daily leaders are chosen.
    pub leader_strategy: LeaderStrategy,

    /// Skip Saturdays and Sundays when scheduling and counting.
    #[serde(default)]
    pub weekend_rest: bool,
}

/// Input for joining an event.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinEventRequest {
    /// Join as a capacity-counted participant or a free observer.
    pub kind: EnrollmentKind,
}

/// Input for recording a daily check-in.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckInRequest {
    /// The slot being checked in for. Must be today's slot.
    pub slot_id: Uuid,

    /// Reading note text. Attendance-based modes leave this empty.
    #[serde(default)]
    pub note: Option<String>,
}

/// Input for publishing a slot's reading content.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublishContentRequest {
    /// The slot to publish for.
    pub slot_id: Uuid,

    /// Content title.
    pub title: String,

    /// Content body.
    pub body: String,
}

/// Input for giving a flower to a check-in.
///
/// ## Example JSON
///
/// ```json
/// {
///     "checkInId": "7c9e6679-7425-40de-963d-7806ee33cbcb",
///     "amount": 1,
///     "comment": "Loved the chapter 3 observation",
///     "anonymous": false
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GiveFlowerRequest {
    /// The check-in being rewarded.
    pub check_in_id: Uuid,

    /// Flowers to give; consumes this much quota. Defaults to 1.
    #[serde(default = "default_flower_amount")]
    pub amount: i32,

    /// Optional message to the recipient.
    #[serde(default)]
    pub comment: Option<String>,

    /// Hide the giver's identity from the recipient.
    #[serde(default)]
    pub anonymous: bool,
}

fn default_flower_amount() -> i32 {
    1
}

/// Input for replacing a slot's leader.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReassignLeaderRequest {
    /// The slot whose leader changes.
    pub slot_id: Uuid,

    /// The replacement leader. Must be an enrolled participant.
    pub new_leader_id: Uuid,
}
