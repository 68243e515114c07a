//! # Database Models
//!
//! This module defines the data structures that map to database tables.
//! Each struct represents a row in a table.
//!
//! ## Table Overview
//!
//! | Table | Description |
//! |-------|-------------|
//! | `events` | Book-club events with their approval and activity state |
//! | `schedule_slots` | One row per club day, with the assigned leader |
//! | `enrollments` | Member participation records with running counters |
//! | `check_ins` | One reading note / attendance mark per member per slot |
//! | `flowers` | Peer recognition, at most one per check-in |
//! | `flower_quotas` | Per (user, event, date) give allowance |
//! | `daily_flower_stats` | Leaderboard snapshot per (event, date) |
//! | `certificates` | Uniquely numbered achievement records |
//! | `leader_audits` | History of slot leader replacements |
//!
//! ## Relationship Diagram
//!
//! ```text
//! ┌─────────────┐       ┌───────────────────┐       ┌─────────────┐
//! │   events    │──────<│  schedule_slots   │──────<│  check_ins  │
//! │             │       │                   │       │             │
//! │ id (PK)     │       │ event_id (FK)     │       │ slot_id(FK) │
//! │ statuses    │       │ day_number        │       │ user_id     │
//! │ dates       │       │ leader_id         │       └──────┬──────┘
//! └──────┬──────┘       └───────────────────┘              │ 1:0..1
//!        │                                                 ▼
//!        │              ┌───────────────────┐       ┌─────────────┐
//!        └─────────────<│   enrollments     │       │   flowers   │
//!                       │                   │       │             │
//!                       │ event_id (FK)     │       │ check_in_id │
//!                       │ user_id           │       │ giver/recip │
//!                       │ counters          │       └─────────────┘
//!                       └───────────────────┘
//! ```

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ============================================
// STATUS ENUMS
// ============================================

/// Approval axis of the event state machine.
///
/// `draft → pending → approved | rejected`; a rejected event may be
/// amended and resubmitted to `pending`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ApprovalStatus {
    /// Created but never submitted for review
    Draft,
    /// Submitted, waiting for an admin decision
    Pending,
    /// Cleared to enroll members and run
    Approved,
    /// Turned down; may be amended and resubmitted
    Rejected,
}

impl ApprovalStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ApprovalStatus::Draft => "draft",
            ApprovalStatus::Pending => "pending",
            ApprovalStatus::Approved => "approved",
            ApprovalStatus::Rejected => "rejected",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "draft" => Some(ApprovalStatus::Draft),
            "pending" => Some(ApprovalStatus::Pending),
            "approved" => Some(ApprovalStatus::Approved),
            "rejected" => Some(ApprovalStatus::Rejected),
            _ => None,
        }
    }
}

impl std::fmt::Display for ApprovalStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Activity axis of the event state machine.
///
/// Only ever advances: `enrolling → in_progress → completed`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ActivityStatus {
    /// Accepting enrollments
    Enrolling,
    /// The reading season is running
    InProgress,
    /// Finished; terminal
    Completed,
}

impl ActivityStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActivityStatus::Enrolling => "enrolling",
            ActivityStatus::InProgress => "in_progress",
            ActivityStatus::Completed => "completed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "enrolling" => Some(ActivityStatus::Enrolling),
            "in_progress" => Some(ActivityStatus::InProgress),
            "completed" => Some(ActivityStatus::Completed),
            _ => None,
        }
    }
}

impl std::fmt::Display for ActivityStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How members participate each day.
///
/// The completion formula counts check-ins for `NoteCheckIn` and
/// session attendance marks (stored through the same table) for the
/// meeting-based modes.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ActivityMode {
    /// Members post a daily reading note
    NoteCheckIn,
    /// Open-ended discussion threads
    FreeDiscussion,
    /// Scheduled video sessions
    VideoConference,
    /// In-person meetings
    OfflineMeeting,
}

impl ActivityMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActivityMode::NoteCheckIn => "note_check_in",
            ActivityMode::FreeDiscussion => "free_discussion",
            ActivityMode::VideoConference => "video_conference",
            ActivityMode::OfflineMeeting => "offline_meeting",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "note_check_in" => Some(ActivityMode::NoteCheckIn),
            "free_discussion" => Some(ActivityMode::FreeDiscussion),
            "video_conference" => Some(ActivityMode::VideoConference),
            "offline_meeting" => Some(ActivityMode::OfflineMeeting),
            _ => None,
        }
    }
}

impl std::fmt::Display for ActivityMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How daily leaders are chosen for an event.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum LeaderStrategy {
    /// Members claim open slots themselves
    Voluntary,
    /// Shuffled participant list dealt round-robin across open slots
    Random,
    /// Fixed rotating order, never repeating on adjacent days
    Rotation,
    /// Fewest-assignments-first, ties broken by seeded randomness
    Balanced,
    /// No leaders at all
    Disabled,
}

impl LeaderStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            LeaderStrategy::Voluntary => "voluntary",
            LeaderStrategy::Random => "random",
            LeaderStrategy::Rotation => "rotation",
            LeaderStrategy::Balanced => "balanced",
            LeaderStrategy::Disabled => "disabled",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "voluntary" => Some(LeaderStrategy::Voluntary),
            "random" => Some(LeaderStrategy::Random),
            "rotation" => Some(LeaderStrategy::Rotation),
            "balanced" => Some(LeaderStrategy::Balanced),
            "disabled" => Some(LeaderStrategy::Disabled),
            _ => None,
        }
    }
}

impl std::fmt::Display for LeaderStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Fee model for an event.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FeeKind {
    /// No fee at all
    Free,
    /// Refundable deposit, returned to members who meet the standard
    Deposit,
    /// Non-refundable participation fee
    Paid,
}

impl FeeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FeeKind::Free => "free",
            FeeKind::Deposit => "deposit",
            FeeKind::Paid => "paid",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "free" => Some(FeeKind::Free),
            "deposit" => Some(FeeKind::Deposit),
            "paid" => Some(FeeKind::Paid),
            _ => None,
        }
    }
}

impl std::fmt::Display for FeeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Whether an enrollment counts against capacity.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum EnrollmentKind {
    /// Full member; counts toward capacity, may lead and check in
    Participant,
    /// Spectator; unlimited, read-only participation
    Observer,
}

impl EnrollmentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EnrollmentKind::Participant => "participant",
            EnrollmentKind::Observer => "observer",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "participant" => Some(EnrollmentKind::Participant),
            "observer" => Some(EnrollmentKind::Observer),
            _ => None,
        }
    }
}

impl std::fmt::Display for EnrollmentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Enrollment status.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum EnrollmentStatus {
    /// Active member of the event
    Enrolled,
    /// Finished the event meeting the completion standard
    Completed,
    /// Withdrew while the event was still enrolling
    Cancelled,
}

impl EnrollmentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            EnrollmentStatus::Enrolled => "enrolled",
            EnrollmentStatus::Completed => "completed",
            EnrollmentStatus::Cancelled => "cancelled",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "enrolled" => Some(EnrollmentStatus::Enrolled),
            "completed" => Some(EnrollmentStatus::Completed),
            "cancelled" => Some(EnrollmentStatus::Cancelled),
            _ => None,
        }
    }
}

impl std::fmt::Display for EnrollmentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Refund bookkeeping state for an enrollment.
///
/// No money moves here; settlement is an external concern. The status
/// only records what the settlement system owes.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RefundStatus {
    /// Nothing to refund
    None,
    /// A refund amount was recorded and awaits settlement
    Pending,
    /// External settlement confirmed the refund
    Settled,
}

impl RefundStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RefundStatus::None => "none",
            RefundStatus::Pending => "pending",
            RefundStatus::Settled => "settled",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "none" => Some(RefundStatus::None),
            "pending" => Some(RefundStatus::Pending),
            "settled" => Some(RefundStatus::Settled),
            _ => None,
        }
    }
}

impl std::fmt::Display for RefundStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a certificate was issued for.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CertificateKind {
    /// Met the event's completion standard
    Completion,
    /// Ranked top-3 by flowers received
    FlowerRank,
}

impl CertificateKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            CertificateKind::Completion => "completion",
            CertificateKind::FlowerRank => "flower_rank",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "completion" => Some(CertificateKind::Completion),
            "flower_rank" => Some(CertificateKind::FlowerRank),
            _ => None,
        }
    }
}

impl std::fmt::Display for CertificateKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================
// TABLE RECORDS
// ============================================

/// Represents an event row in the database.
///
/// An event is one reading season for one book: a date range, a
/// capacity, a fee model and two independent state machines (approval
/// and activity).
///
/// ## Fields
///
/// | Field | Type | Description |
/// |-------|------|-------------|
/// | id | Uuid | Primary key |
/// | organizer_id | Uuid | The member who created the event |
/// | overall_leader_id | Option<Uuid> | Standing backup leader for every slot |
/// | start_date / end_date | NaiveDate | Inclusive reading season |
/// | enroll_deadline | NaiveDate | Last day to join; strictly before start |
/// | min/max_participants | i32 | Capacity bounds |
/// | fee_amount | i64 | In minor currency units (cents) |
/// | completion_standard | i32 | Percentage (60-100) required to complete |
///
/// ## Note on Types
///
/// Money is `i64` cents; PostgreSQL has no unsigned integers and
/// amounts stay well inside the range.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventRecord {
    /// Unique event ID (UUID v4).
    pub id: Uuid,

    /// Display title of the event.
    pub title: String,

    /// Title of the book being read.
    pub book_title: String,

    /// Author of the book, if known.
    pub book_author: Option<String>,

    /// The organizer's user ID.
    pub organizer_id: Uuid,

    /// The designated overall leader, if any.
    ///
    /// Holds a standing backup permission over every slot for the
    /// whole event, regardless of daily windows.
    pub overall_leader_id: Option<Uuid>,

    /// First reading day (inclusive).
    pub start_date: NaiveDate,

    /// Last reading day (inclusive).
    pub end_date: NaiveDate,

    /// Last day on which members may join. Strictly before `start_date`.
    pub enroll_deadline: NaiveDate,

    /// Minimum participants required to start.
    pub min_participants: i32,

    /// Hard cap on enrolled participants. Observers are not counted.
    pub max_participants: i32,

    /// Fee model for this event.
    pub fee_kind: FeeKind,

    /// Fee or deposit amount in cents. Zero for free events.
    pub fee_amount: i64,

    /// Share of collected fees earmarked for leaders (0-100).
    /// Bookkeeping only; settlement is external.
    pub leader_reward_percent: i32,

    /// Completion percentage (60-100) a participant must reach.
    pub completion_standard: i32,

    /// How members participate each day.
    pub activity_mode: ActivityMode,

    /// How daily leaders are chosen.
    pub leader_strategy: LeaderStrategy,

    /// Skip Saturdays and Sundays when scheduling and counting.
    pub weekend_rest: bool,

    /// Approval axis state.
    pub approval_status: ApprovalStatus,

    /// Activity axis state.
    pub activity_status: ActivityStatus,

    /// Reason recorded by the rejecting admin, if any.
    pub reject_reason: Option<String>,

    /// When the organizer last submitted for approval.
    pub submitted_at: Option<DateTime<Utc>>,

    /// When an admin approved the event.
    pub approved_at: Option<DateTime<Utc>>,

    /// When the event moved to `in_progress`.
    pub started_at: Option<DateTime<Utc>>,

    /// When the event moved to `completed`.
    pub completed_at: Option<DateTime<Utc>>,

    /// When the row was created.
    pub created_at: DateTime<Utc>,

    /// When the row was last updated.
    pub updated_at: DateTime<Utc>,
}

/// One calendar day of an event's schedule.
///
/// Created once by the schedule generator; afterwards only the leader
/// and content fields change.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleSlotRecord {
    /// Unique slot ID.
    pub id: Uuid,

    /// The owning event.
    pub event_id: Uuid,

    /// 1-based position within the event's schedule.
    pub day_number: i32,

    /// Calendar date of this slot.
    pub slot_date: NaiveDate,

    /// Assigned daily leader, if any.
    pub leader_id: Option<Uuid>,

    /// Title of the published reading content.
    pub content_title: Option<String>,

    /// Body of the published reading content.
    pub content_body: Option<String>,

    /// When the leader published content for this slot.
    pub content_published_at: Option<DateTime<Utc>>,

    /// When the slot row was created.
    pub created_at: DateTime<Utc>,
}

/// A member's participation in one event.
///
/// The running counters (check-ins, leader days, flowers received)
/// are denormalized here and updated inside the same transaction as
/// the underlying mutation so they can never drift.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnrollmentRecord {
    /// Unique enrollment ID.
    pub id: Uuid,

    /// The event joined.
    pub event_id: Uuid,

    /// The joining user.
    pub user_id: Uuid,

    /// Display name captured at join time, for leaderboards.
    pub display_name: String,

    /// Participant or observer.
    pub kind: EnrollmentKind,

    /// Current status.
    pub status: EnrollmentStatus,

    /// Number of recorded check-ins.
    pub check_ins: i32,

    /// Number of slots this member currently leads.
    pub leader_days: i32,

    /// Total flowers received across the event.
    pub flowers_received: i32,

    /// Final completion percentage, set when the event completes.
    pub completion_rate: Option<f64>,

    /// Fee recorded as paid at join time, in cents.
    pub paid_amount: i64,

    /// Refund recorded at cancel or completion, in cents.
    pub refund_amount: i64,

    /// Refund bookkeeping state.
    pub refund_status: RefundStatus,

    /// When the member joined.
    pub created_at: DateTime<Utc>,

    /// When the row was last updated.
    pub updated_at: DateTime<Utc>,
}

/// A member's daily check-in (reading note or attendance mark).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckInRecord {
    /// Unique check-in ID.
    pub id: Uuid,

    /// The owning event (denormalized from the slot for cheap lookups).
    pub event_id: Uuid,

    /// The slot checked in for.
    pub slot_id: Uuid,

    /// The member checking in.
    pub user_id: Uuid,

    /// Reading note text. Empty for attendance-based modes.
    pub note: Option<String>,

    /// Calendar date the check-in was recorded on.
    pub checked_on: NaiveDate,

    /// When the check-in was recorded.
    pub created_at: DateTime<Utc>,
}

/// A flower given to one check-in.
///
/// At most one flower per check-in, enforced by a unique constraint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlowerRecord {
    /// Unique flower ID.
    pub id: Uuid,

    /// The owning event.
    pub event_id: Uuid,

    /// The slot the rewarded check-in belongs to.
    pub slot_id: Uuid,

    /// The rewarded check-in. Unique.
    pub check_in_id: Uuid,

    /// The giving leader.
    pub giver_id: Uuid,

    /// The check-in's author.
    pub recipient_id: Uuid,

    /// Flower count, at least 1.
    pub amount: i32,

    /// Optional message from the giver.
    pub comment: Option<String>,

    /// Hide the giver's identity from the recipient.
    pub anonymous: bool,

    /// Calendar date the flower was given on; the quota day it consumed.
    pub given_on: NaiveDate,

    /// When the flower was recorded.
    pub created_at: DateTime<Utc>,
}

/// A member's give allowance for one (event, calendar date).
///
/// Rows appear lazily on first give; a new date simply has no row
/// yet, which is equivalent to a fresh quota.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlowerQuotaRecord {
    /// The giving user.
    pub user_id: Uuid,

    /// The event the quota applies to.
    pub event_id: Uuid,

    /// The calendar date the quota applies to.
    pub quota_date: NaiveDate,

    /// Flowers already given on this date.
    pub used: i32,

    /// Allowance stamped when the row was created.
    pub max: i32,
}

/// One entry of a daily leaderboard.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LeaderboardEntry {
    /// 1-based rank, densest first.
    pub rank: i32,

    /// The recipient.
    pub user_id: Uuid,

    /// Display name captured from the enrollment.
    pub display_name: String,

    /// Flowers received on the stat date.
    pub flowers: i32,
}

/// Snapshot of one day's flower leaderboard for an event.
///
/// Keyed by (event, date); regeneration overwrites the same key and
/// never duplicates.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DailyStatRecord {
    /// Unique stat ID.
    pub id: Uuid,

    /// The event the snapshot belongs to.
    pub event_id: Uuid,

    /// The calendar date the snapshot covers.
    pub stat_date: NaiveDate,

    /// Flowers given on the stat date.
    pub total_flowers: i32,

    /// Check-ins recorded on the stat date.
    pub total_check_ins: i32,

    /// Ranked [`LeaderboardEntry`] list as JSON.
    pub leaderboard: serde_json::Value,

    /// When the snapshot was (re)generated.
    pub generated_at: DateTime<Utc>,
}

/// An immutable achievement record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CertificateRecord {
    /// Unique certificate ID.
    pub id: Uuid,

    /// The event the certificate was earned in.
    pub event_id: Uuid,

    /// The honored member.
    pub user_id: Uuid,

    /// Completion or flower-rank.
    pub kind: CertificateKind,

    /// Human-facing serial, e.g. `RCC-000042`. Unique.
    pub serial: String,

    /// Flower-rank position (1-3); `None` for completion certificates.
    pub rank: Option<i32>,

    /// Final completion rate; `None` for flower-rank certificates.
    pub completion_rate: Option<f64>,

    /// When the certificate was issued.
    pub issued_at: DateTime<Utc>,
}

/// Audit entry written whenever a slot's leader is replaced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LeaderAuditRecord {
    /// Unique audit ID.
    pub id: Uuid,

    /// The owning event.
    pub event_id: Uuid,

    /// The slot whose leader changed.
    pub slot_id: Uuid,

    /// Leader before the change; `None` if the slot was open.
    pub prior_leader_id: Option<Uuid>,

    /// Leader after the change.
    pub new_leader_id: Uuid,

    /// Who triggered the change.
    pub actor_id: Uuid,

    /// When the change happened.
    pub changed_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_enums_round_trip() {
        for status in [
            ApprovalStatus::Draft,
            ApprovalStatus::Pending,
            ApprovalStatus::Approved,
            ApprovalStatus::Rejected,
        ] {
            assert_eq!(ApprovalStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(ApprovalStatus::parse("bogus"), None);

        for strategy in [
            LeaderStrategy::Voluntary,
            LeaderStrategy::Random,
            LeaderStrategy::Rotation,
            LeaderStrategy::Balanced,
            LeaderStrategy::Disabled,
        ] {
            assert_eq!(LeaderStrategy::parse(strategy.as_str()), Some(strategy));
        }
    }

    #[test]
    fn test_serde_names_match_db_strings() {
        let json = serde_json::to_string(&ActivityStatus::InProgress).unwrap();
        assert_eq!(json, "\"in_progress\"");

        let json = serde_json::to_string(&CertificateKind::FlowerRank).unwrap();
        assert_eq!(json, "\"flower_rank\"");
    }
}
