//! # Storage Seam
//!
//! Services talk to persistence through the [`ClubStore`] trait. Two
//! implementations exist:
//!
//! - [`PgStore`] - production, PostgreSQL behind deadpool
//! - [`MemStore`] - in-memory double with identical semantics, used
//!   by tests and the demo binary
//!
//! ## Atomicity Contract
//!
//! Every trait method is one atomic unit. The invariant-carrying
//! writes bundle their guard and their mutation together so that no
//! caller can ever observe (or exploit) the gap between a check and a
//! write:
//!
//! - `admit_enrollment` - capacity check + insert, serialized per event
//! - `claim_slot` - open-slot check + cap check + counter bump + assign
//! - `record_check_in` - uniqueness per (slot, user) + counter bump
//! - `record_flower` - quota consume + one-per-check-in + counter bump
//! - `transition_*` - compare-and-set state advances
//!
//! Losing a race yields the specific typed error (`CapacityExceeded`,
//! `QuotaExceeded`, `DuplicateAssignment`, ...), never a generic
//! failure and never partial state.
//!
//! The services still pre-validate for friendly error messages; the
//! store checks are the ones that hold under concurrency.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use uuid::Uuid;

use crate::db::models::*;
use crate::error::ClubResult;

pub use memory::MemStore;
pub use postgres::PgStore;

/// Transactional persistence for the club domain.
///
/// Implementations must make each method atomic: either the whole
/// mutation applies or none of it does, and concurrent callers of the
/// guarded writes resolve to typed errors rather than torn state.
#[async_trait]
pub trait ClubStore: Send + Sync {
    // ==========================================
    // EVENTS
    // ==========================================

    /// Insert a freshly created event.
    async fn insert_event(&self, event: &EventRecord) -> ClubResult<()>;

    /// Fetch an event by ID.
    async fn get_event(&self, event_id: Uuid) -> ClubResult<Option<EventRecord>>;

    /// List events currently in the given activity status.
    async fn list_events_by_activity(
        &self,
        status: ActivityStatus,
    ) -> ClubResult<Vec<EventRecord>>;

    /// Overwrite an event's amendable fields.
    ///
    /// Returns `false` when the event is no longer amendable (it left
    /// the draft/rejected states since the caller looked).
    async fn update_event_details(&self, event: &EventRecord) -> ClubResult<bool>;

    /// Compare-and-set advance of the approval state machine.
    ///
    /// Applies `next` only if the current status is one of `expected`;
    /// returns `false` otherwise. Timestamps and the rejection reason
    /// are maintained as part of the same write.
    async fn transition_approval(
        &self,
        event_id: Uuid,
        expected: &[ApprovalStatus],
        next: ApprovalStatus,
        reject_reason: Option<&str>,
        at: DateTime<Utc>,
    ) -> ClubResult<bool>;

    /// Compare-and-set advance of the activity state machine.
    ///
    /// Only the two legal advances exist; starting additionally
    /// requires the event to be approved. Returns `false` when the
    /// event was not in `expected`.
    async fn transition_activity(
        &self,
        event_id: Uuid,
        expected: ActivityStatus,
        next: ActivityStatus,
        at: DateTime<Utc>,
    ) -> ClubResult<bool>;

    /// Set or clear the event's overall leader.
    async fn set_overall_leader(
        &self,
        event_id: Uuid,
        leader_id: Option<Uuid>,
    ) -> ClubResult<bool>;

    // ==========================================
    // SCHEDULE SLOTS
    // ==========================================

    /// Insert generated slots, skipping any (event, day) that already
    /// exists. Returns how many rows were actually inserted.
    async fn insert_slots(&self, slots: &[ScheduleSlotRecord]) -> ClubResult<u64>;

    /// Fetch a slot by ID.
    async fn get_slot(&self, slot_id: Uuid) -> ClubResult<Option<ScheduleSlotRecord>>;

    /// List an event's slots ordered by day number.
    async fn list_slots(&self, event_id: Uuid) -> ClubResult<Vec<ScheduleSlotRecord>>;

    /// Voluntarily claim an open slot.
    ///
    /// Atomically verifies the slot is open, the claimant is an
    /// enrolled participant under the per-member cap, bumps the
    /// claimant's leader-day counter and assigns the slot. Errors:
    /// `DuplicateAssignment` (taken), `PermissionDenied` (capped or
    /// not an enrolled participant), `NotFound` (unknown slot).
    async fn claim_slot(
        &self,
        slot_id: Uuid,
        user_id: Uuid,
        cap: Option<i32>,
    ) -> ClubResult<ScheduleSlotRecord>;

    /// Fill an open slot during automatic assignment.
    ///
    /// Returns `false` without erroring when the slot is gone, already
    /// taken, or the candidate stopped being an enrolled participant;
    /// the assignment planner just moves on.
    async fn assign_open_slot(&self, slot_id: Uuid, leader_id: Uuid) -> ClubResult<bool>;

    /// Replace a slot's leader (backup flow).
    ///
    /// Idempotent when the slot already has this leader. Otherwise
    /// moves the leader-day counters between the two enrollments,
    /// overwrites the slot and appends an audit entry, all in one
    /// unit. Returns the prior leader.
    async fn reassign_slot_leader(
        &self,
        slot_id: Uuid,
        new_leader_id: Uuid,
        actor_id: Uuid,
        at: DateTime<Utc>,
    ) -> ClubResult<Option<Uuid>>;

    /// Store published content on a slot.
    async fn publish_slot_content(
        &self,
        slot_id: Uuid,
        title: &str,
        body: &str,
        at: DateTime<Utc>,
    ) -> ClubResult<()>;

    /// List leader replacement audits for an event.
    async fn list_leader_audits(&self, event_id: Uuid) -> ClubResult<Vec<LeaderAuditRecord>>;

    // ==========================================
    // ENROLLMENTS
    // ==========================================

    /// Admit a member, enforcing capacity atomically.
    ///
    /// `capacity` carries the participant cap for participant-type
    /// enrollments (`None` for observers, which are unlimited). The
    /// count-and-insert happens under a per-event serialization so
    /// that N concurrent callers admit exactly the remaining slack;
    /// losers get `CapacityExceeded`. A previously cancelled
    /// enrollment is re-activated in place, keeping its counters.
    /// Errors: `AlreadyEnrolled`, `CapacityExceeded`, `StateConflict`
    /// (event left `enrolling`), `NotFound`.
    async fn admit_enrollment(
        &self,
        enrollment: &EnrollmentRecord,
        capacity: Option<i32>,
    ) -> ClubResult<EnrollmentRecord>;

    /// Fetch one user's enrollment in an event.
    async fn get_enrollment(
        &self,
        event_id: Uuid,
        user_id: Uuid,
    ) -> ClubResult<Option<EnrollmentRecord>>;

    /// List all enrollments for an event, oldest first.
    async fn list_enrollments(&self, event_id: Uuid) -> ClubResult<Vec<EnrollmentRecord>>;

    /// Count enrolled participant-type members (the capacity number).
    async fn count_active_participants(&self, event_id: Uuid) -> ClubResult<i64>;

    /// Cancel an active enrollment while its event still enrolls.
    ///
    /// Returns `false` when there is nothing to cancel (no active
    /// enrollment, or the event already started).
    async fn cancel_enrollment(
        &self,
        event_id: Uuid,
        user_id: Uuid,
        refund_amount: i64,
    ) -> ClubResult<bool>;

    /// Record an enrollment's final completion outcome.
    async fn settle_enrollment(
        &self,
        enrollment_id: Uuid,
        completion_rate: f64,
        met_standard: bool,
        refund_amount: i64,
    ) -> ClubResult<()>;

    // ==========================================
    // CHECK-INS
    // ==========================================

    /// Record a member's daily check-in.
    ///
    /// Unique per (slot, user); bumps the enrollment's check-in
    /// counter in the same unit. Errors: `DuplicateCheckIn`,
    /// `PermissionDenied` (not an enrolled participant).
    async fn record_check_in(&self, check_in: &CheckInRecord) -> ClubResult<()>;

    /// Fetch a check-in by ID.
    async fn get_check_in(&self, check_in_id: Uuid) -> ClubResult<Option<CheckInRecord>>;

    /// List check-ins for one slot, oldest first.
    async fn list_check_ins_for_slot(&self, slot_id: Uuid) -> ClubResult<Vec<CheckInRecord>>;

    /// Count check-ins recorded for an event on one calendar date.
    async fn count_check_ins_on(&self, event_id: Uuid, date: NaiveDate) -> ClubResult<i64>;

    // ==========================================
    // FLOWERS & QUOTAS
    // ==========================================

    /// Record a flower, consuming quota.
    ///
    /// Creates the giver's quota row for the day if absent (stamped
    /// with `default_quota`), verifies `used + amount <= max`, inserts
    /// the flower (at most one per check-in) and bumps the recipient's
    /// counter, all in one unit. Returns the quota row after the give.
    /// Errors: `QuotaExceeded`, `DuplicateFlower`.
    async fn record_flower(
        &self,
        flower: &FlowerRecord,
        default_quota: i32,
    ) -> ClubResult<FlowerQuotaRecord>;

    /// Fetch a quota row, if one exists for the (user, event, date).
    async fn get_flower_quota(
        &self,
        user_id: Uuid,
        event_id: Uuid,
        date: NaiveDate,
    ) -> ClubResult<Option<FlowerQuotaRecord>>;

    /// List flowers given for an event on one calendar date.
    async fn list_flowers_on(
        &self,
        event_id: Uuid,
        date: NaiveDate,
    ) -> ClubResult<Vec<FlowerRecord>>;

    /// List every flower given across an event.
    async fn list_flowers_for_event(&self, event_id: Uuid) -> ClubResult<Vec<FlowerRecord>>;

    // ==========================================
    // STATS & CERTIFICATES
    // ==========================================

    /// Store a leaderboard snapshot, overwriting the (event, date)
    /// key in place. The stored row keeps its original ID across
    /// regenerations.
    async fn upsert_daily_stat(&self, stat: &DailyStatRecord) -> ClubResult<DailyStatRecord>;

    /// Fetch the snapshot for one (event, date).
    async fn get_daily_stat(
        &self,
        event_id: Uuid,
        date: NaiveDate,
    ) -> ClubResult<Option<DailyStatRecord>>;

    /// Draw the next certificate serial number.
    async fn next_certificate_serial(&self) -> ClubResult<i64>;

    /// Issue a certificate unless the (event, user, kind) already has
    /// one. Returns `None` when it was already issued.
    async fn insert_certificate(
        &self,
        certificate: &CertificateRecord,
    ) -> ClubResult<Option<CertificateRecord>>;

    /// List certificates issued for an event.
    async fn list_certificates(&self, event_id: Uuid) -> ClubResult<Vec<CertificateRecord>>;
}
