//! # Enrollment Admission Service
//!
//! Capacity-bounded join and cancel, plus roster reads.
//!
//! ## Responsibilities
//!
//! - Validate join preconditions (approval, enrollment window,
//!   deadline)
//! - Admit members under the participant capacity cap
//! - Cancel enrollments while the event still enrolls
//! - Roster listing and per-member progress
//!
//! The capacity invariant itself is not enforced here: the store's
//! `admit_enrollment` primitive locks the event row and re-checks the
//! count, so N concurrent joins admit exactly the remaining slack and
//! the rest fail with `CapacityExceeded`. This service only rejects
//! what is already hopeless before touching the store.

use std::sync::Arc;

use tracing::{debug, info};
use uuid::Uuid;

use crate::clock::Clock;
use crate::db::models::{
    ActivityStatus, ApprovalStatus, EnrollmentKind, EnrollmentRecord, EnrollmentStatus,
    EventRecord, RefundStatus,
};
use crate::error::{ClubError, ClubResult};
use crate::models::{JoinEventRequest, MemberProgressResponse, UserRef};
use crate::notify::{DomainEvent, Notifier};
use crate::store::ClubStore;
use crate::utils::eligible_days;

use super::completion::{completion_rate, meets_standard};

/// Handles who is in an event.
#[derive(Clone)]
pub struct EnrollmentService {
    store: Arc<dyn ClubStore>,
    clock: Arc<dyn Clock>,
    notifier: Arc<dyn Notifier>,
}

impl EnrollmentService {
    pub fn new(
        store: Arc<dyn ClubStore>,
        clock: Arc<dyn Clock>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            store,
            clock,
            notifier,
        }
    }

    // ==========================================
    // ADMISSION
    // ==========================================

    /// Join an event.
    ///
    /// ## Arguments
    ///
    /// * `event_id` - The event to join
    /// * `user` - The joining member
    /// * `request` - Participant or observer
    ///
    /// ## Returns
    ///
    /// * `Ok(EnrollmentRecord)` - The admitted enrollment
    /// * `Err(StateConflict)` - Not approved / not enrolling / past deadline
    /// * `Err(CapacityExceeded)` - Participant cap already reached
    /// * `Err(AlreadyEnrolled)` - Active enrollment exists
    ///
    /// Participants count against `max_participants`; observers are
    /// admitted without a capacity check. Any fee due per the event's
    /// fee model is recorded on the enrollment as bookkeeping.
    pub async fn join(
        &self,
        event_id: Uuid,
        user: &UserRef,
        request: JoinEventRequest,
    ) -> ClubResult<EnrollmentRecord> {
        debug!("Join request: event={} user={}", event_id, user.id);

        let event = self.fetch_event(event_id).await?;
        self.check_joinable(&event)?;

        // Observers spectate for free; participants carry the fee.
        let paid_amount = match request.kind {
            EnrollmentKind::Participant => event.fee_amount,
            EnrollmentKind::Observer => 0,
        };

        let now = self.clock.now();
        let record = EnrollmentRecord {
            id: Uuid::new_v4(),
            event_id,
            user_id: user.id,
            display_name: user.display_name.clone(),
            kind: request.kind,
            status: EnrollmentStatus::Enrolled,
            check_ins: 0,
            leader_days: 0,
            flowers_received: 0,
            completion_rate: None,
            paid_amount,
            refund_amount: 0,
            refund_status: RefundStatus::None,
            created_at: now,
            updated_at: now,
        };

        let capacity =
            (request.kind == EnrollmentKind::Participant).then_some(event.max_participants);
        let admitted = self.store.admit_enrollment(&record, capacity).await?;

        info!(
            "Member joined: event={} user={} kind={}",
            event_id, user.id, request.kind
        );
        self.notifier.publish(DomainEvent::EnrollmentConfirmed {
            event_id,
            user_id: user.id,
            enrollment_kind: request.kind,
        });

        Ok(admitted)
    }

    /// Cancel the caller's enrollment.
    ///
    /// Allowed only while the event is still `enrolling`; frees a
    /// capacity slot and records a refund of whatever was paid.
    pub async fn cancel(&self, event_id: Uuid, user: &UserRef) -> ClubResult<EnrollmentRecord> {
        let enrollment = self
            .store
            .get_enrollment(event_id, user.id)
            .await?
            .ok_or(ClubError::NotFound("Enrollment"))?;

        let refund_amount = enrollment.paid_amount;
        let cancelled = self
            .store
            .cancel_enrollment(event_id, user.id, refund_amount)
            .await?;
        if !cancelled {
            return Err(ClubError::conflict(
                "enrollment can no longer be cancelled; the event left the enrolling state",
            ));
        }

        info!(
            "Enrollment cancelled: event={} user={} refund={}",
            event_id, user.id, refund_amount
        );
        self.notifier.publish(DomainEvent::EnrollmentCancelled {
            event_id,
            user_id: user.id,
            refund_amount,
        });

        self.store
            .get_enrollment(event_id, user.id)
            .await?
            .ok_or(ClubError::NotFound("Enrollment"))
    }

    // ==========================================
    // READS
    // ==========================================

    /// Roster for an event, optionally filtered.
    pub async fn roster(
        &self,
        event_id: Uuid,
        status: Option<EnrollmentStatus>,
        kind: Option<EnrollmentKind>,
    ) -> ClubResult<Vec<EnrollmentRecord>> {
        let enrollments = self.store.list_enrollments(event_id).await?;
        Ok(enrollments
            .into_iter()
            .filter(|e| status.map_or(true, |s| e.status == s))
            .filter(|e| kind.map_or(true, |k| e.kind == k))
            .collect())
    }

    /// One member's standing, with the completion rate as it stands
    /// now over the whole event's eligible days.
    pub async fn member_progress(
        &self,
        event_id: Uuid,
        user_id: Uuid,
    ) -> ClubResult<MemberProgressResponse> {
        let event = self.fetch_event(event_id).await?;
        let enrollment = self
            .store
            .get_enrollment(event_id, user_id)
            .await?
            .ok_or(ClubError::NotFound("Enrollment"))?;

        let eligible = eligible_days(event.start_date, event.end_date, event.weekend_rest);
        let rate = completion_rate(enrollment.check_ins, enrollment.leader_days, eligible);

        Ok(MemberProgressResponse {
            eligible_days: eligible,
            completion_rate: rate,
            meets_standard: meets_standard(rate, event.completion_standard),
            enrollment,
        })
    }

    // ==========================================
    // INTERNAL
    // ==========================================

    async fn fetch_event(&self, event_id: Uuid) -> ClubResult<EventRecord> {
        self.store
            .get_event(event_id)
            .await?
            .ok_or(ClubError::NotFound("Event"))
    }

    fn check_joinable(&self, event: &EventRecord) -> ClubResult<()> {
        if event.approval_status != ApprovalStatus::Approved {
            return Err(ClubError::conflict("event is not approved for enrollment"));
        }
        if event.activity_status != ActivityStatus::Enrolling {
            return Err(ClubError::conflict(
                "event is no longer accepting enrollments",
            ));
        }
        let today = self.clock.today();
        if today > event.enroll_deadline {
            return Err(ClubError::conflict(format!(
                "enrollment closed on {}",
                event.enroll_deadline
            )));
        }
        Ok(())
    }
}
