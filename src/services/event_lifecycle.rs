//! # Event Lifecycle Service
//!
//! Walks an event through its two state machines and fans the heavy
//! transitions out to the schedule, leader and flower services.
//!
//! ```text
//! approval:  draft ──> pending ──> approved
//!              ^          │
//!              │          └──> rejected ──> pending (resubmit)
//!              └── amend ──┘
//!
//! activity:  enrolling ──> in_progress ──> completed
//!                start                complete
//! ```
//!
//! The axes are linked at two points only: `start` requires an
//! approved event, and enrollment requires approval. Every transition
//! goes through a store-level compare-and-set, so two racing calls
//! resolve to one winner and one state conflict.
//!
//! ## Start / Complete choreography
//!
//! | Step | `start` | `complete` |
//! |------|---------|------------|
//! | 1 | validate date + quorum | validate date |
//! | 2 | generate missing slots | CAS to `completed` |
//! | 3 | CAS to `in_progress` | settle every enrolled participant |
//! | 4 | auto-assign leaders | issue certificates |
//!
//! Slots are generated before the start CAS on purpose: a crash
//! between the two leaves an enrolling event with idle slots, which
//! a retry reuses, rather than a running event without a schedule.

use std::sync::Arc;

use tracing::{debug, info};
use uuid::Uuid;

use crate::clock::Clock;
use crate::config::AppConfig;
use crate::db::models::{
    ActivityStatus, ApprovalStatus, EventRecord, FeeKind, LeaderStrategy,
};
use crate::error::{ClubError, ClubResult};
use crate::models::{CreateEventRequest, EventDetailResponse, UserRef};
use crate::notify::{DomainEvent, Notifier};
use crate::services::completion::{completion_rate, meets_standard};
use crate::services::flower::FlowerService;
use crate::services::leader::LeaderService;
use crate::services::schedule::ScheduleGenerator;
use crate::store::ClubStore;
use crate::utils::eligible_days;

/// Orchestrates event creation, approval and the start/complete
/// transitions.
#[derive(Clone)]
pub struct EventLifecycleService {
    store: Arc<dyn ClubStore>,
    clock: Arc<dyn Clock>,
    notifier: Arc<dyn Notifier>,
    schedule: ScheduleGenerator,
    leaders: LeaderService,
    flowers: FlowerService,
}

impl EventLifecycleService {
    pub fn new(
        store: Arc<dyn ClubStore>,
        clock: Arc<dyn Clock>,
        notifier: Arc<dyn Notifier>,
        config: AppConfig,
    ) -> Self {
        let schedule = ScheduleGenerator::new(Arc::clone(&store), Arc::clone(&clock));
        let leaders = LeaderService::new(
            Arc::clone(&store),
            Arc::clone(&clock),
            Arc::clone(&notifier),
            config.clone(),
        );
        let flowers = FlowerService::new(
            Arc::clone(&store),
            Arc::clone(&clock),
            Arc::clone(&notifier),
            config,
        );
        Self {
            store,
            clock,
            notifier,
            schedule,
            leaders,
            flowers,
        }
    }

    /// Create a draft event owned by `organizer`.
    pub async fn create_event(
        &self,
        organizer: &UserRef,
        request: CreateEventRequest,
    ) -> ClubResult<EventRecord> {
        validate_event_request(&request)?;

        let now = self.clock.now();
        let event = EventRecord {
            id: Uuid::new_v4(),
            title: request.title,
            book_title: request.book_title,
            book_author: request.book_author,
            organizer_id: organizer.id,
            overall_leader_id: None,
            start_date: request.start_date,
            end_date: request.end_date,
            enroll_deadline: request.enroll_deadline,
            min_participants: request.min_participants,
            max_participants: request.max_participants,
            fee_kind: request.fee_kind,
            fee_amount: request.fee_amount,
            leader_reward_percent: request.leader_reward_percent,
            completion_standard: request.completion_standard,
            activity_mode: request.activity_mode,
            leader_strategy: request.leader_strategy,
            weekend_rest: request.weekend_rest,
            approval_status: ApprovalStatus::Draft,
            activity_status: ActivityStatus::Enrolling,
            reject_reason: None,
            submitted_at: None,
            approved_at: None,
            started_at: None,
            completed_at: None,
            created_at: now,
            updated_at: now,
        };
        self.store.insert_event(&event).await?;

        info!(
            "Event created: id={} title={:?} organizer={}",
            event.id, event.title, organizer.id
        );
        Ok(event)
    }

    /// Overwrite a draft or rejected event's details.
    pub async fn amend_event(
        &self,
        actor: &UserRef,
        event_id: Uuid,
        request: CreateEventRequest,
    ) -> ClubResult<EventRecord> {
        validate_event_request(&request)?;

        let event = self.fetch(event_id).await?;
        self.require_organizer(&event, actor, "amend")?;
        if !matches!(
            event.approval_status,
            ApprovalStatus::Draft | ApprovalStatus::Rejected
        ) {
            return Err(ClubError::conflict(format!(
                "cannot amend an event in the {} state",
                event.approval_status
            )));
        }

        let amended = EventRecord {
            title: request.title,
            book_title: request.book_title,
            book_author: request.book_author,
            start_date: request.start_date,
            end_date: request.end_date,
            enroll_deadline: request.enroll_deadline,
            min_participants: request.min_participants,
            max_participants: request.max_participants,
            fee_kind: request.fee_kind,
            fee_amount: request.fee_amount,
            leader_reward_percent: request.leader_reward_percent,
            completion_standard: request.completion_standard,
            activity_mode: request.activity_mode,
            leader_strategy: request.leader_strategy,
            weekend_rest: request.weekend_rest,
            updated_at: self.clock.now(),
            ..event
        };
        if !self.store.update_event_details(&amended).await? {
            return Err(ClubError::conflict(
                "event can no longer be amended; it left the draft state",
            ));
        }

        debug!("Event amended: id={}", event_id);
        self.fetch(event_id).await
    }

    /// Submit a draft (or rejected) event for admin review.
    pub async fn submit_for_approval(
        &self,
        actor: &UserRef,
        event_id: Uuid,
    ) -> ClubResult<EventRecord> {
        let event = self.fetch(event_id).await?;
        self.require_organizer(&event, actor, "submit")?;

        let moved = self
            .store
            .transition_approval(
                event_id,
                &[ApprovalStatus::Draft, ApprovalStatus::Rejected],
                ApprovalStatus::Pending,
                None,
                self.clock.now(),
            )
            .await?;
        if !moved {
            return Err(ClubError::conflict(format!(
                "cannot submit from {} state",
                event.approval_status
            )));
        }

        info!("Event submitted for approval: id={}", event_id);
        self.notifier
            .publish(DomainEvent::EventSubmitted { event_id });
        self.fetch(event_id).await
    }

    /// Approve a pending event. Admin only.
    pub async fn approve(&self, actor: &UserRef, event_id: Uuid) -> ClubResult<EventRecord> {
        if !actor.is_admin {
            return Err(ClubError::PermissionDenied(
                "only an admin may approve events".to_string(),
            ));
        }

        let event = self.fetch(event_id).await?;
        let moved = self
            .store
            .transition_approval(
                event_id,
                &[ApprovalStatus::Pending],
                ApprovalStatus::Approved,
                None,
                self.clock.now(),
            )
            .await?;
        if !moved {
            return Err(ClubError::conflict(format!(
                "cannot approve from {} state",
                event.approval_status
            )));
        }

        info!("Event approved: id={} admin={}", event_id, actor.id);
        self.notifier
            .publish(DomainEvent::EventApproved { event_id });
        self.fetch(event_id).await
    }

    /// Reject a pending event with a reason. Admin only.
    pub async fn reject(
        &self,
        actor: &UserRef,
        event_id: Uuid,
        reason: &str,
    ) -> ClubResult<EventRecord> {
        if !actor.is_admin {
            return Err(ClubError::PermissionDenied(
                "only an admin may reject events".to_string(),
            ));
        }
        if reason.trim().is_empty() {
            return Err(ClubError::validation("reason", "a rejection reason is required"));
        }

        let event = self.fetch(event_id).await?;
        let moved = self
            .store
            .transition_approval(
                event_id,
                &[ApprovalStatus::Pending],
                ApprovalStatus::Rejected,
                Some(reason),
                self.clock.now(),
            )
            .await?;
        if !moved {
            return Err(ClubError::conflict(format!(
                "cannot reject from {} state",
                event.approval_status
            )));
        }

        info!("Event rejected: id={} admin={}", event_id, actor.id);
        self.notifier.publish(DomainEvent::EventRejected {
            event_id,
            reason: reason.to_string(),
        });
        self.fetch(event_id).await
    }

    /// Start an approved event on or after its start date.
    ///
    /// Generates the schedule, flips the event to `in_progress` and
    /// runs the leader auto-assignment for scripted strategies.
    pub async fn start(&self, actor: &UserRef, event_id: Uuid) -> ClubResult<EventRecord> {
        let event = self.fetch(event_id).await?;
        self.require_organizer(&event, actor, "start")?;

        if event.approval_status != ApprovalStatus::Approved {
            return Err(ClubError::conflict("event is not approved"));
        }
        if event.activity_status != ActivityStatus::Enrolling {
            return Err(ClubError::conflict(format!(
                "cannot start from {} state",
                event.activity_status
            )));
        }
        let today = self.clock.today();
        if today < event.start_date {
            return Err(ClubError::conflict(format!(
                "event does not start until {}",
                event.start_date
            )));
        }
        let enrolled = self.store.count_active_participants(event_id).await?;
        if enrolled < event.min_participants as i64 {
            return Err(ClubError::conflict(format!(
                "{} of {} required participants enrolled",
                enrolled, event.min_participants
            )));
        }

        // Slots first; a retry after a crash between the two steps
        // finds them already in place.
        let slots = self.schedule.ensure_slots(&event).await?;
        let moved = self
            .store
            .transition_activity(
                event_id,
                ActivityStatus::Enrolling,
                ActivityStatus::InProgress,
                self.clock.now(),
            )
            .await?;
        if !moved {
            return Err(ClubError::conflict("event is no longer enrolling"));
        }

        if !matches!(
            event.leader_strategy,
            LeaderStrategy::Voluntary | LeaderStrategy::Disabled
        ) {
            self.leaders.auto_assign(event_id, None).await?;
        }

        info!(
            "Event started: id={} participants={} slots={}",
            event_id,
            enrolled,
            slots.len()
        );
        self.notifier.publish(DomainEvent::EventStarted {
            event_id,
            slot_count: slots.len(),
        });
        self.fetch(event_id).await
    }

    /// Complete a running event once its last day has passed.
    ///
    /// Settles every enrolled participant (completion rate, final
    /// status, deposit refund) and issues certificates.
    pub async fn complete(&self, actor: &UserRef, event_id: Uuid) -> ClubResult<EventRecord> {
        let event = self.fetch(event_id).await?;
        self.require_organizer(&event, actor, "complete")?;

        if event.activity_status != ActivityStatus::InProgress {
            return Err(ClubError::conflict(format!(
                "cannot complete from {} state",
                event.activity_status
            )));
        }
        let today = self.clock.today();
        if today <= event.end_date {
            return Err(ClubError::conflict(format!(
                "event runs through {}",
                event.end_date
            )));
        }

        // Settlement first; if it dies partway the event is still
        // in progress and a retry picks up the unsettled rows. The
        // per-row writes set final values, so a racing completer
        // repeats them harmlessly.
        let settled = self.settle_participants(&event).await?;

        let moved = self
            .store
            .transition_activity(
                event_id,
                ActivityStatus::InProgress,
                ActivityStatus::Completed,
                self.clock.now(),
            )
            .await?;
        if !moved {
            return Err(ClubError::conflict("event is not in progress"));
        }

        let certificates = self.flowers.finalize_certificates(event_id).await?;

        info!(
            "Event completed: id={} settled={} certificates={}",
            event_id,
            settled,
            certificates.len()
        );
        self.notifier
            .publish(DomainEvent::EventCompleted { event_id });
        self.fetch(event_id).await
    }

    /// An event with its schedule and headline numbers.
    pub async fn event_detail(&self, event_id: Uuid) -> ClubResult<EventDetailResponse> {
        let event = self.fetch(event_id).await?;
        let slots = self.store.list_slots(event_id).await?;
        let enrolled_participants = self.store.count_active_participants(event_id).await?;
        Ok(EventDetailResponse {
            event,
            slots,
            enrolled_participants,
        })
    }

    /// Final settlement for every still-enrolled participant.
    ///
    /// Observers and cancelled members are left alone. Deposits come
    /// back in full when the standard was met; other fee models never
    /// refund here.
    async fn settle_participants(&self, event: &EventRecord) -> ClubResult<usize> {
        use crate::db::models::{EnrollmentKind, EnrollmentStatus};

        let eligible = eligible_days(event.start_date, event.end_date, event.weekend_rest);
        let enrollments = self.store.list_enrollments(event.id).await?;

        let mut settled = 0usize;
        for enrollment in enrollments.iter().filter(|e| {
            e.kind == EnrollmentKind::Participant && e.status == EnrollmentStatus::Enrolled
        }) {
            let rate = completion_rate(enrollment.check_ins, enrollment.leader_days, eligible);
            let met = meets_standard(rate, event.completion_standard);
            let refund = if met && event.fee_kind == FeeKind::Deposit {
                enrollment.paid_amount
            } else {
                0
            };

            self.store
                .settle_enrollment(enrollment.id, rate, met, refund)
                .await?;
            debug!(
                "Participant settled: event={} user={} rate={} met={} refund={}",
                event.id, enrollment.user_id, rate, met, refund
            );
            settled += 1;
        }
        Ok(settled)
    }

    async fn fetch(&self, event_id: Uuid) -> ClubResult<EventRecord> {
        self.store
            .get_event(event_id)
            .await?
            .ok_or(ClubError::NotFound("Event"))
    }

    fn require_organizer(
        &self,
        event: &EventRecord,
        actor: &UserRef,
        verb: &str,
    ) -> ClubResult<()> {
        if actor.is_admin || event.organizer_id == actor.id {
            return Ok(());
        }
        Err(ClubError::PermissionDenied(format!(
            "only the organizer or an admin may {} this event",
            verb
        )))
    }
}

/// Field-level validation of an incoming event definition.
///
/// Field names in errors follow the wire names (camelCase).
fn validate_event_request(request: &CreateEventRequest) -> ClubResult<()> {
    if request.title.trim().is_empty() {
        return Err(ClubError::validation("title", "title cannot be empty"));
    }
    if request.book_title.trim().is_empty() {
        return Err(ClubError::validation("bookTitle", "book title cannot be empty"));
    }
    if request.end_date < request.start_date {
        return Err(ClubError::validation("endDate", "must not precede startDate"));
    }
    if request.enroll_deadline >= request.start_date {
        return Err(ClubError::validation(
            "enrollDeadline",
            "must fall before startDate",
        ));
    }
    if request.min_participants < 1 {
        return Err(ClubError::validation("minParticipants", "must be at least 1"));
    }
    if request.max_participants < request.min_participants {
        return Err(ClubError::validation(
            "maxParticipants",
            "must not be below minParticipants",
        ));
    }
    if !(60..=100).contains(&request.completion_standard) {
        return Err(ClubError::validation(
            "completionStandard",
            "must be between 60 and 100",
        ));
    }
    if !(0..=100).contains(&request.leader_reward_percent) {
        return Err(ClubError::validation(
            "leaderRewardPercent",
            "must be between 0 and 100",
        ));
    }
    match request.fee_kind {
        FeeKind::Free => {
            if request.fee_amount != 0 {
                return Err(ClubError::validation("feeAmount", "must be 0 for free events"));
            }
        }
        FeeKind::Deposit | FeeKind::Paid => {
            if request.fee_amount <= 0 {
                return Err(ClubError::validation(
                    "feeAmount",
                    "must be positive for paid or deposit events",
                ));
            }
        }
    }
    Ok(())
}
