//! End-to-end lifecycle coverage: approval workflow, start gating,
//! completion settlement.

mod common;

use common::*;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use uuid::Uuid;

use bookclub_backend::db::models::{
    ActivityStatus, ApprovalStatus, CertificateKind, CertificateRecord, CheckInRecord,
    DailyStatRecord, EnrollmentRecord, EnrollmentStatus, EventRecord, FeeKind, FlowerQuotaRecord,
    FlowerRecord, LeaderAuditRecord, LeaderStrategy, RefundStatus, ScheduleSlotRecord,
};
use bookclub_backend::db::DatabaseError;
use bookclub_backend::models::CheckInRequest;
use bookclub_backend::{
    AppConfig, ClubError, ClubResult, ClubStore, DomainEvent, FixedClock, MemStore,
    RecordingNotifier, Services,
};

#[tokio::test]
async fn test_draft_to_approved_flow() {
    let h = Harness::at_date(2025, 1, 2);
    let organizer = reader("priya");

    let event = h
        .services
        .lifecycle
        .create_event(&organizer, season_request(d(2025, 1, 6), d(2025, 1, 10)))
        .await
        .unwrap();
    assert_eq!(event.approval_status, ApprovalStatus::Draft);
    assert_eq!(event.activity_status, ActivityStatus::Enrolling);
    assert!(event.submitted_at.is_none());

    let event = h
        .services
        .lifecycle
        .submit_for_approval(&organizer, event.id)
        .await
        .unwrap();
    assert_eq!(event.approval_status, ApprovalStatus::Pending);
    assert!(event.submitted_at.is_some());

    let event = h
        .services
        .lifecycle
        .approve(&admin("maya"), event.id)
        .await
        .unwrap();
    assert_eq!(event.approval_status, ApprovalStatus::Approved);
    assert!(event.approved_at.is_some());

    let recorded = h.notifier.recorded();
    assert!(recorded.contains(&DomainEvent::EventSubmitted { event_id: event.id }));
    assert!(recorded.contains(&DomainEvent::EventApproved { event_id: event.id }));
}

#[tokio::test]
async fn test_reject_then_amend_then_resubmit() {
    let h = Harness::at_date(2025, 1, 2);
    let organizer = reader("priya");
    let reviewer = admin("maya");

    let event = h
        .services
        .lifecycle
        .create_event(&organizer, season_request(d(2025, 1, 6), d(2025, 1, 10)))
        .await
        .unwrap();
    h.services
        .lifecycle
        .submit_for_approval(&organizer, event.id)
        .await
        .unwrap();

    let event = h
        .services
        .lifecycle
        .reject(&reviewer, event.id, "needs a clearer reading plan")
        .await
        .unwrap();
    assert_eq!(event.approval_status, ApprovalStatus::Rejected);
    assert_eq!(
        event.reject_reason.as_deref(),
        Some("needs a clearer reading plan")
    );

    let mut patched = season_request(d(2025, 1, 6), d(2025, 1, 10));
    patched.title = "Revised Season".to_string();
    let event = h
        .services
        .lifecycle
        .amend_event(&organizer, event.id, patched)
        .await
        .unwrap();
    assert_eq!(event.title, "Revised Season");

    let event = h
        .services
        .lifecycle
        .submit_for_approval(&organizer, event.id)
        .await
        .unwrap();
    assert_eq!(event.approval_status, ApprovalStatus::Pending);
    assert!(event.reject_reason.is_none());
}

#[tokio::test]
async fn test_reject_requires_reason() {
    let h = Harness::at_date(2025, 1, 2);
    let organizer = reader("priya");
    let event = h
        .services
        .lifecycle
        .create_event(&organizer, season_request(d(2025, 1, 6), d(2025, 1, 10)))
        .await
        .unwrap();
    h.services
        .lifecycle
        .submit_for_approval(&organizer, event.id)
        .await
        .unwrap();

    let err = h
        .services
        .lifecycle
        .reject(&admin("maya"), event.id, "   ")
        .await
        .unwrap_err();
    assert!(matches!(err, ClubError::Validation { field: "reason", .. }));
}

#[tokio::test]
async fn test_approval_needs_admin_and_pending_state() {
    let h = Harness::at_date(2025, 1, 2);
    let organizer = reader("priya");
    let event = h
        .services
        .lifecycle
        .create_event(&organizer, season_request(d(2025, 1, 6), d(2025, 1, 10)))
        .await
        .unwrap();

    // Non-admin may not approve, even the organizer.
    let err = h
        .services
        .lifecycle
        .approve(&organizer, event.id)
        .await
        .unwrap_err();
    assert!(matches!(err, ClubError::PermissionDenied(_)));

    // Admin may not approve a draft that was never submitted.
    let err = h
        .services
        .lifecycle
        .approve(&admin("maya"), event.id)
        .await
        .unwrap_err();
    assert!(matches!(err, ClubError::StateConflict(_)));

    // Double-approve trips the compare-and-set.
    h.services
        .lifecycle
        .submit_for_approval(&organizer, event.id)
        .await
        .unwrap();
    h.services
        .lifecycle
        .approve(&admin("maya"), event.id)
        .await
        .unwrap();
    let err = h
        .services
        .lifecycle
        .approve(&admin("maya"), event.id)
        .await
        .unwrap_err();
    assert!(matches!(err, ClubError::StateConflict(_)));
}

#[tokio::test]
async fn test_amend_locked_once_approved() {
    let h = Harness::at_date(2025, 1, 2);
    let organizer = reader("priya");
    let event = h
        .approved_event(&organizer, season_request(d(2025, 1, 6), d(2025, 1, 10)))
        .await;

    let err = h
        .services
        .lifecycle
        .amend_event(
            &organizer,
            event.id,
            season_request(d(2025, 1, 6), d(2025, 1, 10)),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, ClubError::StateConflict(_)));
}

#[tokio::test]
async fn test_create_rejects_inverted_dates() {
    let h = Harness::at_date(2025, 1, 2);
    let mut request = season_request(d(2025, 1, 6), d(2025, 1, 10));
    request.end_date = d(2025, 1, 5);

    let err = h
        .services
        .lifecycle
        .create_event(&reader("priya"), request)
        .await
        .unwrap_err();
    assert!(matches!(err, ClubError::Validation { field: "endDate", .. }));
}

#[tokio::test]
async fn test_start_requires_quorum() {
    let h = Harness::at_date(2025, 1, 2);
    let organizer = reader("priya");
    let mut request = season_request(d(2025, 1, 6), d(2025, 1, 10));
    request.min_participants = 3;
    let event = h.approved_event(&organizer, request).await;

    for name in ["aiko", "ben"] {
        h.services
            .enrollment
            .join(event.id, &reader(name), join_as_participant())
            .await
            .unwrap();
    }

    h.clock.set_date(d(2025, 1, 6));
    let err = h
        .services
        .lifecycle
        .start(&organizer, event.id)
        .await
        .unwrap_err();
    match err {
        ClubError::StateConflict(reason) => {
            assert!(reason.contains("2 of 3"), "unexpected reason: {reason}")
        }
        other => panic!("expected StateConflict, got {other}"),
    }
}

#[tokio::test]
async fn test_start_waits_for_start_date() {
    let h = Harness::at_date(2025, 1, 2);
    let organizer = reader("priya");
    let event = h
        .approved_event(&organizer, season_request(d(2025, 1, 6), d(2025, 1, 10)))
        .await;
    h.services
        .enrollment
        .join(event.id, &reader("aiko"), join_as_participant())
        .await
        .unwrap();

    // Still Jan 2; the season begins Jan 6.
    let err = h
        .services
        .lifecycle
        .start(&organizer, event.id)
        .await
        .unwrap_err();
    assert!(matches!(err, ClubError::StateConflict(_)));
}

#[tokio::test]
async fn test_start_generates_slots_and_rotation_leaders() {
    let h = Harness::at_date(2025, 1, 2);
    let organizer = reader("priya");
    let mut request = season_request(d(2025, 1, 6), d(2025, 1, 10));
    request.leader_strategy = LeaderStrategy::Rotation;
    let event = h.approved_event(&organizer, request).await;

    for name in ["aiko", "ben", "carmen"] {
        h.services
            .enrollment
            .join(event.id, &reader(name), join_as_participant())
            .await
            .unwrap();
    }

    h.clock.set_date(d(2025, 1, 6));
    let event = h.services.lifecycle.start(&organizer, event.id).await.unwrap();
    assert_eq!(event.activity_status, ActivityStatus::InProgress);
    assert!(event.started_at.is_some());

    let detail = h.services.lifecycle.event_detail(event.id).await.unwrap();
    assert_eq!(detail.slots.len(), 5);
    assert!(detail.slots.iter().all(|slot| slot.leader_id.is_some()));
    for pair in detail.slots.windows(2) {
        assert_ne!(pair[0].leader_id, pair[1].leader_id);
    }

    assert!(h
        .notifier
        .recorded()
        .contains(&DomainEvent::EventStarted {
            event_id: event.id,
            slot_count: 5,
        }));
}

#[tokio::test]
async fn test_complete_settles_participants_and_issues_certificates() {
    let h = Harness::at_date(2025, 1, 2);
    let organizer = reader("priya");
    let mut request = season_request(d(2025, 1, 6), d(2025, 1, 10));
    request.fee_kind = FeeKind::Deposit;
    request.fee_amount = 5000;
    request.leader_strategy = LeaderStrategy::Disabled;
    let event = h.approved_event(&organizer, request).await;

    let aiko = reader("aiko");
    let ben = reader("ben");
    let carmen = reader("carmen");
    for user in [&aiko, &ben, &carmen] {
        let enrollment = h
            .services
            .enrollment
            .join(event.id, user, join_as_participant())
            .await
            .unwrap();
        assert_eq!(enrollment.paid_amount, 5000);
    }

    h.clock.set_date(d(2025, 1, 6));
    h.services.lifecycle.start(&organizer, event.id).await.unwrap();
    let detail = h.services.lifecycle.event_detail(event.id).await.unwrap();

    // aiko attends all five days, ben four (80%), carmen three (60%).
    for (index, slot) in detail.slots.iter().enumerate() {
        h.clock.set_date(slot.slot_date);
        let mut attendees = vec![&aiko];
        if index < 4 {
            attendees.push(&ben);
        }
        if index < 3 {
            attendees.push(&carmen);
        }
        for user in attendees {
            h.services
                .participation
                .check_in(
                    user,
                    CheckInRequest {
                        slot_id: slot.id,
                        note: None,
                    },
                )
                .await
                .unwrap();
        }
    }

    h.clock.set_date(d(2025, 1, 11));
    let event = h
        .services
        .lifecycle
        .complete(&organizer, event.id)
        .await
        .unwrap();
    assert_eq!(event.activity_status, ActivityStatus::Completed);
    assert!(event.completed_at.is_some());

    let roster = h.services.enrollment.roster(event.id, None, None).await.unwrap();
    let by_name = |name: &str| {
        roster
            .iter()
            .find(|e| e.display_name == name)
            .expect("enrollment present")
    };

    let settled_aiko = by_name("aiko");
    assert_eq!(settled_aiko.status, EnrollmentStatus::Completed);
    assert_eq!(settled_aiko.completion_rate, Some(100.0));
    assert_eq!(settled_aiko.refund_amount, 5000);
    assert_eq!(settled_aiko.refund_status, RefundStatus::Pending);

    let settled_ben = by_name("ben");
    assert_eq!(settled_ben.status, EnrollmentStatus::Completed);
    assert_eq!(settled_ben.completion_rate, Some(80.0));
    assert_eq!(settled_ben.refund_amount, 5000);

    // 60% misses the standard: no refund, still enrolled.
    let settled_carmen = by_name("carmen");
    assert_eq!(settled_carmen.status, EnrollmentStatus::Enrolled);
    assert_eq!(settled_carmen.completion_rate, Some(60.0));
    assert_eq!(settled_carmen.refund_amount, 0);
    assert_eq!(settled_carmen.refund_status, RefundStatus::None);

    // No flowers were given, so only completion certificates exist.
    let certificates = h.services.flowers.certificates(event.id).await.unwrap();
    assert_eq!(certificates.len(), 2);
    assert!(certificates
        .iter()
        .all(|c| c.kind == CertificateKind::Completion));
    assert!(certificates.iter().all(|c| c.serial.starts_with("RCC-")));
}

#[tokio::test]
async fn test_complete_waits_for_end_date() {
    let h = Harness::at_date(2025, 1, 2);
    let organizer = reader("priya");
    let mut request = season_request(d(2025, 1, 6), d(2025, 1, 10));
    request.leader_strategy = LeaderStrategy::Disabled;
    let event = h.approved_event(&organizer, request).await;
    h.services
        .enrollment
        .join(event.id, &reader("aiko"), join_as_participant())
        .await
        .unwrap();

    h.clock.set_date(d(2025, 1, 6));
    h.services.lifecycle.start(&organizer, event.id).await.unwrap();

    // The last reading day itself is too early.
    h.clock.set_date(d(2025, 1, 10));
    let err = h
        .services
        .lifecycle
        .complete(&organizer, event.id)
        .await
        .unwrap_err();
    assert!(matches!(err, ClubError::StateConflict(_)));
}

/// `MemStore` behind a fault switch: a set number of
/// `settle_enrollment` calls fail as if the connection dropped, and
/// everything else passes straight through.
struct FaultyStore {
    inner: MemStore,
    settle_faults: AtomicUsize,
}

impl FaultyStore {
    fn failing_settles(count: usize) -> Self {
        Self {
            inner: MemStore::new(),
            settle_faults: AtomicUsize::new(count),
        }
    }
}

#[async_trait]
impl ClubStore for FaultyStore {
    async fn insert_event(&self, event: &EventRecord) -> ClubResult<()> {
        self.inner.insert_event(event).await
    }

    async fn get_event(&self, event_id: Uuid) -> ClubResult<Option<EventRecord>> {
        self.inner.get_event(event_id).await
    }

    async fn list_events_by_activity(
        &self,
        status: ActivityStatus,
    ) -> ClubResult<Vec<EventRecord>> {
        self.inner.list_events_by_activity(status).await
    }

    async fn update_event_details(&self, event: &EventRecord) -> ClubResult<bool> {
        self.inner.update_event_details(event).await
    }

    async fn transition_approval(
        &self,
        event_id: Uuid,
        expected: &[ApprovalStatus],
        next: ApprovalStatus,
        reject_reason: Option<&str>,
        at: DateTime<Utc>,
    ) -> ClubResult<bool> {
        self.inner
            .transition_approval(event_id, expected, next, reject_reason, at)
            .await
    }

    async fn transition_activity(
        &self,
        event_id: Uuid,
        expected: ActivityStatus,
        next: ActivityStatus,
        at: DateTime<Utc>,
    ) -> ClubResult<bool> {
        self.inner.transition_activity(event_id, expected, next, at).await
    }

    async fn set_overall_leader(
        &self,
        event_id: Uuid,
        leader_id: Option<Uuid>,
    ) -> ClubResult<bool> {
        self.inner.set_overall_leader(event_id, leader_id).await
    }

    async fn insert_slots(&self, slots: &[ScheduleSlotRecord]) -> ClubResult<u64> {
        self.inner.insert_slots(slots).await
    }

    async fn get_slot(&self, slot_id: Uuid) -> ClubResult<Option<ScheduleSlotRecord>> {
        self.inner.get_slot(slot_id).await
    }

    async fn list_slots(&self, event_id: Uuid) -> ClubResult<Vec<ScheduleSlotRecord>> {
        self.inner.list_slots(event_id).await
    }

    async fn claim_slot(
        &self,
        slot_id: Uuid,
        user_id: Uuid,
        cap: Option<i32>,
    ) -> ClubResult<ScheduleSlotRecord> {
        self.inner.claim_slot(slot_id, user_id, cap).await
    }

    async fn assign_open_slot(&self, slot_id: Uuid, leader_id: Uuid) -> ClubResult<bool> {
        self.inner.assign_open_slot(slot_id, leader_id).await
    }

    async fn reassign_slot_leader(
        &self,
        slot_id: Uuid,
        new_leader_id: Uuid,
        actor_id: Uuid,
        at: DateTime<Utc>,
    ) -> ClubResult<Option<Uuid>> {
        self.inner
            .reassign_slot_leader(slot_id, new_leader_id, actor_id, at)
            .await
    }

    async fn publish_slot_content(
        &self,
        slot_id: Uuid,
        title: &str,
        body: &str,
        at: DateTime<Utc>,
    ) -> ClubResult<()> {
        self.inner.publish_slot_content(slot_id, title, body, at).await
    }

    async fn list_leader_audits(&self, event_id: Uuid) -> ClubResult<Vec<LeaderAuditRecord>> {
        self.inner.list_leader_audits(event_id).await
    }

    async fn admit_enrollment(
        &self,
        enrollment: &EnrollmentRecord,
        capacity: Option<i32>,
    ) -> ClubResult<EnrollmentRecord> {
        self.inner.admit_enrollment(enrollment, capacity).await
    }

    async fn get_enrollment(
        &self,
        event_id: Uuid,
        user_id: Uuid,
    ) -> ClubResult<Option<EnrollmentRecord>> {
        self.inner.get_enrollment(event_id, user_id).await
    }

    async fn list_enrollments(&self, event_id: Uuid) -> ClubResult<Vec<EnrollmentRecord>> {
        self.inner.list_enrollments(event_id).await
    }

    async fn count_active_participants(&self, event_id: Uuid) -> ClubResult<i64> {
        self.inner.count_active_participants(event_id).await
    }

    async fn cancel_enrollment(
        &self,
        event_id: Uuid,
        user_id: Uuid,
        refund_amount: i64,
    ) -> ClubResult<bool> {
        self.inner.cancel_enrollment(event_id, user_id, refund_amount).await
    }

    async fn settle_enrollment(
        &self,
        enrollment_id: Uuid,
        completion_rate: f64,
        met_standard: bool,
        refund_amount: i64,
    ) -> ClubResult<()> {
        if self
            .settle_faults
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
        {
            return Err(ClubError::Database(DatabaseError::ConnectionError(
                "connection reset by peer".to_string(),
            )));
        }
        self.inner
            .settle_enrollment(enrollment_id, completion_rate, met_standard, refund_amount)
            .await
    }

    async fn record_check_in(&self, check_in: &CheckInRecord) -> ClubResult<()> {
        self.inner.record_check_in(check_in).await
    }

    async fn get_check_in(&self, check_in_id: Uuid) -> ClubResult<Option<CheckInRecord>> {
        self.inner.get_check_in(check_in_id).await
    }

    async fn list_check_ins_for_slot(&self, slot_id: Uuid) -> ClubResult<Vec<CheckInRecord>> {
        self.inner.list_check_ins_for_slot(slot_id).await
    }

    async fn count_check_ins_on(&self, event_id: Uuid, date: NaiveDate) -> ClubResult<i64> {
        self.inner.count_check_ins_on(event_id, date).await
    }

    async fn record_flower(
        &self,
        flower: &FlowerRecord,
        default_quota: i32,
    ) -> ClubResult<FlowerQuotaRecord> {
        self.inner.record_flower(flower, default_quota).await
    }

    async fn get_flower_quota(
        &self,
        user_id: Uuid,
        event_id: Uuid,
        date: NaiveDate,
    ) -> ClubResult<Option<FlowerQuotaRecord>> {
        self.inner.get_flower_quota(user_id, event_id, date).await
    }

    async fn list_flowers_on(
        &self,
        event_id: Uuid,
        date: NaiveDate,
    ) -> ClubResult<Vec<FlowerRecord>> {
        self.inner.list_flowers_on(event_id, date).await
    }

    async fn list_flowers_for_event(&self, event_id: Uuid) -> ClubResult<Vec<FlowerRecord>> {
        self.inner.list_flowers_for_event(event_id).await
    }

    async fn upsert_daily_stat(&self, stat: &DailyStatRecord) -> ClubResult<DailyStatRecord> {
        self.inner.upsert_daily_stat(stat).await
    }

    async fn get_daily_stat(
        &self,
        event_id: Uuid,
        date: NaiveDate,
    ) -> ClubResult<Option<DailyStatRecord>> {
        self.inner.get_daily_stat(event_id, date).await
    }

    async fn next_certificate_serial(&self) -> ClubResult<i64> {
        self.inner.next_certificate_serial().await
    }

    async fn insert_certificate(
        &self,
        certificate: &CertificateRecord,
    ) -> ClubResult<Option<CertificateRecord>> {
        self.inner.insert_certificate(certificate).await
    }

    async fn list_certificates(&self, event_id: Uuid) -> ClubResult<Vec<CertificateRecord>> {
        self.inner.list_certificates(event_id).await
    }
}

#[tokio::test]
async fn test_complete_retries_after_settlement_failure() {
    let clock = Arc::new(FixedClock::at_date(2025, 1, 2));
    let notifier = Arc::new(RecordingNotifier::new());
    let services = Services::new(
        Arc::new(FaultyStore::failing_settles(1)),
        clock.clone(),
        notifier.clone(),
        AppConfig::default(),
    );

    let organizer = reader("priya");
    let mut request = season_request(d(2025, 1, 6), d(2025, 1, 10));
    request.fee_kind = FeeKind::Deposit;
    request.fee_amount = 5000;
    request.leader_strategy = LeaderStrategy::Disabled;
    let event = services
        .lifecycle
        .create_event(&organizer, request)
        .await
        .unwrap();
    services
        .lifecycle
        .submit_for_approval(&organizer, event.id)
        .await
        .unwrap();
    services
        .lifecycle
        .approve(&admin("maya"), event.id)
        .await
        .unwrap();

    let aiko = reader("aiko");
    let ben = reader("ben");
    for user in [&aiko, &ben] {
        services
            .enrollment
            .join(event.id, user, join_as_participant())
            .await
            .unwrap();
    }

    clock.set_date(d(2025, 1, 6));
    services.lifecycle.start(&organizer, event.id).await.unwrap();
    let detail = services.lifecycle.event_detail(event.id).await.unwrap();

    // aiko reads four of five days, enough to earn her deposit back.
    for slot in &detail.slots[..4] {
        clock.set_date(slot.slot_date);
        services
            .participation
            .check_in(
                &aiko,
                CheckInRequest {
                    slot_id: slot.id,
                    note: None,
                },
            )
            .await
            .unwrap();
    }

    // The first attempt dies mid-settlement.
    clock.set_date(d(2025, 1, 11));
    let err = services
        .lifecycle
        .complete(&organizer, event.id)
        .await
        .unwrap_err();
    assert!(matches!(err, ClubError::Database(_)));

    // The event never left in_progress and no row was half-settled,
    // so nothing is stranded.
    let detail = services.lifecycle.event_detail(event.id).await.unwrap();
    assert_eq!(detail.event.activity_status, ActivityStatus::InProgress);
    let roster = services.enrollment.roster(event.id, None, None).await.unwrap();
    assert!(roster.iter().all(|e| e.completion_rate.is_none()));
    assert!(!notifier
        .recorded()
        .contains(&DomainEvent::EventCompleted { event_id: event.id }));

    // A plain retry finishes the job.
    let event = services
        .lifecycle
        .complete(&organizer, event.id)
        .await
        .unwrap();
    assert_eq!(event.activity_status, ActivityStatus::Completed);
    assert!(notifier
        .recorded()
        .contains(&DomainEvent::EventCompleted { event_id: event.id }));

    let roster = services.enrollment.roster(event.id, None, None).await.unwrap();
    let settled_aiko = roster.iter().find(|e| e.user_id == aiko.id).unwrap();
    assert_eq!(settled_aiko.status, EnrollmentStatus::Completed);
    assert_eq!(settled_aiko.completion_rate, Some(80.0));
    assert_eq!(settled_aiko.refund_amount, 5000);
    assert_eq!(settled_aiko.refund_status, RefundStatus::Pending);

    let settled_ben = roster.iter().find(|e| e.user_id == ben.id).unwrap();
    assert_eq!(settled_ben.status, EnrollmentStatus::Enrolled);
    assert_eq!(settled_ben.completion_rate, Some(0.0));
    assert_eq!(settled_ben.refund_amount, 0);
}
