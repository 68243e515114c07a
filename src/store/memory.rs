//! # In-Memory Store
//!
//! [`ClubStore`] over plain collections. One mutex guards all tables,
//! so every primitive runs start-to-finish without interleaving. That
//! matches the transactional behavior of the PostgreSQL store closely
//! enough for the demo binary and the integration tests to exercise
//! real race outcomes (capacity, quota, duplicate claims) without a
//! database.
//!
//! Each primitive mirrors its SQL counterpart: same guards, same
//! error order, same ordering of returned lists.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::db::models::*;
use crate::error::{ClubError, ClubResult};

use super::ClubStore;

#[derive(Default)]
struct Tables {
    events: HashMap<Uuid, EventRecord>,
    slots: HashMap<Uuid, ScheduleSlotRecord>,
    enrollments: Vec<EnrollmentRecord>,
    check_ins: Vec<CheckInRecord>,
    flowers: Vec<FlowerRecord>,
    quotas: HashMap<(Uuid, Uuid, NaiveDate), FlowerQuotaRecord>,
    stats: HashMap<(Uuid, NaiveDate), DailyStatRecord>,
    certificates: Vec<CertificateRecord>,
    audits: Vec<LeaderAuditRecord>,
    certificate_serial: i64,
}

impl Tables {
    fn enrollment_mut(&mut self, event_id: Uuid, user_id: Uuid) -> Option<&mut EnrollmentRecord> {
        self.enrollments
            .iter_mut()
            .find(|e| e.event_id == event_id && e.user_id == user_id)
    }

    /// The counter-bump target for leadership and check-ins: an
    /// active participant row or nothing.
    fn active_participant_mut(
        &mut self,
        event_id: Uuid,
        user_id: Uuid,
    ) -> Option<&mut EnrollmentRecord> {
        self.enrollments.iter_mut().find(|e| {
            e.event_id == event_id
                && e.user_id == user_id
                && e.kind == EnrollmentKind::Participant
                && e.status == EnrollmentStatus::Enrolled
        })
    }

    fn count_active_participants(&self, event_id: Uuid) -> i64 {
        self.enrollments
            .iter()
            .filter(|e| {
                e.event_id == event_id
                    && e.kind == EnrollmentKind::Participant
                    && e.status == EnrollmentStatus::Enrolled
            })
            .count() as i64
    }
}

/// Store backed by in-process collections.
#[derive(Default)]
pub struct MemStore {
    tables: Mutex<Tables>,
}

impl MemStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ClubStore for MemStore {
    // ==========================================
    // EVENTS
    // ==========================================

    async fn insert_event(&self, event: &EventRecord) -> ClubResult<()> {
        let mut tables = self.tables.lock().await;
        tables.events.insert(event.id, event.clone());
        Ok(())
    }

    async fn get_event(&self, event_id: Uuid) -> ClubResult<Option<EventRecord>> {
        let tables = self.tables.lock().await;
        Ok(tables.events.get(&event_id).cloned())
    }

    async fn list_events_by_activity(
        &self,
        status: ActivityStatus,
    ) -> ClubResult<Vec<EventRecord>> {
        let tables = self.tables.lock().await;
        let mut events: Vec<EventRecord> = tables
            .events
            .values()
            .filter(|e| e.activity_status == status)
            .cloned()
            .collect();
        events.sort_by(|a, b| a.start_date.cmp(&b.start_date).then(a.id.cmp(&b.id)));
        Ok(events)
    }

    async fn update_event_details(&self, event: &EventRecord) -> ClubResult<bool> {
        let mut tables = self.tables.lock().await;
        let Some(current) = tables.events.get_mut(&event.id) else {
            return Ok(false);
        };
        if !matches!(
            current.approval_status,
            ApprovalStatus::Draft | ApprovalStatus::Rejected
        ) {
            return Ok(false);
        }

        current.title = event.title.clone();
        current.book_title = event.book_title.clone();
        current.book_author = event.book_author.clone();
        current.start_date = event.start_date;
        current.end_date = event.end_date;
        current.enroll_deadline = event.enroll_deadline;
        current.min_participants = event.min_participants;
        current.max_participants = event.max_participants;
        current.fee_kind = event.fee_kind;
        current.fee_amount = event.fee_amount;
        current.leader_reward_percent = event.leader_reward_percent;
        current.completion_standard = event.completion_standard;
        current.activity_mode = event.activity_mode;
        current.leader_strategy = event.leader_strategy;
        current.weekend_rest = event.weekend_rest;
        current.updated_at = Utc::now();
        Ok(true)
    }

    async fn transition_approval(
        &self,
        event_id: Uuid,
        expected: &[ApprovalStatus],
        next: ApprovalStatus,
        reject_reason: Option<&str>,
        at: DateTime<Utc>,
    ) -> ClubResult<bool> {
        let mut tables = self.tables.lock().await;
        let Some(event) = tables.events.get_mut(&event_id) else {
            return Ok(false);
        };
        if !expected.contains(&event.approval_status) {
            return Ok(false);
        }

        match next {
            ApprovalStatus::Pending => {
                event.submitted_at = Some(at);
                event.reject_reason = None;
            }
            ApprovalStatus::Approved => {
                event.approved_at = Some(at);
            }
            ApprovalStatus::Rejected => {
                event.reject_reason = reject_reason.map(str::to_string);
            }
            ApprovalStatus::Draft => return Ok(false),
        }
        event.approval_status = next;
        event.updated_at = at;
        Ok(true)
    }

    async fn transition_activity(
        &self,
        event_id: Uuid,
        expected: ActivityStatus,
        next: ActivityStatus,
        at: DateTime<Utc>,
    ) -> ClubResult<bool> {
        let mut tables = self.tables.lock().await;
        let Some(event) = tables.events.get_mut(&event_id) else {
            return Ok(false);
        };
        if event.activity_status != expected {
            return Ok(false);
        }

        match (expected, next) {
            (ActivityStatus::Enrolling, ActivityStatus::InProgress) => {
                if event.approval_status != ApprovalStatus::Approved {
                    return Ok(false);
                }
                event.started_at = Some(at);
            }
            (ActivityStatus::InProgress, ActivityStatus::Completed) => {
                event.completed_at = Some(at);
            }
            _ => return Ok(false),
        }
        event.activity_status = next;
        event.updated_at = at;
        Ok(true)
    }

    async fn set_overall_leader(
        &self,
        event_id: Uuid,
        leader_id: Option<Uuid>,
    ) -> ClubResult<bool> {
        let mut tables = self.tables.lock().await;
        let Some(event) = tables.events.get_mut(&event_id) else {
            return Ok(false);
        };
        event.overall_leader_id = leader_id;
        event.updated_at = Utc::now();
        Ok(true)
    }

    // ==========================================
    // SCHEDULE SLOTS
    // ==========================================

    async fn insert_slots(&self, slots: &[ScheduleSlotRecord]) -> ClubResult<u64> {
        let mut tables = self.tables.lock().await;
        let mut inserted = 0u64;
        for slot in slots {
            let exists = tables
                .slots
                .values()
                .any(|s| s.event_id == slot.event_id && s.day_number == slot.day_number);
            if !exists {
                tables.slots.insert(slot.id, slot.clone());
                inserted += 1;
            }
        }
        Ok(inserted)
    }

    async fn get_slot(&self, slot_id: Uuid) -> ClubResult<Option<ScheduleSlotRecord>> {
        let tables = self.tables.lock().await;
        Ok(tables.slots.get(&slot_id).cloned())
    }

    async fn list_slots(&self, event_id: Uuid) -> ClubResult<Vec<ScheduleSlotRecord>> {
        let tables = self.tables.lock().await;
        let mut slots: Vec<ScheduleSlotRecord> = tables
            .slots
            .values()
            .filter(|s| s.event_id == event_id)
            .cloned()
            .collect();
        slots.sort_by_key(|s| s.day_number);
        Ok(slots)
    }

    async fn claim_slot(
        &self,
        slot_id: Uuid,
        user_id: Uuid,
        cap: Option<i32>,
    ) -> ClubResult<ScheduleSlotRecord> {
        let mut guard = self.tables.lock().await;
        let tables = &mut *guard;

        let Some(slot) = tables.slots.get_mut(&slot_id) else {
            return Err(ClubError::NotFound("Slot"));
        };
        if slot.leader_id.is_some() {
            return Err(ClubError::DuplicateAssignment);
        }

        let event_id = slot.event_id;
        let Some(enrollment) = tables
            .enrollments
            .iter_mut()
            .find(|e| {
                e.event_id == event_id
                    && e.user_id == user_id
                    && e.kind == EnrollmentKind::Participant
                    && e.status == EnrollmentStatus::Enrolled
            })
        else {
            return Err(ClubError::PermissionDenied(
                "only enrolled participants can lead a slot".to_string(),
            ));
        };
        if let Some(cap) = cap {
            if enrollment.leader_days >= cap {
                return Err(ClubError::PermissionDenied(format!(
                    "leadership cap of {} slots reached",
                    cap
                )));
            }
        }

        enrollment.leader_days += 1;
        enrollment.updated_at = Utc::now();
        slot.leader_id = Some(user_id);
        Ok(slot.clone())
    }

    async fn assign_open_slot(&self, slot_id: Uuid, leader_id: Uuid) -> ClubResult<bool> {
        let mut guard = self.tables.lock().await;
        let tables = &mut *guard;

        let Some(slot) = tables.slots.get_mut(&slot_id) else {
            return Ok(false);
        };
        if slot.leader_id.is_some() {
            return Ok(false);
        }

        let event_id = slot.event_id;
        let Some(enrollment) = tables
            .enrollments
            .iter_mut()
            .find(|e| {
                e.event_id == event_id
                    && e.user_id == leader_id
                    && e.kind == EnrollmentKind::Participant
                    && e.status == EnrollmentStatus::Enrolled
            })
        else {
            return Ok(false);
        };

        enrollment.leader_days += 1;
        enrollment.updated_at = Utc::now();
        slot.leader_id = Some(leader_id);
        Ok(true)
    }

    async fn reassign_slot_leader(
        &self,
        slot_id: Uuid,
        new_leader_id: Uuid,
        actor_id: Uuid,
        at: DateTime<Utc>,
    ) -> ClubResult<Option<Uuid>> {
        let mut guard = self.tables.lock().await;
        let tables = &mut *guard;

        let Some(slot) = tables.slots.get(&slot_id) else {
            return Err(ClubError::NotFound("Slot"));
        };
        let event_id = slot.event_id;
        let prior = slot.leader_id;

        if prior == Some(new_leader_id) {
            return Ok(prior);
        }

        let Some(replacement) = tables.enrollments.iter_mut().find(|e| {
            e.event_id == event_id
                && e.user_id == new_leader_id
                && e.kind == EnrollmentKind::Participant
                && e.status == EnrollmentStatus::Enrolled
        }) else {
            return Err(ClubError::PermissionDenied(
                "replacement leader must be an enrolled participant".to_string(),
            ));
        };
        replacement.leader_days += 1;
        replacement.updated_at = Utc::now();

        if let Some(prior_id) = prior {
            if let Some(previous) = tables.enrollment_mut(event_id, prior_id) {
                previous.leader_days = (previous.leader_days - 1).max(0);
                previous.updated_at = Utc::now();
            }
        }

        if let Some(slot) = tables.slots.get_mut(&slot_id) {
            slot.leader_id = Some(new_leader_id);
        }

        tables.audits.push(LeaderAuditRecord {
            id: Uuid::new_v4(),
            event_id,
            slot_id,
            prior_leader_id: prior,
            new_leader_id,
            actor_id,
            changed_at: at,
        });

        Ok(prior)
    }

    async fn publish_slot_content(
        &self,
        slot_id: Uuid,
        title: &str,
        body: &str,
        at: DateTime<Utc>,
    ) -> ClubResult<()> {
        let mut tables = self.tables.lock().await;
        let Some(slot) = tables.slots.get_mut(&slot_id) else {
            return Err(ClubError::NotFound("Slot"));
        };
        slot.content_title = Some(title.to_string());
        slot.content_body = Some(body.to_string());
        slot.content_published_at = Some(at);
        Ok(())
    }

    async fn list_leader_audits(&self, event_id: Uuid) -> ClubResult<Vec<LeaderAuditRecord>> {
        let tables = self.tables.lock().await;
        let mut audits: Vec<LeaderAuditRecord> = tables
            .audits
            .iter()
            .filter(|a| a.event_id == event_id)
            .cloned()
            .collect();
        audits.sort_by(|a, b| a.changed_at.cmp(&b.changed_at).then(a.id.cmp(&b.id)));
        Ok(audits)
    }

    // ==========================================
    // ENROLLMENTS
    // ==========================================

    async fn admit_enrollment(
        &self,
        enrollment: &EnrollmentRecord,
        capacity: Option<i32>,
    ) -> ClubResult<EnrollmentRecord> {
        let mut guard = self.tables.lock().await;
        let tables = &mut *guard;

        let Some(event) = tables.events.get(&enrollment.event_id) else {
            return Err(ClubError::NotFound("Event"));
        };
        if event.activity_status != ActivityStatus::Enrolling {
            return Err(ClubError::conflict("event is no longer accepting enrollments"));
        }

        let needs_capacity = enrollment.kind == EnrollmentKind::Participant && capacity.is_some();

        let existing_index = tables
            .enrollments
            .iter()
            .position(|e| e.event_id == enrollment.event_id && e.user_id == enrollment.user_id);

        if let Some(index) = existing_index {
            if tables.enrollments[index].status != EnrollmentStatus::Cancelled {
                return Err(ClubError::AlreadyEnrolled);
            }
            if needs_capacity {
                let count = tables.count_active_participants(enrollment.event_id);
                if let Some(cap) = capacity {
                    if count >= cap as i64 {
                        return Err(ClubError::CapacityExceeded { capacity: cap });
                    }
                }
            }

            // Re-join after a cancellation re-activates the old row.
            // Earned counters survive; the fee is charged afresh.
            let current = &mut tables.enrollments[index];
            current.status = EnrollmentStatus::Enrolled;
            current.kind = enrollment.kind;
            current.display_name = enrollment.display_name.clone();
            current.paid_amount = enrollment.paid_amount;
            current.refund_amount = 0;
            current.refund_status = RefundStatus::None;
            current.updated_at = enrollment.updated_at;
            return Ok(current.clone());
        }

        if needs_capacity {
            let count = tables.count_active_participants(enrollment.event_id);
            if let Some(cap) = capacity {
                if count >= cap as i64 {
                    return Err(ClubError::CapacityExceeded { capacity: cap });
                }
            }
        }

        tables.enrollments.push(enrollment.clone());
        Ok(enrollment.clone())
    }

    async fn get_enrollment(
        &self,
        event_id: Uuid,
        user_id: Uuid,
    ) -> ClubResult<Option<EnrollmentRecord>> {
        let tables = self.tables.lock().await;
        Ok(tables
            .enrollments
            .iter()
            .find(|e| e.event_id == event_id && e.user_id == user_id)
            .cloned())
    }

    async fn list_enrollments(&self, event_id: Uuid) -> ClubResult<Vec<EnrollmentRecord>> {
        let tables = self.tables.lock().await;
        let mut enrollments: Vec<EnrollmentRecord> = tables
            .enrollments
            .iter()
            .filter(|e| e.event_id == event_id)
            .cloned()
            .collect();
        enrollments.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        Ok(enrollments)
    }

    async fn count_active_participants(&self, event_id: Uuid) -> ClubResult<i64> {
        let tables = self.tables.lock().await;
        Ok(tables.count_active_participants(event_id))
    }

    async fn cancel_enrollment(
        &self,
        event_id: Uuid,
        user_id: Uuid,
        refund_amount: i64,
    ) -> ClubResult<bool> {
        let mut guard = self.tables.lock().await;
        let tables = &mut *guard;

        let event_enrolling = tables
            .events
            .get(&event_id)
            .map(|e| e.activity_status == ActivityStatus::Enrolling)
            .unwrap_or(false);
        if !event_enrolling {
            return Ok(false);
        }

        let Some(enrollment) = tables.enrollment_mut(event_id, user_id) else {
            return Ok(false);
        };
        if enrollment.status != EnrollmentStatus::Enrolled {
            return Ok(false);
        }

        enrollment.status = EnrollmentStatus::Cancelled;
        enrollment.refund_amount = refund_amount;
        enrollment.refund_status = if refund_amount > 0 {
            RefundStatus::Pending
        } else {
            RefundStatus::None
        };
        enrollment.updated_at = Utc::now();
        Ok(true)
    }

    async fn settle_enrollment(
        &self,
        enrollment_id: Uuid,
        completion_rate: f64,
        met_standard: bool,
        refund_amount: i64,
    ) -> ClubResult<()> {
        let mut tables = self.tables.lock().await;
        let Some(enrollment) = tables
            .enrollments
            .iter_mut()
            .find(|e| e.id == enrollment_id)
        else {
            return Err(ClubError::NotFound("Enrollment"));
        };

        enrollment.completion_rate = Some(completion_rate);
        if met_standard && enrollment.status == EnrollmentStatus::Enrolled {
            enrollment.status = EnrollmentStatus::Completed;
        }
        enrollment.refund_amount = refund_amount;
        if refund_amount > 0 {
            enrollment.refund_status = RefundStatus::Pending;
        }
        enrollment.updated_at = Utc::now();
        Ok(())
    }

    // ==========================================
    // CHECK-INS
    // ==========================================

    async fn record_check_in(&self, check_in: &CheckInRecord) -> ClubResult<()> {
        let mut guard = self.tables.lock().await;
        let tables = &mut *guard;

        let duplicate = tables
            .check_ins
            .iter()
            .any(|c| c.slot_id == check_in.slot_id && c.user_id == check_in.user_id);
        if duplicate {
            return Err(ClubError::DuplicateCheckIn);
        }

        let Some(enrollment) = tables.active_participant_mut(check_in.event_id, check_in.user_id)
        else {
            return Err(ClubError::PermissionDenied(
                "only enrolled participants can check in".to_string(),
            ));
        };
        enrollment.check_ins += 1;
        enrollment.updated_at = Utc::now();

        tables.check_ins.push(check_in.clone());
        Ok(())
    }

    async fn get_check_in(&self, check_in_id: Uuid) -> ClubResult<Option<CheckInRecord>> {
        let tables = self.tables.lock().await;
        Ok(tables.check_ins.iter().find(|c| c.id == check_in_id).cloned())
    }

    async fn list_check_ins_for_slot(&self, slot_id: Uuid) -> ClubResult<Vec<CheckInRecord>> {
        let tables = self.tables.lock().await;
        let mut check_ins: Vec<CheckInRecord> = tables
            .check_ins
            .iter()
            .filter(|c| c.slot_id == slot_id)
            .cloned()
            .collect();
        check_ins.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        Ok(check_ins)
    }

    async fn count_check_ins_on(&self, event_id: Uuid, date: NaiveDate) -> ClubResult<i64> {
        let tables = self.tables.lock().await;
        Ok(tables
            .check_ins
            .iter()
            .filter(|c| c.event_id == event_id && c.checked_on == date)
            .count() as i64)
    }

    // ==========================================
    // FLOWERS & QUOTAS
    // ==========================================

    async fn record_flower(
        &self,
        flower: &FlowerRecord,
        default_quota: i32,
    ) -> ClubResult<FlowerQuotaRecord> {
        let mut guard = self.tables.lock().await;
        let tables = &mut *guard;

        let duplicate = tables
            .flowers
            .iter()
            .any(|f| f.check_in_id == flower.check_in_id);
        if duplicate {
            return Err(ClubError::DuplicateFlower);
        }

        let key = (flower.giver_id, flower.event_id, flower.given_on);
        let (used, max) = match tables.quotas.get(&key) {
            Some(quota) => (quota.used, quota.max),
            None => (0, default_quota),
        };
        if used as i64 + flower.amount as i64 > max as i64 {
            return Err(ClubError::QuotaExceeded { used, max });
        }

        // Nothing can fail past this point; the quota row only
        // materializes for successful gives, like a rolled-back
        // transaction would leave none behind.
        let quota = FlowerQuotaRecord {
            user_id: flower.giver_id,
            event_id: flower.event_id,
            quota_date: flower.given_on,
            used: used + flower.amount,
            max,
        };
        tables.quotas.insert(key, quota.clone());
        tables.flowers.push(flower.clone());

        if let Some(recipient) = tables.enrollment_mut(flower.event_id, flower.recipient_id) {
            recipient.flowers_received += flower.amount;
            recipient.updated_at = Utc::now();
        }

        Ok(quota)
    }

    async fn get_flower_quota(
        &self,
        user_id: Uuid,
        event_id: Uuid,
        date: NaiveDate,
    ) -> ClubResult<Option<FlowerQuotaRecord>> {
        let tables = self.tables.lock().await;
        Ok(tables.quotas.get(&(user_id, event_id, date)).cloned())
    }

    async fn list_flowers_on(
        &self,
        event_id: Uuid,
        date: NaiveDate,
    ) -> ClubResult<Vec<FlowerRecord>> {
        let tables = self.tables.lock().await;
        let mut flowers: Vec<FlowerRecord> = tables
            .flowers
            .iter()
            .filter(|f| f.event_id == event_id && f.given_on == date)
            .cloned()
            .collect();
        flowers.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        Ok(flowers)
    }

    async fn list_flowers_for_event(&self, event_id: Uuid) -> ClubResult<Vec<FlowerRecord>> {
        let tables = self.tables.lock().await;
        let mut flowers: Vec<FlowerRecord> = tables
            .flowers
            .iter()
            .filter(|f| f.event_id == event_id)
            .cloned()
            .collect();
        flowers.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        Ok(flowers)
    }

    // ==========================================
    // STATS & CERTIFICATES
    // ==========================================

    async fn upsert_daily_stat(&self, stat: &DailyStatRecord) -> ClubResult<DailyStatRecord> {
        let mut tables = self.tables.lock().await;
        let key = (stat.event_id, stat.stat_date);
        let stored = match tables.stats.get(&key) {
            Some(existing) => {
                // Regeneration overwrites in place, keeping the ID
                // the snapshot was first stored under.
                let mut updated = stat.clone();
                updated.id = existing.id;
                updated
            }
            None => stat.clone(),
        };
        tables.stats.insert(key, stored.clone());
        Ok(stored)
    }

    async fn get_daily_stat(
        &self,
        event_id: Uuid,
        date: NaiveDate,
    ) -> ClubResult<Option<DailyStatRecord>> {
        let tables = self.tables.lock().await;
        Ok(tables.stats.get(&(event_id, date)).cloned())
    }

    async fn next_certificate_serial(&self) -> ClubResult<i64> {
        let mut tables = self.tables.lock().await;
        tables.certificate_serial += 1;
        Ok(tables.certificate_serial)
    }

    async fn insert_certificate(
        &self,
        certificate: &CertificateRecord,
    ) -> ClubResult<Option<CertificateRecord>> {
        let mut tables = self.tables.lock().await;
        let exists = tables.certificates.iter().any(|c| {
            c.event_id == certificate.event_id
                && c.user_id == certificate.user_id
                && c.kind == certificate.kind
        });
        if exists {
            return Ok(None);
        }
        tables.certificates.push(certificate.clone());
        Ok(Some(certificate.clone()))
    }

    async fn list_certificates(&self, event_id: Uuid) -> ClubResult<Vec<CertificateRecord>> {
        let tables = self.tables.lock().await;
        let mut certificates: Vec<CertificateRecord> = tables
            .certificates
            .iter()
            .filter(|c| c.event_id == event_id)
            .cloned()
            .collect();
        certificates.sort_by(|a, b| a.issued_at.cmp(&b.issued_at).then(a.serial.cmp(&b.serial)));
        Ok(certificates)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn sample_event(id: Uuid) -> EventRecord {
        let now = Utc::now();
        EventRecord {
            id,
            title: "January Dostoevsky".to_string(),
            book_title: "The Idiot".to_string(),
            book_author: None,
            organizer_id: Uuid::new_v4(),
            overall_leader_id: None,
            start_date: NaiveDate::from_ymd_opt(2025, 1, 6).unwrap(),
            end_date: NaiveDate::from_ymd_opt(2025, 1, 17).unwrap(),
            enroll_deadline: NaiveDate::from_ymd_opt(2025, 1, 4).unwrap(),
            min_participants: 2,
            max_participants: 10,
            fee_kind: FeeKind::Free,
            fee_amount: 0,
            leader_reward_percent: 0,
            completion_standard: 80,
            activity_mode: ActivityMode::NoteCheckIn,
            leader_strategy: LeaderStrategy::Voluntary,
            weekend_rest: true,
            approval_status: ApprovalStatus::Approved,
            activity_status: ActivityStatus::Enrolling,
            reject_reason: None,
            submitted_at: None,
            approved_at: Some(now),
            started_at: None,
            completed_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    fn sample_enrollment(event_id: Uuid, user_id: Uuid) -> EnrollmentRecord {
        let now = Utc::now();
        EnrollmentRecord {
            id: Uuid::new_v4(),
            event_id,
            user_id,
            display_name: "reader".to_string(),
            kind: EnrollmentKind::Participant,
            status: EnrollmentStatus::Enrolled,
            check_ins: 0,
            leader_days: 0,
            flowers_received: 0,
            completion_rate: None,
            paid_amount: 0,
            refund_amount: 0,
            refund_status: RefundStatus::None,
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn test_readmission_reuses_cancelled_row() {
        let store = MemStore::new();
        let event = sample_event(Uuid::new_v4());
        store.insert_event(&event).await.unwrap();

        let user_id = Uuid::new_v4();
        let first = sample_enrollment(event.id, user_id);
        store.admit_enrollment(&first, Some(10)).await.unwrap();
        assert!(store
            .cancel_enrollment(event.id, user_id, 0)
            .await
            .unwrap());

        let second = sample_enrollment(event.id, user_id);
        let readmitted = store.admit_enrollment(&second, Some(10)).await.unwrap();

        assert_eq!(readmitted.id, first.id);
        assert_eq!(readmitted.status, EnrollmentStatus::Enrolled);
        assert_eq!(store.count_active_participants(event.id).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_failed_give_leaves_no_quota_row() {
        let store = MemStore::new();
        let event = sample_event(Uuid::new_v4());
        store.insert_event(&event).await.unwrap();

        let giver = Uuid::new_v4();
        let date = NaiveDate::from_ymd_opt(2025, 1, 7).unwrap();
        let flower = FlowerRecord {
            id: Uuid::new_v4(),
            event_id: event.id,
            slot_id: Uuid::new_v4(),
            check_in_id: Uuid::new_v4(),
            giver_id: giver,
            recipient_id: Uuid::new_v4(),
            amount: 5,
            comment: None,
            anonymous: false,
            given_on: date,
            created_at: Utc::now(),
        };

        let err = store.record_flower(&flower, 3).await.unwrap_err();
        assert!(matches!(err, ClubError::QuotaExceeded { used: 0, max: 3 }));
        assert!(store
            .get_flower_quota(giver, event.id, date)
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_stat_upsert_preserves_id() {
        let store = MemStore::new();
        let event_id = Uuid::new_v4();
        let date = NaiveDate::from_ymd_opt(2025, 1, 7).unwrap();

        let first = DailyStatRecord {
            id: Uuid::new_v4(),
            event_id,
            stat_date: date,
            total_flowers: 1,
            total_check_ins: 2,
            leaderboard: serde_json::json!([]),
            generated_at: Utc::now(),
        };
        let stored = store.upsert_daily_stat(&first).await.unwrap();

        let second = DailyStatRecord {
            id: Uuid::new_v4(),
            total_flowers: 4,
            ..first.clone()
        };
        let regenerated = store.upsert_daily_stat(&second).await.unwrap();

        assert_eq!(regenerated.id, stored.id);
        assert_eq!(regenerated.total_flowers, 4);
    }
}
