//! # Participation Service
//!
//! Daily member activity inside a running event: check-ins against
//! the day's slot and the leader's content post for it.
//!
//! A check-in only counts on the slot's own calendar date, and only
//! once per member per slot. Content publishing instead follows the
//! leader's window (day before through the day itself), with the
//! overall leader free to step in at any time.

use std::sync::Arc;

use tracing::{debug, info};
use uuid::Uuid;

use crate::clock::Clock;
use crate::db::models::{
    ActivityStatus, ApprovalStatus, CheckInRecord, EventRecord, ScheduleSlotRecord,
};
use crate::error::{ClubError, ClubResult};
use crate::models::{CheckInRequest, PublishContentRequest, UserRef};
use crate::notify::{DomainEvent, Notifier};
use crate::services::leader;
use crate::store::ClubStore;

#[derive(Clone)]
pub struct ParticipationService {
    store: Arc<dyn ClubStore>,
    clock: Arc<dyn Clock>,
    notifier: Arc<dyn Notifier>,
}

impl ParticipationService {
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

    /// Record a member's check-in for a slot.
    ///
    /// The event must be in progress and the slot's date must be
    /// today. A second check-in for the same slot surfaces as
    /// `DuplicateCheckIn`; the participant guard and the counter
    /// update ride the same store transaction as the row itself.
    pub async fn check_in(
        &self,
        user: &UserRef,
        request: CheckInRequest,
    ) -> ClubResult<CheckInRecord> {
        debug!("Check-in requested: slot={} user={}", request.slot_id, user.id);

        let (event, slot) = self.fetch_slot(request.slot_id).await?;
        if event.activity_status != ActivityStatus::InProgress {
            return Err(ClubError::conflict("event is not in progress"));
        }

        let today = self.clock.today();
        if slot.slot_date != today {
            return Err(ClubError::PermissionDenied(format!(
                "check-ins for day {} are only accepted on {}",
                slot.day_number, slot.slot_date
            )));
        }

        let record = CheckInRecord {
            id: Uuid::new_v4(),
            event_id: event.id,
            slot_id: slot.id,
            user_id: user.id,
            note: request.note,
            checked_on: today,
            created_at: self.clock.now(),
        };
        self.store.record_check_in(&record).await?;

        info!(
            "Check-in recorded: event={} slot={} day={} user={}",
            event.id, slot.id, slot.day_number, user.id
        );
        self.notifier.publish(DomainEvent::CheckInRecorded {
            event_id: event.id,
            slot_id: slot.id,
            user_id: user.id,
        });

        Ok(record)
    }

    /// Publish (or replace) the content post for a slot.
    ///
    /// Open to the slot's leader inside the content window and to the
    /// overall leader at any time. Re-publishing overwrites the
    /// earlier post and refreshes its timestamp.
    pub async fn publish_content(
        &self,
        user: &UserRef,
        request: PublishContentRequest,
    ) -> ClubResult<ScheduleSlotRecord> {
        if request.title.trim().is_empty() {
            return Err(ClubError::validation("title", "content title cannot be empty"));
        }

        let (event, slot) = self.fetch_slot(request.slot_id).await?;
        if event.approval_status != ApprovalStatus::Approved {
            return Err(ClubError::conflict("event is not approved"));
        }
        if event.activity_status == ActivityStatus::Completed {
            return Err(ClubError::conflict("event already completed"));
        }

        let today = self.clock.today();
        if !leader::can_publish(&event, &slot, user.id, today) {
            return Err(ClubError::PermissionDenied(format!(
                "content for day {} may only be published by its leader between {} and {}",
                slot.day_number,
                slot.slot_date - chrono::Duration::days(1),
                slot.slot_date
            )));
        }

        self.store
            .publish_slot_content(slot.id, &request.title, &request.body, self.clock.now())
            .await?;
        let updated = self
            .store
            .get_slot(slot.id)
            .await?
            .ok_or(ClubError::NotFound("Slot"))?;

        info!(
            "Content published: event={} slot={} day={} publisher={}",
            event.id, slot.id, slot.day_number, user.id
        );
        self.notifier.publish(DomainEvent::ContentPublished {
            event_id: event.id,
            slot_id: slot.id,
            publisher_id: user.id,
        });

        Ok(updated)
    }

    /// Check-ins for one slot, oldest first.
    pub async fn slot_check_ins(&self, slot_id: Uuid) -> ClubResult<Vec<CheckInRecord>> {
        self.store.list_check_ins_for_slot(slot_id).await
    }

    async fn fetch_slot(&self, slot_id: Uuid) -> ClubResult<(EventRecord, ScheduleSlotRecord)> {
        let slot = self
            .store
            .get_slot(slot_id)
            .await?
            .ok_or(ClubError::NotFound("Slot"))?;
        let event = self
            .store
            .get_event(slot.event_id)
            .await?
            .ok_or(ClubError::NotFound("Event"))?;
        Ok((event, slot))
    }
}
