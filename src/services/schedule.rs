//! # Schedule Generator
//!
//! Derives an event's daily schedule slots from its date range.
//!
//! ## Responsibilities
//!
//! - Plan (day number, calendar date) pairs, skipping weekends for
//!   weekend-rest events
//! - Materialize slot rows exactly once per (event, day number)
//!
//! Slot creation is idempotent: re-running against an event that
//! already has its slots inserts nothing and returns the existing
//! schedule, so a start retried after a crash cannot duplicate days.

use std::sync::Arc;

use chrono::NaiveDate;
use tracing::{debug, info};
use uuid::Uuid;

use crate::clock::Clock;
use crate::db::models::{EventRecord, ScheduleSlotRecord};
use crate::error::ClubResult;
use crate::store::ClubStore;
use crate::utils::club_days;

/// Plans and materializes schedule slots.
#[derive(Clone)]
pub struct ScheduleGenerator {
    store: Arc<dyn ClubStore>,
    clock: Arc<dyn Clock>,
}

impl ScheduleGenerator {
    pub fn new(store: Arc<dyn ClubStore>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    /// The (day number, date) pairs an event's schedule consists of.
    ///
    /// Day numbers are 1-based and consecutive even when weekend days
    /// are skipped.
    pub fn plan(event: &EventRecord) -> Vec<(i32, NaiveDate)> {
        club_days(event.start_date, event.end_date, event.weekend_rest)
            .into_iter()
            .enumerate()
            .map(|(index, date)| (index as i32 + 1, date))
            .collect()
    }

    /// Create any missing slots for the event and return the full
    /// schedule in day order.
    pub async fn ensure_slots(&self, event: &EventRecord) -> ClubResult<Vec<ScheduleSlotRecord>> {
        let now = self.clock.now();
        let planned: Vec<ScheduleSlotRecord> = Self::plan(event)
            .into_iter()
            .map(|(day_number, slot_date)| ScheduleSlotRecord {
                id: Uuid::new_v4(),
                event_id: event.id,
                day_number,
                slot_date,
                leader_id: None,
                content_title: None,
                content_body: None,
                content_published_at: None,
                created_at: now,
            })
            .collect();

        let inserted = self.store.insert_slots(&planned).await?;
        if inserted > 0 {
            info!(
                "Schedule generated: event={} days={} (of {} planned)",
                event.id,
                inserted,
                planned.len()
            );
        } else {
            debug!("Schedule already present: event={}", event.id);
        }

        self.store.list_slots(event.id).await
    }
}
