//! # Daily Scheduler
//!
//! Background sweep over every in-progress event. Each pass:
//!
//! 1. Regenerates yesterday's and today's leaderboard snapshots
//!    (late flowers inside the grace period land in yesterday's).
//! 2. Flags slots needing a backup leader in the log.
//! 3. Auto-completes events whose last reading day has passed.
//!
//! One event's failure never stops the sweep; it is logged and the
//! pass moves on. Every step is idempotent, so overlapping passes or
//! a concurrent manual call do no harm.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, error, info, warn};

use crate::clock::Clock;
use crate::config::AppConfig;
use crate::db::models::{ActivityStatus, EventRecord};
use crate::error::{ClubError, ClubResult};
use crate::models::UserRef;
use crate::notify::Notifier;
use crate::services::event_lifecycle::EventLifecycleService;
use crate::services::flower::FlowerService;
use crate::services::leader::LeaderService;
use crate::store::ClubStore;

pub struct DailyScheduler {
    store: Arc<dyn ClubStore>,
    clock: Arc<dyn Clock>,
    flowers: FlowerService,
    leaders: LeaderService,
    lifecycle: EventLifecycleService,
    interval: Duration,
}

impl DailyScheduler {
    pub fn new(
        store: Arc<dyn ClubStore>,
        clock: Arc<dyn Clock>,
        notifier: Arc<dyn Notifier>,
        config: AppConfig,
    ) -> Self {
        let flowers = FlowerService::new(
            Arc::clone(&store),
            Arc::clone(&clock),
            Arc::clone(&notifier),
            config.clone(),
        );
        let leaders = LeaderService::new(
            Arc::clone(&store),
            Arc::clone(&clock),
            Arc::clone(&notifier),
            config.clone(),
        );
        let lifecycle = EventLifecycleService::new(
            Arc::clone(&store),
            Arc::clone(&clock),
            Arc::clone(&notifier),
            config.clone(),
        );
        Self {
            store,
            clock,
            flowers,
            leaders,
            lifecycle,
            interval: Duration::from_secs(config.stat_interval_secs),
        }
    }

    /// Run the sweep loop forever. Spawn this on its own task.
    pub async fn run(self) {
        info!("Daily scheduler started: interval={:?}", self.interval);
        let mut ticker = tokio::time::interval(self.interval);
        loop {
            ticker.tick().await;
            if let Err(err) = self.run_once().await {
                error!("Scheduler pass failed: {}", err);
            }
        }
    }

    /// One full pass over every in-progress event.
    pub async fn run_once(&self) -> ClubResult<()> {
        let events = self
            .store
            .list_events_by_activity(ActivityStatus::InProgress)
            .await?;
        debug!("Scheduler pass: {} events in progress", events.len());

        for event in events {
            if let Err(err) = self.sweep_event(&event).await {
                error!("Event sweep failed: event={} error={}", event.id, err);
            }
        }
        Ok(())
    }

    async fn sweep_event(&self, event: &EventRecord) -> ClubResult<()> {
        let today = self.clock.today();
        let yesterday = today - chrono::Duration::days(1);

        for date in [yesterday, today] {
            if date >= event.start_date && date <= event.end_date {
                self.flowers.generate_daily_stat(event.id, date).await?;
            }
        }

        for candidate in self.leaders.find_slots_needing_backup(event.id, None).await? {
            warn!(
                "Slot needs backup: event={} slot={} day={} reason={}",
                event.id,
                candidate.slot.id,
                candidate.slot.day_number,
                candidate.reason
            );
        }

        if today > event.end_date {
            match self.lifecycle.complete(&UserRef::system(), event.id).await {
                Ok(_) => info!("Event auto-completed: id={}", event.id),
                // A racing manual completion got there first.
                Err(ClubError::StateConflict(reason)) => {
                    debug!("Auto-complete skipped: event={} reason={}", event.id, reason)
                }
                Err(err) => return Err(err),
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use crate::db::models::{
        ActivityMode, ApprovalStatus, FeeKind, LeaderStrategy,
    };
    use crate::notify::RecordingNotifier;
    use crate::store::MemStore;
    use chrono::NaiveDate;
    use uuid::Uuid;

    fn running_event(start: NaiveDate, end: NaiveDate) -> EventRecord {
        let created = start.and_hms_opt(9, 0, 0).unwrap().and_utc();
        EventRecord {
            id: Uuid::new_v4(),
            title: "Sweep Season".to_string(),
            book_title: "The Overstory".to_string(),
            book_author: None,
            organizer_id: Uuid::new_v4(),
            overall_leader_id: None,
            start_date: start,
            end_date: end,
            enroll_deadline: start - chrono::Duration::days(1),
            min_participants: 1,
            max_participants: 10,
            fee_kind: FeeKind::Free,
            fee_amount: 0,
            leader_reward_percent: 0,
            completion_standard: 80,
            activity_mode: ActivityMode::NoteCheckIn,
            leader_strategy: LeaderStrategy::Disabled,
            weekend_rest: false,
            approval_status: ApprovalStatus::Approved,
            activity_status: ActivityStatus::InProgress,
            reject_reason: None,
            submitted_at: None,
            approved_at: Some(created),
            started_at: Some(created),
            completed_at: None,
            created_at: created,
            updated_at: created,
        }
    }

    fn scheduler_over(store: Arc<MemStore>, clock: Arc<FixedClock>) -> DailyScheduler {
        DailyScheduler::new(
            store,
            clock,
            Arc::new(RecordingNotifier::default()),
            AppConfig::default(),
        )
    }

    #[tokio::test]
    async fn test_pass_generates_stats_for_running_event() {
        let store = Arc::new(MemStore::new());
        let clock = Arc::new(FixedClock::at_date(2025, 3, 12));
        let event = running_event(
            NaiveDate::from_ymd_opt(2025, 3, 10).unwrap(),
            NaiveDate::from_ymd_opt(2025, 3, 20).unwrap(),
        );
        store.insert_event(&event).await.unwrap();

        let scheduler = scheduler_over(Arc::clone(&store), clock);
        scheduler.run_once().await.unwrap();

        let today = NaiveDate::from_ymd_opt(2025, 3, 12).unwrap();
        let yesterday = NaiveDate::from_ymd_opt(2025, 3, 11).unwrap();
        assert!(store.get_daily_stat(event.id, today).await.unwrap().is_some());
        assert!(store.get_daily_stat(event.id, yesterday).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_pass_auto_completes_overrun_event() {
        let store = Arc::new(MemStore::new());
        let clock = Arc::new(FixedClock::at_date(2025, 3, 21));
        let event = running_event(
            NaiveDate::from_ymd_opt(2025, 3, 10).unwrap(),
            NaiveDate::from_ymd_opt(2025, 3, 20).unwrap(),
        );
        store.insert_event(&event).await.unwrap();

        let scheduler = scheduler_over(Arc::clone(&store), clock);
        scheduler.run_once().await.unwrap();

        let stored = store.get_event(event.id).await.unwrap().unwrap();
        assert_eq!(stored.activity_status, ActivityStatus::Completed);
        assert!(stored.completed_at.is_some());
    }

    #[tokio::test]
    async fn test_pass_skips_dates_outside_event_range() {
        let store = Arc::new(MemStore::new());
        // Today is the event's first day; yesterday precedes it.
        let clock = Arc::new(FixedClock::at_date(2025, 3, 10));
        let event = running_event(
            NaiveDate::from_ymd_opt(2025, 3, 10).unwrap(),
            NaiveDate::from_ymd_opt(2025, 3, 20).unwrap(),
        );
        store.insert_event(&event).await.unwrap();

        let scheduler = scheduler_over(Arc::clone(&store), clock);
        scheduler.run_once().await.unwrap();

        let before_start = NaiveDate::from_ymd_opt(2025, 3, 9).unwrap();
        assert!(store
            .get_daily_stat(event.id, before_start)
            .await
            .unwrap()
            .is_none());
    }
}
