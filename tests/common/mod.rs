//! Shared harness for the integration tests: the full service stack
//! over `MemStore`, a pinned clock and a recording notifier.

// Each test binary compiles this module separately and uses its own
// subset of the helpers.
#![allow(dead_code)]

use std::sync::Arc;

use chrono::NaiveDate;
use uuid::Uuid;

use bookclub_backend::db::models::{
    ActivityMode, EnrollmentKind, EventRecord, FeeKind, LeaderStrategy,
};
use bookclub_backend::models::{CreateEventRequest, JoinEventRequest};
use bookclub_backend::{
    AppConfig, FixedClock, MemStore, RecordingNotifier, Services, UserRef,
};

pub struct Harness {
    pub services: Services,
    pub store: Arc<MemStore>,
    pub clock: Arc<FixedClock>,
    pub notifier: Arc<RecordingNotifier>,
    pub config: AppConfig,
}

impl Harness {
    /// Full stack with the clock pinned to noon UTC on the given date.
    pub fn at_date(year: i32, month: u32, day: u32) -> Self {
        Self::with_config(year, month, day, AppConfig::default())
    }

    /// Same, with a custom configuration (quota, grace, claim cap).
    pub fn with_config(year: i32, month: u32, day: u32, config: AppConfig) -> Self {
        let store = Arc::new(MemStore::new());
        let clock = Arc::new(FixedClock::at_date(year, month, day));
        let notifier = Arc::new(RecordingNotifier::new());
        let services = Services::new(
            store.clone(),
            clock.clone(),
            notifier.clone(),
            config.clone(),
        );
        Self {
            services,
            store,
            clock,
            notifier,
            config,
        }
    }

    /// Create an event, submit it and approve it with a throwaway admin.
    pub async fn approved_event(
        &self,
        organizer: &UserRef,
        request: CreateEventRequest,
    ) -> EventRecord {
        let event = self
            .services
            .lifecycle
            .create_event(organizer, request)
            .await
            .expect("create event");
        self.services
            .lifecycle
            .submit_for_approval(organizer, event.id)
            .await
            .expect("submit event");
        self.services
            .lifecycle
            .approve(&admin("reviewer"), event.id)
            .await
            .expect("approve event")
    }
}

pub fn d(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).expect("valid calendar date")
}

/// A regular member with a fresh random ID.
pub fn reader(name: &str) -> UserRef {
    UserRef::new(Uuid::new_v4(), name)
}

/// A member whose ID is fixed, for tests that assert on ID ordering.
pub fn reader_with_id(id: u128, name: &str) -> UserRef {
    UserRef::new(Uuid::from_u128(id), name)
}

pub fn admin(name: &str) -> UserRef {
    UserRef {
        id: Uuid::new_v4(),
        display_name: name.to_string(),
        is_admin: true,
    }
}

pub fn join_as_participant() -> JoinEventRequest {
    JoinEventRequest {
        kind: EnrollmentKind::Participant,
    }
}

pub fn join_as_observer() -> JoinEventRequest {
    JoinEventRequest {
        kind: EnrollmentKind::Observer,
    }
}

/// A free five-day season with permissive defaults; tests override
/// the fields they care about.
pub fn season_request(start: NaiveDate, end: NaiveDate) -> CreateEventRequest {
    CreateEventRequest {
        title: "Test Season".to_string(),
        book_title: "Test Book".to_string(),
        book_author: None,
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
        leader_strategy: LeaderStrategy::Voluntary,
        weekend_rest: false,
    }
}
