//! # Services Module
//!
//! This module contains the core business logic services for the
//! book club backend. Each service handles a specific domain.
//!
//! ## Services Overview
//!
//! | Service | Responsibility |
//! |---------|---------------|
//! | `EventLifecycleService` | Approval workflow, start/complete transitions |
//! | `EnrollmentService` | Joining, cancelling, rosters, member progress |
//! | `ParticipationService` | Daily check-ins, content publishing |
//! | `LeaderService` | Slot claims, auto-assignment, reassignment, backups |
//! | `FlowerService` | Flower gives, quotas, leaderboards, certificates |
//! | `ScheduleGenerator` | Reading-day planning, slot creation |
//! | `DailyScheduler` | Background sweep: stats, backup flags, auto-complete |
//!
//! ## Service Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                        SERVICES LAYER                            │
//! │                                                                  │
//! │  ┌──────────────────────────────────────────────────────────┐   │
//! │  │                 EventLifecycleService                     │   │
//! │  │  • create_event()  • approve()/reject()  • start()        │   │
//! │  │  • amend_event()   • submit_for_approval()  • complete()  │   │
//! │  └──────────────────────────────────────────────────────────┘   │
//! │                              │                                   │
//! │         ┌────────────────────┼────────────────────┐             │
//! │         ▼                    ▼                    ▼             │
//! │  ┌────────────┐      ┌────────────┐       ┌────────────┐       │
//! │  │  Schedule  │      │   Leader   │       │   Flower   │       │
//! │  │ Generator  │      │  Service   │       │  Service   │       │
//! │  │            │      │            │       │            │       │
//! │  │ Plan days  │      │ Assign     │       │ Quotas     │       │
//! │  │ Make slots │      │ Reassign   │       │ Stats      │       │
//! │  └────────────┘      └────────────┘       └────────────┘       │
//! │                                                                  │
//! │  ┌────────────┐      ┌─────────────┐      ┌────────────┐       │
//! │  │ Enrollment │      │Participation│      │   Daily    │       │
//! │  │  Service   │      │   Service   │      │ Scheduler  │       │
//! │  └────────────┘      └─────────────┘      └────────────┘       │
//! └─────────────────────────────────────────────────────────────────┘
//! ```

pub mod completion;
pub mod daily_scheduler;
pub mod enrollment;
pub mod event_lifecycle;
pub mod flower;
pub mod leader;
pub mod participation;
pub mod schedule;

pub use daily_scheduler::DailyScheduler;
pub use enrollment::EnrollmentService;
pub use event_lifecycle::EventLifecycleService;
pub use flower::FlowerService;
pub use leader::LeaderService;
pub use participation::ParticipationService;
pub use schedule::ScheduleGenerator;

use std::sync::Arc;

use crate::clock::Clock;
use crate::config::AppConfig;
use crate::notify::Notifier;
use crate::store::ClubStore;

/// Every service wired over one store, clock and notifier.
///
/// Cheap to clone; each service only holds `Arc`s and the config.
#[derive(Clone)]
pub struct Services {
    pub lifecycle: EventLifecycleService,
    pub enrollment: EnrollmentService,
    pub participation: ParticipationService,
    pub leaders: LeaderService,
    pub flowers: FlowerService,
}

impl Services {
    pub fn new(
        store: Arc<dyn ClubStore>,
        clock: Arc<dyn Clock>,
        notifier: Arc<dyn Notifier>,
        config: AppConfig,
    ) -> Self {
        Self {
            lifecycle: EventLifecycleService::new(
                Arc::clone(&store),
                Arc::clone(&clock),
                Arc::clone(&notifier),
                config.clone(),
            ),
            enrollment: EnrollmentService::new(
                Arc::clone(&store),
                Arc::clone(&clock),
                Arc::clone(&notifier),
            ),
            participation: ParticipationService::new(
                Arc::clone(&store),
                Arc::clone(&clock),
                Arc::clone(&notifier),
            ),
            leaders: LeaderService::new(
                Arc::clone(&store),
                Arc::clone(&clock),
                Arc::clone(&notifier),
                config.clone(),
            ),
            flowers: FlowerService::new(store, clock, notifier, config),
        }
    }
}
