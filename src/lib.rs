//! # Book Club Backend
//!
//! Orchestration engine for cooperative reading events: members
//! enroll, follow a daily schedule, rotate through the daily-leader
//! role, check in, and reward each other with a capped daily
//! allotment of flowers.
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                       BOOK CLUB ENGINE                           │
//! │                                                                  │
//! │  ┌───────────────────────────────────────────────────────────┐  │
//! │  │                     SERVICE LAYER                          │  │
//! │  │  ┌──────────────┐ ┌──────────────┐ ┌──────────────────┐   │  │
//! │  │  │EventLifecycle│ │Enrollment    │ │Leader / Flower   │   │  │
//! │  │  │create approve│ │join cancel   │ │claim assign give │   │  │
//! │  │  │start complete│ │roster        │ │stats certificates│   │  │
//! │  │  └──────────────┘ └──────────────┘ └──────────────────┘   │  │
//! │  └───────────────────────────┬───────────────────────────────┘  │
//! │                              │  ClubStore trait                  │
//! │         ┌────────────────────┴────────────────────┐             │
//! │         │                                         │              │
//! │  ┌──────┴──────┐                          ┌───────┴──────┐      │
//! │  │   PgStore   │                          │   MemStore   │      │
//! │  │ PostgreSQL  │                          │  tests/demo  │      │
//! │  └─────────────┘                          └──────────────┘      │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Callers (HTTP controllers, jobs, the demo binary) construct
//! [`Services`] over a store, a [`Clock`] and a [`Notifier`], then
//! invoke operations that each return `Result<_, ClubError>`.
//! Authentication, transport and payment settlement live outside this
//! crate; identity arrives as a plain [`UserRef`].

pub mod clock;
pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod notify;
pub mod services;
pub mod store;
pub mod utils;

pub use clock::{Clock, FixedClock, SystemClock};
pub use config::{AppConfig, ConfigError};
pub use error::{ClubError, ClubResult};
pub use models::UserRef;
pub use notify::{DomainEvent, LoggingNotifier, Notifier, RecordingNotifier};
pub use services::{DailyScheduler, Services};
pub use store::{ClubStore, MemStore, PgStore};
