//! # Notifications
//!
//! Fire-and-forget domain events. Services emit a [`DomainEvent`]
//! after each successful state change; delivery (push, SMS, inbox) is
//! somebody else's problem behind the [`Notifier`] trait.
//!
//! Two sinks ship with the crate:
//!
//! | Sink | Use |
//! |------|-----|
//! | [`LoggingNotifier`] | Default for the binaries; one `info!` line per event |
//! | [`RecordingNotifier`] | Tests; captures events for assertions |
//!
//! Emission is synchronous and infallible by design: a lost
//! notification must never roll back the state change it describes.

use std::sync::Mutex;

use chrono::NaiveDate;
use serde::Serialize;
use tracing::info;
use uuid::Uuid;

use crate::db::models::{CertificateKind, EnrollmentKind};

/// Something observable happened to an event or its members.
///
/// Serialized payloads are what an edge service would fan out to
/// member devices.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DomainEvent {
    EventSubmitted {
        event_id: Uuid,
    },
    EventApproved {
        event_id: Uuid,
    },
    EventRejected {
        event_id: Uuid,
        reason: String,
    },
    EventStarted {
        event_id: Uuid,
        slot_count: usize,
    },
    EventCompleted {
        event_id: Uuid,
    },
    EnrollmentConfirmed {
        event_id: Uuid,
        user_id: Uuid,
        enrollment_kind: EnrollmentKind,
    },
    EnrollmentCancelled {
        event_id: Uuid,
        user_id: Uuid,
        refund_amount: i64,
    },
    LeaderAssigned {
        event_id: Uuid,
        slot_id: Uuid,
        leader_id: Uuid,
        day_number: i32,
    },
    LeaderReassigned {
        event_id: Uuid,
        slot_id: Uuid,
        prior_leader_id: Option<Uuid>,
        new_leader_id: Uuid,
    },
    CheckInRecorded {
        event_id: Uuid,
        slot_id: Uuid,
        user_id: Uuid,
    },
    ContentPublished {
        event_id: Uuid,
        slot_id: Uuid,
        publisher_id: Uuid,
    },
    /// `giver_id` is `None` for anonymous gives; recipients only
    /// ever see what this payload carries.
    FlowerReceived {
        event_id: Uuid,
        recipient_id: Uuid,
        giver_id: Option<Uuid>,
        amount: i32,
    },
    DailyStatReady {
        event_id: Uuid,
        stat_date: NaiveDate,
        total_flowers: i32,
        total_check_ins: i32,
    },
    CertificateIssued {
        event_id: Uuid,
        user_id: Uuid,
        certificate_kind: CertificateKind,
        serial: String,
    },
}

/// Sink for domain events.
pub trait Notifier: Send + Sync {
    fn publish(&self, event: DomainEvent);
}

/// Logs each event as a single JSON line.
#[derive(Debug, Default, Clone)]
pub struct LoggingNotifier;

impl Notifier for LoggingNotifier {
    fn publish(&self, event: DomainEvent) {
        match serde_json::to_string(&event) {
            Ok(payload) => info!("Domain event: {}", payload),
            Err(_) => info!("Domain event: {:?}", event),
        }
    }
}

/// Captures events in memory so tests can assert on emission.
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    events: Mutex<Vec<DomainEvent>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything published so far, in emission order.
    pub fn recorded(&self) -> Vec<DomainEvent> {
        self.lock().clone()
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<DomainEvent>> {
        // A panic while holding the guard only poisons test state.
        self.events.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Notifier for RecordingNotifier {
    fn publish(&self, event: DomainEvent) {
        self.lock().push(event);
    }
}
