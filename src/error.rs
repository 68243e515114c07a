//! # Error Types
//!
//! The single error taxonomy every club operation speaks. Race losers
//! get their own variants (capacity, quota, duplicate claims) so that
//! callers can tell "you lost a fair race" apart from "your request
//! was invalid" and render each appropriately.

use thiserror::Error;

use crate::db::DatabaseError;

/// Errors produced by club operations.
///
/// Every mutation either fully applies or returns one of these with
/// no partial state left behind.
#[derive(Debug, Error)]
pub enum ClubError {
    /// A request field failed validation.
    #[error("Invalid {field}: {reason}")]
    Validation {
        field: &'static str,
        reason: String,
    },

    /// The operation is not valid for the entity's current state.
    #[error("State conflict: {0}")]
    StateConflict(String),

    /// The event's participant capacity is already full.
    #[error("Event is full: capacity of {capacity} reached")]
    CapacityExceeded { capacity: i32 },

    /// The giver's daily flower quota cannot cover the requested amount.
    #[error("Daily flower quota exhausted: {used} of {max} used")]
    QuotaExceeded { used: i32, max: i32 },

    /// The actor may not perform this operation (wrong role, not an
    /// enrolled participant, or outside the permission window).
    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    /// The slot already has an assigned leader.
    #[error("Slot already has a leader")]
    DuplicateAssignment,

    /// The member already checked in for this slot.
    #[error("Already checked in for this slot")]
    DuplicateCheckIn,

    /// The check-in already received its flower.
    #[error("Check-in already received a flower")]
    DuplicateFlower,

    /// The user already holds an active enrollment for this event.
    #[error("Already enrolled in this event")]
    AlreadyEnrolled,

    /// A referenced entity does not exist.
    #[error("{0} not found")]
    NotFound(&'static str),

    /// Storage layer failure.
    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),
}

impl ClubError {
    /// Convenience constructor for validation failures.
    pub fn validation(field: &'static str, reason: impl Into<String>) -> Self {
        ClubError::Validation {
            field,
            reason: reason.into(),
        }
    }

    /// Convenience constructor for state conflicts.
    pub fn conflict(reason: impl Into<String>) -> Self {
        ClubError::StateConflict(reason.into())
    }
}

/// Result alias used throughout the services.
pub type ClubResult<T> = Result<T, ClubError>;
