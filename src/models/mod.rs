//! # Operation Models
//!
//! Inputs and outputs of the service layer. These are separate from
//! the database records so callers (HTTP edge, jobs, demo) see shaped
//! payloads rather than raw rows.
//!
//! ## Organization
//!
//! - `requests.rs` - Operation inputs
//! - `responses.rs` - Shaped operation outputs
//!
//! ## Serialization
//!
//! All models use Serde. Field names are converted to camelCase for
//! JavaScript clients; status enums keep their snake_case database
//! strings as values.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub mod requests;
pub mod responses;

pub use requests::*;
pub use responses::*;

/// Who is calling.
///
/// Authentication happens at the edge; by the time a call reaches the
/// services only these three facts matter.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRef {
    /// The caller's user ID.
    pub id: Uuid,

    /// Display name, captured onto enrollments and leaderboards.
    pub display_name: String,

    /// Admin capability flag. Grants approve/reject and unrestricted
    /// reassignment.
    pub is_admin: bool,
}

impl UserRef {
    pub fn new(id: Uuid, display_name: impl Into<String>) -> Self {
        Self {
            id,
            display_name: display_name.into(),
            is_admin: false,
        }
    }

    /// The job runner's identity: nil UUID, admin capability.
    pub fn system() -> Self {
        Self {
            id: Uuid::nil(),
            display_name: "system".to_string(),
            is_admin: true,
        }
    }
}
