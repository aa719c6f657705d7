//! User domain model.
//!
//! Owners of events. Kept minimal: identity, a display name and the
//! presence flag added by the second schema migration.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Stable identifier for a user record.
pub type UserId = Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// Stable global ID referenced by owned events.
    pub uuid: UserId,
    pub display_name: String,
    /// Presence flag; defaults to offline.
    pub online: bool,
}

impl User {
    /// Creates a new offline user with a generated stable ID.
    pub fn new(display_name: impl Into<String>) -> Self {
        Self::with_id(Uuid::new_v4(), display_name)
    }

    /// Creates a user with a caller-provided stable ID.
    ///
    /// Used by import paths where identity already exists externally.
    pub fn with_id(uuid: UserId, display_name: impl Into<String>) -> Self {
        Self {
            uuid,
            display_name: display_name.into(),
            online: false,
        }
    }
}
