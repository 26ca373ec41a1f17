//! Append-only activity trail, read newest first.

use crate::error::{StorageResult, ValidationError};
use crate::storage::{Activity, ActivityType, SharedStorage};

/// Default number of entries returned by [`ActivityFeed::recent`] callers.
pub const DEFAULT_ACTIVITY_LIMIT: u32 = 20;

/// Writes and reads the audit trail.
#[derive(Clone)]
pub struct ActivityFeed {
    storage: SharedStorage,
}

impl ActivityFeed {
    /// Create a feed over `storage`
    pub fn new(storage: SharedStorage) -> Self {
        Self { storage }
    }

    /// Append an entry.
    pub async fn record(
        &self,
        session_id: &str,
        activity_type: ActivityType,
        description: impl Into<String>,
        location_id: Option<&str>,
    ) -> StorageResult<Activity> {
        let mut activity = Activity::new(session_id, activity_type, description);
        if let Some(location_id) = location_id {
            activity = activity.with_location(location_id);
        }
        self.storage.create_activity(&activity).await?;
        Ok(activity)
    }

    /// Up to `limit` most recent entries for a session, newest first.
    pub async fn recent(&self, session_id: &str, limit: u32) -> StorageResult<Vec<Activity>> {
        self.storage.get_recent_activities(session_id, limit).await
    }
}

/// Reject empty session identifiers before they reach storage.
pub(crate) fn require_session(session_id: &str) -> Result<(), ValidationError> {
    if session_id.trim().is_empty() {
        return Err(ValidationError::EmptyField {
            field: "session_id",
        });
    }
    Ok(())
}
