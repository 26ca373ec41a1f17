//! Per-session summary counters.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::StorageResult;
use crate::storage::SharedStorage;

/// Rollup counters for one session
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionStats {
    /// Suggestions across every location the session recorded
    pub suggested_patterns: u64,
    /// Vote rows cast by the session
    pub votes_contributed: u64,
    /// Size of the whole pattern catalog; not session-scoped
    pub offline_patterns: u64,
}

/// Computes [`SessionStats`] from storage on every call.
#[derive(Clone)]
pub struct StatsReporter {
    storage: SharedStorage,
}

impl StatsReporter {
    /// Create a reporter over `storage`
    pub fn new(storage: SharedStorage) -> Self {
        Self { storage }
    }

    /// Recompute the counters for a session.
    pub async fn get_stats(&self, session_id: &str) -> StorageResult<SessionStats> {
        let votes_contributed = self.storage.count_session_votes(session_id).await?;

        let locations = self.storage.get_session_locations(session_id).await?;
        let mut suggested_patterns = 0;
        for location in &locations {
            suggested_patterns += self.storage.count_location_suggestions(&location.id).await?;
        }

        let offline_patterns = self.storage.count_patterns().await?;

        debug!(
            session_id,
            locations = locations.len(),
            suggested_patterns,
            votes_contributed,
            offline_patterns,
            "Computed session stats"
        );

        Ok(SessionStats {
            suggested_patterns,
            votes_contributed,
            offline_patterns,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StorageError;
    use crate::geo::GeoPoint;
    use crate::storage::{Location, MockStorage};
    use std::sync::Arc;

    #[tokio::test]
    async fn test_stats_compose_storage_counts() {
        let here = GeoPoint {
            latitude: 1.0,
            longitude: 1.0,
        };
        let first = Location::new("s1", here);
        let second = Location::new("s1", here);
        let first_id = first.id.clone();

        let mut mock = MockStorage::new();
        mock.expect_count_session_votes().returning(|_| Ok(4));
        mock.expect_get_session_locations()
            .returning(move |_| Ok(vec![first.clone(), second.clone()]));
        mock.expect_count_location_suggestions()
            .returning(move |id| Ok(if id == first_id { 3 } else { 1 }));
        mock.expect_count_patterns().returning(|| Ok(253));

        let stats = StatsReporter::new(Arc::new(mock)).get_stats("s1").await.unwrap();
        assert_eq!(
            stats,
            SessionStats {
                suggested_patterns: 4,
                votes_contributed: 4,
                offline_patterns: 253,
            }
        );
    }

    #[tokio::test]
    async fn test_catalog_count_failure_propagates() {
        let mut mock = MockStorage::new();
        mock.expect_count_session_votes().returning(|_| Ok(0));
        mock.expect_get_session_locations().returning(|_| Ok(vec![]));
        mock.expect_count_patterns().returning(|| {
            Err(StorageError::Connection {
                message: "closed".to_string(),
            })
        });

        let err = StatsReporter::new(Arc::new(mock))
            .get_stats("s1")
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::Connection { .. }));
    }

    #[test]
    fn test_serializes_camel_case() {
        let value = serde_json::to_value(SessionStats::default()).unwrap();
        assert_eq!(value["offlinePatterns"], 0);
        assert_eq!(value["suggestedPatterns"], 0);
        assert_eq!(value["votesContributed"], 0);
    }
}
