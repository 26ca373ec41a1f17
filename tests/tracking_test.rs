//! Tracking point storage and proximity queries against SQLite storage.

use std::sync::Arc;

use pattern_discovery::config::Config;
use pattern_discovery::geo::GeoPoint;
use pattern_discovery::storage::{SharedStorage, SqliteStorage, TrackingType};
use pattern_discovery::PatternDiscovery;
use pretty_assertions::assert_eq;
use serde_json::json;

// Stockholm, Stortorget
const CENTER: GeoPoint = GeoPoint {
    latitude: 59.3250,
    longitude: 18.0707,
};

// ~0.5 km north of CENTER
const NEAR: GeoPoint = GeoPoint {
    latitude: 59.3295,
    longitude: 18.0707,
};

// ~5.5 km north of CENTER
const FAR: GeoPoint = GeoPoint {
    latitude: 59.3750,
    longitude: 18.0707,
};

async fn setup() -> (PatternDiscovery, SharedStorage) {
    let storage: SharedStorage = Arc::new(
        SqliteStorage::new_in_memory()
            .await
            .expect("Failed to create in-memory storage"),
    );
    (
        PatternDiscovery::new(Config::in_memory(), storage.clone()),
        storage,
    )
}

#[tokio::test]
async fn test_session_points_filter_by_type_and_keep_metadata() {
    let (discovery, storage) = setup().await;
    let tracked = discovery
        .record_tracking_point("s1", NEAR, TrackingType::Tracking, None)
        .await
        .unwrap();
    let saved = discovery
        .record_tracking_point(
            "s1",
            CENTER,
            TrackingType::Saved,
            Some(json!({"accuracy": 4.5, "source": "gps"})),
        )
        .await
        .unwrap();
    discovery
        .record_tracking_point("s2", CENTER, TrackingType::Saved, None)
        .await
        .unwrap();

    let all = storage
        .get_session_tracking_points("s1", None)
        .await
        .unwrap();
    let ids: Vec<&str> = all.iter().map(|p| p.id.as_str()).collect();
    assert_eq!(ids, vec![tracked.id.as_str(), saved.id.as_str()]);
    assert!(all.iter().all(|p| p.session_id == "s1"));

    let only_saved = storage
        .get_session_tracking_points("s1", Some(TrackingType::Saved))
        .await
        .unwrap();
    assert_eq!(only_saved.len(), 1);
    assert_eq!(only_saved[0].id, saved.id);
    assert_eq!(only_saved[0].point_type, TrackingType::Saved);
    assert_eq!(
        only_saved[0].metadata,
        Some(json!({"accuracy": 4.5, "source": "gps"}))
    );

    assert_eq!(all[0].metadata, None);
    assert!(storage
        .get_session_tracking_points("s1", Some(TrackingType::Analyzed))
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn test_nearby_tracking_points_by_radius() {
    let (discovery, _) = setup().await;
    let near = discovery
        .record_tracking_point("s1", NEAR, TrackingType::Tracking, None)
        .await
        .unwrap();
    let far = discovery
        .record_tracking_point("s1", FAR, TrackingType::Tracking, None)
        .await
        .unwrap();
    discovery
        .record_tracking_point("s2", CENTER, TrackingType::Tracking, None)
        .await
        .unwrap();

    // default radius is 1 km
    let found = discovery
        .nearby_tracking_points("s1", CENTER, None, None)
        .await
        .unwrap();
    let ids: Vec<&str> = found.iter().map(|p| p.id.as_str()).collect();
    assert_eq!(ids, vec![near.id.as_str()]);

    let found = discovery
        .nearby_tracking_points("s1", CENTER, Some(10.0), None)
        .await
        .unwrap();
    let ids: Vec<&str> = found.iter().map(|p| p.id.as_str()).collect();
    assert_eq!(ids, vec![near.id.as_str(), far.id.as_str()]);

    assert!(discovery
        .nearby_tracking_points("s1", CENTER, Some(10.0), Some(TrackingType::Saved))
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn test_tracking_point_rejects_invalid_coordinates() {
    let (discovery, _) = setup().await;
    let result = discovery
        .record_tracking_point(
            "s1",
            GeoPoint {
                latitude: 0.0,
                longitude: 181.0,
            },
            TrackingType::Tracking,
            None,
        )
        .await;
    assert!(result.is_err());
}
