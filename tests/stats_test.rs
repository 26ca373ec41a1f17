//! Session stats against SQLite storage.

use std::sync::Arc;

use pattern_discovery::config::Config;
use pattern_discovery::geo::GeoPoint;
use pattern_discovery::stats::{SessionStats, StatsReporter};
use pattern_discovery::storage::{Pattern, SharedStorage, SqliteStorage, VoteType};
use pattern_discovery::{PatternDiscovery, VoteInput};
use pretty_assertions::assert_eq;

fn point(offset: f64) -> GeoPoint {
    GeoPoint {
        latitude: 45.0 + offset,
        longitude: 7.0,
    }
}

#[tokio::test]
async fn test_stats_scenario() {
    let storage: SharedStorage = Arc::new(SqliteStorage::new_in_memory().await.unwrap());
    let discovery = PatternDiscovery::new(Config::in_memory(), storage.clone());

    let catalog: Vec<Pattern> = (1..=253)
        .map(|n| Pattern::new(n, format!("Pattern {}", n), "desc", "catalog"))
        .collect();
    discovery.import_catalog(catalog).await.unwrap();
    let patterns = storage.get_all_patterns().await.unwrap();

    let first = discovery.record_location("s1", point(0.0), None).await.unwrap();
    let second = discovery.record_location("s1", point(0.1), None).await.unwrap();
    let other = discovery.record_location("s2", point(0.2), None).await.unwrap();

    let mut suggestions = Vec::new();
    for (location, count) in [(&first, 3), (&second, 1), (&other, 2)] {
        for pattern in patterns.iter().take(count) {
            suggestions.push(
                discovery
                    .suggest_pattern(&location.id, &pattern.id, 0.5, "knn")
                    .await
                    .unwrap(),
            );
        }
    }

    for suggestion in suggestions.iter().take(4) {
        discovery
            .cast_vote(VoteInput::new(&suggestion.id, "s1", VoteType::Up))
            .await
            .unwrap();
    }
    discovery
        .cast_vote(VoteInput::new(&suggestions[0].id, "s2", VoteType::Down))
        .await
        .unwrap();

    let stats = StatsReporter::new(storage).get_stats("s1").await.unwrap();
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
async fn test_unknown_session_has_zero_counts_but_catalog_size() {
    let storage: SharedStorage = Arc::new(SqliteStorage::new_in_memory().await.unwrap());
    let discovery = PatternDiscovery::new(Config::in_memory(), storage);
    discovery
        .import_catalog(vec![
            Pattern::new(1, "Independent Regions", "desc", "towns"),
            Pattern::new(2, "The Distribution of Towns", "desc", "towns"),
        ])
        .await
        .unwrap();

    let stats = discovery.stats("nobody").await.unwrap();
    assert_eq!(
        stats,
        SessionStats {
            suggested_patterns: 0,
            votes_contributed: 0,
            offline_patterns: 2,
        }
    );
}

#[tokio::test]
async fn test_duplicate_votes_count_as_contributions() {
    let storage: SharedStorage = Arc::new(SqliteStorage::new_in_memory().await.unwrap());
    let discovery = PatternDiscovery::new(Config::in_memory(), storage);
    for _ in 0..3 {
        discovery
            .cast_vote(VoteInput::new("sug", "s1", VoteType::Up))
            .await
            .unwrap();
    }
    assert_eq!(discovery.stats("s1").await.unwrap().votes_contributed, 3);
}
