//! Unit tests for storage types and builder patterns.

use super::*;
use serde_json::json;

fn point() -> GeoPoint {
    GeoPoint {
        latitude: 52.52,
        longitude: 13.405,
    }
}

// ============================================================================
// Location / TrackingPoint tests
// ============================================================================

#[test]
fn test_location_new() {
    let location = Location::new("sess-1", point());
    assert!(!location.id.is_empty());
    assert_eq!(location.session_id, "sess-1");
    assert!(location.name.is_none());
    assert_eq!(location.point(), point());
}

#[test]
fn test_location_with_name() {
    let location = Location::new("sess-1", point()).with_name("Market square");
    assert_eq!(location.name.as_deref(), Some("Market square"));
}

#[test]
fn test_tracking_point_with_metadata() {
    let tp = TrackingPoint::new("sess-1", point(), TrackingType::Saved)
        .with_metadata(json!({"accuracy": 4.5}));
    assert_eq!(tp.point_type, TrackingType::Saved);
    assert_eq!(tp.metadata.unwrap()["accuracy"], 4.5);
}

// ============================================================================
// Pattern / Suggestion tests
// ============================================================================

#[test]
fn test_pattern_builders() {
    let pattern = Pattern::new(61, "Small Public Squares", "A square for gathering", "towns")
        .with_full_description("Long text")
        .with_keywords(["square", "public"])
        .with_presentation("square", "#88aa55");
    assert_eq!(pattern.number, 61);
    assert_eq!(pattern.keywords, vec!["square", "public"]);
    assert_eq!(pattern.icon_name, "square");
    assert_eq!(pattern.mood_color, "#88aa55");
    assert_eq!(pattern.full_description, "Long text");
}

#[test]
fn test_pattern_deserializes_catalog_entry_without_id() {
    let pattern: Pattern = serde_json::from_value(json!({
        "number": 88,
        "name": "Street Cafe",
        "description": "A place to sit",
        "category": "towns",
        "iconName": "coffee"
    }))
    .unwrap();
    assert!(!pattern.id.is_empty());
    assert_eq!(pattern.icon_name, "coffee");
    assert!(pattern.keywords.is_empty());
}

#[test]
fn test_suggestion_confidence_clamped_and_textual() {
    let s = PatternSuggestion::new("loc-1", "pat-1", 0.85, "knn");
    assert_eq!(s.confidence, "0.85");

    let high = PatternSuggestion::new("loc-1", "pat-1", 1.7, "knn");
    assert_eq!(high.confidence, "1");
}

#[test]
fn test_suggestion_with_raw_confidence() {
    let s = PatternSuggestion::new("loc-1", "pat-1", 0.5, "knn").with_raw_confidence("0.750");
    assert_eq!(s.confidence, "0.750");
}

// ============================================================================
// Enum tests
// ============================================================================

#[test]
fn test_vote_type_round_trip_text() {
    assert_eq!(VoteType::Up.to_string(), "up");
    assert_eq!("DOWN".parse::<VoteType>(), Ok(VoteType::Down));
    assert!("sideways".parse::<VoteType>().is_err());
}

#[test]
fn test_tracking_type_from_str() {
    assert_eq!("analyzed".parse::<TrackingType>(), Ok(TrackingType::Analyzed));
    assert!("moving".parse::<TrackingType>().is_err());
}

#[test]
fn test_activity_type_serializes_snake_case() {
    assert_eq!(serde_json::to_value(ActivityType::Visit).unwrap(), json!("visit"));
    assert_eq!("suggestion".parse::<ActivityType>(), Ok(ActivityType::Suggestion));
}

#[test]
fn test_activity_with_location() {
    let activity = Activity::new("sess-1", ActivityType::Visit, "Visited").with_location("loc-9");
    assert_eq!(activity.location_id.as_deref(), Some("loc-9"));
    assert_eq!(activity.activity_type, ActivityType::Visit);
}
