//! Storage layer for locations, patterns, suggestions and votes.
//!
//! [`Storage`] is the persistence collaborator every component receives at
//! construction; [`SqliteStorage`] is the SQLite-backed implementation.

mod sqlite;

#[cfg(test)]
#[path = "types_tests.rs"]
mod types_tests;

pub use sqlite::SqliteStorage;

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::StorageResult;
use crate::geo::{GeoPoint, Geotagged};

/// Shared handle to the persistence collaborator.
pub type SharedStorage = Arc<dyn Storage>;

/// A place of interest recorded by a session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    /// Unique location identifier.
    pub id: String,
    /// Latitude in degrees.
    pub latitude: f64,
    /// Longitude in degrees.
    pub longitude: f64,
    /// Optional human-readable name.
    pub name: Option<String>,
    /// Session that recorded the location.
    pub session_id: String,
    /// When the location was recorded.
    pub created_at: DateTime<Utc>,
}

/// Raw movement sample attached to a session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackingPoint {
    /// Unique point identifier.
    pub id: String,
    /// Latitude in degrees.
    pub latitude: f64,
    /// Longitude in degrees.
    pub longitude: f64,
    /// Kind of sample.
    pub point_type: TrackingType,
    /// Session that produced the sample.
    pub session_id: String,
    /// Opaque key/value blob.
    pub metadata: Option<serde_json::Value>,
    /// When the sample was stored.
    pub created_at: DateTime<Utc>,
}

/// Kind of tracking sample.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrackingType {
    /// Live movement sample.
    #[default]
    Tracking,
    /// Sample that has gone through analysis.
    Analyzed,
    /// Sample the user explicitly kept.
    Saved,
}

impl std::fmt::Display for TrackingType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TrackingType::Tracking => write!(f, "tracking"),
            TrackingType::Analyzed => write!(f, "analyzed"),
            TrackingType::Saved => write!(f, "saved"),
        }
    }
}

impl std::str::FromStr for TrackingType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "tracking" => Ok(TrackingType::Tracking),
            "analyzed" => Ok(TrackingType::Analyzed),
            "saved" => Ok(TrackingType::Saved),
            _ => Err(format!("Unknown tracking type: {}", s)),
        }
    }
}

/// A catalogued design pattern.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pattern {
    /// Unique pattern identifier.
    #[serde(default = "new_id")]
    pub id: String,
    /// Catalog number, unique across the catalog.
    pub number: i64,
    /// Pattern name.
    pub name: String,
    /// Short description.
    pub description: String,
    /// Long-form description.
    #[serde(default)]
    pub full_description: String,
    /// Catalog category (e.g. "towns", "buildings").
    pub category: String,
    /// Search keywords.
    #[serde(default)]
    pub keywords: Vec<String>,
    /// Icon identifier for clients.
    #[serde(default)]
    pub icon_name: String,
    /// Display color for clients.
    #[serde(default)]
    pub mood_color: String,
}

fn new_id() -> String {
    Uuid::new_v4().to_string()
}

/// A recommendation linking one location to one pattern.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatternSuggestion {
    /// Unique suggestion identifier.
    pub id: String,
    /// Location the suggestion was made for.
    pub location_id: String,
    /// Suggested pattern.
    pub pattern_id: String,
    /// Algorithmic prior in 0..1, stored as decimal text.
    pub confidence: String,
    /// Name of the algorithm that produced the suggestion.
    pub ml_algorithm: String,
    /// When the suggestion was created.
    pub created_at: DateTime<Utc>,
}

/// Direction of a vote.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VoteType {
    /// Endorses the suggestion.
    Up,
    /// Rejects the suggestion.
    Down,
}

impl std::fmt::Display for VoteType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            VoteType::Up => write!(f, "up"),
            VoteType::Down => write!(f, "down"),
        }
    }
}

impl std::str::FromStr for VoteType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "up" => Ok(VoteType::Up),
            "down" => Ok(VoteType::Down),
            _ => Err(format!("Unknown vote type: {}", s)),
        }
    }
}

/// A ledger entry for one vote on one suggestion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Vote {
    /// Unique vote identifier.
    pub id: String,
    /// Suggestion voted on.
    pub suggestion_id: String,
    /// Session that cast the vote.
    pub session_id: String,
    /// Direction of the vote.
    pub vote_type: VoteType,
    /// Significance derived from time spent; never negative.
    pub weight: f64,
    /// Location the vote was cast from, if known.
    pub location_id: Option<String>,
    /// Minutes spent at the location before voting.
    pub time_spent_minutes: u32,
    /// When the vote was cast.
    pub created_at: DateTime<Utc>,
}

/// Kind of audit trail entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityType {
    /// A vote was cast.
    Vote,
    /// A suggestion was produced.
    Suggestion,
    /// A location was visited or recorded.
    Visit,
}

impl std::fmt::Display for ActivityType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ActivityType::Vote => write!(f, "vote"),
            ActivityType::Suggestion => write!(f, "suggestion"),
            ActivityType::Visit => write!(f, "visit"),
        }
    }
}

impl std::str::FromStr for ActivityType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "vote" => Ok(ActivityType::Vote),
            "suggestion" => Ok(ActivityType::Suggestion),
            "visit" => Ok(ActivityType::Visit),
            _ => Err(format!("Unknown activity type: {}", s)),
        }
    }
}

/// Append-only audit trail entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Activity {
    /// Unique activity identifier.
    pub id: String,
    /// Kind of activity.
    pub activity_type: ActivityType,
    /// Human-readable description.
    pub description: String,
    /// Related location, if any.
    pub location_id: Option<String>,
    /// Session the activity belongs to.
    pub session_id: String,
    /// When the activity happened.
    pub created_at: DateTime<Utc>,
}

// ============================================================================
// Builders
// ============================================================================

impl Location {
    /// Create a new location at a point for a session.
    pub fn new(session_id: impl Into<String>, point: GeoPoint) -> Self {
        Self {
            id: new_id(),
            latitude: point.latitude,
            longitude: point.longitude,
            name: None,
            session_id: session_id.into(),
            created_at: Utc::now(),
        }
    }

    /// Set the name
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }
}

impl Geotagged for Location {
    fn point(&self) -> GeoPoint {
        GeoPoint {
            latitude: self.latitude,
            longitude: self.longitude,
        }
    }
}

impl TrackingPoint {
    /// Create a new tracking sample.
    pub fn new(session_id: impl Into<String>, point: GeoPoint, point_type: TrackingType) -> Self {
        Self {
            id: new_id(),
            latitude: point.latitude,
            longitude: point.longitude,
            point_type,
            session_id: session_id.into(),
            metadata: None,
            created_at: Utc::now(),
        }
    }

    /// Set metadata
    pub fn with_metadata(mut self, metadata: serde_json::Value) -> Self {
        self.metadata = Some(metadata);
        self
    }
}

impl Geotagged for TrackingPoint {
    fn point(&self) -> GeoPoint {
        GeoPoint {
            latitude: self.latitude,
            longitude: self.longitude,
        }
    }
}

impl Pattern {
    /// Create a new catalog entry with empty presentation fields.
    pub fn new(
        number: i64,
        name: impl Into<String>,
        description: impl Into<String>,
        category: impl Into<String>,
    ) -> Self {
        Self {
            id: new_id(),
            number,
            name: name.into(),
            description: description.into(),
            full_description: String::new(),
            category: category.into(),
            keywords: Vec::new(),
            icon_name: String::new(),
            mood_color: String::new(),
        }
    }

    /// Set the long-form description.
    pub fn with_full_description(mut self, full_description: impl Into<String>) -> Self {
        self.full_description = full_description.into();
        self
    }

    /// Set the keywords.
    pub fn with_keywords<I, K>(mut self, keywords: I) -> Self
    where
        I: IntoIterator<Item = K>,
        K: Into<String>,
    {
        self.keywords = keywords.into_iter().map(Into::into).collect();
        self
    }

    /// Set the icon and color used by clients.
    pub fn with_presentation(
        mut self,
        icon_name: impl Into<String>,
        mood_color: impl Into<String>,
    ) -> Self {
        self.icon_name = icon_name.into();
        self.mood_color = mood_color.into();
        self
    }
}

impl PatternSuggestion {
    /// Create a new suggestion. Confidence is clamped to 0..1.
    pub fn new(
        location_id: impl Into<String>,
        pattern_id: impl Into<String>,
        confidence: f64,
        ml_algorithm: impl Into<String>,
    ) -> Self {
        Self {
            id: new_id(),
            location_id: location_id.into(),
            pattern_id: pattern_id.into(),
            confidence: confidence.clamp(0.0, 1.0).to_string(),
            ml_algorithm: ml_algorithm.into(),
            created_at: Utc::now(),
        }
    }

    /// Set the stored confidence text verbatim.
    pub fn with_raw_confidence(mut self, confidence: impl Into<String>) -> Self {
        self.confidence = confidence.into();
        self
    }
}

impl Activity {
    /// Create a new activity entry.
    pub fn new(
        session_id: impl Into<String>,
        activity_type: ActivityType,
        description: impl Into<String>,
    ) -> Self {
        Self {
            id: new_id(),
            activity_type,
            description: description.into(),
            location_id: None,
            session_id: session_id.into(),
            created_at: Utc::now(),
        }
    }

    /// Set the related location
    pub fn with_location(mut self, location_id: impl Into<String>) -> Self {
        self.location_id = Some(location_id.into());
        self
    }
}

// ============================================================================
// Storage Trait
// ============================================================================

/// Persistence collaborator used by every component.
///
/// Implementations must be safe to share between concurrent callers;
/// the core keeps no cache of its own.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Storage: Send + Sync {
    // Location operations
    /// Insert a new location.
    async fn create_location(&self, location: &Location) -> StorageResult<()>;
    /// Get a location by ID.
    async fn get_location(&self, id: &str) -> StorageResult<Option<Location>>;
    /// Get every location a session recorded, oldest first.
    async fn get_session_locations(&self, session_id: &str) -> StorageResult<Vec<Location>>;
    /// Get every stored location, oldest first.
    async fn get_all_locations(&self) -> StorageResult<Vec<Location>>;

    // Tracking point operations
    /// Append a tracking point.
    async fn create_tracking_point(&self, point: &TrackingPoint) -> StorageResult<()>;
    /// Get a session's tracking points, oldest first, optionally of one type.
    async fn get_session_tracking_points(
        &self,
        session_id: &str,
        point_type: Option<TrackingType>,
    ) -> StorageResult<Vec<TrackingPoint>>;

    // Pattern catalog operations
    /// Insert a catalog entry.
    async fn create_pattern(&self, pattern: &Pattern) -> StorageResult<()>;
    /// Get a pattern by ID.
    async fn get_pattern(&self, id: &str) -> StorageResult<Option<Pattern>>;
    /// Get a pattern by catalog number.
    async fn get_pattern_by_number(&self, number: i64) -> StorageResult<Option<Pattern>>;
    /// Get the whole catalog ordered by number.
    async fn get_all_patterns(&self) -> StorageResult<Vec<Pattern>>;
    /// Count catalog entries.
    async fn count_patterns(&self) -> StorageResult<u64>;

    // Suggestion operations
    /// Insert a suggestion.
    async fn create_suggestion(&self, suggestion: &PatternSuggestion) -> StorageResult<()>;
    /// Get a location's suggestions joined to their patterns, in insertion order.
    ///
    /// Suggestions whose pattern no longer exists are not returned.
    async fn get_location_suggestions_with_patterns(
        &self,
        location_id: &str,
    ) -> StorageResult<Vec<(PatternSuggestion, Pattern)>>;
    /// Count suggestion rows for a location.
    async fn count_location_suggestions(&self, location_id: &str) -> StorageResult<u64>;

    // Vote operations
    /// Append a vote row.
    async fn create_vote(&self, vote: &Vote) -> StorageResult<()>;
    /// Overwrite an existing vote row identified by `vote.id`.
    async fn update_vote(&self, vote: &Vote) -> StorageResult<()>;
    /// Get every vote on a suggestion.
    async fn get_suggestion_votes(&self, suggestion_id: &str) -> StorageResult<Vec<Vote>>;
    /// Get a session's most recent vote on a suggestion.
    async fn get_user_vote(
        &self,
        suggestion_id: &str,
        session_id: &str,
    ) -> StorageResult<Option<Vote>>;
    /// Count vote rows cast by a session.
    async fn count_session_votes(&self, session_id: &str) -> StorageResult<u64>;

    // Activity operations
    /// Append an activity entry.
    async fn create_activity(&self, activity: &Activity) -> StorageResult<()>;
    /// Get a session's most recent activities, newest first.
    async fn get_recent_activities(
        &self,
        session_id: &str,
        limit: u32,
    ) -> StorageResult<Vec<Activity>>;
}
