//! Facade wiring every component over one shared storage handle.

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::activity::{require_session, ActivityFeed};
use crate::config::Config;
use crate::error::{AppError, AppResult, StorageResult, ValidationError};
use crate::geo::{GeoPoint, NearbySearch};
use crate::stats::{SessionStats, StatsReporter};
use crate::storage::{
    Activity, ActivityType, Location, Pattern, PatternSuggestion, SharedStorage, TrackingPoint,
    TrackingType, Vote,
};
use crate::suggestions::{PatternWithVotes, SuggestionAggregator};
use crate::votes::{VoteInput, VoteLedger};

/// Outcome of a catalog import.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportSummary {
    /// Entries written
    pub inserted: u64,
    /// Entries whose number was already in the catalog
    pub skipped: u64,
}

/// Entry point for hosting services.
///
/// Holds no state beyond configuration and the storage handle; every
/// query recomputes from storage.
#[derive(Clone)]
pub struct PatternDiscovery {
    config: Config,
    storage: SharedStorage,
    ledger: VoteLedger,
    aggregator: SuggestionAggregator,
    stats: StatsReporter,
    nearby: NearbySearch,
    activity: ActivityFeed,
}

impl PatternDiscovery {
    /// Wire the components over `storage`
    pub fn new(config: Config, storage: SharedStorage) -> Self {
        let ledger = VoteLedger::with_mode(storage.clone(), config.voting.mode);
        let aggregator = SuggestionAggregator::new(storage.clone(), ledger.clone());

        info!(
            vote_mode = ?config.voting.mode,
            default_radius_km = config.proximity.default_radius_km,
            "Pattern discovery initialized"
        );

        Self {
            stats: StatsReporter::new(storage.clone()),
            nearby: NearbySearch::new(storage.clone()),
            activity: ActivityFeed::new(storage.clone()),
            config,
            storage,
            ledger,
            aggregator,
        }
    }

    /// Active configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Shared storage handle
    pub fn storage(&self) -> &SharedStorage {
        &self.storage
    }

    /// Vote ledger in the configured mode
    pub fn ledger(&self) -> &VoteLedger {
        &self.ledger
    }

    /// Suggestion aggregator
    pub fn aggregator(&self) -> &SuggestionAggregator {
        &self.aggregator
    }

    fn check_point(&self, point: &GeoPoint) -> AppResult<()> {
        if self.config.proximity.validate_coordinates {
            point.validate()?;
        }
        Ok(())
    }

    fn resolve_radius(&self, radius_km: Option<f64>) -> AppResult<f64> {
        let radius_km = radius_km.unwrap_or(self.config.proximity.default_radius_km);
        if radius_km.is_nan() {
            return Err(ValidationError::InvalidRadius { value: radius_km }.into());
        }
        Ok(radius_km)
    }

    /// Append to the activity trail. The primary row is already stored, so a
    /// failed trail write is logged, not returned.
    async fn log_activity(
        &self,
        session_id: &str,
        activity_type: ActivityType,
        description: String,
        location_id: Option<&str>,
    ) {
        if let Err(e) = self
            .activity
            .record(session_id, activity_type, description, location_id)
            .await
        {
            warn!(
                error = %e,
                session_id,
                activity_type = %activity_type,
                "Failed to record activity"
            );
        }
    }

    /// Record a place of interest and log the visit.
    pub async fn record_location(
        &self,
        session_id: &str,
        point: GeoPoint,
        name: Option<String>,
    ) -> AppResult<Location> {
        require_session(session_id)?;
        self.check_point(&point)?;

        let mut location = Location::new(session_id, point);
        if let Some(name) = name {
            location = location.with_name(name);
        }
        self.storage.create_location(&location).await?;

        let description = match &location.name {
            Some(name) => format!("Visited {}", name),
            None => format!(
                "Visited {:.5}, {:.5}",
                location.latitude, location.longitude
            ),
        };
        self.log_activity(
            session_id,
            ActivityType::Visit,
            description,
            Some(&location.id),
        )
        .await;

        info!(location_id = %location.id, session_id, "Location recorded");
        Ok(location)
    }

    /// Append a raw tracking sample.
    pub async fn record_tracking_point(
        &self,
        session_id: &str,
        point: GeoPoint,
        point_type: TrackingType,
        metadata: Option<serde_json::Value>,
    ) -> AppResult<TrackingPoint> {
        require_session(session_id)?;
        self.check_point(&point)?;

        let mut tracking = TrackingPoint::new(session_id, point, point_type);
        if let Some(metadata) = metadata {
            tracking = tracking.with_metadata(metadata);
        }
        self.storage.create_tracking_point(&tracking).await?;
        Ok(tracking)
    }

    /// Store a suggestion produced for a location.
    ///
    /// Fails with `InvalidValue` when the location or pattern is unknown.
    /// Finite confidence outside 0..1 is clamped; non-finite is rejected.
    pub async fn suggest_pattern(
        &self,
        location_id: &str,
        pattern_id: &str,
        confidence: f64,
        ml_algorithm: &str,
    ) -> AppResult<PatternSuggestion> {
        if !confidence.is_finite() {
            return Err(ValidationError::InvalidConfidence { value: confidence }.into());
        }

        let location = self
            .storage
            .get_location(location_id)
            .await?
            .ok_or_else(|| AppError::InvalidValue {
                field: "location_id".to_string(),
                value: location_id.to_string(),
            })?;
        let pattern = self
            .storage
            .get_pattern(pattern_id)
            .await?
            .ok_or_else(|| AppError::InvalidValue {
                field: "pattern_id".to_string(),
                value: pattern_id.to_string(),
            })?;

        let suggestion = PatternSuggestion::new(location_id, pattern_id, confidence, ml_algorithm);
        self.storage.create_suggestion(&suggestion).await?;

        self.log_activity(
            &location.session_id,
            ActivityType::Suggestion,
            format!("Suggested pattern {} {}", pattern.number, pattern.name),
            Some(location_id),
        )
        .await;

        Ok(suggestion)
    }

    /// Cast a vote through the ledger and log it.
    pub async fn cast_vote(&self, input: VoteInput) -> AppResult<Vote> {
        let vote = self.ledger.record_vote(input).await?;

        self.log_activity(
            &vote.session_id,
            ActivityType::Vote,
            format!("Voted {} on suggestion {}", vote.vote_type, vote.suggestion_id),
            vote.location_id.as_deref(),
        )
        .await;

        Ok(vote)
    }

    /// See [`SuggestionAggregator::get_patterns_for_location`].
    pub async fn patterns_for_location(
        &self,
        location_id: &str,
        session_id: &str,
    ) -> AppResult<Vec<PatternWithVotes>> {
        self.aggregator
            .get_patterns_for_location(location_id, session_id)
            .await
    }

    /// See [`StatsReporter::get_stats`].
    pub async fn stats(&self, session_id: &str) -> StorageResult<SessionStats> {
        self.stats.get_stats(session_id).await
    }

    /// Stored locations near a point; `None` uses the configured default radius.
    pub async fn nearby_locations(
        &self,
        center: GeoPoint,
        radius_km: Option<f64>,
    ) -> AppResult<Vec<Location>> {
        let radius_km = self.resolve_radius(radius_km)?;
        Ok(self.nearby.locations_near(center, radius_km).await?)
    }

    /// A session's tracking points near a point.
    pub async fn nearby_tracking_points(
        &self,
        session_id: &str,
        center: GeoPoint,
        radius_km: Option<f64>,
        point_type: Option<TrackingType>,
    ) -> AppResult<Vec<TrackingPoint>> {
        let radius_km = self.resolve_radius(radius_km)?;
        Ok(self
            .nearby
            .tracking_points_near(session_id, center, radius_km, point_type)
            .await?)
    }

    /// Most recent activity entries for a session, newest first.
    pub async fn recent_activity(
        &self,
        session_id: &str,
        limit: u32,
    ) -> StorageResult<Vec<Activity>> {
        self.activity.recent(session_id, limit).await
    }

    /// Insert catalog entries whose number is not yet present.
    pub async fn import_catalog(&self, patterns: Vec<Pattern>) -> StorageResult<ImportSummary> {
        let mut summary = ImportSummary::default();
        for pattern in patterns {
            if self
                .storage
                .get_pattern_by_number(pattern.number)
                .await?
                .is_some()
            {
                summary.skipped += 1;
                continue;
            }
            self.storage.create_pattern(&pattern).await?;
            summary.inserted += 1;
        }

        info!(
            inserted = summary.inserted,
            skipped = summary.skipped,
            "Catalog import finished"
        );
        Ok(summary)
    }
}
