use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use sqlx::migrate::Migrator;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::str::FromStr;
use tracing::{info, warn};

use super::{
    Activity, Location, Pattern, PatternSuggestion, Storage, TrackingPoint, TrackingType, Vote,
};
use crate::config::DatabaseConfig;
use crate::error::{StorageError, StorageResult};

/// Static migrator that embeds migrations at compile time
static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

/// SQLite-backed storage implementation
#[derive(Clone)]
pub struct SqliteStorage {
    pool: SqlitePool,
}

impl SqliteStorage {
    /// Create a new SQLite storage instance
    pub async fn new(config: &DatabaseConfig) -> StorageResult<Self> {
        // Ensure parent directory exists
        if let Some(parent) = config.path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| StorageError::Connection {
                message: format!("Failed to create database directory: {}", e),
            })?;
        }

        let database_url = format!("sqlite://{}?mode=rwc", config.path.display());

        let options = SqliteConnectOptions::from_str(&database_url)
            .map_err(|e| StorageError::Connection {
                message: format!("Invalid database URL: {}", e),
            })?
            .create_if_missing(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .connect_with(options)
            .await
            .map_err(|e| StorageError::Connection {
                message: format!("Failed to connect to database: {}", e),
            })?;

        let storage = Self { pool };
        storage.run_migrations().await?;

        Ok(storage)
    }

    /// Create an in-memory database with the schema applied.
    ///
    /// Uses a single long-lived connection so every query sees the same database.
    pub async fn new_in_memory() -> StorageResult<Self> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:").map_err(|e| {
            StorageError::Connection {
                message: format!("Invalid database URL: {}", e),
            }
        })?;

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await
            .map_err(|e| StorageError::Connection {
                message: format!("Failed to open in-memory database: {}", e),
            })?;

        let storage = Self { pool };
        storage.run_migrations().await?;

        Ok(storage)
    }

    /// Run database migrations using embedded sqlx migrations
    async fn run_migrations(&self) -> StorageResult<()> {
        info!("Running database migrations...");

        MIGRATOR.run(&self.pool).await.map_err(|e| StorageError::Migration {
            message: format!("Failed to run migrations: {}", e),
        })?;

        info!("Database migrations completed successfully");
        Ok(())
    }

    /// Get the underlying pool for advanced queries
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

#[async_trait]
impl Storage for SqliteStorage {
    async fn create_location(&self, location: &Location) -> StorageResult<()> {
        sqlx::query(
            r#"
            INSERT INTO locations (id, latitude, longitude, name, session_id, created_at)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&location.id)
        .bind(location.latitude)
        .bind(location.longitude)
        .bind(&location.name)
        .bind(&location.session_id)
        .bind(timestamp(&location.created_at))
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn get_location(&self, id: &str) -> StorageResult<Option<Location>> {
        let row: Option<LocationRow> = sqlx::query_as(
            r#"
            SELECT id, latitude, longitude, name, session_id, created_at
            FROM locations
            WHERE id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|r| r.into()))
    }

    async fn get_session_locations(&self, session_id: &str) -> StorageResult<Vec<Location>> {
        let rows: Vec<LocationRow> = sqlx::query_as(
            r#"
            SELECT id, latitude, longitude, name, session_id, created_at
            FROM locations
            WHERE session_id = ?
            ORDER BY created_at ASC, rowid ASC
            "#,
        )
        .bind(session_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(|r| r.into()).collect())
    }

    async fn get_all_locations(&self) -> StorageResult<Vec<Location>> {
        let rows: Vec<LocationRow> = sqlx::query_as(
            r#"
            SELECT id, latitude, longitude, name, session_id, created_at
            FROM locations
            ORDER BY created_at ASC, rowid ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(|r| r.into()).collect())
    }

    async fn create_tracking_point(&self, point: &TrackingPoint) -> StorageResult<()> {
        let metadata = point
            .metadata
            .as_ref()
            .map(serde_json::to_string)
            .transpose()
            .map_err(|e| StorageError::Serialization {
                message: format!("Failed to encode tracking metadata: {}", e),
            })?;

        sqlx::query(
            r#"
            INSERT INTO tracking_points (id, latitude, longitude, point_type, session_id, metadata, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&point.id)
        .bind(point.latitude)
        .bind(point.longitude)
        .bind(point.point_type.to_string())
        .bind(&point.session_id)
        .bind(&metadata)
        .bind(timestamp(&point.created_at))
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn get_session_tracking_points(
        &self,
        session_id: &str,
        point_type: Option<TrackingType>,
    ) -> StorageResult<Vec<TrackingPoint>> {
        let point_type = point_type.map(|t| t.to_string());

        let rows: Vec<TrackingPointRow> = sqlx::query_as(
            r#"
            SELECT id, latitude, longitude, point_type, session_id, metadata, created_at
            FROM tracking_points
            WHERE session_id = ? AND (? IS NULL OR point_type = ?)
            ORDER BY created_at ASC, rowid ASC
            "#,
        )
        .bind(session_id)
        .bind(&point_type)
        .bind(&point_type)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(TrackingPoint::try_from).collect()
    }

    async fn create_pattern(&self, pattern: &Pattern) -> StorageResult<()> {
        let keywords =
            serde_json::to_string(&pattern.keywords).map_err(|e| StorageError::Serialization {
                message: format!("Failed to encode pattern keywords: {}", e),
            })?;

        sqlx::query(
            r#"
            INSERT INTO patterns (id, number, name, description, full_description, category, keywords, icon_name, mood_color)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&pattern.id)
        .bind(pattern.number)
        .bind(&pattern.name)
        .bind(&pattern.description)
        .bind(&pattern.full_description)
        .bind(&pattern.category)
        .bind(&keywords)
        .bind(&pattern.icon_name)
        .bind(&pattern.mood_color)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn get_pattern(&self, id: &str) -> StorageResult<Option<Pattern>> {
        let row: Option<PatternRow> = sqlx::query_as(
            r#"
            SELECT id, number, name, description, full_description, category, keywords, icon_name, mood_color
            FROM patterns
            WHERE id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|r| r.into()))
    }

    async fn get_pattern_by_number(&self, number: i64) -> StorageResult<Option<Pattern>> {
        let row: Option<PatternRow> = sqlx::query_as(
            r#"
            SELECT id, number, name, description, full_description, category, keywords, icon_name, mood_color
            FROM patterns
            WHERE number = ?
            "#,
        )
        .bind(number)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|r| r.into()))
    }

    async fn get_all_patterns(&self) -> StorageResult<Vec<Pattern>> {
        let rows: Vec<PatternRow> = sqlx::query_as(
            r#"
            SELECT id, number, name, description, full_description, category, keywords, icon_name, mood_color
            FROM patterns
            ORDER BY number ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(|r| r.into()).collect())
    }

    async fn count_patterns(&self) -> StorageResult<u64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM patterns")
            .fetch_one(&self.pool)
            .await?;

        Ok(count as u64)
    }

    async fn create_suggestion(&self, suggestion: &PatternSuggestion) -> StorageResult<()> {
        sqlx::query(
            r#"
            INSERT INTO pattern_suggestions (id, location_id, pattern_id, confidence, ml_algorithm, created_at)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&suggestion.id)
        .bind(&suggestion.location_id)
        .bind(&suggestion.pattern_id)
        .bind(&suggestion.confidence)
        .bind(&suggestion.ml_algorithm)
        .bind(timestamp(&suggestion.created_at))
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn get_location_suggestions_with_patterns(
        &self,
        location_id: &str,
    ) -> StorageResult<Vec<(PatternSuggestion, Pattern)>> {
        let rows: Vec<SuggestionPatternRow> = sqlx::query_as(
            r#"
            SELECT
                s.id AS suggestion_id, s.location_id, s.pattern_id, s.confidence,
                s.ml_algorithm, s.created_at,
                p.number, p.name, p.description, p.full_description, p.category,
                p.keywords, p.icon_name, p.mood_color
            FROM pattern_suggestions s
            INNER JOIN patterns p ON p.id = s.pattern_id
            WHERE s.location_id = ?
            ORDER BY s.rowid ASC
            "#,
        )
        .bind(location_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(SuggestionPatternRow::into_parts).collect())
    }

    async fn count_location_suggestions(&self, location_id: &str) -> StorageResult<u64> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM pattern_suggestions WHERE location_id = ?")
                .bind(location_id)
                .fetch_one(&self.pool)
                .await?;

        Ok(count as u64)
    }

    async fn create_vote(&self, vote: &Vote) -> StorageResult<()> {
        sqlx::query(
            r#"
            INSERT INTO votes (id, suggestion_id, session_id, vote_type, weight, location_id, time_spent_minutes, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&vote.id)
        .bind(&vote.suggestion_id)
        .bind(&vote.session_id)
        .bind(vote.vote_type.to_string())
        .bind(vote.weight)
        .bind(&vote.location_id)
        .bind(i64::from(vote.time_spent_minutes))
        .bind(timestamp(&vote.created_at))
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn update_vote(&self, vote: &Vote) -> StorageResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE votes
            SET vote_type = ?, weight = ?, location_id = ?, time_spent_minutes = ?, created_at = ?
            WHERE id = ?
            "#,
        )
        .bind(vote.vote_type.to_string())
        .bind(vote.weight)
        .bind(&vote.location_id)
        .bind(i64::from(vote.time_spent_minutes))
        .bind(timestamp(&vote.created_at))
        .bind(&vote.id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StorageError::Query {
                message: format!("Vote not found: {}", vote.id),
            });
        }

        Ok(())
    }

    async fn get_suggestion_votes(&self, suggestion_id: &str) -> StorageResult<Vec<Vote>> {
        let rows: Vec<VoteRow> = sqlx::query_as(
            r#"
            SELECT id, suggestion_id, session_id, vote_type, weight, location_id, time_spent_minutes, created_at
            FROM votes
            WHERE suggestion_id = ?
            "#,
        )
        .bind(suggestion_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Vote::try_from).collect()
    }

    async fn get_user_vote(
        &self,
        suggestion_id: &str,
        session_id: &str,
    ) -> StorageResult<Option<Vote>> {
        let row: Option<VoteRow> = sqlx::query_as(
            r#"
            SELECT id, suggestion_id, session_id, vote_type, weight, location_id, time_spent_minutes, created_at
            FROM votes
            WHERE suggestion_id = ? AND session_id = ?
            ORDER BY created_at DESC, rowid DESC
            LIMIT 1
            "#,
        )
        .bind(suggestion_id)
        .bind(session_id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Vote::try_from).transpose()
    }

    async fn count_session_votes(&self, session_id: &str) -> StorageResult<u64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM votes WHERE session_id = ?")
            .bind(session_id)
            .fetch_one(&self.pool)
            .await?;

        Ok(count as u64)
    }

    async fn create_activity(&self, activity: &Activity) -> StorageResult<()> {
        sqlx::query(
            r#"
            INSERT INTO activities (id, activity_type, description, location_id, session_id, created_at)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&activity.id)
        .bind(activity.activity_type.to_string())
        .bind(&activity.description)
        .bind(&activity.location_id)
        .bind(&activity.session_id)
        .bind(timestamp(&activity.created_at))
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn get_recent_activities(
        &self,
        session_id: &str,
        limit: u32,
    ) -> StorageResult<Vec<Activity>> {
        let rows: Vec<ActivityRow> = sqlx::query_as(
            r#"
            SELECT id, activity_type, description, location_id, session_id, created_at
            FROM activities
            WHERE session_id = ?
            ORDER BY created_at DESC, rowid DESC
            LIMIT ?
            "#,
        )
        .bind(session_id)
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Activity::try_from).collect()
    }
}

// ============================================================================
// Row types
// ============================================================================

/// Fixed-width UTC timestamps so text ordering matches time ordering.
fn timestamp(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_timestamp(value: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| {
            warn!(value = %value, "Unparseable stored timestamp, substituting now");
            Utc::now()
        })
}

fn parse_enum<T: FromStr<Err = String>>(value: &str) -> StorageResult<T> {
    value
        .parse()
        .map_err(|message| StorageError::Serialization { message })
}

#[derive(sqlx::FromRow)]
struct LocationRow {
    id: String,
    latitude: f64,
    longitude: f64,
    name: Option<String>,
    session_id: String,
    created_at: String,
}

impl From<LocationRow> for Location {
    fn from(row: LocationRow) -> Self {
        Self {
            id: row.id,
            latitude: row.latitude,
            longitude: row.longitude,
            name: row.name,
            session_id: row.session_id,
            created_at: parse_timestamp(&row.created_at),
        }
    }
}

#[derive(sqlx::FromRow)]
struct TrackingPointRow {
    id: String,
    latitude: f64,
    longitude: f64,
    point_type: String,
    session_id: String,
    metadata: Option<String>,
    created_at: String,
}

impl TryFrom<TrackingPointRow> for TrackingPoint {
    type Error = StorageError;

    fn try_from(row: TrackingPointRow) -> StorageResult<Self> {
        Ok(Self {
            id: row.id,
            latitude: row.latitude,
            longitude: row.longitude,
            point_type: parse_enum(&row.point_type)?,
            session_id: row.session_id,
            metadata: row.metadata.and_then(|s| serde_json::from_str(&s).ok()),
            created_at: parse_timestamp(&row.created_at),
        })
    }
}

#[derive(sqlx::FromRow)]
struct PatternRow {
    id: String,
    number: i64,
    name: String,
    description: String,
    full_description: String,
    category: String,
    keywords: String,
    icon_name: String,
    mood_color: String,
}

fn parse_keywords(value: &str) -> Vec<String> {
    serde_json::from_str(value).unwrap_or_default()
}

impl From<PatternRow> for Pattern {
    fn from(row: PatternRow) -> Self {
        Self {
            id: row.id,
            number: row.number,
            name: row.name,
            description: row.description,
            full_description: row.full_description,
            category: row.category,
            keywords: parse_keywords(&row.keywords),
            icon_name: row.icon_name,
            mood_color: row.mood_color,
        }
    }
}

#[derive(sqlx::FromRow)]
struct SuggestionPatternRow {
    suggestion_id: String,
    location_id: String,
    pattern_id: String,
    confidence: String,
    ml_algorithm: String,
    created_at: String,
    number: i64,
    name: String,
    description: String,
    full_description: String,
    category: String,
    keywords: String,
    icon_name: String,
    mood_color: String,
}

impl SuggestionPatternRow {
    fn into_parts(self) -> (PatternSuggestion, Pattern) {
        let pattern = Pattern {
            id: self.pattern_id.clone(),
            number: self.number,
            name: self.name,
            description: self.description,
            full_description: self.full_description,
            category: self.category,
            keywords: parse_keywords(&self.keywords),
            icon_name: self.icon_name,
            mood_color: self.mood_color,
        };
        let suggestion = PatternSuggestion {
            id: self.suggestion_id,
            location_id: self.location_id,
            pattern_id: self.pattern_id,
            confidence: self.confidence,
            ml_algorithm: self.ml_algorithm,
            created_at: parse_timestamp(&self.created_at),
        };
        (suggestion, pattern)
    }
}

#[derive(sqlx::FromRow)]
struct VoteRow {
    id: String,
    suggestion_id: String,
    session_id: String,
    vote_type: String,
    weight: f64,
    location_id: Option<String>,
    time_spent_minutes: i64,
    created_at: String,
}

impl TryFrom<VoteRow> for Vote {
    type Error = StorageError;

    fn try_from(row: VoteRow) -> StorageResult<Self> {
        let time_spent_minutes =
            u32::try_from(row.time_spent_minutes).map_err(|_| StorageError::Serialization {
                message: format!("Invalid time_spent_minutes: {}", row.time_spent_minutes),
            })?;

        Ok(Self {
            id: row.id,
            suggestion_id: row.suggestion_id,
            session_id: row.session_id,
            vote_type: parse_enum(&row.vote_type)?,
            weight: row.weight,
            location_id: row.location_id,
            time_spent_minutes,
            created_at: parse_timestamp(&row.created_at),
        })
    }
}

#[derive(sqlx::FromRow)]
struct ActivityRow {
    id: String,
    activity_type: String,
    description: String,
    location_id: Option<String>,
    session_id: String,
    created_at: String,
}

impl TryFrom<ActivityRow> for Activity {
    type Error = StorageError;

    fn try_from(row: ActivityRow) -> StorageResult<Self> {
        Ok(Self {
            id: row.id,
            activity_type: parse_enum(&row.activity_type)?,
            description: row.description,
            location_id: row.location_id,
            session_id: row.session_id,
            created_at: parse_timestamp(&row.created_at),
        })
    }
}
