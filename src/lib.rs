//! # Pattern Discovery
//!
//! Recommends catalogued design patterns for geographic locations and lets
//! anonymous sessions validate those recommendations through weighted votes.
//!
//! ## Components
//!
//! - **Geo math**: haversine distance between latitude/longitude pairs
//! - **Proximity search**: radius filtering over stored locations and tracking points
//! - **Vote ledger**: append-only votes with per-vote weights and row-count tallies
//! - **Suggestion aggregation**: patterns joined with tallies and the caller's own vote
//! - **Session stats**: per-session rollup counters
//!
//! ## Architecture
//!
//! ```text
//! Hosting service → PatternDiscovery → VoteLedger / SuggestionAggregator / StatsReporter
//!                                             ↓
//!                                    Storage trait (SQLite)
//! ```
//!
//! ## Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use pattern_discovery::{Config, PatternDiscovery};
//! use pattern_discovery::storage::SqliteStorage;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::from_env()?;
//!     let storage = SqliteStorage::new(&config.database).await?;
//!     let discovery = PatternDiscovery::new(config, Arc::new(storage));
//!     let patterns = discovery.patterns_for_location("loc-1", "session-1").await?;
//!     println!("{}", serde_json::to_string_pretty(&patterns)?);
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]

/// Append-only activity trail.
pub mod activity;
/// Configuration management.
pub mod config;
/// Facade over all components.
pub mod discovery;
/// Error types and result aliases for the application.
pub mod error;
/// Great-circle distance and proximity search.
pub mod geo;
/// Per-session summary counters.
pub mod stats;
/// Persistence collaborator and SQLite implementation.
pub mod storage;
/// Vote-annotated pattern suggestions.
pub mod suggestions;
/// Vote ledger and tallies.
pub mod votes;

pub use config::Config;
pub use discovery::PatternDiscovery;
pub use error::{AppError, AppResult};
pub use geo::{distance_km, find_within_radius, GeoPoint};
pub use suggestions::PatternWithVotes;
pub use votes::{VoteInput, VoteLedger};
