use std::env;
use std::path::PathBuf;
use std::str::FromStr;

use crate::error::AppError;

/// Application configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    pub database: DatabaseConfig,
    pub logging: LoggingConfig,
    pub voting: VotingConfig,
    pub proximity: ProximityConfig,
}

/// Database configuration
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub path: PathBuf,
    pub max_connections: u32,
}

/// Logging configuration
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

/// Log output format
#[derive(Debug, Clone, PartialEq)]
pub enum LogFormat {
    Pretty,
    Json,
}

/// Vote ledger configuration
#[derive(Debug, Clone, Default)]
pub struct VotingConfig {
    pub mode: VoteMode,
}

/// How repeated votes from one session on one suggestion are stored.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum VoteMode {
    /// Every vote appends a new ledger row, duplicates included.
    #[default]
    Append,
    /// A session's later vote replaces its earlier one.
    ///
    /// This changes tallies relative to `Append` once a session votes twice.
    Upsert,
}

impl FromStr for VoteMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "append" => Ok(VoteMode::Append),
            "upsert" => Ok(VoteMode::Upsert),
            _ => Err(format!("Unknown vote mode: {}", s)),
        }
    }
}

/// Proximity search configuration
#[derive(Debug, Clone)]
pub struct ProximityConfig {
    pub default_radius_km: f64,
    pub validate_coordinates: bool,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, AppError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let database = DatabaseConfig {
            path: PathBuf::from(
                env::var("DATABASE_PATH").unwrap_or_else(|_| "./data/patterns.db".to_string()),
            ),
            max_connections: env::var("DATABASE_MAX_CONNECTIONS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(5),
        };

        let logging = LoggingConfig {
            level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            format: match env::var("LOG_FORMAT")
                .unwrap_or_else(|_| "pretty".to_string())
                .to_lowercase()
                .as_str()
            {
                "json" => LogFormat::Json,
                _ => LogFormat::Pretty,
            },
        };

        let voting = VotingConfig {
            mode: env::var("VOTE_MODE")
                .unwrap_or_else(|_| "append".to_string())
                .parse()
                .map_err(|message| AppError::Config { message })?,
        };

        let proximity = ProximityConfig {
            default_radius_km: env::var("DEFAULT_RADIUS_KM")
                .ok()
                .and_then(|s| s.parse::<f64>().ok())
                .filter(|r| r.is_finite())
                .unwrap_or(1.0),
            validate_coordinates: env::var("VALIDATE_COORDINATES")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(true),
        };

        Ok(Config {
            database,
            logging,
            voting,
            proximity,
        })
    }

    /// Configuration for an in-memory database, used by tests and tooling.
    pub fn in_memory() -> Self {
        Self {
            database: DatabaseConfig {
                path: PathBuf::from(":memory:"),
                max_connections: 1,
            },
            logging: LoggingConfig {
                level: "info".to_string(),
                format: LogFormat::Pretty,
            },
            voting: VotingConfig::default(),
            proximity: ProximityConfig::default(),
        }
    }
}

impl Default for ProximityConfig {
    fn default() -> Self {
        Self {
            default_radius_km: 1.0,
            validate_coordinates: true,
        }
    }
}
