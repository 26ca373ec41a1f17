use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use pattern_discovery::{
    activity::DEFAULT_ACTIVITY_LIMIT,
    config::{Config, LogFormat},
    geo::GeoPoint,
    storage::{Pattern, SqliteStorage, VoteType},
    suggestions::{sort_patterns, PatternOrdering},
    PatternDiscovery, VoteInput,
};

/// Operator CLI for the pattern discovery store.
#[derive(Parser, Debug)]
#[command(name = "pattern-discovery", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Load pattern catalog entries from a JSON array file
    ImportCatalog {
        /// Path to the catalog JSON
        file: PathBuf,
    },

    /// Record a location for a session
    AddLocation {
        #[arg(long)]
        session: String,
        #[arg(long, allow_hyphen_values = true)]
        lat: f64,
        #[arg(long, allow_hyphen_values = true)]
        lng: f64,
        #[arg(long)]
        name: Option<String>,
    },

    /// Store a pattern suggestion for a location
    Suggest {
        #[arg(long)]
        location: String,
        /// Catalog number of the pattern
        #[arg(long)]
        pattern: i64,
        #[arg(long)]
        confidence: f64,
        #[arg(long, default_value = "manual")]
        algorithm: String,
    },

    /// Cast a vote on a suggestion
    Vote {
        #[arg(long)]
        suggestion: String,
        #[arg(long)]
        session: String,
        #[arg(long, value_enum)]
        direction: Direction,
        /// Minutes spent at the location; sets the vote weight
        #[arg(long, default_value = "0")]
        minutes: u32,
        #[arg(long)]
        location: Option<String>,
    },

    /// Show vote-annotated patterns for a location
    Patterns {
        #[arg(long)]
        location: String,
        #[arg(long)]
        session: String,
        #[arg(long, value_enum)]
        order: Option<Order>,
    },

    /// Show session stats
    Stats {
        #[arg(long)]
        session: String,
    },

    /// List stored locations near a point
    Nearby {
        #[arg(long, allow_hyphen_values = true)]
        lat: f64,
        #[arg(long, allow_hyphen_values = true)]
        lng: f64,
        /// Radius in kilometers; defaults to DEFAULT_RADIUS_KM
        #[arg(long)]
        radius: Option<f64>,
    },

    /// Show a session's recent activity
    Activity {
        #[arg(long)]
        session: String,
        #[arg(long, default_value_t = DEFAULT_ACTIVITY_LIMIT)]
        limit: u32,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum Direction {
    Up,
    Down,
}

impl From<Direction> for VoteType {
    fn from(d: Direction) -> Self {
        match d {
            Direction::Up => VoteType::Up,
            Direction::Down => VoteType::Down,
        }
    }
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum Order {
    Confidence,
    Votes,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Load configuration
    let config = match Config::from_env() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            std::process::exit(1);
        }
    };

    // Initialize logging
    init_logging(&config);

    // Initialize storage
    let storage = match SqliteStorage::new(&config.database).await {
        Ok(s) => {
            info!(path = %config.database.path.display(), "Database initialized");
            s
        }
        Err(e) => {
            error!(error = %e, "Failed to initialize database");
            return Err(e.into());
        }
    };

    let discovery = PatternDiscovery::new(config, Arc::new(storage));

    if let Err(e) = run(&discovery, cli.command).await {
        error!(error = %e, "Command failed");
        return Err(e);
    }

    Ok(())
}

async fn run(discovery: &PatternDiscovery, command: Command) -> anyhow::Result<()> {
    match command {
        Command::ImportCatalog { file } => {
            let raw = tokio::fs::read_to_string(&file).await?;
            let patterns: Vec<Pattern> = serde_json::from_str(&raw)?;
            print_json(&discovery.import_catalog(patterns).await?)
        }
        Command::AddLocation {
            session,
            lat,
            lng,
            name,
        } => {
            let point = GeoPoint {
                latitude: lat,
                longitude: lng,
            };
            print_json(&discovery.record_location(&session, point, name).await?)
        }
        Command::Suggest {
            location,
            pattern,
            confidence,
            algorithm,
        } => {
            let pattern = discovery
                .storage()
                .get_pattern_by_number(pattern)
                .await?
                .ok_or_else(|| anyhow::anyhow!("No pattern with number {}", pattern))?;
            let suggestion = discovery
                .suggest_pattern(&location, &pattern.id, confidence, &algorithm)
                .await?;
            print_json(&suggestion)
        }
        Command::Vote {
            suggestion,
            session,
            direction,
            minutes,
            location,
        } => {
            let mut input =
                VoteInput::new(suggestion, session, direction.into()).with_time_spent(minutes);
            if let Some(location) = location {
                input = input.with_location(location);
            }
            print_json(&discovery.cast_vote(input).await?)
        }
        Command::Patterns {
            location,
            session,
            order,
        } => {
            let mut patterns = discovery.patterns_for_location(&location, &session).await?;
            if let Some(order) = order {
                let ordering = match order {
                    Order::Confidence => PatternOrdering::Confidence,
                    Order::Votes => PatternOrdering::NetVotes,
                };
                sort_patterns(&mut patterns, ordering);
            }
            print_json(&patterns)
        }
        Command::Stats { session } => print_json(&discovery.stats(&session).await?),
        Command::Nearby { lat, lng, radius } => {
            let center = GeoPoint {
                latitude: lat,
                longitude: lng,
            };
            print_json(&discovery.nearby_locations(center, radius).await?)
        }
        Command::Activity { session, limit } => {
            print_json(&discovery.recent_activity(&session, limit).await?)
        }
    }
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Initialize tracing/logging
fn init_logging(config: &Config) {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.logging.level));

    match config.logging.format {
        LogFormat::Json => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().json().with_writer(std::io::stderr))
                .init();
        }
        LogFormat::Pretty => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().with_writer(std::io::stderr))
                .init();
        }
    }
}
