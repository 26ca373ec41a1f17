use thiserror::Error;

/// Application-level errors
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Invalid value for {field}: {value:?}")]
    InvalidValue { field: String, value: String },

    #[error("Internal error: {message}")]
    Internal { message: String },
}

/// Storage layer errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Database connection failed: {message}")]
    Connection { message: String },

    #[error("Query failed: {message}")]
    Query { message: String },

    #[error("Migration failed: {message}")]
    Migration { message: String },

    #[error("Serialization failed: {message}")]
    Serialization { message: String },

    #[error("SQLx error: {0}")]
    Sqlx(#[from] sqlx::Error),
}

/// Malformed input to a geometric or ledger operation
#[derive(Debug, Error, PartialEq)]
pub enum ValidationError {
    #[error("Coordinate {field} is not finite")]
    NonFiniteCoordinate { field: &'static str },

    #[error("Latitude {value} outside [-90, 90]")]
    LatitudeOutOfRange { value: f64 },

    #[error("Longitude {value} outside [-180, 180]")]
    LongitudeOutOfRange { value: f64 },

    #[error("Vote weight must be finite and non-negative, got {value}")]
    InvalidWeight { value: f64 },

    #[error("Confidence must be finite, got {value}")]
    InvalidConfidence { value: f64 },

    #[error("Radius must be finite, got {value}")]
    InvalidRadius { value: f64 },

    #[error("{field} cannot be empty")]
    EmptyField { field: &'static str },
}

/// Result type alias for application errors
pub type AppResult<T> = Result<T, AppError>;

/// Result type alias for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Result type alias for input validation
pub type ValidationResult<T> = Result<T, ValidationError>;
