//! Error types for the imputation engine and its persistence layer.

use thiserror::Error;

/// Result type alias for imputation operations
pub type Result<T> = std::result::Result<T, ImputeError>;

/// Reasons a raw schedule fails to decode.
///
/// Decode failures never escape the orchestrator: the place is simply treated as
/// a target. The typed reason is exposed for callers that want to report it.
#[derive(Error, Debug)]
pub enum ScheduleError {
    /// Raw value is empty or whitespace
    #[error("schedule is empty")]
    Empty,

    /// Raw value is not a JSON array of day entries
    #[error("schedule is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// Wrong number of day entries
    #[error("expected 7 day entries, found {0}")]
    DayCount(usize),

    /// A day entry without exactly 24 hourly values
    #[error("day '{day}' has {count} hourly values, expected 24")]
    HourCount { day: String, count: usize },

    /// Weekday name outside Monday..Sunday
    #[error("unknown weekday name '{0}'")]
    UnknownDay(String),

    /// The same weekday appears twice
    #[error("weekday '{0}' appears more than once")]
    DuplicateDay(String),
}

/// Invalid tunables in an [`ImputeConfig`](crate::ImputeConfig).
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("k_neighbors must be at least 1")]
    ZeroNeighbors,

    #[error("distance_floor_meters must be finite and positive, got {0}")]
    InvalidFloor(f64),

    #[error("weight_exponent must be finite and non-negative, got {0}")]
    InvalidExponent(f64),

    #[error("earth_radius_meters must be finite and positive, got {0}")]
    InvalidRadius(f64),
}

/// Top-level failures of an imputation run.
#[derive(Error, Debug)]
pub enum ImputeError {
    /// No place has a decodable schedule, so nothing can be imputed
    #[error("no source places with a decodable schedule ({targets} targets left unfilled)")]
    NoSources { targets: usize },

    /// Configuration rejected before the run started
    #[error("invalid configuration: {0}")]
    InvalidConfig(#[from] ConfigError),
}

/// Failures at the load/save boundary.
///
/// These are fatal for the I/O call only; an in-memory table or plan stays
/// usable so the write can be retried.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A required column is absent from the header row
    #[error("missing required column '{0}'")]
    MissingColumn(String),
}
