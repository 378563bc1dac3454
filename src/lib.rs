//! # Popularity Imputer
//!
//! Fills in missing weekly popularity schedules for points of interest using
//! inverse-distance weighting over nearby places that have observed data.
//!
//! This library provides:
//! - A codec between raw `[{"name": "Monday", "data": [...24]}, ...]` text and a
//!   canonical 7x24 [`Schedule`]
//! - Haversine distances and K-nearest source selection (brute force or R-tree)
//! - Weighted aggregation of neighbor schedules
//! - CSV persistence and heatmap export at the boundaries
//!
//! ## Features
//!
//! - **`parallel`** - Enable parallel processing with rayon
//! - **`ffi`** - Enable FFI bindings for mobile platforms (iOS/Android)
//! - **`cli`** - Build the `impute-places` command line tool
//! - **`full`** - Enable all features
//!
//! ## Quick Start
//!
//! ```rust
//! use popularity_imputer::{schedule, ImputeConfig, Imputer, Place};
//!
//! let quiet = schedule::encode(&schedule::Schedule::filled(10.0));
//! let busy = schedule::encode(&schedule::Schedule::filled(20.0));
//!
//! let mut places = vec![
//!     Place::new("museum", 0.0, 0.0).with_schedule(quiet),
//!     Place::new("market", 0.0, 1.0).with_schedule(busy),
//!     Place::new("gallery", 0.0, 0.5),
//! ];
//!
//! let config = ImputeConfig { k_neighbors: 2, ..Default::default() };
//! let summary = Imputer::new(config).unwrap().impute(&mut places).unwrap();
//!
//! assert_eq!(summary.imputed, 1);
//! let filled = schedule::decode(places[2].raw_schedule.as_deref().unwrap(), Default::default()).unwrap();
//! assert_eq!(filled, schedule::Schedule::filled(15.0));
//! ```

pub mod config;
pub mod error;
pub mod geo_utils;
pub mod idw;
pub mod imputer;
pub mod neighbors;
pub mod schedule;
pub mod store;

pub use config::{ImputeConfig, NeighborStrategy};
pub use error::{ConfigError, ImputeError, Result, ScheduleError, StoreError};
pub use imputer::{ImputationPlan, Imputation, ImputeSummary, Imputer, Partition};
pub use neighbors::{BruteForceSelector, Neighbor, NeighborSelector, RTreeSelector, SourcePoint};
pub use schedule::{DayNamePolicy, Schedule};
pub use store::{export_heatmap, ColumnNames, PlaceTable};

#[cfg(feature = "ffi")]
uniffi::setup_scaffolding!();

/// Initialize logging for Android (only used in FFI)
#[cfg(all(feature = "ffi", target_os = "android"))]
fn init_logging() {
    use android_logger::Config;
    use log::LevelFilter;

    android_logger::init_once(
        Config::default()
            .with_max_level(LevelFilter::Debug)
            .with_tag("PopularityImputer")
    );
}

#[cfg(all(feature = "ffi", not(target_os = "android")))]
fn init_logging() {
    // No-op on non-Android platforms
}

// ============================================================================
// Core Types
// ============================================================================

/// A WGS84 coordinate in degrees.
///
/// # Example
/// ```
/// use popularity_imputer::GeoPoint;
/// let point = GeoPoint::new(41.3870, 2.1700); // Barcelona
/// assert!(point.is_valid());
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "ffi", derive(uniffi::Record))]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

impl GeoPoint {
    /// Create a new point.
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self { latitude, longitude }
    }

    /// Check if the point has valid coordinates.
    pub fn is_valid(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && self.latitude >= -90.0
            && self.latitude <= 90.0
            && self.longitude >= -180.0
            && self.longitude <= 180.0
    }
}

/// A point of interest and its (possibly missing) popularity schedule.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "ffi", derive(uniffi::Record))]
pub struct Place {
    /// Identifier, used in logs
    pub id: String,
    /// Display name, if known
    pub name: Option<String>,
    pub latitude: f64,
    pub longitude: f64,
    /// Raw schedule text; `None` or undecodable means the place needs imputing
    pub raw_schedule: Option<String>,
    /// True once the schedule has been estimated rather than observed
    pub estimated: bool,
}

impl Place {
    /// Create a place with no schedule.
    pub fn new(id: impl Into<String>, latitude: f64, longitude: f64) -> Self {
        Self {
            id: id.into(),
            name: None,
            latitude,
            longitude,
            raw_schedule: None,
            estimated: false,
        }
    }

    /// Attach an observed raw schedule.
    pub fn with_schedule(mut self, raw_schedule: impl Into<String>) -> Self {
        self.raw_schedule = Some(raw_schedule.into());
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn location(&self) -> GeoPoint {
        GeoPoint::new(self.latitude, self.longitude)
    }
}

// ============================================================================
// FFI Exports (only when feature enabled)
// ============================================================================

#[cfg(feature = "ffi")]
mod ffi {
    use super::*;
    use log::{info, warn};

    /// Result of an imputation call across the FFI boundary.
    #[derive(Debug, Clone, uniffi::Record)]
    pub struct ImputeOutcome {
        /// Input places with estimated schedules filled in
        pub places: Vec<Place>,
        pub summary: ImputeSummary,
        /// Set when the run could not start (bad config, no sources)
        pub error: Option<String>,
    }

    /// Impute missing schedules for a batch of places.
    #[uniffi::export]
    pub fn ffi_impute_places(places: Vec<Place>, config: ImputeConfig) -> ImputeOutcome {
        init_logging();
        info!("[PopularityImputer] impute called with {} places", places.len());

        let mut places = places;
        let start = std::time::Instant::now();

        let result = Imputer::new(config).and_then(|imputer| imputer.impute_parallel(&mut places));

        match result {
            Ok(summary) => {
                info!(
                    "[PopularityImputer] Imputed {} schedules in {:?}",
                    summary.imputed,
                    start.elapsed()
                );
                ImputeOutcome { places, summary, error: None }
            }
            Err(e) => {
                warn!("[PopularityImputer] Imputation failed: {}", e);
                ImputeOutcome {
                    places,
                    summary: ImputeSummary::default(),
                    error: Some(e.to_string()),
                }
            }
        }
    }

    /// Default imputation configuration.
    #[uniffi::export]
    pub fn ffi_default_impute_config() -> ImputeConfig {
        ImputeConfig::default()
    }

    /// Whether a raw schedule decodes to a full week.
    #[uniffi::export]
    pub fn ffi_decode_is_valid(raw_schedule: String, policy: DayNamePolicy) -> bool {
        schedule::decode(&raw_schedule, policy).is_some()
    }
}

// ============================================================================
// Tests
// ============================================================================
