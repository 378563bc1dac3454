//! Tunables for an imputation run.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, StoreError};
use crate::geo_utils::EARTH_RADIUS_METERS;
use crate::schedule::DayNamePolicy;

/// Which neighbor search backs the run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[cfg_attr(feature = "ffi", derive(uniffi::Enum))]
pub enum NeighborStrategy {
    /// Scan every source for every target
    #[default]
    BruteForce,
    /// R-tree over sources on the unit sphere
    RTree,
}

/// Configuration for spatial imputation.
///
/// Every field has a default, so a JSON config file only needs the values it
/// overrides.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
#[cfg_attr(feature = "ffi", derive(uniffi::Record))]
pub struct ImputeConfig {
    /// How many nearby sources contribute to each estimate.
    /// Default: 3
    pub k_neighbors: u32,

    /// Distances below this are treated as this distance when weighting, so a
    /// colocated source cannot produce an infinite weight.
    /// Default: 50.0 meters
    pub distance_floor_meters: f64,

    /// Power applied to distance in the inverse-distance weight. Higher values
    /// favor the nearest source more strongly.
    /// Default: 2.0
    pub weight_exponent: f64,

    /// Sphere radius for haversine distances.
    /// Default: 6,371,000 meters
    pub earth_radius_meters: f64,

    /// Handling of unrecognized weekday names while decoding schedules.
    /// Default: strict
    pub day_name_policy: DayNamePolicy,

    /// Neighbor search implementation.
    /// Default: brute force
    pub neighbor_strategy: NeighborStrategy,
}

impl Default for ImputeConfig {
    fn default() -> Self {
        Self {
            k_neighbors: 3,
            distance_floor_meters: 50.0,
            weight_exponent: 2.0,
            earth_radius_meters: EARTH_RADIUS_METERS,
            day_name_policy: DayNamePolicy::Strict,
            neighbor_strategy: NeighborStrategy::BruteForce,
        }
    }
}

impl ImputeConfig {
    /// Check every tunable is usable.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.k_neighbors == 0 {
            return Err(ConfigError::ZeroNeighbors);
        }
        if !self.distance_floor_meters.is_finite() || self.distance_floor_meters <= 0.0 {
            return Err(ConfigError::InvalidFloor(self.distance_floor_meters));
        }
        if !self.weight_exponent.is_finite() || self.weight_exponent < 0.0 {
            return Err(ConfigError::InvalidExponent(self.weight_exponent));
        }
        if !self.earth_radius_meters.is_finite() || self.earth_radius_meters <= 0.0 {
            return Err(ConfigError::InvalidRadius(self.earth_radius_meters));
        }
        Ok(())
    }

    /// Load a (possibly partial) configuration from a JSON file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let file = fs_err::File::open(path.as_ref())?;
        let config = serde_json::from_reader(std::io::BufReader::new(file))?;
        Ok(config)
    }
}
