//! # Imputation Orchestrator
//!
//! Fills missing schedules from nearby places in one pass:
//!
//! 1. Split places into sources (decodable schedule), targets (none) and invalid
//!    (bad coordinates, ignored entirely)
//! 2. Decode every source schedule once
//! 3. For each target: nearest sources -> inverse-distance weights -> weighted mean
//! 4. Collect results into an [`ImputationPlan`], then write them back in one go
//!
//! Targets only ever read source schedules, never other targets' estimates.

use std::collections::HashMap;

use log::{debug, info, warn};

use crate::config::ImputeConfig;
use crate::error::{ImputeError, Result};
use crate::idw::{aggregate, relative_weights};
use crate::neighbors::{build_selector, NeighborSelector, SourcePoint};
use crate::schedule::{decode, encode, Schedule};
use crate::{GeoPoint, Place};

/// Counters for one imputation run.
///
/// Counts are `u32` for the FFI record and saturate at `u32::MAX`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "ffi", derive(uniffi::Record))]
pub struct ImputeSummary {
    /// Places in the collection
    pub total_places: u32,
    /// Places with a decodable schedule
    pub sources: u32,
    /// Places with valid coordinates and no decodable schedule
    pub targets: u32,
    /// Places excluded for out-of-range or non-finite coordinates
    pub invalid: u32,
    /// Targets that received an estimate
    pub imputed: u32,
    /// Targets left unchanged because no neighbor contributed
    pub skipped: u32,
}

/// How a collection splits up before imputation.
#[derive(Debug, Clone, Default)]
pub struct Partition {
    /// Indices of places with a decodable schedule
    pub sources: Vec<usize>,
    /// Indices of places needing a schedule
    pub targets: Vec<usize>,
    /// Indices of places with unusable coordinates
    pub invalid: Vec<usize>,
    /// Decoded source schedules keyed by place index
    pub schedules: HashMap<usize, Schedule>,
}

/// An estimated schedule for one target.
#[derive(Debug, Clone, PartialEq)]
pub struct Imputation {
    /// Index of the target in the place collection
    pub index: usize,
    pub schedule: Schedule,
    /// `schedule` in raw stored form
    pub raw_schedule: String,
}

/// Results of an imputation run, not yet written to the places.
///
/// Keeping the plan separate from the collection means a failed save can be
/// retried without recomputing anything.
#[derive(Debug, Clone, Default)]
pub struct ImputationPlan {
    pub imputations: Vec<Imputation>,
    /// Indices of targets that could not be estimated
    pub skipped: Vec<usize>,
    pub summary: ImputeSummary,
}

impl ImputationPlan {
    /// Write every estimate into its target and flag it as estimated.
    ///
    /// Returns how many places were updated.
    pub fn apply(&self, places: &mut [Place]) -> usize {
        let mut updated = 0;
        for imputation in &self.imputations {
            if let Some(place) = places.get_mut(imputation.index) {
                place.raw_schedule = Some(imputation.raw_schedule.clone());
                place.estimated = true;
                updated += 1;
            }
        }
        updated
    }
}

/// Spatial schedule imputation engine.
///
/// # Example
/// ```
/// use popularity_imputer::{schedule, ImputeConfig, Imputer, Place};
///
/// let busy = schedule::encode(&schedule::Schedule::filled(60.0));
/// let mut places = vec![
///     Place::new("cafe", 41.3870, 2.1700).with_schedule(busy),
///     Place::new("bakery", 41.3872, 2.1703),
/// ];
///
/// let imputer = Imputer::new(ImputeConfig::default()).unwrap();
/// let summary = imputer.impute(&mut places).unwrap();
///
/// assert_eq!(summary.imputed, 1);
/// assert!(places[1].estimated);
/// ```
#[derive(Debug, Clone)]
pub struct Imputer {
    config: ImputeConfig,
}

impl Imputer {
    /// Create an imputer, rejecting unusable configuration.
    pub fn new(config: ImputeConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &ImputeConfig {
        &self.config
    }

    /// Classify places and decode source schedules.
    pub fn partition(&self, places: &[Place]) -> Partition {
        let mut partition = Partition::default();

        for (index, place) in places.iter().enumerate() {
            if !place.location().is_valid() {
                warn!(
                    "Ignoring place '{}' with invalid coordinates ({}, {})",
                    place.id, place.latitude, place.longitude
                );
                partition.invalid.push(index);
                continue;
            }

            let decoded = place
                .raw_schedule
                .as_deref()
                .and_then(|raw| decode(raw, self.config.day_name_policy));

            match decoded {
                Some(schedule) => {
                    partition.sources.push(index);
                    partition.schedules.insert(index, schedule);
                }
                None => partition.targets.push(index),
            }
        }

        partition
    }

    /// Compute estimates for every target without touching the places.
    pub fn plan(&self, places: &[Place]) -> Result<ImputationPlan> {
        let (partition, selector) = self.prepare(places)?;

        let outcomes: Vec<(usize, Option<Schedule>)> = partition
            .targets
            .iter()
            .map(|&index| (index, self.estimate(&places[index], selector.as_ref(), &partition.schedules)))
            .collect();

        Ok(self.finish(places.len(), &partition, outcomes))
    }

    /// Same as [`Imputer::plan`] but spreads targets over the rayon thread pool.
    ///
    /// Produces exactly the same plan as the sequential version.
    #[cfg(feature = "parallel")]
    pub fn plan_parallel(&self, places: &[Place]) -> Result<ImputationPlan> {
        use rayon::prelude::*;

        let (partition, selector) = self.prepare(places)?;

        let outcomes: Vec<(usize, Option<Schedule>)> = partition
            .targets
            .par_iter()
            .map(|&index| (index, self.estimate(&places[index], selector.as_ref(), &partition.schedules)))
            .collect();

        Ok(self.finish(places.len(), &partition, outcomes))
    }

    /// Plan and apply in one call.
    pub fn impute(&self, places: &mut [Place]) -> Result<ImputeSummary> {
        let plan = self.plan(places)?;
        plan.apply(places);
        Ok(plan.summary)
    }

    /// Parallel [`Imputer::impute`].
    #[cfg(feature = "parallel")]
    pub fn impute_parallel(&self, places: &mut [Place]) -> Result<ImputeSummary> {
        let plan = self.plan_parallel(places)?;
        plan.apply(places);
        Ok(plan.summary)
    }

    /// Estimate one schedule for a location from the given sources.
    pub fn estimate_at(
        &self,
        location: &GeoPoint,
        selector: &dyn NeighborSelector,
        schedules: &HashMap<usize, Schedule>,
    ) -> Option<Schedule> {
        let neighbors = selector.select(location, self.config.k_neighbors as usize);
        let weighted = relative_weights(
            &neighbors,
            schedules,
            self.config.distance_floor_meters,
            self.config.weight_exponent,
        );
        aggregate(&weighted, schedules)
    }

    fn estimate(
        &self,
        place: &Place,
        selector: &dyn NeighborSelector,
        schedules: &HashMap<usize, Schedule>,
    ) -> Option<Schedule> {
        let estimate = self.estimate_at(&place.location(), selector, schedules);
        if estimate.is_none() {
            debug!("No neighbor schedule contributed to '{}', leaving it empty", place.id);
        }
        estimate
    }

    fn prepare(&self, places: &[Place]) -> Result<(Partition, Box<dyn NeighborSelector>)> {
        let partition = self.partition(places);
        info!(
            "Imputing schedules: {} places, {} sources, {} targets, {} invalid",
            places.len(),
            partition.sources.len(),
            partition.targets.len(),
            partition.invalid.len()
        );

        if partition.sources.is_empty() {
            warn!("No source schedules found, nothing to spread");
            return Err(ImputeError::NoSources { targets: partition.targets.len() });
        }

        let source_points: Vec<SourcePoint> = partition
            .sources
            .iter()
            .map(|&index| SourcePoint { key: index, point: places[index].location() })
            .collect();
        let selector = build_selector(
            self.config.neighbor_strategy,
            source_points,
            self.config.earth_radius_meters,
        );

        Ok((partition, selector))
    }

    fn finish(
        &self,
        total_places: usize,
        partition: &Partition,
        outcomes: Vec<(usize, Option<Schedule>)>,
    ) -> ImputationPlan {
        let mut plan = ImputationPlan::default();

        for (index, estimate) in outcomes {
            match estimate {
                Some(schedule) => {
                    let raw_schedule = encode(&schedule);
                    plan.imputations.push(Imputation { index, schedule, raw_schedule });
                }
                None => plan.skipped.push(index),
            }
        }

        plan.summary = ImputeSummary {
            total_places: saturating_count(total_places),
            sources: saturating_count(partition.sources.len()),
            targets: saturating_count(partition.targets.len()),
            invalid: saturating_count(partition.invalid.len()),
            imputed: saturating_count(plan.imputations.len()),
            skipped: saturating_count(plan.skipped.len()),
        };

        info!(
            "Filled {} of {} missing schedules ({} skipped)",
            plan.summary.imputed, plan.summary.targets, plan.summary.skipped
        );
        plan
    }
}

fn saturating_count(len: usize) -> u32 {
    u32::try_from(len).unwrap_or(u32::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schedule::DayNamePolicy;

    fn constant(value: f64) -> String {
        encode(&Schedule::filled(value))
    }

    fn config_k(k: u32) -> ImputeConfig {
        ImputeConfig { k_neighbors: k, ..Default::default() }
    }

    fn schedule_of(place: &Place) -> Schedule {
        decode(place.raw_schedule.as_deref().unwrap(), DayNamePolicy::Strict).unwrap()
    }

    #[test]
    fn test_midpoint_between_two_sources() {
        let mut places = vec![
            Place::new("A", 0.0, 0.0).with_schedule(constant(10.0)),
            Place::new("B", 0.0, 1.0).with_schedule(constant(20.0)),
            Place::new("T", 0.0, 0.5),
        ];

        let imputer = Imputer::new(config_k(2)).unwrap();
        let summary = imputer.impute(&mut places).unwrap();

        assert_eq!(summary.imputed, 1);
        assert_eq!(summary.skipped, 0);
        assert!(places[2].estimated);
        assert_eq!(schedule_of(&places[2]), Schedule::filled(15.0));
    }

    #[test]
    fn test_colocated_source_dominates() {
        let mut places = vec![
            Place::new("near", 41.3870, 2.1700).with_schedule(constant(80.0)),
            Place::new("far1", 41.3970, 2.1700).with_schedule(constant(0.0)),
            Place::new("far2", 41.3870, 2.1850).with_schedule(constant(0.0)),
            Place::new("target", 41.3870, 2.1700),
        ];

        let imputer = Imputer::new(ImputeConfig::default()).unwrap();
        imputer.impute(&mut places).unwrap();

        let value = schedule_of(&places[3]).get(0, 0);
        assert!(value >= 79.0, "expected near-source dominance, got {}", value);
        assert!(value < 80.0, "floor should keep far sources contributing, got {}", value);
    }

    #[test]
    fn test_large_exponent_still_imputes() {
        // Half a degree of latitude is about 55 km
        let mut places = vec![
            Place::new("A", 0.0, 0.0).with_schedule(constant(30.0)),
            Place::new("T", 0.5, 0.0),
        ];
        let config = ImputeConfig { weight_exponent: 400.0, ..Default::default() };

        let summary = Imputer::new(config).unwrap().impute(&mut places).unwrap();
        assert_eq!(summary.imputed, 1);
        assert_eq!(summary.skipped, 0);
        assert_eq!(schedule_of(&places[1]), Schedule::filled(30.0));
    }

    #[test]
    fn test_counts_saturate() {
        assert_eq!(saturating_count(7), 7);
        assert_eq!(saturating_count(u32::MAX as usize), u32::MAX);
        #[cfg(target_pointer_width = "64")]
        assert_eq!(saturating_count(u32::MAX as usize + 1), u32::MAX);
    }

    #[test]
    fn test_sources_are_not_modified() {
        let a = constant(10.0);
        let mut places = vec![
            Place::new("A", 0.0, 0.0).with_schedule(a.clone()),
            Place::new("T", 0.0, 0.1),
        ];

        Imputer::new(ImputeConfig::default()).unwrap().impute(&mut places).unwrap();
        assert_eq!(places[0].raw_schedule.as_deref(), Some(a.as_str()));
        assert!(!places[0].estimated);
    }

    #[test]
    fn test_targets_do_not_feed_each_other() {
        // T1 sits on top of T2; if T1's estimate were reused, T2 would be 10 too
        let mut places = vec![
            Place::new("A", 0.0, 0.0).with_schedule(constant(10.0)),
            Place::new("B", 0.0, 1.0).with_schedule(constant(30.0)),
            Place::new("T1", 0.0, 0.001),
            Place::new("T2", 0.0, 0.999),
        ];

        Imputer::new(config_k(1)).unwrap().impute(&mut places).unwrap();
        assert_eq!(schedule_of(&places[2]), Schedule::filled(10.0));
        assert_eq!(schedule_of(&places[3]), Schedule::filled(30.0));
    }

    #[test]
    fn test_k_larger_than_sources_uses_all() {
        let mut places = vec![
            Place::new("A", 0.0, 0.0).with_schedule(constant(10.0)),
            Place::new("B", 0.0, 1.0).with_schedule(constant(20.0)),
            Place::new("T", 0.0, 0.5),
        ];

        let summary = Imputer::new(config_k(10)).unwrap().impute(&mut places).unwrap();
        assert_eq!(summary.imputed, 1);
        assert_eq!(schedule_of(&places[2]), Schedule::filled(15.0));
    }

    #[test]
    fn test_undecodable_schedules_are_targets() {
        let places = vec![
            Place::new("A", 0.0, 0.0).with_schedule(constant(10.0)),
            Place::new("broken", 0.0, 0.1).with_schedule("[{\"name\": \"Monday\"}]".to_string()),
            Place::new("empty", 0.0, 0.2).with_schedule(String::new()),
            Place::new("none", 0.0, 0.3),
        ];

        let partition = Imputer::new(ImputeConfig::default()).unwrap().partition(&places);
        assert_eq!(partition.sources, vec![0]);
        assert_eq!(partition.targets, vec![1, 2, 3]);
        assert!(partition.schedules.contains_key(&0));
    }

    #[test]
    fn test_invalid_coordinates_are_excluded() {
        let mut places = vec![
            Place::new("A", 0.0, 0.0).with_schedule(constant(10.0)),
            Place::new("bad-source", f64::NAN, 0.0).with_schedule(constant(90.0)),
            Place::new("bad-target", 95.0, 0.0),
            Place::new("T", 0.0, 0.1),
        ];

        let summary = Imputer::new(ImputeConfig::default()).unwrap().impute(&mut places).unwrap();
        assert_eq!(summary.invalid, 2);
        assert_eq!(summary.sources, 1);
        assert_eq!(summary.targets, 1);
        assert_eq!(summary.imputed, 1);
        assert!(places[2].raw_schedule.is_none());
        assert_eq!(schedule_of(&places[3]), Schedule::filled(10.0));
    }

    #[test]
    fn test_no_sources_is_an_error() {
        let mut places = vec![
            Place::new("T1", 0.0, 0.0).with_schedule("not json".to_string()),
            Place::new("T2", 0.0, 1.0),
        ];

        let result = Imputer::new(ImputeConfig::default()).unwrap().impute(&mut places);
        assert!(matches!(result, Err(ImputeError::NoSources { targets: 2 })));
        assert!(places.iter().all(|p| !p.estimated));
    }

    #[test]
    fn test_skipped_targets_are_counted() {
        let imputer = Imputer::new(ImputeConfig::default()).unwrap();
        let places = vec![
            Place::new("A", 0.0, 0.0).with_schedule(constant(10.0)),
            Place::new("T1", 0.0, 0.5),
            Place::new("T2", 0.0, 0.6),
        ];
        let (partition, selector) = imputer.prepare(&places).unwrap();

        // Lookup without any schedules: every neighbor is undecodable
        let outcomes = partition
            .targets
            .iter()
            .map(|&i| (i, imputer.estimate(&places[i], selector.as_ref(), &HashMap::new())))
            .collect();
        let plan = imputer.finish(places.len(), &partition, outcomes);

        assert_eq!(plan.summary.skipped, 2);
        assert_eq!(plan.summary.imputed, 0);
        assert_eq!(plan.skipped, vec![1, 2]);
    }

    #[test]
    fn test_invalid_config_rejected() {
        let result = Imputer::new(config_k(0));
        assert!(matches!(result, Err(ImputeError::InvalidConfig(_))));
    }

    #[test]
    fn test_plan_does_not_mutate_until_applied() {
        let mut places = vec![
            Place::new("A", 0.0, 0.0).with_schedule(constant(10.0)),
            Place::new("T", 0.0, 0.1),
        ];

        let plan = Imputer::new(ImputeConfig::default()).unwrap().plan(&places).unwrap();
        assert!(places[1].raw_schedule.is_none());
        assert_eq!(plan.imputations.len(), 1);

        assert_eq!(plan.apply(&mut places), 1);
        assert!(places[1].estimated);
    }

    #[test]
    fn test_rtree_strategy_matches_brute_force() {
        let mut places: Vec<Place> = (0..60)
            .map(|i| {
                let lat = 41.38 + (i % 8) as f64 * 0.003;
                let lng = 2.15 + (i / 8) as f64 * 0.004;
                let place = Place::new(&format!("p{}", i), lat, lng);
                if i % 3 == 0 {
                    place
                } else {
                    place.with_schedule(constant((i * 7 % 100) as f64))
                }
            })
            .collect();
        let mut rtree_places = places.clone();

        let brute = Imputer::new(ImputeConfig::default()).unwrap();
        let rtree = Imputer::new(ImputeConfig {
            neighbor_strategy: crate::NeighborStrategy::RTree,
            ..Default::default()
        })
        .unwrap();

        let a = brute.impute(&mut places).unwrap();
        let b = rtree.impute(&mut rtree_places).unwrap();
        assert_eq!(a, b);
        for (p, q) in places.iter().zip(&rtree_places) {
            assert_eq!(p.raw_schedule, q.raw_schedule);
        }
    }

    #[cfg(feature = "parallel")]
    #[test]
    fn test_parallel_matches_sequential() {
        let places: Vec<Place> = (0..200)
            .map(|i| {
                let place = Place::new(&format!("p{}", i), 41.38 + i as f64 * 0.0005, 2.17 - i as f64 * 0.0003);
                if i % 4 == 0 {
                    place.with_schedule(constant((i % 90) as f64))
                } else {
                    place
                }
            })
            .collect();

        let imputer = Imputer::new(ImputeConfig::default()).unwrap();
        let sequential = imputer.plan(&places).unwrap();
        let parallel = imputer.plan_parallel(&places).unwrap();

        assert_eq!(sequential.summary, parallel.summary);
        assert_eq!(sequential.imputations, parallel.imputations);
        assert_eq!(sequential.skipped, parallel.skipped);
    }
}
