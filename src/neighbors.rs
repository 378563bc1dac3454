//! # Neighbor Selection
//!
//! Ranks source places by great-circle distance to a target and keeps the K closest.
//!
//! Two strategies implement [`NeighborSelector`]:
//! - [`BruteForceSelector`]: measures every source, O(sources) per target
//! - [`RTreeSelector`]: R-tree over unit-sphere positions for large datasets
//!
//! Both return candidates sorted ascending by distance, with ties kept in source
//! order, so swapping one for the other never changes an imputation.

use rstar::{PointDistance, RTree, RTreeObject, AABB};

use crate::config::NeighborStrategy;
use crate::geo_utils::{haversine_distance, unit_vector};
use crate::GeoPoint;

/// A place with a usable schedule, as seen by neighbor search.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SourcePoint {
    /// Key into the source schedule lookup (the place's position in its collection)
    pub key: usize,
    pub point: GeoPoint,
}

/// A candidate source for one target.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Neighbor {
    /// Key of the source place
    pub key: usize,
    /// Great-circle distance from the target in meters
    pub distance_meters: f64,
}

/// Finds the nearest sources to a target.
///
/// Implementations must return at most `k` neighbors sorted ascending by
/// distance, breaking ties by the order sources were supplied in.
pub trait NeighborSelector: Send + Sync {
    fn select(&self, target: &GeoPoint, k: usize) -> Vec<Neighbor>;
}

/// Build the selector for a strategy.
pub fn build_selector(
    strategy: NeighborStrategy,
    sources: Vec<SourcePoint>,
    radius_meters: f64,
) -> Box<dyn NeighborSelector> {
    match strategy {
        NeighborStrategy::BruteForce => Box::new(BruteForceSelector::new(sources, radius_meters)),
        NeighborStrategy::RTree => Box::new(RTreeSelector::new(sources, radius_meters)),
    }
}

/// Rank all `sources` by distance to `target` and keep the first `k`.
///
/// If `k` exceeds the number of sources, every source is returned.
///
/// # Example
///
/// ```rust
/// use popularity_imputer::GeoPoint;
/// use popularity_imputer::neighbors::{select_nearest, SourcePoint};
///
/// let sources = vec![
///     SourcePoint { key: 0, point: GeoPoint::new(0.0, 2.0) },
///     SourcePoint { key: 1, point: GeoPoint::new(0.0, 1.0) },
/// ];
/// let nearest = select_nearest(&GeoPoint::new(0.0, 0.0), &sources, 1, 6_371_000.0);
/// assert_eq!(nearest[0].key, 1);
/// ```
pub fn select_nearest(
    target: &GeoPoint,
    sources: &[SourcePoint],
    k: usize,
    radius_meters: f64,
) -> Vec<Neighbor> {
    let mut candidates: Vec<Neighbor> = sources
        .iter()
        .map(|s| Neighbor {
            key: s.key,
            distance_meters: haversine_distance(target, &s.point, radius_meters),
        })
        .collect();

    // sort_by is stable: equal distances keep source order
    candidates.sort_by(|a, b| a.distance_meters.total_cmp(&b.distance_meters));
    candidates.truncate(k);
    candidates
}

// =============================================================================
// Brute Force
// =============================================================================

/// Exhaustive search over every source.
#[derive(Debug, Clone)]
pub struct BruteForceSelector {
    sources: Vec<SourcePoint>,
    radius_meters: f64,
}

impl BruteForceSelector {
    pub fn new(sources: Vec<SourcePoint>, radius_meters: f64) -> Self {
        Self { sources, radius_meters }
    }
}

impl NeighborSelector for BruteForceSelector {
    fn select(&self, target: &GeoPoint, k: usize) -> Vec<Neighbor> {
        select_nearest(target, &self.sources, k, self.radius_meters)
    }
}

// =============================================================================
// R-tree
// =============================================================================

/// Chord distances this close to the k-th neighbor's are treated as possible ties.
const TIE_TOLERANCE: f64 = 1e-12;

/// A source positioned on the unit sphere for R-tree queries
#[derive(Debug, Clone, Copy)]
struct IndexedSource {
    /// Position in the original source list, for tie-breaking
    order: usize,
    source: SourcePoint,
    pos: [f64; 3],
}

impl RTreeObject for IndexedSource {
    type Envelope = AABB<[f64; 3]>;

    fn envelope(&self) -> Self::Envelope {
        AABB::from_point(self.pos)
    }
}

impl PointDistance for IndexedSource {
    fn distance_2(&self, point: &[f64; 3]) -> f64 {
        let dx = self.pos[0] - point[0];
        let dy = self.pos[1] - point[1];
        let dz = self.pos[2] - point[2];
        dx * dx + dy * dy + dz * dz
    }
}

/// Nearest-neighbor search through an R-tree.
///
/// Sources are indexed by their 3D unit-sphere position; chord length orders
/// points the same way great-circle distance does, so the tree finds the true
/// haversine neighbors. Candidates near the k-th distance are re-ranked with
/// haversine so results match [`BruteForceSelector`].
pub struct RTreeSelector {
    tree: RTree<IndexedSource>,
    radius_meters: f64,
}

impl RTreeSelector {
    pub fn new(sources: Vec<SourcePoint>, radius_meters: f64) -> Self {
        let indexed: Vec<IndexedSource> = sources
            .into_iter()
            .enumerate()
            .filter(|(_, s)| s.point.is_valid())
            .map(|(order, source)| IndexedSource {
                order,
                source,
                pos: unit_vector(&source.point),
            })
            .collect();
        Self {
            tree: RTree::bulk_load(indexed),
            radius_meters,
        }
    }
}

impl NeighborSelector for RTreeSelector {
    fn select(&self, target: &GeoPoint, k: usize) -> Vec<Neighbor> {
        if k == 0 || !target.is_valid() {
            return vec![];
        }

        let query = unit_vector(target);
        let mut picked: Vec<&IndexedSource> = Vec::with_capacity(k);
        let mut kth_distance_2: Option<f64> = None;

        for (item, d2) in self.tree.nearest_neighbor_iter_with_distance_2(&query) {
            if let Some(limit) = kth_distance_2 {
                if d2 > limit + TIE_TOLERANCE {
                    break;
                }
            }
            picked.push(item);
            if picked.len() == k {
                kth_distance_2 = Some(d2);
            }
        }

        picked.sort_by_key(|item| item.order);
        let mut neighbors: Vec<Neighbor> = picked
            .iter()
            .map(|item| Neighbor {
                key: item.source.key,
                distance_meters: haversine_distance(target, &item.source.point, self.radius_meters),
            })
            .collect();
        neighbors.sort_by(|a, b| a.distance_meters.total_cmp(&b.distance_meters));
        neighbors.truncate(k);
        neighbors
    }
}
