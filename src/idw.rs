//! Inverse-distance weighting and schedule aggregation.

use std::collections::HashMap;

use crate::neighbors::Neighbor;
use crate::schedule::Schedule;

/// Values this close to an integer are float noise from the weighted mean.
const SNAP_EPSILON: f64 = 1e-9;

/// Interpolation weight for a source at `distance_meters`.
///
/// Computed as `1 / max(distance, floor)^exponent`. The floor keeps a colocated
/// source from producing an infinite weight.
///
/// # Example
///
/// ```rust
/// use popularity_imputer::idw::inverse_distance_weight;
///
/// assert_eq!(inverse_distance_weight(0.0, 50.0, 2.0), inverse_distance_weight(50.0, 50.0, 2.0));
/// assert_eq!(inverse_distance_weight(100.0, 50.0, 2.0), 1e-4);
/// ```
#[inline]
pub fn inverse_distance_weight(distance_meters: f64, floor_meters: f64, exponent: f64) -> f64 {
    1.0 / distance_meters.max(floor_meters).powf(exponent)
}

/// A selected neighbor with its interpolation weight.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WeightedNeighbor {
    pub key: usize,
    pub weight: f64,
}

/// Inverse-distance weights scaled so the nearest neighbor with a schedule weighs 1.
///
/// Each weight is `(max(d_min, floor) / max(d, floor))^exponent`, which is
/// [`inverse_distance_weight`] divided by a common factor. The weighted mean is
/// unchanged, but large exponents no longer underflow every weight to zero.
/// Returns an empty list when no neighbor has a schedule.
pub fn relative_weights(
    neighbors: &[Neighbor],
    schedules: &HashMap<usize, Schedule>,
    floor_meters: f64,
    exponent: f64,
) -> Vec<WeightedNeighbor> {
    let nearest = neighbors
        .iter()
        .filter(|n| schedules.contains_key(&n.key))
        .map(|n| n.distance_meters.max(floor_meters))
        .fold(f64::INFINITY, f64::min);
    if !nearest.is_finite() {
        return Vec::new();
    }

    neighbors
        .iter()
        .map(|n| WeightedNeighbor {
            key: n.key,
            weight: (nearest / n.distance_meters.max(floor_meters)).powf(exponent),
        })
        .collect()
}

/// Weighted average of the neighbors' schedules.
///
/// Neighbors absent from `schedules` are left out of both the weighted sum and
/// the total weight. Returns `None` when nothing contributes, in which case the
/// target must be left as is.
///
/// Each cell of the result is truncated toward zero and clamped at zero. A cell
/// within 1e-9 of an integer is first snapped to that integer, so the mean of
/// identical schedules reproduces them exactly instead of truncating
/// 14.999999999 down to 14.
pub fn aggregate(neighbors: &[WeightedNeighbor], schedules: &HashMap<usize, Schedule>) -> Option<Schedule> {
    let mut sum = Schedule::filled(0.0);
    let mut total_weight = 0.0;

    for neighbor in neighbors {
        let Some(schedule) = schedules.get(&neighbor.key) else {
            continue;
        };
        if !neighbor.weight.is_finite() || neighbor.weight <= 0.0 {
            continue;
        }

        for (acc_row, row) in sum.rows_mut().iter_mut().zip(schedule.rows()) {
            for (acc, value) in acc_row.iter_mut().zip(row) {
                *acc += value * neighbor.weight;
            }
        }
        total_weight += neighbor.weight;
    }

    if total_weight <= 0.0 {
        return None;
    }

    for row in sum.rows_mut() {
        for cell in row.iter_mut() {
            *cell = truncate(*cell / total_weight);
        }
    }
    Some(sum)
}

fn truncate(value: f64) -> f64 {
    let nearest = value.round();
    let snapped = if (value - nearest).abs() < SNAP_EPSILON { nearest } else { value.trunc() };
    // Also turns -0.0 into 0.0
    if snapped <= 0.0 {
        0.0
    } else {
        snapped
    }
}
