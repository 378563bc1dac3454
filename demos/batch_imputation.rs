//! Example of imputing a large synthetic city in parallel.
//!
//! Run with: cargo run --example batch_imputation --features parallel

use popularity_imputer::schedule::{encode, Schedule, HOURS_PER_DAY};
use popularity_imputer::{ImputeConfig, Imputer, NeighborStrategy, Place};
use std::time::Instant;

/// Lunch and evening peaks, scaled per place
fn daily_profile(scale: f64) -> Schedule {
    let mut rows = [[0.0; HOURS_PER_DAY]; 7];
    for (day, row) in rows.iter_mut().enumerate() {
        let weekend = if day >= 5 { 1.3 } else { 1.0 };
        for (hour, cell) in row.iter_mut().enumerate() {
            let lunch = (-((hour as f64 - 13.0).powi(2)) / 4.0).exp();
            let evening = (-((hour as f64 - 20.0).powi(2)) / 6.0).exp();
            *cell = ((lunch + evening) * 50.0 * scale * weekend).min(100.0).floor();
        }
    }
    Schedule::from_rows(rows)
}

fn main() {
    println!("Batch Imputation Example\n");

    // 120 x 120 grid over central Barcelona, one in five places observed
    let mut places = Vec::new();
    for row in 0..120 {
        for col in 0..120 {
            let id = format!("poi-{}-{}", row, col);
            let place = Place::new(id, 41.36 + row as f64 * 0.0005, 2.12 + col as f64 * 0.0006);
            if (row * 7 + col * 3) % 5 == 0 {
                let scale = 0.5 + ((row + col) % 10) as f64 / 10.0;
                places.push(place.with_schedule(encode(&daily_profile(scale))));
            } else {
                places.push(place);
            }
        }
    }
    println!("Generated {} places", places.len());

    for strategy in [NeighborStrategy::BruteForce, NeighborStrategy::RTree] {
        let config = ImputeConfig { neighbor_strategy: strategy, ..Default::default() };
        let imputer = Imputer::new(config).expect("default config is valid");
        let mut batch = places.clone();

        let start = Instant::now();
        let summary = imputer.impute_parallel(&mut batch).expect("sources exist");
        let elapsed = start.elapsed();

        println!(
            "{:?}: filled {} of {} targets in {:?}",
            strategy, summary.imputed, summary.targets, elapsed
        );
    }
}
