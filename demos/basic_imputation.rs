//! Basic example of filling one missing schedule from two neighbors.
//!
//! Run with: cargo run --example basic_imputation

use popularity_imputer::schedule::{decode, encode, Schedule};
use popularity_imputer::{geo_utils, ImputeConfig, Imputer, Place};

fn main() {
    // A quiet museum and a busy market on the equator, one degree apart
    let mut places = vec![
        Place::new("museum", 0.0, 0.0).with_schedule(encode(&Schedule::filled(10.0))),
        Place::new("market", 0.0, 1.0).with_schedule(encode(&Schedule::filled(20.0))),
        // Halfway between: no observed data
        Place::new("gallery", 0.0, 0.5),
        // Right next to the museum
        Place::new("cafe", 0.0, 0.0001),
    ];

    let config = ImputeConfig { k_neighbors: 2, ..Default::default() };

    println!("Spatial Imputation Example\n");
    println!(
        "Config: k={}, floor={}m, exponent={}\n",
        config.k_neighbors, config.distance_floor_meters, config.weight_exponent
    );

    for target in &places[2..] {
        for source in &places[..2] {
            let dist = geo_utils::haversine_distance(
                &target.location(),
                &source.location(),
                config.earth_radius_meters,
            );
            println!("  {} -> {}: {:.0}m", target.id, source.id, dist);
        }
    }

    let imputer = match Imputer::new(config) {
        Ok(imputer) => imputer,
        Err(e) => {
            println!("Bad config: {}", e);
            return;
        }
    };

    match imputer.impute(&mut places) {
        Ok(summary) => {
            println!("\nFilled {} of {} targets ({} skipped)\n", summary.imputed, summary.targets, summary.skipped);
        }
        Err(e) => {
            println!("\nImputation failed: {}", e);
            return;
        }
    }

    for place in places.iter().filter(|p| p.estimated) {
        let schedule = place
            .raw_schedule
            .as_deref()
            .and_then(|raw| decode(raw, Default::default()));
        if let Some(schedule) = schedule {
            println!("  {}: Monday 12:00 = {}", place.id, schedule.get(0, 12));
        }
    }
}
