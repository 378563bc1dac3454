//! Fill missing popularity schedules in a places CSV.
//!
//! Run with: cargo run --features cli --bin impute-places -- places.csv --output filled.csv

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{ArgGroup, Parser, ValueEnum};
use log::info;

use popularity_imputer::{
    export_heatmap, ColumnNames, DayNamePolicy, ImputeConfig, Imputer, NeighborStrategy, PlaceTable,
};

#[derive(Parser, Debug)]
#[command(name = "impute-places", about = "Estimate missing weekly schedules from nearby places")]
#[command(group(ArgGroup::new("destination").required(true).args(["output", "in_place"])))]
struct Args {
    /// Places CSV with latitude, longitude and schedule columns
    input: PathBuf,

    /// Where to write the filled CSV
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Overwrite the input file (no backup is taken)
    #[arg(long)]
    in_place: bool,

    /// JSON file with imputation settings; flags below override it
    #[arg(long)]
    config: Option<PathBuf>,

    /// Number of nearby sources to average
    #[arg(short, long)]
    k: Option<u32>,

    /// Minimum distance used for weighting, in meters
    #[arg(long)]
    floor: Option<f64>,

    /// Inverse-distance weighting power
    #[arg(long)]
    exponent: Option<f64>,

    /// Neighbor search implementation
    #[arg(long, value_enum)]
    strategy: Option<Strategy>,

    /// Sort unknown weekday names as Monday instead of rejecting the schedule
    #[arg(long)]
    lenient_day_names: bool,

    /// Also write heatmap JSON for every place with a schedule
    #[arg(long)]
    heatmap: Option<PathBuf>,

    #[arg(long, default_value = "google_id")]
    id_column: String,

    #[arg(long, default_value = "name")]
    name_column: String,

    #[arg(long, default_value = "popular_times")]
    schedule_column: String,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Strategy {
    BruteForce,
    RTree,
}

impl From<Strategy> for NeighborStrategy {
    fn from(strategy: Strategy) -> Self {
        match strategy {
            Strategy::BruteForce => NeighborStrategy::BruteForce,
            Strategy::RTree => NeighborStrategy::RTree,
        }
    }
}

impl Args {
    fn impute_config(&self) -> Result<ImputeConfig> {
        let mut config = match &self.config {
            Some(path) => ImputeConfig::from_json_file(path)
                .with_context(|| format!("reading config {}", path.display()))?,
            None => ImputeConfig::default(),
        };

        if let Some(k) = self.k {
            config.k_neighbors = k;
        }
        if let Some(floor) = self.floor {
            config.distance_floor_meters = floor;
        }
        if let Some(exponent) = self.exponent {
            config.weight_exponent = exponent;
        }
        if let Some(strategy) = self.strategy {
            config.neighbor_strategy = strategy.into();
        }
        if self.lenient_day_names {
            config.day_name_policy = DayNamePolicy::Lenient;
        }
        Ok(config)
    }

    fn column_names(&self) -> ColumnNames {
        ColumnNames {
            id: Some(self.id_column.clone()),
            name: Some(self.name_column.clone()),
            schedule: self.schedule_column.clone(),
            ..Default::default()
        }
    }
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let config = args.impute_config()?;
    let imputer = Imputer::new(config.clone())?;

    let output = match (&args.output, args.in_place) {
        (Some(path), _) => path.clone(),
        (None, true) => args.input.clone(),
        (None, false) => bail!("either --output or --in-place is required"),
    };

    let mut table = PlaceTable::load_csv(&args.input, &args.column_names())
        .with_context(|| format!("loading {}", args.input.display()))?;
    let mut places = table.places();

    #[cfg(feature = "parallel")]
    let plan = imputer.plan_parallel(&places)?;
    #[cfg(not(feature = "parallel"))]
    let plan = imputer.plan(&places)?;
    plan.apply(&mut places);
    table.apply_places(&places);

    table
        .save_csv(&output)
        .with_context(|| format!("saving {}", output.display()))?;

    if let Some(path) = &args.heatmap {
        export_heatmap(&places, config.day_name_policy, path)
            .with_context(|| format!("exporting heatmap {}", path.display()))?;
    }

    let summary = plan.summary;
    info!(
        "Done: {} places, {} sources, {} targets, {} filled, {} skipped, {} invalid",
        summary.total_places,
        summary.sources,
        summary.targets,
        summary.imputed,
        summary.skipped,
        summary.invalid
    );
    Ok(())
}
