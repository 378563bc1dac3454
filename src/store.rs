//! Loading and saving place collections.
//!
//! The engine works on [`Place`] records; this module moves them in and out of
//! the CSV table they are stored in, and writes the compact JSON consumed by the
//! heatmap front end.
//!
//! Columns other than the ones named in [`ColumnNames`] are carried through
//! untouched, and rows keep their order, so a load/save round trip only changes
//! the schedule cells of imputed places.

use std::io::{BufWriter, Read, Write};
use std::path::Path;

use serde::Serialize;
use serde_json::Value;

use crate::error::StoreError;
use crate::schedule::{decode, DayNamePolicy};
use crate::Place;

/// Header names of the columns the engine reads and writes.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnNames {
    /// Identifier column; rows fall back to `row-N` when absent or blank
    pub id: Option<String>,
    /// Display name column
    pub name: Option<String>,
    pub latitude: String,
    pub longitude: String,
    /// Column holding the raw schedule JSON
    pub schedule: String,
}

impl Default for ColumnNames {
    fn default() -> Self {
        Self {
            id: Some("google_id".to_string()),
            name: Some("name".to_string()),
            latitude: "latitude".to_string(),
            longitude: "longitude".to_string(),
            schedule: "popular_times".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct ColumnIndices {
    id: Option<usize>,
    name: Option<usize>,
    latitude: usize,
    longitude: usize,
    schedule: usize,
}

/// A CSV table of places, kept as read so it can be written back faithfully.
#[derive(Debug, Clone)]
pub struct PlaceTable {
    headers: csv::StringRecord,
    rows: Vec<csv::StringRecord>,
    columns: ColumnIndices,
}

impl PlaceTable {
    /// Read a CSV file with a header row.
    pub fn load_csv(path: impl AsRef<Path>, columns: &ColumnNames) -> Result<Self, StoreError> {
        let file = fs_err::File::open(path.as_ref())?;
        Self::from_reader(file, columns)
    }

    /// Read CSV data with a header row from any reader.
    pub fn from_reader<R: Read>(reader: R, columns: &ColumnNames) -> Result<Self, StoreError> {
        let mut reader = csv::Reader::from_reader(reader);
        let headers = reader.headers()?.clone();

        let find = |name: &str| headers.iter().position(|h| h == name);
        let require = |name: &str| find(name).ok_or_else(|| StoreError::MissingColumn(name.to_string()));

        let columns = ColumnIndices {
            id: columns.id.as_deref().and_then(find),
            name: columns.name.as_deref().and_then(find),
            latitude: require(columns.latitude.as_str())?,
            longitude: require(columns.longitude.as_str())?,
            schedule: require(columns.schedule.as_str())?,
        };

        let rows = reader.records().collect::<Result<Vec<_>, _>>()?;
        log::info!("Loaded {} places", rows.len());

        Ok(Self { headers, rows, columns })
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn headers(&self) -> impl Iterator<Item = &str> {
        self.headers.iter()
    }

    /// Typed places, one per row and in row order.
    ///
    /// Coordinates that fail to parse become NaN, which the imputer rejects as
    /// invalid rather than guessing.
    pub fn places(&self) -> Vec<Place> {
        self.rows
            .iter()
            .enumerate()
            .map(|(i, row)| {
                let field = |idx: usize| row.get(idx).unwrap_or("").trim();
                let coordinate = |idx: usize| field(idx).parse::<f64>().unwrap_or(f64::NAN);

                let id = self
                    .columns
                    .id
                    .map(field)
                    .filter(|s| !s.is_empty())
                    .map(str::to_string)
                    .unwrap_or_else(|| format!("row-{}", i + 1));
                let name = self
                    .columns
                    .name
                    .map(field)
                    .filter(|s| !s.is_empty())
                    .map(str::to_string);
                let raw_schedule = Some(field(self.columns.schedule))
                    .filter(|s| !s.is_empty())
                    .map(str::to_string);

                Place {
                    id,
                    name,
                    latitude: coordinate(self.columns.latitude),
                    longitude: coordinate(self.columns.longitude),
                    raw_schedule,
                    estimated: false,
                }
            })
            .collect()
    }

    /// Copy estimated schedules back into the schedule column.
    ///
    /// `places` must be in row order, as returned by [`PlaceTable::places`].
    /// Places not flagged as estimated are left alone. Returns the number of rows
    /// changed.
    pub fn apply_places(&mut self, places: &[Place]) -> usize {
        let schedule_idx = self.columns.schedule;
        let mut changed = 0;

        for (row, place) in self.rows.iter_mut().zip(places) {
            if !place.estimated {
                continue;
            }
            let Some(raw) = place.raw_schedule.as_deref() else {
                continue;
            };

            let updated: csv::StringRecord = row
                .iter()
                .enumerate()
                .map(|(i, field)| if i == schedule_idx { raw } else { field })
                .collect();
            *row = updated;
            changed += 1;
        }

        changed
    }

    /// Write the table, header first, to a CSV file.
    pub fn save_csv(&self, path: impl AsRef<Path>) -> Result<(), StoreError> {
        let file = fs_err::File::create(path.as_ref())?;
        self.to_writer(file)?;
        log::info!("Saved {} places to {}", self.rows.len(), path.as_ref().display());
        Ok(())
    }

    /// Write the table as CSV to any writer.
    pub fn to_writer<W: Write>(&self, writer: W) -> Result<(), StoreError> {
        let mut writer = csv::Writer::from_writer(writer);
        writer.write_record(&self.headers)?;
        for row in &self.rows {
            writer.write_record(row)?;
        }
        writer.flush()?;
        Ok(())
    }
}

// =============================================================================
// Heatmap Export
// =============================================================================

#[derive(Serialize)]
struct HeatmapEntry {
    lat: f64,
    lon: f64,
    /// Seven rows of 24 values, Monday first
    schedule: Vec<Value>,
}

/// Write every place with a usable schedule as minified heatmap JSON.
///
/// Output is `[{"lat":..,"lon":..,"schedule":[[24 values] x 7]}, ...]`.
/// Returns the number of places written.
pub fn export_heatmap(
    places: &[Place],
    policy: DayNamePolicy,
    path: impl AsRef<Path>,
) -> Result<usize, StoreError> {
    let file = fs_err::File::create(path.as_ref())?;
    let count = write_heatmap(places, policy, file)?;
    log::info!("Exported {} heatmap locations to {}", count, path.as_ref().display());
    Ok(count)
}

/// [`export_heatmap`] to any writer.
pub fn write_heatmap<W: Write>(places: &[Place], policy: DayNamePolicy, writer: W) -> Result<usize, StoreError> {
    let entries: Vec<HeatmapEntry> = places
        .iter()
        .filter(|p| p.location().is_valid())
        .filter_map(|p| {
            let schedule = decode(p.raw_schedule.as_deref()?, policy)?;
            Some(HeatmapEntry {
                lat: p.latitude,
                lon: p.longitude,
                schedule: schedule.to_json_rows(),
            })
        })
        .collect();

    let mut writer = BufWriter::new(writer);
    serde_json::to_writer(&mut writer, &entries)?;
    writer.flush()?;
    Ok(entries.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schedule::{encode, Schedule};

    fn sample_csv() -> String {
        let week = encode(&Schedule::filled(30.0)).replace('"', "\"\"");
        format!(
            "name,longitude,latitude,google_id,attributes,popular_times\n\
             Casa Batllo,2.1649,41.3916,abc123,\"['museum']\",\"{}\"\n\
             Park Guell,2.1527,41.4145,,,\n\
             Broken,not-a-number,41.40,def456,,\n",
            week
        )
    }

    #[test]
    fn test_load_places() {
        let table = PlaceTable::from_reader(sample_csv().as_bytes(), &ColumnNames::default()).unwrap();
        assert_eq!(table.len(), 3);

        let places = table.places();
        assert_eq!(places[0].id, "abc123");
        assert_eq!(places[0].name.as_deref(), Some("Casa Batllo"));
        assert_eq!(places[0].latitude, 41.3916);
        assert!(places[0].raw_schedule.is_some());

        assert_eq!(places[1].id, "row-2");
        assert!(places[1].raw_schedule.is_none());

        assert!(places[2].longitude.is_nan());
        assert!(!places[2].location().is_valid());
    }

    #[test]
    fn test_missing_column() {
        let csv = "name,lat,lng\nA,1,2\n";
        let result = PlaceTable::from_reader(csv.as_bytes(), &ColumnNames::default());
        assert!(matches!(result, Err(StoreError::MissingColumn(c)) if c == "latitude"));
    }

    #[test]
    fn test_round_trip_preserves_other_columns() {
        let mut table = PlaceTable::from_reader(sample_csv().as_bytes(), &ColumnNames::default()).unwrap();

        let mut places = table.places();
        places[1].raw_schedule = Some(encode(&Schedule::filled(12.0)));
        places[1].estimated = true;
        // Not flagged, so it must not be written
        places[2].raw_schedule = Some("ignored".to_string());
        assert_eq!(table.apply_places(&places), 1);

        let mut out = Vec::new();
        table.to_writer(&mut out).unwrap();

        let reloaded = PlaceTable::from_reader(out.as_slice(), &ColumnNames::default()).unwrap();
        let headers: Vec<&str> = reloaded.headers().collect();
        assert_eq!(headers, vec!["name", "longitude", "latitude", "google_id", "attributes", "popular_times"]);

        let again = reloaded.places();
        assert_eq!(again[0].raw_schedule, places[0].raw_schedule);
        assert_eq!(again[1].raw_schedule, places[1].raw_schedule);
        assert!(again[2].raw_schedule.is_none());
        assert_eq!(reloaded.rows[0].get(4), Some("['museum']"));
    }

    #[test]
    fn test_save_and_load_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("places.csv");

        let table = PlaceTable::from_reader(sample_csv().as_bytes(), &ColumnNames::default()).unwrap();
        table.save_csv(&path).unwrap();

        let loaded = PlaceTable::load_csv(&path, &ColumnNames::default()).unwrap();
        // The broken row has a NaN longitude, so compare the first two only
        assert_eq!(loaded.places()[..2], table.places()[..2]);
        assert_eq!(loaded.len(), 3);
    }

    #[test]
    fn test_load_missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = PlaceTable::load_csv(dir.path().join("nope.csv"), &ColumnNames::default());
        assert!(matches!(result, Err(StoreError::Io(_))));
    }

    #[test]
    fn test_heatmap_export() {
        let places = vec![
            Place::new("a", 41.39, 2.16).with_schedule(encode(&Schedule::filled(5.0))),
            Place::new("b", 41.40, 2.17),
            Place::new("c", 41.41, 2.18).with_schedule("garbage"),
        ];

        let mut out = Vec::new();
        let count = write_heatmap(&places, DayNamePolicy::Strict, &mut out).unwrap();
        assert_eq!(count, 1);

        let json: Value = serde_json::from_slice(&out).unwrap();
        let entries = json.as_array().unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0]["lat"], 41.39);
        assert_eq!(entries[0]["lon"], 2.16);
        let schedule = entries[0]["schedule"].as_array().unwrap();
        assert_eq!(schedule.len(), 7);
        assert_eq!(schedule[6].as_array().unwrap().len(), 24);
        assert_eq!(schedule[6][23], 5);
    }

    #[test]
    fn test_heatmap_export_to_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("heatmap.json");
        let places = vec![Place::new("a", 41.39, 2.16).with_schedule(encode(&Schedule::filled(1.0)))];

        assert_eq!(export_heatmap(&places, DayNamePolicy::Strict, &path).unwrap(), 1);
        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.starts_with("[{\"lat\":41.39"));
    }
}
