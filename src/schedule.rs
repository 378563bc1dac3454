//! # Schedule Codec
//!
//! Conversion between the raw weekly popularity text stored with each place and the
//! canonical 7x24 [`Schedule`] matrix.
//!
//! The raw form is a JSON array of seven day entries:
//!
//! ```json
//! [{"name": "Monday", "data": [0, 0, 5, ...24 values]}, ...]
//! ```
//!
//! Entries may arrive in any order; decoding always produces Monday-first rows.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ScheduleError;

/// Days per schedule
pub const DAYS_PER_WEEK: usize = 7;

/// Hourly values per day
pub const HOURS_PER_DAY: usize = 24;

/// Canonical weekday names, Monday first.
pub const WEEKDAY_NAMES: [&str; DAYS_PER_WEEK] = [
    "Monday",
    "Tuesday",
    "Wednesday",
    "Thursday",
    "Friday",
    "Saturday",
    "Sunday",
];

/// How to treat a weekday name outside [`WEEKDAY_NAMES`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
#[cfg_attr(feature = "ffi", derive(uniffi::Enum))]
pub enum DayNamePolicy {
    /// Unknown or repeated weekday names fail the decode
    #[default]
    Strict,
    /// Unknown names sort as Monday and input order breaks ties (legacy behavior)
    Lenient,
}

/// A week of hourly activity levels.
///
/// Row 0 is Monday, row 6 is Sunday. Always exactly 7x24.
#[derive(Debug, Clone, PartialEq)]
pub struct Schedule {
    hours: [[f64; HOURS_PER_DAY]; DAYS_PER_WEEK],
}

impl Schedule {
    /// Schedule with every cell set to `value`.
    pub fn filled(value: f64) -> Self {
        Self { hours: [[value; HOURS_PER_DAY]; DAYS_PER_WEEK] }
    }

    /// Build from a Monday-first matrix.
    pub fn from_rows(hours: [[f64; HOURS_PER_DAY]; DAYS_PER_WEEK]) -> Self {
        Self { hours }
    }

    /// Value for a weekday (0 = Monday) and hour.
    ///
    /// Panics if `day >= 7` or `hour >= 24`.
    pub fn get(&self, day: usize, hour: usize) -> f64 {
        self.hours[day][hour]
    }

    /// The 24 hourly values of one weekday.
    pub fn day(&self, day: usize) -> &[f64; HOURS_PER_DAY] {
        &self.hours[day]
    }

    /// All rows, Monday first.
    pub fn rows(&self) -> &[[f64; HOURS_PER_DAY]; DAYS_PER_WEEK] {
        &self.hours
    }

    pub(crate) fn rows_mut(&mut self) -> &mut [[f64; HOURS_PER_DAY]; DAYS_PER_WEEK] {
        &mut self.hours
    }

    /// Rows as JSON arrays; integral values become JSON integers.
    pub(crate) fn to_json_rows(&self) -> Vec<Value> {
        self.hours
            .iter()
            .map(|row| Value::Array(row.iter().map(|&v| json_number(v)).collect()))
            .collect()
    }
}

#[derive(Debug, Deserialize)]
struct RawDay {
    name: String,
    data: Vec<f64>,
}

/// Output form of one day; field order is the wire order.
#[derive(Serialize)]
struct RawDayOut<'a> {
    name: &'a str,
    data: Value,
}

/// Index of a weekday name (0 = Monday).
pub fn weekday_index(name: &str) -> Option<usize> {
    WEEKDAY_NAMES.iter().position(|&n| n == name)
}

/// Decode a raw schedule, returning `None` for anything that is not a valid week.
///
/// # Example
///
/// ```rust
/// use popularity_imputer::schedule::{decode, encode, DayNamePolicy, Schedule};
///
/// let raw = encode(&Schedule::filled(42.0));
/// let schedule = decode(&raw, DayNamePolicy::Strict).unwrap();
/// assert_eq!(schedule.get(6, 23), 42.0);
///
/// assert!(decode("", DayNamePolicy::Strict).is_none());
/// ```
pub fn decode(raw: &str, policy: DayNamePolicy) -> Option<Schedule> {
    match try_decode(raw, policy) {
        Ok(schedule) => Some(schedule),
        Err(ScheduleError::Empty) => None,
        Err(e) => {
            log::debug!("Discarding schedule: {}", e);
            None
        }
    }
}

/// Decode a raw schedule, reporting why it was rejected.
pub fn try_decode(raw: &str, policy: DayNamePolicy) -> Result<Schedule, ScheduleError> {
    if raw.trim().is_empty() {
        return Err(ScheduleError::Empty);
    }

    let days: Vec<RawDay> = serde_json::from_str(raw)?;
    if days.len() != DAYS_PER_WEEK {
        return Err(ScheduleError::DayCount(days.len()));
    }

    for day in &days {
        if day.data.len() != HOURS_PER_DAY {
            return Err(ScheduleError::HourCount {
                day: day.name.clone(),
                count: day.data.len(),
            });
        }
    }

    let ordered = match policy {
        DayNamePolicy::Strict => order_strict(days)?,
        DayNamePolicy::Lenient => order_lenient(days),
    };

    let mut hours = [[0.0; HOURS_PER_DAY]; DAYS_PER_WEEK];
    for (row, day) in hours.iter_mut().zip(ordered) {
        row.copy_from_slice(&day.data);
    }
    Ok(Schedule { hours })
}

/// Each weekday must appear exactly once.
fn order_strict(days: Vec<RawDay>) -> Result<Vec<RawDay>, ScheduleError> {
    let mut slots: Vec<Option<RawDay>> = (0..DAYS_PER_WEEK).map(|_| None).collect();
    for day in days {
        let idx = weekday_index(&day.name).ok_or_else(|| ScheduleError::UnknownDay(day.name.clone()))?;
        if slots[idx].is_some() {
            return Err(ScheduleError::DuplicateDay(day.name));
        }
        slots[idx] = Some(day);
    }
    // Seven entries with no duplicates fill every slot
    Ok(slots.into_iter().flatten().collect())
}

fn order_lenient(mut days: Vec<RawDay>) -> Vec<RawDay> {
    for day in &days {
        if weekday_index(&day.name).is_none() {
            log::warn!("Unknown weekday name '{}', sorting it as Monday", day.name);
        }
    }
    days.sort_by_key(|day| weekday_index(&day.name).unwrap_or(0));
    days
}

/// Encode a schedule as the raw JSON text stored with a place.
///
/// Always emits all seven weekdays, Monday first.
pub fn encode(schedule: &Schedule) -> String {
    let days: Vec<RawDayOut> = WEEKDAY_NAMES
        .iter()
        .zip(schedule.to_json_rows())
        .map(|(&name, data)| RawDayOut { name, data })
        .collect();
    // Only string keys and numbers, which serde_json always serializes
    serde_json::to_string(&days).unwrap_or_default()
}

fn json_number(v: f64) -> Value {
    // 2^53: largest range where every integer is exactly representable
    if v.fract() == 0.0 && v.abs() <= 9_007_199_254_740_992.0 {
        Value::from(v as i64)
    } else {
        Value::from(v)
    }
}
