//! Typed view of the precomputed daily metrics document.
//!
//! The upstream job writes one JSON file per year:
//!
//! ```json
//! {
//!   "year": 2025,
//!   "days": {
//!     "2025-06-01": {
//!       "total_rides": 1234,
//!       "bike_rentals_histogram": { "0": 3, "7": 120 },
//!       "busiest_stations_top5": [{ "station": "Rynek", "total": 88 }],
//!       "top_routes_top5": [{ "start_station": "A", "end_station": "B", "rides": 9 }]
//!     }
//!   }
//! }
//! ```
//!
//! Older files are a bare date -> record mapping without the wrapper; both
//! shapes load into the same [`Dataset`].

use std::collections::BTreeMap;
use std::path::Path;

use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::error::{DashboardError, Result, parse_date};

pub const HOURS: usize = 24;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Dataset {
    pub year: Option<i32>,
    pub days: BTreeMap<NaiveDate, DayRecord>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DayRecord {
    #[serde(default, deserialize_with = "nullable")]
    pub total_rides: u64,
    #[serde(default, deserialize_with = "nullable")]
    pub avg_distance_km: f64,
    #[serde(default, deserialize_with = "nullable")]
    pub avg_duration_min: f64,
    #[serde(default, deserialize_with = "nullable")]
    pub total_distance_km: f64,
    #[serde(default, deserialize_with = "nullable")]
    pub total_duration_min: f64,
    #[serde(default, deserialize_with = "nullable")]
    pub round_trips: u64,
    #[serde(default, deserialize_with = "nullable")]
    pub left_outside_station: u64,
    #[serde(default, deserialize_with = "nullable")]
    pub bike_rentals_histogram: Histogram,
    #[serde(default, deserialize_with = "nullable")]
    pub busiest_stations_top5: Vec<StationCount>,
    #[serde(default, deserialize_with = "nullable")]
    pub top_routes_top5: Vec<RouteCount>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StationCount {
    pub station: String,
    #[serde(default, deserialize_with = "nullable")]
    pub arrivals: u64,
    #[serde(default, deserialize_with = "nullable")]
    pub departures: u64,
    #[serde(default, deserialize_with = "nullable")]
    pub total: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RouteCount {
    pub start_station: String,
    pub end_station: String,
    #[serde(default, deserialize_with = "nullable")]
    pub rides: u64,
}

/// Rentals per start hour. Serialized as an object keyed `"0"` to `"23"`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "BTreeMap<String, u64>", into = "BTreeMap<String, u64>")]
pub struct Histogram(pub [u64; HOURS]);

impl Histogram {
    pub fn get(&self, hour: usize) -> u64 {
        self.0.get(hour).copied().unwrap_or(0)
    }

    pub fn iter(&self) -> impl Iterator<Item = u64> + '_ {
        self.0.iter().copied()
    }
}

impl From<BTreeMap<String, u64>> for Histogram {
    fn from(map: BTreeMap<String, u64>) -> Self {
        let mut counts = [0u64; HOURS];
        for (key, n) in map {
            match key.trim().parse::<usize>() {
                Ok(h) if h < HOURS => counts[h] = n,
                _ => debug!(key = %key, "ignoring histogram key outside 0..23"),
            }
        }
        Histogram(counts)
    }
}

impl From<Histogram> for BTreeMap<String, u64> {
    fn from(h: Histogram) -> Self {
        h.0.iter()
            .enumerate()
            .filter(|(_, n)| **n > 0)
            .map(|(hour, n)| (hour.to_string(), *n))
            .collect()
    }
}

// Treats an explicit `null` the same as a missing field.
fn nullable<'de, D, T>(d: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(d)?.unwrap_or_default())
}

impl Dataset {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| DashboardError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let ds = Self::from_json(&text)?;
        debug!(path = %path.display(), days = ds.days.len(), "loaded dataset");
        Ok(ds)
    }

    pub fn from_json(text: &str) -> Result<Self> {
        let root: Value = serde_json::from_str(text)?;
        let Value::Object(mut obj) = root else {
            return Err(DashboardError::UnexpectedShape);
        };

        let (year, days) = if obj.contains_key("days") {
            let year = obj
                .get("year")
                .and_then(Value::as_i64)
                .and_then(|y| i32::try_from(y).ok());
            match obj.remove("days") {
                Some(Value::Object(days)) => (year, days),
                Some(Value::Null) => (year, Default::default()),
                _ => return Err(DashboardError::UnexpectedShape),
            }
        } else {
            (None, obj)
        };

        let mut out = BTreeMap::new();
        for (key, value) in days {
            let date = parse_date(&key)?;
            let record: DayRecord = serde_json::from_value(value)?;
            out.insert(date, record);
        }

        Ok(Dataset { year, days: out })
    }

    pub fn is_empty(&self) -> bool {
        self.days.is_empty()
    }

    pub fn dates(&self) -> Vec<NaiveDate> {
        self.days.keys().copied().collect()
    }

    /// First and last available date.
    pub fn bounds(&self) -> Option<(NaiveDate, NaiveDate)> {
        let first = self.days.keys().next()?;
        let last = self.days.keys().next_back()?;
        Some((*first, *last))
    }

    pub fn day(&self, date: NaiveDate) -> Option<&DayRecord> {
        self.days.get(&date)
    }
}
