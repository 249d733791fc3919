//! Range aggregation over day records.
//!
//! Everything here is pure: callers pass a [`Dataset`] plus the dates they
//! care about and get plain values back, so the web layer and the CLI share
//! the same numbers.

use std::collections::HashMap;

use chrono::NaiveDate;
use serde::Serialize;

use crate::dataset::{Dataset, DayRecord, HOURS};
use crate::error::{DashboardError, Result};

pub const DEFAULT_TOP_N: usize = 5;
/// Number of available days the range view opens with.
pub const DEFAULT_RANGE_DAYS: usize = 7;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    TotalRides,
    AvgDistanceKm,
    AvgDurationMin,
    TotalDistanceKm,
    TotalDurationMin,
    RoundTrips,
    LeftOutsideStation,
}

impl Metric {
    pub const ALL: [Metric; 7] = [
        Metric::TotalRides,
        Metric::AvgDistanceKm,
        Metric::AvgDurationMin,
        Metric::TotalDistanceKm,
        Metric::TotalDurationMin,
        Metric::RoundTrips,
        Metric::LeftOutsideStation,
    ];

    pub fn key(self) -> &'static str {
        match self {
            Metric::TotalRides => "total_rides",
            Metric::AvgDistanceKm => "avg_distance_km",
            Metric::AvgDurationMin => "avg_duration_min",
            Metric::TotalDistanceKm => "total_distance_km",
            Metric::TotalDurationMin => "total_duration_min",
            Metric::RoundTrips => "round_trips",
            Metric::LeftOutsideStation => "left_outside_station",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Metric::TotalRides => "Total rides",
            Metric::AvgDistanceKm => "Avg distance (km)",
            Metric::AvgDurationMin => "Avg duration (min)",
            Metric::TotalDistanceKm => "Total distance (km)",
            Metric::TotalDurationMin => "Total duration (min)",
            Metric::RoundTrips => "Round trips",
            Metric::LeftOutsideStation => "Left outside station",
        }
    }

    pub fn value(self, day: &DayRecord) -> f64 {
        match self {
            Metric::TotalRides => day.total_rides as f64,
            Metric::AvgDistanceKm => day.avg_distance_km,
            Metric::AvgDurationMin => day.avg_duration_min,
            Metric::TotalDistanceKm => day.total_distance_km,
            Metric::TotalDurationMin => day.total_duration_min,
            Metric::RoundTrips => day.round_trips as f64,
            Metric::LeftOutsideStation => day.left_outside_station as f64,
        }
    }
}

/// One chart sample.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Point {
    pub x: String,
    pub y: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RankedStation {
    pub station: String,
    pub total: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RankedRoute {
    pub route: String,
    pub rides: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RangeTotals {
    pub days: usize,
    pub total_rides: u64,
    pub total_distance_km: f64,
    pub total_duration_min: f64,
    pub round_trips: u64,
    pub left_outside_station: u64,
    pub avg_distance_km: f64,
    pub avg_duration_min: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricSeries {
    pub metric: Metric,
    pub label: &'static str,
    pub points: Vec<Point>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RangeReport {
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub dates: Vec<NaiveDate>,
    pub totals: RangeTotals,
    pub series: Vec<MetricSeries>,
    pub histogram: Vec<Point>,
    pub busiest_stations: Vec<RankedStation>,
    pub top_routes: Vec<RankedRoute>,
}

pub fn clamp_date(d: NaiveDate, min: NaiveDate, max: NaiveDate) -> NaiveDate {
    if d < min {
        min
    } else if d > max {
        max
    } else {
        d
    }
}

/// The last [`DEFAULT_RANGE_DAYS`] available dates (by position, gaps included).
pub fn default_range(ds: &Dataset) -> Option<(NaiveDate, NaiveDate)> {
    let dates = ds.dates();
    let end = *dates.last()?;
    let start = dates[dates.len().saturating_sub(DEFAULT_RANGE_DAYS)];
    Some((start, end))
}

pub fn dates_in_range(ds: &Dataset, start: NaiveDate, end: NaiveDate) -> Vec<NaiveDate> {
    if start > end {
        return Vec::new();
    }
    ds.days.range(start..=end).map(|(d, _)| *d).collect()
}

fn records<'a>(ds: &'a Dataset, dates: &'a [NaiveDate]) -> impl Iterator<Item = &'a DayRecord> {
    dates.iter().filter_map(|d| ds.day(*d))
}

pub fn metric_series(ds: &Dataset, dates: &[NaiveDate], metric: Metric) -> Vec<Point> {
    dates
        .iter()
        .map(|d| Point {
            x: d.to_string(),
            y: ds.day(*d).map(|r| metric.value(r)).unwrap_or(0.0),
        })
        .collect()
}

/// Mean rentals per hour across `dates`, rounded to whole rides.
pub fn average_histogram(ds: &Dataset, dates: &[NaiveDate]) -> [u64; HOURS] {
    let mut sums = [0u64; HOURS];
    for rec in records(ds, dates) {
        for (hour, n) in rec.bike_rentals_histogram.iter().enumerate() {
            sums[hour] = sums[hour].saturating_add(n);
        }
    }
    let n = dates.len().max(1) as f64;
    sums.map(|s| (s as f64 / n).round() as u64)
}

pub fn histogram_points(counts: &[u64]) -> Vec<Point> {
    counts
        .iter()
        .enumerate()
        .map(|(hour, n)| Point {
            x: hour.to_string(),
            y: *n as f64,
        })
        .collect()
}

// Sums per key, keeps first-seen order for ties, then ranks by count.
fn merge_ranked<K>(entries: impl Iterator<Item = (K, u64)>, top_n: usize) -> Vec<(K, u64)>
where
    K: Eq + std::hash::Hash + Clone,
{
    let mut index: HashMap<K, usize> = HashMap::new();
    let mut merged: Vec<(K, u64)> = Vec::new();
    for (key, n) in entries {
        match index.get(&key) {
            Some(&i) => merged[i].1 = merged[i].1.saturating_add(n),
            None => {
                index.insert(key.clone(), merged.len());
                merged.push((key, n));
            }
        }
    }
    // stable: equal totals stay in first-seen order
    merged.sort_by(|a, b| b.1.cmp(&a.1));
    merged.truncate(top_n);
    merged
}

pub fn busiest_stations(ds: &Dataset, dates: &[NaiveDate], top_n: usize) -> Vec<RankedStation> {
    let entries = records(ds, dates)
        .flat_map(|r| r.busiest_stations_top5.iter())
        .map(|s| (s.station.clone(), s.total));
    merge_ranked(entries, top_n)
        .into_iter()
        .map(|(station, total)| RankedStation { station, total })
        .collect()
}

pub fn top_routes(ds: &Dataset, dates: &[NaiveDate], top_n: usize) -> Vec<RankedRoute> {
    let entries = records(ds, dates)
        .flat_map(|r| r.top_routes_top5.iter())
        .map(|r| ((r.start_station.clone(), r.end_station.clone()), r.rides));
    merge_ranked(entries, top_n)
        .into_iter()
        .map(|((from, to), rides)| RankedRoute {
            route: route_label(&from, &to),
            rides,
        })
        .collect()
}

pub fn route_label(from: &str, to: &str) -> String {
    format!("{from} → {to}")
}

/// Sums over the range; averages are weighted by each day's ride count.
pub fn range_totals(ds: &Dataset, dates: &[NaiveDate]) -> RangeTotals {
    let mut t = RangeTotals {
        days: dates.len(),
        ..Default::default()
    };
    let mut weighted_distance = 0.0;
    let mut weighted_duration = 0.0;
    for rec in records(ds, dates) {
        t.total_rides = t.total_rides.saturating_add(rec.total_rides);
        t.total_distance_km += rec.total_distance_km;
        t.total_duration_min += rec.total_duration_min;
        t.round_trips = t.round_trips.saturating_add(rec.round_trips);
        t.left_outside_station = t.left_outside_station.saturating_add(rec.left_outside_station);
        weighted_distance += rec.avg_distance_km * rec.total_rides as f64;
        weighted_duration += rec.avg_duration_min * rec.total_rides as f64;
    }
    if t.total_rides > 0 {
        t.avg_distance_km = weighted_distance / t.total_rides as f64;
        t.avg_duration_min = weighted_duration / t.total_rides as f64;
    }
    t
}

impl RangeReport {
    pub fn build(ds: &Dataset, start: NaiveDate, end: NaiveDate) -> Result<Self> {
        if start > end {
            return Err(DashboardError::InvertedRange { start, end });
        }
        let dates = dates_in_range(ds, start, end);
        let series = Metric::ALL
            .iter()
            .map(|m| MetricSeries {
                metric: *m,
                label: m.label(),
                points: metric_series(ds, &dates, *m),
            })
            .collect();

        Ok(RangeReport {
            start,
            end,
            totals: range_totals(ds, &dates),
            series,
            histogram: histogram_points(&average_histogram(ds, &dates)),
            busiest_stations: busiest_stations(ds, &dates, DEFAULT_TOP_N),
            top_routes: top_routes(ds, &dates, DEFAULT_TOP_N),
            dates,
        })
    }
}
