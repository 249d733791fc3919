//! The two dashboard views and how request parameters pick what they show.

use chrono::NaiveDate;
use serde::Deserialize;
use tracing::debug;

use crate::aggregate::{
    Metric, RangeReport, clamp_date, default_range, histogram_points, route_label,
};
use crate::chart::{ChartOptions, bar_chart, escape, line_chart};
use crate::dataset::{Dataset, DayRecord};
use crate::error::parse_date;
use crate::format::format_number;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ViewKind {
    #[default]
    Single,
    Range,
}

impl ViewKind {
    /// Unknown names fall back to the single-day view.
    pub fn parse(s: Option<&str>) -> Self {
        match s.map(str::trim) {
            Some("range") => ViewKind::Range,
            _ => ViewKind::Single,
        }
    }

    pub fn id(self) -> &'static str {
        match self {
            ViewKind::Single => "single",
            ViewKind::Range => "range",
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DashboardQuery {
    pub view: Option<String>,
    pub date: Option<String>,
    pub start: Option<String>,
    pub end: Option<String>,
}

fn parse_lenient(raw: Option<&str>) -> Option<NaiveDate> {
    let raw = raw?.trim();
    if raw.is_empty() {
        return None;
    }
    match parse_date(raw) {
        Ok(d) => Some(d),
        Err(e) => {
            debug!(error = %e, "ignoring date parameter");
            None
        }
    }
}

/// Picks the single-day date: the requested one clamped to the data, else the latest day.
pub fn resolve_single_date(ds: &Dataset, raw: Option<&str>) -> Option<NaiveDate> {
    let (min, max) = ds.bounds()?;
    Some(
        parse_lenient(raw)
            .map(|d| clamp_date(d, min, max))
            .unwrap_or(max),
    )
}

/// Picks the range endpoints, each clamped; missing ones come from [`default_range`].
pub fn resolve_range(
    ds: &Dataset,
    start: Option<&str>,
    end: Option<&str>,
) -> Option<(NaiveDate, NaiveDate)> {
    let (min, max) = ds.bounds()?;
    let (default_start, default_end) = default_range(ds)?;
    let start = parse_lenient(start)
        .map(|d| clamp_date(d, min, max))
        .unwrap_or(default_start);
    let end = parse_lenient(end)
        .map(|d| clamp_date(d, min, max))
        .unwrap_or(default_end);
    Some((start, end))
}

pub fn render_cards(entries: &[(&str, Option<f64>)]) -> String {
    entries
        .iter()
        .map(|(k, v)| {
            format!(
                r#"<div class="card"><div class="k">{}</div><div class="v">{}</div></div>"#,
                escape(k),
                format_number(*v),
            )
        })
        .collect()
}

pub fn render_list(items: impl IntoIterator<Item = String>) -> String {
    items
        .into_iter()
        .map(|item| format!("<li>{}</li>", escape(&item)))
        .collect()
}

fn day_cards(day: &DayRecord) -> String {
    let entries: Vec<(&str, Option<f64>)> = Metric::ALL
        .iter()
        .map(|m| (m.label(), Some(m.value(day))))
        .collect();
    render_cards(&entries)
}

fn date_input(name: &str, value: Option<NaiveDate>, bounds: Option<(NaiveDate, NaiveDate)>) -> String {
    let (min, max) = bounds
        .map(|(a, b)| (a.to_string(), b.to_string()))
        .unwrap_or_default();
    format!(
        r#"<input type="date" id="{id}" name="{name}" min="{min}" max="{max}" value="{value}" onchange="this.form.submit()">"#,
        id = match name {
            "date" => "single-date".to_string(),
            other => format!("range-{other}"),
        },
        value = value.map(|d| d.to_string()).unwrap_or_default(),
    )
}

fn hidden(name: &str, value: Option<&str>) -> String {
    match value {
        Some(v) if !v.is_empty() => format!(
            r#"<input type="hidden" name="{name}" value="{}">"#,
            escape(v)
        ),
        _ => String::new(),
    }
}

/// Single-day section: summary cards, hourly histogram, busiest stations and top routes.
pub fn render_single(ds: &Dataset, q: &DashboardQuery) -> String {
    let bounds = ds.bounds();
    let date = resolve_single_date(ds, q.date.as_deref());

    let controls = format!(
        r#"<form class="controls" method="get" action="/"><input type="hidden" name="view" value="single">{}{}<label>Date {}</label></form>"#,
        hidden("start", q.start.as_deref()),
        hidden("end", q.end.as_deref()),
        date_input("date", date, bounds),
    );

    let record = date.and_then(|d| ds.day(d));
    let Some(day) = record else {
        return format!(
            r#"{controls}<div id="single-summary" class="cards"><div class="card">No data for selected date.</div></div><div id="single-histogram" class="chart"></div><ul id="single-busiest"></ul><ul id="single-routes"></ul>"#
        );
    };

    let histogram = histogram_points(&day.bike_rentals_histogram.0);
    let stations = render_list(
        day.busiest_stations_top5
            .iter()
            .map(|s| format!("{} — {}", s.station, s.total)),
    );
    let routes = render_list(
        day.top_routes_top5
            .iter()
            .map(|r| format!("{} — {}", route_label(&r.start_station, &r.end_station), r.rides)),
    );

    format!(
        r#"{controls}<div id="single-summary" class="cards">{}</div><div class="panel"><h3>Rentals by hour</h3><div id="single-histogram" class="chart">{}</div></div><div class="lists"><div class="panel"><h3>Busiest stations</h3><ul id="single-busiest">{stations}</ul></div><div class="panel"><h3>Top routes</h3><ul id="single-routes">{routes}</ul></div></div>"#,
        day_cards(day),
        bar_chart(&histogram, &ChartOptions::default()),
    )
}

fn totals_cards(report: &RangeReport) -> String {
    let t = &report.totals;
    render_cards(&[
        ("Days with data", Some(t.days as f64)),
        ("Total rides", Some(t.total_rides as f64)),
        ("Total distance (km)", Some(t.total_distance_km)),
        ("Total duration (min)", Some(t.total_duration_min)),
        ("Avg distance (km)", Some(t.avg_distance_km)),
        ("Avg duration (min)", Some(t.avg_duration_min)),
        ("Round trips", Some(t.round_trips as f64)),
        ("Left outside station", Some(t.left_outside_station as f64)),
    ])
}

/// Date-range section: totals, one trend chart per metric, averaged histogram, merged rankings.
pub fn render_range(ds: &Dataset, q: &DashboardQuery) -> String {
    let bounds = ds.bounds();
    let range = resolve_range(ds, q.start.as_deref(), q.end.as_deref());

    let controls = format!(
        r#"<form class="controls" method="get" action="/"><input type="hidden" name="view" value="range">{}<label>Start {}</label><label>End {}</label></form>"#,
        hidden("date", q.date.as_deref()),
        date_input("start", range.map(|r| r.0), bounds),
        date_input("end", range.map(|r| r.1), bounds),
    );

    let Some((start, end)) = range else {
        return controls;
    };
    let report = match RangeReport::build(ds, start, end) {
        Ok(r) => r,
        Err(e) => {
            return format!(
                r#"{controls}<div class="panel notice">{}</div>"#,
                escape(&e.to_string())
            );
        }
    };

    let metrics: String = report
        .series
        .iter()
        .map(|s| {
            format!(
                r#"<div class="card metric" data-metric="{}"><div class="k">{}</div><div class="chart">{}</div></div>"#,
                s.metric.key(),
                escape(s.label),
                line_chart(&s.points, &ChartOptions::default()),
            )
        })
        .collect();
    let stations = render_list(
        report
            .busiest_stations
            .iter()
            .map(|s| format!("{} — {}", s.station, s.total)),
    );
    let routes = render_list(
        report
            .top_routes
            .iter()
            .map(|r| format!("{} — {}", r.route, r.rides)),
    );

    format!(
        r#"{controls}<div id="range-totals" class="cards">{}</div><div id="range-metrics" class="metrics">{metrics}</div><div class="panel"><h3>Average rentals by hour</h3><div id="range-histogram" class="chart">{}</div></div><div class="lists"><div class="panel"><h3>Busiest stations</h3><ul id="range-busiest">{stations}</ul></div><div class="panel"><h3>Top routes</h3><ul id="range-routes">{routes}</ul></div></div>"#,
        totals_cards(&report),
        bar_chart(&report.histogram, &ChartOptions::default()),
    )
}
