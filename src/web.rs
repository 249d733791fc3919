use std::{
    net::SocketAddr,
    path::{Path as FsPath, PathBuf},
    sync::Arc,
};

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::{StatusCode, header},
    response::{Html, IntoResponse},
    routing::get,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::{info, warn};

use crate::aggregate::{RangeReport, default_range};
use crate::chart::escape;
use crate::dataset::{Dataset, DayRecord};
use crate::error::{DashboardError, parse_date};
use crate::view::{DashboardQuery, ViewKind, render_range, render_single, resolve_range, resolve_single_date};

#[derive(Clone)]
pub struct AppState {
    pub data_path: Arc<PathBuf>,
    /// Pull Chart.js from the CDN and let it redraw the trend charts.
    pub chartjs: bool,
}

impl AppState {
    pub fn new(data_path: impl Into<PathBuf>, chartjs: bool) -> Self {
        Self {
            data_path: Arc::new(data_path.into()),
            chartjs,
        }
    }
}

type ApiResult<T> = Result<Json<T>, (StatusCode, String)>;

fn api_error(e: DashboardError) -> (StatusCode, String) {
    let status = match &e {
        DashboardError::InvalidDate(_) | DashboardError::InvertedRange { .. } => {
            StatusCode::BAD_REQUEST
        }
        DashboardError::UnknownDate(_) | DashboardError::Empty => StatusCode::NOT_FOUND,
        DashboardError::Read { .. }
        | DashboardError::Malformed(_)
        | DashboardError::UnexpectedShape => {
            warn!(error = %e, "dataset unavailable");
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };
    (status, e.to_string())
}

async fn read_document(data_path: &FsPath) -> Result<String, DashboardError> {
    tokio::fs::read_to_string(data_path)
        .await
        .map_err(|source| DashboardError::Read {
            path: data_path.to_path_buf(),
            source,
        })
}

// The document is re-read for every request so a rebuilt file shows up on the next page load.
async fn read_dataset(data_path: &FsPath) -> Result<Dataset, DashboardError> {
    Dataset::from_json(&read_document(data_path).await?)
}

async fn with_dataset<T>(
    data_path: &FsPath,
    f: impl FnOnce(&Dataset) -> Result<T, DashboardError>,
) -> Result<T, DashboardError> {
    let ds = read_dataset(data_path).await?;
    f(&ds)
}

pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(index))
        .route("/api/dataset", get(dataset))
        .route("/api/dates", get(dates))
        .route("/api/day/{date}", get(day))
        .route("/api/range", get(range))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub async fn serve(state: AppState, bind: SocketAddr) -> anyhow::Result<()> {
    info!(data = %state.data_path.display(), "serving dashboard");
    let app = router(state);

    info!("Listening on http://{}", bind);
    let listener = tokio::net::TcpListener::bind(bind).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

pub async fn index(
    State(st): State<AppState>,
    Query(q): Query<DashboardQuery>,
) -> (StatusCode, Html<String>) {
    match read_dataset(&st.data_path).await {
        Ok(ds) => (StatusCode::OK, Html(render_page(&ds, &q, st.chartjs))),
        Err(e) => {
            warn!(error = %e, "failed to load dataset");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Html(page_shell(
                    &format!(r#"<div class="panel">{}</div>"#, escape(&e.to_string())),
                    false,
                )),
            )
        }
    }
}

pub async fn dataset(State(st): State<AppState>) -> impl IntoResponse {
    match read_document(&st.data_path).await {
        Ok(text) => (
            StatusCode::OK,
            [
                (header::CONTENT_TYPE, "application/json"),
                (header::CACHE_CONTROL, "no-cache"),
            ],
            text,
        )
            .into_response(),
        Err(e) => api_error(e).into_response(),
    }
}

#[derive(Debug, Serialize)]
pub struct DatesPayload {
    pub year: Option<i32>,
    pub dates: Vec<NaiveDate>,
    pub min: Option<NaiveDate>,
    pub max: Option<NaiveDate>,
}

pub async fn dates(State(st): State<AppState>) -> ApiResult<DatesPayload> {
    let payload = with_dataset(&st.data_path, |ds| {
        let bounds = ds.bounds();
        Ok(DatesPayload {
            year: ds.year,
            dates: ds.dates(),
            min: bounds.map(|b| b.0),
            max: bounds.map(|b| b.1),
        })
    })
    .await
    .map_err(api_error)?;

    Ok(Json(payload))
}

pub async fn day(State(st): State<AppState>, Path(date): Path<String>) -> ApiResult<DayRecord> {
    let date = parse_date(&date).map_err(api_error)?;
    let record = with_dataset(&st.data_path, |ds| {
        ds.day(date).cloned().ok_or(DashboardError::UnknownDate(date))
    })
    .await
    .map_err(api_error)?;

    Ok(Json(record))
}

#[derive(Debug, Deserialize)]
pub struct RangeParams {
    pub start: Option<String>,
    pub end: Option<String>,
}

pub async fn range(
    State(st): State<AppState>,
    Query(q): Query<RangeParams>,
) -> ApiResult<RangeReport> {
    let start = q.start.as_deref().map(parse_date).transpose().map_err(api_error)?;
    let end = q.end.as_deref().map(parse_date).transpose().map_err(api_error)?;

    let report = with_dataset(&st.data_path, |ds| {
        let Some((default_start, default_end)) = default_range(ds) else {
            return Err(DashboardError::Empty);
        };
        RangeReport::build(ds, start.unwrap_or(default_start), end.unwrap_or(default_end))
    })
    .await
    .map_err(api_error)?;

    Ok(Json(report))
}

/// Full dashboard page: tabs, both views, the active one shown.
pub fn render_page(ds: &Dataset, q: &DashboardQuery, chartjs: bool) -> String {
    if ds.is_empty() {
        return page_shell(r#"<div class="panel">No data available.</div>"#, chartjs);
    }

    let active = ViewKind::parse(q.view.as_deref());
    // Tab links carry the resolved dates so switching keeps both views' state.
    let mut link = String::new();
    if let Some(d) = resolve_single_date(ds, q.date.as_deref()) {
        link.push_str(&format!("&date={d}"));
    }
    if let Some((s, e)) = resolve_range(ds, q.start.as_deref(), q.end.as_deref()) {
        link.push_str(&format!("&start={s}&end={e}"));
    }

    let mut body = String::from(r#"<nav class="view-switch">"#);
    for (kind, label) in [(ViewKind::Single, "Single day"), (ViewKind::Range, "Date range")] {
        body.push_str(&format!(
            r#"<a class="tab{}" data-target="{id}" href="/?view={id}{}">{label}</a>"#,
            if kind == active { " active" } else { "" },
            link.replace('&', "&amp;"),
            id = kind.id(),
        ));
    }
    body.push_str("</nav>");

    for (kind, section) in [
        (ViewKind::Single, render_single(ds, q)),
        (ViewKind::Range, render_range(ds, q)),
    ] {
        body.push_str(&format!(
            r#"<section id="{}" class="view{}">{section}</section>"#,
            kind.id(),
            if kind == active { " active" } else { "" },
        ));
    }

    page_shell(&body, chartjs)
}

fn page_shell(body: &str, chartjs: bool) -> String {
    let chartjs_tag = if chartjs { CHARTJS_TAG } else { "" };
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>Bike Share Stats</title>
    {chartjs_tag}
    <style>{PAGE_CSS}</style>
</head>
<body>
    <div class="container">
        <h1>Bike Share Stats</h1>
        {body}
    </div>
    <script>{PAGE_JS}</script>
</body>
</html>
"#
    )
}

const CHARTJS_TAG: &str =
    r#"<script src="https://cdn.jsdelivr.net/npm/chart.js@4.4.0/dist/chart.umd.min.js"></script>"#;

const PAGE_CSS: &str = r#"
        * { margin: 0; padding: 0; box-sizing: border-box; }
        body {
            font-family: -apple-system, BlinkMacSystemFont, "Segoe UI", Roboto, sans-serif;
            background: #f8fafc;
            color: #1e293b;
            padding: 20px;
        }
        .container { max-width: 1200px; margin: 0 auto; }
        h1 { font-size: 1.5rem; margin-bottom: 16px; }
        h3 { font-size: 1rem; margin-bottom: 8px; color: #374151; }
        .view-switch { display: flex; gap: 8px; margin-bottom: 16px; }
        .tab {
            padding: 6px 14px;
            border: 1px solid #e2e8f0;
            border-radius: 6px;
            background: #fff;
            color: inherit;
            text-decoration: none;
        }
        .tab.active { background: #2563eb; border-color: #2563eb; color: #fff; }
        .view { display: none; }
        .view.active { display: block; }
        .controls { display: flex; gap: 12px; margin-bottom: 16px; }
        .cards, .metrics {
            display: grid;
            grid-template-columns: repeat(auto-fit, minmax(180px, 1fr));
            gap: 12px;
            margin-bottom: 16px;
        }
        .metrics { grid-template-columns: repeat(auto-fit, minmax(420px, 1fr)); }
        .card, .panel {
            background: #fff;
            border: 1px solid #e2e8f0;
            border-radius: 8px;
            padding: 12px;
        }
        .panel { margin-bottom: 16px; }
        .notice { color: #b45309; }
        .card .k { font-size: 0.8rem; color: #64748b; }
        .card .v { font-size: 1.4rem; font-weight: 600; }
        .chart { position: relative; height: 240px; }
        .lists { display: grid; grid-template-columns: 1fr 1fr; gap: 12px; }
        ul { list-style: none; }
        li { padding: 6px 0; border-bottom: 1px solid #f1f5f9; }
        .point .hit { cursor: pointer; }
        .point:hover circle:not(.hit) { r: 4; }
        .bars rect:hover { opacity: 0.8; }
"#;

const PAGE_JS: &str = r#"
        document.querySelectorAll('.view-switch .tab').forEach(tab => {
            tab.addEventListener('click', e => {
                e.preventDefault();
                const id = tab.dataset.target;
                document.querySelectorAll('.view').forEach(v => v.classList.toggle('active', v.id === id));
                document.querySelectorAll('.view-switch .tab').forEach(t => t.classList.toggle('active', t === tab));
                history.replaceState(null, '', tab.getAttribute('href'));
            });
        });

        if (window.Chart) {
            document.querySelectorAll('svg.line[data-series]').forEach(svg => {
                const series = JSON.parse(svg.dataset.series || '[]');
                const host = svg.parentElement;
                const canvas = document.createElement('canvas');
                host.replaceChildren(canvas);
                new Chart(canvas.getContext('2d'), {
                    type: 'line',
                    data: {
                        labels: series.map(p => p.x),
                        datasets: [{
                            data: series.map(p => p.y),
                            borderColor: '#2563eb',
                            backgroundColor: 'rgba(37,99,235,0.15)',
                            borderWidth: 2,
                            fill: false,
                            pointRadius: 3,
                            pointHoverRadius: 4,
                            tension: 0.2
                        }]
                    },
                    options: {
                        responsive: true,
                        maintainAspectRatio: false,
                        animation: false,
                        spanGaps: true,
                        scales: {
                            x: { type: 'category', ticks: { autoSkip: false, maxRotation: 45, minRotation: 45 } },
                            y: { beginAtZero: true }
                        },
                        plugins: { legend: { display: false }, tooltip: { enabled: true } }
                    }
                });
            });
        }
"#;

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Dataset {
        Dataset::from_json(
            r#"{ "days": {
                "2025-06-01": { "total_rides": 5 },
                "2025-06-02": { "total_rides": 7 }
            } }"#,
        )
        .unwrap()
    }

    #[test]
    fn page_marks_requested_view_active() {
        let q = DashboardQuery {
            view: Some("range".into()),
            ..Default::default()
        };
        let html = render_page(&sample(), &q, false);
        assert!(html.contains(r#"<section id="range" class="view active">"#));
        assert!(html.contains(r#"<section id="single" class="view">"#));
        assert!(html.contains(
            r#"href="/?view=single&amp;date=2025-06-02&amp;start=2025-06-01&amp;end=2025-06-02""#
        ));
        assert!(!html.contains("chart.umd.min.js"));
    }

    #[test]
    fn chartjs_is_opt_in() {
        let html = render_page(&sample(), &DashboardQuery::default(), true);
        assert!(html.contains("chart.umd.min.js"));
        assert!(html.contains(r#"<section id="single" class="view active">"#));
    }

    #[test]
    fn empty_dataset_page() {
        let html = render_page(&Dataset::default(), &DashboardQuery::default(), false);
        assert!(html.contains("No data available."));
        assert!(!html.contains("<section"));
    }

    #[test]
    fn errors_map_to_status_codes() {
        let d = parse_date("2025-06-01").unwrap();
        assert_eq!(api_error(DashboardError::UnknownDate(d)).0, StatusCode::NOT_FOUND);
        assert_eq!(
            api_error(DashboardError::InvalidDate("x".into())).0,
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            api_error(DashboardError::InvertedRange { start: d, end: d }).0,
            StatusCode::BAD_REQUEST
        );
        assert_eq!(api_error(DashboardError::Empty).0, StatusCode::NOT_FOUND);
        assert_eq!(
            api_error(DashboardError::UnexpectedShape).0,
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
