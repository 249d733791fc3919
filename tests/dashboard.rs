use std::io::Write;

use axum::body::to_bytes;
use axum::extract::{Path, Query, State};
use axum::http::{StatusCode, header};
use axum::response::IntoResponse;
use bikeviz::aggregate::{RangeReport, average_histogram, busiest_stations, top_routes};
use bikeviz::dataset::Dataset;
use bikeviz::error::parse_date;
use bikeviz::view::DashboardQuery;
use bikeviz::web::{self, AppState, RangeParams};

fn fixture_path() -> String {
    format!("{}/tests/fixtures/bikes-sample.json", env!("CARGO_MANIFEST_DIR"))
}

fn state() -> AppState {
    AppState::new(fixture_path(), false)
}

#[test]
fn test_fixture_aggregates_over_all_days() {
    let ds = Dataset::load(fixture_path()).expect("fixture loads");
    let dates = ds.dates();
    assert_eq!(dates.len(), 3);

    let stations: Vec<(String, u64)> = busiest_stations(&ds, &dates, 5)
        .into_iter()
        .map(|s| (s.station, s.total))
        .collect();
    assert_eq!(
        stations,
        vec![
            ("Rynek".to_string(), 744),
            ("Dworzec Główny".to_string(), 586),
            ("Plac Grunwaldzki".to_string(), 414),
            ("Most Pokoju".to_string(), 223),
            ("Politechnika".to_string(), 185),
        ]
    );

    let routes = top_routes(&ds, &dates, 5);
    assert_eq!(routes[0].route, "Rynek → Dworzec Główny");
    assert_eq!(routes[0].rides, 47);
    assert_eq!(routes.len(), 4);

    let hist = average_histogram(&ds, &dates);
    assert_eq!(hist[8], 177);
    assert_eq!(hist[6], 31);
    assert_eq!(hist[0], 0);
}

#[tokio::test]
async fn test_index_renders_single_day_by_default() {
    let (status, html) = web::index(State(state()), Query(DashboardQuery::default())).await;
    assert_eq!(status, StatusCode::OK);
    let html = html.0;
    assert!(html.contains(r#"<section id="single" class="view active">"#));
    assert!(html.contains(r#"id="single-date" name="date" min="2025-06-01" max="2025-06-04" value="2025-06-04""#));
    assert!(html.contains("<li>Rynek — 175</li>"));
}

#[tokio::test]
async fn test_index_range_view() {
    let q = DashboardQuery {
        view: Some("range".into()),
        start: Some("2025-06-01".into()),
        end: Some("2025-06-02".into()),
        ..Default::default()
    };
    let (status, html) = web::index(State(state()), Query(q)).await;
    assert_eq!(status, StatusCode::OK);
    let html = html.0;
    assert!(html.contains(r#"<section id="range" class="view active">"#));
    assert!(html.contains(r#"<div class="k">Total rides</div><div class="v">3,400</div>"#));
    assert!(html.contains("<li>Dworzec Główny — 586</li>"));
    assert!(html.contains("<li>Rynek → Dworzec Główny — 47</li>"));
}

#[tokio::test]
async fn test_index_reports_missing_file() {
    let st = AppState::new("/nonexistent/bikes.json", false);
    let (status, html) = web::index(State(st), Query(DashboardQuery::default())).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(html.0.contains("/nonexistent/bikes.json"));
}

#[tokio::test]
async fn test_day_api() {
    let rec = web::day(State(state()), Path("2025-06-02".to_string()))
        .await
        .expect("day exists");
    assert_eq!(rec.0.total_rides, 1880);

    let missing = web::day(State(state()), Path("2025-06-03".to_string())).await;
    assert_eq!(missing.unwrap_err().0, StatusCode::NOT_FOUND);

    let bad = web::day(State(state()), Path("June".to_string())).await;
    assert_eq!(bad.unwrap_err().0, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_range_api() {
    let params = RangeParams {
        start: Some("2025-06-02".into()),
        end: Some("2025-06-30".into()),
    };
    let report: RangeReport = web::range(State(state()), Query(params)).await.unwrap().0;
    assert_eq!(
        report.dates,
        vec![parse_date("2025-06-02").unwrap(), parse_date("2025-06-04").unwrap()]
    );
    assert_eq!(report.totals.total_rides, 2820);
    assert_eq!(report.series.len(), 7);

    let defaults = web::range(
        State(state()),
        Query(RangeParams {
            start: None,
            end: None,
        }),
    )
    .await
    .unwrap()
    .0;
    assert_eq!(defaults.dates.len(), 3);

    let inverted = web::range(
        State(state()),
        Query(RangeParams {
            start: Some("2025-06-04".into()),
            end: Some("2025-06-01".into()),
        }),
    )
    .await;
    assert_eq!(inverted.unwrap_err().0, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_dates_api() {
    let payload = web::dates(State(state())).await.unwrap().0;
    assert_eq!(payload.year, Some(2025));
    assert_eq!(payload.min, Some(parse_date("2025-06-01").unwrap()));
    assert_eq!(payload.max, Some(parse_date("2025-06-04").unwrap()));
    assert_eq!(payload.dates.len(), 3);
}

#[tokio::test]
async fn test_range_api_on_empty_dataset() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(file, r#"{{"year":2025,"days":{{}}}}"#).unwrap();
    let st = AppState::new(file.path(), false);

    let explicit = web::range(
        State(st.clone()),
        Query(RangeParams {
            start: Some("2025-06-01".into()),
            end: Some("2025-06-02".into()),
        }),
    )
    .await;
    assert_eq!(explicit.unwrap_err().0, StatusCode::NOT_FOUND);

    let defaults = web::range(
        State(st),
        Query(RangeParams {
            start: None,
            end: None,
        }),
    )
    .await;
    assert_eq!(defaults.unwrap_err().0, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_dataset_api_serves_raw_document() {
    let resp = web::dataset(State(state())).await.into_response();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(resp.headers()[header::CONTENT_TYPE], "application/json");
    assert_eq!(resp.headers()[header::CACHE_CONTROL], "no-cache");

    let body = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    let served: serde_json::Value = serde_json::from_slice(&body).unwrap();
    let on_disk: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(fixture_path()).unwrap()).unwrap();
    assert_eq!(served, on_disk);

    let missing = web::dataset(State(AppState::new("/nonexistent/bikes.json", false)))
        .await
        .into_response();
    assert_eq!(missing.status(), StatusCode::INTERNAL_SERVER_ERROR);
}
