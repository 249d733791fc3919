// src/main.rs
use std::{ffi::OsStr, net::SocketAddr, path::Path, path::PathBuf};

use anyhow::{Context, Result, anyhow};
use bikeviz::{
    aggregate::{RangeReport, default_range},
    dataset::Dataset,
    error::parse_date,
    web::{self, AppState},
};
use clap::{Parser, Subcommand};
use serde_json::json;
use tracing::info;
use tracing_subscriber::{EnvFilter, Layer, fmt, layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "bikeviz")]
#[command(about = "Daily bike-share metrics JSON -> dashboard", long_about = None)]
struct Cli {
    /// Metrics JSON produced by the daily aggregation job
    #[arg(
        long,
        global = true,
        env = "BIKEVIZ_DATA",
        default_value = "data/processed/metrics/bikes-2025.json"
    )]
    data: PathBuf,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the dashboard server
    Serve {
        /// Bind address
        #[arg(long, env = "BIKEVIZ_BIND", default_value = "127.0.0.1:8080")]
        bind: String,

        /// Load Chart.js from the CDN for the trend charts
        #[arg(long, default_value_t = false)]
        chartjs: bool,
    },

    /// Print one day's record as JSON (defaults to the latest day)
    Day {
        /// Date as YYYY-MM-DD
        date: Option<String>,
    },

    /// Print the aggregation over a date range as JSON (defaults to the last 7 days)
    Range {
        #[arg(long)]
        start: Option<String>,

        #[arg(long)]
        end: Option<String>,
    },

    /// List the dates available in the dataset
    Dates,
}

fn init_tracing() -> Result<Option<tracing_appender::non_blocking::WorkerGuard>> {
    let stderr_layer = fmt::layer()
        .with_target(true)
        .with_writer(std::io::stderr)
        .with_filter(EnvFilter::from_env("RUST_LOG").add_directive("info".parse()?));

    // Optional JSON log file, rotated daily
    let (json_layer, guard) = match std::env::var("LOG_FILE_PATH") {
        Ok(log_file_path) => {
            let path = Path::new(&log_file_path);
            let log_dir = path.parent().unwrap_or(Path::new("logs"));
            let log_file_name = path.file_name().unwrap_or(OsStr::new("bikeviz.log"));
            let appender = tracing_appender::rolling::daily(log_dir, log_file_name);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer()
                .json()
                .with_current_span(true)
                .with_writer(writer)
                .with_filter(EnvFilter::from_env("RUST_LOG_JSON").add_directive("debug".parse()?));
            (Some(layer), Some(guard))
        }
        Err(_) => (None, None),
    };

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();
    Ok(guard)
}

fn load(path: &Path) -> Result<Dataset> {
    Dataset::load(path).with_context(|| format!("load dataset {}", path.display()))
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let _log_guard = init_tracing()?;

    let cli = Cli::parse();

    match cli.cmd {
        Command::Serve { bind, chartjs } => {
            let bind: SocketAddr = bind.parse().context("parse bind addr")?;
            // fail fast on a missing or malformed file; requests re-read it anyway
            let ds = load(&cli.data)?;
            info!(days = ds.days.len(), year = ?ds.year, "dataset ok");
            web::serve(AppState::new(cli.data, chartjs), bind).await?;
        }

        Command::Day { date } => {
            let ds = load(&cli.data)?;
            let date = match date.as_deref() {
                Some(raw) => parse_date(raw)?,
                None => ds.bounds().map(|b| b.1).ok_or_else(|| anyhow!("dataset has no days"))?,
            };
            let record = ds
                .day(date)
                .ok_or_else(|| anyhow!("no data for {date}"))?;
            println!(
                "{}",
                serde_json::to_string_pretty(&json!({ "date": date, "record": record }))?
            );
        }

        Command::Range { start, end } => {
            let ds = load(&cli.data)?;
            let (default_start, default_end) =
                default_range(&ds).ok_or_else(|| anyhow!("dataset has no days"))?;
            let start = start.as_deref().map(parse_date).transpose()?.unwrap_or(default_start);
            let end = end.as_deref().map(parse_date).transpose()?.unwrap_or(default_end);
            let report = RangeReport::build(&ds, start, end)?;
            info!(start = %start, end = %end, days = report.dates.len(), "range aggregated");
            println!("{}", serde_json::to_string_pretty(&report)?);
        }

        Command::Dates => {
            let ds = load(&cli.data)?;
            for d in ds.dates() {
                println!("{d}");
            }
        }
    }

    Ok(())
}
