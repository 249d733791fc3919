use std::path::PathBuf;

use chrono::NaiveDate;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DashboardError {
    #[error("failed to read dataset {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed dataset: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("dataset must be a JSON object keyed by date or {{\"year\", \"days\"}}")]
    UnexpectedShape,

    #[error("invalid date {0:?}, expected YYYY-MM-DD")]
    InvalidDate(String),

    #[error("dataset has no days")]
    Empty,

    #[error("no data for {0}")]
    UnknownDate(NaiveDate),

    #[error("start {start} is after end {end}")]
    InvertedRange { start: NaiveDate, end: NaiveDate },
}

pub type Result<T> = std::result::Result<T, DashboardError>;

/// Parses a `YYYY-MM-DD` string.
pub fn parse_date(s: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
        .map_err(|_| DashboardError::InvalidDate(s.to_string()))
}
