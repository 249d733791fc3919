//! Bike-share statistics dashboard.
//!
//! Loads a precomputed per-day metrics document and renders a single-day
//! summary and a date-range aggregation with SVG trend charts.

pub mod aggregate;
pub mod chart;
pub mod dataset;
pub mod error;
pub mod format;
pub mod view;
pub mod web;
