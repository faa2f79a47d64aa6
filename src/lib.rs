//! Air quality forecasting and health alerting service.
//!
//! Pipeline: sample repositories → feature builder → per-pollutant model
//! training → forecast generation → index aggregation → alert evaluation →
//! notification fan-out. A periodic scheduler drives the whole chain per
//! monitored location; a thin HTTP API exposes forecasts, active alerts
//! and scheduler control.

pub mod alerts;
pub mod api;
pub mod aqi;
pub mod config;
pub mod controller;
pub mod domain;
pub mod forecast;
pub mod ingest;
pub mod ml;
pub mod repo;
pub mod telemetry;
