//! `grid-gauge` library crate.
//!
//! Computes a greenness gauge and a demand-pressure gauge for one balancing
//! authority from EIA hourly grid telemetry. The binary (`gauge`) is a thin
//! wrapper; an HTTP front-end can call `GaugeEngine::get_stats` directly and
//! serialize the returned `StatsResponse`.

pub mod app;
pub mod cli;
pub mod config;
pub mod data;
pub mod domain;
pub mod engine;
pub mod error;
pub mod io;
pub mod logging;
pub mod ratio;
pub mod report;
pub mod threshold;

pub use config::EngineConfig;
pub use domain::StatsResponse;
pub use engine::GaugeEngine;
pub use error::{AppError, EngineError};
