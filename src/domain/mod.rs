//! Domain types used throughout the engine.
//!
//! This module defines:
//!
//! - fetched tables (`SeriesTable`, `TimeSeriesPoint`) and cache entries
//! - derived ratio samples (`GreenRatio`, `DemandRatio`, `RatioSample`)
//! - bands, alert states and the final `StatsResponse`

pub mod types;

pub use types::*;
