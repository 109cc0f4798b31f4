//! Upstream data acquisition: the EIA fetcher and the freshness cache.

pub mod cache;
pub mod eia;

pub use cache::{Clock, FreshnessCache, SystemClock};
#[cfg(test)]
pub use cache::ManualClock;
pub use eia::{DiagnosticKind, EiaClient, FetchDiagnostic, FetchOutcome, SeriesQuery, SeriesSource};
