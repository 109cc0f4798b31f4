//! Engine configuration.
//!
//! The API key and tunables are read once (environment, optionally a `.env`
//! file) into an `EngineConfig` that is handed to the engine at construction.
//! CLI flags are applied on top by `app`.

use std::time::Duration;

use chrono::TimeDelta;

use crate::domain::{DemandMetric, ForecastGapPolicy, Frequency, Thresholds};
use crate::error::{EngineError, EngineResult};

pub const DEFAULT_BASE_URL: &str = "https://api.eia.gov/v2/electricity/rto";
pub const DEFAULT_MAX_AGE_SECS: i64 = 3600;
pub const DEFAULT_HISTORY_DAYS: i64 = 5;
pub const DEFAULT_FORECAST_DAYS: i64 = 1;
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_PAGE_LENGTH: usize = 5000;
pub const MAX_FORECAST_DAYS: i64 = 3;
pub const MAX_HISTORY_DAYS: i64 = 90;
pub const MAX_MAX_AGE_SECS: i64 = 7 * 24 * 3600;

const ENV_API_KEY: &str = "EIA_API_KEY";
const ENV_BASE_URL: &str = "EIA_BASE_URL";
const ENV_MAX_AGE: &str = "GAUGE_MAX_AGE_SECS";
const ENV_TIMEOUT: &str = "GAUGE_TIMEOUT_SECS";

#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub api_key: String,
    pub base_url: String,
    /// Cache entries at least this old are refetched.
    pub max_age: TimeDelta,
    pub history_days: i64,
    pub forecast_days: i64,
    pub request_timeout: Duration,
    pub frequency: Frequency,
    pub thresholds: Thresholds,
    pub forecast_gap_policy: ForecastGapPolicy,
    pub demand_metric: DemandMetric,
    pub page_length: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: DEFAULT_BASE_URL.to_string(),
            max_age: TimeDelta::seconds(DEFAULT_MAX_AGE_SECS),
            history_days: DEFAULT_HISTORY_DAYS,
            forecast_days: DEFAULT_FORECAST_DAYS,
            request_timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            frequency: Frequency::Hourly,
            thresholds: Thresholds::default(),
            forecast_gap_policy: ForecastGapPolicy::Drop,
            demand_metric: DemandMetric::Normalized,
            page_length: DEFAULT_PAGE_LENGTH,
        }
    }
}

impl EngineConfig {
    /// Load from the process environment (and `.env`, if present).
    pub fn from_env() -> EngineResult<Self> {
        dotenvy::dotenv().ok();
        Self::from_vars(|key| std::env::var(key).ok())
    }

    /// Load from an arbitrary variable lookup.
    pub fn from_vars(lookup: impl Fn(&str) -> Option<String>) -> EngineResult<Self> {
        let api_key = lookup(ENV_API_KEY)
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty())
            .ok_or_else(|| EngineError::Config(format!("missing {ENV_API_KEY} in environment (.env)")))?;

        let mut config = EngineConfig {
            api_key,
            ..EngineConfig::default()
        };

        if let Some(url) = lookup(ENV_BASE_URL).filter(|u| !u.trim().is_empty()) {
            config.base_url = url.trim().trim_end_matches('/').to_string();
        }
        if let Some(raw) = lookup(ENV_MAX_AGE) {
            config.max_age = max_age_from_secs(parse_number(ENV_MAX_AGE, &raw)?)?;
        }
        if let Some(raw) = lookup(ENV_TIMEOUT) {
            config.request_timeout = Duration::from_secs(parse_number(ENV_TIMEOUT, &raw)?);
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> EngineResult<()> {
        if self.max_age <= TimeDelta::zero() || self.max_age > TimeDelta::seconds(MAX_MAX_AGE_SECS) {
            return Err(EngineError::Config(format!(
                "max age must be 1..={MAX_MAX_AGE_SECS} seconds, got {}",
                self.max_age.num_seconds()
            )));
        }
        if !(1..=MAX_HISTORY_DAYS).contains(&self.history_days) {
            return Err(EngineError::Config(format!(
                "history window must be 1..={MAX_HISTORY_DAYS} days, got {}",
                self.history_days
            )));
        }
        if !(1..=MAX_FORECAST_DAYS).contains(&self.forecast_days) {
            return Err(EngineError::Config(format!(
                "forecast window must be 1..={MAX_FORECAST_DAYS} days, got {}",
                self.forecast_days
            )));
        }
        let t = self.thresholds;
        if !(t.low_pct.is_finite() && t.high_pct.is_finite() && t.low_pct > 0.0 && t.low_pct <= t.high_pct) {
            return Err(EngineError::Config(format!(
                "thresholds must satisfy 0 < low <= high (low={}, high={})",
                t.low_pct, t.high_pct
            )));
        }
        if self.page_length == 0 {
            return Err(EngineError::Config("page length must be positive".to_string()));
        }
        Ok(())
    }
}

/// Seconds to a cache age; out-of-range counts are a config error, not a panic.
pub fn max_age_from_secs(secs: i64) -> EngineResult<TimeDelta> {
    TimeDelta::try_seconds(secs).ok_or_else(|| EngineError::Config(format!("max age of {secs} seconds is out of range")))
}

fn parse_number<T: std::str::FromStr>(key: &str, raw: &str) -> EngineResult<T> {
    raw.trim()
        .parse::<T>()
        .map_err(|_| EngineError::Config(format!("{key} must be a non-negative integer, got '{raw}'")))
}
