//! Shared domain types.
//!
//! Tables are plain record lists keyed by `(period, category)`; every derived
//! type is recomputed per call and serializable so the final response can be
//! emitted as JSON without a separate DTO layer.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use chrono::{DateTime, Utc};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// Default lower threshold factor applied to the band mean.
pub const LOW_PCT: f64 = 0.75;
/// Default upper threshold factor applied to the band mean.
pub const HIGH_PCT: f64 = 1.10;

/// Fuel categories counted as green generation (lower-cased `type-name`).
pub const GREEN_CATEGORIES: [&str; 4] = ["solar", "wind", "nuclear", "hydro"];

/// Demand table series types.
pub const DEMAND_ACTUAL: &str = "D";
pub const DEMAND_FORECAST: &str = "DF";
pub const NET_GENERATION: &str = "NG";
pub const TOTAL_INTERCHANGE: &str = "TI";

/// Which upstream series a table holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum SeriesKind {
    /// Generation by fuel type.
    Mix,
    /// Demand, day-ahead forecast, net generation and interchange.
    Demand,
}

impl SeriesKind {
    pub const ALL: [SeriesKind; 2] = [SeriesKind::Mix, SeriesKind::Demand];

    /// Path segment of the upstream route for this series.
    pub fn endpoint(self) -> &'static str {
        match self {
            SeriesKind::Mix => "fuel-type-data",
            SeriesKind::Demand => "region-data",
        }
    }

    /// Semantic label of the value column.
    pub fn value_label(self) -> &'static str {
        match self {
            SeriesKind::Mix => "Generation (MWh)",
            SeriesKind::Demand => "Demand (MWh)",
        }
    }
}

impl fmt::Display for SeriesKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SeriesKind::Mix => write!(f, "mix"),
            SeriesKind::Demand => write!(f, "demand"),
        }
    }
}

/// Upstream sampling frequency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum Frequency {
    /// Hourly, periods reported in UTC.
    Hourly,
    /// Hourly, periods reported in the BA's local time with an offset suffix.
    LocalHourly,
}

impl Frequency {
    pub fn as_str(self) -> &'static str {
        match self {
            Frequency::Hourly => "hourly",
            Frequency::LocalHourly => "local-hourly",
        }
    }
}

/// What to do with demand periods that have an actual value but no forecast.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ForecastGapPolicy {
    /// Strict inner join: drop the period.
    Drop,
    /// Linearly interpolate between the nearest forecasts on either side.
    ///
    /// Periods outside the forecast span are still dropped.
    Interpolate,
}

/// Which demand ratio feeds the demand reference band.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum DemandMetric {
    /// Actual demand over the window maximum (`demand_norm`).
    Normalized,
    /// Actual demand over forecast (`demand_to_forecast_ratio`).
    Forecast,
}

/// Gauge dimension an alert belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dimension {
    Green,
    Demand,
}

impl Dimension {
    pub fn display_name(self) -> &'static str {
        match self {
            Dimension::Green => "Green",
            Dimension::Demand => "Demand",
        }
    }
}

/// One observation: a fuel type or demand series type at a period.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeSeriesPoint {
    pub period: DateTime<Utc>,
    pub category: String,
    pub value: f64,
}

impl TimeSeriesPoint {
    pub fn new(period: DateTime<Utc>, category: impl Into<String>, value: f64) -> Self {
        Self {
            period,
            category: category.into(),
            value,
        }
    }
}

/// A fetched table (mix or demand) for one BA.
///
/// Points are kept ordered by period, most recent first. Categories per period
/// are whatever the upstream reported for that hour.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeriesTable {
    pub kind: SeriesKind,
    pub ba: String,
    pub value_label: String,
    pub points: Vec<TimeSeriesPoint>,
}

impl SeriesTable {
    pub fn new(kind: SeriesKind, ba: impl Into<String>, mut points: Vec<TimeSeriesPoint>) -> Self {
        points.sort_by(|a, b| b.period.cmp(&a.period).then_with(|| a.category.cmp(&b.category)));
        Self {
            kind,
            ba: ba.into(),
            value_label: kind.value_label().to_string(),
            points,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Distinct periods, most recent first.
    pub fn periods(&self) -> Vec<DateTime<Utc>> {
        let set: BTreeSet<DateTime<Utc>> = self.points.iter().map(|p| p.period).collect();
        set.into_iter().rev().collect()
    }

    pub fn latest_period(&self) -> Option<DateTime<Utc>> {
        self.points.iter().map(|p| p.period).max()
    }

    /// Values of one category keyed by period (duplicates are summed).
    pub fn category_series(&self, category: &str) -> BTreeMap<DateTime<Utc>, f64> {
        let mut out = BTreeMap::new();
        for p in self.points.iter().filter(|p| p.category == category) {
            *out.entry(p.period).or_insert(0.0) += p.value;
        }
        out
    }

    /// Per-category values reported at one period (duplicates are summed).
    pub fn at_period(&self, period: DateTime<Utc>) -> BTreeMap<String, f64> {
        let mut out = BTreeMap::new();
        for p in self.points.iter().filter(|p| p.period == period) {
            *out.entry(p.category.clone()).or_insert(0.0) += p.value;
        }
        out
    }
}

/// The cached result of one fetch. Replaced wholesale on refresh.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheEntry {
    pub table: SeriesTable,
    pub fetched_at: DateTime<Utc>,
    pub ba: String,
}

/// Green generation share for one period.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GreenRatio {
    pub period: DateTime<Utc>,
    pub green_generation: f64,
    pub total_generation: f64,
    pub ratio: f64,
}

/// Demand vs forecast and vs window maximum for one period.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DemandRatio {
    pub period: DateTime<Utc>,
    pub demand: f64,
    pub forecast: f64,
    pub demand_norm: f64,
    pub forecast_norm: f64,
    pub demand_to_forecast_ratio: f64,
    pub demand_minus_forecast: f64,
    /// True when the forecast was filled in by the gap policy.
    pub forecast_interpolated: bool,
}

/// A green sample joined with the demand sample of the same period.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RatioSample {
    pub period: DateTime<Utc>,
    pub green_ratio: f64,
    pub demand_norm: f64,
    pub demand_vs_forecast: f64,
}

/// Threshold factors applied to a band mean.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Thresholds {
    pub low_pct: f64,
    pub high_pct: f64,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            low_pct: LOW_PCT,
            high_pct: HIGH_PCT,
        }
    }
}

/// Center of the gauge and the two alert thresholds around it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ReferenceBand {
    pub mean: f64,
    pub low_threshold: f64,
    pub high_threshold: f64,
}

/// Position of a sample relative to its reference band.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AlertState {
    BelowLow,
    #[default]
    Normal,
    AboveHigh,
}

/// Classification of the latest sample of one dimension.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertClassification {
    pub dimension: Dimension,
    pub state: AlertState,
    pub text: String,
}

/// Parallel arrays of the demand ratio series, most recent first.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DemandSeriesBlock {
    pub period: Vec<DateTime<Utc>>,
    pub demand: Vec<f64>,
    pub forecast: Vec<f64>,
    pub demand_norm: Vec<f64>,
    pub forecast_norm: Vec<f64>,
    pub demand_to_forecast_ratio: Vec<f64>,
    pub demand_minus_forecast: Vec<f64>,
}

/// Parallel arrays of the green ratio series, most recent first.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MixSeriesBlock {
    pub period: Vec<DateTime<Utc>>,
    pub green_generation: Vec<f64>,
    pub total_generation: Vec<f64>,
    pub green_ratio: Vec<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DataTimeseries {
    pub demand_data: DemandSeriesBlock,
    pub mix_data: MixSeriesBlock,
}

/// Everything the dashboard gauge needs for one BA, built fresh per request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatsResponse {
    pub created: DateTime<Utc>,
    pub sw_version: String,
    pub ba_name: String,
    pub period_current: DateTime<Utc>,
    pub source_ratio_current: BTreeMap<String, f64>,
    pub green_ratio_current: f64,
    pub green_ratio_mean: f64,
    pub green_threshold_low: f64,
    pub green_threshold_high: f64,
    pub green_alert: AlertState,
    pub alert_text: String,
    pub demand_ratio_current: f64,
    pub demand_ratio_mean: f64,
    pub demand_threshold_low: f64,
    pub demand_threshold_high: f64,
    pub demand_alert: AlertState,
    pub demand_alert_text: String,
    pub data_timeseries: DataTimeseries,
}
