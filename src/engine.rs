//! The analytics engine: BA in, `StatsResponse` out.
//!
//! Flow of one `get_stats` call:
//! cache/fetch mix + demand -> green and demand ratios -> bands + alerts -> response
//!
//! The engine owns its cache; nothing is shared across instances.

use std::sync::Arc;

use chrono::{DateTime, TimeDelta, Utc};
use tracing::{debug, info};

use crate::config::EngineConfig;
use crate::data::{Clock, EiaClient, FreshnessCache, SeriesQuery, SeriesSource, SystemClock};
use crate::domain::{DemandMetric, DemandRatio, Dimension, SeriesKind, SeriesTable, StatsResponse};
use crate::error::{EngineError, EngineResult};
use crate::ratio::{compute_demand_ratio, compute_green_ratio, join_by_period, source_shares};
use crate::report::{DimensionReading, Readings, assemble};
use crate::threshold::{band, classify_dimension};

pub struct GaugeEngine {
    config: EngineConfig,
    source: Box<dyn SeriesSource>,
    clock: Box<dyn Clock>,
    cache: FreshnessCache,
}

impl GaugeEngine {
    pub fn new(config: EngineConfig, source: Box<dyn SeriesSource>, clock: Box<dyn Clock>) -> EngineResult<Self> {
        config.validate()?;
        Ok(Self {
            config,
            source,
            clock,
            cache: FreshnessCache::new(),
        })
    }

    /// Engine backed by the live EIA API and the system clock.
    pub fn from_config(config: EngineConfig) -> EngineResult<Self> {
        let client = EiaClient::new(&config)?;
        Self::new(config, Box::new(client), Box::new(SystemClock))
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn cache(&self) -> &FreshnessCache {
        &self.cache
    }

    /// Gauge readings for one balancing authority.
    pub fn get_stats(&self, ba_name: &str) -> EngineResult<StatsResponse> {
        let ba = normalize_ba(ba_name)?;
        let now = self.clock.now();

        // The two series are independent; fetch them side by side.
        let (mix, demand) = rayon::join(
            || self.table(SeriesKind::Mix, &ba, now),
            || self.table(SeriesKind::Demand, &ba, now),
        );
        let (mix, demand) = (mix?, demand?);

        evaluate(&ba, now, &mix, &demand, &self.config)
    }

    /// Cached (or freshly fetched) table for one series, as of now.
    pub fn series(&self, kind: SeriesKind, ba: &str) -> EngineResult<SeriesTable> {
        self.table(kind, ba, self.clock.now())
    }

    /// Cached (or freshly fetched) table for one series.
    pub fn table(&self, kind: SeriesKind, ba: &str, now: DateTime<Utc>) -> EngineResult<SeriesTable> {
        let ba = normalize_ba(ba)?;
        let query = self.query(kind, &ba, now)?;
        let entry = self
            .cache
            .get_or_refresh(&query, self.config.max_age, now, self.source.as_ref())?;
        Ok(Arc::unwrap_or_clone(entry).table)
    }

    fn query(&self, kind: SeriesKind, ba: &str, now: DateTime<Utc>) -> EngineResult<SeriesQuery> {
        let window = |days: i64| {
            TimeDelta::try_days(days)
                .ok_or_else(|| EngineError::Config(format!("window of {days} days is out of range")))
        };
        let start = now
            .checked_sub_signed(window(self.config.history_days)?)
            .ok_or_else(|| EngineError::Config("history window reaches before the earliest date".to_string()))?;
        let end = now
            .checked_add_signed(window(self.config.forecast_days)?)
            .ok_or_else(|| EngineError::Config("forecast window reaches past the latest date".to_string()))?;
        Ok(SeriesQuery {
            kind,
            ba: ba.to_string(),
            start,
            end,
            frequency: self.config.frequency,
        })
    }
}

/// BA codes are matched upper-case; blank names are rejected.
pub fn normalize_ba(raw: &str) -> EngineResult<String> {
    let ba = raw.trim().to_uppercase();
    if ba.is_empty() {
        return Err(EngineError::InvalidBa);
    }
    Ok(ba)
}

/// Turn a mix table and a demand table into the gauge response.
///
/// Pure: all I/O has already happened by the time this runs.
pub fn evaluate(
    ba: &str,
    created: DateTime<Utc>,
    mix: &SeriesTable,
    demand: &SeriesTable,
    config: &EngineConfig,
) -> EngineResult<StatsResponse> {
    let green_series = compute_green_ratio(mix);
    if green_series.is_empty() {
        return Err(EngineError::empty(format!("no {ba} generation periods with nonzero total")));
    }
    let demand_series = compute_demand_ratio(demand, config.forecast_gap_policy);
    if demand_series.is_empty() {
        return Err(EngineError::empty(format!("no {ba} periods with both demand and forecast")));
    }
    debug!(
        ba,
        green_periods = green_series.len(),
        demand_periods = demand_series.len(),
        "ratios computed"
    );

    let joined = join_by_period(&green_series, &demand_series);
    let latest = *joined
        .first()
        .ok_or_else(|| EngineError::empty(format!("no period shared by {ba} mix and demand series")))?;

    let thresholds = &config.thresholds;

    let green_values: Vec<f64> = green_series.iter().map(|g| g.ratio).collect();
    let green_band = band(&green_values, thresholds)?;
    let green = DimensionReading {
        current: latest.green_ratio,
        band: green_band,
        alert: classify_dimension(Dimension::Green, latest.green_ratio, &green_band, thresholds),
    };

    let demand_values: Vec<f64> = demand_series.iter().map(|d| demand_metric(d, config.demand_metric)).collect();
    let demand_band = band(&demand_values, thresholds)?;
    let demand_current = match config.demand_metric {
        DemandMetric::Normalized => latest.demand_norm,
        DemandMetric::Forecast => latest.demand_vs_forecast,
    };
    let demand_reading = DimensionReading {
        current: demand_current,
        band: demand_band,
        alert: classify_dimension(Dimension::Demand, demand_current, &demand_band, thresholds),
    };

    // Green series is non-empty here, so its head is the latest mix period with generation.
    let mix_period = green_series[0].period;
    let source_mix = source_shares(mix, mix_period)
        .ok_or_else(|| EngineError::empty(format!("no {ba} generation reported at {mix_period}")))?;

    info!(
        ba,
        period = %latest.period,
        green = latest.green_ratio,
        demand = demand_current,
        "stats ready"
    );

    Ok(assemble(Readings {
        ba,
        created,
        latest,
        source_mix,
        green,
        demand: demand_reading,
        green_series: &green_series,
        demand_series: &demand_series,
    }))
}

fn demand_metric(d: &DemandRatio, metric: DemandMetric) -> f64 {
    match metric {
        DemandMetric::Normalized => d.demand_norm,
        DemandMetric::Forecast => d.demand_to_forecast_ratio,
    }
}
