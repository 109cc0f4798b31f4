//! Response assembly: packaging computed readings into a `StatsResponse`.

pub mod format;

pub use format::*;

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};

use crate::domain::{
    AlertClassification, DataTimeseries, DemandRatio, DemandSeriesBlock, GreenRatio, MixSeriesBlock, RatioSample,
    ReferenceBand, StatsResponse,
};

pub const SW_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Current value, band and classification of one gauge dimension.
#[derive(Debug, Clone, PartialEq)]
pub struct DimensionReading {
    pub current: f64,
    pub band: ReferenceBand,
    pub alert: AlertClassification,
}

/// Everything the assembler needs; computed upstream.
#[derive(Debug, Clone)]
pub struct Readings<'a> {
    pub ba: &'a str,
    pub created: DateTime<Utc>,
    pub latest: RatioSample,
    pub source_mix: BTreeMap<String, f64>,
    pub green: DimensionReading,
    pub demand: DimensionReading,
    pub green_series: &'a [GreenRatio],
    pub demand_series: &'a [DemandRatio],
}

pub fn assemble(readings: Readings<'_>) -> StatsResponse {
    let Readings {
        ba,
        created,
        latest,
        source_mix,
        green,
        demand,
        green_series,
        demand_series,
    } = readings;

    StatsResponse {
        created,
        sw_version: SW_VERSION.to_string(),
        ba_name: ba.to_string(),
        period_current: latest.period,
        source_ratio_current: source_mix,
        green_ratio_current: green.current,
        green_ratio_mean: green.band.mean,
        green_threshold_low: green.band.low_threshold,
        green_threshold_high: green.band.high_threshold,
        green_alert: green.alert.state,
        alert_text: green.alert.text,
        demand_ratio_current: demand.current,
        demand_ratio_mean: demand.band.mean,
        demand_threshold_low: demand.band.low_threshold,
        demand_threshold_high: demand.band.high_threshold,
        demand_alert: demand.alert.state,
        demand_alert_text: demand.alert.text,
        data_timeseries: DataTimeseries {
            demand_data: demand_block(demand_series),
            mix_data: mix_block(green_series),
        },
    }
}

fn demand_block(series: &[DemandRatio]) -> DemandSeriesBlock {
    let mut block = DemandSeriesBlock::default();
    for d in series {
        block.period.push(d.period);
        block.demand.push(d.demand);
        block.forecast.push(d.forecast);
        block.demand_norm.push(d.demand_norm);
        block.forecast_norm.push(d.forecast_norm);
        block.demand_to_forecast_ratio.push(d.demand_to_forecast_ratio);
        block.demand_minus_forecast.push(d.demand_minus_forecast);
    }
    block
}

fn mix_block(series: &[GreenRatio]) -> MixSeriesBlock {
    let mut block = MixSeriesBlock::default();
    for g in series {
        block.period.push(g.period);
        block.green_generation.push(g.green_generation);
        block.total_generation.push(g.total_generation);
        block.green_ratio.push(g.ratio);
    }
    block
}
