//! Demand vs forecast and vs the window maximum.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::domain::{DEMAND_ACTUAL, DEMAND_FORECAST, DemandRatio, ForecastGapPolicy, SeriesTable};

/// Join actual demand (`D`) with forecast (`DF`) by period, most recent first.
///
/// Normalized columns divide by the largest actual demand in the table, so
/// they are relative to the fetched window. Periods without a usable
/// forecast are dropped unless `policy` can fill them in.
pub fn compute_demand_ratio(demand: &SeriesTable, policy: ForecastGapPolicy) -> Vec<DemandRatio> {
    let actual = demand.category_series(DEMAND_ACTUAL);
    let forecast = demand.category_series(DEMAND_FORECAST);

    let max_demand = actual.values().copied().fold(f64::NEG_INFINITY, f64::max);
    if !(max_demand.is_finite() && max_demand > 0.0) {
        debug!(ba = %demand.ba, "no positive actual demand in window");
        return Vec::new();
    }

    let mut out = Vec::with_capacity(actual.len());
    for (&period, &d) in actual.iter().rev() {
        let (f, interpolated) = match forecast.get(&period) {
            Some(&f) => (f, false),
            None => match policy {
                ForecastGapPolicy::Drop => continue,
                ForecastGapPolicy::Interpolate => match interpolate(&forecast, period) {
                    Some(f) => (f, true),
                    None => continue,
                },
            },
        };
        if f == 0.0 || !f.is_finite() {
            debug!(%period, "excluding period with zero forecast");
            continue;
        }
        out.push(DemandRatio {
            period,
            demand: d,
            forecast: f,
            demand_norm: d / max_demand,
            forecast_norm: f / max_demand,
            demand_to_forecast_ratio: d / f,
            demand_minus_forecast: d - f,
            forecast_interpolated: interpolated,
        });
    }
    out
}

/// Linear interpolation between the nearest forecasts before and after `at`.
fn interpolate(series: &BTreeMap<DateTime<Utc>, f64>, at: DateTime<Utc>) -> Option<f64> {
    let (&t0, &v0) = series.range(..at).next_back()?;
    let (&t1, &v1) = series.range(at..).next()?;
    let span = (t1 - t0).num_seconds() as f64;
    if span <= 0.0 {
        return Some(v0);
    }
    let u = (at - t0).num_seconds() as f64 / span;
    Some(v0 + u * (v1 - v0))
}
