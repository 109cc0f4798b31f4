//! Ratio calculation over fetched tables.
//!
//! - green share of generation per period (`green`)
//! - demand vs forecast and vs window maximum (`demand`)
//! - joining both series by period (`join_by_period`)

pub mod demand;
pub mod green;

pub use demand::*;
pub use green::*;

use std::collections::HashMap;

use crate::domain::{DemandRatio, GreenRatio, RatioSample};

/// Inner join of the green and demand series on period, most recent first.
pub fn join_by_period(green: &[GreenRatio], demand: &[DemandRatio]) -> Vec<RatioSample> {
    let by_period: HashMap<_, _> = demand.iter().map(|d| (d.period, d)).collect();
    let mut out: Vec<RatioSample> = green
        .iter()
        .filter_map(|g| {
            by_period.get(&g.period).map(|d| RatioSample {
                period: g.period,
                green_ratio: g.ratio,
                demand_norm: d.demand_norm,
                demand_vs_forecast: d.demand_to_forecast_ratio,
            })
        })
        .collect();
    out.sort_by(|a, b| b.period.cmp(&a.period));
    out
}

#[cfg(test)]
mod tests {
    use chrono::{DateTime, TimeDelta, TimeZone, Utc};

    use super::*;

    fn hour(h: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap() + TimeDelta::hours(h)
    }

    fn green(h: i64, ratio: f64) -> GreenRatio {
        GreenRatio {
            period: hour(h),
            green_generation: ratio * 100.0,
            total_generation: 100.0,
            ratio,
        }
    }

    fn demand(h: i64, norm: f64) -> DemandRatio {
        DemandRatio {
            period: hour(h),
            demand: norm * 100.0,
            forecast: 100.0,
            demand_norm: norm,
            forecast_norm: 1.0,
            demand_to_forecast_ratio: norm,
            demand_minus_forecast: norm * 100.0 - 100.0,
            forecast_interpolated: false,
        }
    }

    #[test]
    fn join_keeps_shared_periods_latest_first() {
        let g = vec![green(3, 0.4), green(2, 0.3), green(1, 0.2)];
        let d = vec![demand(4, 0.9), demand(2, 0.8), demand(1, 0.7)];
        let joined = join_by_period(&g, &d);
        let periods: Vec<_> = joined.iter().map(|s| s.period).collect();
        assert_eq!(periods, vec![hour(2), hour(1)]);
        assert_eq!(joined[0].green_ratio, 0.3);
        assert_eq!(joined[0].demand_norm, 0.8);
    }

    #[test]
    fn join_of_disjoint_series_is_empty() {
        assert!(join_by_period(&[green(1, 0.5)], &[demand(2, 0.5)]).is_empty());
    }
}
