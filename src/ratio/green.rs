//! Green generation share per period.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::domain::{GREEN_CATEGORIES, GreenRatio, SeriesTable};

pub fn is_green(category: &str) -> bool {
    GREEN_CATEGORIES.iter().any(|g| g.eq_ignore_ascii_case(category))
}

/// Green share of total generation for every period in the mix table, most
/// recent first.
///
/// Periods whose total generation is not positive have no defined share and
/// are left out.
pub fn compute_green_ratio(mix: &SeriesTable) -> Vec<GreenRatio> {
    let mut sums: BTreeMap<DateTime<Utc>, (f64, f64)> = BTreeMap::new();
    for p in &mix.points {
        let (green, total) = sums.entry(p.period).or_insert((0.0, 0.0));
        if is_green(&p.category) {
            *green += p.value;
        }
        *total += p.value;
    }

    let mut out = Vec::with_capacity(sums.len());
    for (period, (green, total)) in sums.into_iter().rev() {
        if !(total > 0.0) {
            debug!(%period, total, "excluding period with no generation");
            continue;
        }
        let ratio = green / total;
        if !ratio.is_finite() {
            continue;
        }
        out.push(GreenRatio {
            period,
            green_generation: green,
            total_generation: total,
            ratio,
        });
    }
    out
}

/// Share of each reported category at `period`, renormalized over whatever
/// categories were reported that hour.
pub fn source_shares(mix: &SeriesTable, period: DateTime<Utc>) -> Option<BTreeMap<String, f64>> {
    let values = mix.at_period(period);
    let total: f64 = values.values().sum();
    if !(total > 0.0) {
        return None;
    }
    Some(values.into_iter().map(|(category, v)| (category, v / total)).collect())
}
