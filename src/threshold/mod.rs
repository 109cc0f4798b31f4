//! Reference bands and alert classification.
//!
//! The band center is the midpoint of the observed range, not the sample
//! mean, so the gauge sits halfway between the window's extremes. Thresholds
//! are the center scaled by `low_pct` / `high_pct`. Classification is a pure
//! function of the latest value and the band: no hysteresis, no memory.

use tracing::info;

use crate::domain::{AlertClassification, AlertState, Dimension, ReferenceBand, Thresholds};
use crate::error::{EngineError, EngineResult};

/// Build the reference band for a ratio history.
///
/// Non-finite values are ignored; an empty history is insufficient data.
pub fn band(values: &[f64], thresholds: &Thresholds) -> EngineResult<ReferenceBand> {
    let mut finite = values.iter().copied().filter(|v| v.is_finite());
    let first = finite
        .next()
        .ok_or_else(|| EngineError::empty("no ratio samples to build a reference band"))?;
    let (min, max) = finite.fold((first, first), |(lo, hi), v| (lo.min(v), hi.max(v)));

    let mean = (min + max) / 2.0;
    Ok(ReferenceBand {
        mean,
        low_threshold: mean * thresholds.low_pct,
        high_threshold: mean * thresholds.high_pct,
    })
}

pub fn classify(latest: f64, band: &ReferenceBand) -> AlertState {
    if latest > band.high_threshold {
        AlertState::AboveHigh
    } else if latest < band.low_threshold {
        AlertState::BelowLow
    } else {
        AlertState::Normal
    }
}

/// Classify and attach the dashboard text for one dimension.
pub fn classify_dimension(
    dimension: Dimension,
    latest: f64,
    band: &ReferenceBand,
    thresholds: &Thresholds,
) -> AlertClassification {
    let state = classify(latest, band);
    let text = alert_text(dimension, state, thresholds);
    info!(
        dimension = dimension.display_name(),
        latest,
        low = band.low_threshold,
        high = band.high_threshold,
        ?state,
        "classified"
    );
    AlertClassification { dimension, state, text }
}

/// Dashboard text for a classification.
///
/// Percentages come from the threshold factors, so changing them changes the
/// displayed figure too. A clean grid invites load; a busy grid asks to shed it.
pub fn alert_text(dimension: Dimension, state: AlertState, thresholds: &Thresholds) -> String {
    let name = dimension.display_name();
    match (dimension, state) {
        (_, AlertState::Normal) => format!("{name} Energy Normal"),
        (Dimension::Green, AlertState::AboveHigh) => format!(
            "{name} Energy {} Higher Than Normal: Plug In Loads!",
            format_pct(thresholds.high_pct)
        ),
        (Dimension::Green, AlertState::BelowLow) => format!(
            "{name} Energy Below {} Of Normal: Shed Loads!",
            format_pct(thresholds.low_pct)
        ),
        (Dimension::Demand, AlertState::AboveHigh) => format!(
            "{name} Energy {} Higher Than Normal: Shed Loads!",
            format_pct(thresholds.high_pct)
        ),
        (Dimension::Demand, AlertState::BelowLow) => format!(
            "{name} Energy Below {} Of Normal: Plug In Loads!",
            format_pct(thresholds.low_pct)
        ),
    }
}

/// `1.10` -> `"110%"`, `0.755` -> `"75.5%"`.
pub fn format_pct(factor: f64) -> String {
    let pct = factor * 100.0;
    if (pct - pct.round()).abs() < 1e-9 {
        format!("{:.0}%", pct.round())
    } else {
        let s = format!("{pct:.2}");
        format!("{}%", s.trim_end_matches('0').trim_end_matches('.'))
    }
}
