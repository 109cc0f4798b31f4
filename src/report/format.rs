//! Terminal formatting of a `StatsResponse`.
//!
//! Kept apart from assembly so output tweaks never touch the wire shape.

use crate::domain::{AlertState, StatsResponse};

/// How many recent periods the summary table shows.
const RECENT_ROWS: usize = 12;

pub fn format_stats_summary(stats: &StatsResponse) -> String {
    let mut out = String::new();

    out.push_str(&format!("=== gauge - {} ===\n", stats.ba_name));
    out.push_str(&format!(
        "Period: {} | created {} | v{}\n",
        stats.period_current.format("%Y-%m-%d %H:%M UTC"),
        stats.created.format("%Y-%m-%d %H:%M:%S UTC"),
        stats.sw_version
    ));

    out.push_str("\nSource mix:\n");
    let mut shares: Vec<(&String, &f64)> = stats.source_ratio_current.iter().collect();
    shares.sort_by(|a, b| b.1.partial_cmp(a.1).unwrap_or(std::cmp::Ordering::Equal));
    for (category, share) in shares {
        out.push_str(&format!("  {:<14} {:>6.1}%\n", category, share * 100.0));
    }

    out.push_str("\nGauges:\n");
    out.push_str(&format!(
        "  {:<7} current={:.3} mean={:.3} low={:.3} high={:.3} [{}]\n",
        "green",
        stats.green_ratio_current,
        stats.green_ratio_mean,
        stats.green_threshold_low,
        stats.green_threshold_high,
        state_label(stats.green_alert)
    ));
    out.push_str(&format!(
        "  {:<7} current={:.3} mean={:.3} low={:.3} high={:.3} [{}]\n",
        "demand",
        stats.demand_ratio_current,
        stats.demand_ratio_mean,
        stats.demand_threshold_low,
        stats.demand_threshold_high,
        state_label(stats.demand_alert)
    ));

    out.push_str("\nAlerts:\n");
    out.push_str(&format!("  {}\n", stats.alert_text));
    out.push_str(&format!("  {}\n", stats.demand_alert_text));

    let mix = &stats.data_timeseries.mix_data;
    let demand = &stats.data_timeseries.demand_data;
    out.push_str(&format!(
        "\nHistory: {} mix periods, {} demand periods\n",
        mix.period.len(),
        demand.period.len()
    ));
    out.push_str(&format!("{:<17} {:>8} {:>11} {:>9}\n", "period", "green", "demand_norm", "d/f"));
    for (i, period) in mix.period.iter().take(RECENT_ROWS).enumerate() {
        let d = demand.period.iter().position(|p| p == period);
        out.push_str(&format!(
            "{:<17} {:>8.3} {:>11} {:>9}\n",
            period.format("%Y-%m-%d %H:%M"),
            mix.green_ratio[i],
            fmt_opt(d.map(|j| demand.demand_norm[j])),
            fmt_opt(d.map(|j| demand.demand_to_forecast_ratio[j])),
        ));
    }

    out
}

fn state_label(state: AlertState) -> &'static str {
    match state {
        AlertState::BelowLow => "BELOW LOW",
        AlertState::Normal => "normal",
        AlertState::AboveHigh => "ABOVE HIGH",
    }
}

fn fmt_opt(value: Option<f64>) -> String {
    match value {
        Some(v) if v.is_finite() => format!("{v:.3}"),
        _ => "-".to_string(),
    }
}
