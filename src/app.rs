//! Top-level application orchestration.
//!
//! `src/main.rs` is intentionally tiny; this module is the "real main" that:
//! - parses CLI arguments and sets up logging
//! - loads configuration and applies CLI overrides
//! - runs the engine
//! - prints summaries and writes optional exports

use std::io::Write;

use clap::Parser;

use crate::cli::{Command, EngineArgs, SeriesArgs, ShowArgs, StatsArgs};
use crate::config::{EngineConfig, max_age_from_secs};
use crate::engine::GaugeEngine;
use crate::error::{AppError, EngineResult};

/// Entry point for the `gauge` binary.
pub fn run() -> Result<(), AppError> {
    let cli = crate::cli::Cli::parse();
    crate::logging::init(cli.verbose);

    match cli.command {
        Command::Stats(args) => handle_stats(args),
        Command::Series(args) => handle_series(args),
        Command::Show(args) => handle_show(args),
    }
}

fn handle_stats(args: StatsArgs) -> Result<(), AppError> {
    let engine = engine_from_args(&args.engine)?;
    let stats = engine.get_stats(&args.ba)?;

    if args.json {
        let json = serde_json::to_string_pretty(&stats)
            .map_err(|e| AppError::new(4, format!("Failed to serialize stats: {e}")))?;
        println!("{json}");
    } else {
        println!("{}", crate::report::format_stats_summary(&stats));
    }

    if let Some(path) = &args.export {
        crate::io::write_stats_json(path, &stats)?;
    }

    Ok(())
}

fn handle_series(args: SeriesArgs) -> Result<(), AppError> {
    let engine = engine_from_args(&args.engine)?;
    let table = engine.series(args.kind, &args.ba)?;

    match &args.out {
        Some(path) => crate::io::write_table_csv_file(path, &table)?,
        None => {
            let stdout = std::io::stdout();
            let mut lock = stdout.lock();
            crate::io::write_table_csv(&mut lock, &table)?;
            lock.flush()
                .map_err(|e| AppError::new(2, format!("Failed to flush stdout: {e}")))?;
        }
    }
    Ok(())
}

fn handle_show(args: ShowArgs) -> Result<(), AppError> {
    let stats = crate::io::read_stats_json(&args.file)?;
    println!("{}", crate::report::format_stats_summary(&stats));
    Ok(())
}

fn engine_from_args(args: &EngineArgs) -> Result<GaugeEngine, AppError> {
    let mut config = EngineConfig::from_env()?;
    apply_overrides(&mut config, args)?;
    Ok(GaugeEngine::from_config(config)?)
}

/// Apply CLI flags on top of environment configuration.
pub fn apply_overrides(config: &mut EngineConfig, args: &EngineArgs) -> EngineResult<()> {
    if let Some(secs) = args.max_age_secs {
        config.max_age = max_age_from_secs(secs)?;
    }
    if let Some(days) = args.history_days {
        config.history_days = days;
    }
    if let Some(days) = args.forecast_days {
        config.forecast_days = days;
    }
    if let Some(secs) = args.timeout_secs {
        config.request_timeout = std::time::Duration::from_secs(secs);
    }
    if let Some(frequency) = args.frequency {
        config.frequency = frequency;
    }
    if let Some(low) = args.low_pct {
        config.thresholds.low_pct = low;
    }
    if let Some(high) = args.high_pct {
        config.thresholds.high_pct = high;
    }
    if let Some(policy) = args.gap_policy {
        config.forecast_gap_policy = policy;
    }
    if let Some(metric) = args.demand_metric {
        config.demand_metric = metric;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use chrono::TimeDelta;

    use super::*;
    use crate::domain::{DemandMetric, ForecastGapPolicy, Thresholds};

    #[test]
    fn unset_flags_keep_config_values() {
        let mut config = EngineConfig::default();
        apply_overrides(&mut config, &EngineArgs::default()).unwrap();
        assert_eq!(config.max_age, TimeDelta::hours(1));
        assert_eq!(config.thresholds, Thresholds::default());
    }

    #[test]
    fn flags_override_config() {
        let mut config = EngineConfig::default();
        let args = EngineArgs {
            max_age_secs: Some(600),
            forecast_days: Some(3),
            low_pct: Some(0.8),
            high_pct: Some(1.2),
            gap_policy: Some(ForecastGapPolicy::Interpolate),
            demand_metric: Some(DemandMetric::Forecast),
            ..EngineArgs::default()
        };
        apply_overrides(&mut config, &args).unwrap();
        assert_eq!(config.max_age, TimeDelta::minutes(10));
        assert_eq!(config.forecast_days, 3);
        assert_eq!(config.thresholds, Thresholds { low_pct: 0.8, high_pct: 1.2 });
        assert_eq!(config.forecast_gap_policy, ForecastGapPolicy::Interpolate);
        assert_eq!(config.demand_metric, DemandMetric::Forecast);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn out_of_range_max_age_flag_is_rejected() {
        let mut config = EngineConfig::default();
        let args = EngineArgs {
            max_age_secs: Some(i64::MAX),
            ..EngineArgs::default()
        };
        let err = apply_overrides(&mut config, &args).unwrap_err();
        assert!(matches!(err, crate::error::EngineError::Config(_)));
        assert_eq!(config.max_age, TimeDelta::hours(1));
    }
}
