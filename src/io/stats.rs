//! Read/write `StatsResponse` JSON files.
//!
//! The file is byte-for-byte the shape served to the dashboard, so a saved
//! snapshot can be replayed into the front-end or re-printed later.

use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

use crate::domain::StatsResponse;
use crate::error::AppError;

pub fn write_stats_json(path: &Path, stats: &StatsResponse) -> Result<(), AppError> {
    let file = File::create(path)
        .map_err(|e| AppError::new(2, format!("Failed to create stats JSON '{}': {e}", path.display())))?;
    serde_json::to_writer_pretty(BufWriter::new(file), stats)
        .map_err(|e| AppError::new(2, format!("Failed to write stats JSON: {e}")))?;
    Ok(())
}

pub fn read_stats_json(path: &Path) -> Result<StatsResponse, AppError> {
    let file = File::open(path)
        .map_err(|e| AppError::new(2, format!("Failed to open stats JSON '{}': {e}", path.display())))?;
    let stats: StatsResponse =
        serde_json::from_reader(file).map_err(|e| AppError::new(2, format!("Invalid stats JSON: {e}")))?;
    Ok(stats)
}
