//! Export a fetched table to CSV.
//!
//! Columns are `period,category,<value label>`, most recent period first, so
//! the output can go straight into a spreadsheet.

use std::fs::File;
use std::io::Write;
use std::path::Path;

use crate::domain::SeriesTable;
use crate::error::AppError;

pub fn write_table_csv<W: Write>(out: &mut W, table: &SeriesTable) -> Result<(), AppError> {
    writeln!(out, "period,category,{}", csv_field(&table.value_label))
        .map_err(|e| AppError::new(2, format!("Failed to write CSV header: {e}")))?;
    for p in &table.points {
        writeln!(
            out,
            "{},{},{}",
            p.period.format("%Y-%m-%dT%H:%MZ"),
            csv_field(&p.category),
            p.value
        )
        .map_err(|e| AppError::new(2, format!("Failed to write CSV row: {e}")))?;
    }
    Ok(())
}

pub fn write_table_csv_file(path: &Path, table: &SeriesTable) -> Result<(), AppError> {
    let mut file = File::create(path)
        .map_err(|e| AppError::new(2, format!("Failed to create CSV '{}': {e}", path.display())))?;
    write_table_csv(&mut file, table)
}

fn csv_field(raw: &str) -> String {
    if raw.contains([',', '"', '\n']) {
        format!("\"{}\"", raw.replace('"', "\"\""))
    } else {
        raw.to_string()
    }
}
