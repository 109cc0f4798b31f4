//! Input/output helpers.
//!
//! - stats JSON read/write (`stats`)
//! - raw table CSV export (`export`)

pub mod export;
pub mod stats;

pub use export::*;
pub use stats::*;
