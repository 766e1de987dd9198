//! Output writers for correlated trace data.
//!
//! This module handles:
//! - Gzip-JSON dump and reload of the TraceLog
//! - Human-readable summary reports

pub mod json;
pub mod summary;

// Re-export main functions
pub use json::{read_tracelog, write_tracelog};
pub use summary::{write_disk_summary, write_msg_summary};
