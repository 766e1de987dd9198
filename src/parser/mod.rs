//! Trace parsing: header, classification, and phase-line correlation.
//!
//! This module handles:
//! - Reading the preamble epoch anchors
//! - Classifying data lines by category and operation tag
//! - Correlating I/O and messaging phase lines into typed records

pub mod classify;
pub mod engine;
pub mod header;
pub mod io_trace;
pub mod schema;
pub mod ts_trace;

// Re-export main types
pub use classify::{parse_filters, TraceCategory};
pub use engine::{open_trace, TraceParser};
pub use io_trace::KeyScheme;
pub use schema::{IoOperationRecord, MessageExchangeRecord, TraceHeader, TraceLog};
