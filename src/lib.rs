//! Fstrace Studio
//!
//! Correlation and statistics for line-oriented diagnostic trace logs
//! emitted by a distributed-filesystem kernel module. Reconstructs
//! multi-line I/O operations and inter-node message exchanges, then
//! aggregates them into per-disk and per-message statistics.
//!
//! This crate provides the core implementation for the `fstrace` CLI tool.

pub mod aggregator;
pub mod output;
pub mod parser;
pub mod utils;
