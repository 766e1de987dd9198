//! Error types for the entire application.
//!
//! We use `thiserror` for library-style errors with custom types,
//! and `anyhow` for application-level error propagation in main.rs.

use thiserror::Error;

/// Errors in run configuration, detected before any parsing begins
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("unknown filter name: {0} (valid: io, messaging, rdma, byte-range-lock)")]
    UnknownFilter(String),

    #[error("unknown correlation key scheme: {0} (valid: disk-address, disk-address-pid)")]
    UnknownKeyScheme(String),

    #[error("cannot open trace source: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors that can occur during trace parsing
///
/// Only header problems are fatal; per-line noise is absorbed with a
/// log message and the line is skipped.
#[derive(Error, Debug)]
pub enum ParseError {
    #[error("malformed trace header: {0}")]
    MalformedHeader(String),

    #[error("trace stream read failed: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors that can occur writing or reloading a TraceLog dump
#[derive(Error, Debug)]
pub enum OutputError {
    #[error("failed to write file: {0}")]
    WriteFailed(#[from] std::io::Error),

    #[error("failed to serialize JSON: {0}")]
    SerializationFailed(#[from] serde_json::Error),

    #[error("invalid output path: {0}")]
    InvalidPath(String),
}
