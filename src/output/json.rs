//! Gzip-compressed JSON dump of a correlated TraceLog.
//!
//! Parsing a multi-gigabyte trace is slow; dumping the correlated records
//! lets later analysis runs reload them through `read_tracelog` and go
//! straight to aggregation.

use crate::parser::schema::TraceLog;
use crate::utils::error::OutputError;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use log::{debug, info};
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

/// Write a TraceLog to a gzip-compressed JSON file
///
/// # Errors
/// * `OutputError::WriteFailed` - I/O error during write
/// * `OutputError::SerializationFailed` - JSON serialization error
/// * `OutputError::InvalidPath` - path is empty or a directory
pub fn write_tracelog(log: &TraceLog, output_path: impl AsRef<Path>) -> Result<(), OutputError> {
    let output_path = output_path.as_ref();

    info!("writing trace dump to: {}", output_path.display());
    validate_output_path(output_path)?;

    if let Some(parent) = output_path.parent() {
        if !parent.exists() {
            debug!("creating parent directories: {}", parent.display());
            std::fs::create_dir_all(parent).map_err(|e| {
                OutputError::InvalidPath(format!(
                    "cannot create directory {}: {}",
                    parent.display(),
                    e
                ))
            })?;
        }
    }

    let file = File::create(output_path).map_err(OutputError::WriteFailed)?;
    let mut encoder = GzEncoder::new(BufWriter::new(file), Compression::default());
    serde_json::to_writer(&mut encoder, log).map_err(OutputError::SerializationFailed)?;
    let mut writer = encoder.finish().map_err(OutputError::WriteFailed)?;
    writer.flush().map_err(OutputError::WriteFailed)?;

    info!("trace dump written ({} bytes compressed)", file_size(output_path));
    Ok(())
}

/// Reload a TraceLog from a gzip-compressed JSON dump.
///
/// This is the alternate construction path: the result feeds the
/// aggregators exactly like a freshly parsed trace.
pub fn read_tracelog(input_path: impl AsRef<Path>) -> Result<TraceLog, OutputError> {
    let input_path = input_path.as_ref();
    debug!("reading trace dump from: {}", input_path.display());

    let file = File::open(input_path).map_err(OutputError::WriteFailed)?;
    let decoder = GzDecoder::new(BufReader::new(file));
    let log: TraceLog = serde_json::from_reader(decoder).map_err(OutputError::SerializationFailed)?;

    debug!(
        "trace dump loaded: {} io records, {} messaging records",
        log.io.len(),
        log.messaging.len()
    );
    Ok(log)
}

/// Validate that the output path is usable
fn validate_output_path(path: &Path) -> Result<(), OutputError> {
    if path.as_os_str().is_empty() {
        return Err(OutputError::InvalidPath("path is empty".to_string()));
    }
    if path.exists() && path.is_dir() {
        return Err(OutputError::InvalidPath(format!(
            "path is a directory: {}",
            path.display()
        )));
    }
    Ok(())
}

fn file_size(path: &Path) -> u64 {
    std::fs::metadata(path).map(|m| m.len()).unwrap_or(0)
}
