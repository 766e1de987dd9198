//! Trace stream driver.
//!
//! Opens the trace source (gzip or plain text), reads the preamble, then
//! walks the stream strictly line by line, dispatching classified lines to
//! the correlators. Sequential order matters: phase lines for one key must
//! be applied in file order for the disjoint-field merge to hold, so there
//! is deliberately no within-file parallelism here.

use crate::parser::classify::{classify, TraceCategory};
use crate::parser::header::read_header;
use crate::parser::io_trace::{handle_io_line, KeyScheme};
use crate::parser::schema::TraceLog;
use crate::parser::ts_trace::handle_ts_line;
use crate::utils::error::{ConfigError, ParseError};
use flate2::read::GzDecoder;
use log::{debug, info};
use std::collections::HashSet;
use std::fs::File;
use std::io::{BufRead, BufReader, Read, Seek, SeekFrom};
use std::path::Path;

/// Gzip magic bytes
const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// Open a trace file, transparently decompressing gzip.
///
/// Sniffs the magic bytes rather than trusting the extension; trace
/// reports show up both compressed and plain in the wild.
pub fn open_trace(path: impl AsRef<Path>) -> Result<Box<dyn BufRead>, ConfigError> {
    let path = path.as_ref();
    let mut file = File::open(path)?;

    let mut magic = [0u8; 2];
    let n = file.read(&mut magic)?;
    file.seek(SeekFrom::Start(0))?;

    if n == 2 && magic == GZIP_MAGIC {
        debug!("{}: gzip-compressed trace", path.display());
        Ok(Box::new(BufReader::new(GzDecoder::new(file))))
    } else {
        debug!("{}: plain-text trace", path.display());
        Ok(Box::new(BufReader::new(file)))
    }
}

/// Configured correlation engine for one trace stream
pub struct TraceParser {
    filters: HashSet<TraceCategory>,
    key_scheme: KeyScheme,
}

impl TraceParser {
    pub fn new(filters: HashSet<TraceCategory>, key_scheme: KeyScheme) -> Self {
        Self {
            filters,
            key_scheme,
        }
    }

    /// Run the correlation pass over a complete trace stream.
    ///
    /// Reads the preamble for the epoch anchors, then classifies and
    /// dispatches every data line. Per-line noise is absorbed by the
    /// correlators; only header or stream I/O failures surface here.
    pub fn parse_stream(&self, reader: &mut impl BufRead) -> Result<TraceLog, ParseError> {
        let mut log = TraceLog::new();
        log.header = read_header(reader)?;
        let trace_start_epoch = log.header.trace_start_epoch;

        let mut total = 0u64;
        let mut matched = 0u64;
        let mut buf = String::new();
        loop {
            buf.clear();
            if reader.read_line(&mut buf)? == 0 {
                break;
            }
            total += 1;

            let tokens: Vec<&str> = buf.split_whitespace().collect();
            let Some(classified) = classify(&tokens) else {
                continue;
            };
            if !self.filters.contains(&classified.category) {
                continue;
            }
            matched += 1;

            match classified.category {
                TraceCategory::Io => {
                    handle_io_line(&tokens, &buf, &mut log, self.key_scheme, trace_start_epoch);
                }
                TraceCategory::Messaging => handle_ts_line(&tokens, &buf, &mut log),
                // Selectable but not correlated; counted and dropped
                TraceCategory::Rdma | TraceCategory::ByteRangeLock => {}
            }
        }

        info!(
            "parsed {} data lines, {} matched active filters ({} io records, {} messaging records)",
            total,
            matched,
            log.io.len(),
            log.messaging.len()
        );
        Ok(log)
    }

    /// Convenience wrapper: open a file (gzip or plain) and parse it
    pub fn parse_path(&self, path: impl AsRef<Path>) -> Result<TraceLog, ParseError> {
        let mut reader = open_trace(path).map_err(|e| match e {
            ConfigError::Io(io) => ParseError::Io(io),
            other => ParseError::MalformedHeader(other.to_string()),
        })?;
        self.parse_stream(&mut reader)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::io_trace::tests::{fio_line, qio_line, sio_line};
    use crate::parser::ts_trace::tests::{handle_line, send_line};
    use flate2::write::GzEncoder;
    use flate2::Compression;
    use std::io::{Cursor, Write};

    const HEADER: &str = "\
Trace started: Wed Jul 17 13:00:00 2013
Trace stopped: Wed Jul 17 13:05:00 2013
legend 3
legend 4
legend 5
legend 6
legend 7
legend 8
";

    fn synthetic_trace() -> String {
        let mut t = String::from(HEADER);
        t.push_str(&qio_line(1.0, "77", 3, "0x4000", 8));
        t.push('\n');
        t.push_str(&sio_line(1.2, "77", 3, "0x4000", 8));
        t.push('\n');
        t.push_str(&fio_line(1.5, "77", 3, "0x4000", 8));
        t.push('\n');
        t.push_str(&handle_line(2.0, "55", "nsdMsgReadExt", "0x9A1", "10.0.0.2"));
        t.push('\n');
        t.push_str(&send_line(3.0, "60", "0xB00", "10.0.0.7", "nsd07"));
        t.push('\n');
        // Foreign category noise must be ignored silently
        t.push_str("3.100000 60 TRACE_FS: open: name 'foo' mode 0644\n");
        t
    }

    fn all_filters() -> HashSet<TraceCategory> {
        [
            TraceCategory::Io,
            TraceCategory::Messaging,
            TraceCategory::Rdma,
            TraceCategory::ByteRangeLock,
        ]
        .into_iter()
        .collect()
    }

    #[test]
    fn test_parse_stream_correlates_both_categories() {
        let parser = TraceParser::new(all_filters(), KeyScheme::DiskAddress);
        let log = parser
            .parse_stream(&mut Cursor::new(synthetic_trace()))
            .unwrap();

        assert_eq!(log.header.trace_start_epoch, 1374066000);
        assert_eq!(log.io.len(), 1);
        assert!(log.io["3:0x4000"].is_complete());
        assert_eq!(log.messaging.len(), 2);
        assert_eq!(log.nodes["10.0.0.7"], "nsd07");
    }

    #[test]
    fn test_disabled_category_is_dropped_before_parsing() {
        let filters = [TraceCategory::Messaging].into_iter().collect();
        let parser = TraceParser::new(filters, KeyScheme::DiskAddress);
        let log = parser
            .parse_stream(&mut Cursor::new(synthetic_trace()))
            .unwrap();

        assert!(log.io.is_empty());
        assert_eq!(log.messaging.len(), 2);
    }

    #[test]
    fn test_gzip_and_plain_sources_parse_identically() {
        let dir = tempfile::tempdir().unwrap();
        let plain_path = dir.path().join("trace.txt");
        let gz_path = dir.path().join("trace.txt.gz");

        std::fs::write(&plain_path, synthetic_trace()).unwrap();
        let gz_file = File::create(&gz_path).unwrap();
        let mut enc = GzEncoder::new(gz_file, Compression::default());
        enc.write_all(synthetic_trace().as_bytes()).unwrap();
        enc.finish().unwrap();

        let parser = TraceParser::new(all_filters(), KeyScheme::DiskAddress);
        let from_plain = parser.parse_path(&plain_path).unwrap();
        let from_gz = parser.parse_path(&gz_path).unwrap();

        assert_eq!(from_plain.io.len(), from_gz.io.len());
        assert_eq!(from_plain.messaging.len(), from_gz.messaging.len());
        assert_eq!(
            from_plain.header.trace_stop_epoch,
            from_gz.header.trace_stop_epoch
        );
    }

    #[test]
    fn test_missing_file_is_a_config_error() {
        assert!(open_trace("/nonexistent/trace.gz").is_err());
    }
}
