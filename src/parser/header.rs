//! Trace preamble reader.
//!
//! The first two preamble lines embed human-readable wall-clock dates for
//! trace start and stop. Everything after a relative trace-clock offset in
//! the data lines hangs off these two epoch anchors, so an unparsable
//! header is a hard stop.

use crate::parser::schema::TraceHeader;
use crate::utils::config::PREAMBLE_LINES;
use crate::utils::error::ParseError;
use chrono::NaiveDateTime;
use log::debug;
use std::io::BufRead;

/// Consume the preamble from the trace stream and return the epoch anchors
///
/// Reads exactly `PREAMBLE_LINES` lines: dates from lines one and two,
/// the remainder skipped unconditionally.
pub fn read_header(reader: &mut impl BufRead) -> Result<TraceHeader, ParseError> {
    let mut lines = Vec::with_capacity(PREAMBLE_LINES);
    let mut buf = String::new();
    for n in 0..PREAMBLE_LINES {
        buf.clear();
        if reader.read_line(&mut buf)? == 0 {
            return Err(ParseError::MalformedHeader(format!(
                "trace ended inside preamble (line {} of {})",
                n + 1,
                PREAMBLE_LINES
            )));
        }
        lines.push(buf.trim_end().to_string());
    }

    let trace_start_epoch = parse_header_date(&lines[0])?;
    let trace_stop_epoch = parse_header_date(&lines[1])?;
    debug!(
        "trace window: start epoch {}, stop epoch {}",
        trace_start_epoch, trace_stop_epoch
    );

    Ok(TraceHeader {
        trace_start_epoch,
        trace_stop_epoch,
    })
}

/// Parse the embedded date on a preamble line into a Unix timestamp
///
/// Layout after the two leading label tokens:
/// `<weekday> <month-name> <day> <HH:MM:SS> ... <year>`
/// e.g. `Trace started: Wed Jul 17 13:00:00 2013`.
fn parse_header_date(line: &str) -> Result<i64, ParseError> {
    let tokens: Vec<&str> = line.split_whitespace().collect();
    if tokens.len() < 6 {
        return Err(ParseError::MalformedHeader(format!(
            "expected a dated preamble line, got: {:?}",
            line
        )));
    }

    // Skip the label tokens, keep the long date
    let ld = &tokens[2..];
    let year = ld[ld.len() - 1];
    let (month, day, clock) = (ld[1], ld[2], ld[3]);

    let datearg = format!("{}-{}-{} {}", year, month, day, clock);
    let dt = NaiveDateTime::parse_from_str(&datearg, "%Y-%b-%d %H:%M:%S").map_err(|e| {
        ParseError::MalformedHeader(format!("cannot parse date {:?}: {}", datearg, e))
    })?;

    Ok(dt.and_utc().timestamp())
}
