//! I/O phase-line correlation.
//!
//! A logical I/O operation shows up as up to three independent lines:
//! queued (QIO), started (SIO), finished (FIO). The only token shared by
//! all three is the `disknum:diskaddr` address, so that is the correlation
//! key; each phase writes its own disjoint set of fields into the keyed
//! record. Token offsets differ per phase because the three messages have
//! different layouts.

use crate::parser::schema::{FinishedIo, QueuedIo, StartedIo, TraceLog};
use crate::utils::error::ConfigError;
use log::warn;
use std::str::FromStr;

/// Correlation key derivation strategy.
///
/// Appending the process id makes keys more robust against quick reuse of
/// the same disk address, but splits operations whose pid changes between
/// phases (observed for some log-write paths) into two partial records.
/// Neither scheme is right for every trace, so the choice is exposed to
/// the caller; `DiskAddress` matches the historical behavior.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum KeyScheme {
    /// `disknum:diskaddr`
    #[default]
    DiskAddress,
    /// `disknum:diskaddr:pid`
    DiskAddressPid,
}

impl KeyScheme {
    fn derive(&self, addr: &str, pid: &str) -> String {
        match self {
            KeyScheme::DiskAddress => addr.to_string(),
            KeyScheme::DiskAddressPid => format!("{}:{}", addr, pid),
        }
    }
}

impl FromStr for KeyScheme {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, ConfigError> {
        match s {
            "disk-address" => Ok(Self::DiskAddress),
            "disk-address-pid" => Ok(Self::DiskAddressPid),
            other => Err(ConfigError::UnknownKeyScheme(other.to_string())),
        }
    }
}

/// Dispatch one TRACE_IO line into the trace log.
///
/// Unknown operation tags and lines that do not match the expected layout
/// are skipped with a log message; a noisy line must never abort the parse.
pub fn handle_io_line(
    tokens: &[&str],
    line: &str,
    log: &mut TraceLog,
    scheme: KeyScheme,
    trace_start_epoch: i64,
) {
    match tokens[3] {
        "QIO:" => parse_qio(tokens, line, log, scheme),
        "SIO:" => parse_sio(tokens, line, log, scheme),
        "FIO:" => parse_fio(tokens, line, log, scheme, trace_start_epoch),
        // Other TRACE_IO operations exist but carry nothing we correlate
        _ => {}
    }
}

/// Queued phase. Layout:
/// `<time> <pid> TRACE_IO: QIO: <op..5> _ <tags 7..8> ... <diskid@15> _ <dn:da@17> _ <nsec@19> _ <align@21>`
fn parse_qio(tokens: &[&str], line: &str, log: &mut TraceLog, scheme: KeyScheme) {
    if tokens.len() < 22 {
        warn!("short QIO line ({} tokens), skipping: {}", tokens.len(), line.trim_end());
        return;
    }
    let Some((trace_time, pid)) = time_and_pid(tokens, line) else {
        return;
    };
    let Some((disk_num, disk_addr)) = split_disk_addr(tokens[17], line) else {
        return;
    };
    let Some(n_sectors) = parse_sectors(tokens[19], line) else {
        return;
    };

    let key = scheme.derive(tokens[17], pid);
    log.io_record(&key).queued = Some(QueuedIo {
        trace_time,
        pid: pid.to_string(),
        disk_id: tokens[15].to_string(),
        disk_num,
        disk_addr,
        op_type: tokens[4..6].join(" "),
        n_sectors,
        align: tokens[21].to_string(),
        tags: tokens[7..9].iter().map(|t| t.to_string()).collect(),
        queued_time: None,
        line: line.trim_end().to_string(),
    });
}

/// Started phase. Layout:
/// `<time> <pid> TRACE_IO: SIO: ... <diskid@10> _ <dn:da@12> _ <nsec@14>`
fn parse_sio(tokens: &[&str], line: &str, log: &mut TraceLog, scheme: KeyScheme) {
    if tokens.len() < 15 {
        warn!("short SIO line ({} tokens), skipping: {}", tokens.len(), line.trim_end());
        return;
    }
    let Some((trace_time, pid)) = time_and_pid(tokens, line) else {
        return;
    };
    let Some((disk_num, disk_addr)) = split_disk_addr(tokens[12], line) else {
        return;
    };
    let Some(n_sectors) = parse_sectors(tokens[14], line) else {
        return;
    };

    let key = scheme.derive(tokens[12], pid);
    log.io_record(&key).started = Some(StartedIo {
        trace_time,
        pid: pid.to_string(),
        disk_id: tokens[10].to_string(),
        disk_num,
        disk_addr,
        n_sectors,
        start_time: None,
        line: line.trim_end().to_string(),
    });
}

/// Finished phase; same layout as QIO minus the alignment field.
/// The absolute completion time anchors on the header epoch.
fn parse_fio(
    tokens: &[&str],
    line: &str,
    log: &mut TraceLog,
    scheme: KeyScheme,
    trace_start_epoch: i64,
) {
    if tokens.len() < 20 {
        warn!("short FIO line ({} tokens), skipping: {}", tokens.len(), line.trim_end());
        return;
    }
    let Some((trace_time, pid)) = time_and_pid(tokens, line) else {
        return;
    };
    let Some((disk_num, disk_addr)) = split_disk_addr(tokens[17], line) else {
        return;
    };
    let Some(n_sectors) = parse_sectors(tokens[19], line) else {
        return;
    };

    let key = scheme.derive(tokens[17], pid);
    log.io_record(&key).finished = Some(FinishedIo {
        trace_time,
        pid: pid.to_string(),
        disk_id: tokens[15].to_string(),
        disk_num,
        disk_addr,
        op_type: tokens[4..6].join(" "),
        n_sectors,
        tags: tokens[7..9].iter().map(|t| t.to_string()).collect(),
        finish_time: trace_start_epoch as f64 + trace_time,
        line: line.trim_end().to_string(),
    });
}

/// Relative trace time and pid from the first two tokens
fn time_and_pid<'a>(tokens: &[&'a str], line: &str) -> Option<(f64, &'a str)> {
    match tokens[0].parse::<f64>() {
        Ok(t) => Some((t, tokens[1])),
        Err(_) => {
            warn!("bad trace time {:?}, skipping: {}", tokens[0], line.trim_end());
            None
        }
    }
}

/// Split a `disknum:diskaddr` token into its parts
fn split_disk_addr(token: &str, line: &str) -> Option<(u32, String)> {
    let (num, addr) = token.split_once(':')?;
    match num.parse::<u32>() {
        Ok(n) => Some((n, addr.to_string())),
        Err(_) => {
            warn!("bad disk address {:?}, skipping: {}", token, line.trim_end());
            None
        }
    }
}

fn parse_sectors(token: &str, line: &str) -> Option<u64> {
    match token.parse::<u64>() {
        Ok(n) => Some(n),
        Err(_) => {
            warn!("bad sector count {:?}, skipping: {}", token, line.trim_end());
            None
        }
    }
}
