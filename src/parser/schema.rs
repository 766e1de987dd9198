//! Typed record schema for correlated trace data.
//!
//! The original trace format is a flat token stream; this module defines
//! the structured records the correlators merge phase lines into, and the
//! top-level TraceLog that is handed to the aggregators. Everything here
//! is serde-serializable so a TraceLog can be dumped to JSON and reloaded
//! through the alternate construction path.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// Trace start/stop wall-clock anchors parsed from the preamble.
///
/// Every data line carries only a relative trace-clock offset; these two
/// epochs are what make those offsets meaningful as absolute times.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct TraceHeader {
    /// Unix timestamp of the first preamble date
    pub trace_start_epoch: i64,

    /// Unix timestamp of the second preamble date
    pub trace_stop_epoch: i64,
}

impl TraceHeader {
    /// Wall-clock seconds covered by the trace
    pub fn elapsed_secs(&self) -> i64 {
        self.trace_stop_epoch - self.trace_start_epoch
    }
}

/// Root structure holding all correlated records for one trace file.
///
/// Exclusively owned by the parsing pass; read-only once aggregation
/// begins (the disk aggregator augments records with derived fields in a
/// single mutable pass before reporting).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TraceLog {
    /// Epoch anchors from the preamble
    pub header: TraceHeader,

    /// I/O operations keyed by correlation key (`disknum:diskaddr[:pid]`)
    pub io: HashMap<String, IoOperationRecord>,

    /// Message exchanges keyed by `message_id:process_id`
    pub messaging: HashMap<String, MessageExchangeRecord>,

    /// Peer IP -> hostname, built opportunistically from send events.
    /// First writer wins; best-effort convenience index, not authoritative.
    pub nodes: BTreeMap<String, String>,
}

impl TraceLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get-or-insert the I/O record for a correlation key
    pub fn io_record(&mut self, key: &str) -> &mut IoOperationRecord {
        self.io.entry(key.to_string()).or_default()
    }

    /// Get-or-insert the message-exchange record for a correlation key
    pub fn msg_record(&mut self, key: &str) -> &mut MessageExchangeRecord {
        self.messaging.entry(key.to_string()).or_default()
    }

    /// Record a peer hostname, keeping any earlier mapping for the same ip
    pub fn note_node(&mut self, ip: &str, hostname: &str) {
        self.nodes
            .entry(ip.to_string())
            .or_insert_with(|| hostname.to_string());
    }
}

/// One logical block-I/O operation, assembled from up to three phase lines.
///
/// A record is complete once the `finished` phase arrived; queued/started
/// may legitimately be absent (log writes on client nodes emit only FIO).
/// The derived fields are filled by the disk aggregator and are `None`
/// whenever the contributing phase pair is missing.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IoOperationRecord {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub queued: Option<QueuedIo>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub started: Option<StartedIo>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub finished: Option<FinishedIo>,

    /// finished.n_sectors * SECTOR_SIZE
    #[serde(skip_serializing_if = "Option::is_none")]
    pub io_size: Option<u64>,

    /// finished.trace_time - started.trace_time
    #[serde(skip_serializing_if = "Option::is_none")]
    pub service_time: Option<f64>,

    /// started.trace_time - queued.trace_time
    #[serde(skip_serializing_if = "Option::is_none")]
    pub queue_time: Option<f64>,
}

impl IoOperationRecord {
    /// Completed operations are the only ones that can be sized
    pub fn is_complete(&self) -> bool {
        self.finished.is_some()
    }
}

/// QIO phase: the request entered the disk queue
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QueuedIo {
    pub trace_time: f64,
    pub pid: String,
    pub disk_id: String,
    pub disk_num: u32,
    pub disk_addr: String,
    pub op_type: String,
    pub n_sectors: u64,
    pub align: String,
    pub tags: Vec<String>,
    /// Absolute queue entry time, derived during aggregation
    #[serde(skip_serializing_if = "Option::is_none")]
    pub queued_time: Option<f64>,
    /// Raw source line, kept for longest-I/O diagnostic replay
    pub line: String,
}

/// SIO phase: the request was issued to the device
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StartedIo {
    pub trace_time: f64,
    pub pid: String,
    pub disk_id: String,
    pub disk_num: u32,
    pub disk_addr: String,
    pub n_sectors: u64,
    /// Absolute start time, derived during aggregation
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_time: Option<f64>,
    pub line: String,
}

/// FIO phase: the request completed
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FinishedIo {
    pub trace_time: f64,
    pub pid: String,
    pub disk_id: String,
    pub disk_num: u32,
    pub disk_addr: String,
    pub op_type: String,
    pub n_sectors: u64,
    pub tags: Vec<String>,
    /// Absolute completion time (epoch anchor + relative trace time)
    pub finish_time: f64,
    pub line: String,
}

/// One logical message exchange, assembled from messaging phase lines
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MessageExchangeRecord {
    /// Inbound message handled in the receive path (`tscHandleMsgDirectly`)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub handle_directly: Option<MsgEvent>,

    /// Inbound message delivered to a worker (`deliverMessage`)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deliver: Option<MsgEvent>,

    /// Reply sent back for an inbound message (`tscSendReply`)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub send_reply: Option<ReplyEvent>,

    /// Outbound message routed to a peer (`sendMessage`)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub send: Option<SendEvent>,

    /// Outbound send-call confirmation (`tscSend`)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub send_confirm: Option<SendConfirmEvent>,
}

/// Receive-side messaging event (handle-directly or deliver)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MsgEvent {
    pub trace_time: f64,
    pub pid: String,
    pub msg: String,
    pub msg_id: String,
    pub len: String,
    pub node_id: String,
    pub node_ip: String,
}

/// Reply to an inbound message
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReplyEvent {
    pub trace_time: f64,
    pub pid: String,
    pub msg: String,
    pub msg_id: String,
    pub reply_len: String,
}

/// Outbound message with peer routing information
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SendEvent {
    pub trace_time: f64,
    pub pid: String,
    pub node_id: String,
    pub node_ip: String,
    pub node_name: String,
    pub msg_id: String,
    pub msg_type: String,
    pub tag: String,
    pub seq: String,
    pub state: String,
}

/// Confirmation line for the low-level send call
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SendConfirmEvent {
    pub trace_time: f64,
    pub pid: String,
    pub msg: String,
    pub n_dest: String,
    pub data_len: String,
    pub msg_id: String,
    pub msg_buf: String,
    pub mr: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_io_record_get_or_insert() {
        let mut log = TraceLog::new();
        log.io_record("3:0x1000").queued = Some(QueuedIo::default());
        // Second access must return the same record, not a fresh one
        assert!(log.io_record("3:0x1000").queued.is_some());
        assert_eq!(log.io.len(), 1);
    }

    #[test]
    fn test_node_table_first_writer_wins() {
        let mut log = TraceLog::new();
        log.note_node("10.0.0.1", "nsd01");
        log.note_node("10.0.0.1", "nsd01-renamed");
        assert_eq!(log.nodes["10.0.0.1"], "nsd01");
    }

    #[test]
    fn test_completeness_requires_finished_phase() {
        let mut rec = IoOperationRecord::default();
        rec.queued = Some(QueuedIo::default());
        rec.started = Some(StartedIo::default());
        assert!(!rec.is_complete());
        rec.finished = Some(FinishedIo::default());
        assert!(rec.is_complete());
    }
}
