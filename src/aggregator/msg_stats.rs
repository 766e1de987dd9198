//! Per-message-type counts for the messaging category.
//!
//! Produces two views over the correlated exchanges: messages received
//! from peers (handle-directly and deliver events) and messages sent to
//! peers (send confirmations paired with their routed send event). The
//! peer lists keep one entry per occurrence, so counts fall out of the
//! list lengths.

use crate::parser::schema::TraceLog;
use log::{info, warn};
use std::collections::HashMap;

/// Sent/received peer occurrence lists keyed by message type name
#[derive(Debug, Clone, Default)]
pub struct MessageStats {
    /// message name -> peer ip per received occurrence
    pub received: HashMap<String, Vec<String>>,

    /// message name -> peer ip per sent occurrence
    pub sent: HashMap<String, Vec<String>>,
}

impl MessageStats {
    pub fn received_count(&self, msg: &str) -> usize {
        self.received.get(msg).map_or(0, Vec::len)
    }

    pub fn sent_count(&self, msg: &str) -> usize {
        self.sent.get(msg).map_or(0, Vec::len)
    }
}

/// Single pass over all message-exchange records.
///
/// Correlation is best-effort: log rotation can drop phase lines
/// mid-exchange, so a record missing its expected pairing is skipped with
/// a warning rather than failing the pass.
pub fn assemble_msg_stats(log: &TraceLog) -> MessageStats {
    let mut stats = MessageStats::default();

    for (key, rec) in &log.messaging {
        if let Some(event) = rec.handle_directly.as_ref().or(rec.deliver.as_ref()) {
            stats
                .received
                .entry(event.msg.clone())
                .or_default()
                .push(event.node_ip.clone());
        }

        if rec.send_confirm.is_some() {
            // The confirmation line itself carries no peer; the name and
            // peer resolve from the routed send (preferred) or the reply.
            if let Some(send) = rec.send.as_ref() {
                let name = rec
                    .send_confirm
                    .as_ref()
                    .map(|sc| sc.msg.clone())
                    .unwrap_or_default();
                stats
                    .sent
                    .entry(name)
                    .or_default()
                    .push(send.node_ip.clone());
            } else if let Some(reply) = rec.send_reply.as_ref() {
                // Name is still resolvable; the peer ip is not
                stats
                    .sent
                    .entry(reply.msg.clone())
                    .or_default()
                    .push("unknown".to_string());
            } else {
                warn!("exchange {} has a send confirmation but no paired send, skipping", key);
            }
        }
    }

    info!(
        "messaging stats: {} received message types, {} sent message types",
        stats.received.len(),
        stats.sent.len()
    );
    stats
}
