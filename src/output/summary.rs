//! Human-readable summary of the finished aggregates.
//!
//! Pure presentation: consumes the aggregation results and the node table
//! and writes formatted text. No state is mutated here.

use crate::aggregator::disk_stats::{DiskRole, DiskStatsReport};
use crate::aggregator::msg_stats::MessageStats;
use crate::parser::schema::{TraceHeader, TraceLog};
use std::collections::BTreeMap;
use std::io::{self, Write};

/// Write the per-disk summary, outlier list, and grand totals
pub fn write_disk_summary(
    out: &mut impl Write,
    header: &TraceHeader,
    report: &DiskStatsReport,
) -> io::Result<()> {
    let mut total_bytes: u64 = 0;
    let mut total_iops: u64 = 0;

    for (disk, bucket) in &report.disks {
        let s = &bucket.stats;
        writeln!(
            out,
            "Disk: {}, IOPS: {}, Avg_IO_T: {:.6}, Avg_IO_Sz: {:.0}, Longest_IO: {:.6}, \
             Total_Bytes: {}, Total_IO_Time: {:.6}",
            disk, s.num_iops, s.avg_io_tm, s.avg_io_sz, s.longest_io, s.total_bytes_io,
            s.total_time_io
        )?;
        total_bytes += s.total_bytes_io;
        total_iops += s.num_iops;
    }

    if !report.outliers.is_empty() {
        writeln!(out)?;
        writeln!(out, "Outlier disks (> 1 sigma above role mean):")?;
        for o in &report.outliers {
            let role = match o.role {
                DiskRole::Data => "data",
                DiskRole::Metadata => "metadata",
            };
            writeln!(
                out,
                "  Disk {} ({}): avg {:.6}s vs role mean {:.6}s (sigma {:.6})",
                o.disk, role, o.avg_io_tm, o.role_mean, o.role_stddev
            )?;
        }
    }

    let elapsed = header.elapsed_secs();
    writeln!(out)?;
    writeln!(out, "Totals: {} IOPS, {} bytes over {}s wall time", total_iops, total_bytes, elapsed)?;
    if elapsed > 0 {
        writeln!(
            out,
            "Aggregate throughput: {:.2} MB/s",
            total_bytes as f64 / elapsed as f64 / (1024.0 * 1024.0)
        )?;
    }
    Ok(())
}

/// Write per-message-type sent/received counts with peer attribution
pub fn write_msg_summary(
    out: &mut impl Write,
    log: &TraceLog,
    stats: &MessageStats,
) -> io::Result<()> {
    writeln!(out, "Messages received:")?;
    for (msg, peers) in sorted(&stats.received) {
        writeln!(out, "  {}: {} (from {})", msg, peers.len(), attribute(peers, log))?;
    }

    writeln!(out, "Messages sent:")?;
    for (msg, peers) in sorted(&stats.sent) {
        writeln!(out, "  {}: {} (to {})", msg, peers.len(), attribute(peers, log))?;
    }
    Ok(())
}

/// Stable output order for hash-backed maps
fn sorted<'a>(map: &'a std::collections::HashMap<String, Vec<String>>) -> BTreeMap<&'a str, &'a Vec<String>> {
    map.iter().map(|(k, v)| (k.as_str(), v)).collect()
}

/// Render a peer list, deduplicated, resolving ips through the node table
fn attribute(peers: &[String], log: &TraceLog) -> String {
    let mut named: Vec<String> = peers
        .iter()
        .map(|ip| match log.nodes.get(ip) {
            Some(host) => format!("{} ({})", host, ip),
            None => ip.clone(),
        })
        .collect();
    named.sort();
    named.dedup();
    named.join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregator::disk_stats::{DiskBucket, DiskStatsReport};

    fn report_with_one_disk() -> DiskStatsReport {
        let mut report = DiskStatsReport::default();
        let mut bucket = DiskBucket::default();
        bucket.stats.num_iops = 2;
        bucket.stats.timed_iops = 2;
        bucket.stats.total_bytes_io = 8192;
        bucket.stats.avg_io_sz = 4096.0;
        bucket.stats.avg_io_tm = 0.25;
        bucket.stats.longest_io = 0.4;
        report.disks.insert(3, bucket);
        report
    }

    #[test]
    fn test_disk_summary_contains_totals() {
        let header = TraceHeader {
            trace_start_epoch: 1000,
            trace_stop_epoch: 1004,
        };
        let mut buf = Vec::new();
        write_disk_summary(&mut buf, &header, &report_with_one_disk()).unwrap();
        let text = String::from_utf8(buf).unwrap();

        assert!(text.contains("Disk: 3, IOPS: 2"));
        assert!(text.contains("Totals: 2 IOPS, 8192 bytes over 4s wall time"));
        assert!(text.contains("Aggregate throughput:"));
    }

    #[test]
    fn test_msg_summary_resolves_hostnames() {
        let mut log = TraceLog::new();
        log.note_node("10.0.0.7", "nsd07");
        let mut stats = MessageStats::default();
        stats
            .received
            .entry("nsdMsgReadExt".to_string())
            .or_default()
            .push("10.0.0.7".to_string());

        let mut buf = Vec::new();
        write_msg_summary(&mut buf, &log, &stats).unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert!(text.contains("nsdMsgReadExt: 1 (from nsd07 (10.0.0.7))"));
    }
}
