//! Per-disk I/O statistics and outlier detection.
//!
//! Walks the correlated I/O records once, bucketing completed operations
//! by disk number, then computes per-disk totals and averages plus a
//! population-level outlier pass split by disk role.

use crate::parser::schema::TraceLog;
use crate::utils::config::{DATA_DISK_SIZE_THRESHOLD, OUTLIER_SIGMA, SECTOR_SIZE};
use log::{debug, info, warn};
use std::collections::BTreeMap;

/// Aggregate statistics container for one disk
#[derive(Debug, Clone, Default)]
pub struct DiskBucket {
    /// Observed I/O sizes in bytes, one entry per completed operation
    pub io_sizes: Vec<u64>,

    /// Observed service times; only operations with both started and
    /// finished phases contribute, so this can be shorter than io_sizes
    pub service_times: Vec<f64>,

    pub stats: DiskStats,
}

/// Computed summary for one disk
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DiskStats {
    pub num_iops: u64,
    /// Count over the timed subset; may be smaller than num_iops
    pub timed_iops: u64,
    pub total_bytes_io: u64,
    pub total_time_io: f64,
    pub avg_io_sz: f64,
    pub avg_io_tm: f64,
    pub longest_io: f64,
    /// Raw phase lines of the longest operation, for diagnostic replay
    pub longest_io_ref: String,
}

/// Disk role inferred from average transfer size
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiskRole {
    Data,
    Metadata,
}

/// A disk whose average service time stands out from its role population
#[derive(Debug, Clone)]
pub struct OutlierDisk {
    pub disk: u32,
    pub role: DiskRole,
    pub avg_io_tm: f64,
    pub role_mean: f64,
    pub role_stddev: f64,
}

/// Result of the disk aggregation pass
#[derive(Debug, Clone, Default)]
pub struct DiskStatsReport {
    pub disks: BTreeMap<u32, DiskBucket>,
    pub outliers: Vec<OutlierDisk>,
}

/// Aggregate all completed I/O records into per-disk buckets.
///
/// Augments each record with its derived fields (size, service time,
/// queue time, absolute times) as a side effect; the derivation is
/// idempotent, so re-running over a reloaded dump produces identical
/// stats. Records without a finished phase cannot be sized and are
/// skipped; records missing queued/started simply contribute no timing.
pub fn assemble_disk_stats(log: &mut TraceLog) -> DiskStatsReport {
    let epoch = log.header.trace_start_epoch as f64;
    let mut disks: BTreeMap<u32, DiskBucket> = BTreeMap::new();

    for (key, rec) in log.io.iter_mut() {
        let Some(fio) = rec.finished.as_ref() else {
            debug!("io record {} has no finished phase, not counted", key);
            continue;
        };
        let disk = fio.disk_num;
        let io_size = fio.n_sectors * SECTOR_SIZE;
        rec.io_size = Some(io_size);

        let bucket = disks.entry(disk).or_default();
        bucket.io_sizes.push(io_size);
        bucket.stats.num_iops += 1;

        if let Some(sio) = rec.started.as_mut() {
            let service_time = fio.trace_time - sio.trace_time;
            rec.service_time = Some(service_time);
            bucket.service_times.push(service_time);

            // Longest observed service time, with the contributing lines
            if service_time > bucket.stats.longest_io || bucket.stats.timed_iops == 0 {
                bucket.stats.longest_io = service_time;
                let qline = rec.queued.as_ref().map(|q| q.line.as_str()).unwrap_or("");
                bucket.stats.longest_io_ref =
                    format!("{}\n{}\n{}", qline, sio.line, fio.line);
            }
            bucket.stats.timed_iops += 1;

            if let Some(qio) = rec.queued.as_mut() {
                rec.queue_time = Some(sio.trace_time - qio.trace_time);
                qio.queued_time = Some(epoch + qio.trace_time);
                sio.start_time = Some(epoch + sio.trace_time);
            }
        }
    }

    for (disk, bucket) in disks.iter_mut() {
        let stats = &mut bucket.stats;
        stats.total_bytes_io = bucket.io_sizes.iter().sum();
        stats.avg_io_sz = stats.total_bytes_io as f64 / stats.num_iops as f64;
        stats.total_time_io = bucket.service_times.iter().sum();

        if stats.timed_iops == 0 {
            // Sizes and IOPS are still valid; only the timing averages
            // are undefined for this disk.
            warn!("disk {}: no timed samples, skipping service-time average", disk);
            continue;
        }
        stats.avg_io_tm = stats.total_time_io / stats.timed_iops as f64;
    }

    let outliers = detect_outliers(&disks);
    info!(
        "aggregated {} disks, {} outliers flagged",
        disks.len(),
        outliers.len()
    );

    DiskStatsReport { disks, outliers }
}

/// Flag disks whose average service time exceeds their role population's
/// mean by more than `OUTLIER_SIGMA` standard deviations.
///
/// Disks are partitioned into data vs. metadata roles by average transfer
/// size before comparison, since the two populations have very different
/// baseline latencies. Disks without timed samples are left out entirely.
pub fn detect_outliers(disks: &BTreeMap<u32, DiskBucket>) -> Vec<OutlierDisk> {
    let mut outliers = Vec::new();
    for role in [DiskRole::Data, DiskRole::Metadata] {
        let population: Vec<(u32, f64)> = disks
            .iter()
            .filter(|(_, b)| b.stats.timed_iops > 0 && role_of(&b.stats) == role)
            .map(|(disk, b)| (*disk, b.stats.avg_io_tm))
            .collect();
        if population.is_empty() {
            continue;
        }

        let times: Vec<f64> = population.iter().map(|(_, t)| *t).collect();
        let mean = times.iter().sum::<f64>() / times.len() as f64;
        let stddev = population_stddev(&times, mean);

        for (disk, avg_io_tm) in population {
            if avg_io_tm > mean + OUTLIER_SIGMA * stddev {
                outliers.push(OutlierDisk {
                    disk,
                    role,
                    avg_io_tm,
                    role_mean: mean,
                    role_stddev: stddev,
                });
            }
        }
    }
    outliers
}

/// Role classification for one disk's finished stats
pub fn role_of(stats: &DiskStats) -> DiskRole {
    if stats.avg_io_sz >= DATA_DISK_SIZE_THRESHOLD {
        DiskRole::Data
    } else {
        DiskRole::Metadata
    }
}

/// Population (not sample) standard deviation
fn population_stddev(values: &[f64], mean: f64) -> f64 {
    let variance =
        values.iter().map(|v| (v - mean) * (v - mean)).sum::<f64>() / values.len() as f64;
    variance.sqrt()
}
