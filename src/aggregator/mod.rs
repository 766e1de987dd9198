//! Aggregation of correlated trace records into summary statistics.
//!
//! This module transforms the correlated TraceLog into:
//! - Per-disk I/O statistics with role-based outlier detection
//! - Per-message-type sent/received counts with peer attribution

pub mod disk_stats;
pub mod msg_stats;

// Re-export main types and functions
pub use disk_stats::{
    assemble_disk_stats, detect_outliers, DiskBucket, DiskRole, DiskStats, DiskStatsReport,
    OutlierDisk,
};
pub use msg_stats::{assemble_msg_stats, MessageStats};
