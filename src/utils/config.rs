//! Configuration and constants for the trace analyzer.

/// Bytes per disk sector; I/O sizes are reported by the kernel in sectors
pub const SECTOR_SIZE: u64 = 512;

/// Number of preamble lines before data lines begin.
/// Lines 1 and 2 carry the start/stop wall-clock dates, the rest are
/// column legends and are skipped unconditionally.
pub const PREAMBLE_LINES: usize = 8;

// Disk role classification: disks averaging >= 1 MiB per I/O are assumed
// to hold data, smaller averages indicate metadata disks.
pub const DATA_DISK_SIZE_THRESHOLD: f64 = 1024.0 * 1024.0;

/// An outlier disk exceeds its role's mean average service time by more
/// than this many population standard deviations
pub const OUTLIER_SIGMA: f64 = 1.0;
