//! Fstrace Studio CLI
//!
//! Correlates distributed-filesystem kernel trace logs into per-operation
//! records and prints per-disk and per-message statistics.

use anyhow::Result;
use clap::{Parser, Subcommand};
use env_logger::Env;
use std::io::{self, Write};
use std::path::PathBuf;

use fstrace_studio::aggregator::{assemble_disk_stats, assemble_msg_stats};
use fstrace_studio::output::{read_tracelog, write_disk_summary, write_msg_summary, write_tracelog};
use fstrace_studio::parser::{parse_filters, KeyScheme, TraceCategory, TraceParser};

/// Fstrace Studio - trace-log correlation and statistics
#[derive(Parser, Debug)]
#[command(name = "fstrace")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

/// Available commands
#[derive(Subcommand, Debug)]
enum Commands {
    /// Parse a raw trace file and report statistics
    Analyze {
        /// Trace file to open (gzip or plain text)
        #[arg(short, long)]
        filename: PathBuf,

        /// Comma-separated category filters: io, messaging, rdma, byte-range-lock
        #[arg(long, default_value = "io")]
        filters: String,

        /// Correlation key scheme: disk-address or disk-address-pid
        #[arg(long, default_value = "disk-address")]
        key_scheme: String,

        /// Write the correlated records to a gzip-JSON dump
        #[arg(long)]
        tojson: Option<PathBuf>,

        /// Suppress the statistics summary on stdout
        #[arg(long)]
        quiet: bool,
    },

    /// Reload a previous gzip-JSON dump instead of parsing a raw trace
    Load {
        /// Path to a dump written by `analyze --tojson`
        #[arg(short, long)]
        traceinput: PathBuf,
    },

    /// Display version information
    Version,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(Env::default().default_filter_or(log_level)).init();

    match cli.command {
        Commands::Analyze {
            filename,
            filters,
            key_scheme,
            tojson,
            quiet,
        } => {
            // Configuration errors abort before any parsing
            let filters = parse_filters(&filters)?;
            let key_scheme: KeyScheme = key_scheme.parse()?;

            let parser = TraceParser::new(filters.clone(), key_scheme);
            let mut log = parser.parse_path(&filename)?;

            if let Some(path) = tojson {
                write_tracelog(&log, path)?;
            }

            if !quiet {
                report(&mut log, filters.contains(&TraceCategory::Messaging))?;
            }
        }

        Commands::Load { traceinput } => {
            let mut log = read_tracelog(&traceinput)?;
            let with_messaging = !log.messaging.is_empty();
            report(&mut log, with_messaging)?;
        }

        Commands::Version => {
            display_version();
        }
    }

    Ok(())
}

/// Run the aggregation passes and print the summaries
fn report(log: &mut fstrace_studio::parser::TraceLog, with_messaging: bool) -> Result<()> {
    let mut stdout = io::stdout().lock();

    let disk_report = assemble_disk_stats(log);
    write_disk_summary(&mut stdout, &log.header, &disk_report)?;

    if with_messaging {
        writeln!(stdout)?;
        let msg_stats = assemble_msg_stats(log);
        write_msg_summary(&mut stdout, log, &msg_stats)?;
    }
    Ok(())
}

/// Display version information
fn display_version() {
    println!("Fstrace Studio v{}", env!("CARGO_PKG_VERSION"));
    println!();
    println!("Correlation and statistics for distributed-filesystem trace logs.");
}
