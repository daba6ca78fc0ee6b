//! DiskBuf CLI
//!
//! Command-line tools for rotating disk buffers.
//!
//! # Commands
//!
//! - `write` - Buffer stdin lines into rotating segments
//! - `inspect` - List the segments derived from a base path

mod commands;

use clap::{Parser, Subcommand};
use commands::Format;
use diskbuf_core::Config;
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

/// DiskBuf command-line tools.
#[derive(Parser)]
#[command(name = "diskbuf")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Increase log verbosity (repeat up to three times)
    #[arg(global = true, short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Buffer stdin lines and print a descriptor for each closed segment
    Write {
        /// Base path for segment files
        #[arg(short, long)]
        path: PathBuf,

        /// Rotate after this many writes (0 disables)
        #[arg(long, default_value = "0")]
        flush_writes: u64,

        /// Rotate once this many bytes are written (0 disables)
        #[arg(long, default_value = "0")]
        flush_bytes: u64,

        /// Rotate non-empty segments on this period (0 disables)
        #[arg(long, default_value = "0")]
        flush_interval_ms: u64,

        /// Write buffer size in bytes (0 writes straight through)
        #[arg(long, default_value = "0")]
        buffer_size: usize,

        /// Output format
        #[arg(short, long, value_enum, default_value = "text")]
        format: Format,
    },

    /// List the segments derived from a base path
    Inspect {
        /// Base path the segments were written under
        #[arg(short, long)]
        path: PathBuf,

        /// Output format
        #[arg(short, long, value_enum, default_value = "text")]
        format: Format,
    },

    /// Show version information
    Version,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(match cli.verbose {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        })
    });
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Write {
            path,
            flush_writes,
            flush_bytes,
            flush_interval_ms,
            buffer_size,
            format,
        } => {
            let config = Config::new()
                .flush_writes(flush_writes)
                .flush_bytes(flush_bytes)
                .flush_interval(Duration::from_millis(flush_interval_ms))
                .buffer_size(buffer_size)
                .verbosity(cli.verbose);
            let summary = commands::write::run(&path, config, format)?;
            tracing::info!(
                lines = summary.lines,
                segments = summary.segments,
                "input exhausted"
            );
        }
        Commands::Inspect { path, format } => {
            commands::inspect::run(&path, format)?;
        }
        Commands::Version => {
            println!("DiskBuf CLI v{}", env!("CARGO_PKG_VERSION"));
            println!("DiskBuf Core v{}", diskbuf_core::VERSION);
        }
    }

    Ok(())
}
