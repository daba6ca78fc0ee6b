//! CLI command implementations.

pub mod inspect;
pub mod write;

use std::path::PathBuf;
use thiserror::Error;

/// Output format shared by the commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum Format {
    /// Human readable lines.
    Text,
    /// One JSON document per line.
    Json,
}

/// Errors raised by the commands.
#[derive(Debug, Error)]
pub enum CommandError {
    /// The buffer failed.
    #[error("buffer error: {0}")]
    Buffer(#[from] diskbuf_core::BufferError),

    /// Listing segments failed.
    #[error("storage error: {0}")]
    Storage(#[from] diskbuf_storage::StorageError),

    /// Reading input or writing output failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A descriptor could not be encoded.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// No segments exist for the base path.
    #[error("no segments found for {}", base.display())]
    NoSegments {
        /// The base path that was searched.
        base: PathBuf,
    },

    /// The descriptor printer thread panicked.
    #[error("descriptor printer panicked")]
    Printer,
}

/// Result alias for commands.
pub type CommandResult<T> = Result<T, CommandError>;
