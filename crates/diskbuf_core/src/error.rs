//! Error types for DiskBuf core.

use std::fmt;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Result type for buffer operations.
pub type BufferResult<T> = Result<T, BufferError>;

/// The step of the rotation sequence that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RotationStage {
    /// Draining the internal write buffer into the segment.
    Flush,
    /// Renaming the segment to its closed name.
    Rename,
    /// Releasing the segment handle.
    Close,
    /// Removing an empty segment at shutdown.
    Remove,
}

impl fmt::Display for RotationStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            RotationStage::Flush => "flush",
            RotationStage::Rename => "rename",
            RotationStage::Close => "close",
            RotationStage::Remove => "remove",
        })
    }
}

/// Errors that can occur in buffer operations.
#[derive(Debug, Error)]
pub enum BufferError {
    /// The configuration is unusable.
    #[error("invalid configuration: {message}")]
    Config {
        /// Description of the problem.
        message: String,
    },

    /// A new segment could not be created.
    #[error("failed to create segment {}: {source}", path.display())]
    SegmentCreate {
        /// The segment that could not be created.
        path: PathBuf,
        /// The storage failure.
        source: diskbuf_storage::StorageError,
    },

    /// The active segment rejected a write.
    ///
    /// `written` bytes of the input reached the segment before the failure.
    #[error("write failed after {written} bytes: {source}")]
    Write {
        /// Bytes accepted before the failure.
        written: usize,
        /// The underlying failure.
        source: io::Error,
    },

    /// A step of the rotation sequence failed.
    #[error("rotation failed at {stage} of {}: {source}", path.display())]
    Rotation {
        /// The failing step.
        stage: RotationStage,
        /// The segment being rotated.
        path: PathBuf,
        /// The storage failure.
        source: diskbuf_storage::StorageError,
    },

    /// The write was accepted but the rotation it triggered failed.
    ///
    /// `written` bytes reached the segment; `source` is the rotation
    /// failure.
    #[error("{written} bytes written, then {source}")]
    Rotated {
        /// Bytes accepted by the write.
        written: usize,
        /// The rotation failure.
        source: Box<BufferError>,
    },

    /// The consumer side of the handoff queue is gone.
    ///
    /// The segment was closed and renamed but nobody received its descriptor.
    #[error("handoff queue disconnected, {} was not delivered", path.display())]
    HandoffClosed {
        /// The closed segment whose descriptor was dropped.
        path: PathBuf,
    },

    /// The interval scheduler thread could not be started.
    #[error("failed to start interval scheduler: {0}")]
    Scheduler(#[source] io::Error),

    /// A previous rotation failed; the buffer has no active segment.
    #[error("buffer is faulted by an earlier rotation failure")]
    Faulted,

    /// The buffer has been closed.
    #[error("buffer is closed")]
    Closed,
}

impl BufferError {
    /// Creates a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Creates a rotation error.
    pub fn rotation(
        stage: RotationStage,
        path: impl Into<PathBuf>,
        source: impl Into<diskbuf_storage::StorageError>,
    ) -> Self {
        Self::Rotation {
            stage,
            path: path.into(),
            source: source.into(),
        }
    }

    /// Returns true if the buffer can no longer be used after this error.
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        match self {
            Self::Rotated { source, .. } => source.is_fatal(),
            _ => matches!(
                self,
                Self::SegmentCreate { .. } | Self::Rotation { .. } | Self::Faulted | Self::Closed
            ),
        }
    }

    /// Bytes of the failed call that reached the segment anyway.
    #[must_use]
    pub fn written(&self) -> usize {
        match self {
            Self::Write { written, .. } | Self::Rotated { written, .. } => *written,
            _ => 0,
        }
    }

    /// The error underneath a [`BufferError::Rotated`] wrapper, or `self`.
    #[must_use]
    pub fn cause(&self) -> &BufferError {
        match self {
            Self::Rotated { source, .. } => source.cause(),
            other => other,
        }
    }
}

impl From<BufferError> for io::Error {
    fn from(err: BufferError) -> Self {
        match err {
            BufferError::Write { source, .. } => source,
            BufferError::Rotated { source, .. } => io::Error::from(*source),
            BufferError::Config { .. } => io::Error::new(io::ErrorKind::InvalidInput, err),
            BufferError::HandoffClosed { .. } => io::Error::new(io::ErrorKind::BrokenPipe, err),
            other => io::Error::other(other),
        }
    }
}
