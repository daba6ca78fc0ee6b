//! Buffer configuration.

use crate::error::{BufferError, BufferResult};
use std::time::Duration;

/// Configuration for a [`crate::Buffer`].
///
/// Every flush trigger is disabled by its zero value, but at least one
/// must be enabled for [`Config::validate`] to pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Rotate after this many writes (0 = never).
    pub flush_writes: u64,

    /// Rotate once the segment holds this many bytes (0 = never).
    pub flush_bytes: u64,

    /// Rotate on this period (zero = never).
    pub flush_interval: Duration,

    /// Capacity of the in-process write buffer (0 = write-through).
    pub buffer_size: usize,

    /// How chatty the buffer's log events are, 0 (silent) to 3 (per write).
    pub verbosity: u8,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            flush_writes: 0,
            flush_bytes: 0,
            flush_interval: Duration::ZERO,
            buffer_size: 0,
            verbosity: 1,
        }
    }
}

impl Config {
    /// Creates a configuration with every trigger disabled.
    ///
    /// At least one trigger must be set before opening a buffer.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the write-count trigger.
    #[must_use]
    pub const fn flush_writes(mut self, writes: u64) -> Self {
        self.flush_writes = writes;
        self
    }

    /// Sets the byte-count trigger.
    #[must_use]
    pub const fn flush_bytes(mut self, bytes: u64) -> Self {
        self.flush_bytes = bytes;
        self
    }

    /// Sets the rotation period.
    #[must_use]
    pub const fn flush_interval(mut self, interval: Duration) -> Self {
        self.flush_interval = interval;
        self
    }

    /// Sets the in-process write buffer capacity.
    #[must_use]
    pub const fn buffer_size(mut self, size: usize) -> Self {
        self.buffer_size = size;
        self
    }

    /// Sets the log verbosity, clamped to 3.
    #[must_use]
    pub const fn verbosity(mut self, level: u8) -> Self {
        self.verbosity = if level > 3 { 3 } else { level };
        self
    }

    /// Checks that at least one flush trigger is enabled.
    ///
    /// # Errors
    ///
    /// Returns [`BufferError::Config`] when every trigger is zero.
    pub fn validate(&self) -> BufferResult<()> {
        if self.flush_writes == 0 && self.flush_bytes == 0 && self.flush_interval.is_zero() {
            return Err(BufferError::config(
                "at least one flush mechanism must be non-zero",
            ));
        }
        Ok(())
    }
}
