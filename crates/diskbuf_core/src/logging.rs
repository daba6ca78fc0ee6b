//! Verbosity-gated log events.
//!
//! Buffer events carry a verbosity level: 1 for segment open and flush,
//! 2 for the individual rotation steps, 3 for every write. An event is
//! emitted only when the buffer's configured verbosity reaches its level,
//! and then at `info`, `debug` or `trace` respectively.

macro_rules! vlog {
    ($verbosity:expr, 1, $($arg:tt)+) => {
        if $verbosity >= 1 {
            ::tracing::info!($($arg)+)
        }
    };
    ($verbosity:expr, 2, $($arg:tt)+) => {
        if $verbosity >= 2 {
            ::tracing::debug!($($arg)+)
        }
    };
    ($verbosity:expr, 3, $($arg:tt)+) => {
        if $verbosity >= 3 {
            ::tracing::trace!($($arg)+)
        }
    };
}

pub(crate) use vlog;
