//! # DiskBuf Core
//!
//! A 1:N on-disk write buffer. Writes accumulate in a segment file that is
//! rotated by write count, byte count or time; every finished segment is
//! renamed with a `.closed` suffix and announced to consumers as a
//! [`Flush`] descriptor on a handoff queue.
//!
//! This crate provides:
//! - [`Buffer`], the thread-safe writer with its rotation engine
//! - [`Config`] and the pure [`policy`] deciding when to rotate
//! - [`handoff`] queues carrying descriptors to consumers
//! - [`ProcessContext`] and [`SegmentName`] for unique segment names
//!
//! ## Invariants
//!
//! - A consumer only ever sees `.closed` files that are complete and
//!   released
//! - Descriptors from one buffer arrive in the order segments closed
//! - Segment names are never reused within a process context
//! - A failed rotation faults the buffer; nothing is retried

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod buffer;
mod config;
mod error;
mod flush;
pub mod handoff;
mod identity;
mod logging;
pub mod policy;
mod rotation;
mod scheduler;
mod state;

pub use buffer::{Buffer, BufferBuilder};
pub use config::Config;
pub use error::{BufferError, BufferResult, RotationStage};
pub use flush::{Flush, Reason};
pub use handoff::{FlushReceiver, FlushSender};
pub use identity::{ProcessContext, SegmentName, CLOSED_SUFFIX};
pub use policy::{Counters, Thresholds, Trigger};
pub use state::Status;

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
