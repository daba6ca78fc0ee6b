//! # DiskBuf Testkit
//!
//! Test utilities for DiskBuf.
//!
//! This crate provides:
//! - Buffer fixtures with a consumer already attached
//! - A [`Collector`] that drains a handoff queue on its own thread
//! - Concurrent stress helpers
//! - Property-based test generators using proptest
//!
//! ## Usage
//!
//! ```rust
//! use diskbuf_core::Config;
//! use diskbuf_testkit::prelude::*;
//!
//! let test = TestBuffer::file(Config::new().flush_writes(1));
//! test.write(b"record").unwrap();
//! let (flushes, _dir) = test.finish();
//! assert_eq!(flushes.len(), 1);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod collector;
pub mod fixtures;
pub mod generators;
pub mod stress;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::collector::*;
    pub use crate::fixtures::*;
    pub use crate::generators::*;
    pub use crate::stress::*;
}

pub use collector::*;
pub use fixtures::*;
pub use generators::*;
pub use stress::*;
