//! # DiskBuf Storage
//!
//! Segment storage trait and implementations for DiskBuf.
//!
//! This crate provides the lowest-level storage abstraction for DiskBuf.
//! Stores deal in **whole segment files**: they create them, hand out a
//! writable handle, rename and remove them. They know nothing about
//! flush policies, counters or descriptors.
//!
//! ## Design Principles
//!
//! - A store is a flat namespace of paths (create, rename, remove, list)
//! - Handles are plain [`std::io::Write`] sinks plus an explicit close
//! - Must be `Send + Sync` so a buffer and its timer thread can share it
//! - DiskBuf owns all naming and rotation decisions
//!
//! ## Available Stores
//!
//! - [`FileStore`] - Segments as OS files
//! - [`InMemoryStore`] - For testing, with fault injection
//!
//! ## Example
//!
//! ```rust
//! use diskbuf_storage::{InMemoryStore, SegmentStore};
//! use std::io::Write;
//! use std::path::Path;
//!
//! let store = InMemoryStore::new();
//! let mut file = store.create(Path::new("/logs/app.1")).unwrap();
//! file.write_all(b"hello").unwrap();
//! file.close().unwrap();
//!
//! store.rename(Path::new("/logs/app.1"), Path::new("/logs/app.1.closed")).unwrap();
//! assert_eq!(store.contents(Path::new("/logs/app.1.closed")).unwrap(), b"hello");
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod error;
mod file;
mod memory;
mod store;

pub use error::{StorageError, StorageResult};
pub use file::{FileSegment, FileStore};
pub use memory::{Fault, InMemoryStore, MemorySegment};
pub use store::{SegmentFile, SegmentStore};
