//! In-memory segment store for testing.

use crate::error::{StorageError, StorageResult};
use crate::store::{is_derived_from, SegmentFile, SegmentStore};
use parking_lot::{Mutex, RwLock};
use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// A failure the in-memory store can be told to produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Fault {
    /// `create` fails.
    Create,
    /// `rename` fails.
    Rename,
    /// Flushing or closing a segment fails.
    Flush,
    /// `remove` fails.
    Remove,
}

impl Fault {
    const fn name(self) -> &'static str {
        match self {
            Fault::Create => "create",
            Fault::Rename => "rename",
            Fault::Flush => "flush",
            Fault::Remove => "remove",
        }
    }
}

impl fmt::Display for Fault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Default)]
struct MemoryFile {
    data: RwLock<Vec<u8>>,
    open: AtomicBool,
}

#[derive(Debug, Default)]
struct Inner {
    files: RwLock<BTreeMap<PathBuf, Arc<MemoryFile>>>,
    faults: RwLock<HashSet<Fault>>,
    /// Bytes still accepted across all segments, `None` for no limit.
    write_budget: Mutex<Option<usize>>,
}

impl Inner {
    fn check(&self, fault: Fault) -> StorageResult<()> {
        if self.faults.read().contains(&fault) {
            return Err(StorageError::Injected(fault.name()));
        }
        Ok(())
    }
}

/// An in-memory segment store.
///
/// Files live in a shared map and are retained after their handles are
/// closed, so tests can inspect what a buffer produced. Clones share the
/// same files.
///
/// Faults can be injected with [`InMemoryStore::inject`] and a write
/// budget set with [`InMemoryStore::limit_writes`] to force partial
/// writes.
///
/// # Example
///
/// ```rust
/// use diskbuf_storage::{Fault, InMemoryStore, SegmentStore, StorageError};
/// use std::path::Path;
///
/// let store = InMemoryStore::new();
/// store.inject(Fault::Create);
/// let result = store.create(Path::new("seg.1"));
/// assert!(matches!(result, Err(StorageError::Injected("create"))));
/// ```
#[derive(Debug, Default, Clone)]
pub struct InMemoryStore {
    inner: Arc<Inner>,
}

impl InMemoryStore {
    /// Creates an empty in-memory store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every later operation of the given kind fail.
    pub fn inject(&self, fault: Fault) {
        self.inner.faults.write().insert(fault);
    }

    /// Stops injecting the given fault.
    pub fn heal(&self, fault: Fault) {
        self.inner.faults.write().remove(&fault);
    }

    /// Limits the total number of bytes all segments accept from now on.
    ///
    /// A write that straddles the limit is accepted partially; once the
    /// budget is spent writes fail.
    pub fn limit_writes(&self, bytes: usize) {
        *self.inner.write_budget.lock() = Some(bytes);
    }

    /// Returns a copy of the file at `path`.
    #[must_use]
    pub fn contents(&self, path: &Path) -> Option<Vec<u8>> {
        self.inner.files.read().get(path).map(|f| f.data.read().clone())
    }

    /// Returns whether a handle to the file at `path` is still open.
    #[must_use]
    pub fn is_open(&self, path: &Path) -> bool {
        self.inner
            .files
            .read()
            .get(path)
            .is_some_and(|f| f.open.load(Ordering::Acquire))
    }

    /// Returns every path in the store, in lexical order.
    #[must_use]
    pub fn paths(&self) -> Vec<PathBuf> {
        self.inner.files.read().keys().cloned().collect()
    }
}

impl SegmentStore for InMemoryStore {
    fn create(&self, path: &Path) -> StorageResult<Box<dyn SegmentFile>> {
        self.inner.check(Fault::Create)?;

        let mut files = self.inner.files.write();
        if files.contains_key(path) {
            return Err(StorageError::AlreadyExists {
                path: path.to_path_buf(),
            });
        }

        let file = Arc::new(MemoryFile::default());
        file.open.store(true, Ordering::Release);
        files.insert(path.to_path_buf(), Arc::clone(&file));

        Ok(Box::new(MemorySegment {
            file,
            inner: Arc::clone(&self.inner),
        }))
    }

    fn rename(&self, from: &Path, to: &Path) -> StorageResult<()> {
        self.inner.check(Fault::Rename)?;

        let mut files = self.inner.files.write();
        let file = files.remove(from).ok_or_else(|| StorageError::NotFound {
            path: from.to_path_buf(),
        })?;
        files.insert(to.to_path_buf(), file);
        Ok(())
    }

    fn remove(&self, path: &Path) -> StorageResult<()> {
        self.inner.check(Fault::Remove)?;

        self.inner
            .files
            .write()
            .remove(path)
            .map(|_| ())
            .ok_or_else(|| StorageError::NotFound {
                path: path.to_path_buf(),
            })
    }

    fn exists(&self, path: &Path) -> bool {
        self.inner.files.read().contains_key(path)
    }

    fn list(&self, base: &Path) -> StorageResult<Vec<PathBuf>> {
        Ok(self
            .inner
            .files
            .read()
            .keys()
            .filter(|p| is_derived_from(base, p))
            .cloned()
            .collect())
    }
}

/// An open in-memory segment.
///
/// Writes land in the file the handle was created for, even after that
/// file has been renamed.
pub struct MemorySegment {
    file: Arc<MemoryFile>,
    inner: Arc<Inner>,
}

impl fmt::Debug for MemorySegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemorySegment")
            .field("len", &self.file.data.read().len())
            .finish()
    }
}

impl Write for MemorySegment {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut budget = self.inner.write_budget.lock();
        let accepted = match *budget {
            Some(0) if !buf.is_empty() => {
                return Err(io::Error::other("injected write fault"));
            }
            Some(ref mut remaining) => {
                let n = buf.len().min(*remaining);
                *remaining -= n;
                n
            }
            None => buf.len(),
        };

        self.file.data.write().extend_from_slice(&buf[..accepted]);
        Ok(accepted)
    }

    fn flush(&mut self) -> io::Result<()> {
        if self.inner.faults.read().contains(&Fault::Flush) {
            return Err(io::Error::other("injected flush fault"));
        }
        Ok(())
    }
}

impl SegmentFile for MemorySegment {
    fn close(mut self: Box<Self>) -> StorageResult<()> {
        self.inner.check(Fault::Flush)?;
        self.flush()?;
        Ok(())
    }
}

impl Drop for MemorySegment {
    fn drop(&mut self) {
        self.file.open.store(false, Ordering::Release);
    }
}
