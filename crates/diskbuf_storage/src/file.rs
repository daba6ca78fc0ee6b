//! File-based segment store.

use crate::error::{StorageError, StorageResult};
use crate::store::{is_derived_from, SegmentFile, SegmentStore};
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

/// A segment store backed by OS files.
///
/// # Durability
///
/// Closing a segment flushes it to the OS but never calls `sync_all`.
/// Data is as durable as the file system makes it.
///
/// # Example
///
/// ```no_run
/// use diskbuf_storage::{FileStore, SegmentStore};
/// use std::io::Write;
/// use std::path::Path;
///
/// let store = FileStore::new();
/// let mut segment = store.create(Path::new("/var/spool/app.1")).unwrap();
/// segment.write_all(b"record\n").unwrap();
/// segment.close().unwrap();
/// ```
#[derive(Debug, Default, Clone, Copy)]
pub struct FileStore;

impl FileStore {
    /// Creates a file store.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl SegmentStore for FileStore {
    fn create(&self, path: &Path) -> StorageResult<Box<dyn SegmentFile>> {
        let file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(path)
            .map_err(|e| StorageError::from_io(e, path))?;

        Ok(Box::new(FileSegment {
            path: path.to_path_buf(),
            file,
        }))
    }

    fn rename(&self, from: &Path, to: &Path) -> StorageResult<()> {
        fs::rename(from, to).map_err(|e| StorageError::from_io(e, from))
    }

    fn remove(&self, path: &Path) -> StorageResult<()> {
        fs::remove_file(path).map_err(|e| StorageError::from_io(e, path))
    }

    fn exists(&self, path: &Path) -> bool {
        path.is_file()
    }

    fn list(&self, base: &Path) -> StorageResult<Vec<PathBuf>> {
        let dir = match base.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };

        let mut paths = Vec::new();
        for entry in fs::read_dir(dir).map_err(|e| StorageError::from_io(e, dir))? {
            let entry = entry?;
            if !entry.file_type()?.is_file() {
                continue;
            }
            let candidate = base.with_file_name(entry.file_name());
            if is_derived_from(base, &candidate) {
                paths.push(candidate);
            }
        }
        paths.sort();
        Ok(paths)
    }
}

/// An open segment file.
#[derive(Debug)]
pub struct FileSegment {
    path: PathBuf,
    file: File,
}

impl FileSegment {
    /// Returns the path the segment was created at.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Write for FileSegment {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.file.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.file.flush()
    }
}

impl SegmentFile for FileSegment {
    fn close(mut self: Box<Self>) -> StorageResult<()> {
        self.file.flush()?;
        Ok(())
    }
}
