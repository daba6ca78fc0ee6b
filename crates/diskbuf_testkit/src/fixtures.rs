//! Test fixtures and buffer helpers.
//!
//! Provides convenience types for opening buffers in temporary
//! directories with a consumer already attached.

use crate::collector::Collector;
use diskbuf_core::{Buffer, Config, Flush, ProcessContext, SegmentName};
use diskbuf_storage::{FileStore, InMemoryStore, SegmentStore};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;

/// A buffer with a [`Collector`] draining its internal queue.
pub struct TestBuffer {
    /// The buffer instance.
    pub buffer: Buffer,
    /// The consumer attached to the buffer's queue.
    pub collector: Collector,
    store: Arc<dyn SegmentStore>,
    /// The temporary directory (kept alive to prevent cleanup).
    dir: Option<TempDir>,
}

impl TestBuffer {
    /// Opens a file-backed buffer at `<tempdir>/buffer`.
    pub fn file(config: Config) -> Self {
        let dir = TempDir::new().expect("Failed to create temp directory");
        let base = dir.path().join("buffer");
        let ctx = Arc::new(ProcessContext::new());
        let mut test = Self::open(&ctx, base, config, Arc::new(FileStore::new()));
        test.dir = Some(dir);
        test
    }

    /// Opens a buffer on the given in-memory store.
    pub fn memory(config: Config, store: &InMemoryStore) -> Self {
        let ctx = Arc::new(ProcessContext::new());
        Self::open(&ctx, PathBuf::from("/mem/buffer"), config, Arc::new(store.clone()))
    }

    /// Opens a buffer at `base` within `ctx` on `store`.
    pub fn open(
        ctx: &Arc<ProcessContext>,
        base: PathBuf,
        config: Config,
        store: Arc<dyn SegmentStore>,
    ) -> Self {
        let buffer = Buffer::builder(ctx, base)
            .config(config)
            .store(Arc::clone(&store))
            .open()
            .expect("Failed to open buffer");
        let rx = buffer
            .take_receiver()
            .expect("Buffer should own its queue");

        Self {
            buffer,
            collector: Collector::spawn(rx),
            store,
            dir: None,
        }
    }

    /// Returns the temporary directory, if file-backed.
    pub fn dir(&self) -> Option<&Path> {
        self.dir.as_ref().map(TempDir::path)
    }

    /// Lists the buffer's segments on its store.
    pub fn segments(&self) -> Vec<SegmentName> {
        let base = self.buffer.base_path();
        self.store
            .list(base)
            .expect("Failed to list segments")
            .iter()
            .filter_map(|path| SegmentName::parse(base, path))
            .collect()
    }

    /// Lists only the closed segments.
    pub fn closed_segments(&self) -> Vec<SegmentName> {
        self.segments().into_iter().filter(|s| s.closed).collect()
    }

    /// Closes the buffer and returns every descriptor it published, plus
    /// the temporary directory so files can still be inspected.
    pub fn finish(self) -> (Vec<Flush>, Option<TempDir>) {
        let Self {
            buffer,
            collector,
            dir,
            ..
        } = self;
        buffer.close().expect("Failed to close buffer");
        drop(buffer);
        (collector.finish(), dir)
    }
}

impl std::ops::Deref for TestBuffer {
    type Target = Buffer;

    fn deref(&self) -> &Self::Target {
        &self.buffer
    }
}

/// Runs a test against a file-backed buffer and returns what it published.
///
/// # Example
///
/// ```rust
/// use diskbuf_core::Config;
/// use diskbuf_testkit::with_file_buffer;
///
/// let flushes = with_file_buffer(Config::new().flush_writes(2), |buffer| {
///     buffer.write(b"a").unwrap();
///     buffer.write(b"b").unwrap();
/// });
/// assert_eq!(flushes.len(), 1);
/// ```
pub fn with_file_buffer<F>(config: Config, f: F) -> Vec<Flush>
where
    F: FnOnce(&Buffer),
{
    let test = TestBuffer::file(config);
    f(&test.buffer);
    test.finish().0
}

/// Runs a test against an in-memory buffer and returns what it published
/// along with the store.
pub fn with_memory_buffer<F>(config: Config, f: F) -> (Vec<Flush>, InMemoryStore)
where
    F: FnOnce(&Buffer, &InMemoryStore),
{
    let store = InMemoryStore::new();
    let test = TestBuffer::memory(config, &store);
    f(&test.buffer, &store);
    (test.finish().0, store)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn file_buffer_lives_in_tempdir() {
        let test = TestBuffer::file(Config::new().flush_writes(1).verbosity(0));
        let dir = test.dir().unwrap().to_path_buf();
        assert!(test.active_path().unwrap().starts_with(&dir));

        test.write(b"x").unwrap();
        test.collector.wait_for(1, Duration::from_secs(5));
        assert_eq!(test.closed_segments().len(), 1);

        let (flushes, dir) = test.finish();
        assert_eq!(flushes.len(), 1);
        assert!(dir.unwrap().path().exists());
    }

    #[test]
    fn memory_buffer_shares_store() {
        let (flushes, store) = with_memory_buffer(Config::new().flush_bytes(4).verbosity(0), |b, _| {
            b.write(b"abcd").unwrap();
        });
        assert_eq!(flushes.len(), 1);
        assert_eq!(store.contents(&flushes[0].path).unwrap(), b"abcd");
    }
}
