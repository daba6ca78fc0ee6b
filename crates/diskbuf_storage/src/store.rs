//! Segment store trait definitions.

use crate::error::StorageResult;
use std::io::Write;
use std::path::{Path, PathBuf};

/// A writable handle to one segment.
///
/// Writes go through [`Write`]. Partial writes are allowed and reported
/// the usual way, by returning fewer bytes than offered.
pub trait SegmentFile: Write + Send + Sync {
    /// Flushes pending bytes and releases the handle.
    ///
    /// # Errors
    ///
    /// Returns an error if the final flush or the close fails.
    fn close(self: Box<Self>) -> StorageResult<()>;
}

/// A store of segment files.
///
/// Stores are **flat path namespaces**. They provide creation, rename and
/// removal of whole files. DiskBuf decides names and when to rotate.
///
/// # Invariants
///
/// - `create` never truncates an existing file; it fails instead
/// - `rename` of a file with an open handle keeps the handle valid,
///   later writes through it land in the renamed file
/// - Stores must be `Send + Sync` for use from a timer thread
///
/// # Implementors
///
/// - [`super::FileStore`] - For persistent storage
/// - [`super::InMemoryStore`] - For testing
pub trait SegmentStore: Send + Sync {
    /// Creates a new empty segment at `path` and opens it for writing.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - A file already exists at `path`
    /// - The parent location does not exist
    /// - An I/O error occurs
    fn create(&self, path: &Path) -> StorageResult<Box<dyn SegmentFile>>;

    /// Renames the segment at `from` to `to`.
    ///
    /// # Errors
    ///
    /// Returns an error if `from` does not exist or the rename fails.
    fn rename(&self, from: &Path, to: &Path) -> StorageResult<()>;

    /// Removes the segment at `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if `path` does not exist or removal fails.
    fn remove(&self, path: &Path) -> StorageResult<()>;

    /// Returns whether a segment exists at `path`.
    fn exists(&self, path: &Path) -> bool;

    /// Lists every segment whose file name starts with `<base name>.`,
    /// in lexical order.
    ///
    /// # Errors
    ///
    /// Returns an error if the containing location cannot be read.
    fn list(&self, base: &Path) -> StorageResult<Vec<PathBuf>>;
}

/// Returns whether `candidate` is named `<base>.<something>`.
pub(crate) fn is_derived_from(base: &Path, candidate: &Path) -> bool {
    if candidate.parent() != base.parent() {
        return false;
    }
    let (Some(base_name), Some(name)) = (base.file_name(), candidate.file_name()) else {
        return false;
    };
    let (base_name, name) = (base_name.to_string_lossy(), name.to_string_lossy());
    name.len() > base_name.len() + 1
        && name.starts_with(base_name.as_ref())
        && name.as_bytes()[base_name.len()] == b'.'
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn derived_names_match() {
        let base = Path::new("/data/app.log");
        assert!(is_derived_from(base, Path::new("/data/app.log.1.1.1")));
        assert!(is_derived_from(base, Path::new("/data/app.log.1.1.1.closed")));
    }

    #[test]
    fn unrelated_names_do_not_match() {
        let base = Path::new("/data/app.log");
        assert!(!is_derived_from(base, Path::new("/data/app.log")));
        assert!(!is_derived_from(base, Path::new("/data/app.log.")));
        assert!(!is_derived_from(base, Path::new("/data/app.logx.1")));
        assert!(!is_derived_from(base, Path::new("/other/app.log.1")));
    }

    proptest! {
        #[test]
        fn segment_suffixes_are_derived(pid in any::<u32>(), instance in 1u64.., segment in 1u64..) {
            let base = Path::new("/data/app.log");
            let name = format!("/data/app.log.{pid}.{instance}.{segment}");
            prop_assert!(is_derived_from(base, Path::new(&name)));
        }
    }
}
