//! Buffer identity and segment naming.
//!
//! Segment files are named `<base>.<pid>.<instance>.<segment>`, and get a
//! `.closed` suffix once finished. The pid keeps names apart across
//! process restarts, the instance number across buffers sharing a
//! [`ProcessContext`], and the segment number across rotations of one
//! buffer.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

/// Suffix marking a finished segment.
pub const CLOSED_SUFFIX: &str = ".closed";

/// Identity source for the buffers of one process.
///
/// Buffers that share a base path must share a context, otherwise their
/// instance numbers (and so their file names) can collide.
#[derive(Debug)]
pub struct ProcessContext {
    pid: u32,
    instances: AtomicU64,
}

impl ProcessContext {
    /// Creates a context for the current process.
    #[must_use]
    pub fn new() -> Self {
        Self::with_pid(std::process::id())
    }

    /// Creates a context reporting the given process id.
    #[must_use]
    pub const fn with_pid(pid: u32) -> Self {
        Self {
            pid,
            instances: AtomicU64::new(0),
        }
    }

    /// Returns the process id used in file names.
    #[must_use]
    pub const fn pid(&self) -> u32 {
        self.pid
    }

    /// Allocates the next buffer instance number, starting at 1.
    pub fn next_instance(&self) -> u64 {
        self.instances.fetch_add(1, Ordering::Relaxed) + 1
    }
}

impl Default for ProcessContext {
    fn default() -> Self {
        Self::new()
    }
}

/// The parsed name of one segment file.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SegmentName {
    /// Base path the buffer was opened with.
    pub base: PathBuf,
    /// Process id component.
    pub pid: u32,
    /// Buffer instance component.
    pub instance: u64,
    /// Segment sequence component.
    pub segment: u64,
    /// Whether the name carries the closed suffix.
    pub closed: bool,
}

impl SegmentName {
    /// Names an active segment.
    #[must_use]
    pub fn new(base: impl Into<PathBuf>, pid: u32, instance: u64, segment: u64) -> Self {
        Self {
            base: base.into(),
            pid,
            instance,
            segment,
            closed: false,
        }
    }

    /// Returns the same segment under its closed name.
    #[must_use]
    pub fn into_closed(self) -> Self {
        Self {
            closed: true,
            ..self
        }
    }

    /// Returns the on-disk path for this name.
    #[must_use]
    pub fn path(&self) -> PathBuf {
        PathBuf::from(self.to_string())
    }

    /// Parses `path` as a segment of `base`.
    ///
    /// Returns `None` for anything not of the form
    /// `<base>.<pid>.<instance>.<segment>[.closed]`.
    #[must_use]
    pub fn parse(base: &Path, path: &Path) -> Option<Self> {
        let base_str = base.to_str()?;
        let rest = path.to_str()?.strip_prefix(base_str)?.strip_prefix('.')?;
        let (rest, closed) = match rest.strip_suffix(CLOSED_SUFFIX) {
            Some(stripped) => (stripped, true),
            None => (rest, false),
        };

        let mut parts = rest.split('.');
        let pid = parts.next()?.parse().ok()?;
        let instance = parts.next()?.parse().ok()?;
        let segment = parts.next()?.parse().ok()?;
        if parts.next().is_some() {
            return None;
        }

        Some(Self {
            base: base.to_path_buf(),
            pid,
            instance,
            segment,
            closed,
        })
    }
}

impl fmt::Display for SegmentName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}.{}.{}.{}",
            self.base.display(),
            self.pid,
            self.instance,
            self.segment
        )?;
        if self.closed {
            f.write_str(CLOSED_SUFFIX)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::collections::HashSet;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn instances_start_at_one() {
        let ctx = ProcessContext::with_pid(42);
        assert_eq!(ctx.pid(), 42);
        assert_eq!(ctx.next_instance(), 1);
        assert_eq!(ctx.next_instance(), 2);
    }

    #[test]
    fn contexts_are_isolated() {
        let a = ProcessContext::with_pid(1);
        let b = ProcessContext::with_pid(1);
        a.next_instance();
        a.next_instance();
        assert_eq!(b.next_instance(), 1);
    }

    #[test]
    fn concurrent_instances_are_unique() {
        let ctx = Arc::new(ProcessContext::new());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let ctx = Arc::clone(&ctx);
                thread::spawn(move || (0..100).map(|_| ctx.next_instance()).collect::<Vec<_>>())
            })
            .collect();

        let mut seen = HashSet::new();
        for handle in handles {
            for id in handle.join().unwrap() {
                assert!(seen.insert(id));
            }
        }
        assert_eq!(seen.len(), 800);
    }

    #[test]
    fn segment_name_format() {
        let name = SegmentName::new("/spool/app.log", 7, 2, 3);
        assert_eq!(name.to_string(), "/spool/app.log.7.2.3");
        assert_eq!(
            name.into_closed().path(),
            PathBuf::from("/spool/app.log.7.2.3.closed")
        );
    }

    #[test]
    fn segment_name_parse() {
        let base = Path::new("/spool/app.log");
        let name = SegmentName::parse(base, Path::new("/spool/app.log.7.2.3.closed")).unwrap();
        assert_eq!(name.pid, 7);
        assert_eq!(name.instance, 2);
        assert_eq!(name.segment, 3);
        assert!(name.closed);

        let active = SegmentName::parse(base, Path::new("/spool/app.log.7.2.4")).unwrap();
        assert!(!active.closed);
    }

    #[test]
    fn segment_name_parse_rejects_foreign_files() {
        let base = Path::new("/spool/app.log");
        for other in [
            "/spool/app.log",
            "/spool/app.log.7.2",
            "/spool/app.log.7.2.3.4",
            "/spool/app.log.x.2.3",
            "/spool/app.log.7.2.3.tmp",
            "/spool/other.7.2.3",
        ] {
            assert_eq!(SegmentName::parse(base, Path::new(other)), None, "{other}");
        }
    }

    proptest! {
        #[test]
        fn segment_name_parse_inverts_display(
            pid in any::<u32>(),
            instance in any::<u64>(),
            segment in any::<u64>(),
            closed in any::<bool>(),
        ) {
            let base = Path::new("/var/spool/events");
            let mut name = SegmentName::new(base, pid, instance, segment);
            name.closed = closed;
            prop_assert_eq!(SegmentName::parse(base, &name.path()), Some(name));
        }
    }
}
