//! Flush descriptors published for completed segments.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::time::{Duration, SystemTime};

/// Why a segment was rotated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Reason {
    /// An explicit flush or close.
    Forced,
    /// The write-count threshold was reached.
    Writes,
    /// The byte-count threshold was reached.
    Bytes,
    /// The rotation period elapsed.
    Interval,
}

impl Reason {
    /// Returns the lowercase name used in logs and serialized descriptors.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Reason::Forced => "forced",
            Reason::Writes => "writes",
            Reason::Bytes => "bytes",
            Reason::Interval => "interval",
        }
    }
}

impl fmt::Display for Reason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A completed segment, handed to consumers through the handoff queue.
///
/// A descriptor is created only after its segment is fully written,
/// renamed to its closed name and released. `path` therefore always names
/// a finished file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Flush {
    /// Why the segment was rotated.
    pub reason: Reason,
    /// Final path of the closed segment.
    pub path: PathBuf,
    /// Writes the segment received.
    pub writes: u64,
    /// Bytes the segment received.
    pub bytes: u64,
    /// When the segment was opened.
    pub opened: SystemTime,
    /// When the segment was closed.
    pub closed: SystemTime,
    /// How long the segment was open.
    pub age: Duration,
}

impl fmt::Display for Flush {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ({}): {} writes, {} bytes, open {:?}",
            self.path.display(),
            self.reason,
            self.writes,
            self.bytes,
            self.age
        )
    }
}
