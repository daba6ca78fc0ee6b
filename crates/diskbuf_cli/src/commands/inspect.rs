//! Inspect command implementation.

use super::{CommandError, CommandResult, Format};
use diskbuf_core::SegmentName;
use diskbuf_storage::{FileStore, SegmentStore};
use serde::Serialize;
use std::fs;
use std::io::{self, Write};
use std::path::Path;

/// One segment found on disk.
#[derive(Debug, Serialize)]
pub struct SegmentInfo {
    /// Full path of the segment file.
    pub path: String,
    /// Process id component of the name.
    pub pid: u32,
    /// Buffer instance component of the name.
    pub instance: u64,
    /// Segment sequence component of the name.
    pub segment: u64,
    /// Whether the segment has been closed.
    pub closed: bool,
    /// File size in bytes.
    pub size: u64,
}

/// Inspection result for a base path.
#[derive(Debug, Serialize)]
pub struct InspectResult {
    /// The base path searched.
    pub base: String,
    /// Segments still being written.
    pub active: usize,
    /// Segments awaiting consumption.
    pub closed: usize,
    /// Total bytes across all segments.
    pub total_size: u64,
    /// Every segment, ordered by pid, instance and sequence.
    pub segments: Vec<SegmentInfo>,
}

/// Runs the inspect command.
pub fn run(base: &Path, format: Format) -> CommandResult<()> {
    let result = inspect(&FileStore::new(), base)?;
    let mut out = io::stdout().lock();
    match format {
        Format::Json => writeln!(out, "{}", serde_json::to_string_pretty(&result)?)?,
        Format::Text => print_text_output(&mut out, &result)?,
    }
    Ok(())
}

/// Collects the segments of `base` from `store`.
///
/// Files next to `base` that do not follow the segment naming scheme are
/// skipped.
pub fn inspect(store: &dyn SegmentStore, base: &Path) -> CommandResult<InspectResult> {
    let mut segments: Vec<SegmentInfo> = store
        .list(base)?
        .iter()
        .filter_map(|path| {
            let name = SegmentName::parse(base, path)?;
            let size = fs::metadata(path).map(|m| m.len()).unwrap_or(0);
            Some(SegmentInfo {
                path: path.display().to_string(),
                pid: name.pid,
                instance: name.instance,
                segment: name.segment,
                closed: name.closed,
                size,
            })
        })
        .collect();

    if segments.is_empty() {
        return Err(CommandError::NoSegments {
            base: base.to_path_buf(),
        });
    }
    segments.sort_by_key(|s| (s.pid, s.instance, s.segment));

    let closed = segments.iter().filter(|s| s.closed).count();
    Ok(InspectResult {
        base: base.display().to_string(),
        active: segments.len() - closed,
        closed,
        total_size: segments.iter().map(|s| s.size).sum(),
        segments,
    })
}

fn print_text_output<W: Write>(out: &mut W, result: &InspectResult) -> io::Result<()> {
    writeln!(out, "DiskBuf Segments")?;
    writeln!(out, "================")?;
    writeln!(out)?;
    writeln!(out, "Base: {}", result.base)?;
    writeln!(out, "Active: {}", result.active)?;
    writeln!(out, "Closed: {}", result.closed)?;
    writeln!(out, "Total Size: {} bytes", result.total_size)?;
    writeln!(out)?;

    for segment in &result.segments {
        let state = if segment.closed { "closed" } else { "active" };
        writeln!(
            out,
            "  {:>8} {:>4} {:>6}  {:<6} {:>10} bytes  {}",
            segment.pid, segment.instance, segment.segment, state, segment.size, segment.path
        )?;
    }
    Ok(())
}
