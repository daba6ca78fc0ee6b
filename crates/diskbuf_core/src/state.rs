//! Mutable writer state.
//!
//! All fields are guarded by the buffer's lock. The segment slot is a
//! small state machine:
//!
//! ```text
//! Active ──rotation──▶ (taken) ──success──▶ Active
//!                          │
//!                          └──failure──▶ Faulted
//! Active | Faulted ──close──▶ Closed
//! ```
//!
//! While a rotation is in progress the slot reads as `Faulted`, so a
//! rotation that bails out half way leaves the buffer faulted without any
//! extra bookkeeping.

use crate::error::{BufferError, BufferResult};
use crate::identity::SegmentName;
use crate::policy::Counters;
use diskbuf_storage::SegmentFile;
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;
use std::time::{Duration, Instant, SystemTime};

/// Lifecycle state of a buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    /// A segment is open for writes.
    Active,
    /// A rotation failed; the buffer must be rebuilt.
    Faulted,
    /// The buffer has been closed.
    Closed,
}

/// Where the bytes of the active segment go.
pub(crate) enum Sink {
    Direct(Box<dyn SegmentFile>),
    Buffered(BufWriter<Box<dyn SegmentFile>>),
}

impl Sink {
    pub(crate) fn new(file: Box<dyn SegmentFile>, buffer_size: usize) -> Self {
        if buffer_size == 0 {
            Sink::Direct(file)
        } else {
            Sink::Buffered(BufWriter::with_capacity(buffer_size, file))
        }
    }

    fn writer(&mut self) -> &mut dyn Write {
        match self {
            Sink::Direct(file) => file,
            Sink::Buffered(buf) => buf,
        }
    }

    /// Writes all of `data`, or reports how much got through before failing.
    pub(crate) fn write_fully(&mut self, mut data: &[u8]) -> Result<usize, (usize, io::Error)> {
        let writer = self.writer();
        let mut written = 0;
        while !data.is_empty() {
            match writer.write(data) {
                Ok(0) => return Err((written, io::ErrorKind::WriteZero.into())),
                Ok(n) => {
                    written += n;
                    data = &data[n..];
                }
                Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(e) => return Err((written, e)),
            }
        }
        Ok(written)
    }

    /// Pushes buffered bytes into the segment without closing it.
    pub(crate) fn flush(&mut self) -> io::Result<()> {
        self.writer().flush()
    }

    /// Drains the write buffer and hands back the segment handle.
    pub(crate) fn into_file(self) -> io::Result<Box<dyn SegmentFile>> {
        match self {
            Sink::Direct(file) => Ok(file),
            Sink::Buffered(buf) => buf.into_inner().map_err(|e| e.into_error()),
        }
    }
}

/// The open segment.
pub(crate) struct ActiveSegment {
    pub(crate) name: SegmentName,
    pub(crate) sink: Sink,
}

impl ActiveSegment {
    pub(crate) fn new(name: SegmentName, sink: Sink) -> Self {
        Self { name, sink }
    }
}

enum Slot {
    Active(ActiveSegment),
    Faulted,
    Closed,
}

/// Counters, timestamps and the segment slot of one buffer.
pub(crate) struct WriterState {
    slot: Slot,
    counters: Counters,
    opened_at: SystemTime,
    opened: Instant,
    last_segment: u64,
}

impl WriterState {
    /// Creates state around the first segment.
    pub(crate) fn new(first: ActiveSegment) -> Self {
        let last_segment = first.name.segment;
        Self {
            slot: Slot::Active(first),
            counters: Counters::default(),
            opened_at: SystemTime::now(),
            opened: Instant::now(),
            last_segment,
        }
    }

    pub(crate) fn status(&self) -> Status {
        match self.slot {
            Slot::Active(_) => Status::Active,
            Slot::Faulted => Status::Faulted,
            Slot::Closed => Status::Closed,
        }
    }

    pub(crate) fn counters(&self) -> Counters {
        self.counters
    }

    pub(crate) fn opened_at(&self) -> SystemTime {
        self.opened_at
    }

    /// Time since the current segment opened.
    pub(crate) fn age(&self) -> Duration {
        self.opened.elapsed()
    }

    /// Returns the next segment number. Numbers are never handed out twice,
    /// even when creating the segment then fails.
    pub(crate) fn next_segment(&mut self) -> u64 {
        self.last_segment += 1;
        self.last_segment
    }

    pub(crate) fn active_path(&self) -> Option<PathBuf> {
        match &self.slot {
            Slot::Active(active) => Some(active.name.path()),
            _ => None,
        }
    }

    pub(crate) fn ensure_active(&self) -> BufferResult<()> {
        match self.slot {
            Slot::Active(_) => Ok(()),
            Slot::Faulted => Err(BufferError::Faulted),
            Slot::Closed => Err(BufferError::Closed),
        }
    }

    /// Appends `data` to the active segment.
    ///
    /// Counters are bumped before the append and are not rolled back if it
    /// fails.
    pub(crate) fn write(&mut self, data: &[u8]) -> BufferResult<usize> {
        let active = match &mut self.slot {
            Slot::Active(active) => active,
            Slot::Faulted => return Err(BufferError::Faulted),
            Slot::Closed => return Err(BufferError::Closed),
        };

        self.counters.writes += 1;
        self.counters.bytes += data.len() as u64;

        active
            .sink
            .write_fully(data)
            .map_err(|(written, source)| BufferError::Write { written, source })
    }

    /// Pushes buffered bytes of the active segment to storage.
    pub(crate) fn flush_sink(&mut self) -> BufferResult<()> {
        match &mut self.slot {
            Slot::Active(active) => active
                .sink
                .flush()
                .map_err(|source| BufferError::Write { written: 0, source }),
            Slot::Faulted => Err(BufferError::Faulted),
            Slot::Closed => Err(BufferError::Closed),
        }
    }

    /// Takes the active segment out, leaving the slot faulted until
    /// [`WriterState::install`] or [`WriterState::mark_closed`] runs.
    pub(crate) fn take_active(&mut self) -> BufferResult<ActiveSegment> {
        match std::mem::replace(&mut self.slot, Slot::Faulted) {
            Slot::Active(active) => Ok(active),
            Slot::Faulted => Err(BufferError::Faulted),
            Slot::Closed => {
                self.slot = Slot::Closed;
                Err(BufferError::Closed)
            }
        }
    }

    /// Makes `active` the current segment and resets counters and open time.
    pub(crate) fn install(&mut self, active: ActiveSegment) {
        self.last_segment = self.last_segment.max(active.name.segment);
        self.slot = Slot::Active(active);
        self.counters = Counters::default();
        self.opened_at = SystemTime::now();
        self.opened = Instant::now();
    }

    pub(crate) fn mark_closed(&mut self) {
        self.slot = Slot::Closed;
    }
}
