//! The rotation engine.
//!
//! A rotation turns the active segment into a finished, closed file and
//! opens the next one:
//!
//! 1. nothing written since open: do nothing
//! 2. drain the write buffer, rename to `<name>.closed`, release the handle
//! 3. publish a [`Flush`] descriptor (blocking on a full queue)
//! 4. create the next segment and reset the counters
//!
//! The buffer is drained before the rename so a `.closed` file is complete
//! the moment it becomes visible. A failure in step 2 or 4 leaves the
//! state faulted and publishes nothing for the attempt.

use crate::error::{BufferError, BufferResult, RotationStage};
use crate::flush::{Flush, Reason};
use crate::handoff::FlushSender;
use crate::identity::SegmentName;
use crate::logging::vlog;
use crate::state::{ActiveSegment, Sink, Status, WriterState};
use diskbuf_storage::SegmentStore;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::SystemTime;

/// Creates, closes and publishes segments for one buffer.
pub(crate) struct Rotator {
    store: Arc<dyn SegmentStore>,
    base: PathBuf,
    pid: u32,
    instance: u64,
    buffer_size: usize,
    verbosity: u8,
    queue: FlushSender,
}

impl Rotator {
    pub(crate) fn new(
        store: Arc<dyn SegmentStore>,
        base: PathBuf,
        pid: u32,
        instance: u64,
        buffer_size: usize,
        verbosity: u8,
        queue: FlushSender,
    ) -> Self {
        Self {
            store,
            base,
            pid,
            instance,
            buffer_size,
            verbosity,
            queue,
        }
    }

    /// Creates segment number `segment`.
    pub(crate) fn create(&self, segment: u64) -> BufferResult<ActiveSegment> {
        let name = SegmentName::new(&self.base, self.pid, self.instance, segment);
        let path = name.path();

        vlog!(self.verbosity, 1, path = %path.display(), "opening segment");
        let file = self
            .store
            .create(&path)
            .map_err(|source| BufferError::SegmentCreate { path, source })?;

        vlog!(self.verbosity, 2, buffer_size = self.buffer_size, "segment opened");
        Ok(ActiveSegment::new(name, Sink::new(file, self.buffer_size)))
    }

    /// Flushes for `reason` and opens the next segment.
    ///
    /// Returns whether a descriptor was published.
    pub(crate) fn rotate(&self, state: &mut WriterState, reason: Reason) -> BufferResult<bool> {
        vlog!(self.verbosity, 1, %reason, "flushing");
        state.ensure_active()?;

        if state.counters().writes == 0 {
            vlog!(self.verbosity, 2, "nothing to flush");
            return Ok(false);
        }

        let flush = self.finish(state, reason)?;
        let published = self.publish(flush);

        let next = self.create(state.next_segment())?;
        vlog!(self.verbosity, 2, "reset state");
        state.install(next);

        published.map(|()| true)
    }

    /// Publishes the final segment and leaves the state closed.
    ///
    /// An empty final segment is removed instead of published. A faulted
    /// state is closed without further work.
    pub(crate) fn shutdown(&self, state: &mut WriterState) -> BufferResult<()> {
        match state.status() {
            Status::Closed => return Ok(()),
            Status::Faulted => {
                state.mark_closed();
                return Ok(());
            }
            Status::Active => {}
        }

        if state.counters().writes == 0 {
            self.discard(state)?;
            state.mark_closed();
            return Ok(());
        }

        let flush = self.finish(state, Reason::Forced)?;
        state.mark_closed();
        self.publish(flush)
    }

    /// Drains, renames and releases the active segment.
    fn finish(&self, state: &mut WriterState, reason: Reason) -> BufferResult<Flush> {
        let counters = state.counters();
        let opened = state.opened_at();
        let ActiveSegment { name, sink } = state.take_active()?;
        let path = name.path();
        let closed_path = name.into_closed().path();

        vlog!(self.verbosity, 2, path = %path.display(), "draining write buffer");
        let file = sink
            .into_file()
            .map_err(|e| BufferError::rotation(RotationStage::Flush, &path, e))?;

        vlog!(self.verbosity, 2, path = %path.display(), "renaming");
        self.store
            .rename(&path, &closed_path)
            .map_err(|e| BufferError::rotation(RotationStage::Rename, &path, e))?;

        vlog!(self.verbosity, 2, path = %closed_path.display(), "closing");
        file.close()
            .map_err(|e| BufferError::rotation(RotationStage::Close, &closed_path, e))?;

        Ok(Flush {
            reason,
            path: closed_path,
            writes: counters.writes,
            bytes: counters.bytes,
            opened,
            closed: SystemTime::now(),
            age: state.age(),
        })
    }

    /// Releases and deletes an active segment that never received a write.
    fn discard(&self, state: &mut WriterState) -> BufferResult<()> {
        let ActiveSegment { name, sink } = state.take_active()?;
        let path = name.path();

        vlog!(self.verbosity, 2, path = %path.display(), "removing empty segment");
        let file = sink
            .into_file()
            .map_err(|e| BufferError::rotation(RotationStage::Flush, &path, e))?;
        file.close()
            .map_err(|e| BufferError::rotation(RotationStage::Close, &path, e))?;
        self.store
            .remove(&path)
            .map_err(|e| BufferError::rotation(RotationStage::Remove, &path, e))
    }

    fn publish(&self, flush: Flush) -> BufferResult<()> {
        vlog!(self.verbosity, 2, path = %flush.path.display(), "publishing");
        self.queue.publish(flush).map_err(|flush| {
            tracing::warn!(path = %flush.path.display(), "handoff queue disconnected, descriptor dropped");
            BufferError::HandoffClosed { path: flush.path }
        })
    }
}
