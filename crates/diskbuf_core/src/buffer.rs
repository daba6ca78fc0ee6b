//! The public buffer handle.

use crate::config::Config;
use crate::error::{BufferError, BufferResult};
use crate::flush::Reason;
use crate::handoff::{self, FlushReceiver, FlushSender};
use crate::identity::ProcessContext;
use crate::logging::vlog;
use crate::policy::{self, Counters, Thresholds, WRITE_TRIGGERS};
use crate::rotation::Rotator;
use crate::scheduler::IntervalScheduler;
use crate::state::{Status, WriterState};
use diskbuf_storage::{FileStore, SegmentStore};
use parking_lot::{Mutex, RwLock};
use std::io;
use std::ops::ControlFlow;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::Span;

/// State shared between the buffer handle and its interval thread.
struct Shared {
    state: RwLock<WriterState>,
    rotator: Rotator,
    thresholds: Thresholds,
    verbosity: u8,
    span: Span,
}

impl Shared {
    fn write(&self, data: &[u8]) -> BufferResult<usize> {
        vlog!(self.verbosity, 3, len = data.len(), "write");

        let mut state = self.state.write();
        let written = state.write(data)?;

        for trigger in WRITE_TRIGGERS {
            if policy::is_due(trigger, state.counters(), &self.thresholds) {
                self.rotator
                    .rotate(&mut state, trigger.reason())
                    .map_err(|source| BufferError::Rotated {
                        written,
                        source: Box::new(source),
                    })?;
            }
        }

        Ok(written)
    }

    fn rotate(&self, reason: Reason) -> BufferResult<bool> {
        let mut state = self.state.write();
        self.rotator.rotate(&mut state, reason)
    }

    fn interval_tick(&self) -> ControlFlow<()> {
        let _entered = self.span.enter();
        match self.rotate(Reason::Interval) {
            Ok(_) => ControlFlow::Continue(()),
            Err(err) if err.is_fatal() => {
                tracing::error!(error = %err, "interval flush failed, stopping timer");
                ControlFlow::Break(())
            }
            Err(err) => {
                tracing::error!(error = %err, "interval flush failed");
                ControlFlow::Continue(())
            }
        }
    }
}

/// A 1:N on-disk write buffer.
///
/// Writes accumulate in a segment file named
/// `<base>.<pid>.<instance>.<segment>`. When a configured threshold is
/// reached the segment is renamed to `<name>.closed`, a
/// [`crate::Flush`] descriptor for it is published on the handoff queue,
/// and a fresh segment takes its place.
///
/// All methods take `&self` and may be called from any thread; every
/// state change is serialized by one lock, shared with the interval timer.
///
/// # Backpressure
///
/// Publishing a descriptor blocks until the queue accepts it. With the
/// default rendezvous queue, a rotation (and every writer waiting behind
/// it) blocks until a consumer receives the descriptor.
///
/// # Example
///
/// ```rust
/// use diskbuf_core::{Buffer, Config, ProcessContext};
/// use diskbuf_storage::InMemoryStore;
/// use std::sync::Arc;
///
/// let ctx = Arc::new(ProcessContext::new());
/// let buffer = Buffer::builder(&ctx, "/spool/events")
///     .config(Config::new().flush_writes(2))
///     .store(Arc::new(InMemoryStore::new()))
///     .open()
///     .unwrap();
///
/// let rx = buffer.take_receiver().unwrap();
/// let consumer = std::thread::spawn(move || rx.into_iter().collect::<Vec<_>>());
///
/// buffer.write(b"one\n").unwrap();
/// buffer.write(b"two\n").unwrap();
/// buffer.close().unwrap();
/// drop(buffer);
///
/// let flushed = consumer.join().unwrap();
/// assert_eq!(flushed.len(), 1);
/// assert_eq!(flushed[0].writes, 2);
/// ```
pub struct Buffer {
    shared: Arc<Shared>,
    scheduler: Mutex<Option<IntervalScheduler>>,
    receiver: Mutex<Option<FlushReceiver>>,
    base: PathBuf,
    instance: u64,
    config: Config,
}

impl Buffer {
    /// Starts building a buffer at `base`, drawing its identity from `ctx`.
    pub fn builder(ctx: &Arc<ProcessContext>, base: impl Into<PathBuf>) -> BufferBuilder {
        BufferBuilder {
            ctx: Arc::clone(ctx),
            base: base.into(),
            config: Config::default(),
            store: None,
            queue: None,
        }
    }

    /// Opens a file-backed buffer with an internal rendezvous queue.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid or the first
    /// segment cannot be created.
    pub fn open(
        ctx: &Arc<ProcessContext>,
        base: impl Into<PathBuf>,
        config: Config,
    ) -> BufferResult<Self> {
        Self::builder(ctx, base).config(config).open()
    }

    /// Appends `data` to the active segment.
    ///
    /// Returns the number of bytes accepted. If the write-count or
    /// byte-count threshold is reached, the segment is rotated before this
    /// returns.
    ///
    /// # Errors
    ///
    /// - [`BufferError::Write`] if the segment rejected the bytes; no
    ///   rotation is attempted and `written` tells how much got through
    /// - [`BufferError::Rotated`] if the bytes were accepted but the
    ///   triggered rotation failed; `written` is the accepted count
    /// - [`BufferError::Faulted`] or [`BufferError::Closed`] if the buffer
    ///   is no longer usable
    pub fn write(&self, data: &[u8]) -> BufferResult<usize> {
        let _entered = self.shared.span.enter();
        self.shared.write(data)
    }

    /// Rotates the active segment now, unless it has no writes.
    ///
    /// # Errors
    ///
    /// Returns an error if the rotation fails or the buffer is unusable.
    pub fn flush(&self) -> BufferResult<()> {
        let _entered = self.shared.span.enter();
        self.shared.rotate(Reason::Forced).map(|_| ())
    }

    /// Stops the interval timer and publishes the final segment.
    ///
    /// The timer is joined before the final flush, so no interval flush
    /// can follow it. Afterwards the buffer is [`Status::Closed`]; closing
    /// again is a no-op. Closing a faulted buffer just marks it closed.
    ///
    /// # Errors
    ///
    /// Returns an error if the final rotation fails.
    pub fn close(&self) -> BufferResult<()> {
        let _entered = self.shared.span.enter();

        let scheduler = self.scheduler.lock().take();
        if let Some(scheduler) = scheduler {
            vlog!(self.config.verbosity, 2, "stopping interval timer");
            scheduler.stop();
        }

        let mut state = self.shared.state.write();
        self.shared.rotator.shutdown(&mut state)
    }

    /// Writes made to the current segment.
    pub fn writes(&self) -> u64 {
        self.shared.state.read().counters().writes
    }

    /// Bytes written to the current segment.
    pub fn bytes(&self) -> u64 {
        self.shared.state.read().counters().bytes
    }

    /// Both counters of the current segment, read together.
    pub fn counters(&self) -> Counters {
        self.shared.state.read().counters()
    }

    /// Current lifecycle state.
    pub fn status(&self) -> Status {
        self.shared.state.read().status()
    }

    /// Path of the segment currently receiving writes.
    pub fn active_path(&self) -> Option<PathBuf> {
        self.shared.state.read().active_path()
    }

    /// Base path segment names are derived from.
    pub fn base_path(&self) -> &Path {
        &self.base
    }

    /// This buffer's instance number within its process context.
    pub fn instance(&self) -> u64 {
        self.instance
    }

    /// The configuration the buffer was opened with.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Takes the receiving side of the internal queue.
    ///
    /// Returns `None` if a queue was supplied to the builder, or if the
    /// receiver was already taken.
    pub fn take_receiver(&self) -> Option<FlushReceiver> {
        self.receiver.lock().take()
    }
}

impl std::fmt::Debug for Buffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Buffer")
            .field("base", &self.base)
            .field("instance", &self.instance)
            .field("status", &self.status())
            .field(
                "interval_timer",
                &self
                    .scheduler
                    .lock()
                    .as_ref()
                    .is_some_and(IntervalScheduler::is_running),
            )
            .finish()
    }
}

/// Writes go through [`Buffer::write`]. A failed call that still got bytes
/// into the segment reports them as written; the failure shows up on the
/// next call. `flush` pushes the in-process write buffer into the active
/// segment; it does not rotate.
impl io::Write for &Buffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match Buffer::write(self, buf) {
            Ok(n) => Ok(n),
            Err(err) if err.written() > 0 => {
                tracing::warn!(written = err.written(), error = %err, "write accepted with error");
                Ok(err.written())
            }
            Err(err) => Err(err.into()),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        let _entered = self.shared.span.enter();
        self.shared.state.write().flush_sink().map_err(io::Error::from)
    }
}

impl io::Write for Buffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut this: &Buffer = self;
        io::Write::write(&mut this, buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        let mut this: &Buffer = self;
        io::Write::flush(&mut this)
    }
}

/// Builder for [`Buffer`].
pub struct BufferBuilder {
    ctx: Arc<ProcessContext>,
    base: PathBuf,
    config: Config,
    store: Option<Arc<dyn SegmentStore>>,
    queue: Option<FlushSender>,
}

impl BufferBuilder {
    /// Sets the configuration.
    #[must_use]
    pub fn config(mut self, config: Config) -> Self {
        self.config = config;
        self
    }

    /// Sets the segment store. Defaults to [`FileStore`].
    #[must_use]
    pub fn store(mut self, store: Arc<dyn SegmentStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Publishes descriptors into `queue` instead of an internal
    /// rendezvous queue.
    #[must_use]
    pub fn queue(mut self, queue: FlushSender) -> Self {
        self.queue = Some(queue);
        self
    }

    /// Validates the configuration, creates the first segment and starts
    /// the interval timer if one is configured.
    ///
    /// # Errors
    ///
    /// - [`BufferError::Config`] if no flush trigger is enabled; nothing is
    ///   created
    /// - [`BufferError::SegmentCreate`] if the first segment cannot be
    ///   created
    /// - [`BufferError::Scheduler`] if the timer thread cannot start
    pub fn open(self) -> BufferResult<Buffer> {
        self.config.validate()?;

        let instance = self.ctx.next_instance();
        let span = tracing::info_span!("buffer", id = instance, path = %self.base.display());
        let _entered = span.enter();

        let (queue, receiver) = match self.queue {
            Some(queue) => (queue, None),
            None => {
                let (tx, rx) = handoff::rendezvous();
                (tx, Some(rx))
            }
        };
        let store = self
            .store
            .unwrap_or_else(|| Arc::new(FileStore::new()) as Arc<dyn SegmentStore>);

        let rotator = Rotator::new(
            store,
            self.base.clone(),
            self.ctx.pid(),
            instance,
            self.config.buffer_size,
            self.config.verbosity,
            queue,
        );
        let first = rotator.create(1)?;

        let shared = Arc::new(Shared {
            state: RwLock::new(WriterState::new(first)),
            rotator,
            thresholds: Thresholds::from(&self.config),
            verbosity: self.config.verbosity,
            span: span.clone(),
        });

        let scheduler = if self.config.flush_interval.is_zero() {
            None
        } else {
            vlog!(self.config.verbosity, 2, interval = ?self.config.flush_interval, "starting interval timer");
            let tick = Arc::clone(&shared);
            let scheduler = IntervalScheduler::start(
                format!("diskbuf-interval-{instance}"),
                self.config.flush_interval,
                move || tick.interval_tick(),
            );
            match scheduler {
                Ok(scheduler) => Some(scheduler),
                Err(err) => {
                    let mut state = shared.state.write();
                    if let Err(cleanup) = shared.rotator.shutdown(&mut state) {
                        tracing::warn!(error = %cleanup, "failed to remove first segment");
                    }
                    return Err(BufferError::Scheduler(err));
                }
            }
        };

        Ok(Buffer {
            shared,
            scheduler: Mutex::new(scheduler),
            receiver: Mutex::new(receiver),
            base: self.base,
            instance,
            config: self.config,
        })
    }
}
