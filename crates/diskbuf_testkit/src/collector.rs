//! A consumer that drains a handoff queue on its own thread.

use diskbuf_core::{Flush, FlushReceiver};
use parking_lot::{Condvar, Mutex};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

#[derive(Default)]
struct Seen {
    flushes: Mutex<Vec<Flush>>,
    arrived: Condvar,
}

/// Receives every descriptor published on a queue and keeps them in order.
///
/// The collecting thread runs until every sender of the queue is dropped.
pub struct Collector {
    seen: Arc<Seen>,
    handle: Option<JoinHandle<()>>,
}

impl Collector {
    /// Starts draining `rx`.
    pub fn spawn(rx: FlushReceiver) -> Self {
        Self::spawn_with_delay(rx, Duration::ZERO)
    }

    /// Starts draining `rx`, pausing `delay` before taking each descriptor.
    ///
    /// Simulates a slow consumer.
    pub fn spawn_with_delay(rx: FlushReceiver, delay: Duration) -> Self {
        let seen = Arc::new(Seen::default());
        let sink = Arc::clone(&seen);

        let handle = thread::spawn(move || loop {
            if !delay.is_zero() {
                thread::sleep(delay);
            }
            let Some(flush) = rx.recv() else {
                break;
            };
            sink.flushes.lock().push(flush);
            sink.arrived.notify_all();
        });

        Self {
            seen,
            handle: Some(handle),
        }
    }

    /// Returns the descriptors received so far.
    pub fn snapshot(&self) -> Vec<Flush> {
        self.seen.flushes.lock().clone()
    }

    /// Number of descriptors received so far.
    pub fn len(&self) -> usize {
        self.seen.flushes.lock().len()
    }

    /// Returns true if nothing has been received yet.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Waits until at least `count` descriptors arrived or `timeout` passed,
    /// and returns what arrived.
    pub fn wait_for(&self, count: usize, timeout: Duration) -> Vec<Flush> {
        let deadline = Instant::now() + timeout;
        let mut flushes = self.seen.flushes.lock();
        while flushes.len() < count {
            if self.seen.arrived.wait_until(&mut flushes, deadline).timed_out() {
                break;
            }
        }
        flushes.clone()
    }

    /// Waits for the queue to disconnect and returns everything received.
    ///
    /// Every sender must be dropped (for an internal queue: the buffer
    /// itself) or this blocks forever.
    pub fn finish(mut self) -> Vec<Flush> {
        if let Some(handle) = self.handle.take() {
            handle.join().expect("collector thread panicked");
        }
        std::mem::take(&mut *self.seen.flushes.lock())
    }
}
