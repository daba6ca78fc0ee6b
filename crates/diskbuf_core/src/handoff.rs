//! The handoff queue between a buffer and its consumers.
//!
//! The queue is a bounded channel of [`Flush`] descriptors. Publishing
//! blocks while the queue is full, so a slow consumer stalls rotation and,
//! through the buffer lock, every writer. A [`rendezvous`] queue has no
//! capacity at all: each publish waits for a consumer to take it.
//!
//! # Usage
//!
//! ```rust
//! use diskbuf_core::handoff;
//!
//! let (tx, rx) = handoff::bounded(16);
//! std::thread::spawn(move || {
//!     for flush in rx {
//!         println!("ready: {}", flush.path.display());
//!     }
//! });
//! # drop(tx);
//! ```

use crate::flush::Flush;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, SyncSender, TryRecvError};
use std::time::Duration;

/// Creates a handoff queue holding up to `capacity` unread descriptors.
#[must_use]
pub fn bounded(capacity: usize) -> (FlushSender, FlushReceiver) {
    let (tx, rx) = mpsc::sync_channel(capacity);
    (FlushSender { inner: tx }, FlushReceiver { inner: rx })
}

/// Creates a handoff queue without buffering.
#[must_use]
pub fn rendezvous() -> (FlushSender, FlushReceiver) {
    bounded(0)
}

/// The publishing side of a handoff queue.
///
/// Clones publish into the same queue; several buffers may share one.
#[derive(Debug, Clone)]
pub struct FlushSender {
    inner: SyncSender<Flush>,
}

impl FlushSender {
    /// Publishes a descriptor, blocking until the queue accepts it.
    ///
    /// Gives the descriptor back if every receiver is gone.
    pub(crate) fn publish(&self, flush: Flush) -> Result<(), Flush> {
        self.inner.send(flush).map_err(|e| e.0)
    }
}

/// The consuming side of a handoff queue.
#[derive(Debug)]
pub struct FlushReceiver {
    inner: Receiver<Flush>,
}

impl FlushReceiver {
    /// Blocks until a descriptor arrives.
    ///
    /// Returns `None` once every sender is gone and the queue is drained.
    pub fn recv(&self) -> Option<Flush> {
        self.inner.recv().ok()
    }

    /// Waits up to `timeout` for a descriptor.
    ///
    /// # Errors
    ///
    /// Returns [`RecvTimeoutError::Timeout`] if nothing arrived in time, or
    /// [`RecvTimeoutError::Disconnected`] once every sender is gone.
    pub fn recv_timeout(&self, timeout: Duration) -> Result<Flush, RecvTimeoutError> {
        self.inner.recv_timeout(timeout)
    }

    /// Takes a descriptor if one is ready.
    ///
    /// # Errors
    ///
    /// Returns [`TryRecvError::Empty`] if none is ready, or
    /// [`TryRecvError::Disconnected`] once every sender is gone.
    pub fn try_recv(&self) -> Result<Flush, TryRecvError> {
        self.inner.try_recv()
    }

    /// Iterates over descriptors until every sender is gone.
    pub fn iter(&self) -> impl Iterator<Item = Flush> + '_ {
        self.inner.iter()
    }
}

impl IntoIterator for FlushReceiver {
    type Item = Flush;
    type IntoIter = mpsc::IntoIter<Flush>;

    fn into_iter(self) -> Self::IntoIter {
        self.inner.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flush::Reason;
    use std::path::PathBuf;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;
    use std::thread;
    use std::time::SystemTime;

    fn flush(n: u64) -> Flush {
        let now = SystemTime::now();
        Flush {
            reason: Reason::Forced,
            path: PathBuf::from(format!("seg.{n}.closed")),
            writes: n,
            bytes: n,
            opened: now,
            closed: now,
            age: Duration::ZERO,
        }
    }

    #[test]
    fn bounded_preserves_order() {
        let (tx, rx) = bounded(4);
        for n in 1..=3 {
            tx.publish(flush(n)).unwrap();
        }
        drop(tx);

        let writes: Vec<u64> = rx.into_iter().map(|f| f.writes).collect();
        assert_eq!(writes, vec![1, 2, 3]);
    }

    #[test]
    fn rendezvous_blocks_until_received() {
        let (tx, rx) = rendezvous();
        let delivered = Arc::new(AtomicBool::new(false));

        let flag = Arc::clone(&delivered);
        let publisher = thread::spawn(move || {
            tx.publish(flush(1)).unwrap();
            flag.store(true, Ordering::SeqCst);
        });

        thread::sleep(Duration::from_millis(50));
        assert!(!delivered.load(Ordering::SeqCst));

        assert_eq!(rx.recv().unwrap().writes, 1);
        publisher.join().unwrap();
        assert!(delivered.load(Ordering::SeqCst));
    }

    #[test]
    fn publish_without_receiver_returns_descriptor() {
        let (tx, rx) = bounded(1);
        drop(rx);
        let back = tx.publish(flush(9)).unwrap_err();
        assert_eq!(back.writes, 9);
    }

    #[test]
    fn receiver_sees_disconnect() {
        let (tx, rx) = bounded(1);
        assert!(matches!(rx.try_recv(), Err(TryRecvError::Empty)));
        drop(tx);
        assert!(rx.recv().is_none());
        assert!(matches!(
            rx.recv_timeout(Duration::from_millis(1)),
            Err(RecvTimeoutError::Disconnected)
        ));
    }
}
