//! Benchmark utilities.

use diskbuf_core::{Buffer, BufferBuilder, FlushReceiver};
use diskbuf_storage::SegmentStore;
use rand::Rng;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

/// Generate random payload data of the specified size.
pub fn random_data(size: usize) -> Vec<u8> {
    let mut rng = rand::thread_rng();
    (0..size).map(|_| rng.gen()).collect()
}

/// Generate a batch of random payloads.
pub fn random_payloads(count: usize, size: usize) -> Vec<Vec<u8>> {
    (0..count).map(|_| random_data(size)).collect()
}

/// A buffer whose closed segments are deleted by a background consumer,
/// so long runs stay within a bounded footprint.
pub struct Drained {
    /// The buffer under test.
    pub buffer: Buffer,
    drain: JoinHandle<u64>,
}

impl Drained {
    /// Opens `builder` on `store` and starts consuming its descriptors.
    pub fn open(builder: BufferBuilder, store: Arc<dyn SegmentStore>) -> Self {
        let buffer = builder.store(Arc::clone(&store)).open().unwrap();
        let rx = buffer.take_receiver().unwrap();
        Self {
            buffer,
            drain: thread::spawn(move || discard(rx, store.as_ref())),
        }
    }

    /// Closes the buffer and returns how many segments were consumed.
    pub fn finish(self) -> u64 {
        let Self { buffer, drain } = self;
        buffer.close().unwrap();
        drop(buffer);
        drain.join().unwrap()
    }
}

fn discard(rx: FlushReceiver, store: &dyn SegmentStore) -> u64 {
    let mut count = 0;
    for flush in rx {
        let _ = store.remove(&flush.path);
        count += 1;
    }
    count
}
