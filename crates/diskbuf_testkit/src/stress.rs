//! Stress helpers for DiskBuf.
//!
//! These drive a buffer from many threads at once.

use diskbuf_core::Buffer;
use std::sync::atomic::{AtomicU64, Ordering};
use std::thread;
use std::time::{Duration, Instant};

/// Result of a stress run.
#[derive(Debug, Clone)]
pub struct StressResult {
    /// Writes that succeeded.
    pub writes: u64,
    /// Bytes those writes carried.
    pub bytes: u64,
    /// Writes that returned an error.
    pub failed: u64,
    /// Wall time of the run.
    pub duration: Duration,
}

impl StressResult {
    /// Writes per second over the run.
    pub fn writes_per_second(&self) -> f64 {
        let secs = self.duration.as_secs_f64();
        if secs > 0.0 {
            (self.writes + self.failed) as f64 / secs
        } else {
            0.0
        }
    }
}

/// Configuration for a stress run.
#[derive(Debug, Clone)]
pub struct StressConfig {
    /// Number of writer threads.
    pub threads: usize,
    /// Writes per thread.
    pub writes_per_thread: usize,
    /// Size of each write.
    pub payload_size: usize,
}

impl Default for StressConfig {
    fn default() -> Self {
        Self {
            threads: 4,
            writes_per_thread: 1_000,
            payload_size: 64,
        }
    }
}

/// Writes from `config.threads` threads concurrently.
///
/// Each payload is one line: the thread number and write number, padded
/// with `.` to `payload_size` and ending in `\n` (payloads shorter than
/// the label are not padded).
pub fn concurrent_writes(buffer: &Buffer, config: &StressConfig) -> StressResult {
    let writes = AtomicU64::new(0);
    let bytes = AtomicU64::new(0);
    let failed = AtomicU64::new(0);

    let start = Instant::now();
    thread::scope(|scope| {
        for t in 0..config.threads {
            let (writes, bytes, failed) = (&writes, &bytes, &failed);
            scope.spawn(move || {
                for i in 0..config.writes_per_thread {
                    let payload = line(t, i, config.payload_size);
                    match buffer.write(&payload) {
                        Ok(n) => {
                            writes.fetch_add(1, Ordering::Relaxed);
                            bytes.fetch_add(n as u64, Ordering::Relaxed);
                        }
                        Err(_) => {
                            failed.fetch_add(1, Ordering::Relaxed);
                        }
                    }
                }
            });
        }
    });

    StressResult {
        writes: writes.into_inner(),
        bytes: bytes.into_inner(),
        failed: failed.into_inner(),
        duration: start.elapsed(),
    }
}

/// Builds the payload for write `i` of thread `t`.
pub fn line(t: usize, i: usize, size: usize) -> Vec<u8> {
    let mut payload = format!("{t}:{i}").into_bytes();
    while payload.len() + 1 < size {
        payload.push(b'.');
    }
    payload.push(b'\n');
    payload
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn line_is_padded() {
        assert_eq!(line(1, 2, 8), b"1:2....\n");
        assert_eq!(line(10, 20, 2), b"10:20\n");
    }

    #[test]
    fn throughput_with_no_time() {
        let result = StressResult {
            writes: 10,
            bytes: 10,
            failed: 0,
            duration: Duration::ZERO,
        };
        assert_eq!(result.writes_per_second(), 0.0);
    }
}
