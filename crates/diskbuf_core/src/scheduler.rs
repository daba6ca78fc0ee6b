//! Background timer driving interval flushes.

use std::io;
use std::ops::ControlFlow;
use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

/// A thread that calls a tick function at a fixed period until stopped.
///
/// Ticks are scheduled against fixed deadlines. A tick that overruns the
/// period skips the deadlines it missed rather than firing in a burst.
/// Stopping joins the thread, so no tick is running once
/// [`IntervalScheduler::stop`] returns.
pub(crate) struct IntervalScheduler {
    stop: Option<Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl IntervalScheduler {
    /// Starts calling `tick` every `period`.
    ///
    /// The loop also ends early when `tick` returns `ControlFlow::Break`.
    pub(crate) fn start<F>(name: String, period: Duration, mut tick: F) -> io::Result<Self>
    where
        F: FnMut() -> ControlFlow<()> + Send + 'static,
    {
        let (stop_tx, stop_rx) = mpsc::channel::<()>();

        let handle = thread::Builder::new().name(name).spawn(move || {
            let mut deadline = Instant::now() + period;
            loop {
                let wait = deadline.saturating_duration_since(Instant::now());
                match stop_rx.recv_timeout(wait) {
                    Err(RecvTimeoutError::Timeout) => {
                        if tick().is_break() {
                            break;
                        }
                        let now = Instant::now();
                        deadline += period;
                        while deadline <= now {
                            deadline += period;
                        }
                    }
                    Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                }
            }
        })?;

        Ok(Self {
            stop: Some(stop_tx),
            handle: Some(handle),
        })
    }

    /// Returns whether the timer thread is still looping.
    pub(crate) fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|handle| !handle.is_finished())
    }

    /// Stops the loop and waits for an in-flight tick to finish.
    pub(crate) fn stop(mut self) {
        self.halt();
    }

    fn halt(&mut self) {
        // Dropping the sender wakes the loop.
        drop(self.stop.take());
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                tracing::error!("interval scheduler panicked");
            }
        }
    }
}

impl Drop for IntervalScheduler {
    fn drop(&mut self) {
        self.halt();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn counting(period: Duration) -> (IntervalScheduler, Arc<AtomicUsize>) {
        let ticks = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&ticks);
        let scheduler = IntervalScheduler::start("test-tick".into(), period, move || {
            counter.fetch_add(1, Ordering::SeqCst);
            ControlFlow::Continue(())
        })
        .unwrap();
        (scheduler, ticks)
    }

    #[test]
    fn ticks_repeatedly() {
        let (scheduler, ticks) = counting(Duration::from_millis(10));
        thread::sleep(Duration::from_millis(200));
        assert!(scheduler.is_running());
        scheduler.stop();
        assert!(ticks.load(Ordering::SeqCst) >= 3);
    }

    #[test]
    fn no_ticks_after_stop() {
        let (scheduler, ticks) = counting(Duration::from_millis(5));
        thread::sleep(Duration::from_millis(30));
        scheduler.stop();

        let seen = ticks.load(Ordering::SeqCst);
        thread::sleep(Duration::from_millis(30));
        assert_eq!(ticks.load(Ordering::SeqCst), seen);
    }

    #[test]
    fn stop_before_first_tick() {
        let (scheduler, ticks) = counting(Duration::from_secs(3600));
        let started = Instant::now();
        scheduler.stop();
        assert!(started.elapsed() < Duration::from_secs(5));
        assert_eq!(ticks.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn break_ends_loop() {
        let ticks = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&ticks);
        let scheduler = IntervalScheduler::start("test-break".into(), Duration::from_millis(5), move || {
            counter.fetch_add(1, Ordering::SeqCst);
            ControlFlow::Break(())
        })
        .unwrap();

        thread::sleep(Duration::from_millis(60));
        assert_eq!(ticks.load(Ordering::SeqCst), 1);
        assert!(!scheduler.is_running());
        drop(scheduler);
    }

    #[test]
    fn stop_waits_for_running_tick() {
        let finished = Arc::new(AtomicUsize::new(0));
        let flag = Arc::clone(&finished);
        let scheduler = IntervalScheduler::start("test-slow".into(), Duration::from_millis(5), move || {
            thread::sleep(Duration::from_millis(50));
            flag.fetch_add(1, Ordering::SeqCst);
            ControlFlow::Continue(())
        })
        .unwrap();

        thread::sleep(Duration::from_millis(20));
        scheduler.stop();
        let after_stop = finished.load(Ordering::SeqCst);
        assert!(after_stop >= 1);
        thread::sleep(Duration::from_millis(80));
        assert_eq!(finished.load(Ordering::SeqCst), after_stop);
    }
}
