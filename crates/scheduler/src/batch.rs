//! Batched execution of render work
//!
//! Runs a list of work items in fixed-size batches: every item of a batch
//! executes concurrently on its own thread, and the next batch starts only
//! after the previous one has fully settled. This bounds peak concurrency
//! to the batch size no matter how many items were submitted at once.

use std::sync::Arc;
use std::thread::{self, JoinHandle};

/// Default number of items processed concurrently per batch.
pub const DEFAULT_BATCH_SIZE: usize = 5;

/// Executes work items in sequential batches of bounded concurrency.
///
/// The runner itself holds no threads; each [`run`](BatchRunner::run) call
/// spawns a coordinator thread that works through the items and exits.
///
/// # Example
///
/// ```
/// use pdf_binder_scheduler::BatchRunner;
/// use std::sync::atomic::{AtomicUsize, Ordering};
/// use std::sync::Arc;
///
/// let runner = BatchRunner::new(2);
/// let done = Arc::new(AtomicUsize::new(0));
/// let done_clone = done.clone();
///
/// let handle = runner.run(vec![1, 2, 3], move |_item| {
///     done_clone.fetch_add(1, Ordering::SeqCst);
/// });
///
/// handle.wait();
/// assert_eq!(done.load(Ordering::SeqCst), 3);
/// ```
#[derive(Debug, Clone)]
pub struct BatchRunner {
    batch_size: usize,
}

impl BatchRunner {
    /// Create a runner with the given batch size (clamped to at least 1).
    pub fn new(batch_size: usize) -> Self {
        Self {
            batch_size: batch_size.max(1),
        }
    }

    /// Get the batch size.
    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Process `items` with `worker`, batch by batch.
    ///
    /// Returns immediately; the coordinator thread runs in the background.
    /// Within a batch every item gets its own thread and no completion order
    /// is guaranteed; batch `k + 1` never starts before every thread of
    /// batch `k` has been joined.
    pub fn run<T, F>(&self, items: Vec<T>, worker: F) -> BatchHandle
    where
        T: Send + 'static,
        F: Fn(T) + Send + Sync + 'static,
    {
        let batch_size = self.batch_size;
        let worker = Arc::new(worker);

        let coordinator = thread::Builder::new()
            .name("binder-batch-coordinator".to_string())
            .spawn(move || {
                let mut pending = items.into_iter();
                loop {
                    let batch: Vec<T> = pending.by_ref().take(batch_size).collect();
                    if batch.is_empty() {
                        break;
                    }

                    let mut threads = Vec::with_capacity(batch.len());
                    for item in batch {
                        let worker = Arc::clone(&worker);
                        let handle = thread::Builder::new()
                            .name("binder-render-worker".to_string())
                            .spawn(move || worker(item))
                            .expect("Failed to spawn render worker thread");
                        threads.push(handle);
                    }

                    // Settle the whole batch before moving on. A panicking
                    // worker only loses its own item.
                    for handle in threads {
                        let _ = handle.join();
                    }
                }
            })
            .expect("Failed to spawn batch coordinator thread");

        BatchHandle {
            thread: Some(coordinator),
        }
    }
}

impl Default for BatchRunner {
    fn default() -> Self {
        Self::new(DEFAULT_BATCH_SIZE)
    }
}

/// Handle to a running batch execution.
///
/// Dropping the handle detaches the run; it keeps going in the background.
pub struct BatchHandle {
    thread: Option<JoinHandle<()>>,
}

impl BatchHandle {
    /// Check whether every batch has settled.
    pub fn is_finished(&self) -> bool {
        self.thread.as_ref().map_or(true, |t| t.is_finished())
    }

    /// Block until every batch has settled.
    pub fn wait(mut self) {
        if let Some(thread) = self.thread.take() {
            thread.join().expect("Batch coordinator thread panicked");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::time::Duration;

    #[test]
    fn test_batch_size_clamped() {
        let runner = BatchRunner::new(0);
        assert_eq!(runner.batch_size(), 1);
    }

    #[test]
    fn test_default_batch_size() {
        let runner = BatchRunner::default();
        assert_eq!(runner.batch_size(), DEFAULT_BATCH_SIZE);
    }

    #[test]
    fn test_all_items_processed() {
        let runner = BatchRunner::new(3);
        let sum = Arc::new(AtomicUsize::new(0));
        let sum_clone = sum.clone();

        let handle = runner.run((1..=10).collect(), move |item: usize| {
            sum_clone.fetch_add(item, Ordering::SeqCst);
        });

        handle.wait();
        assert_eq!(sum.load(Ordering::SeqCst), 55);
    }

    #[test]
    fn test_empty_item_list() {
        let runner = BatchRunner::new(4);
        let handle = runner.run(Vec::<u32>::new(), |_| {});
        handle.wait();
    }

    #[test]
    fn test_concurrency_never_exceeds_batch_size() {
        let runner = BatchRunner::new(5);
        let in_flight = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));
        let in_flight_clone = in_flight.clone();
        let peak_clone = peak.clone();

        let handle = runner.run((0..12).collect(), move |_item: usize| {
            let now = in_flight_clone.fetch_add(1, Ordering::SeqCst) + 1;
            peak_clone.fetch_max(now, Ordering::SeqCst);
            thread::sleep(Duration::from_millis(30));
            in_flight_clone.fetch_sub(1, Ordering::SeqCst);
        });

        handle.wait();
        assert!(
            peak.load(Ordering::SeqCst) <= 5,
            "observed {} concurrent workers",
            peak.load(Ordering::SeqCst)
        );
    }

    #[test]
    fn test_next_batch_waits_for_previous() {
        let runner = BatchRunner::new(3);
        let gate = Arc::new(AtomicBool::new(false));
        let started = Arc::new(AtomicUsize::new(0));
        let gate_clone = gate.clone();
        let started_clone = started.clone();

        let handle = runner.run((0..6).collect(), move |_item: usize| {
            started_clone.fetch_add(1, Ordering::SeqCst);
            while !gate_clone.load(Ordering::SeqCst) {
                thread::sleep(Duration::from_millis(1));
            }
        });

        // Give the first batch time to start; the second must be held back.
        thread::sleep(Duration::from_millis(100));
        assert_eq!(started.load(Ordering::SeqCst), 3);

        gate.store(true, Ordering::SeqCst);
        handle.wait();
        assert_eq!(started.load(Ordering::SeqCst), 6);
    }

    #[test]
    fn test_handle_is_finished() {
        let runner = BatchRunner::new(2);
        let handle = runner.run(vec![1, 2], |_: i32| {});

        // Settles quickly with trivial workers.
        for _ in 0..100 {
            if handle.is_finished() {
                break;
            }
            thread::sleep(Duration::from_millis(5));
        }
        assert!(handle.is_finished());
        handle.wait();
    }

    #[test]
    fn test_worker_panic_does_not_poison_run() {
        let runner = BatchRunner::new(2);
        let done = Arc::new(AtomicUsize::new(0));
        let done_clone = done.clone();

        let handle = runner.run((0..4).collect(), move |item: usize| {
            if item == 1 {
                panic!("worker panic");
            }
            done_clone.fetch_add(1, Ordering::SeqCst);
        });

        handle.wait();
        assert_eq!(done.load(Ordering::SeqCst), 3);
    }
}
