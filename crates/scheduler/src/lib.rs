//! PDF Binder Scheduler Library
//!
//! Cancellable, batch-bounded background execution for thumbnail work.
//!
//! This crate provides the concurrency machinery the page collection builds
//! on: cooperative cancellation tokens, a pending-task registry that keeps
//! at most one live task per key, and a batch runner that processes work in
//! fixed-size groups so peak concurrency stays bounded.
//!
//! # Example
//!
//! ```
//! use pdf_binder_scheduler::{BatchRunner, TaskRegistry};
//!
//! let registry: TaskRegistry<u64> = TaskRegistry::new();
//! let runner = BatchRunner::new(2);
//!
//! let pages: Vec<u64> = vec![1, 2, 3];
//! let tokens: Vec<_> = pages.iter().map(|id| (*id, registry.begin(*id))).collect();
//!
//! let worker_registry = registry.clone();
//! let handle = runner.run(tokens, move |(id, token)| {
//!     if !token.is_cancelled() {
//!         // ... render page `id` ...
//!     }
//!     worker_registry.complete(&id, &token);
//! });
//!
//! handle.wait();
//! assert!(registry.is_empty());
//! ```

mod batch;
mod cancel;

// Re-export public API
pub use batch::{BatchHandle, BatchRunner, DEFAULT_BATCH_SIZE};
pub use cancel::{CancellationToken, TaskRegistry};
