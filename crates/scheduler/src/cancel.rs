//! Cooperative cancellation for render tasks
//!
//! Render work is cancelled by flipping a shared atomic flag that the
//! worker observes at defined checkpoints. Cancellation is advisory: a
//! worker that has already passed its last checkpoint is allowed to finish.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc, Mutex,
};

/// Cancellation token observed by render workers at checkpoints.
///
/// All clones share the same underlying flag. Cancelling is idempotent and
/// never blocks.
///
/// # Example
///
/// ```
/// use pdf_binder_scheduler::CancellationToken;
///
/// let token = CancellationToken::new();
/// let worker_token = token.clone();
///
/// token.cancel();
/// assert!(worker_token.is_cancelled());
/// ```
#[derive(Clone)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    /// Create a token in the non-cancelled state.
    pub fn new() -> Self {
        Self {
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Flip the flag. Every clone observes the cancellation.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    /// Check whether `cancel()` has been called on this token or any clone.
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }

    /// Check whether two tokens share the same underlying flag.
    ///
    /// Used by [`TaskRegistry::complete`] to tell a finishing worker's token
    /// apart from a replacement installed for the same key.
    pub fn same_as(&self, other: &CancellationToken) -> bool {
        Arc::ptr_eq(&self.cancelled, &other.cancelled)
    }
}

impl Default for CancellationToken {
    fn default() -> Self {
        Self::new()
    }
}

/// Registry of in-flight tasks keyed by caller-chosen identity.
///
/// Holds at most one token per key. Starting a task for a key that already
/// has one cancels the old token and installs a fresh one, so duplicate
/// scheduling for the same page never produces two live render tasks.
///
/// # Example
///
/// ```
/// use pdf_binder_scheduler::TaskRegistry;
///
/// let registry: TaskRegistry<u64> = TaskRegistry::new();
///
/// let first = registry.begin(7);
/// let second = registry.begin(7);
///
/// // The replaced task sees the cancellation, the new one does not.
/// assert!(first.is_cancelled());
/// assert!(!second.is_cancelled());
/// assert_eq!(registry.len(), 1);
/// ```
pub struct TaskRegistry<K> {
    tokens: Arc<Mutex<HashMap<K, CancellationToken>>>,
}

impl<K: Eq + Hash + Clone> TaskRegistry<K> {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            tokens: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Register a task for `key` and return its token.
    ///
    /// Any token already registered for `key` is cancelled and replaced.
    pub fn begin(&self, key: K) -> CancellationToken {
        let token = CancellationToken::new();
        let mut tokens = self.tokens.lock().unwrap();
        if let Some(old) = tokens.insert(key, token.clone()) {
            old.cancel();
        }
        token
    }

    /// Cancel the task registered for `key`, leaving it registered until the
    /// worker completes. Returns `true` if a task was found.
    pub fn cancel(&self, key: &K) -> bool {
        let tokens = self.tokens.lock().unwrap();
        match tokens.get(key) {
            Some(token) => {
                token.cancel();
                true
            }
            None => false,
        }
    }

    /// Cancel every task in `keys`. Returns how many were found.
    pub fn cancel_many(&self, keys: &[K]) -> usize {
        let tokens = self.tokens.lock().unwrap();
        let mut cancelled = 0;
        for key in keys {
            if let Some(token) = tokens.get(key) {
                token.cancel();
                cancelled += 1;
            }
        }
        cancelled
    }

    /// Cancel every registered task. Returns how many there were.
    pub fn cancel_all(&self) -> usize {
        let tokens = self.tokens.lock().unwrap();
        for token in tokens.values() {
            token.cancel();
        }
        tokens.len()
    }

    /// Unregister `key`, but only if `token` is still the registered one.
    ///
    /// A worker finishing after its task was replaced must not remove the
    /// replacement, so completion is identity-checked. Returns `true` if the
    /// entry was removed.
    pub fn complete(&self, key: &K, token: &CancellationToken) -> bool {
        let mut tokens = self.tokens.lock().unwrap();
        if tokens.get(key).is_some_and(|t| t.same_as(token)) {
            tokens.remove(key);
            true
        } else {
            false
        }
    }

    /// Check whether a task is registered for `key`.
    pub fn contains(&self, key: &K) -> bool {
        self.tokens.lock().unwrap().contains_key(key)
    }

    /// Get the number of registered tasks.
    pub fn len(&self) -> usize {
        self.tokens.lock().unwrap().len()
    }

    /// Check whether no tasks are registered.
    pub fn is_empty(&self) -> bool {
        self.tokens.lock().unwrap().is_empty()
    }

    /// Drop every entry without cancelling the tokens.
    pub fn clear(&self) {
        self.tokens.lock().unwrap().clear();
    }
}

impl<K: Eq + Hash + Clone> Default for TaskRegistry<K> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K> Clone for TaskRegistry<K> {
    fn clone(&self) -> Self {
        Self {
            tokens: Arc::clone(&self.tokens),
        }
    }
}
