//! Single-assignment future.
//!
//! A [`Promise`] is written once by a producer and read any number of times by
//! any number of consumers. Reads block until the value is present.

use std::sync::OnceLock;

use crate::barrier::Barrier;
use crate::error::{Result, SyncError};

/// A single-assignment cell whose readers block until it is set.
///
/// The value is stored before the internal [`Barrier`] opens, so every reader
/// released by the barrier observes the fully written value.
///
/// # Examples
///
/// ```rust
/// use rendezvous_sync::Promise;
/// use std::sync::Arc;
///
/// let promise = Arc::new(Promise::new());
/// let producer = promise.clone();
///
/// std::thread::spawn(move || {
///     producer.set(7).unwrap();
/// });
///
/// assert_eq!(*promise.wait(), 7);
/// ```
pub struct Promise<T> {
    value: OnceLock<T>,
    barrier: Barrier,
}

impl<T> Promise<T> {
    /// Creates an empty promise.
    pub fn new() -> Self {
        Self {
            value: OnceLock::new(),
            barrier: Barrier::new(),
        }
    }

    /// Stores `value` and releases every waiter.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::AlreadySet`] if a value was stored before. The
    /// original value is kept and `value` is dropped.
    pub fn set(&self, value: T) -> Result<()> {
        self.value.set(value).map_err(|_| SyncError::AlreadySet)?;
        // Only the caller that won the `OnceLock` race gets here, so the
        // barrier is unlocked exactly once.
        self.barrier.unlock();
        Ok(())
    }

    /// Blocks until the value is set, then returns it.
    pub fn wait(&self) -> &T {
        loop {
            if let Some(value) = self.value.get() {
                return value;
            }
            self.barrier.wait_for_unlock();
        }
    }

    /// Async counterpart of [`Promise::wait`].
    pub async fn wait_async(&self) -> &T {
        loop {
            if let Some(value) = self.value.get() {
                return value;
            }
            self.barrier.unlocked().await;
        }
    }

    /// Returns the value if it has been set, without blocking.
    pub fn get(&self) -> Option<&T> {
        self.value.get()
    }

    /// Returns `true` once a value has been stored.
    pub fn is_set(&self) -> bool {
        self.value.get().is_some()
    }
}

impl<T> Default for Promise<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: std::fmt::Debug> std::fmt::Debug for Promise<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Promise")
            .field("value", &self.value.get())
            .finish()
    }
}
