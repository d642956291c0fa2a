//! One-time gate.
//!
//! A [`Barrier`] starts locked and is opened exactly once by a producer. Any
//! number of consumers can wait for that transition, either by blocking the
//! calling thread ([`Barrier::wait_for_unlock`]) or from async code
//! ([`Barrier::unlocked`]). Once open, the barrier stays open and every later
//! wait returns immediately.
//!
//! # Examples
//!
//! ```rust
//! use rendezvous_sync::Barrier;
//! use std::sync::Arc;
//!
//! let barrier = Arc::new(Barrier::new());
//! let producer = barrier.clone();
//!
//! let handle = std::thread::spawn(move || {
//!     producer.unlock();
//! });
//!
//! barrier.wait_for_unlock();
//! assert!(barrier.is_unlocked());
//! handle.join().unwrap();
//! ```

use parking_lot::{Condvar, Mutex};
use tokio::sync::Notify;
use tracing::trace;

use crate::error::{Result, SyncError};

/// A one-time gate that blocks waiters until a single unlock.
///
/// Waiting is idempotent: it may happen any number of times, before or after
/// the unlock, from any number of threads. Unlocking is allowed exactly once;
/// [`Barrier::unlock`] panics on a second call and [`Barrier::try_unlock`]
/// reports it as [`SyncError::DoubleUnlock`].
pub struct Barrier {
    /// Monotonic: flips from `false` to `true` once.
    unlocked: Mutex<bool>,
    /// Wakes threads parked in `wait_for_unlock`.
    condvar: Condvar,
    /// Wakes tasks suspended in `unlocked`.
    notify: Notify,
}

impl Barrier {
    /// Creates a locked barrier.
    pub fn new() -> Self {
        Self {
            unlocked: Mutex::new(false),
            condvar: Condvar::new(),
            notify: Notify::new(),
        }
    }

    /// Returns `true` once the barrier has been unlocked.
    pub fn is_unlocked(&self) -> bool {
        *self.unlocked.lock()
    }

    /// Blocks the calling thread until the barrier is unlocked.
    ///
    /// Returns immediately if the barrier is already open.
    pub fn wait_for_unlock(&self) {
        let mut unlocked = self.unlocked.lock();
        while !*unlocked {
            self.condvar.wait(&mut unlocked);
        }
    }

    /// Waits for the barrier to open without blocking the executor thread.
    pub async fn unlocked(&self) {
        loop {
            let notified = self.notify.notified();
            tokio::pin!(notified);
            // Register before checking the flag so an unlock racing with this
            // check cannot be missed.
            notified.as_mut().enable();

            if self.is_unlocked() {
                return;
            }

            notified.await;
        }
    }

    /// Opens the barrier and releases every waiter.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::DoubleUnlock`] if the barrier was already open. The
    /// barrier stays open in that case.
    pub fn try_unlock(&self) -> Result<()> {
        {
            let mut unlocked = self.unlocked.lock();
            if *unlocked {
                return Err(SyncError::DoubleUnlock);
            }
            *unlocked = true;
        }

        self.condvar.notify_all();
        self.notify.notify_waiters();
        trace!("barrier unlocked");
        Ok(())
    }

    /// Opens the barrier and releases every waiter.
    ///
    /// # Panics
    ///
    /// Panics if the barrier has already been unlocked. A second unlock is a
    /// programmer error, not a recoverable condition.
    pub fn unlock(&self) {
        if let Err(err) = self.try_unlock() {
            panic!("{err}");
        }
    }
}

impl Default for Barrier {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Barrier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Barrier")
            .field("unlocked", &self.is_unlocked())
            .finish()
    }
}
