//! Handle to the outcome of dispatched work.

use std::sync::Arc;

use rendezvous_bridge::QueueId;
use rendezvous_sync::{Awaitable, Promise};
use tracing::{debug, error};

use crate::error::{Result, TaskError};

type Outcome<T> = Result<T>;

/// Blocking handle to work submitted through a [`Dispatcher`](crate::Dispatcher).
///
/// The outcome is computed once, by the queue the work was routed to. Every
/// wait, from any number of threads and clones of the handle, returns that
/// same outcome.
///
/// # Examples
///
/// ```ignore
/// let task = dispatcher.run(|| 21 * 2);
/// assert_eq!(task.wait(), Ok(&42));
/// assert_eq!(task.wait(), Ok(&42));
/// ```
pub struct AwaitableTask<T> {
    promise: Arc<Promise<Outcome<T>>>,
    queue: QueueId,
}

impl<T> AwaitableTask<T> {
    /// Creates an unresolved task and the completion that resolves it.
    pub(crate) fn pending(queue: QueueId) -> (Self, Completion<T>) {
        let promise = Arc::new(Promise::new());
        let completion = Completion {
            promise: Some(promise.clone()),
            queue,
        };
        (Self { promise, queue }, completion)
    }

    /// Blocks until the work has finished and returns its outcome.
    pub fn wait(&self) -> Result<&T> {
        borrow_outcome(self.promise.wait())
    }

    /// Async counterpart of [`AwaitableTask::wait`].
    pub async fn wait_async(&self) -> Result<&T> {
        borrow_outcome(self.promise.wait_async().await)
    }

    /// Returns `true` once the outcome is available.
    pub fn is_finished(&self) -> bool {
        self.promise.is_set()
    }

    /// Queue the work was routed to.
    pub fn queue(&self) -> QueueId {
        self.queue
    }

    /// Waits, then returns an owned copy of the outcome.
    pub fn into_result(self) -> Result<T>
    where
        T: Clone,
    {
        self.wait().cloned()
    }
}

impl<T> Clone for AwaitableTask<T> {
    fn clone(&self) -> Self {
        Self {
            promise: self.promise.clone(),
            queue: self.queue,
        }
    }
}

impl<T> Awaitable for AwaitableTask<T> {
    type Output<'a>
        = Result<&'a T>
    where
        Self: 'a;

    fn wait(&self) -> Result<&T> {
        AwaitableTask::wait(self)
    }
}

impl<T: std::fmt::Debug> std::fmt::Debug for AwaitableTask<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AwaitableTask")
            .field("queue", &self.queue)
            .field("outcome", &self.promise.get())
            .finish()
    }
}

fn borrow_outcome<T>(outcome: &Outcome<T>) -> Result<&T> {
    outcome.as_ref().map_err(Clone::clone)
}

/// Write side of an [`AwaitableTask`].
///
/// Dropping it unresolved resolves the task as [`TaskError::Abandoned`], so
/// waiters are released even when the job carrying it never runs.
pub(crate) struct Completion<T> {
    promise: Option<Arc<Promise<Outcome<T>>>>,
    queue: QueueId,
}

impl<T> Completion<T> {
    pub(crate) fn resolve(mut self, outcome: Outcome<T>) {
        if let Some(promise) = self.promise.take() {
            store(&promise, self.queue, outcome);
        }
    }
}

impl<T> Drop for Completion<T> {
    fn drop(&mut self) {
        if let Some(promise) = self.promise.take() {
            debug!(queue = %self.queue, "Task dropped before it ran");
            store(&promise, self.queue, Err(TaskError::Abandoned { queue: self.queue }));
        }
    }
}

fn store<T>(promise: &Promise<Outcome<T>>, queue: QueueId, outcome: Outcome<T>) {
    // A completion is the promise's only writer and resolves at most once.
    if promise.set(outcome).is_err() {
        error!(%queue, "Task outcome was already stored");
    }
}
