//! Single-thread FIFO queue.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::thread::{self, JoinHandle, ThreadId};

use parking_lot::Mutex;
use rendezvous_bridge::{error::BridgeError, panic_message, Job, Result};
use tokio::sync::mpsc;
use tracing::{debug, error};

/// A named queue that runs jobs one at a time, in submission order, on one
/// dedicated thread.
///
/// A panicking job is logged and does not take the queue down. Dropping the
/// queue (or calling [`SerialQueue::shutdown`]) stops accepting work, lets the
/// thread drain what is already queued, and joins it.
pub struct SerialQueue {
    name: String,
    sender: Mutex<Option<mpsc::UnboundedSender<Job>>>,
    thread: Mutex<Option<JoinHandle<()>>>,
    thread_id: ThreadId,
}

impl SerialQueue {
    /// Starts the queue's thread.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::Io`] if the OS refuses to create the thread.
    pub fn spawn(name: impl Into<String>, stack_size: Option<usize>) -> Result<Self> {
        let name = name.into();
        let (sender, mut receiver) = mpsc::unbounded_channel::<Job>();

        let mut builder = thread::Builder::new().name(name.clone());
        if let Some(bytes) = stack_size {
            builder = builder.stack_size(bytes);
        }

        let queue_name = name.clone();
        let handle = builder.spawn(move || {
            debug!(queue = %queue_name, "Serial queue started");
            while let Some(job) = receiver.blocking_recv() {
                if let Err(panic) = catch_unwind(AssertUnwindSafe(job)) {
                    error!(
                        queue = %queue_name,
                        panic = %panic_message(panic.as_ref()),
                        "Job panicked on serial queue"
                    );
                }
            }
            debug!(queue = %queue_name, "Serial queue stopped");
        })?;

        let thread_id = handle.thread().id();

        Ok(Self {
            name,
            sender: Mutex::new(Some(sender)),
            thread: Mutex::new(Some(handle)),
            thread_id,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Identity of the thread every job runs on.
    pub fn thread_id(&self) -> ThreadId {
        self.thread_id
    }

    /// Returns `true` when called from inside a job on this queue.
    pub fn is_current(&self) -> bool {
        thread::current().id() == self.thread_id
    }

    /// Enqueues `job` behind everything submitted before it.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::QueueClosed`] after shutdown. The job is dropped.
    pub fn submit(&self, job: Job) -> Result<()> {
        let sender = self.sender.lock();
        match sender.as_ref() {
            Some(sender) => sender
                .send(job)
                .map_err(|_| BridgeError::QueueClosed(self.name.clone())),
            None => Err(BridgeError::QueueClosed(self.name.clone())),
        }
    }

    /// Stops accepting work, drains queued jobs and joins the thread.
    ///
    /// Called from a job on this queue it only closes the queue; the thread
    /// exits once the current job and anything queued behind it are done.
    pub fn shutdown(&self) {
        if self.sender.lock().take().is_none() {
            return;
        }

        if self.is_current() {
            return;
        }

        if let Some(handle) = self.thread.lock().take() {
            if handle.join().is_err() {
                error!(queue = %self.name, "Serial queue thread panicked");
            }
        }
    }
}

impl Drop for SerialQueue {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl std::fmt::Debug for SerialQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SerialQueue")
            .field("name", &self.name)
            .field("thread_id", &self.thread_id)
            .finish_non_exhaustive()
    }
}
