//! Deterministic execution service for tests.

use std::collections::HashSet;

use parking_lot::Mutex;
use rendezvous_bridge::{
    error::{BridgeError, Result},
    ExecutionService, Job, QueueId,
};
use tracing::trace;

/// Runs every job immediately on the submitting thread.
///
/// Submission returns only after the job has finished, so results are
/// available as soon as `submit` returns and test outcomes do not depend on
/// thread scheduling. The service records which queue each job was routed to
/// and can be told to reject a queue, to exercise rejection paths.
///
/// Meant for single-threaded tests: [`ExecutionService::is_current`] reports
/// the queue of the job currently running, whichever thread asks.
#[derive(Default)]
pub struct InlineExecutionService {
    submitted: Mutex<Vec<QueueId>>,
    closed: Mutex<HashSet<QueueId>>,
    running: Mutex<Vec<QueueId>>,
}

impl InlineExecutionService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues of every accepted job, in submission order.
    pub fn submitted(&self) -> Vec<QueueId> {
        self.submitted.lock().clone()
    }

    /// Rejects every later submission to `queue`.
    pub fn close(&self, queue: QueueId) {
        self.closed.lock().insert(queue);
    }
}

impl ExecutionService for InlineExecutionService {
    fn submit(&self, queue: QueueId, job: Job) -> Result<()> {
        if self.closed.lock().contains(&queue) {
            return Err(BridgeError::QueueUnavailable(queue));
        }

        self.submitted.lock().push(queue);
        trace!(%queue, "Running job inline");

        self.running.lock().push(queue);
        // Popped by the guard so a panicking job cannot leave its queue marked
        // as running.
        let _running = RunningGuard(&self.running);
        job();
        Ok(())
    }

    fn is_current(&self, queue: QueueId) -> bool {
        self.running.lock().last() == Some(&queue)
    }
}

struct RunningGuard<'a>(&'a Mutex<Vec<QueueId>>);

impl Drop for RunningGuard<'_> {
    fn drop(&mut self) {
        self.0.lock().pop();
    }
}
