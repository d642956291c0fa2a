//! Submits work to named queues.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use rendezvous_bridge::{panic_message, ExecutionService, Job, QueueId};
use tracing::{debug, error, warn};

use crate::error::{Result, TaskError};
use crate::task::AwaitableTask;

/// Routes computations to the queues of an [`ExecutionService`] and hands
/// back an [`AwaitableTask`] for each.
///
/// The dispatcher owns no threads. Cloning it shares the same service.
///
/// # Deadlocks
///
/// Waiting, from inside a job on [`QueueId::Main`], on a task that was itself
/// sent to [`QueueId::Main`] never returns: the awaited job is queued behind
/// the one doing the waiting.
///
/// # Examples
///
/// ```ignore
/// use std::sync::Arc;
/// use rendezvous_executor::TokioExecutionService;
/// use rendezvous_task::Dispatcher;
///
/// let dispatcher = Dispatcher::new(Arc::new(TokioExecutionService::new()?));
///
/// let squares: Vec<_> = (0..10u64).map(|i| dispatcher.run(move || i * i)).collect();
/// for (i, task) in squares.iter().enumerate() {
///     assert_eq!(*task.wait()?, (i * i) as u64);
/// }
/// ```
#[derive(Clone)]
pub struct Dispatcher {
    service: Arc<dyn ExecutionService>,
}

impl Dispatcher {
    pub fn new(service: Arc<dyn ExecutionService>) -> Self {
        Self { service }
    }

    /// The execution service work is submitted to.
    pub fn service(&self) -> &Arc<dyn ExecutionService> {
        &self.service
    }

    /// Runs `work` on the shared pool.
    pub fn run<T, F>(&self, work: F) -> AwaitableTask<T>
    where
        F: FnOnce() -> T + Send + 'static,
        T: Send + Sync + 'static,
    {
        self.run_in_queue(QueueId::Default, work)
    }

    /// Runs `work` on the background pool.
    pub fn run_in_background<T, F>(&self, work: F) -> AwaitableTask<T>
    where
        F: FnOnce() -> T + Send + 'static,
        T: Send + Sync + 'static,
    {
        self.run_in_queue(QueueId::Background, work)
    }

    /// Runs `work` on the serial main queue, after everything queued there
    /// before it.
    pub fn run_in_main_queue<T, F>(&self, work: F) -> AwaitableTask<T>
    where
        F: FnOnce() -> T + Send + 'static,
        T: Send + Sync + 'static,
    {
        self.run_in_queue(QueueId::Main, work)
    }

    /// Submits `work` to `queue` and returns immediately.
    ///
    /// The returned task resolves to the value `work` returns, to
    /// [`TaskError::Panicked`] if it panics, or to [`TaskError::Abandoned`] if
    /// the service drops it without running it (for example because the queue
    /// rejected the submission).
    pub fn run_in_queue<T, F>(&self, queue: QueueId, work: F) -> AwaitableTask<T>
    where
        F: FnOnce() -> T + Send + 'static,
        T: Send + Sync + 'static,
    {
        let (task, completion) = AwaitableTask::pending(queue);

        let job: Job = Box::new(move || {
            let outcome = catch_unwind(AssertUnwindSafe(work)).map_err(|panic| {
                let message = panic_message(panic.as_ref());
                error!(%queue, panic = %message, "Task panicked");
                TaskError::Panicked { queue, message }
            });
            completion.resolve(outcome);
        });

        debug!(%queue, "Submitting task");
        if let Err(e) = self.service.submit(queue, job) {
            warn!(%queue, error = %e, "Task submission rejected");
        }

        task
    }

    /// Runs `work` on the shared pool and blocks until it has finished.
    pub fn run_and_await<T, F>(&self, work: F) -> Result<T>
    where
        F: FnOnce() -> T + Send + 'static,
        T: Clone + Send + Sync + 'static,
    {
        self.run(work).into_result()
    }

    /// Runs `work` on the main queue and blocks until it has finished.
    ///
    /// Must not be called from the main queue itself; see the type-level
    /// notes on deadlocks.
    pub fn run_on_main_and_await<T, F>(&self, work: F) -> Result<T>
    where
        F: FnOnce() -> T + Send + 'static,
        T: Clone + Send + Sync + 'static,
    {
        if self.service.is_current(QueueId::Main) {
            warn!("Blocking the main queue on work queued behind it");
        }
        self.run_in_main_queue(work).into_result()
    }
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockall::mock;
    use mockall::predicate::{always, eq};
    use rendezvous_bridge::{BridgeError, Result as BridgeResult};
    use rendezvous_executor::InlineExecutionService;
    use std::sync::atomic::{AtomicUsize, Ordering};

    mock! {
        Service {}

        impl ExecutionService for Service {
            fn submit(&self, queue: QueueId, job: Job) -> BridgeResult<()>;
            fn is_current(&self, queue: QueueId) -> bool;
        }
    }

    fn routed_to(queue: QueueId) -> MockService {
        let mut service = MockService::new();
        service
            .expect_submit()
            .with(eq(queue), always())
            .times(1)
            .returning(|_, job| {
                job();
                Ok(())
            });
        service
    }

    #[test]
    fn test_run_routes_to_default_queue() {
        let dispatcher = Dispatcher::new(Arc::new(routed_to(QueueId::Default)));
        let task = dispatcher.run(|| 21 * 2);

        assert_eq!(task.queue(), QueueId::Default);
        assert_eq!(task.wait(), Ok(&42));
    }

    #[test]
    fn test_run_in_background_routes_to_background_queue() {
        let dispatcher = Dispatcher::new(Arc::new(routed_to(QueueId::Background)));
        let task = dispatcher.run_in_background(|| "cleaned");

        assert_eq!(task.wait(), Ok(&"cleaned"));
    }

    #[test]
    fn test_run_in_main_queue_routes_to_main_queue() {
        let dispatcher = Dispatcher::new(Arc::new(routed_to(QueueId::Main)));
        let task = dispatcher.run_in_main_queue(|| String::from("ui"));

        assert_eq!(task.wait().map(String::as_str), Ok("ui"));
    }

    #[test]
    fn test_rejected_submission_abandons_task() {
        let mut service = MockService::new();
        service
            .expect_submit()
            .returning(|queue, _| Err(BridgeError::QueueUnavailable(queue)));

        let dispatcher = Dispatcher::new(Arc::new(service));
        let task = dispatcher.run_in_background(|| 1);

        assert!(task.is_finished());
        assert_eq!(
            task.wait(),
            Err(TaskError::Abandoned {
                queue: QueueId::Background
            })
        );
    }

    #[test]
    fn test_computation_runs_once() {
        let service = Arc::new(InlineExecutionService::new());
        let dispatcher = Dispatcher::new(service.clone());
        let runs = Arc::new(AtomicUsize::new(0));

        let counter = runs.clone();
        let task = dispatcher.run(move || counter.fetch_add(1, Ordering::SeqCst) + 10);

        assert_eq!(task.wait(), Ok(&10));
        assert_eq!(task.wait(), Ok(&10));
        assert_eq!(runs.load(Ordering::SeqCst), 1);
        assert_eq!(service.submitted(), vec![QueueId::Default]);
    }

    #[test]
    fn test_panic_is_reported_not_propagated() {
        let dispatcher = Dispatcher::new(Arc::new(InlineExecutionService::new()));
        let task = dispatcher.run_in_main_queue(|| -> u32 { panic!("bad input") });

        assert_eq!(
            task.wait(),
            Err(TaskError::Panicked {
                queue: QueueId::Main,
                message: "bad input".to_string(),
            })
        );
    }

    #[test]
    fn test_closed_queue_abandons_only_that_queue() {
        let service = Arc::new(InlineExecutionService::new());
        service.close(QueueId::Main);
        let dispatcher = Dispatcher::new(service.clone());

        let main = dispatcher.run_in_main_queue(|| 1);
        let pool = dispatcher.run(|| 2);

        assert_eq!(main.wait(), Err(TaskError::Abandoned { queue: QueueId::Main }));
        assert_eq!(pool.wait(), Ok(&2));
        assert_eq!(service.submitted(), vec![QueueId::Default]);
    }

    #[test]
    fn test_sugar_returns_owned_values() {
        let dispatcher = Dispatcher::new(Arc::new(InlineExecutionService::new()));

        assert_eq!(dispatcher.run_and_await(|| vec![1, 2]), Ok(vec![1, 2]));
        assert_eq!(dispatcher.run_on_main_and_await(|| 7), Ok(7));
    }

    #[test]
    fn test_nested_dispatch_from_a_job() {
        let service = Arc::new(InlineExecutionService::new());
        let dispatcher = Dispatcher::new(service.clone());

        let inner = dispatcher.clone();
        let task = dispatcher.run_in_background(move || {
            let on_main = inner.run_in_main_queue(|| 20);
            *on_main.wait().unwrap() + 1
        });

        assert_eq!(task.wait(), Ok(&21));
        assert_eq!(service.submitted(), vec![QueueId::Background, QueueId::Main]);
    }

    #[test]
    fn test_main_and_await_checks_current_queue() {
        let mut service = routed_to(QueueId::Main);
        service
            .expect_is_current()
            .with(eq(QueueId::Main))
            .times(1)
            .return_const(false);

        let dispatcher = Dispatcher::new(Arc::new(service));
        assert_eq!(dispatcher.run_on_main_and_await(|| 3), Ok(3));
    }
}
