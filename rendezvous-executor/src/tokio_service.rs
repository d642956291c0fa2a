//! Tokio-backed execution service.

use std::cell::Cell;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, OnceLock};
use std::thread::ThreadId;

use rendezvous_bridge::{
    error::{BridgeError, Result},
    panic_message, ExecutionService, Job, QueueId,
};
use rendezvous_runtime::config::ExecutorConfig;
use tokio::runtime::{Builder, Runtime};
use tracing::{debug, error, trace};

use crate::serial::SerialQueue;

static NEXT_SERVICE_ID: AtomicUsize = AtomicUsize::new(1);

thread_local! {
    /// Service and queue of the pool job running on this thread, if any.
    static RUNNING_JOB: Cell<Option<(usize, QueueId)>> = const { Cell::new(None) };
}

/// Execution service for desktop and server processes.
///
/// | Queue | Backing |
/// |-------|---------|
/// | [`QueueId::Default`] | blocking pool of a tokio runtime, `worker_threads` wide |
/// | [`QueueId::Background`] | blocking pool of a second tokio runtime, `background_threads` wide |
/// | [`QueueId::Main`] | a [`SerialQueue`] on one dedicated thread |
///
/// The background pool is kept separate so background work can never occupy
/// the threads the default pool needs.
///
/// A pool job may wait on other work sent to the same pool. The waiting job
/// keeps its thread, so a pool grows past its width when every thread it has
/// is busy, up to `max_pool_threads`. Only when that cap is reached does new
/// work queue behind blocked jobs.
///
/// Waiting on [`QueueId::Main`] from inside a job that runs on the main queue
/// deadlocks: the awaited job sits behind the job that is waiting for it.
///
/// # Dropping
///
/// Dropping the service waits for the pools' threads to finish, so the last
/// reference must not be dropped:
/// - from inside one of the service's own jobs;
/// - from inside an async context (a tokio task or a `block_on` future).
///   Tokio refuses to tear down a runtime there and panics. Async code should
///   share [`TokioExecutionService::global`] or hand the last reference to a
///   plain thread.
pub struct TokioExecutionService {
    id: usize,
    config: ExecutorConfig,
    workers: Pool,
    background: Pool,
    main: SerialQueue,
    accepting: AtomicBool,
}

impl TokioExecutionService {
    /// Starts a service with [`ExecutorConfig::default`].
    pub fn new() -> Result<Self> {
        Self::from_config(&ExecutorConfig::default())
    }

    /// Starts every execution context described by `config`.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::Spawn`] if the configuration is invalid or a
    /// runtime or thread cannot be started.
    pub fn from_config(config: &ExecutorConfig) -> Result<Self> {
        config
            .validate()
            .map_err(|e| BridgeError::Spawn(e.to_string()))?;

        let workers = Pool::start(
            QueueId::Default,
            config.worker_thread_name(),
            config.worker_threads,
            config,
        )?;
        let background = Pool::start(
            QueueId::Background,
            config.background_thread_name(),
            config.background_threads,
            config,
        )?;
        let main = SerialQueue::spawn(config.main_thread_name(), config.thread_stack_size)?;

        debug!(
            worker_threads = config.worker_threads,
            background_threads = config.background_threads,
            max_pool_threads = config.max_pool_threads,
            prefix = %config.thread_name_prefix,
            "Execution service started"
        );

        Ok(Self {
            id: NEXT_SERVICE_ID.fetch_add(1, Ordering::Relaxed),
            config: config.clone(),
            workers,
            background,
            main,
            accepting: AtomicBool::new(true),
        })
    }

    /// Process-wide service, started with the default configuration on first
    /// use and never shut down.
    ///
    /// # Panics
    ///
    /// Panics if the service cannot be started on first use.
    pub fn global() -> Arc<TokioExecutionService> {
        static GLOBAL: OnceLock<Arc<TokioExecutionService>> = OnceLock::new();
        GLOBAL
            .get_or_init(|| {
                Arc::new(
                    TokioExecutionService::new()
                        .expect("failed to start the global execution service"),
                )
            })
            .clone()
    }

    pub fn config(&self) -> &ExecutorConfig {
        &self.config
    }

    /// Identity of the main queue's thread.
    pub fn main_thread_id(&self) -> ThreadId {
        self.main.thread_id()
    }

    /// Jobs currently running on `queue`'s pool; always 0 for the main queue.
    pub fn running_jobs(&self, queue: QueueId) -> usize {
        match queue {
            QueueId::Default => self.workers.running(),
            QueueId::Background => self.background.running(),
            QueueId::Main => 0,
        }
    }

    /// Returns `false` once [`shutdown`](Self::shutdown) has been called.
    pub fn is_accepting(&self) -> bool {
        self.accepting.load(Ordering::Acquire)
    }

    /// Stops accepting work on every queue.
    ///
    /// Jobs already queued on the main queue still run. Later submissions are
    /// rejected with [`BridgeError::QueueUnavailable`].
    pub fn shutdown(&self) {
        if self.accepting.swap(false, Ordering::AcqRel) {
            debug!("Execution service shutting down");
            self.main.shutdown();
        }
    }
}

impl ExecutionService for TokioExecutionService {
    fn submit(&self, queue: QueueId, job: Job) -> Result<()> {
        if !self.is_accepting() {
            return Err(BridgeError::QueueUnavailable(queue));
        }

        match queue {
            QueueId::Default => self.workers.spawn(self.id, job),
            QueueId::Background => self.background.spawn(self.id, job),
            QueueId::Main => {
                self.main
                    .submit(job)
                    .map_err(|_| BridgeError::QueueUnavailable(queue))?;
            }
        }

        trace!(%queue, "Job submitted");
        Ok(())
    }

    fn is_current(&self, queue: QueueId) -> bool {
        match queue {
            QueueId::Main => self.main.is_current(),
            QueueId::Default | QueueId::Background => {
                RUNNING_JOB.with(Cell::get) == Some((self.id, queue))
            }
        }
    }
}

impl std::fmt::Debug for TokioExecutionService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokioExecutionService")
            .field("id", &self.id)
            .field("config", &self.config)
            .field("main", &self.main)
            .field("accepting", &self.is_accepting())
            .finish_non_exhaustive()
    }
}

/// One tokio runtime whose blocking pool runs a queue's jobs.
struct Pool {
    queue: QueueId,
    runtime: Runtime,
    width: usize,
    running: Arc<AtomicUsize>,
}

impl Pool {
    fn start(
        queue: QueueId,
        name: String,
        width: usize,
        config: &ExecutorConfig,
    ) -> Result<Self> {
        let mut builder = Builder::new_multi_thread();
        builder
            .worker_threads(1)
            .max_blocking_threads(config.max_pool_threads)
            .thread_name(name.clone())
            .enable_all();
        if let Some(bytes) = config.thread_stack_size {
            builder.thread_stack_size(bytes);
        }

        let runtime = builder
            .build()
            .map_err(|e| BridgeError::Spawn(format!("{}: {}", name, e)))?;

        Ok(Self {
            queue,
            runtime,
            width,
            running: Arc::new(AtomicUsize::new(0)),
        })
    }

    fn running(&self) -> usize {
        self.running.load(Ordering::Acquire)
    }

    fn spawn(&self, service_id: usize, job: Job) {
        let queue = self.queue;
        let width = self.width;
        let running = self.running.clone();

        self.runtime.spawn_blocking(move || {
            let in_flight = running.fetch_add(1, Ordering::AcqRel) + 1;
            if in_flight > width {
                debug!(%queue, in_flight, width, "Pool running past its width");
            }

            let previous = RUNNING_JOB.with(|slot| slot.replace(Some((service_id, queue))));
            // Tokio keeps a blocking task's panic in its `JoinHandle`, which
            // nobody holds, so it is logged here instead.
            let outcome = catch_unwind(AssertUnwindSafe(job));
            RUNNING_JOB.with(|slot| slot.set(previous));
            running.fetch_sub(1, Ordering::AcqRel);

            if let Err(panic) = outcome {
                error!(
                    %queue,
                    panic = %panic_message(panic.as_ref()),
                    "Job panicked"
                );
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rendezvous_sync::Promise;
    use std::sync::mpsc;
    use std::thread;
    use std::time::Duration;

    fn small_service(prefix: &str) -> TokioExecutionService {
        let config = ExecutorConfig::builder()
            .worker_threads(2)
            .background_threads(1)
            .thread_name_prefix(prefix)
            .build()
            .unwrap();
        TokioExecutionService::from_config(&config).unwrap()
    }

    fn run_on(service: &TokioExecutionService, queue: QueueId) -> (ThreadId, Option<String>) {
        let seen = Arc::new(Promise::new());
        let slot = seen.clone();
        service
            .submit(
                queue,
                Box::new(move || {
                    let current = thread::current();
                    slot.set((current.id(), current.name().map(str::to_string)))
                        .unwrap();
                }),
            )
            .unwrap();
        seen.wait().clone()
    }

    #[test]
    fn test_main_queue_runs_on_main_thread() {
        let service = small_service("t-main");
        let (id, name) = run_on(&service, QueueId::Main);

        assert_eq!(id, service.main_thread_id());
        assert_eq!(name.as_deref(), Some("t-main-main"));
    }

    #[test]
    fn test_pools_run_off_the_calling_thread() {
        let service = small_service("t-pool");
        let caller = thread::current().id();

        let (default_id, default_name) = run_on(&service, QueueId::Default);
        let (background_id, background_name) = run_on(&service, QueueId::Background);

        assert_ne!(default_id, caller);
        assert_ne!(background_id, caller);
        assert_ne!(default_id, service.main_thread_id());
        assert_eq!(default_name.as_deref(), Some("t-pool-worker"));
        assert_eq!(background_name.as_deref(), Some("t-pool-background"));
    }

    #[test]
    fn test_is_current_inside_jobs() {
        let service = Arc::new(small_service("t-current"));

        for queue in QueueId::ALL {
            let answer = Arc::new(Promise::new());
            let slot = answer.clone();
            let inner = service.clone();
            service
                .submit(
                    queue,
                    Box::new(move || {
                        let flags: Vec<bool> =
                            QueueId::ALL.iter().map(|q| inner.is_current(*q)).collect();
                        // The test thread must own the last reference.
                        drop(inner);
                        slot.set(flags).unwrap();
                    }),
                )
                .unwrap();

            let expected: Vec<bool> = QueueId::ALL.iter().map(|q| *q == queue).collect();
            assert_eq!(answer.wait(), &expected, "inside a job on {queue}");
        }

        assert!(QueueId::ALL.iter().all(|q| !service.is_current(*q)));
    }

    #[test]
    fn test_shutdown_rejects_new_work() {
        let service = small_service("t-shutdown");
        service.shutdown();
        assert!(!service.is_accepting());

        for queue in QueueId::ALL {
            let err = service.submit(queue, Box::new(|| {})).unwrap_err();
            assert!(matches!(err, BridgeError::QueueUnavailable(q) if q == queue));
        }
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let config = ExecutorConfig {
            worker_threads: 0,
            ..ExecutorConfig::default()
        };
        let err = TokioExecutionService::from_config(&config).unwrap_err();
        assert!(matches!(err, BridgeError::Spawn(_)));
    }

    #[test]
    fn test_global_is_shared() {
        let a = TokioExecutionService::global();
        let b = TokioExecutionService::global();
        assert!(Arc::ptr_eq(&a, &b));
        assert!(a.is_accepting());
    }

    fn single_thread_pools(prefix: &str) -> Arc<TokioExecutionService> {
        let config = ExecutorConfig::builder()
            .worker_threads(1)
            .background_threads(1)
            .thread_name_prefix(prefix)
            .build()
            .unwrap();
        Arc::new(TokioExecutionService::from_config(&config).unwrap())
    }

    // Submits a job to `queue` that itself submits to `queue` and blocks on
    // the result, `depth` levels deep.
    fn nested_job(service: Arc<TokioExecutionService>, queue: QueueId, depth: u32) -> Job {
        Box::new(move || {
            let result = Arc::new(Promise::new());
            if depth == 0 {
                result.set(()).unwrap();
            } else {
                let inner = nested_job(service.clone(), queue, depth - 1);
                let slot = result.clone();
                service
                    .submit(
                        queue,
                        Box::new(move || {
                            inner();
                            slot.set(()).unwrap();
                        }),
                    )
                    .unwrap();
            }
            drop(service);
            result.wait();
        })
    }

    #[test]
    fn test_pool_grows_while_jobs_wait_on_the_same_pool() {
        let service = single_thread_pools("t-grow");

        for queue in [QueueId::Default, QueueId::Background] {
            let (done, finished) = mpsc::channel();
            let job = nested_job(service.clone(), queue, 3);
            service
                .submit(
                    queue,
                    Box::new(move || {
                        job();
                        done.send(()).unwrap();
                    }),
                )
                .unwrap();

            finished
                .recv_timeout(Duration::from_secs(5))
                .unwrap_or_else(|_| panic!("nested waits on {queue} never finished"));
        }

        // Let the last pool thread drop its clone of the service.
        while Arc::strong_count(&service) > 1 {
            thread::sleep(Duration::from_millis(5));
        }
    }

    #[test]
    fn test_running_jobs_counts_blocked_jobs() {
        let service = single_thread_pools("t-count");
        let release = Arc::new(Promise::new());
        let started = Arc::new(Promise::new());

        let (gate, signal) = (release.clone(), started.clone());
        service
            .submit(
                QueueId::Default,
                Box::new(move || {
                    signal.set(()).unwrap();
                    gate.wait();
                }),
            )
            .unwrap();

        started.wait();
        assert_eq!(service.running_jobs(QueueId::Default), 1);
        assert_eq!(service.running_jobs(QueueId::Background), 0);

        release.set(()).unwrap();
        while service.running_jobs(QueueId::Default) > 0 {
            thread::sleep(Duration::from_millis(5));
        }
    }

    #[test]
    fn test_is_current_is_per_service() {
        let a = Arc::new(small_service("t-same"));
        let b = Arc::new(small_service("t-same"));

        let answer = Arc::new(Promise::new());
        let slot = answer.clone();
        let (inner_a, inner_b) = (a.clone(), b.clone());
        a.submit(
            QueueId::Default,
            Box::new(move || {
                let flags = (
                    inner_a.is_current(QueueId::Default),
                    inner_b.is_current(QueueId::Default),
                );
                drop(inner_a);
                drop(inner_b);
                slot.set(flags).unwrap();
            }),
        )
        .unwrap();

        assert_eq!(answer.wait(), &(true, false));
    }

    #[test]
    fn test_thread_with_pool_name_is_not_current() {
        let service = Arc::new(small_service("t-name"));
        let other_thread_service = service.clone();

        let flags = thread::Builder::new()
            .name(service.config().worker_thread_name())
            .spawn(move || {
                (
                    other_thread_service.is_current(QueueId::Default),
                    other_thread_service.is_current(QueueId::Background),
                )
            })
            .unwrap()
            .join()
            .unwrap();

        assert_eq!(flags, (false, false));
    }
}
