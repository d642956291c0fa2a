//! Execution Service Contract
//!
//! Abstracts the process-wide execution contexts work can be submitted to.

use std::any::Any;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// A unit of work accepted by an [`ExecutionService`].
pub type Job = Box<dyn FnOnce() + Send + 'static>;

/// Named execution contexts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueueId {
    /// Shared worker pool for general work.
    Default,
    /// Lower-priority pool for work nobody is waiting on urgently.
    Background,
    /// The single serial main queue. Jobs run one at a time, in submission
    /// order, on one dedicated thread.
    Main,
}

impl QueueId {
    /// All queues, in declaration order.
    pub const ALL: [QueueId; 3] = [QueueId::Default, QueueId::Background, QueueId::Main];

    pub fn as_str(&self) -> &'static str {
        match self {
            QueueId::Default => "default",
            QueueId::Background => "background",
            QueueId::Main => "main",
        }
    }

    /// Returns `true` for queues that run at most one job at a time.
    pub fn is_serial(&self) -> bool {
        matches!(self, QueueId::Main)
    }
}

impl fmt::Display for QueueId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Execution service trait
///
/// The execution contexts behind each [`QueueId`] are owned by the service,
/// not by the code submitting work. Implementations decide how they are
/// backed:
/// - **Desktop/server**: thread pools plus a dedicated serial thread
///   (`rendezvous-executor`'s `TokioExecutionService`)
/// - **Tests**: run every job inline on the submitting thread
///   (`InlineExecutionService`)
/// - **Hosts with a UI loop**: route [`QueueId::Main`] to the host's main
///   thread dispatcher
///
/// # Contract
///
/// - `submit` must not block waiting for the job to run.
/// - An accepted job must eventually run exactly once, unless the service is
///   shut down, in which case it is dropped without running.
/// - A rejected job is dropped before `submit` returns.
///
/// # Example
///
/// ```ignore
/// use rendezvous_bridge::{ExecutionService, QueueId};
///
/// fn fire_and_forget(service: &dyn ExecutionService) -> rendezvous_bridge::Result<()> {
///     service.submit(QueueId::Background, Box::new(|| {
///         tracing::info!("cleaning up");
///     }))
/// }
/// ```
pub trait ExecutionService: Send + Sync {
    /// Submit `job` to run concurrently on `queue`.
    ///
    /// # Errors
    ///
    /// Returns an error if the queue is not accepting work. The job has been
    /// dropped in that case.
    fn submit(&self, queue: QueueId, job: Job) -> Result<()>;

    /// Returns `true` if the calling thread belongs to `queue`.
    ///
    /// Services that cannot tell return `false`.
    fn is_current(&self, _queue: QueueId) -> bool {
        false
    }
}

/// Best-effort text of a panic payload, for logging and error reporting.
pub fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::BridgeError;
    use mockall::mock;
    use mockall::predicate::{always, eq};
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    mock! {
        Service {}

        impl ExecutionService for Service {
            fn submit(&self, queue: QueueId, job: Job) -> Result<()>;
        }
    }

    #[test]
    fn test_queue_display() {
        assert_eq!(QueueId::Default.to_string(), "default");
        assert_eq!(QueueId::Background.to_string(), "background");
        assert_eq!(QueueId::Main.to_string(), "main");
    }

    #[test]
    fn test_only_main_is_serial() {
        let serial: Vec<_> = QueueId::ALL.iter().filter(|q| q.is_serial()).collect();
        assert_eq!(serial, vec![&QueueId::Main]);
    }

    #[test]
    fn test_queue_serde_names() {
        let json = serde_json::to_string(&QueueId::Background).unwrap();
        assert_eq!(json, "\"background\"");

        let queue: QueueId = serde_json::from_str("\"main\"").unwrap();
        assert_eq!(queue, QueueId::Main);
    }

    #[test]
    fn test_panic_message() {
        let payload: Box<dyn Any + Send> = Box::new("static");
        assert_eq!(panic_message(payload.as_ref()), "static");

        let payload: Box<dyn Any + Send> = Box::new(String::from("owned"));
        assert_eq!(panic_message(payload.as_ref()), "owned");

        let payload: Box<dyn Any + Send> = Box::new(7u8);
        assert_eq!(panic_message(payload.as_ref()), "non-string panic payload");
    }

    #[test]
    fn test_trait_object_submit() {
        let ran = Arc::new(AtomicBool::new(false));

        let mut service = MockService::new();
        service
            .expect_submit()
            .with(eq(QueueId::Main), always())
            .times(1)
            .returning(|_, job| {
                job();
                Ok(())
            });

        let service: &dyn ExecutionService = &service;
        let flag = ran.clone();
        service
            .submit(QueueId::Main, Box::new(move || flag.store(true, Ordering::SeqCst)))
            .unwrap();

        assert!(ran.load(Ordering::SeqCst));
        assert!(!service.is_current(QueueId::Main));
    }

    #[test]
    fn test_rejected_submission_error() {
        let mut service = MockService::new();
        service
            .expect_submit()
            .returning(|queue, _| Err(BridgeError::QueueUnavailable(queue)));

        let err = service
            .submit(QueueId::Background, Box::new(|| {}))
            .unwrap_err();
        assert_eq!(err.to_string(), "Queue not accepting work: background");
    }
}
