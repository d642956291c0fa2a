//! Deferred computations on named queues.
//!
//! A [`Dispatcher`] submits a closure to one of the queues of an
//! [`ExecutionService`](rendezvous_bridge::ExecutionService) and returns an
//! [`AwaitableTask`] straight away. Calling [`AwaitableTask::wait`] blocks the
//! calling thread until the queue has produced the value:
//!
//! ```ignore
//! let dispatcher = Dispatcher::new(service);
//!
//! let report = dispatcher.run_in_background(build_report);
//! let title = dispatcher.run_in_main_queue(|| window_title());
//!
//! render(report.wait()?, title.wait()?);
//! ```
//!
//! A computation that panics, or that the service drops without running,
//! resolves its task with a [`TaskError`] instead of leaving waiters blocked.

pub mod dispatcher;
pub mod error;
pub mod task;

pub use dispatcher::Dispatcher;
pub use error::{Result, TaskError};
pub use task::AwaitableTask;

pub use rendezvous_bridge::QueueId;
pub use rendezvous_sync::{await_value, Awaitable};
