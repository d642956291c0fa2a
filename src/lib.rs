//! Blocking rendezvous on work running elsewhere.
//!
//! Re-exports the workspace crates behind one dependency:
//!
//! - [`Barrier`] and [`Promise`] from `rendezvous-sync`
//! - [`Dispatcher`] and [`AwaitableTask`] from `rendezvous-task`
//! - the [`ExecutionService`] seam from `rendezvous-bridge`
//! - with the `tokio-executor` feature (on by default), the
//!   [`TokioExecutionService`] and the runtime configuration and logging setup
//!
//! ```ignore
//! let dispatcher = rendezvous::dispatcher();
//! assert_eq!(dispatcher.run(|| 21 * 2).wait(), Ok(&42));
//! ```

pub use rendezvous_bridge::{
    self as bridge, panic_message, BridgeError, ExecutionService, Job, QueueId,
};
pub use rendezvous_sync::{
    self as sync, await_value, Awaitable, Barrier, Promise, SyncError,
};
pub use rendezvous_task::{self as task, AwaitableTask, Dispatcher, TaskError};

#[cfg(feature = "tokio-executor")]
pub use rendezvous_executor::{InlineExecutionService, SerialQueue, TokioExecutionService};
#[cfg(feature = "tokio-executor")]
pub use rendezvous_runtime::{
    self as runtime, init_logging, ExecutorConfig, LogFormat, LogLevel, LoggingConfig,
};

/// A dispatcher over [`TokioExecutionService::global`].
#[cfg(feature = "tokio-executor")]
pub fn dispatcher() -> Dispatcher {
    Dispatcher::new(TokioExecutionService::global())
}
