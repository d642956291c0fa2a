//! # Execution Service Implementations
//!
//! Implementations of [`rendezvous_bridge::ExecutionService`].
//!
//! ## Overview
//!
//! - [`TokioExecutionService`]: production service. Two tokio blocking pools
//!   back the default and background queues, and a [`SerialQueue`] thread
//!   backs the main queue. Sized and named by
//!   [`ExecutorConfig`](rendezvous_runtime::config::ExecutorConfig).
//! - [`SerialQueue`]: a named single-thread FIFO queue, usable on its own.
//! - [`InlineExecutionService`]: runs each job on the submitting thread before
//!   `submit` returns. For deterministic tests.
//!
//! ## Usage
//!
//! ```ignore
//! use rendezvous_executor::TokioExecutionService;
//! use rendezvous_runtime::config::ExecutorConfig;
//! use std::sync::Arc;
//!
//! let config = ExecutorConfig::builder().worker_threads(4).build()?;
//! let service = Arc::new(TokioExecutionService::from_config(&config)?);
//! ```

mod inline;
mod serial;
mod tokio_service;

pub use inline::InlineExecutionService;
pub use serial::SerialQueue;
pub use tokio_service::TokioExecutionService;
