//! # Executor Configuration
//!
//! Sizing and naming for the execution contexts behind each queue.
//!
//! ## Overview
//!
//! [`ExecutorConfig`] is built with [`ExecutorConfig::builder`] and validated
//! fail-fast in [`ExecutorConfigBuilder::build`]. Every field has a default, so
//! an empty builder yields a usable configuration:
//!
//! | Field | Default |
//! |-------|---------|
//! | `worker_threads` | available parallelism |
//! | `background_threads` | 2 |
//! | `max_pool_threads` | 512 |
//! | `thread_name_prefix` | `"rendezvous"` |
//! | `thread_stack_size` | platform default |
//!
//! `worker_threads` and `background_threads` are the widths the pools are
//! sized for. A job that blocks waiting on other work still holds its thread,
//! so either pool may start extra threads, up to `max_pool_threads`, rather
//! than leave queued work with nowhere to run.
//!
//! Threads are named `<prefix>-worker`, `<prefix>-background` and
//! `<prefix>-main`.
//!
//! ## Usage
//!
//! ```
//! use rendezvous_runtime::config::ExecutorConfig;
//!
//! let config = ExecutorConfig::builder()
//!     .worker_threads(4)
//!     .background_threads(1)
//!     .thread_name_prefix("jobs")
//!     .build()
//!     .expect("valid config");
//!
//! assert_eq!(config.main_thread_name(), "jobs-main");
//! ```
//!
//! Hosts that keep settings as JSON can load the same structure with
//! [`ExecutorConfig::from_json`]; missing fields take their defaults and the
//! result is validated.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Smallest stack size accepted for executor threads.
pub const MIN_THREAD_STACK_SIZE: usize = 64 * 1024;

const DEFAULT_BACKGROUND_THREADS: usize = 2;
const DEFAULT_MAX_POOL_THREADS: usize = 512;
const DEFAULT_THREAD_NAME_PREFIX: &str = "rendezvous";

/// Configuration for the execution contexts of a tokio-backed service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutorConfig {
    /// Width of the shared pool (`QueueId::Default`)
    pub worker_threads: usize,

    /// Width of the background pool (`QueueId::Background`)
    pub background_threads: usize,

    /// Most threads either pool may run while its jobs are blocked waiting
    pub max_pool_threads: usize,

    /// Prefix for every thread the service starts
    pub thread_name_prefix: String,

    /// Stack size for executor threads in bytes; platform default when unset
    pub thread_stack_size: Option<usize>,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        let worker_threads = default_worker_threads();
        Self {
            worker_threads,
            background_threads: DEFAULT_BACKGROUND_THREADS,
            max_pool_threads: DEFAULT_MAX_POOL_THREADS.max(worker_threads),
            thread_name_prefix: DEFAULT_THREAD_NAME_PREFIX.to_string(),
            thread_stack_size: None,
        }
    }
}

fn default_worker_threads() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}

impl ExecutorConfig {
    /// Creates a new builder for constructing an `ExecutorConfig`.
    pub fn builder() -> ExecutorConfigBuilder {
        ExecutorConfigBuilder::default()
    }

    /// Parses and validates a JSON document.
    ///
    /// ```
    /// use rendezvous_runtime::config::ExecutorConfig;
    ///
    /// let config = ExecutorConfig::from_json(r#"{ "background_threads": 1 }"#).unwrap();
    /// assert_eq!(config.background_threads, 1);
    /// assert_eq!(config.thread_name_prefix, "rendezvous");
    /// ```
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| Error::Config(format!("Invalid executor config JSON: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration and returns an error if invalid.
    ///
    /// This checks:
    /// - Both pools have at least one thread
    /// - `max_pool_threads` is not below either pool's width
    /// - The thread name prefix is not empty
    /// - A custom stack size is not below [`MIN_THREAD_STACK_SIZE`]
    pub fn validate(&self) -> Result<()> {
        if self.worker_threads == 0 {
            return Err(Error::Config(
                "worker_threads must be greater than 0".to_string(),
            ));
        }

        if self.background_threads == 0 {
            return Err(Error::Config(
                "background_threads must be greater than 0. \
                 Use 1 for a serial background pool."
                    .to_string(),
            ));
        }

        let widest = self.worker_threads.max(self.background_threads);
        if self.max_pool_threads < widest {
            return Err(Error::Config(format!(
                "max_pool_threads ({}) must be at least the widest pool ({})",
                self.max_pool_threads, widest
            )));
        }

        if self.thread_name_prefix.trim().is_empty() {
            return Err(Error::Config(
                "thread_name_prefix cannot be empty".to_string(),
            ));
        }

        if let Some(size) = self.thread_stack_size {
            if size < MIN_THREAD_STACK_SIZE {
                return Err(Error::Config(format!(
                    "thread_stack_size of {} bytes is below the minimum of {} bytes",
                    size, MIN_THREAD_STACK_SIZE
                )));
            }
        }

        Ok(())
    }

    /// Name of the shared pool's threads.
    pub fn worker_thread_name(&self) -> String {
        format!("{}-worker", self.thread_name_prefix)
    }

    /// Name of the background pool's threads.
    pub fn background_thread_name(&self) -> String {
        format!("{}-background", self.thread_name_prefix)
    }

    /// Name of the main queue's thread.
    pub fn main_thread_name(&self) -> String {
        format!("{}-main", self.thread_name_prefix)
    }
}

/// Builder for constructing [`ExecutorConfig`] instances.
#[derive(Debug, Default)]
pub struct ExecutorConfigBuilder {
    worker_threads: Option<usize>,
    background_threads: Option<usize>,
    max_pool_threads: Option<usize>,
    thread_name_prefix: Option<String>,
    thread_stack_size: Option<usize>,
}

impl ExecutorConfigBuilder {
    /// Sets the number of threads in the shared pool.
    pub fn worker_threads(mut self, threads: usize) -> Self {
        self.worker_threads = Some(threads);
        self
    }

    /// Sets the number of threads in the background pool.
    ///
    /// Default: 2
    pub fn background_threads(mut self, threads: usize) -> Self {
        self.background_threads = Some(threads);
        self
    }

    /// Sets how far either pool may grow while its jobs are blocked.
    ///
    /// Default: 512
    pub fn max_pool_threads(mut self, threads: usize) -> Self {
        self.max_pool_threads = Some(threads);
        self
    }

    /// Sets the prefix used to name executor threads.
    ///
    /// # Examples
    ///
    /// ```
    /// use rendezvous_runtime::config::ExecutorConfig;
    ///
    /// let config = ExecutorConfig::builder()
    ///     .thread_name_prefix("ui")
    ///     .build()
    ///     .unwrap();
    /// assert_eq!(config.worker_thread_name(), "ui-worker");
    /// ```
    pub fn thread_name_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.thread_name_prefix = Some(prefix.into());
        self
    }

    /// Sets the stack size of executor threads in bytes.
    pub fn thread_stack_size(mut self, bytes: usize) -> Self {
        self.thread_stack_size = Some(bytes);
        self
    }

    /// Builds the configuration, validating every field.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] describing the first invalid field.
    pub fn build(self) -> Result<ExecutorConfig> {
        let defaults = ExecutorConfig::default();
        let worker_threads = self.worker_threads.unwrap_or(defaults.worker_threads);
        let background_threads = self
            .background_threads
            .unwrap_or(defaults.background_threads);
        let config = ExecutorConfig {
            worker_threads,
            background_threads,
            // An unset cap never ends up below the configured widths.
            max_pool_threads: self.max_pool_threads.unwrap_or_else(|| {
                DEFAULT_MAX_POOL_THREADS
                    .max(worker_threads)
                    .max(background_threads)
            }),
            thread_name_prefix: self
                .thread_name_prefix
                .unwrap_or(defaults.thread_name_prefix),
            thread_stack_size: self.thread_stack_size.or(defaults.thread_stack_size),
        };

        config.validate()?;
        Ok(config)
    }
}
