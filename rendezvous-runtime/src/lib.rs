//! # Rendezvous Runtime
//!
//! Ambient runtime infrastructure shared by the rendezvous crates:
//! - Executor configuration ([`config::ExecutorConfig`])
//! - Logging and tracing setup ([`logging::init_logging`])
//!
//! ## Overview
//!
//! Nothing here runs work. The execution service in `rendezvous-executor`
//! consumes [`config::ExecutorConfig`] to size and name its threads, and hosts
//! call [`logging::init_logging`] once at startup to see what the queues are
//! doing.

pub mod config;
pub mod error;
pub mod logging;

pub use config::{ExecutorConfig, ExecutorConfigBuilder};
pub use error::{Error, Result};
pub use logging::{init_logging, LogFormat, LogLevel, LoggingConfig};
