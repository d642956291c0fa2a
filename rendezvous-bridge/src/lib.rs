//! # Execution Bridge
//!
//! The contract between rendezvous and whatever actually runs work.
//!
//! ## Overview
//!
//! The dispatcher in `rendezvous-task` never creates threads or looks up
//! process-wide queues itself. It submits [`Job`]s to an injected
//! [`ExecutionService`], naming one of three [`QueueId`]s:
//!
//! | Queue | Semantics |
//! |-------|-----------|
//! | [`QueueId::Default`] | Shared worker pool |
//! | [`QueueId::Background`] | Lower-priority worker pool |
//! | [`QueueId::Main`] | Single serial context |
//!
//! Each host supplies an implementation: `rendezvous-executor` ships a
//! tokio-backed one and an inline one for deterministic tests.
//!
//! ## Error Handling
//!
//! Implementations report failures as [`BridgeError`]. A rejected job is
//! dropped, which lets the caller observe the rejection through whatever the
//! job owned (the dispatcher resolves the task as abandoned).
//!
//! ## Thread Safety
//!
//! [`ExecutionService`] requires `Send + Sync` so one service can be shared
//! behind an `Arc` by every dispatcher in the process.

pub mod error;
pub mod execution;

pub use error::{BridgeError, Result};
pub use execution::{panic_message, ExecutionService, Job, QueueId};
