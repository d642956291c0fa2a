//! Blocking rendezvous primitives.
//!
//! This crate provides the two synchronization building blocks the rest of
//! the workspace is built on:
//!
//! - [`Barrier`]: a one-time gate. Locked on creation, unlocked exactly once,
//!   open forever after.
//! - [`Promise`]: a single-assignment cell. Set once by a producer, read any
//!   number of times by consumers, who block until the value is present.
//!
//! Both support a genuine blocking wait for plain threads and an async wait
//! for code running on an executor. The [`Awaitable`] trait abstracts over the
//! blocking wait.
//!
//! # Examples
//!
//! ```rust
//! use rendezvous_sync::{await_value, Promise};
//! use std::sync::Arc;
//!
//! let promise = Arc::new(Promise::new());
//! let producer = promise.clone();
//!
//! let worker = std::thread::spawn(move || {
//!     producer.set(21 * 2).unwrap();
//! });
//!
//! assert_eq!(*await_value(&*promise), 42);
//! worker.join().unwrap();
//! ```

// Lets the attribute macros refer to `::rendezvous_sync` from inside this crate.
extern crate self as rendezvous_sync;

// Re-export the async entry-point/test macros so downstream crates never need
// direct tokio dependencies.
pub use rendezvous_macros::{main, test};

pub mod awaitable;
pub mod barrier;
pub mod error;
pub mod promise;
pub mod runtime;

pub use awaitable::{await_value, Awaitable};
pub use barrier::Barrier;
pub use error::{Result, SyncError};
pub use promise::Promise;
