//! Minimal async driver.
//!
//! Async waits ([`Barrier::unlocked`](crate::Barrier::unlocked),
//! [`Promise::wait_async`](crate::Promise::wait_async)) are runtime-agnostic
//! futures. `block_on` drives one to completion on a throwaway current-thread
//! runtime so callers and tests never need to build one themselves.

pub use tokio::runtime::{Builder, Handle, Runtime};

/// Runs the provided future to completion using a lightweight runtime.
///
/// # Panics
///
/// Panics if the OS refuses to create the runtime's I/O or timer drivers, or
/// if called from inside another runtime's async context.
pub fn block_on<F>(future: F) -> F::Output
where
    F: std::future::Future,
{
    Builder::new_current_thread()
        .enable_all()
        .build()
        .expect("rendezvous_sync::runtime::block_on: failed to build runtime")
        .block_on(future)
}
