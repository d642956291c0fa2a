//! Common blocking-wait interface.

use crate::barrier::Barrier;
use crate::promise::Promise;

/// Anything whose result can be retrieved with a blocking wait.
///
/// Waiting must be idempotent: calling [`Awaitable::wait`] again returns the
/// same result without redoing any work.
pub trait Awaitable {
    /// What a wait yields. Borrowed from `self` for cells that keep their value.
    type Output<'a>
    where
        Self: 'a;

    /// Blocks the calling thread until the result is available.
    fn wait(&self) -> Self::Output<'_>;
}

impl Awaitable for Barrier {
    type Output<'a> = ();

    fn wait(&self) {
        self.wait_for_unlock();
    }
}

impl<T> Awaitable for Promise<T> {
    type Output<'a>
        = &'a T
    where
        Self: 'a;

    fn wait(&self) -> &T {
        Promise::wait(self)
    }
}

/// Blocks on `awaitable` and returns its result.
///
/// A named call-through for code that is generic over [`Awaitable`].
pub fn await_value<A>(awaitable: &A) -> A::Output<'_>
where
    A: Awaitable + ?Sized,
{
    awaitable.wait()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_await_value_on_promise() {
        let promise = Promise::new();
        promise.set(42).unwrap();
        assert_eq!(*await_value(&promise), 42);
    }

    #[test]
    fn test_await_value_on_barrier() {
        let barrier = Barrier::new();
        barrier.unlock();
        await_value(&barrier);
    }
}
