//! Running `async` blocks on a worker pool.

use crate::error::Result;
use crate::executor::WorkerPool;
use crate::future::Future;

/// Drive `future` to completion on one of `pool`'s workers.
///
/// The worker is occupied until the future finishes, so this suits short
/// async sections rather than long-lived I/O loops.
pub fn spawn_async<F, T>(pool: &WorkerPool, future: F) -> Result<Future<T>>
where
    F: std::future::Future<Output = T> + Send + 'static,
    T: Clone + Send + 'static,
{
    pool.submit(move || futures::executor::block_on(future))
}

/// Block on a future in the current thread
///
/// This is a convenience wrapper around futures::executor::block_on
pub fn block_on<F>(future: F) -> F::Output
where
    F: std::future::Future,
{
    futures::executor::block_on(future)
}
