//! Deadline-bound variants of a future.

use std::sync::Arc;
use std::time::Duration;

use super::{Future, Promise};
use crate::error::{Error, Result};
use crate::executor::worker_pool::WorkerPool;
use crate::executor::Expiry;

impl<T: Clone + Send + 'static> Future<T> {
    /// Fulfilled with `default` unless this future finishes within `timeout`,
    /// in which case its outcome is forwarded instead.
    ///
    /// The deadline is tracked by `pool`'s timer thread. If the pool is
    /// closed before the deadline, or already closed when this is called,
    /// the result is rejected with [`Error::PoolClosed`] unless `self`
    /// finished first.
    pub fn complete_on_timeout(&self, default: T, timeout: Duration, pool: &WorkerPool) -> Future<T> {
        self.race_deadline(timeout, pool, move || Ok(default))
    }

    /// Rejected with [`Error::Timeout`] unless this future finishes within
    /// `timeout`.
    pub fn or_timeout(&self, timeout: Duration, pool: &WorkerPool) -> Future<T> {
        self.race_deadline(timeout, pool, move || Err(Error::Timeout(timeout)))
    }

    fn race_deadline<F>(&self, timeout: Duration, pool: &WorkerPool, on_expiry: F) -> Future<T>
    where
        F: FnOnce() -> Result<T> + Send + 'static,
    {
        let (promise, raced) = Promise::new();
        let promise = Arc::new(promise);

        let expired = promise.clone();
        let scheduled = pool.handle().timer().schedule(timeout, move |expiry| match expiry {
            Expiry::Deadline => {
                expired.resolve(on_expiry());
            }
            Expiry::Stopped => {
                expired.reject(Error::PoolClosed);
            }
        });

        match scheduled {
            Ok(id) => {
                let shared = pool.handle();
                self.subscribe(move |outcome| {
                    shared.timer().cancel(id);
                    promise.resolve(outcome.clone());
                });
            }
            Err(err) => {
                let forward = promise.clone();
                self.subscribe(move |outcome| {
                    forward.resolve(outcome.clone());
                });
                promise.reject(err);
            }
        }

        raced
    }
}
