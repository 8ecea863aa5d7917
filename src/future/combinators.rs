//! Continuations derived from a single source future.

use std::sync::Arc;

use super::{Future, Promise};
use crate::error::{Error, Result};
use crate::executor::panic_handler::{catch_panic, PanicHandler};
use crate::executor::worker_pool::{PoolShared, WorkerPool};
use crate::executor::{Completion, Task};

/// What a continuation hands back to the derived future.
pub(crate) enum Step<U> {
    Done(Result<U>),
    /// Adopt the outcome of another future (flattening `then_compose`).
    Follow(Future<U>),
}

impl<T: Clone + Send + 'static> Future<T> {
    /// Register `f` on this future and return the future it resolves.
    ///
    /// With `pool` set, `f` runs as a new task on that pool instead of on the
    /// thread that resolved `self`.
    pub(crate) fn derive<U, F>(&self, pool: Option<Arc<PoolShared>>, f: F) -> Future<U>
    where
        U: Clone + Send + 'static,
        F: FnOnce(Result<T>) -> Step<U> + Send + 'static,
    {
        let (promise, derived) = Promise::new();
        let target = derived.clone();

        self.subscribe(move |outcome| {
            let outcome = outcome.clone();
            match pool {
                None => settle(None, outcome, promise, f),
                Some(pool) => {
                    let task = Task::new(move |handler| {
                        settle(Some(handler), outcome, promise, f);
                        Completion::Done
                    });
                    if let Err((err, task)) = pool.try_enqueue(task) {
                        // Resolve before the rejected task drops its promise.
                        target.complete_with_error(err);
                        drop(task);
                    }
                }
            }
        });

        derived
    }

    /// Map the value with `f`. A rejection is passed on without calling `f`;
    /// a panic in `f` rejects the result with [`Error::WorkerPanic`].
    pub fn then_apply<U, F>(&self, f: F) -> Future<U>
    where
        U: Clone + Send + 'static,
        F: FnOnce(T) -> U + Send + 'static,
    {
        self.derive(None, move |outcome| Step::Done(outcome.map(f)))
    }

    pub fn then_apply_async<U, F>(&self, pool: &WorkerPool, f: F) -> Future<U>
    where
        U: Clone + Send + 'static,
        F: FnOnce(T) -> U + Send + 'static,
    {
        self.derive(Some(pool.handle()), move |outcome| Step::Done(outcome.map(f)))
    }

    /// Chain another asynchronous step, flattening its future into the result.
    pub fn then_compose<U, F>(&self, f: F) -> Future<U>
    where
        U: Clone + Send + 'static,
        F: FnOnce(T) -> Future<U> + Send + 'static,
    {
        self.derive(None, move |outcome| compose(outcome, f))
    }

    pub fn then_compose_async<U, F>(&self, pool: &WorkerPool, f: F) -> Future<U>
    where
        U: Clone + Send + 'static,
        F: FnOnce(T) -> Future<U> + Send + 'static,
    {
        self.derive(Some(pool.handle()), move |outcome| compose(outcome, f))
    }

    pub fn then_accept<F>(&self, f: F) -> Future<()>
    where
        F: FnOnce(T) + Send + 'static,
    {
        self.then_apply(f)
    }

    pub fn then_accept_async<F>(&self, pool: &WorkerPool, f: F) -> Future<()>
    where
        F: FnOnce(T) + Send + 'static,
    {
        self.then_apply_async(pool, f)
    }

    pub fn then_run<F>(&self, f: F) -> Future<()>
    where
        F: FnOnce() + Send + 'static,
    {
        self.then_apply(move |_| f())
    }

    pub fn then_run_async<F>(&self, pool: &WorkerPool, f: F) -> Future<()>
    where
        F: FnOnce() + Send + 'static,
    {
        self.then_apply_async(pool, move |_| f())
    }

    /// Recover from a rejection. A fulfilled value passes through untouched.
    pub fn exceptionally<F>(&self, f: F) -> Future<T>
    where
        F: FnOnce(Error) -> T + Send + 'static,
    {
        self.derive(None, move |outcome| Step::Done(Ok(outcome.unwrap_or_else(f))))
    }

    pub fn exceptionally_async<F>(&self, pool: &WorkerPool, f: F) -> Future<T>
    where
        F: FnOnce(Error) -> T + Send + 'static,
    {
        self.derive(Some(pool.handle()), move |outcome| {
            Step::Done(Ok(outcome.unwrap_or_else(f)))
        })
    }

    /// Map either outcome to a new value.
    pub fn handle<U, F>(&self, f: F) -> Future<U>
    where
        U: Clone + Send + 'static,
        F: FnOnce(Result<T>) -> U + Send + 'static,
    {
        self.derive(None, move |outcome| Step::Done(Ok(f(outcome))))
    }

    pub fn handle_async<U, F>(&self, pool: &WorkerPool, f: F) -> Future<U>
    where
        U: Clone + Send + 'static,
        F: FnOnce(Result<T>) -> U + Send + 'static,
    {
        self.derive(Some(pool.handle()), move |outcome| Step::Done(Ok(f(outcome))))
    }

    /// Observe the outcome without changing it. If `f` panics the result is
    /// rejected with the panic instead.
    pub fn when_complete<F>(&self, f: F) -> Future<T>
    where
        F: FnOnce(&Result<T>) + Send + 'static,
    {
        self.derive(None, move |outcome| {
            f(&outcome);
            Step::Done(outcome)
        })
    }

    pub fn when_complete_async<F>(&self, pool: &WorkerPool, f: F) -> Future<T>
    where
        F: FnOnce(&Result<T>) + Send + 'static,
    {
        self.derive(Some(pool.handle()), move |outcome| {
            f(&outcome);
            Step::Done(outcome)
        })
    }
}

fn compose<T, U, F>(outcome: Result<T>, f: F) -> Step<U>
where
    F: FnOnce(T) -> Future<U>,
{
    match outcome {
        Ok(value) => Step::Follow(f(value)),
        Err(err) => Step::Done(Err(err)),
    }
}

fn settle<T, U, F>(handler: Option<&PanicHandler>, outcome: Result<T>, promise: Promise<U>, f: F)
where
    U: Clone + Send + 'static,
    F: FnOnce(Result<T>) -> Step<U>,
{
    let step = match handler {
        Some(handler) => handler.execute(|| f(outcome)),
        None => catch_panic(|| f(outcome)),
    };

    match step {
        Ok(Step::Done(result)) => {
            promise.resolve(result);
        }
        Ok(Step::Follow(inner)) => inner.subscribe(move |result| {
            promise.resolve(result.clone());
        }),
        Err(info) => {
            promise.reject(info.into());
        }
    }
}
