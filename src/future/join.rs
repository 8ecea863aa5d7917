//! Combinators over more than one future.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use super::combinators::Step;
use super::{Future, Promise};
use crate::executor::worker_pool::{PoolShared, WorkerPool};

impl<T: Clone + Send + 'static> Future<T> {
    /// Wait for both `self` and `other`, then merge their values with `f`.
    ///
    /// If either side is rejected so is the result. When both are rejected
    /// the error of `self` wins, whichever of the two finished first.
    pub fn then_combine<U, R, F>(&self, other: &Future<U>, f: F) -> Future<R>
    where
        U: Clone + Send + 'static,
        R: Clone + Send + 'static,
        F: FnOnce(T, U) -> R + Send + 'static,
    {
        self.combine_on(None, other, f)
    }

    /// Like [`then_combine`](Self::then_combine), with `f` run on `pool`.
    pub fn then_combine_async<U, R, F>(&self, pool: &WorkerPool, other: &Future<U>, f: F) -> Future<R>
    where
        U: Clone + Send + 'static,
        R: Clone + Send + 'static,
        F: FnOnce(T, U) -> R + Send + 'static,
    {
        self.combine_on(Some(pool.handle()), other, f)
    }

    fn combine_on<U, R, F>(&self, pool: Option<Arc<PoolShared>>, other: &Future<U>, f: F) -> Future<R>
    where
        U: Clone + Send + 'static,
        R: Clone + Send + 'static,
        F: FnOnce(T, U) -> R + Send + 'static,
    {
        let other = other.clone();
        self.derive(None, move |left| {
            Step::Follow(other.derive(pool, move |right| {
                Step::Done(match (left, right) {
                    (Ok(a), Ok(b)) => Ok(f(a, b)),
                    (Err(err), _) | (Ok(_), Err(err)) => Err(err),
                })
            }))
        })
    }

    /// Fulfilled once every input is terminal, failed or not. Inspect the
    /// inputs afterwards for their individual outcomes.
    ///
    /// An empty slice yields an already fulfilled future.
    pub fn all_of(futures: &[Future<T>]) -> Future<()> {
        if futures.is_empty() {
            return Future::completed(());
        }

        let (promise, all) = Promise::new();
        let promise = Arc::new(promise);
        let remaining = Arc::new(AtomicUsize::new(futures.len()));

        for future in futures {
            let promise = promise.clone();
            let remaining = remaining.clone();
            future.subscribe(move |_| {
                if remaining.fetch_sub(1, Ordering::AcqRel) == 1 {
                    promise.fulfill(());
                }
            });
        }

        all
    }

    /// Adopt the outcome, value or error, of whichever input finishes first.
    /// The others keep running; their outcomes are ignored here.
    ///
    /// An empty slice yields a future that never resolves.
    pub fn any_of(futures: &[Future<T>]) -> Future<T> {
        if futures.is_empty() {
            return Future::pending();
        }

        let (promise, any) = Promise::new();
        let promise = Arc::new(promise);

        for future in futures {
            let promise = promise.clone();
            future.subscribe(move |outcome| {
                promise.resolve(outcome.clone());
            });
        }

        any
    }
}
