//! Single-assignment futures and the promises that resolve them.
//!
//! A [`Future`] is a cheap, cloneable handle on an outcome that is written
//! exactly once: either a value or an [`Error`]. Continuations registered on
//! it run once that outcome exists, either inline on the resolving thread or
//! as a new task on a [`WorkerPool`](crate::WorkerPool) (the `*_async`
//! variants).

mod combinators;
mod join;
pub(crate) mod state;
mod timeout;

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crate::error::{Error, Result};
use state::Cell;

/// Where a future currently stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    Pending,
    Fulfilled,
    Rejected,
}

/// Handle on the eventual outcome of one unit of work.
pub struct Future<T> {
    pub(crate) cell: Arc<Cell<T>>,
}

impl<T> Clone for Future<T> {
    fn clone(&self) -> Self {
        Self {
            cell: self.cell.clone(),
        }
    }
}

impl<T: Clone + Send + 'static> Future<T> {
    /// A future nobody has resolved yet. Resolve it with
    /// [`complete`](Self::complete) or [`complete_with_error`](Self::complete_with_error).
    pub fn pending() -> Self {
        Self {
            cell: Arc::new(Cell::pending()),
        }
    }

    pub fn completed(value: T) -> Self {
        Self {
            cell: Arc::new(Cell::done(Ok(value))),
        }
    }

    pub fn failed(error: Error) -> Self {
        Self {
            cell: Arc::new(Cell::done(Err(error))),
        }
    }

    /// Fulfill the future unless something else resolved it first.
    /// Returns whether this call did it.
    pub fn complete(&self, value: T) -> bool {
        self.cell.resolve(Ok(value))
    }

    /// Reject the future unless something else resolved it first.
    pub fn complete_with_error(&self, error: Error) -> bool {
        self.cell.resolve(Err(error))
    }

    pub fn state(&self) -> State {
        match self.cell.rejected() {
            None => State::Pending,
            Some(false) => State::Fulfilled,
            Some(true) => State::Rejected,
        }
    }

    pub fn is_done(&self) -> bool {
        self.cell.is_done()
    }

    pub fn is_rejected(&self) -> bool {
        self.cell.rejected() == Some(true)
    }

    /// Non-blocking snapshot of the outcome.
    pub fn try_get(&self) -> Option<Result<T>> {
        self.cell.peek()
    }

    /// Block the calling thread until the outcome exists.
    pub fn get(&self) -> Result<T> {
        self.cell.wait()
    }

    /// Like [`get`](Self::get), but gives up with [`Error::Timeout`] after
    /// `timeout`. The future itself is left untouched.
    pub fn get_timeout(&self, timeout: Duration) -> Result<T> {
        self.cell
            .wait_timeout(timeout)
            .unwrap_or(Err(Error::Timeout(timeout)))
    }

    pub(crate) fn subscribe<F>(&self, f: F)
    where
        F: FnOnce(&Result<T>) + Send + 'static,
    {
        self.cell.subscribe(Box::new(f));
    }
}

impl<T: Clone + Send + 'static> Default for Future<T> {
    fn default() -> Self {
        Self::pending()
    }
}

impl<T: Clone + Send + fmt::Debug + 'static> fmt::Debug for Future<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.try_get() {
            None => f.debug_tuple("Future").field(&"pending").finish(),
            Some(outcome) => f.debug_tuple("Future").field(&outcome).finish(),
        }
    }
}

/// Producer half of a [`Future`].
///
/// Dropping a promise that was never resolved rejects its future with
/// [`Error::Cancelled`], so work discarded from a queue never leaves a
/// consumer waiting forever.
pub struct Promise<T: Clone + Send + 'static> {
    cell: Arc<Cell<T>>,
}

impl<T: Clone + Send + 'static> Promise<T> {
    pub fn new() -> (Promise<T>, Future<T>) {
        let cell = Arc::new(Cell::pending());
        let future = Future { cell: cell.clone() };
        (Promise { cell }, future)
    }

    pub fn future(&self) -> Future<T> {
        Future {
            cell: self.cell.clone(),
        }
    }

    pub fn fulfill(&self, value: T) -> bool {
        self.cell.resolve(Ok(value))
    }

    pub fn reject(&self, error: Error) -> bool {
        self.cell.resolve(Err(error))
    }

    pub fn resolve(&self, outcome: Result<T>) -> bool {
        self.cell.resolve(outcome)
    }
}

impl<T: Clone + Send + 'static> Drop for Promise<T> {
    fn drop(&mut self) {
        self.cell.resolve(Err(Error::Cancelled));
    }
}

impl<T: Clone + Send + 'static> fmt::Debug for Promise<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Promise")
            .field("resolved", &self.cell.is_done())
            .finish()
    }
}
