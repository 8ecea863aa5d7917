//! `.await` support for pool futures.

use std::future::IntoFuture;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll, Waker};

use parking_lot::Mutex;

use crate::error::Result;
use crate::future::Future;

/// `std::future::Future` adapter returned by `Future::into_future`.
pub struct Wait<T> {
    future: Future<T>,
    waker: Arc<Mutex<Option<Waker>>>,
    registered: bool,
}

impl<T: Clone + Send + 'static> IntoFuture for Future<T> {
    type Output = Result<T>;
    type IntoFuture = Wait<T>;

    fn into_future(self) -> Wait<T> {
        Wait {
            future: self,
            waker: Arc::new(Mutex::new(None)),
            registered: false,
        }
    }
}

impl<T: Clone + Send + 'static> std::future::Future for Wait<T> {
    type Output = Result<T>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Result<T>> {
        let this = self.get_mut();

        if let Some(outcome) = this.future.try_get() {
            return Poll::Ready(outcome);
        }

        *this.waker.lock() = Some(cx.waker().clone());

        if !this.registered {
            this.registered = true;
            let slot = this.waker.clone();
            this.future.subscribe(move |_| {
                if let Some(waker) = slot.lock().take() {
                    waker.wake();
                }
            });
        }

        // Resolved between the first check and storing the waker.
        match this.future.try_get() {
            Some(outcome) => Poll::Ready(outcome),
            None => Poll::Pending,
        }
    }
}

impl<T> std::fmt::Debug for Wait<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Wait")
            .field("registered", &self.registered)
            .finish()
    }
}
