//! Single-assignment cell shared by a future and its producer.

use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};

use crate::error::Result;

pub(crate) type Callback<T> = Box<dyn FnOnce(&Result<T>) + Send + 'static>;

enum Slot<T> {
    Pending(Vec<Callback<T>>),
    Done(Result<T>),
}

/// Outcome plus pending continuations, all behind one lock so that
/// "already done, run now" and "still pending, run later" is decided
/// atomically.
pub(crate) struct Cell<T> {
    slot: Mutex<Slot<T>>,
    ready: Condvar,
}

impl<T: Clone + Send + 'static> Cell<T> {
    pub fn pending() -> Self {
        Self {
            slot: Mutex::new(Slot::Pending(Vec::new())),
            ready: Condvar::new(),
        }
    }

    pub fn done(outcome: Result<T>) -> Self {
        Self {
            slot: Mutex::new(Slot::Done(outcome)),
            ready: Condvar::new(),
        }
    }

    /// First writer wins. Returns `false` if the cell was already resolved.
    pub fn resolve(&self, outcome: Result<T>) -> bool {
        let callbacks = {
            let mut slot = self.slot.lock();
            let callbacks = match &mut *slot {
                Slot::Done(_) => return false,
                Slot::Pending(callbacks) => std::mem::take(callbacks),
            };
            *slot = Slot::Done(outcome.clone());
            callbacks
        };
        self.ready.notify_all();

        for callback in callbacks {
            callback(&outcome);
        }
        true
    }

    pub fn subscribe(&self, callback: Callback<T>) {
        let mut slot = self.slot.lock();
        let outcome = match &mut *slot {
            Slot::Pending(callbacks) => {
                callbacks.push(callback);
                return;
            }
            Slot::Done(outcome) => outcome.clone(),
        };
        drop(slot);
        callback(&outcome);
    }

    pub fn peek(&self) -> Option<Result<T>> {
        match &*self.slot.lock() {
            Slot::Pending(_) => None,
            Slot::Done(outcome) => Some(outcome.clone()),
        }
    }

    pub fn is_done(&self) -> bool {
        matches!(&*self.slot.lock(), Slot::Done(_))
    }

    /// `None` while pending, otherwise whether the outcome is an error.
    pub fn rejected(&self) -> Option<bool> {
        match &*self.slot.lock() {
            Slot::Pending(_) => None,
            Slot::Done(outcome) => Some(outcome.is_err()),
        }
    }

    pub fn wait(&self) -> Result<T> {
        let mut slot = self.slot.lock();
        loop {
            if let Slot::Done(outcome) = &*slot {
                return outcome.clone();
            }
            self.ready.wait(&mut slot);
        }
    }

    pub fn wait_timeout(&self, timeout: Duration) -> Option<Result<T>> {
        let deadline = Instant::now() + timeout;
        let mut slot = self.slot.lock();
        loop {
            if let Slot::Done(outcome) = &*slot {
                return Some(outcome.clone());
            }
            if self.ready.wait_until(&mut slot, deadline).timed_out() {
                return match &*slot {
                    Slot::Done(outcome) => Some(outcome.clone()),
                    Slot::Pending(_) => None,
                };
            }
        }
    }
}
