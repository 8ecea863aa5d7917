//! Deadline thread backing the timeout combinators.

use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap};
use std::sync::Arc;
use std::thread::{self, JoinHandle, ThreadId};
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex, MutexGuard};

use super::panic_handler::catch_panic;
use crate::error::{Error, Result};

type Callback = Box<dyn FnOnce(Expiry) + Send + 'static>;

/// Cancelled entries tolerated in the heap before it is rebuilt.
const PRUNE_THRESHOLD: usize = 64;

/// Why a scheduled callback is being run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Expiry {
    /// The deadline passed.
    Deadline,
    /// The timer stopped before the deadline.
    Stopped,
}

/// Handle to a scheduled callback, used to cancel it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimerId(u64);

#[derive(Debug, PartialEq, Eq, PartialOrd, Ord)]
struct Entry {
    deadline: Instant,
    id: u64,
}

#[derive(Default)]
struct TimerState {
    heap: BinaryHeap<Reverse<Entry>>,
    callbacks: HashMap<u64, Callback>,
    next_id: u64,
    // heap entries whose callback was cancelled
    cancelled: usize,
    stopped: bool,
}

impl TimerState {
    fn prune(&mut self) {
        let callbacks = &self.callbacks;
        self.heap.retain(|Reverse(entry)| callbacks.contains_key(&entry.id));
        self.cancelled = 0;
    }
}

struct TimerShared {
    state: Mutex<TimerState>,
    wakeup: Condvar,
}

/// Single thread firing callbacks once their deadline passes.
///
/// Every callback runs exactly once unless cancelled: with
/// [`Expiry::Deadline`] on the timer thread, or with [`Expiry::Stopped`] on
/// the thread that stops the timer. Cancelled entries are skipped when they
/// surface and the heap is rebuilt once enough of them pile up.
pub struct Timer {
    shared: Arc<TimerShared>,
    thread: Mutex<Option<JoinHandle<()>>>,
    thread_id: ThreadId,
}

impl Timer {
    pub fn new<S: Into<String>>(name: S) -> Result<Self> {
        let shared = Arc::new(TimerShared {
            state: Mutex::new(TimerState::default()),
            wakeup: Condvar::new(),
        });

        let loop_shared = shared.clone();
        let handle = thread::Builder::new()
            .name(name.into())
            .spawn(move || run(&loop_shared))
            .map_err(|e| Error::executor(format!("timer spawn failed: {}", e)))?;

        Ok(Self {
            shared,
            thread_id: handle.thread().id(),
            thread: Mutex::new(Some(handle)),
        })
    }

    /// Run `f` on the timer thread after `delay`.
    pub fn schedule<F>(&self, delay: Duration, f: F) -> Result<TimerId>
    where
        F: FnOnce(Expiry) + Send + 'static,
    {
        let deadline = Instant::now() + delay;
        let mut state = self.shared.state.lock();
        if state.stopped {
            return Err(Error::PoolClosed);
        }

        let id = state.next_id;
        state.next_id += 1;
        state.heap.push(Reverse(Entry { deadline, id }));
        state.callbacks.insert(id, Box::new(f));
        drop(state);

        self.shared.wakeup.notify_one();
        Ok(TimerId(id))
    }

    /// Returns `true` if the callback had not fired yet and never will.
    pub fn cancel(&self, id: TimerId) -> bool {
        let mut state = self.shared.state.lock();
        if state.callbacks.remove(&id.0).is_none() {
            return false;
        }
        state.cancelled += 1;
        if state.cancelled > PRUNE_THRESHOLD && state.cancelled * 2 > state.heap.len() {
            state.prune();
        }
        true
    }

    /// Number of callbacks still waiting for their deadline.
    pub fn pending(&self) -> usize {
        self.shared.state.lock().callbacks.len()
    }

    /// Stop the thread. Callbacks that have not fired yet run right here
    /// with [`Expiry::Stopped`].
    pub fn stop(&self) {
        let unfired = {
            let mut state = self.shared.state.lock();
            if state.stopped {
                return;
            }
            state.stopped = true;
            state.heap.clear();
            state.cancelled = 0;
            std::mem::take(&mut state.callbacks)
        };
        self.shared.wakeup.notify_all();

        if !unfired.is_empty() {
            tracing::debug!(count = unfired.len(), "timer stopped with pending callbacks");
        }
        for (_, callback) in unfired {
            invoke(callback, Expiry::Stopped);
        }

        if thread::current().id() == self.thread_id {
            return;
        }
        if let Some(handle) = self.thread.lock().take() {
            let _ = handle.join();
        }
    }
}

impl Drop for Timer {
    fn drop(&mut self) {
        self.stop();
    }
}

impl std::fmt::Debug for Timer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Timer")
            .field("pending", &self.pending())
            .finish()
    }
}

fn run(shared: &TimerShared) {
    let mut state = shared.state.lock();

    loop {
        if state.stopped {
            break;
        }

        let next = state.heap.peek().map(|Reverse(entry)| entry.deadline);
        match next {
            None => shared.wakeup.wait(&mut state),
            Some(deadline) if deadline <= Instant::now() => {
                let Some(Reverse(entry)) = state.heap.pop() else {
                    continue;
                };
                match state.callbacks.remove(&entry.id) {
                    Some(callback) => {
                        MutexGuard::unlocked(&mut state, || invoke(callback, Expiry::Deadline));
                    }
                    None => state.cancelled = state.cancelled.saturating_sub(1),
                }
            }
            Some(deadline) => {
                shared.wakeup.wait_until(&mut state, deadline);
            }
        }
    }
}

fn invoke(callback: Callback, expiry: Expiry) {
    if let Err(info) = catch_panic(|| callback(expiry)) {
        tracing::warn!(panic = %info, ?expiry, "timer callback panicked");
    }
}
