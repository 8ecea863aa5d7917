//! Panic containment for task bodies and continuations.

use std::any::Any;
use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;

use crate::error::Error;

/// What a pool does when user code panics on one of its threads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PanicStrategy {
    /// Abort the process on the first panic.
    Abort,
    /// Reject the affected future and say nothing.
    Isolate,
    /// Reject the affected future and log the panic.
    #[default]
    LogAndContinue,
}

#[derive(Debug)]
pub struct PanicHandler {
    strategy: PanicStrategy,
    panic_count: AtomicUsize,
}

impl PanicHandler {
    pub fn new(strategy: PanicStrategy) -> Self {
        Self {
            strategy,
            panic_count: AtomicUsize::new(0),
        }
    }

    /// Run `f`, counting and reporting a panic according to the strategy.
    pub fn execute<F, R>(&self, f: F) -> Result<R, PanicInfo>
    where
        F: FnOnce() -> R,
    {
        let info = match catch_panic(f) {
            Ok(value) => return Ok(value),
            Err(info) => info,
        };

        let seen = self.panic_count.fetch_add(1, Ordering::Relaxed) + 1;
        match self.strategy {
            PanicStrategy::Abort => {
                tracing::error!(thread = ?info.thread, message = %info.message, "task panicked, aborting");
                std::process::abort();
            }
            PanicStrategy::Isolate => {}
            PanicStrategy::LogAndContinue => {
                tracing::warn!(
                    thread = ?info.thread,
                    message = %info.message,
                    total = seen,
                    "task panicked"
                );
            }
        }

        Err(info)
    }

    /// Panics caught so far.
    pub fn panic_count(&self) -> usize {
        self.panic_count.load(Ordering::Relaxed)
    }
}

impl Default for PanicHandler {
    fn default() -> Self {
        Self::new(PanicStrategy::default())
    }
}

/// A caught panic: its message and the thread it happened on.
#[derive(Debug, Clone)]
pub struct PanicInfo {
    pub message: String,
    pub thread: Option<String>,
}

impl PanicInfo {
    fn from_payload(payload: Box<dyn Any + Send>) -> Self {
        let message = match payload.downcast::<String>() {
            Ok(owned) => *owned,
            Err(payload) => match payload.downcast_ref::<&str>() {
                Some(s) => s.to_string(),
                None => "non-string panic payload".to_string(),
            },
        };

        Self {
            message,
            thread: thread::current().name().map(str::to_owned),
        }
    }
}

impl fmt::Display for PanicInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.thread {
            Some(name) => write!(f, "{} (on {})", self.message, name),
            None => f.write_str(&self.message),
        }
    }
}

impl From<PanicInfo> for Error {
    fn from(info: PanicInfo) -> Self {
        Error::WorkerPanic(info.message)
    }
}

/// Run `f`, turning a panic into a [`PanicInfo`] instead of unwinding further.
pub(crate) fn catch_panic<F, R>(f: F) -> Result<R, PanicInfo>
where
    F: FnOnce() -> R,
{
    catch_unwind(AssertUnwindSafe(f)).map_err(PanicInfo::from_payload)
}
