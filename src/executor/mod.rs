//! Task execution infrastructure.
//!
//! This module provides the worker pool, its worker threads, the task type
//! they run, panic containment and the timer thread behind the timeout
//! combinators.

pub mod panic_handler;
pub mod task;
pub mod timer;
pub mod worker;
pub mod worker_pool;

pub use panic_handler::{PanicHandler, PanicInfo, PanicStrategy};
pub use task::TaskId;
pub use timer::{Expiry, Timer, TimerId};
pub use worker_pool::{PoolState, PoolStats, WorkerPool};

pub(crate) use task::{Completion, Task};
