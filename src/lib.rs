//! tandem - a fixed-size worker pool with composable futures.
//!
//! Work submitted to a [`WorkerPool`] runs on one of its threads and hands
//! back a [`Future`]: a single-assignment handle on the eventual value or
//! error. Futures chain ([`Future::then_apply`], [`Future::then_compose`]),
//! recover ([`Future::exceptionally`]), combine ([`Future::then_combine`],
//! [`Future::all_of`], [`Future::any_of`]) and race a deadline
//! ([`Future::complete_on_timeout`]).
//!
//! # Quick Start
//!
//! ```no_run
//! use tandem::prelude::*;
//!
//! let pool = WorkerPool::with_threads(2).unwrap();
//!
//! let price = pool.submit(|| 20).unwrap();
//! let rate = pool.submit(|| 0.9).unwrap();
//!
//! let total = price.then_combine(&rate, |price, rate| price as f64 * rate);
//! assert_eq!(total.get().unwrap(), 18.0);
//!
//! pool.shutdown(ShutdownMode::Graceful);
//! ```
//!
//! # Continuations
//!
//! Every continuation comes in two flavours. The plain one runs on whichever
//! thread resolves the source future (or right away, on the caller, if it is
//! already resolved). The `*_async` one takes a pool and runs there as a new
//! task. Which one you pick changes the thread, never the outcome.
//!
//! There is no process-wide pool: anything that needs threads or a timer
//! takes a `&WorkerPool`.

// Lint configuration
#![warn(missing_debug_implementations)]

pub mod config;
pub mod error;
pub mod executor;
pub mod future;
pub mod prelude;

#[cfg(feature = "async")]
pub mod async_bridge;

// Re-export key types at crate root
pub use config::{PoolConfig, PoolConfigBuilder, ShutdownMode};
pub use error::{BoxError, Error, Result, TaskError};
pub use executor::{PoolState, PoolStats, WorkerPool};
pub use future::{Future, Promise, State};
