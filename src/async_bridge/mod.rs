//! Interop with `async` code.
//!
//! A [`Future`](crate::Future) can be awaited directly from any executor, and
//! an `async` block can be run on a [`WorkerPool`](crate::WorkerPool) with
//! [`spawn_async`].

pub mod spawn;
pub mod wait;

pub use spawn::{block_on, spawn_async};
pub use wait::Wait;
