pub use crate::config::{PoolConfig, PoolConfigBuilder, ShutdownMode};
pub use crate::error::{Error, Result};
pub use crate::executor::{PanicStrategy, PoolState, PoolStats, WorkerPool};
pub use crate::future::{Future, Promise, State};

#[cfg(feature = "async")]
pub use crate::async_bridge::{block_on, spawn_async};
