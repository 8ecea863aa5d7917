use std::error::Error as StdError;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

pub type Result<T> = std::result::Result<T, Error>;

/// Boxed error accepted from fallible task bodies.
pub type BoxError = Box<dyn StdError + Send + Sync + 'static>;

#[derive(Debug, Clone, thiserror::Error)]
pub enum Error {
    #[error("task failed: {0}")]
    TaskFailed(#[source] TaskError),

    #[error("worker panic: {0}")]
    WorkerPanic(String),

    #[error("pool is closed")]
    PoolClosed,

    #[error("task queue is full (capacity {0})")]
    QueueFull(usize),

    #[error("timed out after {0:?}")]
    Timeout(Duration),

    #[error("task cancelled before it ran")]
    Cancelled,

    #[error("config error: {0}")]
    Config(String),

    #[error("executor error: {0}")]
    Executor(String),
}

impl Error {
    pub fn config<S: Into<String>>(msg: S) -> Self {
        Error::Config(msg.into())
    }

    pub fn executor<S: Into<String>>(msg: S) -> Self {
        Error::Executor(msg.into())
    }

    /// Wrap the error a task body returned.
    pub fn task<E: Into<BoxError>>(err: E) -> Self {
        Error::TaskFailed(TaskError::new(err))
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, Error::Timeout(_))
    }
}

/// The error a task body produced, shared between every consumer of the
/// rejected future.
#[derive(Clone)]
pub struct TaskError {
    cause: Arc<dyn StdError + Send + Sync + 'static>,
}

impl TaskError {
    pub fn new<E: Into<BoxError>>(err: E) -> Self {
        Self {
            cause: Arc::from(err.into()),
        }
    }

    /// The error returned by the task.
    pub fn cause(&self) -> &(dyn StdError + Send + Sync + 'static) {
        &*self.cause
    }

    pub fn downcast_ref<E: StdError + 'static>(&self) -> Option<&E> {
        self.cause.downcast_ref::<E>()
    }
}

impl fmt::Debug for TaskError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&*self.cause, f)
    }
}

impl fmt::Display for TaskError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&*self.cause, f)
    }
}

impl StdError for TaskError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        Some(&*self.cause)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, thiserror::Error)]
    #[error("price feed unavailable")]
    struct FeedDown;

    #[derive(Debug, thiserror::Error)]
    #[error("quote refresh failed")]
    struct QuoteRefresh(#[source] FeedDown);

    #[test]
    fn test_task_error_keeps_cause() {
        let err = Error::task(FeedDown);
        assert_eq!(err.to_string(), "task failed: price feed unavailable");

        let source = err.source().unwrap();
        let task_err = source.downcast_ref::<TaskError>().unwrap();
        assert!(task_err.downcast_ref::<FeedDown>().is_some());
    }

    #[test]
    fn test_task_error_from_string() {
        let err = Error::task("bad input");
        match err {
            Error::TaskFailed(inner) => assert_eq!(inner.to_string(), "bad input"),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_clone_shares_cause() {
        let err = TaskError::new(FeedDown);
        let copy = err.clone();
        assert!(Arc::ptr_eq(&err.cause, &copy.cause));
    }

    #[test]
    fn test_source_chain_reaches_task_cause() {
        let err = Error::task(QuoteRefresh(FeedDown));

        let mut chain: Vec<&(dyn StdError + 'static)> = Vec::new();
        let mut next = err.source();
        while let Some(cause) = next {
            chain.push(cause);
            next = cause.source();
        }

        // TaskError, then the task's error, then what it wrapped
        assert_eq!(chain.len(), 3);
        assert!(chain[0].downcast_ref::<TaskError>().is_some());
        assert!(chain[1].downcast_ref::<QuoteRefresh>().is_some());
        assert!(chain[2].downcast_ref::<FeedDown>().is_some());
        assert!(chain.iter().any(|e| e.downcast_ref::<FeedDown>().is_some()));
    }
}
