use super::panic_handler::PanicHandler;
use super::task::{Completion, Task};
use super::timer::Timer;
use super::worker::{Worker, WorkerId, WorkerState};
use crate::config::{PoolConfig, ShutdownMode};
use crate::error::{BoxError, Error, Result};
use crate::future::{Future, Promise};
use crossbeam_channel::{bounded, unbounded, Receiver, Sender, TrySendError};
use parking_lot::{Mutex, RwLock};
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicU8, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// Lifecycle of a [`WorkerPool`]. Only ever moves forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PoolState {
    Open,
    ShuttingDown,
    Closed,
}

impl PoolState {
    fn from_u8(raw: u8) -> Self {
        match raw {
            0 => PoolState::Open,
            1 => PoolState::ShuttingDown,
            _ => PoolState::Closed,
        }
    }
}

/// Point-in-time counters for a pool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolStats {
    pub num_threads: usize,
    pub queued: usize,
    pub active: usize,
    pub completed: u64,
    /// Tasks whose body returned an error.
    pub failed: u64,
    pub panicked: usize,
    pub discarded: usize,
    /// Tasks executed by each worker, indexed by worker id.
    pub worker_tasks: Vec<u64>,
    /// Time each worker spent running tasks.
    pub worker_busy: Vec<Duration>,
}

#[derive(Debug, Default)]
pub(crate) struct Counters {
    queued: AtomicUsize,
    active: AtomicUsize,
    completed: AtomicU64,
    failed: AtomicU64,
    discarded: AtomicUsize,
}

impl Counters {
    pub fn on_dequeue(&self) {
        self.queued.fetch_sub(1, Ordering::Relaxed);
    }

    pub fn on_start(&self) {
        self.active.fetch_add(1, Ordering::Relaxed);
    }

    pub fn on_finish(&self, completion: Completion) {
        self.active.fetch_sub(1, Ordering::Relaxed);
        self.completed.fetch_add(1, Ordering::Relaxed);
        if completion == Completion::Failed {
            self.failed.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn on_discard(&self) {
        self.discarded.fetch_add(1, Ordering::Relaxed);
    }
}

/// State shared between the pool owner, its workers and any continuation
/// that schedules itself onto the pool.
pub(crate) struct PoolShared {
    sender: RwLock<Option<Sender<Task>>>,
    pub(crate) receiver: Receiver<Task>,
    state: AtomicU8,
    discarding: AtomicBool,
    capacity: Option<usize>,
    pub(crate) counters: Counters,
    pub(crate) panic_handler: PanicHandler,
    timer: Timer,
}

impl PoolShared {
    /// Queue `task`, handing it back on failure so the caller can resolve the
    /// task's future with the real reason before the task is dropped.
    pub(crate) fn try_enqueue(&self, task: Task) -> std::result::Result<(), (Error, Task)> {
        let sender = self.sender.read();
        let Some(tx) = sender.as_ref() else {
            return Err((Error::PoolClosed, task));
        };

        self.counters.queued.fetch_add(1, Ordering::Relaxed);
        match tx.try_send(task) {
            Ok(()) => Ok(()),
            Err(err) => {
                self.counters.queued.fetch_sub(1, Ordering::Relaxed);
                match err {
                    TrySendError::Full(task) => {
                        Err((Error::QueueFull(self.capacity.unwrap_or_default()), task))
                    }
                    TrySendError::Disconnected(task) => Err((Error::PoolClosed, task)),
                }
            }
        }
    }

    pub(crate) fn timer(&self) -> &Timer {
        &self.timer
    }

    pub(crate) fn is_discarding(&self) -> bool {
        self.discarding.load(Ordering::Acquire)
    }

    fn state(&self) -> PoolState {
        PoolState::from_u8(self.state.load(Ordering::Acquire))
    }

    /// Stop accepting work. Returns `false` if the pool was already closing.
    fn close(&self) -> bool {
        let mut sender = self.sender.write();
        if sender.take().is_none() {
            return false;
        }
        self.state
            .store(PoolState::ShuttingDown as u8, Ordering::Release);
        true
    }

    // Dropping a task rejects its future with `Cancelled`.
    fn drain(&self) -> usize {
        let mut discarded = 0;
        while let Ok(task) = self.receiver.try_recv() {
            self.counters.on_dequeue();
            self.counters.on_discard();
            drop(task);
            discarded += 1;
        }
        discarded
    }
}

impl std::fmt::Debug for PoolShared {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PoolShared")
            .field("state", &self.state())
            .field("capacity", &self.capacity)
            .field("counters", &self.counters)
            .finish()
    }
}

struct WorkerHandle {
    id: WorkerId,
    thread: Option<JoinHandle<()>>,
}

/// Fixed set of worker threads fed from one FIFO queue.
///
/// Tasks start in submission order, at most `num_threads` at a time, and
/// each hands back a [`Future`] for its outcome. A task that fails or panics
/// only rejects its own future; the worker moves on to the next task.
///
/// Dropping the pool shuts it down gracefully.
pub struct WorkerPool {
    shared: Arc<PoolShared>,
    workers: Mutex<Vec<WorkerHandle>>,
    worker_states: Vec<Arc<WorkerState>>,
    num_threads: usize,
}

impl WorkerPool {
    pub fn new(config: PoolConfig) -> Result<Self> {
        config.validate()?;

        let num_threads = config.worker_threads();
        let (sender, receiver) = match config.queue_capacity {
            Some(capacity) => bounded(capacity),
            None => unbounded(),
        };
        let timer = Timer::new(format!("{}-timer", config.thread_name_prefix))?;

        let shared = Arc::new(PoolShared {
            sender: RwLock::new(Some(sender)),
            receiver,
            state: AtomicU8::new(PoolState::Open as u8),
            discarding: AtomicBool::new(false),
            capacity: config.queue_capacity,
            counters: Counters::default(),
            panic_handler: PanicHandler::new(config.panic_strategy),
            timer,
        });

        let mut pool = Self {
            shared,
            workers: Mutex::new(Vec::with_capacity(num_threads)),
            worker_states: Vec::with_capacity(num_threads),
            num_threads,
        };

        for id in 0..num_threads {
            let worker = Worker::new(id);
            pool.worker_states.push(worker.state.clone());

            let shared = pool.shared.clone();
            let name = format!("{}-{}", config.thread_name_prefix, id);
            let mut builder = thread::Builder::new().name(name);
            if let Some(stack_size) = config.stack_size {
                builder = builder.stack_size(stack_size);
            }

            // On failure `pool` drops here and joins the workers already spawned.
            let thread = builder
                .spawn(move || worker.run(&shared))
                .map_err(|e| Error::executor(format!("spawn failed: {}", e)))?;

            pool.workers.lock().push(WorkerHandle {
                id,
                thread: Some(thread),
            });
        }

        tracing::debug!(
            threads = num_threads,
            capacity = ?config.queue_capacity,
            prefix = %config.thread_name_prefix,
            "worker pool started"
        );

        Ok(pool)
    }

    /// Pool with `n` workers and default settings otherwise.
    pub fn with_threads(n: usize) -> Result<Self> {
        Self::new(PoolConfig::builder().num_threads(n).build()?)
    }

    /// Queue `f` and return a future for its value. A panic in `f` rejects
    /// the future with [`Error::WorkerPanic`].
    pub fn submit<F, T>(&self, f: F) -> Result<Future<T>>
    where
        F: FnOnce() -> T + Send + 'static,
        T: Clone + Send + 'static,
    {
        let (promise, future) = Promise::new();
        self.enqueue(Task::new(move |handler| {
            promise.resolve(handler.execute(f).map_err(Error::from));
            Completion::Done
        }))?;
        Ok(future)
    }

    /// Queue a task that may fail. An `Err` from `f` rejects the future with
    /// [`Error::TaskFailed`], keeping the returned error as its source.
    pub fn submit_fallible<F, T, E>(&self, f: F) -> Result<Future<T>>
    where
        F: FnOnce() -> std::result::Result<T, E> + Send + 'static,
        T: Clone + Send + 'static,
        E: Into<BoxError>,
    {
        let (promise, future) = Promise::new();
        self.enqueue(Task::new(move |handler| {
            let (outcome, completion) = match handler.execute(f) {
                Ok(Ok(value)) => (Ok(value), Completion::Done),
                Ok(Err(err)) => (Err(Error::task(err)), Completion::Failed),
                Err(panic) => (Err(panic.into()), Completion::Done),
            };
            promise.resolve(outcome);
            completion
        }))?;
        Ok(future)
    }

    /// Queue a side effect and return a future that completes with it.
    pub fn run<F>(&self, f: F) -> Result<Future<()>>
    where
        F: FnOnce() + Send + 'static,
    {
        self.submit(f)
    }

    /// Queue a side effect nobody waits for.
    pub fn execute<F>(&self, f: F) -> Result<()>
    where
        F: FnOnce() + Send + 'static,
    {
        self.enqueue(Task::new(move |handler| {
            let _ = handler.execute(f);
            Completion::Done
        }))
    }

    fn enqueue(&self, task: Task) -> Result<()> {
        self.shared.try_enqueue(task).map_err(|(err, task)| {
            tracing::debug!(task = task.id.as_u64(), error = %err, "submission rejected");
            err
        })
    }

    /// Stop accepting work and wait for the workers to exit.
    ///
    /// [`ShutdownMode::Graceful`] lets every queued task run first;
    /// [`ShutdownMode::Immediate`] discards queued tasks, rejecting their
    /// futures with [`Error::Cancelled`]. Tasks already running always
    /// finish. Returns how many tasks this call discarded.
    ///
    /// Calling it again, or from one of the pool's own workers, does not
    /// block on that worker.
    pub fn shutdown(&self, mode: ShutdownMode) -> usize {
        let discarded_before = self.shared.counters.discarded.load(Ordering::Relaxed);

        if self.shared.close() {
            tracing::debug!(mode = ?mode, "worker pool shutting down");
        }

        if mode == ShutdownMode::Immediate {
            self.shared.discarding.store(true, Ordering::Release);
            self.shared.drain();
        }

        let mut workers = self.workers.lock();
        let current = thread::current().id();
        for handle in workers.iter_mut() {
            let Some(thread) = handle.thread.take() else {
                continue;
            };
            if thread.thread().id() == current {
                tracing::warn!(worker = handle.id, "shutdown called from a pool worker, not joining it");
                continue;
            }
            if thread.join().is_err() {
                tracing::error!(worker = handle.id, "worker thread panicked");
            }
        }
        drop(workers);

        self.shared.timer.stop();
        self.shared
            .state
            .store(PoolState::Closed as u8, Ordering::Release);

        let discarded =
            self.shared.counters.discarded.load(Ordering::Relaxed) - discarded_before;
        if discarded > 0 {
            tracing::warn!(discarded, "discarded queued tasks on shutdown");
        }
        tracing::debug!("worker pool closed");
        discarded
    }

    pub fn state(&self) -> PoolState {
        self.shared.state()
    }

    pub fn is_open(&self) -> bool {
        self.state() == PoolState::Open
    }

    pub fn num_threads(&self) -> usize {
        self.num_threads
    }

    pub fn stats(&self) -> PoolStats {
        let counters = &self.shared.counters;
        PoolStats {
            num_threads: self.num_threads,
            queued: counters.queued.load(Ordering::Relaxed),
            active: counters.active.load(Ordering::Relaxed),
            completed: counters.completed.load(Ordering::Relaxed),
            failed: counters.failed.load(Ordering::Relaxed),
            panicked: self.shared.panic_handler.panic_count(),
            discarded: counters.discarded.load(Ordering::Relaxed),
            worker_tasks: self
                .worker_states
                .iter()
                .map(|s| s.tasks_executed.load(Ordering::Relaxed))
                .collect(),
            worker_busy: self
                .worker_states
                .iter()
                .map(|s| Duration::from_nanos(s.busy_time_ns.load(Ordering::Relaxed)))
                .collect(),
        }
    }

    pub(crate) fn handle(&self) -> Arc<PoolShared> {
        self.shared.clone()
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        self.shutdown(ShutdownMode::Graceful);
    }
}

impl std::fmt::Debug for WorkerPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkerPool")
            .field("num_threads", &self.num_threads)
            .field("state", &self.state())
            .finish()
    }
}
