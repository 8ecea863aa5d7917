// worker thread stuff
use super::task::{Completion, Task};
use super::worker_pool::PoolShared;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

pub type WorkerId = usize;

// stats for each worker
#[derive(Debug)]
pub struct WorkerState {
    pub tasks_executed: AtomicU64,
    pub busy_time_ns: AtomicU64,
}

impl WorkerState {
    fn new() -> Self {
        Self {
            tasks_executed: AtomicU64::new(0),
            busy_time_ns: AtomicU64::new(0),
        }
    }
}

pub(crate) struct Worker {
    pub id: WorkerId,
    pub state: Arc<WorkerState>,
}

impl Worker {
    pub fn new(id: WorkerId) -> Self {
        Self {
            id,
            state: Arc::new(WorkerState::new()),
        }
    }

    // main loop: runs until the queue is closed and drained
    pub fn run(&self, shared: &PoolShared) {
        tracing::trace!(worker = self.id, "worker started");

        while let Ok(task) = shared.receiver.recv() {
            shared.counters.on_dequeue();

            if shared.is_discarding() {
                shared.counters.on_discard();
                drop(task);
                continue;
            }

            shared.counters.on_start();
            let completion = self.execute_task(task, shared);
            shared.counters.on_finish(completion);
        }

        tracing::trace!(worker = self.id, "worker exiting");
    }

    fn execute_task(&self, task: Task, shared: &PoolShared) -> Completion {
        let tid = task.id;
        let queued_for = task.spawn_time.elapsed();
        let start = Instant::now();

        // Task bodies guard their own panics; this only catches a panic in
        // the surrounding bookkeeping.
        let result = shared.panic_handler.execute(|| task.execute(&shared.panic_handler));

        let duration_ns = start.elapsed().as_nanos() as u64;

        let completion = result.unwrap_or_else(|_| {
            tracing::error!(task = tid.as_u64(), "task wrapper panicked");
            Completion::Done
        });

        tracing::trace!(
            worker = self.id,
            task = tid.as_u64(),
            queued_us = queued_for.as_micros() as u64,
            run_ns = duration_ns,
            failed = completion == Completion::Failed,
            "task finished"
        );

        self.state.tasks_executed.fetch_add(1, Ordering::Relaxed);
        self.state
            .busy_time_ns
            .fetch_add(duration_ns, Ordering::Relaxed);

        completion
    }
}
