use std::any::Any;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use std::thread::{self, ScopedJoinHandle};
use std::time::Instant;

use crossbeam_channel::{Receiver, Sender, bounded};

use crate::IngestError;
use crate::telemetry::worker::{DefaultWorkerTelemetry, WorkerTelemetry};
use crate::types::Result;

/// Fixed set of decode threads fed through a bounded FIFO queue.
///
/// Each [`WorkerPool::run`] call spawns its workers inside a thread scope, so
/// they may borrow from the caller and are always joined before `run`
/// returns, whether the producer finishes, fails, or panics.
pub struct WorkerPool {
    num_workers: usize,
    queue_capacity: usize,
    telemetry: Arc<dyn WorkerTelemetry>,
}

impl WorkerPool {
    /// Creates a worker pool using the default worker telemetry implementation.
    pub fn new(num_workers: usize, queue_capacity: usize) -> Self {
        Self::with_telemetry(num_workers, queue_capacity, Arc::new(DefaultWorkerTelemetry))
    }

    /// Creates a worker pool with a custom telemetry backend.
    pub fn with_telemetry(
        num_workers: usize,
        queue_capacity: usize,
        telemetry: Arc<dyn WorkerTelemetry>,
    ) -> Self {
        Self {
            num_workers: num_workers.max(1),
            queue_capacity: queue_capacity.max(1),
            telemetry,
        }
    }

    /// Number of workers configured in this pool.
    pub fn num_workers(&self) -> usize {
        self.num_workers
    }

    /// Maximum number of queued items before [`WorkQueue::submit`] blocks.
    pub fn queue_capacity(&self) -> usize {
        self.queue_capacity
    }

    /// Runs `producer` on the calling thread while the workers drain the queue.
    ///
    /// Every worker builds its own state with `new_state` and hands each
    /// dequeued item to `processor`. A processor error only marks that task as
    /// failed; a panic inside it is caught and reported the same way. Once the
    /// producer returns, the queue is closed, workers finish whatever is still
    /// queued, and all of them are joined before the producer's result is
    /// returned.
    pub fn run<T, S, I, P, F, R>(&self, new_state: I, processor: P, producer: F) -> Result<R>
    where
        T: Send,
        I: Fn(usize) -> S + Sync,
        P: Fn(usize, &mut S, T) -> Result<()> + Sync,
        F: FnOnce(&WorkQueue<T>) -> Result<R>,
    {
        let (tx, rx) = bounded(self.queue_capacity);
        let telemetry = self.telemetry.as_ref();
        let new_state = &new_state;
        let processor = &processor;

        thread::scope(|scope| {
            let mut handles = Vec::with_capacity(self.num_workers);
            for worker_id in 0..self.num_workers {
                let worker_rx = rx.clone();
                let handle = thread::Builder::new()
                    .name(format!("tsnative-decode-{worker_id}"))
                    .spawn_scoped(scope, move || {
                        let mut state = new_state(worker_id);
                        run_worker_loop(worker_id, worker_rx, &mut state, processor, telemetry);
                    })?;
                handles.push(handle);
            }
            drop(rx);

            let queue = WorkQueue { tx };
            let produced = producer(&queue);
            drop(queue);

            let joined = join_workers(handles);
            let value = produced?;
            joined?;
            Ok(value)
        })
    }
}

/// Producer side of the bounded work queue.
pub struct WorkQueue<T> {
    tx: Sender<T>,
}

impl<T> WorkQueue<T> {
    /// Enqueues `item`, blocking while the queue is full.
    pub fn submit(&self, item: T) -> Result<()> {
        self.tx.send(item).map_err(|_| {
            IngestError::WorkerPanicked("all decode workers exited before the queue closed".into())
        })
    }

    /// Items currently waiting for a worker.
    pub fn len(&self) -> usize {
        self.tx.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tx.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.tx.capacity().unwrap_or(usize::MAX)
    }
}

fn run_worker_loop<T, S, P>(
    worker_id: usize,
    rx: Receiver<T>,
    state: &mut S,
    processor: &P,
    telemetry: &dyn WorkerTelemetry,
) where
    P: Fn(usize, &mut S, T) -> Result<()>,
{
    // Blocks while the queue is empty; ends once it is closed and drained.
    for item in rx.iter() {
        telemetry.on_queue_depth(worker_id, rx.len());
        telemetry.on_task_started(worker_id);
        let started_at = Instant::now();

        let result = match catch_unwind(AssertUnwindSafe(|| processor(worker_id, state, item))) {
            Ok(result) => result,
            Err(payload) => {
                let err = IngestError::WorkerPanicked(panic_message(payload.as_ref()));
                tracing::error!(worker_id, error = %err, "decode task panicked");
                Err(err)
            }
        };

        let elapsed = started_at.elapsed();
        match result {
            Ok(()) => telemetry.on_task_finished(worker_id, elapsed),
            Err(_) => telemetry.on_task_failed(worker_id, elapsed),
        }
    }
}

fn join_workers(handles: Vec<ScopedJoinHandle<'_, ()>>) -> Result<()> {
    let mut first_error = None;
    for handle in handles {
        if let Err(payload) = handle.join() {
            first_error.get_or_insert_with(|| {
                IngestError::WorkerPanicked(panic_message(payload.as_ref()))
            });
        }
    }
    match first_error {
        Some(err) => Err(err),
        None => Ok(()),
    }
}

pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
