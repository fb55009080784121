//! Task scheduler interface (spec §5, §6 "Consumed collaborator interfaces").
//!
//! The core treats scheduling as an external collaborator: it submits ray
//! batches and joins them, but the scheduling policy itself — how many
//! worker threads, how jobs are queued — is swappable. [`ThreadPoolScheduler`]
//! is the default implementation, a small fixed-size pool over
//! `crossbeam_channel`.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::thread;

use crossbeam_channel::{bounded, unbounded, Receiver, Sender};

use crate::error::{AuralTraceError, Result};

/// Opaque handle to a submitted task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TaskHandle(u64);

pub type Task = Box<dyn FnOnce() + Send + 'static>;

/// External collaborator that runs CPU-bound probe tasks (spec §5: "there
/// is no cooperative suspension inside a task; tasks are CPU-bound").
pub trait TaskScheduler: Send + Sync {
    /// Queues `task`, first waiting for every handle in `depends_on` to
    /// complete. Mirrors the way `RoomEstimateFinish` depends on its
    /// sibling per-direction tasks (spec §4.7).
    fn submit(&self, depends_on: &[TaskHandle], task: Task) -> Result<TaskHandle>;

    /// Blocks the calling thread until `handle`'s task has completed.
    fn join(&self, handle: TaskHandle) -> Result<()>;

    /// Blocks until every task submitted so far has completed (spec §6
    /// `join_all`: the tick boundary barrier).
    fn join_all(&self) -> Result<()>;
}

struct Job {
    body: Task,
    done: Sender<()>,
}

/// Fixed-size worker pool. Jobs queue on an unbounded `crossbeam_channel`;
/// each submission gets its own single-slot completion channel so `join`
/// can wait on exactly one task without waking up for unrelated ones.
pub struct ThreadPoolScheduler {
    job_sender: Sender<Job>,
    workers: Vec<thread::JoinHandle<()>>,
    completions: Mutex<HashMap<u64, Receiver<()>>>,
    next_id: AtomicU64,
}

impl ThreadPoolScheduler {
    pub fn new(worker_count: usize) -> Self {
        let (job_sender, job_receiver) = unbounded::<Job>();
        let worker_count = worker_count.max(1);
        let workers = (0..worker_count)
            .map(|_| {
                let job_receiver = job_receiver.clone();
                thread::spawn(move || {
                    while let Ok(job) = job_receiver.recv() {
                        (job.body)();
                        let _ = job.done.send(());
                    }
                })
            })
            .collect();
        Self {
            job_sender,
            workers,
            completions: Mutex::new(HashMap::new()),
            next_id: AtomicU64::new(0),
        }
    }

    /// One worker per available core, matching the number of probe
    /// directions typically run concurrently.
    pub fn with_default_parallelism() -> Self {
        let workers = thread::available_parallelism().map(|n| n.get()).unwrap_or(4);
        Self::new(workers)
    }
}

impl TaskScheduler for ThreadPoolScheduler {
    fn submit(&self, depends_on: &[TaskHandle], task: Task) -> Result<TaskHandle> {
        for dep in depends_on {
            self.join(*dep)?;
        }

        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (done_tx, done_rx) = bounded(1);
        self.completions.lock().unwrap().insert(id, done_rx);

        self.job_sender
            .send(Job {
                body: task,
                done: done_tx,
            })
            .map_err(|e| AuralTraceError::Scheduler(format!("worker pool is shut down: {e}")))?;

        Ok(TaskHandle(id))
    }

    fn join(&self, handle: TaskHandle) -> Result<()> {
        let receiver = self.completions.lock().unwrap().remove(&handle.0);
        match receiver {
            Some(rx) => rx
                .recv()
                .map_err(|e| AuralTraceError::Scheduler(format!("task {} vanished: {e}", handle.0))),
            // Already joined (or never existed) — joining twice is harmless.
            None => Ok(()),
        }
    }

    fn join_all(&self) -> Result<()> {
        let pending: Vec<Receiver<()>> = {
            let mut completions = self.completions.lock().unwrap();
            completions.drain().map(|(_, rx)| rx).collect()
        };
        for rx in pending {
            rx.recv()
                .map_err(|e| AuralTraceError::Scheduler(format!("task vanished before join_all: {e}")))?;
        }
        Ok(())
    }
}

impl Drop for ThreadPoolScheduler {
    fn drop(&mut self) {
        // Dropping `job_sender` unblocks every worker's `recv()`; take the
        // handles so we can join them without borrowing `self` twice.
        let workers = std::mem::take(&mut self.workers);
        for worker in workers {
            let _ = worker.join();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn join_all_waits_for_every_submitted_task() {
        let scheduler = ThreadPoolScheduler::new(4);
        let counter = Arc::new(std::sync::atomic::AtomicUsize::new(0));
        for _ in 0..8 {
            let counter = counter.clone();
            scheduler
                .submit(
                    &[],
                    Box::new(move || {
                        counter.fetch_add(1, Ordering::SeqCst);
                    }),
                )
                .unwrap();
        }
        scheduler.join_all().unwrap();
        assert_eq!(counter.load(Ordering::SeqCst), 8);
    }

    #[test]
    fn dependent_task_runs_after_its_dependency() {
        let scheduler = ThreadPoolScheduler::new(2);
        let order = Arc::new(Mutex::new(Vec::new()));

        let order_a = order.clone();
        let first = scheduler
            .submit(
                &[],
                Box::new(move || {
                    order_a.lock().unwrap().push(1);
                }),
            )
            .unwrap();

        let order_b = order.clone();
        scheduler
            .submit(
                &[first],
                Box::new(move || {
                    order_b.lock().unwrap().push(2);
                }),
            )
            .unwrap();

        scheduler.join_all().unwrap();
        assert_eq!(*order.lock().unwrap(), vec![1, 2]);
    }
}
