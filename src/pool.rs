//! Bounded worker pool for per-image resize jobs.
//!
//! The assembler submits one job per target size of the current image and
//! then calls [`ResizeWorkerPool::drain`], which blocks until every job
//! submitted since the previous drain has finished. That drain is the
//! per-image barrier: the next source is not decoded until the current
//! one's renditions are all written, so peak memory stays at one decoded
//! source plus at most `workers` scaled copies.
//!
//! Jobs run on a dedicated rayon pool (not the global one) sized from
//! `[processing] workers`. Completion is tracked with a pending counter and
//! a condvar; each job's outcome is collected and returned from `drain` in
//! submission order, whatever order the workers finished in.

use crate::imaging::{BackendError, ImageBackend, ResizeParams};
use image::DynamicImage;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::path::PathBuf;
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use thiserror::Error;
use tracing::debug;

#[derive(Error, Debug)]
pub enum PoolError {
    #[error("failed to start resize workers: {0}")]
    Build(#[from] rayon::ThreadPoolBuildError),
}

/// One rendition to produce: shared source pixels plus what to write where.
#[derive(Debug, Clone)]
pub struct ResizeJob {
    pub source: Arc<DynamicImage>,
    pub params: ResizeParams,
    /// Size directory name, used in progress output and failure records.
    pub label: String,
}

/// Result of one finished job.
#[derive(Debug)]
pub struct JobOutcome {
    pub label: String,
    pub output: PathBuf,
    pub result: Result<(), BackendError>,
}

#[derive(Default)]
struct PendingState {
    in_flight: usize,
    finished: Vec<(usize, JobOutcome)>,
}

#[derive(Default)]
struct Pending {
    state: Mutex<PendingState>,
    done: Condvar,
}

impl Pending {
    fn lock(&self) -> MutexGuard<'_, PendingState> {
        // Jobs never panic while holding the lock, so a poisoned state is still consistent
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn finish(&self, seq: usize, outcome: JobOutcome) {
        let mut state = self.lock();
        state.in_flight -= 1;
        state.finished.push((seq, outcome));
        if state.in_flight == 0 {
            self.done.notify_all();
        }
    }
}

/// Bounded-concurrency executor for resize jobs.
pub struct ResizeWorkerPool {
    pool: rayon::ThreadPool,
    backend: Arc<dyn ImageBackend>,
    pending: Arc<Pending>,
    next_seq: usize,
    workers: usize,
}

impl ResizeWorkerPool {
    /// Start a pool with `workers` threads (at least one).
    pub fn new(workers: usize, backend: Arc<dyn ImageBackend>) -> Result<Self, PoolError> {
        let workers = workers.max(1);
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(workers)
            .thread_name(|i| format!("resize-{i}"))
            .build()?;
        debug!(workers, "resize pool started");
        Ok(Self {
            pool,
            backend,
            pending: Arc::new(Pending::default()),
            next_seq: 0,
            workers,
        })
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Queue a job. Returns immediately; the job runs on a pool thread.
    pub fn submit(&mut self, job: ResizeJob) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.pending.lock().in_flight += 1;

        let backend = Arc::clone(&self.backend);
        let pending = Arc::clone(&self.pending);
        self.pool.spawn_fifo(move || {
            let ResizeJob {
                source,
                params,
                label,
            } = job;
            let result = catch_unwind(AssertUnwindSafe(|| backend.resize(&source, &params)))
                .unwrap_or_else(|_| {
                    Err(BackendError::ProcessingFailed(format!(
                        "resize job for {} panicked",
                        params.output.display()
                    )))
                });
            debug!(label = %label, ok = result.is_ok(), "resize job finished");
            pending.finish(
                seq,
                JobOutcome {
                    label,
                    output: params.output,
                    result,
                },
            );
        });
    }

    /// Block until every job submitted since the last drain has completed,
    /// and return their outcomes in submission order.
    pub fn drain(&mut self) -> Vec<JobOutcome> {
        let mut state = self.pending.lock();
        while state.in_flight > 0 {
            state = self
                .pending
                .done
                .wait(state)
                .unwrap_or_else(PoisonError::into_inner);
        }
        let mut finished = std::mem::take(&mut state.finished);
        drop(state);
        finished.sort_by_key(|(seq, _)| *seq);
        finished.into_iter().map(|(_, outcome)| outcome).collect()
    }
}

impl Drop for ResizeWorkerPool {
    fn drop(&mut self) {
        // Never leave detached jobs writing into the album after the pool is gone
        self.drain();
    }
}
