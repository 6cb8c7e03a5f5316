//! Background work queue
//!
//! An unbounded FIFO channel between interpreter threads (producers) and a
//! fixed set of worker threads (consumers). `push` never blocks. Workers pop
//! items in submission order; with a single worker, which is the default,
//! side effects of queued operations also happen in submission order. That
//! is what keeps sequential queries on one connection in order.
//!
//! The queue carries no domain knowledge. It only runs [`WorkItem`]s and
//! lets each one deliver its own result.
//!
//! There is no timeout or cancellation: an operation that stalls holds up
//! everything queued behind it on the same worker.

use crate::config::RuntimeConfig;
use crate::error::{RuntimeError, RuntimeResult};
use crate::state::GlobalState;
use crate::work::{Delivery, Execution, WorkItem};
use crossbeam_channel::{Receiver, Sender, unbounded};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::thread::JoinHandle;
use tracing::{debug, debug_span, info_span};

/// Statistics about queue operation
///
/// All counters are atomic and can be read at any time without locking.
#[derive(Debug, Default)]
pub struct QueueStats {
    /// Items pushed onto the queue
    pub submitted: AtomicU64,
    /// Items executed, whatever happened to their result
    pub completed: AtomicU64,
    /// Results written into a live context
    pub delivered: AtomicU64,
    /// Results discarded because the context was destroyed
    pub dropped: AtomicU64,
    /// Results refused because the context was not suspended
    pub rejected: AtomicU64,
    /// Operations that panicked
    pub panicked: AtomicU64,
}

impl QueueStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> QueueStatsSnapshot {
        QueueStatsSnapshot {
            submitted: self.submitted.load(Ordering::Relaxed),
            completed: self.completed.load(Ordering::Relaxed),
            delivered: self.delivered.load(Ordering::Relaxed),
            dropped: self.dropped.load(Ordering::Relaxed),
            rejected: self.rejected.load(Ordering::Relaxed),
            panicked: self.panicked.load(Ordering::Relaxed),
        }
    }

    /// Items submitted but not yet finished
    pub fn in_flight(&self) -> u64 {
        let submitted = self.submitted.load(Ordering::Relaxed);
        let completed = self.completed.load(Ordering::Relaxed);
        submitted.saturating_sub(completed)
    }

    fn record(&self, execution: Execution) {
        match execution.delivery {
            Delivery::Delivered => self.delivered.fetch_add(1, Ordering::Relaxed),
            Delivery::Dropped => self.dropped.fetch_add(1, Ordering::Relaxed),
            Delivery::Rejected => self.rejected.fetch_add(1, Ordering::Relaxed),
        };
        if execution.panicked {
            self.panicked.fetch_add(1, Ordering::Relaxed);
        }
        self.completed.fetch_add(1, Ordering::Relaxed);
    }
}

/// A point-in-time snapshot of queue statistics
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueueStatsSnapshot {
    pub submitted: u64,
    pub completed: u64,
    pub delivered: u64,
    pub dropped: u64,
    pub rejected: u64,
    pub panicked: u64,
}

enum Job {
    Run(WorkItem),
    Shutdown,
}

/// Owner of the worker threads
pub struct WorkQueue {
    job_tx: Sender<Job>,
    workers: Vec<JoinHandle<()>>,
    stats: Arc<QueueStats>,
}

impl WorkQueue {
    /// Start the worker threads
    pub fn start(config: &RuntimeConfig, state: Arc<GlobalState>) -> RuntimeResult<Self> {
        config.validate()?;
        let (job_tx, job_rx) = unbounded::<Job>();
        let stats = Arc::new(QueueStats::new());
        let mut workers = Vec::with_capacity(config.worker_threads);

        for i in 0..config.worker_threads {
            let rx = job_rx.clone();
            let worker_state = state.clone();
            let worker_stats = stats.clone();

            let handle = std::thread::Builder::new()
                .name(format!("{}-{}", config.thread_name_prefix, i))
                .spawn(move || run_worker(rx, worker_state, worker_stats))
                .map_err(RuntimeError::Spawn)?;

            workers.push(handle);
        }

        Ok(Self {
            job_tx,
            workers,
            stats,
        })
    }

    /// Get a thread-safe handle for submitting work
    pub fn handle(&self) -> QueueHandle {
        QueueHandle {
            job_tx: self.job_tx.clone(),
            stats: self.stats.clone(),
        }
    }

    pub fn stats(&self) -> &QueueStats {
        &self.stats
    }

    /// Number of items waiting to be picked up
    pub fn len(&self) -> usize {
        self.job_tx.len()
    }

    pub fn is_empty(&self) -> bool {
        self.job_tx.is_empty()
    }

    pub fn worker_count(&self) -> usize {
        self.workers.len()
    }

    /// Stop the workers once everything already queued has run
    pub fn shutdown(self) {
        for _ in &self.workers {
            let _ = self.job_tx.send(Job::Shutdown);
        }
        for worker in self.workers {
            let _ = worker.join();
        }
    }
}

/// Cloneable producer side of the queue
#[derive(Clone)]
pub struct QueueHandle {
    job_tx: Sender<Job>,
    stats: Arc<QueueStats>,
}

impl QueueHandle {
    /// Enqueue an item and return immediately
    pub fn push(&self, item: WorkItem) -> RuntimeResult<()> {
        self.job_tx
            .send(Job::Run(item))
            .map_err(|_| RuntimeError::QueueClosed)?;
        self.stats.submitted.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.job_tx.len()
    }

    pub fn is_empty(&self) -> bool {
        self.job_tx.is_empty()
    }

    pub fn stats(&self) -> QueueStatsSnapshot {
        self.stats.snapshot()
    }
}

fn run_worker(job_rx: Receiver<Job>, state: Arc<GlobalState>, stats: Arc<QueueStats>) {
    let thread_name = std::thread::current()
        .name()
        .unwrap_or("sluice-worker")
        .to_string();

    let _span = info_span!("worker", name = %thread_name).entered();
    debug!("Worker starting");

    for job in job_rx.iter() {
        match job {
            Job::Run(item) => {
                let _span =
                    debug_span!("work", op = item.name(), context = %item.target().id()).entered();
                let execution = item.execute(&state);
                stats.record(execution);
            }
            Job::Shutdown => {
                debug!("Received shutdown signal");
                break;
            }
        }
    }

    debug!("Worker stopped");
}
