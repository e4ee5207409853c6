use crate::error::OptimizerError;
use configuration::WorkerConfig;
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Semaphore, oneshot};
use tokio_util::sync::CancellationToken;
use tracing::warn;

/// How a task submitted to the [`WorkerPool`] ended.
#[derive(Debug, Clone, PartialEq)]
pub enum TaskOutcome<T> {
    Completed(T),
    /// Hit the per-task timeout; the task's cancellation token was triggered.
    TimedOut,
    /// The task panicked; the pool itself is unaffected.
    Panicked(String),
    /// Cancellation was requested before the task started.
    Cancelled,
}

/// A bounded pool of compute threads for CPU-heavy, per-stock work.
///
/// At most `workers` tasks run at once. Each task's timeout starts when it acquires a
/// worker, not when it is submitted.
#[derive(Clone)]
pub struct WorkerPool {
    pool: Arc<rayon::ThreadPool>,
    permits: Arc<Semaphore>,
    workers: usize,
    task_timeout: Duration,
}

impl WorkerPool {
    pub fn new(max_workers: usize, task_timeout: Duration) -> Result<Self, OptimizerError> {
        let workers = num_cpus::get().min(max_workers).max(1);
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(workers)
            .thread_name(|i| format!("optimizer-{}", i))
            .build()?;

        Ok(Self {
            pool: Arc::new(pool),
            permits: Arc::new(Semaphore::new(workers)),
            workers,
            task_timeout,
        })
    }

    pub fn from_config(config: &WorkerConfig) -> Result<Self, OptimizerError> {
        Self::new(
            config.max_workers,
            Duration::from_secs(config.task_timeout_secs),
        )
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Runs `work` on a pool thread, isolating panics and enforcing the timeout.
    ///
    /// `work` receives a child of `cancel` that is also cancelled on timeout, so a
    /// cooperative task stops promptly instead of holding the thread.
    pub async fn execute<T, F>(&self, cancel: &CancellationToken, work: F) -> TaskOutcome<T>
    where
        T: Send + 'static,
        F: FnOnce(&CancellationToken) -> T + Send + 'static,
    {
        let Ok(_permit) = self.permits.clone().acquire_owned().await else {
            return TaskOutcome::Cancelled;
        };
        if cancel.is_cancelled() {
            return TaskOutcome::Cancelled;
        }

        let task_token = cancel.child_token();
        let worker_token = task_token.clone();
        let (tx, rx) = oneshot::channel();

        self.pool.spawn(move || {
            let result = panic::catch_unwind(AssertUnwindSafe(|| work(&worker_token)));
            // The receiver is gone if the task already timed out.
            let _ = tx.send(result);
        });

        match tokio::time::timeout(self.task_timeout, rx).await {
            Ok(Ok(Ok(value))) => TaskOutcome::Completed(value),
            Ok(Ok(Err(payload))) => TaskOutcome::Panicked(panic_message(payload.as_ref())),
            Ok(Err(_)) => TaskOutcome::Panicked("worker dropped the task".to_string()),
            Err(_) => {
                task_token.cancel();
                warn!(timeout = ?self.task_timeout, "Task exceeded its time limit");
                TaskOutcome::TimedOut
            }
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
