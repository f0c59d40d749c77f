use std::any::Any;
use std::collections::HashMap;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use tokio::runtime::Handle;
use tokio::sync::oneshot;
use tracing::{debug, error, info, warn};

use super::{CancelToken, Job, PoolStats, TaskError, TaskHandle, WorkerPool};

#[derive(Debug, Default)]
struct Counters {
    submitted: AtomicU64,
    completed: AtomicU64,
    interrupted: AtomicU64,
    failed: AtomicU64,
}

type InFlight = Arc<Mutex<HashMap<u64, CancelToken>>>;

/// [`WorkerPool`] backed by tokio's blocking thread pool.
///
/// The number of threads is bounded by the runtime's
/// `max_blocking_threads`; jobs beyond that queue inside tokio.
pub struct BlockingPool {
    runtime: Handle,
    next_id: AtomicU64,
    in_flight: InFlight,
    counters: Arc<Counters>,
    shutting_down: AtomicBool,
}

impl BlockingPool {
    pub fn new(runtime: Handle) -> Self {
        Self {
            runtime,
            next_id: AtomicU64::new(1),
            in_flight: Arc::new(Mutex::new(HashMap::new())),
            counters: Arc::new(Counters::default()),
            shutting_down: AtomicBool::new(false),
        }
    }

    /// Pool bound to the runtime of the calling task.
    ///
    /// Panics outside a tokio runtime, like `Handle::current`.
    pub fn current() -> Self {
        Self::new(Handle::current())
    }

    pub fn is_shutting_down(&self) -> bool {
        self.shutting_down.load(Ordering::SeqCst)
    }
}

fn lock(in_flight: &InFlight) -> std::sync::MutexGuard<'_, HashMap<u64, CancelToken>> {
    in_flight.lock().unwrap_or_else(PoisonError::into_inner)
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        format!("worker panicked: {}", s)
    } else if let Some(s) = payload.downcast_ref::<String>() {
        format!("worker panicked: {}", s)
    } else {
        "worker panicked".to_string()
    }
}

impl WorkerPool for BlockingPool {
    fn submit(&self, job: Job) -> TaskHandle {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let token = CancelToken::new();
        {
            // Flag check and registration share the lock `shutdown` takes,
            // so a job either lands in the map before shutdown cancels it or
            // sees the flag set.
            let mut in_flight = lock(&self.in_flight);
            if self.is_shutting_down() {
                token.cancel();
            }
            in_flight.insert(id, token.clone());
        }
        self.counters.submitted.fetch_add(1, Ordering::Relaxed);

        let (tx, rx) = oneshot::channel();
        let in_flight = Arc::clone(&self.in_flight);
        let counters = Arc::clone(&self.counters);
        let job_token = token.clone();

        self.runtime.spawn_blocking(move || {
            let result = panic::catch_unwind(AssertUnwindSafe(|| job(&job_token)))
                .unwrap_or_else(|payload| Err(TaskError::Internal(panic_message(payload))));

            lock(&in_flight).remove(&id);
            match &result {
                Ok(_) => {
                    counters.completed.fetch_add(1, Ordering::Relaxed);
                }
                Err(TaskError::Interrupted) => {
                    counters.interrupted.fetch_add(1, Ordering::Relaxed);
                    warn!(task = id, "compute task interrupted");
                }
                Err(TaskError::Internal(msg)) => {
                    counters.failed.fetch_add(1, Ordering::Relaxed);
                    error!(task = id, "compute task failed: {}", msg);
                }
            }

            if tx.send(result).is_err() {
                debug!(task = id, "caller went away before the task finished");
            }
        });

        TaskHandle::new(id, rx, token)
    }

    fn cancel_all(&self) -> usize {
        let tokens = lock(&self.in_flight);
        for token in tokens.values() {
            token.cancel();
        }
        tokens.len()
    }

    fn shutdown(&self) {
        let n = {
            let tokens = lock(&self.in_flight);
            self.shutting_down.store(true, Ordering::SeqCst);
            for token in tokens.values() {
                token.cancel();
            }
            tokens.len()
        };
        info!("Worker pool shutting down, interrupted {} in-flight tasks", n);
    }

    fn stats(&self) -> PoolStats {
        PoolStats {
            submitted: self.counters.submitted.load(Ordering::Relaxed),
            in_flight: lock(&self.in_flight).len() as u64,
            completed: self.counters.completed.load(Ordering::Relaxed),
            interrupted: self.counters.interrupted.load(Ordering::Relaxed),
            failed: self.counters.failed.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workload::WorkReport;
    use std::time::{Duration, Instant};

    fn report() -> WorkReport {
        WorkReport { buffer_len: 0, pause: Duration::ZERO, checksum: 0.0 }
    }

    fn sleeping_job(pause: Duration) -> Job {
        Box::new(move |token: &CancelToken| {
            token.sleep(pause)?;
            Ok(report())
        })
    }

    async fn wait_until_idle(pool: &BlockingPool) {
        let deadline = Instant::now() + Duration::from_secs(5);
        while pool.stats().in_flight > 0 && Instant::now() < deadline {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    }

    #[tokio::test]
    async fn runs_job_and_counts_completion() {
        let pool = BlockingPool::current();
        let result = pool.submit(sleeping_job(Duration::ZERO)).join().await;
        assert!(result.is_ok());

        let stats = pool.stats();
        assert_eq!(stats.submitted, 1);
        assert_eq!(stats.completed, 1);
        assert_eq!(stats.in_flight, 0);
    }

    #[tokio::test]
    async fn panic_becomes_internal_error() {
        let pool = BlockingPool::current();
        let err = pool
            .submit(Box::new(|_: &CancelToken| -> Result<WorkReport, TaskError> {
                panic!("boom")
            }))
            .join()
            .await
            .unwrap_err();
        assert_eq!(err, TaskError::Internal("worker panicked: boom".into()));
        assert_eq!(pool.stats().failed, 1);
    }

    #[tokio::test]
    async fn cancel_all_interrupts_running_jobs() {
        let pool = BlockingPool::current();
        let handle = pool.submit(sleeping_job(Duration::from_secs(30)));

        // Wait for the job to register before cancelling.
        while pool.stats().in_flight == 0 {
            tokio::time::sleep(Duration::from_millis(1)).await;
        }
        assert_eq!(pool.cancel_all(), 1);

        assert_eq!(handle.join().await.unwrap_err(), TaskError::Interrupted);
        let stats = pool.stats();
        assert_eq!(stats.interrupted, 1);
        assert_eq!(stats.completed, 0);
    }

    #[tokio::test]
    async fn handle_cancel_interrupts_only_its_job() {
        let pool = BlockingPool::current();
        let cancelled = pool.submit(sleeping_job(Duration::from_millis(200)));
        let untouched = pool.submit(sleeping_job(Duration::from_millis(200)));
        cancelled.cancel();

        assert_eq!(cancelled.join().await.unwrap_err(), TaskError::Interrupted);
        assert!(untouched.join().await.is_ok());
        let stats = pool.stats();
        assert_eq!((stats.interrupted, stats.completed), (1, 1));
    }

    #[tokio::test]
    async fn dropped_handle_interrupts_job() {
        let pool = BlockingPool::current();
        let handle = pool.submit(sleeping_job(Duration::from_secs(30)));
        drop(handle);

        wait_until_idle(&pool).await;
        assert_eq!(pool.stats().interrupted, 1);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn shutdown_racing_submitters_interrupts_every_job() {
        let pool = Arc::new(BlockingPool::current());
        let barrier = Arc::new(std::sync::Barrier::new(5));

        let submitters: Vec<_> = (0..4)
            .map(|_| {
                let pool = Arc::clone(&pool);
                let barrier = Arc::clone(&barrier);
                std::thread::spawn(move || {
                    barrier.wait();
                    (0..50)
                        .map(|_| pool.submit(sleeping_job(Duration::from_secs(30))))
                        .collect::<Vec<_>>()
                })
            })
            .collect();

        barrier.wait();
        pool.shutdown();

        let mut handles = Vec::new();
        for submitter in submitters {
            handles.extend(submitter.join().unwrap());
        }
        assert_eq!(handles.len(), 200);

        let joined = tokio::time::timeout(Duration::from_secs(5), async {
            for handle in handles {
                assert_eq!(handle.join().await.unwrap_err(), TaskError::Interrupted);
            }
        })
        .await;
        assert!(joined.is_ok(), "a job submitted around shutdown kept running");
        assert_eq!(pool.stats().interrupted, 200);
    }

    #[tokio::test]
    async fn jobs_after_shutdown_are_interrupted() {
        let pool = BlockingPool::current();
        pool.shutdown();
        assert!(pool.is_shutting_down());

        let err = pool
            .submit(sleeping_job(Duration::ZERO))
            .join()
            .await
            .unwrap_err();
        assert_eq!(err, TaskError::Interrupted);
    }
}
