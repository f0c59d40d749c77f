use tokio::sync::oneshot;
use tracing::debug;

use super::{CancelToken, TaskError};
use crate::workload::WorkReport;

/// Awaitable handle to a submitted job.
///
/// Dropping the handle before [`TaskHandle::join`] resolves (for example
/// because the HTTP client disconnected and the request future was dropped)
/// cancels the job.
#[derive(Debug)]
pub struct TaskHandle {
    id: u64,
    rx: oneshot::Receiver<Result<WorkReport, TaskError>>,
    cancel: CancelToken,
    finished: bool,
}

impl TaskHandle {
    pub fn new(
        id: u64,
        rx: oneshot::Receiver<Result<WorkReport, TaskError>>,
        cancel: CancelToken,
    ) -> Self {
        Self { id, rx, cancel, finished: false }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    /// Ask the job to stop at its next cancellation check.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Wait for the job to finish without blocking the current thread.
    ///
    /// A job dropped unrun (the runtime is shutting down) counts as
    /// interrupted.
    pub async fn join(mut self) -> Result<WorkReport, TaskError> {
        let result = match (&mut self.rx).await {
            Ok(result) => result,
            Err(_) => {
                debug!(task = self.id, "task dropped before reporting a result");
                Err(TaskError::Interrupted)
            }
        };
        self.finished = true;
        result
    }
}

impl Drop for TaskHandle {
    fn drop(&mut self) {
        if !self.finished {
            self.cancel.cancel();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn join_returns_sent_result() {
        let (tx, rx) = oneshot::channel();
        let token = CancelToken::new();
        let handle = TaskHandle::new(1, rx, token.clone());
        tx.send(Err(TaskError::Interrupted)).unwrap();
        assert_eq!(handle.join().await.unwrap_err(), TaskError::Interrupted);
        assert!(!token.is_cancelled());
    }

    #[tokio::test]
    async fn dropped_sender_is_interrupted() {
        let (tx, rx) = oneshot::channel::<Result<WorkReport, TaskError>>();
        drop(tx);
        let err = TaskHandle::new(7, rx, CancelToken::new()).join().await.unwrap_err();
        assert_eq!(err, TaskError::Interrupted);
    }

    #[test]
    fn job_dropped_by_runtime_shutdown_is_interrupted() {
        let runtime = tokio::runtime::Builder::new_current_thread().build().unwrap();
        let (tx, rx) = oneshot::channel::<Result<WorkReport, TaskError>>();
        // Never completes, so dropping the runtime drops the sender with it.
        runtime.spawn(async move {
            std::future::pending::<()>().await;
            let _ = tx.send(Err(TaskError::Interrupted));
        });
        drop(runtime);

        let caller = tokio::runtime::Builder::new_current_thread().build().unwrap();
        let err = caller
            .block_on(TaskHandle::new(9, rx, CancelToken::new()).join())
            .unwrap_err();
        assert_eq!(err, TaskError::Interrupted);
    }

    #[tokio::test]
    async fn dropping_pending_join_cancels_job() {
        let (_tx, rx) = oneshot::channel::<Result<WorkReport, TaskError>>();
        let token = CancelToken::new();
        let handle = TaskHandle::new(3, rx, token.clone());

        let timed_out = tokio::time::timeout(Duration::from_millis(10), handle.join()).await;
        assert!(timed_out.is_err());
        assert!(token.is_cancelled());
    }
}
