//! Single-occupancy holder for a background poll loop.

use crate::models::StatusSnapshot;
use crate::polling::poller::{poll_status, PollConfig, PollOutcome};
use crate::polling::source::StatusSource;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::debug;

struct ActivePoll {
    job_id: String,
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

/// Owns at most one running poll loop.
///
/// Starting a loop cancels the one already running, and dropping the slot
/// cancels whatever is left. A cancelled loop never calls its `on_done`.
#[derive(Default)]
pub struct PollSlot {
    active: Option<ActivePoll>,
}

impl PollSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Spawn a poll loop for `job_id`, replacing any loop already running.
    ///
    /// `on_done` runs once, when the loop reaches an outcome.
    pub fn start<S, T, D>(
        &mut self,
        source: Arc<S>,
        job_id: impl Into<String>,
        config: PollConfig,
        on_tick: T,
        on_done: D,
    ) where
        S: StatusSource + ?Sized + 'static,
        T: FnMut(u32, &StatusSnapshot) + Send + 'static,
        D: FnOnce(PollOutcome) + Send + 'static,
    {
        if self.cancel() {
            debug!("Cancelled previous poll loop");
        }

        let job_id = job_id.into();
        let cancel = CancellationToken::new();

        let task_cancel = cancel.clone();
        let task_job_id = job_id.clone();
        let handle = tokio::spawn(async move {
            let outcome =
                poll_status(source.as_ref(), &task_job_id, &config, &task_cancel, on_tick).await;
            if let Some(outcome) = outcome {
                if !task_cancel.is_cancelled() {
                    on_done(outcome);
                }
            }
        });

        self.active = Some(ActivePoll {
            job_id,
            cancel,
            handle,
        });
    }

    /// Cancel the running loop. Returns whether one was still running.
    pub fn cancel(&mut self) -> bool {
        match self.active.take() {
            Some(active) => {
                let was_running = !active.handle.is_finished();
                active.cancel.cancel();
                was_running
            }
            None => false,
        }
    }

    pub fn is_active(&self) -> bool {
        self.active
            .as_ref()
            .is_some_and(|active| !active.handle.is_finished())
    }

    /// Job tracked by the current loop, if any.
    pub fn job_id(&self) -> Option<&str> {
        self.active.as_ref().map(|active| active.job_id.as_str())
    }
}

impl Drop for PollSlot {
    fn drop(&mut self) {
        self.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{JobStatus, Step};
    use crate::polling::testing::{snapshot, ScriptedSource};
    use serde_json::json;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;
    use tokio::sync::oneshot;
    use tokio::time;

    fn config(max_polls: u32) -> PollConfig {
        PollConfig {
            step: Step::Analysis,
            interval: Duration::from_secs(2),
            max_polls,
            max_consecutive_errors: 10,
        }
    }

    fn never_done() -> Arc<ScriptedSource> {
        Arc::new(ScriptedSource::new(|_| {
            Ok(snapshot(JobStatus::Processing, Step::Analysis, "processing", None))
        }))
    }

    fn done_on(call: u32) -> Arc<ScriptedSource> {
        Arc::new(ScriptedSource::new(move |n| {
            Ok(if n >= call {
                snapshot(
                    JobStatus::Completed,
                    Step::Analysis,
                    "completed",
                    Some(json!({"summary": "done"})),
                )
            } else {
                snapshot(JobStatus::Processing, Step::Analysis, "processing", None)
            })
        }))
    }

    fn counter() -> Arc<AtomicU32> {
        Arc::new(AtomicU32::new(0))
    }

    #[tokio::test(start_paused = true)]
    async fn test_on_done_called_once() {
        let mut slot = PollSlot::new();
        let source = done_on(2);
        let done = counter();
        let (tx, rx) = oneshot::channel();

        let done_in_task = done.clone();
        slot.start(source.clone(), "job-1", config(300), |_, _| {}, move |outcome| {
            done_in_task.fetch_add(1, Ordering::SeqCst);
            let _ = tx.send(outcome);
        });
        assert!(slot.is_active());
        assert_eq!(slot.job_id(), Some("job-1"));

        let outcome = rx.await.unwrap();
        assert!(outcome.is_success());

        time::sleep(Duration::from_secs(60)).await;
        assert_eq!(done.load(Ordering::SeqCst), 1);
        assert_eq!(source.calls(), 2);
        assert!(!slot.is_active());
    }

    #[tokio::test(start_paused = true)]
    async fn test_restart_cancels_previous_loop() {
        let mut slot = PollSlot::new();
        let first = never_done();
        let first_done = counter();
        let first_done_in_task = first_done.clone();

        slot.start(first.clone(), "job-a", config(300), |_, _| {}, move |_| {
            first_done_in_task.fetch_add(1, Ordering::SeqCst);
        });

        time::sleep(Duration::from_secs(5)).await;
        assert_eq!(first.calls(), 2);

        let second = done_on(3);
        let second_done = counter();
        let second_done_in_task = second_done.clone();
        let (tx, rx) = oneshot::channel();
        slot.start(second.clone(), "job-b", config(300), |_, _| {}, move |outcome| {
            second_done_in_task.fetch_add(1, Ordering::SeqCst);
            let _ = tx.send(outcome);
        });
        assert_eq!(slot.job_id(), Some("job-b"));

        rx.await.unwrap();
        time::sleep(Duration::from_secs(600)).await;

        assert_eq!(first.calls(), 2, "cancelled loop kept polling");
        assert_eq!(first_done.load(Ordering::SeqCst), 0);
        assert_eq!(second_done.load(Ordering::SeqCst), 1);
        assert_eq!(second.calls(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_reported_once() {
        let mut slot = PollSlot::new();
        let source = never_done();
        let (tx, rx) = oneshot::channel();

        slot.start(source.clone(), "job", config(4), |_, _| {}, move |outcome| {
            let _ = tx.send(outcome);
        });

        let outcome = rx.await.unwrap();
        assert!(matches!(outcome, PollOutcome::TimedOut { polls: 4, .. }));

        time::sleep(Duration::from_secs(60)).await;
        assert_eq!(source.calls(), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_drop_cancels() {
        let source = never_done();
        let done = counter();
        {
            let mut slot = PollSlot::new();
            let done_in_task = done.clone();
            slot.start(source.clone(), "job", config(300), |_, _| {}, move |_| {
                done_in_task.fetch_add(1, Ordering::SeqCst);
            });
            time::sleep(Duration::from_secs(3)).await;
        }

        let calls_at_drop = source.calls();
        time::sleep(Duration::from_secs(60)).await;
        assert_eq!(calls_at_drop, 1);
        assert_eq!(source.calls(), calls_at_drop);
        assert_eq!(done.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_cancel_idle_slot() {
        let mut slot = PollSlot::new();
        assert!(!slot.cancel());
        assert!(!slot.is_active());
        assert!(slot.job_id().is_none());
    }
}
