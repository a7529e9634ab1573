//! The poll loop itself.

use crate::config::PollingConfig;
use crate::models::{JobStatus, StatusSnapshot, Step, StepStatus};
use crate::polling::source::StatusSource;
use serde_json::Value;
use std::time::Duration;
use tokio::time::{self, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Ticks between "still polling" progress logs.
const PROGRESS_LOG_EVERY: u32 = 15;

/// Settings of one poll loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollConfig {
    /// Step whose completion ends the loop.
    pub step: Step,
    /// Delay between status requests.
    pub interval: Duration,
    /// Status requests issued before giving up.
    pub max_polls: u32,
    /// Consecutive failed requests tolerated before giving up.
    pub max_consecutive_errors: u32,
}

impl PollConfig {
    /// Poll budget for `step` from the configured defaults.
    pub fn for_step(step: Step, polling: &PollingConfig) -> Self {
        let max_polls = match step {
            Step::Analysis => polling.analysis_max_polls,
            Step::Gdpr => polling.gdpr_max_polls,
            Step::Sharing => polling.sharing_max_polls,
        };
        Self {
            step,
            interval: polling.interval(),
            max_polls,
            max_consecutive_errors: polling.max_consecutive_errors,
        }
    }

    /// Wall-clock time the loop may run before timing out.
    pub fn budget(&self) -> Duration {
        self.interval * self.max_polls
    }
}

/// How a poll loop ended.
#[derive(Debug, Clone, PartialEq)]
pub enum PollOutcome {
    /// The step completed and produced a result.
    Completed {
        result: Value,
        snapshot: StatusSnapshot,
        polls: u32,
    },
    /// The step or the whole job failed.
    Failed {
        reason: String,
        snapshot: StatusSnapshot,
        polls: u32,
    },
    /// The poll budget ran out first.
    TimedOut {
        polls: u32,
        last: Option<StatusSnapshot>,
    },
    /// Too many consecutive status requests failed.
    Unreachable { polls: u32, error: String },
}

impl PollOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, PollOutcome::Completed { .. })
    }

    pub fn polls(&self) -> u32 {
        match self {
            PollOutcome::Completed { polls, .. }
            | PollOutcome::Failed { polls, .. }
            | PollOutcome::TimedOut { polls, .. }
            | PollOutcome::Unreachable { polls, .. } => *polls,
        }
    }

    /// Last status seen before the loop ended.
    pub fn last_snapshot(&self) -> Option<&StatusSnapshot> {
        match self {
            PollOutcome::Completed { snapshot, .. } | PollOutcome::Failed { snapshot, .. } => {
                Some(snapshot)
            }
            PollOutcome::TimedOut { last, .. } => last.as_ref(),
            PollOutcome::Unreachable { .. } => None,
        }
    }
}

/// Terminal reading of a single snapshot.
#[derive(Debug, Clone, PartialEq)]
pub enum Verdict {
    Completed(Value),
    Failed(String),
}

/// Decide whether `snapshot` ends the wait for `step`.
///
/// Returns `None` while the step is still in flight.
pub fn evaluate(step: Step, snapshot: &StatusSnapshot) -> Option<Verdict> {
    let step_status = snapshot.step_status(step);
    let result = snapshot.step_result(step);

    if step_status == StepStatus::Completed {
        if let Some(result) = result {
            return Some(Verdict::Completed(result.clone()));
        }
    }

    if step_status == StepStatus::Failed {
        return Some(Verdict::Failed(format!("{} step failed", step)));
    }

    match snapshot.status {
        JobStatus::Failed => Some(Verdict::Failed("job failed".to_string())),
        JobStatus::Completed => Some(match result {
            Some(result) => Verdict::Completed(result.clone()),
            None => Verdict::Failed(format!("job finished without a {} result", step)),
        }),
        _ => None,
    }
}

/// Poll `source` for `job_id` until the configured step settles.
///
/// The first request goes out one interval after the call. `on_tick` sees
/// every snapshot received. Returns `None` if `cancel` fires first.
pub async fn poll_status<S, F>(
    source: &S,
    job_id: &str,
    config: &PollConfig,
    cancel: &CancellationToken,
    mut on_tick: F,
) -> Option<PollOutcome>
where
    S: StatusSource + ?Sized,
    F: FnMut(u32, &StatusSnapshot),
{
    let interval = config.interval.max(Duration::from_millis(1));
    let max_polls = config.max_polls.max(1);
    let max_errors = config.max_consecutive_errors.max(1);

    let mut ticker = time::interval_at(Instant::now() + interval, interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let mut polls = 0u32;
    let mut consecutive_errors = 0u32;
    let mut last: Option<StatusSnapshot> = None;

    info!(
        "Polling {} step of {} every {:?} (up to {} polls)",
        config.step, job_id, interval, max_polls
    );

    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                debug!("Polling of {} cancelled after {} polls", job_id, polls);
                return None;
            }
            _ = ticker.tick() => {}
        }

        polls += 1;

        let fetched = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                debug!("Polling of {} cancelled mid-request", job_id);
                return None;
            }
            fetched = source.fetch_status(job_id) => fetched,
        };

        match fetched {
            Ok(snapshot) => {
                consecutive_errors = 0;
                on_tick(polls, &snapshot);

                match evaluate(config.step, &snapshot) {
                    Some(Verdict::Completed(result)) => {
                        info!("{} step of {} completed after {} polls", config.step, job_id, polls);
                        return Some(PollOutcome::Completed {
                            result,
                            snapshot,
                            polls,
                        });
                    }
                    Some(Verdict::Failed(reason)) => {
                        warn!("{} step of {} failed: {}", config.step, job_id, reason);
                        return Some(PollOutcome::Failed {
                            reason,
                            snapshot,
                            polls,
                        });
                    }
                    None => last = Some(snapshot),
                }
            }
            Err(e) => {
                consecutive_errors += 1;
                warn!(
                    "Status request {} for {} failed ({}/{}): {}",
                    polls, job_id, consecutive_errors, max_errors, e
                );
                if consecutive_errors >= max_errors {
                    return Some(PollOutcome::Unreachable {
                        polls,
                        error: e.to_string(),
                    });
                }
            }
        }

        if polls >= max_polls {
            warn!("Gave up on {} after {} polls", job_id, polls);
            return Some(PollOutcome::TimedOut { polls, last });
        }

        if polls % PROGRESS_LOG_EVERY == 0 {
            debug!(
                "Still polling {} ({:?} elapsed)",
                job_id,
                interval * polls
            );
        }
    }
}
