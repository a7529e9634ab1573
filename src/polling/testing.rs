//! Stub status sources for poll loop tests.

use crate::error::ApiError;
use crate::models::{JobStatus, StatusSnapshot, Step, StepStatus};
use crate::polling::source::StatusSource;
use async_trait::async_trait;
use serde_json::Value;
use std::sync::atomic::{AtomicU32, Ordering};

type Script = dyn Fn(u32) -> Result<StatusSnapshot, ApiError> + Send + Sync;

/// Answers the n-th status request (1-based) with `script(n)`.
pub struct ScriptedSource {
    calls: AtomicU32,
    script: Box<Script>,
}

impl ScriptedSource {
    pub fn new<F>(script: F) -> Self
    where
        F: Fn(u32) -> Result<StatusSnapshot, ApiError> + Send + Sync + 'static,
    {
        Self {
            calls: AtomicU32::new(0),
            script: Box::new(script),
        }
    }

    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl StatusSource for ScriptedSource {
    async fn fetch_status(&self, _job_id: &str) -> Result<StatusSnapshot, ApiError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        (self.script)(call)
    }
}

/// A snapshot where `step` has `step_status` and optionally a result.
pub fn snapshot(
    status: JobStatus,
    step: Step,
    step_status: &str,
    result: Option<Value>,
) -> StatusSnapshot {
    let mut snapshot = StatusSnapshot {
        status,
        ..StatusSnapshot::default()
    };
    let step_status = Some(StepStatus::from(step_status));
    match step {
        Step::Analysis => {
            snapshot.steps.analysis = step_status;
            snapshot.results.analysis = result;
        }
        Step::Gdpr => {
            snapshot.steps.gdpr = step_status;
            snapshot.results.gdpr = result;
        }
        Step::Sharing => {
            snapshot.steps.sharing = step_status;
            snapshot.results.sharing = result;
        }
    }
    snapshot
}
