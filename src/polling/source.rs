//! Where poll loops read job status from.

use crate::api::ApiClient;
use crate::error::ApiError;
use crate::models::{DocumentRecord, StatusSnapshot, Step, StepStatus};
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use tracing::debug;

/// Anything that can report the status of a job.
#[async_trait]
pub trait StatusSource: Send + Sync {
    async fn fetch_status(&self, job_id: &str) -> Result<StatusSnapshot, ApiError>;
}

#[async_trait]
impl StatusSource for ApiClient {
    async fn fetch_status(&self, job_id: &str) -> Result<StatusSnapshot, ApiError> {
        self.status(job_id).await
    }
}

/// Looks for a persisted result of `step` in the stored document before
/// asking for live status.
///
/// The stored record can carry the result before the status endpoint reports
/// the step as completed. Lookup failures fall through to the status request.
pub struct StoredResultFirst {
    client: Arc<ApiClient>,
    step: Step,
}

impl StoredResultFirst {
    pub fn new(client: Arc<ApiClient>, step: Step) -> Self {
        Self { client, step }
    }
}

#[async_trait]
impl StatusSource for StoredResultFirst {
    async fn fetch_status(&self, job_id: &str) -> Result<StatusSnapshot, ApiError> {
        match self.client.stored_document(job_id).await {
            Ok(doc) => {
                if let Some(result) = doc.stored_result(self.step) {
                    debug!("Found stored {} result for {}", self.step, job_id);
                    return Ok(stored_snapshot(job_id, &doc, self.step, result.clone()));
                }
            }
            Err(e) => debug!("No stored record for {} yet: {}", job_id, e),
        }
        self.client.status(job_id).await
    }
}

/// A snapshot reporting `step` as completed with a stored `result`.
fn stored_snapshot(job_id: &str, doc: &DocumentRecord, step: Step, result: Value) -> StatusSnapshot {
    let mut snapshot = StatusSnapshot {
        processing_id: Some(job_id.to_string()),
        status: doc.status.clone().unwrap_or_default(),
        file_name: doc.file_name.clone(),
        file_size: doc.file_size,
        created_at: doc.created_at,
        ..StatusSnapshot::default()
    };
    match step {
        Step::Analysis => {
            snapshot.steps.analysis = Some(StepStatus::Completed);
            snapshot.results.analysis = Some(result);
        }
        Step::Gdpr => {
            snapshot.steps.gdpr = Some(StepStatus::Completed);
            snapshot.results.gdpr = Some(result);
        }
        Step::Sharing => {
            snapshot.steps.sharing = Some(StepStatus::Completed);
            snapshot.results.sharing = Some(result);
        }
    }
    snapshot
}
