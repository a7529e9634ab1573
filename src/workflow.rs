//! End-to-end document workflows: analyze, GDPR check, share and approve.
//!
//! Each workflow starts a backend job and then, unless the backend answered
//! right away, waits on it with a poll loop. Waiting shows a spinner and can
//! be interrupted with Ctrl-C, which only stops the local loop.

use crate::api::{ApiClient, ListQuery};
use crate::config::{Config, PollingConfig};
use crate::dashboard::selector::SELECTOR_FETCH_LIMIT;
use crate::dashboard::stats::STATS_FETCH_LIMIT;
use crate::dashboard::{compute_stats, select, DashboardStats, FileFilter};
use crate::error::ApiError;
use crate::models::{
    ApprovalDecision, ApprovalFilter, ApprovalRequest, DocumentRecord, GdprResult, Recipient,
    SharingRequest, StatusSnapshot, Step,
};
use crate::polling::{PollConfig, PollOutcome, PollSlot, StatusSource, StoredResultFirst};
use crate::refresh::Refresher;
use anyhow::{bail, Context, Result};
use chrono::Utc;
use futures::future::BoxFuture;
use futures::FutureExt;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;
use tracing::{debug, info, warn};

/// Mode sent with uploads that should only be analyzed.
const ANALYZE_MODE: &str = "analyze";

/// How a GDPR check ended.
#[derive(Debug)]
pub enum GdprOutcome {
    /// The trigger call answered with the result directly.
    Immediate(GdprResult),
    /// The backend parked the check for an approver.
    PendingApproval { message: String },
    /// The result was waited for.
    Polled(PollOutcome),
}

/// How a sharing request ended.
#[derive(Debug)]
pub enum ShareOutcome {
    /// The backend parked the request for an approver.
    PendingApproval { message: String },
    Polled(PollOutcome),
}

/// Runs workflows against one backend.
pub struct Workflow {
    client: Arc<ApiClient>,
    polling: PollingConfig,
    show_progress: bool,
}

impl Workflow {
    pub fn new(client: Arc<ApiClient>, polling: PollingConfig, show_progress: bool) -> Self {
        Self {
            client,
            polling,
            show_progress,
        }
    }

    pub fn client(&self) -> &ApiClient {
        &self.client
    }

    /// Upload `file` for analysis and return its processing id.
    pub async fn upload(&self, file: &Path, user_id: &str) -> Result<String> {
        let id = self
            .client
            .upload(file, user_id, ANALYZE_MODE)
            .await
            .with_context(|| format!("Failed to upload {}", file.display()))?;
        info!("Upload accepted, processing id {}", id);
        Ok(id)
    }

    /// Upload `file` and wait for its analysis.
    pub async fn analyze(&self, file: &Path, user_id: &str) -> Result<(String, PollOutcome)> {
        let id = self.upload(file, user_id).await?;
        let outcome = self.track(&id, Step::Analysis).await?;
        Ok((id, outcome))
    }

    /// Start the GDPR check of an analyzed document and wait for its result.
    ///
    /// If the trigger endpoint answers with an HTTP error the job may still
    /// have been started another way; the job status is checked and polled
    /// instead of giving up.
    pub async fn run_gdpr(&self, id: &str) -> Result<GdprOutcome> {
        match self.client.trigger_gdpr(id).await {
            Ok(response) => {
                if let Some(result) = response.gdpr_result {
                    info!("GDPR result for {} returned immediately", id);
                    return Ok(GdprOutcome::Immediate(result));
                }
                if response.need_approval {
                    info!("GDPR check of {} needs approval", id);
                    return Ok(GdprOutcome::PendingApproval {
                        message: response
                            .message
                            .unwrap_or_else(|| "Waiting for an approver".to_string()),
                    });
                }
            }
            Err(e) if e.is_http() => {
                warn!("GDPR trigger for {} failed ({}), falling back to status", id, e);
                self.client
                    .status(id)
                    .await
                    .with_context(|| format!("Failed to get status of {}", id))?;
            }
            Err(e) => {
                return Err(e).with_context(|| format!("Failed to start GDPR check of {}", id))
            }
        }

        Ok(GdprOutcome::Polled(self.track(id, Step::Gdpr).await?))
    }

    /// Ask the backend to share a document.
    pub async fn share(&self, request: &SharingRequest) -> Result<ShareOutcome> {
        if request.recipient_emails.is_empty() {
            return Err(ApiError::InvalidRequest(
                "at least one recipient is required".to_string(),
            )
            .into());
        }

        let response = self
            .client
            .trigger_sharing(request)
            .await
            .with_context(|| format!("Failed to start sharing {}", request.processing_id))?;

        if response.need_approval {
            info!("Sharing of {} needs approval", request.processing_id);
            return Ok(ShareOutcome::PendingApproval {
                message: response
                    .message
                    .unwrap_or_else(|| "Waiting for an approver".to_string()),
            });
        }

        Ok(ShareOutcome::Polled(
            self.track(&request.processing_id, Step::Sharing).await?,
        ))
    }

    /// Wait for `step` of `job_id` to settle.
    pub async fn track(&self, job_id: &str, step: Step) -> Result<PollOutcome> {
        let source: Arc<dyn StatusSource> = match step {
            Step::Gdpr => Arc::new(StoredResultFirst::new(self.client.clone(), step)),
            Step::Analysis | Step::Sharing => self.client.clone() as Arc<dyn StatusSource>,
        };
        self.track_with(source, job_id, step).await
    }

    async fn track_with(
        &self,
        source: Arc<dyn StatusSource>,
        job_id: &str,
        step: Step,
    ) -> Result<PollOutcome> {
        let config = PollConfig::for_step(step, &self.polling);
        let max_polls = config.max_polls;
        info!("Waiting up to {:?} for {} of {}", config.budget(), step, job_id);
        let spinner = self.spinner(step, job_id);

        let (tx, rx) = oneshot::channel();
        let mut slot = PollSlot::new();

        let tick_spinner = spinner.clone();
        slot.start(
            source,
            job_id,
            config,
            move |n, snapshot: &StatusSnapshot| {
                let status = snapshot.step_status(step);
                debug!("Check {}: {} is {}", n, step, status);
                if let Some(ref pb) = tick_spinner {
                    pb.set_message(format!(
                        "{} {} {} (check {}/{})",
                        status.emoji(),
                        step,
                        status,
                        n,
                        max_polls
                    ));
                }
            },
            move |outcome| {
                let _ = tx.send(outcome);
            },
        );

        let outcome = tokio::select! {
            outcome = rx => outcome.context("Poll loop stopped without an outcome"),
            _ = tokio::signal::ctrl_c() => {
                if slot.is_active() {
                    warn!(
                        "Stopped waiting on {}; the backend keeps processing it",
                        slot.job_id().unwrap_or(job_id)
                    );
                }
                slot.cancel();
                Err(anyhow::anyhow!("Interrupted while waiting for {} of {}", step, job_id))
            }
        };

        if let Some(pb) = spinner {
            pb.finish_and_clear();
        }
        outcome
    }

    fn spinner(&self, step: Step, job_id: &str) -> Option<ProgressBar> {
        if !self.show_progress {
            return None;
        }
        let pb = ProgressBar::new_spinner();
        pb.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.green} [{elapsed_precise}] {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        pb.enable_steady_tick(Duration::from_millis(120));
        pb.set_message(format!("Waiting for {} of {}", step, job_id));
        Some(pb)
    }

    /// Approve a pending sharing request.
    pub async fn approve(&self, key: &str, approver: &str) -> Result<()> {
        let decision = ApprovalDecision::approve(key, approver);
        self.client
            .process_approval(&decision)
            .await
            .with_context(|| format!("Failed to approve {}", key))?;
        info!("{} approved by {}", key, approver);
        Ok(())
    }

    /// Reject a pending sharing request. The reason must not be blank.
    pub async fn reject(&self, key: &str, rejecter: &str, reason: &str) -> Result<()> {
        let Some(decision) = ApprovalDecision::reject(key, rejecter, reason) else {
            bail!("A rejection reason is required");
        };
        self.client
            .process_approval(&decision)
            .await
            .with_context(|| format!("Failed to reject {}", key))?;
        info!("{} rejected by {}", key, rejecter);
        Ok(())
    }

    /// Completed documents matching `filter`, newest first.
    pub async fn select_files(
        &self,
        filter: FileFilter,
        search: Option<String>,
    ) -> Result<Vec<DocumentRecord>> {
        let query = ListQuery::first(SELECTOR_FETCH_LIMIT).with_search(search);
        let page = self
            .client
            .completed_documents(&query)
            .await
            .context("Failed to list completed documents")?;
        Ok(select(page.data, filter))
    }

    /// Dashboard statistics over analyzed documents.
    pub async fn stats(&self) -> Result<DashboardStats> {
        Ok(fetch_stats(&self.client).await?)
    }

    /// Print the approval list every `period` until Ctrl-C.
    pub async fn watch_approvals<S>(
        &self,
        filter: ApprovalFilter,
        period: Duration,
        sink: S,
    ) -> Result<()>
    where
        S: FnMut(Vec<ApprovalRequest>) + Send + 'static,
    {
        let client = self.client.clone();
        let fetch = move || -> BoxFuture<'static, Result<Vec<ApprovalRequest>, ApiError>> {
            let client = client.clone();
            async move { client.approvals(filter).await }.boxed()
        };
        watch_until_interrupted(Refresher::spawn("approvals", period, fetch, sink)).await
    }

    /// Print dashboard statistics every `period` until Ctrl-C.
    pub async fn watch_stats<S>(&self, period: Duration, sink: S) -> Result<()>
    where
        S: FnMut(DashboardStats) + Send + 'static,
    {
        let client = self.client.clone();
        let fetch = move || -> BoxFuture<'static, Result<DashboardStats, ApiError>> {
            let client = client.clone();
            async move { fetch_stats(&client).await }.boxed()
        };
        watch_until_interrupted(Refresher::spawn("stats", period, fetch, sink)).await
    }
}

async fn fetch_stats(client: &ApiClient) -> Result<DashboardStats, ApiError> {
    let page = client
        .gdpr_records(&ListQuery::first(STATS_FETCH_LIMIT), Some(true))
        .await?;
    Ok(compute_stats(&page.data, Utc::now().date_naive()))
}

async fn watch_until_interrupted(refresher: Refresher) -> Result<()> {
    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for Ctrl-C")?;
    if refresher.is_running() {
        debug!("Stopping {} refresh", refresher.name());
    } else {
        warn!("{} refresh had already stopped", refresher.name());
    }
    refresher.stop();
    Ok(())
}

/// Parse `email` or `Name <email>`.
pub fn parse_recipient(raw: &str) -> Result<Recipient, ApiError> {
    let raw = raw.trim();
    let (name, email) = match (raw.find('<'), raw.rfind('>')) {
        (Some(open), Some(close)) if open < close => {
            (raw[..open].trim(), raw[open + 1..close].trim())
        }
        _ => ("", raw),
    };

    if !is_plausible_email(email) {
        return Err(ApiError::InvalidRequest(format!(
            "not an email address: {:?}",
            raw
        )));
    }

    let name = if name.is_empty() {
        email.split('@').next().unwrap_or(email)
    } else {
        name
    };

    Ok(Recipient {
        name: name.to_string(),
        email: email.to_string(),
    })
}

fn is_plausible_email(email: &str) -> bool {
    match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
                && !email.chars().any(char::is_whitespace)
        }
        None => false,
    }
}

/// Recipients from `--to` plus the department's directory entries.
///
/// Duplicates (by case-insensitive email) keep their first occurrence.
pub fn resolve_recipients(
    to: &[String],
    department: Option<&str>,
    config: &Config,
) -> Result<Vec<Recipient>> {
    let mut recipients = Vec::new();

    for raw in to.iter().filter(|r| !r.trim().is_empty()) {
        recipients.push(parse_recipient(raw)?);
    }

    if let Some(department) = department {
        match config.department_recipients(department) {
            Some(listed) => recipients.extend(listed.iter().cloned()),
            None => warn!("No directory entries for department {}", department),
        }
    }

    let mut seen = std::collections::HashSet::new();
    recipients.retain(|r| seen.insert(r.email.to_lowercase()));

    if recipients.is_empty() {
        bail!("No recipients to share with");
    }
    Ok(recipients)
}
