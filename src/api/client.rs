//! Typed wrapper around the backend's JSON endpoints.

use crate::api::endpoints;
use crate::config::ApiConfig;
use crate::error::ApiError;
use crate::models::{
    Ack, ApprovalDecision, ApprovalFilter, ApprovalList, ApprovalRequest, DocumentRecord,
    Envelope, Page, ProcessResponse, SharingRequest, StatusSnapshot, TriggerGdprResponse,
    TriggerSharingResponse,
};
use crate::pagination::PageRequest;
use reqwest::multipart::{Form, Part};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::Path;
use tracing::{debug, info};

/// Query parameters shared by the list endpoints.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListQuery {
    pub limit: Option<u64>,
    pub offset: Option<u64>,
    pub search: Option<String>,
}

impl ListQuery {
    /// Query for one page of results.
    pub fn page(request: PageRequest) -> Self {
        Self {
            limit: Some(request.limit()),
            offset: Some(request.offset()),
            search: None,
        }
    }

    /// Query for the first `limit` results.
    pub fn first(limit: u64) -> Self {
        Self {
            limit: Some(limit),
            offset: None,
            search: None,
        }
    }

    pub fn with_search(mut self, search: Option<String>) -> Self {
        self.search = search
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty());
        self
    }

    fn pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::new();
        if let Some(limit) = self.limit {
            pairs.push(("limit", limit.to_string()));
        }
        if let Some(offset) = self.offset {
            pairs.push(("offset", offset.to_string()));
        }
        if let Some(ref search) = self.search {
            pairs.push(("search", search.clone()));
        }
        pairs
    }
}

/// Client for the document-processing backend.
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
}

impl ApiClient {
    /// Create a client for the configured backend.
    pub fn new(config: &ApiConfig) -> Result<Self, ApiError> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout())
            .user_agent(concat!("docflow/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Absolute URL for an endpoint path.
    pub fn url(&self, path: &str) -> String {
        endpoints::join(&self.base_url, path)
    }

    /// Upload a file and start processing it. Returns the processing id.
    pub async fn upload(&self, file: &Path, user_id: &str, mode: &str) -> Result<String, ApiError> {
        let bytes = tokio::fs::read(file).await.map_err(|source| ApiError::Io {
            path: file.to_path_buf(),
            source,
        })?;
        let file_name = file
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "upload".to_string());

        info!("Uploading {} ({} bytes)", file_name, bytes.len());

        let form = Form::new()
            .part("file", Part::bytes(bytes).file_name(file_name))
            .text("userId", user_id.to_string())
            .text("mode", mode.to_string());

        let response = self
            .http
            .post(self.url(endpoints::PROCESS))
            .multipart(form)
            .send()
            .await?;
        let body: ProcessResponse = read_json(endpoints::PROCESS, response).await?;

        if !body.success {
            return Err(ApiError::backend(body.message));
        }
        body.processing_id
            .filter(|id| !id.is_empty())
            .ok_or_else(|| ApiError::Backend("upload accepted without a processingId".to_string()))
    }

    /// Current status of a processing job.
    pub async fn status(&self, id: &str) -> Result<StatusSnapshot, ApiError> {
        self.get_json(&endpoints::status(id), &[]).await
    }

    /// Status of every job the backend is tracking.
    pub async fn all_statuses(&self) -> Result<Vec<StatusSnapshot>, ApiError> {
        self.get_json(endpoints::STATUS, &[]).await
    }

    /// Stored record of a job, including its persisted results.
    pub async fn stored_document(&self, id: &str) -> Result<DocumentRecord, ApiError> {
        let envelope: Envelope<DocumentRecord> =
            self.get_json(&endpoints::stored_document(id), &[]).await?;
        unwrap_envelope(envelope)
    }

    /// Documents whose processing has completed.
    pub async fn completed_documents(
        &self,
        query: &ListQuery,
    ) -> Result<Page<DocumentRecord>, ApiError> {
        let page: Page<DocumentRecord> = self
            .get_json(endpoints::GET_ALL_COMPLETED, &query.pairs())
            .await?;
        unwrap_page(page)
    }

    /// Documents from the GDPR table.
    pub async fn gdpr_records(
        &self,
        query: &ListQuery,
        has_analysis: Option<bool>,
    ) -> Result<Page<DocumentRecord>, ApiError> {
        let mut pairs = query.pairs();
        if let Some(has_analysis) = has_analysis {
            pairs.push(("has_analysis", has_analysis.to_string()));
        }
        let page: Page<DocumentRecord> = self.get_json(endpoints::GDPR, &pairs).await?;
        unwrap_page(page)
    }

    /// A single GDPR record.
    pub async fn gdpr_record(&self, id: &str) -> Result<DocumentRecord, ApiError> {
        let envelope: Envelope<DocumentRecord> =
            self.get_json(&endpoints::gdpr_record(id), &[]).await?;
        unwrap_envelope(envelope)
    }

    /// Start the GDPR check of an analysed document.
    pub async fn trigger_gdpr(&self, processing_id: &str) -> Result<TriggerGdprResponse, ApiError> {
        let body = serde_json::json!({ "processingId": processing_id });
        let response: TriggerGdprResponse =
            self.post_json(endpoints::TRIGGER_GDPR, &body).await?;
        if !response.success {
            return Err(ApiError::backend(response.message));
        }
        Ok(response)
    }

    /// Start sharing a document with the given recipients.
    pub async fn trigger_sharing(
        &self,
        request: &SharingRequest,
    ) -> Result<TriggerSharingResponse, ApiError> {
        let response: TriggerSharingResponse =
            self.post_json(endpoints::TRIGGER_SHARING, request).await?;
        if !response.success {
            return Err(ApiError::backend(response.message));
        }
        Ok(response)
    }

    /// Approval requests, optionally filtered by status.
    pub async fn approvals(&self, filter: ApprovalFilter) -> Result<Vec<ApprovalRequest>, ApiError> {
        let list: ApprovalList = self
            .get_json(
                endpoints::APPROVALS_LIST,
                &[("status", filter.as_query().to_string())],
            )
            .await?;
        Ok(list.approvals)
    }

    /// Approve or reject a pending sharing request.
    pub async fn process_approval(&self, decision: &ApprovalDecision) -> Result<(), ApiError> {
        let ack: Ack = self
            .post_json(endpoints::APPROVALS_PROCESS, decision)
            .await?;
        if !ack.success {
            return Err(ApiError::backend(ack.message));
        }
        Ok(())
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&'static str, String)],
    ) -> Result<T, ApiError> {
        debug!("GET {} {:?}", path, query);
        let response = self.http.get(self.url(path)).query(query).send().await?;
        read_json(path, response).await
    }

    async fn post_json<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        debug!("POST {}", path);
        let response = self.http.post(self.url(path)).json(body).send().await?;
        read_json(path, response).await
    }
}

async fn read_json<T: DeserializeOwned>(
    endpoint: &str,
    response: reqwest::Response,
) -> Result<T, ApiError> {
    let status = response.status();
    let body = response.bytes().await?;

    if !status.is_success() {
        return Err(ApiError::Http {
            status: status.as_u16(),
            body: String::from_utf8_lossy(&body).trim().to_string(),
        });
    }

    serde_json::from_slice(&body).map_err(|source| ApiError::Decode {
        endpoint: endpoint.to_string(),
        source,
    })
}

fn unwrap_page<T>(page: Page<T>) -> Result<Page<T>, ApiError> {
    if page.success {
        Ok(page)
    } else {
        Err(ApiError::backend(page.message))
    }
}

fn unwrap_envelope<T>(envelope: Envelope<T>) -> Result<T, ApiError> {
    if !envelope.success {
        return Err(ApiError::backend(envelope.message));
    }
    envelope
        .data
        .ok_or_else(|| ApiError::Backend("response has no data".to_string()))
}
