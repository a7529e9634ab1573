//! Data models for the document-processing backend.
//!
//! The backend is loose about its payloads: field names arrive in camelCase or
//! snake_case, timestamps come in several formats and GDPR decisions use a
//! handful of aliases. Everything is normalized here, at the deserialization
//! boundary, so the rest of the crate works with one shape.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;
use std::fmt;
use tracing::warn;

/// A tracked processing step.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum Step {
    Analysis,
    Gdpr,
    Sharing,
}

impl Step {
    /// Key used by the backend in `steps` and `results`.
    pub fn key(&self) -> &'static str {
        match self {
            Step::Analysis => "analysis",
            Step::Gdpr => "gdpr",
            Step::Sharing => "sharing",
        }
    }

    pub fn all() -> [Step; 3] {
        [Step::Analysis, Step::Gdpr, Step::Sharing]
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(match self {
            Step::Analysis => "Analysis",
            Step::Gdpr => "GDPR",
            Step::Sharing => "Sharing",
        })
    }
}

/// Status of a single step as reported by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum StepStatus {
    #[default]
    Pending,
    Processing,
    Completed,
    Failed,
    Skipped,
    Other(String),
}

impl From<&str> for StepStatus {
    fn from(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "pending" | "" => StepStatus::Pending,
            "processing" | "running" => StepStatus::Processing,
            "completed" | "complete" | "done" => StepStatus::Completed,
            "failed" | "error" => StepStatus::Failed,
            "skipped" => StepStatus::Skipped,
            other => StepStatus::Other(other.to_string()),
        }
    }
}

impl StepStatus {
    pub fn as_str(&self) -> &str {
        match self {
            StepStatus::Pending => "pending",
            StepStatus::Processing => "processing",
            StepStatus::Completed => "completed",
            StepStatus::Failed => "failed",
            StepStatus::Skipped => "skipped",
            StepStatus::Other(s) => s,
        }
    }

    /// Returns an emoji representation of the status.
    pub fn emoji(&self) -> &'static str {
        match self {
            StepStatus::Completed => "✅",
            StepStatus::Processing => "🔄",
            StepStatus::Failed => "❌",
            StepStatus::Skipped => "⏭️",
            StepStatus::Pending | StepStatus::Other(_) => "⏳",
        }
    }
}

impl fmt::Display for StepStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for StepStatus {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for StepStatus {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw: Option<String> = Option::deserialize(deserializer)?;
        Ok(raw.as_deref().map(StepStatus::from).unwrap_or_default())
    }
}

/// Overall status of a processing job.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum JobStatus {
    #[default]
    Pending,
    Processing,
    Completed,
    Failed,
    PendingApproval,
    Other(String),
}

impl From<&str> for JobStatus {
    fn from(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "pending" | "" => JobStatus::Pending,
            "processing" | "running" => JobStatus::Processing,
            "completed" | "complete" | "done" => JobStatus::Completed,
            "failed" | "error" => JobStatus::Failed,
            "pending_approval" => JobStatus::PendingApproval,
            other => JobStatus::Other(other.to_string()),
        }
    }
}

impl JobStatus {
    pub fn as_str(&self) -> &str {
        match self {
            JobStatus::Pending => "pending",
            JobStatus::Processing => "processing",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
            JobStatus::PendingApproval => "pending_approval",
            JobStatus::Other(s) => s,
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for JobStatus {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for JobStatus {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw: Option<String> = Option::deserialize(deserializer)?;
        Ok(raw.as_deref().map(JobStatus::from).unwrap_or_default())
    }
}

/// Per-step statuses of a job.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Steps {
    #[serde(default)]
    pub analysis: Option<StepStatus>,
    #[serde(default)]
    pub gdpr: Option<StepStatus>,
    #[serde(default)]
    pub sharing: Option<StepStatus>,
}

impl Steps {
    pub fn get(&self, step: Step) -> Option<&StepStatus> {
        match step {
            Step::Analysis => self.analysis.as_ref(),
            Step::Gdpr => self.gdpr.as_ref(),
            Step::Sharing => self.sharing.as_ref(),
        }
    }
}

/// Per-step result payloads. Contents are owned by the backend.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StepResults {
    #[serde(default)]
    pub analysis: Option<Value>,
    #[serde(default)]
    pub gdpr: Option<Value>,
    #[serde(default)]
    pub sharing: Option<Value>,
}

impl StepResults {
    pub fn get(&self, step: Step) -> Option<&Value> {
        let value = match step {
            Step::Analysis => self.analysis.as_ref(),
            Step::Gdpr => self.gdpr.as_ref(),
            Step::Sharing => self.sharing.as_ref(),
        };
        value.filter(|v| !v.is_null())
    }
}

/// Response of `GET /api/document/status/{id}`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StatusSnapshot {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default, alias = "processingId")]
    pub processing_id: Option<String>,
    #[serde(default)]
    pub status: JobStatus,
    #[serde(default, deserialize_with = "null_as_default")]
    pub steps: Steps,
    #[serde(default, deserialize_with = "null_as_default")]
    pub results: StepResults,
    #[serde(default, rename = "fileName")]
    pub file_name: Option<String>,
    #[serde(default, rename = "fileSize")]
    pub file_size: Option<u64>,
    #[serde(default, rename = "mimeType")]
    pub mime_type: Option<String>,
    #[serde(default)]
    pub docx_url: Option<String>,
    #[serde(
        default,
        rename = "createdAt",
        deserialize_with = "lenient_timestamp"
    )]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(
        default,
        rename = "updatedAt",
        deserialize_with = "lenient_timestamp"
    )]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default, rename = "sharingEmails", deserialize_with = "string_list")]
    pub sharing_emails: Vec<String>,
}

impl StatusSnapshot {
    /// Status of `step`, `Pending` when the backend has not reported it yet.
    pub fn step_status(&self, step: Step) -> StepStatus {
        self.steps.get(step).cloned().unwrap_or_default()
    }

    pub fn step_result(&self, step: Step) -> Option<&Value> {
        self.results.get(step)
    }

    pub fn job_id(&self) -> Option<&str> {
        self.processing_id.as_deref().or(self.id.as_deref())
    }
}

/// GDPR decision, normalized from the aliases the backend emits.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum GdprDecision {
    Approve,
    Review,
    Reject,
    Unknown(String),
}

impl From<&str> for GdprDecision {
    fn from(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "approve" | "approved" | "allow" => GdprDecision::Approve,
            "review" | "anonymize" | "cần xem xét" => GdprDecision::Review,
            "reject" | "delete" | "từ chối" => GdprDecision::Reject,
            _ => GdprDecision::Unknown(s.trim().to_string()),
        }
    }
}

impl GdprDecision {
    pub fn as_str(&self) -> &str {
        match self {
            GdprDecision::Approve => "approve",
            GdprDecision::Review => "review",
            GdprDecision::Reject => "reject",
            GdprDecision::Unknown(raw) => raw,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            GdprDecision::Approve => "Approved",
            GdprDecision::Review => "Needs review",
            GdprDecision::Reject => "Rejected",
            GdprDecision::Unknown(_) => "Unknown",
        }
    }

    pub fn emoji(&self) -> &'static str {
        match self {
            GdprDecision::Approve => "✅",
            GdprDecision::Review => "⚠️",
            GdprDecision::Reject => "🚫",
            GdprDecision::Unknown(_) => "❓",
        }
    }

    /// Documents with these decisions may go on to the sharing step.
    pub fn allows_sharing(&self) -> bool {
        matches!(self, GdprDecision::Approve | GdprDecision::Review)
    }
}

impl fmt::Display for GdprDecision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl Serialize for GdprDecision {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for GdprDecision {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        let decision = GdprDecision::from(raw.as_str());
        if let GdprDecision::Unknown(ref value) = decision {
            warn!("Unrecognized GDPR decision from backend: {:?}", value);
        }
        Ok(decision)
    }
}

/// Outcome of a GDPR compliance check.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GdprResult {
    #[serde(default, rename = "gdprDecision", alias = "gdpr_decision")]
    pub decision: Option<GdprDecision>,
    #[serde(
        default,
        rename = "personalDataFound",
        alias = "personal_data_found",
        deserialize_with = "string_list"
    )]
    pub personal_data_found: Vec<String>,
    #[serde(
        default,
        rename = "sensitiveDataDetected",
        alias = "sensitive_data_detected",
        deserialize_with = "lenient_bool"
    )]
    pub sensitive_data_detected: bool,
    #[serde(
        default,
        rename = "notifyDPO",
        alias = "notify_dpo",
        deserialize_with = "lenient_bool"
    )]
    pub notify_dpo: bool,
    #[serde(
        default,
        rename = "retentionPeriod",
        alias = "retention_period",
        deserialize_with = "lenient_string"
    )]
    pub retention_period: Option<String>,
    #[serde(default, alias = "justification", deserialize_with = "lenient_string")]
    pub reason: Option<String>,
}

/// Status of an approval request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ApprovalStatus {
    #[serde(alias = "pending")]
    Pending,
    #[serde(alias = "approved")]
    Approved,
    #[serde(alias = "rejected")]
    Rejected,
}

impl ApprovalStatus {
    pub fn emoji(&self) -> &'static str {
        match self {
            ApprovalStatus::Pending => "⏳",
            ApprovalStatus::Approved => "✅",
            ApprovalStatus::Rejected => "❌",
        }
    }
}

impl fmt::Display for ApprovalStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApprovalStatus::Pending => write!(f, "PENDING"),
            ApprovalStatus::Approved => write!(f, "APPROVED"),
            ApprovalStatus::Rejected => write!(f, "REJECTED"),
        }
    }
}

/// Status filter for the approvals list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum ApprovalFilter {
    #[default]
    All,
    Pending,
    Approved,
    Rejected,
}

impl ApprovalFilter {
    pub fn as_query(&self) -> &'static str {
        match self {
            ApprovalFilter::All => "ALL",
            ApprovalFilter::Pending => "PENDING",
            ApprovalFilter::Approved => "APPROVED",
            ApprovalFilter::Rejected => "REJECTED",
        }
    }
}

/// A sharing request waiting on (or decided by) an approver.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApprovalRequest {
    pub unique_key: String,
    pub status: ApprovalStatus,
    #[serde(default)]
    pub document_title: Option<String>,
    #[serde(default)]
    pub document_category: Option<String>,
    #[serde(default)]
    pub uploader: Option<String>,
    #[serde(default)]
    pub security_level: Option<String>,
    #[serde(default, deserialize_with = "string_list")]
    pub share_with_emails: Vec<String>,
    #[serde(default)]
    pub risk_assessment: Option<String>,
    #[serde(default)]
    pub recommendation: Option<String>,
    #[serde(default)]
    pub web_view_link: Option<String>,
    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub approved_at: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub rejected_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub approved_by: Option<String>,
    #[serde(default)]
    pub rejected_by: Option<String>,
    #[serde(default)]
    pub reason: Option<String>,
}

/// A stored document row, as returned by `get-all-completed`, `/gdpr` and
/// `get-from-postgres`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DocumentRecord {
    #[serde(default, alias = "processingId")]
    pub processing_id: Option<String>,
    #[serde(default, alias = "fileName")]
    pub file_name: Option<String>,
    #[serde(default)]
    pub department: Option<String>,
    #[serde(default, alias = "userId")]
    pub user_id: Option<String>,
    #[serde(default)]
    pub status: Option<JobStatus>,
    #[serde(default, alias = "fileSize")]
    pub file_size: Option<u64>,
    #[serde(default, alias = "createdAt", deserialize_with = "lenient_timestamp")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub analysis_results: Option<Value>,
    #[serde(default)]
    pub gdpr_result: Option<GdprResult>,
}

impl DocumentRecord {
    pub fn id(&self) -> &str {
        self.processing_id.as_deref().unwrap_or("-")
    }

    pub fn display_name(&self) -> &str {
        self.file_name.as_deref().unwrap_or("(unnamed)")
    }

    fn result_section(&self, key: &str) -> Option<&Value> {
        self.analysis_results
            .as_ref()?
            .get(key)
            .filter(|v| !v.is_null())
    }

    /// Whether the analysis step left results on this document.
    ///
    /// Older rows store the analysis output directly in `analysis_results`
    /// instead of under an `analysis` key; any non-empty object without a
    /// `gdpr` section counts.
    pub fn has_analysis(&self) -> bool {
        if self.result_section("analysis").is_some() {
            return true;
        }
        matches!(
            &self.analysis_results,
            Some(Value::Object(map)) if !map.is_empty() && !map.contains_key("gdpr")
        )
    }

    /// Persisted result of `step`, if the backend has stored one.
    pub fn stored_result(&self, step: Step) -> Option<&Value> {
        self.result_section(step.key())
    }

    pub fn has_gdpr(&self) -> bool {
        self.result_section("gdpr").is_some()
    }

    pub fn has_sharing(&self) -> bool {
        self.result_section("sharing").is_some()
    }

    /// GDPR decision from the stored results, falling back to `gdpr_result`.
    pub fn gdpr_decision(&self) -> Option<GdprDecision> {
        let stored = self
            .result_section("gdpr")
            .and_then(|g| g.get("gdprDecision").or_else(|| g.get("gdpr_decision")))
            .and_then(Value::as_str)
            .map(GdprDecision::from);

        stored.or_else(|| self.gdpr_result.as_ref().and_then(|r| r.decision.clone()))
    }
}

/// Pagination block of list endpoints.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pagination {
    #[serde(default)]
    pub total: u64,
    #[serde(default)]
    pub limit: Option<u64>,
    #[serde(default)]
    pub offset: Option<u64>,
}

/// Envelope of list endpoints: `{success, data: [...], pagination: {total}}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(bound(deserialize = "T: Deserialize<'de>"))]
pub struct Page<T> {
    #[serde(default, deserialize_with = "lenient_bool")]
    pub success: bool,
    #[serde(default, deserialize_with = "null_as_default")]
    pub data: Vec<T>,
    #[serde(default)]
    pub pagination: Option<Pagination>,
    #[serde(default)]
    pub message: Option<String>,
}

impl<T> Page<T> {
    /// Total reported by the backend, or the row count when it omits one.
    pub fn total(&self) -> u64 {
        self.pagination
            .map(|p| p.total)
            .unwrap_or(self.data.len() as u64)
    }
}

/// Envelope of single-record endpoints: `{success, data: {...}}`.
#[derive(Debug, Clone, Deserialize)]
pub struct Envelope<T> {
    #[serde(default, deserialize_with = "lenient_bool")]
    pub success: bool,
    #[serde(default)]
    pub data: Option<T>,
    #[serde(default)]
    pub message: Option<String>,
}

/// Response of `POST /api/document/process`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessResponse {
    #[serde(default, deserialize_with = "lenient_bool")]
    pub success: bool,
    #[serde(default)]
    pub processing_id: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

/// Response of `POST /api/document/trigger-gdpr`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TriggerGdprResponse {
    #[serde(default, deserialize_with = "lenient_bool")]
    pub success: bool,
    #[serde(default)]
    pub gdpr_result: Option<GdprResult>,
    #[serde(default, deserialize_with = "lenient_bool")]
    pub need_approval: bool,
    #[serde(default)]
    pub message: Option<String>,
}

/// Response of `POST /api/document/trigger-sharing`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TriggerSharingResponse {
    #[serde(default, deserialize_with = "lenient_bool")]
    pub success: bool,
    #[serde(default, deserialize_with = "lenient_bool")]
    pub need_approval: bool,
    #[serde(default)]
    pub message: Option<String>,
}

/// Response of `GET /api/approvals/list`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ApprovalList {
    #[serde(default, deserialize_with = "null_as_default")]
    pub approvals: Vec<ApprovalRequest>,
}

/// Generic `{success, message}` acknowledgement.
#[derive(Debug, Clone, Deserialize)]
pub struct Ack {
    #[serde(default, deserialize_with = "lenient_bool")]
    pub success: bool,
    #[serde(default)]
    pub message: Option<String>,
}

/// Someone a document can be shared with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recipient {
    pub name: String,
    pub email: String,
}

/// Body of `POST /api/document/trigger-sharing`.
#[derive(Debug, Clone, Serialize)]
pub struct SharingRequest {
    #[serde(rename = "processingId")]
    pub processing_id: String,
    pub recipient_emails: Vec<String>,
    pub recipient_names: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub department: Option<String>,
    #[serde(rename = "userId")]
    pub user_id: String,
}

impl SharingRequest {
    pub fn new(
        processing_id: impl Into<String>,
        recipients: &[Recipient],
        department: Option<String>,
        user_id: impl Into<String>,
    ) -> Self {
        Self {
            processing_id: processing_id.into(),
            recipient_emails: recipients.iter().map(|r| r.email.clone()).collect(),
            recipient_names: recipients.iter().map(|r| r.name.clone()).collect(),
            department,
            user_id: user_id.into(),
        }
    }
}

/// Body of `POST /api/approvals/process`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApprovalDecision {
    pub unique_key: String,
    pub approved: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub approved_by: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rejected_by: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl ApprovalDecision {
    pub fn approve(unique_key: impl Into<String>, approver: impl Into<String>) -> Self {
        Self {
            unique_key: unique_key.into(),
            approved: true,
            approved_by: Some(approver.into()),
            rejected_by: None,
            reason: None,
        }
    }

    /// A rejection. Returns `None` when the reason is blank.
    pub fn reject(
        unique_key: impl Into<String>,
        rejecter: impl Into<String>,
        reason: &str,
    ) -> Option<Self> {
        let reason = reason.trim();
        if reason.is_empty() {
            return None;
        }
        Some(Self {
            unique_key: unique_key.into(),
            approved: false,
            approved_by: None,
            rejected_by: Some(rejecter.into()),
            reason: Some(reason.to_string()),
        })
    }
}

/// Parse the timestamp formats the backend is known to emit.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(naive.and_utc());
        }
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|n| n.and_utc())
}

/// Treats an explicit `null` like a missing field.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Option::<T>::deserialize(deserializer).map(Option::unwrap_or_default)
}

fn lenient_timestamp<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<Value> = Option::deserialize(deserializer)?;
    Ok(raw.as_ref().and_then(Value::as_str).and_then(parse_timestamp))
}

fn string_list<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<Value> = Option::deserialize(deserializer)?;
    Ok(match raw {
        Some(Value::Array(items)) => items.into_iter().map(value_to_string).collect(),
        Some(Value::String(s)) => s
            .split(',')
            .map(|part| part.trim().to_string())
            .filter(|part| !part.is_empty())
            .collect(),
        _ => Vec::new(),
    })
}

fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<Value> = Option::deserialize(deserializer)?;
    Ok(raw.filter(|v| !v.is_null()).map(value_to_string))
}

fn lenient_bool<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<Value> = Option::deserialize(deserializer)?;
    Ok(match raw {
        Some(Value::Bool(b)) => b,
        Some(Value::String(s)) => matches!(s.trim().to_lowercase().as_str(), "true" | "yes" | "1"),
        Some(Value::Number(n)) => n.as_i64().is_some_and(|n| n != 0),
        _ => false,
    })
}

fn value_to_string(value: Value) -> String {
    match value {
        Value::String(s) => s,
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_decision_aliases() {
        for raw in ["approve", "Approved", "ALLOW", " approve "] {
            assert_eq!(GdprDecision::from(raw), GdprDecision::Approve, "{raw}");
        }
        for raw in ["review", "Anonymize", "cần xem xét"] {
            assert_eq!(GdprDecision::from(raw), GdprDecision::Review, "{raw}");
        }
        for raw in ["reject", "DELETE", "từ chối"] {
            assert_eq!(GdprDecision::from(raw), GdprDecision::Reject, "{raw}");
        }
        assert_eq!(
            GdprDecision::from("escalate"),
            GdprDecision::Unknown("escalate".to_string())
        );
    }

    #[test]
    fn test_decision_allows_sharing() {
        assert!(GdprDecision::Approve.allows_sharing());
        assert!(GdprDecision::Review.allows_sharing());
        assert!(!GdprDecision::Reject.allows_sharing());
        assert!(!GdprDecision::Unknown("x".into()).allows_sharing());
    }

    #[test]
    fn test_gdpr_result_accepts_both_casings() {
        let camel: GdprResult = serde_json::from_value(json!({
            "gdprDecision": "Approved",
            "personalDataFound": ["email", "phone"],
            "sensitiveDataDetected": true,
            "notifyDPO": false,
            "retentionPeriod": 365,
            "reason": "Only business contact data"
        }))
        .unwrap();
        assert_eq!(camel.decision, Some(GdprDecision::Approve));
        assert_eq!(camel.personal_data_found, vec!["email", "phone"]);
        assert!(camel.sensitive_data_detected);
        assert_eq!(camel.retention_period.as_deref(), Some("365"));

        let snake: GdprResult = serde_json::from_value(json!({
            "gdpr_decision": "anonymize",
            "personal_data_found": null,
            "notify_dpo": "true",
            "justification": "Contains national ids"
        }))
        .unwrap();
        assert_eq!(snake.decision, Some(GdprDecision::Review));
        assert!(snake.personal_data_found.is_empty());
        assert!(snake.notify_dpo);
        assert_eq!(snake.reason.as_deref(), Some("Contains national ids"));
    }

    #[test]
    fn test_status_snapshot_parsing() {
        let snapshot: StatusSnapshot = serde_json::from_value(json!({
            "id": "job-1",
            "status": "processing",
            "steps": {"analysis": "completed", "gdpr": "processing"},
            "results": {"analysis": {"summary": "ok"}, "gdpr": null},
            "fileName": "contract.pdf",
            "fileSize": 2048,
            "createdAt": "2026-10-01T08:30:00Z",
            "updatedAt": "not a date"
        }))
        .unwrap();

        assert_eq!(snapshot.job_id(), Some("job-1"));
        assert_eq!(snapshot.status, JobStatus::Processing);
        assert_eq!(snapshot.step_status(Step::Analysis), StepStatus::Completed);
        assert_eq!(snapshot.step_status(Step::Gdpr), StepStatus::Processing);
        assert_eq!(snapshot.step_status(Step::Sharing), StepStatus::Pending);
        assert!(snapshot.step_result(Step::Analysis).is_some());
        assert!(snapshot.step_result(Step::Gdpr).is_none());
        assert!(snapshot.created_at.is_some());
        assert!(snapshot.updated_at.is_none());
    }

    #[test]
    fn test_status_snapshot_null_sections() {
        let snapshot: StatusSnapshot = serde_json::from_value(json!({
            "status": "processing",
            "steps": {"analysis": "processing"},
            "results": null
        }))
        .unwrap();
        assert_eq!(snapshot.step_status(Step::Analysis), StepStatus::Processing);
        assert!(snapshot.step_result(Step::Analysis).is_none());

        let snapshot: StatusSnapshot =
            serde_json::from_value(json!({"status": "pending", "steps": null, "results": null}))
                .unwrap();
        assert_eq!(snapshot.steps, Steps::default());
        assert_eq!(snapshot.step_status(Step::Gdpr), StepStatus::Pending);
    }

    #[test]
    fn test_parse_timestamp_formats() {
        assert!(parse_timestamp("2026-10-01T08:30:00.123+07:00").is_some());
        assert!(parse_timestamp("2026-10-01 08:30:00.123").is_some());
        assert!(parse_timestamp("2026-10-01T08:30:00").is_some());
        assert!(parse_timestamp("2026-10-01").is_some());
        assert!(parse_timestamp("yesterday").is_none());
    }

    #[test]
    fn test_document_record_sections() {
        let analysed: DocumentRecord = serde_json::from_value(json!({
            "processing_id": "p1",
            "analysis_results": {"summary": "legacy layout"}
        }))
        .unwrap();
        assert!(analysed.has_analysis());
        assert!(!analysed.has_gdpr());

        let checked: DocumentRecord = serde_json::from_value(json!({
            "processing_id": "p2",
            "analysis_results": {
                "analysis": {"summary": "x"},
                "gdpr": {"gdprDecision": "allow"}
            }
        }))
        .unwrap();
        assert!(checked.has_analysis());
        assert!(checked.has_gdpr());
        assert_eq!(checked.gdpr_decision(), Some(GdprDecision::Approve));

        let from_gdpr_table: DocumentRecord = serde_json::from_value(json!({
            "processing_id": "p3",
            "gdpr_result": {"gdpr_decision": "delete"}
        }))
        .unwrap();
        assert!(!from_gdpr_table.has_analysis());
        assert_eq!(from_gdpr_table.gdpr_decision(), Some(GdprDecision::Reject));
    }

    #[test]
    fn test_approval_request_parsing() {
        let approval: ApprovalRequest = serde_json::from_value(json!({
            "uniqueKey": "k-1",
            "status": "PENDING",
            "documentTitle": "Payroll.xlsx",
            "shareWithEmails": ["a@example.com", "b@example.com"],
            "createdAt": "2026-10-02T10:00:00Z"
        }))
        .unwrap();
        assert_eq!(approval.status, ApprovalStatus::Pending);
        assert_eq!(approval.share_with_emails.len(), 2);
        assert!(approval.approved_by.is_none());
    }

    #[test]
    fn test_approval_decision_bodies() {
        let approve = ApprovalDecision::approve("k-1", "admin@example.com");
        assert_eq!(
            serde_json::to_value(&approve).unwrap(),
            json!({"uniqueKey": "k-1", "approved": true, "approvedBy": "admin@example.com"})
        );

        assert!(ApprovalDecision::reject("k-1", "admin@example.com", "   ").is_none());
        let reject = ApprovalDecision::reject("k-1", "admin@example.com", " leaks salaries ").unwrap();
        assert_eq!(
            serde_json::to_value(&reject).unwrap(),
            json!({
                "uniqueKey": "k-1",
                "approved": false,
                "rejectedBy": "admin@example.com",
                "reason": "leaks salaries"
            })
        );
    }

    #[test]
    fn test_sharing_request_body() {
        let recipients = vec![
            Recipient {
                name: "Ana".to_string(),
                email: "ana@example.com".to_string(),
            },
            Recipient {
                name: "Bo".to_string(),
                email: "bo@example.com".to_string(),
            },
        ];
        let request = SharingRequest::new("p1", &recipients, Some("HR".to_string()), "ana");
        assert_eq!(
            serde_json::to_value(&request).unwrap(),
            json!({
                "processingId": "p1",
                "recipient_emails": ["ana@example.com", "bo@example.com"],
                "recipient_names": ["Ana", "Bo"],
                "department": "HR",
                "userId": "ana"
            })
        );
    }

    #[test]
    fn test_page_total_falls_back_to_len() {
        let page: Page<DocumentRecord> =
            serde_json::from_value(json!({"success": true, "data": [{}, {}]})).unwrap();
        assert_eq!(page.total(), 2);
    }

    #[test]
    fn test_null_lists_and_flags() {
        let page: Page<DocumentRecord> = serde_json::from_value(json!({
            "success": true,
            "data": null,
            "pagination": {"total": 0}
        }))
        .unwrap();
        assert!(page.data.is_empty());
        assert_eq!(page.total(), 0);

        let list: ApprovalList = serde_json::from_value(json!({"approvals": null})).unwrap();
        assert!(list.approvals.is_empty());

        let response: TriggerSharingResponse =
            serde_json::from_value(json!({"success": true, "needApproval": null})).unwrap();
        assert!(response.success);
        assert!(!response.need_approval);
    }
}
