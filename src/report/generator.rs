//! Terminal and JSON rendering.
//!
//! Every command prints either a human-readable text block built here or the
//! underlying data as pretty JSON.

use crate::dashboard::DashboardStats;
use crate::models::{ApprovalRequest, DocumentRecord, GdprResult, StatusSnapshot, Step};
use crate::pagination::PageInfo;
use crate::polling::PollOutcome;
use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{json, Value};

/// Width of the bars in the statistics histograms.
const BAR_WIDTH: usize = 30;

/// Format a byte count as `B`, `KB`, `MB` or `GB`.
pub fn format_file_size(bytes: Option<u64>) -> String {
    const KB: f64 = 1024.0;
    const MB: f64 = KB * 1024.0;
    const GB: f64 = MB * 1024.0;

    match bytes {
        None | Some(0) => "N/A".to_string(),
        Some(b) if b < 1024 => format!("{} B", b),
        Some(b) => {
            let b = b as f64;
            if b < MB {
                format!("{:.2} KB", b / KB)
            } else if b < GB {
                format!("{:.2} MB", b / MB)
            } else {
                format!("{:.2} GB", b / GB)
            }
        }
    }
}

fn format_time(ts: Option<DateTime<Utc>>) -> String {
    ts.map(|t| t.format("%Y-%m-%d %H:%M:%S UTC").to_string())
        .unwrap_or_else(|| "N/A".to_string())
}

/// Serialize any view as pretty JSON.
pub fn generate_json<T: Serialize + ?Sized>(value: &T) -> Result<String> {
    serde_json::to_string_pretty(value).map_err(Into::into)
}

/// Status of a job and each of its steps.
pub fn generate_status_text(snapshot: &StatusSnapshot) -> String {
    let mut out = String::new();

    out.push_str(&format!(
        "📄 {} ({})\n",
        snapshot.file_name.as_deref().unwrap_or("(unnamed)"),
        snapshot.job_id().unwrap_or("-")
    ));
    out.push_str(&format!("   Status:  {}\n", snapshot.status));
    if snapshot.file_size.is_some() {
        out.push_str(&format!(
            "   Size:    {}\n",
            format_file_size(snapshot.file_size)
        ));
    }
    if let Some(ref mime) = snapshot.mime_type {
        out.push_str(&format!("   Type:    {}\n", mime));
    }
    out.push_str(&format!("   Created: {}\n", format_time(snapshot.created_at)));
    out.push_str(&format!("   Updated: {}\n", format_time(snapshot.updated_at)));

    out.push_str("\n   Steps:\n");
    for step in Step::all() {
        let status = snapshot.step_status(step);
        out.push_str(&format!("   {} {:<9} {}\n", status.emoji(), step, status));
    }

    if !snapshot.sharing_emails.is_empty() {
        out.push_str(&format!(
            "\n   Shared with: {}\n",
            snapshot.sharing_emails.join(", ")
        ));
    }
    if let Some(ref url) = snapshot.docx_url {
        out.push_str(&format!("   Document:    {}\n", url));
    }

    out
}

/// One line per tracked job.
pub fn generate_status_list_text(snapshots: &[StatusSnapshot]) -> String {
    if snapshots.is_empty() {
        return "No jobs are being tracked.\n".to_string();
    }

    let mut out = String::new();
    for snapshot in snapshots {
        let steps: Vec<String> = Step::all()
            .into_iter()
            .map(|step| format!("{} {}", snapshot.step_status(step).emoji(), step))
            .collect();
        out.push_str(&format!(
            "{}  {:<12} {}  {}\n",
            snapshot.job_id().unwrap_or("-"),
            snapshot.status.as_str(),
            steps.join("  "),
            snapshot.file_name.as_deref().unwrap_or("")
        ));
    }
    out
}

/// Final line(s) for a finished poll loop.
pub fn generate_outcome_text(step: Step, outcome: &PollOutcome) -> String {
    match outcome {
        PollOutcome::Completed { result, polls, .. } => {
            let mut out = format!("✅ {} completed after {} checks\n\n", step, polls);
            match step {
                Step::Analysis => out.push_str(&generate_analysis_text(result)),
                Step::Gdpr => match serde_json::from_value::<GdprResult>(result.clone()) {
                    Ok(gdpr) => out.push_str(&generate_gdpr_text(&gdpr)),
                    Err(_) => out.push_str(&generate_raw_text(result)),
                },
                Step::Sharing => out.push_str(&generate_raw_text(result)),
            }
            out
        }
        PollOutcome::Failed { reason, polls, .. } => {
            format!("❌ {} failed after {} checks: {}\n", step, polls, reason)
        }
        PollOutcome::TimedOut { polls, .. } => format!(
            "⏱️  Gave up waiting for {} after {} checks. The job may still finish; check it later with `docflow status`.\n",
            step, polls
        ),
        PollOutcome::Unreachable { polls, error } => format!(
            "🔌 Lost contact with the backend after {} checks: {}\n",
            polls, error
        ),
    }
}

/// JSON view of a finished poll loop.
pub fn outcome_value(job_id: &str, step: Step, outcome: &PollOutcome) -> Value {
    let (state, detail) = match outcome {
        PollOutcome::Completed { result, .. } => ("completed", json!({ "result": result })),
        PollOutcome::Failed { reason, .. } => ("failed", json!({ "reason": reason })),
        PollOutcome::TimedOut { .. } => ("timed_out", json!({})),
        PollOutcome::Unreachable { error, .. } => ("unreachable", json!({ "error": error })),
    };

    let mut value = json!({
        "processingId": job_id,
        "step": step,
        "outcome": state,
        "polls": outcome.polls(),
    });
    if let (Value::Object(map), Value::Object(extra)) = (&mut value, detail) {
        map.extend(extra);
        if let Some(last) = outcome.last_snapshot() {
            map.insert("last_status".to_string(), json!(last));
        }
    }
    value
}

/// Highlights of an analysis result, falling back to the raw payload.
pub fn generate_analysis_text(result: &Value) -> String {
    let mut out = String::new();

    for (key, label) in [
        ("summary", "Summary"),
        ("contentSummary", "Content summary"),
        ("category", "Category"),
    ] {
        if let Some(text) = result.get(key).and_then(Value::as_str) {
            out.push_str(&format!("{}: {}\n", label, text));
        }
    }

    match result.get("main_theme") {
        Some(Value::String(theme)) => out.push_str(&format!("Main theme: {}\n", theme)),
        Some(other) if !other.is_null() => {
            let theme = other
                .pointer("/output/main_theme")
                .and_then(Value::as_str)
                .map(String::from)
                .unwrap_or_else(|| other.to_string());
            out.push_str(&format!("Main theme: {}\n", theme));
        }
        _ => {}
    }

    if let Some(keywords) = result.get("keywords").and_then(Value::as_array) {
        let keywords: Vec<String> = keywords.iter().map(value_text).collect();
        if !keywords.is_empty() {
            out.push_str(&format!("Keywords: {}\n", keywords.join(", ")));
        }
    }

    if let Some(points) = result.get("keyPoints").and_then(Value::as_array) {
        if !points.is_empty() {
            out.push_str("Key points:\n");
            for point in points {
                let text = point
                    .get("point")
                    .map(value_text)
                    .unwrap_or_else(|| value_text(point));
                out.push_str(&format!("  - {}\n", text));
            }
        }
    }

    if out.is_empty() {
        out = generate_raw_text(result);
    }
    out
}

fn generate_raw_text(result: &Value) -> String {
    let mut raw = serde_json::to_string_pretty(result).unwrap_or_else(|_| result.to_string());
    raw.push('\n');
    raw
}

fn value_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// A GDPR check result.
pub fn generate_gdpr_text(result: &GdprResult) -> String {
    let mut out = String::new();

    match result.decision {
        Some(ref decision) => out.push_str(&format!(
            "{} GDPR decision: {} ({})\n",
            decision.emoji(),
            decision,
            decision.as_str()
        )),
        None => out.push_str("❓ GDPR decision: not reported\n"),
    }

    if result.personal_data_found.is_empty() {
        out.push_str("   Personal data: none found\n");
    } else {
        out.push_str(&format!(
            "   Personal data: {}\n",
            result.personal_data_found.join(", ")
        ));
    }
    out.push_str(&format!(
        "   Sensitive data: {}\n",
        if result.sensitive_data_detected { "yes" } else { "no" }
    ));
    out.push_str(&format!(
        "   Notify DPO: {}\n",
        if result.notify_dpo { "yes" } else { "no" }
    ));
    if let Some(ref retention) = result.retention_period {
        out.push_str(&format!("   Retention: {}\n", retention));
    }
    if let Some(ref reason) = result.reason {
        out.push_str(&format!("   Reason: {}\n", reason));
    }

    out
}

/// Detail view of one stored document.
pub fn generate_document_text(doc: &DocumentRecord) -> String {
    let mut out = String::new();

    out.push_str(&format!("📄 {} ({})\n", doc.display_name(), doc.id()));
    if let Some(ref status) = doc.status {
        out.push_str(&format!("   Status:     {}\n", status));
    }
    out.push_str(&format!("   Size:       {}\n", format_file_size(doc.file_size)));
    out.push_str(&format!("   Created:    {}\n", format_time(doc.created_at)));
    if let Some(ref department) = doc.department {
        out.push_str(&format!("   Department: {}\n", department));
    }
    if let Some(ref user) = doc.user_id {
        out.push_str(&format!("   User:       {}\n", user));
    }

    // legacy rows keep the analysis output at the top level
    let analysis = doc.analysis_results.as_ref().and_then(|results| {
        results
            .get("analysis")
            .filter(|a| !a.is_null())
            .or(doc.has_analysis().then_some(results))
    });
    if let Some(analysis) = analysis {
        out.push_str("\n🔍 Analysis\n");
        out.push_str(&generate_analysis_text(analysis));
    }

    if let Some(ref gdpr) = doc.gdpr_result {
        out.push_str("\n🛡️  GDPR\n");
        out.push_str(&generate_gdpr_text(gdpr));
    } else if let Some(decision) = doc.gdpr_decision() {
        out.push_str(&format!("\n🛡️  GDPR decision: {} {}\n", decision.emoji(), decision));
    }

    out
}

/// One page of a document list.
pub fn generate_documents_text(
    title: &str,
    docs: &[DocumentRecord],
    page: Option<&PageInfo>,
) -> String {
    let mut out = String::new();

    out.push_str(&format!("{}\n", title));

    if docs.is_empty() {
        out.push_str("   No documents found.\n");
        return out;
    }

    for doc in docs {
        let decision = doc
            .gdpr_decision()
            .map(|d| format!("  {} {}", d.emoji(), d))
            .unwrap_or_default();
        out.push_str(&format!(
            "   {}  {}  {}  {}{}\n",
            doc.id(),
            doc.display_name(),
            format_file_size(doc.file_size),
            doc.created_at
                .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
                .unwrap_or_else(|| "-".to_string()),
            decision
        ));
    }

    if let Some(page) = page {
        out.push_str(&format!(
            "\n   Page {} of {} ({} documents){}{}\n",
            page.page,
            page.total_pages.max(1),
            page.total,
            if page.has_prev() { "  [--page prev]" } else { "" },
            if page.has_next() { "  [--page next]" } else { "" },
        ));
    }

    out
}

/// Approval requests with their current state.
pub fn generate_approvals_text(approvals: &[ApprovalRequest]) -> String {
    if approvals.is_empty() {
        return "No approval requests.\n".to_string();
    }

    let mut out = String::new();
    for approval in approvals {
        out.push_str(&format!(
            "{} {}  {}\n",
            approval.status.emoji(),
            approval.status,
            approval.unique_key
        ));
        out.push_str(&format!(
            "   Document:  {}\n",
            approval.document_title.as_deref().unwrap_or("N/A")
        ));
        if let Some(ref category) = approval.document_category {
            out.push_str(&format!("   Category:  {}\n", category));
        }
        if let Some(ref uploader) = approval.uploader {
            out.push_str(&format!("   Uploader:  {}\n", uploader));
        }
        if let Some(ref level) = approval.security_level {
            out.push_str(&format!("   Security:  {}\n", level));
        }
        if !approval.share_with_emails.is_empty() {
            out.push_str(&format!(
                "   Share to:  {}\n",
                approval.share_with_emails.join(", ")
            ));
        }
        if let Some(ref risk) = approval.risk_assessment {
            out.push_str(&format!("   Risk:      {}\n", risk));
        }
        if let Some(ref recommendation) = approval.recommendation {
            out.push_str(&format!("   Advice:    {}\n", recommendation));
        }
        out.push_str(&format!("   Requested: {}\n", format_time(approval.created_at)));
        if let Some(ref by) = approval.approved_by {
            out.push_str(&format!(
                "   Approved by {} at {}\n",
                by,
                format_time(approval.approved_at)
            ));
        }
        if let Some(ref by) = approval.rejected_by {
            out.push_str(&format!(
                "   Rejected by {} at {}\n",
                by,
                format_time(approval.rejected_at)
            ));
        }
        if let Some(ref reason) = approval.reason {
            out.push_str(&format!("   Reason:    {}\n", reason));
        }
        if let Some(ref link) = approval.web_view_link {
            out.push_str(&format!("   Link:      {}\n", link));
        }
        out.push('\n');
    }

    out
}

fn bar(count: usize, max: usize) -> String {
    if max == 0 {
        return String::new();
    }
    let width = (count * BAR_WIDTH).div_ceil(max);
    "█".repeat(width)
}

/// The dashboard overview.
pub fn generate_stats_text(stats: &DashboardStats) -> String {
    let mut out = String::new();

    out.push_str("📊 Dashboard\n\n");
    out.push_str(&format!(
        "   Total: {}   ✅ Completed: {}   🔄 Processing: {}   ❌ Failed: {}\n\n",
        stats.total, stats.completed, stats.processing, stats.failed
    ));

    if !stats.by_status.is_empty() {
        out.push_str("By status\n");
        for entry in &stats.by_status {
            out.push_str(&format!("   {:<12} {:>5}\n", entry.key, entry.count));
        }
        out.push('\n');
    }

    if !stats.by_department.is_empty() {
        out.push_str("By department\n");
        for entry in &stats.by_department {
            out.push_str(&format!("   {:<20} {:>5}\n", entry.key, entry.count));
        }
        out.push('\n');
    }

    out.push_str("Last 7 days\n");
    let busiest = stats.by_day.iter().map(|d| d.count).max().unwrap_or(0);
    for day in &stats.by_day {
        out.push_str(&format!(
            "   {} {:>4} {}\n",
            day.date.format("%m-%d"),
            day.count,
            bar(day.count, busiest)
        ));
    }
    out.push('\n');

    if !stats.decisions.is_empty() {
        out.push_str("GDPR decisions\n");
        for entry in &stats.decisions {
            out.push_str(&format!("   {:<14} {:>5}\n", entry.key, entry.count));
        }
        out.push('\n');
    }

    if !stats.recent.is_empty() {
        out.push_str("Recent documents\n");
        for doc in &stats.recent {
            out.push_str(&format!(
                "   {}  {}  {}\n",
                doc.created_at
                    .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
                    .unwrap_or_else(|| "-".to_string()),
                doc.display_name(),
                doc.department.as_deref().unwrap_or("")
            ));
        }
    }

    out
}
