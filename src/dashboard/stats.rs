//! Dashboard statistics.
//!
//! Aggregates the rows of `GET /gdpr?has_analysis=true` into the counts shown
//! on the overview: status breakdown, departments, daily uploads and GDPR
//! decisions.

use crate::models::{DocumentRecord, GdprDecision, JobStatus};
use chrono::{Days, NaiveDate};
use serde::Serialize;
use std::collections::HashMap;

/// Rows requested from the backend for statistics.
pub const STATS_FETCH_LIMIT: u64 = 1000;

/// Days covered by the daily upload histogram.
const DAYS_SHOWN: u64 = 7;

/// Recent documents listed on the overview.
const RECENT_SHOWN: usize = 10;

/// Department label for documents without one.
pub const UNASSIGNED_DEPARTMENT: &str = "Unassigned";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Count<K> {
    pub key: K,
    pub count: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DayCount {
    pub date: NaiveDate,
    pub count: usize,
}

/// Everything the overview shows.
#[derive(Debug, Clone, Serialize)]
pub struct DashboardStats {
    pub total: usize,
    pub completed: usize,
    pub processing: usize,
    pub failed: usize,
    /// Non-empty status buckets, in lifecycle order.
    pub by_status: Vec<Count<&'static str>>,
    /// Departments by document count, largest first.
    pub by_department: Vec<Count<String>>,
    /// Uploads per day, oldest first, ending today.
    pub by_day: Vec<DayCount>,
    /// Non-empty decision buckets.
    pub decisions: Vec<Count<&'static str>>,
    /// Most recently created documents.
    pub recent: Vec<DocumentRecord>,
}

/// Compute dashboard statistics as of `today`.
pub fn compute_stats(docs: &[DocumentRecord], today: NaiveDate) -> DashboardStats {
    let status_count = |wanted: &JobStatus| {
        docs.iter()
            .filter(|d| d.status.as_ref() == Some(wanted))
            .count()
    };

    let completed = status_count(&JobStatus::Completed);
    let processing = status_count(&JobStatus::Processing);
    let failed = status_count(&JobStatus::Failed);
    let pending = docs
        .iter()
        .filter(|d| matches!(d.status, None | Some(JobStatus::Pending)))
        .count();

    let by_status = [
        ("completed", completed),
        ("processing", processing),
        ("failed", failed),
        ("pending", pending),
    ]
    .into_iter()
    .filter(|(_, count)| *count > 0)
    .map(|(key, count)| Count { key, count })
    .collect();

    DashboardStats {
        total: docs.len(),
        completed,
        processing,
        failed,
        by_status,
        by_department: department_distribution(docs),
        by_day: daily_uploads(docs, today),
        decisions: decision_distribution(docs),
        recent: most_recent(docs, RECENT_SHOWN),
    }
}

/// Count documents per department, largest first.
pub fn department_distribution(docs: &[DocumentRecord]) -> Vec<Count<String>> {
    let mut counts: HashMap<String, usize> = HashMap::new();

    for doc in docs {
        let department = doc
            .department
            .as_deref()
            .map(str::trim)
            .filter(|d| !d.is_empty())
            .unwrap_or(UNASSIGNED_DEPARTMENT);
        *counts.entry(department.to_string()).or_insert(0) += 1;
    }

    let mut sorted: Vec<Count<String>> = counts
        .into_iter()
        .map(|(key, count)| Count { key, count })
        .collect();
    sorted.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.key.cmp(&b.key)));
    sorted
}

/// Documents created on each of the last seven days, oldest first.
pub fn daily_uploads(docs: &[DocumentRecord], today: NaiveDate) -> Vec<DayCount> {
    (0..DAYS_SHOWN)
        .rev()
        .filter_map(|days_ago| today.checked_sub_days(Days::new(days_ago)))
        .map(|date| DayCount {
            date,
            count: docs
                .iter()
                .filter(|d| d.created_at.map(|c| c.date_naive()) == Some(date))
                .count(),
        })
        .collect()
}

/// Count normalized GDPR decisions. Unknown decisions are left out.
pub fn decision_distribution(docs: &[DocumentRecord]) -> Vec<Count<&'static str>> {
    let mut approve = 0;
    let mut review = 0;
    let mut reject = 0;

    for decision in docs.iter().filter_map(DocumentRecord::gdpr_decision) {
        match decision {
            GdprDecision::Approve => approve += 1,
            GdprDecision::Review => review += 1,
            GdprDecision::Reject => reject += 1,
            GdprDecision::Unknown(_) => {}
        }
    }

    [
        (GdprDecision::Approve.label(), approve),
        (GdprDecision::Review.label(), review),
        (GdprDecision::Reject.label(), reject),
    ]
    .into_iter()
    .filter(|(_, count)| *count > 0)
    .map(|(key, count)| Count { key, count })
    .collect()
}

/// The `n` most recently created documents; undated ones sort last.
pub fn most_recent(docs: &[DocumentRecord], n: usize) -> Vec<DocumentRecord> {
    let mut sorted = docs.to_vec();
    sorted.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    sorted.truncate(n);
    sorted
}
