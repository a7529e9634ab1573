//! Choosing which completed documents a workflow can act on.

use crate::models::DocumentRecord;
use std::fmt;

/// Rows requested from `get-all-completed` when picking files.
pub const SELECTOR_FETCH_LIMIT: u64 = 100;

/// Which documents to offer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum FileFilter {
    /// Every completed document
    #[default]
    All,
    /// Analyzed documents that have not been through a GDPR check
    ForGdpr,
    /// GDPR-cleared documents that have not been shared yet
    ForSharing,
}

impl FileFilter {
    pub fn matches(&self, doc: &DocumentRecord) -> bool {
        match self {
            FileFilter::All => true,
            FileFilter::ForGdpr => doc.has_analysis() && !doc.has_gdpr(),
            FileFilter::ForSharing => {
                !doc.has_sharing()
                    && doc
                        .gdpr_decision()
                        .is_some_and(|decision| decision.allows_sharing())
            }
        }
    }
}

impl fmt::Display for FileFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FileFilter::All => write!(f, "all documents"),
            FileFilter::ForGdpr => write!(f, "ready for GDPR check"),
            FileFilter::ForSharing => write!(f, "ready for sharing"),
        }
    }
}

/// Filter `docs` and sort the survivors newest first.
pub fn select(docs: Vec<DocumentRecord>, filter: FileFilter) -> Vec<DocumentRecord> {
    let mut selected: Vec<DocumentRecord> =
        docs.into_iter().filter(|doc| filter.matches(doc)).collect();
    selected.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    selected
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::parse_timestamp;
    use serde_json::{json, Value};

    fn doc(id: &str, created: &str, results: Option<Value>) -> DocumentRecord {
        DocumentRecord {
            processing_id: Some(id.to_string()),
            created_at: parse_timestamp(created),
            analysis_results: results,
            ..DocumentRecord::default()
        }
    }

    fn library() -> Vec<DocumentRecord> {
        vec![
            doc("analyzed", "2026-10-01", Some(json!({"analysis": {"summary": "x"}}))),
            doc("legacy", "2026-10-03", Some(json!({"summary": "old row"}))),
            doc("empty", "2026-10-04", None),
            doc(
                "approved",
                "2026-10-05",
                Some(json!({"analysis": {}, "gdpr": {"gdprDecision": "approve"}})),
            ),
            doc(
                "review",
                "2026-10-02",
                Some(json!({"analysis": {}, "gdpr": {"gdpr_decision": "anonymize"}})),
            ),
            doc(
                "rejected",
                "2026-10-06",
                Some(json!({"analysis": {}, "gdpr": {"gdprDecision": "từ chối"}})),
            ),
            doc(
                "shared",
                "2026-10-07",
                Some(json!({
                    "analysis": {},
                    "gdpr": {"gdprDecision": "approved"},
                    "sharing": {"status": "sent"}
                })),
            ),
        ]
    }

    fn ids(docs: &[DocumentRecord]) -> Vec<&str> {
        docs.iter().map(|d| d.id()).collect()
    }

    #[test]
    fn test_all_sorted_newest_first() {
        let selected = select(library(), FileFilter::All);
        assert_eq!(
            ids(&selected),
            vec!["shared", "rejected", "approved", "empty", "legacy", "review", "analyzed"]
        );
    }

    #[test]
    fn test_for_gdpr() {
        let selected = select(library(), FileFilter::ForGdpr);
        assert_eq!(ids(&selected), vec!["legacy", "analyzed"]);
    }

    #[test]
    fn test_for_sharing() {
        let selected = select(library(), FileFilter::ForSharing);
        assert_eq!(ids(&selected), vec!["approved", "review"]);
    }

    #[test]
    fn test_sharing_uses_stored_gdpr_result() {
        let mut doc = doc("row", "2026-10-01", None);
        doc.gdpr_result = Some(crate::models::GdprResult {
            decision: Some("allow".into()),
            ..Default::default()
        });
        assert!(FileFilter::ForSharing.matches(&doc));
        assert!(!FileFilter::ForGdpr.matches(&doc));
    }
}
