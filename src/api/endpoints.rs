//! Endpoint paths consumed from the backend.

pub const PROCESS: &str = "/api/document/process";
pub const STATUS: &str = "/api/document/status";
pub const GET_ALL_COMPLETED: &str = "/api/document/get-all-completed";
pub const TRIGGER_GDPR: &str = "/api/document/trigger-gdpr";
pub const TRIGGER_SHARING: &str = "/api/document/trigger-sharing";
pub const GDPR: &str = "/gdpr";
pub const APPROVALS_LIST: &str = "/api/approvals/list";
pub const APPROVALS_PROCESS: &str = "/api/approvals/process";

// Ids are percent-encoded so they always stay a single path segment.

pub fn status(id: &str) -> String {
    format!("{}/{}", STATUS, urlencoding::encode(id))
}

pub fn stored_document(id: &str) -> String {
    format!("/api/document/get-from-postgres/{}", urlencoding::encode(id))
}

pub fn gdpr_record(id: &str) -> String {
    format!("{}/{}", GDPR, urlencoding::encode(id))
}

/// Join a base URL and a path without doubling or dropping the slash.
pub fn join(base_url: &str, path: &str) -> String {
    let base = base_url.trim_end_matches('/');
    if path.starts_with('/') {
        format!("{}{}", base, path)
    } else {
        format!("{}/{}", base, path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_join() {
        assert_eq!(
            join("http://localhost:5000", "/gdpr"),
            "http://localhost:5000/gdpr"
        );
        assert_eq!(
            join("http://localhost:5000/", "/gdpr"),
            "http://localhost:5000/gdpr"
        );
        assert_eq!(
            join("http://localhost:5000", "gdpr/7"),
            "http://localhost:5000/gdpr/7"
        );
    }

    #[test]
    fn test_id_paths() {
        assert_eq!(status("abc"), "/api/document/status/abc");
        assert_eq!(stored_document("abc"), "/api/document/get-from-postgres/abc");
        assert_eq!(gdpr_record("42"), "/gdpr/42");
    }

    #[test]
    fn test_id_paths_are_encoded() {
        assert_eq!(status("a/b"), "/api/document/status/a%2Fb");
        assert_eq!(
            stored_document("x?debug=1"),
            "/api/document/get-from-postgres/x%3Fdebug%3D1"
        );
        assert_eq!(gdpr_record("7#top"), "/gdpr/7%23top");
        assert_eq!(status("job-1_v2.pdf"), "/api/document/status/job-1_v2.pdf");
    }
}
