//! Error types for talking to the document-processing backend.

use std::path::PathBuf;

/// Errors produced by the API client.
///
/// Three families matter to callers: the request never got a usable HTTP
/// response ([`ApiError::Transport`], [`ApiError::Http`]), the backend answered
/// but reported `success: false` ([`ApiError::Backend`]), or the payload did not
/// have the expected shape ([`ApiError::Decode`]).
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Cannot reach backend: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Backend returned HTTP {status}: {body}")]
    Http { status: u16, body: String },

    #[error("Backend reported failure: {0}")]
    Backend(String),

    #[error("Unexpected response from {endpoint}: {source}")]
    Decode {
        endpoint: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl ApiError {
    /// Whether the backend answered with a non-2xx status.
    pub fn is_http(&self) -> bool {
        matches!(self, ApiError::Http { .. })
    }

    /// Build a backend failure from an optional message.
    pub fn backend(message: Option<String>) -> Self {
        ApiError::Backend(message.unwrap_or_else(|| "no message".to_string()))
    }
}
