use threadkeeper_secrets::SecretStoreError;

/// Failures inside the refresh pipeline. Every variant is reported to the
/// caller as HTTP 500; the variant tells the logs which stage broke.
#[derive(Debug, thiserror::Error)]
pub enum RefreshError {
    #[error("failed to read secret {path}: {source}")]
    SecretRead {
        path: String,
        #[source]
        source: SecretStoreError,
    },

    #[error("secret {path} is not valid UTF-8")]
    InvalidEncoding {
        path: String,
        #[source]
        source: std::string::FromUtf8Error,
    },

    #[error("token refresh request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("refresh response is not valid JSON: {0}")]
    MalformedResponse(#[source] serde_json::Error),

    #[error("failed to store refreshed token in {path}: {source}")]
    SecretWrite {
        path: String,
        #[source]
        source: SecretStoreError,
    },
}

impl RefreshError {
    /// Stable identifier for structured logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::SecretRead { .. } => "secret_read",
            Self::InvalidEncoding { .. } => "invalid_encoding",
            Self::Request(_) => "request",
            Self::MalformedResponse(_) => "malformed_response",
            Self::SecretWrite { .. } => "secret_write",
        }
    }
}
