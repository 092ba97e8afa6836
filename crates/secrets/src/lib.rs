//! Versioned secret store clients.
//!
//! Every backend follows the same contract: reading returns the latest
//! version, writing appends a new version and never touches older ones.

pub mod credentials;
pub mod file;
pub mod gcp;
pub mod memory;

use std::{fmt, sync::Arc};

use {async_trait::async_trait, threadkeeper_config::{SecretBackend, SecretConfig}};

pub use {
    credentials::{MetadataServer, StaticToken, TokenSource},
    file::FileSecretStore,
    gcp::GcpSecretManager,
    memory::MemorySecretStore,
};

/// Address of a secret: `projects/{project}/secrets/{secret}`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SecretPath {
    project: String,
    secret: String,
}

impl SecretPath {
    pub fn new(project: impl Into<String>, secret: impl Into<String>) -> Self {
        Self {
            project: project.into(),
            secret: secret.into(),
        }
    }

    pub fn from_config(config: &SecretConfig) -> Self {
        Self::new(config.project_or_local(), config.name.clone())
    }

    pub fn project(&self) -> &str {
        &self.project
    }

    pub fn secret(&self) -> &str {
        &self.secret
    }

    /// Parent resource that new versions are appended to.
    pub fn parent_name(&self) -> String {
        self.to_string()
    }

    /// Resource name of the latest version.
    pub fn latest_version_name(&self) -> String {
        format!("{}/versions/latest", self.parent_name())
    }
}

impl fmt::Display for SecretPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "projects/{}/secrets/{}", self.project, self.secret)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SecretStoreError {
    #[error("secret {0} not found")]
    NotFound(String),

    #[error("secret store returned status {status}: {body}")]
    Api { status: u16, body: String },

    #[error("secret store request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("secret store credentials unavailable: {0}")]
    Credentials(String),

    #[error("malformed secret store response: {0}")]
    Malformed(String),

    #[error("secret store i/o: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, SecretStoreError>;

/// A versioned secret store.
#[async_trait]
pub trait SecretStore: Send + Sync {
    /// Short backend identifier for logs (`gcp`, `file`, `memory`).
    fn backend_name(&self) -> &'static str;

    /// Read the payload of the latest version.
    async fn access_latest(&self, path: &SecretPath) -> Result<Vec<u8>>;

    /// Append `payload` as a new version and return the new version's name.
    async fn add_version(&self, path: &SecretPath, payload: &[u8]) -> Result<String>;

    /// Create the secret container if it does not exist yet.
    /// Returns `true` when it was created.
    async fn ensure_secret(&self, path: &SecretPath) -> Result<bool>;
}

/// Build the store selected by `config`.
///
/// The GCP backend authenticates with `config.access_token` when set,
/// otherwise with the metadata server of the hosting runtime.
pub fn open(config: &SecretConfig, client: reqwest::Client) -> Arc<dyn SecretStore> {
    match config.backend {
        SecretBackend::Gcp => {
            let credentials: Arc<dyn TokenSource> = match config.access_token {
                Some(ref token) => Arc::new(StaticToken::from_secret(token.clone())),
                None => Arc::new(MetadataServer::new(client.clone(), &config.metadata_url)),
            };
            Arc::new(GcpSecretManager::new(client, &config.api_url, credentials))
        },
        SecretBackend::File => {
            let dir = config
                .data_dir
                .clone()
                .unwrap_or_else(threadkeeper_config::data_dir);
            Arc::new(FileSecretStore::in_dir(&dir))
        },
    }
}
