//! Config schema types (secret store, Threads API, HTTP server).

use std::{fmt, path::PathBuf};

use {
    secrecy::Secret,
    serde::{Deserialize, Serialize},
};

use crate::ConfigError;

/// Secret name used when neither the config file nor `THREADS_SECRET_NAME`
/// provides one.
pub const DEFAULT_SECRET_NAME: &str = "house-wang-threads-api";

/// Threads long-lived token refresh endpoint.
pub const DEFAULT_REFRESH_URL: &str = "https://graph.threads.net/refresh_access_token";

pub const DEFAULT_SECRET_MANAGER_URL: &str = "https://secretmanager.googleapis.com";

pub const DEFAULT_METADATA_URL: &str = "http://metadata.google.internal";

/// Root configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ThreadkeeperConfig {
    pub secret: SecretConfig,
    pub threads: ThreadsConfig,
    pub server: ServerConfig,
}

/// Which secret store implementation holds the token.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SecretBackend {
    /// Google Cloud Secret Manager.
    #[default]
    Gcp,
    /// JSON file under `data_dir`, for local development.
    File,
}

impl fmt::Display for SecretBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Gcp => "gcp",
            Self::File => "file",
        })
    }
}

impl std::str::FromStr for SecretBackend {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "gcp" => Ok(Self::Gcp),
            "file" => Ok(Self::File),
            other => Err(ConfigError::UnknownBackend(other.to_string())),
        }
    }
}

/// Where the access token lives.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SecretConfig {
    pub backend: SecretBackend,

    /// Secret id inside the project.
    pub name: String,

    /// Cloud project id. Required for the `gcp` backend; there is no
    /// placeholder default.
    pub project: Option<String>,

    /// Directory for the `file` backend. Defaults to `~/.threadkeeper/`.
    pub data_dir: Option<PathBuf>,

    /// Secret Manager REST endpoint (overridable for emulators and tests).
    pub api_url: String,

    /// GCE metadata server used to obtain Secret Manager credentials.
    pub metadata_url: String,

    /// Bearer token for Secret Manager from `GOOGLE_OAUTH_ACCESS_TOKEN`.
    /// Only read from the environment, never from or into config files.
    #[serde(skip)]
    pub access_token: Option<Secret<String>>,
}

impl Default for SecretConfig {
    fn default() -> Self {
        Self {
            backend: SecretBackend::default(),
            name: DEFAULT_SECRET_NAME.into(),
            project: None,
            data_dir: None,
            api_url: DEFAULT_SECRET_MANAGER_URL.into(),
            metadata_url: DEFAULT_METADATA_URL.into(),
            access_token: None,
        }
    }
}

impl SecretConfig {
    /// Project id used to address the secret. The `file` backend has no
    /// real project, so it falls back to `local`.
    pub fn project_or_local(&self) -> &str {
        self.project.as_deref().unwrap_or("local")
    }
}

/// Threads Graph API settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ThreadsConfig {
    pub refresh_url: String,
    /// Request timeout applied to every outbound HTTP call.
    pub http_timeout_secs: u64,
}

impl Default for ThreadsConfig {
    fn default() -> Self {
        Self {
            refresh_url: DEFAULT_REFRESH_URL.into(),
            http_timeout_secs: 30,
        }
    }
}

/// HTTP listener settings for `threadkeeper serve`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0".into(),
            port: 8080,
        }
    }
}

impl ThreadkeeperConfig {
    /// Override fields from environment variables resolved through `lookup`.
    ///
    /// Recognised names: `THREADS_SECRET_NAME`, `GOOGLE_CLOUD_PROJECT`,
    /// `THREADKEEPER_SECRET_BACKEND`, `THREADKEEPER_DATA_DIR`,
    /// `THREADKEEPER_REFRESH_URL`, `THREADKEEPER_SECRET_MANAGER_URL`, `PORT`,
    /// `GOOGLE_OAUTH_ACCESS_TOKEN`.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<(), ConfigError> {
        if let Some(v) = lookup("THREADS_SECRET_NAME") {
            self.secret.name = v;
        }
        if let Some(v) = lookup("GOOGLE_CLOUD_PROJECT") {
            self.secret.project = Some(v);
        }
        if let Some(v) = lookup("THREADKEEPER_SECRET_BACKEND") {
            self.secret.backend = v.parse()?;
        }
        if let Some(v) = lookup("THREADKEEPER_DATA_DIR") {
            self.secret.data_dir = Some(PathBuf::from(v));
        }
        if let Some(v) = lookup("THREADKEEPER_REFRESH_URL") {
            self.threads.refresh_url = v;
        }
        if let Some(v) = lookup("THREADKEEPER_SECRET_MANAGER_URL") {
            self.secret.api_url = v;
        }
        if let Some(v) = lookup("GOOGLE_OAUTH_ACCESS_TOKEN")
            && !v.trim().is_empty()
        {
            self.secret.access_token = Some(Secret::new(v.trim().to_string()));
        }
        if let Some(v) = lookup("PORT") {
            self.server.port = v
                .trim()
                .parse()
                .map_err(|_| ConfigError::InvalidPort(v.clone()))?;
        }
        Ok(())
    }

    /// Reject configurations that cannot address the secret or the API.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.secret.name.trim().is_empty() {
            return Err(ConfigError::EmptySecretName);
        }
        match self.secret.project.as_deref().map(str::trim) {
            None if self.secret.backend == SecretBackend::Gcp => {
                return Err(ConfigError::MissingProject);
            },
            Some("") => return Err(ConfigError::EmptyProject),
            _ => {},
        }
        for (field, value) in [
            ("threads.refresh_url", &self.threads.refresh_url),
            ("secret.api_url", &self.secret.api_url),
            ("secret.metadata_url", &self.secret.metadata_url),
        ] {
            url::Url::parse(value).map_err(|source| ConfigError::InvalidUrl {
                field,
                value: value.clone(),
                source,
            })?;
        }
        if self.threads.http_timeout_secs == 0 {
            return Err(ConfigError::ZeroTimeout);
        }
        Ok(())
    }
}
