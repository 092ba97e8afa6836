//! Configuration for threadkeeper: schema, file discovery, environment
//! overrides and validation.

pub mod env_subst;
pub mod loader;
pub mod schema;

pub use {
    loader::{config_dir, data_dir, find_config_file, load, load_config},
    schema::{
        SecretBackend, SecretConfig, ServerConfig, ThreadkeeperConfig, ThreadsConfig,
        DEFAULT_REFRESH_URL, DEFAULT_SECRET_NAME,
    },
};

/// Reasons a configuration is rejected at startup.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("secret name must not be empty")]
    EmptySecretName,

    #[error("cloud project id is required for the gcp secret backend (set GOOGLE_CLOUD_PROJECT)")]
    MissingProject,

    #[error("cloud project id must not be empty")]
    EmptyProject,

    #[error("unknown secret backend: {0} (expected gcp or file)")]
    UnknownBackend(String),

    #[error("invalid port: {0}")]
    InvalidPort(String),

    #[error("invalid url for {field}: {value}")]
    InvalidUrl {
        field: &'static str,
        value: String,
        #[source]
        source: url::ParseError,
    },

    #[error("threads.http_timeout_secs must be greater than zero")]
    ZeroTimeout,
}
