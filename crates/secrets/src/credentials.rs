//! Bearer credentials for Secret Manager.

use std::time::{Duration, Instant};

use {
    async_trait::async_trait,
    secrecy::{ExposeSecret, Secret},
    serde::Deserialize,
    tokio::sync::Mutex,
    tracing::debug,
};

use crate::{Result, SecretStoreError};

/// Refresh the cached credential this long before it expires.
const EXPIRY_MARGIN: Duration = Duration::from_secs(60);

const TOKEN_PATH: &str = "/computeMetadata/v1/instance/service-accounts/default/token";

/// Source of the OAuth2 access token sent to Secret Manager.
#[async_trait]
pub trait TokenSource: Send + Sync {
    async fn token(&self) -> Result<Secret<String>>;
}

/// A fixed token, e.g. the output of `gcloud auth print-access-token`.
pub struct StaticToken(Secret<String>);

impl StaticToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(Secret::new(token.into()))
    }

    pub fn from_secret(token: Secret<String>) -> Self {
        Self(token)
    }
}

#[async_trait]
impl TokenSource for StaticToken {
    async fn token(&self) -> Result<Secret<String>> {
        Ok(Secret::new(self.0.expose_secret().clone()))
    }
}

struct CachedToken {
    token: Secret<String>,
    expires_at: Instant,
}

/// Service account token from the metadata server of the hosting runtime
/// (Cloud Functions, Cloud Run, GCE).
pub struct MetadataServer {
    client: reqwest::Client,
    base_url: String,
    cached: Mutex<Option<CachedToken>>,
}

#[derive(Deserialize)]
struct MetadataTokenResponse {
    access_token: String,
    expires_in: u64,
}

impl MetadataServer {
    pub fn new(client: reqwest::Client, base_url: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            cached: Mutex::new(None),
        }
    }

    async fn fetch(&self) -> Result<CachedToken> {
        let resp = self
            .client
            .get(format!("{}{TOKEN_PATH}", self.base_url))
            .header("Metadata-Flavor", "Google")
            .send()
            .await
            .map_err(|e| SecretStoreError::Credentials(e.to_string()))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(SecretStoreError::Credentials(format!(
                "metadata server returned {status}: {body}"
            )));
        }

        let parsed: MetadataTokenResponse = resp
            .json()
            .await
            .map_err(|e| SecretStoreError::Credentials(e.to_string()))?;

        debug!(expires_in = parsed.expires_in, "fetched metadata access token");
        Ok(CachedToken {
            token: Secret::new(parsed.access_token),
            expires_at: Instant::now() + Duration::from_secs(parsed.expires_in),
        })
    }
}

#[async_trait]
impl TokenSource for MetadataServer {
    async fn token(&self) -> Result<Secret<String>> {
        let mut cached = self.cached.lock().await;
        if let Some(entry) = cached.as_ref()
            && Instant::now() + EXPIRY_MARGIN < entry.expires_at
        {
            return Ok(Secret::new(entry.token.expose_secret().clone()));
        }

        let fresh = self.fetch().await?;
        let token = Secret::new(fresh.token.expose_secret().clone());
        *cached = Some(fresh);
        Ok(token)
    }
}
