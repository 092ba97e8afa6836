//! Google Cloud Secret Manager over its REST API (v1).

use std::sync::Arc;

use {
    async_trait::async_trait,
    base64::{Engine, engine::general_purpose::STANDARD},
    reqwest::{RequestBuilder, Response, StatusCode},
    secrecy::ExposeSecret,
    serde::{Deserialize, Serialize},
    tracing::{debug, info},
};

use crate::{Result, SecretPath, SecretStore, SecretStoreError, credentials::TokenSource};

pub struct GcpSecretManager {
    client: reqwest::Client,
    base_url: String,
    credentials: Arc<dyn TokenSource>,
}

impl std::fmt::Debug for GcpSecretManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GcpSecretManager")
            .field("base_url", &self.base_url)
            .field("credentials", &"[REDACTED]")
            .finish()
    }
}

// ── API Types ──────────────────────────────────────────────────────────────

#[derive(Serialize, Deserialize)]
struct SecretPayload {
    data: String,
}

#[derive(Deserialize)]
struct AccessSecretVersionResponse {
    payload: SecretPayload,
}

#[derive(Serialize)]
struct AddSecretVersionRequest {
    payload: SecretPayload,
}

#[derive(Deserialize)]
struct SecretVersion {
    name: String,
}

// ── Client ─────────────────────────────────────────────────────────────────

impl GcpSecretManager {
    pub fn new(client: reqwest::Client, base_url: &str, credentials: Arc<dyn TokenSource>) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            credentials,
        }
    }

    fn url(&self, resource: &str) -> String {
        format!("{}/v1/{resource}", self.base_url)
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response> {
        let token = self.credentials.token().await?;
        Ok(request.bearer_auth(token.expose_secret()).send().await?)
    }

    async fn api_error(resp: Response, resource: &str) -> SecretStoreError {
        let status = resp.status();
        if status == StatusCode::NOT_FOUND {
            return SecretStoreError::NotFound(resource.to_string());
        }
        let body = resp.text().await.unwrap_or_default();
        SecretStoreError::Api {
            status: status.as_u16(),
            body,
        }
    }
}

#[async_trait]
impl SecretStore for GcpSecretManager {
    fn backend_name(&self) -> &'static str {
        "gcp"
    }

    async fn access_latest(&self, path: &SecretPath) -> Result<Vec<u8>> {
        let name = path.latest_version_name();
        let resp = self
            .send(self.client.get(self.url(&format!("{name}:access"))))
            .await?;
        if !resp.status().is_success() {
            return Err(Self::api_error(resp, &name).await);
        }

        let parsed: AccessSecretVersionResponse = resp
            .json()
            .await
            .map_err(|e| SecretStoreError::Malformed(e.to_string()))?;
        let data = STANDARD
            .decode(parsed.payload.data.as_bytes())
            .map_err(|e| SecretStoreError::Malformed(format!("payload is not base64: {e}")))?;

        debug!(secret = %name, bytes = data.len(), "accessed secret version");
        Ok(data)
    }

    async fn add_version(&self, path: &SecretPath, payload: &[u8]) -> Result<String> {
        let parent = path.parent_name();
        let body = AddSecretVersionRequest {
            payload: SecretPayload {
                data: STANDARD.encode(payload),
            },
        };
        let resp = self
            .send(
                self.client
                    .post(self.url(&format!("{parent}:addVersion")))
                    .json(&body),
            )
            .await?;
        if !resp.status().is_success() {
            return Err(Self::api_error(resp, &parent).await);
        }

        let version: SecretVersion = resp
            .json()
            .await
            .map_err(|e| SecretStoreError::Malformed(e.to_string()))?;
        debug!(version = %version.name, "added secret version");
        Ok(version.name)
    }

    async fn ensure_secret(&self, path: &SecretPath) -> Result<bool> {
        let parent = path.parent_name();
        let resp = self.send(self.client.get(self.url(&parent))).await?;
        match resp.status() {
            s if s.is_success() => return Ok(false),
            StatusCode::NOT_FOUND => {},
            _ => return Err(Self::api_error(resp, &parent).await),
        }

        let resp = self
            .send(
                self.client
                    .post(self.url(&format!("projects/{}/secrets", path.project())))
                    .query(&[("secretId", path.secret())])
                    .json(&serde_json::json!({ "replication": { "automatic": {} } })),
            )
            .await?;
        if !resp.status().is_success() {
            return Err(Self::api_error(resp, &parent).await);
        }

        info!(secret = %parent, "created secret");
        Ok(true)
    }
}
