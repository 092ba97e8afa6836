//! The refresh pipeline: read the current token, exchange it, write the
//! new one back, and map the result onto an HTTP response.

use std::sync::Arc;

use {
    axum::http::{Method, StatusCode},
    secrecy::{ExposeSecret, Secret},
    serde_json::Value,
    threadkeeper_oauth::{RefreshedToken, ThreadsRefresher, mask_token},
    threadkeeper_secrets::{SecretPath, SecretStore},
    tracing::{debug, error, info, warn},
};

use crate::{
    error::RefreshError,
    response::{HandlerResponse, RefreshBody, timestamp},
};

/// Result of a refresh that did not break internally.
#[derive(Debug, Clone, PartialEq)]
pub enum RefreshOutcome {
    /// Upstream answered 200. `version` is the new secret version when the
    /// body carried an access token.
    Refreshed { data: Value, version: Option<String> },
    /// Upstream answered with any other status.
    Rejected { status: u16, body: String },
}

pub struct TokenRefreshHandler {
    store: Arc<dyn SecretStore>,
    refresher: ThreadsRefresher,
    path: SecretPath,
}

impl TokenRefreshHandler {
    pub fn new(store: Arc<dyn SecretStore>, refresher: ThreadsRefresher, path: SecretPath) -> Self {
        Self {
            store,
            refresher,
            path,
        }
    }

    pub fn secret_path(&self) -> &SecretPath {
        &self.path
    }

    pub fn backend_name(&self) -> &'static str {
        self.store.backend_name()
    }

    /// Run one refresh against the secret store and the Threads API.
    pub async fn run(&self) -> Result<RefreshOutcome, RefreshError> {
        let secret = self.path.latest_version_name();
        let raw = self
            .store
            .access_latest(&self.path)
            .await
            .map_err(|source| RefreshError::SecretRead {
                path: secret.clone(),
                source,
            })?;
        let current = String::from_utf8(raw).map_err(|source| RefreshError::InvalidEncoding {
            path: secret.clone(),
            source,
        })?;
        debug!(secret = %secret, token = %mask_token(&current), "loaded current token");
        let current = Secret::new(current);

        let upstream = self.refresher.refresh(&current).await?;
        if !upstream.is_ok() {
            return Ok(RefreshOutcome::Rejected {
                status: upstream.status,
                body: upstream.body,
            });
        }

        let data = upstream.json().map_err(RefreshError::MalformedResponse)?;
        let refreshed = RefreshedToken::from_body(&data);
        let version = match refreshed.access_token {
            Some(ref token) => {
                let version = self
                    .store
                    .add_version(&self.path, token.expose_secret().as_bytes())
                    .await
                    .map_err(|source| RefreshError::SecretWrite {
                        path: self.path.parent_name(),
                        source,
                    })?;
                Some(version)
            },
            None => None,
        };
        if let Some(expires_in) = refreshed.expires_in {
            debug!(expires_in, token_type = ?refreshed.token_type, "refreshed token lifetime");
        }

        Ok(RefreshOutcome::Refreshed { data, version })
    }

    /// Serve one HTTP invocation.
    pub async fn handle(&self, method: &Method) -> HandlerResponse {
        if method == Method::OPTIONS {
            return HandlerResponse::preflight();
        }

        let outcome = self.run().await;
        let now = timestamp();
        match outcome {
            Ok(RefreshOutcome::Refreshed { data, version }) => {
                match version {
                    Some(ref version) => info!(
                        secret = %self.path,
                        backend = self.backend_name(),
                        version = %version,
                        stored = true,
                        at = %now,
                        "token refresh successful"
                    ),
                    None => warn!(
                        secret = %self.path,
                        backend = self.backend_name(),
                        stored = false,
                        at = %now,
                        "token refresh successful but response carried no access_token, secret unchanged"
                    ),
                }
                HandlerResponse::json(StatusCode::OK, &RefreshBody::refreshed(data, now))
            },
            Ok(RefreshOutcome::Rejected { status, body }) => {
                warn!(status, body = %body, "token refresh failed");
                let code = StatusCode::from_u16(status).unwrap_or(StatusCode::BAD_GATEWAY);
                HandlerResponse::json(code, &RefreshBody::rejected(status, body, now))
            },
            Err(err) => {
                error!(kind = err.kind(), error = %err, "error refreshing token");
                HandlerResponse::json(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    &RefreshBody::internal(err.to_string(), now),
                )
            },
        }
    }
}
