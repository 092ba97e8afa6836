//! Threads long-lived token refresh (`th_refresh_token` grant).

use std::time::Duration;

use {
    secrecy::{ExposeSecret, Secret},
    tracing::debug,
};

use crate::types::UpstreamResponse;

pub const GRANT_TYPE: &str = "th_refresh_token";

/// Build the shared outbound HTTP client.
pub fn http_client(timeout: Duration) -> reqwest::Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(timeout)
        .user_agent(concat!("threadkeeper/", env!("CARGO_PKG_VERSION")))
        .build()
}

/// Client for the Threads refresh endpoint.
#[derive(Clone)]
pub struct ThreadsRefresher {
    client: reqwest::Client,
    refresh_url: String,
}

impl std::fmt::Debug for ThreadsRefresher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ThreadsRefresher")
            .field("refresh_url", &self.refresh_url)
            .finish()
    }
}

impl ThreadsRefresher {
    pub fn new(client: reqwest::Client, refresh_url: impl Into<String>) -> Self {
        Self {
            client,
            refresh_url: refresh_url.into(),
        }
    }

    pub fn refresh_url(&self) -> &str {
        &self.refresh_url
    }

    /// Exchange `access_token` for a refreshed one.
    ///
    /// Any HTTP status is returned as an [`UpstreamResponse`]; only transport
    /// failures (connect, timeout, unreadable body) are errors. Errors carry
    /// no URL, since the query string holds the current token.
    pub async fn refresh(&self, access_token: &Secret<String>) -> reqwest::Result<UpstreamResponse> {
        debug!(url = %self.refresh_url, "requesting token refresh");
        let resp = self
            .client
            .get(&self.refresh_url)
            .query(&[
                ("grant_type", GRANT_TYPE),
                ("access_token", access_token.expose_secret().as_str()),
            ])
            .send()
            .await
            .map_err(reqwest::Error::without_url)?;

        let status = resp.status().as_u16();
        let body = resp.text().await.map_err(reqwest::Error::without_url)?;
        Ok(UpstreamResponse { status, body })
    }
}
