use std::{net::SocketAddr, sync::Arc, time::Duration};

use {
    axum::{
        Router,
        extract::State,
        http::Method,
        response::{IntoResponse, Json},
        routing::get,
    },
    threadkeeper_config::ThreadkeeperConfig,
    threadkeeper_oauth::{ThreadsRefresher, http_client},
    threadkeeper_secrets::SecretPath,
    tower_http::trace::TraceLayer,
    tracing::info,
};

use crate::{handler::TokenRefreshHandler, response::HandlerResponse};

// ── Shared app state ─────────────────────────────────────────────────────────

#[derive(Clone)]
struct AppState {
    handler: Arc<TokenRefreshHandler>,
}

// ── Server startup ───────────────────────────────────────────────────────────

/// Wire the secret store and the Threads client described by `config`.
pub fn build_handler(config: &ThreadkeeperConfig) -> anyhow::Result<TokenRefreshHandler> {
    let client = http_client(Duration::from_secs(config.threads.http_timeout_secs))?;
    let store = threadkeeper_secrets::open(&config.secret, client.clone());
    let refresher = ThreadsRefresher::new(client, config.threads.refresh_url.clone());
    Ok(TokenRefreshHandler::new(
        store,
        refresher,
        SecretPath::from_config(&config.secret),
    ))
}

/// Build the router (shared between production startup and tests).
///
/// `/health` answers liveness probes; every other path and method goes to
/// the refresh handler.
pub fn build_app(handler: Arc<TokenRefreshHandler>) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .fallback(refresh_handler)
        .layer(TraceLayer::new_for_http())
        .with_state(AppState { handler })
}

/// Validate `config` and serve until interrupted.
pub async fn start_server(config: &ThreadkeeperConfig) -> anyhow::Result<()> {
    config.validate()?;
    let handler = Arc::new(build_handler(config)?);

    let addr: SocketAddr = format!("{}:{}", config.server.bind, config.server.port).parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;

    let lines = [
        format!("threadkeeper v{}", env!("CARGO_PKG_VERSION")),
        format!("listening on {addr}"),
        format!(
            "secret: {} ({})",
            handler.secret_path(),
            handler.backend_name()
        ),
        format!("refresh: {}", config.threads.refresh_url),
    ];
    let width = lines.iter().map(|l| l.len()).max().unwrap_or(0) + 4;
    info!("┌{}┐", "─".repeat(width));
    for line in &lines {
        info!("│  {:<w$}│", line, w = width - 2);
    }
    info!("└{}┘", "─".repeat(width));

    axum::serve(listener, build_app(handler))
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        info!("shutting down");
    }
}

// ── Handlers ─────────────────────────────────────────────────────────────────

async fn health_handler(State(state): State<AppState>) -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "backend": state.handler.backend_name(),
    }))
}

async fn refresh_handler(State(state): State<AppState>, method: Method) -> HandlerResponse {
    state.handler.handle(&method).await
}

#[cfg(test)]
mod tests {
    use {
        super::*,
        axum::{
            body::{Body, to_bytes},
            http::{Request, StatusCode},
        },
        mockito::Matcher,
        threadkeeper_config::SecretBackend,
        threadkeeper_secrets::MemorySecretStore,
        tower::ServiceExt,
    };

    fn path() -> SecretPath {
        SecretPath::new("acme-prod", "house-wang-threads-api")
    }

    async fn app(url: String, store: Arc<MemorySecretStore>) -> Router {
        let refresher = ThreadsRefresher::new(reqwest::Client::new(), url);
        build_app(Arc::new(TokenRefreshHandler::new(store, refresher, path())))
    }

    #[tokio::test]
    async fn health_reports_backend() {
        let store = Arc::new(MemorySecretStore::new());
        let app = app("http://127.0.0.1:1".into(), store.clone()).await;
        let resp = app
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let body = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        let value: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(value["backend"], "memory");
        assert_eq!(store.reads(), 0);
    }

    #[tokio::test]
    async fn options_on_any_path_is_preflight() {
        let store = Arc::new(MemorySecretStore::new());
        let app = app("http://127.0.0.1:1".into(), store.clone()).await;
        let resp = app
            .oneshot(
                Request::builder()
                    .method(Method::OPTIONS)
                    .uri("/refresh")
                    .header("Origin", "https://dashboard.example")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(resp.status(), StatusCode::NO_CONTENT);
        assert_eq!(resp.headers()["access-control-allow-methods"], "GET, POST");
        let body = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        assert!(body.is_empty());
        assert_eq!(store.reads(), 0);
    }

    #[tokio::test]
    async fn root_get_runs_refresh() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/refresh_access_token")
            .match_query(Matcher::UrlEncoded("access_token".into(), "old".into()))
            .with_status(200)
            .with_body(r#"{"access_token":"new","token_type":"bearer","expires_in":5183944}"#)
            .create_async()
            .await;
        let store = Arc::new(MemorySecretStore::with_secret(&path(), "old").await);
        let app = app(
            format!("{}/refresh_access_token", server.url()),
            store.clone(),
        )
        .await;

        let resp = app
            .oneshot(Request::get("/").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(resp.headers()["content-type"], "application/json");
        let body = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        let value: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(value["success"], true);
        assert_eq!(value["data"]["expires_in"], 5_183_944);
        assert_eq!(store.versions(&path()).await.last().unwrap(), b"new");
    }

    #[test]
    fn build_handler_uses_config() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = ThreadkeeperConfig::default();
        config.secret.backend = SecretBackend::File;
        config.secret.name = "threads-token".into();
        config.secret.data_dir = Some(dir.path().to_path_buf());

        let handler = build_handler(&config).unwrap();
        assert_eq!(handler.backend_name(), "file");
        assert_eq!(
            handler.secret_path().latest_version_name(),
            "projects/local/secrets/threads-token/versions/latest"
        );
    }
}
