//! End-to-end refresh through the config-driven wiring, using the file
//! secret backend and a mock Threads endpoint.

use {
    axum::http::{Method, StatusCode},
    mockito::Matcher,
    threadkeeper_config::{SecretBackend, ThreadkeeperConfig},
    threadkeeper_gateway::build_handler,
    threadkeeper_secrets::{FileSecretStore, SecretPath, SecretStore},
};

fn config(dir: &std::path::Path, refresh_url: String) -> ThreadkeeperConfig {
    let mut config = ThreadkeeperConfig::default();
    config.secret.backend = SecretBackend::File;
    config.secret.data_dir = Some(dir.to_path_buf());
    config.threads.refresh_url = refresh_url;
    config
}

#[tokio::test]
async fn refresh_rotates_token_on_disk() {
    let dir = tempfile::tempdir().unwrap();
    let path = SecretPath::new("local", "house-wang-threads-api");
    let store = FileSecretStore::in_dir(dir.path());
    store.add_version(&path, b"THQWJ-seeded").await.unwrap();

    let mut server = mockito::Server::new_async().await;
    let upstream = server
        .mock("GET", "/refresh_access_token")
        .match_query(Matcher::AllOf(vec![
            Matcher::UrlEncoded("grant_type".into(), "th_refresh_token".into()),
            Matcher::UrlEncoded("access_token".into(), "THQWJ-seeded".into()),
        ]))
        .with_status(200)
        .with_body(r#"{"access_token":"THQWJ-rotated","token_type":"bearer","expires_in":5183944}"#)
        .create_async()
        .await;

    let cfg = config(
        dir.path(),
        format!("{}/refresh_access_token", server.url()),
    );
    cfg.validate().unwrap();
    let handler = build_handler(&cfg).unwrap();

    let resp = handler.handle(&Method::GET).await;
    assert_eq!(resp.status, StatusCode::OK);
    upstream.assert_async().await;

    assert_eq!(store.access_latest(&path).await.unwrap(), b"THQWJ-rotated");
    assert_eq!(store.version_count(&path).unwrap(), 2);
}

#[tokio::test]
async fn upstream_rejection_leaves_disk_untouched() {
    let dir = tempfile::tempdir().unwrap();
    let path = SecretPath::new("local", "house-wang-threads-api");
    let store = FileSecretStore::in_dir(dir.path());
    store.add_version(&path, b"THQWJ-expired").await.unwrap();

    let mut server = mockito::Server::new_async().await;
    let raw = r#"{"error":{"message":"Error validating access token","type":"OAuthException","code":190}}"#;
    server
        .mock("GET", "/refresh_access_token")
        .match_query(Matcher::Any)
        .with_status(400)
        .with_body(raw)
        .create_async()
        .await;

    let handler = build_handler(&config(
        dir.path(),
        format!("{}/refresh_access_token", server.url()),
    ))
    .unwrap();

    let resp = handler.handle(&Method::GET).await;
    assert_eq!(resp.status, StatusCode::BAD_REQUEST);
    let body = resp.parsed().unwrap();
    assert_eq!(body.error.as_deref(), Some("API request failed with status 400"));
    assert_eq!(body.details.as_deref(), Some(raw));
    assert_eq!(store.version_count(&path).unwrap(), 1);
}

#[tokio::test]
async fn missing_secret_file_is_internal_error() {
    let dir = tempfile::tempdir().unwrap();
    let handler = build_handler(&config(dir.path(), "http://127.0.0.1:1/refresh".into())).unwrap();

    let resp = handler.handle(&Method::GET).await;
    assert_eq!(resp.status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(
        resp.parsed().unwrap().error.as_deref(),
        Some("Internal server error")
    );
}
