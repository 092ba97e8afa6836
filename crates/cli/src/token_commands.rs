use std::io::Read;

use {
    anyhow::{Context, Result},
    http::Method,
    threadkeeper_config::ThreadkeeperConfig,
    threadkeeper_gateway::build_handler,
    threadkeeper_oauth::{http_client, mask_token},
    threadkeeper_secrets::{SecretPath, SecretStore},
    tracing::info,
};

fn open_store(config: &ThreadkeeperConfig) -> Result<std::sync::Arc<dyn SecretStore>> {
    let client = http_client(std::time::Duration::from_secs(
        config.threads.http_timeout_secs,
    ))?;
    Ok(threadkeeper_secrets::open(&config.secret, client))
}

/// Run one refresh in-process and print the JSON body.
pub async fn refresh(config: &ThreadkeeperConfig) -> Result<()> {
    config.validate()?;
    let handler = build_handler(config)?;
    let resp = handler.handle(&Method::POST).await;
    println!("{}", resp.body);
    if !resp.status.is_success() {
        anyhow::bail!("refresh failed with status {}", resp.status.as_u16());
    }
    Ok(())
}

/// Store an initial token, creating the secret if needed.
pub async fn seed(config: &ThreadkeeperConfig, token: Option<String>) -> Result<()> {
    config.validate()?;
    let token = match token {
        Some(t) => t,
        None => {
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .context("failed to read token from stdin")?;
            buf
        },
    };
    let token = normalize_token(&token)?;

    let store = open_store(config)?;
    let path = SecretPath::from_config(&config.secret);
    if store.ensure_secret(&path).await? {
        info!(secret = %path, "created secret");
    }
    let version = store.add_version(&path, token.as_bytes()).await?;

    println!("Stored {} as {version}", mask_token(token));
    Ok(())
}

/// Show which token is currently stored, masked.
pub async fn status(config: &ThreadkeeperConfig) -> Result<()> {
    config.validate()?;
    let store = open_store(config)?;
    let path = SecretPath::from_config(&config.secret);
    let raw = store.access_latest(&path).await?;
    let token = String::from_utf8(raw).context("stored token is not valid UTF-8")?;
    println!(
        "{} [{}] {}",
        path.latest_version_name(),
        store.backend_name(),
        mask_token(&token)
    );
    Ok(())
}

fn normalize_token(raw: &str) -> Result<&str> {
    let token = raw.trim();
    if token.is_empty() {
        anyhow::bail!("token must not be empty");
    }
    if token.chars().any(char::is_whitespace) {
        anyhow::bail!("token must not contain whitespace");
    }
    Ok(token)
}

#[cfg(test)]
mod tests {
    use {
        super::*,
        threadkeeper_config::SecretBackend,
        threadkeeper_secrets::FileSecretStore,
    };

    fn file_config(dir: &std::path::Path) -> ThreadkeeperConfig {
        let mut config = ThreadkeeperConfig::default();
        config.secret.backend = SecretBackend::File;
        config.secret.data_dir = Some(dir.to_path_buf());
        config
    }

    #[test]
    fn normalize_trims_newline() {
        assert_eq!(normalize_token("THQWJ-abc\n").unwrap(), "THQWJ-abc");
        assert!(normalize_token("  \n").is_err());
        assert!(normalize_token("two words").is_err());
    }

    #[tokio::test]
    async fn seed_then_status() {
        let dir = tempfile::tempdir().unwrap();
        let config = file_config(dir.path());

        seed(&config, Some("THQWJ-initial-token-value-0001\n".into()))
            .await
            .unwrap();
        status(&config).await.unwrap();

        let store = FileSecretStore::in_dir(dir.path());
        let path = SecretPath::from_config(&config.secret);
        assert_eq!(
            store.access_latest(&path).await.unwrap(),
            b"THQWJ-initial-token-value-0001"
        );
    }

    #[tokio::test]
    async fn status_without_secret_fails() {
        let dir = tempfile::tempdir().unwrap();
        assert!(status(&file_config(dir.path())).await.is_err());
    }

    #[tokio::test]
    async fn refresh_rejects_invalid_config() {
        let mut config = ThreadkeeperConfig::default();
        config.secret.project = None;
        let err = refresh(&config).await.unwrap_err();
        assert!(err.to_string().contains("GOOGLE_CLOUD_PROJECT"));
    }
}
