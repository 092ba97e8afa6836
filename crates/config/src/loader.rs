use std::path::{Path, PathBuf};

use tracing::debug;

use crate::{env_subst::substitute_env, schema::ThreadkeeperConfig};

/// Standard config file names, checked in order.
const CONFIG_FILENAMES: &[&str] = &[
    "threadkeeper.toml",
    "threadkeeper.yaml",
    "threadkeeper.yml",
    "threadkeeper.json",
];

/// Load config from the given path (any supported format).
pub fn load_config(path: &Path) -> anyhow::Result<ThreadkeeperConfig> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("failed to read {}: {e}", path.display()))?;
    let raw = substitute_env(&raw);
    parse_config(&raw, path)
}

/// Resolve the full configuration: file (explicit or discovered), then
/// process environment overrides.
///
/// An explicit path that cannot be read is an error. When discovery finds
/// nothing, defaults are used. The result is not validated; callers run
/// [`ThreadkeeperConfig::validate`] before serving.
pub fn load(explicit: Option<&Path>) -> anyhow::Result<ThreadkeeperConfig> {
    let mut config = match explicit {
        Some(path) => load_config(path)?,
        None => match find_config_file() {
            Some(path) => {
                debug!(path = %path.display(), "loading config");
                load_config(&path)?
            },
            None => {
                debug!("no config file found, using defaults");
                ThreadkeeperConfig::default()
            },
        },
    };
    config.apply_env(|name| std::env::var(name).ok())?;
    Ok(config)
}

/// Find the first config file in standard locations.
///
/// Search order:
/// 1. `./threadkeeper.{toml,yaml,yml,json}` (project-local)
/// 2. `~/.config/threadkeeper/threadkeeper.{toml,yaml,yml,json}` (user-global)
pub fn find_config_file() -> Option<PathBuf> {
    find_in(Path::new(".")).or_else(|| config_dir().and_then(|dir| find_in(&dir)))
}

fn find_in(dir: &Path) -> Option<PathBuf> {
    CONFIG_FILENAMES
        .iter()
        .map(|name| dir.join(name))
        .find(|p| p.exists())
}

/// Returns the user-global config directory: `~/.config/threadkeeper/`.
pub fn config_dir() -> Option<PathBuf> {
    home_dir().map(|h| h.join(".config").join("threadkeeper"))
}

/// Returns the data directory used by the file secret backend: `~/.threadkeeper/`.
pub fn data_dir() -> PathBuf {
    home_dir()
        .map(|h| h.join(".threadkeeper"))
        .unwrap_or_else(|| PathBuf::from(".threadkeeper"))
}

fn home_dir() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|d| d.home_dir().to_path_buf())
}

fn parse_config(raw: &str, path: &Path) -> anyhow::Result<ThreadkeeperConfig> {
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("toml");

    match ext {
        "toml" => Ok(toml::from_str(raw)?),
        "yaml" | "yml" => Ok(serde_yaml::from_str(raw)?),
        "json" => Ok(serde_json::from_str(raw)?),
        _ => anyhow::bail!("unsupported config format: .{ext}"),
    }
}

#[cfg(test)]
mod tests {
    use {super::*, crate::schema::SecretBackend};

    #[test]
    fn loads_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("threadkeeper.toml");
        std::fs::write(
            &path,
            r#"
            [secret]
            name = "threads-token"
            project = "acme-prod"

            [threads]
            http_timeout_secs = 5
            "#,
        )
        .unwrap();

        let cfg = load_config(&path).unwrap();
        assert_eq!(cfg.secret.name, "threads-token");
        assert_eq!(cfg.secret.project.as_deref(), Some("acme-prod"));
        assert_eq!(cfg.threads.http_timeout_secs, 5);
    }

    #[test]
    fn loads_yaml_and_json() {
        let dir = tempfile::tempdir().unwrap();

        let yaml = dir.path().join("threadkeeper.yaml");
        std::fs::write(&yaml, "secret:\n  backend: file\n  name: local-token\n").unwrap();
        let cfg = load_config(&yaml).unwrap();
        assert_eq!(cfg.secret.backend, SecretBackend::File);
        assert_eq!(cfg.secret.name, "local-token");

        let json = dir.path().join("threadkeeper.json");
        std::fs::write(&json, r#"{"server": {"port": 3000}}"#).unwrap();
        let cfg = load_config(&json).unwrap();
        assert_eq!(cfg.server.port, 3000);
    }

    #[test]
    fn rejects_unknown_extension() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("threadkeeper.ini");
        std::fs::write(&path, "").unwrap();
        let err = load_config(&path).unwrap_err();
        assert!(err.to_string().contains("unsupported config format"));
    }

    #[test]
    fn missing_explicit_file_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = load(Some(&dir.path().join("absent.toml"))).unwrap_err();
        assert!(err.to_string().contains("failed to read"));
    }

    #[test]
    fn find_in_respects_order() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("threadkeeper.json"), "{}").unwrap();
        std::fs::write(dir.path().join("threadkeeper.toml"), "").unwrap();
        let found = find_in(dir.path()).unwrap();
        assert!(found.ends_with("threadkeeper.toml"));
    }
}
