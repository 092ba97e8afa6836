use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
};

use {
    async_trait::async_trait,
    base64::{Engine, engine::general_purpose::STANDARD},
    serde::{Deserialize, Serialize},
    tracing::debug,
};

use crate::{Result, SecretPath, SecretStore, SecretStoreError};

/// File-based secret storage at `<data_dir>/secrets.json`, for running
/// without a cloud project.
///
/// Versions are kept in append order per parent resource; the last entry
/// is the latest version.
#[derive(Debug, Clone)]
pub struct FileSecretStore {
    path: PathBuf,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct SecretFile {
    #[serde(default)]
    secrets: BTreeMap<String, Vec<String>>,
}

impl FileSecretStore {
    pub fn in_dir(dir: &Path) -> Self {
        Self {
            path: dir.join("secrets.json"),
        }
    }

    /// Create a store at a specific path (useful for testing).
    pub fn with_path(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read(&self) -> Result<SecretFile> {
        match std::fs::read_to_string(&self.path) {
            Ok(data) => serde_json::from_str(&data).map_err(|e| {
                SecretStoreError::Malformed(format!("{}: {e}", self.path.display()))
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(SecretFile::default()),
            Err(e) => Err(e.into()),
        }
    }

    fn write(&self, file: &SecretFile) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let data = serde_json::to_string_pretty(file)
            .map_err(|e| SecretStoreError::Malformed(e.to_string()))?;
        std::fs::write(&self.path, data)?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(&self.path, std::fs::Permissions::from_mode(0o600))?;
        }

        Ok(())
    }

    /// Number of stored versions for `path`.
    pub fn version_count(&self, path: &SecretPath) -> Result<usize> {
        Ok(self
            .read()?
            .secrets
            .get(&path.parent_name())
            .map_or(0, Vec::len))
    }
}

#[async_trait]
impl SecretStore for FileSecretStore {
    fn backend_name(&self) -> &'static str {
        "file"
    }

    async fn access_latest(&self, path: &SecretPath) -> Result<Vec<u8>> {
        let file = self.read()?;
        let encoded = file
            .secrets
            .get(&path.parent_name())
            .and_then(|versions| versions.last())
            .ok_or_else(|| SecretStoreError::NotFound(path.latest_version_name()))?;
        STANDARD
            .decode(encoded)
            .map_err(|e| SecretStoreError::Malformed(format!("stored payload is not base64: {e}")))
    }

    async fn add_version(&self, path: &SecretPath, payload: &[u8]) -> Result<String> {
        let mut file = self.read()?;
        let parent = path.parent_name();
        let versions = file.secrets.entry(parent.clone()).or_default();
        versions.push(STANDARD.encode(payload));
        let name = format!("{parent}/versions/{}", versions.len());
        self.write(&file)?;
        debug!(version = %name, path = %self.path.display(), "added secret version");
        Ok(name)
    }

    async fn ensure_secret(&self, path: &SecretPath) -> Result<bool> {
        let mut file = self.read()?;
        let parent = path.parent_name();
        if file.secrets.contains_key(&parent) {
            return Ok(false);
        }
        file.secrets.insert(parent, Vec::new());
        self.write(&file)?;
        Ok(true)
    }
}
