use std::{
    collections::HashMap,
    sync::atomic::{AtomicBool, AtomicUsize, Ordering},
};

use {async_trait::async_trait, tokio::sync::Mutex};

use crate::{Result, SecretPath, SecretStore, SecretStoreError};

/// In-process secret store.
///
/// Keeps every version and counts reads and writes, so callers can check
/// exactly what a refresh touched. Reads or writes can be made to fail.
#[derive(Default)]
pub struct MemorySecretStore {
    versions: Mutex<HashMap<String, Vec<Vec<u8>>>>,
    reads: AtomicUsize,
    writes: AtomicUsize,
    fail_reads: AtomicBool,
    fail_writes: AtomicBool,
}

impl MemorySecretStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-seeded with one version holding `token`.
    pub async fn with_secret(path: &SecretPath, token: &str) -> Self {
        let store = Self::new();
        store
            .versions
            .lock()
            .await
            .insert(path.parent_name(), vec![token.as_bytes().to_vec()]);
        store
    }

    pub fn fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    /// All versions for `path`, oldest first.
    pub async fn versions(&self, path: &SecretPath) -> Vec<Vec<u8>> {
        self.versions
            .lock()
            .await
            .get(&path.parent_name())
            .cloned()
            .unwrap_or_default()
    }
}

#[async_trait]
impl SecretStore for MemorySecretStore {
    fn backend_name(&self) -> &'static str {
        "memory"
    }

    async fn access_latest(&self, path: &SecretPath) -> Result<Vec<u8>> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(SecretStoreError::Api {
                status: 403,
                body: "permission denied".into(),
            });
        }
        self.versions
            .lock()
            .await
            .get(&path.parent_name())
            .and_then(|v| v.last().cloned())
            .ok_or_else(|| SecretStoreError::NotFound(path.latest_version_name()))
    }

    async fn add_version(&self, path: &SecretPath, payload: &[u8]) -> Result<String> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(SecretStoreError::Api {
                status: 503,
                body: "unavailable".into(),
            });
        }
        self.writes.fetch_add(1, Ordering::SeqCst);
        let mut versions = self.versions.lock().await;
        let entry = versions.entry(path.parent_name()).or_default();
        entry.push(payload.to_vec());
        Ok(format!("{}/versions/{}", path.parent_name(), entry.len()))
    }

    async fn ensure_secret(&self, path: &SecretPath) -> Result<bool> {
        let mut versions = self.versions.lock().await;
        if versions.contains_key(&path.parent_name()) {
            return Ok(false);
        }
        versions.insert(path.parent_name(), Vec::new());
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn seeded_store_returns_token() {
        let path = SecretPath::new("p", "s");
        let store = MemorySecretStore::with_secret(&path, "tok").await;
        assert_eq!(store.access_latest(&path).await.unwrap(), b"tok");
        assert_eq!(store.reads(), 1);
    }

    #[tokio::test]
    async fn failing_writes_do_not_append() {
        let path = SecretPath::new("p", "s");
        let store = MemorySecretStore::with_secret(&path, "tok").await;
        store.fail_writes(true);
        assert!(store.add_version(&path, b"new").await.is_err());
        assert_eq!(store.versions(&path).await.len(), 1);
        assert_eq!(store.writes(), 0);
    }
}
