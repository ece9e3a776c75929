use crate::traits::{
    ContainerRef, ObjectMeta, ProviderAdapter, ProviderError, ProviderResult, PutOutcome,
    StoredObject, UsageSnapshot,
};
use async_trait::async_trait;
use fotofest_core::StorageTier;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;

/// Local filesystem tier backend
#[derive(Clone)]
pub struct LocalProvider {
    base_path: PathBuf,
    base_url: String,
    capacity_bytes: u64,
}

impl LocalProvider {
    /// Create a new LocalProvider.
    ///
    /// # Arguments
    /// * `base_path` - Root directory for stored photos (e.g., "/var/lib/fotofest/backup")
    /// * `base_url` - Base URL for serving files (e.g., "http://localhost:4000/backup")
    /// * `capacity_bytes` - Advisory ceiling reported in usage snapshots
    pub async fn new(
        base_path: impl Into<PathBuf>,
        base_url: String,
        capacity_bytes: u64,
    ) -> ProviderResult<Self> {
        let base_path = base_path.into();

        fs::create_dir_all(&base_path).await.map_err(|e| {
            ProviderError::Config(format!(
                "Failed to create storage directory {}: {}",
                base_path.display(),
                e
            ))
        })?;

        Ok(LocalProvider {
            base_path,
            base_url,
            capacity_bytes,
        })
    }

    /// Convert a logical path to a filesystem path with traversal validation.
    fn key_to_path(&self, key: &str) -> ProviderResult<PathBuf> {
        if key.contains("..") || key.starts_with('/') {
            return Err(ProviderError::InvalidKey(
                "Path contains invalid components".to_string(),
            ));
        }
        Ok(self.base_path.join(key))
    }

    fn generate_url(&self, key: &str) -> String {
        format!("{}/{}", self.base_url.trim_end_matches('/'), key)
    }

    async fn ensure_parent_dir(&self, path: &Path) -> ProviderResult<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }
        Ok(())
    }

    /// Walk a directory tree, collecting files relative to the base path.
    async fn walk(&self, root: PathBuf) -> ProviderResult<Vec<StoredObject>> {
        let mut objects = Vec::new();
        let mut stack = vec![root];

        while let Some(dir) = stack.pop() {
            let mut entries = match fs::read_dir(&dir).await {
                Ok(entries) => entries,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => continue,
                Err(e) => return Err(ProviderError::Io(e)),
            };
            while let Some(entry) = entries.next_entry().await? {
                let path = entry.path();
                let meta = entry.metadata().await?;
                if meta.is_dir() {
                    stack.push(path);
                } else {
                    let rel = path
                        .strip_prefix(&self.base_path)
                        .unwrap_or(&path)
                        .to_string_lossy()
                        .replace('\\', "/");
                    objects.push(StoredObject {
                        path: rel,
                        size_bytes: meta.len(),
                    });
                }
            }
        }

        Ok(objects)
    }
}

#[async_trait]
impl ProviderAdapter for LocalProvider {
    async fn put(
        &self,
        data: Vec<u8>,
        logical_path: &str,
        _meta: &ObjectMeta,
    ) -> ProviderResult<PutOutcome> {
        let path = self.key_to_path(logical_path)?;
        let size = data.len();

        self.ensure_parent_dir(&path).await?;

        let start = std::time::Instant::now();

        let mut file = fs::File::create(&path).await.map_err(|e| {
            ProviderError::WriteFailed(format!("Failed to create file {}: {}", path.display(), e))
        })?;

        file.write_all(&data).await.map_err(|e| {
            ProviderError::WriteFailed(format!("Failed to write file {}: {}", path.display(), e))
        })?;

        file.sync_all().await.map_err(|e| {
            ProviderError::WriteFailed(format!("Failed to sync file {}: {}", path.display(), e))
        })?;

        let url = self.generate_url(logical_path);

        tracing::info!(
            path = %path.display(),
            key = %logical_path,
            size_bytes = size,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Local storage upload successful"
        );

        Ok(PutOutcome {
            url,
            provider_path: logical_path.to_string(),
            etag: None,
        })
    }

    async fn put_in_container(
        &self,
        data: Vec<u8>,
        name: &str,
        container: &ContainerRef,
        meta: &ObjectMeta,
    ) -> ProviderResult<PutOutcome> {
        let key = format!("{}/{}", container.id.trim_end_matches('/'), name);
        self.put(data, &key, meta).await
    }

    async fn get(&self, provider_path: &str) -> ProviderResult<Vec<u8>> {
        let path = self.key_to_path(provider_path)?;
        let start = std::time::Instant::now();

        if !fs::try_exists(&path).await.unwrap_or(false) {
            return Err(ProviderError::NotFound(provider_path.to_string()));
        }

        let data = fs::read(&path).await.map_err(|e| {
            ProviderError::ReadFailed(format!("Failed to read file {}: {}", path.display(), e))
        })?;

        tracing::info!(
            path = %path.display(),
            key = %provider_path,
            size_bytes = data.len(),
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Local storage download successful"
        );

        Ok(data)
    }

    async fn delete(&self, provider_path: &str) -> ProviderResult<bool> {
        let path = self.key_to_path(provider_path)?;

        if !fs::try_exists(&path).await.unwrap_or(false) {
            return Ok(false);
        }

        fs::remove_file(&path).await.map_err(|e| {
            ProviderError::WriteFailed(format!("Failed to delete file {}: {}", path.display(), e))
        })?;

        tracing::info!(
            path = %path.display(),
            key = %provider_path,
            "Local storage delete successful"
        );

        Ok(true)
    }

    async fn list(&self, prefix: &str) -> ProviderResult<Vec<StoredObject>> {
        let root = if prefix.is_empty() {
            self.base_path.clone()
        } else {
            self.key_to_path(prefix)?
        };
        self.walk(root).await
    }

    async fn usage_snapshot(&self) -> ProviderResult<UsageSnapshot> {
        let objects = self.walk(self.base_path.clone()).await?;
        let used_bytes: u64 = objects.iter().map(|o| o.size_bytes).sum();

        tracing::debug!(
            path = %self.base_path.display(),
            file_count = objects.len(),
            used_bytes,
            "Local storage usage computed"
        );

        Ok(UsageSnapshot {
            used_bytes,
            capacity_bytes: self.capacity_bytes,
        })
    }

    async fn create_container(
        &self,
        name: &str,
        parent: Option<&str>,
    ) -> ProviderResult<ContainerRef> {
        let id = match parent {
            Some(parent) => format!("{}/{}", parent.trim_end_matches('/'), name),
            None => name.to_string(),
        };
        let path = self.key_to_path(&id)?;
        // create_dir_all is idempotent, matching container semantics.
        fs::create_dir_all(&path).await?;
        Ok(ContainerRef {
            id: id.clone(),
            url: Some(self.generate_url(&id)),
        })
    }

    fn tier(&self) -> StorageTier {
        StorageTier::Local
    }

    fn provider_name(&self) -> &'static str {
        "local-fs"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    const CAPACITY: u64 = 50 * 1024 * 1024 * 1024;

    async fn provider(dir: &tempfile::TempDir) -> LocalProvider {
        LocalProvider::new(
            dir.path(),
            "http://localhost:4000/backup".to_string(),
            CAPACITY,
        )
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn test_put_then_get_round_trip() {
        let dir = tempdir().unwrap();
        let provider = provider(&dir).await;
        let data = b"jpeg bytes".to_vec();

        let outcome = provider
            .put(
                data.clone(),
                "events/gala/Ceremony/1_abc_photo.jpg",
                &ObjectMeta::default(),
            )
            .await
            .unwrap();

        assert!(outcome.url.ends_with("events/gala/Ceremony/1_abc_photo.jpg"));
        assert_eq!(outcome.provider_path, "events/gala/Ceremony/1_abc_photo.jpg");

        let downloaded = provider.get(&outcome.provider_path).await.unwrap();
        assert_eq!(data, downloaded);
    }

    #[tokio::test]
    async fn test_path_traversal_rejected() {
        let dir = tempdir().unwrap();
        let provider = provider(&dir).await;

        let result = provider.get("../../../etc/passwd").await;
        assert!(matches!(result, Err(ProviderError::InvalidKey(_))));

        let result = provider.delete("/etc/passwd").await;
        assert!(matches!(result, Err(ProviderError::InvalidKey(_))));
    }

    #[tokio::test]
    async fn test_delete_reports_existence() {
        let dir = tempdir().unwrap();
        let provider = provider(&dir).await;

        assert!(!provider.delete("missing/file.jpg").await.unwrap());

        provider
            .put(b"x".to_vec(), "homepage/1_a_x.jpg", &ObjectMeta::default())
            .await
            .unwrap();
        assert!(provider.delete("homepage/1_a_x.jpg").await.unwrap());
    }

    #[tokio::test]
    async fn test_usage_snapshot_sums_tree() {
        let dir = tempdir().unwrap();
        let provider = provider(&dir).await;

        provider
            .put(vec![0u8; 100], "events/e/a/one.jpg", &ObjectMeta::default())
            .await
            .unwrap();
        provider
            .put(vec![0u8; 50], "homepage/two.jpg", &ObjectMeta::default())
            .await
            .unwrap();

        let snapshot = provider.usage_snapshot().await.unwrap();
        assert_eq!(snapshot.used_bytes, 150);
        assert_eq!(snapshot.capacity_bytes, CAPACITY);
    }

    #[tokio::test]
    async fn test_list_scopes_to_prefix() {
        let dir = tempdir().unwrap();
        let provider = provider(&dir).await;

        provider
            .put(vec![0u8; 10], "events/e/a/one.jpg", &ObjectMeta::default())
            .await
            .unwrap();
        provider
            .put(vec![0u8; 20], "homepage/two.jpg", &ObjectMeta::default())
            .await
            .unwrap();

        let listed = provider.list("events").await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].path, "events/e/a/one.jpg");
    }

    #[tokio::test]
    async fn test_container_creation_is_idempotent() {
        let dir = tempdir().unwrap();
        let provider = provider(&dir).await;

        let first = provider.create_container("archives", None).await.unwrap();
        let second = provider.create_container("archives", None).await.unwrap();
        assert_eq!(first.id, second.id);

        let child = provider
            .create_container("gala-2026-08-06", Some("archives"))
            .await
            .unwrap();
        assert_eq!(child.id, "archives/gala-2026-08-06");
    }
}
