//! Fotofest CLI support library: tracing setup and the file-backed photo
//! catalog used for operator-driven archival runs.

use async_trait::async_trait;
use fotofest_services::{PhotoCatalog, PhotoRecord};
use std::path::PathBuf;

/// Initialize tracing with an env-filter (`RUST_LOG`), defaulting to info.
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();
}

/// Photo catalog backed by a JSON file containing an array of photo
/// records, as exported from the application's data layer.
pub struct FileCatalog {
    path: PathBuf,
}

impl FileCatalog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        FileCatalog { path: path.into() }
    }
}

#[async_trait]
impl PhotoCatalog for FileCatalog {
    async fn list_event_photos(&self, _event_id: &str) -> anyhow::Result<Vec<PhotoRecord>> {
        let raw = tokio::fs::read(&self.path).await?;
        let photos: Vec<PhotoRecord> = serde_json::from_slice(&raw)?;
        Ok(photos)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_file_catalog_parses_records() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("photos.json");
        tokio::fs::write(
            &path,
            r#"[{"id": "p1", "tier": "object", "provider_path": "events/gala/a/p1.jpg",
                 "url": null, "uploader_name": "guest", "album_name": "a", "file_type": "image/jpeg"}]"#,
        )
        .await
        .unwrap();

        let catalog = FileCatalog::new(&path);
        let photos = catalog.list_event_photos("gala").await.unwrap();
        assert_eq!(photos.len(), 1);
        assert_eq!(photos[0].id, "p1");
    }

    #[tokio::test]
    async fn test_file_catalog_missing_file_errors() {
        let catalog = FileCatalog::new("/nonexistent/photos.json");
        assert!(catalog.list_event_photos("gala").await.is_err());
    }
}
