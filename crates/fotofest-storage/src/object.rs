use crate::traits::{
    ContainerRef, ObjectMeta, ProviderAdapter, ProviderError, ProviderResult, PutOutcome,
    StoredObject, UsageSnapshot,
};
use async_trait::async_trait;
use bytes::Bytes;
use fotofest_core::StorageTier;
use futures::TryStreamExt;
use object_store::aws::{AmazonS3, AmazonS3Builder};
use object_store::path::Path;
use object_store::Error as ObjectStoreError;
use object_store::{ObjectStore, ObjectStoreExt, PutPayload, Result as ObjectResult};

/// Object-store (S3-compatible) tier backend
#[derive(Clone)]
pub struct ObjectStoreProvider {
    store: AmazonS3,
    bucket: String,
    region: String,
    endpoint_url: Option<String>, // Custom endpoint for S3-compatible providers
    capacity_bytes: u64,
}

impl ObjectStoreProvider {
    /// Create a new ObjectStoreProvider.
    ///
    /// # Arguments
    /// * `bucket` - Bucket name
    /// * `region` - Region (or region identifier for S3-compatible providers)
    /// * `endpoint_url` - Optional custom endpoint URL for S3-compatible
    ///   providers (e.g., "http://localhost:9000" for MinIO)
    /// * `access_key_id` / `secret_access_key` - Explicit credentials
    /// * `capacity_bytes` - Configured ceiling reported in usage snapshots
    pub fn new(
        bucket: String,
        region: String,
        endpoint_url: Option<String>,
        access_key_id: &str,
        secret_access_key: &str,
        capacity_bytes: u64,
    ) -> ProviderResult<Self> {
        let mut builder = AmazonS3Builder::new()
            .with_region(region.clone())
            .with_bucket_name(bucket.clone())
            .with_access_key_id(access_key_id)
            .with_secret_access_key(secret_access_key);

        if let Some(ref endpoint) = endpoint_url {
            let allow_http = endpoint.starts_with("http://");
            builder = builder
                .with_endpoint(endpoint.clone())
                .with_allow_http(allow_http);
        }

        let store = builder
            .build()
            .map_err(|e| ProviderError::Unavailable(e.to_string()))?;

        Ok(ObjectStoreProvider {
            store,
            bucket,
            region,
            endpoint_url,
            capacity_bytes,
        })
    }

    /// Generate public URL for a stored object
    ///
    /// For AWS, uses the standard virtual-hosted format; for S3-compatible
    /// providers, path-style under the endpoint URL.
    fn generate_url(&self, key: &str) -> String {
        if let Some(ref endpoint) = self.endpoint_url {
            let base_url = endpoint.trim_end_matches('/');
            format!("{}/{}/{}", base_url, self.bucket, key)
        } else {
            format!(
                "https://{}.s3.{}.amazonaws.com/{}",
                self.bucket, self.region, key
            )
        }
    }
}

#[async_trait]
impl ProviderAdapter for ObjectStoreProvider {
    async fn put(
        &self,
        data: Vec<u8>,
        logical_path: &str,
        _meta: &ObjectMeta,
    ) -> ProviderResult<PutOutcome> {
        let size = data.len() as u64;
        let bytes = Bytes::from(data);
        let location = Path::from(logical_path.to_string());

        let start = std::time::Instant::now();

        let result: ObjectResult<_> = self.store.put(&location, PutPayload::from(bytes)).await;

        let put_result = result.map_err(|e| {
            tracing::error!(
                error = %e,
                bucket = %self.bucket,
                key = %logical_path,
                size_bytes = size,
                duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                "Object store upload failed"
            );
            ProviderError::WriteFailed(e.to_string())
        })?;

        let url = self.generate_url(logical_path);

        tracing::info!(
            bucket = %self.bucket,
            key = %logical_path,
            size_bytes = size,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Object store upload successful"
        );

        Ok(PutOutcome {
            url,
            provider_path: logical_path.to_string(),
            etag: put_result.e_tag,
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
        let start = std::time::Instant::now();
        let location = Path::from(provider_path.to_string());

        let result: ObjectResult<_> = self.store.get(&location).await;

        let result = result.map_err(|e| match e {
            ObjectStoreError::NotFound { .. } => ProviderError::NotFound(provider_path.to_string()),
            other => {
                tracing::error!(
                    error = %other,
                    bucket = %self.bucket,
                    key = %provider_path,
                    duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                    "Object store download failed"
                );
                ProviderError::ReadFailed(other.to_string())
            }
        })?;

        let bytes = result
            .bytes()
            .await
            .map_err(|e| ProviderError::ReadFailed(e.to_string()))?;

        tracing::info!(
            bucket = %self.bucket,
            key = %provider_path,
            size_bytes = bytes.len() as u64,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Object store download successful"
        );

        Ok(bytes.to_vec())
    }

    async fn delete(&self, provider_path: &str) -> ProviderResult<bool> {
        let location = Path::from(provider_path.to_string());

        let result: ObjectResult<_> = self.store.delete(&location).await;

        match result {
            Ok(_) => Ok(true),
            Err(ObjectStoreError::NotFound { .. }) => Ok(false),
            Err(e) => {
                tracing::error!(
                    error = %e,
                    bucket = %self.bucket,
                    key = %provider_path,
                    "Object store delete failed"
                );
                Err(ProviderError::WriteFailed(e.to_string()))
            }
        }
    }

    async fn list(&self, prefix: &str) -> ProviderResult<Vec<StoredObject>> {
        let location = if prefix.is_empty() {
            None
        } else {
            Some(Path::from(prefix.to_string()))
        };

        let objects: Vec<_> = self
            .store
            .list(location.as_ref())
            .try_collect()
            .await
            .map_err(|e| ProviderError::ReadFailed(e.to_string()))?;

        Ok(objects
            .into_iter()
            .map(|meta| StoredObject {
                path: meta.location.to_string(),
                size_bytes: meta.size,
            })
            .collect())
    }

    async fn usage_snapshot(&self) -> ProviderResult<UsageSnapshot> {
        // The bucket has no quota endpoint; consumption is the sum over an
        // enumeration of everything stored.
        let start = std::time::Instant::now();
        let objects = self.list("").await?;
        let used_bytes: u64 = objects.iter().map(|o| o.size_bytes).sum();

        tracing::debug!(
            bucket = %self.bucket,
            object_count = objects.len(),
            used_bytes,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Object store usage computed"
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
        // Containers are key prefixes here; nothing to create remotely.
        let id = match parent {
            Some(parent) => format!("{}/{}", parent.trim_end_matches('/'), name),
            None => name.to_string(),
        };
        Ok(ContainerRef { id, url: None })
    }

    fn tier(&self) -> StorageTier {
        StorageTier::Object
    }

    fn provider_name(&self) -> &'static str {
        "object-store"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn provider(endpoint: Option<&str>) -> ObjectStoreProvider {
        ObjectStoreProvider::new(
            "event-photos".to_string(),
            "eu-west-1".to_string(),
            endpoint.map(String::from),
            "test-key",
            "test-secret",
            8 * 1024 * 1024 * 1024,
        )
        .unwrap()
    }

    #[test]
    fn test_aws_url_format() {
        let url = provider(None).generate_url("events/e/a/photo.jpg");
        assert_eq!(
            url,
            "https://event-photos.s3.eu-west-1.amazonaws.com/events/e/a/photo.jpg"
        );
    }

    #[test]
    fn test_custom_endpoint_url_is_path_style() {
        let url = provider(Some("http://localhost:9000/")).generate_url("homepage/x.jpg");
        assert_eq!(url, "http://localhost:9000/event-photos/homepage/x.jpg");
    }

    #[tokio::test]
    async fn test_container_is_a_prefix() {
        let provider = provider(None);
        let root = provider.create_container("archives", None).await.unwrap();
        assert_eq!(root.id, "archives");
        let child = provider
            .create_container("gala-2026-08-06", Some(&root.id))
            .await
            .unwrap();
        assert_eq!(child.id, "archives/gala-2026-08-06");
    }
}
