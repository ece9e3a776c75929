//! Provider abstraction trait
//!
//! This module defines the capability surface every storage tier backend
//! must implement. The router and the archiver hold a map of
//! `StorageTier -> Arc<dyn ProviderAdapter>` and never branch on a concrete
//! backend type.

use async_trait::async_trait;
use fotofest_core::StorageTier;
use thiserror::Error;

/// Provider operation errors
#[derive(Debug, Error)]
pub enum ProviderError {
    /// Missing or invalid credentials. Raised at construction or on a failed
    /// auth refresh; the router treats it as "no headroom" and cascades.
    #[error("Provider unavailable: {0}")]
    Unavailable(String),

    #[error("Write failed: {0}")]
    WriteFailed(String),

    #[error("Read failed: {0}")]
    ReadFailed(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid key: {0}")]
    InvalidKey(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for provider operations
pub type ProviderResult<T> = Result<T, ProviderError>;

/// Traceability metadata attached to a stored object.
///
/// The drive backend persists uploader/album as file properties; the object
/// and local backends only use the content type.
#[derive(Debug, Clone, Default)]
pub struct ObjectMeta {
    pub content_type: String,
    pub uploader_name: Option<String>,
    pub album_name: Option<String>,
}

/// Outcome of a successful `put`.
#[derive(Debug, Clone)]
pub struct PutOutcome {
    /// Publicly reachable URL for the stored object.
    pub url: String,
    /// Provider-native reference: the logical path for object/local backends,
    /// an opaque file id for the drive backend.
    pub provider_path: String,
    pub etag: Option<String>,
}

/// One stored object, as reported by `list`.
#[derive(Debug, Clone)]
pub struct StoredObject {
    pub path: String,
    pub size_bytes: u64,
}

/// Bytes consumed vs. the ceiling for one tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct UsageSnapshot {
    pub used_bytes: u64,
    pub capacity_bytes: u64,
}

impl UsageSnapshot {
    /// Whether `additional` more bytes would still fit under the ceiling.
    pub fn has_headroom(&self, additional: u64) -> bool {
        self.used_bytes.saturating_add(additional) <= self.capacity_bytes
    }
}

/// Reference to a container created in a tier: a folder for the drive
/// backend, a key prefix/directory for the others.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct ContainerRef {
    pub id: String,
    pub url: Option<String>,
}

/// Capability surface of a storage tier backend.
///
/// Implementations know nothing about tiering policy; routing and fallback
/// live entirely in the services layer.
#[async_trait]
pub trait ProviderAdapter: Send + Sync {
    /// Store bytes under a logical path and return the external URL plus the
    /// provider-native reference needed to read the object back.
    async fn put(
        &self,
        data: Vec<u8>,
        logical_path: &str,
        meta: &ObjectMeta,
    ) -> ProviderResult<PutOutcome>;

    /// Store bytes under a name inside a previously created container.
    async fn put_in_container(
        &self,
        data: Vec<u8>,
        name: &str,
        container: &ContainerRef,
        meta: &ObjectMeta,
    ) -> ProviderResult<PutOutcome>;

    /// Fetch an object's bytes by its provider-native reference.
    async fn get(&self, provider_path: &str) -> ProviderResult<Vec<u8>>;

    /// Delete an object. Returns `false` when it did not exist.
    async fn delete(&self, provider_path: &str) -> ProviderResult<bool>;

    /// Enumerate stored objects under a prefix (a folder id for the drive
    /// backend).
    async fn list(&self, prefix: &str) -> ProviderResult<Vec<StoredObject>>;

    /// Report consumed bytes against the tier ceiling. The object backend
    /// enumerates and sums, the drive backend queries the account quota
    /// endpoint, the local backend walks the backup directory tree.
    async fn usage_snapshot(&self) -> ProviderResult<UsageSnapshot>;

    /// Create a container (idempotent: an existing container of the same
    /// name is success). `parent` is a previously created container id.
    async fn create_container(
        &self,
        name: &str,
        parent: Option<&str>,
    ) -> ProviderResult<ContainerRef>;

    /// The tier this backend serves.
    fn tier(&self) -> StorageTier;

    /// Short backend identifier recorded in upload results.
    fn provider_name(&self) -> &'static str;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_headroom_at_boundary() {
        let snapshot = UsageSnapshot {
            used_bytes: 90,
            capacity_bytes: 100,
        };
        assert!(snapshot.has_headroom(10));
        assert!(!snapshot.has_headroom(11));
    }

    #[test]
    fn test_headroom_does_not_overflow() {
        let snapshot = UsageSnapshot {
            used_bytes: u64::MAX - 1,
            capacity_bytes: u64::MAX,
        };
        assert!(!snapshot.has_headroom(u64::MAX));
    }
}
