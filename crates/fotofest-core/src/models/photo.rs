//! Photo routing models: upload input metadata, the routing decision, and
//! the normalized result handed back to the persistence layer.

use crate::storage_types::{CompressionClass, StorageTier};

/// Caller-supplied metadata accompanying an upload.
///
/// Immutable input to routing; never persisted as-is. `file_size_bytes` is
/// assumed validated upstream (the upload handlers reject empty files).
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct PhotoMetadata {
    pub event_id: Option<String>,
    pub file_name: String,
    pub album_name: String,
    pub uploader_name: String,
    pub is_homepage: bool,
    pub is_premium: bool,
    pub is_featured: bool,
    pub file_size_bytes: u64,
    pub file_type: String,
}

/// Routing decision: which tier to try first and how to compress for it.
/// Computed fresh per upload, never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TierDecision {
    pub tier: StorageTier,
    pub compression: CompressionClass,
}

/// Normalized result of a routed upload.
///
/// `tier` reflects the tier that actually accepted the bytes, which may
/// differ from the tier originally selected when a write cascaded. The
/// caller persists this into the photo record.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct UploadResult {
    pub url: String,
    /// Provider-native reference: a key/path for object and local tiers, an
    /// opaque file id for the drive tier.
    pub provider_path: String,
    pub size_bytes: u64,
    pub tier: StorageTier,
    pub provider: String,
    pub thumbnail_url: Option<String>,
    pub compression: CompressionClass,
    pub etag: Option<String>,
}
