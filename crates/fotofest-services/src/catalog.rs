//! Photo-listing collaborator.
//!
//! The event/photo data model lives outside this subsystem; the archiver
//! only needs an ordered list of a completed event's photo records. The CLI
//! ships a JSON-file-backed implementation, the application wires its data
//! access layer in.

use async_trait::async_trait;
use fotofest_core::StorageTier;

/// One photo as known to the external data layer.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct PhotoRecord {
    pub id: String,
    /// Tier the photo currently lives on, when recorded.
    pub tier: Option<StorageTier>,
    /// Provider-native reference on that tier (key/path or file id).
    pub provider_path: Option<String>,
    /// Public URL, used as the last-resort archival source.
    pub url: Option<String>,
    pub uploader_name: Option<String>,
    pub album_name: Option<String>,
    pub file_type: Option<String>,
}

#[async_trait]
pub trait PhotoCatalog: Send + Sync {
    /// All photos of an event, in upload order.
    async fn list_event_photos(&self, event_id: &str) -> anyhow::Result<Vec<PhotoRecord>>;
}
