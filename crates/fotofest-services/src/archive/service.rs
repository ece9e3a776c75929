//! End-of-event batch archival.
//!
//! Copies every photo of an event into a dated container on the drive tier:
//! fetch the highest-fidelity copy still reachable, re-upload it tagged with
//! uploader/album metadata, in batches of bounded concurrency with a pause
//! between batches to stay under provider rate limits. Per-photo failures
//! are recorded and never abort sibling uploads; only job-level failures
//! mark the whole run as failed.

use chrono::Utc;
use fotofest_core::{BackupJob, BackupStatus, Config, PhotoFailure, StorageTier};
use fotofest_storage::{keys, ContainerRef, ObjectMeta, ProviderAdapter};
use futures::future::join_all;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use uuid::Uuid;

use crate::archive::JobStore;
use crate::catalog::{PhotoCatalog, PhotoRecord};

/// Job-level archival failures. Per-photo errors are not here: they are
/// recorded on the job and do not terminate the run.
#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("No photos found for event {0}")]
    NoPhotos(String),

    #[error("Photo list fetch failed: {0}")]
    PhotoList(String),

    #[error("Archive container creation failed: {0}")]
    ContainerCreation(String),

    #[error("Archival tier is not configured")]
    TierUnavailable,
}

/// Archival run settings.
#[derive(Debug, Clone)]
pub struct ArchiveConfig {
    /// Maximum concurrently in-flight uploads per batch.
    pub batch_size: usize,
    /// Pause between batches.
    pub batch_delay: Duration,
    /// Name of the root container all event archives live under.
    pub root_container: String,
}

impl Default for ArchiveConfig {
    fn default() -> Self {
        ArchiveConfig {
            batch_size: 3,
            batch_delay: Duration::from_millis(1000),
            root_container: "EventArchives".to_string(),
        }
    }
}

impl ArchiveConfig {
    pub fn from_config(config: &Config) -> Self {
        ArchiveConfig {
            batch_size: config.archive_batch_size(),
            batch_delay: Duration::from_millis(config.archive_batch_delay_ms()),
            root_container: config.archive_root_folder().to_string(),
        }
    }
}

/// Runs event backups and tracks their jobs.
pub struct BackupService {
    providers: BTreeMap<StorageTier, Arc<dyn ProviderAdapter>>,
    catalog: Arc<dyn PhotoCatalog>,
    jobs: Arc<JobStore>,
    http: reqwest::Client,
    config: ArchiveConfig,
}

impl BackupService {
    pub fn new(
        providers: BTreeMap<StorageTier, Arc<dyn ProviderAdapter>>,
        catalog: Arc<dyn PhotoCatalog>,
        jobs: Arc<JobStore>,
        config: ArchiveConfig,
    ) -> Self {
        BackupService {
            providers,
            catalog,
            jobs,
            http: reqwest::Client::new(),
            config,
        }
    }

    /// Status of a previously started job.
    pub fn job(&self, backup_id: Uuid) -> Option<BackupJob> {
        self.jobs.get(backup_id)
    }

    /// Start a backup in the background; the job is queryable immediately.
    pub fn start(self: &Arc<Self>, event_id: &str) -> Uuid {
        let backup_id = self.register(event_id);
        let service = Arc::clone(self);
        let event_id = event_id.to_string();
        tokio::spawn(async move {
            service.execute(backup_id, &event_id).await;
        });
        backup_id
    }

    /// Run a backup to completion and return the final job.
    pub async fn run(&self, event_id: &str) -> BackupJob {
        let backup_id = self.register(event_id);
        self.execute(backup_id, event_id).await;
        self.jobs.get(backup_id).unwrap_or_else(|| {
            let mut job = BackupJob::new(backup_id, event_id);
            job.fail("backup job evicted while running");
            job
        })
    }

    fn register(&self, event_id: &str) -> Uuid {
        let job = BackupJob::new(Uuid::new_v4(), event_id);
        let backup_id = job.backup_id;
        self.jobs.insert(job);
        tracing::info!(backup_id = %backup_id, event_id = %event_id, "Backup job created");
        backup_id
    }

    async fn execute(&self, backup_id: Uuid, event_id: &str) {
        match self.do_backup(backup_id, event_id).await {
            Ok(()) => {
                self.jobs.update(backup_id, |job| job.complete());
                if let Some(job) = self.jobs.get(backup_id) {
                    let duration_secs = job
                        .finished_at
                        .map(|end| (end - job.started_at).num_seconds())
                        .unwrap_or_default();
                    tracing::info!(
                        backup_id = %backup_id,
                        event_id = %event_id,
                        total = job.total_photos,
                        succeeded = job.successful_uploads,
                        failed = job.failed_uploads,
                        duration_secs,
                        "Backup job completed"
                    );
                }
            }
            Err(e) => {
                tracing::error!(
                    backup_id = %backup_id,
                    event_id = %event_id,
                    error = %e,
                    "Backup job failed"
                );
                self.jobs.update(backup_id, |job| job.fail(e.to_string()));
            }
        }
    }

    async fn do_backup(&self, backup_id: Uuid, event_id: &str) -> Result<(), ArchiveError> {
        let photos = self
            .catalog
            .list_event_photos(event_id)
            .await
            .map_err(|e| ArchiveError::PhotoList(e.to_string()))?;

        if photos.is_empty() {
            return Err(ArchiveError::NoPhotos(event_id.to_string()));
        }

        let total = photos.len();
        self.jobs.update(backup_id, |job| job.total_photos = total);

        let provider = self
            .providers
            .get(&StorageTier::Drive)
            .cloned()
            .ok_or(ArchiveError::TierUnavailable)?;

        let root = provider
            .create_container(&self.config.root_container, None)
            .await
            .map_err(|e| ArchiveError::ContainerCreation(e.to_string()))?;

        let destination_name = format!(
            "{}-{}",
            keys::sanitize_segment(event_id),
            Utc::now().format("%Y-%m-%d")
        );
        let destination = provider
            .create_container(&destination_name, Some(&root.id))
            .await
            .map_err(|e| ArchiveError::ContainerCreation(e.to_string()))?;

        self.jobs.update(backup_id, |job| {
            job.status = BackupStatus::BackingUp;
            job.destination_container_id = Some(destination.id.clone());
            job.destination_url = destination.url.clone();
        });
        tracing::info!(
            backup_id = %backup_id,
            destination = %destination.id,
            total,
            batch_size = self.config.batch_size,
            "Backing up event photos"
        );

        let batches: Vec<&[PhotoRecord]> = photos.chunks(self.config.batch_size).collect();
        let batch_count = batches.len();

        for (index, batch) in batches.into_iter().enumerate() {
            let results = join_all(
                batch
                    .iter()
                    .map(|photo| self.archive_photo(&provider, &destination, photo)),
            )
            .await;

            let mut successes = 0;
            let mut failures = Vec::new();
            for result in results {
                match result {
                    Ok(()) => successes += 1,
                    Err(failure) => failures.push(failure),
                }
            }

            self.jobs
                .update(backup_id, |job| job.record_batch(successes, failures));

            if let Some(job) = self.jobs.get(backup_id) {
                tracing::info!(
                    backup_id = %backup_id,
                    processed = job.processed_photos,
                    total = job.total_photos,
                    failed = job.failed_uploads,
                    "Backup batch finished"
                );
            }

            if index + 1 < batch_count && !self.config.batch_delay.is_zero() {
                tokio::time::sleep(self.config.batch_delay).await;
            }
        }

        Ok(())
    }

    /// Copy one photo into the destination container.
    async fn archive_photo(
        &self,
        provider: &Arc<dyn ProviderAdapter>,
        destination: &ContainerRef,
        photo: &PhotoRecord,
    ) -> Result<(), PhotoFailure> {
        let bytes = self.fetch_source(photo).await.map_err(|error| {
            tracing::warn!(photo_id = %photo.id, error = %error, "Photo source unavailable");
            PhotoFailure {
                photo_id: photo.id.clone(),
                error,
            }
        })?;

        let content_type = photo
            .file_type
            .clone()
            .unwrap_or_else(|| "image/jpeg".to_string());
        let name = format!(
            "{}.{}",
            keys::sanitize_segment(&photo.id),
            keys::extension_for_content_type(&content_type)
        );
        let meta = ObjectMeta {
            content_type,
            uploader_name: photo.uploader_name.clone(),
            album_name: photo.album_name.clone(),
        };

        provider
            .put_in_container(bytes, &name, destination, &meta)
            .await
            .map_err(|e| {
                tracing::warn!(photo_id = %photo.id, error = %e, "Archive upload failed");
                PhotoFailure {
                    photo_id: photo.id.clone(),
                    error: e.to_string(),
                }
            })?;

        Ok(())
    }

    /// Fetch a photo's bytes, preferring the object tier's copy for
    /// fidelity, then the other tiers, and only as a last resort the public
    /// URL (which serves the compressed rendition).
    async fn fetch_source(&self, photo: &PhotoRecord) -> Result<Vec<u8>, String> {
        if let Some(path) = &photo.provider_path {
            for tier in StorageTier::cascade_order() {
                let Some(provider) = self.providers.get(&tier) else {
                    continue;
                };
                match provider.get(path).await {
                    Ok(bytes) => {
                        tracing::debug!(photo_id = %photo.id, tier = %tier, "Photo source found");
                        return Ok(bytes);
                    }
                    Err(e) => {
                        tracing::debug!(
                            photo_id = %photo.id,
                            tier = %tier,
                            error = %e,
                            "Photo not readable on tier"
                        );
                    }
                }
            }
        }

        if let Some(url) = &photo.url {
            tracing::warn!(
                photo_id = %photo.id,
                "No tier copy reachable; archiving from the public URL (lossy rendition)"
            );
            let response = self
                .http
                .get(url)
                .send()
                .await
                .map_err(|e| format!("URL fetch failed: {}", e))?;
            if !response.status().is_success() {
                return Err(format!("URL fetch failed with status {}", response.status()));
            }
            let bytes = response
                .bytes()
                .await
                .map_err(|e| format!("URL fetch failed: {}", e))?;
            return Ok(bytes.to_vec());
        }

        Err("no retrievable copy on any tier and no public URL".to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{FailingCatalog, MemoryProvider, StaticCatalog};

    fn photo(id: &str) -> PhotoRecord {
        PhotoRecord {
            id: id.to_string(),
            tier: Some(StorageTier::Object),
            provider_path: Some(format!("events/gala/Party/{}.jpg", id)),
            url: None,
            uploader_name: Some("guest".to_string()),
            album_name: Some("Party".to_string()),
            file_type: Some("image/jpeg".to_string()),
        }
    }

    struct Fixture {
        object: Arc<MemoryProvider>,
        drive: Arc<MemoryProvider>,
        local: Arc<MemoryProvider>,
        service: Arc<BackupService>,
    }

    fn fixture(photos: Vec<PhotoRecord>) -> Fixture {
        let object = Arc::new(MemoryProvider::new(StorageTier::Object));
        let drive = Arc::new(MemoryProvider::new(StorageTier::Drive));
        let local = Arc::new(MemoryProvider::new(StorageTier::Local));

        for photo in &photos {
            if let Some(path) = &photo.provider_path {
                object.seed_file(path, format!("original {}", photo.id).into_bytes());
            }
        }

        let providers: BTreeMap<StorageTier, Arc<dyn ProviderAdapter>> = BTreeMap::from([
            (
                StorageTier::Object,
                object.clone() as Arc<dyn ProviderAdapter>,
            ),
            (StorageTier::Drive, drive.clone() as Arc<dyn ProviderAdapter>),
            (StorageTier::Local, local.clone() as Arc<dyn ProviderAdapter>),
        ]);

        let service = Arc::new(BackupService::new(
            providers,
            Arc::new(StaticCatalog::new(photos)),
            Arc::new(JobStore::new(16, Duration::from_secs(3600))),
            ArchiveConfig {
                batch_size: 3,
                batch_delay: Duration::ZERO,
                root_container: "EventArchives".to_string(),
            },
        ));

        Fixture {
            object,
            drive,
            local,
            service,
        }
    }

    #[tokio::test]
    async fn test_seven_photos_batched_with_one_failure() {
        let photos: Vec<PhotoRecord> = (1..=7).map(|i| photo(&format!("p{}", i))).collect();
        let fixture = fixture(photos);
        // Photo #5 cannot be written to the archive.
        fixture.drive.fail_put_named("p5.jpg");

        let job = fixture.service.run("gala").await;

        assert_eq!(job.status, BackupStatus::Completed);
        assert_eq!(job.total_photos, 7);
        assert_eq!(job.processed_photos, 7);
        assert_eq!(job.successful_uploads, 6);
        assert_eq!(job.failed_uploads, 1);
        assert_eq!(job.errors.len(), 1);
        assert_eq!(job.errors[0].photo_id, "p5");
        assert!(job.finished_at.is_some());

        // Six photos landed in the dated destination container.
        let dest = job.destination_container_id.unwrap();
        assert!(dest.starts_with("EventArchives/gala-"));
        let archived = fixture.drive.stored_paths();
        assert_eq!(archived.len(), 6);
        assert!(archived.iter().all(|p| p.starts_with(&dest)));
    }

    #[tokio::test]
    async fn test_archived_bytes_are_the_tier_originals() {
        let fixture = fixture(vec![photo("p1")]);

        let job = fixture.service.run("gala").await;
        assert_eq!(job.status, BackupStatus::Completed);

        let dest = job.destination_container_id.unwrap();
        let archived = fixture.drive.get_file(&format!("{}/p1.jpg", dest)).unwrap();
        assert_eq!(archived, b"original p1".to_vec());
    }

    #[tokio::test]
    async fn test_source_falls_back_through_tiers() {
        let mut record = photo("p1");
        record.provider_path = Some("events/gala/Party/p1.jpg".to_string());
        let fixture = fixture(vec![record]);
        // Only the local tier still has the bytes.
        let path = "events/gala/Party/p1.jpg";
        assert!(fixture.object.delete_sync(path));
        fixture.local.seed_file(path, b"local copy".to_vec());

        let job = fixture.service.run("gala").await;

        assert_eq!(job.status, BackupStatus::Completed);
        assert_eq!(job.successful_uploads, 1);
        let dest = job.destination_container_id.unwrap();
        let archived = fixture.drive.get_file(&format!("{}/p1.jpg", dest)).unwrap();
        assert_eq!(archived, b"local copy".to_vec());
    }

    #[tokio::test]
    async fn test_zero_photos_fails_fast() {
        let fixture = fixture(vec![]);
        let job = fixture.service.run("empty-event").await;

        assert_eq!(job.status, BackupStatus::Failed);
        assert!(job
            .failure_reason
            .as_deref()
            .unwrap()
            .contains("No photos found"));
        assert_eq!(job.processed_photos, 0);
    }

    #[tokio::test]
    async fn test_container_creation_failure_fails_job() {
        let fixture = fixture(vec![photo("p1")]);
        fixture.drive.fail_containers(true);

        let job = fixture.service.run("gala").await;

        assert_eq!(job.status, BackupStatus::Failed);
        assert!(job
            .failure_reason
            .as_deref()
            .unwrap()
            .contains("container creation failed"));
    }

    #[tokio::test]
    async fn test_catalog_failure_fails_job() {
        let object = Arc::new(MemoryProvider::new(StorageTier::Object));
        let drive = Arc::new(MemoryProvider::new(StorageTier::Drive));
        let providers: BTreeMap<StorageTier, Arc<dyn ProviderAdapter>> = BTreeMap::from([
            (StorageTier::Object, object as Arc<dyn ProviderAdapter>),
            (StorageTier::Drive, drive as Arc<dyn ProviderAdapter>),
        ]);
        let service = BackupService::new(
            providers,
            Arc::new(FailingCatalog),
            Arc::new(JobStore::new(16, Duration::from_secs(3600))),
            ArchiveConfig {
                batch_delay: Duration::ZERO,
                ..ArchiveConfig::default()
            },
        );

        let job = service.run("gala").await;

        assert_eq!(job.status, BackupStatus::Failed);
        assert!(job
            .failure_reason
            .as_deref()
            .unwrap()
            .contains("Photo list fetch failed"));
    }

    #[tokio::test]
    async fn test_unreachable_photo_is_recorded_not_fatal() {
        let mut unreachable = photo("ghost");
        unreachable.provider_path = Some("events/gala/Party/missing.jpg".to_string());
        let photos = vec![photo("p1"), unreachable];
        let fixture = fixture(photos);
        // Remove the seeded bytes for the ghost photo.
        assert!(fixture.object.delete_sync("events/gala/Party/missing.jpg"));

        let job = fixture.service.run("gala").await;

        assert_eq!(job.status, BackupStatus::Completed);
        assert_eq!(job.successful_uploads, 1);
        assert_eq!(job.failed_uploads, 1);
        assert_eq!(job.errors[0].photo_id, "ghost");
    }

    #[tokio::test]
    async fn test_start_returns_queryable_job() {
        let fixture = fixture(vec![photo("p1")]);
        let backup_id = fixture.service.start("gala");

        // The job exists immediately, whatever state it is in.
        assert!(fixture.service.job(backup_id).is_some());

        // Wait for the background run to finish.
        for _ in 0..100 {
            if let Some(job) = fixture.service.job(backup_id) {
                if job.status.is_terminal() {
                    assert_eq!(job.status, BackupStatus::Completed);
                    return;
                }
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("backup did not finish");
    }
}
