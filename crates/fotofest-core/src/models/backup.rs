//! Backup job model for end-of-event archival runs.

use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Lifecycle of a backup job. Terminal states are final; a job is never
/// resumed, only re-created.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackupStatus {
    Initializing,
    BackingUp,
    Completed,
    Failed,
}

impl BackupStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, BackupStatus::Completed | BackupStatus::Failed)
    }
}

/// A photo that could not be copied during a backup run.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct PhotoFailure {
    pub photo_id: String,
    pub error: String,
}

/// Progress record for one archival run of one event.
///
/// Counters satisfy `processed_photos == successful_uploads + failed_uploads`
/// after every batch and `successful_uploads + failed_uploads <=
/// total_photos` at all times; the mutation helpers below are the only way
/// the service updates them.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct BackupJob {
    pub backup_id: Uuid,
    pub event_id: String,
    pub status: BackupStatus,
    pub total_photos: usize,
    pub processed_photos: usize,
    pub successful_uploads: usize,
    pub failed_uploads: usize,
    pub errors: Vec<PhotoFailure>,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub destination_container_id: Option<String>,
    pub destination_url: Option<String>,
    /// Job-level failure reason; per-photo failures stay in `errors`.
    pub failure_reason: Option<String>,
}

impl BackupJob {
    pub fn new(backup_id: Uuid, event_id: impl Into<String>) -> Self {
        Self {
            backup_id,
            event_id: event_id.into(),
            status: BackupStatus::Initializing,
            total_photos: 0,
            processed_photos: 0,
            successful_uploads: 0,
            failed_uploads: 0,
            errors: Vec::new(),
            started_at: Utc::now(),
            finished_at: None,
            destination_container_id: None,
            destination_url: None,
            failure_reason: None,
        }
    }

    /// Record the outcome of one completed batch.
    pub fn record_batch(&mut self, successes: usize, failures: Vec<PhotoFailure>) {
        self.successful_uploads += successes;
        self.failed_uploads += failures.len();
        self.processed_photos = self.successful_uploads + self.failed_uploads;
        self.errors.extend(failures);
    }

    pub fn complete(&mut self) {
        self.status = BackupStatus::Completed;
        self.finished_at = Some(Utc::now());
    }

    pub fn fail(&mut self, reason: impl Into<String>) {
        self.status = BackupStatus::Failed;
        self.failure_reason = Some(reason.into());
        self.finished_at = Some(Utc::now());
    }
}
