pub mod backup;
pub mod photo;

pub use backup::{BackupJob, BackupStatus, PhotoFailure};
pub use photo::{PhotoMetadata, TierDecision, UploadResult};
