//! Fotofest Core Library
//!
//! This crate provides core domain models, tier/compression enums, and
//! configuration that are shared across all Fotofest components.

pub mod config;
pub mod constants;
pub mod models;
pub mod storage_types;

// Re-export commonly used types
pub use config::Config;
pub use models::{
    BackupJob, BackupStatus, PhotoFailure, PhotoMetadata, TierDecision, UploadResult,
};
pub use storage_types::{CompressionClass, StorageTier};
