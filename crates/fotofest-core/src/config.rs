//! Configuration module
//!
//! Environment-driven configuration for the storage tiers, compression
//! profiles, and archival runs. Values are read once at startup via
//! [`Config::from_env`]; components receive the parsed config (or values
//! derived from it) through their constructors.

use std::env;

use crate::constants::BYTES_PER_GB;
use crate::storage_types::CompressionClass;

const OBJECT_CAPACITY_GB: u64 = 8;
const DRIVE_CAPACITY_GB: u64 = 15;
const LOCAL_CAPACITY_GB: u64 = 50;
const ARCHIVE_BATCH_SIZE: usize = 3;
const ARCHIVE_BATCH_DELAY_MS: u64 = 1000;
const BACKUP_JOB_RETENTION_DAYS: u64 = 7;
const BACKUP_JOB_CAPACITY: usize = 64;

const PREMIUM_QUALITY: u8 = 92;
const PREMIUM_MAX_DIMENSION: u32 = 4096;
const STANDARD_QUALITY: u8 = 80;
const STANDARD_MAX_DIMENSION: u32 = 2048;
const THUMBNAIL_QUALITY: u8 = 60;
const THUMBNAIL_MAX_DIMENSION: u32 = 400;

/// Application configuration.
#[derive(Clone, Debug)]
pub struct Config {
    // Object tier (S3-compatible)
    object_store_bucket: Option<String>,
    object_store_region: Option<String>,
    object_store_endpoint: Option<String>,
    object_store_access_key_id: Option<String>,
    object_store_secret_access_key: Option<String>,
    object_capacity_gb: u64,
    // Drive tier
    drive_client_id: Option<String>,
    drive_client_secret: Option<String>,
    drive_refresh_token: Option<String>,
    drive_root_folder: Option<String>,
    drive_api_base: String,
    drive_token_url: String,
    drive_capacity_gb: u64,
    // Local tier
    local_backup_path: String,
    local_backup_base_url: String,
    local_capacity_gb: u64,
    // Compression profile table
    premium_quality: u8,
    premium_max_dimension: u32,
    standard_quality: u8,
    standard_max_dimension: u32,
    thumbnail_quality: u8,
    thumbnail_max_dimension: u32,
    // Archival
    archive_batch_size: usize,
    archive_batch_delay_ms: u64,
    archive_root_folder: String,
    backup_job_retention_days: u64,
    backup_job_capacity: usize,
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}

fn env_opt(key: &str) -> Option<String> {
    env::var(key).ok().filter(|s| !s.trim().is_empty())
}

impl Config {
    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenvy::dotenv().ok();

        let config = Config {
            object_store_bucket: env_opt("OBJECT_STORE_BUCKET"),
            object_store_region: env_opt("OBJECT_STORE_REGION"),
            object_store_endpoint: env_opt("OBJECT_STORE_ENDPOINT"),
            object_store_access_key_id: env_opt("OBJECT_STORE_ACCESS_KEY_ID"),
            object_store_secret_access_key: env_opt("OBJECT_STORE_SECRET_ACCESS_KEY"),
            object_capacity_gb: env_parse("OBJECT_STORE_CAPACITY_GB", OBJECT_CAPACITY_GB),
            drive_client_id: env_opt("DRIVE_CLIENT_ID"),
            drive_client_secret: env_opt("DRIVE_CLIENT_SECRET"),
            drive_refresh_token: env_opt("DRIVE_REFRESH_TOKEN"),
            drive_root_folder: env_opt("DRIVE_ROOT_FOLDER"),
            drive_api_base: env::var("DRIVE_API_BASE")
                .unwrap_or_else(|_| "https://www.googleapis.com".to_string()),
            drive_token_url: env::var("DRIVE_TOKEN_URL")
                .unwrap_or_else(|_| "https://oauth2.googleapis.com/token".to_string()),
            drive_capacity_gb: env_parse("DRIVE_CAPACITY_GB", DRIVE_CAPACITY_GB),
            local_backup_path: env::var("LOCAL_BACKUP_PATH")
                .unwrap_or_else(|_| "./backup".to_string()),
            local_backup_base_url: env::var("LOCAL_BACKUP_BASE_URL")
                .unwrap_or_else(|_| "http://localhost:4000/backup".to_string()),
            local_capacity_gb: env_parse("LOCAL_CAPACITY_GB", LOCAL_CAPACITY_GB),
            premium_quality: env_parse("COMPRESSION_PREMIUM_QUALITY", PREMIUM_QUALITY),
            premium_max_dimension: env_parse(
                "COMPRESSION_PREMIUM_MAX_DIMENSION",
                PREMIUM_MAX_DIMENSION,
            ),
            standard_quality: env_parse("COMPRESSION_STANDARD_QUALITY", STANDARD_QUALITY),
            standard_max_dimension: env_parse(
                "COMPRESSION_STANDARD_MAX_DIMENSION",
                STANDARD_MAX_DIMENSION,
            ),
            thumbnail_quality: env_parse("COMPRESSION_THUMBNAIL_QUALITY", THUMBNAIL_QUALITY),
            thumbnail_max_dimension: env_parse(
                "COMPRESSION_THUMBNAIL_MAX_DIMENSION",
                THUMBNAIL_MAX_DIMENSION,
            ),
            archive_batch_size: env_parse("ARCHIVE_BATCH_SIZE", ARCHIVE_BATCH_SIZE),
            archive_batch_delay_ms: env_parse("ARCHIVE_BATCH_DELAY_MS", ARCHIVE_BATCH_DELAY_MS),
            archive_root_folder: env::var("ARCHIVE_ROOT_FOLDER_NAME")
                .unwrap_or_else(|_| "EventArchives".to_string()),
            backup_job_retention_days: env_parse(
                "BACKUP_JOB_RETENTION_DAYS",
                BACKUP_JOB_RETENTION_DAYS,
            ),
            backup_job_capacity: env_parse("BACKUP_JOB_CAPACITY", BACKUP_JOB_CAPACITY),
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if self.archive_batch_size == 0 {
            return Err(anyhow::anyhow!("ARCHIVE_BATCH_SIZE must be at least 1"));
        }
        if self.backup_job_capacity == 0 {
            return Err(anyhow::anyhow!("BACKUP_JOB_CAPACITY must be at least 1"));
        }
        if self.object_capacity_gb == 0 || self.drive_capacity_gb == 0 || self.local_capacity_gb == 0
        {
            return Err(anyhow::anyhow!("Tier capacity ceilings must be non-zero"));
        }

        // Object-store credentials are all-or-none: a partial set would pass
        // construction and fail on the first write.
        let object_fields = [
            &self.object_store_bucket,
            &self.object_store_region,
            &self.object_store_access_key_id,
            &self.object_store_secret_access_key,
        ];
        let present = object_fields.iter().filter(|f| f.is_some()).count();
        if present != 0 && present != object_fields.len() {
            return Err(anyhow::anyhow!(
                "OBJECT_STORE_BUCKET, OBJECT_STORE_REGION, OBJECT_STORE_ACCESS_KEY_ID and \
                 OBJECT_STORE_SECRET_ACCESS_KEY must be set together"
            ));
        }

        let drive_fields = [
            &self.drive_client_id,
            &self.drive_client_secret,
            &self.drive_refresh_token,
        ];
        let present = drive_fields.iter().filter(|f| f.is_some()).count();
        if present != 0 && present != drive_fields.len() {
            return Err(anyhow::anyhow!(
                "DRIVE_CLIENT_ID, DRIVE_CLIENT_SECRET and DRIVE_REFRESH_TOKEN must be set together"
            ));
        }

        for (name, quality) in [
            ("COMPRESSION_PREMIUM_QUALITY", self.premium_quality),
            ("COMPRESSION_STANDARD_QUALITY", self.standard_quality),
            ("COMPRESSION_THUMBNAIL_QUALITY", self.thumbnail_quality),
        ] {
            if quality == 0 || quality > 100 {
                return Err(anyhow::anyhow!("{} must be between 1 and 100", name));
            }
        }

        Ok(())
    }

    pub fn has_object_credentials(&self) -> bool {
        self.object_store_bucket.is_some()
            && self.object_store_region.is_some()
            && self.object_store_access_key_id.is_some()
            && self.object_store_secret_access_key.is_some()
    }

    pub fn has_drive_credentials(&self) -> bool {
        self.drive_client_id.is_some()
            && self.drive_client_secret.is_some()
            && self.drive_refresh_token.is_some()
    }

    pub fn object_store_bucket(&self) -> Option<&str> {
        self.object_store_bucket.as_deref()
    }

    pub fn object_store_region(&self) -> Option<&str> {
        self.object_store_region.as_deref()
    }

    pub fn object_store_endpoint(&self) -> Option<&str> {
        self.object_store_endpoint.as_deref()
    }

    pub fn object_store_access_key_id(&self) -> Option<&str> {
        self.object_store_access_key_id.as_deref()
    }

    pub fn object_store_secret_access_key(&self) -> Option<&str> {
        self.object_store_secret_access_key.as_deref()
    }

    pub fn object_capacity_bytes(&self) -> u64 {
        self.object_capacity_gb * BYTES_PER_GB
    }

    pub fn drive_client_id(&self) -> Option<&str> {
        self.drive_client_id.as_deref()
    }

    pub fn drive_client_secret(&self) -> Option<&str> {
        self.drive_client_secret.as_deref()
    }

    pub fn drive_refresh_token(&self) -> Option<&str> {
        self.drive_refresh_token.as_deref()
    }

    pub fn drive_root_folder(&self) -> Option<&str> {
        self.drive_root_folder.as_deref()
    }

    pub fn drive_api_base(&self) -> &str {
        &self.drive_api_base
    }

    pub fn drive_token_url(&self) -> &str {
        &self.drive_token_url
    }

    pub fn drive_capacity_bytes(&self) -> u64 {
        self.drive_capacity_gb * BYTES_PER_GB
    }

    pub fn local_backup_path(&self) -> &str {
        &self.local_backup_path
    }

    pub fn local_backup_base_url(&self) -> &str {
        &self.local_backup_base_url
    }

    pub fn local_capacity_bytes(&self) -> u64 {
        self.local_capacity_gb * BYTES_PER_GB
    }

    pub fn compression_quality(&self, class: CompressionClass) -> u8 {
        match class {
            CompressionClass::Premium => self.premium_quality,
            CompressionClass::Standard => self.standard_quality,
            CompressionClass::Thumbnail => self.thumbnail_quality,
        }
    }

    pub fn compression_max_dimension(&self, class: CompressionClass) -> u32 {
        match class {
            CompressionClass::Premium => self.premium_max_dimension,
            CompressionClass::Standard => self.standard_max_dimension,
            CompressionClass::Thumbnail => self.thumbnail_max_dimension,
        }
    }

    pub fn archive_batch_size(&self) -> usize {
        self.archive_batch_size
    }

    pub fn archive_batch_delay_ms(&self) -> u64 {
        self.archive_batch_delay_ms
    }

    pub fn archive_root_folder(&self) -> &str {
        &self.archive_root_folder
    }

    pub fn backup_job_retention_days(&self) -> u64 {
        self.backup_job_retention_days
    }

    pub fn backup_job_capacity(&self) -> usize {
        self.backup_job_capacity
    }
}
