//! Fotofest CLI — operator tool for the tiered photo storage.
//!
//! Configure tiers via environment variables (see fotofest-core's config),
//! then inspect usage, route a single photo, or run an end-of-event archival
//! from an exported photo list.

use anyhow::Context;
use clap::{Parser, Subcommand};
use fotofest_cli::{init_tracing, FileCatalog};
use fotofest_core::{BackupStatus, Config, PhotoMetadata, StorageTier};
use fotofest_processing::{CompressionEngine, CompressionProfiles};
use fotofest_services::{ArchiveConfig, BackupService, JobStore, StorageRouter, UsageAccountant};
use fotofest_storage::{build_providers, ProviderAdapter};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

#[derive(Parser)]
#[command(name = "fotofest", about = "Fotofest tiered photo storage CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print per-tier usage snapshots
    Usage,
    /// Route a photo file into tiered storage
    Route {
        /// Path to the image file to upload
        file: std::path::PathBuf,
        /// Event the photo belongs to
        #[arg(long)]
        event_id: Option<String>,
        /// Album name
        #[arg(long, default_value = "General")]
        album: String,
        /// Uploader name
        #[arg(long, default_value = "operator")]
        uploader: String,
        /// Treat as a homepage photo
        #[arg(long)]
        homepage: bool,
        /// Treat as a premium photo
        #[arg(long)]
        premium: bool,
        /// Treat as a featured photo
        #[arg(long)]
        featured: bool,
    },
    /// Archive an event's photos into the drive tier
    Archive {
        /// Event identifier
        event_id: String,
        /// JSON file with the event's photo records
        #[arg(long)]
        photos: std::path::PathBuf,
    },
}

fn print_json(value: &impl Serialize) -> anyhow::Result<()> {
    let out = serde_json::to_string_pretty(value).context("Serialize output")?;
    println!("{}", out);
    Ok(())
}

fn content_type_for(path: &std::path::Path) -> String {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "png" => "image/png",
        "webp" => "image/webp",
        "gif" => "image/gif",
        _ => "image/jpeg",
    }
    .to_string()
}

/// Build the accountant from configured ceilings and prime it with each
/// provider's reported usage.
async fn seeded_accountant(
    config: &Config,
    providers: &BTreeMap<StorageTier, Arc<dyn ProviderAdapter>>,
) -> Arc<UsageAccountant> {
    let accountant = Arc::new(UsageAccountant::new(BTreeMap::from([
        (StorageTier::Object, config.object_capacity_bytes()),
        (StorageTier::Drive, config.drive_capacity_bytes()),
        (StorageTier::Local, config.local_capacity_bytes()),
    ])));

    for (tier, provider) in providers {
        match provider.usage_snapshot().await {
            Ok(snapshot) => accountant.seed(*tier, snapshot.used_bytes),
            Err(e) => {
                tracing::warn!(tier = %tier, error = %e, "Could not seed usage, assuming empty")
            }
        }
    }

    accountant
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    let config = Config::from_env().context("Failed to load configuration")?;
    let providers = build_providers(&config)
        .await
        .context("Failed to initialize storage providers")?;

    match cli.command {
        Commands::Usage => {
            let mut report = BTreeMap::new();
            for (tier, provider) in &providers {
                match provider.usage_snapshot().await {
                    Ok(snapshot) => {
                        report.insert(tier.to_string(), snapshot);
                    }
                    Err(e) => {
                        tracing::error!(tier = %tier, error = %e, "Usage snapshot failed");
                    }
                }
            }
            print_json(&report)?;
        }
        Commands::Route {
            file,
            event_id,
            album,
            uploader,
            homepage,
            premium,
            featured,
        } => {
            let data = tokio::fs::read(&file)
                .await
                .with_context(|| format!("Failed to read {}", file.display()))?;
            let file_name = file
                .file_name()
                .and_then(|n| n.to_str())
                .unwrap_or("photo.jpg")
                .to_string();
            let metadata = PhotoMetadata {
                event_id,
                file_type: content_type_for(&file),
                file_name,
                album_name: album,
                uploader_name: uploader,
                is_homepage: homepage,
                is_premium: premium,
                is_featured: featured,
                file_size_bytes: data.len() as u64,
            };

            let accountant = seeded_accountant(&config, &providers).await;
            let router = StorageRouter::new(
                providers,
                accountant,
                CompressionEngine::new(CompressionProfiles::from_config(&config)),
            );

            let routed = router.route(data, &metadata).await?;
            for warning in &routed.warnings {
                tracing::warn!(?warning, "Route completed with warning");
            }
            print_json(&routed.upload)?;
        }
        Commands::Archive { event_id, photos } => {
            let jobs = Arc::new(JobStore::new(
                config.backup_job_capacity(),
                Duration::from_secs(config.backup_job_retention_days() * 24 * 3600),
            ));
            let service = BackupService::new(
                providers,
                Arc::new(FileCatalog::new(photos)),
                jobs,
                ArchiveConfig::from_config(&config),
            );

            let job = service.run(&event_id).await;
            print_json(&job)?;
            if job.status == BackupStatus::Failed {
                anyhow::bail!(
                    "Backup failed: {}",
                    job.failure_reason.unwrap_or_else(|| "unknown".to_string())
                );
            }
        }
    }

    Ok(())
}
