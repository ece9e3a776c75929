use crate::{DriveProvider, LocalProvider, ObjectStoreProvider};
use crate::{ProviderAdapter, ProviderError, ProviderResult};
use fotofest_core::{Config, StorageTier};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Build the tier -> backend map from configuration.
///
/// Tiers without credentials are left out of the map (the router treats an
/// absent tier as having no headroom); the local tier is always present and
/// its construction failure is fatal.
pub async fn build_providers(
    config: &Config,
) -> ProviderResult<BTreeMap<StorageTier, Arc<dyn ProviderAdapter>>> {
    let mut providers: BTreeMap<StorageTier, Arc<dyn ProviderAdapter>> = BTreeMap::new();

    if config.has_object_credentials() {
        let result = ObjectStoreProvider::new(
            config
                .object_store_bucket()
                .map(String::from)
                .ok_or_else(|| ProviderError::Config("OBJECT_STORE_BUCKET not set".to_string()))?,
            config
                .object_store_region()
                .map(String::from)
                .ok_or_else(|| ProviderError::Config("OBJECT_STORE_REGION not set".to_string()))?,
            config.object_store_endpoint().map(String::from),
            config.object_store_access_key_id().unwrap_or_default(),
            config.object_store_secret_access_key().unwrap_or_default(),
            config.object_capacity_bytes(),
        );
        match result {
            Ok(provider) => {
                providers.insert(StorageTier::Object, Arc::new(provider));
            }
            Err(e) => {
                tracing::warn!(error = %e, "Object tier unavailable, continuing without it");
            }
        }
    } else {
        tracing::info!("Object tier not configured");
    }

    if config.has_drive_credentials() {
        let result = DriveProvider::new(
            config.drive_client_id().unwrap_or_default().to_string(),
            config.drive_client_secret().unwrap_or_default().to_string(),
            config.drive_refresh_token().unwrap_or_default().to_string(),
            config.drive_token_url().to_string(),
            config.drive_api_base().to_string(),
            config.drive_root_folder().map(String::from),
            config.drive_capacity_bytes(),
        );
        match result {
            Ok(provider) => {
                providers.insert(StorageTier::Drive, Arc::new(provider));
            }
            Err(e) => {
                tracing::warn!(error = %e, "Drive tier unavailable, continuing without it");
            }
        }
    } else {
        tracing::info!("Drive tier not configured");
    }

    let local = LocalProvider::new(
        config.local_backup_path(),
        config.local_backup_base_url().to_string(),
        config.local_capacity_bytes(),
    )
    .await?;
    providers.insert(StorageTier::Local, Arc::new(local));

    tracing::info!(
        tiers = ?providers.keys().map(|t| t.to_string()).collect::<Vec<_>>(),
        "Storage providers initialized"
    );

    Ok(providers)
}
