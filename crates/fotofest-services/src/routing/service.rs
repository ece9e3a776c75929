//! Storage router: the single entry point external upload handlers use.
//!
//! Select a tier, compress for it, write through the tier's provider, and
//! cascade down the fixed tier order when a write fails. Every fallback
//! transition and degraded step is reported in the returned warnings so
//! callers (and tests) never have to scrape logs.

use crate::routing::{select_tier, UsageAccountant};
use fotofest_core::{CompressionClass, PhotoMetadata, StorageTier, UploadResult};
use fotofest_processing::CompressionEngine;
use fotofest_storage::{keys, ObjectMeta, ProviderAdapter};
use std::collections::BTreeMap;
use std::sync::Arc;
use thiserror::Error;

/// Routing errors
#[derive(Debug, Error)]
pub enum RouteError {
    /// Every tier rejected the write. The upload is lost and must be
    /// retried by the caller.
    #[error("All storage tiers failed")]
    AllTiersFailed { attempts: Vec<(StorageTier, String)> },
}

/// Degraded-but-successful conditions of a route call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteWarning {
    /// A write failed on this tier and routing moved on to the next one.
    Fallback { tier: StorageTier, error: String },
    /// The buffer could not be re-encoded and was stored as-is.
    CompressionPassthrough { class: CompressionClass },
    /// No thumbnail was attempted.
    ThumbnailSkipped { reason: String },
    /// The thumbnail attempt ran and failed.
    ThumbnailFailed { error: String },
}

/// A successful route call: the normalized result plus any warnings.
#[derive(Debug, Clone)]
pub struct RoutedUpload {
    pub upload: UploadResult,
    pub warnings: Vec<RouteWarning>,
}

/// Orchestrates tier selection, compression, writes, and fallback.
pub struct StorageRouter {
    providers: BTreeMap<StorageTier, Arc<dyn ProviderAdapter>>,
    accountant: Arc<UsageAccountant>,
    engine: CompressionEngine,
}

impl StorageRouter {
    pub fn new(
        providers: BTreeMap<StorageTier, Arc<dyn ProviderAdapter>>,
        accountant: Arc<UsageAccountant>,
        engine: CompressionEngine,
    ) -> Self {
        StorageRouter {
            providers,
            accountant,
            engine,
        }
    }

    pub fn accountant(&self) -> &Arc<UsageAccountant> {
        &self.accountant
    }

    /// Route one photo to storage.
    ///
    /// The returned result's `tier` is the tier that actually accepted the
    /// bytes. Thumbnail generation is attempted after the main write and is
    /// never fatal; its absence is visible as a warning plus a `None`
    /// thumbnail URL.
    pub async fn route(
        &self,
        data: Vec<u8>,
        metadata: &PhotoMetadata,
    ) -> Result<RoutedUpload, RouteError> {
        let configured = self.providers.keys().copied().collect();
        let decision = select_tier(metadata, &self.accountant.snapshot(), &configured);

        tracing::debug!(
            tier = %decision.tier,
            class = %decision.compression,
            album = %metadata.album_name,
            size_bytes = metadata.file_size_bytes,
            "Tier selected"
        );

        let order = StorageTier::cascade_order();
        let start_at = order
            .iter()
            .position(|&tier| tier == decision.tier)
            .unwrap_or(0);

        let mut attempts: Vec<(StorageTier, String)> = Vec::new();
        let mut warnings: Vec<RouteWarning> = Vec::new();

        for &tier in &order[start_at..] {
            let Some(provider) = self.providers.get(&tier) else {
                attempts.push((tier, "tier not configured".to_string()));
                continue;
            };

            // Fallback attempts always use the standard class.
            let class = if tier == decision.tier {
                decision.compression
            } else {
                CompressionClass::Standard
            };

            let outcome = self.engine.compress(&data, class);
            if outcome.passthrough {
                let warning = RouteWarning::CompressionPassthrough { class };
                if !warnings.contains(&warning) {
                    warnings.push(warning);
                }
            }
            let size = outcome.data.len() as u64;

            if !self.accountant.try_reserve(tier, size) {
                tracing::warn!(
                    tier = %tier,
                    size_bytes = size,
                    "No headroom on tier, trying next"
                );
                attempts.push((tier, "no headroom".to_string()));
                continue;
            }

            let (extension, content_type) = if outcome.passthrough {
                (keys::extension_for(metadata), metadata.file_type.clone())
            } else {
                (
                    "jpg".to_string(),
                    CompressionEngine::output_content_type().to_string(),
                )
            };
            let key = keys::photo_key(metadata, &extension);
            let object_meta = ObjectMeta {
                content_type,
                uploader_name: Some(metadata.uploader_name.clone()),
                album_name: Some(metadata.album_name.clone()),
            };

            match provider.put(outcome.data, &key, &object_meta).await {
                Ok(put) => {
                    self.accountant.commit(tier, size);

                    let thumbnail_url = self.attach_thumbnail(&data, &key, &mut warnings).await;

                    if tier != decision.tier {
                        tracing::info!(
                            selected = %decision.tier,
                            landed = %tier,
                            "Upload landed on fallback tier"
                        );
                    }

                    return Ok(RoutedUpload {
                        upload: UploadResult {
                            url: put.url,
                            provider_path: put.provider_path,
                            size_bytes: size,
                            tier,
                            provider: provider.provider_name().to_string(),
                            thumbnail_url,
                            compression: class,
                            etag: put.etag,
                        },
                        warnings,
                    });
                }
                Err(e) => {
                    self.accountant.release(tier, size);
                    let next = order[start_at..]
                        .iter()
                        .skip_while(|&&t| t != tier)
                        .nth(1);
                    tracing::warn!(
                        tier = %tier,
                        next_tier = ?next.map(|t| t.to_string()),
                        error = %e,
                        "Tier write failed, cascading"
                    );
                    warnings.push(RouteWarning::Fallback {
                        tier,
                        error: e.to_string(),
                    });
                    attempts.push((tier, e.to_string()));
                }
            }
        }

        tracing::error!(
            attempts = ?attempts
                .iter()
                .map(|(tier, error)| format!("{}: {}", tier, error))
                .collect::<Vec<_>>(),
            "All storage tiers failed"
        );
        Err(RouteError::AllTiersFailed { attempts })
    }

    /// Generate and store the thumbnail rendition on the object tier.
    /// Failure is recorded as a warning and never raised to the caller.
    async fn attach_thumbnail(
        &self,
        original: &[u8],
        photo_key: &str,
        warnings: &mut Vec<RouteWarning>,
    ) -> Option<String> {
        let Some(provider) = self.providers.get(&StorageTier::Object) else {
            warnings.push(RouteWarning::ThumbnailSkipped {
                reason: "object tier not configured".to_string(),
            });
            return None;
        };

        let outcome = self.engine.compress(original, CompressionClass::Thumbnail);
        if outcome.passthrough {
            warnings.push(RouteWarning::ThumbnailFailed {
                error: "image could not be decoded".to_string(),
            });
            return None;
        }
        let size = outcome.data.len() as u64;

        if !self.accountant.try_reserve(StorageTier::Object, size) {
            warnings.push(RouteWarning::ThumbnailSkipped {
                reason: "no headroom on object tier".to_string(),
            });
            return None;
        }

        let key = keys::thumbnail_key(photo_key);
        let meta = ObjectMeta {
            content_type: CompressionEngine::output_content_type().to_string(),
            uploader_name: None,
            album_name: None,
        };

        match provider.put(outcome.data, &key, &meta).await {
            Ok(put) => {
                self.accountant.commit(StorageTier::Object, size);
                Some(put.url)
            }
            Err(e) => {
                self.accountant.release(StorageTier::Object, size);
                tracing::warn!(key = %key, error = %e, "Thumbnail upload failed");
                warnings.push(RouteWarning::ThumbnailFailed {
                    error: e.to_string(),
                });
                None
            }
        }
    }
}
