//! Tier selection policy.
//!
//! Pure function of the photo metadata and the current usage counters: no
//! I/O, no mutation. Rules are evaluated in fixed priority order and the
//! first match wins; a tier that is not configured is treated exactly like
//! a tier without headroom.

use fotofest_core::{CompressionClass, PhotoMetadata, StorageTier, TierDecision};
use fotofest_storage::UsageSnapshot;
use std::collections::{BTreeMap, BTreeSet};

/// Pick the tier and compression class for an incoming photo.
///
/// Object tier with credentials and headroom wins; showcase photos
/// (homepage/premium/featured) get the premium class there. Next the drive
/// tier under the same headroom test, always standard. The local tier is
/// the unconditional last resort; its ceiling is advisory and not checked
/// here.
pub fn select_tier(
    metadata: &PhotoMetadata,
    usage: &BTreeMap<StorageTier, UsageSnapshot>,
    configured: &BTreeSet<StorageTier>,
) -> TierDecision {
    let fits = |tier: StorageTier| {
        configured.contains(&tier)
            && usage
                .get(&tier)
                .map(|snapshot| snapshot.has_headroom(metadata.file_size_bytes))
                .unwrap_or(false)
    };

    if fits(StorageTier::Object) {
        let compression = if metadata.is_homepage || metadata.is_premium || metadata.is_featured {
            CompressionClass::Premium
        } else {
            CompressionClass::Standard
        };
        return TierDecision {
            tier: StorageTier::Object,
            compression,
        };
    }

    if fits(StorageTier::Drive) {
        return TierDecision {
            tier: StorageTier::Drive,
            compression: CompressionClass::Standard,
        };
    }

    TierDecision {
        tier: StorageTier::Local,
        compression: CompressionClass::Standard,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const GB: u64 = 1024 * 1024 * 1024;

    fn metadata(file_size_bytes: u64) -> PhotoMetadata {
        PhotoMetadata {
            event_id: Some("gala".to_string()),
            file_name: "photo.jpg".to_string(),
            album_name: "Album".to_string(),
            uploader_name: "guest".to_string(),
            is_homepage: false,
            is_premium: false,
            is_featured: false,
            file_size_bytes,
            file_type: "image/jpeg".to_string(),
        }
    }

    fn usage(object_used: u64, drive_used: u64) -> BTreeMap<StorageTier, UsageSnapshot> {
        BTreeMap::from([
            (
                StorageTier::Object,
                UsageSnapshot {
                    used_bytes: object_used,
                    capacity_bytes: 8 * GB,
                },
            ),
            (
                StorageTier::Drive,
                UsageSnapshot {
                    used_bytes: drive_used,
                    capacity_bytes: 15 * GB,
                },
            ),
            (
                StorageTier::Local,
                UsageSnapshot {
                    used_bytes: 0,
                    capacity_bytes: 50 * GB,
                },
            ),
        ])
    }

    fn all_tiers() -> BTreeSet<StorageTier> {
        BTreeSet::from([StorageTier::Object, StorageTier::Drive, StorageTier::Local])
    }

    #[test]
    fn test_object_with_headroom_standard_class() {
        let decision = select_tier(&metadata(1024), &usage(0, 0), &all_tiers());
        assert_eq!(decision.tier, StorageTier::Object);
        assert_eq!(decision.compression, CompressionClass::Standard);
    }

    #[test]
    fn test_showcase_photos_get_premium_class() {
        for set in [
            |m: &mut PhotoMetadata| m.is_homepage = true,
            |m: &mut PhotoMetadata| m.is_premium = true,
            |m: &mut PhotoMetadata| m.is_featured = true,
        ] {
            let mut meta = metadata(1024);
            set(&mut meta);
            let decision = select_tier(&meta, &usage(0, 0), &all_tiers());
            assert_eq!(decision.tier, StorageTier::Object);
            assert_eq!(decision.compression, CompressionClass::Premium);
        }
    }

    #[test]
    fn test_object_nearly_full_falls_to_drive() {
        // Object tier at 95% of an 8GB ceiling, incoming 1GB file.
        let usage = usage(95 * 8 * GB / 100, 0);
        let decision = select_tier(&metadata(GB), &usage, &all_tiers());
        assert_eq!(decision.tier, StorageTier::Drive);
        assert_eq!(decision.compression, CompressionClass::Standard);
    }

    #[test]
    fn test_missing_object_credentials_acts_like_no_headroom() {
        let configured = BTreeSet::from([StorageTier::Drive, StorageTier::Local]);
        let decision = select_tier(&metadata(1024), &usage(0, 0), &configured);
        assert_eq!(decision.tier, StorageTier::Drive);
    }

    #[test]
    fn test_everything_full_falls_to_local() {
        let usage = usage(8 * GB, 15 * GB);
        let decision = select_tier(&metadata(1024), &usage, &all_tiers());
        assert_eq!(decision.tier, StorageTier::Local);
        assert_eq!(decision.compression, CompressionClass::Standard);
    }

    #[test]
    fn test_exact_fit_still_selected() {
        let usage = usage(8 * GB - 1024, 0);
        let decision = select_tier(&metadata(1024), &usage, &all_tiers());
        assert_eq!(decision.tier, StorageTier::Object);
    }

    #[test]
    fn test_never_picks_tier_over_capacity_when_alternative_exists() {
        // One byte over the exact fit.
        let usage = usage(8 * GB - 1023, 0);
        let decision = select_tier(&metadata(1024), &usage, &all_tiers());
        assert_eq!(decision.tier, StorageTier::Drive);
    }
}
