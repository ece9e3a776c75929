//! Process-local usage accounting.
//!
//! Tracks bytes consumed per tier against the configured ceilings. The
//! reserve/commit/release protocol closes the check-then-act window between
//! "does this fit" and "the write succeeded": concurrent uploads each hold a
//! reservation, so two of them cannot both be granted the last slice of
//! headroom.
//!
//! Counters only grow within a process lifetime (deletes do not decrement);
//! a restart re-seeds from the providers' own usage snapshots.

use fotofest_core::StorageTier;
use fotofest_storage::UsageSnapshot;
use std::collections::BTreeMap;
use std::sync::Mutex;

#[derive(Debug, Clone, Copy)]
struct TierCounter {
    used_bytes: u64,
    reserved_bytes: u64,
    capacity_bytes: u64,
    /// Advisory ceilings never reject a reservation.
    advisory: bool,
}

/// Injectable per-tier byte counters.
pub struct UsageAccountant {
    tiers: Mutex<BTreeMap<StorageTier, TierCounter>>,
}

impl UsageAccountant {
    /// Build from per-tier capacity ceilings. The local tier's ceiling is
    /// advisory: it is reported but never blocks a write.
    pub fn new(capacities: BTreeMap<StorageTier, u64>) -> Self {
        let tiers = capacities
            .into_iter()
            .map(|(tier, capacity_bytes)| {
                (
                    tier,
                    TierCounter {
                        used_bytes: 0,
                        reserved_bytes: 0,
                        capacity_bytes,
                        advisory: tier == StorageTier::Local,
                    },
                )
            })
            .collect();
        UsageAccountant {
            tiers: Mutex::new(tiers),
        }
    }

    /// Prime a tier's consumed bytes, typically from the provider's
    /// `usage_snapshot()` at process start.
    pub fn seed(&self, tier: StorageTier, used_bytes: u64) {
        let mut tiers = self.tiers.lock().unwrap();
        if let Some(counter) = tiers.get_mut(&tier) {
            counter.used_bytes = used_bytes;
        }
    }

    /// Atomically reserve headroom for an in-flight write. Returns false
    /// when the tier is unknown or the bytes would exceed its ceiling.
    pub fn try_reserve(&self, tier: StorageTier, bytes: u64) -> bool {
        let mut tiers = self.tiers.lock().unwrap();
        let Some(counter) = tiers.get_mut(&tier) else {
            return false;
        };
        let pending = counter.used_bytes.saturating_add(counter.reserved_bytes);
        if !counter.advisory && pending.saturating_add(bytes) > counter.capacity_bytes {
            return false;
        }
        counter.reserved_bytes = counter.reserved_bytes.saturating_add(bytes);
        true
    }

    /// Convert a reservation into consumed bytes after a confirmed write.
    pub fn commit(&self, tier: StorageTier, bytes: u64) {
        let mut tiers = self.tiers.lock().unwrap();
        if let Some(counter) = tiers.get_mut(&tier) {
            counter.reserved_bytes = counter.reserved_bytes.saturating_sub(bytes);
            counter.used_bytes = counter.used_bytes.saturating_add(bytes);
        }
    }

    /// Drop a reservation after a failed write.
    pub fn release(&self, tier: StorageTier, bytes: u64) {
        let mut tiers = self.tiers.lock().unwrap();
        if let Some(counter) = tiers.get_mut(&tier) {
            counter.reserved_bytes = counter.reserved_bytes.saturating_sub(bytes);
        }
    }

    /// Current usage per tier. Reserved bytes count as used so selection
    /// sees in-flight writes.
    pub fn snapshot(&self) -> BTreeMap<StorageTier, UsageSnapshot> {
        let tiers = self.tiers.lock().unwrap();
        tiers
            .iter()
            .map(|(tier, counter)| {
                (
                    *tier,
                    UsageSnapshot {
                        used_bytes: counter.used_bytes.saturating_add(counter.reserved_bytes),
                        capacity_bytes: counter.capacity_bytes,
                    },
                )
            })
            .collect()
    }

}

#[cfg(test)]
mod tests {
    use super::*;

    fn accountant() -> UsageAccountant {
        UsageAccountant::new(BTreeMap::from([
            (StorageTier::Object, 1000),
            (StorageTier::Drive, 500),
            (StorageTier::Local, 100),
        ]))
    }

    #[test]
    fn test_reserve_commit_grows_used() {
        let accountant = accountant();
        assert!(accountant.try_reserve(StorageTier::Object, 400));
        accountant.commit(StorageTier::Object, 400);

        let snapshot = accountant.snapshot();
        assert_eq!(snapshot[&StorageTier::Object].used_bytes, 400);
    }

    #[test]
    fn test_reservation_blocks_concurrent_headroom() {
        let accountant = accountant();
        assert!(accountant.try_reserve(StorageTier::Object, 600));
        // Second writer cannot also claim the remaining headroom plus more.
        assert!(!accountant.try_reserve(StorageTier::Object, 600));
        // But a smaller write still fits.
        assert!(accountant.try_reserve(StorageTier::Object, 400));
    }

    #[test]
    fn test_release_restores_headroom() {
        let accountant = accountant();
        assert!(accountant.try_reserve(StorageTier::Object, 1000));
        assert!(!accountant.try_reserve(StorageTier::Object, 1));
        accountant.release(StorageTier::Object, 1000);
        assert!(accountant.try_reserve(StorageTier::Object, 1000));
        // Nothing was committed along the way.
        accountant.release(StorageTier::Object, 1000);
        assert_eq!(accountant.snapshot()[&StorageTier::Object].used_bytes, 0);
    }

    #[test]
    fn test_local_ceiling_is_advisory() {
        let accountant = accountant();
        assert!(accountant.try_reserve(StorageTier::Local, 10_000));
        accountant.commit(StorageTier::Local, 10_000);
        assert_eq!(accountant.snapshot()[&StorageTier::Local].used_bytes, 10_000);
    }

    #[test]
    fn test_additive_and_monotonic() {
        let accountant = accountant();
        accountant.seed(StorageTier::Drive, 100);
        for _ in 0..3 {
            assert!(accountant.try_reserve(StorageTier::Drive, 50));
            accountant.commit(StorageTier::Drive, 50);
        }
        assert_eq!(accountant.snapshot()[&StorageTier::Drive].used_bytes, 250);
        // Snapshot reads do not change state.
        assert_eq!(accountant.snapshot()[&StorageTier::Drive].used_bytes, 250);
    }

    #[test]
    fn test_unknown_tier_rejected() {
        let accountant = UsageAccountant::new(BTreeMap::from([(StorageTier::Local, 100)]));
        assert!(!accountant.try_reserve(StorageTier::Object, 1));
    }
}
