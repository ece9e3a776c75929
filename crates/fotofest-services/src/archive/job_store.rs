//! Bounded in-process store of backup jobs.
//!
//! Fixed capacity plus a retention window keep long-running processes from
//! accumulating job records indefinitely: least-recently-used jobs fall out
//! at capacity, and entries past the retention age are dropped on access.

use fotofest_core::BackupJob;
use lru::LruCache;
use std::num::NonZeroUsize;
use std::sync::Mutex;
use std::time::{Duration, Instant};
use uuid::Uuid;

struct Entry {
    job: BackupJob,
    inserted_at: Instant,
}

/// Bounded job map with TTL-based eviction.
pub struct JobStore {
    jobs: Mutex<LruCache<Uuid, Entry>>,
    retention: Duration,
}

impl JobStore {
    pub fn new(capacity: usize, retention: Duration) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        JobStore {
            jobs: Mutex::new(LruCache::new(capacity)),
            retention,
        }
    }

    pub fn insert(&self, job: BackupJob) {
        let mut jobs = self.jobs.lock().unwrap();
        Self::drop_expired(&mut jobs, self.retention);
        jobs.put(
            job.backup_id,
            Entry {
                job,
                inserted_at: Instant::now(),
            },
        );
    }

    pub fn get(&self, backup_id: Uuid) -> Option<BackupJob> {
        let mut jobs = self.jobs.lock().unwrap();
        Self::drop_expired(&mut jobs, self.retention);
        jobs.get(&backup_id).map(|entry| entry.job.clone())
    }

    /// Apply a mutation to a live job. Updates to a terminal job are
    /// ignored: Completed/Failed jobs are immutable.
    pub fn update(&self, backup_id: Uuid, mutate: impl FnOnce(&mut BackupJob)) {
        let mut jobs = self.jobs.lock().unwrap();
        let Some(entry) = jobs.get_mut(&backup_id) else {
            tracing::warn!(backup_id = %backup_id, "Update for unknown backup job dropped");
            return;
        };
        if entry.job.status.is_terminal() {
            tracing::warn!(
                backup_id = %backup_id,
                status = ?entry.job.status,
                "Update for terminal backup job dropped"
            );
            return;
        }
        mutate(&mut entry.job);
    }

    pub fn len(&self) -> usize {
        self.jobs.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn drop_expired(jobs: &mut LruCache<Uuid, Entry>, retention: Duration) {
        let expired: Vec<Uuid> = jobs
            .iter()
            .filter(|(_, entry)| entry.inserted_at.elapsed() >= retention)
            .map(|(id, _)| *id)
            .collect();
        for id in expired {
            jobs.pop(&id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fotofest_core::BackupStatus;

    fn job() -> BackupJob {
        BackupJob::new(Uuid::new_v4(), "gala")
    }

    #[test]
    fn test_insert_get_update() {
        let store = JobStore::new(8, Duration::from_secs(3600));
        let job = job();
        let id = job.backup_id;
        store.insert(job);

        store.update(id, |j| {
            j.status = BackupStatus::BackingUp;
            j.total_photos = 5;
        });

        let fetched = store.get(id).unwrap();
        assert_eq!(fetched.status, BackupStatus::BackingUp);
        assert_eq!(fetched.total_photos, 5);
    }

    #[test]
    fn test_capacity_evicts_least_recently_used() {
        let store = JobStore::new(2, Duration::from_secs(3600));
        let first = job();
        let first_id = first.backup_id;
        store.insert(first);
        store.insert(job());
        store.insert(job());

        assert_eq!(store.len(), 2);
        assert!(store.get(first_id).is_none());
    }

    #[test]
    fn test_retention_drops_old_entries() {
        let store = JobStore::new(8, Duration::ZERO);
        let job = job();
        let id = job.backup_id;
        store.insert(job);
        assert!(store.get(id).is_none());
        assert!(store.is_empty());
    }

    #[test]
    fn test_terminal_jobs_are_immutable() {
        let store = JobStore::new(8, Duration::from_secs(3600));
        let mut job = job();
        let id = job.backup_id;
        job.complete();
        store.insert(job);

        store.update(id, |j| j.total_photos = 99);

        assert_eq!(store.get(id).unwrap().total_photos, 0);
    }
}
