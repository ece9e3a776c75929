//! Mock provider and catalog implementations for tests.

use async_trait::async_trait;
use fotofest_core::StorageTier;
use fotofest_storage::{
    ContainerRef, ObjectMeta, ProviderAdapter, ProviderError, ProviderResult, PutOutcome,
    StoredObject, UsageSnapshot,
};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use crate::catalog::{PhotoCatalog, PhotoRecord};

/// In-memory provider with switchable failure modes.
pub struct MemoryProvider {
    tier: StorageTier,
    files: Mutex<HashMap<String, Vec<u8>>>,
    fail_all_puts: AtomicBool,
    fail_put_prefix: Mutex<Option<String>>,
    fail_put_names: Mutex<HashSet<String>>,
    fail_containers: AtomicBool,
    capacity_bytes: u64,
}

impl MemoryProvider {
    pub fn new(tier: StorageTier) -> Self {
        Self {
            tier,
            files: Mutex::new(HashMap::new()),
            fail_all_puts: AtomicBool::new(false),
            fail_put_prefix: Mutex::new(None),
            fail_put_names: Mutex::new(HashSet::new()),
            fail_containers: AtomicBool::new(false),
            capacity_bytes: 1 << 40,
        }
    }

    pub fn fail_puts(&self, fail: bool) {
        self.fail_all_puts.store(fail, Ordering::SeqCst);
    }

    pub fn fail_puts_with_prefix(&self, prefix: &str) {
        *self.fail_put_prefix.lock().unwrap() = Some(prefix.to_string());
    }

    pub fn fail_put_named(&self, name: &str) {
        self.fail_put_names.lock().unwrap().insert(name.to_string());
    }

    pub fn fail_containers(&self, fail: bool) {
        self.fail_containers.store(fail, Ordering::SeqCst);
    }

    pub fn seed_file(&self, path: &str, data: Vec<u8>) {
        self.files.lock().unwrap().insert(path.to_string(), data);
    }

    pub fn delete_sync(&self, path: &str) -> bool {
        self.files.lock().unwrap().remove(path).is_some()
    }

    pub fn stored_count(&self) -> usize {
        self.files.lock().unwrap().len()
    }

    pub fn total_stored_bytes(&self) -> u64 {
        self.files
            .lock()
            .unwrap()
            .values()
            .map(|d| d.len() as u64)
            .sum()
    }

    pub fn stored_paths(&self) -> Vec<String> {
        self.files.lock().unwrap().keys().cloned().collect()
    }

    pub fn get_file(&self, path: &str) -> Option<Vec<u8>> {
        self.files.lock().unwrap().get(path).cloned()
    }

    fn check_put_allowed(&self, path: &str, name: &str) -> ProviderResult<()> {
        if self.fail_all_puts.load(Ordering::SeqCst) {
            return Err(ProviderError::WriteFailed(format!(
                "injected failure on {}",
                self.tier
            )));
        }
        if let Some(prefix) = self.fail_put_prefix.lock().unwrap().as_deref() {
            if path.starts_with(prefix) {
                return Err(ProviderError::WriteFailed(format!(
                    "injected failure for prefix {}",
                    prefix
                )));
            }
        }
        if self.fail_put_names.lock().unwrap().contains(name) {
            return Err(ProviderError::WriteFailed(format!(
                "injected failure for {}",
                name
            )));
        }
        Ok(())
    }

    fn url_for(&self, path: &str) -> String {
        format!("https://{}.test.example.com/{}", self.tier, path)
    }
}

#[async_trait]
impl ProviderAdapter for MemoryProvider {
    async fn put(
        &self,
        data: Vec<u8>,
        logical_path: &str,
        _meta: &ObjectMeta,
    ) -> ProviderResult<PutOutcome> {
        let name = logical_path.rsplit('/').next().unwrap_or(logical_path);
        self.check_put_allowed(logical_path, name)?;
        self.files
            .lock()
            .unwrap()
            .insert(logical_path.to_string(), data);
        Ok(PutOutcome {
            url: self.url_for(logical_path),
            provider_path: logical_path.to_string(),
            etag: None,
        })
    }

    async fn put_in_container(
        &self,
        data: Vec<u8>,
        name: &str,
        container: &ContainerRef,
        _meta: &ObjectMeta,
    ) -> ProviderResult<PutOutcome> {
        let path = format!("{}/{}", container.id, name);
        self.check_put_allowed(&path, name)?;
        self.files.lock().unwrap().insert(path.clone(), data);
        Ok(PutOutcome {
            url: self.url_for(&path),
            provider_path: path,
            etag: None,
        })
    }

    async fn get(&self, provider_path: &str) -> ProviderResult<Vec<u8>> {
        self.files
            .lock()
            .unwrap()
            .get(provider_path)
            .cloned()
            .ok_or_else(|| ProviderError::NotFound(provider_path.to_string()))
    }

    async fn delete(&self, provider_path: &str) -> ProviderResult<bool> {
        Ok(self.files.lock().unwrap().remove(provider_path).is_some())
    }

    async fn list(&self, prefix: &str) -> ProviderResult<Vec<StoredObject>> {
        Ok(self
            .files
            .lock()
            .unwrap()
            .iter()
            .filter(|(path, _)| path.starts_with(prefix))
            .map(|(path, data)| StoredObject {
                path: path.clone(),
                size_bytes: data.len() as u64,
            })
            .collect())
    }

    async fn usage_snapshot(&self) -> ProviderResult<UsageSnapshot> {
        Ok(UsageSnapshot {
            used_bytes: self.total_stored_bytes(),
            capacity_bytes: self.capacity_bytes,
        })
    }

    async fn create_container(
        &self,
        name: &str,
        parent: Option<&str>,
    ) -> ProviderResult<ContainerRef> {
        if self.fail_containers.load(Ordering::SeqCst) {
            return Err(ProviderError::WriteFailed(
                "injected container failure".to_string(),
            ));
        }
        let id = match parent {
            Some(parent) => format!("{}/{}", parent, name),
            None => name.to_string(),
        };
        Ok(ContainerRef {
            url: Some(self.url_for(&id)),
            id,
        })
    }

    fn tier(&self) -> StorageTier {
        self.tier
    }

    fn provider_name(&self) -> &'static str {
        match self.tier {
            StorageTier::Object => "memory-object",
            StorageTier::Drive => "memory-drive",
            StorageTier::Local => "memory-local",
        }
    }
}

/// Catalog serving a fixed photo list.
pub struct StaticCatalog {
    photos: Vec<PhotoRecord>,
}

impl StaticCatalog {
    pub fn new(photos: Vec<PhotoRecord>) -> Self {
        Self { photos }
    }
}

#[async_trait]
impl PhotoCatalog for StaticCatalog {
    async fn list_event_photos(&self, _event_id: &str) -> anyhow::Result<Vec<PhotoRecord>> {
        Ok(self.photos.clone())
    }
}

/// Catalog whose listing always fails.
pub struct FailingCatalog;

#[async_trait]
impl PhotoCatalog for FailingCatalog {
    async fn list_event_photos(&self, event_id: &str) -> anyhow::Result<Vec<PhotoRecord>> {
        Err(anyhow::anyhow!("catalog unreachable for event {}", event_id))
    }
}
