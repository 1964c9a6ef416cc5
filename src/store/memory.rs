// ABOUTME: In-process image store.
// ABOUTME: Counts persists and can be told to fail, which makes it the store used in tests.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::BTreeMap;

use super::{ImageStore, StoreError};
use crate::resource::ManagedImage;
use crate::types::ImageName;

#[derive(Debug, Default)]
struct Inner {
    images: BTreeMap<ImageName, ManagedImage>,
    persist_count: usize,
    fail_persist: bool,
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-seeded with one image. Seeding does not count as a persist.
    pub fn with_image(image: ManagedImage) -> Self {
        let store = Self::default();
        store.inner.lock().images.insert(image.name.clone(), image);
        store
    }

    /// Number of successful `persist` calls so far.
    pub fn persist_count(&self) -> usize {
        self.inner.lock().persist_count
    }

    /// Make subsequent `persist` calls fail.
    pub fn fail_persist(&self, fail: bool) {
        self.inner.lock().fail_persist = fail;
    }

    /// Current stored copy, bypassing the async trait.
    pub fn snapshot(&self, name: &ImageName) -> Option<ManagedImage> {
        self.inner.lock().images.get(name).cloned()
    }
}

#[async_trait]
impl ImageStore for MemoryStore {
    async fn get(&self, name: &ImageName) -> Result<Option<ManagedImage>, StoreError> {
        Ok(self.snapshot(name))
    }

    async fn persist(&self, image: &ManagedImage) -> Result<(), StoreError> {
        let mut inner = self.inner.lock();
        if inner.fail_persist {
            return Err(StoreError::Unavailable("persist disabled".to_string()));
        }
        inner.images.insert(image.name.clone(), image.clone());
        inner.persist_count += 1;
        Ok(())
    }

    async fn list(&self) -> Result<Vec<ManagedImage>, StoreError> {
        Ok(self.inner.lock().images.values().cloned().collect())
    }

    async fn remove(&self, name: &ImageName) -> Result<(), StoreError> {
        self.inner.lock().images.remove(name);
        Ok(())
    }
}
