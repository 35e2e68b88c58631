//! In-memory [`LocalStore`] for tests and sessions that should leave no trace.

use std::sync::{Arc, Mutex, MutexGuard};

use lanchat_shared::Attachment;

use crate::error::{Result, StoreError};
use crate::LocalStore;

#[derive(Debug, Default)]
struct Inner {
    display_name: Option<String>,
    image_cache: Vec<Attachment>,
    image_cache_writes: usize,
}

/// Cloning yields another handle onto the same state, so a test can keep one
/// handle while the session owns the other.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Mutex<Inner>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of times the image cache has been written.
    pub fn image_cache_writes(&self) -> usize {
        self.lock().map(|g| g.image_cache_writes).unwrap_or_default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, Inner>> {
        self.inner.lock().map_err(|_| StoreError::Poisoned)
    }
}

impl LocalStore for MemoryStore {
    fn load_display_name(&self) -> Result<Option<String>> {
        Ok(self.lock()?.display_name.clone())
    }

    fn save_display_name(&self, name: &str) -> Result<()> {
        self.lock()?.display_name = Some(name.to_string());
        Ok(())
    }

    fn load_image_cache(&self) -> Result<Vec<Attachment>> {
        Ok(self.lock()?.image_cache.clone())
    }

    fn save_image_cache(&self, images: &[Attachment]) -> Result<()> {
        let mut guard = self.lock()?;
        guard.image_cache = images.to_vec();
        guard.image_cache_writes += 1;
        Ok(())
    }
}
