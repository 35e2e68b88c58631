//! Bounded most-recent-first set of images the user has attached before.

use std::collections::VecDeque;

use lanchat_shared::constants::IMAGE_CACHE_CAPACITY;
use lanchat_shared::Attachment;

#[derive(Debug, Clone)]
pub struct ImageCache {
    entries: VecDeque<Attachment>,
    capacity: usize,
}

impl ImageCache {
    pub fn new() -> Self {
        Self::with_capacity(IMAGE_CACHE_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Rebuild from persisted entries (newest first), dropping duplicates and
    /// anything past capacity.
    pub fn from_entries(entries: Vec<Attachment>) -> Self {
        let mut cache = Self::new();
        for image in entries {
            if cache.entries.len() == cache.capacity {
                break;
            }
            if !cache.contains(&image.payload) {
                cache.entries.push_back(image);
            }
        }
        cache
    }

    /// Insert at the front. A payload already cached is left where it is and
    /// `false` is returned. The oldest entry is evicted when full.
    pub fn insert(&mut self, image: Attachment) -> bool {
        if self.contains(&image.payload) {
            return false;
        }
        self.entries.push_front(image);
        self.entries.truncate(self.capacity);
        true
    }

    pub fn remove(&mut self, index: usize) -> Option<Attachment> {
        self.entries.remove(index)
    }

    pub fn get(&self, index: usize) -> Option<&Attachment> {
        self.entries.get(index)
    }

    pub fn contains(&self, payload: &str) -> bool {
        self.entries.iter().any(|e| e.payload == payload)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries newest first.
    pub fn to_vec(&self) -> Vec<Attachment> {
        self.entries.iter().cloned().collect()
    }
}

impl Default for ImageCache {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn image(n: usize) -> Attachment {
        Attachment::from_bytes(format!("{n}.png"), "image/png", n.to_string().as_bytes()).unwrap()
    }

    #[test]
    fn test_keeps_newest_twenty() {
        let mut cache = ImageCache::new();
        for n in 0..25 {
            assert!(cache.insert(image(n)));
        }

        assert_eq!(cache.len(), IMAGE_CACHE_CAPACITY);
        let names: Vec<_> = cache.to_vec().into_iter().map(|a| a.file_name).collect();
        let expected: Vec<_> = (5..25).rev().map(|n| format!("{n}.png")).collect();
        assert_eq!(names, expected);
    }

    #[test]
    fn test_reinsert_is_noop() {
        let mut cache = ImageCache::new();
        cache.insert(image(1));
        cache.insert(image(2));

        assert!(!cache.insert(image(1)));
        assert_eq!(cache.len(), 2);
        assert_eq!(cache.get(0).unwrap().file_name, "2.png");
        assert_eq!(cache.get(1).unwrap().file_name, "1.png");
    }

    #[test]
    fn test_remove_by_index() {
        let mut cache = ImageCache::new();
        cache.insert(image(1));
        cache.insert(image(2));

        assert_eq!(cache.remove(0).unwrap().file_name, "2.png");
        assert!(cache.remove(5).is_none());
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_from_entries_enforces_bound_and_uniqueness() {
        let mut persisted: Vec<_> = (0..30).map(image).collect();
        persisted.insert(1, image(0));

        let cache = ImageCache::from_entries(persisted);
        assert_eq!(cache.len(), IMAGE_CACHE_CAPACITY);
        assert_eq!(cache.get(0).unwrap().file_name, "0.png");
        assert_eq!(cache.get(1).unwrap().file_name, "1.png");
    }
}
