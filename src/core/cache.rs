//! Asset buffer cache
//!
//! Re-rendering a note re-runs every block, so raw `.riv` bytes are cached
//! across render passes keyed by resolved vault path. The cache is bounded
//! both by entry count and by total bytes; least-recently-used buffers fall
//! off the back. Buffers are shared as `Arc`s, so eviction never invalidates
//! bytes a live instance still holds.

use std::sync::Arc;

use anyhow::Result;

use crate::core::vault::VaultAdapter;

pub const DEFAULT_MAX_ENTRIES: usize = 32;
pub const DEFAULT_MAX_BYTES: usize = 64 * 1024 * 1024;

/// Bounded most-recently-used buffer cache.
pub struct BufferCache {
    /// Front is most recently used.
    entries: Vec<(String, Arc<Vec<u8>>)>,
    max_entries: usize,
    max_bytes: usize,
}

impl Default for BufferCache {
    fn default() -> Self {
        Self::new()
    }
}

impl BufferCache {
    pub fn new() -> Self {
        Self::with_limits(DEFAULT_MAX_ENTRIES, DEFAULT_MAX_BYTES)
    }

    pub fn with_limits(max_entries: usize, max_bytes: usize) -> Self {
        Self {
            entries: Vec::new(),
            max_entries: max_entries.max(1),
            max_bytes,
        }
    }

    /// Cached bytes for a path, refreshing its recency.
    pub fn get(&mut self, path: &str) -> Option<Arc<Vec<u8>>> {
        let pos = self.entries.iter().position(|(p, _)| p == path)?;
        let entry = self.entries.remove(pos);
        let bytes = entry.1.clone();
        self.entries.insert(0, entry);
        Some(bytes)
    }

    /// Insert a buffer at the front, evicting from the back as needed.
    pub fn put(&mut self, path: &str, bytes: Arc<Vec<u8>>) {
        // Remove if already exists
        self.entries.retain(|(p, _)| p != path);
        // Add to front
        self.entries.insert(0, (path.to_string(), bytes));
        self.evict();
    }

    /// Cached bytes for a path, reading through the vault on a miss.
    pub fn fetch(&mut self, vault: &dyn VaultAdapter, path: &str) -> Result<Arc<Vec<u8>>> {
        if let Some(bytes) = self.get(path) {
            tracing::debug!("Buffer cache hit: {}", path);
            return Ok(bytes);
        }

        let bytes = Arc::new(vault.read(path)?);
        tracing::debug!("Buffer cache miss: {} ({} bytes)", path, bytes.len());
        self.put(path, bytes.clone());
        Ok(bytes)
    }

    /// Drop a single path, after an asset changed on disk.
    pub fn invalidate(&mut self, path: &str) {
        self.entries.retain(|(p, _)| p != path);
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn total_bytes(&self) -> usize {
        self.entries.iter().map(|(_, b)| b.len()).sum()
    }

    /// Trim to limits. A single buffer larger than the byte budget stays:
    /// it is in use by whoever inserted it, and evicting everything else
    /// would not free it.
    fn evict(&mut self) {
        while self.entries.len() > self.max_entries {
            if let Some((path, _)) = self.entries.pop() {
                tracing::debug!("Buffer cache evicted: {}", path);
            }
        }
        while self.total_bytes() > self.max_bytes && self.entries.len() > 1 {
            if let Some((path, _)) = self.entries.pop() {
                tracing::debug!("Buffer cache evicted: {}", path);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::vault::MemoryVault;

    fn arc(bytes: &[u8]) -> Arc<Vec<u8>> {
        Arc::new(bytes.to_vec())
    }

    #[test]
    fn fetch_reads_the_vault_once_per_path() {
        let mut vault = MemoryVault::new();
        vault.insert("a.riv", b"aaaa".to_vec());

        let mut cache = BufferCache::new();
        let first = cache.fetch(&vault, "a.riv").unwrap();
        let second = cache.fetch(&vault, "a.riv").unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(vault.read_count(), 1);
    }

    #[test]
    fn entry_limit_evicts_least_recently_used() {
        let mut cache = BufferCache::with_limits(2, usize::MAX);
        cache.put("a", arc(b"1"));
        cache.put("b", arc(b"2"));
        // Touch `a` so `b` becomes the oldest.
        assert!(cache.get("a").is_some());
        cache.put("c", arc(b"3"));

        assert!(cache.get("b").is_none());
        assert!(cache.get("a").is_some());
        assert!(cache.get("c").is_some());
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn byte_budget_evicts_from_the_back() {
        let mut cache = BufferCache::with_limits(8, 10);
        cache.put("a", arc(&[0u8; 6]));
        cache.put("b", arc(&[0u8; 6]));

        assert!(cache.get("a").is_none());
        assert!(cache.get("b").is_some());
        assert!(cache.total_bytes() <= 10);
    }

    #[test]
    fn one_oversized_buffer_is_kept() {
        let mut cache = BufferCache::with_limits(8, 10);
        cache.put("big", arc(&[0u8; 32]));

        assert_eq!(cache.len(), 1);
        assert!(cache.get("big").is_some());
    }

    #[test]
    fn invalidate_and_clear() {
        let mut cache = BufferCache::new();
        cache.put("a", arc(b"1"));
        cache.put("b", arc(b"2"));

        cache.invalidate("a");
        assert!(cache.get("a").is_none());
        assert!(cache.get("b").is_some());

        cache.clear();
        assert!(cache.is_empty());
        assert_eq!(cache.total_bytes(), 0);
    }
}
