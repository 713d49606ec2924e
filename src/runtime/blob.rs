//! Temporary blob references for the alternate asset-delivery path
//!
//! When the runtime rejects a directly-passed buffer, the retry ladder serves
//! the same bytes through a short-lived blob reference instead (the web
//! runtime's object-URL trick). The store hands out opaque references and
//! keeps the backing bytes alive until the owning block revokes them.

use std::collections::HashMap;
use std::sync::Arc;

/// Opaque handle to bytes temporarily served by a [`BlobStore`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlobRef {
    id: u64,
    url: String,
}

impl BlobRef {
    /// The synthetic URL a runtime backend loads the asset from.
    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn id(&self) -> u64 {
        self.id
    }
}

/// Registry of live blob references, owned by the plugin.
///
/// Blocks revoke their reference on teardown; a leaked reference would keep
/// the buffer alive for the plugin's lifetime, so revocation is part of the
/// block removal path.
#[derive(Debug, Default)]
pub struct BlobStore {
    next_id: u64,
    entries: HashMap<u64, Arc<Vec<u8>>>,
}

impl BlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `buffer` under a fresh reference.
    pub fn register(&mut self, buffer: Arc<Vec<u8>>) -> BlobRef {
        let id = self.next_id;
        self.next_id = self.next_id.wrapping_add(1);
        self.entries.insert(id, buffer);
        tracing::debug!("Registered blob reference {}", id);
        BlobRef {
            id,
            url: format!("blob:rive/{}", id),
        }
    }

    /// Look up the bytes behind a reference, if still live.
    pub fn resolve(&self, blob: &BlobRef) -> Option<Arc<Vec<u8>>> {
        self.entries.get(&blob.id).cloned()
    }

    /// Drop a reference. Returns false if it was already revoked.
    pub fn revoke(&mut self, blob: &BlobRef) -> bool {
        let removed = self.entries.remove(&blob.id).is_some();
        if removed {
            tracing::debug!("Revoked blob reference {}", blob.id);
        }
        removed
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn register_resolve_revoke() {
        let mut store = BlobStore::new();
        let bytes = Arc::new(vec![1u8, 2, 3]);
        let blob = store.register(bytes.clone());

        assert!(blob.url().starts_with("blob:rive/"));
        assert_eq!(store.resolve(&blob).as_deref(), Some(&vec![1u8, 2, 3]));

        assert!(store.revoke(&blob));
        assert!(store.resolve(&blob).is_none());
        assert!(!store.revoke(&blob));
        assert!(store.is_empty());
    }

    #[test]
    fn references_are_distinct() {
        let mut store = BlobStore::new();
        let a = store.register(Arc::new(vec![1]));
        let b = store.register(Arc::new(vec![2]));
        assert_ne!(a, b);
        assert_ne!(a.url(), b.url());
        assert_eq!(store.len(), 2);
    }
}
