//! Block instance registry
//!
//! Every live block is addressable by its [`BlockId`]; "the last loaded
//! animation" that the restart command operates on is just a cursor into
//! the map, kept honest across removals. Nothing here owns a privileged
//! global instance.

use std::collections::HashMap;

use crate::render::block::{BlockId, RiveBlock};

/// Live blocks keyed by identity.
#[derive(Default)]
pub struct InstanceRegistry {
    blocks: HashMap<BlockId, RiveBlock>,
    last_loaded: Option<BlockId>,
}

impl InstanceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a block, returning the one it replaced so the caller can tear
    /// it down.
    pub fn insert(&mut self, block: RiveBlock) -> Option<RiveBlock> {
        self.blocks.insert(block.id().clone(), block)
    }

    pub fn get(&self, id: &BlockId) -> Option<&RiveBlock> {
        self.blocks.get(id)
    }

    pub fn get_mut(&mut self, id: &BlockId) -> Option<&mut RiveBlock> {
        self.blocks.get_mut(id)
    }

    /// Remove a block. The last-loaded cursor is cleared if it pointed here.
    pub fn remove(&mut self, id: &BlockId) -> Option<RiveBlock> {
        if self.last_loaded.as_ref() == Some(id) {
            self.last_loaded = None;
        }
        self.blocks.remove(id)
    }

    /// Note a block that just finished loading.
    pub fn record_loaded(&mut self, id: &BlockId) {
        if self.blocks.contains_key(id) {
            self.last_loaded = Some(id.clone());
        }
    }

    pub fn last_loaded(&self) -> Option<&BlockId> {
        self.last_loaded.as_ref()
    }

    /// The block the restart command targets, if it is still alive.
    pub fn last_loaded_block_mut(&mut self) -> Option<&mut RiveBlock> {
        let id = self.last_loaded.clone()?;
        self.blocks.get_mut(&id)
    }

    /// Ids of every block in a note, ordered by ordinal.
    pub fn note_ids(&self, note_path: &str) -> Vec<BlockId> {
        let mut ids: Vec<BlockId> = self
            .blocks
            .keys()
            .filter(|id| id.note_path == note_path)
            .cloned()
            .collect();
        ids.sort();
        ids
    }

    /// All ids in a stable order.
    pub fn ids(&self) -> Vec<BlockId> {
        let mut ids: Vec<BlockId> = self.blocks.keys().cloned().collect();
        ids.sort();
        ids
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut RiveBlock> {
        self.blocks.values_mut()
    }

    /// Take every block out, for plugin unload.
    pub fn drain(&mut self) -> Vec<RiveBlock> {
        self.last_loaded = None;
        self.blocks.drain().map(|(_, block)| block).collect()
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }
}
