//! Container observer wiring
//!
//! The host owns the real resize and visibility observers on block
//! containers; the plugin only declares which blocks need them. The hub is
//! the single ledger of that wiring, so teardown can prove every observer
//! attached for a block was released with it.

use std::collections::HashMap;

use crate::render::block::BlockId;

/// Observers a block's container needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ObserverFlags {
    pub resize: bool,
    pub visibility: bool,
}

impl ObserverFlags {
    pub fn all() -> Self {
        Self {
            resize: true,
            visibility: true,
        }
    }

    pub fn any(&self) -> bool {
        self.resize || self.visibility
    }
}

/// Ledger of per-block observer wiring.
#[derive(Debug, Default)]
pub struct ObserverHub {
    entries: HashMap<BlockId, ObserverFlags>,
}

impl ObserverHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare the observers a block's container needs. Re-wiring an
    /// already wired block is a no-op.
    pub fn wire(&mut self, id: &BlockId, flags: ObserverFlags) {
        if !flags.any() {
            return;
        }
        let entry = self.entries.entry(id.clone()).or_default();
        entry.resize |= flags.resize;
        entry.visibility |= flags.visibility;
        tracing::debug!("Wired observers for {}", id);
    }

    /// Release everything wired for one block.
    pub fn unwire(&mut self, id: &BlockId) {
        if self.entries.remove(id).is_some() {
            tracing::debug!("Released observers for {}", id);
        }
    }

    /// Release everything, on plugin unload.
    pub fn clear(&mut self) {
        if !self.entries.is_empty() {
            tracing::debug!("Released observers for {} blocks", self.entries.len());
        }
        self.entries.clear();
    }

    pub fn is_wired(&self, id: &BlockId) -> bool {
        self.entries.get(id).map(ObserverFlags::any).unwrap_or(false)
    }

    pub fn flags(&self, id: &BlockId) -> ObserverFlags {
        self.entries.get(id).copied().unwrap_or_default()
    }

    /// Number of blocks with live wiring.
    pub fn active(&self) -> usize {
        self.entries.len()
    }

    /// Wired blocks in a stable order.
    pub fn wired_blocks(&self) -> Vec<BlockId> {
        let mut ids: Vec<BlockId> = self.entries.keys().cloned().collect();
        ids.sort();
        ids
    }
}
