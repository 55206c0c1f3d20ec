//! store/table: per-store block table.
//!
//! Forward map: original (snapshot-view) offset → entry {primary, overlay}.
//! Reverse map: forwarder relative offset → forwarder descriptor.
//! Both are ordered maps; a lookup finds the entry whose 16 KiB block
//! contains the offset.
//!
//! Insert rules (descriptors arrive in block list order):
//! - not-used descriptors are only kept in the raw list
//! - a non-overlay descriptor whose original offset is a forwarder's relative
//!   offset takes over the forwarder's original offset (chain collapse)
//! - a forwarder pointing at itself is dropped
//! - non-overlay over an existing entry replaces the primary, keeps the overlay
//! - overlay over an existing entry attaches, or ORs into the attached overlay

use std::collections::BTreeMap;

use crate::consts::BLOCK_SIZE;
use crate::format::BlockDescriptor;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct TableEntry {
    pub primary: Option<BlockDescriptor>,
    pub overlay: Option<BlockDescriptor>,
}

#[derive(Debug, Default)]
pub(crate) struct BlockTable {
    forward: BTreeMap<u64, TableEntry>,
    reverse: BTreeMap<u64, BlockDescriptor>,
    descriptors: Vec<BlockDescriptor>,
}

impl BlockTable {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn insert(&mut self, descriptor: BlockDescriptor) {
        self.descriptors.push(descriptor);
        if descriptor.is_not_used() {
            return;
        }

        let mut d = descriptor;
        if !d.is_overlay() {
            if let Some(fwd) = self.reverse.remove(&d.original_offset) {
                d.original_offset = fwd.original_offset;
            }
        }
        if d.is_forwarder() && d.original_offset == d.relative_offset {
            return;
        }

        match self.forward.get_mut(&d.original_offset) {
            Some(entry) if d.is_overlay() => {
                match entry.overlay.as_mut() {
                    Some(ov) => ov.bitmap |= d.bitmap,
                    None => entry.overlay = Some(d),
                }
                return;
            }
            Some(entry) => entry.primary = Some(d),
            None => {
                let entry = if d.is_overlay() {
                    TableEntry {
                        primary: None,
                        overlay: Some(d),
                    }
                } else {
                    TableEntry {
                        primary: Some(d),
                        overlay: None,
                    }
                };
                self.forward.insert(d.original_offset, entry);
            }
        }

        if d.is_forwarder() {
            self.reverse.insert(d.relative_offset, d);
        }
    }

    /// Entry whose block contains `offset`.
    pub(crate) fn lookup(&self, offset: u64) -> Option<&TableEntry> {
        let (&start, entry) = self.forward.range(..=offset).next_back()?;
        (offset - start < BLOCK_SIZE).then_some(entry)
    }

    /// True when `offset` lies in a block some forwarder of this store points at.
    pub(crate) fn is_forward_target(&self, offset: u64) -> bool {
        self.reverse
            .range(..=offset)
            .next_back()
            .map_or(false, |(&start, _)| offset - start < BLOCK_SIZE)
    }

    /// Descriptors as read from the block list, not-used ones included.
    pub(crate) fn descriptors(&self) -> &[BlockDescriptor] {
        &self.descriptors
    }

    /// Number of distinct blocks with an entry.
    pub(crate) fn entry_count(&self) -> usize {
        self.forward.len()
    }
}
