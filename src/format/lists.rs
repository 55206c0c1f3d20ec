//! format/lists: entries of the store block list (type 3) and block range list (type 5).

use crate::consts::{
    BLOCK_FLAGS_KNOWN, BLOCK_FLAG_IS_FORWARDER, BLOCK_FLAG_IS_OVERLAY, BLOCK_FLAG_NOT_USED,
    BLOCK_LIST_ENTRY_SIZE, BLOCK_RANGE_ENTRY_SIZE,
};

use super::common::{
    read_u32, read_u64, BL_OFF_BITMAP, BL_OFF_FLAGS, BL_OFF_OFFSET, BL_OFF_ORIGINAL_OFFSET,
    BL_OFF_RELATIVE_OFFSET, BR_OFF_OFFSET, BR_OFF_RELATIVE_OFFSET, BR_OFF_SIZE,
};

/// One block list entry: where a 16 KiB block of the snapshot view lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BlockDescriptor {
    /// Offset of the block in the snapshot's view of the volume.
    pub original_offset: u64,
    /// Forwarders: offset to continue at in the next newer store.
    pub relative_offset: u64,
    /// Offset of the differential data in the image.
    pub offset: u64,
    pub flags: u32,
    /// Overlays: one bit per 512-byte sector.
    pub bitmap: u32,
}

impl BlockDescriptor {
    /// `None` for an all-zero (unwritten) slot.
    pub fn decode(entry: &[u8]) -> Option<Self> {
        let e = &entry[..BLOCK_LIST_ENTRY_SIZE];
        if e.iter().all(|&b| b == 0) {
            return None;
        }
        Some(Self {
            original_offset: read_u64(e, BL_OFF_ORIGINAL_OFFSET),
            relative_offset: read_u64(e, BL_OFF_RELATIVE_OFFSET),
            offset: read_u64(e, BL_OFF_OFFSET),
            flags: read_u32(e, BL_OFF_FLAGS),
            bitmap: read_u32(e, BL_OFF_BITMAP),
        })
    }

    #[inline]
    pub fn is_forwarder(&self) -> bool {
        self.flags & BLOCK_FLAG_IS_FORWARDER != 0
    }

    #[inline]
    pub fn is_overlay(&self) -> bool {
        self.flags & BLOCK_FLAG_IS_OVERLAY != 0
    }

    #[inline]
    pub fn is_not_used(&self) -> bool {
        self.flags & BLOCK_FLAG_NOT_USED != 0
    }

    #[inline]
    pub fn unknown_flags(&self) -> u32 {
        self.flags & !BLOCK_FLAGS_KNOWN
    }
}

/// One block range list entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockRange {
    pub offset: u64,
    pub relative_offset: u64,
    pub size: u64,
}

impl BlockRange {
    pub fn decode(entry: &[u8]) -> Option<Self> {
        let e = &entry[..BLOCK_RANGE_ENTRY_SIZE];
        if e.iter().all(|&b| b == 0) {
            return None;
        }
        Some(Self {
            offset: read_u64(e, BR_OFF_OFFSET),
            relative_offset: read_u64(e, BR_OFF_RELATIVE_OFFSET),
            size: read_u64(e, BR_OFF_SIZE),
        })
    }
}
