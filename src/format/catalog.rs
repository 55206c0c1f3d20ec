//! format/catalog: 128-byte catalog entries.

use crate::consts::{
    CATALOG_ENTRY_EMPTY, CATALOG_ENTRY_SIZE, CATALOG_ENTRY_STORE_INFO,
    CATALOG_ENTRY_STORE_LOCATION, CATALOG_ENTRY_UNUSED,
};
use crate::error::{Result, VshadowError};
use crate::util::Guid;

use super::common::{
    read_guid, read_u64, CE_OFF_BITMAP_OFFSET, CE_OFF_BLOCK_LIST_OFFSET,
    CE_OFF_BLOCK_RANGE_LIST_OFFSET, CE_OFF_CREATION_TIME, CE_OFF_PREVIOUS_BITMAP_OFFSET,
    CE_OFF_STORE_HEADER_OFFSET, CE_OFF_STORE_IDENTIFIER, CE_OFF_TYPE, CE_OFF_VOLUME_SIZE,
};

/// Where a store's metadata chains start (catalog entry type 3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StoreLocation {
    pub block_list_offset: u64,
    pub header_offset: u64,
    pub block_range_list_offset: u64,
    pub bitmap_offset: u64,
    pub previous_bitmap_offset: u64, // 0 = absent
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CatalogEntry {
    /// Types 0 and 1.
    Empty,
    StoreInfo {
        identifier: Guid,
        volume_size: u64,
        creation_time: u64, // FILETIME
    },
    StoreLocation {
        identifier: Guid,
        location: StoreLocation,
    },
}

impl CatalogEntry {
    pub fn decode(entry: &[u8]) -> Result<Self> {
        if entry.len() < CATALOG_ENTRY_SIZE {
            return Err(VshadowError::format("truncated catalog entry"));
        }
        match read_u64(entry, CE_OFF_TYPE) {
            CATALOG_ENTRY_EMPTY | CATALOG_ENTRY_UNUSED => Ok(CatalogEntry::Empty),
            CATALOG_ENTRY_STORE_INFO => Ok(CatalogEntry::StoreInfo {
                identifier: read_guid(entry, CE_OFF_STORE_IDENTIFIER),
                volume_size: read_u64(entry, CE_OFF_VOLUME_SIZE),
                creation_time: read_u64(entry, CE_OFF_CREATION_TIME),
            }),
            CATALOG_ENTRY_STORE_LOCATION => Ok(CatalogEntry::StoreLocation {
                identifier: read_guid(entry, CE_OFF_STORE_IDENTIFIER),
                location: StoreLocation {
                    block_list_offset: read_u64(entry, CE_OFF_BLOCK_LIST_OFFSET),
                    header_offset: read_u64(entry, CE_OFF_STORE_HEADER_OFFSET),
                    block_range_list_offset: read_u64(entry, CE_OFF_BLOCK_RANGE_LIST_OFFSET),
                    bitmap_offset: read_u64(entry, CE_OFF_BITMAP_OFFSET),
                    previous_bitmap_offset: read_u64(entry, CE_OFF_PREVIOUS_BITMAP_OFFSET),
                },
            }),
            other => Err(VshadowError::format(format!(
                "unsupported catalog entry type {}",
                other
            ))),
        }
    }
}
