//! Format constants shared by the record decoders (volume header, catalog, store blocks).

// -------- Identification --------

/// VSS identifier GUID {3808876b-c176-4e48-b7ae-04046e6cc752} in on-disk byte order.
pub const VSS_IDENTIFIER: [u8; 16] = [
    0x6b, 0x87, 0x08, 0x38, 0x76, 0xc1, 0x48, 0x4e, 0xb7, 0xae, 0x04, 0x04, 0x6e, 0x6c, 0xc7, 0x52,
];
/// Only this many leading identifier bytes are compared when validating a record.
pub const VSS_IDENTIFIER_CMP_LEN: usize = 8;

// -------- Volume header --------
pub const VOLUME_HEADER_OFFSET: u64 = 0x1e00;
pub const VOLUME_HEADER_SIZE: usize = 512;

// -------- Blocks --------

/// Size of catalog and store blocks; also the overlay granularity of the volume.
pub const BLOCK_SIZE: u64 = 0x4000;
/// Every catalog/store block starts with a 128-byte record header.
pub const RECORD_HEADER_SIZE: usize = 128;

/// Overlay bitmaps describe a block in 512-byte sectors, one bit per sector.
pub const OVERLAY_SECTOR_SIZE: u64 = 512;
pub const OVERLAY_SECTORS_PER_BLOCK: u32 = 32;

// -------- Record types --------
pub const RECORD_TYPE_VOLUME_HEADER: u32 = 1;
pub const RECORD_TYPE_CATALOG: u32 = 2;
pub const RECORD_TYPE_STORE_INDEX: u32 = 3;
pub const RECORD_TYPE_STORE_HEADER: u32 = 4;
pub const RECORD_TYPE_STORE_BLOCK_RANGE: u32 = 5;
pub const RECORD_TYPE_STORE_BITMAP: u32 = 6;

// -------- Versions --------
pub const VOLUME_HEADER_VERSIONS: [u32; 2] = [1, 2];
pub const RECORD_VERSION: u32 = 1;

// -------- Catalog entries --------
pub const CATALOG_ENTRY_SIZE: usize = 128;
pub const CATALOG_ENTRY_EMPTY: u64 = 0;
pub const CATALOG_ENTRY_UNUSED: u64 = 1;
pub const CATALOG_ENTRY_STORE_INFO: u64 = 2;
pub const CATALOG_ENTRY_STORE_LOCATION: u64 = 3;

// -------- Store lists --------
pub const BLOCK_LIST_ENTRY_SIZE: usize = 32;
pub const BLOCK_RANGE_ENTRY_SIZE: usize = 24;

// Block descriptor flags
pub const BLOCK_FLAG_IS_FORWARDER: u32 = 0x0000_0001;
pub const BLOCK_FLAG_IS_OVERLAY: u32 = 0x0000_0002;
pub const BLOCK_FLAG_NOT_USED: u32 = 0x0000_0004;
pub const BLOCK_FLAGS_KNOWN: u32 =
    BLOCK_FLAG_IS_FORWARDER | BLOCK_FLAG_IS_OVERLAY | BLOCK_FLAG_NOT_USED;

// -------- Store header --------

/// Size of the fixed store information part that follows the record header.
pub const STORE_INFORMATION_SIZE: usize = 64;
