//! format/common: field offsets and small helpers shared by the record decoders.

use byteorder::{ByteOrder, LittleEndian};

use crate::consts::{VSS_IDENTIFIER, VSS_IDENTIFIER_CMP_LEN};
use crate::util::Guid;

// -------- Record header (catalog and store blocks, volume header prefix) --------
pub const OFF_IDENTIFIER: usize = 0; // 16 bytes
pub const OFF_VERSION: usize = 16; // u32
pub const OFF_RECORD_TYPE: usize = 20; // u32
pub const OFF_RELATIVE_OFFSET: usize = 24; // u64
pub const OFF_OFFSET: usize = 32; // u64
pub const OFF_NEXT_OFFSET: usize = 40; // u64

// -------- Volume header --------
pub const VH_OFF_CATALOG_OFFSET: usize = 48; // u64
pub const VH_OFF_MAXIMUM_SIZE: usize = 56; // u64
pub const VH_OFF_VOLUME_IDENTIFIER: usize = 64; // GUID
pub const VH_OFF_STORE_VOLUME_IDENTIFIER: usize = 80; // GUID

// -------- Catalog entries (relative to entry start) --------
pub const CE_OFF_TYPE: usize = 0; // u64
// type 2
pub const CE_OFF_VOLUME_SIZE: usize = 8; // u64
pub const CE_OFF_STORE_IDENTIFIER: usize = 16; // GUID (types 2 and 3)
pub const CE_OFF_CREATION_TIME: usize = 48; // FILETIME
// type 3
pub const CE_OFF_BLOCK_LIST_OFFSET: usize = 8; // u64
pub const CE_OFF_STORE_HEADER_OFFSET: usize = 32; // u64
pub const CE_OFF_BLOCK_RANGE_LIST_OFFSET: usize = 40; // u64
pub const CE_OFF_BITMAP_OFFSET: usize = 48; // u64
pub const CE_OFF_PREVIOUS_BITMAP_OFFSET: usize = 72; // u64

// -------- Block list entry --------
pub const BL_OFF_ORIGINAL_OFFSET: usize = 0; // u64
pub const BL_OFF_RELATIVE_OFFSET: usize = 8; // u64
pub const BL_OFF_OFFSET: usize = 16; // u64
pub const BL_OFF_FLAGS: usize = 24; // u32
pub const BL_OFF_BITMAP: usize = 28; // u32

// -------- Block range entry --------
pub const BR_OFF_OFFSET: usize = 0; // u64
pub const BR_OFF_RELATIVE_OFFSET: usize = 8; // u64
pub const BR_OFF_SIZE: usize = 16; // u64

// -------- Store information (relative to the end of the record header) --------
pub const SI_OFF_COPY_IDENTIFIER: usize = 16; // GUID
pub const SI_OFF_COPY_SET_IDENTIFIER: usize = 32; // GUID
pub const SI_OFF_TYPE: usize = 48; // u32
pub const SI_OFF_PROVIDER: usize = 52; // u32
pub const SI_OFF_ATTRIBUTE_FLAGS: usize = 56; // u32

#[inline]
pub fn read_u32(buf: &[u8], off: usize) -> u32 {
    LittleEndian::read_u32(&buf[off..off + 4])
}

#[inline]
pub fn read_u64(buf: &[u8], off: usize) -> u64 {
    LittleEndian::read_u64(&buf[off..off + 8])
}

#[inline]
pub fn read_guid(buf: &[u8], off: usize) -> Guid {
    let mut g = [0u8; 16];
    g.copy_from_slice(&buf[off..off + 16]);
    Guid(g)
}

/// Compare the leading identifier bytes of a record against the VSS identifier.
#[inline]
pub fn has_vss_identifier(buf: &[u8]) -> bool {
    buf.len() >= VSS_IDENTIFIER_CMP_LEN
        && buf[OFF_IDENTIFIER..OFF_IDENTIFIER + VSS_IDENTIFIER_CMP_LEN]
            == VSS_IDENTIFIER[..VSS_IDENTIFIER_CMP_LEN]
}
