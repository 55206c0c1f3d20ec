//! format/volume_header: the 512-byte VSS volume header at 0x1e00.

use crate::consts::{RECORD_TYPE_VOLUME_HEADER, VOLUME_HEADER_SIZE, VOLUME_HEADER_VERSIONS};
use crate::error::{Result, VshadowError};
use crate::util::Guid;

use super::common::{
    has_vss_identifier, read_guid, read_u32, read_u64, OFF_RECORD_TYPE, OFF_VERSION,
    VH_OFF_CATALOG_OFFSET, VH_OFF_MAXIMUM_SIZE, VH_OFF_STORE_VOLUME_IDENTIFIER,
    VH_OFF_VOLUME_IDENTIFIER,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VolumeHeader {
    pub version: u32,        // 1 or 2
    pub catalog_offset: u64, // 0 = VSS volume without stores
    pub maximum_size: u64,
    pub volume_identifier: Guid,
    pub store_volume_identifier: Guid,
}

impl VolumeHeader {
    pub fn decode(buf: &[u8]) -> Result<Self> {
        if buf.len() < VOLUME_HEADER_SIZE {
            return Err(VshadowError::format(format!(
                "truncated volume header: {} of {} bytes",
                buf.len(),
                VOLUME_HEADER_SIZE
            )));
        }
        if !has_vss_identifier(buf) {
            return Err(VshadowError::format(
                "bad volume header signature (not a VSS volume)",
            ));
        }
        let version = read_u32(buf, OFF_VERSION);
        if !VOLUME_HEADER_VERSIONS.contains(&version) {
            return Err(VshadowError::format(format!(
                "unsupported volume header version {}",
                version
            )));
        }
        let record_type = read_u32(buf, OFF_RECORD_TYPE);
        if record_type != RECORD_TYPE_VOLUME_HEADER {
            return Err(VshadowError::format(format!(
                "unsupported volume header record type {}",
                record_type
            )));
        }
        Ok(Self {
            version,
            catalog_offset: read_u64(buf, VH_OFF_CATALOG_OFFSET),
            maximum_size: read_u64(buf, VH_OFF_MAXIMUM_SIZE),
            volume_identifier: read_guid(buf, VH_OFF_VOLUME_IDENTIFIER),
            store_volume_identifier: read_guid(buf, VH_OFF_STORE_VOLUME_IDENTIFIER),
        })
    }
}
