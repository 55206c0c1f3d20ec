//! format/record: 128-byte header shared by catalog and store blocks.
//!
//! Layout: identifier[16], version u32, record_type u32, relative_offset u64,
//! offset u64, next_offset u64 (0 ends the chain), 80 bytes opaque.

use crate::consts::{RECORD_HEADER_SIZE, RECORD_VERSION};
use crate::error::{Result, VshadowError};

use super::common::{
    has_vss_identifier, read_u32, read_u64, OFF_NEXT_OFFSET, OFF_OFFSET, OFF_RECORD_TYPE,
    OFF_RELATIVE_OFFSET, OFF_VERSION,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordHeader {
    pub version: u32,
    pub record_type: u32,
    pub relative_offset: u64,
    pub offset: u64,
    pub next_offset: u64,
}

impl RecordHeader {
    /// Decode and validate signature, version and record type.
    /// `what` names the chain for error messages ("catalog block", "store bitmap", ...).
    pub fn decode_expect(buf: &[u8], expected_type: u32, what: &str) -> Result<Self> {
        if buf.len() < RECORD_HEADER_SIZE {
            return Err(VshadowError::format(format!("truncated {} header", what)));
        }
        if !has_vss_identifier(buf) {
            return Err(VshadowError::format(format!("bad {} signature", what)));
        }
        let version = read_u32(buf, OFF_VERSION);
        if version != RECORD_VERSION {
            return Err(VshadowError::format(format!(
                "unsupported {} version {}",
                what, version
            )));
        }
        let record_type = read_u32(buf, OFF_RECORD_TYPE);
        if record_type != expected_type {
            return Err(VshadowError::format(format!(
                "unexpected {} record type {} (want {})",
                what, record_type, expected_type
            )));
        }
        Ok(Self {
            version,
            record_type,
            relative_offset: read_u64(buf, OFF_RELATIVE_OFFSET),
            offset: read_u64(buf, OFF_OFFSET),
            next_offset: read_u64(buf, OFF_NEXT_OFFSET),
        })
    }
}
