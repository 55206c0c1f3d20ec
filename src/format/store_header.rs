//! format/store_header: store information inside the store header block (type 4).

use byteorder::{ByteOrder, LittleEndian};

use crate::consts::{RECORD_HEADER_SIZE, RECORD_TYPE_STORE_HEADER, STORE_INFORMATION_SIZE};
use crate::error::{Result, VshadowError};
use crate::util::{utf16le_to_string, Guid};

use super::common::{
    read_guid, read_u32, SI_OFF_ATTRIBUTE_FLAGS, SI_OFF_COPY_IDENTIFIER,
    SI_OFF_COPY_SET_IDENTIFIER, SI_OFF_PROVIDER, SI_OFF_TYPE,
};
use super::record::RecordHeader;

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct StoreInformation {
    pub copy_identifier: Guid,
    pub copy_set_identifier: Guid,
    pub store_type: u32,
    pub provider: u32,
    pub attribute_flags: u32,
    pub operating_machine: String,
    pub service_machine: String,
}

impl StoreInformation {
    /// Decode a whole store header block (record header included).
    pub fn decode(block: &[u8]) -> Result<Self> {
        RecordHeader::decode_expect(block, RECORD_TYPE_STORE_HEADER, "store header")?;
        let info_end = RECORD_HEADER_SIZE + STORE_INFORMATION_SIZE;
        if block.len() < info_end {
            return Err(VshadowError::format("truncated store information"));
        }
        let info = &block[RECORD_HEADER_SIZE..info_end];

        let mut pos = info_end;
        let operating_machine = read_sized_utf16(block, &mut pos, "operating machine")?;
        let service_machine = read_sized_utf16(block, &mut pos, "service machine")?;

        Ok(Self {
            copy_identifier: read_guid(info, SI_OFF_COPY_IDENTIFIER),
            copy_set_identifier: read_guid(info, SI_OFF_COPY_SET_IDENTIFIER),
            store_type: read_u32(info, SI_OFF_TYPE),
            provider: read_u32(info, SI_OFF_PROVIDER),
            attribute_flags: read_u32(info, SI_OFF_ATTRIBUTE_FLAGS),
            operating_machine,
            service_machine,
        })
    }
}

/// u16 byte size followed by UTF-16LE data; advances `pos`.
fn read_sized_utf16(block: &[u8], pos: &mut usize, what: &str) -> Result<String> {
    let size_end = *pos + 2;
    if size_end > block.len() {
        return Err(VshadowError::format(format!(
            "{} string size runs past the store header block",
            what
        )));
    }
    let size = LittleEndian::read_u16(&block[*pos..size_end]) as usize;
    let data_end = size_end + size;
    if data_end > block.len() {
        return Err(VshadowError::format(format!(
            "{} string ({} bytes) runs past the store header block",
            what, size
        )));
    }
    *pos = data_end;
    Ok(utf16le_to_string(&block[size_end..data_end]))
}
