//! store: store arena, lazily parsed block tables and bitmaps.
//!
//! - descriptor: StoreDescriptor (arena element, chain links, once-initialized data)
//! - load: block list / range list / bitmap chain parsing
//! - table: forward/reverse block maps with the insert rules of the format
//! - bitmap: one bit per 16 KiB block

mod bitmap;
mod descriptor;
mod load;
mod table;

use std::time::SystemTime;

pub use crate::format::{BlockDescriptor, BlockRange};
use crate::util::{filetime_to_system_time, Guid};

pub(crate) use descriptor::{link_chain, StoreDescriptor};
pub(crate) use load::{read_information, Loader, StoreData};
pub(crate) use table::TableEntry;

/// Read-only view of a store's properties. Built from the same accessors as
/// `Store`, so both forms always agree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreInfo {
    pub index: usize,
    pub identifier: Guid,
    pub copy_identifier: Option<Guid>,
    pub copy_set_identifier: Option<Guid>,
    /// FILETIME (100ns ticks since 1601-01-01 UTC).
    pub creation_time: u64,
    /// Size of the volume when the snapshot was taken.
    pub volume_size: u64,
    pub attribute_flags: u32,
    pub operating_machine: Option<String>,
    pub service_machine: Option<String>,
    pub has_in_volume_data: bool,
    pub number_of_blocks: usize,
}

impl StoreInfo {
    pub fn creation_system_time(&self) -> SystemTime {
        filetime_to_system_time(self.creation_time)
    }
}
