//! volume/store: handle to one store of an open volume.

use std::fmt;
use std::time::SystemTime;

use crate::error::{Result, VshadowError};
use crate::format::BlockDescriptor;
use crate::reader::StoreReader;
use crate::resolver::ReadPlan;
use crate::store::{StoreData, StoreDescriptor, StoreInfo};
use crate::util::{filetime_to_system_time, Guid};

use super::core::VolumeState;
use super::Volume;

/// Borrowed view of one store. Cheap to copy; all readers of the same store
/// share its parsed block table.
#[derive(Clone, Copy)]
pub struct Store<'v> {
    volume: &'v Volume,
    state: &'v VolumeState,
    index: usize,
}

impl<'v> Store<'v> {
    pub(crate) fn new(volume: &'v Volume, state: &'v VolumeState, index: usize) -> Self {
        Self {
            volume,
            state,
            index,
        }
    }

    #[inline]
    fn desc(&self) -> &'v StoreDescriptor {
        &self.state.stores[self.index]
    }

    fn data(&self) -> Result<&'v StoreData> {
        let state: &'v VolumeState = self.state;
        let loader = state.loader(self.volume.config(), self.volume.abort_flag());
        state.stores[self.index].data(&loader)
    }

    // ----- Identity -----

    /// Zero-based catalog index.
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn identifier(&self) -> Guid {
        self.desc().identifier
    }

    pub fn copy_identifier(&self) -> Option<Guid> {
        self.desc().information.as_ref().map(|i| i.copy_identifier)
    }

    pub fn copy_set_identifier(&self) -> Option<Guid> {
        self.desc().information.as_ref().map(|i| i.copy_set_identifier)
    }

    pub fn attribute_flags(&self) -> u32 {
        self.desc()
            .information
            .as_ref()
            .map_or(0, |i| i.attribute_flags)
    }

    pub fn operating_machine(&self) -> Option<&'v str> {
        self.desc()
            .information
            .as_ref()
            .map(|i| i.operating_machine.as_str())
    }

    pub fn service_machine(&self) -> Option<&'v str> {
        self.desc()
            .information
            .as_ref()
            .map(|i| i.service_machine.as_str())
    }

    // ----- Time / geometry -----

    /// Creation time as FILETIME.
    pub fn creation_time(&self) -> u64 {
        self.desc().creation_time
    }

    pub fn creation_system_time(&self) -> SystemTime {
        filetime_to_system_time(self.desc().creation_time)
    }

    /// Size of the volume when the snapshot was taken; the readable length of this store.
    pub fn size(&self) -> u64 {
        self.desc().volume_size
    }

    /// Size of the live volume, for comparison with `size()`.
    pub fn volume_size(&self) -> u64 {
        self.state.src.size()
    }

    /// False for a store that is still being written.
    pub fn has_in_volume_data(&self) -> bool {
        self.desc().has_in_volume_data()
    }

    /// Index of the store created right after this one, if any.
    pub fn next_newer(&self) -> Option<usize> {
        self.desc().newer
    }

    pub fn next_older(&self) -> Option<usize> {
        self.desc().older
    }

    // ----- Block table -----

    /// Number of block descriptors in the store's block list (parses it on first use).
    pub fn number_of_blocks(&self) -> Result<usize> {
        Ok(self.data()?.table.descriptors().len())
    }

    pub fn block(&self, index: i64) -> Result<BlockDescriptor> {
        let descriptors = self.data()?.table.descriptors();
        if index < 0 || index as u64 >= descriptors.len() as u64 {
            return Err(VshadowError::argument(format!(
                "block index {} out of range [0, {})",
                index,
                descriptors.len()
            )));
        }
        Ok(descriptors[index as usize])
    }

    pub fn number_of_block_ranges(&self) -> Result<usize> {
        Ok(self.data()?.ranges.len())
    }

    /// Attribute-style snapshot of all properties.
    pub fn info(&self) -> Result<StoreInfo> {
        Ok(StoreInfo {
            index: self.index(),
            identifier: self.identifier(),
            copy_identifier: self.copy_identifier(),
            copy_set_identifier: self.copy_set_identifier(),
            creation_time: self.creation_time(),
            volume_size: self.size(),
            attribute_flags: self.attribute_flags(),
            operating_machine: self.operating_machine().map(str::to_owned),
            service_machine: self.service_machine().map(str::to_owned),
            has_in_volume_data: self.has_in_volume_data(),
            number_of_blocks: self.number_of_blocks()?,
        })
    }

    // ----- Reading -----

    /// Resolve `[offset, offset + length)` (clipped to `size()`) without reading.
    pub fn read_plan(&self, offset: u64, length: u64) -> Result<ReadPlan> {
        self.state
            .resolver(self.volume.config(), self.volume.abort_flag())
            .resolve(self.index, offset, length)
    }

    /// Read into `buf` from `offset`; returns the number of bytes filled
    /// (short at the end of the store, 0 at or past it).
    pub fn read_into(&self, offset: u64, buf: &mut [u8]) -> Result<usize> {
        let plan = self.read_plan(offset, buf.len() as u64)?;
        let n = plan.length as usize;
        plan.execute(&self.state.src, &mut buf[..n])?;
        Ok(n)
    }

    /// New independent cursor at offset 0.
    pub fn reader(&self) -> StoreReader<'v> {
        StoreReader::new(*self)
    }
}

impl fmt::Debug for Store<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Store")
            .field("index", &self.index)
            .field("identifier", &self.identifier())
            .field("size", &self.size())
            .field("creation_time", &self.creation_time())
            .field("has_in_volume_data", &self.has_in_volume_data())
            .finish()
    }
}
