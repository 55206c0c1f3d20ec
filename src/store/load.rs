//! store/load: parse one store's metadata chains.
//!
//! Chains read (each a linked list of 16 KiB store blocks):
//! - current bitmap (type 6) and previous bitmap (type 6, optional)
//! - block list (type 3) → BlockTable
//! - block range list (type 5)
//!
//! Every chain walk is guarded against loops and excessive length and polls
//! the abort flag. The whole load either succeeds or leaves nothing behind.

use std::sync::atomic::AtomicBool;

use log::{debug, warn};

use crate::config::VshadowConfig;
use crate::consts::{
    BLOCK_LIST_ENTRY_SIZE, BLOCK_RANGE_ENTRY_SIZE, BLOCK_SIZE, RECORD_HEADER_SIZE,
    RECORD_TYPE_STORE_BITMAP, RECORD_TYPE_STORE_BLOCK_RANGE, RECORD_TYPE_STORE_INDEX,
};
use crate::error::{Result, VshadowError};
use crate::format::{BlockDescriptor, BlockRange, RecordHeader, StoreInformation, StoreLocation};
use crate::io::Source;
use crate::metrics::{record_block_table, record_store_block};
use crate::util::{AbortPoll, ChainGuard};

use super::bitmap::BlockBitmap;
use super::table::BlockTable;

/// Parsed, immutable per-store metadata.
#[derive(Debug, Default)]
pub(crate) struct StoreData {
    pub table: BlockTable,
    pub ranges: Vec<BlockRange>,
    pub bitmap: BlockBitmap,
    /// None when the store has no previous bitmap (counts as all set).
    pub previous_bitmap: Option<BlockBitmap>,
}

impl StoreData {
    /// Metadata of a store without in-volume data: everything defers.
    pub(crate) fn empty() -> Self {
        Self::default()
    }
}

/// Read the store header block (record type 4) at `offset`.
pub(crate) fn read_information(src: &Source, offset: u64) -> Result<StoreInformation> {
    let block = src.read_record(offset, BLOCK_SIZE as usize, "store header")?;
    record_store_block();
    StoreInformation::decode(&block)
}

pub(crate) struct Loader<'a> {
    pub src: &'a Source,
    pub cfg: &'a VshadowConfig,
    pub abort: &'a AtomicBool,
}

impl<'a> Loader<'a> {
    pub(crate) fn load(&self, store_index: usize, loc: &StoreLocation) -> Result<StoreData> {
        let mut poll = AbortPoll::new(self.abort, self.cfg.poll_interval());

        let mut bitmap = BlockBitmap::new();
        self.walk(
            loc.bitmap_offset,
            RECORD_TYPE_STORE_BITMAP,
            "store bitmap",
            &mut poll,
            |payload| {
                bitmap.extend_from_payload(payload);
                Ok(())
            },
        )?;

        let previous_bitmap = if loc.previous_bitmap_offset != 0 {
            let mut prev = BlockBitmap::new();
            self.walk(
                loc.previous_bitmap_offset,
                RECORD_TYPE_STORE_BITMAP,
                "store previous bitmap",
                &mut poll,
                |payload| {
                    prev.extend_from_payload(payload);
                    Ok(())
                },
            )?;
            Some(prev)
        } else {
            None
        };

        let mut table = BlockTable::new();
        let strict = self.cfg.strict_block_flags;
        self.walk(
            loc.block_list_offset,
            RECORD_TYPE_STORE_INDEX,
            "store block list",
            &mut poll,
            |payload| {
                for entry in payload.chunks_exact(BLOCK_LIST_ENTRY_SIZE) {
                    let Some(d) = BlockDescriptor::decode(entry) else {
                        continue;
                    };
                    let unknown = d.unknown_flags();
                    if unknown != 0 {
                        if strict {
                            return Err(VshadowError::format(format!(
                                "store {}: block descriptor at {:#x} has unknown flags {:#x}",
                                store_index, d.original_offset, unknown
                            )));
                        }
                        warn!(
                            "store {}: block descriptor at {:#x} has unknown flags {:#x}",
                            store_index, d.original_offset, unknown
                        );
                    }
                    table.insert(d);
                }
                Ok(())
            },
        )?;

        let mut ranges = Vec::new();
        self.walk(
            loc.block_range_list_offset,
            RECORD_TYPE_STORE_BLOCK_RANGE,
            "store block range list",
            &mut poll,
            |payload| {
                ranges.extend(
                    payload
                        .chunks_exact(BLOCK_RANGE_ENTRY_SIZE)
                        .filter_map(BlockRange::decode),
                );
                Ok(())
            },
        )?;

        record_block_table(table.descriptors().len());
        debug!(
            "store {}: {} descriptors, {} blocks mapped, {} ranges, {} bitmap bits set",
            store_index,
            table.descriptors().len(),
            table.entry_count(),
            ranges.len(),
            bitmap.count_set()
        );

        Ok(StoreData {
            table,
            ranges,
            bitmap,
            previous_bitmap,
        })
    }

    /// Follow a store block chain from `start` (0 = empty chain) and hand the
    /// payload after the record header of each block to `f`.
    fn walk<F>(
        &self,
        start: u64,
        record_type: u32,
        what: &str,
        poll: &mut AbortPoll<'_>,
        mut f: F,
    ) -> Result<()>
    where
        F: FnMut(&[u8]) -> Result<()>,
    {
        let mut guard = ChainGuard::new(what, self.cfg.max_chain_blocks);
        let mut offset = start;
        while offset != 0 {
            poll.tick(what)?;
            guard.visit(offset)?;
            let block = self.src.read_record(offset, BLOCK_SIZE as usize, what)?;
            let label = format!("{} block at {:#x}", what, offset);
            let rec = RecordHeader::decode_expect(&block, record_type, &label)?;
            record_store_block();
            f(&block[RECORD_HEADER_SIZE..])?;
            offset = rec.next_offset;
        }
        Ok(())
    }
}
