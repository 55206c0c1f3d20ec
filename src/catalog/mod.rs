//! catalog: volume header + catalog chain walk.
//!
//! Produces the stores in on-disk catalog order. Type 2 entries (store
//! information) create a store; type 3 entries (store location) attach the
//! metadata chain offsets to the store with the same identifier. A store
//! without a location entry is still being written ("in progress").

use std::collections::HashMap;
use std::sync::atomic::AtomicBool;

use log::{debug, warn};

use crate::config::VshadowConfig;
use crate::consts::{
    BLOCK_SIZE, CATALOG_ENTRY_SIZE, RECORD_HEADER_SIZE, RECORD_TYPE_CATALOG,
    VOLUME_HEADER_OFFSET, VOLUME_HEADER_SIZE,
};
use crate::error::{Result, VshadowError};
use crate::format::{CatalogEntry, RecordHeader, StoreLocation, VolumeHeader};
use crate::io::Source;
use crate::metrics::record_catalog_block;
use crate::util::{AbortPoll, ChainGuard, Guid};

/// One store as announced by the catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct CatalogStore {
    pub identifier: Guid,
    pub volume_size: u64,
    pub creation_time: u64,
    pub location: Option<StoreLocation>,
}

#[derive(Debug, Clone)]
pub(crate) struct Catalog {
    pub header: VolumeHeader,
    pub stores: Vec<CatalogStore>,
}

pub(crate) fn read_catalog(
    src: &Source,
    cfg: &VshadowConfig,
    abort: &AtomicBool,
) -> Result<Catalog> {
    let hdr_buf = src
        .read_record(VOLUME_HEADER_OFFSET, VOLUME_HEADER_SIZE, "volume header")
        .map_err(|e| match e {
            VshadowError::Format(_) => VshadowError::format(format!(
                "truncated volume header: image of {} bytes",
                src.size()
            )),
            other => other,
        })?;
    let header = VolumeHeader::decode(&hdr_buf)?;
    debug!(
        "catalog: volume header v{} catalog_offset={:#x}",
        header.version, header.catalog_offset
    );

    let mut stores: Vec<CatalogStore> = Vec::new();
    let mut by_id: HashMap<Guid, usize> = HashMap::new();
    let mut guard = ChainGuard::new("catalog", cfg.max_chain_blocks);
    let mut poll = AbortPoll::new(abort, cfg.poll_interval());

    let mut offset = header.catalog_offset;
    while offset != 0 {
        poll.tick("catalog parse")?;
        guard.visit(offset)?;

        let block = src.read_record(offset, BLOCK_SIZE as usize, "catalog block")?;
        let rec = RecordHeader::decode_expect(&block, RECORD_TYPE_CATALOG, "catalog block")?;
        record_catalog_block();

        for (slot, entry) in block[RECORD_HEADER_SIZE..]
            .chunks_exact(CATALOG_ENTRY_SIZE)
            .enumerate()
        {
            let decoded = CatalogEntry::decode(entry).map_err(|e| match e {
                VshadowError::Format(msg) => VshadowError::format(format!(
                    "catalog block {:#x} entry {}: {}",
                    offset, slot, msg
                )),
                other => other,
            })?;
            match decoded {
                CatalogEntry::Empty => {}
                CatalogEntry::StoreInfo {
                    identifier,
                    volume_size,
                    creation_time,
                } => {
                    if by_id.contains_key(&identifier) {
                        return Err(VshadowError::format(format!(
                            "duplicate store identifier {} in catalog",
                            identifier
                        )));
                    }
                    by_id.insert(identifier, stores.len());
                    stores.push(CatalogStore {
                        identifier,
                        volume_size,
                        creation_time,
                        location: None,
                    });
                }
                CatalogEntry::StoreLocation {
                    identifier,
                    location,
                } => match by_id.get(&identifier) {
                    Some(&idx) => {
                        let store = &mut stores[idx];
                        if store.location.is_some() {
                            return Err(VshadowError::format(format!(
                                "duplicate location entry for store {}",
                                identifier
                            )));
                        }
                        store.location = Some(location);
                    }
                    None => {
                        warn!(
                            "catalog: location entry for unknown store {} ignored",
                            identifier
                        );
                    }
                },
            }
        }

        debug!(
            "catalog: block {:#x} parsed, next={:#x}, stores so far {}",
            offset,
            rec.next_offset,
            stores.len()
        );
        offset = rec.next_offset;
    }

    for s in stores.iter().filter(|s| s.location.is_none()) {
        warn!(
            "catalog: store {} has no in-volume data (in progress)",
            s.identifier
        );
    }
    debug!("catalog: {} blocks, {} stores", guard.len(), stores.len());

    Ok(Catalog { header, stores })
}
