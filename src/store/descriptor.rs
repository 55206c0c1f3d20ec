//! store/descriptor: arena of stores with explicit chain links.
//!
//! Stores keep catalog order (their public index). The resolution chain runs
//! by creation time: `newer` points at the store created next (ties broken by
//! catalog position), the newest store has `newer == None` and defers to the
//! live volume.

use std::sync::OnceLock;

use crate::catalog::CatalogStore;
use crate::error::Result;
use crate::format::{StoreInformation, StoreLocation};
use crate::util::Guid;

use super::load::{Loader, StoreData};

#[derive(Debug)]
pub(crate) struct StoreDescriptor {
    pub index: usize,
    pub identifier: Guid,
    pub volume_size: u64,
    pub creation_time: u64,
    pub location: Option<StoreLocation>,
    pub information: Option<StoreInformation>,
    pub newer: Option<usize>,
    pub older: Option<usize>,
    data: OnceLock<StoreData>,
}

impl StoreDescriptor {
    pub(crate) fn from_catalog(
        index: usize,
        cs: CatalogStore,
        information: Option<StoreInformation>,
    ) -> Self {
        Self {
            index,
            identifier: cs.identifier,
            volume_size: cs.volume_size,
            creation_time: cs.creation_time,
            location: cs.location,
            information,
            newer: None,
            older: None,
            data: OnceLock::new(),
        }
    }

    #[inline]
    pub(crate) fn has_in_volume_data(&self) -> bool {
        self.location.is_some()
    }

    /// Parsed metadata, loaded on first use. A failed load leaves the cell
    /// empty so the next access retries.
    pub(crate) fn data(&self, loader: &Loader<'_>) -> Result<&StoreData> {
        if let Some(d) = self.data.get() {
            return Ok(d);
        }
        let parsed = match &self.location {
            Some(loc) => loader.load(self.index, loc)?,
            None => StoreData::empty(),
        };
        Ok(self.data.get_or_init(|| parsed))
    }

    #[cfg(test)]
    pub(crate) fn is_loaded(&self) -> bool {
        self.data.get().is_some()
    }
}

/// Fill `newer`/`older` links by creation time.
pub(crate) fn link_chain(stores: &mut [StoreDescriptor]) {
    let mut order: Vec<usize> = (0..stores.len()).collect();
    order.sort_by_key(|&i| (stores[i].creation_time, i));
    for w in order.windows(2) {
        let (older, newer) = (w[0], w[1]);
        stores[older].newer = Some(newer);
        stores[newer].older = Some(older);
    }
}
