//! volume/open: open/close of a Volume.

use std::fs::File;
use std::path::Path;
use std::sync::atomic::Ordering;

use log::{debug, info};

use crate::catalog::read_catalog;
use crate::error::{Result, VshadowError};
use crate::io::{ReadSeek, Source};
use crate::metrics::{record_volume_closed, record_volume_opened};
use crate::store::{link_chain, read_information, StoreDescriptor};

use super::core::VolumeState;
use super::lock::ImageLock;
use super::{AccessMode, Volume};

impl Volume {
    /// Open the image at `path` for reading.
    pub fn open<P: AsRef<Path>>(&mut self, path: P) -> Result<()> {
        self.open_with_mode(path, AccessMode::Read)
    }

    pub fn open_with_mode<P: AsRef<Path>>(&mut self, path: P, mode: AccessMode) -> Result<()> {
        self.ensure_closed()?;
        if mode != AccessMode::Read {
            return Err(VshadowError::argument(
                "write access is not supported; open with AccessMode::Read",
            ));
        }
        let path = path.as_ref();
        let file = File::open(path)
            .map_err(|e| VshadowError::io(format!("open {}", path.display()), e))?;
        let lock = if self.cfg.lock_image {
            Some(ImageLock::acquire(&file, path)?)
        } else {
            None
        };
        self.open_source(Box::new(file), lock, path.display().to_string())
    }

    /// Open over any seekable reader (file, in-memory image, `BoundedReader`, ...).
    pub fn open_with_reader<R>(&mut self, reader: R) -> Result<()>
    where
        R: ReadSeek + Send + 'static,
    {
        self.ensure_closed()?;
        self.open_source(Box::new(reader), None, "<reader>".to_string())
    }

    /// Release the backing source. Fails with State if the volume is not open.
    pub fn close(&mut self) -> Result<()> {
        let state = self
            .state
            .take()
            .ok_or_else(|| VshadowError::state("close on a volume that is not open"))?;
        let label = state.label.clone();
        if let Some(lock) = &state.lock {
            debug!("volume: releasing lock on {}", lock.path().display());
        }
        drop(state);
        record_volume_closed();
        info!("volume: closed {}", label);
        Ok(())
    }

    fn ensure_closed(&self) -> Result<()> {
        if self.state.is_some() {
            return Err(VshadowError::state("volume is already open; close it first"));
        }
        Ok(())
    }

    fn open_source(
        &mut self,
        reader: Box<dyn ReadSeek + Send>,
        lock: Option<ImageLock>,
        label: String,
    ) -> Result<()> {
        self.abort.store(false, Ordering::Release);

        let src = Source::new(reader)?;
        let catalog = read_catalog(&src, &self.cfg, &self.abort)?;

        let mut stores = Vec::with_capacity(catalog.stores.len());
        for (index, cs) in catalog.stores.into_iter().enumerate() {
            let information = match &cs.location {
                Some(loc) if loc.header_offset != 0 => Some(
                    read_information(&src, loc.header_offset).map_err(|e| match e {
                        VshadowError::Format(msg) => {
                            VshadowError::format(format!("store {}: {}", index, msg))
                        }
                        other => other,
                    })?,
                ),
                _ => None,
            };
            stores.push(StoreDescriptor::from_catalog(index, cs, information));
        }
        link_chain(&mut stores);

        info!(
            "volume: opened {} ({} bytes, header v{}, {} stores)",
            label,
            src.size(),
            catalog.header.version,
            stores.len()
        );
        record_volume_opened();

        self.state = Some(VolumeState {
            src,
            header: catalog.header,
            stores,
            label,
            lock,
        });
        Ok(())
    }
}
