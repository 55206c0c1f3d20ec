//! volume: high-level API: open an image, enumerate its stores.
//!
//! Split into submodules:
//! - core.rs  : VolumeState (backing source, header, store arena)
//! - open.rs  : open/open_with_mode/open_with_reader/close
//! - store.rs : Store handle (metadata accessors, read plans)
//! - lock.rs  : shared advisory lock for images opened by path
//!
//! Lifetimes: `Store<'v>` and readers borrow the Volume, so `close()` (which
//! needs `&mut self`) cannot run while any of them is alive.

mod core;
mod lock;
mod open;
mod store;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::config::{VolumeBuilder, VshadowConfig};
use crate::consts::BLOCK_SIZE;
use crate::error::{Result, VshadowError};
use crate::util::Guid;

pub(crate) use self::core::VolumeState;
pub use self::store::Store;

/// Open intent. Only `Read` is supported; the format is consumed read-only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessMode {
    Read,
    ReadWrite,
}

/// Cloneable handle to a volume's abort flag, usable from other threads.
#[derive(Debug, Clone)]
pub struct AbortHandle {
    flag: Arc<AtomicBool>,
}

impl AbortHandle {
    pub fn signal(&self) {
        self.flag.store(true, Ordering::Release);
    }

    pub fn reset(&self) {
        self.flag.store(false, Ordering::Release);
    }

    pub fn is_signalled(&self) -> bool {
        self.flag.load(Ordering::Acquire)
    }
}

pub struct Volume {
    cfg: VshadowConfig,
    abort: Arc<AtomicBool>,
    state: Option<VolumeState>,
}

impl std::fmt::Debug for Volume {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Volume")
            .field("cfg", &self.cfg)
            .field("open", &self.state.is_some())
            .finish_non_exhaustive()
    }
}

impl Default for Volume {
    fn default() -> Self {
        Self::new()
    }
}

impl Volume {
    /// Unopened volume configured from the environment.
    pub fn new() -> Self {
        Self::with_config(VshadowConfig::from_env())
    }

    pub fn with_config(cfg: VshadowConfig) -> Self {
        Self {
            cfg,
            abort: Arc::new(AtomicBool::new(false)),
            state: None,
        }
    }

    pub fn builder() -> VolumeBuilder {
        VolumeBuilder::new()
    }

    pub fn config(&self) -> &VshadowConfig {
        &self.cfg
    }

    #[inline]
    pub fn is_open(&self) -> bool {
        self.state.is_some()
    }

    pub(crate) fn state(&self) -> Result<&VolumeState> {
        self.state
            .as_ref()
            .ok_or_else(|| VshadowError::state("volume is not open"))
    }

    // ----- Abort -----

    /// Ask in-progress parses and reads to stop. Idempotent; the flag stays
    /// set until `reset_abort()` or the next `open`.
    pub fn signal_abort(&self) {
        self.abort.store(true, Ordering::Release);
    }

    pub fn reset_abort(&self) {
        self.abort.store(false, Ordering::Release);
    }

    pub fn abort_handle(&self) -> AbortHandle {
        AbortHandle {
            flag: Arc::clone(&self.abort),
        }
    }

    // ----- Geometry -----

    /// Size of the live volume (the backing source).
    pub fn size(&self) -> Result<u64> {
        Ok(self.state()?.src.size())
    }

    /// Block granularity of the store tables.
    pub fn block_size(&self) -> u64 {
        BLOCK_SIZE
    }

    pub fn volume_identifier(&self) -> Result<Guid> {
        Ok(self.state()?.header.volume_identifier)
    }

    pub fn header_version(&self) -> Result<u32> {
        Ok(self.state()?.header.version)
    }

    // ----- Stores -----

    pub fn number_of_stores(&self) -> Result<usize> {
        Ok(self.state()?.stores.len())
    }

    /// Store by zero-based catalog index. Negative or too large → Argument.
    pub fn store(&self, index: i64) -> Result<Store<'_>> {
        let state = self.state()?;
        let count = state.stores.len();
        if index < 0 || index as u64 >= count as u64 {
            return Err(VshadowError::argument(format!(
                "store index {} out of range [0, {})",
                index, count
            )));
        }
        Ok(Store::new(self, state, index as usize))
    }

    pub fn stores(&self) -> Result<impl Iterator<Item = Store<'_>> + '_> {
        let state = self.state()?;
        Ok((0..state.stores.len()).map(move |i| Store::new(self, state, i)))
    }

    pub fn store_by_identifier(&self, identifier: &Guid) -> Result<Option<Store<'_>>> {
        let state = self.state()?;
        Ok(state
            .stores
            .iter()
            .position(|s| &s.identifier == identifier)
            .map(|i| Store::new(self, state, i)))
    }

    pub(crate) fn abort_flag(&self) -> &AtomicBool {
        &self.abort
    }
}

impl Drop for Volume {
    fn drop(&mut self) {
        if self.state.is_some() {
            let _ = self.close();
        }
    }
}
