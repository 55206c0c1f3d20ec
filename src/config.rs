//! Centralized configuration and builder for volume parsing.
//!
//! Goals:
//! - Single place to collect tunables instead of scattering env lookups.
//! - VshadowConfig::from_env() reads the VSHADOW_* variables; Default ignores env.
//! - VolumeBuilder produces a configured (not yet opened) Volume.
//!
//! Tunables:
//! - max_chain_blocks (ENV VSHADOW_MAX_CHAIN_BLOCKS) : guard on any catalog/store block chain.
//! - abort_poll_interval (ENV VSHADOW_ABORT_POLL_INTERVAL) : blocks between abort-flag polls.
//! - zero_fill_unused_blocks (ENV VSHADOW_ZERO_FILL_UNUSED) : read blocks that were unused
//!   at snapshot time as zeros instead of passing through to the live volume.
//! - strict_block_flags (ENV VSHADOW_STRICT_BLOCK_FLAGS) : reject unknown block descriptor flags.
//! - lock_image (ENV VSHADOW_LOCK_IMAGE) : shared advisory lock on images opened by path.

use std::fmt;

use crate::util::{env_flag, env_parse};
use crate::volume::Volume;

/// Top-level configuration for a Volume.
#[derive(Clone, Debug)]
pub struct VshadowConfig {
    /// Upper bound on the number of blocks in any on-disk block chain.
    /// Env: VSHADOW_MAX_CHAIN_BLOCKS (default 1_000_000)
    pub max_chain_blocks: usize,

    /// Number of chain blocks (parsing) or resolved blocks (reading) between
    /// two polls of the abort flag. Clamped to at least 1.
    /// Env: VSHADOW_ABORT_POLL_INTERVAL (default 64)
    pub abort_poll_interval: usize,

    /// Blocks flagged unused in the newest store's bitmaps read as zeros.
    /// Env: VSHADOW_ZERO_FILL_UNUSED = 0|1 (default 1)
    pub zero_fill_unused_blocks: bool,

    /// Unknown block descriptor flag bits fail the block table parse instead of a warning.
    /// Env: VSHADOW_STRICT_BLOCK_FLAGS = 0|1 (default 0)
    pub strict_block_flags: bool,

    /// Take a shared fs2 lock on images opened by path.
    /// Env: VSHADOW_LOCK_IMAGE = 0|1 (default 1)
    pub lock_image: bool,
}

impl Default for VshadowConfig {
    fn default() -> Self {
        Self {
            max_chain_blocks: 1_000_000,
            abort_poll_interval: 64,
            zero_fill_unused_blocks: true,
            strict_block_flags: false,
            lock_image: true,
        }
    }
}

impl VshadowConfig {
    /// Load configuration from environment variables on top of the defaults.
    pub fn from_env() -> Self {
        let mut cfg = Self::default();

        if let Some(n) = env_parse::<usize>("VSHADOW_MAX_CHAIN_BLOCKS") {
            cfg.max_chain_blocks = n;
        }
        if let Some(n) = env_parse::<usize>("VSHADOW_ABORT_POLL_INTERVAL") {
            cfg.abort_poll_interval = n.max(1);
        }
        if let Some(on) = env_flag("VSHADOW_ZERO_FILL_UNUSED") {
            cfg.zero_fill_unused_blocks = on;
        }
        if let Some(on) = env_flag("VSHADOW_STRICT_BLOCK_FLAGS") {
            cfg.strict_block_flags = on;
        }
        if let Some(on) = env_flag("VSHADOW_LOCK_IMAGE") {
            cfg.lock_image = on;
        }

        cfg
    }

    pub fn with_max_chain_blocks(mut self, n: usize) -> Self {
        self.max_chain_blocks = n;
        self
    }

    pub fn with_abort_poll_interval(mut self, n: usize) -> Self {
        self.abort_poll_interval = n.max(1);
        self
    }

    pub fn with_zero_fill_unused_blocks(mut self, on: bool) -> Self {
        self.zero_fill_unused_blocks = on;
        self
    }

    pub fn with_strict_block_flags(mut self, on: bool) -> Self {
        self.strict_block_flags = on;
        self
    }

    pub fn with_lock_image(mut self, on: bool) -> Self {
        self.lock_image = on;
        self
    }

    #[inline]
    pub(crate) fn poll_interval(&self) -> usize {
        self.abort_poll_interval.max(1)
    }
}

impl fmt::Display for VshadowConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "VshadowConfig {{ \
             max_chain_blocks: {}, \
             abort_poll_interval: {}, \
             zero_fill_unused_blocks: {}, \
             strict_block_flags: {}, \
             lock_image: {} \
             }}",
            self.max_chain_blocks,
            self.abort_poll_interval,
            self.zero_fill_unused_blocks,
            self.strict_block_flags,
            self.lock_image,
        )
    }
}

/// Builder that produces a configured, not yet opened, Volume.
/// `Volume::builder()` returns this builder.
#[derive(Clone, Debug)]
pub struct VolumeBuilder {
    cfg: VshadowConfig,
}

impl Default for VolumeBuilder {
    fn default() -> Self {
        // Start from env, then allow overrides.
        Self {
            cfg: VshadowConfig::from_env(),
        }
    }
}

impl VolumeBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from a clean default (without reading env).
    pub fn from_default() -> Self {
        Self {
            cfg: VshadowConfig::default(),
        }
    }

    pub fn max_chain_blocks(mut self, n: usize) -> Self {
        self.cfg.max_chain_blocks = n;
        self
    }

    pub fn abort_poll_interval(mut self, n: usize) -> Self {
        self.cfg.abort_poll_interval = n.max(1);
        self
    }

    pub fn zero_fill_unused_blocks(mut self, on: bool) -> Self {
        self.cfg.zero_fill_unused_blocks = on;
        self
    }

    pub fn strict_block_flags(mut self, on: bool) -> Self {
        self.cfg.strict_block_flags = on;
        self
    }

    pub fn lock_image(mut self, on: bool) -> Self {
        self.cfg.lock_image = on;
        self
    }

    pub fn config(&self) -> &VshadowConfig {
        &self.cfg
    }

    /// Finish the builder and obtain an unopened Volume.
    pub fn build(self) -> Volume {
        Volume::with_config(self.cfg)
    }
}
