//! volume/core: state of an open volume.

use std::sync::atomic::AtomicBool;

use crate::config::VshadowConfig;
use crate::format::VolumeHeader;
use crate::io::Source;
use crate::resolver::Resolver;
use crate::store::{Loader, StoreDescriptor};

use super::lock::ImageLock;

pub(crate) struct VolumeState {
    pub src: Source,
    pub header: VolumeHeader,
    pub stores: Vec<StoreDescriptor>,
    /// Path or "<reader>", for log messages.
    pub label: String,
    pub lock: Option<ImageLock>,
}

impl VolumeState {
    pub(crate) fn loader<'a>(
        &'a self,
        cfg: &'a VshadowConfig,
        abort: &'a AtomicBool,
    ) -> Loader<'a> {
        Loader {
            src: &self.src,
            cfg,
            abort,
        }
    }

    pub(crate) fn resolver<'a>(
        &'a self,
        cfg: &'a VshadowConfig,
        abort: &'a AtomicBool,
    ) -> Resolver<'a> {
        Resolver {
            src: &self.src,
            stores: &self.stores,
            cfg,
            abort,
        }
    }
}
