//! volume/lock: shared advisory lock on an image opened by path.
//!
//! Cross-platform (fs2). Readers take a shared lock so a cooperating writer
//! holding an exclusive lock is detected at open instead of producing torn
//! metadata. Released on Drop.

use std::fs::File;
use std::path::{Path, PathBuf};

use fs2::FileExt;
use log::debug;

use crate::error::{Result, VshadowError};

pub(crate) struct ImageLock {
    file: File,
    path: PathBuf,
}

impl ImageLock {
    /// Try to take a shared lock on `file` without blocking.
    pub(crate) fn acquire(file: &File, path: &Path) -> Result<Self> {
        let handle = file
            .try_clone()
            .map_err(|e| VshadowError::io(format!("clone handle of {}", path.display()), e))?;
        FileExt::try_lock_shared(&handle).map_err(|e| {
            VshadowError::io(
                format!("image {} is locked by another process", path.display()),
                e,
            )
        })?;
        debug!("lock: shared lock on {}", path.display());
        Ok(Self {
            file: handle,
            path: path.to_path_buf(),
        })
    }

    pub(crate) fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for ImageLock {
    fn drop(&mut self) {
        // unlock errors on drop are ignored
        let _ = FileExt::unlock(&self.file);
        debug!("lock: released {}", self.path.display());
    }
}
