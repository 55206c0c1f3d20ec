//! io/source: serialized positioned reads over the single backing handle.
//!
//! Every metadata and data read of a volume goes through one `Source`. The
//! handle sits behind a mutex: seek + read_exact happen under the same guard,
//! so concurrent store readers never interleave their cursor moves.

use std::io::{ErrorKind as IoErrorKind, SeekFrom};
use std::sync::Mutex;

use log::debug;

use crate::error::{Result, VshadowError};

use super::ReadSeek;

pub(crate) struct Source {
    inner: Mutex<Box<dyn ReadSeek + Send>>,
    size: u64,
}

impl Source {
    /// Take ownership of the reader and probe its size (seek to end).
    pub(crate) fn new(mut reader: Box<dyn ReadSeek + Send>) -> Result<Self> {
        let size = reader
            .seek(SeekFrom::End(0))
            .map_err(|e| VshadowError::io("probe backing source size", e))?;
        debug!("source: backing size {} bytes", size);
        Ok(Self {
            inner: Mutex::new(reader),
            size,
        })
    }

    #[inline]
    pub(crate) fn size(&self) -> u64 {
        self.size
    }

    /// Fails with Format when `[offset, offset + len)` is not inside the source.
    /// Used for offsets that come from on-disk metadata.
    pub(crate) fn check_bounds(&self, offset: u64, len: u64, what: &str) -> Result<()> {
        match offset.checked_add(len) {
            Some(end) if end <= self.size => Ok(()),
            _ => Err(VshadowError::format(format!(
                "{} at offset {:#x} (len {}) lies outside the backing source ({} bytes)",
                what, offset, len, self.size
            ))),
        }
    }

    /// Read exactly `buf.len()` bytes at `offset`. A short read is an Io error.
    pub(crate) fn read_exact_at(&self, offset: u64, buf: &mut [u8]) -> Result<()> {
        if buf.is_empty() {
            return Ok(());
        }
        let mut guard = self.inner.lock().unwrap_or_else(|p| p.into_inner());
        guard
            .seek(SeekFrom::Start(offset))
            .map_err(|e| VshadowError::io(format!("seek to {:#x}", offset), e))?;
        guard.read_exact(buf).map_err(|e| {
            let ctx = if e.kind() == IoErrorKind::UnexpectedEof {
                format!("short read of {} bytes at {:#x}", buf.len(), offset)
            } else {
                format!("read of {} bytes at {:#x}", buf.len(), offset)
            };
            VshadowError::io(ctx, e)
        })
    }

    /// Read a metadata record of `len` bytes. The range is validated first,
    /// so a dangling on-disk pointer is reported as Format rather than Io.
    pub(crate) fn read_record(&self, offset: u64, len: usize, what: &str) -> Result<Vec<u8>> {
        self.check_bounds(offset, len as u64, what)?;
        let mut buf = vec![0u8; len];
        self.read_exact_at(offset, &mut buf)?;
        Ok(buf)
    }
}
