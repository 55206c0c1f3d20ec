//! reader: per-store cursor over the reconstructed snapshot bytes.
//!
//! Seek rules:
//! - Start:   new = offset
//! - Current: new = cursor + offset
//! - End:     new = size + offset
//! A resulting offset < 0 (or an overflowing one) is an Argument error; an
//! offset past the end is legal and reads there return no bytes.
//!
//! Reads clip to the store size and advance the cursor by what was returned.
//! A failed call leaves the cursor where it was.

use std::fmt;
use std::io::{self, Read, Seek, SeekFrom};

use crate::error::{Result, VshadowError};
use crate::volume::Store;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Whence {
    Start,
    Current,
    End,
}

impl TryFrom<i32> for Whence {
    type Error = VshadowError;

    /// 0 / 1 / 2 as in `lseek`.
    fn try_from(raw: i32) -> Result<Self> {
        match raw {
            0 => Ok(Whence::Start),
            1 => Ok(Whence::Current),
            2 => Ok(Whence::End),
            other => Err(VshadowError::argument(format!(
                "unsupported whence value {}",
                other
            ))),
        }
    }
}

pub struct StoreReader<'v> {
    store: Store<'v>,
    offset: i64,
}

impl<'v> StoreReader<'v> {
    pub(crate) fn new(store: Store<'v>) -> Self {
        Self { store, offset: 0 }
    }

    pub fn store(&self) -> &Store<'v> {
        &self.store
    }

    // ----- Metadata -----

    pub fn size(&self) -> u64 {
        self.store.size()
    }

    pub fn creation_time(&self) -> u64 {
        self.store.creation_time()
    }

    pub fn number_of_blocks(&self) -> Result<usize> {
        self.store.number_of_blocks()
    }

    pub fn volume_size(&self) -> u64 {
        self.store.volume_size()
    }

    /// Current cursor; may be past `size()`.
    pub fn offset(&self) -> i64 {
        self.offset
    }

    // ----- Cursor -----

    pub fn seek(&mut self, offset: i64, whence: Whence) -> Result<i64> {
        let base: i64 = match whence {
            Whence::Start => 0,
            Whence::Current => self.offset,
            Whence::End => i64::try_from(self.size()).map_err(|_| {
                VshadowError::argument("store size does not fit a signed offset")
            })?,
        };
        let new = base.checked_add(offset).ok_or_else(|| {
            VshadowError::argument(format!("seek overflow: {} + {}", base, offset))
        })?;
        if new < 0 {
            return Err(VshadowError::argument(format!(
                "seek to negative offset {}",
                new
            )));
        }
        self.offset = new;
        Ok(new)
    }

    /// Read up to `size` bytes at the cursor (`None` = to the end).
    pub fn read(&mut self, size: Option<i64>) -> Result<Vec<u8>> {
        let data = self.read_at_offset(size, self.offset)?;
        self.offset += data.len() as i64;
        Ok(data)
    }

    /// Read up to `size` bytes at `offset` without moving the cursor.
    pub fn read_at(&self, size: i64, offset: i64) -> Result<Vec<u8>> {
        if offset < 0 {
            return Err(VshadowError::argument(format!(
                "negative read offset {}",
                offset
            )));
        }
        self.read_at_offset(Some(size), offset)
    }

    fn read_at_offset(&self, size: Option<i64>, offset: i64) -> Result<Vec<u8>> {
        if let Some(n) = size {
            if n < 0 {
                return Err(VshadowError::argument(format!("negative read size {}", n)));
            }
        }
        let offset = offset as u64;
        let total = self.size();
        if offset >= total {
            return Ok(Vec::new());
        }
        let remaining = total - offset;
        let want = size.map_or(remaining, |n| (n as u64).min(remaining));
        let want = usize::try_from(want).map_err(|_| {
            VshadowError::argument(format!("read of {} bytes does not fit in memory", want))
        })?;

        let mut buf = vec![0u8; want];
        let n = self.store.read_into(offset, &mut buf)?;
        buf.truncate(n);
        Ok(buf)
    }
}

impl fmt::Debug for StoreReader<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StoreReader")
            .field("store", &self.store.index())
            .field("offset", &self.offset)
            .field("size", &self.size())
            .finish()
    }
}

impl Read for StoreReader<'_> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.offset as u64 >= self.size() || buf.is_empty() {
            return Ok(0);
        }
        let n = self.store.read_into(self.offset as u64, buf)?;
        self.offset += n as i64;
        Ok(n)
    }
}

impl Seek for StoreReader<'_> {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        let (offset, whence) = match pos {
            SeekFrom::Start(o) => (
                i64::try_from(o).map_err(|_| {
                    io::Error::new(io::ErrorKind::InvalidInput, "seek offset exceeds i64")
                })?,
                Whence::Start,
            ),
            SeekFrom::Current(d) => (d, Whence::Current),
            SeekFrom::End(d) => (d, Whence::End),
        };
        let new = StoreReader::seek(self, offset, whence)?;
        Ok(new as u64)
    }
}
