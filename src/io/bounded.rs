//! io/bounded: sub-range view of a seekable reader.
//!
//! `BoundedReader::new(inner, offset, size)` behaves like a stream of `size`
//! bytes whose position 0 is `offset` in `inner`. Typical use: a volume that
//! starts at a partition offset inside a whole-disk image.

use std::io::{self, Read, Seek, SeekFrom};

#[derive(Debug)]
pub struct BoundedReader<R> {
    inner: R,
    start: u64,
    len: u64,
    pos: u64,
}

impl<R: Read + Seek> BoundedReader<R> {
    /// Fails with InvalidInput if `offset + size` overflows.
    pub fn new(inner: R, offset: u64, size: u64) -> io::Result<Self> {
        if offset.checked_add(size).is_none() {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "bounded range overflows u64",
            ));
        }
        Ok(Self {
            inner,
            start: offset,
            len: size,
            pos: 0,
        })
    }

    /// Bound `[offset, end of inner)`.
    pub fn from_offset(mut inner: R, offset: u64) -> io::Result<Self> {
        let end = inner.seek(SeekFrom::End(0))?;
        let size = end.checked_sub(offset).ok_or_else(|| {
            io::Error::new(io::ErrorKind::InvalidInput, "offset beyond end of reader")
        })?;
        Self::new(inner, offset, size)
    }

    #[inline]
    pub fn offset(&self) -> u64 {
        self.start
    }

    #[inline]
    pub fn len(&self) -> u64 {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn into_inner(self) -> R {
        self.inner
    }
}

impl<R: Read + Seek> Read for BoundedReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.pos >= self.len || buf.is_empty() {
            return Ok(0);
        }
        let remaining = self.len - self.pos;
        let want = (buf.len() as u64).min(remaining) as usize;
        self.inner.seek(SeekFrom::Start(self.start + self.pos))?;
        let n = self.inner.read(&mut buf[..want])?;
        self.pos += n as u64;
        Ok(n)
    }
}

impl<R: Read + Seek> Seek for BoundedReader<R> {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        let target: i128 = match pos {
            SeekFrom::Start(o) => o as i128,
            SeekFrom::Current(d) => self.pos as i128 + d as i128,
            SeekFrom::End(d) => self.len as i128 + d as i128,
        };
        if target < 0 || target > u64::MAX as i128 {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "seek to a negative or overflowing position",
            ));
        }
        self.pos = target as u64;
        Ok(self.pos)
    }
}
