//! resolver/plan: resolved read plan and its execution.

use crate::error::{Result, VshadowError};
use crate::io::Source;
use crate::metrics::{record_bytes_read, record_plan};

/// Where the bytes of a segment come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SegmentSource {
    /// The live volume (current data).
    Volume,
    /// Differential data owned by the store with this index.
    Store(usize),
    /// Block unused at snapshot time; reads as zeros.
    Zero,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Segment {
    pub logical_offset: u64,
    pub length: u64,
    pub source: SegmentSource,
    /// Offset in the backing image. Zero for `SegmentSource::Zero`.
    pub physical_offset: u64,
}

impl Segment {
    #[inline]
    pub fn logical_end(&self) -> u64 {
        self.logical_offset + self.length
    }

    /// Whether `next` continues this segment on both the logical and physical side.
    fn continues_with(&self, next: &Segment) -> bool {
        if self.source != next.source || self.logical_end() != next.logical_offset {
            return false;
        }
        match self.source {
            SegmentSource::Zero => true,
            _ => self.physical_offset.checked_add(self.length) == Some(next.physical_offset),
        }
    }
}

/// Ordered, contiguous segments covering `[offset, offset + length)` of a store.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReadPlan {
    pub offset: u64,
    pub length: u64,
    pub segments: Vec<Segment>,
}

impl ReadPlan {
    pub(crate) fn new(offset: u64) -> Self {
        Self {
            offset,
            length: 0,
            segments: Vec::new(),
        }
    }

    /// Append a segment, merging it into the previous one when contiguous.
    pub(crate) fn push(&mut self, seg: Segment) {
        if seg.length == 0 {
            return;
        }
        self.length += seg.length;
        if let Some(last) = self.segments.last_mut() {
            if last.continues_with(&seg) {
                last.length += seg.length;
                return;
            }
        }
        self.segments.push(seg);
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.length == 0
    }

    pub(crate) fn record_metrics(&self) {
        let (mut volume, mut store, mut zero) = (0usize, 0usize, 0usize);
        for s in &self.segments {
            match s.source {
                SegmentSource::Volume => volume += 1,
                SegmentSource::Store(_) => store += 1,
                SegmentSource::Zero => zero += 1,
            }
        }
        record_plan(volume, store, zero);
    }

    /// Fill `buf` (exactly `self.length` bytes) from the backing source.
    pub(crate) fn execute(&self, src: &Source, buf: &mut [u8]) -> Result<()> {
        if buf.len() as u64 != self.length {
            return Err(VshadowError::argument(format!(
                "buffer of {} bytes for a plan of {} bytes",
                buf.len(),
                self.length
            )));
        }
        for seg in &self.segments {
            let start = (seg.logical_offset - self.offset) as usize;
            let dst = &mut buf[start..start + seg.length as usize];
            match seg.source {
                SegmentSource::Zero => dst.fill(0),
                SegmentSource::Volume | SegmentSource::Store(_) => {
                    src.read_exact_at(seg.physical_offset, dst)?
                }
            }
        }
        record_bytes_read(buf.len());
        Ok(())
    }
}
