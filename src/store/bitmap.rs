//! store/bitmap: store bitmap: one bit per 16 KiB block of the volume.

use byteorder::{ByteOrder, LittleEndian};

use crate::consts::BLOCK_SIZE;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct BlockBitmap {
    words: Vec<u32>,
}

impl BlockBitmap {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Append the u32 words of one bitmap block payload. Bit numbering
    /// continues from the previous block of the chain.
    pub(crate) fn extend_from_payload(&mut self, payload: &[u8]) {
        self.words
            .extend(payload.chunks_exact(4).map(LittleEndian::read_u32));
    }

    /// Whether the block containing `offset` has its bit set.
    pub(crate) fn contains(&self, offset: u64) -> bool {
        let bit = offset / BLOCK_SIZE;
        let word = (bit / 32) as usize;
        self.words
            .get(word)
            .map_or(false, |w| (w >> (bit % 32)) & 1 != 0)
    }

    pub(crate) fn count_set(&self) -> u64 {
        self.words.iter().map(|w| u64::from(w.count_ones())).sum()
    }
}
