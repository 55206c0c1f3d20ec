// tests/common/mod.rs
//
// In-memory VSS image writer shared by the integration tests.
//
// Image layout produced by `ImageBuilder::build`:
// - [0, data_size): live volume data (deterministic pattern), with the
//   volume header at 0x1e00 and the first catalog block at 0x4000 on top
// - [data_size, ..): store metadata blocks and differential data, one
//   16 KiB block per allocation
//
// The builder reports where it put each chain so tests can patch bytes to
// produce corrupt images.

#![allow(dead_code)]

use std::io::Cursor;

use byteorder::{ByteOrder, LittleEndian};

use vshadow::{Volume, VshadowConfig};

pub const BS: u64 = 0x4000;
pub const BSU: usize = BS as usize;
pub const VSS_ID: [u8; 16] = [
    0x6b, 0x87, 0x08, 0x38, 0x76, 0xc1, 0x48, 0x4e, 0xb7, 0xae, 0x04, 0x04, 0x6e, 0x6c, 0xc7, 0x52,
];

pub const FLAG_FORWARDER: u32 = 1;
pub const FLAG_OVERLAY: u32 = 2;
pub const FLAG_NOT_USED: u32 = 4;

const CATALOG_OFFSET: u64 = 0x4000;
const HEADER_OFFSET: usize = 0x1e00;
const LIST_ENTRIES_PER_BLOCK: usize = (BSU - 128) / 32;
const RANGE_ENTRIES_PER_BLOCK: usize = (BSU - 128) / 24;
const BITMAP_WORDS_PER_BLOCK: usize = (BSU - 128) / 4;

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Byte of the live volume at `offset`.
pub fn live_byte(offset: u64) -> u8 {
    ((offset >> 9) as u8).wrapping_mul(31) ^ (offset as u8)
}

pub fn guid(n: u8) -> [u8; 16] {
    let mut g = [0u8; 16];
    g[0] = n;
    g[15] = 0x5a;
    g
}

/// One block list entry of a store.
#[derive(Debug, Clone)]
pub enum Entry {
    /// Block `block` copied to a freshly allocated differential block filled with `fill`.
    Data { block: u64, fill: u8 },
    /// Overlay for `block`: sectors with a set bit read `fill`.
    Overlay { block: u64, bitmap: u32, fill: u8 },
    /// Forwarder: block `block` continues at block `to` of the next newer store.
    Forwarder { block: u64, to: u64 },
    /// Descriptor written verbatim.
    Raw {
        original_offset: u64,
        relative_offset: u64,
        offset: u64,
        flags: u32,
        bitmap: u32,
    },
}

#[derive(Debug, Clone)]
pub struct StoreSpec {
    pub identifier: [u8; 16],
    pub creation_time: u64,
    /// None: the data region size.
    pub volume_size: Option<u64>,
    pub in_progress: bool,
    pub entries: Vec<Entry>,
    /// Blocks whose bit is set in the current bitmap (None: no bitmap chain).
    pub bitmap: Option<Vec<u64>>,
    pub previous_bitmap: Option<Vec<u64>>,
    pub ranges: Vec<(u64, u64, u64)>,
    pub copy_identifier: [u8; 16],
    pub copy_set_identifier: [u8; 16],
    pub attribute_flags: u32,
    pub operating_machine: String,
    pub service_machine: String,
}

impl StoreSpec {
    pub fn new(id: u8, creation_time: u64) -> Self {
        Self {
            identifier: guid(id),
            creation_time,
            volume_size: None,
            in_progress: false,
            entries: Vec::new(),
            bitmap: None,
            previous_bitmap: None,
            ranges: Vec::new(),
            copy_identifier: guid(id.wrapping_add(0x40)),
            copy_set_identifier: guid(0x80),
            attribute_flags: 0x0042_000d,
            operating_machine: format!("host-{}.example", id),
            service_machine: format!("svc-{}.example", id),
        }
    }

    pub fn entry(mut self, e: Entry) -> Self {
        self.entries.push(e);
        self
    }

    pub fn data(self, block: u64, fill: u8) -> Self {
        self.entry(Entry::Data { block, fill })
    }

    pub fn in_progress(mut self) -> Self {
        self.in_progress = true;
        self
    }

    pub fn bitmap(mut self, blocks: &[u64]) -> Self {
        self.bitmap = Some(blocks.to_vec());
        self
    }

    pub fn previous_bitmap(mut self, blocks: &[u64]) -> Self {
        self.previous_bitmap = Some(blocks.to_vec());
        self
    }

    pub fn volume_size(mut self, size: u64) -> Self {
        self.volume_size = Some(size);
        self
    }
}

/// Where the builder placed a store's chains.
#[derive(Debug, Clone, Default)]
pub struct StoreLayout {
    pub header_offset: u64,
    pub block_list_offsets: Vec<u64>,
    pub range_list_offsets: Vec<u64>,
    pub bitmap_offsets: Vec<u64>,
    pub previous_bitmap_offsets: Vec<u64>,
    /// Offset of the differential block allocated for entries[i] (0 if none).
    pub entry_data: Vec<u64>,
}

pub struct Built {
    pub image: Vec<u8>,
    pub data_size: u64,
    pub catalog_offsets: Vec<u64>,
    pub stores: Vec<StoreLayout>,
}

impl Built {
    pub fn live(&self, offset: u64, len: usize) -> &[u8] {
        &self.image[offset as usize..offset as usize + len]
    }

    pub fn block(&self, block: u64) -> &[u8] {
        self.live(block * BS, BSU)
    }

    /// Overwrite the `next_offset` field of the block at `block_offset`.
    pub fn set_next(&mut self, block_offset: u64, next: u64) {
        let o = block_offset as usize + 40;
        LittleEndian::write_u64(&mut self.image[o..o + 8], next);
    }

    pub fn volume(&self) -> Volume {
        self.volume_with(VshadowConfig::default())
    }

    pub fn volume_with(&self, cfg: VshadowConfig) -> Volume {
        let mut v = Volume::with_config(cfg);
        v.open_with_reader(Cursor::new(self.image.clone()))
            .expect("open synthesized image");
        v
    }
}

pub struct ImageBuilder {
    data_blocks: u64,
    header_version: u32,
    catalog_slots_per_block: usize,
    with_catalog: bool,
    stores: Vec<StoreSpec>,
    extra_catalog_entries: Vec<[u8; 128]>,
}

impl Default for ImageBuilder {
    fn default() -> Self {
        Self::new(32)
    }
}

impl ImageBuilder {
    pub fn new(data_blocks: u64) -> Self {
        Self {
            data_blocks,
            header_version: 1,
            catalog_slots_per_block: 127,
            with_catalog: true,
            stores: Vec::new(),
            extra_catalog_entries: Vec::new(),
        }
    }

    pub fn header_version(mut self, v: u32) -> Self {
        self.header_version = v;
        self
    }

    /// Fewer slots per catalog block forces a chained catalog.
    pub fn catalog_slots_per_block(mut self, n: usize) -> Self {
        self.catalog_slots_per_block = n.clamp(1, 127);
        self
    }

    /// catalog_offset = 0 in the volume header.
    pub fn without_catalog(mut self) -> Self {
        self.with_catalog = false;
        self
    }

    pub fn store(mut self, s: StoreSpec) -> Self {
        self.stores.push(s);
        self
    }

    /// Raw 128-byte catalog entry appended after the stores' entries.
    pub fn raw_catalog_entry(mut self, e: [u8; 128]) -> Self {
        self.extra_catalog_entries.push(e);
        self
    }

    pub fn build(self) -> Built {
        let data_size = self.data_blocks * BS;
        let mut w = Writer {
            image: (0..data_size).map(live_byte).collect(),
        };

        // volume header
        let h = HEADER_OFFSET;
        w.image[h..h + 512].fill(0);
        w.image[h..h + 16].copy_from_slice(&VSS_ID);
        LittleEndian::write_u32(&mut w.image[h + 16..h + 20], self.header_version);
        LittleEndian::write_u32(&mut w.image[h + 20..h + 24], 1);
        let catalog_offset = if self.with_catalog { CATALOG_OFFSET } else { 0 };
        LittleEndian::write_u64(&mut w.image[h + 48..h + 56], catalog_offset);
        w.image[h + 64..h + 80].copy_from_slice(&guid(0xee));

        // stores: metadata first, catalog entries collected on the way
        let mut entries: Vec<[u8; 128]> = Vec::new();
        let mut layouts = Vec::new();
        for s in &self.stores {
            let volume_size = s.volume_size.unwrap_or(data_size);
            let mut e2 = [0u8; 128];
            LittleEndian::write_u64(&mut e2[0..8], 2);
            LittleEndian::write_u64(&mut e2[8..16], volume_size);
            e2[16..32].copy_from_slice(&s.identifier);
            LittleEndian::write_u64(&mut e2[48..56], s.creation_time);
            entries.push(e2);

            if s.in_progress {
                layouts.push(StoreLayout::default());
                continue;
            }
            let layout = w.write_store(s);
            let mut e3 = [0u8; 128];
            LittleEndian::write_u64(&mut e3[0..8], 3);
            LittleEndian::write_u64(&mut e3[8..16], first(&layout.block_list_offsets));
            e3[16..32].copy_from_slice(&s.identifier);
            LittleEndian::write_u64(&mut e3[32..40], layout.header_offset);
            LittleEndian::write_u64(&mut e3[40..48], first(&layout.range_list_offsets));
            LittleEndian::write_u64(&mut e3[48..56], first(&layout.bitmap_offsets));
            LittleEndian::write_u64(&mut e3[72..80], first(&layout.previous_bitmap_offsets));
            entries.push(e3);
            layouts.push(layout);
        }
        entries.extend(self.extra_catalog_entries.iter().copied());

        // catalog chain
        let mut catalog_offsets = Vec::new();
        if self.with_catalog {
            let chunks: Vec<&[[u8; 128]]> = if entries.is_empty() {
                vec![&entries[..]]
            } else {
                entries.chunks(self.catalog_slots_per_block).collect()
            };
            catalog_offsets.push(CATALOG_OFFSET);
            for _ in 1..chunks.len() {
                catalog_offsets.push(w.alloc());
            }
            for (i, chunk) in chunks.iter().enumerate() {
                let off = catalog_offsets[i];
                let next = catalog_offsets.get(i + 1).copied().unwrap_or(0);
                w.record(off, 2, next);
                for (slot, e) in chunk.iter().enumerate() {
                    let o = off as usize + 128 + slot * 128;
                    w.image[o..o + 128].copy_from_slice(e);
                }
            }
        }

        Built {
            image: w.image,
            data_size,
            catalog_offsets,
            stores: layouts,
        }
    }
}

fn ceil_div(a: usize, b: usize) -> usize {
    (a + b - 1) / b
}

fn first(v: &[u64]) -> u64 {
    v.first().copied().unwrap_or(0)
}

struct Writer {
    image: Vec<u8>,
}

impl Writer {
    fn alloc(&mut self) -> u64 {
        let off = self.image.len() as u64;
        self.image.resize(self.image.len() + BSU, 0);
        off
    }

    /// Zero the block and write a record header.
    fn record(&mut self, off: u64, record_type: u32, next: u64) {
        let o = off as usize;
        self.image[o..o + BSU].fill(0);
        self.image[o..o + 16].copy_from_slice(&VSS_ID);
        LittleEndian::write_u32(&mut self.image[o + 16..o + 20], 1);
        LittleEndian::write_u32(&mut self.image[o + 20..o + 24], record_type);
        LittleEndian::write_u64(&mut self.image[o + 32..o + 40], off);
        LittleEndian::write_u64(&mut self.image[o + 40..o + 48], next);
    }

    /// Allocate `n` chained blocks of `record_type`; returns their offsets.
    fn chain(&mut self, n: usize, record_type: u32) -> Vec<u64> {
        let offs: Vec<u64> = (0..n).map(|_| self.alloc()).collect();
        for (i, &off) in offs.iter().enumerate() {
            let next = offs.get(i + 1).copied().unwrap_or(0);
            self.record(off, record_type, next);
        }
        offs
    }

    fn write_store(&mut self, s: &StoreSpec) -> StoreLayout {
        let mut layout = StoreLayout::default();

        // store header
        layout.header_offset = self.alloc();
        self.record(layout.header_offset, 4, 0);
        let info = layout.header_offset as usize + 128;
        self.image[info + 16..info + 32].copy_from_slice(&s.copy_identifier);
        self.image[info + 32..info + 48].copy_from_slice(&s.copy_set_identifier);
        LittleEndian::write_u32(&mut self.image[info + 48..info + 52], 1);
        LittleEndian::write_u32(&mut self.image[info + 56..info + 60], s.attribute_flags);
        let mut pos = info + 64;
        for text in [&s.operating_machine, &s.service_machine] {
            let units: Vec<u16> = text.encode_utf16().collect();
            LittleEndian::write_u16(&mut self.image[pos..pos + 2], (units.len() * 2) as u16);
            pos += 2;
            for u in units {
                LittleEndian::write_u16(&mut self.image[pos..pos + 2], u);
                pos += 2;
            }
        }

        // differential data
        let mut descriptors: Vec<[u64; 5]> = Vec::new();
        for e in &s.entries {
            match *e {
                Entry::Data { block, fill } => {
                    let off = self.alloc();
                    self.image[off as usize..off as usize + BSU].fill(fill);
                    layout.entry_data.push(off);
                    descriptors.push([block * BS, 0, off, 0, 0]);
                }
                Entry::Overlay { block, bitmap, fill } => {
                    let off = self.alloc();
                    self.image[off as usize..off as usize + BSU].fill(fill);
                    layout.entry_data.push(off);
                    descriptors.push([block * BS, 1, off, FLAG_OVERLAY as u64, bitmap as u64]);
                }
                Entry::Forwarder { block, to } => {
                    layout.entry_data.push(0);
                    descriptors.push([block * BS, to * BS, 0, FLAG_FORWARDER as u64, 0]);
                }
                Entry::Raw {
                    original_offset,
                    relative_offset,
                    offset,
                    flags,
                    bitmap,
                } => {
                    layout.entry_data.push(0);
                    descriptors.push([
                        original_offset,
                        relative_offset,
                        offset,
                        flags as u64,
                        bitmap as u64,
                    ]);
                }
            }
        }

        // block list (always at least one block)
        let n = ceil_div(descriptors.len(), LIST_ENTRIES_PER_BLOCK).max(1);
        layout.block_list_offsets = self.chain(n, 3);
        for (i, d) in descriptors.iter().enumerate() {
            let blk = layout.block_list_offsets[i / LIST_ENTRIES_PER_BLOCK] as usize;
            let o = blk + 128 + (i % LIST_ENTRIES_PER_BLOCK) * 32;
            LittleEndian::write_u64(&mut self.image[o..o + 8], d[0]);
            LittleEndian::write_u64(&mut self.image[o + 8..o + 16], d[1]);
            LittleEndian::write_u64(&mut self.image[o + 16..o + 24], d[2]);
            LittleEndian::write_u32(&mut self.image[o + 24..o + 28], d[3] as u32);
            LittleEndian::write_u32(&mut self.image[o + 28..o + 32], d[4] as u32);
        }

        // block range list
        let n = ceil_div(s.ranges.len(), RANGE_ENTRIES_PER_BLOCK).max(1);
        layout.range_list_offsets = self.chain(n, 5);
        for (i, &(off, rel, size)) in s.ranges.iter().enumerate() {
            let blk = layout.range_list_offsets[i / RANGE_ENTRIES_PER_BLOCK] as usize;
            let o = blk + 128 + (i % RANGE_ENTRIES_PER_BLOCK) * 24;
            LittleEndian::write_u64(&mut self.image[o..o + 8], off);
            LittleEndian::write_u64(&mut self.image[o + 8..o + 16], rel);
            LittleEndian::write_u64(&mut self.image[o + 16..o + 24], size);
        }

        // bitmaps
        if let Some(bits) = &s.bitmap {
            layout.bitmap_offsets = self.write_bitmap(bits);
        }
        if let Some(bits) = &s.previous_bitmap {
            layout.previous_bitmap_offsets = self.write_bitmap(bits);
        }
        layout
    }

    fn write_bitmap(&mut self, blocks: &[u64]) -> Vec<u64> {
        let max_block = blocks.iter().copied().max().unwrap_or(0) as usize;
        let n = ceil_div(max_block / 32 + 1, BITMAP_WORDS_PER_BLOCK).max(1);
        let offs = self.chain(n, 6);
        for &b in blocks {
            let b = b as usize;
            let word = b / 32;
            let blk = offs[word / BITMAP_WORDS_PER_BLOCK] as usize;
            let o = blk + 128 + (word % BITMAP_WORDS_PER_BLOCK) * 4;
            let v = LittleEndian::read_u32(&self.image[o..o + 4]) | (1 << (b % 32));
            LittleEndian::write_u32(&mut self.image[o..o + 4], v);
        }
        offs
    }
}
