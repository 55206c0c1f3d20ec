//! resolver: overlay resolution: store byte range → physical read plan.
//!
//! For each position the walk starts at the store being read (the "active"
//! store) and moves toward newer stores:
//! - entry with a forwarder → continue in the next newer store at the
//!   forwarder's relative offset (newest store: read the volume there)
//! - entry with data → this store's differential area
//! - overlay (active store only) → per 512-byte sector, set bits read the
//!   overlay data, clear bits fall back to the primary entry or defer
//! - no entry → next newer store; past the newest store the live volume,
//!   unless the block was unused when the active (newest) store was taken
//!
//! Each step yields how many bytes stay on the same path; the minimum over
//! the walk becomes one segment. The walk is bounded by the arena size.

mod plan;

use std::sync::atomic::AtomicBool;

pub use plan::{ReadPlan, Segment, SegmentSource};

use crate::config::VshadowConfig;
use crate::consts::{BLOCK_SIZE, OVERLAY_SECTORS_PER_BLOCK, OVERLAY_SECTOR_SIZE};
use crate::error::{Result, VshadowError};
use crate::format::BlockDescriptor;
use crate::io::Source;
use crate::store::{Loader, StoreData, StoreDescriptor, TableEntry};
use crate::util::AbortPoll;

pub(crate) struct Resolver<'a> {
    pub src: &'a Source,
    pub stores: &'a [StoreDescriptor],
    pub cfg: &'a VshadowConfig,
    pub abort: &'a AtomicBool,
}

/// Outcome of one position lookup.
#[derive(Debug, Clone, Copy)]
struct Step {
    source: SegmentSource,
    physical_offset: u64,
    run: u64,
    /// Position was translated by a forwarder on the way.
    forwarded: bool,
}

impl<'a> Resolver<'a> {
    fn loader(&self) -> Loader<'a> {
        Loader {
            src: self.src,
            cfg: self.cfg,
            abort: self.abort,
        }
    }

    fn data(&self, index: usize) -> Result<&'a StoreData> {
        let stores: &'a [StoreDescriptor] = self.stores;
        stores[index].data(&self.loader())
    }

    /// Resolve `[offset, offset + length)` of store `active`, clipped to the
    /// store's volume size.
    pub(crate) fn resolve(&self, active: usize, offset: u64, length: u64) -> Result<ReadPlan> {
        let store = self.stores.get(active).ok_or_else(|| {
            VshadowError::argument(format!("store index {} out of range", active))
        })?;
        let end = offset.saturating_add(length).min(store.volume_size);
        let mut plan = ReadPlan::new(offset);
        if offset >= end {
            return Ok(plan);
        }

        let mut poll = AbortPoll::new(self.abort, self.cfg.poll_interval());
        let mut pos = offset;
        while pos < end {
            poll.tick("overlay resolution")?;
            let step = self.resolve_at(active, pos)?;
            let len = step.run.min(end - pos);
            match step.source {
                SegmentSource::Store(idx) => self.src.check_bounds(
                    step.physical_offset,
                    len,
                    &format!("differential data of store {}", idx),
                )?,
                SegmentSource::Volume if step.forwarded => self.src.check_bounds(
                    step.physical_offset,
                    len,
                    &format!("forwarded volume data of store {}", active),
                )?,
                _ => {}
            }
            plan.push(Segment {
                logical_offset: pos,
                length: len,
                source: step.source,
                physical_offset: step.physical_offset,
            });
            pos += len;
        }
        plan.record_metrics();
        Ok(plan)
    }

    /// Walk the chain for one position of store `active`.
    fn resolve_at(&self, active: usize, pos: u64) -> Result<Step> {
        let mut current = active;
        let mut p = pos;
        let mut run = u64::MAX;
        let mut forwarded = false;

        for _ in 0..=self.stores.len() {
            let desc = &self.stores[current];
            let data = self.data(current)?;
            let rel = p % BLOCK_SIZE;
            run = run.min(BLOCK_SIZE - rel);

            let mut hit: Option<BlockDescriptor> = None;
            if let Some(entry) = data.table.lookup(p) {
                match overlay_step(entry, current == active, rel) {
                    OverlayStep::Overlay { offset, run: r } => {
                        let physical = offset.checked_add(rel).ok_or_else(|| {
                            VshadowError::format(format!(
                                "store {}: overlay offset of block {:#x} overflows",
                                current,
                                p - rel
                            ))
                        })?;
                        return Ok(Step {
                            source: SegmentSource::Store(current),
                            physical_offset: physical,
                            run: run.min(r),
                            forwarded,
                        });
                    }
                    OverlayStep::Fallback { run: r } => {
                        run = run.min(r);
                        hit = entry.primary;
                    }
                    OverlayStep::NoOverlay | OverlayStep::Hidden => hit = entry.primary,
                }
            }

            match hit {
                Some(d) if d.is_forwarder() => {
                    let target = d.relative_offset.checked_add(rel).ok_or_else(|| {
                        VshadowError::format(format!(
                            "store {}: forwarder at {:#x} overflows",
                            current, d.original_offset
                        ))
                    })?;
                    forwarded = true;
                    match desc.newer {
                        Some(n) => {
                            current = n;
                            p = target;
                        }
                        None => {
                            return Ok(Step {
                                source: SegmentSource::Volume,
                                physical_offset: target,
                                run,
                                forwarded,
                            })
                        }
                    }
                }
                Some(d) => {
                    let physical = d.offset.checked_add(rel).ok_or_else(|| {
                        VshadowError::format(format!(
                            "store {}: data offset of block {:#x} overflows",
                            current, d.original_offset
                        ))
                    })?;
                    return Ok(Step {
                        source: SegmentSource::Store(current),
                        physical_offset: physical,
                        run,
                        forwarded,
                    });
                }
                None => match desc.newer {
                    Some(n) => current = n,
                    None => {
                        let source = if current == active && self.unused_at_snapshot(data, p) {
                            SegmentSource::Zero
                        } else {
                            SegmentSource::Volume
                        };
                        let physical_offset = match source {
                            SegmentSource::Zero => 0,
                            _ => p,
                        };
                        return Ok(Step {
                            source,
                            physical_offset,
                            run,
                            forwarded,
                        });
                    }
                },
            }
        }

        Err(VshadowError::format(format!(
            "store chain walk from store {} exceeded {} stores",
            active,
            self.stores.len()
        )))
    }

    fn unused_at_snapshot(&self, data: &StoreData, p: u64) -> bool {
        self.cfg.zero_fill_unused_blocks
            && !data.table.is_forward_target(p)
            && data.bitmap.contains(p)
            && data.previous_bitmap.as_ref().map_or(true, |b| b.contains(p))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OverlayStep {
    /// No overlay attached.
    NoOverlay,
    /// Overlay present but the store is not the one being read.
    Hidden,
    /// Sector bit set: read overlay data at `offset` + the in-block offset
    /// for up to `run` bytes.
    Overlay { offset: u64, run: u64 },
    /// Sector bit clear: use the primary entry (or defer) for up to `run` bytes.
    Fallback { run: u64 },
}

fn overlay_step(entry: &TableEntry, is_active: bool, rel: u64) -> OverlayStep {
    let Some(ov) = entry.overlay else {
        return OverlayStep::NoOverlay;
    };
    if !is_active {
        return OverlayStep::Hidden;
    }
    let sector = (rel / OVERLAY_SECTOR_SIZE) as u32;
    let bits = ov.bitmap >> sector;
    let left = OVERLAY_SECTORS_PER_BLOCK - sector;
    let same = if bits & 1 != 0 {
        bits.trailing_ones()
    } else {
        bits.trailing_zeros()
    }
    .min(left);
    let run = u64::from(sector + same) * OVERLAY_SECTOR_SIZE - rel;
    if bits & 1 != 0 {
        OverlayStep::Overlay {
            offset: ov.offset,
            run,
        }
    } else {
        OverlayStep::Fallback { run }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consts::BLOCK_FLAG_IS_OVERLAY;

    fn entry(bitmap: u32) -> TableEntry {
        TableEntry {
            primary: None,
            overlay: Some(BlockDescriptor {
                original_offset: 0,
                relative_offset: 1,
                offset: 0x10_0000,
                flags: BLOCK_FLAG_IS_OVERLAY,
                bitmap,
            }),
        }
    }

    #[test]
    fn overlay_runs_follow_sector_bits() {
        // sectors 0..=3 set, rest clear
        let e = entry(0x0000_000f);
        assert_eq!(
            overlay_step(&e, true, 0),
            OverlayStep::Overlay {
                offset: 0x10_0000,
                run: 4 * 512
            }
        );
        // mid-sector start keeps the remainder of the run exact
        assert_eq!(
            overlay_step(&e, true, 700),
            OverlayStep::Overlay {
                offset: 0x10_0000,
                run: 4 * 512 - 700
            }
        );
        assert_eq!(
            overlay_step(&e, true, 4 * 512),
            OverlayStep::Fallback {
                run: BLOCK_SIZE - 4 * 512
            }
        );
        assert_eq!(overlay_step(&e, false, 0), OverlayStep::Hidden);
    }

    #[test]
    fn overlay_full_and_top_sector() {
        let e = entry(u32::MAX);
        assert_eq!(
            overlay_step(&e, true, 0),
            OverlayStep::Overlay {
                offset: 0x10_0000,
                run: BLOCK_SIZE
            }
        );
        let e = entry(0x8000_0000);
        assert_eq!(
            overlay_step(&e, true, 31 * 512 + 10),
            OverlayStep::Overlay {
                offset: 0x10_0000,
                run: 512 - 10
            }
        );
        assert_eq!(
            overlay_step(&e, true, 0),
            OverlayStep::Fallback { run: 31 * 512 }
        );
        let none = TableEntry::default();
        assert_eq!(overlay_step(&none, true, 0), OverlayStep::NoOverlay);
    }
}
