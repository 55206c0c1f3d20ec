//! Lightweight global metrics.
//!
//! Thread-safe atomic counters per subsystem:
//! - Volume open/close
//! - Catalog and store block parsing
//! - Overlay resolution (plans, segments by source)
//! - Reads and cancellations

use std::sync::atomic::{AtomicU64, Ordering};

// ----- Volume -----
static VOLUMES_OPENED: AtomicU64 = AtomicU64::new(0);
static VOLUMES_CLOSED: AtomicU64 = AtomicU64::new(0);

// ----- Parsing -----
static CATALOG_BLOCKS_PARSED: AtomicU64 = AtomicU64::new(0);
static STORE_BLOCKS_PARSED: AtomicU64 = AtomicU64::new(0);
static BLOCK_TABLES_PARSED: AtomicU64 = AtomicU64::new(0);
static BLOCK_DESCRIPTORS_PARSED: AtomicU64 = AtomicU64::new(0);

// ----- Resolution -----
static PLANS_RESOLVED: AtomicU64 = AtomicU64::new(0);
static SEGMENTS_VOLUME: AtomicU64 = AtomicU64::new(0);
static SEGMENTS_STORE: AtomicU64 = AtomicU64::new(0);
static SEGMENTS_ZERO: AtomicU64 = AtomicU64::new(0);

// ----- Reads -----
static BYTES_READ: AtomicU64 = AtomicU64::new(0);
static CANCELLATIONS: AtomicU64 = AtomicU64::new(0);

#[derive(Debug, Clone, Default)]
pub struct MetricsSnapshot {
    // Volume
    pub volumes_opened: u64,
    pub volumes_closed: u64,

    // Parsing
    pub catalog_blocks_parsed: u64,
    pub store_blocks_parsed: u64,
    pub block_tables_parsed: u64,
    pub block_descriptors_parsed: u64,

    // Resolution
    pub plans_resolved: u64,
    pub segments_volume: u64,
    pub segments_store: u64,
    pub segments_zero: u64,

    // Reads
    pub bytes_read: u64,
    pub cancellations: u64,
}

impl MetricsSnapshot {
    pub fn segments_total(&self) -> u64 {
        self.segments_volume + self.segments_store + self.segments_zero
    }

    /// Share of resolved segments served from differential storage.
    pub fn store_segment_ratio(&self) -> f64 {
        let total = self.segments_total();
        if total == 0 {
            0.0
        } else {
            self.segments_store as f64 / total as f64
        }
    }
}

// ----- Recorders (Volume) -----
pub fn record_volume_opened() {
    VOLUMES_OPENED.fetch_add(1, Ordering::Relaxed);
}
pub fn record_volume_closed() {
    VOLUMES_CLOSED.fetch_add(1, Ordering::Relaxed);
}

// ----- Recorders (Parsing) -----
pub fn record_catalog_block() {
    CATALOG_BLOCKS_PARSED.fetch_add(1, Ordering::Relaxed);
}
pub fn record_store_block() {
    STORE_BLOCKS_PARSED.fetch_add(1, Ordering::Relaxed);
}
pub fn record_block_table(descriptors: usize) {
    BLOCK_TABLES_PARSED.fetch_add(1, Ordering::Relaxed);
    BLOCK_DESCRIPTORS_PARSED.fetch_add(descriptors as u64, Ordering::Relaxed);
}

// ----- Recorders (Resolution) -----
pub fn record_plan(volume: usize, store: usize, zero: usize) {
    PLANS_RESOLVED.fetch_add(1, Ordering::Relaxed);
    SEGMENTS_VOLUME.fetch_add(volume as u64, Ordering::Relaxed);
    SEGMENTS_STORE.fetch_add(store as u64, Ordering::Relaxed);
    SEGMENTS_ZERO.fetch_add(zero as u64, Ordering::Relaxed);
}

// ----- Recorders (Reads) -----
pub fn record_bytes_read(n: usize) {
    BYTES_READ.fetch_add(n as u64, Ordering::Relaxed);
}
pub fn record_cancellation() {
    CANCELLATIONS.fetch_add(1, Ordering::Relaxed);
}

/// Take a point-in-time copy of all counters.
pub fn metrics_snapshot() -> MetricsSnapshot {
    MetricsSnapshot {
        volumes_opened: VOLUMES_OPENED.load(Ordering::Relaxed),
        volumes_closed: VOLUMES_CLOSED.load(Ordering::Relaxed),
        catalog_blocks_parsed: CATALOG_BLOCKS_PARSED.load(Ordering::Relaxed),
        store_blocks_parsed: STORE_BLOCKS_PARSED.load(Ordering::Relaxed),
        block_tables_parsed: BLOCK_TABLES_PARSED.load(Ordering::Relaxed),
        block_descriptors_parsed: BLOCK_DESCRIPTORS_PARSED.load(Ordering::Relaxed),
        plans_resolved: PLANS_RESOLVED.load(Ordering::Relaxed),
        segments_volume: SEGMENTS_VOLUME.load(Ordering::Relaxed),
        segments_store: SEGMENTS_STORE.load(Ordering::Relaxed),
        segments_zero: SEGMENTS_ZERO.load(Ordering::Relaxed),
        bytes_read: BYTES_READ.load(Ordering::Relaxed),
        cancellations: CANCELLATIONS.load(Ordering::Relaxed),
    }
}

/// Reset all counters to zero (tests, benchmarks).
pub fn metrics_reset() {
    for c in [
        &VOLUMES_OPENED,
        &VOLUMES_CLOSED,
        &CATALOG_BLOCKS_PARSED,
        &STORE_BLOCKS_PARSED,
        &BLOCK_TABLES_PARSED,
        &BLOCK_DESCRIPTORS_PARSED,
        &PLANS_RESOLVED,
        &SEGMENTS_VOLUME,
        &SEGMENTS_STORE,
        &SEGMENTS_ZERO,
        &BYTES_READ,
        &CANCELLATIONS,
    ] {
        c.store(0, Ordering::Relaxed);
    }
}
