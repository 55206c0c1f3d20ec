//! format: byte-exact decoders for the VSS on-disk records (little-endian).
//!
//! - volume_header: 512-byte header at 0x1e00 (signature, version, catalog offset)
//! - record: 128-byte header of catalog/store blocks (type check, chain pointer)
//! - catalog: 128-byte catalog entries (store info / store location)
//! - lists: block list entries (32 B) and block range entries (24 B)
//! - store_header: store information + machine strings
//!
//! Decoders work on byte slices only; reading the blocks is the caller's job.

pub mod catalog;
pub mod common;
pub mod lists;
pub mod record;
pub mod store_header;
pub mod volume_header;

pub use catalog::{CatalogEntry, StoreLocation};
pub use lists::{BlockDescriptor, BlockRange};
pub use record::RecordHeader;
pub use store_header::StoreInformation;
pub use volume_header::VolumeHeader;
