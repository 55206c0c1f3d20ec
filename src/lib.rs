//! vshadow: read-only access to Volume Shadow Snapshot (VSS) stores.
//!
//! A VSS-enabled volume keeps, next to the live data, a catalog of snapshot
//! stores and per-store block tables describing which 16 KiB blocks were
//! copied away before being overwritten. This crate parses that metadata and
//! reconstructs every store as a random-access, read-only byte stream.
//!
//! Layout:
//! - `io`       : backing source (serialized positioned reads) and sub-range adapter
//! - `format`   : byte-exact decoders for the on-disk records
//! - `catalog`  : catalog chain walk → ordered store descriptors
//! - `store`    : store arena, lazy block tables, bitmaps
//! - `resolver` : overlay resolution: logical range → physical read plan
//! - `reader`   : per-store cursor (seek/read/read_at)
//! - `volume`   : open/close lifecycle, store enumeration, abort signalling

pub mod config;
pub mod consts;
pub mod error;
pub mod metrics;
pub mod util;

pub mod io;
pub mod format;
pub(crate) mod catalog;
pub mod store;
pub mod resolver;
pub mod reader;
pub mod volume;

// Re-exports
pub use config::{VolumeBuilder, VshadowConfig};
pub use error::{ErrorKind, Result, VshadowError};
pub use io::{BoundedReader, ReadSeek};
pub use reader::{StoreReader, Whence};
pub use resolver::{ReadPlan, Segment, SegmentSource};
pub use store::{BlockDescriptor, BlockRange, StoreInfo};
pub use util::Guid;
pub use volume::{AbortHandle, AccessMode, Store, Volume};
