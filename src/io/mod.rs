//! io: backing source access.
//!
//! - `ReadSeek`: the minimal capability a backing source needs (Read + Seek).
//!   Files, cursors over byte buffers and `BoundedReader` all satisfy it.
//! - `Source`: single shared handle; positioned reads are serialized through a mutex.
//! - `BoundedReader`: exposes `[offset, offset + size)` of a larger reader as its own stream.

use std::io::{Read, Seek};

mod bounded;
mod source;

pub use bounded::BoundedReader;
pub(crate) use source::Source;

/// Read + Seek capability of a backing source.
pub trait ReadSeek: Read + Seek {}

impl<T: Read + Seek + ?Sized> ReadSeek for T {}
