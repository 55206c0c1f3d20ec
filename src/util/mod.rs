//! util: shared helpers.
//!
//! Contains:
//! - Guid: 16-byte on-disk GUID with the usual lower-case string form.
//! - filetime_to_system_time(): FILETIME (100ns ticks since 1601-01-01) → SystemTime.
//! - utf16le_to_string(): decode the store header machine strings.
//! - env_flag()/env_parse(): environment lookups used by VshadowConfig::from_env.
//! - ChainGuard: loop and length guard for on-disk block chains.
//! - AbortPoll: polls the abort flag every N steps.

use std::collections::HashSet;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use uuid::Uuid;

use crate::error::{Result, VshadowError};
use crate::metrics::record_cancellation;

/// FILETIME ticks between 1601-01-01 and 1970-01-01.
const FILETIME_UNIX_EPOCH_TICKS: u64 = 116_444_736_000_000_000;

/// GUID as stored on disk (first three fields little-endian).
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Guid(pub [u8; 16]);

impl Guid {
    #[inline]
    pub fn from_slice(b: &[u8]) -> Option<Self> {
        let arr: [u8; 16] = b.get(..16)?.try_into().ok()?;
        Some(Guid(arr))
    }

    #[inline]
    pub fn as_bytes(&self) -> &[u8; 16] {
        &self.0
    }

    #[inline]
    pub fn is_nil(&self) -> bool {
        self.0.iter().all(|&b| b == 0)
    }

    /// Parse the canonical string form ("3808876b-c176-4e48-b7ae-04046e6cc752").
    pub fn parse(s: &str) -> Option<Self> {
        let u = Uuid::parse_str(s.trim().trim_start_matches('{').trim_end_matches('}')).ok()?;
        Some(Guid(u.to_bytes_le()))
    }
}

impl fmt::Display for Guid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", Uuid::from_bytes_le(self.0).hyphenated())
    }
}

impl fmt::Debug for Guid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Guid({})", self)
    }
}

/// FILETIME → SystemTime. Values before the Unix epoch are supported.
pub fn filetime_to_system_time(filetime: u64) -> SystemTime {
    if filetime >= FILETIME_UNIX_EPOCH_TICKS {
        let ticks = filetime - FILETIME_UNIX_EPOCH_TICKS;
        UNIX_EPOCH + ticks_to_duration(ticks)
    } else {
        let ticks = FILETIME_UNIX_EPOCH_TICKS - filetime;
        UNIX_EPOCH - ticks_to_duration(ticks)
    }
}

/// SystemTime → FILETIME (saturating at both ends).
pub fn system_time_to_filetime(t: SystemTime) -> u64 {
    match t.duration_since(UNIX_EPOCH) {
        Ok(d) => FILETIME_UNIX_EPOCH_TICKS.saturating_add(duration_to_ticks(d)),
        Err(e) => FILETIME_UNIX_EPOCH_TICKS.saturating_sub(duration_to_ticks(e.duration())),
    }
}

#[inline]
fn ticks_to_duration(ticks: u64) -> Duration {
    Duration::new(ticks / 10_000_000, ((ticks % 10_000_000) * 100) as u32)
}

#[inline]
fn duration_to_ticks(d: Duration) -> u64 {
    d.as_secs()
        .saturating_mul(10_000_000)
        .saturating_add(u64::from(d.subsec_nanos()) / 100)
}

/// Decode UTF-16LE bytes; a trailing NUL terminator and an odd trailing byte are dropped.
pub fn utf16le_to_string(bytes: &[u8]) -> String {
    let units: Vec<u16> = bytes
        .chunks_exact(2)
        .map(|c| u16::from_le_bytes([c[0], c[1]]))
        .collect();
    let end = units.iter().position(|&u| u == 0).unwrap_or(units.len());
    String::from_utf16_lossy(&units[..end])
}

/// "1|true|yes|on" → Some(true), "0|false|no|off" → Some(false), anything else → None.
pub(crate) fn env_flag(name: &str) -> Option<bool> {
    let v = std::env::var(name).ok()?;
    match v.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

pub(crate) fn env_parse<T: std::str::FromStr>(name: &str) -> Option<T> {
    std::env::var(name).ok().and_then(|s| s.trim().parse::<T>().ok())
}

// ----- Chain walking -----

/// Tracks the blocks visited by one chain walk. A revisited offset or a chain
/// longer than `max_blocks` is a corrupt image.
pub(crate) struct ChainGuard<'a> {
    what: &'a str,
    max_blocks: usize,
    visited: HashSet<u64>,
}

impl<'a> ChainGuard<'a> {
    pub(crate) fn new(what: &'a str, max_blocks: usize) -> Self {
        Self {
            what,
            max_blocks,
            visited: HashSet::new(),
        }
    }

    pub(crate) fn visit(&mut self, offset: u64) -> Result<()> {
        if !self.visited.insert(offset) {
            return Err(VshadowError::format(format!(
                "{} chain loop detected at offset {:#x}",
                self.what, offset
            )));
        }
        if self.visited.len() > self.max_blocks {
            return Err(VshadowError::format(format!(
                "{} chain longer than {} blocks",
                self.what, self.max_blocks
            )));
        }
        Ok(())
    }

    pub(crate) fn len(&self) -> usize {
        self.visited.len()
    }
}

/// Polls the abort flag on the first step and then every `interval` steps.
pub(crate) struct AbortPoll<'a> {
    flag: &'a AtomicBool,
    interval: usize,
    steps: usize,
}

impl<'a> AbortPoll<'a> {
    pub(crate) fn new(flag: &'a AtomicBool, interval: usize) -> Self {
        Self {
            flag,
            interval: interval.max(1),
            steps: 0,
        }
    }

    pub(crate) fn tick(&mut self, what: &str) -> Result<()> {
        let due = self.steps % self.interval == 0;
        self.steps = self.steps.wrapping_add(1);
        if due && self.flag.load(Ordering::Acquire) {
            record_cancellation();
            return Err(VshadowError::cancelled(format!("abort signalled during {}", what)));
        }
        Ok(())
    }
}
