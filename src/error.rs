//! Error taxonomy.
//!
//! Every failure carries one of five categories so callers (and binding
//! layers) can decide whether to fix their input, retry, or give up:
//! - Argument  : malformed caller input; detected before any storage access.
//! - State     : operation not valid for the current lifecycle state.
//! - Format    : corrupt or unsupported on-disk structures.
//! - Io        : the backing source failed to read or seek.
//! - Cancelled : `signal_abort()` was observed mid-parse or mid-resolve.

use std::io;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, VshadowError>;

/// Coarse error category, stable for matching.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Argument,
    State,
    Format,
    Io,
    Cancelled,
}

#[derive(Debug, Error)]
pub enum VshadowError {
    #[error("invalid argument: {0}")]
    Argument(String),

    #[error("invalid state: {0}")]
    State(String),

    #[error("format error: {0}")]
    Format(String),

    #[error("I/O error: {context}: {source}")]
    Io {
        context: String,
        #[source]
        source: io::Error,
    },

    #[error("operation cancelled: {0}")]
    Cancelled(String),
}

impl VshadowError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            VshadowError::Argument(_) => ErrorKind::Argument,
            VshadowError::State(_) => ErrorKind::State,
            VshadowError::Format(_) => ErrorKind::Format,
            VshadowError::Io { .. } => ErrorKind::Io,
            VshadowError::Cancelled(_) => ErrorKind::Cancelled,
        }
    }

    pub(crate) fn argument(msg: impl Into<String>) -> Self {
        VshadowError::Argument(msg.into())
    }

    pub(crate) fn state(msg: impl Into<String>) -> Self {
        VshadowError::State(msg.into())
    }

    pub(crate) fn format(msg: impl Into<String>) -> Self {
        VshadowError::Format(msg.into())
    }

    pub(crate) fn cancelled(msg: impl Into<String>) -> Self {
        VshadowError::Cancelled(msg.into())
    }

    pub(crate) fn io(context: impl Into<String>, source: io::Error) -> Self {
        VshadowError::Io {
            context: context.into(),
            source,
        }
    }
}

impl From<io::Error> for VshadowError {
    fn from(err: io::Error) -> Self {
        VshadowError::io("backing source", err)
    }
}

/// Adapter for the `std::io` trait impls on readers: keeps the category
/// recoverable through `io::Error::get_ref()`.
impl From<VshadowError> for io::Error {
    fn from(err: VshadowError) -> Self {
        let kind = match err.kind() {
            ErrorKind::Argument => io::ErrorKind::InvalidInput,
            ErrorKind::Format => io::ErrorKind::InvalidData,
            // not Interrupted: std retry loops would spin on a sticky abort
            ErrorKind::State | ErrorKind::Io | ErrorKind::Cancelled => io::ErrorKind::Other,
        };
        match err {
            VshadowError::Io { source, .. } => source,
            other => io::Error::new(kind, other),
        }
    }
}
