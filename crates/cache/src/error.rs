//! Cache Error Types
//!
//! Structured errors using `exn` for automatic location tracking and error
//! tree construction.

use derive_more::{Display, Error};
use kiln_compress::error::{Error as CompressionError, ErrorKind as CompressionErrorKind};
use std::path::PathBuf;

/// A cache error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for cache operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// These describe what the caller should *do*, not what went wrong internally.
#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// The caller asked for something the cache cannot represent, such as an
    /// unrecognized artifact suffix. Nothing was written.
    #[display("invalid argument: {_0}")]
    InvalidArgument(#[error(not(source))] String),
    /// Reading an input or writing/removing an entry failed.
    #[display("I/O error")]
    Io,
    /// The configuration could not be serialized into a fingerprint.
    #[display("configuration could not be serialized")]
    Serialize,
    /// The external transformation failed; no entry was created.
    #[display("transformation failed")]
    Transform,
    /// Compression/decompression error
    #[display("compression error: {_0}")]
    Compression(CompressionErrorKind),
    /// Artifact does not exist (it may have been evicted).
    #[display("artifact not found: {}", _0.display())]
    NotFound(#[error(not(source))] PathBuf),
    /// Artifact contents do not match the format implied by its suffix.
    #[display("corrupt artifact: {}", _0.display())]
    Corrupt(#[error(not(source))] PathBuf),
}

impl ErrorKind {
    /// Convert a compression error into a cache error, preserving the
    /// compress crate's `Exn` frame as a child in its own error tree.
    #[track_caller]
    pub fn compression(err: CompressionError) -> Error {
        let inner = (*err).clone();
        err.raise(ErrorKind::Compression(inner))
    }

    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Io | Self::Transform)
    }
}
