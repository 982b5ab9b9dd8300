//! Compression and decompression for cached artifacts.
//!
//! This crate wraps the compression library behind a single [`Compression`]
//! enum, providing:
//!
//! - **Format detection** from magic bytes ([`Compression::from_magic_bytes`])
//! - **In-memory** compression/decompression ([`Compression::compress`],
//!   [`Compression::decompress`])
//! - **Streaming** via wrapped readers ([`Compression::wrap_reader`]) and
//!   finishable encoders ([`Compression::encoder`])
//!
//! Only two formats exist: uncompressed and Gzip. An artifact cache needs a
//! closed set of on-disk formats, so nothing else is accepted.
//!
//! Compression uses the highest available level, prioritizing storage space
//! over speed.

#[cfg(feature = "cli")]
pub mod cli;
mod construct;
pub mod error;
mod ops;
#[cfg(feature = "serde")]
mod serialize;
mod util;

pub use crate::ops::Encoder;

/// A supported compression format.
///
/// Defaults to [`None`](Self::None) (uncompressed).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Compression {
    /// Uncompressed
    #[default]
    None,
    /// Gzip compression (.gz)
    Gzip,
}
