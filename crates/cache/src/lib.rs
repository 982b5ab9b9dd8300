//! Size-bounded, content-addressed disk cache for expensive file
//! transformations.
//!
//! A [`DiskCache`] maps `(input file, configuration)` to an artifact file on
//! disk. The first request for a pair runs the [`Transform`] and stores its
//! output; later requests for byte-identical input and an equal
//! configuration return the same path without running anything.
//!
//! # Layout
//! Entries live flat in one directory, named `<key><suffix>`:
//! - **Key**: BLAKE3 of the input bytes followed by BLAKE3 of the canonical
//!   JSON form of the configuration ([`Key`]).
//! - **Suffix**: `.out` for plain artifacts, `.out.gz` for Gzip ones
//!   ([`format`]).
//!
//! There is no index: the directory listing is the source of truth, and a
//! file's last-write time is its age. When the directory grows past its
//! budget the oldest entries are deleted first.

mod artifact;
mod cache;
mod entry;
pub mod error;
mod evict;
pub mod format;
mod key;
mod location;
mod transform;

pub use crate::artifact::open;
pub use crate::cache::{CacheOptions, DEFAULT_MAX_SIZE, DiskCache};
pub use crate::entry::Entry;
pub use crate::evict::Eviction;
pub use crate::key::Key;
pub use crate::location::Location;
pub use crate::transform::Transform;
pub use kiln_compress::Compression;
