//! Artifact file naming.
//!
//! Every entry is named `<key><suffix>`, and the suffix is drawn from a
//! closed set: one per [`Compression`] format, all sharing the
//! [`ARTIFACT_EXTENSION`] base.

use crate::error::{ErrorKind, Result};
use exn::OptionExt;
use kiln_compress::Compression;

/// Extension shared by every artifact, before any compression extension.
pub const ARTIFACT_EXTENSION: &str = ".out";

/// The file name suffix for artifacts stored in `compression` format.
pub fn suffix(compression: Compression) -> String {
    format!("{ARTIFACT_EXTENSION}{}", compression.extension())
}

/// Map a requested suffix back to its format.
///
/// Anything outside the closed set fails with
/// [`InvalidArgument`](ErrorKind::InvalidArgument).
pub fn parse_suffix(requested: &str) -> Result<Compression> {
    Compression::ALL
        .into_iter()
        .find(|compression| suffix(*compression) == requested)
        .ok_or_raise(|| ErrorKind::InvalidArgument(format!("unrecognized artifact suffix `{requested}`")))
}

/// Split an entry file name into its key and format.
///
/// Returns `None` for files that are not artifacts (temporary files, strays).
pub fn split_file_name(name: &str) -> Option<(&str, Compression)> {
    // Longest suffix first, otherwise `.out` would never let `.out.gz` match.
    Compression::ALL.into_iter().rev().find_map(|compression| {
        let key = name.strip_suffix(suffix(compression).as_str())?;
        (!key.is_empty() && !key.starts_with('.')).then_some((key, compression))
    })
}
