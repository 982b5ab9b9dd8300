//! On-disk cache entries.

use crate::error::{ErrorKind, Result};
use crate::format;
use exn::ResultExt;
use kiln_compress::Compression;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use time::OffsetDateTime;

/// One file in the cache directory.
///
/// The last-write timestamp is the only recency signal: entries are written
/// once and never touched again, so it doubles as the creation time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    /// Absolute path of the entry file
    pub path: PathBuf,
    /// File name, used to break timestamp ties
    pub name: String,
    /// File size in bytes
    pub size: u64,
    /// Last-write timestamp
    pub modified: OffsetDateTime,
}

impl Entry {
    /// The key and format this entry was stored under, if it is an artifact.
    pub fn artifact(&self) -> Option<(&str, Compression)> {
        format::split_file_name(&self.name)
    }
}

/// List every regular file in `directory`, oldest first.
///
/// Ties on timestamp are ordered by file name so that eviction order is
/// deterministic. A missing directory is an empty cache, not an error.
pub(crate) fn scan(directory: &Path) -> Result<Vec<Entry>> {
    let listing = match fs::read_dir(directory) {
        Ok(listing) => listing,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e).or_raise(|| ErrorKind::Io),
    };
    let mut found = Vec::new();
    for item in listing {
        let item = item.or_raise(|| ErrorKind::Io)?;
        let metadata = match item.metadata() {
            Ok(metadata) => metadata,
            // Removed between listing and stat; nothing to account for.
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => continue,
            Err(e) => return Err(e).or_raise(|| ErrorKind::Io),
        };
        if !metadata.is_file() {
            continue;
        }
        let modified = metadata.modified().or_raise(|| ErrorKind::Io)?;
        let entry = Entry {
            path: item.path(),
            name: item.file_name().to_string_lossy().into_owned(),
            size: metadata.len(),
            modified: timestamp(modified),
        };
        found.push((modified, entry));
    }
    found.sort_by(|(a_time, a), (b_time, b)| a_time.cmp(b_time).then_with(|| a.name.cmp(&b.name)));
    Ok(found.into_iter().map(|(_, entry)| entry).collect())
}

/// Convert for display. Ordering always uses the raw [`SystemTime`]; a
/// timestamp `OffsetDateTime` cannot represent reads as the epoch.
fn timestamp(time: SystemTime) -> OffsetDateTime {
    let nanos = match time.duration_since(SystemTime::UNIX_EPOCH) {
        Ok(after) => i128::try_from(after.as_nanos()).ok(),
        Err(before) => i128::try_from(before.duration().as_nanos()).ok().map(|nanos| -nanos),
    };
    nanos
        .and_then(|nanos| OffsetDateTime::from_unix_timestamp_nanos(nanos).ok())
        .unwrap_or(OffsetDateTime::UNIX_EPOCH)
}

/// Total size in bytes of everything [`scan`] would list.
pub(crate) fn total_size(entries: &[Entry]) -> u64 {
    entries.iter().map(|entry| entry.size).sum()
}
