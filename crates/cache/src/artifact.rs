//! Reading artifacts back.

use crate::error::{ErrorKind, Result};
use crate::format;
use exn::{OptionExt, ResultExt};
use kiln_compress::Compression;
use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::Path;

/// Open an artifact returned by [`DiskCache::get`](crate::DiskCache::get),
/// decompressing transparently according to its suffix.
///
/// An artifact can be evicted at any time after `get` returns, which shows
/// up here as [`NotFound`](ErrorKind::NotFound). Compressed artifacts whose
/// leading bytes do not match their suffix are [`Corrupt`](ErrorKind::Corrupt).
pub fn open(path: &Path) -> Result<Box<dyn Read>> {
    let compression = path
        .file_name()
        .and_then(|name| name.to_str())
        .and_then(format::split_file_name)
        .map(|(_, compression)| compression)
        .ok_or_raise(|| ErrorKind::InvalidArgument(format!("not an artifact: {}", path.display())))?;
    let file = match File::open(path) {
        Ok(file) => file,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(e).or_raise(|| ErrorKind::NotFound(path.to_path_buf()));
        },
        Err(e) => return Err(e).or_raise(|| ErrorKind::Io),
    };
    let mut reader = BufReader::new(file);
    let head = reader.fill_buf().or_raise(|| ErrorKind::Io)?;
    if compression != Compression::None && !compression.check_magic_bytes(head) {
        exn::bail!(ErrorKind::Corrupt(path.to_path_buf()));
    }
    Ok(compression.wrap_reader(reader))
}
