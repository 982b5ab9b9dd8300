//! Cache key derivation.
//!
//! A [`Key`] is the BLAKE3 digest of the input file's bytes followed by the
//! BLAKE3 digest of the configuration's canonical serialization, both
//! lowercase hex. Byte-identical inputs and equal configurations always
//! produce the same key, across processes and restarts.

use crate::error::{ErrorKind, Result};
use crate::format;
use exn::ResultExt;
use kiln_compress::Compression;
use serde::Serialize;
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::fs::File;
use std::io::Read;
use std::path::Path;
use tracing::instrument;

// Input files can be far larger than memory; they are hashed in chunks.
const BUFFER_SIZE: usize = 64 * 1024;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Key {
    content: String,
    config: String,
}

impl Key {
    /// Fingerprint an input file together with the configuration used to
    /// transform it.
    #[instrument(skip(input, config), fields(input = %input.display()))]
    pub fn derive<C: Serialize + ?Sized>(input: &Path, config: &C) -> Result<Self> {
        Ok(Self {
            content: digest_file(input)?,
            config: digest_config(config)?,
        })
    }

    /// Hex digest of the input file's contents.
    pub fn content_digest(&self) -> &str {
        &self.content
    }

    /// Hex digest of the configuration.
    pub fn config_digest(&self) -> &str {
        &self.config
    }

    /// The entry file name for this key in the given format.
    pub fn file_name(&self, compression: Compression) -> String {
        format!("{self}{}", format::suffix(compression))
    }
}

impl Display for Key {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{}{}", self.content, self.config)
    }
}

fn digest_file(path: &Path) -> Result<String> {
    let mut file = File::open(path).or_raise(|| ErrorKind::Io)?;
    let mut hasher = blake3::Hasher::new();
    let mut buffer = vec![0; BUFFER_SIZE];
    loop {
        match file.read(&mut buffer) {
            Ok(0) => break,
            Ok(read) => {
                hasher.update(&buffer[..read]);
            },
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e).or_raise(|| ErrorKind::Io),
        }
    }
    Ok(hasher.finalize().to_hex().to_string())
}

/// Going through [`serde_json::Value`] sorts object keys, so two equal
/// configurations hash identically even if one serializes a map in a
/// different iteration order.
fn digest_config<C: Serialize + ?Sized>(config: &C) -> Result<String> {
    let value = serde_json::to_value(config).or_raise(|| ErrorKind::Serialize)?;
    let canonical = serde_json::to_vec(&value).or_raise(|| ErrorKind::Serialize)?;
    Ok(blake3::hash(&canonical).to_hex().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Serialize;
    use std::collections::{BTreeMap, HashMap};
    use std::io::Write;

    #[derive(Serialize)]
    struct Options {
        threshold: u32,
        mode: &'static str,
    }

    fn input(contents: &[u8]) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(contents).unwrap();
        file
    }

    #[test]
    fn test_same_inputs_same_key() {
        let a = input(b"recording");
        let b = input(b"recording");
        let config = Options { threshold: 5, mode: "fast" };
        let first = Key::derive(a.path(), &config).unwrap();
        let second = Key::derive(b.path(), &config).unwrap();
        assert_eq!(first, second);
        assert_eq!(first.to_string(), second.to_string());
    }

    #[test]
    fn test_content_changes_key() {
        let a = input(b"recording one");
        let b = input(b"recording two");
        let config = Options { threshold: 5, mode: "fast" };
        let first = Key::derive(a.path(), &config).unwrap();
        let second = Key::derive(b.path(), &config).unwrap();
        assert_ne!(first.content_digest(), second.content_digest());
        assert_eq!(first.config_digest(), second.config_digest());
    }

    #[test]
    fn test_config_changes_key() {
        let file = input(b"recording");
        let first = Key::derive(file.path(), &Options { threshold: 5, mode: "fast" }).unwrap();
        let second = Key::derive(file.path(), &Options { threshold: 6, mode: "fast" }).unwrap();
        assert_eq!(first.content_digest(), second.content_digest());
        assert_ne!(first.config_digest(), second.config_digest());
    }

    #[test]
    fn test_map_order_does_not_matter() {
        let file = input(b"recording");
        let mut hashed = HashMap::new();
        let mut ordered = BTreeMap::new();
        for (k, v) in [("zeta", 1), ("alpha", 2), ("mu", 3)] {
            hashed.insert(k, v);
            ordered.insert(k, v);
        }
        assert_eq!(Key::derive(file.path(), &hashed).unwrap(), Key::derive(file.path(), &ordered).unwrap());
    }

    #[test]
    fn test_key_is_filesystem_safe() {
        let file = input(b"");
        let key = Key::derive(file.path(), &()).unwrap();
        let rendered = key.to_string();
        // Two 256-bit digests, hex encoded.
        assert_eq!(rendered.len(), 128);
        assert!(rendered.chars().all(|c| c.is_ascii_hexdigit()));
        assert_eq!(key.file_name(Compression::Gzip), format!("{rendered}.out.gz"));
    }

    #[test]
    fn test_large_file_matches_one_shot_hash() {
        let contents: Vec<u8> = (0..(BUFFER_SIZE * 3 + 17)).map(|i| (i % 251) as u8).collect();
        let file = input(&contents);
        let key = Key::derive(file.path(), &()).unwrap();
        assert_eq!(key.content_digest(), blake3::hash(&contents).to_hex().as_str());
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = Key::derive(&dir.path().join("missing.jfr"), &()).unwrap_err();
        assert_eq!(*err, ErrorKind::Io);
    }
}
