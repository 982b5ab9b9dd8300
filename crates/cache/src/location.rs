//! Cache directory lifecycle.
//!
//! Creation and teardown are best-effort: failures are logged and swallowed.
//! A cache whose directory could not be created surfaces the problem later,
//! as an I/O error from the write that actually needed it.

use std::fs;
use std::path::{Path, PathBuf};

const TEMPORARY_PREFIX: &str = "kiln-";

/// Where a cache keeps its entries.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Location {
    /// A caller-supplied directory, reused as-is across restarts.
    Directory(PathBuf),
    /// A fresh temporary directory, created on first use and kept until
    /// the cache is shut down.
    #[default]
    Temporary,
}

impl From<PathBuf> for Location {
    fn from(path: PathBuf) -> Self {
        Self::Directory(path)
    }
}
impl From<&Path> for Location {
    fn from(path: &Path) -> Self {
        Self::Directory(path.to_path_buf())
    }
}

/// The resolved state of a [`Location`]. Lives behind the cache lock.
#[derive(Debug)]
pub(crate) struct Root {
    location: Location,
    temporary: Option<PathBuf>,
}

impl Root {
    pub(crate) fn new(location: Location) -> Self {
        Self { location, temporary: None }
    }

    /// The directory, if one has been chosen. Never touches the filesystem.
    pub(crate) fn peek(&self) -> Option<&Path> {
        match &self.location {
            Location::Directory(path) => Some(path.as_path()),
            Location::Temporary => self.temporary.as_deref(),
        }
    }

    /// The directory, choosing and creating it first if necessary.
    pub(crate) fn prepare(&mut self) -> PathBuf {
        let directory = match &self.location {
            Location::Directory(path) => path.clone(),
            Location::Temporary => self.temporary.get_or_insert_with(create_temporary).clone(),
        };
        if let Err(e) = fs::create_dir_all(&directory) {
            tracing::warn!(directory = %directory.display(), error = %e, "Could not create cache directory");
        }
        directory
    }

    /// Remove the directory and everything in it.
    ///
    /// A temporary location forgets its directory, so the next use gets a
    /// new one.
    pub(crate) fn teardown(&mut self) {
        let directory = match &self.location {
            Location::Directory(path) => Some(path.clone()),
            Location::Temporary => self.temporary.take(),
        };
        let Some(directory) = directory else {
            return;
        };
        match fs::remove_dir_all(&directory) {
            Ok(()) => tracing::debug!(directory = %directory.display(), "Removed cache directory"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {},
            Err(e) => {
                tracing::warn!(directory = %directory.display(), error = %e, "Could not remove cache directory")
            },
        }
    }
}

fn create_temporary() -> PathBuf {
    match tempfile::Builder::new().prefix(TEMPORARY_PREFIX).tempdir() {
        // Ownership moves to the cache; it is removed by teardown, not on drop.
        Ok(dir) => dir.keep(),
        Err(e) => {
            let fallback = std::env::temp_dir().join(format!("{TEMPORARY_PREFIX}{}", std::process::id()));
            tracing::warn!(
                fallback = %fallback.display(),
                error = %e,
                "Could not create temporary cache directory; using fallback"
            );
            fallback
        },
    }
}
