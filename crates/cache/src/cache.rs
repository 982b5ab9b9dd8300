use crate::entry::{self, Entry};
use crate::error::{ErrorKind, Result};
use crate::evict::{self, Eviction};
use crate::format;
use crate::key::Key;
use crate::location::{Location, Root};
use crate::transform::Transform;
use exn::ResultExt;
use kiln_compress::Compression;
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Instant;
use tracing::instrument;

/// Default size budget: roughly two gigabytes.
pub const DEFAULT_MAX_SIZE: u64 = 2_000_000_000;

const PARTIAL_PREFIX: &str = ".kiln-";
const PARTIAL_SUFFIX: &str = ".partial";

/// Construction options for a [`DiskCache`].
///
/// # Example
///
/// ```
/// use kiln_cache::CacheOptions;
/// use kiln_compress::Compression;
///
/// let options = CacheOptions::new()
///     .with_directory("/var/cache/kiln")
///     .with_max_size(500_000_000)
///     .with_compression(Compression::None);
/// assert_eq!(options.max_size(), 500_000_000);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheOptions {
    location: Location,
    max_size: u64,
    compression: Compression,
}
impl Default for CacheOptions {
    fn default() -> Self {
        Self {
            location: Location::Temporary,
            max_size: DEFAULT_MAX_SIZE,
            compression: Compression::Gzip,
        }
    }
}
impl CacheOptions {
    /// Temporary directory, [`DEFAULT_MAX_SIZE`] budget, Gzip artifacts.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_location(mut self, location: Location) -> Self {
        self.location = location;
        self
    }

    pub fn with_directory(self, directory: impl Into<PathBuf>) -> Self {
        self.with_location(Location::Directory(directory.into()))
    }

    pub fn with_max_size(mut self, bytes: u64) -> Self {
        self.max_size = bytes;
        self
    }

    /// Format used by [`DiskCache::get`]; [`DiskCache::get_as`] can still
    /// ask for the other one.
    pub fn with_compression(mut self, compression: Compression) -> Self {
        self.compression = compression;
        self
    }

    pub fn location(&self) -> &Location {
        &self.location
    }

    pub fn max_size(&self) -> u64 {
        self.max_size
    }

    pub fn compression(&self) -> Compression {
        self.compression
    }
}

struct State {
    root: Root,
    budget: u64,
}

/// A size-bounded, content-addressed disk cache of [`Transform`] outputs.
///
/// Every operation that looks at the directory or the budget runs under one
/// instance-wide lock, including the transformation itself on a miss. Two
/// misses never run concurrently, even for different keys, and eviction
/// always sees a directory nobody else is writing to. Share the cache
/// between threads with an [`Arc`](std::sync::Arc).
///
/// # Example
///
/// ```
/// use kiln_cache::{CacheOptions, DiskCache, Transform};
/// use std::io::Write;
/// use std::path::Path;
///
/// struct Passthrough;
/// impl Transform for Passthrough {
///     type Config = u32;
///     type Error = std::io::Error;
///     fn transform(&self, input: &Path, _: &u32, output: &mut dyn Write) -> std::io::Result<()> {
///         output.write_all(&std::fs::read(input)?)
///     }
/// }
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let scratch = tempfile::tempdir()?;
/// let input = scratch.path().join("input.txt");
/// std::fs::write(&input, b"hello")?;
///
/// let cache = DiskCache::new(Passthrough, CacheOptions::new().with_directory(scratch.path().join("cache")));
/// let first = cache.get(&input, &1)?;
/// let second = cache.get(&input, &1)?;
/// assert_eq!(first, second);
/// assert_ne!(first, cache.get(&input, &2)?);
/// cache.shutdown();
/// # Ok(())
/// # }
/// ```
pub struct DiskCache<T: Transform> {
    transform: T,
    compression: Compression,
    state: Mutex<State>,
}

impl<T: Transform> DiskCache<T> {
    pub fn new(transform: T, options: CacheOptions) -> Self {
        let state = State {
            root: Root::new(options.location),
            budget: options.max_size,
        };
        Self {
            transform,
            compression: options.compression,
            state: Mutex::new(state),
        }
    }

    // The guarded state is a budget and a directory path; neither can be
    // left half-written by a panicking holder.
    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// The default artifact format.
    pub fn compression(&self) -> Compression {
        self.compression
    }

    /// Derive the key for `(input, config)` without touching the cache.
    pub fn key(&self, input: &Path, config: &T::Config) -> Result<Key> {
        Key::derive(input, config)
    }

    /// Path to the artifact for `(input, config)` in the default format,
    /// transforming the input first if no artifact exists yet.
    pub fn get(&self, input: &Path, config: &T::Config) -> Result<PathBuf> {
        self.get_as(input, config, &format::suffix(self.compression))
    }

    /// Like [`get`](Self::get), for an explicit artifact suffix.
    ///
    /// Fails with [`InvalidArgument`](ErrorKind::InvalidArgument) before
    /// doing anything else if `suffix` is not one of the recognized ones.
    #[instrument(skip(self, input, config), fields(input = %input.display(), key))]
    pub fn get_as(&self, input: &Path, config: &T::Config, suffix: &str) -> Result<PathBuf> {
        let compression = format::parse_suffix(suffix)?;
        // Hashing reads only the input, never the cache, so it stays
        // outside the lock.
        let key = Key::derive(input, config)?;
        tracing::Span::current().record("key", tracing::field::display(&key));
        let mut state = self.lock();
        let directory = state.root.prepare();
        let path = directory.join(key.file_name(compression));
        if path.is_file() {
            tracing::debug!(path = %path.display(), "Cache hit");
            return Ok(path);
        }
        self.materialize(input, config, &directory, &path, compression)?;
        evict::ensure_free_space(&directory, state.budget, 0, Some(&path))?;
        Ok(path)
    }

    /// Run the transformation into a temporary file next to `path`, then
    /// move it into place. Nothing appears at `path` unless every step
    /// succeeded.
    fn materialize(
        &self,
        input: &Path,
        config: &T::Config,
        directory: &Path,
        path: &Path,
        compression: Compression,
    ) -> Result<()> {
        let started = Instant::now();
        let partial = tempfile::Builder::new()
            .prefix(PARTIAL_PREFIX)
            .suffix(PARTIAL_SUFFIX)
            .tempfile_in(directory)
            .or_raise(|| ErrorKind::Io)?;
        let mut encoder = compression.encoder(BufWriter::new(partial));
        self.transform.transform(input, config, &mut encoder).or_raise(|| ErrorKind::Transform)?;
        let buffered = encoder.finish().map_err(ErrorKind::compression)?;
        let partial = buffered.into_inner().map_err(|e| e.into_error()).or_raise(|| ErrorKind::Io)?;
        partial.as_file().sync_all().or_raise(|| ErrorKind::Io)?;
        let file = partial.persist(path).map_err(|e| e.error).or_raise(|| ErrorKind::Io)?;
        let size = file.metadata().map(|m| m.len()).unwrap_or_default();
        tracing::info!(
            path = %path.display(),
            size,
            format = %compression,
            elapsed = ?started.elapsed(),
            "Materialized cache entry"
        );
        Ok(())
    }

    /// Whether an artifact for `key` exists in the default format.
    ///
    /// Never creates anything and never affects eviction order.
    pub fn exists(&self, key: &Key) -> bool {
        let state = self.lock();
        state.root.peek().is_some_and(|directory| directory.join(key.file_name(self.compression)).is_file())
    }

    /// Whether an artifact for `(input, config)` exists in the default format.
    pub fn contains(&self, input: &Path, config: &T::Config) -> Result<bool> {
        let key = Key::derive(input, config)?;
        Ok(self.exists(&key))
    }

    /// Current size budget in bytes.
    pub fn budget(&self) -> u64 {
        self.lock().budget
    }

    /// Replace the size budget and immediately evict down to it.
    #[instrument(skip(self))]
    pub fn set_budget(&self, bytes: u64) -> Result<Eviction> {
        let mut state = self.lock();
        state.budget = bytes;
        Self::evict(&state, 0)
    }

    /// Evict until `reserved` bytes are free below the budget.
    #[instrument(skip(self))]
    pub fn ensure_free_space(&self, reserved: u64) -> Result<Eviction> {
        let state = self.lock();
        Self::evict(&state, reserved)
    }

    fn evict(state: &State, reserved: u64) -> Result<Eviction> {
        match state.root.peek() {
            Some(directory) => evict::ensure_free_space(directory, state.budget, reserved, None),
            None => Ok(Eviction::default()),
        }
    }

    /// Every file in the cache directory, oldest first.
    pub fn entries(&self) -> Result<Vec<Entry>> {
        let state = self.lock();
        match state.root.peek() {
            Some(directory) => entry::scan(directory),
            None => Ok(Vec::new()),
        }
    }

    /// Total bytes currently on disk.
    pub fn usage(&self) -> Result<u64> {
        Ok(entry::total_size(&self.entries()?))
    }

    /// The cache directory, if one has been chosen yet.
    pub fn directory(&self) -> Option<PathBuf> {
        self.lock().root.peek().map(Path::to_path_buf)
    }

    /// Delete the cache directory and everything in it.
    ///
    /// Best-effort and idempotent. The cache stays usable afterwards and
    /// recreates its directory on the next [`get`](Self::get).
    #[instrument(skip(self))]
    pub fn shutdown(&self) {
        self.lock().root.teardown();
    }
}
