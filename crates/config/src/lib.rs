//! Layered configuration for kiln.
//!
//! Sources are merged in order, later ones winning:
//!
//! 1. Built-in defaults ([`Settings::default`])
//! 2. A TOML file, either given explicitly or `kiln.toml` in the platform
//!    configuration directory
//! 3. Environment variables prefixed `KILN_`, with `__` separating nested
//!    keys (`KILN_CACHE__MAX_SIZE=500000000`)

pub mod error;

use crate::error::{ErrorKind, Result};
use directories::ProjectDirs;
use exn::ResultExt;
use figment::Figment;
use figment::providers::{Env, Format, Serialized, Toml};
use kiln_cache::CacheOptions;
use kiln_compress::Compression;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::level_filters::LevelFilter;

const FILE_NAME: &str = "kiln.toml";
const ENV_PREFIX: &str = "KILN_";
const ENV_SEPARATOR: &str = "__";

pub use kiln_cache::DEFAULT_MAX_SIZE;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub cache: CacheSettings,
    pub log: LogSettings,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheSettings {
    /// Where entries are stored. `None` means a throwaway temporary
    /// directory, used when the platform has no cache directory.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub directory: Option<PathBuf>,
    /// Size budget in bytes
    pub max_size: u64,
    /// Format of newly written artifacts
    pub compression: Compression,
}

impl Default for CacheSettings {
    fn default() -> Self {
        let options = CacheOptions::default();
        Self {
            directory: project_dirs().map(|dirs| dirs.cache_dir().to_path_buf()),
            max_size: options.max_size(),
            compression: options.compression(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogSettings {
    /// Default filter level (`RUST_LOG` still takes precedence)
    pub level: String,
}

impl Default for LogSettings {
    fn default() -> Self {
        Self { level: "info".to_string() }
    }
}

impl LogSettings {
    pub fn level_filter(&self) -> Result<LevelFilter> {
        LevelFilter::from_str(&self.level).or_raise(|| ErrorKind::Invalid(format!("unknown log level `{}`", self.level)))
    }
}

impl Settings {
    /// Load and validate settings.
    ///
    /// An explicit `file` must exist. Without one, the platform configuration
    /// file is merged only if present.
    pub fn load(file: Option<&Path>) -> Result<Self> {
        let file = match file {
            Some(path) if !path.is_file() => {
                exn::bail!(ErrorKind::Invalid(format!("configuration file not found: {}", path.display())));
            },
            Some(path) => Some(path.to_path_buf()),
            None => default_file().filter(|path| path.is_file()),
        };
        let mut figment = Figment::from(Serialized::defaults(Settings::default()));
        if let Some(path) = &file {
            tracing::debug!(file = %path.display(), "Merging configuration file");
            figment = figment.merge(Toml::file(path));
        }
        let settings: Settings = figment
            .merge(Env::prefixed(ENV_PREFIX).split(ENV_SEPARATOR))
            .extract()
            .or_raise(|| ErrorKind::Load)?;
        settings.validate()?;
        Ok(settings)
    }

    fn validate(&self) -> Result<()> {
        if self.cache.max_size == 0 {
            exn::bail!(ErrorKind::Invalid("cache.max_size must be positive".to_string()));
        }
        self.log.level_filter()?;
        Ok(())
    }
}

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("", "", "kiln")
}

/// `kiln.toml` in the platform configuration directory.
pub fn default_file() -> Option<PathBuf> {
    project_dirs().map(|dirs| dirs.config_dir().join(FILE_NAME))
}
