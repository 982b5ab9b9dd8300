//! `--compress[=FORMAT]` handling.
//!
//! The flag has three states on the command line: absent, bare, or carrying
//! a format name. Only an absent flag defers to configuration.

use crate::Compression;
use crate::error::Result;

/// What the command line asked for.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum Preference {
    /// `--compress=FORMAT`
    Explicit(Compression),
    /// `--compress` with no format
    Implicit,
    /// No flag at all
    #[default]
    NotSpecified,
}

impl Preference {
    /// Interpret the value clap produces for an
    /// `Option<Option<String>>` field declared with `num_args = 0..=1`.
    pub fn from_flag(flag: Option<Option<&str>>) -> Result<Self> {
        Ok(match flag {
            None => Self::NotSpecified,
            Some(None | Some("")) => Self::Implicit,
            Some(Some(name)) => Self::Explicit(name.parse()?),
        })
    }

    /// The format to write, given the one from configuration.
    pub fn resolve(self, configured: Compression) -> Compression {
        match self {
            Self::Explicit(format) => format,
            Self::Implicit => Compression::Gzip,
            Self::NotSpecified => configured,
        }
    }
}
