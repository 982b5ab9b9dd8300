use crate::command::CommandLine;
use crate::error::{ErrorKind, Result};
use clap::{ArgAction, Args, Parser, Subcommand};
use exn::{OptionExt, ResultExt};
use kiln_cache::{CacheOptions, Location};
use kiln_compress::cli::Preference;
use kiln_config::Settings;
use std::path::PathBuf;

/// Memoize the output of a command run over a file.
#[derive(Debug, Parser)]
#[command(name = "kiln", version, about)]
pub struct Cli {
    /// Configuration file (default: kiln.toml in the platform config directory)
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Cache directory
    #[arg(long, global = true, value_name = "DIR")]
    pub cache_dir: Option<PathBuf>,

    /// Size budget in bytes
    #[arg(long, global = true, value_name = "BYTES")]
    pub max_size: Option<u64>,

    /// Compress new artifacts (gzip unless FORMAT is given)
    #[arg(long, global = true, value_name = "FORMAT", num_args = 0..=1, require_equals = true)]
    pub compress: Option<Option<String>>,

    /// More logging; repeat for more still
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Action,
}

#[derive(Debug, Subcommand)]
pub enum Action {
    /// Print the path of the cached output, running the command on a miss
    Get {
        #[command(flatten)]
        target: Target,
        /// Write the (decompressed) output to stdout instead of its path
        #[arg(long)]
        print: bool,
    },
    /// Print the cache key without running anything
    Key(Target),
    /// Exit successfully only if the output is already cached
    Exists(Target),
    /// Evict the oldest entries until the cache fits its budget
    Prune,
    /// Show the cache directory, budget and usage
    Stats,
    /// Delete the cache directory
    Clear,
}

#[derive(Debug, Args)]
pub struct Target {
    /// File to run the command over
    pub input: PathBuf,
    /// Command to run; `{}` is replaced by the input path, which is
    /// otherwise appended
    #[arg(last = true, required = true, value_name = "COMMAND")]
    pub command: Vec<String>,
}

impl Target {
    pub fn command_line(&self) -> Result<CommandLine> {
        CommandLine::from_words(&self.command).ok_or_raise(|| ErrorKind::Config)
    }
}

impl Cli {
    /// Merge command-line overrides over loaded settings.
    pub fn cache_options(&self, settings: &Settings) -> Result<CacheOptions> {
        let preference = Preference::from_flag(self.compress.as_ref().map(Option::as_deref)).or_raise(|| ErrorKind::Config)?;
        let location = match self.cache_dir.clone().or_else(|| settings.cache.directory.clone()) {
            Some(directory) => Location::Directory(directory),
            None => Location::Temporary,
        };
        let max_size = self.max_size.unwrap_or(settings.cache.max_size);
        if max_size == 0 {
            exn::bail!(ErrorKind::Config);
        }
        Ok(CacheOptions::new()
            .with_location(location)
            .with_max_size(max_size)
            .with_compression(preference.resolve(settings.cache.compression)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kiln_compress::Compression;
    use rstest::rstest;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("kiln").chain(args.iter().copied())).unwrap()
    }

    fn settings() -> Settings {
        let mut settings = Settings::default();
        settings.cache.directory = Some(PathBuf::from("/configured"));
        settings.cache.max_size = 1000;
        settings.cache.compression = Compression::None;
        settings
    }

    #[test]
    fn test_get_with_command() {
        let cli = parse(&["get", "--print", "in.bin", "--", "wc", "-c", "{}"]);
        let Action::Get { target, print } = cli.command else {
            panic!("expected get");
        };
        assert!(print);
        assert_eq!(target.input, PathBuf::from("in.bin"));
        let command = target.command_line().unwrap();
        assert_eq!(command.program, "wc");
        assert_eq!(command.args, ["-c", "{}"]);
    }

    #[test]
    fn test_command_is_required() {
        assert!(Cli::try_parse_from(["kiln", "key", "in.bin"]).is_err());
    }

    #[test]
    fn test_settings_apply_without_flags() {
        let options = parse(&["stats"]).cache_options(&settings()).unwrap();
        assert_eq!(options.location(), &Location::Directory(PathBuf::from("/configured")));
        assert_eq!(options.max_size(), 1000);
        assert_eq!(options.compression(), Compression::None);
    }

    #[rstest]
    #[case(&["--compress", "stats"], Compression::Gzip)]
    #[case(&["--compress=none", "stats"], Compression::None)]
    #[case(&["stats", "--compress=gzip"], Compression::Gzip)]
    fn test_compress_flag(#[case] args: &[&str], #[case] expected: Compression) {
        let options = parse(args).cache_options(&settings()).unwrap();
        assert_eq!(options.compression(), expected);
    }

    #[test]
    fn test_flags_override_settings() {
        let options = parse(&["prune", "--max-size", "50", "--cache-dir", "/override"]).cache_options(&settings()).unwrap();
        assert_eq!(options.location(), &Location::Directory(PathBuf::from("/override")));
        assert_eq!(options.max_size(), 50);
    }

    #[test]
    fn test_no_directory_means_temporary() {
        let mut settings = settings();
        settings.cache.directory = None;
        let options = parse(&["stats"]).cache_options(&settings).unwrap();
        assert_eq!(options.location(), &Location::Temporary);
    }

    #[rstest]
    #[case(&["--max-size", "0", "stats"])]
    #[case(&["--compress=zstd", "stats"])]
    fn test_invalid_overrides(#[case] args: &[&str]) {
        let err = parse(args).cache_options(&settings()).unwrap_err();
        assert_eq!(*err, ErrorKind::Config);
    }
}
