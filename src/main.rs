//! `kiln`: memoize the output of a command run over a file.
//!
//! ```text
//! kiln get recording.jfr -- jfr summary {}
//! ```
//!
//! The first call runs `jfr summary recording.jfr` and stores its standard
//! output; later calls with a byte-identical file and the same command line
//! print the stored artifact's path immediately.

mod cli;
mod command;
mod error;
mod logging;

use crate::cli::{Action, Cli};
use crate::command::CommandTransform;
use crate::error::{ErrorKind, Result};
use clap::Parser;
use exn::ResultExt;
use kiln_cache::DiskCache;
use kiln_config::Settings;
use std::io::{self, Write};
use std::process::ExitCode;

/// Exit status for "not cached", distinct from failure.
const EXIT_MISSING: u8 = 1;
const EXIT_FAILURE: u8 = 2;

/// How a successful run should exit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Outcome {
    Done,
    /// `exists` found nothing.
    Missing,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(&cli) {
        Ok(Outcome::Done) => ExitCode::SUCCESS,
        Ok(Outcome::Missing) => ExitCode::from(EXIT_MISSING),
        Err(err) => {
            eprintln!("kiln: {err:?}");
            ExitCode::from(EXIT_FAILURE)
        },
    }
}

fn run(cli: &Cli) -> Result<Outcome> {
    let settings = Settings::load(cli.config.as_deref()).or_raise(|| ErrorKind::Config)?;
    logging::init(settings.log.level_filter().or_raise(|| ErrorKind::Config)?, cli.verbose)?;
    execute(cli, &settings, &mut io::stdout().lock())
}

/// Carry out the subcommand against a cache built from `settings` and the
/// command-line overrides.
fn execute(cli: &Cli, settings: &Settings, out: &mut dyn Write) -> Result<Outcome> {
    let cache = DiskCache::new(CommandTransform, cli.cache_options(settings)?);
    match &cli.command {
        Action::Get { target, print } => {
            let path = cache.get(&target.input, &target.command_line()?).or_raise(|| ErrorKind::Cache)?;
            if *print {
                let mut artifact = kiln_cache::open(&path).or_raise(|| ErrorKind::Cache)?;
                io::copy(&mut artifact, &mut *out).or_raise(|| ErrorKind::Output)?;
            } else {
                writeln!(out, "{}", path.display()).or_raise(|| ErrorKind::Output)?;
            }
        },
        Action::Key(target) => {
            let key = cache.key(&target.input, &target.command_line()?).or_raise(|| ErrorKind::Cache)?;
            writeln!(out, "{key}").or_raise(|| ErrorKind::Output)?;
        },
        Action::Exists(target) => {
            if !cache.contains(&target.input, &target.command_line()?).or_raise(|| ErrorKind::Cache)? {
                return Ok(Outcome::Missing);
            }
        },
        Action::Prune => {
            let report = cache.ensure_free_space(0).or_raise(|| ErrorKind::Cache)?;
            writeln!(
                out,
                "removed {} entries ({} bytes); {} bytes remaining",
                report.removed, report.freed, report.remaining
            )
            .or_raise(|| ErrorKind::Output)?;
        },
        Action::Stats => {
            let entries = cache.entries().or_raise(|| ErrorKind::Cache)?;
            let usage: u64 = entries.iter().map(|entry| entry.size).sum();
            let directory = cache.directory().map(|d| d.display().to_string()).unwrap_or_else(|| "(temporary)".into());
            writeln!(out, "directory:   {directory}").or_raise(|| ErrorKind::Output)?;
            writeln!(out, "format:      {}", cache.compression()).or_raise(|| ErrorKind::Output)?;
            writeln!(out, "budget:      {} bytes", cache.budget()).or_raise(|| ErrorKind::Output)?;
            writeln!(out, "usage:       {usage} bytes").or_raise(|| ErrorKind::Output)?;
            writeln!(out, "entries:     {}", entries.len()).or_raise(|| ErrorKind::Output)?;
            if let Some(oldest) = entries.first() {
                writeln!(out, "oldest:      {}", oldest.modified).or_raise(|| ErrorKind::Output)?;
            }
        },
        Action::Clear => cache.shutdown(),
    }
    out.flush().or_raise(|| ErrorKind::Output)?;
    Ok(Outcome::Done)
}
