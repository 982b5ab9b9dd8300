//! Shell commands as cache transformations.

use derive_more::{Display, Error};
use kiln_cache::Transform;
use serde::Serialize;
use std::ffi::OsString;
use std::io::{self, Write};
use std::path::Path;
use std::process::{Command, ExitStatus, Stdio};

/// Replaced by the input path wherever it appears as a whole argument.
pub const PLACEHOLDER: &str = "{}";

/// A program and its arguments, exactly as typed.
///
/// This is what gets fingerprinted, so the same command line produces the
/// same key on any machine regardless of where the program is installed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommandLine {
    pub program: String,
    pub args: Vec<String>,
}

impl CommandLine {
    /// Split `words` into program and arguments. `None` when empty.
    pub fn from_words(words: &[String]) -> Option<Self> {
        let (program, args) = words.split_first()?;
        Some(Self { program: program.clone(), args: args.to_vec() })
    }

    /// Arguments for a run over `input`: substituted for every
    /// [`PLACEHOLDER`], or appended when there is none.
    fn arguments(&self, input: &Path) -> Vec<OsString> {
        let mut substituted = false;
        let mut arguments: Vec<OsString> = self
            .args
            .iter()
            .map(|arg| match arg.as_str() {
                PLACEHOLDER => {
                    substituted = true;
                    input.as_os_str().to_owned()
                },
                _ => OsString::from(arg),
            })
            .collect();
        if !substituted {
            arguments.push(input.as_os_str().to_owned());
        }
        arguments
    }
}

#[derive(Debug, Display, Error)]
pub enum CommandError {
    #[display("program `{program}` not found")]
    NotFound { program: String, source: which::Error },
    #[display("could not run command")]
    Io(io::Error),
    #[display("command exited unsuccessfully ({_0})")]
    Failed(#[error(not(source))] ExitStatus),
}

/// Runs a [`CommandLine`] over the input and captures its standard output.
/// Standard error passes through to the terminal.
#[derive(Debug, Default, Clone, Copy)]
pub struct CommandTransform;

impl Transform for CommandTransform {
    type Config = CommandLine;
    type Error = CommandError;

    fn transform(&self, input: &Path, command: &CommandLine, output: &mut dyn Write) -> Result<(), CommandError> {
        let program = which::which(&command.program)
            .map_err(|source| CommandError::NotFound { program: command.program.clone(), source })?;
        tracing::debug!(program = %program.display(), input = %input.display(), "Running command");
        let mut child = Command::new(&program)
            .args(command.arguments(input))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .spawn()
            .map_err(CommandError::Io)?;
        let copied = match child.stdout.take() {
            Some(mut stdout) => io::copy(&mut stdout, output),
            None => Ok(0),
        };
        if let Err(e) = copied {
            // Don't leave the child blocked on a full pipe.
            let _ = child.kill();
            let _ = child.wait();
            return Err(CommandError::Io(e));
        }
        let status = child.wait().map_err(CommandError::Io)?;
        if !status.success() {
            return Err(CommandError::Failed(status));
        }
        Ok(())
    }
}
