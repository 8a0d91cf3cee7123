use std::path::PathBuf;

use clap::{Parser, Subcommand, crate_authors};
use clap_verbosity_flag::{InfoLevel, Verbosity};
use log::error;
use miette::Diagnostic;
use thiserror::Error;

use crate::dispatch::ExitOutcome;

pub mod build;
pub mod completions;
pub mod stamp;

pub trait GfxBuildCommand {
    /// Runs the command and returns how it ended.
    ///
    /// # Errors
    /// Can return a `miette` Error
    fn try_run(&mut self) -> miette::Result<ExitOutcome>;

    /// Runs the command and returns the status to exit with.
    fn run(&mut self) -> i32 {
        match self.try_run() {
            Ok(outcome) => outcome.code(),
            Err(e) => {
                error!("{e:?}");
                1
            }
        }
    }
}

/// Problems with how the program was called.
#[derive(Debug, Error, Diagnostic)]
pub enum ValidationError {
    #[error(transparent)]
    #[diagnostic(code(gfxbuild::usage))]
    Usage(#[from] clap::Error),
}

impl ValidationError {
    /// `--help` and `--version` end up here too and aren't failures.
    #[must_use]
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Usage(e) => i32::from(e.use_stderr()),
        }
    }

    /// Prints the message the way clap formats it.
    pub fn print(&self) {
        match self {
            Self::Usage(e) => {
                let _ = e.print();
            }
        }
    }
}

#[derive(Parser, Debug)]
#[clap(
    name = "gfxbuild",
    about,
    long_about = None,
    author = crate_authors!(),
    version,
    args_conflicts_with_subcommands = true,
)]
pub struct GfxBuildArgs {
    #[command(subcommand)]
    pub command: Option<CommandArgs>,

    #[clap(flatten)]
    pub build: build::BuildCommand,

    #[clap(flatten)]
    pub verbosity: Verbosity<InfoLevel>,

    /// The directory to write the log file to.
    ///
    /// Defaults to `~/.cache/gfxbuild`.
    #[arg(long, global = true)]
    pub log_out: Option<PathBuf>,
}

impl GfxBuildArgs {
    /// Parses the process arguments.
    ///
    /// # Errors
    /// Will error on bad usage, and for `--help` and `--version`.
    pub fn try_parse_args() -> Result<Self, ValidationError> {
        Ok(Self::try_parse()?)
    }
}

#[derive(Debug, Subcommand)]
pub enum CommandArgs {
    /// Write the current build date and revision
    /// into the configuration file
    Stamp(stamp::StampCommand),

    /// Generate shell completions for your shell to stdout
    Completions(completions::CompletionsCommand),
}
