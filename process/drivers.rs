//! This module is responsible for the external tools the
//! program delegates to. Each tool gets a driver that knows how to
//! turn options into a `Command` and how to read its result, while
//! the actual spawning is left to a [`ProcessRunner`].

use std::io;

use miette::Diagnostic;
use thiserror::Error;

use crate::runner::ProcessRunner;

pub use cosign_driver::CosignDriver;
pub use docker_driver::{DockerDriver, buildx_command};
pub use git_driver::GitDriver;
pub use grype_driver::GrypeDriver;
pub use traits::*;
pub use trivy_driver::TrivyDriver;

mod cosign_driver;
mod docker_driver;
mod git_driver;
mod grype_driver;
pub mod opts;
mod traits;
mod trivy_driver;
pub mod types;

/// Errors from running an external tool.
#[derive(Debug, Error, Diagnostic)]
pub enum ExternalToolError {
    #[error("`{0}` was not found in PATH")]
    #[diagnostic(
        code(gfxbuild::tool_not_found),
        help("Install `{0}` or make sure it is on your PATH")
    )]
    NotFound(String),

    #[error("`{tool}` exited with status {code}")]
    #[diagnostic(code(gfxbuild::tool_failed))]
    Failed { tool: String, code: i32 },

    #[error("Failed to run `{tool}`")]
    #[diagnostic(code(gfxbuild::tool_io))]
    Io {
        tool: String,
        #[source]
        source: io::Error,
    },
}

impl ExternalToolError {
    pub(crate) fn spawn(tool: &str, source: io::Error) -> Self {
        if source.kind() == io::ErrorKind::NotFound {
            Self::NotFound(tool.to_string())
        } else {
            Self::Io {
                tool: tool.to_string(),
                source,
            }
        }
    }

    pub(crate) fn failed(tool: &str, status: std::process::ExitStatus) -> Self {
        Self::Failed {
            tool: tool.to_string(),
            // Killed by a signal, there's no code to pass along.
            code: status.code().unwrap_or(1),
        }
    }
}

/// Shorthand for the drivers' results.
pub type ToolResult<T = ()> = Result<T, ExternalToolError>;

/// Gives every driver access to the runner it was created with.
macro_rules! impl_runner_driver {
    ($($driver:ident),* $(,)?) => {
        $(
            impl<'a> $driver<'a> {
                #[must_use]
                pub fn new(runner: &'a dyn ProcessRunner) -> Self {
                    Self { runner }
                }
            }
        )*
    };
}

impl_runner_driver!(DockerDriver, TrivyDriver, GrypeDriver, CosignDriver, GitDriver);
