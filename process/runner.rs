//! The seam between the drivers and the operating system.
//!
//! Every external tool is spawned from a `Command` built out of
//! discrete arguments and handed to a [`ProcessRunner`]. Nothing is
//! ever passed through a shell.

use std::{
    io,
    process::{Command, ExitStatus, Output},
};

use log::trace;

use crate::logging::CommandLogging;

#[cfg(any(test, feature = "test"))]
pub use fake::*;

pub trait ProcessRunner {
    /// Runs the command to completion, capturing stdout and stderr.
    ///
    /// # Errors
    /// Will error if the process couldn't be spawned.
    fn output(&self, command: Command) -> io::Result<Output>;

    /// Runs the command to completion, streaming its output
    /// to the log prefixed with the image it works on.
    ///
    /// # Errors
    /// Will error if the process couldn't be spawned.
    fn status(&self, command: Command, image_ref: &str, message: &str) -> io::Result<ExitStatus>;
}

/// Runs commands on the host.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemRunner;

impl ProcessRunner for SystemRunner {
    fn output(&self, mut command: Command) -> io::Result<Output> {
        trace!("{command:?}");
        command.output()
    }

    fn status(&self, command: Command, image_ref: &str, message: &str) -> io::Result<ExitStatus> {
        trace!("{command:?}");
        command.build_status(image_ref, message)
    }
}

/// Renders a command as a single line with its
/// arguments joined by spaces.
#[must_use]
pub fn command_line(command: &Command) -> String {
    std::iter::once(command.get_program())
        .chain(command.get_args())
        .map(|arg| arg.to_string_lossy())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Collects the program and arguments of a command
/// as separate tokens.
#[must_use]
pub fn command_tokens(command: &Command) -> Vec<String> {
    std::iter::once(command.get_program())
        .chain(command.get_args())
        .map(|arg| arg.to_string_lossy().into_owned())
        .collect()
}

#[cfg(any(test, feature = "test"))]
mod fake {
    use std::{
        cell::RefCell,
        collections::VecDeque,
        io,
        os::unix::process::ExitStatusExt,
        process::{Command, ExitStatus, Output},
    };

    use super::{ProcessRunner, command_tokens};

    #[derive(Debug, Clone)]
    pub enum FakeResponse {
        Exit {
            code: i32,
            stdout: String,
            stderr: String,
        },
        NotFound,
    }

    /// Records every command it's given and answers with
    /// scripted responses in order. Once the script runs out
    /// every command succeeds with no output.
    #[derive(Debug, Default)]
    pub struct FakeRunner {
        calls: RefCell<Vec<Vec<String>>>,
        log_refs: RefCell<Vec<String>>,
        responses: RefCell<VecDeque<FakeResponse>>,
    }

    impl FakeRunner {
        #[must_use]
        pub fn new() -> Self {
            Self::default()
        }

        #[must_use]
        pub fn respond(self, code: i32, stdout: &str, stderr: &str) -> Self {
            self.responses.borrow_mut().push_back(FakeResponse::Exit {
                code,
                stdout: stdout.into(),
                stderr: stderr.into(),
            });
            self
        }

        #[must_use]
        pub fn not_found(self) -> Self {
            self.responses.borrow_mut().push_back(FakeResponse::NotFound);
            self
        }

        /// Every command run so far, program first.
        #[must_use]
        pub fn calls(&self) -> Vec<Vec<String>> {
            self.calls.borrow().clone()
        }

        /// The image refs streamed commands were logged under.
        #[must_use]
        pub fn log_refs(&self) -> Vec<String> {
            self.log_refs.borrow().clone()
        }

        /// The program and first argument of every call,
        /// e.g. `"docker buildx"`.
        #[must_use]
        pub fn programs(&self) -> Vec<String> {
            self.calls
                .borrow()
                .iter()
                .map(|call| call.iter().take(2).cloned().collect::<Vec<_>>().join(" "))
                .collect()
        }

        fn next(&self, command: &Command) -> io::Result<(ExitStatus, String, String)> {
            self.calls.borrow_mut().push(command_tokens(command));

            match self.responses.borrow_mut().pop_front() {
                None => Ok((ExitStatus::from_raw(0), String::new(), String::new())),
                Some(FakeResponse::NotFound) => Err(io::Error::new(
                    io::ErrorKind::NotFound,
                    "No such file or directory",
                )),
                Some(FakeResponse::Exit {
                    code,
                    stdout,
                    stderr,
                }) => Ok((ExitStatus::from_raw(code << 8), stdout, stderr)),
            }
        }
    }

    impl ProcessRunner for FakeRunner {
        fn output(&self, command: Command) -> io::Result<Output> {
            let (status, stdout, stderr) = self.next(&command)?;
            Ok(Output {
                status,
                stdout: stdout.into_bytes(),
                stderr: stderr.into_bytes(),
            })
        }

        fn status(&self, command: Command, image_ref: &str, _message: &str) -> io::Result<ExitStatus> {
            self.log_refs.borrow_mut().push(image_ref.into());
            self.next(&command).map(|(status, _, _)| status)
        }
    }
}
