//! Running an assembled build and the optional steps that follow it.

use std::{
    io::{self, BufRead, IsTerminal, Write},
    path::PathBuf,
};

use bon::Builder;
use colored::Colorize;
use gfxbuild_process_management::{
    drivers::{
        BuildDriver, CosignDriver, DockerDriver, ExternalToolError, GrypeDriver, ScanDriver,
        SigningDriver, TrivyDriver,
        opts::{PrivateKey, ScanOpts, SignOpts},
        types::{DetermineDriver, ScanDriverType},
    },
    runner::ProcessRunner,
};
use log::{debug, info, trace, warn};
use miette::Result;

use crate::invocation::{Invocation, InvocationOptions, TagSet};

/// How a run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitOutcome {
    Success,
    /// The user declined to push.
    Cancelled,
    /// The build tool exited with this status.
    Failed(i32),
}

impl ExitOutcome {
    /// The status the process should exit with.
    #[must_use]
    pub const fn code(self) -> i32 {
        match self {
            Self::Success | Self::Cancelled => 0,
            Self::Failed(code) => code,
        }
    }
}

/// Asks the user a yes/no question.
pub trait Confirm {
    /// Anything other than a clear yes, including errors, is a no.
    fn confirm(&mut self, message: &str) -> bool;
}

impl<F> Confirm for F
where
    F: FnMut(&str) -> bool,
{
    fn confirm(&mut self, message: &str) -> bool {
        self(message)
    }
}

/// Interactive prompt for terminals.
#[derive(Debug, Default, Clone, Copy)]
pub struct PromptConfirm;

impl Confirm for PromptConfirm {
    fn confirm(&mut self, message: &str) -> bool {
        match requestty::prompt_one(
            requestty::Question::confirm("confirm")
                .message(message)
                .default(false)
                .build(),
        ) {
            Ok(answer) => answer.as_bool().unwrap_or(false),
            Err(e) => {
                warn!("Unable to read confirmation: {e}");
                false
            }
        }
    }
}

/// Reads a single line answer, for when stdin isn't a terminal.
#[derive(Debug)]
pub struct LineConfirm<R> {
    reader: R,
}

impl<R: BufRead> LineConfirm<R> {
    pub const fn new(reader: R) -> Self {
        Self { reader }
    }
}

impl<R: BufRead> Confirm for LineConfirm<R> {
    fn confirm(&mut self, message: &str) -> bool {
        eprint!("{message} [y/N] ");
        let _ = io::stderr().flush();

        let mut answer = String::new();
        match self.reader.read_line(&mut answer) {
            Ok(_) => matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes"),
            Err(e) => {
                warn!("Unable to read confirmation: {e}");
                false
            }
        }
    }
}

/// Picks the prompt that fits the current stdin.
#[must_use]
pub fn stdin_confirm() -> Box<dyn Confirm> {
    let stdin = io::stdin();

    if stdin.is_terminal() {
        Box::new(PromptConfirm)
    } else {
        Box::new(LineConfirm::new(stdin.lock()))
    }
}

#[derive(Builder)]
pub struct Dispatcher<'a> {
    runner: &'a dyn ProcessRunner,

    confirm: Box<dyn Confirm + 'a>,

    /// The scanner to use, found on `PATH` when unset.
    scanner: Option<ScanDriverType>,

    /// Where to look for `cosign.key`.
    #[builder(into, default = PathBuf::from("."))]
    key_dir: PathBuf,
}

impl Dispatcher<'_> {
    /// Runs the build, or prints it for a dry run.
    ///
    /// # Errors
    /// Will error if docker can't be run or the builder can't be
    /// created. A build that runs and fails is reported through
    /// [`ExitOutcome::Failed`] instead.
    pub fn dispatch(
        &mut self,
        invocation: Invocation,
        opts: &InvocationOptions,
    ) -> Result<ExitOutcome> {
        trace!("Dispatcher::dispatch({invocation}, {opts:?})");

        if opts.dry_run {
            println!("{invocation}");
            return Ok(ExitOutcome::Success);
        }

        let Invocation { command, tags, .. } = invocation;

        if opts.push {
            let message = format!(
                "Push {} to the registry?",
                tags.iter().collect::<Vec<_>>().join(" and ")
            );

            if !self.confirm.confirm(&message) {
                info!("Push cancelled, nothing was built");
                return Ok(ExitOutcome::Cancelled);
            }
        }

        let docker = DockerDriver::new(self.runner);
        docker.setup()?;

        match docker.build(command, tags.versioned()) {
            Ok(()) => {}
            Err(ExternalToolError::Failed { code, .. }) => {
                return Ok(ExitOutcome::Failed(code));
            }
            Err(e) => return Err(e.into()),
        }

        if opts.scan {
            self.scan(&tags);
        }

        if opts.sign {
            self.sign(&tags, opts.push);
        }

        info!(
            "Finished building {}",
            tags.iter().collect::<Vec<_>>().join(", ").bold()
        );
        Ok(ExitOutcome::Success)
    }

    fn scan(&mut self, tags: &TagSet) {
        let Some(scanner) = self.scanner.determine_driver() else {
            warn!("Skipping scan, neither trivy nor grype is installed");
            return;
        };
        debug!("Scanning with {scanner}");

        let opts = ScanOpts::builder().image(tags.versioned()).build();
        let result = match scanner {
            ScanDriverType::Trivy => TrivyDriver::new(self.runner).scan(&opts),
            ScanDriverType::Grype => GrypeDriver::new(self.runner).scan(&opts),
        };

        if let Err(e) = result {
            warn!("Scan of {} failed: {e}", tags.versioned());
        }
    }

    fn sign(&self, tags: &TagSet, pushed: bool) {
        if !pushed {
            warn!("Signing without --push, the image has to be in a registry already");
        }

        let key = PrivateKey::detect(&self.key_dir);
        let cosign = CosignDriver::new(self.runner);

        for tag in tags.iter() {
            if let Err(e) = cosign.sign(&SignOpts::builder().image(tag).maybe_key(key.clone()).build())
            {
                warn!("Signing {tag} failed: {e}");
            }
        }
    }
}

#[cfg(test)]
mod test {
    use gfxbuild_process_management::runner::FakeRunner;
    use rstest::rstest;
    use tempfile::TempDir;

    use crate::{
        config::EffectiveConfig,
        invocation::{self, BuildMetadata},
    };

    use super::*;

    fn invocation(opts: &InvocationOptions) -> Invocation {
        invocation::build(
            &EffectiveConfig {
                base_image_version: "6.4.1".into(),
                app_version: "b4600".into(),
                target_architectures: vec!["gfx1151".into()],
                multi_target: false,
            },
            opts,
            BuildMetadata {
                timestamp: "2025-01-31T09:04:59Z".into(),
                revision_id: "3f9c2ab".into(),
            },
        )
    }

    fn run(runner: &FakeRunner, answer: bool, opts: &InvocationOptions) -> Result<ExitOutcome> {
        let key_dir = TempDir::new().unwrap();

        Dispatcher::builder()
            .runner(runner)
            .confirm(Box::new(move |_: &str| answer))
            .scanner(ScanDriverType::Trivy)
            .key_dir(key_dir.path())
            .build()
            .dispatch(invocation(opts), opts)
    }

    #[rstest]
    #[case::plain(InvocationOptions::builder().dry_run(true).build())]
    #[case::everything(
        InvocationOptions::builder()
            .dry_run(true)
            .push(true)
            .scan(true)
            .sign(true)
            .build()
    )]
    fn dry_run_runs_nothing(#[case] opts: InvocationOptions) {
        let runner = FakeRunner::new();

        let outcome = run(&runner, false, &opts).unwrap();

        assert_eq!(outcome, ExitOutcome::Success);
        assert!(runner.calls().is_empty());
    }

    #[test]
    fn declined_push_runs_nothing() {
        let runner = FakeRunner::new();
        let opts = InvocationOptions::builder().push(true).build();

        let outcome = run(&runner, false, &opts).unwrap();

        assert_eq!(outcome, ExitOutcome::Cancelled);
        assert_eq!(outcome.code(), 0);
        assert!(runner.calls().is_empty());
    }

    #[test]
    fn confirmed_push() {
        let runner = FakeRunner::new().respond(0, "gfxbuild\n", "");
        let opts = InvocationOptions::builder().push(true).build();

        let outcome = run(&runner, true, &opts).unwrap();

        assert_eq!(outcome, ExitOutcome::Success);
        let calls = runner.calls();
        assert_eq!(calls.len(), 2);
        assert!(calls[1].contains(&"--push".to_string()));
    }

    #[test]
    fn build_without_push_skips_prompt() {
        let runner = FakeRunner::new().respond(0, "gfxbuild\n", "");

        // The prompt would decline.
        let outcome = run(&runner, false, &InvocationOptions::default()).unwrap();

        assert_eq!(outcome, ExitOutcome::Success);
        assert_eq!(runner.programs(), ["docker buildx", "docker buildx"]);
    }

    #[test]
    fn build_failure_code_passes_through() {
        let runner = FakeRunner::new()
            .respond(0, "gfxbuild\n", "")
            .respond(42, "", "");
        let opts = InvocationOptions::builder().scan(true).sign(true).build();

        let outcome = run(&runner, true, &opts).unwrap();

        assert_eq!(outcome, ExitOutcome::Failed(42));
        assert_eq!(outcome.code(), 42);
        assert_eq!(runner.calls().len(), 2);
    }

    #[test]
    fn scan_and_sign_failures_keep_success() {
        let runner = FakeRunner::new()
            .respond(0, "gfxbuild\n", "")
            .respond(0, "", "")
            .respond(1, "", "")
            .respond(1, "", "")
            .not_found();
        let opts = InvocationOptions::builder().scan(true).sign(true).build();

        let outcome = run(&runner, true, &opts).unwrap();

        assert_eq!(outcome, ExitOutcome::Success);
        assert_eq!(
            runner.programs(),
            [
                "docker buildx",
                "docker buildx",
                "trivy image",
                "cosign sign",
                "cosign sign",
            ]
        );

        let calls = runner.calls();
        assert_eq!(calls[2].last().map(String::as_str), Some("llamacpp-rocm:gfx1151-b4600"));
        assert_eq!(calls[3].last().map(String::as_str), Some("llamacpp-rocm:gfx1151-latest"));
        assert_eq!(calls[4].last().map(String::as_str), Some("llamacpp-rocm:gfx1151-b4600"));
    }

    #[test]
    fn build_log_is_keyed_on_the_versioned_tag() {
        let runner = FakeRunner::new().respond(0, "gfxbuild\n", "");

        run(&runner, true, &InvocationOptions::default()).unwrap();

        assert_eq!(runner.log_refs(), ["llamacpp-rocm:gfx1151-b4600"]);
    }

    #[test]
    fn missing_docker_is_an_error() {
        let runner = FakeRunner::new().not_found();

        let err = run(&runner, true, &InvocationOptions::default()).unwrap_err();

        assert!(matches!(
            err.downcast_ref::<ExternalToolError>(),
            Some(ExternalToolError::NotFound(tool)) if tool == "docker"
        ));
    }

    #[test]
    fn builder_failure_is_an_error() {
        let runner = FakeRunner::new()
            .respond(0, "default\n", "")
            .respond(1, "", "Cannot connect to the Docker daemon");

        assert!(run(&runner, true, &InvocationOptions::default()).is_err());
        assert_eq!(runner.calls().len(), 2);
    }

    #[rstest]
    #[case("y\n", true)]
    #[case("yes\n", true)]
    #[case("  YES  \n", true)]
    #[case("Y", true)]
    #[case("\n", false)]
    #[case("", false)]
    #[case("no\n", false)]
    #[case("yess\n", false)]
    #[case("true\n", false)]
    fn line_confirm(#[case] input: &str, #[case] expected: bool) {
        let mut confirm = LineConfirm::new(input.as_bytes());

        assert_eq!(confirm.confirm("Push?"), expected);
    }
}
