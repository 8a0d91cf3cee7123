use std::path::PathBuf;

use bon::Builder;
use clap::Args;
use gfxbuild_process_management::runner::{ProcessRunner, SystemRunner};
use gfxbuild_utils::constants::CONFIG_FILE;
use log::trace;
use miette::Result;

use crate::{config, dispatch::ExitOutcome, invocation::BuildMetadata};

use super::GfxBuildCommand;

/// Records when and from which revision the
/// configuration was last built.
#[derive(Debug, Clone, Args, Builder)]
pub struct StampCommand {
    /// The configuration file to update.
    #[arg(short, long, default_value = CONFIG_FILE)]
    #[builder(into, default = PathBuf::from(CONFIG_FILE))]
    config: PathBuf,
}

impl GfxBuildCommand for StampCommand {
    fn try_run(&mut self) -> Result<ExitOutcome> {
        trace!("StampCommand::try_run()");

        self.stamp(&SystemRunner)
    }
}

impl StampCommand {
    fn stamp(&self, runner: &dyn ProcessRunner) -> Result<ExitOutcome> {
        let metadata = BuildMetadata::collect(runner);
        config::stamp(&self.config, &metadata.timestamp, &metadata.revision_id)?;

        Ok(ExitOutcome::Success)
    }
}

#[cfg(test)]
mod test {
    use std::fs;

    use gfxbuild_process_management::runner::FakeRunner;
    use tempfile::TempDir;

    use super::*;

    #[test]
    fn stamps_revision() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        fs::write(&path, "ROCM_VERSION=6.4.1\nGIT_COMMIT=old\n").unwrap();
        let runner = FakeRunner::new().respond(0, "3f9c2ab\n", "");

        let outcome = StampCommand::builder().config(&path).build().stamp(&runner).unwrap();

        assert_eq!(outcome, ExitOutcome::Success);
        let contents = fs::read_to_string(&path).unwrap();
        assert!(contents.contains("GIT_COMMIT=3f9c2ab\n"));
        assert!(contents.contains("BUILD_DATE="));
        assert!(!contents.contains("old"));
    }

    #[test]
    fn missing_file() {
        let dir = TempDir::new().unwrap();
        let runner = FakeRunner::new();

        assert!(
            StampCommand::builder()
                .config(dir.path().join(CONFIG_FILE))
                .build()
                .stamp(&runner)
                .is_err()
        );
    }
}
