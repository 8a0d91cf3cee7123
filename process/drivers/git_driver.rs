use comlexr::cmd;
use gfxbuild_utils::constants::GIT;
use log::{debug, trace};

use crate::runner::ProcessRunner;

pub struct GitDriver<'a> {
    pub(super) runner: &'a dyn ProcessRunner,
}

impl GitDriver<'_> {
    /// The short hash of `HEAD`.
    ///
    /// Any failure, including git not being installed or the
    /// current directory not being a repository, yields `None`.
    #[must_use]
    pub fn short_revision(&self) -> Option<String> {
        trace!("GitDriver::short_revision()");

        let output = self
            .runner
            .output(cmd!(GIT, "rev-parse", "--short", "HEAD"))
            .inspect_err(|e| debug!("Unable to run git: {e}"))
            .ok()?;

        if !output.status.success() {
            debug!(
                "git rev-parse failed: {}",
                String::from_utf8_lossy(&output.stderr).trim()
            );
            return None;
        }

        let revision = String::from_utf8_lossy(&output.stdout).trim().to_string();
        (!revision.is_empty()).then_some(revision)
    }
}
