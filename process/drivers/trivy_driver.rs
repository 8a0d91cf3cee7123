use comlexr::cmd;
use gfxbuild_utils::constants::{TRIVY, TRIVY_SEVERITIES};
use log::{info, trace, warn};

use crate::runner::ProcessRunner;

use super::{ExternalToolError, ScanDriver, ToolResult, opts::ScanOpts};

pub struct TrivyDriver<'a> {
    pub(super) runner: &'a dyn ProcessRunner,
}

impl ScanDriver for TrivyDriver<'_> {
    fn scan(&self, opts: &ScanOpts) -> ToolResult {
        trace!("TrivyDriver::scan({opts:?})");

        let command = cmd!(
            TRIVY,
            "image",
            format!("--severity={TRIVY_SEVERITIES}"),
            "--exit-code=1",
            &*opts.image,
        );

        let status = self
            .runner
            .status(command, &opts.image, "Scanning")
            .map_err(|e| ExternalToolError::spawn(TRIVY, e))?;

        if status.success() {
            info!("No {TRIVY_SEVERITIES} vulnerabilities found in {}", opts.image);
            Ok(())
        } else {
            warn!("Trivy reported vulnerabilities in {}", opts.image);
            Err(ExternalToolError::failed(TRIVY, status))
        }
    }
}
