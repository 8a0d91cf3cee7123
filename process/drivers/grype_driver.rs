use comlexr::cmd;
use gfxbuild_utils::constants::{GRYPE, GRYPE_FAIL_ON};
use log::{info, trace, warn};

use crate::runner::ProcessRunner;

use super::{ExternalToolError, ScanDriver, ToolResult, opts::ScanOpts};

pub struct GrypeDriver<'a> {
    pub(super) runner: &'a dyn ProcessRunner,
}

impl ScanDriver for GrypeDriver<'_> {
    fn scan(&self, opts: &ScanOpts) -> ToolResult {
        trace!("GrypeDriver::scan({opts:?})");

        let status = self
            .runner
            .status(
                cmd!(
                    GRYPE,
                    &*opts.image,
                    format!("--fail-on={GRYPE_FAIL_ON}"),
                ),
                &opts.image,
                "Scanning",
            )
            .map_err(|e| ExternalToolError::spawn(GRYPE, e))?;

        if status.success() {
            info!("Grype scan of {} passed", opts.image);
            Ok(())
        } else {
            warn!("Grype reported vulnerabilities in {}", opts.image);
            Err(ExternalToolError::failed(GRYPE, status))
        }
    }
}
