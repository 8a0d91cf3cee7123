use comlexr::cmd;
use gfxbuild_utils::constants::{COSIGN, COSIGN_PASSWORD, COSIGN_YES};
use log::{info, trace};

#[cfg(not(test))]
use gfxbuild_utils::has_env_var;

#[cfg(test)]
use gfxbuild_utils::test_utils::has_env_var;

use crate::runner::ProcessRunner;

use super::{ExternalToolError, SigningDriver, ToolResult, opts::SignOpts};

pub struct CosignDriver<'a> {
    pub(super) runner: &'a dyn ProcessRunner,
}

impl SigningDriver for CosignDriver<'_> {
    fn sign(&self, opts: &SignOpts) -> ToolResult {
        trace!("CosignDriver::sign({opts:?})");

        let mut command = cmd!(
            COSIGN,
            "sign",
            if let Some(key) = &opts.key => format!("--key={key}"),
            &*opts.image,
        );
        command.env(COSIGN_YES, "true");

        // Unencrypted keys still make cosign prompt for a password.
        if !has_env_var(COSIGN_PASSWORD) {
            command.env(COSIGN_PASSWORD, "");
        }

        match &opts.key {
            Some(key) => info!("Signing {} with {key}", opts.image),
            None => info!("Signing {} keyless", opts.image),
        }

        let status = self
            .runner
            .status(command, &opts.image, "Signing")
            .map_err(|e| ExternalToolError::spawn(COSIGN, e))?;

        if status.success() {
            info!("Successfully signed {}", opts.image);
            Ok(())
        } else {
            Err(ExternalToolError::failed(COSIGN, status))
        }
    }
}
