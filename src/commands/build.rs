use std::path::PathBuf;

use bon::Builder;
use clap::Args;
use gfxbuild_process_management::{
    drivers::types::{Platform, ScanDriverType},
    runner::{ProcessRunner, SystemRunner},
};
use gfxbuild_utils::constants::{CONFIG_FILE, GPU_TARGETS, LLAMACPP_VERSION, ROCM_VERSION};
use log::{debug, trace};
use miette::Result;

use crate::{
    config::{self, Overrides},
    dispatch::{Confirm, Dispatcher, ExitOutcome, stdin_confirm},
    invocation::{self, BuildMetadata, InvocationOptions},
};

use super::GfxBuildCommand;

#[allow(clippy::struct_excessive_bools)]
#[derive(Debug, Clone, Args, Builder)]
pub struct BuildCommand {
    /// The configuration file with the default versions.
    #[arg(short, long, default_value = CONFIG_FILE)]
    #[builder(into, default = PathBuf::from(CONFIG_FILE))]
    config: PathBuf,

    /// The ROCm base image version.
    #[arg(long, env = ROCM_VERSION)]
    #[builder(into)]
    rocm_version: Option<String>,

    /// The llama.cpp release, tag, or commit to build.
    #[arg(long, env = LLAMACPP_VERSION)]
    #[builder(into)]
    llamacpp_version: Option<String>,

    /// Comma separated list of GPU targets, e.g. `gfx1100,gfx1151`.
    ///
    /// Building for a single target prefixes the
    /// image tags with that target.
    #[arg(long, env = GPU_TARGETS)]
    #[builder(into)]
    gpu_targets: Option<String>,

    /// The platform to build for.
    ///
    /// NOTE: Only `linux/amd64` is supported. Anything
    /// else falls back to it with a warning.
    #[arg(long)]
    #[builder(into)]
    platform: Option<String>,

    /// Push the image to the registry instead of
    /// loading it into the local image store.
    ///
    /// Asks for confirmation first.
    #[arg(long)]
    #[builder(default)]
    push: bool,

    /// Build without using the build cache.
    #[arg(long)]
    #[builder(default)]
    no_cache: bool,

    /// Print the build command instead of running it.
    #[arg(long)]
    #[builder(default)]
    dry_run: bool,

    /// Scan the image for vulnerabilities after it's built.
    #[arg(long)]
    #[builder(default)]
    scan: bool,

    /// Sign the image with cosign after it's built.
    ///
    /// Uses `COSIGN_PRIVATE_KEY` or `./cosign.key`
    /// when available and keyless signing otherwise.
    #[arg(long)]
    #[builder(default)]
    sign: bool,

    /// The scanner to use. Defaults to the first
    /// of trivy or grype that is installed.
    #[arg(long, value_enum)]
    scanner: Option<ScanDriverType>,
}

impl GfxBuildCommand for BuildCommand {
    fn try_run(&mut self) -> Result<ExitOutcome> {
        trace!("BuildCommand::try_run()");

        self.execute(&SystemRunner, stdin_confirm())
    }
}

impl BuildCommand {
    fn execute<'a>(
        &self,
        runner: &'a dyn ProcessRunner,
        confirm: Box<dyn Confirm + 'a>,
    ) -> Result<ExitOutcome> {
        let config = config::resolve(&self.config, &self.overrides())?;
        let opts = self.invocation_options();

        let metadata = BuildMetadata::collect(runner);
        let invocation = invocation::build(&config, &opts, metadata);
        debug!("Assembled build: {invocation}");

        Dispatcher::builder()
            .runner(runner)
            .confirm(confirm)
            .maybe_scanner(self.scanner)
            .build()
            .dispatch(invocation, &opts)
    }

    fn overrides(&self) -> Overrides {
        Overrides::builder()
            .maybe_rocm_version(self.rocm_version.clone())
            .maybe_llamacpp_version(self.llamacpp_version.clone())
            .maybe_gpu_targets(self.gpu_targets.clone())
            .build()
    }

    fn invocation_options(&self) -> InvocationOptions {
        InvocationOptions::builder()
            .platform(Platform::coerce(self.platform.as_deref()))
            .push(self.push)
            .no_cache(self.no_cache)
            .dry_run(self.dry_run)
            .scan(self.scan)
            .sign(self.sign)
            .build()
    }
}
