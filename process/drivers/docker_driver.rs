use std::process::Command;

use comlexr::cmd;
use gfxbuild_utils::constants::{DOCKER, GFXBUILD};
use log::{debug, error, info, trace};

use crate::runner::ProcessRunner;

use super::{BuildDriver, ExternalToolError, ToolResult, opts::BuildOpts};

/// Phrases docker uses when a builder with the
/// requested name is already registered.
const BUILDER_EXISTS: [&str; 2] = ["existing instance", "already exists"];

pub struct DockerDriver<'a> {
    pub(super) runner: &'a dyn ProcessRunner,
}

impl DockerDriver<'_> {
    fn builder_names(&self) -> ToolResult<Vec<String>> {
        trace!("docker buildx ls --format={{{{.Name}}}}");
        let ls_out = self
            .runner
            .output(cmd!(DOCKER, "buildx", "ls", "--format={{.Name}}"))
            .map_err(|e| ExternalToolError::spawn(DOCKER, e))?;

        if !ls_out.status.success() {
            error!("{}", String::from_utf8_lossy(&ls_out.stderr).trim());
            return Err(ExternalToolError::failed(DOCKER, ls_out.status));
        }

        Ok(String::from_utf8_lossy(&ls_out.stdout)
            .lines()
            .map(|line| line.trim().trim_end_matches('*').trim().to_string())
            .filter(|line| !line.is_empty())
            .collect())
    }
}

impl BuildDriver for DockerDriver<'_> {
    fn setup(&self) -> ToolResult {
        trace!("DockerDriver::setup()");

        if self.builder_names()?.iter().any(|name| name == GFXBUILD) {
            debug!("Builder {GFXBUILD} already exists");
            return Ok(());
        }

        trace!("docker buildx create --bootstrap --driver=docker-container --name={GFXBUILD}");
        let create_out = self
            .runner
            .output(cmd!(
                DOCKER,
                "buildx",
                "create",
                "--bootstrap",
                "--driver=docker-container",
                format!("--name={GFXBUILD}"),
            ))
            .map_err(|e| ExternalToolError::spawn(DOCKER, e))?;

        if create_out.status.success() {
            info!("Created builder {GFXBUILD}");
            return Ok(());
        }

        let stderr = String::from_utf8_lossy(&create_out.stderr);
        if BUILDER_EXISTS.iter().any(|phrase| stderr.contains(phrase)) {
            debug!("Builder {GFXBUILD} was created by another process");
            Ok(())
        } else {
            error!("{}", stderr.trim());
            Err(ExternalToolError::failed(DOCKER, create_out.status))
        }
    }

    fn build(&self, command: Command, image_ref: &str) -> ToolResult {
        trace!("DockerDriver::build({command:?}, {image_ref})");

        let status = self
            .runner
            .status(command, image_ref, "Building image")
            .map_err(|e| ExternalToolError::spawn(DOCKER, e))?;

        if status.success() {
            info!("Successfully built image {image_ref}");
            Ok(())
        } else {
            error!("Failed to build image {image_ref}");
            Err(ExternalToolError::failed(DOCKER, status))
        }
    }
}

/// Assembles the `docker buildx build` command.
///
/// Every flag and value is its own argument so nothing
/// in the options can be read as more than one argument.
#[must_use]
pub fn buildx_command(opts: &BuildOpts) -> Command {
    trace!("buildx_command({opts:#?})");

    cmd!(
        DOCKER,
        "buildx",
        "build",
        format!("--builder={}", opts.builder),
        format!("--platform={}", opts.platform),
        format!("--file={}", opts.containerfile.display()),
        for arg in &opts.build_args => ["--build-arg", format!("{}={}", arg.0, arg.1)],
        for label in &opts.labels => ["--label", format!("{}={}", label.0, label.1)],
        "--sbom=true",
        "--provenance=mode=max",
        for tag in &opts.tags => ["--tag", tag],
        if opts.no_cache => "--no-cache",
        match opts.push {
            true => "--push",
            false => "--load",
        },
        opts.context.as_os_str(),
    )
}

#[cfg(test)]
mod test {
    use std::{borrow::Cow, path::Path};

    use crate::{
        drivers::types::Platform,
        runner::{FakeRunner, command_tokens},
    };

    use super::*;

    const EXISTS_ERR: &str = concat!(
        "ERROR: existing instance for \"gfxbuild\" but no append mode, ",
        "specify the node name to make changes for existing instances",
    );

    fn opts(push: bool, no_cache: bool) -> BuildOpts<'static> {
        BuildOpts::builder()
            .containerfile(Path::new("Dockerfile"))
            .platform(Platform::LinuxAmd64)
            .build_args(vec![("GPU_TARGETS", Cow::Borrowed("gfx900; rm -rf /"))])
            .labels(vec![("org.opencontainers.image.version", Cow::Borrowed("b4600"))])
            .tags(vec!["llamacpp-rocm:latest".into(), "llamacpp-rocm:b4600".into()])
            .no_cache(no_cache)
            .push(push)
            .build()
    }

    #[test]
    fn buildx_command_tokens() {
        let tokens = command_tokens(&buildx_command(&opts(false, false)));

        assert_eq!(
            tokens,
            [
                "docker",
                "buildx",
                "build",
                "--builder=gfxbuild",
                "--platform=linux/amd64",
                "--file=Dockerfile",
                "--build-arg",
                "GPU_TARGETS=gfx900; rm -rf /",
                "--label",
                "org.opencontainers.image.version=b4600",
                "--sbom=true",
                "--provenance=mode=max",
                "--tag",
                "llamacpp-rocm:latest",
                "--tag",
                "llamacpp-rocm:b4600",
                "--load",
                ".",
            ]
        );
    }

    #[test]
    fn buildx_command_push_no_cache() {
        let tokens = command_tokens(&buildx_command(&opts(true, true)));

        assert!(tokens.contains(&"--no-cache".to_string()));
        assert!(tokens.contains(&"--push".to_string()));
        assert!(!tokens.contains(&"--load".to_string()));
        assert_eq!(tokens.last().map(String::as_str), Some("."));
    }

    #[test]
    fn setup_creates_missing_builder() {
        let runner = FakeRunner::new().respond(0, "default\ndesktop-linux\n", "");

        DockerDriver::new(&runner).setup().unwrap();

        let calls = runner.calls();
        assert_eq!(calls.len(), 2);
        assert_eq!(
            calls[1],
            [
                "docker",
                "buildx",
                "create",
                "--bootstrap",
                "--driver=docker-container",
                "--name=gfxbuild",
            ]
        );
    }

    #[test]
    fn setup_twice_is_idempotent() {
        let runner = FakeRunner::new()
            .respond(0, "default\n", "")
            .respond(0, "gfxbuild\n", "")
            .respond(0, "default\ngfxbuild\n", "");
        let driver = DockerDriver::new(&runner);

        driver.setup().unwrap();
        driver.setup().unwrap();

        assert_eq!(runner.calls().len(), 3);
    }

    #[test]
    fn setup_skips_current_builder_marker() {
        let runner = FakeRunner::new().respond(0, "gfxbuild*\n", "");

        DockerDriver::new(&runner).setup().unwrap();

        assert_eq!(runner.calls().len(), 1);
    }

    #[test]
    fn setup_tolerates_create_race() {
        let runner = FakeRunner::new()
            .respond(0, "default\n", "")
            .respond(1, "", EXISTS_ERR);

        DockerDriver::new(&runner).setup().unwrap();
    }

    #[test]
    fn setup_reports_create_failure() {
        let runner = FakeRunner::new()
            .respond(0, "", "")
            .respond(17, "", "permission denied");

        let err = DockerDriver::new(&runner).setup().unwrap_err();

        assert!(matches!(err, ExternalToolError::Failed { code: 17, .. }));
    }

    #[test]
    fn missing_docker() {
        let runner = FakeRunner::new().not_found();

        let err = DockerDriver::new(&runner).setup().unwrap_err();

        assert!(matches!(err, ExternalToolError::NotFound(tool) if tool == "docker"));
    }

    #[test]
    fn build_passes_exit_code_through() {
        let runner = FakeRunner::new().respond(137, "", "");

        let err = DockerDriver::new(&runner)
            .build(buildx_command(&opts(false, false)), "llamacpp-rocm:latest")
            .unwrap_err();

        assert!(matches!(err, ExternalToolError::Failed { code: 137, .. }));
    }
}
