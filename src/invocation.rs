use std::{borrow::Cow, fmt, path::Path, process::Command};

use bon::Builder;
use gfxbuild_process_management::{
    drivers::{GitDriver, buildx_command, opts::BuildOpts, types::Platform},
    runner::{ProcessRunner, command_line},
};
use gfxbuild_utils::{
    constants::{
        BUILD_DATE, CI_COMMIT_SHORT_SHA, DOCKERFILE, GIT_COMMIT, GITHUB_SHA, GPU_TARGETS,
        IMAGE_CREATED_LABEL, IMAGE_REPO, IMAGE_REVISION_LABEL, IMAGE_TITLE_LABEL,
        IMAGE_VERSION_LABEL, LLAMACPP_VERSION, ROCM_VERSION, SHORT_SHA_LEN, UNKNOWN_REVISION,
    },
    current_timestamp,
};
use log::{debug, trace};

#[cfg(not(test))]
use gfxbuild_utils::get_env_var;

#[cfg(test)]
use gfxbuild_utils::test_utils::get_env_var;

use crate::config::EffectiveConfig;

/// Facts about the build gathered when it starts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildMetadata {
    pub timestamp: String,
    pub revision_id: String,
}

impl BuildMetadata {
    /// Stamps the current time and looks up the source revision.
    ///
    /// The revision comes from git, then the CI environment, and
    /// falls back to `unknown`. This never fails.
    #[must_use]
    pub fn collect(runner: &dyn ProcessRunner) -> Self {
        trace!("BuildMetadata::collect()");

        Self {
            timestamp: current_timestamp(),
            revision_id: Self::revision(runner),
        }
    }

    fn revision(runner: &dyn ProcessRunner) -> String {
        let env_var = |key: &str| get_env_var(key).ok().filter(|v| !v.trim().is_empty());

        let revision = GitDriver::new(runner)
            .short_revision()
            .or_else(|| {
                env_var(GITHUB_SHA).map(|sha| sha.trim().chars().take(SHORT_SHA_LEN).collect())
            })
            .or_else(|| env_var(CI_COMMIT_SHORT_SHA).map(|sha| sha.trim().to_string()))
            .unwrap_or_else(|| UNKNOWN_REVISION.to_string());

        debug!("Using revision {revision}");
        revision
    }
}

/// The two tags every build gets.
///
/// A single-target build prefixes both with its architecture so
/// images for different GPUs can live side by side.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagSet([String; 2]);

impl TagSet {
    #[must_use]
    pub fn derive(repo: &str, config: &EffectiveConfig) -> Self {
        let version = &config.app_version;

        let tags = match config.single_target() {
            Some(arch) => [
                format!("{repo}:{arch}-latest"),
                format!("{repo}:{arch}-{version}"),
            ],
            None => [format!("{repo}:latest"), format!("{repo}:{version}")],
        };
        trace!("TagSet::derive() -> {tags:?}");

        Self(tags)
    }

    #[must_use]
    pub fn latest(&self) -> &str {
        &self.0[0]
    }

    #[must_use]
    pub fn versioned(&self) -> &str {
        &self.0[1]
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }
}

#[allow(clippy::struct_excessive_bools)]
#[derive(Debug, Default, Clone, Copy, Builder)]
pub struct InvocationOptions {
    #[builder(default)]
    pub platform: Platform,

    #[builder(default)]
    pub push: bool,

    #[builder(default)]
    pub no_cache: bool,

    #[builder(default)]
    pub dry_run: bool,

    #[builder(default)]
    pub scan: bool,

    #[builder(default)]
    pub sign: bool,
}

/// A fully assembled build, ready to print or run.
#[derive(Debug)]
pub struct Invocation {
    pub command: Command,
    pub tags: TagSet,
    pub metadata: BuildMetadata,
}

impl fmt::Display for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&command_line(&self.command))
    }
}

/// Assembles the build command. Nothing is run.
#[must_use]
pub fn build(
    config: &EffectiveConfig,
    opts: &InvocationOptions,
    metadata: BuildMetadata,
) -> Invocation {
    trace!("invocation::build({config:?}, {opts:?}, {metadata:?})");

    let tags = TagSet::derive(IMAGE_REPO, config);

    let command = buildx_command(
        &BuildOpts::builder()
            .containerfile(Path::new(DOCKERFILE))
            .platform(opts.platform)
            .build_args(vec![
                (ROCM_VERSION, Cow::Borrowed(config.base_image_version.as_str())),
                (LLAMACPP_VERSION, Cow::Borrowed(config.app_version.as_str())),
                (GPU_TARGETS, Cow::Owned(config.architectures_arg())),
                (BUILD_DATE, Cow::Borrowed(metadata.timestamp.as_str())),
                (GIT_COMMIT, Cow::Borrowed(metadata.revision_id.as_str())),
            ])
            .labels(vec![
                (IMAGE_VERSION_LABEL, Cow::Borrowed(config.app_version.as_str())),
                (IMAGE_CREATED_LABEL, Cow::Borrowed(metadata.timestamp.as_str())),
                (IMAGE_REVISION_LABEL, Cow::Borrowed(metadata.revision_id.as_str())),
                (IMAGE_TITLE_LABEL, Cow::Borrowed(IMAGE_REPO)),
            ])
            .tags(tags.iter().map(ToString::to_string).collect())
            .no_cache(opts.no_cache)
            .push(opts.push)
            .build(),
    );

    Invocation {
        command,
        tags,
        metadata,
    }
}

#[cfg(test)]
mod test {
    use gfxbuild_process_management::runner::{FakeRunner, command_tokens};
    use gfxbuild_utils::test_utils::{remove_env_var, set_env_var};
    use rstest::rstest;

    use super::*;

    fn config(targets: &str) -> EffectiveConfig {
        EffectiveConfig::new("6.4.1", "b4600", targets).unwrap()
    }

    fn metadata() -> BuildMetadata {
        BuildMetadata {
            timestamp: "2025-01-31T09:04:59Z".into(),
            revision_id: "3f9c2ab".into(),
        }
    }

    #[rstest]
    #[case::single("gfx1151", ["llamacpp-rocm:gfx1151-latest", "llamacpp-rocm:gfx1151-b4600"])]
    #[case::multi("gfx900,gfx906", ["llamacpp-rocm:latest", "llamacpp-rocm:b4600"])]
    #[case::trailing_separator("gfx1151,", ["llamacpp-rocm:latest", "llamacpp-rocm:b4600"])]
    #[case::padded_multi(" gfx900 , gfx906", ["llamacpp-rocm:latest", "llamacpp-rocm:b4600"])]
    fn tags(#[case] targets: &str, #[case] expected: [&str; 2]) {
        let tags = TagSet::derive(IMAGE_REPO, &config(targets));

        assert_eq!(tags.iter().collect::<Vec<_>>(), expected);
        assert_eq!(tags.latest(), expected[0]);
        assert_eq!(tags.versioned(), expected[1]);
    }

    #[test]
    fn full_argument_vector() {
        let invocation = build(
            &config("gfx900,gfx906"),
            &InvocationOptions::default(),
            metadata(),
        );

        assert_eq!(
            command_tokens(&invocation.command),
            [
                "docker",
                "buildx",
                "build",
                "--builder=gfxbuild",
                "--platform=linux/amd64",
                "--file=Dockerfile",
                "--build-arg",
                "ROCM_VERSION=6.4.1",
                "--build-arg",
                "LLAMACPP_VERSION=b4600",
                "--build-arg",
                "GPU_TARGETS=gfx900,gfx906",
                "--build-arg",
                "BUILD_DATE=2025-01-31T09:04:59Z",
                "--build-arg",
                "GIT_COMMIT=3f9c2ab",
                "--label",
                "org.opencontainers.image.version=b4600",
                "--label",
                "org.opencontainers.image.created=2025-01-31T09:04:59Z",
                "--label",
                "org.opencontainers.image.revision=3f9c2ab",
                "--label",
                "org.opencontainers.image.title=llamacpp-rocm",
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
    fn hostile_values_stay_one_token() {
        let mut config = config("gfx1151");
        config.app_version = "b1; rm -rf /".into();

        let tokens = command_tokens(&build(&config, &InvocationOptions::default(), metadata()).command);

        assert!(tokens.contains(&"LLAMACPP_VERSION=b1; rm -rf /".to_string()));
        assert!(tokens.contains(&"llamacpp-rocm:gfx1151-b1; rm -rf /".to_string()));
        assert!(!tokens.iter().any(|t| t == "rm"));
    }

    #[rstest]
    #[case::load(false, false)]
    #[case::push(true, false)]
    #[case::load_no_cache(false, true)]
    #[case::push_no_cache(true, true)]
    fn push_or_load(#[case] push: bool, #[case] no_cache: bool) {
        let opts = InvocationOptions::builder().push(push).no_cache(no_cache).build();

        let tokens = command_tokens(&build(&config("gfx1151"), &opts, metadata()).command);
        let count = |flag: &str| tokens.iter().filter(|t| *t == flag).count();

        assert_eq!(count("--push") + count("--load"), 1);
        assert_eq!(count("--push"), usize::from(push));
        assert_eq!(count("--no-cache"), usize::from(no_cache));
        assert_eq!(tokens.last().map(String::as_str), Some("."));
    }

    #[test]
    fn display_is_one_line() {
        let invocation = build(&config("gfx1151"), &InvocationOptions::default(), metadata());
        let line = invocation.to_string();

        assert!(line.starts_with("docker buildx build --builder=gfxbuild"));
        assert!(line.ends_with("--load ."));
        assert!(!line.contains('\n'));
    }

    #[test]
    fn revision_from_git() {
        let runner = FakeRunner::new().respond(0, "3f9c2ab\n", "");

        assert_eq!(BuildMetadata::collect(&runner).revision_id, "3f9c2ab");
    }

    #[test]
    fn revision_from_github() {
        set_env_var(GITHUB_SHA, "0123456789abcdef");
        let runner = FakeRunner::new().not_found();

        assert_eq!(BuildMetadata::collect(&runner).revision_id, "0123456");
        remove_env_var(GITHUB_SHA);
    }

    #[test]
    fn revision_from_gitlab() {
        set_env_var(CI_COMMIT_SHORT_SHA, "a1b2c3d4");
        let runner = FakeRunner::new().respond(128, "", "fatal: not a git repository");

        assert_eq!(BuildMetadata::collect(&runner).revision_id, "a1b2c3d4");
        remove_env_var(CI_COMMIT_SHORT_SHA);
    }

    #[test]
    fn revision_unknown() {
        let runner = FakeRunner::new().not_found();

        let metadata = BuildMetadata::collect(&runner);

        assert_eq!(metadata.revision_id, UNKNOWN_REVISION);
        assert!(metadata.timestamp.ends_with('Z'));
    }
}
