use std::{borrow::Cow, path::Path};

use bon::Builder;
use gfxbuild_utils::constants::{BUILD_CONTEXT, GFXBUILD};

use crate::drivers::types::Platform;

/// A `KEY=value` pair passed to the build as one argument.
pub type KeyValue<'scope> = (&'scope str, Cow<'scope, str>);

/// Options for assembling a `docker buildx build` command.
#[derive(Debug, Clone, Builder)]
pub struct BuildOpts<'scope> {
    /// The Dockerfile to build.
    #[builder(into)]
    pub containerfile: Cow<'scope, Path>,

    /// The build context, always the last argument.
    #[builder(into, default = Cow::Borrowed(Path::new(BUILD_CONTEXT)))]
    pub context: Cow<'scope, Path>,

    /// The name of the buildx builder to run on.
    #[builder(into, default = Cow::Borrowed(GFXBUILD))]
    pub builder: Cow<'scope, str>,

    #[builder(default)]
    pub platform: Platform,

    /// Values for the Dockerfile's `ARG`s.
    #[builder(default)]
    pub build_args: Vec<KeyValue<'scope>>,

    /// Labels to attach to the image.
    #[builder(default)]
    pub labels: Vec<KeyValue<'scope>>,

    /// Full image refs, each gets its own `--tag`.
    #[builder(default)]
    pub tags: Vec<String>,

    /// Ignore the build cache.
    #[builder(default)]
    pub no_cache: bool,

    /// Push to the registry instead of loading
    /// into the local image store.
    #[builder(default)]
    pub push: bool,
}
