use std::{
    borrow::Cow,
    fmt,
    path::{Path, PathBuf},
};

use bon::Builder;
use gfxbuild_utils::constants::{COSIGN_PRIV_PATH, COSIGN_PRIVATE_KEY};
use log::trace;

#[cfg(not(test))]
use gfxbuild_utils::has_env_var;

#[cfg(test)]
use gfxbuild_utils::test_utils::has_env_var;

/// Where cosign should read the private key from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PrivateKey {
    Env(String),
    Path(PathBuf),
}

impl PrivateKey {
    /// Looks for a signing key, preferring `COSIGN_PRIVATE_KEY`
    /// over a `cosign.key` file in `dir`.
    ///
    /// `None` means signing should be keyless.
    #[must_use]
    pub fn detect(dir: &Path) -> Option<Self> {
        trace!("PrivateKey::detect({})", dir.display());

        let key_path = dir.join(COSIGN_PRIV_PATH);

        if has_env_var(COSIGN_PRIVATE_KEY) {
            Some(Self::Env(COSIGN_PRIVATE_KEY.to_string()))
        } else if key_path.is_file() {
            Some(Self::Path(key_path))
        } else {
            None
        }
    }
}

impl fmt::Display for PrivateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Env(env) => write!(f, "env://{env}"),
            Self::Path(path) => write!(f, "{}", path.display()),
        }
    }
}

#[derive(Debug, Clone, Builder)]
pub struct SignOpts<'scope> {
    /// The image ref to sign.
    #[builder(into)]
    pub image: Cow<'scope, str>,

    pub key: Option<PrivateKey>,
}
