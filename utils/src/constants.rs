// Paths
pub const BUILD_CONTEXT: &str = ".";
pub const CONFIG_FILE: &str = "versions.env";
pub const COSIGN_PRIV_PATH: &str = "cosign.key";
pub const DOCKERFILE: &str = "Dockerfile";
pub const LOG_DIR: &str = ".cache/gfxbuild";

// Base configuration keys
pub const ROCM_VERSION: &str = "ROCM_VERSION";
pub const LLAMACPP_VERSION: &str = "LLAMACPP_VERSION";
pub const GPU_TARGETS: &str = "GPU_TARGETS";
pub const BUILD_DATE: &str = "BUILD_DATE";
pub const GIT_COMMIT: &str = "GIT_COMMIT";

// Labels
pub const IMAGE_CREATED_LABEL: &str = "org.opencontainers.image.created";
pub const IMAGE_REVISION_LABEL: &str = "org.opencontainers.image.revision";
pub const IMAGE_TITLE_LABEL: &str = "org.opencontainers.image.title";
pub const IMAGE_VERSION_LABEL: &str = "org.opencontainers.image.version";

// gfxbuild vars
pub const GFXBUILD_DEBUG: &str = "GFXBUILD_DEBUG";

// Cosign vars
pub const COSIGN_PASSWORD: &str = "COSIGN_PASSWORD";
pub const COSIGN_PRIVATE_KEY: &str = "COSIGN_PRIVATE_KEY";
pub const COSIGN_YES: &str = "COSIGN_YES";

// CI vars
pub const CI_COMMIT_SHORT_SHA: &str = "CI_COMMIT_SHORT_SHA";
pub const GITHUB_SHA: &str = "GITHUB_SHA";

// Tools
pub const COSIGN: &str = "cosign";
pub const DOCKER: &str = "docker";
pub const GIT: &str = "git";
pub const GRYPE: &str = "grype";
pub const TRIVY: &str = "trivy";

// Scan thresholds
pub const GRYPE_FAIL_ON: &str = "high";
pub const TRIVY_SEVERITIES: &str = "HIGH,CRITICAL";

// Misc
pub const GFXBUILD: &str = "gfxbuild";
pub const IMAGE_REPO: &str = "llamacpp-rocm";
pub const SHORT_SHA_LEN: usize = 7;
pub const UNKNOWN_REVISION: &str = "unknown";
