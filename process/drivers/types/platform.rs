use std::str::FromStr;

use log::warn;
use miette::bail;

/// Platforms the image can be built for.
///
/// The ROCm base images only ship for x86_64, so
/// there's a single supported platform.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Platform {
    #[default]
    LinuxAmd64,
}

impl Platform {
    /// Maps any requested platform onto a supported one.
    ///
    /// Unsupported or unknown values fall back to the default
    /// platform with a warning rather than failing the build.
    #[must_use]
    pub fn coerce(requested: Option<&str>) -> Self {
        let Some(requested) = requested.map(str::trim).filter(|r| !r.is_empty()) else {
            return Self::default();
        };

        requested.parse().unwrap_or_else(|_| {
            let platform = Self::default();
            warn!("Platform '{requested}' is not supported, building for {platform} instead");
            platform
        })
    }
}

impl std::fmt::Display for Platform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match *self {
            Self::LinuxAmd64 => "linux/amd64",
        })
    }
}

impl FromStr for Platform {
    type Err = miette::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "linux/amd64" | "amd64" | "x86_64" => Self::LinuxAmd64,
            platform => bail!("Platform {platform} unsupported"),
        })
    }
}
