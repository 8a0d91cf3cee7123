//! Resolution of the effective build configuration.
//!
//! The base file is a flat list of `KEY=value` lines that stays
//! `source`-able by a shell. Any value given on the command line or
//! through the environment wins over the file as long as it isn't empty.

use std::{
    collections::HashMap,
    fmt, fs,
    io::{self, Write},
    path::{Path, PathBuf},
};

use bon::Builder;
use gfxbuild_utils::constants::{
    BUILD_DATE, GIT_COMMIT, GPU_TARGETS, LLAMACPP_VERSION, ROCM_VERSION,
};
use log::{debug, info, trace};
use miette::Diagnostic;
use tempfile::NamedTempFile;
use thiserror::Error;

/// The fields every build requires, in the order they are validated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigKey {
    RocmVersion,
    LlamacppVersion,
    GpuTargets,
}

impl ConfigKey {
    pub const ALL: [Self; 3] = [Self::RocmVersion, Self::LlamacppVersion, Self::GpuTargets];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::RocmVersion => ROCM_VERSION,
            Self::LlamacppVersion => LLAMACPP_VERSION,
            Self::GpuTargets => GPU_TARGETS,
        }
    }
}

impl fmt::Display for ConfigKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error, Diagnostic)]
pub enum ConfigError {
    #[error("Configuration file {} was not found", .0.display())]
    #[diagnostic(
        code(gfxbuild::config::missing_file),
        help("Create the file or point to it with `--config`")
    )]
    MissingFile(PathBuf),

    #[error("Required setting `{0}` is missing or empty")]
    #[diagnostic(
        code(gfxbuild::config::missing_field),
        help("Set `{0}` in the configuration file, the environment, or with its flag")
    )]
    MissingField(ConfigKey),

    #[error("Failed to read {}", path.display())]
    #[diagnostic(code(gfxbuild::config::read))]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to write {}", path.display())]
    #[diagnostic(code(gfxbuild::config::write))]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Values that take precedence over the base file.
#[derive(Debug, Default, Clone, Builder)]
pub struct Overrides {
    #[builder(into)]
    pub rocm_version: Option<String>,

    #[builder(into)]
    pub llamacpp_version: Option<String>,

    #[builder(into)]
    pub gpu_targets: Option<String>,
}

impl Overrides {
    fn get(&self, key: ConfigKey) -> Option<&str> {
        match key {
            ConfigKey::RocmVersion => self.rocm_version.as_deref(),
            ConfigKey::LlamacppVersion => self.llamacpp_version.as_deref(),
            ConfigKey::GpuTargets => self.gpu_targets.as_deref(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EffectiveConfig {
    /// Tag of the ROCm runtime base image.
    pub base_image_version: String,

    /// The llama.cpp release, tag, or commit to build.
    pub app_version: String,

    /// GPU targets to compile for, never empty.
    pub target_architectures: Vec<String>,

    /// Whether the list as written had a `,` in it.
    pub multi_target: bool,
}

impl EffectiveConfig {
    /// Splits `architectures` on `,` and records whether it had a separator.
    ///
    /// Returns `None` when no target is left after splitting.
    #[must_use]
    pub fn new(
        base_image_version: impl Into<String>,
        app_version: impl Into<String>,
        architectures: &str,
    ) -> Option<Self> {
        let target_architectures = split_architectures(architectures);

        (!target_architectures.is_empty()).then(|| Self {
            base_image_version: base_image_version.into(),
            app_version: app_version.into(),
            target_architectures,
            multi_target: architectures.contains(','),
        })
    }

    /// The architecture list as the build expects it.
    #[must_use]
    pub fn architectures_arg(&self) -> String {
        self.target_architectures.join(",")
    }

    /// The target to prefix tags with. Only a list without
    /// any separator is a single-target build.
    #[must_use]
    pub fn single_target(&self) -> Option<&String> {
        match self.target_architectures.as_slice() {
            [arch] if !self.multi_target => Some(arch),
            _ => None,
        }
    }
}

/// Reads the base file and merges the overrides into it.
///
/// # Errors
/// Will error if the file doesn't exist or can't be read, or if any
/// required setting ends up empty. Settings are checked in the order
/// of [`ConfigKey::ALL`] and the first empty one is reported.
pub fn resolve(path: &Path, overrides: &Overrides) -> Result<EffectiveConfig, ConfigError> {
    trace!("resolve({}, {overrides:?})", path.display());

    let contents = read(path)?;
    let base = parse(&contents);

    let value = |key: ConfigKey| -> Result<String, ConfigError> {
        let value = overrides
            .get(key)
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .inspect(|v| debug!("Using override {key}={v}"))
            .or_else(|| base.get(key.as_str()).map(String::as_str))
            .unwrap_or_default();

        if value.is_empty() {
            Err(ConfigError::MissingField(key))
        } else {
            Ok(value.to_string())
        }
    };

    let base_image_version = value(ConfigKey::RocmVersion)?;
    let app_version = value(ConfigKey::LlamacppVersion)?;
    let architectures = value(ConfigKey::GpuTargets)?;

    let config = EffectiveConfig::new(base_image_version, app_version, &architectures)
        .ok_or(ConfigError::MissingField(ConfigKey::GpuTargets))?;
    debug!("Resolved configuration: {config:?}");

    Ok(config)
}

/// Rewrites the bookkeeping lines of the base file in place.
///
/// # Errors
/// Will error if the file doesn't exist or if it can't be read or replaced.
pub fn stamp(path: &Path, timestamp: &str, revision: &str) -> Result<(), ConfigError> {
    trace!("stamp({}, {timestamp}, {revision})", path.display());

    let contents = read(path)?;
    let updated = rewrite_stamp(&contents, timestamp, revision);

    let write_err = |source| ConfigError::Write {
        path: path.to_path_buf(),
        source,
    };

    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let mut temp = NamedTempFile::new_in(dir).map_err(write_err)?;
    temp.write_all(updated.as_bytes()).map_err(write_err)?;
    temp.persist(path).map_err(|e| write_err(e.error))?;

    info!("Stamped {} with {BUILD_DATE}={timestamp} {GIT_COMMIT}={revision}", path.display());
    Ok(())
}

fn read(path: &Path) -> Result<String, ConfigError> {
    fs::read_to_string(path).map_err(|source| {
        if source.kind() == io::ErrorKind::NotFound {
            ConfigError::MissingFile(path.to_path_buf())
        } else {
            ConfigError::Read {
                path: path.to_path_buf(),
                source,
            }
        }
    })
}

/// Splits a single line into its key and value.
fn parse_line(line: &str) -> Option<(&str, &str)> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return None;
    }

    let line = line.strip_prefix("export ").unwrap_or(line);
    let (key, value) = line.split_once('=')?;

    Some((key.trim(), unquote(value.trim())))
}

fn unquote(value: &str) -> &str {
    ['"', '\'']
        .into_iter()
        .find_map(|quote| {
            value
                .strip_prefix(quote)
                .and_then(|v| v.strip_suffix(quote))
        })
        .unwrap_or(value)
}

fn parse(contents: &str) -> HashMap<String, String> {
    contents
        .lines()
        .filter_map(parse_line)
        .map(|(key, value)| (key.to_string(), value.to_string()))
        .collect()
}

fn split_architectures(list: &str) -> Vec<String> {
    list.split(',')
        .map(str::trim)
        .filter(|arch| !arch.is_empty())
        .map(ToString::to_string)
        .collect()
}

fn rewrite_stamp(contents: &str, timestamp: &str, revision: &str) -> String {
    let stamps = [(BUILD_DATE, timestamp), (GIT_COMMIT, revision)];
    let mut seen = [false; 2];

    let mut lines = contents
        .lines()
        .map(|line| {
            if let Some((key, _)) = parse_line(line)
                && let Some(index) = stamps.iter().position(|(k, _)| *k == key)
            {
                seen[index] = true;
                let export = if line.trim_start().starts_with("export ") {
                    "export "
                } else {
                    ""
                };
                format!("{export}{key}={}", stamps[index].1)
            } else {
                line.to_string()
            }
        })
        .collect::<Vec<_>>();

    lines.extend(
        stamps
            .iter()
            .zip(seen)
            .filter(|(_, seen)| !seen)
            .map(|((key, value), _)| format!("{key}={value}")),
    );

    let mut out = lines.join("\n");
    out.push('\n');
    out
}
