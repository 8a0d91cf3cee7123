pub mod constants;
mod macros;
#[cfg(feature = "test")]
pub mod test_utils;

use std::path::PathBuf;

use chrono::{SecondsFormat, Utc};
use log::trace;
use miette::{Context, IntoDiagnostic, Result, bail};

/// Checks for the existance of a given command.
///
/// # Errors
/// Will error if the command can't be found in `PATH`.
pub fn check_command_exists(command: &str) -> Result<()> {
    trace!("check_command_exists({command})");

    match which::which(command) {
        Ok(path) => {
            trace!("Command {command} found at {}", path.display());
            Ok(())
        }
        Err(e) => bail!("Command {command} doesn't exist: {e}"),
    }
}

/// Gets the value of an environment variable.
///
/// # Errors
/// Will error if the variable is unset or isn't valid unicode.
pub fn get_env_var<S>(key: S) -> Result<String>
where
    S: AsRef<str>,
{
    fn inner(key: &str) -> Result<String> {
        std::env::var(key)
            .into_diagnostic()
            .with_context(|| format!("Failed to retrieve env var '{key}'"))
    }
    inner(key.as_ref())
}

/// Checks that an environment variable is set and not empty.
#[must_use]
pub fn has_env_var<S>(key: S) -> bool
where
    S: AsRef<str>,
{
    get_env_var(key).is_ok_and(|v| !v.is_empty())
}

/// Interprets a value as a boolean toggle.
///
/// `1`, `true`, `yes`, and `on` (any case) are enabled, everything
/// else is disabled.
#[must_use]
pub fn is_truthy<S>(value: S) -> bool
where
    S: AsRef<str>,
{
    matches!(
        value.as_ref().trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

/// The current UTC time with second precision,
/// e.g. `2025-01-31T09:04:59Z`.
#[must_use]
pub fn current_timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true)
}

#[must_use]
pub fn home_dir() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|base_dirs| base_dirs.home_dir().to_path_buf())
}
