//! Environment harness for tests.
//!
//! Values are keyed by the calling thread so tests running in
//! parallel never see each other's variables and never touch the
//! real process environment.

use std::{
    collections::HashMap,
    sync::{LazyLock, RwLock},
    thread::{self, ThreadId},
};

use miette::{Result, miette};

use crate::string;

type EnvStore = RwLock<HashMap<(ThreadId, String), String>>;

static ENV_VARS: LazyLock<EnvStore> = LazyLock::new(|| RwLock::new(HashMap::new()));

/// Test harness function for getting env variables.
///
/// # Errors
/// Will error if the env variable hasn't been set on this thread.
pub fn get_env_var<S>(key: S) -> Result<String>
where
    S: AsRef<str>,
{
    fn inner(key: &str) -> Result<String> {
        let key = (thread::current().id(), string!(key));

        ENV_VARS
            .read()
            .map_err(|e| miette!("Env harness poisoned: {e}"))?
            .get(&key)
            .cloned()
            .ok_or_else(|| miette!("Failed to retrieve env var '{}'", key.1))
    }
    inner(key.as_ref())
}

/// Test harness equivalent of [`crate::has_env_var`].
#[must_use]
pub fn has_env_var<S>(key: S) -> bool
where
    S: AsRef<str>,
{
    get_env_var(key).is_ok_and(|v| !v.is_empty())
}

/// Sets a variable visible only to the current thread.
///
/// # Panics
/// Panics if the harness lock is poisoned.
pub fn set_env_var<S, T>(key: S, value: T)
where
    S: AsRef<str>,
    T: AsRef<str>,
{
    ENV_VARS
        .write()
        .expect("Env harness should lock")
        .insert(
            (thread::current().id(), string!(key.as_ref())),
            string!(value.as_ref()),
        );
}

/// Removes a variable from the current thread.
///
/// # Panics
/// Panics if the harness lock is poisoned.
pub fn remove_env_var<S>(key: S)
where
    S: AsRef<str>,
{
    ENV_VARS
        .write()
        .expect("Env harness should lock")
        .remove(&(thread::current().id(), string!(key.as_ref())));
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn scoped_to_thread() {
        set_env_var("GFXBUILD_HARNESS", "set");
        assert_eq!(get_env_var("GFXBUILD_HARNESS").unwrap(), "set");

        thread::spawn(|| assert!(get_env_var("GFXBUILD_HARNESS").is_err()))
            .join()
            .unwrap();

        remove_env_var("GFXBUILD_HARNESS");
        assert!(!has_env_var("GFXBUILD_HARNESS"));
    }
}
