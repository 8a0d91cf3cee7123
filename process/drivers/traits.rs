use std::process::Command;

use super::{
    ToolResult,
    opts::{ScanOpts, SignOpts},
};

/// Allows agnostic setup and execution of image builds.
pub trait BuildDriver {
    /// Makes sure the builder the build runs on exists.
    ///
    /// Safe to call any number of times, and safe to race
    /// against another process creating the same builder.
    ///
    /// # Errors
    /// Will error if the builder can't be listed or created.
    fn setup(&self) -> ToolResult;

    /// Runs a fully assembled build command.
    ///
    /// # Errors
    /// Will error with the tool's own exit code if the build fails.
    fn build(&self, command: Command, image_ref: &str) -> ToolResult;
}

/// Allows agnostic vulnerability scanning of built images.
pub trait ScanDriver {
    /// Scans an image.
    ///
    /// # Errors
    /// Will error if the scanner is missing or reports findings.
    fn scan(&self, opts: &ScanOpts) -> ToolResult;
}

pub trait SigningDriver {
    /// Signs an image.
    ///
    /// # Errors
    /// Will error if signing fails.
    fn sign(&self, opts: &SignOpts) -> ToolResult;
}
