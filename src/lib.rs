//! Builds ROCm llama.cpp server images with `docker buildx`.
//!
//! The versions to build come from a `versions.env` file that can be
//! overridden from the command line or the environment. The resulting
//! build is run through a dedicated buildx builder and can optionally
//! be scanned and signed afterwards.

pub mod commands;
pub mod config;
pub mod dispatch;
pub mod invocation;
