//! This module is responsible for managing processes spawned
//! by this tool. It contains the drivers for building, scanning,
//! and signing images with tools like docker, trivy, and cosign,
//! along with the logging that streams their output.

pub mod drivers;
pub mod logging;
pub mod runner;
