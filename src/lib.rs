//! Provisions the `marine` binary onto a CI runner.
//!
//! The pipeline resolves the runner platform, optionally prefers a CI-build
//! artifact, otherwise resolves a release version, pulls the binary out of
//! the tool cache or downloads it, and finally installs it: execute bit,
//! search-path publication, and a `--version` self-check.

use std::io;

use tracing_subscriber::fmt;

pub mod artifact;
pub mod cache;
pub mod cli;
mod error;
pub mod github;
pub mod install;
pub mod platform;
pub mod release;
pub mod version;

pub use error::{Result, SetupMarineError};

/// The name the installed binary is always invoked by, regardless of how it
/// was acquired.
pub const TOOL_NAME: &str = "marine";

/// Initializes a global tracing subscriber that formats all logs produced by
/// the pipeline and by the libraries it consumes.
pub fn init_tracing(level: tracing::Level) {
    let format = fmt::format().without_time().pretty();
    fmt()
        .with_max_level(level)
        .event_format(format)
        .with_writer(io::stderr)
        .init();
}
