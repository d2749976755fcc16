use thiserror::Error;

use crate::artifact::ArtifactError;
use crate::cache::CacheError;
use crate::install::InstallError;
use crate::platform::PlatformError;
use crate::release::ReleaseError;
use crate::version::VersionError;

pub type Result<T> = std::result::Result<T, SetupMarineError>;

/// Terminal error surface for the pipeline. Each stage keeps its own error
/// type; only the orchestrator turns one of these into a failed run.
#[derive(Error, Debug)]
pub enum SetupMarineError {
    #[error(transparent)]
    Platform(#[from] PlatformError),

    #[error(transparent)]
    Version(#[from] VersionError),

    #[error(transparent)]
    Artifact(#[from] ArtifactError),

    #[error(transparent)]
    Cache(#[from] CacheError),

    #[error(transparent)]
    Release(#[from] ReleaseError),

    #[error(transparent)]
    Install(#[from] InstallError),

    /// Something went wrong while making an HTTP request
    #[error(transparent)]
    ReqwestError(#[from] reqwest::Error),

    /// Something went wrong with system I/O
    #[error(transparent)]
    IoError(#[from] std::io::Error),

    #[error(transparent)]
    AdhocError(#[from] anyhow::Error),
}
