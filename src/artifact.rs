//! Artifact-first acquisition: prefer a CI-build artifact over a public
//! release when the caller names one. Absence of the artifact (or of the
//! binary inside it) is an expected outcome, not a failure.

use std::ffi::OsStr;
use std::path::{Path, PathBuf};

use camino::{Utf8Path, Utf8PathBuf};
use thiserror::Error;

use crate::TOOL_NAME;
use crate::cache::{CacheError, ToolArtifact, ToolCache};
use crate::github::{ArtifactIndex, GithubError};
use crate::platform::Platform;

#[derive(Error, Debug)]
pub enum ArtifactError {
    /// The runner did not provide a scratch directory. This is a
    /// configuration error, not a download failure, so it does not trigger
    /// the release fallback.
    #[error("no scratch directory is available (RUNNER_TEMP is not set); one is required to download CI artifacts")]
    MissingTempDir,

    #[error(transparent)]
    Github(#[from] GithubError),

    #[error("malformed artifact archive")]
    Archive(#[from] zip::result::ZipError),

    #[error(transparent)]
    Cache(#[from] CacheError),

    /// Something went wrong with system I/O
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Outcome of an acquisition attempt. Absence is modeled as a value so
/// callers can fall through without unwinding.
#[derive(Debug)]
pub enum AcquisitionOutcome {
    Found(Utf8PathBuf),
    NotAvailable(String),
}

pub struct ArtifactAcquirer<'a> {
    index: &'a dyn ArtifactIndex,
    cache: &'a ToolCache,
    repo: &'a str,
    platform: Platform,
    temp_dir: Option<Utf8PathBuf>,
}

impl<'a> ArtifactAcquirer<'a> {
    pub fn new(
        index: &'a dyn ArtifactIndex,
        cache: &'a ToolCache,
        repo: &'a str,
        platform: Platform,
        temp_dir: Option<Utf8PathBuf>,
    ) -> Self {
        Self {
            index,
            cache,
            repo,
            platform,
            temp_dir,
        }
    }

    /// Attempts to obtain the binary from the CI artifact named
    /// `artifact_name`. Transport and extraction failures are logged with
    /// their cause and folded into [`AcquisitionOutcome::NotAvailable`] so
    /// the caller can fall back to the release path; only a missing scratch
    /// directory propagates as an error.
    pub async fn try_acquire(
        &self,
        artifact_name: &str,
    ) -> Result<AcquisitionOutcome, ArtifactError> {
        let temp_dir = self
            .temp_dir
            .as_deref()
            .ok_or(ArtifactError::MissingTempDir)?;
        match self.acquire(artifact_name, temp_dir).await {
            Ok(outcome) => Ok(outcome),
            Err(err) => {
                tracing::warn!("artifact acquisition failed: {err}");
                Ok(AcquisitionOutcome::NotAvailable(err.to_string()))
            }
        }
    }

    async fn acquire(
        &self,
        artifact_name: &str,
        temp_dir: &Utf8Path,
    ) -> Result<AcquisitionOutcome, ArtifactError> {
        let artifacts = self.index.list_artifacts(self.repo).await?;
        let Some(artifact) = artifacts.iter().find(|a| a.name == artifact_name) else {
            return Ok(AcquisitionOutcome::NotAvailable(format!(
                "no CI artifact named `{artifact_name}`"
            )));
        };

        // The scratch directory is uniquely named to avoid collisions
        // across concurrent steps, and removed on every exit path once the
        // binary has been promoted into the persistent cache.
        let scratch = tempfile::Builder::new()
            .prefix("marine-artifact-")
            .tempdir_in(temp_dir)?;
        let archive_path = scratch.path().join("artifact.zip");
        self.index.download_archive(artifact, &archive_path).await?;

        let Some(extracted) = extract_binary(&archive_path, scratch.path(), TOOL_NAME)? else {
            return Ok(AcquisitionOutcome::NotAvailable(format!(
                "no `{TOOL_NAME}` binary inside artifact `{artifact_name}`"
            )));
        };

        let key = ToolArtifact::ci_artifact(TOOL_NAME, artifact_name, self.platform);
        let stored = self.cache.store(&key, &extracted)?;
        tracing::info!("acquired {TOOL_NAME} from CI artifact `{artifact_name}`");
        Ok(AcquisitionOutcome::Found(stored))
    }
}

/// Streams entries out of the archive, skipping directories, and extracts
/// the first one whose file name is `file_name` wherever it nests. Returns
/// `None` when no entry matches.
fn extract_binary(
    archive_path: &Path,
    dest_dir: &Path,
    file_name: &str,
) -> Result<Option<PathBuf>, ArtifactError> {
    let file = std::fs::File::open(archive_path)?;
    let mut archive = zip::ZipArchive::new(file)?;
    for index in 0..archive.len() {
        let mut entry = archive.by_index(index)?;
        if entry.is_dir() {
            continue;
        }
        let matches = entry
            .enclosed_name()
            .and_then(|path| path.file_name().map(|name| name == OsStr::new(file_name)))
            .unwrap_or(false);
        if !matches {
            continue;
        }
        let out_path = dest_dir.join(file_name);
        let mut out = std::fs::File::create(&out_path)?;
        std::io::copy(&mut entry, &mut out)?;
        return Ok(Some(out_path));
    }
    Ok(None)
}
