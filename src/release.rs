//! Last-resort acquisition: download a published release binary, with the
//! tool cache consulted first so repeat runs on the same runner stay
//! offline.

use std::io::Write;

use camino::Utf8PathBuf;
use reqwest::header;
use semver::Version;
use thiserror::Error;
use url::Url;

use crate::cache::{CacheError, ToolArtifact, ToolCache};
use crate::platform::Platform;

/// Fixed distribution point for marine releases.
pub const DOWNLOAD_BASE: &str = "https://github.com/fluencelabs/marine/releases/download";

#[derive(Error, Debug)]
pub enum ReleaseError {
    /// No further fallback exists past this point, so a failed transfer is
    /// fatal for the run. Retry policy belongs to the workflow, not here.
    #[error("failed to download {url}")]
    Download { url: Url, source: reqwest::Error },

    #[error("could not construct a release download URL")]
    InvalidUrl(#[from] url::ParseError),

    #[error(transparent)]
    Cache(#[from] CacheError),

    /// Something went wrong with system I/O
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub struct ReleaseAcquirer<'a> {
    client: &'a reqwest::Client,
    cache: &'a ToolCache,
    download_base: Url,
}

impl<'a> ReleaseAcquirer<'a> {
    pub fn new(client: &'a reqwest::Client, cache: &'a ToolCache, download_base: Url) -> Self {
        Self {
            client,
            cache,
            download_base,
        }
    }

    /// `<base>/marine-v<version>/<tool>-<platform>` — the tag re-gains its
    /// `marine-v` prefix, the filename is platform-qualified.
    fn download_url(
        &self,
        tool: &str,
        version: &Version,
        platform: Platform,
    ) -> Result<Url, ReleaseError> {
        let base = self.download_base.as_str().trim_end_matches('/');
        Ok(Url::parse(&format!(
            "{base}/marine-v{version}/{tool}-{platform}"
        ))?)
    }

    /// Returns the cached path for `(tool, version, platform)`, downloading
    /// and promoting into the cache only on a miss. A cache hit performs
    /// zero network access.
    pub async fn acquire(
        &self,
        tool: &str,
        version: &Version,
        platform: Platform,
    ) -> Result<Utf8PathBuf, ReleaseError> {
        let key = ToolArtifact::release(tool, version, platform);
        if let Some(hit) = self.cache.lookup(&key) {
            tracing::info!("found {tool} v{version} in the tool cache");
            return Ok(hit);
        }

        let url = self.download_url(tool, version, platform)?;
        tracing::info!("downloading {tool} v{version} for {platform}");
        tracing::debug!(%url);
        let bytes = self
            .client
            .get(url.clone())
            .header(header::ACCEPT, "application/octet-stream")
            .send()
            .await
            .and_then(|response| response.error_for_status())
            .map_err(|source| ReleaseError::Download {
                url: url.clone(),
                source,
            })?
            .bytes()
            .await
            .map_err(|source| ReleaseError::Download { url, source })?;

        // scratch file; removed on drop once the cache owns a copy
        let mut scratch = tempfile::NamedTempFile::new()?;
        scratch.write_all(&bytes)?;
        scratch.flush()?;
        Ok(self.cache.store(&key, scratch.path())?)
    }
}
