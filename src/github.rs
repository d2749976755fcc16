//! Clients for the two remote indexes the pipeline consumes: the public
//! release index and the CI-build-artifact index. Both are expressed as
//! traits so the orchestrator can be exercised against fakes.

use std::path::Path;

use async_trait::async_trait;
use reqwest::header;
use serde::Deserialize;
use thiserror::Error;
use url::Url;

#[derive(Error, Debug)]
pub enum GithubError {
    /// Something went wrong while making an HTTP request
    #[error(transparent)]
    Request(#[from] reqwest::Error),

    #[error("could not construct a GitHub API URL")]
    InvalidUrl(#[from] url::ParseError),

    /// Something went wrong with system I/O
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// A tagged, publicly downloadable distribution of the tool.
#[derive(Debug, Clone, Deserialize)]
pub struct Release {
    pub tag_name: String,
}

/// A named, ephemeral build output stored by the CI system for a workflow
/// run, distinct from a public release.
#[derive(Debug, Clone, Deserialize)]
pub struct Artifact {
    pub name: String,
    pub archive_download_url: String,
}

#[derive(Debug, Deserialize)]
struct ArtifactList {
    artifacts: Vec<Artifact>,
}

/// Read-only view of published releases for an `owner/repo` scope, most
/// recent first.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ReleaseIndex {
    async fn list_releases(&self, repo: &str) -> Result<Vec<Release>, GithubError>;
}

/// Read-only view of CI-build artifacts for an `owner/repo` scope.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ArtifactIndex {
    async fn list_artifacts(&self, repo: &str) -> Result<Vec<Artifact>, GithubError>;

    /// Downloads the artifact's zip archive to `dest`.
    async fn download_archive(&self, artifact: &Artifact, dest: &Path) -> Result<(), GithubError>;
}

pub struct GithubClient {
    client: reqwest::Client,
    api_base: Url,
    token: Option<String>,
}

impl GithubClient {
    pub fn new(client: reqwest::Client, api_base: Url, token: Option<String>) -> Self {
        Self {
            client,
            api_base,
            token,
        }
    }

    /// Bearer token for the GitHub API. Required for the artifact index,
    /// optional (rate limits aside) for the release index.
    pub fn token_from_env() -> Option<String> {
        std::env::var("GITHUB_TOKEN")
            .or_else(|_| std::env::var("GH_TOKEN"))
            .ok()
    }

    fn endpoint(&self, path: &str) -> Result<Url, GithubError> {
        let base = self.api_base.as_str().trim_end_matches('/');
        Ok(Url::parse(&format!("{base}/{path}"))?)
    }

    fn get(&self, url: Url) -> reqwest::RequestBuilder {
        let request = self
            .client
            .get(url)
            .header(header::ACCEPT, "application/vnd.github+json");
        if let Some(token) = &self.token {
            request.header(header::AUTHORIZATION, format!("Bearer {token}"))
        } else {
            request
        }
    }
}

#[async_trait]
impl ReleaseIndex for GithubClient {
    async fn list_releases(&self, repo: &str) -> Result<Vec<Release>, GithubError> {
        let url = self.endpoint(&format!("repos/{repo}/releases"))?;
        tracing::debug!(%url, "listing releases");
        let releases = self
            .get(url)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(releases)
    }
}

#[async_trait]
impl ArtifactIndex for GithubClient {
    async fn list_artifacts(&self, repo: &str) -> Result<Vec<Artifact>, GithubError> {
        let url = self.endpoint(&format!("repos/{repo}/actions/artifacts?per_page=100"))?;
        tracing::debug!(%url, "listing CI artifacts");
        let list: ArtifactList = self
            .get(url)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(list.artifacts)
    }

    async fn download_archive(&self, artifact: &Artifact, dest: &Path) -> Result<(), GithubError> {
        tracing::debug!(url = %artifact.archive_download_url, "downloading artifact archive");
        let request = self
            .client
            .get(&artifact.archive_download_url)
            .header(header::ACCEPT, "application/octet-stream");
        let request = if let Some(token) = &self.token {
            request.header(header::AUTHORIZATION, format!("Bearer {token}"))
        } else {
            request
        };
        let bytes = request
            .send()
            .await?
            .error_for_status()?
            .bytes()
            .await?;
        std::fs::write(dest, &bytes)?;
        Ok(())
    }
}
