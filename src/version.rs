use std::fmt::{self, Display};
use std::str::FromStr;

use semver::Version;
use thiserror::Error;

use crate::github::{GithubError, ReleaseIndex};

/// Tag naming convention for marine releases. `latest` resolution only
/// considers tags carrying this prefix.
pub const TAG_PREFIX: &str = "marine-v";

#[derive(Error, Debug)]
pub enum VersionError {
    #[error("no release found matching the `{TAG_PREFIX}` tag convention")]
    NoReleaseFound,

    #[error("invalid semver version: \"{input}\"")]
    Semver {
        input: String,
        source: semver::Error,
    },

    #[error(transparent)]
    ReleaseIndex(#[from] GithubError),
}

/// A user-supplied version token: either the `latest` sentinel or an
/// explicit version, which is normalized (no leading `v`) at parse time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VersionSpec {
    Latest,
    Exact(Version),
}

impl FromStr for VersionSpec {
    type Err = VersionError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        if input == "latest" {
            return Ok(Self::Latest);
        }
        let bare = input.strip_prefix('v').unwrap_or(input);
        let version = Version::parse(bare).map_err(|source| VersionError::Semver {
            input: input.to_string(),
            source,
        })?;
        Ok(Self::Exact(version))
    }
}

impl Display for VersionSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Latest => write!(f, "latest"),
            Self::Exact(version) => write!(f, "{version}"),
        }
    }
}

/// Turns a [`VersionSpec`] into a concrete version. Explicit versions return
/// without touching the network; `latest` takes the first release in index
/// order (most recent first) whose tag follows the naming convention.
pub async fn resolve_version(
    spec: &VersionSpec,
    repo: &str,
    index: &dyn ReleaseIndex,
) -> Result<Version, VersionError> {
    match spec {
        VersionSpec::Exact(version) => Ok(version.clone()),
        VersionSpec::Latest => {
            let releases = index.list_releases(repo).await?;
            let tag = releases
                .iter()
                .find_map(|release| release.tag_name.strip_prefix(TAG_PREFIX))
                .ok_or(VersionError::NoReleaseFound)?;
            let version = Version::parse(tag).map_err(|source| VersionError::Semver {
                input: tag.to_string(),
                source,
            })?;
            tracing::info!("Latest marine release is v{version}");
            Ok(version)
        }
    }
}
