use std::path::Path;

use camino::Utf8PathBuf;
use semver::Version;
use thiserror::Error;

use crate::platform::Platform;

#[derive(Error, Debug)]
pub enum CacheError {
    /// Something went wrong with system I/O
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Identifies one installable binary. Acts as the cache key: two equal
/// triples name the same install target.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ToolArtifact {
    pub name: String,
    pub version: String,
    pub platform: Platform,
}

impl ToolArtifact {
    /// Key for a release-sourced binary. The version slot is the bare
    /// semver string, never `v`-prefixed.
    pub fn release(name: &str, version: &Version, platform: Platform) -> Self {
        Self {
            name: name.to_string(),
            version: version.to_string(),
            platform,
        }
    }

    /// Key for a CI-artifact-sourced binary. Artifacts carry no semver, so
    /// the version slot is the artifact name behind an `artifact-` prefix;
    /// release keys are valid semver, so the two can never collide.
    pub fn ci_artifact(name: &str, artifact_name: &str, platform: Platform) -> Self {
        Self {
            name: name.to_string(),
            version: format!("artifact-{artifact_name}"),
            platform,
        }
    }
}

/// Thin adapter over the runner's persistent tool cache. Entries are only
/// ever added; nothing here mutates, expires, or deletes them.
pub struct ToolCache {
    root: Utf8PathBuf,
}

impl ToolCache {
    pub fn new(root: Utf8PathBuf) -> Self {
        Self { root }
    }

    fn entry_dir(&self, key: &ToolArtifact) -> Utf8PathBuf {
        self.root
            .join(&key.name)
            .join(&key.version)
            .join(key.platform.as_str())
    }

    /// Pure filesystem probe, safe to call speculatively before deciding
    /// whether to download. Never touches the network.
    pub fn lookup(&self, key: &ToolArtifact) -> Option<Utf8PathBuf> {
        let path = self.entry_dir(key).join(&key.name);
        path.is_file().then_some(path)
    }

    /// Copies `source` into the cache under `key` and returns the
    /// cache-managed path. The copy lands under a staging name and is
    /// renamed into place, so a cancelled run never registers a partial
    /// entry.
    pub fn store(&self, key: &ToolArtifact, source: &Path) -> Result<Utf8PathBuf, CacheError> {
        let dir = self.entry_dir(key);
        std::fs::create_dir_all(&dir)?;
        let staging = dir.join(format!(".{}.partial", &key.name));
        std::fs::copy(source, &staging)?;
        let dest = dir.join(&key.name);
        std::fs::rename(&staging, &dest)?;
        tracing::debug!(%dest, "cached {} {}", key.name, key.version);
        Ok(dest)
    }
}
