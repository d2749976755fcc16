use camino::Utf8PathBuf;
use clap::Parser;
use tracing::Level;
use url::Url;

use crate::artifact::{AcquisitionOutcome, ArtifactAcquirer};
use crate::cache::ToolCache;
use crate::github::GithubClient;
use crate::install::{BinaryInstaller, TokioCommand};
use crate::platform::Platform;
use crate::release::ReleaseAcquirer;
use crate::version::{VersionSpec, resolve_version};
use crate::{Result, TOOL_NAME};

/// Installs the marine binary onto this runner and exposes it on the search
/// path for the rest of the pipeline.
#[derive(Debug, Parser)]
#[clap(name = "setup-marine")]
pub struct SetupMarine {
    /// Version of marine to install: an explicit tag (with or without a
    /// leading `v`) or `latest`.
    #[clap(long = "version", env = "INPUT_VERSION", default_value = "latest")]
    version: VersionSpec,

    /// Name of a CI-build artifact to prefer over a public release. Empty
    /// disables artifact-first acquisition.
    #[clap(long, env = "INPUT_ARTIFACT-NAME")]
    artifact_name: Option<String>,

    /// `owner/repo` scope for the release and artifact indexes.
    #[clap(long, env = "GITHUB_REPOSITORY", default_value = "fluencelabs/marine")]
    repo: String,

    /// Root of the persistent tool cache on this runner.
    #[clap(long, env = "RUNNER_TOOL_CACHE")]
    tool_cache: Utf8PathBuf,

    /// Scratch directory for artifact downloads. Required only when
    /// artifact-first acquisition is attempted.
    #[clap(long, env = "RUNNER_TEMP")]
    temp_dir: Option<Utf8PathBuf>,

    /// Job-wide search-path file; each line becomes a PATH entry for
    /// subsequent pipeline steps.
    #[clap(long, env = "GITHUB_PATH", hide = true)]
    github_path: Option<Utf8PathBuf>,

    #[clap(
        long,
        env = "GITHUB_API_URL",
        default_value = "https://api.github.com",
        hide = true
    )]
    api_url: Url,

    #[clap(
        long,
        env = "SETUP_MARINE_DOWNLOAD_BASE",
        default_value = crate::release::DOWNLOAD_BASE,
        hide = true
    )]
    download_base: Url,

    /// Specify the log level
    #[clap(long = "log", short = 'l', global = true, default_value = "info")]
    pub log_level: Level,
}

impl SetupMarine {
    /// Runs the whole acquisition pipeline: platform check, artifact
    /// attempt, version/cache/release path, install. This is the only place
    /// where errors become a failed run; the stages below report expected
    /// absence as values and fall through.
    pub async fn run(&self) -> Result<()> {
        let platform = Platform::resolve()?;
        tracing::debug!(%platform, "resolved runner platform");

        let client = reqwest::Client::builder()
            .user_agent(format!("setup-marine/{}", env!("CARGO_PKG_VERSION")))
            .build()?;
        let github = GithubClient::new(
            client.clone(),
            self.api_url.clone(),
            GithubClient::token_from_env(),
        );
        let cache = ToolCache::new(self.tool_cache.clone());
        let installer = BinaryInstaller::new(TokioCommand, self.github_path.clone());

        if let Some(artifact_name) = self.artifact_name.as_deref().filter(|name| !name.is_empty())
        {
            let acquirer = ArtifactAcquirer::new(
                &github,
                &cache,
                &self.repo,
                platform,
                self.temp_dir.clone(),
            );
            match acquirer.try_acquire(artifact_name).await? {
                AcquisitionOutcome::Found(bin_path) => {
                    installer.install(&bin_path, TOOL_NAME).await?;
                    return Ok(());
                }
                AcquisitionOutcome::NotAvailable(reason) => {
                    tracing::warn!(
                        "failed to download artifact `{artifact_name}`: {reason}; falling back to releases"
                    );
                }
            }
        }

        let version = resolve_version(&self.version, &self.repo, &github).await?;
        let acquirer = ReleaseAcquirer::new(&client, &cache, self.download_base.clone());
        let bin_path = acquirer.acquire(TOOL_NAME, &version, platform).await?;
        installer.install(&bin_path, TOOL_NAME).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use clap::Parser;
    use speculoos::prelude::*;

    use super::SetupMarine;
    use crate::version::VersionSpec;

    fn parse(args: &[&str]) -> SetupMarine {
        let mut argv = vec!["setup-marine", "--tool-cache", "/tmp/tool-cache"];
        argv.extend(args);
        SetupMarine::try_parse_from(argv).expect("args did not parse")
    }

    #[test]
    fn it_defaults_to_latest() {
        let app = parse(&[]);
        assert_that!(app.version).is_equal_to(VersionSpec::Latest);
    }

    #[test]
    fn it_strips_a_leading_v_from_an_explicit_version() {
        let app = parse(&["--version", "v1.2.3"]);
        let VersionSpec::Exact(version) = app.version else {
            panic!("expected an exact version");
        };
        assert_that!(version.to_string()).is_equal_to("1.2.3".to_string());
    }

    #[test]
    fn it_rejects_a_malformed_version() {
        let result = SetupMarine::try_parse_from([
            "setup-marine",
            "--tool-cache",
            "/tmp/tool-cache",
            "--version",
            "not-a-version",
        ]);
        assert_that!(result).is_err();
    }

    #[test]
    fn an_empty_artifact_name_disables_artifact_first_acquisition() {
        let app = parse(&["--artifact-name", ""]);
        let enabled = app
            .artifact_name
            .as_deref()
            .filter(|name| !name.is_empty())
            .is_some();
        assert_that!(enabled).is_false();
    }
}
