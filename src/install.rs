//! Terminal stage of the pipeline: make the acquired binary executable,
//! publish its directory on the search path, and prove it runs.

use std::io::Write;
use std::process::Output;

use async_trait::async_trait;
use camino::{Utf8Path, Utf8PathBuf};
use thiserror::Error;
use tokio::process::Command;

#[derive(Error, Debug)]
pub enum InstallError {
    /// Something went wrong with system I/O
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("could not rebuild the PATH variable")]
    JoinPaths(#[from] std::env::JoinPathsError),

    #[error("binary path {path} has no parent directory")]
    MissingParent { path: Utf8PathBuf },

    /// The acquired binary does not run on this platform. The whole
    /// acquisition path produced an unusable artifact, so this is fatal.
    #[error("installed binary failed its self-check: {reason}")]
    SelfCheck { reason: String },
}

#[cfg_attr(test, mockall::automock(type Error = std::io::Error;))]
#[async_trait]
pub trait ExecCommand {
    type Error: std::error::Error + Send + Sync + 'static;

    async fn exec_command<'a>(
        &self,
        path: &Utf8PathBuf,
        args: &[&'a str],
    ) -> Result<Output, Self::Error>;
}

pub struct TokioCommand;

#[async_trait]
impl ExecCommand for TokioCommand {
    type Error = std::io::Error;

    async fn exec_command<'a>(
        &self,
        path: &Utf8PathBuf,
        args: &[&'a str],
    ) -> Result<Output, Self::Error> {
        Command::new(path).args(args).output().await
    }
}

pub struct BinaryInstaller<Exec> {
    exec: Exec,
    github_path: Option<Utf8PathBuf>,
}

impl<Exec: ExecCommand> BinaryInstaller<Exec> {
    /// `github_path` is the job-wide search-path file (the `GITHUB_PATH`
    /// contract); when absent, only the current process sees the new entry.
    pub fn new(exec: Exec, github_path: Option<Utf8PathBuf>) -> Self {
        Self { exec, github_path }
    }

    /// Makes the binary at `bin_path` invocable as `tool_name`: sets the
    /// execute bit, publishes the containing directory on the search path,
    /// and runs `--version` as a self-check, surfacing its output. The
    /// execute bit is not rolled back when the self-check fails.
    pub async fn install(&self, bin_path: &Utf8PathBuf, tool_name: &str) -> Result<(), InstallError> {
        set_executable(bin_path)?;

        let bin_dir = bin_path
            .parent()
            .ok_or_else(|| InstallError::MissingParent {
                path: bin_path.clone(),
            })?;
        self.publish_search_path(bin_dir)?;

        let output = self
            .exec
            .exec_command(bin_path, &["--version"])
            .await
            .map_err(|err| InstallError::SelfCheck {
                reason: err.to_string(),
            })?;
        if !output.status.success() {
            return Err(InstallError::SelfCheck {
                reason: format!("`{tool_name} --version` exited with {}", output.status),
            });
        }
        tracing::info!(
            "{}",
            String::from_utf8_lossy(&output.stdout).trim_end()
        );
        tracing::info!("{tool_name} is installed and on the search path");
        Ok(())
    }

    fn publish_search_path(&self, bin_dir: &Utf8Path) -> Result<(), InstallError> {
        if let Some(github_path) = &self.github_path {
            let mut file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(github_path)?;
            writeln!(file, "{bin_dir}")?;
            tracing::debug!("published {bin_dir} to {github_path}");
        }

        let current = std::env::var_os("PATH").unwrap_or_default();
        let paths = std::iter::once(bin_dir.as_std_path().to_path_buf())
            .chain(std::env::split_paths(&current));
        let joined = std::env::join_paths(paths)?;
        // Callers run this on a current-thread runtime, so no other thread
        // is positioned to read or write the environment during this write.
        unsafe { std::env::set_var("PATH", &joined) };
        Ok(())
    }
}

#[cfg(unix)]
fn set_executable(path: &Utf8Path) -> std::io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o755))
}

#[cfg(not(unix))]
fn set_executable(_path: &Utf8Path) -> std::io::Result<()> {
    Ok(())
}
