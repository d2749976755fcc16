use std::fmt::{self, Display};
use std::str::FromStr;

use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum PlatformError {
    #[error(
        "unsupported platform: {platform}. marine binaries are published for [linux-x86_64, darwin-x86_64]"
    )]
    Unsupported { platform: String },
}

/// Canonical `<os>-<arch>` identifier used as a cache-key component and as
/// part of release download URLs. Must be resolved before any cache or
/// network access so unsupported runners fail with zero traffic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Platform {
    LinuxX86_64,
    DarwinX86_64,
}

impl Platform {
    /// Resolves the platform of the currently running process.
    pub fn resolve() -> Result<Self, PlatformError> {
        Self::from_os_arch(std::env::consts::OS, std::env::consts::ARCH)
    }

    /// Maps a raw `(os, arch)` pair to a supported platform. A pair that is
    /// already spelled as a supported identifier passes through unchanged.
    pub fn from_os_arch(os: &str, arch: &str) -> Result<Self, PlatformError> {
        match (os, arch) {
            ("linux", "x86_64") => Ok(Self::LinuxX86_64),
            ("macos", "x86_64") => Ok(Self::DarwinX86_64),
            _ => format!("{os}-{arch}").parse(),
        }
    }

    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::LinuxX86_64 => "linux-x86_64",
            Self::DarwinX86_64 => "darwin-x86_64",
        }
    }
}

impl Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Platform {
    type Err = PlatformError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "linux-x86_64" => Ok(Self::LinuxX86_64),
            "darwin-x86_64" => Ok(Self::DarwinX86_64),
            _ => Err(PlatformError::Unsupported {
                platform: s.to_string(),
            }),
        }
    }
}
