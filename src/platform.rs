use serde::Serialize;
use std::fmt;

/// Target platform of a release archive, in the listing's naming
/// (`linux`/`darwin`/`windows`, `amd64`/`arm64`/`386`, ...).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Platform {
    pub os: String,
    pub arch: String,
}

impl Platform {
    pub fn new(os: impl Into<String>, arch: impl Into<String>) -> Self {
        Self {
            os: os.into(),
            arch: arch.into(),
        }
    }

    /// Detect the platform of the running process.
    pub fn detect() -> Self {
        Self::from_rust_target(std::env::consts::OS, std::env::consts::ARCH)
    }

    /// Translate Rust's `target_os`/`target_arch` names into listing tokens.
    pub fn from_rust_target(os: &str, arch: &str) -> Self {
        Self {
            os: Self::map_os(os).to_string(),
            arch: Self::map_arch(arch).to_string(),
        }
    }

    fn map_os(os: &str) -> &str {
        match os {
            "macos" => "darwin",
            other => other,
        }
    }

    fn map_arch(arch: &str) -> &str {
        match arch {
            "x86_64" => "amd64",
            "x86" => "386",
            "aarch64" => "arm64",
            "arm" => "armv6l",
            "loongarch64" => "loong64",
            "powerpc64" if cfg!(target_endian = "little") => "ppc64le",
            "powerpc64" => "ppc64",
            "mips64" if cfg!(target_endian = "little") => "mips64le",
            "mips" if cfg!(target_endian = "little") => "mipsle",
            other => other,
        }
    }

    /// Replace the detected values with any explicit overrides.
    pub fn with_overrides(self, os: Option<&str>, arch: Option<&str>) -> Self {
        Self {
            os: os.map(str::to_string).unwrap_or(self.os),
            arch: arch.map(str::to_string).unwrap_or(self.arch),
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.os, self.arch)
    }
}
