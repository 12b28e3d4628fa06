//! Host platform detection.
//!
//! The platform is derived once per process from `std::env::consts::OS` and
//! never changes afterwards. Anything outside the recognised set is kept as
//! [`HostPlatform::Unsupported`] with the raw identifier, so resolution
//! failures can name the offending platform.

use std::fmt;

use thiserror::Error;

/// Operating-system family the client is running under.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum HostPlatform {
    Windows,
    MacOs,
    Linux,
    /// Any other OS identifier, verbatim.
    Unsupported(String),
}

impl HostPlatform {
    /// Platform of the running process.
    #[must_use]
    pub fn detect() -> Self {
        Self::from_os(std::env::consts::OS)
    }

    /// Map an OS identifier onto the recognised set.
    ///
    /// Accepts both Rust's `std::env::consts::OS` spellings and the
    /// Node-style aliases editors tend to report (`win32`, `darwin`).
    #[must_use]
    pub fn from_os(os: &str) -> Self {
        match os.trim().to_ascii_lowercase().as_str() {
            "windows" | "win32" => Self::Windows,
            "macos" | "darwin" => Self::MacOs,
            "linux" => Self::Linux,
            _ => Self::Unsupported(os.to_string()),
        }
    }

    /// Identifier used in logs and error messages.
    #[must_use]
    pub fn identifier(&self) -> &str {
        match self {
            Self::Windows => "windows",
            Self::MacOs => "macos",
            Self::Linux => "linux",
            Self::Unsupported(os) => os,
        }
    }

    #[must_use]
    pub fn is_windows(&self) -> bool {
        matches!(self, Self::Windows)
    }

    #[must_use]
    pub fn is_supported(&self) -> bool {
        !matches!(self, Self::Unsupported(_))
    }
}

impl fmt::Display for HostPlatform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.identifier())
    }
}

/// No server binary is shipped for the host platform.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unsupported platform: {platform}")]
pub struct UnsupportedPlatformError {
    platform: String,
}

impl UnsupportedPlatformError {
    #[must_use]
    pub fn new(platform: impl Into<String>) -> Self {
        Self {
            platform: platform.into(),
        }
    }

    /// The platform identifier that could not be resolved.
    #[must_use]
    pub fn platform(&self) -> &str {
        &self.platform
    }
}
