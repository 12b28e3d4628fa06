//! Core domain types for the ASP client bootstrap.
//!
//! This crate contains pure domain types with no IO, no async, and minimal
//! dependencies: the host platform, the resolved server location, document
//! selectors, and the session lifecycle state.

// Pedantic lint configuration - these are intentional design choices
#![allow(clippy::missing_errors_doc)] // Result-returning functions are self-explanatory

mod platform;
mod selector;

pub use platform::{HostPlatform, UnsupportedPlatformError};
pub use selector::{DocumentFilter, DocumentSelector};

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;

// ============================================================================
// Identity
// ============================================================================

/// Short key of the client session.
pub const CLIENT_ID: &str = "asp-lsp";

/// Human-readable title of the client session, shown in the host UI.
pub const CLIENT_NAME: &str = "ASP language server";

/// Display name of the protocol trace output channel.
pub const TRACE_CHANNEL_NAME: &str = "asp-lsp trace";

/// Language identifier the server is registered for.
pub const LANGUAGE_ID: &str = "asp";

/// URI scheme of documents on the local filesystem.
pub const FILE_SCHEME: &str = "file";

/// Environment variable that, when set and non-empty, names the server binary.
pub const SERVER_PATH_ENV: &str = "SERVER_PATH";

/// Environment variable controlling the server's own log verbosity.
pub const SERVER_LOG_ENV: &str = "RUST_LOG";

/// Log verbosity handed to the server when nothing else is configured.
pub const DEFAULT_SERVER_LOG_LEVEL: &str = "debug";

/// Directory under the install root holding the shipped server binaries.
pub const BUNDLED_SERVER_DIR: &str = "server";

// ============================================================================
// Server Location
// ============================================================================

/// Path or bare command token identifying the server executable.
///
/// Guaranteed non-empty: a session can never be built with an unresolved
/// command.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ServerLocation(PathBuf);

#[derive(Debug, Error)]
#[error("server command must not be empty")]
pub struct EmptyCommandError;

impl ServerLocation {
    pub fn new(value: impl Into<PathBuf>) -> Result<Self, EmptyCommandError> {
        let value = value.into();
        if value.as_os_str().to_string_lossy().trim().is_empty() {
            Err(EmptyCommandError)
        } else {
            Ok(Self(value))
        }
    }

    /// `<install_root>/server/<platform_dir>/<file>`.
    ///
    /// Infallible: the `server` component keeps the path non-empty.
    #[must_use]
    pub fn bundled(install_root: &Path, platform_dir: &str, file: &str) -> Self {
        Self(
            install_root
                .join(BUNDLED_SERVER_DIR)
                .join(platform_dir)
                .join(file),
        )
    }

    #[must_use]
    pub fn as_path(&self) -> &Path {
        &self.0
    }

    #[must_use]
    pub fn into_path_buf(self) -> PathBuf {
        self.0
    }
}

impl AsRef<Path> for ServerLocation {
    fn as_ref(&self) -> &Path {
        self.as_path()
    }
}

impl fmt::Display for ServerLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.display())
    }
}

// ============================================================================
// Lifecycle
// ============================================================================

/// Lifecycle of the client-server session.
///
/// `Uninitialized -> Starting -> Running -> Stopped`; a new activation after
/// `Stopped` starts a fresh cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SessionState {
    #[default]
    Uninitialized,
    Starting,
    Running,
    Stopped,
}

impl SessionState {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Uninitialized => "uninitialized",
            Self::Starting => "starting",
            Self::Running => "running",
            Self::Stopped => "stopped",
        }
    }

    /// Whether a session exists that has not been stopped yet.
    #[must_use]
    pub const fn is_active(self) -> bool {
        matches!(self, Self::Starting | Self::Running)
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which transport variant to launch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LaunchMode {
    #[default]
    Run,
    Debug,
}

impl LaunchMode {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Run => "run",
            Self::Debug => "debug",
        }
    }
}

/// How much of the wire protocol is written to the trace sink.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TraceLevel {
    /// Nothing but lifecycle notes and server output.
    Off,
    /// One line per message: direction, kind, method and id.
    #[default]
    Messages,
    /// Message lines plus the JSON body.
    Verbose,
}

impl TraceLevel {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Off => "off",
            Self::Messages => "messages",
            Self::Verbose => "verbose",
        }
    }

    #[must_use]
    pub const fn traces_messages(self) -> bool {
        !matches!(self, Self::Off)
    }
}
