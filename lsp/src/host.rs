//! The hosting editor, as seen from the client bootstrap.
//!
//! Everything the bootstrap needs from its host goes through
//! [`ExtensionHost`]: where the extension is installed, how to create a
//! named output channel, the process environment, and the platform. Tests
//! inject fakes; [`ProcessHost`] is the real thing.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use asp_client_types::HostPlatform;

use crate::trace::{FileTraceSink, TraceSink, TracingTraceSink};

/// Services the host provides to [`SessionManager`](crate::SessionManager).
pub trait ExtensionHost: Send + Sync {
    /// Absolute installation root of the extension.
    fn install_root(&self) -> &Path;

    /// Absolute form of a path relative to the install root.
    fn as_absolute_path(&self, relative: &Path) -> PathBuf {
        self.install_root().join(relative)
    }

    /// Create a named output channel for protocol traces.
    fn create_output_channel(&self, name: &str) -> Arc<dyn TraceSink>;

    /// One environment variable, `None` when unset or not valid UTF-8.
    fn env_var(&self, key: &str) -> Option<String>;

    /// Full environment, inherited by the server process. Entries need not
    /// be valid UTF-8.
    fn environment(&self) -> Vec<(OsString, OsString)>;

    /// Platform the host runs on.
    fn platform(&self) -> HostPlatform;

    /// Workspace folder opened in the host, if any.
    fn workspace_root(&self) -> Option<&Path> {
        None
    }
}

/// Host backed by the current process.
#[derive(Debug, Clone)]
pub struct ProcessHost {
    install_root: PathBuf,
    workspace_root: Option<PathBuf>,
    trace_dir: Option<PathBuf>,
    platform: HostPlatform,
}

impl ProcessHost {
    /// Detects the platform once; it does not change for the process lifetime.
    #[must_use]
    pub fn new(install_root: impl Into<PathBuf>) -> Self {
        Self {
            install_root: install_root.into(),
            workspace_root: None,
            trace_dir: None,
            platform: HostPlatform::detect(),
        }
    }

    #[must_use]
    pub fn with_workspace_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.workspace_root = Some(root.into());
        self
    }

    /// Write output channels as files in `dir` instead of to `tracing`.
    #[must_use]
    pub fn with_trace_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.trace_dir = Some(dir.into());
        self
    }
}

impl ExtensionHost for ProcessHost {
    fn install_root(&self) -> &Path {
        &self.install_root
    }

    fn create_output_channel(&self, name: &str) -> Arc<dyn TraceSink> {
        if let Some(dir) = &self.trace_dir {
            match FileTraceSink::create(dir, name) {
                Ok(sink) => {
                    tracing::info!(channel = name, path = %sink.path().display(), "Trace channel opened");
                    return Arc::new(sink);
                }
                Err(e) => {
                    tracing::warn!(
                        channel = name,
                        "Failed to open trace file in {}: {e}; tracing to log instead",
                        dir.display()
                    );
                }
            }
        }
        Arc::new(TracingTraceSink::new(name))
    }

    fn env_var(&self, key: &str) -> Option<String> {
        std::env::var(key).ok()
    }

    fn environment(&self) -> Vec<(OsString, OsString)> {
        std::env::vars_os().collect()
    }

    fn platform(&self) -> HostPlatform {
        self.platform.clone()
    }

    fn workspace_root(&self) -> Option<&Path> {
        self.workspace_root.as_deref()
    }
}
