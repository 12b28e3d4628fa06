//! `~/.asp-client/config.toml` loading.
//!
//! ```toml
//! [server]
//! path = "${HOME}/bin/asp-lsp"
//! log_level = "debug"
//! mode = "run"
//!
//! [trace]
//! level = "messages"
//! dir = "/tmp/asp-traces"
//! ```
//!
//! Every key is optional; a missing file means defaults.

use std::path::{Path, PathBuf};
use std::{env, fs};

use asp_client_lsp::ClientSettings;
use asp_client_types::{DEFAULT_SERVER_LOG_LEVEL, LaunchMode, TraceLevel};
use serde::Deserialize;

const CONFIG_DIR: &str = ".asp-client";
const CONFIG_FILE: &str = "config.toml";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config at {}: {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse config at {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
}

impl ConfigError {
    #[must_use]
    pub fn path(&self) -> &Path {
        match self {
            ConfigError::Read { path, .. } | ConfigError::Parse { path, .. } => path,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct ClientConfig {
    pub server: Option<ServerConfig>,
    pub trace: Option<TraceConfig>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ServerConfig {
    /// Server command; `SERVER_PATH` still takes precedence.
    pub path: Option<String>,
    /// `RUST_LOG` for the server process.
    pub log_level: Option<String>,
    #[serde(default)]
    pub mode: LaunchMode,
}

#[derive(Debug, Default, Deserialize)]
pub struct TraceConfig {
    #[serde(default)]
    pub level: TraceLevel,
    /// Directory for file-backed trace channels.
    pub dir: Option<String>,
}

/// Expand `${VAR}` references; unset variables expand to nothing.
#[must_use]
pub fn expand_env_vars(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut rest = value;

    while let Some(start) = rest.find("${") {
        let Some(len) = rest[start + 2..].find('}') else {
            break;
        };
        out.push_str(&rest[..start]);
        let var = &rest[start + 2..start + 2 + len];
        if !var.is_empty() {
            out.push_str(&env::var(var).unwrap_or_default());
        }
        rest = &rest[start + 3 + len..];
    }

    out.push_str(rest);
    out
}

impl ClientConfig {
    /// Load the default config file. `Ok(None)` when there is none.
    pub fn load() -> Result<Option<Self>, ConfigError> {
        match config_path() {
            Some(path) => Self::load_from(&path),
            None => Ok(None),
        }
    }

    /// Load `path`. `Ok(None)` when the file does not exist.
    pub fn load_from(path: &Path) -> Result<Option<Self>, ConfigError> {
        if !path.exists() {
            tracing::debug!(path = %path.display(), "No config file");
            return Ok(None);
        }

        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(err) => {
                tracing::warn!("Failed to read config at {}: {err}", path.display());
                return Err(ConfigError::Read {
                    path: path.to_path_buf(),
                    source: err,
                });
            }
        };

        match toml::from_str(&content) {
            Ok(config) => Ok(Some(config)),
            Err(err) => {
                tracing::warn!("Failed to parse config at {}: {err}", path.display());
                Err(ConfigError::Parse {
                    path: path.to_path_buf(),
                    source: err,
                })
            }
        }
    }

    #[must_use]
    pub fn path() -> Option<PathBuf> {
        config_path()
    }

    /// Launch settings for the session manager.
    #[must_use]
    pub fn settings(&self) -> ClientSettings {
        let server = self.server.as_ref();
        ClientSettings {
            server_path: server
                .and_then(|s| s.path.as_deref())
                .map(expand_env_vars)
                .filter(|path| !path.trim().is_empty()),
            log_level: server
                .and_then(|s| s.log_level.clone())
                .unwrap_or_else(|| DEFAULT_SERVER_LOG_LEVEL.to_string()),
            mode: server.map(|s| s.mode).unwrap_or_default(),
            trace_level: self.trace.as_ref().map(|t| t.level).unwrap_or_default(),
        }
    }

    #[must_use]
    pub fn trace_dir(&self) -> Option<PathBuf> {
        self.trace
            .as_ref()
            .and_then(|t| t.dir.as_deref())
            .map(expand_env_vars)
            .filter(|dir| !dir.trim().is_empty())
            .map(PathBuf::from)
    }
}

fn config_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(CONFIG_DIR).join(CONFIG_FILE))
}
