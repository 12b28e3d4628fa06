//! Trace sinks: named, write-only surfaces that record the wire protocol.
//!
//! The host creates the sink ("output channel") before anything else during
//! activation, so start-up failures are visible in it too. Process logging
//! goes through `tracing`; the trace sink is what a user opens to see what
//! the client and server said to each other.

use std::fmt::Write as _;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use asp_client_types::TraceLevel;

/// `tracing` target used by [`TracingTraceSink`].
pub const TRACE_TARGET: &str = "asp_client::trace";

/// A named output surface receiving protocol trace lines.
pub trait TraceSink: Send + Sync {
    /// Display name of the channel.
    fn name(&self) -> &str;

    /// Append one (possibly multi-line) entry.
    fn append_line(&self, line: &str);
}

/// Keeps every line in memory. Used by embedding hosts and tests.
#[derive(Debug)]
pub struct MemoryTraceSink {
    name: String,
    lines: Mutex<Vec<String>>,
}

impl MemoryTraceSink {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            lines: Mutex::new(Vec::new()),
        }
    }

    /// Snapshot of everything written so far.
    #[must_use]
    pub fn lines(&self) -> Vec<String> {
        self.lines
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone()
    }

    /// Whether any entry contains `needle`.
    #[must_use]
    pub fn contains(&self, needle: &str) -> bool {
        self.lines
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .iter()
            .any(|line| line.contains(needle))
    }
}

impl TraceSink for MemoryTraceSink {
    fn name(&self) -> &str {
        &self.name
    }

    fn append_line(&self, line: &str) {
        self.lines
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .push(line.to_string());
    }
}

/// Appends to `<dir>/<channel-slug>.log`.
#[derive(Debug)]
pub struct FileTraceSink {
    name: String,
    path: PathBuf,
    file: Mutex<File>,
}

impl FileTraceSink {
    /// Open (creating if needed) the log file for channel `name` in `dir`.
    pub fn create(dir: &Path, name: &str) -> io::Result<Self> {
        fs::create_dir_all(dir)?;
        let path = dir.join(format!("{}.log", channel_slug(name)));
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        Ok(Self {
            name: name.to_string(),
            path,
            file: Mutex::new(file),
        })
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl TraceSink for FileTraceSink {
    fn name(&self) -> &str {
        &self.name
    }

    fn append_line(&self, line: &str) {
        let mut file = self
            .file
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        if let Err(e) = writeln!(file, "{line}") {
            tracing::warn!(path = %self.path.display(), "Failed to write trace line: {e}");
        }
    }
}

/// Forwards every line to `tracing` under [`TRACE_TARGET`].
#[derive(Debug)]
pub struct TracingTraceSink {
    name: String,
}

impl TracingTraceSink {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl TraceSink for TracingTraceSink {
    fn name(&self) -> &str {
        &self.name
    }

    fn append_line(&self, line: &str) {
        tracing::info!(target: TRACE_TARGET, channel = %self.name, "{line}");
    }
}

/// `"asp-lsp trace"` -> `"asp-lsp-trace"`.
fn channel_slug(name: &str) -> String {
    let slug: String = name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c.to_ascii_lowercase()
            } else {
                '-'
            }
        })
        .collect();
    if slug.is_empty() {
        String::from("trace")
    } else {
        slug
    }
}

/// Which way a traced message travelled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Direction {
    Send,
    Receive,
}

impl Direction {
    fn verb(self) -> &'static str {
        match self {
            Self::Send => "Sending",
            Self::Receive => "Received",
        }
    }
}

/// Render a JSON-RPC message for the trace sink, or `None` when `level`
/// suppresses message tracing.
pub(crate) fn format_message(
    direction: Direction,
    message: &serde_json::Value,
    level: TraceLevel,
) -> Option<String> {
    if !level.traces_messages() {
        return None;
    }

    let id = message.get("id").filter(|id| !id.is_null());
    let method = message.get("method").and_then(serde_json::Value::as_str);
    let (kind, body_key) = match (method, id) {
        (Some(_), Some(_)) => ("request", "params"),
        (Some(_), None) => ("notification", "params"),
        (None, _) if message.get("error").is_some() => ("response", "error"),
        (None, _) => ("response", "result"),
    };

    let time = chrono::Local::now().format("%H:%M:%S");
    let mut line = format!("[Trace - {time}] {} {kind}", direction.verb());
    if let Some(method) = method {
        let _ = write!(line, " '{method}'");
    }
    if let Some(id) = id {
        let _ = write!(line, " (id: {id})");
    }
    line.push('.');

    if level == TraceLevel::Verbose
        && let Some(body) = message.get(body_key)
    {
        let pretty = serde_json::to_string_pretty(body).unwrap_or_else(|_| body.to_string());
        let label = match body_key {
            "params" => "Params",
            "error" => "Error",
            _ => "Result",
        };
        let _ = write!(line, "\n{label}: {pretty}");
    }

    Some(line)
}
