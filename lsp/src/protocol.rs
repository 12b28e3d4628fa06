//! Protocol configuration and the few JSON-RPC messages the client itself
//! sends: the lifecycle handshake and replies to server requests.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use asp_client_types::{CLIENT_NAME, DocumentSelector, TraceLevel};
use serde::{Deserialize, Serialize};

use crate::trace::TraceSink;

/// JSON-RPC error code for unhandled server requests.
pub(crate) const METHOD_NOT_FOUND: i64 = -32601;

/// What the server is registered for and where its wire trace goes.
#[derive(Clone)]
pub struct ProtocolConfig {
    document_selector: DocumentSelector,
    trace: Arc<dyn TraceSink>,
    trace_level: TraceLevel,
    workspace_root: Option<PathBuf>,
}

impl ProtocolConfig {
    #[must_use]
    pub fn new(document_selector: DocumentSelector, trace: Arc<dyn TraceSink>) -> Self {
        Self {
            document_selector,
            trace,
            trace_level: TraceLevel::default(),
            workspace_root: None,
        }
    }

    #[must_use]
    pub fn with_trace_level(mut self, level: TraceLevel) -> Self {
        self.trace_level = level;
        self
    }

    #[must_use]
    pub fn with_workspace_root(mut self, root: Option<PathBuf>) -> Self {
        self.workspace_root = root;
        self
    }

    #[must_use]
    pub fn document_selector(&self) -> &DocumentSelector {
        &self.document_selector
    }

    #[must_use]
    pub fn trace(&self) -> &Arc<dyn TraceSink> {
        &self.trace
    }

    #[must_use]
    pub fn trace_level(&self) -> TraceLevel {
        self.trace_level
    }

    #[must_use]
    pub fn workspace_root(&self) -> Option<&Path> {
        self.workspace_root.as_deref()
    }
}

impl fmt::Debug for ProtocolConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProtocolConfig")
            .field("document_selector", &self.document_selector)
            .field("trace", &self.trace.name())
            .field("trace_level", &self.trace_level)
            .field("workspace_root", &self.workspace_root)
            .finish()
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct Request<'a> {
    pub jsonrpc: &'static str,
    pub id: u64,
    pub method: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<serde_json::Value>,
}

impl<'a> Request<'a> {
    pub fn new(id: u64, method: &'a str, params: Option<serde_json::Value>) -> Self {
        Self {
            jsonrpc: "2.0",
            id,
            method,
            params,
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct Notification<'a> {
    pub jsonrpc: &'static str,
    pub method: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<serde_json::Value>,
}

impl<'a> Notification<'a> {
    pub fn new(method: &'a str, params: Option<serde_json::Value>) -> Self {
        Self {
            jsonrpc: "2.0",
            method,
            params,
        }
    }
}

/// Error reply to a request the client does not implement.
pub(crate) fn method_not_found(id: serde_json::Value, method: &str) -> serde_json::Value {
    serde_json::json!({
        "jsonrpc": "2.0",
        "id": id,
        "error": {
            "code": METHOD_NOT_FOUND,
            "message": format!("Method not found: {method}")
        }
    })
}

/// Classified message from the server.
#[derive(Debug)]
pub(crate) enum Incoming {
    Response {
        id: u64,
        body: serde_json::Value,
    },
    ServerRequest {
        id: serde_json::Value,
        method: String,
    },
    Notification {
        method: String,
        params: Option<serde_json::Value>,
    },
}

pub(crate) fn classify(message: &serde_json::Value) -> Option<Incoming> {
    let id = message.get("id");
    let method = message
        .get("method")
        .and_then(serde_json::Value::as_str)
        .map(String::from);
    let is_response = message.get("result").is_some() || message.get("error").is_some();

    match (id, method, is_response) {
        (Some(id), None, true) => Some(Incoming::Response {
            id: id.as_u64()?,
            body: message.clone(),
        }),
        (Some(id), Some(method), _) => Some(Incoming::ServerRequest {
            id: id.clone(),
            method,
        }),
        (None, Some(method), _) => Some(Incoming::Notification {
            method,
            params: message.get("params").cloned(),
        }),
        _ => None,
    }
}

/// `window/logMessage` and `window/showMessage` payload.
#[derive(Debug, Deserialize)]
pub(crate) struct LogMessageParams {
    #[serde(rename = "type")]
    pub kind: u8,
    pub message: String,
}

impl LogMessageParams {
    pub fn label(&self) -> &'static str {
        match self.kind {
            1 => "Error",
            2 => "Warn",
            3 => "Info",
            _ => "Log",
        }
    }
}

#[derive(Debug, thiserror::Error)]
#[error("cannot convert path to file URI: {}", path.display())]
pub(crate) struct PathToUriError {
    path: PathBuf,
}

pub(crate) fn path_to_file_uri(path: &Path) -> Result<url::Url, PathToUriError> {
    url::Url::from_file_path(path).map_err(|()| PathToUriError {
        path: path.to_path_buf(),
    })
}

/// `initialize` request parameters.
pub(crate) fn initialize_params(
    root_uri: Option<&url::Url>,
    trace_level: TraceLevel,
) -> serde_json::Value {
    let workspace_folders = root_uri.map(|uri| {
        serde_json::json!([{
            "uri": uri.as_str(),
            "name": uri
                .path_segments()
                .and_then(|mut segments| segments.next_back())
                .filter(|name| !name.is_empty())
                .unwrap_or("workspace"),
        }])
    });

    serde_json::json!({
        "processId": std::process::id(),
        "clientInfo": {
            "name": CLIENT_NAME,
            "version": env!("CARGO_PKG_VERSION"),
        },
        "rootUri": root_uri.map(url::Url::as_str),
        "capabilities": {
            "window": {
                "showMessage": {}
            },
            "general": {
                "positionEncodings": ["utf-16"]
            }
        },
        "trace": trace_level.as_str(),
        "workspaceFolders": workspace_folders,
    })
}
