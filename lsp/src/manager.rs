//! SessionManager: the activation entry points exposed to the host.
//!
//! The manager owns the one client session of the process. `activate` and
//! `deactivate` both take `&mut self`, so they can never overlap; a second
//! `activate` while a session is starting or running is rejected rather than
//! leaking a second server.

use std::fmt;
use std::sync::Arc;

use asp_client_types::{
    DEFAULT_SERVER_LOG_LEVEL, DocumentSelector, LANGUAGE_ID, LaunchMode, SERVER_PATH_ENV,
    ServerLocation, SessionState, TRACE_CHANNEL_NAME, TraceLevel, UnsupportedPlatformError,
};

use crate::client::{ClientFactory, ClientIdentity};
use crate::error::ActivationError;
use crate::host::ExtensionHost;
use crate::protocol::ProtocolConfig;
use crate::resolver;
use crate::session::ClientSession;
use crate::trace::TraceSink;
use crate::transport::TransportConfig;

/// Launch settings that do not come from the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientSettings {
    /// Server command used when `SERVER_PATH` is unset.
    pub server_path: Option<String>,
    /// `RUST_LOG` value handed to the server.
    pub log_level: String,
    pub mode: LaunchMode,
    pub trace_level: TraceLevel,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            server_path: None,
            log_level: DEFAULT_SERVER_LOG_LEVEL.to_string(),
            mode: LaunchMode::Run,
            trace_level: TraceLevel::Messages,
        }
    }
}

/// Outcome of [`SessionManager::deactivate`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Deactivation {
    /// There was no session; nothing happened.
    NotStarted,
    /// The session was stopped.
    Stopped,
}

pub struct SessionManager {
    factory: Arc<dyn ClientFactory>,
    settings: ClientSettings,
    identity: ClientIdentity,
    state: SessionState,
    session: Option<ClientSession>,
    trace: Option<Arc<dyn TraceSink>>,
}

impl SessionManager {
    #[must_use]
    pub fn new(factory: Arc<dyn ClientFactory>, settings: ClientSettings) -> Self {
        Self {
            factory,
            settings,
            identity: ClientIdentity::default(),
            state: SessionState::Uninitialized,
            session: None,
            trace: None,
        }
    }

    #[must_use]
    pub fn state(&self) -> SessionState {
        self.state
    }

    #[must_use]
    pub fn settings(&self) -> &ClientSettings {
        &self.settings
    }

    /// The live session, present while `Starting` or `Running`.
    #[must_use]
    pub fn session(&self) -> Option<&ClientSession> {
        self.session.as_ref()
    }

    /// Trace sink of the most recent activation.
    #[must_use]
    pub fn trace(&self) -> Option<&Arc<dyn TraceSink>> {
        self.trace.as_ref()
    }

    /// The command `activate` would launch on `host`.
    ///
    /// `SERVER_PATH` wins, then the configured path, then the bundled
    /// server for the host platform.
    pub fn server_command(
        &self,
        host: &dyn ExtensionHost,
    ) -> Result<ServerLocation, UnsupportedPlatformError> {
        let from_env = host.env_var(SERVER_PATH_ENV);
        let override_command = from_env
            .as_deref()
            .filter(|cmd| !cmd.trim().is_empty())
            .or(self.settings.server_path.as_deref());
        resolver::resolve(&host.platform(), override_command, host.install_root())
    }

    /// Start the language client session.
    pub async fn activate(&mut self, host: &dyn ExtensionHost) -> Result<(), ActivationError> {
        match self.state {
            SessionState::Running => {
                return Err(ActivationError::AlreadyActive { state: self.state });
            }
            // `&mut self` rules out a concurrent activation, so a leftover
            // `Starting` means an earlier activate future was dropped mid-start.
            SessionState::Starting => {
                tracing::warn!(
                    client = self.identity.id(),
                    "Previous activation was cancelled, discarding its session"
                );
                self.session = None;
                self.state = SessionState::Uninitialized;
            }
            SessionState::Uninitialized | SessionState::Stopped => {}
        }

        let trace = host.create_output_channel(TRACE_CHANNEL_NAME);
        self.trace = Some(Arc::clone(&trace));

        let command = match self.server_command(host) {
            Ok(command) => command,
            Err(e) => {
                tracing::warn!(client = self.identity.id(), "Activation aborted: {e}");
                trace.append_line(&format!("Cannot start {}: {e}", self.identity.name()));
                return Err(e.into());
            }
        };

        let transport = TransportConfig::new(
            command.clone(),
            host.environment(),
            &self.settings.log_level,
        );
        let protocol = ProtocolConfig::new(DocumentSelector::local_files(LANGUAGE_ID), trace)
            .with_trace_level(self.settings.trace_level)
            .with_workspace_root(host.workspace_root().map(std::path::Path::to_path_buf));

        let session = ClientSession::new(
            self.factory.as_ref(),
            self.identity.clone(),
            transport,
            protocol,
            self.settings.mode,
        );

        tracing::info!(
            client = self.identity.id(),
            %command,
            mode = self.settings.mode.as_str(),
            "Starting language client"
        );
        self.state = SessionState::Starting;

        // Stored before awaiting so a cancelled start can still be stopped.
        match self.session.insert(session).start().await {
            Ok(()) => {
                tracing::info!(client = self.identity.id(), "Language client running");
                self.state = SessionState::Running;
                Ok(())
            }
            Err(e) => {
                tracing::warn!(client = self.identity.id(), "Language client failed to start: {e:#}");
                if let Some(trace) = &self.trace {
                    trace.append_line(&format!("Starting client failed: {e:#}"));
                }
                self.session = None;
                self.state = SessionState::Uninitialized;
                Err(ActivationError::Launch(e))
            }
        }
    }

    /// Stop the session, if there is one.
    pub async fn deactivate(&mut self) -> anyhow::Result<Deactivation> {
        let Some(mut session) = self.session.take() else {
            tracing::debug!(client = self.identity.id(), state = %self.state, "Nothing to deactivate");
            return Ok(Deactivation::NotStarted);
        };

        tracing::info!(client = self.identity.id(), "Stopping language client");
        let outcome = session.stop().await;
        self.state = SessionState::Stopped;
        outcome?;
        Ok(Deactivation::Stopped)
    }
}

impl fmt::Debug for SessionManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionManager")
            .field("settings", &self.settings)
            .field("identity", &self.identity)
            .field("state", &self.state)
            .field("session", &self.session)
            .finish_non_exhaustive()
    }
}
