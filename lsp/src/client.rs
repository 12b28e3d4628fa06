//! The language-client seam.
//!
//! A [`LanguageClient`] is the collaborator that actually talks to the
//! server: it spawns the process, runs the LSP handshake and later shuts it
//! down. [`SessionManager`](crate::SessionManager) only decides *when*; the
//! client decides *how*. Failures are opaque `anyhow` errors and are passed
//! through to the host untranslated.

use std::future::Future;
use std::pin::Pin;

use crate::protocol::ProtocolConfig;
use crate::transport::Executable;

/// Lifecycle future returned by [`LanguageClient`] operations.
pub type ClientFut<'a> = Pin<Box<dyn Future<Output = anyhow::Result<()>> + Send + 'a>>;

/// Short key and display title of a client session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientIdentity {
    id: String,
    name: String,
}

impl ClientIdentity {
    #[must_use]
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }

    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl Default for ClientIdentity {
    fn default() -> Self {
        Self::new(asp_client_types::CLIENT_ID, asp_client_types::CLIENT_NAME)
    }
}

/// One client-server connection.
pub trait LanguageClient: Send {
    /// Launch the server and complete the initialize handshake.
    fn start(&mut self) -> ClientFut<'_>;

    /// Shut the server down. Stopping a client that never started is a no-op.
    fn stop(&mut self) -> ClientFut<'_>;
}

/// Builds clients for [`ClientSession`](crate::ClientSession).
pub trait ClientFactory: Send + Sync {
    fn create(
        &self,
        identity: &ClientIdentity,
        executable: &Executable,
        protocol: &ProtocolConfig,
    ) -> Box<dyn LanguageClient>;
}
