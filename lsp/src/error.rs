use asp_client_types::{SessionState, UnsupportedPlatformError};

/// Why [`SessionManager::activate`](crate::SessionManager::activate) failed.
#[derive(Debug, thiserror::Error)]
pub enum ActivationError {
    /// No bundled server for this platform and no override given.
    #[error(transparent)]
    UnsupportedPlatform(#[from] UnsupportedPlatformError),

    #[error("client session is already {state}")]
    AlreadyActive { state: SessionState },

    /// The client failed to launch or initialize the server.
    #[error(transparent)]
    Launch(anyhow::Error),
}
