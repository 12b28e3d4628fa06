//! Language client bootstrap for the ASP language server.
//!
//! [`SessionManager`] is the host-facing entry point: `activate` resolves
//! the server binary, builds the transport and protocol configuration and
//! starts a client session; `deactivate` stops it again.

pub mod codec;
pub mod resolver;
pub mod trace;

mod client;
mod connection;
mod error;
mod host;
mod manager;
mod protocol;
mod server;
mod session;
mod transport;

pub use client::{ClientFactory, ClientFut, ClientIdentity, LanguageClient};
pub use error::ActivationError;
pub use host::{ExtensionHost, ProcessHost};
pub use manager::{ClientSettings, Deactivation, SessionManager};
pub use protocol::ProtocolConfig;
pub use server::{StdioClient, StdioClientFactory};
pub use session::ClientSession;
pub use trace::{FileTraceSink, MemoryTraceSink, TraceSink, TracingTraceSink};
pub use transport::{Executable, TransportConfig};
