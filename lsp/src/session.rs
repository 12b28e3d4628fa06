//! A configured client session: identity, transport, protocol and the
//! client that drives them.

use std::fmt;

use asp_client_types::LaunchMode;

use crate::client::{ClientFactory, ClientIdentity, LanguageClient};
use crate::protocol::ProtocolConfig;
use crate::transport::TransportConfig;

pub struct ClientSession {
    identity: ClientIdentity,
    transport: TransportConfig,
    protocol: ProtocolConfig,
    mode: LaunchMode,
    client: Box<dyn LanguageClient>,
}

impl ClientSession {
    /// Build the client for `mode` through `factory`. Nothing is launched
    /// until [`start`](Self::start).
    pub fn new(
        factory: &dyn ClientFactory,
        identity: ClientIdentity,
        transport: TransportConfig,
        protocol: ProtocolConfig,
        mode: LaunchMode,
    ) -> Self {
        let client = factory.create(&identity, transport.executable(mode), &protocol);
        Self {
            identity,
            transport,
            protocol,
            mode,
            client,
        }
    }

    #[must_use]
    pub fn identity(&self) -> &ClientIdentity {
        &self.identity
    }

    #[must_use]
    pub fn transport(&self) -> &TransportConfig {
        &self.transport
    }

    #[must_use]
    pub fn protocol(&self) -> &ProtocolConfig {
        &self.protocol
    }

    #[must_use]
    pub fn mode(&self) -> LaunchMode {
        self.mode
    }

    pub async fn start(&mut self) -> anyhow::Result<()> {
        self.client.start().await
    }

    pub async fn stop(&mut self) -> anyhow::Result<()> {
        self.client.stop().await
    }
}

impl fmt::Debug for ClientSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientSession")
            .field("identity", &self.identity)
            .field("transport", &self.transport)
            .field("protocol", &self.protocol)
            .field("mode", &self.mode)
            .finish_non_exhaustive()
    }
}
