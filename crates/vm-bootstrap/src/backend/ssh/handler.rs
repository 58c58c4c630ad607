//! russh client handler.

use russh::client;
use russh::keys::{HashAlg, PublicKey};

/// Client handler used for bootstrap connections.
///
/// A freshly provisioned machine generates its host key on first boot, so
/// there is nothing to check it against yet. The key is accepted and its
/// fingerprint logged.
#[derive(Debug, Clone)]
pub struct BootstrapHandler {
    /// The host we're connecting to.
    host: String,
    /// The port we're connecting to.
    port: u16,
}

impl BootstrapHandler {
    /// Create a handler for a host.
    #[must_use]
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }
}

impl client::Handler for BootstrapHandler {
    type Error = russh::Error;

    async fn check_server_key(
        &mut self,
        server_public_key: &PublicKey,
    ) -> Result<bool, Self::Error> {
        tracing::debug!(
            host = %self.host,
            port = self.port,
            key_type = %server_public_key.algorithm().as_str(),
            fingerprint = %server_public_key.fingerprint(HashAlg::Sha256),
            "Accepting host key of new instance"
        );
        Ok(true)
    }
}
