//! Public-key authentication for bootstrap sessions.

use std::sync::Arc;

use russh::keys::{PrivateKey, PrivateKeyWithHashAlg};

use super::session::SshSession;
use crate::backend::Authenticator;
use crate::error::SshError;
use crate::types::KeyPair;

/// Decode the private half of a key pair.
///
/// Supports OpenSSH, PKCS#8 and PEM encodings, encrypted or not.
pub fn decode_private_key(
    key: &KeyPair,
    passphrase: Option<&str>,
) -> Result<Arc<PrivateKey>, SshError> {
    russh::keys::decode_secret_key(&key.private_key, passphrase)
        .map(Arc::new)
        .map_err(|e| {
            let reason = if passphrase.is_none() && e.to_string().contains("encrypted") {
                "key appears to be encrypted but no passphrase was provided".to_string()
            } else {
                e.to_string()
            };
            SshError::Key {
                user: key.user.clone(),
                reason,
            }
        })
}

/// Authenticates [`SshSession`]s with a key pair's private key.
#[derive(Clone, Default)]
pub struct PublicKeyAuthenticator {
    passphrase: Option<String>,
}

impl std::fmt::Debug for PublicKeyAuthenticator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PublicKeyAuthenticator")
            .field("passphrase", &self.passphrase.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

impl PublicKeyAuthenticator {
    /// Create an authenticator for unencrypted keys.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a passphrase to decrypt keys.
    #[must_use]
    pub fn with_passphrase(mut self, passphrase: impl Into<String>) -> Self {
        self.passphrase = Some(passphrase.into());
        self
    }
}

impl Authenticator<SshSession> for PublicKeyAuthenticator {
    fn authenticate(
        &mut self,
        session: &mut SshSession,
        key: &KeyPair,
        username: &str,
    ) -> Result<bool, SshError> {
        let private_key = decode_private_key(key, self.passphrase.as_deref())?;
        let runtime = Arc::clone(session.runtime());
        let handle = session
            .handle_mut()
            .ok_or_else(|| SshError::invalid_state("cannot authenticate a closed session"))?;

        tracing::debug!(user = %username, "Attempting public key authentication");

        let result = runtime.block_on(async {
            // best_supported_rsa_hash returns Result<Option<Option<HashAlg>>, _>
            let rsa_hash = handle
                .best_supported_rsa_hash()
                .await
                .ok()
                .flatten()
                .flatten();
            handle
                .authenticate_publickey(username, PrivateKeyWithHashAlg::new(private_key, rsa_hash))
                .await
        });

        match result {
            Ok(auth_result) if auth_result.success() => {
                tracing::info!(user = %username, "Public key authentication successful");
                session.mark_authenticated();
                Ok(true)
            }
            Ok(_) => {
                tracing::debug!(user = %username, "Public key authentication rejected");
                Ok(false)
            }
            Err(e) => {
                tracing::debug!(
                    user = %username,
                    error = %e,
                    "Public key authentication error"
                );
                Err(SshError::protocol(e.to_string()))
            }
        }
    }
}
