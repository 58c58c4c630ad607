//! Transport seams for the bootstrap controller.
//!
//! The controller never talks to a network directly. It asks a [`Connector`]
//! for a session and hands that session to an [`Authenticator`]. The SSH
//! backend implements both on top of russh; the `mock` module implements
//! them with scripted outcomes for tests.

use crate::error::SshError;
use crate::types::{KeyPair, TargetDescriptor};

// SSH backend is conditionally compiled
#[cfg(feature = "ssh")]
pub mod ssh;

/// A live transport connection.
pub trait TransportSession {
    /// Check if the session is still open.
    fn is_open(&self) -> bool;

    /// Close the session. Closing an already closed session does nothing.
    fn close(&mut self);
}

/// Opens transport sessions.
pub trait Connector {
    /// The session type produced by this connector.
    type Session: TransportSession;

    /// Open a new session to `target`.
    ///
    /// Every error returned here is treated as transient by the controller:
    /// a freshly started machine is expected to refuse or drop connections
    /// for a while.
    fn open(&mut self, target: &TargetDescriptor) -> Result<Self::Session, SshError>;
}

/// Authenticates open sessions with a key pair.
pub trait Authenticator<S> {
    /// Try public-key authentication as `username`.
    ///
    /// `Ok(false)` means the server rejected the key, which is an ordinary
    /// outcome rather than an error. Errors are classified with
    /// [`SshError::is_transient`].
    fn authenticate(
        &mut self,
        session: &mut S,
        key: &KeyPair,
        username: &str,
    ) -> Result<bool, SshError>;
}
