//! SSH backend for bootstrap sessions.
//!
//! Built on russh. The controller is synchronous, so the connector owns a
//! small tokio runtime and blocks on it for each network operation, the same
//! way a sync wrapper drives an async session.
//!
//! - [`SshConnector`] dials a target and performs the SSH handshake
//! - [`PublicKeyAuthenticator`] authenticates with a [`KeyPair`](crate::KeyPair)
//! - [`SshSession`] owns the resulting connection
//!
//! All blocking methods must be called from outside an async context, for
//! example from `tokio::task::spawn_blocking`.

pub mod auth;
pub mod handler;
pub mod session;

// Re-export commonly used types
pub use auth::{PublicKeyAuthenticator, decode_private_key};
pub use handler::BootstrapHandler;
pub use session::{SshConnectConfig, SshConnector, SshSession};
