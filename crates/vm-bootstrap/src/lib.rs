//! vm-bootstrap: SSH bootstrap for freshly provisioned machines
//!
//! A new cloud instance usually reports "running" well before its SSH daemon
//! accepts logins. This crate resolves where to dial from an instance record,
//! then connects and authenticates with a key pair over and over, at a fixed
//! delay, until a session is established or the attempt budget runs out.
//!
//! # Features
//!
//! - **Blocking controller** that owns session cleanup between attempts
//! - **Failure classification** into no-credentials, exhausted and unexpected
//! - **SSH backend** built on russh (feature: `ssh`, on by default)
//! - **Mock backend** for testing (feature: `mock`)
//! - **Configuration** from the environment or a TOML file
//!
//! # Example
//!
//! ```ignore
//! use vm_bootstrap::prelude::*;
//!
//! fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
//!     let config = BootstrapConfig::from_env()?;
//!     let mut bootstrapper = config.ssh_bootstrapper()?;
//!
//!     let instance = InstanceRecord::from_json(&std::fs::read_to_string("instance.json")?)?;
//!     let key = KeyPair::new(
//!         std::fs::read_to_string("id_ed25519")?,
//!         std::fs::read_to_string("id_ed25519.pub")?,
//!         "jenkins",
//!     );
//!     let sink = TracingSink::new(&instance.name);
//!
//!     let session = bootstrapper.connect(Some(&instance), Some(&key), &config.resolver(), &sink)?;
//!     drop(session);
//!     Ok(())
//! }
//! ```

pub mod backend;
pub mod bootstrap;
pub mod config;
pub mod error;
pub mod events;
pub mod prelude;
pub mod retry;
pub mod target;
pub mod types;

/// Mock backend for testing.
#[cfg(any(test, feature = "mock"))]
pub mod mock;

pub use backend::{Authenticator, Connector, TransportSession};
#[cfg(feature = "ssh")]
pub use backend::ssh::{PublicKeyAuthenticator, SshConnectConfig, SshConnector, SshSession};
pub use bootstrap::{BootstrapState, Bootstrapper};
pub use config::{BootstrapConfig, EnvConfig, FileConfig};
pub use error::{BootstrapError, ConfigError, FailureKind, ResolveError, Result, SshError};
pub use events::{EventLevel, EventSink, NullSink, TracingSink, WriterSink};
#[cfg(any(test, feature = "mock"))]
pub use mock::{
    AuthStep, ConnectStep, MockAuthenticator, MockConnector, MockSession, MockStats,
    MockTransport, RecordingPause, RecordingSink,
};
pub use retry::{
    DEFAULT_MAX_ATTEMPTS, DEFAULT_RETRY_DELAY, InterruptiblePause, Interrupter, Pause,
    RetryPolicy, RetryState, ThreadSleep,
};
pub use target::{DEFAULT_SSH_PORT, TargetResolver, resolve_target};
pub use types::{
    AccessConfig, AddressClass, InstanceRecord, KeyPair, NetworkInterface, TargetDescriptor,
};
