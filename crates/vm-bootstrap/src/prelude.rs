//! Convenient re-exports for common vm-bootstrap usage.
//!
//! ```ignore
//! use vm_bootstrap::prelude::*;
//! ```

// Controller
pub use crate::bootstrap::{BootstrapState, Bootstrapper};

// Configuration
pub use crate::config::BootstrapConfig;

// Error handling
pub use crate::error::{BootstrapError, FailureKind, Result, SshError};

// Events
pub use crate::events::{EventLevel, EventSink, NullSink, TracingSink};

// Retry
pub use crate::retry::{InterruptiblePause, Pause, RetryPolicy};

// Targets
pub use crate::target::TargetResolver;
pub use crate::types::{AddressClass, InstanceRecord, KeyPair, TargetDescriptor};

// Transport traits
pub use crate::backend::{Authenticator, Connector, TransportSession};

// SSH backend
#[cfg(feature = "ssh")]
pub use crate::backend::ssh::{PublicKeyAuthenticator, SshConnector, SshSession};
