//! Scripted transport for testing.
//!
//! This module provides stand-ins for every collaborator of the bootstrap
//! controller:
//!
//! - [`MockTransport`]: shared script and counters behind a
//!   [`MockConnector`] / [`MockAuthenticator`] pair
//! - [`MockSession`]: a session that records when it is closed
//! - [`RecordingPause`]: records waits instead of sleeping
//! - [`RecordingSink`]: collects events for assertions
//!
//! # Example
//!
//! ```rust,ignore
//! use vm_bootstrap::mock::{AuthStep, MockTransport, RecordingPause, RecordingSink};
//! use vm_bootstrap::{Bootstrapper, KeyPair, RetryPolicy, TargetDescriptor};
//!
//! let transport = MockTransport::new().auth_steps([AuthStep::Reject, AuthStep::Accept]);
//! let mut bootstrapper = Bootstrapper::new(transport.connector(), transport.authenticator())
//!     .with_policy(RetryPolicy::immediate(5))
//!     .with_pause(RecordingPause::new());
//!
//! let key = KeyPair::new("private", "public", "jenkins");
//! let target = TargetDescriptor::new("10.0.0.2", 22, "jenkins");
//! let session = bootstrapper
//!     .bootstrap(Some(&key), &target, &RecordingSink::new())
//!     .unwrap();
//!
//! assert_eq!(transport.stats().connects, 2);
//! assert_eq!(transport.stats().closes, 1);
//! # drop(session);
//! ```

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use crate::backend::{Authenticator, Connector, TransportSession};
use crate::error::SshError;
use crate::events::{EventLevel, EventSink};
use crate::retry::Pause;
use crate::types::{KeyPair, TargetDescriptor};

/// Scripted result of a connect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectStep {
    /// Hand out a new open session.
    Open,
    /// Fail with the given error.
    Fail(SshError),
}

/// Scripted result of an authentication.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthStep {
    /// Accept the key.
    Accept,
    /// Reject the key.
    Reject,
    /// Fail with the given error.
    Fail(SshError),
}

/// Counters observed by a [`MockTransport`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MockStats {
    /// Calls to [`Connector::open`].
    pub connects: usize,
    /// Sessions successfully handed out.
    pub sessions_opened: usize,
    /// Calls to [`Authenticator::authenticate`].
    pub auth_calls: usize,
    /// Sessions closed.
    pub closes: usize,
    /// Sessions currently open.
    pub open_sessions: usize,
    /// Usernames offered to the authenticator, in order.
    pub usernames: Vec<String>,
}

#[derive(Debug, Default)]
struct MockState {
    connect_script: VecDeque<ConnectStep>,
    auth_script: VecDeque<AuthStep>,
    stats: MockStats,
}

/// Shared script and counters for a mock connector and authenticator.
///
/// Once a script runs out, connects open sessions and authentications are
/// rejected.
#[derive(Debug, Clone, Default)]
pub struct MockTransport {
    state: Arc<Mutex<MockState>>,
}

impl MockTransport {
    /// Create a transport with empty scripts.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue connect outcomes.
    #[must_use]
    pub fn connect_steps(self, steps: impl IntoIterator<Item = ConnectStep>) -> Self {
        self.lock().connect_script.extend(steps);
        self
    }

    /// Queue authentication outcomes.
    #[must_use]
    pub fn auth_steps(self, steps: impl IntoIterator<Item = AuthStep>) -> Self {
        self.lock().auth_script.extend(steps);
        self
    }

    /// Create a connector bound to this transport.
    #[must_use]
    pub fn connector(&self) -> MockConnector {
        MockConnector {
            transport: self.clone(),
        }
    }

    /// Create an authenticator bound to this transport.
    #[must_use]
    pub fn authenticator(&self) -> MockAuthenticator {
        MockAuthenticator {
            transport: self.clone(),
        }
    }

    /// Snapshot the counters.
    #[must_use]
    pub fn stats(&self) -> MockStats {
        self.lock().stats.clone()
    }

    fn lock(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// A session handed out by a [`MockConnector`].
#[derive(Debug)]
pub struct MockSession {
    id: usize,
    target: TargetDescriptor,
    open: bool,
    transport: MockTransport,
}

impl MockSession {
    /// Sequence number of this session, starting at 1.
    #[must_use]
    pub const fn id(&self) -> usize {
        self.id
    }

    /// The target this session was opened to.
    #[must_use]
    pub const fn target(&self) -> &TargetDescriptor {
        &self.target
    }
}

impl TransportSession for MockSession {
    fn is_open(&self) -> bool {
        self.open
    }

    fn close(&mut self) {
        if self.open {
            self.open = false;
            let mut state = self.transport.lock();
            state.stats.closes += 1;
            state.stats.open_sessions -= 1;
        }
    }
}

/// Connector that follows the connect script of a [`MockTransport`].
#[derive(Debug, Clone)]
pub struct MockConnector {
    transport: MockTransport,
}

impl Connector for MockConnector {
    type Session = MockSession;

    fn open(&mut self, target: &TargetDescriptor) -> Result<MockSession, SshError> {
        let mut state = self.transport.lock();
        state.stats.connects += 1;
        match state.connect_script.pop_front().unwrap_or(ConnectStep::Open) {
            ConnectStep::Open => {
                state.stats.sessions_opened += 1;
                state.stats.open_sessions += 1;
                Ok(MockSession {
                    id: state.stats.sessions_opened,
                    target: target.clone(),
                    open: true,
                    transport: self.transport.clone(),
                })
            }
            ConnectStep::Fail(e) => Err(e),
        }
    }
}

/// Authenticator that follows the auth script of a [`MockTransport`].
#[derive(Debug, Clone)]
pub struct MockAuthenticator {
    transport: MockTransport,
}

impl Authenticator<MockSession> for MockAuthenticator {
    fn authenticate(
        &mut self,
        session: &mut MockSession,
        _key: &KeyPair,
        username: &str,
    ) -> Result<bool, SshError> {
        if !session.is_open() {
            return Err(SshError::invalid_state("authenticating a closed session"));
        }
        let mut state = self.transport.lock();
        state.stats.auth_calls += 1;
        state.stats.usernames.push(username.to_string());
        match state.auth_script.pop_front().unwrap_or(AuthStep::Reject) {
            AuthStep::Accept => Ok(true),
            AuthStep::Reject => Ok(false),
            AuthStep::Fail(e) => Err(e),
        }
    }
}

/// Pause that records requested delays without sleeping.
#[derive(Debug, Clone, Default)]
pub struct RecordingPause {
    delays: Vec<Duration>,
    interrupt_after: Option<usize>,
}

impl RecordingPause {
    /// Create a pause that never blocks.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a pause that allows `waits` pauses and interrupts the next one.
    #[must_use]
    pub const fn interrupt_after(waits: usize) -> Self {
        Self {
            delays: Vec::new(),
            interrupt_after: Some(waits),
        }
    }

    /// Delays requested so far, excluding an interrupted one.
    #[must_use]
    pub fn delays(&self) -> &[Duration] {
        &self.delays
    }

    /// Sum of recorded delays.
    #[must_use]
    pub fn total(&self) -> Duration {
        self.delays
            .iter()
            .fold(Duration::ZERO, |total, delay| total.saturating_add(*delay))
    }
}

impl Pause for RecordingPause {
    fn pause(&mut self, delay: Duration) -> Result<(), SshError> {
        if self.interrupt_after == Some(self.delays.len()) {
            return Err(SshError::interrupted("test interruption"));
        }
        self.delays.push(delay);
        Ok(())
    }
}

/// Sink that keeps every event.
#[derive(Debug, Default)]
pub struct RecordingSink {
    events: Mutex<Vec<(EventLevel, String)>>,
}

impl RecordingSink {
    /// Create an empty sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// All events in order.
    #[must_use]
    pub fn events(&self) -> Vec<(EventLevel, String)> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Messages recorded at `level`, in order.
    #[must_use]
    pub fn messages(&self, level: EventLevel) -> Vec<String> {
        self.events()
            .into_iter()
            .filter(|(l, _)| *l == level)
            .map(|(_, message)| message)
            .collect()
    }

    /// Number of events recorded at `level`.
    #[must_use]
    pub fn count(&self, level: EventLevel) -> usize {
        self.messages(level).len()
    }
}

impl EventSink for RecordingSink {
    fn emit(&self, level: EventLevel, message: &str) {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((level, message.to_string()));
    }
}
