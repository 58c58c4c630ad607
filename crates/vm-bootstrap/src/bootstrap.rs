//! The bootstrap retry controller.
//!
//! [`Bootstrapper`] drives repeated connect-then-authenticate attempts
//! against a newly provisioned machine until one succeeds, the attempt budget
//! runs out, or something happens that retrying cannot fix.
//!
//! ```text
//! Idle -> Connecting -> Authenticating -> Succeeded
//!             ^  |             |
//!             |  v             v
//!           Retrying <---------+-------> Aborted
//!             |
//!             v
//!          Exhausted
//! ```
//!
//! At most one session is open at any time. A session that does not become
//! the result is closed before the next attempt starts or before the
//! controller returns.

use crate::backend::{Authenticator, Connector, TransportSession};
use crate::error::{BootstrapError, Result, SshError};
use crate::events::EventSink;
use crate::retry::{Pause, RetryPolicy, RetryState, ThreadSleep};
use crate::target::TargetResolver;
use crate::types::{InstanceRecord, KeyPair, TargetDescriptor};

/// Controller state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BootstrapState {
    /// Not started.
    Idle,
    /// Opening a transport session.
    Connecting,
    /// Authenticating an open session.
    Authenticating,
    /// Waiting before the next attempt.
    Retrying,
    /// Authenticated; the session was handed to the caller.
    Succeeded,
    /// Every attempt failed.
    Exhausted,
    /// A non-retryable error ended the run.
    Aborted,
}

impl BootstrapState {
    /// Check if this state ends a run.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Succeeded | Self::Exhausted | Self::Aborted)
    }
}

/// Result of one connect-and-authenticate attempt.
enum Attempt<S> {
    Authenticated(S),
    Rejected,
    Transient(SshError),
    Fatal(SshError),
}

/// Retrying public-key bootstrap over a [`Connector`] and [`Authenticator`].
#[derive(Debug)]
pub struct Bootstrapper<C, A, P = ThreadSleep> {
    connector: C,
    authenticator: A,
    pause: P,
    policy: RetryPolicy,
    state: BootstrapState,
}

impl<C, A> Bootstrapper<C, A>
where
    C: Connector,
    A: Authenticator<C::Session>,
{
    /// Create a controller with the default policy, sleeping between attempts.
    #[must_use]
    pub fn new(connector: C, authenticator: A) -> Self {
        Self {
            connector,
            authenticator,
            pause: ThreadSleep,
            policy: RetryPolicy::default(),
            state: BootstrapState::Idle,
        }
    }
}

impl<C, A, P> Bootstrapper<C, A, P>
where
    C: Connector,
    A: Authenticator<C::Session>,
    P: Pause,
{
    /// Set the retry policy.
    #[must_use]
    pub const fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Replace the way the controller waits between attempts.
    #[must_use]
    pub fn with_pause<Q: Pause>(self, pause: Q) -> Bootstrapper<C, A, Q> {
        Bootstrapper {
            connector: self.connector,
            authenticator: self.authenticator,
            pause,
            policy: self.policy,
            state: self.state,
        }
    }

    /// Get the retry policy.
    #[must_use]
    pub const fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Get the state reached by the most recent run.
    #[must_use]
    pub const fn state(&self) -> BootstrapState {
        self.state
    }

    /// Get the connector.
    pub const fn connector(&self) -> &C {
        &self.connector
    }

    /// Get the authenticator.
    pub const fn authenticator(&self) -> &A {
        &self.authenticator
    }

    /// Get the pause.
    pub const fn pause(&self) -> &P {
        &self.pause
    }

    /// Bootstrap a session for an instance.
    ///
    /// Checks for key material, resolves the dial target from the instance
    /// record, then runs [`bootstrap`](Self::bootstrap). A missing key or
    /// instance, or a record with no usable address, fails without any
    /// connection attempt.
    pub fn connect(
        &mut self,
        instance: Option<&InstanceRecord>,
        key: Option<&KeyPair>,
        resolver: &TargetResolver,
        sink: &dyn EventSink,
    ) -> Result<C::Session> {
        let result = self.resolve_and_bootstrap(instance, key, resolver, sink);
        if result.is_err() {
            sink.warn("bootstrap result failed");
        }
        result
    }

    fn resolve_and_bootstrap(
        &mut self,
        instance: Option<&InstanceRecord>,
        key: Option<&KeyPair>,
        resolver: &TargetResolver,
        sink: &dyn EventSink,
    ) -> Result<C::Session> {
        self.state = BootstrapState::Idle;
        let name = instance.map_or("<unknown>", |i| i.name.as_str());

        let Some(key) = key else {
            let subject = format!("instance: {name}");
            sink.error(&format!("Failed to retrieve SSH keypair for {subject}"));
            return Err(BootstrapError::NoCredentials { subject });
        };

        let Some(instance) = instance else {
            sink.error("Failed to authenticate with exception: bootstrap requested without an instance");
            self.transition(BootstrapState::Aborted);
            return Err(BootstrapError::MissingInstance);
        };

        let target = match resolver.resolve(instance) {
            Ok(target) => target,
            Err(e) => {
                sink.error(&format!("Failed to authenticate with exception: {e}"));
                self.transition(BootstrapState::Aborted);
                return Err(e.into());
            }
        };

        self.bootstrap(Some(key), &target, sink)
    }

    /// Run the retry loop against a resolved target.
    ///
    /// Returns the authenticated session on success; ownership passes to the
    /// caller. Without a key the call fails immediately with
    /// [`BootstrapError::NoCredentials`] and never connects.
    pub fn bootstrap(
        &mut self,
        key: Option<&KeyPair>,
        target: &TargetDescriptor,
        sink: &dyn EventSink,
    ) -> Result<C::Session> {
        self.state = BootstrapState::Idle;

        let Some(key) = key else {
            let subject = format!("target: {}", target.address());
            sink.error(&format!("Failed to retrieve SSH keypair for {subject}"));
            return Err(BootstrapError::NoCredentials { subject });
        };

        sink.info("bootstrap");
        sink.info("Getting keypair...");
        sink.info("Using autogenerated keypair");
        tracing::debug!(
            peer = %target,
            max_attempts = self.policy.max_attempts,
            delay_ms = self.policy.delay.as_millis() as u64,
            "Starting bootstrap"
        );

        let mut retry = RetryState::new(self.policy);
        let mut last_error = None;

        while let Some(attempt) = retry.next_attempt() {
            sink.info(&format!("Authenticating as {}", target.username));

            match self.attempt(target, key) {
                Attempt::Authenticated(session) => {
                    self.transition(BootstrapState::Succeeded);
                    tracing::info!(
                        peer = %target,
                        attempt,
                        "Bootstrap session authenticated"
                    );
                    return Ok(session);
                }
                Attempt::Rejected => {
                    last_error = Some(SshError::Rejected {
                        user: target.username.clone(),
                    });
                }
                Attempt::Transient(e) => {
                    sink.error(&format!("Exception trying to authenticate: {e}"));
                    last_error = Some(e);
                }
                Attempt::Fatal(e) => {
                    sink.error(&format!("Failed to authenticate with exception: {e}"));
                    self.transition(BootstrapState::Aborted);
                    return Err(BootstrapError::Aborted { attempt, source: e });
                }
            }

            let Some(delay) = retry.next_delay() else {
                break;
            };

            sink.warn("Authentication failed. Trying again...");
            self.transition(BootstrapState::Retrying);
            if let Err(e) = self.pause.pause(delay) {
                sink.error(&format!("Failed to authenticate with exception: {e}"));
                self.transition(BootstrapState::Aborted);
                return Err(BootstrapError::Aborted { attempt, source: e });
            }
            retry.record_delay(delay);
        }

        sink.warn("Authentication failed");
        self.transition(BootstrapState::Exhausted);
        tracing::warn!(
            peer = %target,
            attempts = retry.attempt(),
            waited_ms = retry.total_delay().as_millis() as u64,
            "Bootstrap attempts exhausted"
        );
        Err(BootstrapError::Exhausted {
            attempts: retry.attempt(),
            last_error,
        })
    }

    /// One connect-and-authenticate attempt. Closes the session unless it is
    /// returned as authenticated.
    fn attempt(&mut self, target: &TargetDescriptor, key: &KeyPair) -> Attempt<C::Session> {
        self.transition(BootstrapState::Connecting);
        let mut session = match self.connector.open(target) {
            Ok(session) => session,
            Err(e) => return Attempt::Transient(e),
        };

        self.transition(BootstrapState::Authenticating);
        match self
            .authenticator
            .authenticate(&mut session, key, &target.username)
        {
            Ok(true) => Attempt::Authenticated(session),
            Ok(false) => {
                session.close();
                Attempt::Rejected
            }
            Err(e) if e.is_transient() => {
                session.close();
                Attempt::Transient(e)
            }
            Err(e) => {
                session.close();
                Attempt::Fatal(e)
            }
        }
    }

    fn transition(&mut self, next: BootstrapState) {
        tracing::trace!(from = ?self.state, to = ?next, "Bootstrap state change");
        self.state = next;
    }
}
