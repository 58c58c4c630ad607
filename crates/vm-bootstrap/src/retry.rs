//! Retry policy and inter-attempt waiting.
//!
//! A freshly provisioned machine usually reports "running" well before its
//! SSH service accepts connections, so bootstrap retries with a fixed delay.
//! The policy is an immutable value handed to the controller; the actual wait
//! goes through the [`Pause`] trait so tests can run without sleeping.

use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::time::Duration;

use crate::error::SshError;

/// Default maximum number of bootstrap attempts.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 30;

/// Default delay between bootstrap attempts (15 seconds).
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_millis(15_000);

/// Bounded, fixed-delay retry policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Maximum attempts, including the first.
    pub max_attempts: u32,
    /// Delay between a failed attempt and the next one.
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            delay: DEFAULT_RETRY_DELAY,
        }
    }
}

impl RetryPolicy {
    /// Create a policy.
    #[must_use]
    pub const fn new(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts,
            delay,
        }
    }

    /// A policy that retries immediately.
    #[must_use]
    pub const fn immediate(max_attempts: u32) -> Self {
        Self::new(max_attempts, Duration::ZERO)
    }

    /// Set the maximum attempts.
    #[must_use]
    pub const fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    /// Set the delay.
    #[must_use]
    pub const fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Delay to wait after the failed attempt number `attempt` (1-based).
    ///
    /// Returns `None` when `attempt` was the last one allowed, so no wait is
    /// spent after the final failure.
    #[must_use]
    pub const fn delay_for_attempt(&self, attempt: u32) -> Option<Duration> {
        if attempt < self.max_attempts {
            Some(self.delay)
        } else {
            None
        }
    }

    /// Upper bound on time spent waiting across a fully failing run.
    ///
    /// Saturates at [`Duration::MAX`].
    #[must_use]
    pub fn total_delay_budget(&self) -> Duration {
        self.delay
            .checked_mul(self.max_attempts.saturating_sub(1))
            .unwrap_or(Duration::MAX)
    }
}

/// Retry state tracker.
#[derive(Debug)]
pub struct RetryState {
    /// Attempts started so far.
    attempt: u32,
    /// Policy in use.
    policy: RetryPolicy,
    /// Total delay accumulated.
    total_delay: Duration,
}

impl RetryState {
    /// Create new state.
    #[must_use]
    pub const fn new(policy: RetryPolicy) -> Self {
        Self {
            attempt: 0,
            policy,
            total_delay: Duration::ZERO,
        }
    }

    /// Start the next attempt, returning its 1-based number, or `None` when
    /// the budget is spent.
    pub const fn next_attempt(&mut self) -> Option<u32> {
        if self.attempt < self.policy.max_attempts {
            self.attempt += 1;
            Some(self.attempt)
        } else {
            None
        }
    }

    /// Get the current attempt number (0 before the first attempt).
    #[must_use]
    pub const fn attempt(&self) -> u32 {
        self.attempt
    }

    /// Get the delay owed after the current attempt failed, if another attempt follows.
    #[must_use]
    pub const fn next_delay(&self) -> Option<Duration> {
        self.policy.delay_for_attempt(self.attempt)
    }

    /// Record a completed wait. The total saturates at [`Duration::MAX`].
    pub const fn record_delay(&mut self, delay: Duration) {
        self.total_delay = self.total_delay.saturating_add(delay);
    }

    /// Get total delay so far.
    #[must_use]
    pub const fn total_delay(&self) -> Duration {
        self.total_delay
    }
}

/// Blocking wait between attempts.
pub trait Pause {
    /// Block for `delay`.
    ///
    /// An `Err` means the wait was interrupted; the controller treats that as
    /// a reason to abort rather than to retry.
    fn pause(&mut self, delay: Duration) -> Result<(), SshError>;
}

/// Pause by sleeping the calling thread.
#[derive(Debug, Clone, Copy, Default)]
pub struct ThreadSleep;

impl Pause for ThreadSleep {
    fn pause(&mut self, delay: Duration) -> Result<(), SshError> {
        if !delay.is_zero() {
            std::thread::sleep(delay);
        }
        Ok(())
    }
}

/// Pause that another thread can interrupt.
///
/// Create one with [`InterruptiblePause::new`], keep the returned
/// [`Interrupter`], and call [`Interrupter::interrupt`] to cut the current or
/// next wait short.
#[derive(Debug)]
pub struct InterruptiblePause {
    signal: Receiver<String>,
}

/// Handle used to interrupt an [`InterruptiblePause`].
#[derive(Debug, Clone)]
pub struct Interrupter {
    signal: Sender<String>,
}

impl InterruptiblePause {
    /// Create a pause together with its interrupter.
    #[must_use]
    pub fn new() -> (Self, Interrupter) {
        let (signal, receiver) = mpsc::channel();
        (Self { signal: receiver }, Interrupter { signal })
    }
}

impl Interrupter {
    /// Interrupt the pause with a reason.
    ///
    /// Returns `false` if the pause no longer exists.
    pub fn interrupt(&self, reason: impl Into<String>) -> bool {
        self.signal.send(reason.into()).is_ok()
    }
}

impl Pause for InterruptiblePause {
    fn pause(&mut self, delay: Duration) -> Result<(), SshError> {
        match self.signal.recv_timeout(delay) {
            Ok(reason) => Err(SshError::interrupted(reason)),
            Err(RecvTimeoutError::Timeout) => Ok(()),
            Err(RecvTimeoutError::Disconnected) => {
                // Nobody can interrupt any more; plain sleep.
                ThreadSleep.pause(delay)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_policy() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.max_attempts, 30);
        assert_eq!(policy.delay, Duration::from_millis(15_000));
        assert_eq!(policy.total_delay_budget(), Duration::from_millis(29 * 15_000));
    }

    #[test]
    fn no_delay_after_last_attempt() {
        let policy = RetryPolicy::new(3, Duration::from_millis(100));

        assert_eq!(policy.delay_for_attempt(1), Some(Duration::from_millis(100)));
        assert_eq!(policy.delay_for_attempt(2), Some(Duration::from_millis(100)));
        assert_eq!(policy.delay_for_attempt(3), None);
    }

    #[test]
    fn retry_state() {
        let mut state = RetryState::new(RetryPolicy::immediate(2));

        assert_eq!(state.next_attempt(), Some(1));
        assert_eq!(state.next_delay(), Some(Duration::ZERO));
        assert_eq!(state.next_attempt(), Some(2));
        assert_eq!(state.next_delay(), None);
        assert_eq!(state.next_attempt(), None);
        assert_eq!(state.attempt(), 2);
    }

    #[test]
    fn zero_attempts_never_starts() {
        let mut state = RetryState::new(RetryPolicy::immediate(0));
        assert_eq!(state.next_attempt(), None);
        assert_eq!(RetryPolicy::immediate(0).total_delay_budget(), Duration::ZERO);
    }

    #[test]
    fn huge_delay_saturates() {
        let policy = RetryPolicy::new(3, Duration::MAX);
        assert_eq!(policy.total_delay_budget(), Duration::MAX);

        let mut state = RetryState::new(policy);
        while state.next_attempt().is_some() {
            if let Some(delay) = state.next_delay() {
                state.record_delay(delay);
            }
        }
        assert_eq!(state.attempt(), 3);
        assert_eq!(state.total_delay(), Duration::MAX);
    }

    #[test]
    fn interruptible_pause_times_out() {
        let (mut pause, _interrupter) = InterruptiblePause::new();
        assert!(pause.pause(Duration::from_millis(5)).is_ok());
    }

    #[test]
    fn interruptible_pause_interrupted() {
        let (mut pause, interrupter) = InterruptiblePause::new();
        assert!(interrupter.interrupt("shutting down"));

        let err = pause.pause(Duration::from_secs(60)).unwrap_err();
        assert_eq!(err, SshError::interrupted("shutting down"));
    }

    #[test]
    fn interruptible_pause_after_interrupter_dropped() {
        let (mut pause, interrupter) = InterruptiblePause::new();
        drop(interrupter);
        assert!(pause.pause(Duration::from_millis(1)).is_ok());
    }
}
