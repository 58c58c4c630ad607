//! Integration tests for the SSH backend.
//!
//! Note: These tests verify API structure and failure classification only.
//! Successful connections require a running SSH server.

#![cfg(feature = "ssh")]

use std::time::Duration;

use vm_bootstrap::backend::ssh::decode_private_key;
use vm_bootstrap::{
    BootstrapConfig, BootstrapError, Connector, KeyPair, NullSink, PublicKeyAuthenticator,
    RetryPolicy, SshConnectConfig, SshConnector, SshError, TargetDescriptor,
};

#[test]
fn ssh_bootstrapper_uses_configured_policy() {
    let config = BootstrapConfig::new()
        .max_attempts(7)
        .retry_delay(Duration::from_millis(250));
    let bootstrapper = config.ssh_bootstrapper().unwrap();

    assert_eq!(
        *bootstrapper.policy(),
        RetryPolicy::new(7, Duration::from_millis(250))
    );
    assert_eq!(
        bootstrapper.connector().config().connect_timeout,
        Duration::from_secs(10)
    );
}

#[test]
fn ssh_bootstrapper_rejects_zero_connect_timeout() {
    let config = BootstrapConfig::new().connect_timeout(Duration::ZERO);
    let err = config.ssh_bootstrapper().unwrap_err();

    assert!(matches!(err, SshError::InvalidState { .. }));
    assert!(!err.is_transient());
}

#[test]
fn undecodable_key_is_rejected() {
    let key = KeyPair::new("garbage", "ssh-rsa AAAA", "jenkins");
    let err = decode_private_key(&key, None).unwrap_err();
    assert!(!err.is_transient());
}

#[test]
fn unreachable_host_exhausts_attempts() {
    let connector =
        SshConnector::new(SshConnectConfig::default().connect_timeout(Duration::from_secs(2)))
            .unwrap();
    let mut bootstrapper =
        vm_bootstrap::Bootstrapper::new(connector, PublicKeyAuthenticator::new())
            .with_policy(RetryPolicy::immediate(2));
    let key = KeyPair::new("unused", "unused", "nobody");

    // Nothing is expected to listen on port 1 of the loopback interface.
    let err = bootstrapper
        .bootstrap(Some(&key), &TargetDescriptor::new("127.0.0.1", 1, "nobody"), &NullSink)
        .unwrap_err();

    assert!(matches!(err, BootstrapError::Exhausted { attempts: 2, .. }));
}

#[test]
fn connector_reports_refusal_as_transient() {
    let mut connector = SshConnector::new(SshConnectConfig::default()).unwrap();
    let err = connector
        .open(&TargetDescriptor::new("127.0.0.1", 1, "nobody"))
        .unwrap_err();
    assert!(err.is_transient());
}

/// Same shape as the crate-level example: every loader error converts
/// through `?` into a boxed error.
fn bootstrap_from_json(json: &str) -> Result<(), Box<dyn std::error::Error>> {
    let config = BootstrapConfig::from_toml("[bootstrap]\nmax_attempts = 1\nssh_port = 1\n")?;
    let mut bootstrapper = config.ssh_bootstrapper()?;
    let instance = vm_bootstrap::InstanceRecord::from_json(json)?;
    let key = KeyPair::new("unused", "unused", "nobody");
    let sink = vm_bootstrap::TracingSink::new(&instance.name);

    let session = bootstrapper.connect(Some(&instance), Some(&key), &config.resolver(), &sink)?;
    drop(session);
    Ok(())
}

#[test]
fn boxed_errors_carry_bootstrap_failure() {
    let json = r#"{
        "name": "agent-1",
        "networkInterfaces": [{"accessConfigs": [{"natIP": "127.0.0.1"}]}],
        "sshUser": "nobody"
    }"#;

    let err = bootstrap_from_json(json).unwrap_err();
    let err = err.downcast_ref::<BootstrapError>().unwrap();
    assert!(err.is_exhausted());

    let err = bootstrap_from_json("{").unwrap_err();
    assert!(err.downcast_ref::<serde_json::Error>().is_some());
}
