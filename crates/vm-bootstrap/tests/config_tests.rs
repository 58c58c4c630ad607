//! Integration tests for configuration handling.

use std::time::Duration;

use vm_bootstrap::config::env::vars;
use vm_bootstrap::{AddressClass, BootstrapConfig, ConfigError, EnvConfig, RetryPolicy};

#[test]
fn bootstrap_config_default() {
    let config = BootstrapConfig::default();
    assert_eq!(config.retry, RetryPolicy::new(30, Duration::from_millis(15_000)));
    assert_eq!(config.connect_timeout, Duration::from_secs(10));
    assert_eq!(config.port, 22);
    assert_eq!(config.address_class, AddressClass::External);
}

#[test]
fn bootstrap_config_builder_pattern() {
    let config = BootstrapConfig::new()
        .max_attempts(5)
        .retry_delay(Duration::from_millis(500))
        .connect_timeout(Duration::from_secs(3))
        .port(2222)
        .address_class(AddressClass::Internal);

    assert_eq!(config.retry.max_attempts, 5);
    assert_eq!(config.retry.delay, Duration::from_millis(500));
    assert_eq!(config.connect_timeout, Duration::from_secs(3));
    assert_eq!(config.port, 2222);
    assert_eq!(config.address_class, AddressClass::Internal);
    assert!(config.validate().is_ok());
}

#[test]
fn env_config_all_variables() {
    let env = EnvConfig::from_vars(
        "VM_BOOTSTRAP",
        [
            ("VM_BOOTSTRAP_MAX_ATTEMPTS", "12"),
            ("VM_BOOTSTRAP_RETRY_DELAY_MS", "2500"),
            ("VM_BOOTSTRAP_CONNECT_TIMEOUT_MS", "4000"),
            ("VM_BOOTSTRAP_SSH_PORT", "2200"),
            ("VM_BOOTSTRAP_USE_INTERNAL_ADDRESS", "true"),
        ],
    );
    assert!(env.is_set(vars::SSH_PORT));

    let config = BootstrapConfig::default().merge_env(&env).unwrap();
    assert_eq!(config.retry, RetryPolicy::new(12, Duration::from_millis(2500)));
    assert_eq!(config.connect_timeout, Duration::from_millis(4000));
    assert_eq!(config.port, 2200);
    assert_eq!(config.address_class, AddressClass::Internal);
}

#[test]
fn env_config_bad_port() {
    let env = EnvConfig::from_vars("VM_BOOTSTRAP", [("VM_BOOTSTRAP_SSH_PORT", "70000")]);
    let err = BootstrapConfig::default().merge_env(&env).unwrap_err();

    assert!(matches!(err, ConfigError::Invalid { ref key, .. } if key == "VM_BOOTSTRAP_SSH_PORT"));
}

#[test]
fn config_file_round_trip_through_disk() {
    let path = std::env::temp_dir().join(format!("vm-bootstrap-{}.toml", std::process::id()));
    std::fs::write(
        &path,
        "[bootstrap]\nmax_attempts = 3\nretry_delay_ms = 100\nuse_internal_address = true\n",
    )
    .unwrap();

    let config = BootstrapConfig::from_file(&path);
    let _ = std::fs::remove_file(&path);
    let config = config.unwrap();

    assert_eq!(config.retry, RetryPolicy::new(3, Duration::from_millis(100)));
    assert_eq!(config.address_class, AddressClass::Internal);
    assert_eq!(config.port, 22);
}

#[test]
fn config_file_rejects_wrong_types() {
    let err = BootstrapConfig::from_toml("[bootstrap]\nmax_attempts = \"many\"\n").unwrap_err();
    assert!(matches!(err, ConfigError::Parse(_)));
}

#[test]
fn environment_overrides_file() {
    let env = EnvConfig::from_vars("VM_BOOTSTRAP", [("VM_BOOTSTRAP_MAX_ATTEMPTS", "9")]);
    let config = BootstrapConfig::from_toml("[bootstrap]\nmax_attempts = 4\nssh_port = 2022\n")
        .unwrap()
        .merge_env(&env)
        .unwrap();

    assert_eq!(config.retry.max_attempts, 9);
    assert_eq!(config.port, 2022);
}

#[test]
fn zero_connect_timeout_is_rejected_by_every_loader() {
    let err = BootstrapConfig::from_toml("[bootstrap]\nconnect_timeout_ms = 0\n").unwrap_err();
    assert!(matches!(err, ConfigError::Invalid { ref key, .. } if key == "connect_timeout"));

    let env = EnvConfig::from_vars(
        "VM_BOOTSTRAP",
        [("VM_BOOTSTRAP_CONNECT_TIMEOUT_MS", "0")],
    );
    let err = BootstrapConfig::from_env_config(&env).unwrap_err();
    assert!(matches!(err, ConfigError::Invalid { ref key, .. } if key == "connect_timeout"));

    let path = std::env::temp_dir().join(format!("vm-bootstrap-zero-{}.toml", std::process::id()));
    std::fs::write(&path, "[bootstrap]\nconnect_timeout_ms = 0\n").unwrap();
    let result = BootstrapConfig::from_file(&path);
    let _ = std::fs::remove_file(&path);
    assert!(matches!(result, Err(ConfigError::Invalid { .. })));
}

#[test]
fn zero_port_is_rejected_from_environment() {
    let env = EnvConfig::from_vars("VM_BOOTSTRAP", [("VM_BOOTSTRAP_SSH_PORT", "0")]);
    let err = BootstrapConfig::from_env_config(&env).unwrap_err();
    assert!(err.to_string().contains("port"));
}
