//! Common types for vm-bootstrap.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Key material used to authenticate the bootstrap session.
///
/// Owned by whatever manages keys for the instance; a bootstrap call only
/// borrows it.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeyPair {
    /// Private key in OpenSSH or PEM text form.
    pub private_key: String,
    /// Public key as an OpenSSH line.
    pub public_key: String,
    /// User the key was issued for.
    pub user: String,
}

impl KeyPair {
    /// Create a key pair.
    #[must_use]
    pub fn new(
        private_key: impl Into<String>,
        public_key: impl Into<String>,
        user: impl Into<String>,
    ) -> Self {
        Self {
            private_key: private_key.into(),
            public_key: public_key.into(),
            user: user.into(),
        }
    }
}

impl fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyPair")
            .field("private_key", &"<redacted>")
            .field("public_key", &self.public_key)
            .field("user", &self.user)
            .finish()
    }
}

/// Which of an instance's addresses to dial.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AddressClass {
    /// The private address on the instance's network.
    Internal,
    /// The public NAT address.
    #[default]
    External,
}

impl AddressClass {
    /// Pick the class from a "use internal address" flag.
    #[must_use]
    pub const fn from_use_internal(use_internal: bool) -> Self {
        if use_internal {
            Self::Internal
        } else {
            Self::External
        }
    }

    /// Get the class name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Internal => "internal",
            Self::External => "external",
        }
    }
}

impl fmt::Display for AddressClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// An access configuration attached to a network interface.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessConfig {
    /// Access config name (e.g. "External NAT").
    #[serde(default)]
    pub name: Option<String>,
    /// The external address.
    #[serde(rename = "natIP", default)]
    pub nat_ip: Option<String>,
}

/// A network interface of an instance.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkInterface {
    /// The internal address.
    #[serde(rename = "networkIP", default)]
    pub network_ip: Option<String>,
    /// Access configurations, the first of which carries the external address.
    #[serde(default)]
    pub access_configs: Vec<AccessConfig>,
}

/// The provider's view of a virtual machine, as far as bootstrap needs it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstanceRecord {
    /// Instance name.
    pub name: String,
    /// Zone name or full zone URL.
    #[serde(default)]
    pub zone: String,
    /// Network interfaces in provider order.
    #[serde(default)]
    pub network_interfaces: Vec<NetworkInterface>,
    /// Login user configured for the node.
    #[serde(default)]
    pub ssh_user: Option<String>,
}

impl InstanceRecord {
    /// Create a record with just a name.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Set the zone.
    #[must_use]
    pub fn zone(mut self, zone: impl Into<String>) -> Self {
        self.zone = zone.into();
        self
    }

    /// Set the login user.
    #[must_use]
    pub fn ssh_user(mut self, user: impl Into<String>) -> Self {
        self.ssh_user = Some(user.into());
        self
    }

    /// Add a network interface.
    #[must_use]
    pub fn with_interface(mut self, interface: NetworkInterface) -> Self {
        self.network_interfaces.push(interface);
        self
    }

    /// Parse a record from the provider's JSON representation.
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }

    /// The short zone name, whether `zone` holds a name or a URL.
    #[must_use]
    pub fn zone_name(&self) -> &str {
        self.zone.rsplit('/').next().unwrap_or(&self.zone)
    }
}

impl NetworkInterface {
    /// Create an interface with an internal address.
    #[must_use]
    pub fn internal(ip: impl Into<String>) -> Self {
        Self {
            network_ip: Some(ip.into()),
            access_configs: Vec::new(),
        }
    }

    /// Add an external NAT address.
    #[must_use]
    pub fn with_nat(mut self, ip: impl Into<String>) -> Self {
        self.access_configs.push(AccessConfig {
            name: Some("External NAT".to_string()),
            nat_ip: Some(ip.into()),
        });
        self
    }
}

/// Where and as whom to dial.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TargetDescriptor {
    /// Host address.
    pub host: String,
    /// SSH port.
    pub port: u16,
    /// Login user.
    pub username: String,
}

impl TargetDescriptor {
    /// Create a target.
    #[must_use]
    pub fn new(host: impl Into<String>, port: u16, username: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port,
            username: username.into(),
        }
    }

    /// Get the address string.
    #[must_use]
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl fmt::Display for TargetDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}:{}", self.username, self.host, self.port)
    }
}
