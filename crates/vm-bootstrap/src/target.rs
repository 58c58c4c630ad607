//! Dial-target resolution.
//!
//! Turns an [`InstanceRecord`] into the host, port and login a bootstrap
//! should use. Resolution is pure: a record that lacks what is needed is a
//! configuration problem and is reported immediately, never retried.

use crate::error::ResolveError;
use crate::types::{AddressClass, InstanceRecord, TargetDescriptor};

/// Default SSH port.
pub const DEFAULT_SSH_PORT: u16 = 22;

/// Resolves instance records to dial targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TargetResolver {
    address_class: AddressClass,
    port: u16,
}

impl Default for TargetResolver {
    fn default() -> Self {
        Self::new(AddressClass::default())
    }
}

impl TargetResolver {
    /// Create a resolver for the given address class on the default port.
    #[must_use]
    pub const fn new(address_class: AddressClass) -> Self {
        Self {
            address_class,
            port: DEFAULT_SSH_PORT,
        }
    }

    /// Set the port.
    #[must_use]
    pub const fn port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Get the address class.
    #[must_use]
    pub const fn address_class(&self) -> AddressClass {
        self.address_class
    }

    /// Resolve a record to a target.
    pub fn resolve(&self, instance: &InstanceRecord) -> Result<TargetDescriptor, ResolveError> {
        let interface = instance.network_interfaces.first().ok_or_else(|| {
            ResolveError::NoNetworkInterface {
                instance: instance.name.clone(),
            }
        })?;

        let host = match self.address_class {
            AddressClass::Internal => interface.network_ip.as_deref(),
            AddressClass::External => interface
                .access_configs
                .first()
                .and_then(|config| config.nat_ip.as_deref()),
        }
        .map(str::trim)
        .filter(|host| !host.is_empty())
        .ok_or_else(|| ResolveError::NoAddress {
            instance: instance.name.clone(),
            class: self.address_class,
        })?;

        let username = instance
            .ssh_user
            .as_deref()
            .map(str::trim)
            .filter(|user| !user.is_empty())
            .ok_or_else(|| ResolveError::MissingUser {
                instance: instance.name.clone(),
            })?;

        Ok(TargetDescriptor::new(host, self.port, username))
    }
}

/// Resolve a record to a target in one call.
pub fn resolve_target(
    instance: &InstanceRecord,
    class: AddressClass,
    port: u16,
) -> Result<TargetDescriptor, ResolveError> {
    TargetResolver::new(class).port(port).resolve(instance)
}
