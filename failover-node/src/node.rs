//! Node identity: address and credentials of one database server

use serde::{Deserialize, Serialize};
use std::fmt;

/// A user name and password pair
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    pub name: String,
    pub password: String,
}

impl Credentials {
    pub fn new(name: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("name", &self.name)
            .field("password", &"***")
            .finish()
    }
}

/// Immutable description of one node
///
/// `host` and `port` are derived from `address` at construction. A
/// malformed address leaves both empty; construction itself never fails
/// and does no I/O.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeIdentity {
    address: String,
    host: String,
    port: String,
    admin_user: Credentials,
    replication_user: Credentials,
}

impl NodeIdentity {
    pub fn new(
        address: impl Into<String>,
        admin_user: Credentials,
        replication_user: Credentials,
    ) -> Self {
        let address = address.into();
        let (host, port) = split_host_port(&address).unwrap_or_default();

        Self {
            address,
            host,
            port,
            admin_user,
            replication_user,
        }
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> &str {
        &self.port
    }

    /// Port as a number, if the address carried a numeric one
    pub fn port_number(&self) -> Option<u16> {
        self.port.parse().ok()
    }

    /// Credentials for the administrative session
    pub fn admin_user(&self) -> &Credentials {
        &self.admin_user
    }

    /// Credentials replicas use to pull from this node
    pub fn replication_user(&self) -> &Credentials {
        &self.replication_user
    }

    /// True when host and port were both recovered from the address
    pub fn has_valid_address(&self) -> bool {
        !self.host.is_empty() && !self.port.is_empty()
    }
}

impl fmt::Display for NodeIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.address)
    }
}

/// Split `host:port`, `[v6]:port` style addresses.
///
/// Returns `None` for a missing port separator, an unbalanced bracket, or
/// an unbracketed host containing colons.
pub(crate) fn split_host_port(address: &str) -> Option<(String, String)> {
    let (host, port) = if let Some(rest) = address.strip_prefix('[') {
        let (host, after) = rest.split_once(']')?;
        (host, after.strip_prefix(':')?)
    } else {
        let (host, port) = address.rsplit_once(':')?;
        if host.contains(':') || host.contains('[') || host.contains(']') {
            return None;
        }
        (host, port)
    };

    if port.contains('[') || port.contains(']') {
        return None;
    }

    Some((host.to_string(), port.to_string()))
}
