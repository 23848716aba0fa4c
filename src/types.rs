use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::{Address, CommError, InetAddress, UnixAddress};

/// Address family of a socket, carrying the native `AF_*` value.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct Domain(pub libc::c_int);

impl Domain {
    pub const INET: Domain = Domain(libc::AF_INET);
    pub const UNIX: Domain = Domain(libc::AF_UNIX);
}

impl core::fmt::Display for Domain {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match *self {
            Self::INET => f.write_str("AF_INET"),
            Self::UNIX => f.write_str("AF_UNIX"),
            Domain(raw) => write!(f, "AF({raw})"),
        }
    }
}

/// Socket type, carrying the native `SOCK_*` value.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct SockType(pub libc::c_int);

impl SockType {
    pub const DGRAM: SockType = SockType(libc::SOCK_DGRAM);
}

/// Options applied every time a pipe or socket acquires a descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CommConfig {
    /// Start descriptors in blocking mode.
    pub blocking: bool,

    /// Set `FD_CLOEXEC` so descriptors are not inherited across `exec`.
    pub close_on_exec: bool,

    /// Set `SO_REUSEADDR` before binding Internet sockets.
    pub reuse_address: bool,
}

impl Default for CommConfig {
    fn default() -> Self {
        Self {
            blocking: true,
            close_on_exec: true,
            reuse_address: false,
        }
    }
}

/// Human-readable description of an endpoint, suitable for config files.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "family", rename_all = "lowercase")]
pub enum Endpoint {
    Inet {
        #[serde(default)]
        host: Option<String>,
        service: String,
    },
    Unix {
        path: PathBuf,
    },
}

impl Endpoint {
    pub fn domain(&self) -> Domain {
        match self {
            Self::Inet { .. } => Domain::INET,
            Self::Unix { .. } => Domain::UNIX,
        }
    }

    pub fn resolve(&self) -> Result<Address, CommError> {
        match self {
            Self::Inet { host, service } => {
                let mut addr = InetAddress::new();
                addr.resolve(service, host.as_deref())?;
                Ok(Address::Inet(addr))
            }
            Self::Unix { path } => {
                let mut addr = UnixAddress::new();
                addr.resolve(path)?;
                Ok(Address::Unix(addr))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::SockAddr;

    #[test]
    fn domains_match_native_values() {
        assert_eq!(Domain::INET.0, libc::AF_INET);
        assert_eq!(Domain::UNIX.0, libc::AF_UNIX);
        assert_ne!(Domain::INET, Domain::UNIX);
        assert_eq!(SockType::DGRAM.0, libc::SOCK_DGRAM);
    }

    #[test]
    fn config_fills_missing_fields_with_defaults() {
        let cfg: CommConfig = serde_json::from_str(r#"{ "reuse_address": true }"#).unwrap();
        assert!(cfg.blocking);
        assert!(cfg.close_on_exec);
        assert!(cfg.reuse_address);
    }

    #[test]
    fn endpoint_parses_and_resolves() {
        let ep: Endpoint =
            serde_json::from_str(r#"{ "family": "inet", "host": "127.0.0.1", "service": "4100" }"#)
                .unwrap();
        assert_eq!(ep.domain(), Domain::INET);

        let addr = ep.resolve().unwrap();
        assert_eq!(addr.domain(), Domain::INET);
        assert!(addr.is_resolved());
        assert_eq!(addr.as_inet().unwrap().port(), 4100);
    }

    #[test]
    fn unix_endpoint_resolves_path() {
        let ep: Endpoint =
            serde_json::from_str(r#"{ "family": "unix", "path": "/tmp/juxta.sock" }"#).unwrap();
        let addr = ep.resolve().unwrap();
        assert_eq!(addr.domain(), Domain::UNIX);
        assert_eq!(
            addr.as_unix().and_then(UnixAddress::path),
            Some(std::path::Path::new("/tmp/juxta.sock"))
        );
    }
}
