//! Socket addresses.
//!
//! Two kinds exist, [`InetAddress`] and [`UnixAddress`]. [`Address`] holds
//! either one so sockets and callers can pass endpoints around without
//! knowing the family at compile time.

mod inet;
mod unix;

pub use self::inet::InetAddress;
pub use self::unix::UnixAddress;

use std::{fmt, mem};

use crate::{CommError, Domain, SockAddr};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Address {
    Inet(InetAddress),
    Unix(UnixAddress),
}

impl Address {
    /// An empty address of the requested family.
    pub fn unresolved(domain: Domain) -> Result<Self, CommError> {
        match domain {
            Domain::INET => Ok(Self::Inet(InetAddress::new())),
            Domain::UNIX => Ok(Self::Unix(UnixAddress::new())),
            other => Err(CommError::family_mismatch("AF_INET or AF_UNIX", other)),
        }
    }

    /// New address of the same kind as `existing` with identical content.
    pub fn copied_from(existing: &Address) -> Self {
        match existing {
            Self::Inet(a) => Self::Inet(*a),
            Self::Unix(a) => Self::Unix(*a),
        }
    }

    /// Family-agnostic resolution.
    ///
    /// Internet: `primary` is the service, `secondary` the host (`None` = any).
    /// Unix: `primary` is the path, `secondary` is ignored.
    pub fn resolve(&mut self, primary: &str, secondary: Option<&str>) -> Result<(), CommError> {
        match self {
            Self::Inet(a) => a.resolve(primary, secondary),
            Self::Unix(a) => a.resolve(primary),
        }
    }

    pub fn as_inet(&self) -> Option<&InetAddress> {
        match self {
            Self::Inet(a) => Some(a),
            Self::Unix(_) => None,
        }
    }

    pub fn as_unix(&self) -> Option<&UnixAddress> {
        match self {
            Self::Unix(a) => Some(a),
            Self::Inet(_) => None,
        }
    }

    /// Decodes an address filled in by `getsockname`/`recvfrom`.
    ///
    /// Returns `None` for families other than Internet and Unix.
    pub(crate) fn from_storage(storage: &libc::sockaddr_storage, len: libc::socklen_t) -> Option<Self> {
        match storage.ss_family as libc::c_int {
            libc::AF_INET if len as usize >= InetAddress::SIZE => {
                // SAFETY: family is AF_INET and the kernel wrote a full sockaddr_in.
                let raw = unsafe { *(storage as *const _ as *const libc::sockaddr_in) };
                Some(Self::Inet(InetAddress::from_raw(raw)))
            }
            libc::AF_UNIX => {
                // SAFETY: sockaddr_storage is large enough and aligned for sockaddr_un.
                let raw = unsafe { *(storage as *const _ as *const libc::sockaddr_un) };
                Some(Self::Unix(UnixAddress::from_raw(raw, len)))
            }
            _ => None,
        }
    }

    pub(crate) fn empty_storage() -> (libc::sockaddr_storage, libc::socklen_t) {
        // SAFETY: sockaddr_storage is plain old data.
        let storage: libc::sockaddr_storage = unsafe { mem::zeroed() };
        (storage, mem::size_of::<libc::sockaddr_storage>() as libc::socklen_t)
    }
}

impl From<InetAddress> for Address {
    fn from(a: InetAddress) -> Self {
        Self::Inet(a)
    }
}

impl From<UnixAddress> for Address {
    fn from(a: UnixAddress) -> Self {
        Self::Unix(a)
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Inet(a) => fmt::Display::fmt(a, f),
            Self::Unix(a) => fmt::Display::fmt(a, f),
        }
    }
}

impl SockAddr for Address {
    fn domain(&self) -> Domain {
        match self {
            Self::Inet(a) => a.domain(),
            Self::Unix(a) => a.domain(),
        }
    }

    fn addr_size(&self) -> usize {
        match self {
            Self::Inet(a) => a.addr_size(),
            Self::Unix(a) => a.addr_size(),
        }
    }

    fn is_resolved(&self) -> bool {
        match self {
            Self::Inet(a) => a.is_resolved(),
            Self::Unix(a) => a.is_resolved(),
        }
    }

    fn as_raw(&self) -> (*const libc::sockaddr, libc::socklen_t) {
        match self {
            Self::Inet(a) => a.as_raw(),
            Self::Unix(a) => a.as_raw(),
        }
    }
}
