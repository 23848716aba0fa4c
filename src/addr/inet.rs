use std::{
    ffi::{CStr, CString},
    fmt, mem,
    net::{Ipv4Addr, SocketAddrV4},
    ptr,
};

use crate::{CommError, Domain, SockAddr};

/// IPv4 endpoint backed by a native `sockaddr_in`.
#[derive(Clone, Copy)]
pub struct InetAddress {
    raw: libc::sockaddr_in,
    resolved: bool,
}

impl InetAddress {
    pub const SIZE: usize = mem::size_of::<libc::sockaddr_in>();

    /// An unresolved address: family set, wildcard IP, port 0.
    pub fn new() -> Self {
        // SAFETY: sockaddr_in is plain old data; all-zero is a valid value.
        let mut raw: libc::sockaddr_in = unsafe { mem::zeroed() };
        raw.sin_family = libc::AF_INET as libc::sa_family_t;
        Self { raw, resolved: false }
    }

    /// Looks up `host` + `service` with `getaddrinfo`.
    ///
    /// `host = None` resolves to the wildcard address. `service` may be numeric
    /// (`"1234"`) or a name from the services database. On failure `self` is
    /// left untouched.
    pub fn resolve(&mut self, service: &str, host: Option<&str>) -> Result<(), CommError> {
        let c_service = CString::new(service)
            .map_err(|_| CommError::resolution(format_args!("service {service:?} contains NUL")))?;
        let c_host = host
            .map(CString::new)
            .transpose()
            .map_err(|_| CommError::resolution(format_args!("host {host:?} contains NUL")))?;

        // SAFETY: addrinfo is plain old data; getaddrinfo only reads the hint fields.
        let mut hints: libc::addrinfo = unsafe { mem::zeroed() };
        hints.ai_family = libc::AF_INET;
        hints.ai_socktype = libc::SOCK_DGRAM;
        if c_host.is_none() {
            hints.ai_flags = libc::AI_PASSIVE;
        }

        let mut list: *mut libc::addrinfo = ptr::null_mut();
        let rc = unsafe {
            libc::getaddrinfo(
                c_host.as_ref().map_or(ptr::null(), |h| h.as_ptr()),
                c_service.as_ptr(),
                &hints,
                &mut list,
            )
        };
        if rc != 0 {
            let reason = unsafe { CStr::from_ptr(libc::gai_strerror(rc)) };
            tracing::debug!(?host, service, rc, "getaddrinfo failed");
            return Err(CommError::resolution(format_args!(
                "{}:{service}: {}",
                host.unwrap_or("*"),
                reason.to_string_lossy()
            )));
        }

        let found = unsafe { first_inet(list) };
        unsafe { libc::freeaddrinfo(list) };

        match found {
            Some(raw) => {
                self.raw = raw;
                self.resolved = true;
                Ok(())
            }
            None => Err(CommError::resolution(format_args!(
                "{}:{service}: no IPv4 result",
                host.unwrap_or("*")
            ))),
        }
    }

    pub fn resolve_port(&mut self, port: u16, host: Option<&str>) -> Result<(), CommError> {
        self.resolve(&port.to_string(), host)
    }

    pub fn ip(&self) -> Ipv4Addr {
        Ipv4Addr::from(u32::from_be(self.raw.sin_addr.s_addr))
    }

    pub fn port(&self) -> u16 {
        u16::from_be(self.raw.sin_port)
    }

    pub fn socket_addr(&self) -> SocketAddrV4 {
        SocketAddrV4::new(self.ip(), self.port())
    }

    /// Wraps an address handed back by the kernel.
    pub(crate) fn from_raw(raw: libc::sockaddr_in) -> Self {
        Self { raw, resolved: true }
    }
}

/// Walks a `getaddrinfo` result list and copies out the first IPv4 entry.
///
/// # Safety
/// `list` must be null or a list returned by `getaddrinfo` that is not yet freed.
unsafe fn first_inet(mut list: *const libc::addrinfo) -> Option<libc::sockaddr_in> {
    while !list.is_null() {
        let info = unsafe { &*list };
        if info.ai_family == libc::AF_INET
            && !info.ai_addr.is_null()
            && info.ai_addrlen as usize >= InetAddress::SIZE
        {
            return Some(unsafe { ptr::read_unaligned(info.ai_addr as *const libc::sockaddr_in) });
        }
        list = info.ai_next;
    }
    None
}

impl Default for InetAddress {
    fn default() -> Self {
        Self::new()
    }
}

impl From<SocketAddrV4> for InetAddress {
    fn from(addr: SocketAddrV4) -> Self {
        let mut out = Self::new();
        out.raw.sin_port = addr.port().to_be();
        out.raw.sin_addr.s_addr = u32::from(*addr.ip()).to_be();
        out.resolved = true;
        out
    }
}

impl PartialEq for InetAddress {
    fn eq(&self, other: &Self) -> bool {
        self.resolved == other.resolved && self.socket_addr() == other.socket_addr()
    }
}

impl Eq for InetAddress {}

impl fmt::Debug for InetAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InetAddress")
            .field("addr", &self.socket_addr())
            .field("resolved", &self.resolved)
            .finish()
    }
}

impl fmt::Display for InetAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.socket_addr(), f)
    }
}

impl SockAddr for InetAddress {
    fn domain(&self) -> Domain {
        Domain::INET
    }

    fn addr_size(&self) -> usize {
        Self::SIZE
    }

    fn is_resolved(&self) -> bool {
        self.resolved
    }

    fn as_raw(&self) -> (*const libc::sockaddr, libc::socklen_t) {
        (
            &self.raw as *const libc::sockaddr_in as *const libc::sockaddr,
            Self::SIZE as libc::socklen_t,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn size_is_fixed_before_and_after_resolution() {
        let mut addr = InetAddress::new();
        assert_eq!(addr.addr_size(), mem::size_of::<libc::sockaddr_in>());
        assert!(!addr.is_resolved());

        addr.resolve("1234", Some("127.0.0.1")).unwrap();
        assert_eq!(addr.addr_size(), mem::size_of::<libc::sockaddr_in>());
        assert!(addr.is_resolved());
        assert_eq!(addr.socket_addr(), "127.0.0.1:1234".parse().unwrap());
    }

    #[test]
    fn missing_host_means_any_address() {
        let mut addr = InetAddress::new();
        addr.resolve_port(4321, None).unwrap();
        assert_eq!(addr.ip(), Ipv4Addr::UNSPECIFIED);
        assert_eq!(addr.port(), 4321);
    }

    #[test]
    fn failed_resolution_leaves_address_untouched() {
        let mut addr = InetAddress::new();
        addr.resolve_port(7000, Some("127.0.0.1")).unwrap();
        let before = addr;

        let err = addr.resolve("not-a-real-service-name", Some("127.0.0.1")).unwrap_err();
        assert_eq!(err.code, crate::CommCode::Resolution);
        assert_eq!(addr, before);
        assert_eq!(addr.addr_size(), InetAddress::SIZE);
    }

    #[test]
    fn interior_nul_is_rejected() {
        let mut addr = InetAddress::new();
        assert!(addr.resolve("12\034", None).is_err());
        assert!(!addr.is_resolved());
    }

    #[test]
    fn converts_from_std_socket_addr() {
        let std_addr: SocketAddrV4 = "10.1.2.3:5353".parse().unwrap();
        let addr = InetAddress::from(std_addr);
        assert!(addr.is_resolved());
        assert_eq!(addr.socket_addr(), std_addr);
        assert_eq!(addr.to_string(), "10.1.2.3:5353");
    }
}
