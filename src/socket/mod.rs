//! Datagram sockets.
//!
//! [`Socket`] holds the lifecycle shared by every family: one owned
//! descriptor, the local address it is bound to and, once connected, the
//! default peer. The family marker `F` fixes the address family; the
//! family-specific entry points live in [`inet`] and [`unix`].
//!
//! ```text
//!   Closed --bind--> Open --connect--> Connected
//!     ^  \______________connect_______/   |
//!     |_________________close_____________|
//! ```

pub mod inet;
pub mod unix;

pub use self::inet::{Inet, InetUdpSocket};
pub use self::unix::{Unix, UnixUdpSocket};

use std::{
    fmt,
    marker::PhantomData,
    mem,
    os::fd::{AsFd, AsRawFd, BorrowedFd, OwnedFd, RawFd},
};

use crate::{Address, ByteSink, ByteSource, CommConfig, CommError, Domain, SockAddr, SockType, fd};

/// Address family marker for [`Socket`].
pub trait Family {
    const DOMAIN: Domain;
    const TYPE: SockType = SockType::DGRAM;
}

/// Observable socket state. Closed-but-connected cannot be expressed.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum SocketState {
    Closed,
    Open,
    Connected,
}

impl fmt::Display for SocketState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Closed => "closed",
            Self::Open => "open",
            Self::Connected => "connected",
        })
    }
}

#[derive(Debug)]
enum Link {
    Closed,
    Open { fd: OwnedFd, local: Address },
    Connected { fd: OwnedFd, local: Address, peer: Address },
}

impl Link {
    fn fd(&self) -> Option<BorrowedFd<'_>> {
        match self {
            Self::Closed => None,
            Self::Open { fd, .. } | Self::Connected { fd, .. } => Some(fd.as_fd()),
        }
    }
}

/// A datagram endpoint of family `F`.
pub struct Socket<F: Family> {
    link: Link,
    cfg: CommConfig,
    _family: PhantomData<F>,
}

impl<F: Family> Socket<F> {
    pub fn new() -> Self {
        Self::with_config(CommConfig::default())
    }

    pub fn with_config(cfg: CommConfig) -> Self {
        Self { link: Link::Closed, cfg, _family: PhantomData }
    }

    pub fn config(&self) -> CommConfig {
        self.cfg
    }

    pub fn state(&self) -> SocketState {
        match self.link {
            Link::Closed => SocketState::Closed,
            Link::Open { .. } => SocketState::Open,
            Link::Connected { .. } => SocketState::Connected,
        }
    }

    pub fn is_open(&self) -> bool {
        self.state() != SocketState::Closed
    }

    pub fn is_closed(&self) -> bool {
        self.state() == SocketState::Closed
    }

    pub fn is_connected(&self) -> bool {
        self.state() == SocketState::Connected
    }

    pub fn is_disconnected(&self) -> bool {
        self.state() != SocketState::Connected
    }

    pub fn local_addr(&self) -> Option<&Address> {
        match &self.link {
            Link::Closed => None,
            Link::Open { local, .. } | Link::Connected { local, .. } => Some(local),
        }
    }

    pub fn peer_addr(&self) -> Option<&Address> {
        match &self.link {
            Link::Connected { peer, .. } => Some(peer),
            _ => None,
        }
    }

    pub fn as_raw_fd(&self) -> Option<RawFd> {
        self.link.fd().map(|fd| fd.as_raw_fd())
    }

    /// Binds to an already resolved address.
    ///
    /// A socket that is already open is closed first. On failure the socket
    /// is left closed.
    pub fn bind_address(&mut self, addr: &Address) -> Result<(), CommError> {
        self.check_address(addr)?;
        if self.is_open() {
            tracing::debug!(%addr, "rebinding, releasing previous descriptor");
            self.close();
        }

        let fd = self.create_descriptor()?;
        if self.cfg.reuse_address && F::DOMAIN == Domain::INET {
            set_reuse_address(fd.as_fd())?;
        }

        let (ptr, len) = addr.as_raw();
        if let Err(e) = fd::cvt("bind", unsafe { libc::bind(fd.as_raw_fd(), ptr, len) }) {
            tracing::debug!(%addr, error = %e, "bind failed");
            return Err(e);
        }

        let local = local_address(fd.as_fd()).unwrap_or_else(|_| Address::copied_from(addr));
        tracing::debug!(fd = fd.as_raw_fd(), %local, "socket bound");
        self.link = Link::Open { fd, local };
        Ok(())
    }

    /// Sets the default peer to an already resolved address.
    ///
    /// A closed socket gets a descriptor first; for Internet sockets the
    /// kernel picks the local port. On failure the previous state is kept.
    pub fn connect_address(&mut self, addr: &Address) -> Result<(), CommError> {
        self.check_address(addr)?;

        let previous = mem::replace(&mut self.link, Link::Closed);
        let (fd, restore) = match previous {
            Link::Closed => (self.create_descriptor()?, None),
            Link::Open { fd, local } => (fd, Some((local, None))),
            Link::Connected { fd, local, peer } => (fd, Some((local, Some(peer)))),
        };

        let (ptr, len) = addr.as_raw();
        if let Err(e) = fd::cvt("connect", unsafe { libc::connect(fd.as_raw_fd(), ptr, len) }) {
            tracing::debug!(peer = %addr, error = %e, "connect failed");
            // a descriptor created just for this attempt drops here
            if let Some((local, peer)) = restore {
                self.link = match peer {
                    Some(peer) => Link::Connected { fd, local, peer },
                    None => Link::Open { fd, local },
                };
            }
            return Err(e);
        }

        let local = match local_address(fd.as_fd()) {
            Ok(local) => local,
            Err(_) => match restore {
                Some((local, _)) => local,
                None => Address::unresolved(F::DOMAIN)?,
            },
        };
        tracing::debug!(fd = fd.as_raw_fd(), %local, peer = %addr, "socket connected");
        self.link = Link::Connected { fd, local, peer: Address::copied_from(addr) };
        Ok(())
    }

    /// One datagram to the connected peer. Requires [`SocketState::Connected`].
    pub fn send(&mut self, buf: &[u8]) -> Result<usize, CommError> {
        let Link::Connected { fd, .. } = &self.link else {
            return Err(CommError::invalid_state("send", self.state()));
        };
        let ret = unsafe { libc::send(fd.as_raw_fd(), buf.as_ptr().cast(), buf.len(), 0) };
        fd::cvt_len("send", ret)
    }

    /// One datagram to `addr`. Requires an open socket.
    pub fn send_to(&mut self, buf: &[u8], addr: &Address) -> Result<usize, CommError> {
        self.check_address(addr)?;
        let fd = self.open_fd("send_to")?;
        let (ptr, len) = addr.as_raw();
        let ret = unsafe {
            libc::sendto(fd.as_raw_fd(), buf.as_ptr().cast(), buf.len(), 0, ptr, len)
        };
        fd::cvt_len("sendto", ret)
    }

    /// Receives one datagram. Requires an open socket, connected or not.
    ///
    /// A datagram larger than `buf` is truncated by the kernel.
    pub fn recv(&mut self, buf: &mut [u8]) -> Result<usize, CommError> {
        let fd = self.open_fd("recv")?;
        let ret = unsafe { libc::recv(fd.as_raw_fd(), buf.as_mut_ptr().cast(), buf.len(), 0) };
        fd::cvt_len("recv", ret)
    }

    /// Receives one datagram along with the sender's address.
    pub fn recv_from(&mut self, buf: &mut [u8]) -> Result<(usize, Address), CommError> {
        let fd = self.open_fd("recv_from")?;
        let (mut storage, mut len) = Address::empty_storage();
        let ret = unsafe {
            libc::recvfrom(
                fd.as_raw_fd(),
                buf.as_mut_ptr().cast(),
                buf.len(),
                0,
                &mut storage as *mut libc::sockaddr_storage as *mut libc::sockaddr,
                &mut len,
            )
        };
        let n = fd::cvt_len("recvfrom", ret)?;
        let from = match Address::from_storage(&storage, len) {
            Some(addr) => addr,
            // some platforms report an unnamed sender with a zero length
            None => Address::unresolved(F::DOMAIN)?,
        };
        Ok((n, from))
    }

    pub fn set_blocking(&mut self, blocking: bool) -> Result<(), CommError> {
        fd::set_blocking(self.open_fd("set_blocking")?, blocking)
    }

    pub fn is_blocking(&self) -> Result<bool, CommError> {
        fd::is_blocking(self.open_fd("is_blocking")?)
    }

    /// Releases the descriptor and returns to [`SocketState::Closed`].
    /// Safe to call in any state.
    pub fn close(&mut self) {
        if let Some(fd) = self.link.fd() {
            tracing::debug!(fd = fd.as_raw_fd(), "socket closed");
        }
        self.link = Link::Closed;
    }

    fn open_fd(&self, op: &str) -> Result<BorrowedFd<'_>, CommError> {
        self.link.fd().ok_or_else(|| CommError::invalid_state(op, self.state()))
    }

    fn check_address(&self, addr: &Address) -> Result<(), CommError> {
        if addr.domain() != F::DOMAIN {
            return Err(CommError::family_mismatch(F::DOMAIN, addr.domain()));
        }
        if !addr.is_resolved() {
            return Err(CommError::resolution("address is not resolved"));
        }
        Ok(())
    }

    fn create_descriptor(&self) -> Result<OwnedFd, CommError> {
        let raw = fd::cvt("socket", unsafe { libc::socket(F::DOMAIN.0, F::TYPE.0, 0) })?;
        // SAFETY: socket() succeeded and returned a new descriptor.
        let fd = unsafe { fd::owned(raw) };
        fd::configure(fd.as_fd(), &self.cfg)?;
        let domain = F::DOMAIN;
        tracing::trace!(fd = raw, %domain, "socket descriptor created");
        Ok(fd)
    }
}

fn local_address(fd: BorrowedFd<'_>) -> Result<Address, CommError> {
    let (mut storage, mut len) = Address::empty_storage();
    fd::cvt("getsockname", unsafe {
        libc::getsockname(
            fd.as_raw_fd(),
            &mut storage as *mut libc::sockaddr_storage as *mut libc::sockaddr,
            &mut len,
        )
    })?;
    Address::from_storage(&storage, len)
        .ok_or_else(|| CommError::resolution("getsockname returned an unknown family"))
}

fn set_reuse_address(fd: BorrowedFd<'_>) -> Result<(), CommError> {
    let on: libc::c_int = 1;
    fd::cvt("setsockopt(SO_REUSEADDR)", unsafe {
        libc::setsockopt(
            fd.as_raw_fd(),
            libc::SOL_SOCKET,
            libc::SO_REUSEADDR,
            &on as *const libc::c_int as *const libc::c_void,
            mem::size_of::<libc::c_int>() as libc::socklen_t,
        )
    })?;
    Ok(())
}

impl<F: Family> Default for Socket<F> {
    fn default() -> Self {
        Self::new()
    }
}

impl<F: Family> fmt::Debug for Socket<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Socket")
            .field("domain", &F::DOMAIN)
            .field("state", &self.state())
            .field("fd", &self.as_raw_fd())
            .field("local", &self.local_addr())
            .field("peer", &self.peer_addr())
            .finish()
    }
}

impl<F: Family> ByteSink for Socket<F> {
    type Error = CommError;
    fn send_bytes(&mut self, bytes: &[u8]) -> Result<usize, Self::Error> {
        self.send(bytes)
    }
}

impl<F: Family> ByteSource for Socket<F> {
    type Error = CommError;
    fn recv_bytes(&mut self, dst: &mut [u8]) -> Result<usize, Self::Error> {
        self.recv(dst)
    }
}
