use std::path::Path;

use crate::{Address, CommError, Domain, UnixAddress};

use super::{Family, Socket};

/// Unix-domain family marker.
#[derive(Debug, Clone, Copy)]
pub struct Unix;

impl Family for Unix {
    const DOMAIN: Domain = Domain::UNIX;
}

/// Datagram socket on a filesystem path.
pub type UnixUdpSocket = Socket<Unix>;

impl Socket<Unix> {
    /// Binds to `path`, creating the socket node.
    ///
    /// The node is never removed by this crate, not even on close; a stale
    /// node at `path` makes the bind fail with `EADDRINUSE`.
    pub fn bind(&mut self, path: impl AsRef<Path>) -> Result<(), CommError> {
        let addr = resolve(path.as_ref())?;
        self.bind_address(&addr)
    }

    /// Sets `path` as the default peer. Fails unless a socket is bound there.
    pub fn connect(&mut self, path: impl AsRef<Path>) -> Result<(), CommError> {
        let addr = resolve(path.as_ref())?;
        self.connect_address(&addr)
    }

    pub fn local_path(&self) -> Option<&Path> {
        self.local_addr().and_then(Address::as_unix).and_then(UnixAddress::path)
    }
}

fn resolve(path: &Path) -> Result<Address, CommError> {
    let mut addr = UnixAddress::new();
    addr.resolve(path)?;
    Ok(Address::Unix(addr))
}
