use crate::{Address, CommError, Domain, InetAddress};

use super::{Family, Socket};

/// Internet (IPv4) family marker.
#[derive(Debug, Clone, Copy)]
pub struct Inet;

impl Family for Inet {
    const DOMAIN: Domain = Domain::INET;
}

/// UDP over IPv4.
pub type InetUdpSocket = Socket<Inet>;

impl Socket<Inet> {
    /// Binds to `host`:`service`; `service` may be numeric or a service name.
    pub fn bind(&mut self, host: &str, service: &str) -> Result<(), CommError> {
        self.bind_resolved(service, Some(host))
    }

    /// Binds to `service` on every local address.
    pub fn bind_service(&mut self, service: &str) -> Result<(), CommError> {
        self.bind_resolved(service, None)
    }

    pub fn bind_port(&mut self, host: &str, port: u16) -> Result<(), CommError> {
        self.bind_resolved(&port.to_string(), Some(host))
    }

    /// Binds to `port` on every local address. Port 0 lets the kernel choose.
    pub fn bind_any(&mut self, port: u16) -> Result<(), CommError> {
        self.bind_resolved(&port.to_string(), None)
    }

    pub fn connect(&mut self, host: &str, service: &str) -> Result<(), CommError> {
        let addr = resolve(service, Some(host))?;
        self.connect_address(&addr)
    }

    pub fn connect_port(&mut self, host: &str, port: u16) -> Result<(), CommError> {
        self.connect(host, &port.to_string())
    }

    /// Port the socket is bound to, once open.
    pub fn local_port(&self) -> Option<u16> {
        self.local_addr().and_then(Address::as_inet).map(InetAddress::port)
    }

    fn bind_resolved(&mut self, service: &str, host: Option<&str>) -> Result<(), CommError> {
        let addr = resolve(service, host)?;
        self.bind_address(&addr)
    }
}

fn resolve(service: &str, host: Option<&str>) -> Result<Address, CommError> {
    let mut addr = InetAddress::new();
    addr.resolve(service, host)?;
    Ok(Address::Inet(addr))
}
