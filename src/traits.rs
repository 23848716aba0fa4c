use crate::Domain;

/// Something that pushes bytes out in a single transfer.
pub trait ByteSink {
    type Error;
    fn send_bytes(&mut self, bytes: &[u8]) -> Result<usize, Self::Error>;
}

/// Something that pulls bytes in with a single transfer.
pub trait ByteSource {
    type Error;
    fn recv_bytes(&mut self, dst: &mut [u8]) -> Result<usize, Self::Error>;
}

/// Capabilities shared by every address kind.
pub trait SockAddr {
    /// Address family of this kind. Constant per kind.
    fn domain(&self) -> Domain;

    /// `size_of` the native structure. Constant per kind, resolved or not.
    fn addr_size(&self) -> usize;

    fn is_resolved(&self) -> bool;

    /// Pointer and length to hand to `bind`/`connect`/`sendto`.
    fn as_raw(&self) -> (*const libc::sockaddr, libc::socklen_t);
}
