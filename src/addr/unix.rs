use std::{
    ffi::OsStr,
    fmt, mem,
    os::unix::ffi::OsStrExt,
    path::Path,
};

use crate::{CommError, Domain, SockAddr};

const PATH_OFFSET: usize = mem::offset_of!(libc::sockaddr_un, sun_path);

/// Filesystem socket endpoint backed by a native `sockaddr_un`.
#[derive(Clone, Copy)]
pub struct UnixAddress {
    raw: libc::sockaddr_un,
    len: libc::socklen_t,
}

impl UnixAddress {
    pub const SIZE: usize = mem::size_of::<libc::sockaddr_un>();

    /// Longest path accepted, leaving room for the terminating NUL.
    pub const MAX_PATH: usize = Self::SIZE - PATH_OFFSET - 1;

    /// An unnamed address: family set, empty path.
    pub fn new() -> Self {
        // SAFETY: sockaddr_un is plain old data; all-zero is a valid value.
        let mut raw: libc::sockaddr_un = unsafe { mem::zeroed() };
        raw.sun_family = libc::AF_UNIX as libc::sa_family_t;
        Self { raw, len: PATH_OFFSET as libc::socklen_t }
    }

    /// Copies `path` into the address.
    ///
    /// Paths longer than [`UnixAddress::MAX_PATH`] bytes, empty paths, and paths
    /// with an interior NUL are rejected; `self` is left untouched in that case.
    pub fn resolve(&mut self, path: impl AsRef<Path>) -> Result<(), CommError> {
        let bytes = path.as_ref().as_os_str().as_bytes();
        if bytes.is_empty() {
            return Err(CommError::resolution("empty socket path"));
        }
        if bytes.contains(&0) {
            return Err(CommError::resolution(format_args!(
                "socket path {:?} contains NUL",
                path.as_ref()
            )));
        }
        if bytes.len() > Self::MAX_PATH {
            return Err(CommError::path_too_long(bytes.len(), Self::MAX_PATH));
        }

        let mut next = Self::new();
        for (dst, src) in next.raw.sun_path.iter_mut().zip(bytes) {
            *dst = *src as libc::c_char;
        }
        next.len = (PATH_OFFSET + bytes.len() + 1) as libc::socklen_t;
        *self = next;
        Ok(())
    }

    /// Filesystem path, or `None` for an unnamed address.
    pub fn path(&self) -> Option<&Path> {
        let bytes = self.path_bytes();
        if bytes.is_empty() {
            None
        } else {
            Some(Path::new(OsStr::from_bytes(bytes)))
        }
    }

    fn path_bytes(&self) -> &[u8] {
        let avail = (self.len as usize).saturating_sub(PATH_OFFSET).min(self.raw.sun_path.len());
        // SAFETY: c_char and u8 share size and alignment; the slice stays inside sun_path.
        let all = unsafe {
            std::slice::from_raw_parts(self.raw.sun_path.as_ptr() as *const u8, avail)
        };
        let end = all.iter().position(|b| *b == 0).unwrap_or(all.len());
        &all[..end]
    }

    /// Wraps an address handed back by the kernel.
    pub(crate) fn from_raw(raw: libc::sockaddr_un, len: libc::socklen_t) -> Self {
        let len = (len as usize).clamp(PATH_OFFSET, Self::SIZE) as libc::socklen_t;
        Self { raw, len }
    }
}

impl Default for UnixAddress {
    fn default() -> Self {
        Self::new()
    }
}

impl PartialEq for UnixAddress {
    fn eq(&self, other: &Self) -> bool {
        self.path_bytes() == other.path_bytes()
    }
}

impl Eq for UnixAddress {}

impl fmt::Debug for UnixAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UnixAddress").field("path", &self.path()).finish()
    }
}

impl fmt::Display for UnixAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.path() {
            Some(path) => write!(f, "{}", path.display()),
            None => f.write_str("(unnamed)"),
        }
    }
}

impl SockAddr for UnixAddress {
    fn domain(&self) -> Domain {
        Domain::UNIX
    }

    fn addr_size(&self) -> usize {
        Self::SIZE
    }

    fn is_resolved(&self) -> bool {
        !self.path_bytes().is_empty()
    }

    fn as_raw(&self) -> (*const libc::sockaddr, libc::socklen_t) {
        (&self.raw as *const libc::sockaddr_un as *const libc::sockaddr, self.len)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::CommCode;

    #[test]
    fn size_is_fixed_before_and_after_resolution() {
        let mut addr = UnixAddress::new();
        assert_eq!(addr.addr_size(), mem::size_of::<libc::sockaddr_un>());
        assert!(!addr.is_resolved());
        assert_eq!(addr.path(), None);

        addr.resolve("/tmp/juxta-test.sock").unwrap();
        assert_eq!(addr.addr_size(), mem::size_of::<libc::sockaddr_un>());
        assert!(addr.is_resolved());
        assert_eq!(addr.path(), Some(Path::new("/tmp/juxta-test.sock")));
        assert_eq!(addr.as_raw().1 as usize, PATH_OFFSET + "/tmp/juxta-test.sock".len() + 1);
    }

    #[test]
    fn longest_path_fits_and_one_more_is_rejected() {
        let fits = "a".repeat(UnixAddress::MAX_PATH);
        let mut addr = UnixAddress::new();
        addr.resolve(&fits).unwrap();
        assert_eq!(addr.path().unwrap().as_os_str().len(), UnixAddress::MAX_PATH);

        let too_long = "b".repeat(UnixAddress::MAX_PATH + 1);
        let err = addr.resolve(&too_long).unwrap_err();
        assert_eq!(err.code, CommCode::PathTooLong);
        // previous content survives
        assert_eq!(addr.path(), Some(Path::new(&fits)));
    }

    #[test]
    fn shorter_path_clears_previous_bytes() {
        let mut addr = UnixAddress::new();
        addr.resolve("/tmp/a-rather-long-name.sock").unwrap();
        addr.resolve("/tmp/s").unwrap();
        assert_eq!(addr.path(), Some(Path::new("/tmp/s")));
    }

    #[test]
    fn empty_path_is_rejected() {
        let mut addr = UnixAddress::new();
        assert_eq!(addr.resolve("").unwrap_err().code, CommCode::Resolution);
        assert!(!addr.is_resolved());
    }
}
