//! Anonymous pipes.
//!
//! A [`Pipe`] is a pair of descriptors (read end, write end) with an explicit
//! open/close lifecycle. It is typically used as a wakeup or control channel
//! whose read end is polled by the caller's event loop.

use std::{
    io,
    os::fd::{AsFd, AsRawFd, OwnedFd, RawFd},
};

use crate::{ByteSink, ByteSource, CommConfig, CommError, fd};

#[derive(Debug)]
struct Ends {
    read: OwnedFd,
    write: OwnedFd,
}

#[derive(Debug, Default)]
pub struct Pipe {
    ends: Option<Ends>,
    cfg: CommConfig,
}

impl Pipe {
    pub fn new() -> Self {
        Self::with_config(CommConfig::default())
    }

    pub fn with_config(cfg: CommConfig) -> Self {
        Self { ends: None, cfg }
    }

    pub fn config(&self) -> CommConfig {
        self.cfg
    }

    /// Creates both descriptors.
    ///
    /// Calling this on an open pipe releases the current pair first and
    /// creates a fresh one; unread data in the old pair is lost.
    pub fn open(&mut self) -> Result<(), CommError> {
        if self.ends.is_some() {
            tracing::debug!("pipe already open, recreating");
            self.close();
        }

        let mut raw = [-1 as libc::c_int; 2];
        fd::cvt("pipe", unsafe { libc::pipe(raw.as_mut_ptr()) })?;
        // SAFETY: pipe() succeeded, both descriptors are new and unowned.
        let ends = unsafe { Ends { read: fd::owned(raw[0]), write: fd::owned(raw[1]) } };

        // On failure `ends` drops here and both descriptors are closed.
        fd::configure(ends.read.as_fd(), &self.cfg)?;
        fd::configure(ends.write.as_fd(), &self.cfg)?;

        tracing::debug!(read = raw[0], write = raw[1], "pipe opened");
        self.ends = Some(ends);
        Ok(())
    }

    /// Releases both descriptors. Safe to call in any state.
    pub fn close(&mut self) {
        if let Some(ends) = self.ends.take() {
            tracing::debug!(
                read = ends.read.as_raw_fd(),
                write = ends.write.as_raw_fd(),
                "pipe closed"
            );
        }
    }

    pub fn is_open(&self) -> bool {
        self.ends.is_some()
    }

    pub fn is_closed(&self) -> bool {
        self.ends.is_none()
    }

    /// Switches both ends between blocking and non-blocking mode.
    ///
    /// If the write end cannot be switched, the read end is put back the way
    /// it was, so both ends always share one mode.
    pub fn set_blocking(&mut self, blocking: bool) -> Result<(), CommError> {
        let ends = self.ends("set_blocking")?;
        let was_blocking = fd::is_blocking(ends.read.as_fd())?;
        fd::set_blocking(ends.read.as_fd(), blocking)?;
        if let Err(e) = fd::set_blocking(ends.write.as_fd(), blocking) {
            tracing::debug!(error = %e, "write end kept its mode, restoring read end");
            let _ = fd::set_blocking(ends.read.as_fd(), was_blocking);
            return Err(e);
        }
        Ok(())
    }

    /// Whether the read end is in blocking mode.
    pub fn is_blocking(&self) -> Result<bool, CommError> {
        fd::is_blocking(self.ends("is_blocking")?.read.as_fd())
    }

    /// One `read(2)` from the read end. May return fewer bytes than asked for;
    /// `Ok(0)` means every write end has been closed.
    pub fn read(&mut self, dst: &mut [u8]) -> Result<usize, CommError> {
        fd::read(self.ends("read")?.read.as_fd(), dst)
    }

    /// One `write(2)` to the write end. A short count is returned as-is.
    pub fn write(&mut self, src: &[u8]) -> Result<usize, CommError> {
        fd::write(self.ends("write")?.write.as_fd(), src)
    }

    pub fn read_desc(&self) -> Option<RawFd> {
        self.ends.as_ref().map(|e| e.read.as_raw_fd())
    }

    pub fn write_desc(&self) -> Option<RawFd> {
        self.ends.as_ref().map(|e| e.write.as_raw_fd())
    }

    fn ends(&self, op: &str) -> Result<&Ends, CommError> {
        self.ends.as_ref().ok_or_else(|| CommError::invalid_state(op, "pipe is closed"))
    }
}

impl io::Read for Pipe {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        Pipe::read(self, buf).map_err(io::Error::from)
    }
}

impl io::Write for Pipe {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        Pipe::write(self, buf).map_err(io::Error::from)
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl ByteSink for Pipe {
    type Error = CommError;
    fn send_bytes(&mut self, bytes: &[u8]) -> Result<usize, Self::Error> {
        self.write(bytes)
    }
}

impl ByteSource for Pipe {
    type Error = CommError;
    fn recv_bytes(&mut self, dst: &mut [u8]) -> Result<usize, Self::Error> {
        self.read(dst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::CommCode;

    fn fd_is_valid(fd: RawFd) -> bool {
        unsafe { libc::fcntl(fd, libc::F_GETFD) != -1 }
    }

    #[test]
    fn operations_fail_before_open() {
        let mut pipe = Pipe::new();
        assert!(pipe.is_closed());
        assert!(!pipe.is_open());

        assert_eq!(pipe.set_blocking(false).unwrap_err().code, CommCode::InvalidState);
        assert_eq!(pipe.read(&mut [0u8; 4]).unwrap_err().code, CommCode::InvalidState);
        assert_eq!(pipe.write(b"abcd").unwrap_err().code, CommCode::InvalidState);
        assert_eq!(pipe.read_desc(), None);
        assert_eq!(pipe.write_desc(), None);
    }

    #[test]
    fn reopen_starts_with_an_empty_channel() {
        let mut pipe = Pipe::new();
        pipe.open().unwrap();
        pipe.write(b"stale").unwrap();

        pipe.open().unwrap();
        assert!(pipe.is_open());

        pipe.set_blocking(false).unwrap();
        let err = pipe.read(&mut [0u8; 8]).unwrap_err();
        assert_eq!(err.code, CommCode::Syscall);
        assert_eq!(err.raw_os_error(), Some(libc::EAGAIN));
    }

    #[test]
    fn descriptors_are_valid_while_open() {
        let mut pipe = Pipe::new();
        pipe.open().unwrap();
        let (r, w) = (pipe.read_desc().unwrap(), pipe.write_desc().unwrap());
        assert!(fd_is_valid(r) && fd_is_valid(w));

        pipe.close();
        assert!(pipe.is_closed());
        assert!(pipe.is_blocking().is_err());
    }

    #[test]
    fn set_blocking_switches_both_ends_together() {
        fn nonblocking(fd: RawFd) -> bool {
            unsafe { libc::fcntl(fd, libc::F_GETFL) & libc::O_NONBLOCK != 0 }
        }

        let mut pipe = Pipe::new();
        pipe.open().unwrap();
        let (r, w) = (pipe.read_desc().unwrap(), pipe.write_desc().unwrap());
        assert!(!nonblocking(r) && !nonblocking(w));

        pipe.set_blocking(false).unwrap();
        assert!(nonblocking(r) && nonblocking(w));

        pipe.set_blocking(true).unwrap();
        assert!(!nonblocking(r) && !nonblocking(w));
    }

    #[test]
    fn config_applies_on_open() {
        let cfg = CommConfig { blocking: false, ..Default::default() };
        let mut pipe = Pipe::with_config(cfg);
        pipe.open().unwrap();
        assert!(!pipe.is_blocking().unwrap());

        let flags = unsafe { libc::fcntl(pipe.read_desc().unwrap(), libc::F_GETFD) };
        assert_ne!(flags & libc::FD_CLOEXEC, 0);
    }
}
