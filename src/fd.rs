//! Thin checked wrappers around descriptor syscalls.

use std::os::fd::{AsRawFd, BorrowedFd, FromRawFd, OwnedFd};

use crate::{CommConfig, CommError};

/// Maps a `-1` return to the current `errno`.
pub(crate) fn cvt(op: &str, ret: libc::c_int) -> Result<libc::c_int, CommError> {
    if ret == -1 {
        Err(CommError::last_os_error(op))
    } else {
        Ok(ret)
    }
}

/// Same as [`cvt`] for byte-count returning calls.
pub(crate) fn cvt_len(op: &str, ret: libc::ssize_t) -> Result<usize, CommError> {
    if ret < 0 {
        Err(CommError::last_os_error(op))
    } else {
        Ok(ret as usize)
    }
}

/// Takes ownership of a freshly created descriptor.
///
/// # Safety
/// `fd` must be a valid, open descriptor owned by nobody else.
pub(crate) unsafe fn owned(fd: libc::c_int) -> OwnedFd {
    unsafe { OwnedFd::from_raw_fd(fd) }
}

pub(crate) fn set_blocking(fd: BorrowedFd<'_>, blocking: bool) -> Result<(), CommError> {
    let raw = fd.as_raw_fd();
    let flags = cvt("fcntl(F_GETFL)", unsafe { libc::fcntl(raw, libc::F_GETFL) })?;
    let next = if blocking { flags & !libc::O_NONBLOCK } else { flags | libc::O_NONBLOCK };
    if next != flags {
        cvt("fcntl(F_SETFL)", unsafe { libc::fcntl(raw, libc::F_SETFL, next) })?;
    }
    Ok(())
}

pub(crate) fn is_blocking(fd: BorrowedFd<'_>) -> Result<bool, CommError> {
    let flags = cvt("fcntl(F_GETFL)", unsafe { libc::fcntl(fd.as_raw_fd(), libc::F_GETFL) })?;
    Ok(flags & libc::O_NONBLOCK == 0)
}

pub(crate) fn set_cloexec(fd: BorrowedFd<'_>) -> Result<(), CommError> {
    let raw = fd.as_raw_fd();
    let flags = cvt("fcntl(F_GETFD)", unsafe { libc::fcntl(raw, libc::F_GETFD) })?;
    if flags & libc::FD_CLOEXEC == 0 {
        cvt("fcntl(F_SETFD)", unsafe { libc::fcntl(raw, libc::F_SETFD, flags | libc::FD_CLOEXEC) })?;
    }
    Ok(())
}

/// Applies the per-descriptor parts of `cfg`.
pub(crate) fn configure(fd: BorrowedFd<'_>, cfg: &CommConfig) -> Result<(), CommError> {
    if cfg.close_on_exec {
        set_cloexec(fd)?;
    }
    if !cfg.blocking {
        set_blocking(fd, false)?;
    }
    Ok(())
}

pub(crate) fn read(fd: BorrowedFd<'_>, dst: &mut [u8]) -> Result<usize, CommError> {
    let ret = unsafe { libc::read(fd.as_raw_fd(), dst.as_mut_ptr().cast(), dst.len()) };
    cvt_len("read", ret)
}

pub(crate) fn write(fd: BorrowedFd<'_>, src: &[u8]) -> Result<usize, CommError> {
    let ret = unsafe { libc::write(fd.as_raw_fd(), src.as_ptr().cast(), src.len()) };
    cvt_len("write", ret)
}
