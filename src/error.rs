use std::{fmt, io};

use liaise::{Liaise, RegisterErrors};

#[derive(RegisterErrors, Debug, Copy, Clone, PartialEq, Eq)]
#[error_prefix = "JUXT"]
pub enum CommCode {
    InvalidState = 1,
    Resolution = 2,
    Syscall = 3,
    PathTooLong = 4,
    FamilyMismatch = 5,
}

impl Liaise for CommCode {
    fn code_id(self) -> u16 { self as u16 }

    fn message(self) -> &'static str {
        match self {
            Self::InvalidState => "Invalid state",
            Self::Resolution => "Address resolution failed",
            Self::Syscall => "System call failed",
            Self::PathTooLong => "Socket path too long",
            Self::FamilyMismatch => "Address family mismatch",
        }
    }
}

/// Concrete runtime error type for the crate.
///
/// Every fallible operation returns this as a plain value; the object that
/// produced it is left in a consistent state.
#[derive(Debug)]
pub struct CommError {
    pub code: CommCode,
    pub ctx: Option<String>,
    pub source: Option<CommSource>,
}

#[derive(Debug)]
pub enum CommSource {
    Io(io::Error),
}

impl CommError {
    #[inline]
    pub fn new(code: CommCode) -> Self {
        Self { code, ctx: None, source: None }
    }

    #[inline]
    pub fn ctx(mut self, ctx: impl fmt::Display) -> Self {
        self.ctx = Some(ctx.to_string());
        self
    }

    #[inline]
    pub fn invalid_state(op: &str, state: impl fmt::Display) -> Self {
        Self::new(CommCode::InvalidState).ctx(format_args!("{op} while {state}"))
    }

    #[inline]
    pub fn resolution(ctx: impl fmt::Display) -> Self {
        Self::new(CommCode::Resolution).ctx(ctx)
    }

    /// Wraps an OS error, keeping errno reachable through [`CommError::raw_os_error`].
    #[inline]
    pub fn syscall(op: &str, err: io::Error) -> Self {
        Self {
            code: CommCode::Syscall,
            ctx: Some(format!("{op}: {err}")),
            source: Some(CommSource::Io(err)),
        }
    }

    /// Captures `errno` right after a failed libc call.
    #[inline]
    pub fn last_os_error(op: &str) -> Self {
        Self::syscall(op, io::Error::last_os_error())
    }

    #[inline]
    pub fn path_too_long(len: usize, max: usize) -> Self {
        Self::new(CommCode::PathTooLong).ctx(format_args!("len {len} exceeds max {max}"))
    }

    #[inline]
    pub fn family_mismatch(expected: impl fmt::Display, got: impl fmt::Display) -> Self {
        Self::new(CommCode::FamilyMismatch).ctx(format_args!("expected {expected}, got {got}"))
    }

    pub fn io_error(&self) -> Option<&io::Error> {
        match &self.source {
            Some(CommSource::Io(e)) => Some(e),
            None => None,
        }
    }

    pub fn raw_os_error(&self) -> Option<i32> {
        self.io_error().and_then(io::Error::raw_os_error)
    }
}

impl fmt::Display for CommError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // "[JUXT0003] System call failed: bind: Address already in use"
        let base = self.code.render();
        match &self.ctx {
            Some(ctx) => write!(f, "{base}: {ctx}"),
            None => write!(f, "{base}"),
        }
    }
}

impl std::error::Error for CommError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match &self.source {
            Some(CommSource::Io(e)) => Some(e),
            None => None,
        }
    }
}

impl From<io::Error> for CommError {
    #[inline]
    fn from(e: io::Error) -> Self {
        CommError::syscall("io", e)
    }
}

impl From<CommError> for io::Error {
    fn from(e: CommError) -> Self {
        match e.source {
            Some(CommSource::Io(inner)) => inner,
            None => {
                let kind = match e.code {
                    CommCode::InvalidState => io::ErrorKind::NotConnected,
                    CommCode::PathTooLong | CommCode::FamilyMismatch => io::ErrorKind::InvalidInput,
                    CommCode::Resolution => io::ErrorKind::NotFound,
                    CommCode::Syscall => io::ErrorKind::Other,
                };
                io::Error::new(kind, CommError { source: None, ..e })
            }
        }
    }
}
