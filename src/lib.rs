//! # JUXTA
//! Resource-safe pipes and datagram sockets.
//!
//! To be "juxtaposed" is to sit side by side. This crate gives two processes
//! sitting side by side the plain kernel channels to talk over, with the
//! descriptor lifecycle spelled out in types:
//!
//! * **[`Pipe`]:** an anonymous read/write descriptor pair with explicit
//!   open/close and blocking control.
//! * **[`Address`]:** one value type over [`InetAddress`] and [`UnixAddress`],
//!   sized and compared without knowing the family at compile time.
//! * **[`Socket`]:** a datagram endpoint whose state is exactly one of
//!   closed, open or connected. [`InetUdpSocket`] and [`UnixUdpSocket`] add
//!   the family-specific bind and connect calls.
//!
//! Every descriptor is an `OwnedFd`, so no error path can leak one, and every
//! failure comes back as a [`CommError`] value. Nothing retries, loops over
//! short transfers, or spawns threads.
//!
//! ```no_run
//! use juxta::InetUdpSocket;
//!
//! let mut server = InetUdpSocket::new();
//! server.bind("127.0.0.1", "1234")?;
//!
//! let mut client = InetUdpSocket::new();
//! client.connect("127.0.0.1", "1234")?;
//! client.send(b"abc")?;
//!
//! let mut buf = [0u8; 16];
//! let n = server.recv(&mut buf)?;
//! assert_eq!(&buf[..n], b"abc");
//! # Ok::<(), juxta::CommError>(())
//! ```

pub mod addr;
pub mod error;
mod fd;
pub mod pipe;
pub mod socket;
pub mod traits;
pub mod types;

pub use addr::*;
pub use error::*;
pub use pipe::Pipe;
pub use socket::{Family, Inet, InetUdpSocket, Socket, SocketState, Unix, UnixUdpSocket};
pub use traits::*;
pub use types::*;
