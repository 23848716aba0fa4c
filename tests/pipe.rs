use std::io::{Read, Write};

use juxta::{ByteSink, ByteSource, CommCode, Pipe};

#[test]
fn unopened_pipe_rejects_everything() {
    let mut pipe = Pipe::new();

    assert!(pipe.set_blocking(true).is_err());
    assert!(pipe.read(&mut [0u8; 8]).is_err());
    assert!(pipe.write(b"12345678").is_err());
    assert_eq!(pipe.read_desc(), None);
    assert_eq!(pipe.write_desc(), None);
}

#[test]
fn read_write_and_set_blocking_fail_after_close() {
    let mut pipe = Pipe::new();
    pipe.open().unwrap();
    pipe.write(b"left behind").unwrap();
    pipe.close();

    assert_eq!(pipe.set_blocking(false).unwrap_err().code, CommCode::InvalidState);
    assert_eq!(pipe.read(&mut [0u8; 16]).unwrap_err().code, CommCode::InvalidState);
    assert_eq!(pipe.write(b"more").unwrap_err().code, CommCode::InvalidState);
    assert_eq!(pipe.read_desc(), None);
    assert_eq!(pipe.write_desc(), None);
}

#[test]
fn open_gives_two_distinct_descriptors() {
    let mut pipe = Pipe::new();
    pipe.open().unwrap();
    assert!(pipe.is_open() && !pipe.is_closed());

    let r = pipe.read_desc().unwrap();
    let w = pipe.write_desc().unwrap();
    assert!(r >= 0 && w >= 0);
    assert_ne!(r, w);

    pipe.close();
    assert!(pipe.is_closed());
    assert_eq!(pipe.read_desc(), None);
    assert_eq!(pipe.write_desc(), None);
}

#[test]
fn write_then_read_roundtrip() {
    let mut pipe = Pipe::new();
    pipe.open().unwrap();

    let sent = b"wake up, there is work";
    assert_eq!(pipe.write(sent).unwrap(), sent.len());

    let mut buf = [0u8; 64];
    let n = pipe.read(&mut buf).unwrap();
    assert_eq!(n, sent.len());
    assert_eq!(&buf[..n], sent);
}

#[test]
fn close_twice_is_fine() {
    let mut pipe = Pipe::new();
    pipe.close();
    assert!(pipe.is_closed());

    pipe.open().unwrap();
    pipe.close();
    pipe.close();
    assert!(pipe.is_closed());
}

#[test]
fn nonblocking_read_on_empty_pipe_would_block() {
    let mut pipe = Pipe::new();
    pipe.open().unwrap();
    assert!(pipe.is_blocking().unwrap());

    pipe.set_blocking(false).unwrap();
    assert!(!pipe.is_blocking().unwrap());

    let e = pipe.read(&mut [0u8; 1]).unwrap_err();
    assert_eq!(e.code, CommCode::Syscall);
    assert_eq!(e.io_error().unwrap().kind(), std::io::ErrorKind::WouldBlock);

    // still usable afterwards
    pipe.write(b"!").unwrap();
    assert_eq!(pipe.read(&mut [0u8; 1]).unwrap(), 1);
}

#[test]
fn full_nonblocking_pipe_reports_a_short_or_failed_write() {
    let mut pipe = Pipe::new();
    pipe.open().unwrap();
    pipe.set_blocking(false).unwrap();

    let chunk = vec![0x5au8; 64 * 1024];
    let mut total = 0usize;
    let err = loop {
        match pipe.write(&chunk) {
            Ok(n) => {
                assert!(n <= chunk.len());
                total += n;
            }
            Err(e) => break e,
        }
    };
    assert!(total > 0);
    assert_eq!(err.raw_os_error(), Some(libc::EAGAIN));
}

#[test]
fn std_io_traits_work_over_the_pipe() {
    let mut pipe = Pipe::new();
    pipe.open().unwrap();

    pipe.write_all(b"line one\n").unwrap();
    let mut buf = [0u8; 9];
    pipe.read_exact(&mut buf).unwrap();
    assert_eq!(&buf, b"line one\n");

    let mut closed = Pipe::new();
    let e = Write::write(&mut closed, b"x").unwrap_err();
    assert_eq!(e.kind(), std::io::ErrorKind::NotConnected);
}

#[test]
fn byte_traits_delegate_to_read_and_write() {
    fn echo<C>(chan: &mut C, bytes: &[u8], dst: &mut [u8]) -> usize
    where
        C: ByteSink + ByteSource,
        <C as ByteSink>::Error: std::fmt::Debug,
        <C as ByteSource>::Error: std::fmt::Debug,
    {
        chan.send_bytes(bytes).unwrap();
        chan.recv_bytes(dst).unwrap()
    }

    let mut pipe = Pipe::new();
    pipe.open().unwrap();

    let mut buf = [0u8; 8];
    let n = echo(&mut pipe, b"ping", &mut buf);
    assert_eq!(&buf[..n], b"ping");
}
