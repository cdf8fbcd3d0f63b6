use std::{
    io::{self, Read, Write},
    thread,
};

pub trait StrExt {
    /// splits off the first character of the string if it is `c`
    fn split_prefix(&self, c: char) -> Option<(char, &str)>;
}

impl StrExt for str {
    fn split_prefix(&self, c: char) -> Option<(char, &str)> {
        self.strip_prefix(c).map(|rest| (c, rest))
    }
}

/// a bidirectional byte stream, like a `TcpStream` or a TLS stream wrapping one
pub trait ReadWrite: Read + Write {}

impl<T: Read + Write> ReadWrite for T {}

pub trait WriteExt: Write {
    /// like `write_all`, but keeps retrying while a non-blocking stream reports `WouldBlock`.
    fn write_all_blocking(&mut self, mut buf: &[u8]) -> io::Result<()> {
        while !buf.is_empty() {
            match self.write(buf) {
                Ok(0) => return Err(io::ErrorKind::WriteZero.into()),
                Ok(count) => buf = &buf[count..],
                Err(e) if is_retry(&e) => thread::yield_now(),
                Err(e) => return Err(e),
            }
        }

        // TLS streams only hand their records to the socket on flush
        loop {
            match self.flush() {
                Ok(()) => return Ok(()),
                Err(e) if is_retry(&e) => thread::yield_now(),
                Err(e) => return Err(e),
            }
        }
    }
}

impl<W: Write + ?Sized> WriteExt for W {}

fn is_retry(e: &io::Error) -> bool {
    matches!(
        e.kind(),
        io::ErrorKind::WouldBlock | io::ErrorKind::Interrupted
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_prefix_only_matches_first_char() {
        assert_eq!("/join #a".split_prefix('/'), Some(('/', "join #a")));
        assert_eq!("join /a".split_prefix('/'), None);
        assert_eq!("".split_prefix('/'), None);
    }

    #[test]
    fn write_all_blocking_writes_everything() {
        let mut out = Vec::new();
        out.write_all_blocking(b"PING :x\r\n").unwrap();
        assert_eq!(out, b"PING :x\r\n");
    }
}
