use std::io::{self, Read};

use log::trace;
use thiserror::Error;

use crate::{
    ext::{ReadWrite, WriteExt},
    irc::client::{ClientMessage, ClientMessageToStringErr},
};

// the size of the receive buffer to allocate, in bytes.
const BUFFER_SIZE: usize = 16 * 1024;

#[derive(Debug, Error)]
pub enum MessagePollErr {
    #[error("the connection was closed")]
    Closed,
    #[error("polling was unsuccessful after {} retries", .0)]
    TooManyRetries(u8),
    #[error(transparent)]
    Io(#[from] io::Error),
}

#[derive(Debug, Error)]
pub enum MsgWriteErr {
    #[error(transparent)]
    MessageToStrErr(#[from] ClientMessageToStringErr),
    #[error(transparent)]
    Io(#[from] io::Error),
}

/// frames a byte stream into IRC lines and writes client messages back to it
pub struct ServerIo {
    connection: Box<dyn ReadWrite + Send>,
    buffer: Box<[u8; BUFFER_SIZE]>,
    line_buffer: String,
    // a UTF-8 character can be split across two reads. its leading bytes are moved to the start
    // of `buffer` and the next read lands after them.
    recv_idx: u8,
}

impl ServerIo {
    pub fn new(connection: Box<dyn ReadWrite + Send>) -> Self {
        Self {
            connection,
            buffer: Box::new([0_u8; BUFFER_SIZE]),
            line_buffer: String::new(),
            recv_idx: 0,
        }
    }

    pub fn write(&mut self, msg: &ClientMessage) -> Result<(), MsgWriteErr> {
        let line = msg.irc_str()?;
        trace!("<- {:?}", line.trim_end_matches("\r\n"));
        self.connection.write_all_blocking(line.as_bytes())?;
        Ok(())
    }

    /// reads whatever is available and returns the complete lines, without their CRLF. returns an
    /// empty list when nothing is ready yet.
    pub fn recv(&mut self) -> Result<Vec<String>, MessagePollErr> {
        const MAX_RETRIES: u8 = 5;
        let mut retry_count = 0;
        let start = usize::from(self.recv_idx);
        let count = loop {
            match self.connection.read(&mut self.buffer[start..]) {
                // TCP streams return Ok(0) once the other side closed the connection
                Ok(0) => return Err(MessagePollErr::Closed),
                Ok(count) => break count,
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => return Ok(Vec::new()),
                Err(e) if e.kind() != io::ErrorKind::Interrupted => return Err(e.into()),
                Err(_) if retry_count > MAX_RETRIES => {
                    return Err(MessagePollErr::TooManyRetries(retry_count));
                }
                Err(_) => retry_count += 1,
            }
        };

        let (decoded, truncated) = from_utf8_lossy_split(&self.buffer[..start + count]);
        self.line_buffer.push_str(&decoded);
        let truncated = truncated.to_vec();
        debug_assert!(truncated.len() <= 3);
        self.buffer[..truncated.len()].copy_from_slice(&truncated);
        self.recv_idx = truncated.len() as u8;

        let mut lines = Vec::new();
        while let Some(idx) = self.line_buffer.find("\r\n") {
            let rest = self.line_buffer.split_off(idx + 2);
            let mut line = core::mem::replace(&mut self.line_buffer, rest);
            line.truncate(idx);

            // clients should ignore empty lines
            if !line.is_empty() {
                lines.push(line);
            }
        }

        Ok(lines)
    }
}

// decodes a byte slice as UTF-8, replacing invalid sequences. an incomplete character at the very
// end is returned separately so that it can be completed by the next read.
fn from_utf8_lossy_split(b: &[u8]) -> (String, &[u8]) {
    let mut s = String::new();
    let mut chunks = b.utf8_chunks().peekable();
    while let Some(chunk) = chunks.next() {
        s.push_str(chunk.valid());
        if !chunk.invalid().is_empty() {
            if chunks.peek().is_some() {
                s.push(char::REPLACEMENT_CHARACTER);
            } else {
                return (s, chunk.invalid());
            }
        }
    }

    (s, &[])
}
