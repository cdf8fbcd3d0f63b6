//! the connection to a server, run on its own thread.
//!
//! the transport thread owns the stream and polls it for both directions, because a TLS stream
//! can't be split into a reading and a writing half. it talks to the event loop through channels:
//! lines go out as [`TransportEvent`]s and [`ClientMessage`]s come in to be written.

mod server_io;

use core::time::Duration;
use std::{
    io,
    net::TcpStream,
    sync::{
        mpsc::{Receiver, Sender, TryRecvError},
        Arc,
    },
    thread::{self, JoinHandle},
};

use log::*;
use rustls::{
    pki_types::{InvalidDnsNameError, ServerName},
    ClientConfig, ClientConnection, RootCertStore, StreamOwned,
};
use thiserror::Error;

pub use self::server_io::{MessagePollErr, MsgWriteErr, ServerIo};
use crate::{ext::ReadWrite, irc::client::ClientMessage};

// how long the transport thread sleeps when there was nothing to read or write
const POLL_DELAY: Duration = Duration::from_millis(10);

#[derive(Debug, Error)]
pub enum ConnectErr {
    #[error("unable to determine the host name of {0:?}")]
    MissingHost(String),
    #[error("could not parse server name")]
    InvalidServerName(#[from] InvalidDnsNameError),
    #[error("could not create TLS connection")]
    Tls(#[from] rustls::Error),
    #[error(transparent)]
    Io(#[from] io::Error),
}

/// what the transport thread reports to the event loop
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    /// a line from the server, without its CRLF
    Line(String),
    /// the connection is gone. carries the error that closed it, if any.
    Closed(Option<String>),
}

/// the host part of a `host:port` address
pub fn host_name(addr: &str) -> Option<&str> {
    let (host, _) = addr.rsplit_once(':')?;
    (!host.is_empty()).then_some(host)
}

/// opens a non-blocking connection to `addr`, given as `host:port`, optionally wrapped in TLS
/// checked against Mozilla's root certificates.
pub fn connect(addr: &str, tls: bool) -> Result<ServerIo, ConnectErr> {
    let Some(host) = host_name(addr) else {
        return Err(ConnectErr::MissingHost(addr.to_string()));
    };

    let stream = TcpStream::connect(addr)?;
    // reads and writes happen on one thread, so neither may block the other
    stream.set_nonblocking(true)?;
    let stream: Box<dyn ReadWrite + Send> = if tls {
        let root_store = RootCertStore::from_iter(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());
        let config = Arc::new(
            ClientConfig::builder()
                .with_root_certificates(root_store)
                .with_no_client_auth(),
        );
        let server_name = ServerName::try_from(host.to_string())?;
        let client = ClientConnection::new(config, server_name)?;
        Box::new(StreamOwned::new(client, stream))
    } else {
        Box::new(stream)
    };

    info!("connected to {} (tls: {})", addr, tls);
    Ok(ServerIo::new(stream))
}

/// moves the connection to its own thread. messages sent to `writes` are written to the server
/// and everything read is sent to `events`.
///
/// the session drops its sender once it disconnects. the thread then writes what is left, closes
/// the connection and reports [`TransportEvent::Closed`]. it also ends when `events` is
/// disconnected.
pub fn spawn<T>(mut io: ServerIo, writes: Receiver<ClientMessage>, events: Sender<T>) -> JoinHandle<()>
where
    T: From<TransportEvent> + Send + 'static,
{
    thread::spawn(move || {
        let closed = |reason: Option<String>| {
            let _ = events.send(TransportEvent::Closed(reason).into());
        };

        loop {
            let mut idle = true;

            // write everything queued so far
            loop {
                match writes.try_recv() {
                    Ok(msg) => {
                        idle = false;
                        if let Err(e) = io.write(&msg) {
                            error!("failed to write {:?}: {}", msg, e);
                            if matches!(e, MsgWriteErr::Io(_)) {
                                return closed(Some(e.to_string()));
                            }
                        }
                    }
                    Err(TryRecvError::Empty) => break,
                    Err(TryRecvError::Disconnected) => {
                        debug!("writer channel disconnected, closing the connection");
                        return closed(None);
                    }
                }
            }

            match io.recv() {
                Ok(lines) => {
                    for line in lines {
                        idle = false;
                        if events.send(TransportEvent::Line(line).into()).is_err() {
                            return;
                        }
                    }
                }
                Err(MessagePollErr::Closed) => {
                    info!("connection closed by the server");
                    return closed(None);
                }
                Err(e) => {
                    error!("failed to read from the connection: {}", e);
                    return closed(Some(e.to_string()));
                }
            }

            if idle {
                thread::sleep(POLL_DELAY);
            }
        }
    })
}
