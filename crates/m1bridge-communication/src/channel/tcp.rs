//! TCP transport
//!
//! Listens for a single grbl-TCP connection from the authoring application.
//! There is no reconnect logic: one session, one stream.

use crate::channel::{poll::wait_readable, Transport};
use m1bridge_core::ChannelError;
use std::io::{self, Read, Write};
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::os::fd::{AsRawFd, BorrowedFd};
use std::time::Duration;

/// TCP stream transport.
pub struct TcpTransport {
    stream: TcpStream,
    peer: SocketAddr,
}

impl TcpTransport {
    /// Bind `127.0.0.1:port` and block until one client connects.
    pub fn listen(port: u16) -> Result<Self, ChannelError> {
        let listener = TcpListener::bind(("127.0.0.1", port)).map_err(|e| {
            ChannelError::FailedToOpen {
                target: format!("127.0.0.1:{}", port),
                reason: e.to_string(),
            }
        })?;
        tracing::info!(port, "waiting for TCP connection");
        let (stream, peer) = listener.accept().map_err(ChannelError::Io)?;
        tracing::info!(%peer, "client connected");
        Self::from_stream(stream, peer)
    }

    /// Wrap an already-accepted stream.
    pub fn from_stream(stream: TcpStream, peer: SocketAddr) -> Result<Self, ChannelError> {
        stream.set_nonblocking(true).map_err(ChannelError::Io)?;
        // Acks are single short lines; don't let Nagle hold them back.
        stream.set_nodelay(true).map_err(ChannelError::Io)?;
        Ok(Self { stream, peer })
    }

    /// Address of the connected peer.
    pub fn peer(&self) -> SocketAddr {
        self.peer
    }
}

impl Transport for TcpTransport {
    fn poll_readable(&self, timeout: Option<Duration>) -> io::Result<bool> {
        let fd = self.stream.as_raw_fd();
        wait_readable(unsafe { BorrowedFd::borrow_raw(fd) }, timeout)
    }

    fn read_avail(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.stream.read(buf)
    }

    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        self.stream.write(data)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.stream.flush()
    }

    fn kind(&self) -> &'static str {
        "tcp"
    }
}
