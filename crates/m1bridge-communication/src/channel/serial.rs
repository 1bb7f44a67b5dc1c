//! Serial port transport
//!
//! Opens one end of a (usually virtual) serial port pair, such as com0com
//! or tty0tty, on which the authoring application believes it is talking to
//! a grbl controller.

use crate::channel::{poll::wait_readable, Transport};
use m1bridge_core::ChannelError;
use std::io::{self, Read, Write};
use std::os::fd::{AsRawFd, BorrowedFd};
use std::time::Duration;

/// Serial port transport backed by the `serialport` crate.
pub struct SerialTransport {
    port: serialport::TTYPort,
}

impl SerialTransport {
    /// Open `path` at `baud_rate`.
    ///
    /// The port's own timeout is kept short; all waiting happens through
    /// the readiness poll so the channel sees the same timeout behavior as
    /// every other transport.
    pub fn open(path: &str, baud_rate: u32) -> Result<Self, ChannelError> {
        let port = serialport::new(path, baud_rate)
            .timeout(Duration::from_millis(10))
            .open_native()
            .map_err(|e| {
                tracing::warn!("Failed to open serial port {}: {}", path, e);
                ChannelError::FailedToOpen {
                    target: path.to_string(),
                    reason: e.to_string(),
                }
            })?;
        Ok(Self { port })
    }
}

impl Transport for SerialTransport {
    fn poll_readable(&self, timeout: Option<Duration>) -> io::Result<bool> {
        let fd = self.port.as_raw_fd();
        wait_readable(unsafe { BorrowedFd::borrow_raw(fd) }, timeout)
    }

    fn read_avail(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        // A TimedOut error here means no data within the short port
        // timeout; the channel maps it to "keep waiting".
        self.port.read(buf)
    }

    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        self.port.write(data)
    }

    fn flush(&mut self) -> io::Result<()> {
        Write::flush(&mut self.port)
    }

    fn kind(&self) -> &'static str {
        "serial"
    }
}
