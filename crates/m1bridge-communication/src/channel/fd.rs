//! Raw file-descriptor transport
//!
//! Wraps a read descriptor and an optional write descriptor, for stdio
//! bridging and for tests driving the channel over a socketpair.

use crate::channel::{poll::wait_readable, Transport};
use m1bridge_core::ChannelError;
use std::fs::File;
use std::io::{self, Read, Write};
use std::os::fd::{AsFd, FromRawFd, RawFd};
use std::time::Duration;

/// Transport over raw file descriptors.
///
/// Takes ownership of the descriptors; they are closed on drop.
pub struct FdTransport {
    reader: File,
    writer: Option<File>,
}

impl FdTransport {
    /// Wrap `read_fd` for reading and, if given, `write_fd` for writing.
    pub fn from_raw(read_fd: RawFd, write_fd: Option<RawFd>) -> Result<Self, ChannelError> {
        if read_fd < 0 || write_fd.is_some_and(|fd| fd < 0) {
            return Err(ChannelError::UnsupportedTransport {
                kind: format!("invalid file descriptor pair ({read_fd}, {write_fd:?})"),
            });
        }
        // Safety: the caller hands over ownership of valid, open
        // descriptors; nothing else may close them afterwards.
        let reader = unsafe { File::from_raw_fd(read_fd) };
        let writer = write_fd.map(|fd| unsafe { File::from_raw_fd(fd) });
        Ok(Self { reader, writer })
    }

    /// Read from stdin, write to stdout. The process's stdio belongs to
    /// the transport from here on.
    pub fn stdio() -> Result<Self, ChannelError> {
        Self::from_raw(0, Some(1))
    }
}

impl Transport for FdTransport {
    fn poll_readable(&self, timeout: Option<Duration>) -> io::Result<bool> {
        wait_readable(self.reader.as_fd(), timeout)
    }

    fn read_avail(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.reader.read(buf)
    }

    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        match self.writer.as_mut() {
            Some(writer) => writer.write(data),
            None => Err(io::Error::new(
                io::ErrorKind::Unsupported,
                "no write descriptor configured",
            )),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self.writer.as_mut() {
            Some(writer) => writer.flush(),
            None => Ok(()),
        }
    }

    fn kind(&self) -> &'static str {
        "fd"
    }
}
