//! Duplex line channel
//!
//! Uniform non-blocking, timeout-bounded byte/line I/O over heterogeneous
//! transports. Each transport normalizes its native read semantics into
//! "poll for readiness, then read what is available"; [`LineChannel`] adds
//! line framing with a single deadline tracked across repeated polls.

pub mod fd;
pub mod pipe;
mod poll;
pub mod serial;
pub mod tcp;

use m1bridge_core::{ChannelError, Result};
use std::io;
use std::time::{Duration, Instant};

/// Chunk size for a single transport read.
const READ_SIZE: usize = 128;

/// Capability set every transport must provide.
///
/// `read_avail` follows one convention across all implementations:
/// `Ok(0)` means the peer closed the stream; "no data right now" is
/// reported as an [`io::ErrorKind::WouldBlock`] or
/// [`io::ErrorKind::TimedOut`] error and the channel keeps waiting.
pub trait Transport: Send {
    /// Wait until the transport is readable or the timeout expires.
    /// `None` blocks indefinitely.
    fn poll_readable(&self, timeout: Option<Duration>) -> io::Result<bool>;

    /// Read available bytes into `buf` without waiting for more.
    fn read_avail(&mut self, buf: &mut [u8]) -> io::Result<usize>;

    /// Write bytes, returning the count written.
    fn write(&mut self, data: &[u8]) -> io::Result<usize>;

    /// Flush buffered output, if the transport buffers at all.
    fn flush(&mut self) -> io::Result<()>;

    /// Short transport name for logging.
    fn kind(&self) -> &'static str;
}

/// Outcome of a [`LineChannel::readline`] call.
///
/// A timed-out wait and a received line are distinct outcomes; emptiness is
/// never reused as a signal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadLine {
    /// A complete line, including the separator, with any `\r\n` normalized
    /// to `\n`.
    Line(Vec<u8>),
    /// The cumulative wait exceeded the timeout before a separator arrived.
    TimedOut,
}

impl ReadLine {
    /// The line bytes, if a line was received.
    pub fn into_line(self) -> Option<Vec<u8>> {
        match self {
            ReadLine::Line(line) => Some(line),
            ReadLine::TimedOut => None,
        }
    }
}

/// `readline()` with a timeout for different types of communication channel.
///
/// Owns an internal accumulation buffer that holds at most one pending
/// partial line between calls. The buffer is exclusively owned by the
/// session thread; there is no interior locking.
pub struct LineChannel {
    transport: Box<dyn Transport>,
    buffer: Vec<u8>,
}

impl LineChannel {
    /// Wrap a transport.
    pub fn new(transport: Box<dyn Transport>) -> Self {
        tracing::debug!(kind = transport.kind(), "opened line channel");
        Self {
            transport,
            buffer: Vec::new(),
        }
    }

    /// Write bytes to the transport.
    pub fn write(&mut self, data: &[u8]) -> Result<usize> {
        let count = self.transport.write(data).map_err(ChannelError::Io)?;
        Ok(count)
    }

    /// Flush the transport's output.
    pub fn flush(&mut self) -> Result<()> {
        self.transport.flush().map_err(ChannelError::Io)?;
        Ok(())
    }

    /// Write then flush, as one operation. Acknowledgments must reach the
    /// sender promptly; it will not transmit its next line before seeing
    /// one.
    pub fn write_flush(&mut self, data: &[u8]) -> Result<usize> {
        let count = self.write(data)?;
        self.flush()?;
        Ok(count)
    }

    /// Read up to `max_len` bytes.
    ///
    /// Already-buffered bytes are returned immediately. Otherwise waits up
    /// to `timeout` for readability, reads one chunk, and returns up to
    /// `max_len` bytes; returns an empty vector if the wait expires.
    pub fn read(&mut self, max_len: usize, timeout: Option<Duration>) -> Result<Vec<u8>> {
        if self.buffer.is_empty() && self.transport.poll_readable(timeout).map_err(ChannelError::Io)? {
            let mut chunk = vec![0u8; READ_SIZE.max(max_len)];
            match self.transport.read_avail(&mut chunk) {
                Ok(n) => self.buffer.extend_from_slice(&chunk[..n]),
                Err(e) if is_no_data(&e) => {}
                Err(e) => return Err(ChannelError::Io(e).into()),
            }
        }
        if self.buffer.is_empty() {
            return Ok(Vec::new());
        }
        let take = max_len.min(self.buffer.len());
        Ok(self.buffer.drain(..take).collect())
    }

    /// Read one newline-terminated line, waiting at most `timeout`.
    pub fn readline(&mut self, timeout: Option<Duration>) -> Result<ReadLine> {
        self.readline_with(timeout, b'\n')
    }

    /// Read one `separator`-terminated line, waiting at most `timeout`.
    ///
    /// The timeout is tracked against a single deadline, decremented across
    /// repeated polls. The returned line includes the separator; a `\r`
    /// directly before a `\n` is removed (TTYs on Linux may add carriage
    /// returns before newlines).
    pub fn readline_with(&mut self, timeout: Option<Duration>, separator: u8) -> Result<ReadLine> {
        let deadline = timeout.map(|t| Instant::now() + t);

        loop {
            if let Some(pos) = self.buffer.iter().position(|&b| b == separator) {
                let mut line: Vec<u8> = self.buffer.drain(..=pos).collect();
                strip_carriage_returns(&mut line);
                return Ok(ReadLine::Line(line));
            }

            let remaining = match deadline {
                None => None,
                Some(d) => {
                    let remaining = d.saturating_duration_since(Instant::now());
                    if remaining.is_zero() {
                        return Ok(ReadLine::TimedOut);
                    }
                    Some(remaining)
                }
            };

            if !self
                .transport
                .poll_readable(remaining)
                .map_err(ChannelError::Io)?
            {
                return Ok(ReadLine::TimedOut);
            }

            let mut chunk = [0u8; READ_SIZE];
            match self.transport.read_avail(&mut chunk) {
                Ok(0) => return Err(ChannelError::Closed.into()),
                Ok(n) => self.buffer.extend_from_slice(&chunk[..n]),
                Err(e) if is_no_data(&e) => {}
                Err(e) => return Err(ChannelError::Io(e).into()),
            }
        }
    }

    /// Bytes currently buffered between calls.
    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }
}

/// Transport read errors that mean "nothing available yet", not failure.
fn is_no_data(e: &io::Error) -> bool {
    matches!(
        e.kind(),
        io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut
    )
}

/// Remove every `\r` that directly precedes a `\n`.
fn strip_carriage_returns(line: &mut Vec<u8>) {
    let mut i = 0;
    while i + 1 < line.len() {
        if line[i] == b'\r' && line[i + 1] == b'\n' {
            line.remove(i);
        } else {
            i += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::strip_carriage_returns;

    #[test]
    fn strips_cr_before_nl_only() {
        let mut line = b"a\r\nb\rc\r\n".to_vec();
        strip_carriage_returns(&mut line);
        assert_eq!(line, b"a\nb\rc\n");
    }
}
