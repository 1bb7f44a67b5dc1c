//! Subprocess pipe transport
//!
//! Talks to a helper process over its stdio pipes, e.g. a bridge binary
//! that owns the actual network listener. The child's stdout is our read
//! side, its stdin our write side.

use crate::channel::{poll::wait_readable, Transport};
use m1bridge_core::ChannelError;
use std::io::{self, Read, Write};
use std::os::fd::{AsRawFd, BorrowedFd};
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};
use std::time::Duration;

/// Transport over a child process's stdio pipes.
#[derive(Debug)]
pub struct SubprocessTransport {
    child: Child,
    stdout: ChildStdout,
    stdin: ChildStdin,
}

impl SubprocessTransport {
    /// Spawn `command` with piped stdio and attach to it.
    pub fn spawn(command: &str, args: &[String]) -> Result<Self, ChannelError> {
        let child = Command::new(command)
            .args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .spawn()
            .map_err(|e| ChannelError::FailedToOpen {
                target: command.to_string(),
                reason: e.to_string(),
            })?;
        Self::from_child(child)
    }

    /// Attach to an already-spawned child.
    ///
    /// Fails with a configuration error unless both stdin and stdout were
    /// set up as pipes.
    pub fn from_child(mut child: Child) -> Result<Self, ChannelError> {
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| ChannelError::UnsupportedTransport {
                kind: "subprocess without piped stdout".to_string(),
            })?;
        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| ChannelError::UnsupportedTransport {
                kind: "subprocess without piped stdin".to_string(),
            })?;
        Ok(Self {
            child,
            stdout,
            stdin,
        })
    }
}

impl Transport for SubprocessTransport {
    fn poll_readable(&self, timeout: Option<Duration>) -> io::Result<bool> {
        let fd = self.stdout.as_raw_fd();
        wait_readable(unsafe { BorrowedFd::borrow_raw(fd) }, timeout)
    }

    fn read_avail(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.stdout.read(buf)
    }

    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        self.stdin.write(data)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.stdin.flush()
    }

    fn kind(&self) -> &'static str {
        "subprocess"
    }
}

impl Drop for SubprocessTransport {
    fn drop(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}
