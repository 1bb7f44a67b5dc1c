//! Readiness waiting shared by all transports.
//!
//! Every transport exposes blocking reads with different semantics (serial
//! ports, pipes, sockets). Waiting on the underlying descriptor with
//! `poll(2)` first and only then reading gives identical timeout behavior
//! regardless of transport.

use nix::poll::{poll, PollFd, PollFlags, PollTimeout};
use std::io;
use std::os::fd::BorrowedFd;
use std::time::{Duration, Instant};

/// Wait until `fd` is readable or `timeout` expires.
///
/// `None` blocks indefinitely. Returns `Ok(false)` only once the full
/// timeout has elapsed; a single `poll` call is capped at `u16::MAX`
/// milliseconds, so longer waits loop against a deadline.
pub(crate) fn wait_readable(fd: BorrowedFd<'_>, timeout: Option<Duration>) -> io::Result<bool> {
    let deadline = timeout.map(|t| Instant::now() + t);

    loop {
        let poll_timeout = match deadline {
            None => PollTimeout::NONE,
            Some(d) => {
                let remaining = d.saturating_duration_since(Instant::now());
                if remaining.is_zero() {
                    return Ok(false);
                }
                PollTimeout::from(remaining.as_millis().min(u16::MAX as u128) as u16)
            }
        };

        let mut fds = [PollFd::new(fd, PollFlags::POLLIN)];
        match poll(&mut fds, poll_timeout) {
            // Expired or capped; the deadline check at the top decides.
            Ok(0) => {}
            Ok(_) => return Ok(true),
            Err(nix::errno::Errno::EINTR) => {
                // Interrupted wait aborts the caller's capture.
                return Err(io::Error::new(
                    io::ErrorKind::Interrupted,
                    "wait interrupted by signal",
                ));
            }
            Err(e) => return Err(io::Error::other(format!("poll failed: {}", e))),
        }
    }
}
