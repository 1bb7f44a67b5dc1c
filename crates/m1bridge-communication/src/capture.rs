//! Job capture session
//!
//! A small state machine that assembles one complete job from an ack'd
//! line stream: `AwaitStart → Receiving → {Finalized, Discarded}`.
//!
//! Flow control is exactly one acknowledgment per received line; the sender
//! will not transmit its next line before seeing the ack. There is no
//! resend and no sequence numbering, so a lost ack or line is unrecoverable
//! within a session and the sender must restart the job.

use crate::channel::{LineChannel, ReadLine};
use m1bridge_core::{CaptureError, CaptureSettings, Result};
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Session state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureState {
    /// Waiting (without timeout) for a line containing the start sentinel.
    AwaitStart,
    /// Appending acknowledged lines to the job until the end sentinel or
    /// an inactivity timeout.
    Receiving,
    /// A complete job was captured and spooled.
    Finalized,
    /// The job had too few lines; the spool file was deleted.
    Discarded,
}

/// A captured job: the spool file holding its raw lines, and the count.
#[derive(Debug, Clone)]
pub struct Job {
    /// The spool file the raw lines were written to.
    pub spool: PathBuf,
    /// Number of lines recorded.
    pub line_count: usize,
}

/// Result of running a capture session to completion.
#[derive(Debug)]
pub enum CaptureOutcome {
    /// Enough lines arrived; the job is ready for translation.
    Completed(Job),
    /// Fewer than the minimum number of lines arrived; the spool file was
    /// deleted and no translation is attempted. A normal outcome, not an
    /// error: spurious or partial connections are noise, not jobs.
    Discarded {
        /// Lines that had been recorded before the job ended.
        line_count: usize,
    },
}

/// Captures exactly one job from a line channel.
///
/// The channel is borrowed exclusively for the duration of the session;
/// there is exactly one active job at a time.
pub struct CaptureSession<'a> {
    channel: &'a mut LineChannel,
    settings: CaptureSettings,
    state: CaptureState,
}

impl<'a> CaptureSession<'a> {
    /// Create a session over `channel` with the given settings.
    pub fn new(channel: &'a mut LineChannel, settings: CaptureSettings) -> Self {
        Self {
            channel,
            settings,
            state: CaptureState::AwaitStart,
        }
    }

    /// Current session state.
    pub fn state(&self) -> CaptureState {
        self.state
    }

    /// Run the session to completion, spooling raw lines to `spool`.
    ///
    /// Blocks indefinitely until a line containing the start sentinel
    /// arrives; from then on each wait is bounded by the inactivity
    /// timeout. An expired wait is the designed end-of-transmission
    /// signal, as is the peer closing the connection.
    pub fn run(&mut self, spool: &Path) -> Result<CaptureOutcome> {
        tracing::info!("waiting for first G-code line");
        let first_line = loop {
            match self.channel.readline(None)? {
                ReadLine::Line(line) => {
                    self.ack()?;
                    if line_contains(&line, &self.settings.start_sentinel) {
                        break line;
                    }
                    tracing::debug!(
                        line = %String::from_utf8_lossy(&line).trim_end(),
                        "ignoring line before job start"
                    );
                }
                // No timeout was set; keep waiting.
                ReadLine::TimedOut => continue,
            }
        };

        self.state = CaptureState::Receiving;
        tracing::info!(spool = %spool.display(), "job started");

        let mut file = File::create(spool).map_err(|e| spool_error(spool, e))?;
        let mut line_count = 0usize;
        self.record(&mut file, spool, &first_line, &mut line_count)?;

        let timeout = self.settings.inactivity_timeout();
        loop {
            match self.channel.readline(Some(timeout)) {
                Ok(ReadLine::Line(line)) => {
                    self.ack()?;
                    if line_contains(&line, &self.settings.end_sentinel) {
                        tracing::debug!("end sentinel received");
                        break;
                    }
                    self.record(&mut file, spool, &line, &mut line_count)?;
                }
                // Timeout while receiving commands: the sender has gone
                // silent, assume the job is done.
                Ok(ReadLine::TimedOut) => break,
                Err(e) if e.is_channel_closed() => break,
                Err(e) => return Err(e),
            }
        }
        drop(file);

        if line_count < self.settings.min_lines {
            self.state = CaptureState::Discarded;
            tracing::info!(line_count, "not enough lines, deleting spool file");
            std::fs::remove_file(spool).map_err(|e| spool_error(spool, e))?;
            return Ok(CaptureOutcome::Discarded { line_count });
        }

        self.state = CaptureState::Finalized;
        tracing::info!(line_count, spool = %spool.display(), "job captured");
        Ok(CaptureOutcome::Completed(Job {
            spool: spool.to_path_buf(),
            line_count,
        }))
    }

    fn ack(&mut self) -> Result<()> {
        self.channel
            .write_flush(self.settings.ack_token.as_bytes())
            .map_err(|e| CaptureError::AckFailed {
                reason: e.to_string(),
            })?;
        Ok(())
    }

    fn record(
        &self,
        file: &mut File,
        spool: &Path,
        line: &[u8],
        line_count: &mut usize,
    ) -> Result<()> {
        file.write_all(line).map_err(|e| spool_error(spool, e))?;
        *line_count += 1;
        Ok(())
    }
}

fn spool_error(spool: &Path, e: std::io::Error) -> CaptureError {
    CaptureError::SpoolIo {
        path: spool.display().to_string(),
        reason: e.to_string(),
    }
}

fn line_contains(line: &[u8], token: &str) -> bool {
    let token = token.as_bytes();
    !token.is_empty() && line.windows(token.len()).any(|window| window == token)
}
