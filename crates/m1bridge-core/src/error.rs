//! Error handling for m1bridge
//!
//! Provides error types for all layers of the application:
//! - Channel errors (transport construction and I/O)
//! - Capture errors (job reception and spooling)
//! - Translate errors (G-code classification and safety checks)
//! - Device errors (HTTP control API)
//!
//! All error types use `thiserror` for ergonomic error handling.

use thiserror::Error;

/// Channel error type
///
/// Represents errors raised by the duplex line channel, including transport
/// construction failures and I/O failures during reads and acks.
#[derive(Error, Debug)]
pub enum ChannelError {
    /// The supplied channel object is not a supported transport kind
    #[error("Unsupported communication channel: {kind}")]
    UnsupportedTransport {
        /// Description of the rejected channel object.
        kind: String,
    },

    /// Failed to open the underlying transport
    #[error("Failed to open {target}: {reason}")]
    FailedToOpen {
        /// The port, address or descriptor that failed to open.
        target: String,
        /// The reason the open failed.
        reason: String,
    },

    /// The peer closed the connection
    #[error("Channel closed by peer")]
    Closed,

    /// I/O error on the transport
    #[error("Channel I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Capture error type
///
/// Represents errors during job capture. A receive timeout is *not* an
/// error: it is the designed end-of-transmission signal and is reported
/// through the capture outcome instead.
#[derive(Error, Debug)]
pub enum CaptureError {
    /// Writing the acknowledgment token back to the sender failed
    #[error("Failed to acknowledge line: {reason}")]
    AckFailed {
        /// The reason the ack write failed.
        reason: String,
    },

    /// Writing the job spool file failed
    #[error("Failed to write job spool {path}: {reason}")]
    SpoolIo {
        /// The spool file path.
        path: String,
        /// The reason for the I/O failure.
        reason: String,
    },
}

/// Translate error type
///
/// Any of these fails the whole job: no partial output is ever produced.
#[derive(Error, Debug, Clone)]
pub enum TranslateError {
    /// A command token in neither the allow-set nor the reject-set.
    ///
    /// Fail-closed by design: unknown commands must be triaged by a human
    /// and explicitly added to one of the two sets, never passed to
    /// hardware.
    #[error("Unknown G-code: {line}. Please investigate and decide whether to add it to the rejectable set")]
    UnexpectedGcode {
        /// The offending line.
        line: String,
    },

    /// A remapped Z coordinate fell outside the allowed range.
    ///
    /// Never auto-clamped: clamping could silently alter cut depth.
    #[error("Z={computed} outside of allowed range [{min}...{max}]. Original G-code was {line}")]
    ZOutOfRange {
        /// The offending line.
        line: String,
        /// The computed device-space Z value.
        computed: f64,
        /// Lower bound (inclusive).
        min: f64,
        /// Upper bound (inclusive).
        max: f64,
    },

    /// A numeric parameter could not be parsed
    #[error("Malformed numeric parameter in line: {line}")]
    InvalidNumber {
        /// The offending line.
        line: String,
    },
}

/// Device error type
///
/// Represents errors talking to the laser cutter's HTTP control API.
#[derive(Error, Debug, Clone)]
pub enum DeviceError {
    /// HTTP transport failure
    #[error("Device request failed: {reason}")]
    Http {
        /// The reason the request failed.
        reason: String,
    },

    /// Device returned a non-success HTTP status
    #[error("Device returned HTTP status {status} for {url}")]
    Status {
        /// The HTTP status code.
        status: u16,
        /// The request URL.
        url: String,
    },

    /// Device is not idle and cannot accept an upload
    #[error("Device is busy, refusing to upload")]
    Busy,

    /// Device reply could not be interpreted
    #[error("Unexpected device reply: {reason}")]
    UnexpectedReply {
        /// The reason the reply could not be interpreted.
        reason: String,
    },

    /// Requested tool type is not supported
    #[error("Only Laser G-code is currently supported, not {tool}")]
    UnsupportedTool {
        /// The requested tool type.
        tool: String,
    },
}

/// Main error type for m1bridge
///
/// A unified error type that can represent any error from all layers.
/// This is the primary error type used in public APIs.
#[derive(Error, Debug)]
pub enum Error {
    /// Channel error
    #[error(transparent)]
    Channel(#[from] ChannelError),

    /// Capture error
    #[error(transparent)]
    Capture(#[from] CaptureError),

    /// Translate error
    #[error(transparent)]
    Translate(#[from] TranslateError),

    /// Device error
    #[error(transparent)]
    Device(#[from] DeviceError),

    /// Standard I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create an error from a string message
    pub fn other(msg: impl Into<String>) -> Self {
        Error::Other(msg.into())
    }

    /// Check if this is a translation error
    pub fn is_translate_error(&self) -> bool {
        matches!(self, Error::Translate(_))
    }

    /// Check if this is a device error
    pub fn is_device_error(&self) -> bool {
        matches!(self, Error::Device(_))
    }

    /// Check if the peer closed the channel
    pub fn is_channel_closed(&self) -> bool {
        matches!(self, Error::Channel(ChannelError::Closed))
    }
}

/// Result type using Error
pub type Result<T> = std::result::Result<T, Error>;
