//! # m1bridge Communication
//!
//! The duplex line channel and the job capture session.
//! Supports serial port, TCP socket, subprocess pipe and raw
//! file-descriptor transports, all normalized into "poll for readiness,
//! then read what is available".

pub mod capture;
pub mod channel;

pub use capture::{CaptureOutcome, CaptureSession, CaptureState, Job};
pub use channel::{
    fd::FdTransport, pipe::SubprocessTransport, serial::SerialTransport, tcp::TcpTransport,
    LineChannel, ReadLine, Transport,
};
