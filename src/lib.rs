//! # m1bridge
//!
//! Receives G-code streamed by LightBurn, translates it into the dialect
//! the xTool M1 accepts, and uploads it to the device.
//!
//! ## Architecture
//!
//! The workspace is organized into four crates plus this binary:
//!
//! 1. **m1bridge-core** - Error types, configuration, shared constants
//! 2. **m1bridge-communication** - Duplex line channel (serial, TCP,
//!    subprocess pipe, raw fd) and the job capture session
//! 3. **m1bridge-translator** - LightBurn-to-M1 translation pipeline and
//!    the framing analyzer
//! 4. **m1bridge-device** - HTTP control client and job uploader
//!
//! The binary wires them together: capture a job, translate it, show the
//! operator what was filtered, and upload on request.

pub mod cli;
pub mod relay;
pub mod storage;

pub use m1bridge_core::{Config, Error, Result};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Initialize logging with the default configuration
///
/// Sets up structured logging with:
/// - Console output on stderr (stdout carries the operator prompt)
/// - RUST_LOG environment variable support
pub fn init_logging() -> anyhow::Result<()> {
    use tracing_subscriber::fmt;
    use tracing_subscriber::prelude::*;
    use tracing_subscriber::EnvFilter;

    let env_filter = EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into());

    let fmt_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_level(true);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .init();

    Ok(())
}
