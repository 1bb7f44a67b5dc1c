//! # m1bridge Core
//!
//! Core error types, configuration and shared constants for m1bridge.
//! Every other crate in the workspace depends on this one; it depends on
//! nothing but `thiserror`, `serde` and `toml`.

pub mod config;
pub mod constants;
pub mod error;

pub use config::{CaptureSettings, Config, DeviceSettings, TranslatorSettings};
pub use error::{CaptureError, ChannelError, DeviceError, Error, Result, TranslateError};
