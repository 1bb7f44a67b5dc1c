//! # m1bridge Device
//!
//! Blocking HTTP control client for the xTool M1: status, immediate G-code
//! commands, camera access and translated job uploads.

pub mod client;

pub use client::{DeviceStatus, M1Device, MaterialThickness};
