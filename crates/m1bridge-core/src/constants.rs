//! Protocol and safety constants shared across the workspace.
//!
//! All of these are overridable through the settings structs in
//! [`crate::config`]; the values here are the design defaults.

/// Sentinel substring marking the start of a job. LightBurn users put this
/// into "Start G-code" as a plain line.
pub const START_SENTINEL: &str = "LASER_JOB_START";

/// Sentinel substring marking the end of a job. Put into "End G-code" in
/// LightBurn, followed by a newline.
pub const END_SENTINEL: &str = "LASER_CUT_DONE";

/// Acknowledgment written back after every received line. The sender will
/// not transmit its next line before seeing this; that is the whole
/// backpressure mechanism.
pub const ACK_TOKEN: &str = "ok\n";

/// Inactivity timeout while receiving, in milliseconds. An expired wait
/// means the sender has gone silent and the job is complete.
pub const INACTIVITY_TIMEOUT_MS: u64 = 1000;

/// Jobs with fewer lines than this are discarded as noise from spurious or
/// partial connections.
pub const MIN_JOB_LINES: usize = 4;

/// Marker prefix for commented-out (filtered) lines in translated output.
pub const FILTERED_PREFIX: &str = ";--";

/// Actual device Z coordinate for a material thickness of 0.
pub const ZERO_OFFSET_Z: f64 = 17.0;

/// Lowest allowed device Z coordinate. This is to prevent crashing the
/// tool head into the bed.
pub const LOWEST_Z_HEIGHT: f64 = 35.0;

/// Feed rate substituted for a literal zero. A zero feed rate hangs the
/// M1 firmware.
pub const SAFE_FEED_RATE: u32 = 9600;

/// Default TCP port to listen on for a grbl-TCP connection from LightBurn.
pub const DEFAULT_TCP_PORT: u16 = 2323;

/// IP of the laser cutter when connected via USB (which is a network
/// interface).
pub const USB_DEVICE_IP: &str = "201.234.3.1";

/// HTTP control port of the device.
pub const DEVICE_PORT: u16 = 8080;

/// HTTP port of the device camera service.
pub const CAMERA_PORT: u16 = 8329;
