//! # m1bridge Translator
//!
//! Turns the Marlin-flavored G-code LightBurn emits into the dialect the
//! xTool M1 accepts, and analyzes jobs for framing.

pub mod framer;
pub mod translator;

pub use framer::{FrameBounds, GcodeFramer};
pub use translator::{GcodeTranslator, LineOutcome, END_GCODE, START_GCODE};
