//! Framing analyzer
//!
//! Computes the XY bounding box of everything a job actually cuts (moves
//! executed with laser power above zero) and renders a low-power outline
//! job tracing that box, for positioning material on the bed.

use m1bridge_core::{Result, TranslateError};
use regex::Regex;
use std::path::Path;
use std::sync::OnceLock;

const TRAVEL_GCODES: &[&str] = &["G0", "G1", "G00", "G01"];
const CUTTING_GCODES: &[&str] = &["G1", "G01"];
// Arc interpolation would need real geometry to frame correctly.
const UNSUPPORTED_GCODES: &[&str] = &["G2", "G3", "G02", "G03"];

/// Laser power used for the rendered outline, low enough to be harmless
/// but visible on most materials.
const OUTLINE_POWER: u32 = 5;

fn axis_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(X|Y)(-?[0-9.]+)").expect("invalid regex pattern"))
}

fn power_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"S(-?[0-9.]*)").expect("invalid regex pattern"))
}

/// XY bounding box of the cutting moves of a job.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameBounds {
    pub x_min: f64,
    pub x_max: f64,
    pub y_min: f64,
    pub y_max: f64,
}

/// Scans a job and tracks the area in which the laser is active.
pub struct GcodeFramer {
    relative_mode: bool,
    x: f64,
    y: f64,
    power: f64,
    is_cutting: bool,
    bounds: Option<FrameBounds>,
}

impl Default for GcodeFramer {
    fn default() -> Self {
        Self::new()
    }
}

impl GcodeFramer {
    pub fn new() -> Self {
        Self {
            relative_mode: false,
            x: 0.0,
            y: 0.0,
            power: 0.0,
            is_cutting: false,
            bounds: None,
        }
    }

    /// Bounding box of the cutting moves seen so far, or `None` if the job
    /// never fired the laser.
    pub fn bounds(&self) -> Option<FrameBounds> {
        self.bounds
    }

    /// Feed a whole job through the analyzer.
    pub fn analyze(&mut self, content: &str) -> Result<()> {
        for line in content.split('\n') {
            self.process_line(line)?;
        }
        Ok(())
    }

    /// Analyze the job stored at `path`.
    pub fn analyze_file(&mut self, path: &Path) -> Result<()> {
        let content = std::fs::read_to_string(path)?;
        self.analyze(&content)
    }

    pub fn process_line(&mut self, line: &str) -> Result<()> {
        // Comments start with ; or #.
        let code = line.split([';', '#']).next().unwrap_or("");
        if code.trim().is_empty() {
            return Ok(());
        }
        if code.contains("G91") {
            self.relative_mode = true;
            return Ok(());
        }
        if code.contains("G90") {
            self.relative_mode = false;
            return Ok(());
        }

        let command = code.trim().split_whitespace().next().unwrap_or("");
        if UNSUPPORTED_GCODES.contains(&command) {
            return Err(TranslateError::UnexpectedGcode {
                line: line.trim().to_string(),
            }
            .into());
        }
        if !TRAVEL_GCODES.contains(&command) {
            return Ok(());
        }

        if let Some(captures) = power_regex().captures(code) {
            self.power = captures[1].parse().map_err(|_| TranslateError::InvalidNumber {
                line: line.trim().to_string(),
            })?;
        }
        let starts_cutting;
        if CUTTING_GCODES.contains(&command) && self.power > 0.0 {
            starts_cutting = !self.is_cutting;
            self.is_cutting = true;
        } else {
            starts_cutting = false;
            self.is_cutting = false;
        }
        if starts_cutting {
            // The move starts from the current position.
            self.update_bounds(self.x, self.y);
        }

        for captures in axis_regex().captures_iter(code) {
            let value: f64 = captures[2].parse().map_err(|_| TranslateError::InvalidNumber {
                line: line.trim().to_string(),
            })?;
            let axis = match &captures[1] {
                "X" => &mut self.x,
                _ => &mut self.y,
            };
            if self.relative_mode {
                *axis += value;
            } else {
                *axis = value;
            }
            if self.is_cutting {
                self.update_bounds(self.x, self.y);
            }
        }
        Ok(())
    }

    /// Render a five-segment low-power outline of the cutting area, ending
    /// back at the origin. `None` if the job never cut anything.
    pub fn render_outline(&self) -> Option<String> {
        let b = self.bounds?;
        let (x_min, x_max) = (coord(b.x_min), coord(b.x_max));
        let (y_min, y_max) = (coord(b.y_min), coord(b.y_max));
        Some(format!(
            "G0 X{x_min} Y{y_min}\n\
             G1 F9600 S{OUTLINE_POWER}\n\
             G1 X{x_max} Y{y_min}\n\
             G1 X{x_max} Y{y_max}\n\
             G1 X{x_min} Y{y_max}\n\
             G1 X{x_min} Y{y_min}\n\
             G0 X0 Y0\n"
        ))
    }

    fn update_bounds(&mut self, x: f64, y: f64) {
        let b = self.bounds.get_or_insert(FrameBounds {
            x_min: x,
            x_max: x,
            y_min: y,
            y_max: y,
        });
        b.x_min = b.x_min.min(x);
        b.x_max = b.x_max.max(x);
        b.y_min = b.y_min.min(y);
        b.y_max = b.y_max.max(y);
    }
}

/// Device coordinates are meaningful to a hundredth of a millimeter.
fn coord(value: f64) -> f64 {
    (value * 1e4).round() / 1e4
}
