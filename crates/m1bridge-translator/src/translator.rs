//! LightBurn-to-M1 G-code translation
//!
//! LightBurn emits Marlin-flavored G-code. The M1 firmware understands only
//! a small subset of it and crashes or hangs on several commands Marlin
//! tolerates, so every line is either transformed, commented out, or causes
//! the whole job to be rejected.
//!
//! Z coordinates additionally change meaning: on the M1 positive Z points
//! down, and the focus height for a material thickness of zero sits at
//! Z=17. Every Z value in a move is therefore inverted and offset so that
//! the material thickness set in LightBurn becomes the correct head height.

use m1bridge_core::constants::{FILTERED_PREFIX, SAFE_FEED_RATE};
use m1bridge_core::{Result, TranslateError, TranslatorSettings};
use regex::Regex;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

/// Marker proving a file already went through the translator.
const PROCESSED_MARKER: &str = "XTM1_HEADER_START";

/// How far into a file the processed marker is searched for.
const PROCESSED_SCAN_LEN: usize = 1024;

/// Preamble prepended to every translated job.
pub const START_GCODE: &str = "
;XTM1_HEADER_START;
; Set default speed for G0 and G1
G1 F9600
G0 F9600
; Disable all periphery (except air purifier)
M19 S1
; Disable ranging laser pointer
M18 S0

; Pause before start
G4 P0.1

; Move to work area
G0 Y30
; Activate laser module and set power to 0
M4 S0
; Don't know what this does
M104 X0
;XTM1_HEADER_END;

";

/// Epilogue appended to every translated job.
pub const END_GCODE: &str = "

;XTM1_FOOTER_START;
; Move head to origin
G0 Z0 F3000
G0 X0 Y0 F9600

; Small pause
G4 P0.1
; Disable laser module
M05
; Stop gcode
M6 P1
;XTM1_FOOTER_END;
";

/// Commands the M1 executes directly (after transformation).
const ALLOWED_GCODES: &[&str] = &[
    "G0",  // Move without firing laser
    "G1",  // Move and fire laser with current power setting
    "G4",  // Pause
    "G90", // Switch to absolute coordinates
    "G91", // Switch to relative coordinates
];

/// Commands (or whole lines) that are safe to drop from a job.
const REJECTABLE_GCODES: &[&str] = &[
    "G21", // Millimeter units; the M1 is always in millimeter mode
    // Laser module on/off. LightBurn uses S0 or G0 for non-cutting moves,
    // and the M1 crashes when it sees too many M3/M4/M5 commands.
    "M05",
    "M5",
    "M4",
    "M04",
    "M3",
    "M03",
    "M8",   // Start air assist; the M1 has none
    "M9",   // Stop air assist
    "M114", // Position query, emitted when framing; the M1 never replies
    "G00 G17 G40 G21 G54", // Emitted by LightBurn when framing
    // Streaming-mode sentinels handled by the capture session
    "LASER_JOB_START",
    "LASER_JOB_END",
];

fn s_power_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(S[0-9]*)\.[0-9]+").expect("invalid regex pattern"))
}

fn z_move_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^(G0?[0123].*?Z)(-?[0-9]*(?:\.[0-9]+)?)(.*)$").expect("invalid regex pattern")
    })
}

fn zero_feed_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    // Token-bounded so that F0.5 is left alone.
    RE.get_or_init(|| Regex::new(r"([ \t])F0+(?:\.0+)?([ \t;]|$)").expect("invalid regex pattern"))
}

/// What the translator did with a single line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineOutcome {
    /// Blank or comment-only line, passed through unmodified.
    PassThrough(String),
    /// Allowed command, transformed for the M1.
    Translated(String),
    /// Rejectable command, commented out with the `;--` prefix.
    Filtered(String),
}

impl LineOutcome {
    /// The line as it appears in the translated output.
    pub fn into_text(self) -> String {
        match self {
            LineOutcome::PassThrough(text)
            | LineOutcome::Translated(text)
            | LineOutcome::Filtered(text) => text,
        }
    }
}

/// Translates LightBurn's Marlin G-code into the dialect the M1 accepts.
pub struct GcodeTranslator {
    settings: TranslatorSettings,
    filtered_lines: BTreeSet<String>,
}

impl GcodeTranslator {
    pub fn new(settings: TranslatorSettings) -> Self {
        Self {
            settings,
            filtered_lines: BTreeSet::new(),
        }
    }

    /// Current settings.
    pub fn settings(&self) -> &TranslatorSettings {
        &self.settings
    }

    /// Override the material thickness used for the Z remapping.
    pub fn set_material_thickness(&mut self, thickness: Option<f64>) {
        self.settings.force_material_thickness = thickness;
    }

    /// Original text of every line the translator commented out so far,
    /// for operator review.
    pub fn filtered_lines(&self) -> &BTreeSet<String> {
        &self.filtered_lines
    }

    /// True when `content` already carries the translation header near the
    /// start of the file.
    pub fn is_already_processed(&self, content: &str) -> bool {
        let head = &content.as_bytes()[..content.len().min(PROCESSED_SCAN_LEN)];
        head.windows(PROCESSED_MARKER.len())
            .any(|window| window == PROCESSED_MARKER.as_bytes())
    }

    /// Translate a whole job, bracketing it with the header and footer.
    ///
    /// Idempotent: content that already carries the header is returned
    /// unchanged. A single unknown command fails the whole job; a partial
    /// translation must never reach the machine.
    pub fn translate(&mut self, content: &str) -> Result<String> {
        if self.is_already_processed(content) {
            tracing::debug!("content is already translated, passing through");
            return Ok(content.to_string());
        }
        let mut lines = Vec::new();
        for line in content.split('\n') {
            lines.push(self.process_line(line)?.into_text());
        }
        let body = lines.join("\n");
        Ok(format!("{START_GCODE}{body}{END_GCODE}"))
    }

    /// Translate the file at `path`, writing `<stem>.xtm1.<ext>` next to it
    /// and returning the new path. An already-translated input is returned
    /// as-is.
    pub fn translate_file(&mut self, path: &Path) -> Result<PathBuf> {
        let content = std::fs::read_to_string(path)?;
        if self.is_already_processed(&content) {
            return Ok(path.to_path_buf());
        }
        let translated = self.translate(&content)?;
        let out_path = translated_path(path);
        std::fs::write(&out_path, translated)?;
        tracing::info!(input = %path.display(), output = %out_path.display(), "job translated");
        Ok(out_path)
    }

    /// Run one line through the pipeline: classify, then transform.
    pub fn process_line(&mut self, line: &str) -> Result<LineOutcome> {
        let line = line.trim();
        let command_part = line.split(';').next().unwrap_or("");
        if command_part.trim().is_empty() {
            // Blank or comment-only.
            return Ok(LineOutcome::PassThrough(line.to_string()));
        }

        let command = line.split_whitespace().next().unwrap_or("");
        if !ALLOWED_GCODES.contains(&command) {
            if !REJECTABLE_GCODES.contains(&command) && !REJECTABLE_GCODES.contains(&line) {
                return Err(TranslateError::UnexpectedGcode {
                    line: line.to_string(),
                }
                .into());
            }
            self.filtered_lines.insert(line.to_string());
            return Ok(LineOutcome::Filtered(format!("{FILTERED_PREFIX}{line}")));
        }

        // LightBurn can emit fractional laser power values like S123.4,
        // which confuse the M1 firmware.
        let mut text = s_power_regex().replace_all(line, "$1").into_owned();
        // LightBurn has no way to set an offset for material thickness, so
        // the offset is applied here while inverting the Z direction.
        text = self.remap_z(&text)?;
        // A feed rate of zero hangs the M1 firmware.
        let safe_feed = format!("${{1}}F{SAFE_FEED_RATE}${{2}}");
        text = zero_feed_regex()
            .replace_all(&text, safe_feed.as_str())
            .into_owned();
        // LightBurn emits lines like `G1 X0.1 I S100`; the stray I confuses
        // the M1.
        text = text.replace(" I ", " ");
        Ok(LineOutcome::Translated(text))
    }

    /// Invert the Z axis direction and apply the focus distance offset.
    fn remap_z(&self, line: &str) -> Result<String> {
        let Some(captures) = z_move_regex().captures(line) else {
            return Ok(line.to_string());
        };
        let (prefix, z_text, rest) = (&captures[1], &captures[2], &captures[3]);
        let z: f64 = z_text
            .parse()
            .map_err(|_| TranslateError::InvalidNumber {
                line: line.to_string(),
            })?;
        let thickness = self.settings.force_material_thickness.unwrap_or(0.0);
        let new_z = self.settings.zero_offset_z - thickness - z;
        // Protect the machine from erroneous calculations.
        if new_z < 0.0 || new_z > self.settings.lowest_z_height {
            return Err(TranslateError::ZOutOfRange {
                line: line.to_string(),
                computed: new_z,
                min: 0.0,
                max: self.settings.lowest_z_height,
            }
            .into());
        }
        Ok(format!("{prefix}{}{rest}", format_z(new_z)))
    }
}

/// Format a remapped Z value, always keeping a decimal point so that
/// `Z17` comes out as `Z17.0`.
fn format_z(value: f64) -> String {
    if value.fract() == 0.0 {
        format!("{value:.1}")
    } else {
        format!("{value}")
    }
}

/// Insert `.xtm1` before the input's extension.
fn translated_path(path: &Path) -> PathBuf {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let name = match path.extension() {
        Some(ext) => format!("{stem}.xtm1.{}", ext.to_string_lossy()),
        None => format!("{stem}.xtm1"),
    };
    path.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_and_footer_carry_their_markers() {
        assert!(START_GCODE.starts_with("\n;XTM1_HEADER_START;\n"));
        assert!(START_GCODE.ends_with(";XTM1_HEADER_END;\n\n"));
        assert!(END_GCODE.starts_with("\n\n;XTM1_FOOTER_START;\n"));
        assert!(END_GCODE.ends_with(";XTM1_FOOTER_END;\n"));
    }

    #[test]
    fn z_values_keep_a_decimal_point() {
        assert_eq!(format_z(17.0), "17.0");
        assert_eq!(format_z(19.5), "19.5");
        assert_eq!(format_z(0.0), "0.0");
    }

    #[test]
    fn translated_path_inserts_the_marker_extension() {
        assert_eq!(
            translated_path(Path::new("/tmp/job.gcode")),
            Path::new("/tmp/job.xtm1.gcode")
        );
        assert_eq!(translated_path(Path::new("job")), Path::new("job.xtm1"));
    }
}
