//! Translation pipeline behavior, line level and file level.

use m1bridge_core::TranslatorSettings;
use m1bridge_translator::{GcodeTranslator, LineOutcome, END_GCODE, START_GCODE};

fn translator() -> GcodeTranslator {
    GcodeTranslator::new(TranslatorSettings::default())
}

/// Strip header and footer so assertions can look at the body alone.
fn body(output: &str) -> &str {
    output
        .strip_prefix(START_GCODE)
        .expect("missing header")
        .strip_suffix(END_GCODE)
        .expect("missing footer")
}

#[test]
fn blank_and_comment_lines_pass_through() {
    let mut translator = translator();
    for line in ["", " ", "  \t \n", "; just a comment"] {
        let outcome = translator.process_line(line).unwrap();
        assert_eq!(outcome, LineOutcome::PassThrough(line.trim().to_string()));
    }
    assert!(translator.filtered_lines().is_empty());
}

#[test]
fn clean_moves_are_bracketed_unmodified() {
    let input = "\nG1 X1 Y1\nG1 X2 Y2 F1000 S1000\nG0 X3 Y3\n";
    let mut translator = translator();
    let output = translator.translate(input).unwrap();
    assert_eq!(output, format!("{START_GCODE}{input}{END_GCODE}"));
    assert!(translator.filtered_lines().is_empty());
}

#[test]
fn rejectable_commands_are_commented_out_and_recorded() {
    let input = "\nM4 S100\nM04\nM05\nM5 ; comment\nM3 S10\nG1 X1 Y1\n";
    let mut translator = translator();
    let output = translator.translate(input).unwrap();

    let filtered: Vec<&str> = translator.filtered_lines().iter().map(|s| s.as_str()).collect();
    assert_eq!(filtered, vec!["M04", "M05", "M3 S10", "M4 S100", "M5 ; comment"]);

    let commands: Vec<&str> = body(&output)
        .lines()
        .filter(|line| !line.is_empty() && !line.starts_with(';'))
        .collect();
    assert_eq!(commands, vec!["G1 X1 Y1"]);
    assert!(body(&output).contains(";--M4 S100\n"));
}

#[test]
fn unknown_command_fails_the_whole_job() {
    let mut translator = translator();
    let err = translator
        .translate("G1 X1 Y1\nM123\nG0 X2 Y2")
        .unwrap_err();
    assert!(err.is_translate_error(), "unexpected error: {err}");
    assert!(err.to_string().contains("M123"));
}

#[test]
fn z_values_are_inverted_and_offset() {
    let input = "\nG1 Z0 X1 Y1\nG1 Z1 X2 Y2\nG1 Z-1 X3 Y3\n";
    let mut translator = translator();
    let output = translator.translate(input).unwrap();
    assert_eq!(body(&output), "\nG1 Z17.0 X1 Y1\nG1 Z16.0 X2 Y2\nG1 Z18.0 X3 Y3\n");

    let mut translator = GcodeTranslator::new(TranslatorSettings {
        zero_offset_z: 20.5,
        ..TranslatorSettings::default()
    });
    let output = translator.translate(input).unwrap();
    assert_eq!(body(&output), "\nG1 Z20.5 X1 Y1\nG1 Z19.5 X2 Y2\nG1 Z21.5 X3 Y3\n");
}

#[test]
fn material_thickness_shifts_the_z_mapping() {
    let mut translator = translator();
    translator.set_material_thickness(Some(3.0));
    let outcome = translator.process_line("G1 Z0 X1").unwrap();
    assert_eq!(outcome, LineOutcome::Translated("G1 Z14.0 X1".to_string()));
}

#[test]
fn out_of_range_z_is_rejected() {
    let mut translator = GcodeTranslator::new(TranslatorSettings {
        lowest_z_height: 15.0,
        ..TranslatorSettings::default()
    });
    let err = translator
        .translate("\nG1 Z0 X1 Y1\nG1 Z1 X2 Y2\nG1 Z-1 X3 Y3\n")
        .unwrap_err();
    assert!(err.is_translate_error(), "unexpected error: {err}");
}

#[test]
fn z_range_bounds_are_inclusive() {
    let mut translator = GcodeTranslator::new(TranslatorSettings {
        zero_offset_z: 35.0,
        lowest_z_height: 35.0,
        force_material_thickness: None,
    });
    // Both edges of [0, lowest_z_height] are allowed.
    assert_eq!(
        translator.process_line("G1 Z0 X1").unwrap(),
        LineOutcome::Translated("G1 Z35.0 X1".to_string())
    );
    assert_eq!(
        translator.process_line("G1 Z35 X1").unwrap(),
        LineOutcome::Translated("G1 Z0.0 X1".to_string())
    );
    assert!(translator.process_line("G1 Z36 X1").is_err());
    assert!(translator.process_line("G1 Z-1 X1").is_err());
}

#[test]
fn fractional_laser_power_is_truncated() {
    let mut translator = translator();
    assert_eq!(
        translator.process_line("G1 X1 S123.4").unwrap(),
        LineOutcome::Translated("G1 X1 S123".to_string())
    );
}

#[test]
fn zero_feed_rate_is_replaced_with_the_safe_default() {
    let mut translator = translator();
    assert_eq!(
        translator.process_line("G1 X1 F0").unwrap(),
        LineOutcome::Translated("G1 X1 F9600".to_string())
    );
    assert_eq!(
        translator.process_line("G1 F0 S100").unwrap(),
        LineOutcome::Translated("G1 F9600 S100".to_string())
    );
    assert_eq!(
        translator.process_line("G1 X1 F0.0").unwrap(),
        LineOutcome::Translated("G1 X1 F9600".to_string())
    );
    // A genuine fractional feed rate is left alone.
    assert_eq!(
        translator.process_line("G1 X1 F0.5").unwrap(),
        LineOutcome::Translated("G1 X1 F0.5".to_string())
    );
}

#[test]
fn stray_i_parameter_is_dropped() {
    let mut translator = translator();
    assert_eq!(
        translator.process_line("G1 X0.1 I S100").unwrap(),
        LineOutcome::Translated("G1 X0.1 S100".to_string())
    );
}

#[test]
fn translation_is_idempotent() {
    let mut translator = translator();
    let once = translator.translate("G1 X1 Y1\nG0 Z1 X2\nM05\n").unwrap();
    let twice = translator.translate(&once).unwrap();
    assert_eq!(once, twice);
}

#[test]
fn translate_file_writes_a_sibling_artifact() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("job.gcode");
    std::fs::write(&input, "G0 Z0 F3000\nG1 X1 Y1 S100\nG1 X2 Y2\nM05\n").unwrap();

    let mut translator = translator();
    let output = translator.translate_file(&input).unwrap();
    assert_eq!(output, dir.path().join("job.xtm1.gcode"));

    let content = std::fs::read_to_string(&output).unwrap();
    assert!(content.contains(";XTM1_HEADER_START;"));
    assert!(content.contains("G0 Z17.0 F3000\n"));
    assert!(content.contains(";--M05\n"));

    // Re-translating the artifact hands it back untouched.
    let again = translator.translate_file(&output).unwrap();
    assert_eq!(again, output);
    assert_eq!(std::fs::read_to_string(&again).unwrap(), content);
}
