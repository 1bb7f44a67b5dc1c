//! Framing analyzer behavior.

use m1bridge_translator::{FrameBounds, GcodeFramer};

#[test]
fn bounding_box_covers_only_cutting_moves() {
    let mut framer = GcodeFramer::new();
    framer
        .analyze(
            "G90\n\
             G0 X10 Y10\n\
             G1 X20 Y10 S100\n\
             G1 X20 Y20\n\
             G0 X100 Y100\n\
             G1 X5 Y5 S0\n",
        )
        .unwrap();
    assert_eq!(
        framer.bounds(),
        Some(FrameBounds {
            x_min: 10.0,
            x_max: 20.0,
            y_min: 10.0,
            y_max: 20.0,
        })
    );
}

#[test]
fn laser_power_is_sticky_across_moves() {
    let mut framer = GcodeFramer::new();
    framer
        .analyze("G1 X1 Y1 S50\nG1 X9 Y9\nG1 X3 Y3\n")
        .unwrap();
    let bounds = framer.bounds().unwrap();
    assert_eq!((bounds.x_min, bounds.x_max), (0.0, 9.0));
    assert_eq!((bounds.y_min, bounds.y_max), (0.0, 9.0));
}

#[test]
fn relative_moves_are_accumulated() {
    let mut framer = GcodeFramer::new();
    framer
        .analyze(
            "G0 X10 Y10\n\
             G91\n\
             G1 X5 Y0 S100\n\
             G1 X0 Y5\n\
             G1 X-5 Y0\n",
        )
        .unwrap();
    assert_eq!(
        framer.bounds(),
        Some(FrameBounds {
            x_min: 10.0,
            x_max: 15.0,
            y_min: 10.0,
            y_max: 15.0,
        })
    );
}

#[test]
fn job_without_cutting_has_no_bounds() {
    let mut framer = GcodeFramer::new();
    framer.analyze("G0 X10 Y10\nG0 X20 Y20\nM114\n").unwrap();
    assert!(framer.bounds().is_none());
    assert!(framer.render_outline().is_none());
}

#[test]
fn arcs_are_rejected() {
    let mut framer = GcodeFramer::new();
    let err = framer.analyze("G0 X1 Y1\nG2 X5 Y5 I2 J2\n").unwrap_err();
    assert!(err.is_translate_error(), "unexpected error: {err}");
}

#[test]
fn comments_are_ignored() {
    let mut framer = GcodeFramer::new();
    framer
        .analyze("; setup\nG1 X5 Y5 S10 ; cut\n# hash comment\n")
        .unwrap();
    assert!(framer.bounds().is_some());
}

#[test]
fn outline_traces_the_box_and_returns_home() {
    let mut framer = GcodeFramer::new();
    framer
        .analyze("G0 X10 Y10\nG1 X20.5 Y15.25 S100\n")
        .unwrap();
    assert_eq!(
        framer.render_outline().unwrap(),
        "G0 X10 Y10\n\
         G1 F9600 S5\n\
         G1 X20.5 Y10\n\
         G1 X20.5 Y15.25\n\
         G1 X10 Y15.25\n\
         G1 X10 Y10\n\
         G0 X0 Y0\n"
    );
}
