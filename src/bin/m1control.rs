//! Direct device control
//!
//! Small companion tool for poking the laser cutter without going through
//! the relay: query status, run single commands, measure thickness, grab
//! camera data, upload or frame a job.

use clap::{Parser, Subcommand};
use m1bridge::cli::parse_thickness;
use m1bridge::init_logging;
use m1bridge_core::{constants, Config, DeviceSettings, TranslatorSettings};
use m1bridge_device::{M1Device, MaterialThickness};
use m1bridge_translator::GcodeFramer;
use std::path::{Path, PathBuf};

#[derive(Parser, Debug)]
#[command(
    name = "m1control",
    version,
    about = "Control an xTool M1 laser cutter directly"
)]
struct Cli {
    /// IP address of the device
    #[arg(long, value_name = "ADDR")]
    ip: Option<String>,

    /// Reach the device over its USB network interface (201.234.3.1)
    #[arg(long)]
    usb: bool,

    /// Configuration file (TOML)
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the device state
    Status,
    /// Abort the running job
    Stop,
    /// Execute a single G-code command immediately
    Gcode {
        /// The command, e.g. "M18 S255" (quotes optional)
        command: Vec<String>,
    },
    /// Translate a G-code file and upload it as a job
    Upload {
        file: PathBuf,
        /// Material thickness in millimeters, or "auto" to measure
        #[arg(long, value_name = "MM|auto", value_parser = parse_thickness)]
        thickness: Option<MaterialThickness>,
    },
    /// Switch the red ranging laser pointer on or off
    Laserpointer {
        #[arg(value_parser = ["on", "off"])]
        state: String,
    },
    /// Measure the material thickness with the device camera
    Thickness,
    /// Set the work-area light brightness (0-255)
    Light { brightness: u32 },
    /// Save a camera still frame
    Camera {
        #[arg(default_value = "camera.jpg")]
        output: PathBuf,
    },
    /// Save the camera calibration point file
    CameraCalibration {
        #[arg(default_value = "camera-calibration.json")]
        output: PathBuf,
    },
    /// Print a low-power outline of a job's cutting area, for positioning
    /// material; with --run, upload it to the device as a job
    Frame {
        file: PathBuf,
        /// Upload the outline instead of only printing it
        #[arg(long)]
        run: bool,
    },
}

impl Cli {
    fn device_settings(&self, config: &Config) -> DeviceSettings {
        let mut settings = config.device.clone();
        if self.usb {
            settings.ip = constants::USB_DEVICE_IP.to_string();
        }
        if let Some(ip) = &self.ip {
            settings.ip = ip.clone();
        }
        settings
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    init_logging()?;

    let config = Config::load_or_default(cli.config.as_deref())?;
    let device = M1Device::new(cli.device_settings(&config))?;

    match &cli.command {
        Command::Status => {
            let status = device.status()?;
            println!("{}", status.status);
        }
        Command::Stop => {
            print_reply(&device.stop()?);
        }
        Command::Gcode { command } => {
            print_reply(&device.execute_gcode(&command.join(" "))?);
        }
        Command::Upload { file, thickness } => {
            let thickness = (*thickness).unwrap_or(MaterialThickness::FromGcode);
            device.upload_gcode_file(file, thickness, config.translator.clone())?;
            println!("uploaded {}", file.display());
        }
        Command::Laserpointer { state } => {
            print_reply(&device.set_laser_pointer(state == "on")?);
        }
        Command::Thickness => {
            println!("{}", device.measure_thickness()?);
        }
        Command::Light { brightness } => {
            print_reply(&device.set_light_brightness(*brightness)?);
        }
        Command::Camera { output } => {
            std::fs::write(output, device.camera_image()?)?;
            println!("wrote {}", output.display());
        }
        Command::CameraCalibration { output } => {
            std::fs::write(output, device.camera_calibration()?)?;
            println!("wrote {}", output.display());
        }
        Command::Frame { file, run } => {
            frame(&device, &config.translator, file, *run)?;
        }
    }
    Ok(())
}

fn frame(
    device: &M1Device,
    translator_settings: &TranslatorSettings,
    file: &Path,
    run: bool,
) -> anyhow::Result<()> {
    let mut framer = GcodeFramer::new();
    framer.analyze_file(file)?;
    let Some(outline) = framer.render_outline() else {
        anyhow::bail!("{} never fires the laser, nothing to frame", file.display());
    };
    print!("{outline}");
    if run {
        device.upload_gcode(
            &outline,
            MaterialThickness::FromGcode,
            translator_settings.clone(),
        )?;
        println!("outline uploaded");
    }
    Ok(())
}

fn print_reply(reply: &[u8]) {
    let text = String::from_utf8_lossy(reply);
    let text = text.trim();
    if !text.is_empty() {
        println!("{text}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn subcommands_parse_with_device_address() {
        let cli = Cli::parse_from(["m1control", "--usb", "status"]);
        assert!(matches!(cli.command, Command::Status));
        let settings = cli.device_settings(&Config::default());
        assert_eq!(settings.ip, "201.234.3.1");

        let cli = Cli::parse_from(["m1control", "--ip", "192.168.1.50", "gcode", "M18", "S255"]);
        match &cli.command {
            Command::Gcode { command } => assert_eq!(command.join(" "), "M18 S255"),
            other => panic!("expected gcode subcommand, got {other:?}"),
        }
        assert_eq!(cli.device_settings(&Config::default()).ip, "192.168.1.50");
    }

    #[test]
    fn upload_thickness_accepts_auto() {
        let cli = Cli::parse_from(["m1control", "upload", "job.gcode", "--thickness", "auto"]);
        match &cli.command {
            Command::Upload { thickness, .. } => {
                assert_eq!(*thickness, Some(MaterialThickness::AutoMeasure));
            }
            other => panic!("expected upload subcommand, got {other:?}"),
        }
    }

    #[test]
    fn laserpointer_state_is_validated() {
        assert!(Cli::try_parse_from(["m1control", "laserpointer", "blink"]).is_err());
        let cli = Cli::parse_from(["m1control", "laserpointer", "off"]);
        assert!(matches!(
            cli.command,
            Command::Laserpointer { ref state } if state == "off"
        ));
    }
}
