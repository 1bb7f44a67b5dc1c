//! Command line interface

use clap::{ArgGroup, Parser};
use m1bridge_core::{constants, Config, DeviceSettings, TranslatorSettings};
use m1bridge_device::MaterialThickness;
use std::path::PathBuf;

/// How the G-code sender reaches us.
#[derive(Debug, Clone)]
pub enum InputKind {
    /// Listen on a local TCP port.
    Tcp(u16),
    /// Read from a serial port device.
    Serial(String),
    /// Talk to a spawned bridge helper over its stdio pipes.
    Bridge(String),
    /// Read stdin, ack on stdout.
    Stdio,
}

#[derive(Parser, Debug)]
#[command(
    name = "m1bridge",
    version,
    about = "Relay G-code from LightBurn to an xTool M1 laser cutter"
)]
#[command(group = ArgGroup::new("input").required(true).args(["tcp", "serial", "bridge", "stdio"]))]
#[command(group = ArgGroup::new("address").args(["ip", "usb"]))]
pub struct Cli {
    /// Listen for the sender on a local TCP port
    #[arg(long, value_name = "PORT", num_args = 0..=1, default_missing_value = "2323")]
    pub tcp: Option<u16>,

    /// Receive from a serial port device, e.g. /dev/ttyUSB0
    #[arg(long, value_name = "PORT")]
    pub serial: Option<String>,

    /// Spawn a bridge helper (e.g. a network listener binary) and receive
    /// over its stdio pipes. Arguments may follow the command name.
    #[arg(long, value_name = "CMD")]
    pub bridge: Option<String>,

    /// Receive on stdin and acknowledge on stdout (implies --yes)
    #[arg(long)]
    pub stdio: bool,

    /// Serial baud rate
    #[arg(long, default_value_t = 115200)]
    pub baud: u32,

    /// IP address of the device
    #[arg(long, value_name = "ADDR")]
    pub ip: Option<String>,

    /// Reach the device over its USB network interface (201.234.3.1)
    #[arg(long)]
    pub usb: bool,

    /// Material thickness in millimeters, or "auto" to measure with the
    /// device camera. Without this the Z values in the G-code are used.
    #[arg(long, value_name = "MM|auto", value_parser = parse_thickness)]
    pub thickness: Option<MaterialThickness>,

    /// Directory captured and translated jobs are stored in
    #[arg(long, value_name = "DIR", default_value = "gcode")]
    pub output_dir: PathBuf,

    /// Device Z coordinate for a material thickness of zero
    #[arg(long, value_name = "MM")]
    pub zero_offset_z: Option<f64>,

    /// Highest device Z value allowed after remapping
    #[arg(long, value_name = "MM")]
    pub lowest_z: Option<f64>,

    /// Upload captured jobs without asking
    #[arg(long, short = 'y')]
    pub yes: bool,

    /// Configuration file (TOML)
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,
}

impl Cli {
    /// The selected input transport.
    pub fn input(&self) -> InputKind {
        if let Some(port) = self.tcp {
            InputKind::Tcp(port)
        } else if let Some(port) = &self.serial {
            InputKind::Serial(port.clone())
        } else if let Some(command) = &self.bridge {
            InputKind::Bridge(command.clone())
        } else {
            InputKind::Stdio
        }
    }

    /// Thickness handling for this run.
    pub fn thickness(&self) -> MaterialThickness {
        self.thickness.unwrap_or(MaterialThickness::FromGcode)
    }

    /// Device settings from the config file with CLI overrides applied.
    pub fn device_settings(&self, config: &Config) -> DeviceSettings {
        let mut settings = config.device.clone();
        if self.usb {
            settings.ip = constants::USB_DEVICE_IP.to_string();
        }
        if let Some(ip) = &self.ip {
            settings.ip = ip.clone();
        }
        settings
    }

    /// Translator settings from the config file with CLI overrides applied.
    pub fn translator_settings(&self, config: &Config) -> TranslatorSettings {
        let mut settings = config.translator.clone();
        if let Some(value) = self.zero_offset_z {
            settings.zero_offset_z = value;
        }
        if let Some(value) = self.lowest_z {
            settings.lowest_z_height = value;
        }
        settings
    }

    /// True when jobs should be uploaded without prompting.
    pub fn non_interactive(&self) -> bool {
        // In stdio mode the terminal belongs to the line channel, so there
        // is nothing to prompt on.
        self.yes || self.stdio
    }
}

/// Parse a `--thickness` argument: millimeters or `auto`.
pub fn parse_thickness(value: &str) -> Result<MaterialThickness, String> {
    if value.eq_ignore_ascii_case("auto") {
        return Ok(MaterialThickness::AutoMeasure);
    }
    value
        .parse::<f64>()
        .map(MaterialThickness::Manual)
        .map_err(|_| format!("expected a thickness in millimeters or \"auto\", got {value:?}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tcp_port_defaults_when_flag_is_bare() {
        let cli = Cli::parse_from(["m1bridge", "--tcp"]);
        assert!(matches!(
            cli.input(),
            InputKind::Tcp(constants::DEFAULT_TCP_PORT)
        ));

        let cli = Cli::parse_from(["m1bridge", "--tcp", "5555"]);
        assert!(matches!(cli.input(), InputKind::Tcp(5555)));
    }

    #[test]
    fn input_transports_are_mutually_exclusive() {
        assert!(Cli::try_parse_from(["m1bridge", "--tcp", "--stdio"]).is_err());
        assert!(Cli::try_parse_from(["m1bridge", "--tcp", "--bridge", "helper"]).is_err());
        assert!(Cli::try_parse_from(["m1bridge"]).is_err());
    }

    #[test]
    fn bridge_command_is_taken_verbatim() {
        let cli = Cli::parse_from(["m1bridge", "--bridge", "tcp_bridge --port 2323"]);
        match cli.input() {
            InputKind::Bridge(command) => assert_eq!(command, "tcp_bridge --port 2323"),
            other => panic!("expected bridge input, got {other:?}"),
        }
    }

    #[test]
    fn thickness_accepts_auto_and_numbers() {
        let cli = Cli::parse_from(["m1bridge", "--stdio", "--thickness", "auto"]);
        assert_eq!(cli.thickness(), MaterialThickness::AutoMeasure);

        let cli = Cli::parse_from(["m1bridge", "--stdio", "--thickness", "3.2"]);
        assert_eq!(cli.thickness(), MaterialThickness::Manual(3.2));

        let cli = Cli::parse_from(["m1bridge", "--stdio"]);
        assert_eq!(cli.thickness(), MaterialThickness::FromGcode);

        assert!(Cli::try_parse_from(["m1bridge", "--stdio", "--thickness", "thick"]).is_err());
    }

    #[test]
    fn overrides_win_over_config_values() {
        let cli = Cli::parse_from([
            "m1bridge",
            "--tcp",
            "--ip",
            "192.168.1.50",
            "--zero-offset-z",
            "19.0",
        ]);
        let config = Config::default();
        assert_eq!(cli.device_settings(&config).ip, "192.168.1.50");
        let translator = cli.translator_settings(&config);
        assert_eq!(translator.zero_offset_z, 19.0);
        assert_eq!(translator.lowest_z_height, 35.0);
    }

    #[test]
    fn stdio_mode_is_non_interactive() {
        assert!(Cli::parse_from(["m1bridge", "--stdio"]).non_interactive());
        assert!(Cli::parse_from(["m1bridge", "--tcp", "-y"]).non_interactive());
        assert!(!Cli::parse_from(["m1bridge", "--tcp"]).non_interactive());
    }
}
