//! xTool M1 HTTP control client
//!
//! The M1 exposes a plain HTTP API: a control service on port 8080 and a
//! camera service on port 8329. Commands are GET requests; uploads are POST
//! requests carrying a stored zip archive. The device never authenticates
//! and replies with JSON or raw bytes.

use m1bridge_core::{DeviceError, DeviceSettings, Error, Result, TranslatorSettings};
use m1bridge_translator::GcodeTranslator;
use serde::Deserialize;
use std::io::Write;
use std::path::Path;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Status strings in which the device accepts a new job.
const IDLE_STATES: &[&str] = &["P_IDLE", "P_SLEEP", "P_FINISH"];

/// Name the firmware expects for the G-code entry inside an upload archive.
const UPLOAD_ENTRY_NAME: &str = "gcodes.txt";

/// Reply of `/cnc/status`. The device sends more fields; only the state
/// machine string is interpreted.
#[derive(Debug, Clone, Deserialize)]
pub struct DeviceStatus {
    #[serde(rename = "STATUS")]
    pub status: String,
}

/// Where the material thickness for the Z remapping comes from.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MaterialThickness {
    /// Use the Z values present in the G-code, just inverted.
    FromGcode,
    /// Fixed thickness in millimeters.
    Manual(f64),
    /// Measure with the device camera before translating.
    AutoMeasure,
}

/// Blocking HTTP client for one M1 device.
pub struct M1Device {
    client: reqwest::blocking::Client,
    settings: DeviceSettings,
}

impl M1Device {
    pub fn new(settings: DeviceSettings) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| DeviceError::Http {
                reason: e.to_string(),
            })?;
        Ok(Self { client, settings })
    }

    /// Device settings this client talks to.
    pub fn settings(&self) -> &DeviceSettings {
        &self.settings
    }

    /// Query `/cnc/status`.
    pub fn status(&self) -> Result<DeviceStatus> {
        let reply = self.get(&self.control_url("/cnc/status"))?;
        serde_json::from_slice(&reply).map_err(|e| {
            DeviceError::UnexpectedReply {
                reason: format!("invalid status JSON: {e}"),
            }
            .into()
        })
    }

    /// True when the device can accept a new job.
    pub fn is_idle(&self) -> Result<bool> {
        let status = self.status()?;
        Ok(IDLE_STATES.contains(&status.status.as_str()))
    }

    /// Abort the running job.
    pub fn stop(&self) -> Result<Vec<u8>> {
        self.get(&self.control_url("/cnc/data?action=stop"))
    }

    /// Execute a single G-code command immediately.
    pub fn execute_gcode(&self, gcode: &str) -> Result<Vec<u8>> {
        let timestamp = unix_millis();
        self.get(&self.command_url(gcode, timestamp))
    }

    /// Toggle the red ranging laser pointer.
    pub fn set_laser_pointer(&self, on: bool) -> Result<Vec<u8>> {
        self.execute_gcode(if on { "M18 S255" } else { "M18 S0" })
    }

    /// Set the work-area light brightness, clamped to 0-255.
    pub fn set_light_brightness(&self, brightness: u32) -> Result<Vec<u8>> {
        let brightness = brightness.min(255);
        self.execute_gcode(&format!("M13 S{brightness}"))
    }

    /// Tell the device which tool head is mounted.
    pub fn set_tool_type(&self, tool: &str) -> Result<Vec<u8>> {
        self.post(
            &self.control_url(&format!("/setprintToolType?type={tool}")),
            Vec::new(),
        )
    }

    /// Measure the material thickness under the head with the camera's
    /// focus ranging, in millimeters.
    pub fn measure_thickness(&self) -> Result<f64> {
        let reply = self.get(&self.camera_url(
            "/camera?focus=9007199254740991,9007199254740991,0,0",
        ))?;
        let value: serde_json::Value =
            serde_json::from_slice(&reply).map_err(|e| DeviceError::UnexpectedReply {
                reason: format!("invalid measure JSON: {e}"),
            })?;
        parse_measure(&value).ok_or_else(|| {
            DeviceError::UnexpectedReply {
                reason: format!("no usable measure field in {value}"),
            }
            .into()
        })
    }

    /// Grab a still frame from the bed camera (JPEG bytes).
    pub fn camera_image(&self) -> Result<Vec<u8>> {
        self.get(&self.camera_url("/snap?stream=0"))
    }

    /// Download the camera calibration point file.
    pub fn camera_calibration(&self) -> Result<Vec<u8>> {
        self.get(&self.control_url("/file?action=download&filename=points.json"))
    }

    /// Resolve a thickness request into the translator override, measuring
    /// via the camera when asked to.
    pub fn resolve_thickness(&self, thickness: MaterialThickness) -> Result<Option<f64>> {
        match thickness {
            MaterialThickness::FromGcode => Ok(None),
            MaterialThickness::Manual(value) => Ok(Some(value)),
            MaterialThickness::AutoMeasure => {
                let measured = self.measure_thickness()?;
                tracing::info!(measured, "material thickness measured");
                Ok(Some(measured))
            }
        }
    }

    /// Translate `gcode` and upload it as a job.
    ///
    /// Refuses with [`DeviceError::Busy`] unless the device is idle.
    /// Already-translated input is uploaded as-is (the translator is
    /// idempotent).
    pub fn upload_gcode(
        &self,
        gcode: &str,
        thickness: MaterialThickness,
        translator_settings: TranslatorSettings,
    ) -> Result<Vec<u8>> {
        self.upload_gcode_as(gcode, thickness, translator_settings, "Laser")
    }

    /// Upload the job stored at `path`.
    pub fn upload_gcode_file(
        &self,
        path: &Path,
        thickness: MaterialThickness,
        translator_settings: TranslatorSettings,
    ) -> Result<Vec<u8>> {
        let gcode = std::fs::read_to_string(path)?;
        self.upload_gcode(&gcode, thickness, translator_settings)
    }

    fn upload_gcode_as(
        &self,
        gcode: &str,
        thickness: MaterialThickness,
        translator_settings: TranslatorSettings,
        tool: &str,
    ) -> Result<Vec<u8>> {
        if tool != "Laser" {
            return Err(DeviceError::UnsupportedTool {
                tool: tool.to_string(),
            }
            .into());
        }
        if !self.is_idle()? {
            return Err(DeviceError::Busy.into());
        }
        self.set_tool_type(tool)?;

        let mut translator = GcodeTranslator::new(translator_settings);
        if let Some(value) = self.resolve_thickness(thickness)? {
            translator.set_material_thickness(Some(value));
        }
        let translated = translator.translate(gcode)?;

        let archive = pack_gcode_zip(translated.as_bytes())?;
        tracing::info!(bytes = archive.len(), "uploading job");
        self.post(
            &self.control_url("/cnc/data?action=upload&zip=true&id=-1"),
            archive,
        )
    }

    fn control_url(&self, path: &str) -> String {
        format!("http://{}:{}{path}", self.settings.ip, self.settings.port)
    }

    fn camera_url(&self, path: &str) -> String {
        format!(
            "http://{}:{}{path}",
            self.settings.ip, self.settings.camera_port
        )
    }

    fn command_url(&self, gcode: &str, timestamp: u128) -> String {
        let gcode = gcode.replace(' ', "%20");
        self.control_url(&format!("/cnc/cmd?cmd={gcode}&t={timestamp}"))
    }

    fn get(&self, url: &str) -> Result<Vec<u8>> {
        tracing::debug!(%url, "GET");
        let response = self.client.get(url).send().map_err(|e| DeviceError::Http {
            reason: e.to_string(),
        })?;
        Self::check_status(&response, url)?;
        Ok(response
            .bytes()
            .map_err(|e| DeviceError::Http {
                reason: e.to_string(),
            })?
            .to_vec())
    }

    fn post(&self, url: &str, body: Vec<u8>) -> Result<Vec<u8>> {
        tracing::debug!(%url, bytes = body.len(), "POST");
        let response = self
            .client
            .post(url)
            .header(
                reqwest::header::CONTENT_TYPE,
                "application/x-www-form-urlencoded",
            )
            .body(body)
            .send()
            .map_err(|e| DeviceError::Http {
                reason: e.to_string(),
            })?;
        Self::check_status(&response, url)?;
        Ok(response
            .bytes()
            .map_err(|e| DeviceError::Http {
                reason: e.to_string(),
            })?
            .to_vec())
    }

    fn check_status(response: &reqwest::blocking::Response, url: &str) -> Result<()> {
        if !response.status().is_success() {
            return Err(DeviceError::Status {
                status: response.status().as_u16(),
                url: url.to_string(),
            }
            .into());
        }
        Ok(())
    }
}

/// The camera reports the measure as either a JSON number or a numeric
/// string, depending on firmware version.
fn parse_measure(value: &serde_json::Value) -> Option<f64> {
    match value.get("measure")? {
        serde_json::Value::Number(n) => n.as_f64(),
        serde_json::Value::String(s) => s.parse().ok(),
        _ => None,
    }
}

/// Pack translated G-code into the stored (uncompressed) zip archive the
/// upload endpoint expects.
pub fn pack_gcode_zip(gcode: &[u8]) -> Result<Vec<u8>> {
    let mut writer = zip::ZipWriter::new(std::io::Cursor::new(Vec::new()));
    let options = zip::write::SimpleFileOptions::default()
        .compression_method(zip::CompressionMethod::Stored);
    writer
        .start_file(UPLOAD_ENTRY_NAME, options)
        .map_err(zip_error)?;
    writer.write_all(gcode)?;
    let cursor = writer.finish().map_err(zip_error)?;
    Ok(cursor.into_inner())
}

fn zip_error(e: zip::result::ZipError) -> Error {
    Error::other(format!("Failed to pack upload archive: {e}"))
}

fn unix_millis() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis()
}
