//! Config Handler.

use serde::{Deserialize, Serialize};

/// Provides TOML config file handling.
pub mod toml {

    use super::DEFAULT_CONFIG;
    use crate::module::define;
    use crate::module::error::{Result, StationError};
    use std::fs::File;
    use std::io::prelude::*;
    use std::path::Path;

    /// Loads a configuration file from the given directory.
    /// If not found, generates a default config file.
    ///
    /// # Arguments
    ///
    /// * `dir` - The directory where the configuration file is located or should be created.
    ///
    pub fn load(dir: &str) -> Result<super::Config> {
        // Check if the config file exists
        let path = Path::new(dir).join(define::path::CONF_FILE);
        if !path.is_file() {
            // Create the default config if it doesn't exist
            save(dir, &default()?)?;
            log::info!("Default config written to {}", path.display());
        }

        // Load the config
        let conf_str: String = std::fs::read_to_string(&path)?;
        toml::from_str(&conf_str)
            .map_err(|e| StationError::Config(format!("Failed to parse TOML: {}", e)))
    }

    /// Saves a configuration file to the given directory.
    ///
    /// # Arguments
    ///
    /// * `dir` - The directory where the configuration file should be saved.
    /// * `conf` - The configuration data to be saved.
    ///
    pub fn save(dir: &str, conf: &super::Config) -> Result<()> {
        let toml_str = toml::to_string(conf).map_err(|e| StationError::Config(e.to_string()))?;
        let path = crate::module::util::path::join(&[dir, define::path::CONF_FILE]);
        let mut file = File::create(path)?;
        file.write_all(toml_str.as_bytes())?;
        Ok(())
    }

    /// The built-in configuration.
    pub fn default() -> Result<super::Config> {
        toml::from_str(DEFAULT_CONFIG).map_err(|e| StationError::Config(e.to_string()))
    }
}

/// Reads the output of the reference-object calibration workflow.
pub mod json {
    use crate::module::error::{Result, StationError};
    use serde::Deserialize;
    use std::path::Path;

    #[derive(Debug, Deserialize)]
    struct CalibrationData {
        pixels_per_cm: f64,
    }

    /// Loads `pixels_per_cm` from a `calibration_data.json` file.
    pub fn load_pixels_per_unit(path: &Path) -> Result<f64> {
        let text = std::fs::read_to_string(path)?;
        let data: CalibrationData = serde_json::from_str(&text)
            .map_err(|e| StationError::Config(format!("{}: {}", path.display(), e)))?;
        Ok(data.pixels_per_cm)
    }
}

/// Represents the configuration data structure.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Config {
    pub system: System,
    pub camera: Camera,
    pub pin: Pin,
    pub button: Button,
    pub preview: Preview,
    pub calibration: Calibration,
    pub lens: Lens,
    pub tracer: Tracer,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub crop: Option<Crop>,
}

impl Config {
    /// Resolves the calibration scalar, preferring the calibration file when one is set.
    pub fn pixels_per_unit(&self) -> crate::module::error::Result<f64> {
        match &self.calibration.calibration_file {
            Some(file) => json::load_pixels_per_unit(std::path::Path::new(file)),
            None => Ok(self.calibration.pixels_per_unit),
        }
    }
}

/// Represents system-related configuration parameters.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct System {
    pub log_level: String,
    pub output_dir: String,
    pub label: String,
}

/// Represents camera-related configuration parameters.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Camera {
    pub device: String,
    pub preview_width: u32,
    pub preview_height: u32,
    pub still_width: u32,
    pub still_height: u32,
    pub fps: u32,
    pub grab_times: u8,
}

/// Represents pin-related configuration parameters.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Pin {
    pub quit_pin: u8,
    pub capture_pin: u8,
    pub combine_pin: u8,
}

/// Represents button timing parameters.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Button {
    pub poll_interval_ms: u64,
    pub debounce_ms: u64,
}

/// Represents live preview parameters.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Preview {
    pub refresh_interval_ms: u64,
    pub thumbnail_size: u32,
}

/// Represents unit calibration parameters.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Calibration {
    pub pixels_per_unit: f64,
    pub unit: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub calibration_file: Option<String>,
}

/// Represents lens correction parameters.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Lens {
    pub enabled: bool,
    pub camera_matrix: [[f64; 3]; 3],
    pub distortion: Vec<f64>,
}

/// Represents external tracer parameters.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Tracer {
    pub command: String,
    pub args: Vec<String>,
}

/// Represents a preset crop rectangle in preview pixels.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct Crop {
    pub x0: f64,
    pub y0: f64,
    pub x1: f64,
    pub y1: f64,
}

// Default configuration data in TOML format
const DEFAULT_CONFIG: &str = r#"
[system]
  log_level = 'INFO' # Log level (e.g., 'INFO', 'DEBUG')
  output_dir = '/home/pi/shadowboards' # Default output location offered to the operator
  label = 'board' # Default label (subfolder of output_dir)

[camera]
  device = '/dev/video0' # V4L2 device
  preview_width = 640 # Live preview width
  preview_height = 480 # Live preview height
  still_width = 640 # Still capture width, the size the lens model was calibrated at
  still_height = 480 # Still capture height
  fps = 30 # Frame rate
  grab_times = 3 # Frames discarded before a still

[pin]
  quit_pin = 17 # Red button
  capture_pin = 27 # Blue button
  combine_pin = 22 # Green button

[button]
  poll_interval_ms = 100 # Button polling period
  debounce_ms = 200 # Minimum delay between recognized presses

[preview]
  refresh_interval_ms = 50 # Live preview period
  thumbnail_size = 200 # Last processed thumbnail edge

[calibration]
  pixels_per_unit = 24.16 # Pixels per physical unit
  unit = 'cm' # Physical unit written to documents

[lens]
  enabled = true # Apply lens correction
  camera_matrix = [
    [1382.18941, 0.0, 283.321583],
    [0.0, 1385.83007, 231.981042],
    [0.0, 0.0, 1.0],
  ]
  distortion = [0.11889878, 0.49877114, 0.00225353, -0.00669254, -1.36621538] # k1 k2 p1 p2 k3

[tracer]
  command = 'potrace' # Bitmap tracer
  args = ['-s'] # SVG backend
"#;
