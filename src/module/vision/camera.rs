//! Camera Functions
//!

use rscam::Config;
use std::fs;
use std::io::Write;
use std::path::Path;

use image::DynamicImage;

use crate::module::error::{Result, StationError};
use crate::module::util::conf;

/// Source of preview frames and full resolution stills.
pub trait Camera {
    /// Grabs the latest live-preview frame.
    fn capture_frame(&mut self) -> Result<DynamicImage>;

    /// Takes a full resolution still, stores the encoded bytes at `path` and returns the decoded image.
    fn capture_still(&mut self, path: &Path) -> Result<DynamicImage>;
}

/// Represents a V4L2 camera streaming MJPG frames.
///
pub struct V4l2Camera {
    cap: rscam::Camera,     // The camera instance for capturing frames.
    settings: conf::Camera, // Configuration properties for the camera.
}

impl V4l2Camera {
    /// Opens the device and starts streaming at preview resolution.
    ///
    /// # Arguments
    ///
    /// * `settings` - The camera section of the configuration.
    ///
    pub fn new(settings: &conf::Camera) -> Result<Self> {
        let cap = rscam::Camera::new(&settings.device)
            .map_err(|e| StationError::Hardware(format!("{}: {}", settings.device, e)))?;
        let mut camera = Self {
            cap,
            settings: settings.clone(),
        };
        camera.start((settings.preview_width, settings.preview_height))?;
        log::info!(
            "Camera {} opened at {}x{}",
            settings.device,
            settings.preview_width,
            settings.preview_height
        );
        Ok(camera)
    }

    fn start(&mut self, resolution: (u32, u32)) -> Result<()> {
        self.cap
            .start(&Config {
                interval: (1, self.settings.fps),
                resolution,
                format: b"MJPG",
                nbuffers: 1,
                ..Default::default()
            })
            .map_err(|e| StationError::Hardware(format!("start {:?}: {}", resolution, e)))
    }

    fn stop(&mut self) -> Result<()> {
        self.cap
            .stop()
            .map_err(|e| StationError::Hardware(format!("stop: {}", e)))
    }

    fn grab(&self) -> Result<rscam::Frame> {
        self.cap
            .capture()
            .map_err(|e| StationError::Hardware(format!("capture: {}", e)))
    }

    fn still(&mut self, path: &Path) -> Result<DynamicImage> {
        self.start((self.settings.still_width, self.settings.still_height))?;
        // Grab a few frames to let exposure settle.
        for _ in 0..self.settings.grab_times {
            let _ = self.grab();
        }
        let frame = self.grab()?;

        let mut file = fs::File::create(path)?;
        file.write_all(&frame[..])?;
        Ok(image::load_from_memory(&frame[..])?)
    }
}

impl Camera for V4l2Camera {
    fn capture_frame(&mut self) -> Result<DynamicImage> {
        let frame = self.grab()?;
        image::load_from_memory(&frame[..])
            .map_err(|e| StationError::Hardware(format!("undecodable frame: {}", e)))
    }

    fn capture_still(&mut self, path: &Path) -> Result<DynamicImage> {
        self.stop()?;
        let res = self.still(path);
        // Back to preview whatever happened to the still.
        let _ = self.stop();
        self.start((self.settings.preview_width, self.settings.preview_height))?;
        res
    }
}

impl Drop for V4l2Camera {
    fn drop(&mut self) {
        log::info!("Camera {} released", self.settings.device);
    }
}
