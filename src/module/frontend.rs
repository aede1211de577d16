//! Operator facing surface.
//!
//! The kiosk window lives outside this crate. The station talks to it only
//! through [`Frontend`]: it hands over images and messages, and polls touch
//! gestures back.

use std::path::PathBuf;

use image::DynamicImage;

use crate::module::action::TouchEvent;
use crate::module::error::Result;
use crate::module::util::conf::Config;
use crate::module::util::path::StationPath;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusLevel {
    Info,
    Error,
}

pub trait Frontend {
    /// Asks the operator for an output directory and a label.
    fn request_location(&mut self) -> Option<(PathBuf, String)>;

    fn show_preview(&mut self, frame: &DynamicImage) -> Result<()>;

    /// Shows the last processed capture next to the running count.
    fn show_last_processed(&mut self, image: &DynamicImage, count: usize) -> Result<()>;

    fn show_status(&mut self, message: &str, level: StatusLevel);

    /// Next pending touch gesture, if any.
    fn poll_touch(&mut self) -> Option<TouchEvent>;
}

/// Frontend without a screen.
///
/// Images go to the tmp directory for an external viewer, statuses go to the
/// log and the output location is taken from the configuration.
#[derive(Debug, Clone)]
pub struct HeadlessFrontend {
    preview: PathBuf,
    last: PathBuf,
    thumbnail_size: u32,
    location: (PathBuf, String),
}

impl HeadlessFrontend {
    pub fn new(path: &StationPath, conf: &Config) -> Self {
        Self {
            preview: PathBuf::from(&path.img.preview),
            last: PathBuf::from(&path.img.last),
            thumbnail_size: conf.preview.thumbnail_size,
            location: (
                PathBuf::from(&conf.system.output_dir),
                conf.system.label.clone(),
            ),
        }
    }
}

impl Frontend for HeadlessFrontend {
    fn request_location(&mut self) -> Option<(PathBuf, String)> {
        Some(self.location.clone())
    }

    fn show_preview(&mut self, frame: &DynamicImage) -> Result<()> {
        DynamicImage::ImageRgb8(frame.to_rgb8()).save(&self.preview)?;
        Ok(())
    }

    fn show_last_processed(&mut self, image: &DynamicImage, count: usize) -> Result<()> {
        let thumb = image.thumbnail(self.thumbnail_size, self.thumbnail_size);
        DynamicImage::ImageRgb8(thumb.to_rgb8()).save(&self.last)?;
        log::info!("Processed images: {}", count);
        Ok(())
    }

    fn show_status(&mut self, message: &str, level: StatusLevel) {
        match level {
            StatusLevel::Info => log::info!("{}", message),
            StatusLevel::Error => log::error!("{}", message),
        }
    }

    fn poll_touch(&mut self) -> Option<TouchEvent> {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::module::util::{conf, path};

    #[test]
    fn headless_writes_images_test() {
        let persistent = tempfile::tempdir().unwrap();
        let ephemeral = tempfile::tempdir().unwrap();
        let paths = path::dir::create_app_sub_dir_in(
            persistent.path().to_str().unwrap(),
            ephemeral.path().to_str().unwrap(),
        )
        .unwrap();
        let conf = conf::toml::default().unwrap();
        let mut front = HeadlessFrontend::new(&paths, &conf);

        let frame = DynamicImage::new_rgb8(64, 48);
        front.show_preview(&frame).unwrap();
        let saved = image::open(&paths.img.preview).unwrap();
        assert_eq!((saved.width(), saved.height()), (64, 48));

        let still = DynamicImage::new_luma8(800, 400);
        front.show_last_processed(&still, 3).unwrap();
        let thumb = image::open(&paths.img.last).unwrap();
        assert_eq!((thumb.width(), thumb.height()), (200, 100));

        let (dir, label) = front.request_location().unwrap();
        assert_eq!(dir, PathBuf::from("/home/pi/shadowboards"));
        assert_eq!(label, "board");
        assert_eq!(front.poll_touch(), None);
    }
}
