//! Crop Region
//!
//! The operator drags a rectangle over the live preview to mark the active work
//! area. Once finalized the rectangle is locked until the next reset, and every
//! still is cut to it after being mapped from preview pixels to still pixels.

use image::DynamicImage;

use crate::module::error::{Result, ValidationError};

/// A point in live-preview pixel space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Axis-aligned rectangle given by two corners.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rectangle {
    pub x0: f64,
    pub y0: f64,
    pub x1: f64,
    pub y1: f64,
}

impl Rectangle {
    pub fn new(x0: f64, y0: f64, x1: f64, y1: f64) -> Self {
        Self { x0, y0, x1, y1 }
    }

    /// Swaps corners so that `x0 <= x1` and `y0 <= y1`.
    pub fn normalized(self) -> Self {
        Self {
            x0: self.x0.min(self.x1),
            y0: self.y0.min(self.y1),
            x1: self.x0.max(self.x1),
            y1: self.y0.max(self.y1),
        }
    }

    /// Normalizes and clamps to `[0, width] x [0, height]`.
    pub fn clamped(self, width: u32, height: u32) -> Self {
        let r = self.normalized();
        let (w, h) = (width as f64, height as f64);
        Self {
            x0: r.x0.clamp(0.0, w),
            y0: r.y0.clamp(0.0, h),
            x1: r.x1.clamp(0.0, w),
            y1: r.y1.clamp(0.0, h),
        }
    }

    pub fn width(&self) -> f64 {
        (self.x1 - self.x0).abs()
    }

    pub fn height(&self) -> f64 {
        (self.y1 - self.y0).abs()
    }
}

/// Integer crop window `(x, y, width, height)` in target image pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PixelRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

/// Operator-adjustable capture area.
#[derive(Debug, Clone, Default)]
pub struct CropRegion {
    rect: Option<Rectangle>,
    finalized: bool,
}

impl CropRegion {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts a new rectangle at `point`. Ignored once finalized.
    pub fn begin(&mut self, point: Point) -> bool {
        if self.finalized {
            return false;
        }
        self.rect = Some(Rectangle::new(point.x, point.y, point.x, point.y));
        true
    }

    /// Moves the second corner to `point`. Ignored once finalized or before `begin`.
    pub fn update(&mut self, point: Point) -> bool {
        if self.finalized {
            return false;
        }
        match self.rect.as_mut() {
            Some(rect) => {
                rect.x1 = point.x;
                rect.y1 = point.y;
                true
            }
            None => false,
        }
    }

    /// Places the second corner and normalizes. Does not finalize.
    pub fn finish(&mut self, point: Point) -> bool {
        if !self.update(point) {
            return false;
        }
        self.rect = self.rect.map(Rectangle::normalized);
        true
    }

    /// Locks the region. Without a drawn rectangle the whole frame is used.
    pub fn finalize(&mut self) {
        self.rect = self.rect.map(Rectangle::normalized);
        self.finalized = true;
        match self.rect {
            Some(r) => log::info!(
                "Crop finalized: ({:.1}, {:.1}) - ({:.1}, {:.1})",
                r.x0,
                r.y0,
                r.x1,
                r.y1
            ),
            None => log::info!("Crop finalized to the full frame."),
        }
    }

    /// Clears the rectangle and unlocks the region.
    pub fn reset(&mut self) {
        self.rect = None;
        self.finalized = false;
    }

    pub fn is_finalized(&self) -> bool {
        self.finalized
    }

    pub fn rect(&self) -> Option<Rectangle> {
        self.rect
    }

    /// Maps the preview-space rectangle onto an image of `target` size.
    ///
    /// The rectangle is clamped to the preview frame first, then scaled per axis
    /// by `target / preview`.
    pub fn map_to(&self, preview: (u32, u32), target: (u32, u32)) -> Option<PixelRect> {
        let rect = self.rect?;
        if preview.0 == 0 || preview.1 == 0 {
            return None;
        }
        let r = rect.clamped(preview.0, preview.1);
        let sx = target.0 as f64 / preview.0 as f64;
        let sy = target.1 as f64 / preview.1 as f64;
        let x0 = (r.x0 * sx).round().clamp(0.0, target.0 as f64) as u32;
        let y0 = (r.y0 * sy).round().clamp(0.0, target.1 as f64) as u32;
        let x1 = (r.x1 * sx).round().clamp(0.0, target.0 as f64) as u32;
        let y1 = (r.y1 * sy).round().clamp(0.0, target.1 as f64) as u32;
        Some(PixelRect {
            x: x0,
            y: y0,
            width: x1.saturating_sub(x0),
            height: y1.saturating_sub(y0),
        })
    }

    /// Cuts `image` to the finalized region.
    ///
    /// `preview` is the size of the live preview frame the rectangle was drawn on.
    pub fn apply(&self, image: &DynamicImage, preview: (u32, u32)) -> Result<DynamicImage> {
        if !self.finalized {
            return Err(ValidationError::CropNotFinalized.into());
        }
        let target = (image.width(), image.height());
        match self.map_to(preview, target) {
            None => Ok(image.clone()),
            Some(r) if r.width == 0 || r.height == 0 => Err(ValidationError::DegenerateCrop.into()),
            Some(r) => Ok(image.crop_imm(r.x, r.y, r.width, r.height)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::module::error::StationError;

    #[test]
    fn drag_gesture_test() {
        let mut crop = CropRegion::new();
        assert!(crop.begin(Point::new(10.0, 10.0)));
        assert!(crop.update(Point::new(50.0, 50.0)));
        assert!(crop.finish(Point::new(50.0, 50.0)));
        assert_eq!(crop.rect(), Some(Rectangle::new(10.0, 10.0, 50.0, 50.0)));
        assert!(!crop.is_finalized());
    }

    #[test]
    fn finish_normalizes_reverse_drag_test() {
        let mut crop = CropRegion::new();
        crop.begin(Point::new(80.0, 60.0));
        crop.update(Point::new(30.0, 70.0));
        crop.finish(Point::new(20.0, 5.0));
        assert_eq!(crop.rect(), Some(Rectangle::new(20.0, 5.0, 80.0, 60.0)));
    }

    #[test]
    fn finalized_region_ignores_edits_test() {
        let mut crop = CropRegion::new();
        crop.begin(Point::new(10.0, 10.0));
        crop.finish(Point::new(50.0, 50.0));
        crop.finalize();
        assert!(!crop.update(Point::new(90.0, 90.0)));
        assert!(!crop.begin(Point::new(0.0, 0.0)));
        assert_eq!(crop.rect(), Some(Rectangle::new(10.0, 10.0, 50.0, 50.0)));

        crop.reset();
        assert!(!crop.is_finalized());
        assert_eq!(crop.rect(), None);
        assert!(crop.begin(Point::new(0.0, 0.0)));
    }

    #[test]
    fn update_before_begin_is_ignored_test() {
        let mut crop = CropRegion::new();
        assert!(!crop.update(Point::new(5.0, 5.0)));
        assert!(!crop.finish(Point::new(5.0, 5.0)));
        assert_eq!(crop.rect(), None);
    }

    #[test]
    fn maps_proportionally_to_still_test() {
        let mut crop = CropRegion::new();
        crop.begin(Point::new(-20.0, 40.0));
        crop.finish(Point::new(320.0, 700.0));
        // Clamped to the 640x480 preview, then doubled for a 1280x960 still.
        let r = crop.map_to((640, 480), (1280, 960)).unwrap();
        assert_eq!(
            r,
            PixelRect {
                x: 0,
                y: 80,
                width: 640,
                height: 880
            }
        );
        // Same size: applied verbatim.
        let r = crop.map_to((640, 480), (640, 480)).unwrap();
        assert_eq!((r.x, r.y, r.width, r.height), (0, 40, 320, 440));
    }

    #[test]
    fn apply_requires_finalize_test() {
        let mut crop = CropRegion::new();
        crop.begin(Point::new(10.0, 10.0));
        crop.finish(Point::new(50.0, 30.0));
        let img = DynamicImage::new_rgb8(100, 100);
        let res = crop.apply(&img, (100, 100));
        assert!(matches!(
            res,
            Err(StationError::Validation(ValidationError::CropNotFinalized))
        ));
        crop.finalize();
        let out = crop.apply(&img, (100, 100)).unwrap();
        assert_eq!((out.width(), out.height()), (40, 20));
    }

    #[test]
    fn full_frame_and_degenerate_test() {
        let mut crop = CropRegion::new();
        crop.finalize();
        let img = DynamicImage::new_rgb8(30, 20);
        assert_eq!(crop.apply(&img, (30, 20)).unwrap().width(), 30);

        let mut line = CropRegion::new();
        line.begin(Point::new(10.0, 10.0));
        line.finish(Point::new(10.0, 15.0));
        line.finalize();
        assert!(matches!(
            line.apply(&img, (30, 20)),
            Err(StationError::Validation(ValidationError::DegenerateCrop))
        ));
    }
}
