//! Silhouette Extractor
//!
//! Reduces a cropped still to the outline of the dark object lying on the
//! light board, then traces that outline into a vector document.

use std::path::Path;

use image::{imageops, DynamicImage, GrayImage, Luma};
use imageproc::contours::{self, BorderType};
use imageproc::contrast;
use imageproc::drawing::draw_line_segment_mut;

use super::tracer::Tracer;
use crate::module::define::silhouette::{STROKE, THRESHOLD};
use crate::module::error::Result;
use crate::module::vector::VectorPath;

/// Outline mask ready for tracing: black strokes on white.
#[derive(Debug, Clone)]
pub struct Silhouette {
    pub mask: GrayImage,
    /// Number of outer boundaries drawn.
    pub contours: usize,
}

/// Builds the outline mask of every dark region in `image`.
///
/// Holes inside a region are ignored. A frame with no dark region yields a
/// blank (all white) mask.
pub fn outline_mask(image: &DynamicImage) -> Silhouette {
    let gray = image.to_luma8();
    let mut foreground = contrast::threshold(&gray, THRESHOLD);
    imageops::invert(&mut foreground);

    let outer: Vec<_> = contours::find_contours::<i32>(&foreground)
        .into_iter()
        .filter(|c| c.border_type == BorderType::Outer)
        .collect();

    let mut mask = GrayImage::new(gray.width(), gray.height());
    for contour in &outer {
        let points = &contour.points;
        for (i, a) in points.iter().enumerate() {
            let b = &points[(i + 1) % points.len()];
            for dy in 0..STROKE {
                for dx in 0..STROKE {
                    draw_line_segment_mut(
                        &mut mask,
                        ((a.x + dx as i32) as f32, (a.y + dy as i32) as f32),
                        ((b.x + dx as i32) as f32, (b.y + dy as i32) as f32),
                        Luma([255u8]),
                    );
                }
            }
        }
    }
    imageops::invert(&mut mask);

    log::debug!("Found {} outer contours", outer.len());
    Silhouette {
        mask,
        contours: outer.len(),
    }
}

/// Extracts the silhouette of `image` and traces it into `output`.
pub fn extract<T: Tracer + ?Sized>(
    image: &DynamicImage,
    tracer: &T,
    output: &Path,
) -> Result<VectorPath> {
    let silhouette = outline_mask(image);
    if silhouette.contours == 0 {
        log::warn!("No silhouette found, tracing a blank mask");
    }
    tracer.trace(&silhouette.mask, output)
}
