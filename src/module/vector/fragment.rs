//! Unit Calibration
//!
//! Attaches physical dimensions to traced documents. The view box stays in
//! pixels while `width`/`height` carry physical units, so documents scale
//! consistently when stacked later.

use super::svg;
use super::VectorPath;
use crate::module::error::{Result, ValidationError};

/// Pixels per physical unit. Always positive and finite.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CalibrationScalar(f64);

impl CalibrationScalar {
    pub fn new(pixels_per_unit: f64) -> Result<Self> {
        if pixels_per_unit.is_finite() && pixels_per_unit > 0.0 {
            Ok(Self(pixels_per_unit))
        } else {
            Err(ValidationError::InvalidCalibration(pixels_per_unit).into())
        }
    }

    pub fn pixels_per_unit(&self) -> f64 {
        self.0
    }

    /// Pixel extent to physical length.
    pub fn to_units(&self, pixels: f64) -> f64 {
        pixels / self.0
    }

    /// Physical length back to pixel extent.
    pub fn to_pixels(&self, units: f64) -> f64 {
        units * self.0
    }
}

/// One capture's dimensioned vector document.
#[derive(Debug, Clone, PartialEq)]
pub struct VectorFragment {
    document: String,
    width: f64,
    height: f64,
    pixel_width: f64,
    pixel_height: f64,
    unit: String,
}

impl VectorFragment {
    /// Reads a previously stamped document back, trusting its declared dimensions.
    pub fn from_document(document: String, scalar: CalibrationScalar, unit: &str) -> Result<Self> {
        let (width, height) = declared_size(&document, unit)?;
        Ok(Self {
            pixel_width: scalar.to_pixels(width),
            pixel_height: scalar.to_pixels(height),
            document,
            width,
            height,
            unit: unit.to_string(),
        })
    }

    pub fn document(&self) -> &str {
        &self.document
    }

    /// Physical width.
    pub fn width(&self) -> f64 {
        self.width
    }

    /// Physical height.
    pub fn height(&self) -> f64 {
        self.height
    }

    /// Pixel extents the physical dimensions were derived from.
    pub fn pixel_size(&self) -> (f64, f64) {
        (self.pixel_width, self.pixel_height)
    }

    pub fn unit(&self) -> &str {
        &self.unit
    }
}

/// Stamps physical dimensions onto a traced document.
///
/// `pixels` is the size of the image that was traced. The root element gets
/// `width`/`height` in `unit` and a `viewBox` of `0 0 pixel_width pixel_height`.
pub fn stamp(
    pixels: (u32, u32),
    raw: &VectorPath,
    scalar: CalibrationScalar,
    unit: &str,
) -> Result<VectorFragment> {
    let root = svg::root(&raw.svg).ok_or_else(|| {
        ValidationError::MalformedDocument("tracer output has no svg root".to_string())
    })?;
    let (pw, ph) = (pixels.0 as f64, pixels.1 as f64);
    let (width, height) = (scalar.to_units(pw), scalar.to_units(ph));

    let tag = root.tag(&raw.svg);
    let tag = svg::set_attr(tag, "width", &format!("{}{}", svg::format_number(width), unit));
    let tag = svg::set_attr(&tag, "height", &format!("{}{}", svg::format_number(height), unit));
    let tag = svg::set_attr(
        &tag,
        "viewBox",
        &format!("0 0 {} {}", svg::format_number(pw), svg::format_number(ph)),
    );

    let mut document = String::with_capacity(raw.svg.len() + 64);
    document.push_str(&raw.svg[..root.open_start]);
    document.push_str(&tag);
    document.push_str(&raw.svg[root.open_end..]);

    log::debug!(
        "Stamped {}x{} px as {}{} x {}{}",
        pixels.0,
        pixels.1,
        svg::format_number(width),
        unit,
        svg::format_number(height),
        unit
    );
    Ok(VectorFragment {
        document,
        width,
        height,
        pixel_width: pw,
        pixel_height: ph,
        unit: unit.to_string(),
    })
}

/// Declared physical `(width, height)` of a stamped document.
pub fn declared_size(document: &str, unit: &str) -> Result<(f64, f64)> {
    let root = svg::root(document)
        .ok_or_else(|| ValidationError::MalformedDocument("no svg root".to_string()))?;
    let tag = root.tag(document);
    let read = |name: &str| -> Result<f64> {
        let value = svg::get_attr(tag, name).ok_or_else(|| {
            ValidationError::MalformedDocument(format!("missing {} attribute", name))
        })?;
        match svg::parse_length(&value) {
            Some((v, u)) if u == unit && v.is_finite() => Ok(v),
            _ => Err(ValidationError::MalformedDocument(format!(
                "{}=\"{}\" is not a length in {}",
                name, value, unit
            ))
            .into()),
        }
    };
    Ok((read("width")?, read("height")?))
}
