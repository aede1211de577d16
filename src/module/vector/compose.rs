//! Composition Engine
//!
//! Stacks dimensioned fragments top to bottom into a single document. Each
//! fragment is translated down by the pixel height of everything before it.

use super::fragment::{CalibrationScalar, VectorFragment};
use super::svg;
use crate::module::error::{Result, ValidationError};

const SVG_NS: &str = "http://www.w3.org/2000/svg";
const XLINK_NS: &str = "http://www.w3.org/1999/xlink";

/// The stacked output of one session.
#[derive(Debug, Clone, PartialEq)]
pub struct CombinedDocument {
    pub svg: String,
    pub pixel_width: f64,
    pub pixel_height: f64,
    pub width: f64,
    pub height: f64,
    pub unit: String,
    /// Vertical translation applied to each fragment, in input order.
    pub offsets: Vec<f64>,
}

impl CombinedDocument {
    /// Inserts a `<desc>` element as the first child of the root.
    pub fn with_description(mut self, text: &str) -> Self {
        if let Some(root) = svg::root(&self.svg) {
            let desc = format!("\n<desc>{}</desc>", escape(text));
            self.svg.insert_str(root.open_end, &desc);
        }
        self
    }
}

/// Combines fragments in order.
///
/// Declared physical sizes are converted back to pixels with `scalar`, so the
/// view box spans `max width x total height` in pixels and the root `width` /
/// `height` carry those totals in `unit`.
pub fn combine(
    fragments: &[VectorFragment],
    scalar: CalibrationScalar,
    unit: &str,
) -> Result<CombinedDocument> {
    if fragments.is_empty() {
        return Err(ValidationError::NothingToCombine.into());
    }

    let mut max_width: f64 = 0.0;
    let mut total_height: f64 = 0.0;
    let mut offsets = Vec::with_capacity(fragments.len());
    let mut body = String::new();

    for (i, frag) in fragments.iter().enumerate() {
        if frag.unit() != unit {
            return Err(ValidationError::MalformedDocument(format!(
                "fragment {} is in {}, expected {}",
                i,
                frag.unit(),
                unit
            ))
            .into());
        }
        let (pw, ph) = (scalar.to_pixels(frag.width()), scalar.to_pixels(frag.height()));
        if pw <= 0.0 || ph <= 0.0 {
            return Err(ValidationError::EmptyFragment(i).into());
        }
        let root = svg::root(frag.document()).ok_or_else(|| {
            ValidationError::MalformedDocument(format!("fragment {} has no svg root", i))
        })?;
        let content = svg::strip_namespaces(root.content(frag.document()));

        body.push_str(&format!(
            "<g transform=\"translate(0,{})\">{}</g>\n",
            svg::format_number(total_height),
            content
        ));
        offsets.push(total_height);
        max_width = max_width.max(pw);
        total_height += ph;
    }

    let width = scalar.to_units(max_width);
    let height = scalar.to_units(total_height);
    let mut doc = String::with_capacity(body.len() + 256);
    doc.push_str("<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"no\"?>\n");
    doc.push_str(&format!(
        "<svg xmlns=\"{}\" xmlns:xlink=\"{}\" version=\"1.1\" width=\"{}{}\" height=\"{}{}\" viewBox=\"0 0 {} {}\">\n",
        SVG_NS,
        XLINK_NS,
        svg::format_number(width),
        unit,
        svg::format_number(height),
        unit,
        svg::format_number(max_width),
        svg::format_number(total_height),
    ));
    doc.push_str(&body);
    doc.push_str("</svg>\n");

    log::info!(
        "Combined {} fragments into {}{} x {}{}",
        fragments.len(),
        svg::format_number(width),
        unit,
        svg::format_number(height),
        unit
    );
    Ok(CombinedDocument {
        svg: doc,
        pixel_width: max_width,
        pixel_height: total_height,
        width,
        height,
        unit: unit.to_string(),
        offsets,
    })
}

fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::module::error::StationError;
    use crate::module::vector::{fragment::stamp, VectorPath};

    fn traced(w: u32, h: u32) -> VectorPath {
        VectorPath::new(format!(
            "<svg xmlns=\"http://www.w3.org/2000/svg\" width=\"{w}pt\" height=\"{h}pt\" viewBox=\"0 0 {w} {h}\"><path d=\"M0 0 L{w} {h}\"/></svg>"
        ))
    }

    fn five_cm(scalar: CalibrationScalar) -> VectorFragment {
        // 120.8 px tall at 24.16 px/cm is exactly 5cm.
        let doc = r#"<svg xmlns="http://www.w3.org/2000/svg" width="3cm" height="5cm" viewBox="0 0 72.48 120.8"><path d="M0 0"/></svg>"#;
        VectorFragment::from_document(doc.to_string(), scalar, "cm").unwrap()
    }

    #[test]
    fn three_five_cm_fragments_test() {
        let scalar = CalibrationScalar::new(24.16).unwrap();
        let frags = vec![five_cm(scalar), five_cm(scalar), five_cm(scalar)];
        let doc = combine(&frags, scalar, "cm").unwrap();

        assert!((doc.height - 15.0).abs() < 1e-9);
        assert!((doc.pixel_height - 362.4).abs() < 1e-9);
        assert!(doc.svg.contains("height=\"15cm\""));
        assert!(doc.svg.contains("width=\"3cm\""));
        assert!(doc.svg.contains("viewBox=\"0 0 72.48 362.4\""));

        let translates: Vec<&str> = doc
            .svg
            .match_indices("translate(0,")
            .map(|(i, _)| {
                let rest = &doc.svg[i + "translate(0,".len()..];
                &rest[..rest.find(')').unwrap()]
            })
            .collect();
        assert_eq!(translates, vec!["0", "120.8", "241.6"]);
        assert_eq!(doc.offsets.len(), 3);
        assert!((doc.offsets[2] - 241.6).abs() < 1e-9);
    }

    #[test]
    fn width_is_maximum_test() {
        let scalar = CalibrationScalar::new(10.0).unwrap();
        let frags = vec![
            stamp((40, 10), &traced(40, 10), scalar, "cm").unwrap(),
            stamp((90, 20), &traced(90, 20), scalar, "cm").unwrap(),
            stamp((60, 30), &traced(60, 30), scalar, "cm").unwrap(),
        ];
        let doc = combine(&frags, scalar, "cm").unwrap();
        assert_eq!(doc.pixel_width, 90.0);
        assert_eq!(doc.pixel_height, 60.0);
        assert!(doc.svg.contains("width=\"9cm\" height=\"6cm\" viewBox=\"0 0 90 60\""));
        assert_eq!(doc.svg.matches("<path").count(), 3);
        // Only the root declares a namespace.
        assert_eq!(doc.svg.matches("xmlns=").count(), 1);
    }

    #[test]
    fn stacking_is_a_pure_sum_test() {
        let scalar = CalibrationScalar::new(24.16).unwrap();
        let a = stamp((100, 37), &traced(100, 37), scalar, "cm").unwrap();
        let b = stamp((80, 51), &traced(80, 51), scalar, "cm").unwrap();
        let c = stamp((120, 19), &traced(120, 19), scalar, "cm").unwrap();

        let all = combine(&[a.clone(), b.clone(), c.clone()], scalar, "cm").unwrap();
        let ab = combine(&[a, b], scalar, "cm").unwrap();
        let c_only = combine(&[c], scalar, "cm").unwrap();
        let tol = scalar.pixels_per_unit() * 1e-4;
        assert!((all.pixel_height - (ab.pixel_height + c_only.pixel_height)).abs() < tol);
        assert!((all.offsets[2] - ab.pixel_height).abs() < tol);
    }

    #[test]
    fn unit_mismatch_is_rejected_test() {
        let scalar = CalibrationScalar::new(10.0).unwrap();
        let frag = stamp((10, 10), &traced(10, 10), scalar, "mm").unwrap();
        assert!(matches!(
            combine(&[frag], scalar, "cm"),
            Err(StationError::Validation(ValidationError::MalformedDocument(_)))
        ));
    }

    #[test]
    fn empty_input_is_rejected_test() {
        let scalar = CalibrationScalar::new(24.16).unwrap();
        assert!(matches!(
            combine(&[], scalar, "cm"),
            Err(StationError::Validation(ValidationError::NothingToCombine))
        ));
    }

    #[test]
    fn zero_size_fragment_is_rejected_test() {
        let scalar = CalibrationScalar::new(10.0).unwrap();
        let ok = stamp((10, 10), &traced(10, 10), scalar, "cm").unwrap();
        let flat = stamp((10, 0), &traced(10, 0), scalar, "cm").unwrap();
        assert!(matches!(
            combine(&[ok, flat], scalar, "cm"),
            Err(StationError::Validation(ValidationError::EmptyFragment(1)))
        ));
    }

    #[test]
    fn description_goes_after_root_test() {
        let scalar = CalibrationScalar::new(10.0).unwrap();
        let frag = stamp((10, 10), &traced(10, 10), scalar, "cm").unwrap();
        let doc = combine(&[frag], scalar, "cm")
            .unwrap()
            .with_description("board <2026>");
        let root = svg::root(&doc.svg).unwrap();
        assert!(root
            .content(&doc.svg)
            .starts_with("\n<desc>board &lt;2026&gt;</desc>"));
    }
}
