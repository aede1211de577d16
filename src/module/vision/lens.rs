//! Lens Correction
//!
//! Removes barrel distortion from camera frames with a fixed pinhole + Brown-Conrady
//! model computed offline. Every frame size gets its own remap table and valid-pixel
//! rectangle, built once and cached.

use std::collections::HashMap;

use image::{imageops, DynamicImage, ImageBuffer, Luma, Pixel, Rgb};
use ndarray::Array2;

use crate::module::util::conf;

/// Sample count per image edge when estimating the undistorted frame bounds.
const EDGE_SAMPLES: usize = 9;

/// Pinhole camera intrinsics.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Intrinsics {
    pub fx: f64,
    pub fy: f64,
    pub cx: f64,
    pub cy: f64,
}

impl Intrinsics {
    /// Reads fx, fy, cx, cy out of a 3x3 camera matrix.
    pub fn from_matrix(k: &[[f64; 3]; 3]) -> Self {
        Self {
            fx: k[0][0],
            fy: k[1][1],
            cx: k[0][2],
            cy: k[1][2],
        }
    }

    pub fn is_valid(&self) -> bool {
        [self.fx, self.fy, self.cx, self.cy]
            .iter()
            .all(|v| v.is_finite())
            && self.fx.abs() > 1e-12
            && self.fy.abs() > 1e-12
    }

    fn to_normalized(self, px: [f64; 2]) -> [f64; 2] {
        [(px[0] - self.cx) / self.fx, (px[1] - self.cy) / self.fy]
    }

    fn to_pixel(self, xn: [f64; 2]) -> [f64; 2] {
        [self.fx * xn[0] + self.cx, self.fy * xn[1] + self.cy]
    }
}

/// Radial-tangential distortion coefficients, ordered k1 k2 p1 p2 k3.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Distortion {
    pub k1: f64,
    pub k2: f64,
    pub p1: f64,
    pub p2: f64,
    pub k3: f64,
}

impl Distortion {
    /// Missing trailing coefficients are zero, extra ones are ignored.
    pub fn from_slice(coeffs: &[f64]) -> Self {
        let at = |i: usize| coeffs.get(i).copied().unwrap_or(0.0);
        Self {
            k1: at(0),
            k2: at(1),
            p1: at(2),
            p2: at(3),
            k3: at(4),
        }
    }

    fn tangential(&self, x: f64, y: f64, r2: f64) -> [f64; 2] {
        [
            2.0 * self.p1 * x * y + self.p2 * (r2 + 2.0 * x * x),
            self.p1 * (r2 + 2.0 * y * y) + 2.0 * self.p2 * x * y,
        ]
    }

    fn radial(&self, r2: f64) -> f64 {
        1.0 + self.k1 * r2 + self.k2 * r2 * r2 + self.k3 * r2 * r2 * r2
    }

    /// Apply distortion to normalized coordinates.
    pub fn distort(&self, xn: [f64; 2]) -> [f64; 2] {
        let [x, y] = xn;
        let r2 = x * x + y * y;
        let radial = self.radial(r2);
        let tan = self.tangential(x, y, r2);
        [x * radial + tan[0], y * radial + tan[1]]
    }

    /// Invert [`Distortion::distort`] by fixed-point iteration.
    pub fn undistort(&self, xd: [f64; 2]) -> Option<[f64; 2]> {
        let [mut x, mut y] = xd;
        for _ in 0..20 {
            let r2 = x * x + y * y;
            let radial = self.radial(r2);
            if !radial.is_finite() || radial.abs() < 1e-12 {
                return None;
            }
            let tan = self.tangential(x, y, r2);
            let nx = (xd[0] - tan[0]) / radial;
            let ny = (xd[1] - tan[1]) / radial;
            if !nx.is_finite() || !ny.is_finite() {
                return None;
            }
            let step = (nx - x).hypot(ny - y);
            x = nx;
            y = ny;
            if step < 1e-12 {
                break;
            }
        }
        Some([x, y])
    }
}

/// Valid-pixel rectangle of an undistorted frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Roi {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

/// Fixed lens model: intrinsic matrix plus distortion coefficients.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LensModel {
    pub intrinsics: Intrinsics,
    pub distortion: Distortion,
}

impl LensModel {
    /// Builds a model, rejecting a degenerate camera matrix.
    pub fn new(matrix: &[[f64; 3]; 3], coeffs: &[f64]) -> Option<Self> {
        let intrinsics = Intrinsics::from_matrix(matrix);
        if !intrinsics.is_valid() {
            return None;
        }
        Some(Self {
            intrinsics,
            distortion: Distortion::from_slice(coeffs),
        })
    }

    /// The configured model, or `None` when correction is switched off or unusable.
    pub fn from_config(conf: &conf::Lens) -> Option<Self> {
        if !conf.enabled {
            return None;
        }
        let model = Self::new(&conf.camera_matrix, &conf.distortion);
        if model.is_none() {
            log::warn!("Lens model is invalid, running without lens correction.");
        }
        model
    }

    /// Maps a raw (distorted) pixel to an undistorted pixel in the same camera.
    pub fn undistort_pixel(&self, px: [f64; 2]) -> Option<[f64; 2]> {
        let xn = self
            .distortion
            .undistort(self.intrinsics.to_normalized(px))?;
        Some(self.intrinsics.to_pixel(xn))
    }

    /// Optimal new camera matrix keeping every source pixel (free scaling 1),
    /// and the rectangle of output pixels that only sample inside the source.
    pub fn optimal_intrinsics(&self, width: u32, height: u32) -> Option<(Intrinsics, Roi)> {
        if width == 0 || height == 0 {
            return None;
        }
        let (w, h) = ((width - 1) as f64, (height - 1) as f64);
        let n = EDGE_SAMPLES;
        let mut outer = [f64::MAX, f64::MAX, f64::MIN, f64::MIN];
        let mut inner = [f64::MIN, f64::MIN, f64::MAX, f64::MAX];
        for j in 0..n {
            for i in 0..n {
                let px = [w * i as f64 / (n - 1) as f64, h * j as f64 / (n - 1) as f64];
                let [x, y] = self
                    .distortion
                    .undistort(self.intrinsics.to_normalized(px))?;
                outer = [outer[0].min(x), outer[1].min(y), outer[2].max(x), outer[3].max(y)];
                if i == 0 {
                    inner[0] = inner[0].max(x);
                }
                if i == n - 1 {
                    inner[2] = inner[2].min(x);
                }
                if j == 0 {
                    inner[1] = inner[1].max(y);
                }
                if j == n - 1 {
                    inner[3] = inner[3].min(y);
                }
            }
        }
        let (ow, oh) = (outer[2] - outer[0], outer[3] - outer[1]);
        if ow <= 0.0 || oh <= 0.0 {
            return None;
        }
        let fx = w / ow;
        let fy = h / oh;
        let k = Intrinsics {
            fx,
            fy,
            cx: -fx * outer[0],
            cy: -fy * outer[1],
        };

        let eps = 1e-6;
        let x0 = (inner[0] * k.fx + k.cx - eps).ceil().clamp(0.0, w);
        let y0 = (inner[1] * k.fy + k.cy - eps).ceil().clamp(0.0, h);
        let x1 = (inner[2] * k.fx + k.cx + eps).floor().clamp(x0, w);
        let y1 = (inner[3] * k.fy + k.cy + eps).floor().clamp(y0, h);
        let roi = Roi {
            x: x0 as u32,
            y: y0 as u32,
            width: (x1 - x0) as u32 + 1,
            height: (y1 - y0) as u32 + 1,
        };
        Some((k, roi))
    }

    /// Per-pixel source coordinates for an undistorted frame of the given size.
    pub fn remap_table(&self, width: u32, height: u32) -> Option<RemapTable> {
        let (k, roi) = self.optimal_intrinsics(width, height)?;
        let shape = (height as usize, width as usize);
        let mut map_x = Array2::<f32>::zeros(shape);
        let mut map_y = Array2::<f32>::zeros(shape);
        for ((v, u), mx) in map_x.indexed_iter_mut() {
            let xn = k.to_normalized([u as f64, v as f64]);
            let src = self.intrinsics.to_pixel(self.distortion.distort(xn));
            *mx = src[0] as f32;
            map_y[[v, u]] = src[1] as f32;
        }
        Some(RemapTable { map_x, map_y, roi })
    }

    /// Undistorts and crops one image. Zero-sized images pass through.
    pub fn undistort(&self, image: &DynamicImage) -> DynamicImage {
        match self.remap_table(image.width(), image.height()) {
            Some(table) => table.apply(image),
            None => image.clone(),
        }
    }
}

/// Precomputed undistortion remap for one frame size.
#[derive(Debug, Clone)]
pub struct RemapTable {
    map_x: Array2<f32>,
    map_y: Array2<f32>,
    pub roi: Roi,
}

impl RemapTable {
    /// Frame size the table was built for.
    pub fn size(&self) -> (u32, u32) {
        let (h, w) = self.map_x.dim();
        (w as u32, h as u32)
    }

    /// Remaps `image` and crops to the valid-pixel rectangle.
    /// Images of another size are returned unchanged.
    pub fn apply(&self, image: &DynamicImage) -> DynamicImage {
        if (image.width(), image.height()) != self.size() {
            log::warn!(
                "Remap table is {:?}, frame is {}x{}. Skipping lens correction.",
                self.size(),
                image.width(),
                image.height()
            );
            return image.clone();
        }
        let Roi {
            x,
            y,
            width,
            height,
        } = self.roi;
        match image {
            DynamicImage::ImageLuma8(gray) => {
                let out = self.warp(gray, Luma([0u8]));
                DynamicImage::ImageLuma8(imageops::crop_imm(&out, x, y, width, height).to_image())
            }
            other => {
                let out = self.warp(&other.to_rgb8(), Rgb([0u8, 0, 0]));
                DynamicImage::ImageRgb8(imageops::crop_imm(&out, x, y, width, height).to_image())
            }
        }
    }

    fn warp<P>(&self, image: &ImageBuffer<P, Vec<u8>>, border: P) -> ImageBuffer<P, Vec<u8>>
    where
        P: Pixel<Subpixel = u8>,
    {
        let (h, w) = self.map_x.dim();
        ImageBuffer::from_fn(w as u32, h as u32, |u, v| {
            let (r, c) = (v as usize, u as usize);
            sample_bilinear(image, self.map_x[[r, c]], self.map_y[[r, c]]).unwrap_or(border)
        })
    }
}

/// Bilinear sample at a sub-pixel position. Positions more than half a pixel
/// outside the image yield `None`.
fn sample_bilinear<P>(image: &ImageBuffer<P, Vec<u8>>, x: f32, y: f32) -> Option<P>
where
    P: Pixel<Subpixel = u8>,
{
    let (w, h) = image.dimensions();
    if w == 0 || h == 0 || !x.is_finite() || !y.is_finite() {
        return None;
    }
    if x <= -0.5 || y <= -0.5 || x >= w as f32 - 0.5 || y >= h as f32 - 0.5 {
        return None;
    }
    let x = x.clamp(0.0, (w - 1) as f32);
    let y = y.clamp(0.0, (h - 1) as f32);
    let (x0, y0) = (x.floor() as u32, y.floor() as u32);
    let (x1, y1) = ((x0 + 1).min(w - 1), (y0 + 1).min(h - 1));
    let (ax, ay) = (x - x0 as f32, y - y0 as f32);

    let p00 = image.get_pixel(x0, y0);
    let p10 = image.get_pixel(x1, y0);
    let p01 = image.get_pixel(x0, y1);
    let p11 = image.get_pixel(x1, y1);
    let mut out = *p00;
    for (c, value) in out.channels_mut().iter_mut().enumerate() {
        let top = p00.channels()[c] as f32 * (1.0 - ax) + p10.channels()[c] as f32 * ax;
        let bottom = p01.channels()[c] as f32 * (1.0 - ax) + p11.channels()[c] as f32 * ax;
        *value = (top * (1.0 - ay) + bottom * ay).round().clamp(0.0, 255.0) as u8;
    }
    Some(out)
}

/// Lens correction with per-size table caching. Passthrough without a model.
#[derive(Debug, Default)]
pub struct Undistorter {
    model: Option<LensModel>,
    tables: HashMap<(u32, u32), Option<RemapTable>>,
}

impl Undistorter {
    pub fn new(model: Option<LensModel>) -> Self {
        Self {
            model,
            tables: HashMap::new(),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.model.is_some()
    }

    pub fn undistort(&mut self, image: &DynamicImage) -> DynamicImage {
        let Some(model) = self.model else {
            return image.clone();
        };
        let size = (image.width(), image.height());
        let table = self.tables.entry(size).or_insert_with(|| {
            log::debug!("Building remap table for {}x{}", size.0, size.1);
            let table = model.remap_table(size.0, size.1);
            if table.is_none() {
                log::warn!(
                    "No remap table for {}x{}, frames of this size pass through uncorrected.",
                    size.0,
                    size.1
                );
            }
            table
        });
        match table {
            Some(table) => table.apply(image),
            None => image.clone(),
        }
    }
}
