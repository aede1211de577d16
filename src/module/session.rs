//! Capture Session
//!
//! Owns the output location, the running fragment list and the file counter.
//! A capture goes still -> lens correction -> crop -> silhouette -> trace ->
//! unit stamp, and a combine stacks every fragment collected so far.

use std::fs;
use std::path::{Path, PathBuf};

use image::DynamicImage;

use crate::module::define::output;
use crate::module::error::{Result, ValidationError};
use crate::module::vector::compose;
use crate::module::vector::fragment::{self, CalibrationScalar, VectorFragment};
use crate::module::vision::camera::Camera;
use crate::module::vision::crop::CropRegion;
use crate::module::vision::lens::Undistorter;
use crate::module::vision::silhouette;
use crate::module::vision::tracer::Tracer;

/// Output folder `<dir>/<label>` with its `photos/` and `svgs/` subfolders.
#[derive(Debug, Clone, PartialEq)]
pub struct OutputLocation {
    root: PathBuf,
    label: String,
}

impl OutputLocation {
    /// Creates the folder layout if needed.
    pub fn new(dir: &Path, label: &str) -> Result<Self> {
        let location = Self {
            root: dir.join(label),
            label: label.to_string(),
        };
        fs::create_dir_all(location.root.join(output::PHOTO_DIR))?;
        fs::create_dir_all(location.root.join(output::SVG_DIR))?;
        Ok(location)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn photo_path(&self, n: usize) -> PathBuf {
        self.root.join(output::PHOTO_DIR).join(output::photo_name(n))
    }

    pub fn svg_path(&self, n: usize) -> PathBuf {
        self.root.join(output::SVG_DIR).join(output::svg_name(n))
    }

    pub fn combined_path(&self) -> PathBuf {
        self.root.join(output::COMBINED_FILE)
    }

    /// Highest still index stored here, or 0 when there is none.
    ///
    /// Gaps left by deleted stills do not lower it.
    pub fn last_photo_index(&self) -> Result<usize> {
        let suffix = format!(".{}", output::PHOTO_EXT);
        let mut last = 0;
        for entry in fs::read_dir(self.root.join(output::PHOTO_DIR))? {
            let name = entry?.file_name();
            let name = name.to_string_lossy();
            let index = name
                .strip_prefix(output::PHOTO_PREFIX)
                .and_then(|rest| rest.strip_suffix(&suffix))
                .and_then(|n| n.parse::<usize>().ok());
            if let Some(index) = index {
                last = last.max(index);
            }
        }
        Ok(last)
    }
}

/// Fixed processing stages applied to every still.
#[derive(Debug)]
pub struct Pipeline<T: Tracer> {
    pub undistorter: Undistorter,
    pub tracer: T,
    pub scalar: CalibrationScalar,
    pub unit: String,
}

impl<T: Tracer> Pipeline<T> {
    pub fn new(undistorter: Undistorter, tracer: T, scalar: CalibrationScalar, unit: &str) -> Self {
        Self {
            undistorter,
            tracer,
            scalar,
            unit: unit.to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// No output location yet.
    Idle,
    Ready,
}

/// Result of one successful capture.
#[derive(Debug, Clone)]
pub struct CaptureOutcome {
    pub index: usize,
    pub photo: PathBuf,
    pub svg: PathBuf,
    /// Corrected and cropped still, for the last processed view.
    pub processed: DynamicImage,
    /// Fragments collected in this session.
    pub count: usize,
}

pub struct CaptureSession<T: Tracer> {
    pipeline: Pipeline<T>,
    location: Option<OutputLocation>,
    fragments: Vec<VectorFragment>,
    counter: usize,
}

impl<T: Tracer> CaptureSession<T> {
    pub fn new(pipeline: Pipeline<T>) -> Self {
        Self {
            pipeline,
            location: None,
            fragments: Vec::new(),
            counter: 0,
        }
    }

    /// Selects the output location. Numbering resumes after the stills already there.
    pub fn configure(&mut self, dir: &Path, label: &str) -> Result<()> {
        let location = OutputLocation::new(dir, label)?;
        self.counter = location.last_photo_index()?;
        self.fragments.clear();
        log::info!(
            "Output location {} (last photo {})",
            location.root().display(),
            self.counter
        );
        self.location = Some(location);
        Ok(())
    }

    pub fn state(&self) -> SessionState {
        match self.location {
            Some(_) => SessionState::Ready,
            None => SessionState::Idle,
        }
    }

    pub fn location(&self) -> Option<&OutputLocation> {
        self.location.as_ref()
    }

    pub fn fragments(&self) -> &[VectorFragment] {
        &self.fragments
    }

    /// Index of the last persisted still.
    pub fn counter(&self) -> usize {
        self.counter
    }

    /// Lens-corrects a live frame for display and crop drawing.
    pub fn undistort_preview(&mut self, frame: &DynamicImage) -> DynamicImage {
        self.pipeline.undistorter.undistort(frame)
    }

    /// Takes a still and turns it into the next fragment.
    ///
    /// `preview` is the size of the frame the crop was drawn on. Once the still
    /// is on disk it stays there and its number is consumed, even when a later
    /// stage fails.
    pub fn capture(
        &mut self,
        camera: &mut dyn Camera,
        crop: &CropRegion,
        preview: (u32, u32),
    ) -> Result<CaptureOutcome> {
        let location = self
            .location
            .clone()
            .ok_or(ValidationError::NoOutputLocation)?;
        if !crop.is_finalized() {
            return Err(ValidationError::CropNotFinalized.into());
        }
        self.run_capture(&location, camera, crop, preview)
    }

    fn run_capture(
        &mut self,
        location: &OutputLocation,
        camera: &mut dyn Camera,
        crop: &CropRegion,
        preview: (u32, u32),
    ) -> Result<CaptureOutcome> {
        let index = self.counter + 1;
        let photo = location.photo_path(index);
        let svg = location.svg_path(index);

        let still = camera.capture_still(&photo)?;
        self.counter = index;
        log::info!("Captured {}", photo.display());

        let corrected = self.pipeline.undistorter.undistort(&still);
        let processed = crop.apply(&corrected, preview)?;
        let raw = silhouette::extract(&processed, &self.pipeline.tracer, &svg)?;
        let fragment = fragment::stamp(
            (processed.width(), processed.height()),
            &raw,
            self.pipeline.scalar,
            &self.pipeline.unit,
        )?;
        fs::write(&svg, fragment.document())?;
        log::info!(
            "Traced {} ({:.2}{} x {:.2}{})",
            svg.display(),
            fragment.width(),
            fragment.unit(),
            fragment.height(),
            fragment.unit()
        );

        self.fragments.push(fragment);
        Ok(CaptureOutcome {
            index,
            photo,
            svg,
            processed,
            count: self.fragments.len(),
        })
    }

    /// Stacks the session's fragments into the combined document and starts a new session.
    pub fn combine(&mut self) -> Result<PathBuf> {
        let location = self
            .location
            .clone()
            .ok_or(ValidationError::NoOutputLocation)?;
        if self.fragments.is_empty() {
            return Err(ValidationError::NothingToCombine.into());
        }
        self.run_combine(&location)
    }

    fn run_combine(&mut self, location: &OutputLocation) -> Result<PathBuf> {
        let description = format!(
            "{}: {} fragments, {}",
            location.label(),
            self.fragments.len(),
            chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
        );
        let doc = compose::combine(&self.fragments, self.pipeline.scalar, &self.pipeline.unit)?
            .with_description(&description);
        let path = location.combined_path();
        fs::write(&path, &doc.svg)?;
        log::info!("Combined document saved as {}", path.display());

        self.fragments.clear();
        // Files on disk are never overwritten by the next session.
        self.counter = location.last_photo_index()?;
        Ok(path)
    }
}
