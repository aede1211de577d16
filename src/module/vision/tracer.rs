//! Bitmap Tracer
//!
//! Hands a binary mask to an external tracing program through a temporary PGM
//! file and reads back the vector document it writes.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use std::process::Command;

use image::codecs::pnm::{PnmEncoder, PnmSubtype, SampleEncoding};
use image::{ColorType, GrayImage, ImageEncoder};

use crate::module::error::{Result, StationError};
use crate::module::util::conf;
use crate::module::vector::VectorPath;

/// Converts a dark-on-light mask into a vector document written at `output`.
pub trait Tracer {
    fn trace(&self, mask: &GrayImage, output: &Path) -> Result<VectorPath>;
}

/// The `potrace` command line tool, or anything accepting `-o <out> <in.pgm>`.
#[derive(Debug, Clone)]
pub struct Potrace {
    command: String,
    args: Vec<String>,
}

impl Potrace {
    pub fn new(command: &str, args: &[String]) -> Self {
        Self {
            command: command.to_string(),
            args: args.to_vec(),
        }
    }

    pub fn from_config(conf: &conf::Tracer) -> Self {
        Self::new(&conf.command, &conf.args)
    }
}

impl Tracer for Potrace {
    fn trace(&self, mask: &GrayImage, output: &Path) -> Result<VectorPath> {
        let mut tmp = tempfile::Builder::new()
            .prefix("mask_")
            .suffix(".pgm")
            .tempfile()?;
        write_pgm(mask, tmp.as_file_mut())?;

        log::debug!(
            "Running {} on {}x{} mask",
            self.command,
            mask.width(),
            mask.height()
        );
        let result = Command::new(&self.command)
            .args(&self.args)
            .arg("-o")
            .arg(output)
            .arg(tmp.path())
            .output()
            .map_err(|e| StationError::ExternalTool(format!("{}: {}", self.command, e)))?;
        if !result.status.success() {
            let stderr = String::from_utf8_lossy(&result.stderr);
            return Err(StationError::ExternalTool(format!(
                "{} exited with {}: {}",
                self.command,
                result.status,
                stderr.trim()
            )));
        }

        let svg = std::fs::read_to_string(output).map_err(|e| {
            StationError::ExternalTool(format!("unreadable output {}: {}", output.display(), e))
        })?;
        if !svg.contains("<svg") && !svg.contains(":svg") {
            return Err(StationError::ExternalTool(format!(
                "{} is not a vector document",
                output.display()
            )));
        }
        Ok(VectorPath::new(svg))
    }
}

/// Writes `mask` as a binary graymap (P5).
pub fn write_pgm(mask: &GrayImage, file: &mut File) -> Result<()> {
    let mut writer = BufWriter::new(file);
    PnmEncoder::new(&mut writer)
        .with_subtype(PnmSubtype::Graymap(SampleEncoding::Binary))
        .write_image(mask.as_raw(), mask.width(), mask.height(), ColorType::L8)?;
    writer.flush()?;
    Ok(())
}
