//! Error taxonomy shared by every stage of the station.

use thiserror::Error;

/// Precondition failures reported straight back to the operator.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("no output location")]
    NoOutputLocation,

    #[error("crop not finalized")]
    CropNotFinalized,

    #[error("nothing to combine")]
    NothingToCombine,

    #[error("crop region is empty")]
    DegenerateCrop,

    #[error("invalid calibration scalar: {0}")]
    InvalidCalibration(f64),

    #[error("fragment {0} has no pixel extent")]
    EmptyFragment(usize),

    #[error("malformed vector document: {0}")]
    MalformedDocument(String),
}

#[derive(Error, Debug)]
pub enum StationError {
    #[error("{0}")]
    Validation(#[from] ValidationError),

    #[error("Camera unavailable: {0}")]
    Hardware(String),

    #[error("Tracer failed: {0}")]
    ExternalTool(String),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl StationError {
    /// Whether the failure may clear up by itself on the next attempt.
    pub fn is_transient(&self) -> bool {
        matches!(self, StationError::Hardware(_))
    }
}

pub type Result<T> = std::result::Result<T, StationError>;
