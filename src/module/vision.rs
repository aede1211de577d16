//! Processing related to visual information.
//!
pub mod camera;
pub mod crop;
pub mod lens;
pub mod silhouette;
pub mod tracer;
