//! Module for Constants and Paths Definitions
//!
//! This module defines various constants and paths used throughout the application.

/// System Constants
pub mod system {
    /// Name of the system
    pub const NAME: &str = "shadowboard";
}

/// File Paths
pub mod path {

    // Persistent Data Directory
    pub const PERSISTENT_DIR: &str = "/data/";

    // Ephemeral Data Directory
    pub const EPHEMERAL_DIR: &str = "/run/user/1000/";

    // Log Directory
    pub const LOG_DIR: &str = "log";

    // Configuration File
    pub const CONF_FILE: &str = "conf.toml";

    // Latest live preview frame, refreshed for the frontend
    pub const PREVIEW_IMAGE: &str = "preview.jpg";

    // Thumbnail of the last processed capture
    pub const LAST_IMAGE: &str = "last.jpg";
}

/// Output location layout
pub mod output {
    // Raw stills
    pub const PHOTO_DIR: &str = "photos";

    // Stamped fragments
    pub const SVG_DIR: &str = "svgs";

    // Combined document
    pub const COMBINED_FILE: &str = "combined_output.svg";

    pub const PHOTO_PREFIX: &str = "captured_image_";
    pub const PHOTO_EXT: &str = "jpg";
    pub const SVG_PREFIX: &str = "output_image_";
    pub const SVG_EXT: &str = "svg";

    /// File name of the `n`-th captured still.
    pub fn photo_name(n: usize) -> String {
        format!("{}{}.{}", PHOTO_PREFIX, n, PHOTO_EXT)
    }

    /// File name of the `n`-th fragment document.
    pub fn svg_name(n: usize) -> String {
        format!("{}{}.{}", SVG_PREFIX, n, SVG_EXT)
    }
}

/// Silhouette extraction constants
pub mod silhouette {
    // Pixels at or below this intensity are foreground (dark object on light background)
    pub const THRESHOLD: u8 = 128;

    // Outline stroke thickness in pixels
    pub const STROKE: u32 = 2;
}
