//! This module contains all the sub-modules of the project.

pub mod action; // Action module: Maps button and touch input to station actions.
pub mod define; // Definition module: Contains definitions and constants used throughout the project.
pub mod device; // Device module: Manages the station buttons.
pub mod error; // Error module: Error types shared by every stage.
pub mod frontend; // Frontend module: Operator facing surface (preview, status, touch).
pub mod scheduler; // Scheduler module: Periodic tasks and the injectable clock.
pub mod session; // Session module: Capture session and output location.
pub mod station; // Station module: Owns the hardware and runs the main loop.
pub mod util; // Utility module: Provides various utility functions and helpers.
pub mod vector; // Vector module: Unit stamping and composition of traced documents.
pub mod vision; // Vision module: Camera, lens correction, crop and silhouette extraction.
