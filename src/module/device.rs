//! Provide Device Control.
//!
pub mod button;
