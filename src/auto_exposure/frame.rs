//! Frame access module
//!
//! Borrowed views over captured 8-bit frames and their luminance.

pub mod types;

pub use types::{CameraFrame, OwnedFrame, PixelFormat, luma_from_rgb};
