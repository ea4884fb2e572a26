//! Brightness measurement module
//!
//! Plain, center-cropped and Gaussian-weighted luminance means.

mod measurer;
pub mod weight_map;

pub use measurer::{BrightnessMeasurer, DEFAULT_CROP_HEIGHT, DEFAULT_CROP_WIDTH, check_crop};
pub use weight_map::{DEFAULT_SIGMA, SpatialWeightMap};
