use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ExposureError {
    #[error("Weight map is {expected:?} but frame is {actual:?}")]
    DimensionMismatch {
        expected: (usize, usize),
        actual: (usize, usize),
    },

    #[error("Crop {crop_width}x{crop_height} does not fit frame {frame_width}x{frame_height}")]
    InvalidCropSize {
        crop_width: usize,
        crop_height: usize,
        frame_width: usize,
        frame_height: usize,
    },

    #[error("Degenerate exposure update: {0}")]
    DegenerateUpdate(String),

    #[error("Invalid frame dimensions: width={0}, height={1}")]
    InvalidDimensions(usize, usize),

    #[error("Frame buffer holds {actual} bytes, expected {expected}")]
    InvalidFrameBuffer { expected: usize, actual: usize },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

pub type Result<T> = std::result::Result<T, ExposureError>;
