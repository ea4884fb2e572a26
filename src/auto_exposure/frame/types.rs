//! Frame data types

use crate::auto_exposure::common::error::{ExposureError, Result};

/// Fixed-point BT.601 luma coefficients scaled by 2^14.
const LUMA_R: u32 = 4899;
const LUMA_G: u32 = 9617;
const LUMA_B: u32 = 1868;
const LUMA_SHIFT: u32 = 14;
const LUMA_ROUND: u32 = 1 << (LUMA_SHIFT - 1);

/// Channel layout of an 8-bit frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PixelFormat {
    /// Single luminance channel
    Gray8,
    /// Interleaved [B, G, R, B, G, R, ...]
    Bgr8,
    /// Interleaved [R, G, B, R, G, B, ...]
    Rgb8,
}

impl PixelFormat {
    pub fn channels(self) -> usize {
        match self {
            PixelFormat::Gray8 => 1,
            PixelFormat::Bgr8 | PixelFormat::Rgb8 => 3,
        }
    }

    /// Luminance of one pixel given its raw channel bytes.
    #[inline]
    pub fn luma(self, pixel: &[u8]) -> u8 {
        let (r, g, b) = match self {
            PixelFormat::Gray8 => return pixel[0],
            PixelFormat::Bgr8 => (pixel[2], pixel[1], pixel[0]),
            PixelFormat::Rgb8 => (pixel[0], pixel[1], pixel[2]),
        };
        luma_from_rgb(r, g, b)
    }
}

/// BT.601 luma with round-half-up, always within 0..=255.
#[inline]
pub fn luma_from_rgb(r: u8, g: u8, b: u8) -> u8 {
    let y = LUMA_R * r as u32 + LUMA_G * g as u32 + LUMA_B * b as u32 + LUMA_ROUND;
    (y >> LUMA_SHIFT) as u8
}

/// Borrowed view of one captured frame.
///
/// The buffer is tightly packed and row-major; its length must equal
/// `width * height * format.channels()`.
#[derive(Debug, Clone, Copy)]
pub struct CameraFrame<'a> {
    width: usize,
    height: usize,
    format: PixelFormat,
    data: &'a [u8],
}

impl<'a> CameraFrame<'a> {
    pub fn new(width: usize, height: usize, format: PixelFormat, data: &'a [u8]) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(ExposureError::InvalidDimensions(width, height));
        }
        let expected = width * height * format.channels();
        if data.len() != expected {
            return Err(ExposureError::InvalidFrameBuffer {
                expected,
                actual: data.len(),
            });
        }
        Ok(Self {
            width,
            height,
            format,
            data,
        })
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn format(&self) -> PixelFormat {
        self.format
    }

    pub fn data(&self) -> &'a [u8] {
        self.data
    }

    pub fn pixel_count(&self) -> usize {
        self.width * self.height
    }

    pub fn dimensions(&self) -> (usize, usize) {
        (self.width, self.height)
    }

    /// Luminance of every pixel in row-major order.
    pub fn luma(&self) -> impl Iterator<Item = u8> + 'a {
        let format = self.format;
        self.data
            .chunks_exact(format.channels())
            .map(move |px| format.luma(px))
    }

    /// Luminance of the pixels of row `y` in columns `x0..x0 + len`.
    pub fn row_luma(&self, y: usize, x0: usize, len: usize) -> impl Iterator<Item = u8> + 'a {
        let format = self.format;
        let channels = format.channels();
        let start = (y * self.width + x0) * channels;
        self.data[start..start + len * channels]
            .chunks_exact(channels)
            .map(move |px| format.luma(px))
    }
}

/// Frame that owns its pixel buffer, for producers such as the simulator.
#[derive(Debug, Clone, PartialEq)]
pub struct OwnedFrame {
    pub width: usize,
    pub height: usize,
    pub format: PixelFormat,
    pub data: Vec<u8>,
}

impl OwnedFrame {
    /// Frame where every channel of every pixel equals `value`.
    pub fn filled(width: usize, height: usize, format: PixelFormat, value: u8) -> Self {
        Self {
            width,
            height,
            format,
            data: vec![value; width * height * format.channels()],
        }
    }

    pub fn as_frame(&self) -> Result<CameraFrame<'_>> {
        CameraFrame::new(self.width, self.height, self.format, &self.data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_luma_weights_sum_to_full_scale() {
        assert_eq!(luma_from_rgb(255, 255, 255), 255);
        assert_eq!(luma_from_rgb(0, 0, 0), 0);
        assert_eq!(luma_from_rgb(128, 128, 128), 128);
    }

    #[test]
    fn test_bgr_and_rgb_order() {
        let red_rgb = [255u8, 0, 0];
        let red_bgr = [0u8, 0, 255];
        assert_eq!(PixelFormat::Rgb8.luma(&red_rgb), 76);
        assert_eq!(PixelFormat::Bgr8.luma(&red_bgr), 76);
        assert_eq!(PixelFormat::Bgr8.luma(&[255, 0, 0]), 29);
    }

    #[test]
    fn test_buffer_length_is_validated() {
        let data = vec![0u8; 10];
        let result = CameraFrame::new(2, 2, PixelFormat::Bgr8, &data);
        assert_eq!(
            result.unwrap_err(),
            ExposureError::InvalidFrameBuffer {
                expected: 12,
                actual: 10
            }
        );
    }

    #[test]
    fn test_zero_dimensions_rejected() {
        let result = CameraFrame::new(0, 4, PixelFormat::Gray8, &[]);
        assert!(matches!(result, Err(ExposureError::InvalidDimensions(0, 4))));
    }

    #[test]
    fn test_row_luma_slices_window() {
        let owned = OwnedFrame {
            width: 3,
            height: 2,
            format: PixelFormat::Gray8,
            data: vec![1, 2, 3, 4, 5, 6],
        };
        let frame = owned.as_frame().unwrap();
        let row: Vec<u8> = frame.row_luma(1, 1, 2).collect();
        assert_eq!(row, vec![5, 6]);
        assert_eq!(frame.luma().count(), 6);
    }
}
