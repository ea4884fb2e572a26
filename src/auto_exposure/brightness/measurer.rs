use crate::auto_exposure::brightness::weight_map::SpatialWeightMap;
use crate::auto_exposure::common::error::{ExposureError, Result};
use crate::auto_exposure::frame::CameraFrame;

/// Region-of-interest size used by the cropped-mean measurement.
pub const DEFAULT_CROP_WIDTH: usize = 320;
pub const DEFAULT_CROP_HEIGHT: usize = 240;

/// Scalar brightness summaries of a frame's luminance.
pub struct BrightnessMeasurer;

impl BrightnessMeasurer {
    /// Arithmetic mean of the 8-bit luminance over every pixel.
    pub fn mean_brightness(frame: &CameraFrame<'_>) -> f64 {
        let sum: u64 = frame.luma().map(u64::from).sum();
        sum as f64 / frame.pixel_count() as f64
    }

    /// `sum(w * luma) / sum(w)` over the whole frame.
    pub fn weighted_brightness(frame: &CameraFrame<'_>, weight_map: &SpatialWeightMap) -> Result<f64> {
        if weight_map.dimensions() != frame.dimensions() {
            return Err(ExposureError::DimensionMismatch {
                expected: weight_map.dimensions(),
                actual: frame.dimensions(),
            });
        }

        let weighted: f64 = frame
            .luma()
            .zip(weight_map.weights())
            .map(|(luma, &w)| w * luma as f64)
            .sum();

        Ok(weighted / weight_map.total())
    }

    /// Mean luminance of the centered `crop_width` x `crop_height` window.
    ///
    /// The window origin is `((width - crop_width) / 2, (height - crop_height) / 2)`
    /// with integer division.
    pub fn center_crop_mean_brightness(
        frame: &CameraFrame<'_>,
        crop_width: usize,
        crop_height: usize,
    ) -> Result<f64> {
        check_crop(frame.width(), frame.height(), crop_width, crop_height)?;

        let x0 = (frame.width() - crop_width) / 2;
        let y0 = (frame.height() - crop_height) / 2;

        let sum: u64 = (y0..y0 + crop_height)
            .flat_map(|y| frame.row_luma(y, x0, crop_width))
            .map(u64::from)
            .sum();

        Ok(sum as f64 / (crop_width * crop_height) as f64)
    }
}

/// A crop must be non-empty and fit inside the frame.
pub fn check_crop(width: usize, height: usize, crop_width: usize, crop_height: usize) -> Result<()> {
    if crop_width == 0 || crop_height == 0 || crop_width > width || crop_height > height {
        return Err(ExposureError::InvalidCropSize {
            crop_width,
            crop_height,
            frame_width: width,
            frame_height: height,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auto_exposure::frame::{OwnedFrame, PixelFormat};
    use approx::assert_relative_eq;

    fn gray(width: usize, height: usize, data: Vec<u8>) -> OwnedFrame {
        OwnedFrame {
            width,
            height,
            format: PixelFormat::Gray8,
            data,
        }
    }

    #[test]
    fn test_mean_of_gray_frame() {
        let owned = gray(2, 2, vec![0, 100, 200, 100]);
        let frame = owned.as_frame().unwrap();
        assert_relative_eq!(BrightnessMeasurer::mean_brightness(&frame), 100.0);
    }

    #[test]
    fn test_mean_converts_color_to_luma() {
        let owned = OwnedFrame::filled(4, 3, PixelFormat::Bgr8, 200);
        let frame = owned.as_frame().unwrap();
        assert_relative_eq!(BrightnessMeasurer::mean_brightness(&frame), 200.0);
    }

    #[test]
    fn test_weighted_brightness_of_uniform_frame_is_the_level() {
        for &(w, h, sigma) in &[(16, 9, 1.0), (5, 17, 0.3), (1, 1, 2.0)] {
            let owned = OwnedFrame::filled(w, h, PixelFormat::Rgb8, 77);
            let frame = owned.as_frame().unwrap();
            let map = SpatialWeightMap::build(w, h, sigma).unwrap();
            let b = BrightnessMeasurer::weighted_brightness(&frame, &map).unwrap();
            assert_relative_eq!(b, 77.0, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_weighted_brightness_favors_center() {
        let mut data = vec![0u8; 5 * 5];
        data[2 * 5 + 2] = 250;
        let owned = gray(5, 5, data);
        let frame = owned.as_frame().unwrap();
        let map = SpatialWeightMap::build(5, 5, 1.0).unwrap();

        let weighted = BrightnessMeasurer::weighted_brightness(&frame, &map).unwrap();
        let plain = BrightnessMeasurer::mean_brightness(&frame);
        assert!(weighted > plain);
    }

    #[test]
    fn test_weighted_brightness_dimension_mismatch() {
        let owned = OwnedFrame::filled(4, 4, PixelFormat::Gray8, 10);
        let frame = owned.as_frame().unwrap();
        let map = SpatialWeightMap::build(4, 5, 1.0).unwrap();
        let result = BrightnessMeasurer::weighted_brightness(&frame, &map);
        assert_eq!(
            result.unwrap_err(),
            ExposureError::DimensionMismatch {
                expected: (4, 5),
                actual: (4, 4)
            }
        );
    }

    #[test]
    fn test_center_crop_uses_integer_centering() {
        // 5x1 row, 2-wide crop starts at (5 - 2) / 2 = 1.
        let owned = gray(5, 1, vec![10, 20, 30, 40, 50]);
        let frame = owned.as_frame().unwrap();
        let b = BrightnessMeasurer::center_crop_mean_brightness(&frame, 2, 1).unwrap();
        assert_relative_eq!(b, 25.0);
    }

    #[test]
    fn test_center_crop_ignores_border() {
        let mut data = vec![255u8; 6 * 4];
        for y in 1..3 {
            for x in 2..4 {
                data[y * 6 + x] = 40;
            }
        }
        let owned = gray(6, 4, data);
        let frame = owned.as_frame().unwrap();
        let b = BrightnessMeasurer::center_crop_mean_brightness(&frame, 2, 2).unwrap();
        assert_relative_eq!(b, 40.0);
    }

    #[test]
    fn test_center_crop_larger_than_frame() {
        let owned = OwnedFrame::filled(100, 80, PixelFormat::Gray8, 1);
        let frame = owned.as_frame().unwrap();
        let result = BrightnessMeasurer::center_crop_mean_brightness(
            &frame,
            DEFAULT_CROP_WIDTH,
            DEFAULT_CROP_HEIGHT,
        );
        assert!(matches!(result, Err(ExposureError::InvalidCropSize { .. })));
    }
}
