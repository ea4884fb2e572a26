use crate::auto_exposure::frame::CameraFrame;
use crate::auto_exposure::histogram::{BIN_COUNT, Histogram};

/// Offset inside the contrast logarithm that keeps `ln` away from zero.
pub const CONTRAST_EPSILON: f64 = 0.01;

/// Histogram construction and clipping statistics.
pub struct HistogramAnalyzer;

impl HistogramAnalyzer {
    pub fn histogram(frame: &CameraFrame<'_>) -> Histogram {
        let mut bins = [0u64; BIN_COUNT];
        for luma in frame.luma() {
            bins[luma as usize] += 1;
        }
        Histogram::from_bins(bins)
    }

    /// Share of pixels in bins `>= threshold`.
    pub fn fraction_above(hist: &Histogram, threshold: usize) -> f64 {
        if hist.total() == 0 {
            return 0.0;
        }
        hist.count_at_or_above(threshold) as f64 / hist.total() as f64
    }

    /// Share of pixels in bins `< threshold`.
    pub fn fraction_below(hist: &Histogram, threshold: usize) -> f64 {
        if hist.total() == 0 {
            return 0.0;
        }
        hist.count_below(threshold) as f64 / hist.total() as f64
    }

    /// Entropy-style spread of the min-max rescaled cumulative distribution.
    ///
    /// Bins whose cumulative share is still zero are skipped. A histogram whose
    /// non-zero cumulative values are all equal has no spread and yields `0.0`.
    pub fn contrast(hist: &Histogram) -> f64 {
        if hist.total() == 0 {
            return 0.0;
        }
        let total = hist.total() as f64;

        let mut running = 0.0;
        let cdf: Vec<f64> = hist
            .bins()
            .iter()
            .filter_map(|&count| {
                running += count as f64 / total;
                (running != 0.0).then_some(running)
            })
            .collect();

        let (min, max) = cdf
            .iter()
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| (lo.min(v), hi.max(v)));
        let span = max - min;
        if span <= 0.0 {
            return 0.0;
        }

        -cdf.iter()
            .map(|&v| (v - min) / span)
            .filter(|&v| v + CONTRAST_EPSILON > 0.0)
            .map(|v| v * (v + CONTRAST_EPSILON).ln())
            .sum::<f64>()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auto_exposure::frame::{OwnedFrame, PixelFormat};
    use approx::assert_relative_eq;

    fn gradient_frame() -> OwnedFrame {
        OwnedFrame {
            width: 256,
            height: 2,
            format: PixelFormat::Gray8,
            data: (0..512).map(|i| (i % 256) as u8).collect(),
        }
    }

    #[test]
    fn test_bins_sum_to_pixel_count() {
        let owned = OwnedFrame {
            width: 7,
            height: 5,
            format: PixelFormat::Bgr8,
            data: (0..7 * 5 * 3).map(|i| (i * 37 % 256) as u8).collect(),
        };
        let frame = owned.as_frame().unwrap();
        let hist = HistogramAnalyzer::histogram(&frame);
        assert_eq!(hist.bins().iter().sum::<u64>(), 35);
        assert_eq!(hist.total(), 35);
    }

    #[test]
    fn test_fraction_above_past_last_bin_is_zero() {
        let owned = OwnedFrame::filled(4, 4, PixelFormat::Gray8, 255);
        let hist = HistogramAnalyzer::histogram(&owned.as_frame().unwrap());
        assert_eq!(HistogramAnalyzer::fraction_above(&hist, 256), 0.0);
        assert_eq!(HistogramAnalyzer::fraction_above(&hist, 255), 1.0);
        assert_eq!(HistogramAnalyzer::fraction_above(&hist, 10_000), 0.0);
    }

    #[test]
    fn test_fractions_split_at_threshold() {
        let owned = gradient_frame();
        let hist = HistogramAnalyzer::histogram(&owned.as_frame().unwrap());
        assert_relative_eq!(HistogramAnalyzer::fraction_above(&hist, 200), 56.0 / 256.0);
        assert_relative_eq!(HistogramAnalyzer::fraction_below(&hist, 200), 200.0 / 256.0);
        assert_relative_eq!(HistogramAnalyzer::fraction_below(&hist, 0), 0.0);
        assert_relative_eq!(HistogramAnalyzer::fraction_below(&hist, 256), 1.0);
    }

    #[test]
    fn test_contrast_of_flat_frame_is_zero() {
        let owned = OwnedFrame::filled(8, 8, PixelFormat::Gray8, 90);
        let hist = HistogramAnalyzer::histogram(&owned.as_frame().unwrap());
        assert_eq!(HistogramAnalyzer::contrast(&hist), 0.0);
    }

    #[test]
    fn test_contrast_rewards_spread() {
        let spread = gradient_frame();
        let spread_hist = HistogramAnalyzer::histogram(&spread.as_frame().unwrap());

        let mut data = vec![0u8; 256];
        data.extend(std::iter::repeat_n(255u8, 256));
        let split = OwnedFrame {
            width: 256,
            height: 2,
            format: PixelFormat::Gray8,
            data,
        };
        let split_hist = HistogramAnalyzer::histogram(&split.as_frame().unwrap());

        let spread_contrast = HistogramAnalyzer::contrast(&spread_hist);
        let split_contrast = HistogramAnalyzer::contrast(&split_hist);
        assert!(spread_contrast.is_finite());
        assert!(spread_contrast > split_contrast);
        assert_relative_eq!(split_contrast, -(1.0f64 + CONTRAST_EPSILON).ln(), epsilon = 1e-12);
    }
}
