//! Center-weighted Gaussian map used for spatially weighted brightness.

use crate::auto_exposure::common::error::{ExposureError, Result};

/// Default Gaussian spread in normalized coordinates.
pub const DEFAULT_SIGMA: f64 = 1.0;

/// Immutable per-pixel weight grid, row-major, sized to one frame shape.
///
/// Both axes are normalized to `[-1, 1]` independently, so a non-square frame
/// gets elliptical iso-weight contours.
#[derive(Debug, Clone)]
pub struct SpatialWeightMap {
    width: usize,
    height: usize,
    sigma: f64,
    weights: Vec<f64>,
    total: f64,
}

/// `n` evenly spaced samples over `[-1, 1]`; a single sample sits at `-1`.
fn normalized_axis(n: usize) -> Vec<f64> {
    if n == 1 {
        return vec![-1.0];
    }
    let step = 2.0 / (n - 1) as f64;
    (0..n).map(|i| -1.0 + step * i as f64).collect()
}

impl SpatialWeightMap {
    pub fn build(width: usize, height: usize, sigma: f64) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(ExposureError::InvalidDimensions(width, height));
        }
        if !sigma.is_finite() || sigma <= 0.0 {
            return Err(ExposureError::InvalidConfig(format!(
                "weight map sigma must be positive and finite, got {}",
                sigma
            )));
        }

        let xs = normalized_axis(width);
        let ys = normalized_axis(height);
        let denom = 2.0 * sigma * sigma;

        let weights: Vec<f64> = ys
            .iter()
            .flat_map(|&y| xs.iter().map(move |&x| (-(x * x + y * y) / denom).exp()))
            .collect();
        let total: f64 = weights.iter().sum();
        if total <= 0.0 {
            return Err(ExposureError::InvalidConfig(format!(
                "sigma {} underflows every weight of a {}x{} map",
                sigma, width, height
            )));
        }

        Ok(Self {
            width,
            height,
            sigma,
            weights,
            total,
        })
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn dimensions(&self) -> (usize, usize) {
        (self.width, self.height)
    }

    pub fn sigma(&self) -> f64 {
        self.sigma
    }

    pub fn weights(&self) -> &[f64] {
        &self.weights
    }

    /// Sum of all weights, strictly positive.
    pub fn total(&self) -> f64 {
        self.total
    }

    pub fn get(&self, x: usize, y: usize) -> Option<f64> {
        if x >= self.width || y >= self.height {
            return None;
        }
        Some(self.weights[y * self.width + x])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_center_carries_peak_weight() {
        let map = SpatialWeightMap::build(5, 5, 1.0).unwrap();
        assert_relative_eq!(map.get(2, 2).unwrap(), 1.0);
        assert_relative_eq!(map.get(0, 0).unwrap(), (-1.0f64).exp());
        assert!(map.get(5, 0).is_none());
    }

    #[test]
    fn test_elliptical_contours_on_wide_frames() {
        // Corners of a 9x3 grid sit at (+-1, +-1) just like a square grid.
        let wide = SpatialWeightMap::build(9, 3, 1.0).unwrap();
        let square = SpatialWeightMap::build(3, 3, 1.0).unwrap();
        assert_relative_eq!(wide.get(8, 2).unwrap(), square.get(2, 2).unwrap());
        assert_relative_eq!(wide.get(8, 1).unwrap(), square.get(2, 1).unwrap());
    }

    #[test]
    fn test_total_is_positive() {
        let map = SpatialWeightMap::build(1, 1, 0.1).unwrap();
        assert!(map.total() > 0.0);
        assert_eq!(map.weights().len(), 1);
    }

    #[test]
    fn test_rejects_empty_shape_and_bad_sigma() {
        assert!(matches!(
            SpatialWeightMap::build(0, 10, 1.0),
            Err(ExposureError::InvalidDimensions(0, 10))
        ));
        assert!(matches!(
            SpatialWeightMap::build(10, 10, 0.0),
            Err(ExposureError::InvalidConfig(_))
        ));
        assert!(matches!(
            SpatialWeightMap::build(10, 10, f64::NAN),
            Err(ExposureError::InvalidConfig(_))
        ));
    }
}
