//! Luminance histogram module
//!
//! 256-bin histograms and the clipping and contrast statistics derived from them.

mod analyzer;

pub use analyzer::{CONTRAST_EPSILON, HistogramAnalyzer};

/// Number of bins, one per 8-bit luminance level.
pub const BIN_COUNT: usize = 256;

/// Per-level pixel counts of one frame's 8-bit luminance.
#[derive(Debug, Clone, PartialEq)]
pub struct Histogram {
    bins: [u64; BIN_COUNT],
    total: u64,
}

impl Histogram {
    pub fn from_bins(bins: [u64; BIN_COUNT]) -> Self {
        let total = bins.iter().sum();
        Self { bins, total }
    }

    pub fn bins(&self) -> &[u64; BIN_COUNT] {
        &self.bins
    }

    /// Total pixel count, equal to the sum of all bins.
    pub fn total(&self) -> u64 {
        self.total
    }

    /// Pixels with luminance `>= level`. Zero for any level past the last bin.
    pub fn count_at_or_above(&self, level: usize) -> u64 {
        if level >= BIN_COUNT {
            return 0;
        }
        self.bins[level..].iter().sum()
    }

    /// Pixels with luminance `< level`.
    pub fn count_below(&self, level: usize) -> u64 {
        self.bins[..level.min(BIN_COUNT)].iter().sum()
    }
}
