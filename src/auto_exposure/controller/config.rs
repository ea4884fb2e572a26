//! Auto-exposure controller configuration types

use crate::auto_exposure::brightness::{DEFAULT_CROP_HEIGHT, DEFAULT_CROP_WIDTH, DEFAULT_SIGMA};
use crate::auto_exposure::common::error::{ExposureError, Result};

/// Device exposure register units per millisecond.
///
/// The color sensor takes exposure in 0.1 ms steps, so a bound of 33.3 ms is
/// stored and compared as 333 device units.
pub const DEVICE_UNITS_PER_MS: f64 = 10.0;

pub fn to_device_units(millis: f64) -> f64 {
    millis * DEVICE_UNITS_PER_MS
}

pub fn to_millis(device_units: f64) -> f64 {
    device_units / DEVICE_UNITS_PER_MS
}

/// How a frame is reduced to one brightness value
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MeasurementMode {
    /// Gaussian center-weighted mean over the whole frame
    Weighted,
    /// Plain mean of a centered window
    CroppedMean { width: usize, height: usize },
    /// Plain mean over the whole frame
    PlainMean,
}

impl MeasurementMode {
    pub fn cropped_default() -> Self {
        MeasurementMode::CroppedMean {
            width: DEFAULT_CROP_WIDTH,
            height: DEFAULT_CROP_HEIGHT,
        }
    }
}

/// Exposure update law applied when no other rule decides the frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateLaw {
    /// Hyperbolic response saturating at the maximum exposure
    Rational,
    /// Linear plus exponential correction around the initial exposure
    ClosedForm,
}

/// What happens when the brightness error is within tolerance
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeadZone {
    /// Keep the current exposure
    Hold,
    /// Ignore the dead zone and let the update law run
    FollowLaw,
}

/// When the histogram clipping checks run relative to the dead zone
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClippingPrecedence {
    /// Never run the clipping checks
    Disabled,
    /// Run before the dead zone on every frame
    BeforeDeadZone,
    /// Run only when the brightness is inside the dead zone
    InsideDeadZone,
    /// Run only when the brightness is outside the dead zone
    OutsideDeadZone,
}

/// Pixel share that counts as clipped
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ClipThreshold {
    /// Fires when the band holds at least this fraction of pixels
    Fraction(f64),
    /// Fires when the band holds more than `total / divisor` pixels
    CountDivisor(u32),
}

impl ClipThreshold {
    pub fn exceeded(self, count: u64, total: u64) -> bool {
        match self {
            ClipThreshold::Fraction(f) => total > 0 && count as f64 / total as f64 >= f,
            ClipThreshold::CountDivisor(d) => count as f64 > total as f64 / d as f64,
        }
    }
}

/// Multiplicative exposure step applied by a clipping correction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CorrectionStep {
    /// Half a stop
    SquareRootTwo,
    /// A third of a stop
    CubeRootTwo,
}

impl CorrectionStep {
    pub fn factor(self) -> f64 {
        match self {
            CorrectionStep::SquareRootTwo => std::f64::consts::SQRT_2,
            CorrectionStep::CubeRootTwo => 2f64.cbrt(),
        }
    }
}

/// Which side of `shadow_level` the shadow check counts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShadowBand {
    /// Pixels darker than the level, i.e. crushed shadows
    Below,
    /// Pixels at or above the level, for deployments that raise exposure
    /// whenever enough of the frame clears the noise floor
    AtOrAbove,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClippingConfig {
    pub precedence: ClippingPrecedence,
    /// First bin of the highlight band
    pub highlight_level: usize,
    /// Boundary bin of the shadow band
    pub shadow_level: usize,
    pub shadow_band: ShadowBand,
    pub threshold: ClipThreshold,
    pub step: CorrectionStep,
}

impl Default for ClippingConfig {
    fn default() -> Self {
        Self {
            precedence: ClippingPrecedence::OutsideDeadZone,
            highlight_level: 200,
            shadow_level: 30,
            shadow_band: ShadowBand::Below,
            threshold: ClipThreshold::Fraction(0.125),
            step: CorrectionStep::SquareRootTwo,
        }
    }
}

impl ClippingConfig {
    /// Gated variant: band from 220, `total / 20` pixels, cube-root steps.
    pub fn gated() -> Self {
        Self {
            precedence: ClippingPrecedence::InsideDeadZone,
            highlight_level: 220,
            shadow_level: 30,
            shadow_band: ShadowBand::Below,
            threshold: ClipThreshold::CountDivisor(20),
            step: CorrectionStep::CubeRootTwo,
        }
    }
}

/// Exposure bounds derived from the stream timing and the device range.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExposureRange {
    pub min_ms: f64,
    pub max_ms: f64,
    pub initial_ms: f64,
}

impl ExposureRange {
    /// The longest exposure fits one frame period; the shortest spans one
    /// mains flicker half-cycle so lighting flicker integrates out.
    pub fn for_stream(
        framerate_hz: f64,
        flicker_hz: f64,
        device_min_units: f64,
        device_max_units: f64,
    ) -> Result<Self> {
        if !(framerate_hz > 0.0) || !(flicker_hz > 0.0) {
            return Err(ExposureError::InvalidConfig(format!(
                "framerate {} Hz and flicker {} Hz must be positive",
                framerate_hz, flicker_hz
            )));
        }
        let max_ms = (1e3 / framerate_hz).min(to_millis(device_max_units));
        let min_ms = (1e3 / (2.0 * flicker_hz)).max(to_millis(device_min_units));
        if !(min_ms <= max_ms) {
            return Err(ExposureError::InvalidConfig(format!(
                "empty exposure range: min {:.2} ms > max {:.2} ms",
                min_ms, max_ms
            )));
        }
        Ok(Self {
            min_ms,
            max_ms,
            initial_ms: (min_ms + max_ms) / 2.0,
        })
    }
}

/// Configuration for the auto-exposure controller.
///
/// Exposure times are in milliseconds here; the controller works in device
/// units (see [`DEVICE_UNITS_PER_MS`]).
#[derive(Debug, Clone)]
pub struct ExposureConfig {
    pub initial_exposure_ms: f64,
    pub max_exposure_ms: f64,
    pub min_exposure_ms: f64,
    /// Brightness setpoint on the 8-bit luminance scale
    pub target_brightness: f64,
    /// Accepted for the closed-form law but not used by any update formula
    pub contrast_factor: f64,
    pub measurement_mode: MeasurementMode,
    /// Gaussian spread of the weight map for [`MeasurementMode::Weighted`]
    pub weight_sigma: f64,
    /// Half-width of the dead zone around the target
    pub tolerance: f64,
    pub dead_zone: DeadZone,
    pub update_law: UpdateLaw,
    pub clipping: ClippingConfig,
    /// Gate clipping corrections to every `rate_limit_period`-th detection
    pub rate_limited: bool,
    pub rate_limit_period: u32,
}

impl Default for ExposureConfig {
    fn default() -> Self {
        Self {
            initial_exposure_ms: 20.0,
            max_exposure_ms: 33.3,
            min_exposure_ms: 10.0,
            target_brightness: 128.0,
            contrast_factor: 1.0,
            measurement_mode: MeasurementMode::Weighted,
            weight_sigma: DEFAULT_SIGMA,
            tolerance: 20.0,
            dead_zone: DeadZone::Hold,
            update_law: UpdateLaw::Rational,
            clipping: ClippingConfig::default(),
            rate_limited: false,
            rate_limit_period: 10,
        }
    }
}

impl ExposureConfig {
    pub fn builder() -> ExposureConfigBuilder {
        ExposureConfigBuilder::default()
    }

    pub fn validate(&self) -> Result<()> {
        let bounds = [
            self.initial_exposure_ms,
            self.max_exposure_ms,
            self.min_exposure_ms,
        ];
        if bounds.iter().any(|v| !v.is_finite()) {
            return Err(ExposureError::InvalidConfig(
                "exposure times must be finite".to_string(),
            ));
        }
        if self.min_exposure_ms <= 0.0 {
            return Err(ExposureError::InvalidConfig(format!(
                "min exposure must be positive, got {} ms",
                self.min_exposure_ms
            )));
        }
        if self.max_exposure_ms < self.min_exposure_ms {
            return Err(ExposureError::InvalidConfig(format!(
                "max exposure {} ms is below min exposure {} ms",
                self.max_exposure_ms, self.min_exposure_ms
            )));
        }
        if !(self.target_brightness > 0.0 && self.target_brightness < 256.0) {
            return Err(ExposureError::InvalidConfig(format!(
                "target brightness must lie in (0, 256), got {}",
                self.target_brightness
            )));
        }
        if !(self.tolerance >= 0.0) {
            return Err(ExposureError::InvalidConfig(format!(
                "tolerance must be non-negative, got {}",
                self.tolerance
            )));
        }
        if self.rate_limited && self.rate_limit_period == 0 {
            return Err(ExposureError::InvalidConfig(
                "rate limit period must be at least 1".to_string(),
            ));
        }
        match self.clipping.threshold {
            ClipThreshold::Fraction(f) if !(f > 0.0 && f <= 1.0) => {
                return Err(ExposureError::InvalidConfig(format!(
                    "clip fraction must lie in (0, 1], got {}",
                    f
                )));
            }
            ClipThreshold::CountDivisor(0) => {
                return Err(ExposureError::InvalidConfig(
                    "clip count divisor must be at least 1".to_string(),
                ));
            }
            _ => {}
        }
        Ok(())
    }
}

/// Builder for ExposureConfig
#[derive(Default)]
pub struct ExposureConfigBuilder {
    initial_exposure_ms: Option<f64>,
    max_exposure_ms: Option<f64>,
    min_exposure_ms: Option<f64>,
    target_brightness: Option<f64>,
    contrast_factor: Option<f64>,
    measurement_mode: Option<MeasurementMode>,
    weight_sigma: Option<f64>,
    tolerance: Option<f64>,
    dead_zone: Option<DeadZone>,
    update_law: Option<UpdateLaw>,
    clipping: Option<ClippingConfig>,
    rate_limited: Option<bool>,
    rate_limit_period: Option<u32>,
}

impl ExposureConfigBuilder {
    pub fn initial_exposure_ms(mut self, ms: f64) -> Self {
        self.initial_exposure_ms = Some(ms);
        self
    }

    pub fn max_exposure_ms(mut self, ms: f64) -> Self {
        self.max_exposure_ms = Some(ms);
        self
    }

    pub fn min_exposure_ms(mut self, ms: f64) -> Self {
        self.min_exposure_ms = Some(ms);
        self
    }

    pub fn range(mut self, range: ExposureRange) -> Self {
        self.min_exposure_ms = Some(range.min_ms);
        self.max_exposure_ms = Some(range.max_ms);
        self.initial_exposure_ms = Some(range.initial_ms);
        self
    }

    pub fn target_brightness(mut self, target: f64) -> Self {
        self.target_brightness = Some(target);
        self
    }

    pub fn contrast_factor(mut self, factor: f64) -> Self {
        self.contrast_factor = Some(factor);
        self
    }

    pub fn measurement_mode(mut self, mode: MeasurementMode) -> Self {
        self.measurement_mode = Some(mode);
        self
    }

    pub fn weight_sigma(mut self, sigma: f64) -> Self {
        self.weight_sigma = Some(sigma);
        self
    }

    pub fn tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = Some(tolerance);
        self
    }

    pub fn dead_zone(mut self, dead_zone: DeadZone) -> Self {
        self.dead_zone = Some(dead_zone);
        self
    }

    pub fn update_law(mut self, law: UpdateLaw) -> Self {
        self.update_law = Some(law);
        self
    }

    pub fn clipping(mut self, clipping: ClippingConfig) -> Self {
        self.clipping = Some(clipping);
        self
    }

    pub fn rate_limited(mut self, enable: bool) -> Self {
        self.rate_limited = Some(enable);
        self
    }

    pub fn rate_limit_period(mut self, period: u32) -> Self {
        self.rate_limit_period = Some(period);
        self
    }

    pub fn build(self) -> ExposureConfig {
        let default = ExposureConfig::default();
        ExposureConfig {
            initial_exposure_ms: self.initial_exposure_ms.unwrap_or(default.initial_exposure_ms),
            max_exposure_ms: self.max_exposure_ms.unwrap_or(default.max_exposure_ms),
            min_exposure_ms: self.min_exposure_ms.unwrap_or(default.min_exposure_ms),
            target_brightness: self.target_brightness.unwrap_or(default.target_brightness),
            contrast_factor: self.contrast_factor.unwrap_or(default.contrast_factor),
            measurement_mode: self.measurement_mode.unwrap_or(default.measurement_mode),
            weight_sigma: self.weight_sigma.unwrap_or(default.weight_sigma),
            tolerance: self.tolerance.unwrap_or(default.tolerance),
            dead_zone: self.dead_zone.unwrap_or(default.dead_zone),
            update_law: self.update_law.unwrap_or(default.update_law),
            clipping: self.clipping.unwrap_or(default.clipping),
            rate_limited: self.rate_limited.unwrap_or(default.rate_limited),
            rate_limit_period: self.rate_limit_period.unwrap_or(default.rate_limit_period),
        }
    }
}
