//! Closed-loop exposure controller
//!
//! Turns each captured frame plus the exposure it was taken with into the
//! exposure for a later frame. All exposure values crossing this API are in
//! device units (see [`DEVICE_UNITS_PER_MS`]).

pub mod config;


use tracing::{debug, info, instrument, warn};

use crate::auto_exposure::brightness::{BrightnessMeasurer, SpatialWeightMap, check_crop};
use crate::auto_exposure::common::error::{ExposureError, Result};
use crate::auto_exposure::frame::CameraFrame;
use crate::auto_exposure::histogram::{Histogram, HistogramAnalyzer};

pub use config::{
    ClipThreshold, ClippingConfig, ClippingPrecedence, CorrectionStep, DEVICE_UNITS_PER_MS,
    DeadZone, ExposureConfig, ExposureConfigBuilder, ExposureRange, MeasurementMode, ShadowBand,
    UpdateLaw, to_device_units, to_millis,
};

/// Full scale of the rational law's brightness model.
const BRIGHTNESS_CAP: f64 = 256.0;

/// Pulled off the current exposure when it sits exactly on the maximum.
const MAX_EXPOSURE_BACKOFF: f64 = 1.0;

const DENOMINATOR_EPSILON: f64 = 1e-9;

/// Floor for the brightness fed to the closed-form law.
const MIN_CLOSED_FORM_BRIGHTNESS: f64 = 1e-6;

const CLOSED_FORM_LINEAR_GAIN: f64 = 0.75;
const CLOSED_FORM_LINEAR_BLEND: f64 = 0.8;
const CLOSED_FORM_NONLINEAR_GAIN: f64 = 10.0;

/// Which rule produced an exposure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// Brightness inside the dead zone, exposure kept
    Hold,
    /// Highlight band over threshold, exposure stepped down
    HighlightClip,
    /// Shadow band over threshold, exposure stepped up
    ShadowClip,
    /// Update law applied
    Law,
    /// Frame could not be evaluated, exposure kept
    Fallback,
}

/// Statistics of the most recent frame and what was done with them.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Measurement {
    pub brightness: f64,
    pub highlight_fraction: f64,
    pub shadow_fraction: f64,
    /// Only computed for the closed-form law
    pub contrast: Option<f64>,
    pub decision: Decision,
}

pub struct ExposureController {
    config: ExposureConfig,
    min_exposure: f64,
    max_exposure: f64,
    base_exposure: f64,
    weight_map: SpatialWeightMap,
    last: Measurement,
    clip_counter: u32,
}

impl ExposureController {
    /// Creates a controller sized to `reference` and seeded with its brightness.
    pub fn new(config: ExposureConfig, reference: &CameraFrame<'_>) -> Result<Self> {
        let mut controller = Self::with_shape(config, reference.width(), reference.height())?;

        let hist = HistogramAnalyzer::histogram(reference);
        let (highlight_fraction, shadow_fraction) = controller.band_fractions(&hist);
        controller.last = Measurement {
            brightness: BrightnessMeasurer::mean_brightness(reference),
            highlight_fraction,
            shadow_fraction,
            contrast: None,
            decision: Decision::Hold,
        };
        Ok(controller)
    }

    /// Creates a controller for frames of `width` x `height` pixels.
    pub fn with_shape(config: ExposureConfig, width: usize, height: usize) -> Result<Self> {
        config.validate()?;
        if let MeasurementMode::CroppedMean {
            width: crop_width,
            height: crop_height,
        } = config.measurement_mode
        {
            check_crop(width, height, crop_width, crop_height)?;
        }
        let weight_map = SpatialWeightMap::build(width, height, config.weight_sigma)?;

        let min_exposure = to_device_units(config.min_exposure_ms);
        let max_exposure = to_device_units(config.max_exposure_ms);
        let base_exposure = to_device_units(config.initial_exposure_ms);

        info!(
            width,
            height,
            min_exposure,
            max_exposure,
            target = config.target_brightness,
            mode = ?config.measurement_mode,
            law = ?config.update_law,
            "Auto-exposure controller initialized"
        );

        Ok(Self {
            config,
            min_exposure,
            max_exposure,
            base_exposure,
            weight_map,
            last: Measurement {
                brightness: 0.0,
                highlight_fraction: 0.0,
                shadow_fraction: 0.0,
                contrast: None,
                decision: Decision::Hold,
            },
            clip_counter: 1,
        })
    }

    /// Next exposure for `frame`, captured at `current_exposure` device units.
    ///
    /// Never fails: a frame that cannot be evaluated holds the current
    /// exposure. The result always lies within the configured bounds.
    pub fn update(&mut self, frame: &CameraFrame<'_>, current_exposure: f64) -> f64 {
        match self.try_update(frame, current_exposure) {
            Ok(next) => next,
            Err(e) => {
                warn!(error = %e, current_exposure, "Exposure update failed, holding exposure");
                self.last.decision = Decision::Fallback;
                self.hold(current_exposure)
            }
        }
    }

    /// Like [`update`](Self::update) but reports why a frame was rejected.
    #[instrument(level = "debug", skip(self, frame), fields(width = frame.width(), height = frame.height()))]
    pub fn try_update(&mut self, frame: &CameraFrame<'_>, current_exposure: f64) -> Result<f64> {
        if !current_exposure.is_finite() {
            return Err(ExposureError::DegenerateUpdate(format!(
                "current exposure is {}",
                current_exposure
            )));
        }

        let hist = HistogramAnalyzer::histogram(frame);
        let brightness = self.measure(frame)?;
        let (highlight_fraction, shadow_fraction) = self.band_fractions(&hist);
        let contrast = match self.config.update_law {
            UpdateLaw::ClosedForm => Some(HistogramAnalyzer::contrast(&hist)),
            UpdateLaw::Rational => None,
        };
        self.last = Measurement {
            brightness,
            highlight_fraction,
            shadow_fraction,
            contrast,
            decision: Decision::Fallback,
        };

        let (next, decision) = match self.config.update_law {
            UpdateLaw::Rational => self.rational_policy(&hist, brightness, current_exposure)?,
            UpdateLaw::ClosedForm => (self.closed_form_law(brightness)?, Decision::Law),
        };
        self.last.decision = decision;

        let next = self.clamp(next);
        debug!(brightness, ?decision, next, "Exposure updated");
        Ok(next)
    }

    fn measure(&self, frame: &CameraFrame<'_>) -> Result<f64> {
        match self.config.measurement_mode {
            MeasurementMode::Weighted => {
                BrightnessMeasurer::weighted_brightness(frame, &self.weight_map)
            }
            MeasurementMode::CroppedMean { width, height } => {
                BrightnessMeasurer::center_crop_mean_brightness(frame, width, height)
            }
            MeasurementMode::PlainMean => Ok(BrightnessMeasurer::mean_brightness(frame)),
        }
    }

    fn band_fractions(&self, hist: &Histogram) -> (f64, f64) {
        let clip = &self.config.clipping;
        let highlight = HistogramAnalyzer::fraction_above(hist, clip.highlight_level);
        let shadow = match clip.shadow_band {
            ShadowBand::Below => HistogramAnalyzer::fraction_below(hist, clip.shadow_level),
            ShadowBand::AtOrAbove => HistogramAnalyzer::fraction_above(hist, clip.shadow_level),
        };
        (highlight, shadow)
    }

    fn rational_policy(
        &mut self,
        hist: &Histogram,
        brightness: f64,
        current: f64,
    ) -> Result<(f64, Decision)> {
        let precedence = self.config.clipping.precedence;
        let in_dead_zone =
            (brightness - self.config.target_brightness).abs() <= self.config.tolerance;

        if precedence == ClippingPrecedence::BeforeDeadZone {
            if let Some(corrected) = self.clipping_correction(hist, current) {
                return Ok(corrected);
            }
        }

        if in_dead_zone {
            if precedence == ClippingPrecedence::InsideDeadZone {
                if let Some(corrected) = self.clipping_correction(hist, current) {
                    return Ok(corrected);
                }
            }
            if self.config.dead_zone == DeadZone::Hold {
                return Ok((current, Decision::Hold));
            }
        } else if precedence == ClippingPrecedence::OutsideDeadZone {
            if let Some(corrected) = self.clipping_correction(hist, current) {
                return Ok(corrected);
            }
        }

        Ok((self.rational_law(brightness, current)?, Decision::Law))
    }

    /// Highlight check first, shadow check second; at most one fires.
    fn clipping_correction(&mut self, hist: &Histogram, current: f64) -> Option<(f64, Decision)> {
        let clip = self.config.clipping;
        let total = hist.total();
        let shadow_count = match clip.shadow_band {
            ShadowBand::Below => hist.count_below(clip.shadow_level),
            ShadowBand::AtOrAbove => hist.count_at_or_above(clip.shadow_level),
        };

        let step = clip.step.factor();
        let (next, decision) = if clip
            .threshold
            .exceeded(hist.count_at_or_above(clip.highlight_level), total)
        {
            (current / step, Decision::HighlightClip)
        } else if clip.threshold.exceeded(shadow_count, total) {
            (current * step, Decision::ShadowClip)
        } else {
            return None;
        };

        if self.config.rate_limited {
            if self.clip_counter % self.config.rate_limit_period != 0 {
                debug!(counter = self.clip_counter, ?decision, "Clipping correction deferred");
                self.clip_counter += 1;
                return None;
            }
            self.clip_counter = 1;
        }

        Some((next, decision))
    }

    /// `(256 - B) E Emax / ((T - B) E + (256 - T) Emax)`
    fn rational_law(&self, brightness: f64, current: f64) -> Result<f64> {
        let max = self.max_exposure;
        let target = self.config.target_brightness;
        let current = if current == max {
            current - MAX_EXPOSURE_BACKOFF
        } else {
            current
        };

        let denominator = (target - brightness) * current + (BRIGHTNESS_CAP - target) * max;
        if denominator.abs() < DENOMINATOR_EPSILON {
            return Err(ExposureError::DegenerateUpdate(format!(
                "rational law denominator vanished (brightness={:.3}, exposure={:.3})",
                brightness, current
            )));
        }

        let next = (BRIGHTNESS_CAP - brightness) * current * max / denominator;
        if !next.is_finite() {
            return Err(ExposureError::DegenerateUpdate(format!(
                "rational law produced {}",
                next
            )));
        }
        Ok(next)
    }

    /// Linear plus exponential correction around the initial exposure.
    fn closed_form_law(&self, brightness: f64) -> Result<f64> {
        let target = self.config.target_brightness;
        let brightness = brightness.max(MIN_CLOSED_FORM_BRIGHTNESS);

        let linear = CLOSED_FORM_LINEAR_GAIN * (target - brightness) / target;
        let nonlinear =
            CLOSED_FORM_NONLINEAR_GAIN * ((-1.0f64).exp() - (-(target / brightness)).exp());
        let next = self.base_exposure * (1.0 + CLOSED_FORM_LINEAR_BLEND * linear) + nonlinear;

        if !next.is_finite() {
            return Err(ExposureError::DegenerateUpdate(format!(
                "closed-form law produced {} at brightness {:.3}",
                next, brightness
            )));
        }
        Ok(next)
    }

    fn clamp(&self, exposure: f64) -> f64 {
        exposure.clamp(self.min_exposure, self.max_exposure)
    }

    fn hold(&self, current: f64) -> f64 {
        if current.is_finite() {
            self.clamp(current)
        } else {
            self.clamp(self.base_exposure)
        }
    }

    pub fn config(&self) -> &ExposureConfig {
        &self.config
    }

    pub fn weight_map(&self) -> &SpatialWeightMap {
        &self.weight_map
    }

    pub fn min_exposure(&self) -> f64 {
        self.min_exposure
    }

    pub fn max_exposure(&self) -> f64 {
        self.max_exposure
    }

    /// Initial exposure in device units, clamped to the bounds.
    pub fn initial_exposure(&self) -> f64 {
        self.clamp(self.base_exposure)
    }

    pub fn target_brightness(&self) -> f64 {
        self.config.target_brightness
    }

    pub fn last_brightness(&self) -> f64 {
        self.last.brightness
    }

    pub fn last_measurement(&self) -> &Measurement {
        &self.last
    }
}
