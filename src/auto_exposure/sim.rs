//! Simulated linear sensor for exercising the controller in closed loop
//!
//! Pixel values are `radiance * exposure`, rounded and capped at 255. An
//! exposure requested with [`LinearSensor::set_exposure`] is not used by the
//! next captured frame but by the one after it, the same one-frame actuation
//! latency a real color sensor shows.

use tracing::{debug, instrument};

use crate::auto_exposure::common::error::{ExposureError, Result};
use crate::auto_exposure::controller::ExposureController;
use crate::auto_exposure::frame::{OwnedFrame, PixelFormat};

const FULL_SCALE: f64 = 255.0;

pub struct LinearSensor {
    width: usize,
    height: usize,
    format: PixelFormat,
    /// Per-pixel luminance gained per device unit of exposure
    radiance: Vec<f64>,
    applied: f64,
    pending: Option<f64>,
}

impl LinearSensor {
    pub fn new(width: usize, height: usize, radiance: Vec<f64>, initial_exposure: f64) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(ExposureError::InvalidDimensions(width, height));
        }
        if radiance.len() != width * height {
            return Err(ExposureError::InvalidFrameBuffer {
                expected: width * height,
                actual: radiance.len(),
            });
        }
        Ok(Self {
            width,
            height,
            format: PixelFormat::Bgr8,
            radiance,
            applied: initial_exposure,
            pending: None,
        })
    }

    /// Scene of constant radiance.
    pub fn uniform(width: usize, height: usize, radiance: f64, initial_exposure: f64) -> Result<Self> {
        Self::new(width, height, vec![radiance; width * height], initial_exposure)
    }

    /// Scene whose radiance ramps linearly from `left` to `right`.
    pub fn horizontal_ramp(
        width: usize,
        height: usize,
        left: f64,
        right: f64,
        initial_exposure: f64,
    ) -> Result<Self> {
        let span = (width.max(2) - 1) as f64;
        let row: Vec<f64> = (0..width)
            .map(|x| left + (right - left) * x as f64 / span)
            .collect();
        let radiance = row.iter().copied().cycle().take(width * height).collect();
        Self::new(width, height, radiance, initial_exposure)
    }

    pub fn with_format(mut self, format: PixelFormat) -> Self {
        self.format = format;
        self
    }

    /// Requests an exposure; it applies from the frame after the next one.
    pub fn set_exposure(&mut self, exposure: f64) {
        self.pending = Some(exposure);
    }

    pub fn applied_exposure(&self) -> f64 {
        self.applied
    }

    /// Renders one frame and returns it with the exposure it was taken at.
    pub fn capture(&mut self) -> (OwnedFrame, f64) {
        let exposure = self.applied;
        let channels = self.format.channels();
        let data = self
            .radiance
            .iter()
            .flat_map(|&r| {
                let level = (r * exposure).round().clamp(0.0, FULL_SCALE) as u8;
                std::iter::repeat_n(level, channels)
            })
            .collect();

        if let Some(next) = self.pending.take() {
            self.applied = next;
        }

        let frame = OwnedFrame {
            width: self.width,
            height: self.height,
            format: self.format,
            data,
        };
        (frame, exposure)
    }
}

/// One iteration of the closed loop.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LoopSample {
    /// Exposure the frame was captured with
    pub applied: f64,
    pub brightness: f64,
    /// Exposure requested for a later frame
    pub requested: f64,
}

/// Drives `controller` against `sensor` for `frames` frames.
#[instrument(skip(controller, sensor))]
pub fn run_closed_loop(
    controller: &mut ExposureController,
    sensor: &mut LinearSensor,
    frames: usize,
) -> Result<Vec<LoopSample>> {
    let mut trace = Vec::with_capacity(frames);
    for index in 0..frames {
        let (owned, applied) = sensor.capture();
        let requested = controller.update(&owned.as_frame()?, applied);
        sensor.set_exposure(requested);

        let brightness = controller.last_brightness();
        debug!(index, applied, brightness, requested, "Loop step");
        trace.push(LoopSample {
            applied,
            brightness,
            requested,
        });
    }
    Ok(trace)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capture_scales_and_caps() {
        let mut sensor = LinearSensor::new(3, 1, vec![0.5, 1.0, 3.0], 100.0)
            .unwrap()
            .with_format(PixelFormat::Gray8);
        let (frame, exposure) = sensor.capture();
        assert_eq!(exposure, 100.0);
        assert_eq!(frame.data, vec![50, 100, 255]);
    }

    #[test]
    fn test_exposure_change_lands_one_frame_late() {
        let mut sensor = LinearSensor::uniform(2, 2, 1.0, 100.0).unwrap();
        sensor.set_exposure(150.0);

        let (first, e1) = sensor.capture();
        assert_eq!(e1, 100.0);
        assert!(first.data.iter().all(|&v| v == 100));

        let (second, e2) = sensor.capture();
        assert_eq!(e2, 150.0);
        assert!(second.data.iter().all(|&v| v == 150));
    }

    #[test]
    fn test_ramp_spans_endpoints() {
        let mut sensor = LinearSensor::horizontal_ramp(5, 2, 0.0, 2.0, 100.0)
            .unwrap()
            .with_format(PixelFormat::Gray8);
        let (frame, _) = sensor.capture();
        assert_eq!(&frame.data[..5], &[0, 50, 100, 150, 200]);
        assert_eq!(&frame.data[5..], &[0, 50, 100, 150, 200]);
    }

    #[test]
    fn test_radiance_length_checked() {
        assert!(matches!(
            LinearSensor::new(2, 2, vec![1.0; 3], 10.0),
            Err(ExposureError::InvalidFrameBuffer { expected: 4, actual: 3 })
        ));
    }
}
