use ae_control_rs::auto_exposure::{
    ExposureConfig, ExposureController, ExposureRange, LinearSensor, MeasurementMode,
    run_closed_loop, to_device_units, to_millis,
};
use ae_control_rs::logger;

use tracing::info;

const FRAMERATE_HZ: f64 = 30.0;
const INDOOR_FLICKER_HZ: f64 = 50.0;
const DEVICE_MIN_UNITS: f64 = 1.0;
const DEVICE_MAX_UNITS: f64 = 10_000.0;
const TARGET_BRIGHTNESS: f64 = 90.0;
const FRAMES: usize = 60;

fn main() -> anyhow::Result<()> {
    logger::init();

    info!("Starting auto-exposure simulation...");

    let range = ExposureRange::for_stream(
        FRAMERATE_HZ,
        INDOOR_FLICKER_HZ,
        DEVICE_MIN_UNITS,
        DEVICE_MAX_UNITS,
    )?;
    info!(
        "Exposure range: {:.1} - {:.1} msec, starting at {:.1} msec",
        range.min_ms, range.max_ms, range.initial_ms
    );

    let config = ExposureConfig::builder()
        .range(range)
        .target_brightness(TARGET_BRIGHTNESS)
        .measurement_mode(MeasurementMode::cropped_default())
        .build();

    let mut sensor =
        LinearSensor::horizontal_ramp(640, 480, 0.1, 0.6, to_device_units(range.initial_ms))?;
    let (reference, _) = sensor.capture();
    let mut controller = ExposureController::new(config, &reference.as_frame()?)?;

    let trace = run_closed_loop(&mut controller, &mut sensor, FRAMES)?;
    for (index, sample) in trace.iter().enumerate() {
        info!(
            "frame {:>3}: exposure {:>6.2} msec, brightness {:>6.2}",
            index,
            to_millis(sample.applied),
            sample.brightness
        );
    }

    if let Some(last) = trace.last() {
        info!(
            "Settled at {:.2} msec with brightness {:.2} (target {:.0})",
            to_millis(last.requested),
            last.brightness,
            TARGET_BRIGHTNESS
        );
    }

    Ok(())
}
