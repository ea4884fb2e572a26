//! Auto-exposure module
//!
//! Application-side exposure control for a color sensor: frames come in with
//! the exposure they were captured at, the next exposure goes out. Brightness
//! measurement, histogram clipping checks and the update laws live in separate
//! submodules; the controller ties them together.

pub mod brightness;
pub mod common;
pub mod controller;
pub mod frame;
pub mod histogram;
pub mod sim;

pub use common::{
    ExposureError,
    Result,
};

pub use frame::{
    CameraFrame,
    OwnedFrame,
    PixelFormat,
};

pub use brightness::{
    BrightnessMeasurer,
    SpatialWeightMap,
};

pub use histogram::{
    Histogram,
    HistogramAnalyzer,
};

pub use controller::{
    ClipThreshold,
    ClippingConfig,
    ClippingPrecedence,
    CorrectionStep,
    DEVICE_UNITS_PER_MS,
    DeadZone,
    Decision,
    ExposureConfig,
    ExposureConfigBuilder,
    ExposureController,
    ExposureRange,
    MeasurementMode,
    Measurement,
    ShadowBand,
    UpdateLaw,
    to_device_units,
    to_millis,
};

pub use sim::{
    LinearSensor,
    LoopSample,
    run_closed_loop,
};
