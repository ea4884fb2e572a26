//! Common utilities module
//!
//! Error types shared by every stage of the auto-exposure controller.

pub mod error;

pub use error::{ExposureError, Result};
