//! Capture a single calibrated frame from a thermal camera.
//!
//! A capture session opens a [camera source](camera), drops
//! a number of frames while the sensor settles, reads one
//! frame of raw sensor codes, and converts it to degrees
//! celsius through the camera's calibration table. The
//! result is written as four files sharing a timestamped
//! base name:
//!
//! - `thermal_<T>.png`: false-color rendering (inferno),
//!   normalized over the frame's own min/max.
//! - `thermal_<T>.npy`: the temperature matrix (`<f8`).
//! - `thermal_<T>.txt`: a report with the resolution,
//!   statistics and calibration info.
//! - `thermal_<T>_minmax.txt`: min and max, two decimals.
//!
//! # Usage
//!
//! ```rust
//! # fn test_compile() -> anyhow::Result<()> {
//! use thermal_capture::{camera::CameraConfig, CaptureOutcome, CapturePipeline, PipelineConfig};
//!
//! let camera = CameraConfig {
//!     replay: Some("recording.npy".into()),
//!     ..Default::default()
//! };
//! let mut pipeline = CapturePipeline::open(&camera, PipelineConfig::default())?;
//! if let CaptureOutcome::Captured(report) = pipeline.run()? {
//!     println!("mean: {:.2}", report.statistics.mean);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! Live V4L2 cameras need the `live` feature. Recorded
//! `.npy` files are always available as a [replay
//! source](camera::ReplayCamera).

#[macro_use]
mod parse;

pub mod calibration;
pub mod camera;
pub mod colormap;
pub mod error;
pub mod frame;
pub mod npy;
pub mod output;
pub mod pipeline;
pub mod stabilize;
pub mod stats;
pub mod temperature;

#[cfg(feature = "cli")]
pub mod cli;

pub use crate::calibration::{CalibrationInfo, LookupTable};
pub use crate::error::CaptureError;
pub use crate::frame::{RawFrame, TemperatureMatrix};
pub use crate::pipeline::{CaptureOutcome, CapturePipeline, PipelineConfig};
pub use crate::stats::Statistics;
