//! Camera sources.
//!
//! [`Camera`] is the capability surface the capture pipeline
//! consumes. [`CameraSource`] is the closed set of sources
//! selected from a [`CameraConfig`]:
//!
//! - *replay*: a recorded `.npy` file of raw frames (see
//!   [`ReplayCamera`]); chosen whenever a replay path is set.
//! - *live*: a V4L2 device, in the default (visual image
//!   stacked over thermal data) or raw (thermal only) stream
//!   layout. Requires the `live` feature.

use std::path::PathBuf;

use anyhow::Result;
use log::info;

use crate::{
    calibration::{CalibrationInfo, LookupTable},
    error::CaptureError,
    frame::RawFrame,
};

#[cfg(feature = "live")]
mod live;
mod replay;

#[cfg(feature = "live")]
pub use live::{LiveCamera, StreamLayout};
pub use replay::{save_recording, ReplayCamera};

/// Outcome of a temperature-range switch request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RangeSwitch {
    /// Sent to the sensor; wait for it before reading.
    Requested,
    /// The source cannot switch ranges. Nothing changed.
    Unsupported,
}

pub trait Camera {
    fn width(&self) -> usize;
    fn height(&self) -> usize;

    /// Whether the sensor can switch to a wide temperature
    /// range.
    fn supports_high_range(&self) -> bool {
        false
    }

    fn set_high_range(&mut self) -> Result<RangeSwitch> {
        Ok(RangeSwitch::Unsupported)
    }

    /// Block until a requested range switch is in effect.
    fn wait_for_range_application(&mut self) -> Result<()> {
        Ok(())
    }

    /// Next frame. Errors are read failures: the caller
    /// should stop consuming and release.
    fn read(&mut self) -> Result<RawFrame>;

    /// Calibration data; constant for the session.
    fn info(&self) -> (&CalibrationInfo, &LookupTable);

    /// Free the underlying handle. Idempotent.
    fn release(&mut self);

    fn is_released(&self) -> bool;
}

/// Options selecting and configuring a [`CameraSource`].
#[derive(Debug, Clone, Default)]
pub struct CameraConfig {
    /// Use the raw (thermal only) stream layout.
    pub raw: bool,
    /// Video device path; defaults to `/dev/video0`.
    pub device: Option<String>,
    /// Constant offset (celsius) added to the native
    /// calibration table.
    pub fixed_offset: Option<f64>,
    /// Replay this recording instead of a live device.
    pub replay: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Variant {
    LiveDefault,
    LiveRaw,
    Replay,
}

impl CameraConfig {
    pub fn variant(&self) -> Variant {
        match (&self.replay, self.raw) {
            (Some(_), _) => Variant::Replay,
            (None, true) => Variant::LiveRaw,
            (None, false) => Variant::LiveDefault,
        }
    }

    fn offset(&self) -> f64 {
        self.fixed_offset.unwrap_or(0.)
    }
}

pub enum CameraSource {
    Replay(ReplayCamera),
    #[cfg(feature = "live")]
    Live(LiveCamera),
}

impl CameraSource {
    /// Open the source selected by `config`. Failures are
    /// [`CaptureError::Initialization`].
    pub fn open(config: &CameraConfig) -> Result<Self> {
        let source = match (config.variant(), &config.replay) {
            (Variant::Replay, Some(path)) => {
                let cam = ReplayCamera::open(path, config.offset()).map_err(initialization)?;
                info!("Using emulator with file: {}", path.display());
                CameraSource::Replay(cam)
            }
            _ => Self::open_live(config)?,
        };
        info!("Camera resolution: {} x {}", source.width(), source.height());
        Ok(source)
    }

    #[cfg(feature = "live")]
    fn open_live(config: &CameraConfig) -> Result<Self> {
        let layout = if config.raw {
            StreamLayout::ThermalOnly
        } else {
            StreamLayout::Stacked
        };
        let cam = LiveCamera::open(config.device.as_deref(), layout, config.offset())
            .map_err(initialization)?;
        Ok(CameraSource::Live(cam))
    }

    #[cfg(not(feature = "live"))]
    fn open_live(_config: &CameraConfig) -> Result<Self> {
        Err(CaptureError::initialization(
            "live camera support not built in (enable the `live` feature) and no replay file given",
        )
        .into())
    }
}

fn initialization(e: anyhow::Error) -> anyhow::Error {
    CaptureError::Initialization(format!("{:#}", e)).into()
}

impl Camera for CameraSource {
    fn width(&self) -> usize {
        match self {
            CameraSource::Replay(cam) => cam.width(),
            #[cfg(feature = "live")]
            CameraSource::Live(cam) => cam.width(),
        }
    }

    fn height(&self) -> usize {
        match self {
            CameraSource::Replay(cam) => cam.height(),
            #[cfg(feature = "live")]
            CameraSource::Live(cam) => cam.height(),
        }
    }

    fn supports_high_range(&self) -> bool {
        match self {
            CameraSource::Replay(cam) => cam.supports_high_range(),
            #[cfg(feature = "live")]
            CameraSource::Live(cam) => cam.supports_high_range(),
        }
    }

    fn set_high_range(&mut self) -> Result<RangeSwitch> {
        match self {
            CameraSource::Replay(cam) => cam.set_high_range(),
            #[cfg(feature = "live")]
            CameraSource::Live(cam) => cam.set_high_range(),
        }
    }

    fn wait_for_range_application(&mut self) -> Result<()> {
        match self {
            CameraSource::Replay(cam) => cam.wait_for_range_application(),
            #[cfg(feature = "live")]
            CameraSource::Live(cam) => cam.wait_for_range_application(),
        }
    }

    fn read(&mut self) -> Result<RawFrame> {
        match self {
            CameraSource::Replay(cam) => cam.read(),
            #[cfg(feature = "live")]
            CameraSource::Live(cam) => cam.read(),
        }
    }

    fn info(&self) -> (&CalibrationInfo, &LookupTable) {
        match self {
            CameraSource::Replay(cam) => cam.info(),
            #[cfg(feature = "live")]
            CameraSource::Live(cam) => cam.info(),
        }
    }

    fn release(&mut self) {
        match self {
            CameraSource::Replay(cam) => cam.release(),
            #[cfg(feature = "live")]
            CameraSource::Live(cam) => cam.release(),
        }
    }

    fn is_released(&self) -> bool {
        match self {
            CameraSource::Replay(cam) => cam.is_released(),
            #[cfg(feature = "live")]
            CameraSource::Live(cam) => cam.is_released(),
        }
    }
}
