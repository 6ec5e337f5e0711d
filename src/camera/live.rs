//! Live V4L2 thermal camera.
//!
//! The sensor streams 16-bit little-endian codes in
//! 1/64 kelvin. In the default layout each buffer is a
//! double-height frame: the visual image on top, thermal
//! codes in the lower half. In the raw layout the buffer
//! holds thermal codes only.
//!
//! Range switching needs the vendor command channel, which
//! the generic V4L2 interface does not expose; this source
//! reports the capability as unsupported.

use anyhow::{Context, Result};
use log::{debug, info, warn};
use ndarray::Array2;
use ouroboros::self_referencing;

use super::Camera;
use crate::{
    calibration::{CalibrationInfo, LookupTable},
    error::CaptureError,
    frame::RawFrame,
};

pub const DEFAULT_DEVICE: &str = "/dev/video0";

/// Thermal sensor resolution.
pub const SENSOR_WIDTH: u32 = 256;
pub const SENSOR_HEIGHT: u32 = 192;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamLayout {
    /// Visual image stacked over the thermal codes.
    Stacked,
    /// Thermal codes only.
    ThermalOnly,
}

impl StreamLayout {
    fn rows_per_sensor_row(self) -> u32 {
        match self {
            StreamLayout::Stacked => 2,
            StreamLayout::ThermalOnly => 1,
        }
    }
}

#[self_referencing]
struct DeviceState {
    device: v4l::Device,
    #[borrows(mut device)]
    #[covariant]
    stream: v4l::prelude::MmapStream<'this, v4l::Device>,
}

pub struct LiveCamera {
    device_path: String,
    layout: StreamLayout,
    width: usize,
    height: usize,
    state: Option<DeviceState>,
    info: CalibrationInfo,
    lut: LookupTable,
}

impl LiveCamera {
    pub fn open(device: Option<&str>, layout: StreamLayout, offset: f64) -> Result<Self> {
        use v4l::buffer::Type;
        use v4l::video::Capture;

        let device_path = device.unwrap_or(DEFAULT_DEVICE).to_string();
        let mut device = v4l::Device::with_path(&device_path)
            .with_context(|| format!("open v4l2 device {}", device_path))?;

        let mut format = device.format().context("read v4l2 format")?;
        format.width = SENSOR_WIDTH;
        format.height = SENSOR_HEIGHT * layout.rows_per_sensor_row();
        format.fourcc = v4l::FourCC::new(b"YUYV");
        let format = match device.set_format(&format) {
            Ok(format) => format,
            Err(err) => {
                warn!("LiveCamera: failed to set format on {}: {}", device_path, err);
                device
                    .format()
                    .context("read v4l2 format after set failure")?
            }
        };

        let width = format.width as usize;
        let height = (format.height / layout.rows_per_sensor_row()) as usize;

        let state = DeviceStateBuilder {
            device,
            stream_builder: |device| {
                v4l::prelude::MmapStream::with_buffers(device, Type::VideoCapture, 4)
                    .map_err(|err| anyhow::Error::new(err).context("create v4l2 buffer stream"))
            },
        }
        .try_build()?;

        info!(
            "LiveCamera: connected to {} ({}x{}, {:?})",
            device_path, width, height, layout
        );

        let info = CalibrationInfo::new()
            .with("source", "live")
            .with("device", &device_path)
            .with("layout", format!("{:?}", layout))
            .with("fourcc", format.fourcc)
            .with("offset", offset);

        Ok(LiveCamera {
            device_path,
            layout,
            width,
            height,
            state: Some(state),
            info,
            lut: LookupTable::native(offset),
        })
    }
}

impl Camera for LiveCamera {
    fn width(&self) -> usize {
        self.width
    }

    fn height(&self) -> usize {
        self.height
    }

    fn read(&mut self) -> Result<RawFrame> {
        use v4l::io::traits::CaptureStream;

        let (width, height) = (self.width, self.height);
        let skip_rows = match self.layout {
            StreamLayout::Stacked => height,
            StreamLayout::ThermalOnly => 0,
        };

        let state = self
            .state
            .as_mut()
            .ok_or_else(|| CaptureError::read_failure("camera already released"))?;
        let (buf, _meta) = state
            .with_mut(|fields| fields.stream.next())
            .map_err(|err| CaptureError::read_failure(format!("capture v4l2 frame: {}", err)))?;

        let row_bytes = width * 2;
        let start = skip_rows * row_bytes;
        let end = start + height * row_bytes;
        if buf.len() < end {
            return Err(CaptureError::read_failure(format!(
                "short frame from {}: {} bytes, expected {}",
                self.device_path,
                buf.len(),
                end
            ))
            .into());
        }

        let codes: Vec<u16> = buf[start..end]
            .chunks_exact(2)
            .map(|b| u16::from_le_bytes([b[0], b[1]]))
            .collect();
        Ok(RawFrame::new(Array2::from_shape_vec((height, width), codes)?))
    }

    fn info(&self) -> (&CalibrationInfo, &LookupTable) {
        (&self.info, &self.lut)
    }

    fn release(&mut self) {
        if self.state.take().is_some() {
            debug!("LiveCamera: released {}", self.device_path);
        }
    }

    fn is_released(&self) -> bool {
        self.state.is_none()
    }
}

impl Drop for LiveCamera {
    fn drop(&mut self) {
        self.release();
    }
}
