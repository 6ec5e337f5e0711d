//! Single-frame capture.
//!
//! [`CapturePipeline::run`] is one straight pass:
//!
//! 1. optional switch to the high temperature range
//! 2. stabilization (discarded reads)
//! 3. one capture read
//! 4. conversion to temperatures and statistics
//! 5. the output bundle
//!
//! The pipeline owns its camera and releases it on every
//! path out of `run`. A failed capture read is not an error
//! of `run`: it is reported as [`CaptureOutcome::ReadFailed`]
//! and nothing is written.

use std::{path::PathBuf, time::Duration};

use anyhow::{bail, ensure, Result};
use log::{error, info, warn};

use crate::{
    camera::{Camera, CameraConfig, CameraSource, RangeSwitch},
    error::CaptureError,
    frame::RawFrame,
    output::{BundleWriter, OutputBundle},
    stabilize::{self, StabilizationReport, Stabilizer},
    stats::{summarize, Statistics},
    temperature::convert,
};

/// Timestamp format of the output base name.
pub const LABEL_FORMAT: &str = "%Y-%m-%d_%H-%M-%S";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
    Initializing,
    Stabilizing,
    Capturing,
    Finalizing,
    Released,
}

#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Frames discarded before the capture read.
    pub stabilization_frames: usize,
    pub stabilization_pause: Duration,
    /// Directory receiving the output files. Must exist.
    pub output_dir: PathBuf,
    /// Ask the camera for its wide temperature range.
    pub high_range: bool,
    /// Show a progress bar while stabilizing.
    pub progress: bool,
    /// Output base name label; the local time when unset.
    pub label: Option<String>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        PipelineConfig {
            stabilization_frames: stabilize::DEFAULT_FRAMES,
            stabilization_pause: stabilize::DEFAULT_PAUSE,
            output_dir: PathBuf::from("."),
            high_range: false,
            progress: false,
            label: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct CaptureReport {
    pub width: usize,
    pub height: usize,
    pub label: String,
    pub stabilization: StabilizationReport,
    pub statistics: Statistics,
    pub bundle: OutputBundle,
}

#[derive(Debug, Clone)]
pub enum CaptureOutcome {
    Captured(CaptureReport),
    /// The capture read failed; the camera was released and
    /// no files were written.
    ReadFailed { reason: String },
}

pub struct CapturePipeline<C: Camera> {
    camera: C,
    config: PipelineConfig,
    status: SessionStatus,
}

impl CapturePipeline<CameraSource> {
    /// Open the camera selected by `camera` and wrap it.
    pub fn open(camera: &CameraConfig, config: PipelineConfig) -> Result<Self> {
        info!("Initializing camera...");
        Ok(CapturePipeline::new(CameraSource::open(camera)?, config))
    }
}

impl<C: Camera> CapturePipeline<C> {
    pub fn new(camera: C, config: PipelineConfig) -> Self {
        CapturePipeline {
            camera,
            config,
            status: SessionStatus::Initializing,
        }
    }

    pub fn status(&self) -> SessionStatus {
        self.status
    }

    pub fn camera(&self) -> &C {
        &self.camera
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Run the session. A session runs once; the camera is
    /// released whatever the result.
    pub fn run(&mut self) -> Result<CaptureOutcome> {
        if self.status != SessionStatus::Initializing {
            bail!("capture session already ran");
        }

        let result = self.capture();
        self.camera.release();
        self.status = SessionStatus::Released;

        if let Ok(CaptureOutcome::ReadFailed { reason }) = &result {
            error!("Error: {}", reason);
        }
        result
    }

    fn capture(&mut self) -> Result<CaptureOutcome> {
        let (width, height) = (self.camera.width(), self.camera.height());
        if width == 0 || height == 0 {
            bail!(CaptureError::EmptyInput(format!(
                "camera reports a {}x{} sensor",
                width, height
            )));
        }

        if self.config.high_range {
            self.apply_high_range()?;
        } else {
            info!("Using normal temperature range...");
        }

        self.status = SessionStatus::Stabilizing;
        let stabilization = Stabilizer::new(
            self.config.stabilization_frames,
            self.config.stabilization_pause,
        )
        .with_progress(self.config.progress)
        .run(&mut self.camera);

        self.status = SessionStatus::Capturing;
        info!("Capturing final frame...");
        let frame = match self.camera.read().and_then(|f| check_dim(f, width, height)) {
            Ok(frame) => frame,
            Err(e) => {
                return Ok(CaptureOutcome::ReadFailed {
                    reason: format!("{:#}", e),
                })
            }
        };

        let (info, lut) = self.camera.info();
        let matrix = convert(&frame, lut);
        let statistics = summarize(&matrix)?;
        info!("Temperature statistics:");
        info!("  Min: {:.2}°C", statistics.min);
        info!("  Max: {:.2}°C", statistics.max);
        info!("  Mean: {:.2}°C", statistics.mean);
        info!("  Std: {:.2}°C", statistics.std_dev);

        self.status = SessionStatus::Finalizing;
        let label = match &self.config.label {
            Some(label) => label.clone(),
            None => timestamp_label(),
        };
        let bundle =
            BundleWriter::new(&self.config.output_dir).write(&matrix, &statistics, info, &label)?;

        Ok(CaptureOutcome::Captured(CaptureReport {
            width,
            height,
            label,
            stabilization,
            statistics,
            bundle,
        }))
    }

    fn apply_high_range(&mut self) -> Result<()> {
        info!("Setting high temperature range...");
        match self.camera.set_high_range()? {
            RangeSwitch::Requested => self.camera.wait_for_range_application()?,
            RangeSwitch::Unsupported => {
                warn!("Camera cannot switch temperature range; keeping the current range")
            }
        }
        Ok(())
    }
}

fn check_dim(frame: RawFrame, width: usize, height: usize) -> Result<RawFrame> {
    let (ht, wid) = frame.dim();
    ensure!(
        (ht, wid) == (height, width),
        CaptureError::read_failure(format!(
            "frame is {}x{}, camera reports {}x{}",
            wid, ht, width, height
        ))
    );
    Ok(frame)
}

/// Local time formatted with [`LABEL_FORMAT`].
pub fn timestamp_label() -> String {
    chrono::Local::now().format(LABEL_FORMAT).to_string()
}
