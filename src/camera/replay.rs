//! Replay of recorded raw frames.
//!
//! A recording is an `.npy` array of `u16` codes, shaped
//! `(frames, height, width)` or `(height, width)` for a
//! single frame. Frames are handed out in order, once each;
//! reading past the last frame is a read failure.
//!
//! Calibration comes from an optional sidecar next to the
//! recording, `<stem>.calibration.json`:
//!
//! ```json
//! {
//!   "info": { "sensor": "T2S+" },
//!   "lut": { "first_code": 0, "values": [...], "out_of_range": "clamp" }
//! }
//! ```
//!
//! Without a sidecar table the sensor's native scale is used.

use std::{
    collections::VecDeque,
    fs::File,
    io::{BufReader, BufWriter},
    path::Path,
};

use anyhow::{bail, ensure, Context, Result};
use log::debug;
use ndarray::{stack, Axis, Ix2, Ix3};
use serde_derive::*;

use super::Camera;
use crate::{
    calibration::{CalibrationInfo, LookupTable},
    error::CaptureError,
    frame::RawFrame,
    npy,
};

#[derive(Deserialize, Default)]
struct Sidecar {
    #[serde(default)]
    info: CalibrationInfo,
    lut: Option<LookupTable>,
}

pub struct ReplayCamera {
    width: usize,
    height: usize,
    frames: VecDeque<RawFrame>,
    total: usize,
    read: usize,
    released: bool,
    info: CalibrationInfo,
    lut: LookupTable,
}

impl ReplayCamera {
    /// Open a recording. `offset` shifts the native table;
    /// a table from the sidecar is used unchanged.
    pub fn open(path: &Path, offset: f64) -> Result<Self> {
        let is_npy = path
            .extension()
            .map_or(false, |ext| ext.eq_ignore_ascii_case("npy"));
        ensure!(
            is_npy,
            "replay file must be an .npy recording: {}",
            path.display()
        );

        let codes = npy::read_path::<u16>(path)?;
        let frames: Vec<RawFrame> = match codes.ndim() {
            2 => vec![RawFrame::new(codes.into_dimensionality::<Ix2>()?)],
            3 => codes
                .into_dimensionality::<Ix3>()?
                .outer_iter()
                .map(|f| RawFrame::new(f.to_owned()))
                .collect(),
            n => bail!("replay recording must be 2 or 3 dimensional, found {}", n),
        };

        let sidecar_path = path.with_extension("calibration.json");
        let sidecar: Sidecar = if sidecar_path.is_file() {
            let rdr = BufReader::new(File::open(&sidecar_path)?);
            serde_json::from_reader::<_, Sidecar>(rdr)
                .with_context(|| format!("parsing {}", sidecar_path.display()))?
        } else {
            Sidecar::default()
        };

        let mut info = CalibrationInfo::new()
            .with("source", "replay")
            .with("file", path.display())
            .with("frames", frames.len());
        let lut = match sidecar.lut {
            Some(lut) => lut,
            None => {
                info.insert("offset", offset);
                LookupTable::native(offset)
            }
        };
        info.extend(sidecar.info);

        Self::from_frames(frames, info, lut)
    }

    /// Replay in-memory frames. The session dimensions are
    /// those of the first frame.
    pub fn from_frames(
        frames: Vec<RawFrame>,
        info: CalibrationInfo,
        lut: LookupTable,
    ) -> Result<Self> {
        let (height, width) = match frames.first() {
            Some(f) => f.dim(),
            None => bail!("replay recording has no frames"),
        };
        Ok(ReplayCamera {
            width,
            height,
            total: frames.len(),
            read: 0,
            frames: frames.into(),
            released: false,
            info,
            lut,
        })
    }

    /// Frames handed out so far.
    pub fn frames_read(&self) -> usize {
        self.read
    }

    pub fn frames_total(&self) -> usize {
        self.total
    }
}

impl Camera for ReplayCamera {
    fn width(&self) -> usize {
        self.width
    }

    fn height(&self) -> usize {
        self.height
    }

    fn read(&mut self) -> Result<RawFrame> {
        if self.released {
            bail!(CaptureError::read_failure("replay source already released"));
        }
        match self.frames.pop_front() {
            Some(frame) => {
                self.read += 1;
                Ok(frame)
            }
            None => bail!(CaptureError::read_failure(format!(
                "end of replay data after {} frames",
                self.total
            ))),
        }
    }

    fn info(&self) -> (&CalibrationInfo, &LookupTable) {
        (&self.info, &self.lut)
    }

    fn release(&mut self) {
        if !self.released {
            debug!("releasing replay source ({} frames unread)", self.frames.len());
            self.frames.clear();
            self.released = true;
        }
    }

    fn is_released(&self) -> bool {
        self.released
    }
}

impl Drop for ReplayCamera {
    fn drop(&mut self) {
        self.release();
    }
}

/// Write frames as a recording that [`ReplayCamera::open`]
/// accepts. All frames must have the same dimensions.
pub fn save_recording(path: &Path, frames: &[RawFrame]) -> Result<()> {
    let views: Vec<_> = frames.iter().map(|f| f.codes().view()).collect();
    let stacked = stack(Axis(0), &views).context("frames differ in dimensions")?;
    let writer = BufWriter::new(
        File::create(path).with_context(|| format!("creating {}", path.display()))?,
    );
    npy::write_array(writer, &stacked)
}
