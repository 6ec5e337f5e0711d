//! Persist one capture as a set of files sharing a base
//! name:
//!
//! - `thermal_<label>.png`: colorized rendering
//! - `thermal_<label>.npy`: the full-precision matrix
//! - `thermal_<label>.txt`: statistics and camera info
//! - `thermal_<label>_minmax.txt`: min and max only
//!
//! Files are created exclusively. If any of the four
//! already exists nothing is written. Writing is not
//! transactional: a failure midway leaves the files
//! written so far.

use std::{
    fs::{File, OpenOptions},
    io::{self, BufWriter, Write},
    path::{Path, PathBuf},
};

use anyhow::{bail, Context, Result};
use image::{codecs::png::PngEncoder, ColorType};
use log::info;

use crate::{
    calibration::CalibrationInfo, colormap, error::CaptureError, frame::TemperatureMatrix, npy,
    stats::Statistics,
};

/// Paths of the files making up one capture.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputBundle {
    pub image: PathBuf,
    pub raw: PathBuf,
    pub report: PathBuf,
    pub minmax: PathBuf,
}

impl OutputBundle {
    pub fn paths_for(dir: &Path, label: &str) -> Self {
        let stem = format!("thermal_{}", label);
        OutputBundle {
            image: dir.join(format!("{}.png", stem)),
            raw: dir.join(format!("{}.npy", stem)),
            report: dir.join(format!("{}.txt", stem)),
            minmax: dir.join(format!("{}_minmax.txt", stem)),
        }
    }

    pub fn paths(&self) -> [&Path; 4] {
        [&self.image, &self.raw, &self.report, &self.minmax]
    }
}

#[derive(Debug, Clone)]
pub struct BundleWriter {
    dir: PathBuf,
}

impl BundleWriter {
    pub fn new<P: Into<PathBuf>>(dir: P) -> Self {
        BundleWriter { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn write(
        &self,
        matrix: &TemperatureMatrix,
        stats: &Statistics,
        info: &CalibrationInfo,
        label: &str,
    ) -> Result<OutputBundle> {
        let bundle = OutputBundle::paths_for(&self.dir, label);
        for path in bundle.paths().iter() {
            if path.exists() {
                bail!(CaptureError::OutputExists(path.to_path_buf()));
            }
        }

        let (ht, wid) = matrix.dim();
        let img = colormap::render(matrix, stats);
        PngEncoder::new(create(&bundle.image)?)
            .encode(img.as_raw(), wid as u32, ht as u32, ColorType::Rgb8)
            .with_context(|| format!("encoding {}", bundle.image.display()))?;
        info!("Image saved to: {}", bundle.image.display());

        npy::write_array(create(&bundle.raw)?, matrix)
            .with_context(|| format!("writing {}", bundle.raw.display()))?;
        info!("Raw temperature data saved to: {}", bundle.raw.display());

        let mut report = create(&bundle.report)?;
        write_report(&mut report, matrix, stats, info, label)
            .and_then(|_| report.flush())
            .with_context(|| format!("writing {}", bundle.report.display()))?;
        info!("Metadata saved to: {}", bundle.report.display());

        let mut minmax = create(&bundle.minmax)?;
        write_minmax(&mut minmax, stats)
            .and_then(|_| minmax.flush())
            .with_context(|| format!("writing {}", bundle.minmax.display()))?;
        info!("Min/max file saved to: {}", bundle.minmax.display());

        Ok(bundle)
    }
}

fn create(path: &Path) -> Result<BufWriter<File>> {
    match OpenOptions::new().write(true).create_new(true).open(path) {
        Ok(file) => Ok(BufWriter::new(file)),
        Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
            bail!(CaptureError::OutputExists(path.to_path_buf()))
        }
        Err(e) => Err(e).with_context(|| format!("creating {}", path.display())),
    }
}

/// The human-readable report.
pub fn write_report<W: Write>(
    w: &mut W,
    matrix: &TemperatureMatrix,
    stats: &Statistics,
    info: &CalibrationInfo,
    label: &str,
) -> io::Result<()> {
    let (ht, wid) = matrix.dim();
    writeln!(w, "Thermal Camera Capture")?;
    writeln!(w, "Timestamp: {}", label)?;
    writeln!(w, "Camera resolution: {} x {}", wid, ht)?;
    writeln!(w)?;
    writeln!(w, "Temperature statistics:")?;
    writeln!(w, "  Minimum: {:.2}°C", stats.min)?;
    writeln!(w, "  Maximum: {:.2}°C", stats.max)?;
    writeln!(w, "  Mean: {:.2}°C", stats.mean)?;
    writeln!(w, "  Standard deviation: {:.2}°C", stats.std_dev)?;

    if !info.is_empty() {
        writeln!(w)?;
        writeln!(w, "Camera info:")?;
        for (key, value) in info.iter() {
            writeln!(w, "  {}: {}", key, value)?;
        }
    }
    Ok(())
}

/// Two lines: min, then max.
pub fn write_minmax<W: Write>(w: &mut W, stats: &Statistics) -> io::Result<()> {
    write!(w, "{:.2}\n{:.2}\n", stats.min, stats.max)
}
