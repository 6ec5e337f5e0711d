//! Discard the first frames after the sensor comes up.
//!
//! Thermal sensors report transient values for a while after
//! power-up or a mode change. The [`Stabilizer`] reads and
//! drops a fixed number of frames, pausing between reads.
//! Failed reads are counted and otherwise ignored: a dead
//! source is detected by the capture read that follows.

use std::{thread, time::Duration};

use indicatif::{ProgressBar, ProgressStyle};
use log::{debug, info, warn};

use crate::camera::Camera;

/// Frames discarded by default.
pub const DEFAULT_FRAMES: usize = 10;

/// Pause between discarded reads by default.
pub const DEFAULT_PAUSE: Duration = Duration::from_millis(10);

/// A milestone is reported every this many frames.
const MILESTONE: usize = 5;

#[derive(Debug, Clone)]
pub struct Stabilizer {
    frames: usize,
    pause: Duration,
    progress: bool,
}

/// What happened during stabilization.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StabilizationReport {
    pub requested: usize,
    pub discarded: usize,
    pub failed: usize,
}

impl Default for Stabilizer {
    fn default() -> Self {
        Stabilizer::new(DEFAULT_FRAMES, DEFAULT_PAUSE)
    }
}

impl Stabilizer {
    pub fn new(frames: usize, pause: Duration) -> Self {
        Stabilizer {
            frames,
            pause,
            progress: false,
        }
    }

    /// Draw a progress bar on stderr while discarding.
    pub fn with_progress(mut self, progress: bool) -> Self {
        self.progress = progress;
        self
    }

    pub fn frames(&self) -> usize {
        self.frames
    }

    /// Issue exactly `frames` reads on `camera`, dropping
    /// every result.
    pub fn run<C: Camera + ?Sized>(&self, camera: &mut C) -> StabilizationReport {
        let mut report = StabilizationReport {
            requested: self.frames,
            ..Default::default()
        };
        if self.frames == 0 {
            return report;
        }
        info!("Stabilizing (skipping {} frames)...", self.frames);

        let bar = if self.progress {
            let bar = ProgressBar::new(self.frames as u64);
            bar.set_style(
                ProgressStyle::default_bar()
                    .template("[{elapsed_precise}] {wide_bar:cyan/blue} {pos:>7}/{len:7}"),
            );
            bar
        } else {
            ProgressBar::hidden()
        };

        for i in 0..self.frames {
            match camera.read() {
                Ok(_) => report.discarded += 1,
                Err(e) => {
                    debug!("discard read {} failed: {:#}", i + 1, e);
                    report.failed += 1;
                }
            }
            bar.inc(1);
            if (i + 1) % MILESTONE == 0 {
                info!("  Skipped {}/{} frames", i + 1, self.frames);
            }
            if !self.pause.is_zero() {
                thread::sleep(self.pause);
            }
        }
        bar.finish_and_clear();

        if report.failed > 0 {
            warn!(
                "{} of {} stabilization reads failed; continuing",
                report.failed, self.frames
            );
        }
        report
    }
}

#[cfg(test)]
mod tests {
    use anyhow::Result;
    use ndarray::Array2;

    use super::*;
    use crate::{
        calibration::{CalibrationInfo, LookupTable},
        camera::ReplayCamera,
        frame::RawFrame,
    };

    fn replay(n: usize) -> Result<ReplayCamera> {
        let frames = (0..n)
            .map(|i| RawFrame::new(Array2::from_elem((2, 2), i as u16)))
            .collect();
        ReplayCamera::from_frames(frames, CalibrationInfo::new(), LookupTable::native(0.))
    }

    #[test]
    fn discards_requested_frames() -> Result<()> {
        let mut cam = replay(12)?;
        let report = Stabilizer::new(10, Duration::from_millis(0)).run(&mut cam);
        assert_eq!(
            report,
            StabilizationReport {
                requested: 10,
                discarded: 10,
                failed: 0
            }
        );
        assert_eq!(cam.frames_read(), 10);
        assert_eq!(cam.read()?.codes()[(0, 0)], 10);
        Ok(())
    }

    #[test]
    fn zero_frames_skips_reads() -> Result<()> {
        let mut cam = replay(1)?;
        let report = Stabilizer::new(0, DEFAULT_PAUSE).run(&mut cam);
        assert_eq!(report.discarded + report.failed, 0);
        assert_eq!(cam.frames_read(), 0);
        Ok(())
    }

    #[test]
    fn ignores_failed_reads() -> Result<()> {
        let mut cam = replay(5)?;
        let report = Stabilizer::new(10, Duration::from_millis(0))
            .with_progress(true)
            .run(&mut cam);
        assert_eq!(report.discarded, 5);
        assert_eq!(report.failed, 5);
        Ok(())
    }

    #[test]
    fn pauses_between_reads() -> Result<()> {
        let mut cam = replay(3)?;
        let start = std::time::Instant::now();
        Stabilizer::new(3, Duration::from_millis(5)).run(&mut cam);
        assert!(start.elapsed() >= Duration::from_millis(15));
        Ok(())
    }
}
