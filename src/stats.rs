//! Summary statistics over temperature values.
//!
//! [`Stats`] is a running accumulator (`stats += value`)
//! using Welford's update, so a uniform input produces an
//! exact mean and a zero deviation. NaN values are not
//! filtered: they propagate into every statistic.

use std::ops::AddAssign;

use anyhow::{bail, Result};
use serde_derive::*;

use crate::{error::CaptureError, frame::TemperatureMatrix};

/// Population statistics of a temperature matrix.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct Statistics {
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub std_dev: f64,
}

#[derive(Serialize, Debug, Clone, Copy)]
pub struct Stats {
    count: usize,
    min: f64,
    max: f64,
    mean: f64,
    m2: f64,
}

impl Default for Stats {
    fn default() -> Self {
        Stats {
            count: 0,
            min: f64::INFINITY,
            max: f64::NEG_INFINITY,
            mean: 0.,
            m2: 0.,
        }
    }
}

impl AddAssign<f64> for Stats {
    fn add_assign(&mut self, val: f64) {
        self.count += 1;
        if val.is_nan() || val < self.min {
            self.min = val;
        }
        if val.is_nan() || val > self.max {
            self.max = val;
        }
        let delta = val - self.mean;
        self.mean += delta / self.count as f64;
        self.m2 += delta * (val - self.mean);
    }
}

impl Stats {
    pub fn count(&self) -> usize {
        self.count
    }

    /// Final statistics; `None` if nothing was accumulated.
    pub fn finish(&self) -> Option<Statistics> {
        if self.count == 0 {
            return None;
        }
        Some(Statistics {
            min: self.min,
            max: self.max,
            mean: self.mean,
            std_dev: (self.m2 / self.count as f64).sqrt(),
        })
    }
}

/// Min, max, mean and population standard deviation over
/// all elements of `matrix`.
pub fn summarize(matrix: &TemperatureMatrix) -> Result<Statistics> {
    let mut stats = Stats::default();
    for &val in matrix.iter() {
        stats += val;
    }
    match stats.finish() {
        Some(s) => Ok(s),
        None => {
            let (ht, wid) = matrix.dim();
            bail!(CaptureError::EmptyInput(format!(
                "no temperature values in a {}x{} matrix",
                wid, ht
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use anyhow::Result;
    use ndarray::{arr2, Array2};

    use super::*;

    #[test]
    fn known_values() -> Result<()> {
        let s = summarize(&arr2(&[[2., 4., 4., 4.], [5., 5., 7., 9.]]))?;
        assert_eq!(s.min, 2.);
        assert_eq!(s.max, 9.);
        assert!((s.mean - 5.).abs() < 1e-12);
        assert!((s.std_dev - 2.).abs() < 1e-12);
        Ok(())
    }

    #[test]
    fn uniform_matrix() -> Result<()> {
        for &v in &[23.5, 0.1, -40.3, 1e6] {
            let s = summarize(&Array2::from_elem((4, 4), v))?;
            assert_eq!(s.min, v);
            assert_eq!(s.max, v);
            assert_eq!(s.mean, v);
            assert_eq!(s.std_dev, 0.);
        }
        Ok(())
    }

    #[test]
    fn mean_between_extremes() -> Result<()> {
        let m = Array2::from_shape_fn((19, 23), |(r, c)| {
            ((r * 31 + c * 17) % 101) as f64 * 0.37 - 12.5
        });
        let s = summarize(&m)?;
        assert!(s.min <= s.mean && s.mean <= s.max);
        assert!(s.std_dev >= 0.);
        Ok(())
    }

    #[test]
    fn empty_matrix_fails() {
        let err = summarize(&Array2::zeros((0, 4))).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<CaptureError>(),
            Some(CaptureError::EmptyInput(_))
        ));
    }

    #[test]
    fn nan_propagates() -> Result<()> {
        let s = summarize(&arr2(&[[1., f64::NAN, 3.]]))?;
        assert!(s.min.is_nan() && s.max.is_nan());
        assert!(s.mean.is_nan());
        assert!(s.std_dev.is_nan());

        let s = summarize(&arr2(&[[f64::NAN, 1., 3.]]))?;
        assert!(s.min.is_nan() && s.max.is_nan());
        Ok(())
    }

    #[test]
    fn accumulates_incrementally() {
        let mut stats = Stats::default();
        assert!(stats.finish().is_none());
        stats += 1.;
        stats += 3.;
        assert_eq!(stats.count(), 2);
        let s = stats.finish().unwrap();
        assert_eq!(s.mean, 2.);
        assert_eq!(s.std_dev, 1.);
    }
}
