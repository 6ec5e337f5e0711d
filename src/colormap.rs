//! Normalize temperatures and render them with the
//! "inferno" perceptual colormap.

use image::{Rgb, RgbImage};
use ndarray::Array2;

use crate::{frame::TemperatureMatrix, stats::Statistics};

/// Color of a normalized level.
pub fn inferno(level: u8) -> Rgb<u8> {
    let c = colorous::INFERNO.eval_continuous(level as f64 / 255.);
    Rgb([c.r, c.g, c.b])
}

/// Rescale `matrix` from `[min, max]` to `[0, 255]`,
/// truncating. A flat matrix (`max == min`) maps to 0.
pub fn normalize(matrix: &TemperatureMatrix, stats: &Statistics) -> Array2<u8> {
    let span = stats.max - stats.min;
    if span == 0. {
        return Array2::zeros(matrix.dim());
    }
    matrix.mapv(|t| ((t - stats.min) / span * 255.) as u8)
}

/// Normalize then colorize.
pub fn render(matrix: &TemperatureMatrix, stats: &Statistics) -> RgbImage {
    let levels = normalize(matrix, stats);
    let (ht, wid) = levels.dim();
    RgbImage::from_fn(wid as u32, ht as u32, |x, y| {
        inferno(levels[(y as usize, x as usize)])
    })
}
