//! Compute temperatures from raw sensor codes.
//!
//! Every pixel goes through the session's
//! [`LookupTable`]; codes the table does not cover follow
//! the table's own [`OutOfRange`][crate::calibration::OutOfRange]
//! policy.

use crate::{
    calibration::LookupTable,
    frame::{RawFrame, TemperatureMatrix},
};

/// Convert a raw frame to a temperature matrix of the same
/// dimensions.
pub fn convert(frame: &RawFrame, lut: &LookupTable) -> TemperatureMatrix {
    frame.codes().mapv(|code| lut.lookup(code))
}

/// Same as [`convert`], as a closure over a fixed table.
pub fn temperature_transform(lut: &LookupTable) -> impl Fn(u16) -> f64 + '_ {
    move |code| lut.lookup(code)
}

#[cfg(test)]
mod tests {
    use anyhow::Result;
    use ndarray::{arr2, Array2};

    use super::*;
    use crate::calibration::OutOfRange;

    #[test]
    fn maps_every_pixel() -> Result<()> {
        let lut = LookupTable::new(100, vec![23.5, 24., 25.], OutOfRange::Clamp)?;
        let frame = RawFrame::new(arr2(&[[100, 101], [102, 900]]));

        let temps = convert(&frame, &lut);
        assert_eq!(temps, arr2(&[[23.5, 24.], [25., 25.]]));
        Ok(())
    }

    #[test]
    fn keeps_dimensions() {
        let lut = LookupTable::native(0.);
        let frame = RawFrame::new(Array2::from_elem((3, 7), 18803));
        assert_eq!(convert(&frame, &lut).dim(), (3, 7));
    }

    #[test]
    fn is_deterministic() {
        let lut = LookupTable::native(-0.25);
        let codes = Array2::from_shape_fn((24, 32), |(r, c)| (17000 + r * 97 + c * 13) as u16);
        let frame = RawFrame::new(codes);

        let first = convert(&frame, &lut);
        for _ in 0..3 {
            let again = convert(&frame, &lut);
            assert!(first
                .iter()
                .zip(again.iter())
                .all(|(a, b)| a.to_bits() == b.to_bits()));
        }
    }

    #[test]
    fn transform_matches_convert() {
        let lut = LookupTable::native(0.);
        let t = temperature_transform(&lut);
        let frame = RawFrame::new(arr2(&[[18000, 19000]]));
        let temps = convert(&frame, &lut);
        assert_eq!(temps[(0, 0)], t(18000));
        assert_eq!(temps[(0, 1)], t(19000));
    }
}
