use ndarray::Array2;

/// Temperatures in celsius, indexed `(row, col)`.
pub type TemperatureMatrix = Array2<f64>;

/// One sensor-native frame: uncalibrated 16-bit codes,
/// indexed `(row, col)`.
#[derive(Debug, Clone, PartialEq)]
pub struct RawFrame {
    codes: Array2<u16>,
}

impl RawFrame {
    pub fn new(codes: Array2<u16>) -> Self {
        RawFrame { codes }
    }

    /// `(height, width)`
    pub fn dim(&self) -> (usize, usize) {
        self.codes.dim()
    }

    pub fn codes(&self) -> &Array2<u16> {
        &self.codes
    }
}

impl From<Array2<u16>> for RawFrame {
    fn from(codes: Array2<u16>) -> Self {
        RawFrame::new(codes)
    }
}
