//! Calibration data reported by a camera.
//!
//! A camera hands out a [`CalibrationInfo`] (free-form
//! descriptive fields: model, firmware, environment) and a
//! [`LookupTable`] mapping raw sensor codes to temperatures
//! in celsius. Both are fixed for the lifetime of a session.

use std::{collections::BTreeMap, convert::TryFrom, fmt};

use anyhow::{ensure, Error, Result};
use serde_derive::*;

/// Offset between kelvin and celsius.
pub const KELVIN_OFFSET: f64 = 273.15;

/// Codes per kelvin in the sensor's native 16-bit output.
pub const NATIVE_CODES_PER_KELVIN: f64 = 64.0;

/// Descriptive metadata of a session, ordered by key.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(transparent)]
pub struct CalibrationInfo {
    fields: BTreeMap<String, String>,
}

impl CalibrationInfo {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert<K: Into<String>, V: fmt::Display>(&mut self, key: K, value: V) {
        self.fields.insert(key.into(), value.to_string());
    }

    /// Builder-style [`insert`][Self::insert].
    pub fn with<K: Into<String>, V: fmt::Display>(mut self, key: K, value: V) -> Self {
        self.insert(key, value);
        self
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.fields.get(key).map(|v| v.as_str())
    }

    /// Merge `other` into `self`; keys in `other` win.
    pub fn extend(&mut self, other: CalibrationInfo) {
        self.fields.extend(other.fields);
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

/// What a [`LookupTable`] does with codes it does not cover.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum OutOfRange {
    /// Use the value of the nearest covered code.
    Clamp,
    /// Continue the slope of the two nearest covered codes.
    Extrapolate,
}

impl Default for OutOfRange {
    fn default() -> Self {
        OutOfRange::Clamp
    }
}

/// Maps consecutive raw codes, starting at `first_code`, to
/// temperatures (celsius).
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(try_from = "TableRepr", into = "TableRepr")]
pub struct LookupTable {
    first_code: u16,
    values: Vec<f64>,
    out_of_range: OutOfRange,
}

impl LookupTable {
    pub fn new(first_code: u16, values: Vec<f64>, out_of_range: OutOfRange) -> Result<Self> {
        ensure!(!values.is_empty(), "lookup table must cover at least one code");
        let last_code = first_code as usize + values.len() - 1;
        ensure!(
            last_code <= u16::MAX as usize,
            "lookup table runs past the 16-bit code range: {} codes from {}",
            values.len(),
            first_code
        );
        Ok(LookupTable {
            first_code,
            values,
            out_of_range,
        })
    }

    /// Table for the sensor's native scale: `code` is in
    /// 1/64 kelvin. `offset` (celsius) is added to every
    /// entry.
    pub fn native(offset: f64) -> Self {
        let values = (0..=u16::MAX)
            .map(|code| code as f64 / NATIVE_CODES_PER_KELVIN - KELVIN_OFFSET + offset)
            .collect();
        LookupTable {
            first_code: 0,
            values,
            out_of_range: OutOfRange::Clamp,
        }
    }

    pub fn first_code(&self) -> u16 {
        self.first_code
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn out_of_range(&self) -> OutOfRange {
        self.out_of_range
    }

    /// Temperature for a raw code.
    #[inline]
    pub fn lookup(&self, code: u16) -> f64 {
        let idx = code as i64 - self.first_code as i64;
        let len = self.values.len() as i64;
        if (0..len).contains(&idx) {
            return self.values[idx as usize];
        }

        let first = self.values[0];
        let last = self.values[self.values.len() - 1];
        match self.out_of_range {
            OutOfRange::Clamp => {
                if idx < 0 {
                    first
                } else {
                    last
                }
            }
            OutOfRange::Extrapolate if len == 1 => first,
            OutOfRange::Extrapolate => {
                if idx < 0 {
                    let slope = self.values[1] - first;
                    first + slope * idx as f64
                } else {
                    let slope = last - self.values[self.values.len() - 2];
                    last + slope * (idx - (len - 1)) as f64
                }
            }
        }
    }
}

#[derive(Serialize, Deserialize)]
struct TableRepr {
    #[serde(default)]
    first_code: u16,
    values: Vec<f64>,
    #[serde(default)]
    out_of_range: OutOfRange,
}

impl TryFrom<TableRepr> for LookupTable {
    type Error = Error;

    fn try_from(r: TableRepr) -> Result<Self> {
        LookupTable::new(r.first_code, r.values, r.out_of_range)
    }
}

impl From<LookupTable> for TableRepr {
    fn from(t: LookupTable) -> Self {
        TableRepr {
            first_code: t.first_code,
            values: t.values,
            out_of_range: t.out_of_range,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn native_scale() {
        let lut = LookupTable::native(0.);
        assert_eq!(lut.len(), 1 << 16);
        assert_eq!(lut.lookup(0), -KELVIN_OFFSET);
        assert!((lut.lookup(18803) - 20.646875).abs() < 1e-9);

        let shifted = LookupTable::native(1.5);
        assert!((shifted.lookup(18803) - 22.146875).abs() < 1e-9);
    }

    #[test]
    fn clamps_outside_covered_codes() -> Result<()> {
        let lut = LookupTable::new(10, vec![1., 2., 4.], OutOfRange::Clamp)?;
        assert_eq!(lut.lookup(11), 2.);
        assert_eq!(lut.lookup(0), 1.);
        assert_eq!(lut.lookup(500), 4.);
        Ok(())
    }

    #[test]
    fn extrapolates_outside_covered_codes() -> Result<()> {
        let lut = LookupTable::new(10, vec![1., 2., 4.], OutOfRange::Extrapolate)?;
        assert_eq!(lut.lookup(8), -1.);
        assert_eq!(lut.lookup(14), 8.);

        let single = LookupTable::new(3, vec![7.], OutOfRange::Extrapolate)?;
        assert_eq!(single.lookup(0), 7.);
        assert_eq!(single.lookup(9), 7.);
        Ok(())
    }

    #[test]
    fn rejects_bad_tables() {
        assert!(LookupTable::new(0, vec![], OutOfRange::Clamp).is_err());
        assert!(LookupTable::new(u16::MAX, vec![0., 1.], OutOfRange::Clamp).is_err());

        let json = r#"{"values": []}"#;
        assert!(serde_json::from_str::<LookupTable>(json).is_err());
    }

    #[test]
    fn table_from_json() -> Result<()> {
        let json = r#"{"first_code": 99, "values": [20.0, 23.5], "out_of_range": "extrapolate"}"#;
        let lut: LookupTable = serde_json::from_str(json)?;
        assert_eq!(lut.first_code(), 99);
        assert_eq!(lut.out_of_range(), OutOfRange::Extrapolate);
        assert_eq!(lut.lookup(100), 23.5);
        assert_eq!(lut.lookup(101), 27.);

        let lut: LookupTable = serde_json::from_str(r#"{"values": [1.0]}"#)?;
        assert_eq!(lut.out_of_range(), OutOfRange::Clamp);
        Ok(())
    }

    #[test]
    fn info_fields_are_key_ordered() {
        let info = CalibrationInfo::new()
            .with("sensor", "T2S+")
            .with("firmware", 3)
            .with("emissivity", 0.95);
        let keys: Vec<_> = info.iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["emissivity", "firmware", "sensor"]);
        assert_eq!(info.get("firmware"), Some("3"));
    }
}
