//! Read and write NumPy `.npy` arrays.
//!
//! Only what a capture needs is supported: integer
//! (`u2`) and float (`f8`) element types, either byte
//! order, C or Fortran layout on read. Writes are always
//! format version 1.0, little-endian, C order, with the
//! header padded to a 64-byte boundary.
//!
//! # Format
//!
//! - 0x0: magic `"\x93NUMPY"`
//! - 0x6: major, minor version
//! - 0x8: header length: `u16` (v1) or `u32` (v2, v3), LE
//! - ...: header, a python dict literal with keys `descr`,
//!   `fortran_order` and `shape`, newline terminated
//! - ...: raw element data

use std::{
    fs::File,
    io::{self, BufReader, Read, Write},
    path::Path,
};

use anyhow::{anyhow, bail, ensure, Context, Result};
use byteordered::{ByteOrdered, Endian, Endianness};
use lazy_static::lazy_static;
use ndarray::{ArrayBase, ArrayD, Data, Dimension, IxDyn, ShapeBuilder};
use regex::Regex;

use crate::parse::Parseable;

const MAGIC: &[u8; 6] = b"\x93NUMPY";
const HEADER_ALIGN: usize = 64;

/// Elements reserved up front; the shape in a header is not
/// trusted beyond this.
const MAX_PREALLOC: usize = 1 << 20;

/// Element types that can be stored in a `.npy` file.
pub trait Element: Copy {
    /// Type code without the byte-order character.
    const DESCR: &'static str;

    fn read_from<R: Read, E: Endian>(r: &mut ByteOrdered<R, E>) -> io::Result<Self>;
    fn write_to<W: Write, E: Endian>(self, w: &mut ByteOrdered<W, E>) -> io::Result<()>;
}

impl Element for u16 {
    const DESCR: &'static str = "u2";

    fn read_from<R: Read, E: Endian>(r: &mut ByteOrdered<R, E>) -> io::Result<Self> {
        r.read_u16()
    }
    fn write_to<W: Write, E: Endian>(self, w: &mut ByteOrdered<W, E>) -> io::Result<()> {
        w.write_u16(self)
    }
}

impl Element for f64 {
    const DESCR: &'static str = "f8";

    fn read_from<R: Read, E: Endian>(r: &mut ByteOrdered<R, E>) -> io::Result<Self> {
        r.read_f64()
    }
    fn write_to<W: Write, E: Endian>(self, w: &mut ByteOrdered<W, E>) -> io::Result<()> {
        w.write_f64(self)
    }
}

declare_parseable_struct! {
    struct Preamble {
        magic => [u8; 6],
        major => u8,
        minor => u8,
    }
}

/// Parsed `.npy` header dictionary.
#[derive(Debug, Clone, PartialEq)]
pub struct Header {
    pub descr: String,
    pub fortran_order: bool,
    pub shape: Vec<usize>,
}

impl Header {
    fn parse(dict: &str) -> Result<Self> {
        lazy_static! {
            static ref DESCR: Regex = Regex::new(r#"['"]descr['"]\s*:\s*['"]([^'"]*)['"]"#).unwrap();
            static ref FORTRAN: Regex =
                Regex::new(r#"['"]fortran_order['"]\s*:\s*(True|False)"#).unwrap();
            static ref SHAPE: Regex = Regex::new(r#"['"]shape['"]\s*:\s*\(([^)]*)\)"#).unwrap();
        }

        let descr = DESCR
            .captures(dict)
            .ok_or_else(|| anyhow!("no `descr` in npy header: {}", dict))?[1]
            .to_string();
        let fortran_order = &FORTRAN
            .captures(dict)
            .ok_or_else(|| anyhow!("no `fortran_order` in npy header: {}", dict))?[1]
            == "True";
        let shape = SHAPE
            .captures(dict)
            .ok_or_else(|| anyhow!("no `shape` in npy header: {}", dict))?[1]
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| s.parse::<usize>().with_context(|| format!("bad npy dimension `{}`", s)))
            .collect::<Result<_>>()?;

        Ok(Header {
            descr,
            fortran_order,
            shape,
        })
    }

    fn to_dict(&self) -> String {
        let dims = match self.shape.len() {
            1 => format!("{},", self.shape[0]),
            _ => self
                .shape
                .iter()
                .map(|d| d.to_string())
                .collect::<Vec<_>>()
                .join(", "),
        };
        format!(
            "{{'descr': '{}', 'fortran_order': {}, 'shape': ({}), }}",
            self.descr,
            if self.fortran_order { "True" } else { "False" },
            dims
        )
    }

    /// Byte order of the elements, if `descr` is for `T`.
    fn endianness_for<T: Element>(&self) -> Result<Endianness> {
        let (order, code) = self.descr.split_at(self.descr.len().min(1));
        ensure!(
            code == T::DESCR,
            "unsupported npy element type `{}` (expected `{}`)",
            self.descr,
            T::DESCR
        );
        match order {
            "<" | "|" => Ok(Endianness::Little),
            ">" => Ok(Endianness::Big),
            _ => bail!("unsupported npy byte order in `{}`", self.descr),
        }
    }

    /// Element count implied by the shape; fails if it does
    /// not fit in `usize`.
    pub fn num_elements(&self) -> Result<usize> {
        self.shape
            .iter()
            .try_fold(1usize, |acc, &dim| acc.checked_mul(dim))
            .ok_or_else(|| anyhow!("npy shape {:?} is too large", self.shape))
    }
}

/// Read only the header of a `.npy` stream, leaving the
/// reader at the start of the element data.
pub fn read_header<R: Read>(rdr: &mut R) -> Result<Header> {
    let mut le = ByteOrdered::le(rdr);
    let pre = Preamble::parse(&mut le).context("reading npy preamble")?;
    ensure!(&pre.magic == MAGIC, "not an npy file: bad magic");

    let header_len = match pre.major {
        1 => u16::parse(&mut le)? as usize,
        2 | 3 => u32::parse(&mut le)? as usize,
        v => bail!("unsupported npy version {}.{}", v, pre.minor),
    };

    let mut dict = vec![0u8; header_len];
    le.read_exact(&mut dict).context("reading npy header")?;
    let dict = String::from_utf8(dict).context("npy header is not text")?;
    Header::parse(&dict)
}

/// Read a whole array of `T` from a `.npy` stream.
pub fn read_array<T: Element, R: Read>(mut rdr: R) -> Result<ArrayD<T>> {
    let header = read_header(&mut rdr)?;
    let order = header.endianness_for::<T>()?;

    let count = header.num_elements()?;
    let mut data = Vec::with_capacity(count.min(MAX_PREALLOC));
    let mut rdr = ByteOrdered::runtime(rdr, order);
    for idx in 0..count {
        let val = T::read_from(&mut rdr)
            .with_context(|| format!("npy data ends at element {} of {}", idx, count))?;
        data.push(val);
    }

    let shape = IxDyn(&header.shape);
    let array = if header.fortran_order {
        ArrayD::from_shape_vec(shape.f(), data)?
    } else {
        ArrayD::from_shape_vec(shape, data)?
    };
    Ok(array)
}

pub fn read_path<T: Element>(path: &Path) -> Result<ArrayD<T>> {
    let file = File::open(path).with_context(|| format!("opening {}", path.display()))?;
    read_array(BufReader::new(file)).with_context(|| format!("reading {}", path.display()))
}

/// Write `array` as a version 1.0 `.npy` stream.
pub fn write_array<T, S, D, W>(mut writer: W, array: &ArrayBase<S, D>) -> Result<()>
where
    T: Element,
    S: Data<Elem = T>,
    D: Dimension,
    W: Write,
{
    let header = Header {
        descr: format!("<{}", T::DESCR),
        fortran_order: false,
        shape: array.shape().to_vec(),
    };
    let mut dict = header.to_dict();

    let unpadded = MAGIC.len() + 2 + 2 + dict.len() + 1;
    let padding = (HEADER_ALIGN - unpadded % HEADER_ALIGN) % HEADER_ALIGN;
    dict.extend(std::iter::repeat(' ').take(padding));
    dict.push('\n');
    ensure!(dict.len() <= u16::MAX as usize, "npy header too long");

    writer.write_all(MAGIC)?;
    writer.write_all(&[1, 0])?;

    let mut le = ByteOrdered::le(writer);
    le.write_u16(dict.len() as u16)?;
    le.write_all(dict.as_bytes())?;
    for &val in array.iter() {
        val.write_to(&mut le)?;
    }
    le.into_inner().flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use anyhow::Result;
    use ndarray::{arr2, arr3, Ix2, Ix3};

    use super::*;

    fn v1_file(dict: &str, data: &[u8]) -> Vec<u8> {
        let mut bytes = MAGIC.to_vec();
        bytes.extend_from_slice(&[1, 0]);
        bytes.extend_from_slice(&(dict.len() as u16).to_le_bytes());
        bytes.extend_from_slice(dict.as_bytes());
        bytes.extend_from_slice(data);
        bytes
    }

    #[test]
    fn written_header_is_aligned() -> Result<()> {
        let mut buf = vec![];
        write_array(&mut buf, &arr2(&[[1.5f64, -2.], [0.25, 1e9]]))?;

        assert_eq!(&buf[..6], MAGIC);
        assert_eq!(&buf[6..8], &[1, 0]);
        let header_len = u16::from_le_bytes([buf[8], buf[9]]) as usize;
        assert_eq!((10 + header_len) % HEADER_ALIGN, 0);
        assert_eq!(buf[10 + header_len - 1], b'\n');
        assert_eq!(buf.len(), 10 + header_len + 4 * 8);

        let header = read_header(&mut Cursor::new(&buf))?;
        assert_eq!(header.descr, "<f8");
        assert!(!header.fortran_order);
        assert_eq!(header.shape, vec![2, 2]);
        Ok(())
    }

    #[test]
    fn reads_back_written_matrix() -> Result<()> {
        let m = arr2(&[[23.5f64, 24.125, -3.], [0.1, 0.2, 0.3]]);
        let mut buf = vec![];
        write_array(&mut buf, &m)?;

        let back = read_array::<f64, _>(Cursor::new(buf))?.into_dimensionality::<Ix2>()?;
        assert_eq!(back, m);
        Ok(())
    }

    #[test]
    fn reads_stacked_frames() -> Result<()> {
        let frames = arr3(&[[[1u16, 2], [3, 4]], [[5, 6], [7, 8]], [[9, 10], [11, 12]]]);
        let mut buf = vec![];
        write_array(&mut buf, &frames)?;

        let back = read_array::<u16, _>(Cursor::new(buf))?.into_dimensionality::<Ix3>()?;
        assert_eq!(back, frames);
        Ok(())
    }

    #[test]
    fn reads_big_endian_fortran_order() -> Result<()> {
        // 2x3 matrix [[1, 2, 3], [4, 5, 6]] stored column-major, big-endian
        let data: Vec<u8> = [1u16, 4, 2, 5, 3, 6]
            .iter()
            .flat_map(|v| v.to_be_bytes().to_vec())
            .collect();
        let bytes = v1_file(
            "{'descr': '>u2', 'fortran_order': True, 'shape': (2, 3), }\n",
            &data,
        );

        let back = read_array::<u16, _>(Cursor::new(bytes))?.into_dimensionality::<Ix2>()?;
        assert_eq!(back, arr2(&[[1, 2, 3], [4, 5, 6]]));
        Ok(())
    }

    #[test]
    fn rejects_wrong_element_type() {
        let bytes = v1_file(
            "{'descr': '<f8', 'fortran_order': False, 'shape': (1,), }\n",
            &1f64.to_le_bytes(),
        );
        let err = read_array::<u16, _>(Cursor::new(bytes)).unwrap_err();
        assert!(err.to_string().contains("unsupported npy element type"));
    }

    #[test]
    fn rejects_truncated_data() {
        let bytes = v1_file(
            "{'descr': '<u2', 'fortran_order': False, 'shape': (4,), }\n",
            &[0, 1, 0, 2],
        );
        assert!(read_array::<u16, _>(Cursor::new(bytes)).is_err());
    }

    #[test]
    fn oversized_shape_is_an_error() {
        let bytes = v1_file(
            "{'descr': '<u2', 'fortran_order': False, 'shape': (4294967296, 4294967296, 2), }\n",
            &[0, 1],
        );
        let err = read_array::<u16, _>(Cursor::new(bytes)).unwrap_err();
        assert!(err.to_string().contains("too large"));

        // Fits in usize but the data is far shorter than claimed.
        let bytes = v1_file(
            "{'descr': '<u2', 'fortran_order': False, 'shape': (65536, 65536), }\n",
            &[0, 1, 0, 2],
        );
        let err = read_array::<u16, _>(Cursor::new(bytes)).unwrap_err();
        assert!(format!("{:#}", err).contains("npy data ends at element 2"));
    }

    #[test]
    fn rejects_bad_magic() {
        let mut bytes = v1_file(
            "{'descr': '<u2', 'fortran_order': False, 'shape': (1,), }\n",
            &[0, 1],
        );
        bytes[1] = b'X';
        let err = read_array::<u16, _>(Cursor::new(bytes)).unwrap_err();
        assert!(err.to_string().contains("bad magic"));
    }

    #[test]
    fn one_dimensional_shape_keeps_trailing_comma() {
        let header = Header {
            descr: "<u2".into(),
            fortran_order: false,
            shape: vec![7],
        };
        assert!(header.to_dict().contains("'shape': (7,)"));
        assert_eq!(Header::parse(&header.to_dict()).unwrap(), header);
    }
}
