//! Fixed-layout binary preambles.
//!
//! [`declare_parseable_struct!`] declares a struct whose
//! fields are read in declaration order with the reader's
//! endianness. A short read is reported with the struct and
//! field name.

use std::io::Read;

use anyhow::Result;
use byteordered::{ByteOrdered, Endian};

/// Declare a [`Parseable`] struct of [`Parseable`] fields.
macro_rules! declare_parseable_struct {
    (
        $(#[$smeta:meta])*
        $svis:vis struct $sname:ident {
            $($name:ident => $ty:ty),* $(,)?
        }
    ) => {
        $(#[$smeta])*
        $svis struct $sname {
            $($name: $ty),*
        }

        impl crate::parse::Parseable for $sname {
            fn parse<R: std::io::Read, E: byteordered::Endian>(
                r: &mut byteordered::ByteOrdered<R, E>,
            ) -> anyhow::Result<Self> {
                Ok($sname {
                    $($name: anyhow::Context::with_context(
                        <$ty as crate::parse::Parseable>::parse(r),
                        || format!("reading `{}.{}`", stringify!($sname), stringify!($name)),
                    )?),*
                })
            }
        }
    };
}

pub(crate) trait Parseable: Sized {
    fn parse<R: Read, E: Endian>(r: &mut ByteOrdered<R, E>) -> Result<Self>;
}

macro_rules! impl_parseable {
    ($ty:ty, $method:ident) => {
        impl Parseable for $ty {
            fn parse<R: Read, E: Endian>(r: &mut ByteOrdered<R, E>) -> Result<Self> {
                Ok(r.$method()?)
            }
        }
    };
}

impl_parseable!(u8, read_u8);
impl_parseable!(u16, read_u16);
impl_parseable!(u32, read_u32);

impl<Ty, const N: usize> Parseable for [Ty; N]
where
    Ty: Parseable,
    [Ty; N]: Default,
{
    fn parse<R: Read, E: Endian>(r: &mut ByteOrdered<R, E>) -> Result<Self> {
        let mut out: [Ty; N] = Default::default();
        for slot in out.iter_mut() {
            *slot = Ty::parse(r)?;
        }
        Ok(out)
    }
}
