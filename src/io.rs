//! Binary and textual encodings of single amplitudes.
//!
//! # Binary format
//!
//! ```text
//! real    := f64, little-endian (8 bytes)
//! complex := real(re) real(im)   (16 bytes)
//! ```
//!
//! No header, length or tag: the surrounding diagram serializer frames the
//! records. Values are written as they are, so encoding and decoding is
//! bit-exact, signed zeros and NaN payloads included. Sharing between
//! handles is not preserved, only evaluated values are written.

use std::io::{Read, Write};

use crate::error::{Error, Result};
use crate::types::{Complex64, Fp};

/// Size of an encoded real.
pub const REAL_SIZE: usize = std::mem::size_of::<Fp>();

/// Size of an encoded complex value.
pub const COMPLEX_SIZE: usize = 2 * REAL_SIZE;

pub fn write_real<W: Write>(writer: &mut W, value: Fp) -> Result<()> {
    writer.write_all(&value.to_le_bytes())?;
    Ok(())
}

pub fn read_real<R: Read>(reader: &mut R) -> Result<Fp> {
    let mut buf = [0u8; REAL_SIZE];
    reader.read_exact(&mut buf)?;
    Ok(Fp::from_le_bytes(buf))
}

pub fn write_complex<W: Write>(writer: &mut W, value: Complex64) -> Result<()> {
    write_real(writer, value.re)?;
    write_real(writer, value.im)
}

pub fn read_complex<R: Read>(reader: &mut R) -> Result<Complex64> {
    let re = read_real(reader)?;
    let im = read_real(reader)?;
    Ok(Complex64::new(re, im))
}

fn parse_real(input: &str) -> Result<Fp> {
    input.parse::<Fp>().map_err(|source| Error::Parse {
        input: input.to_string(),
        source,
    })
}

/// Builds a complex value from separately given real and imaginary parts.
///
/// Empty parts are zero. The imaginary part may carry the unit and spaces
/// (`"- 0.5i"`); a bare unit or sign means a unit coefficient (`"-i"` is `-1`).
///
/// # Example
///
/// ```
/// use qdd_rs::io::parse_complex;
/// use qdd_rs::types::Complex64;
///
/// assert_eq!(parse_complex("0.5", "-i").unwrap(), Complex64::new(0.5, -1.0));
/// assert_eq!(parse_complex("", "+ 2.5i").unwrap(), Complex64::new(0.0, 2.5));
/// assert!(parse_complex("one", "").is_err());
/// ```
pub fn parse_complex(real: &str, imag: &str) -> Result<Complex64> {
    let mut value = Complex64::new(0.0, 0.0);

    let real = real.trim();
    if !real.is_empty() {
        value.re = parse_real(real)?;
    }

    let has_unit = imag.contains('i');
    let mut imag: String = imag.chars().filter(|&c| c != ' ' && c != 'i').collect();
    if imag == "+" || imag == "-" || (imag.is_empty() && has_unit) {
        imag.push('1');
    }
    if !imag.is_empty() {
        value.im = parse_real(&imag)?;
    }

    Ok(value)
}
