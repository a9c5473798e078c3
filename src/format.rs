//! Human-readable printing of amplitudes.
//!
//! Amplitudes in quantum circuits are overwhelmingly rational multiples of
//! `1`, `1/√2` or `π`. The formatter recognizes these and prints them
//! symbolically:
//!
//! | value | printed |
//! |---|---|
//! | `0.5` | `1/2` |
//! | `0.7071067811865476` | `1/√2` |
//! | `0.7853981633974483` | `π/4` |
//! | `-i` | `-i` |
//! | `0.5 + 0.5i` | `1/2(1+i)` |
//! | `0.1234567` | `0.1234567` |

use std::fmt::{self, Write};

use crate::types::{Complex64, Fp, Tolerance};

/// Default bound on denominators considered by [`lowest_fraction`].
pub const DEFAULT_MAX_DENOMINATOR: u64 = 1 << 10;

const SQRT2_2: Fp = std::f64::consts::FRAC_1_SQRT_2;
const PI: Fp = std::f64::consts::PI;

/// Finds the simplest fraction `num / den` approximating `x`.
///
/// Walks the Stern–Brocot tree towards `x`, stopping at the first mediant
/// within `eps` of `x` or when denominators would exceed `max_denominator`,
/// in which case the bound with the smaller denominator is returned.
///
/// # Panics
///
/// Panics if `x` is negative or not finite, or if `max_denominator` is zero.
///
/// # Example
///
/// ```
/// use qdd_rs::format::lowest_fraction;
/// use qdd_rs::types::Tolerance;
///
/// assert_eq!(lowest_fraction(0.3333333, 1024, Tolerance::default()), (1, 3));
/// assert_eq!(lowest_fraction(0.75, 1024, Tolerance::default()), (3, 4));
/// ```
pub fn lowest_fraction(x: Fp, max_denominator: u64, tolerance: Tolerance) -> (u64, u64) {
    assert!(x >= 0.0, "Cannot find a fraction for negative value {}", x);
    assert!(x.is_finite(), "Cannot find a fraction for {}", x);
    assert!(max_denominator > 0, "Maximum denominator must be positive");

    let eps = tolerance.get();
    let mut lower: (u64, u64) = (0, 1);
    let mut upper: (u64, u64) = (1, 0);

    // Walking the integer part one mediant at a time is linear in `x`; jump.
    let whole = x.floor();
    if whole >= 1.0 {
        if x - whole <= eps {
            return (whole as u64, 1);
        }
        lower = (whole as u64, 1);
    }

    while lower.1 <= max_denominator && upper.1 <= max_denominator {
        let num = lower.0 + upper.0;
        let den = lower.1 + upper.1;
        let median = num as Fp / den as Fp;
        if (x - median).abs() <= eps {
            if den <= max_denominator {
                return (num, den);
            }
            return if upper.1 > lower.1 { upper } else { lower };
        }
        if x > median {
            lower = (num, den);
        } else {
            upper = (num, den);
        }
    }

    if lower.1 > max_denominator {
        upper
    } else {
        lower
    }
}

fn write_fraction<W: Write>(out: &mut W, sign: &str, fraction: (u64, u64), imaginary: bool) -> fmt::Result {
    let i = if imaginary { "i" } else { "" };
    match fraction {
        (1, 1) => write!(out, "{}{}", sign, if imaginary { "i" } else { "1" }),
        (num, 1) => write!(out, "{}{}{}", sign, num, i),
        (1, den) => write!(out, "{}{}/{}", sign, if imaginary { "i" } else { "1" }, den),
        (num, den) => write!(out, "{}{}{}/{}", sign, num, i, den),
    }
}

/// Writes a single real, symbolically when possible.
///
/// With `imaginary`, the number is the coefficient of `i`: the unit is
/// appended and a `+` sign is always printed, so the result can follow a
/// real part directly.
pub fn write_formatted<W: Write>(out: &mut W, num: Fp, imaginary: bool, tolerance: Tolerance) -> fmt::Result {
    write_formatted_with(out, num, imaginary, None, tolerance)
}

fn write_formatted_with<W: Write>(
    out: &mut W,
    num: Fp,
    imaginary: bool,
    decimals: Option<usize>,
    tolerance: Tolerance,
) -> fmt::Result {
    if !num.is_finite() {
        return write_decimal(out, num, imaginary, decimals);
    }

    let negative = num.is_sign_negative();
    if tolerance.approximately_zero(num) {
        return write!(
            out,
            "{}0{}",
            if negative { "-" } else { "+" },
            if imaginary { "i" } else { "" }
        );
    }

    let sign = if negative {
        "-"
    } else if imaginary {
        "+"
    } else {
        ""
    };
    let absnum = num.abs();

    // a/b
    let fraction = lowest_fraction(absnum, DEFAULT_MAX_DENOMINATOR, tolerance);
    if tolerance.approximately_zero(absnum - fraction.0 as Fp / fraction.1 as Fp) {
        return write_fraction(out, sign, fraction, imaginary);
    }

    // a/(b√2)
    let abssqrt = absnum / SQRT2_2;
    let fraction = lowest_fraction(abssqrt, DEFAULT_MAX_DENOMINATOR, tolerance);
    if tolerance.approximately_zero(abssqrt - fraction.0 as Fp / fraction.1 as Fp) {
        let i = if imaginary { "i" } else { "" };
        return match fraction {
            (1, 1) => write!(out, "{}{}/√2", sign, if imaginary { "i" } else { "1" }),
            (num, 1) => write!(out, "{}{}{}/√2", sign, num, i),
            (1, den) => write!(out, "{}{}/({}√2)", sign, if imaginary { "i" } else { "1" }, den),
            (num, den) => write!(out, "{}{}{}/({}√2)", sign, num, i, den),
        };
    }

    // aπ/b
    let abspi = absnum / PI;
    let fraction = lowest_fraction(abspi, DEFAULT_MAX_DENOMINATOR, tolerance);
    if tolerance.approximately_zero(abspi - fraction.0 as Fp / fraction.1 as Fp) {
        let i = if imaginary { "i" } else { "" };
        return match fraction {
            (1, 1) => write!(out, "{}π{}", sign, i),
            (num, 1) => write!(out, "{}{}π{}", sign, num, i),
            (1, den) => write!(out, "{}π{}/{}", sign, i, den),
            (num, den) => write!(out, "{}{}π{}/{}", sign, num, i, den),
        };
    }

    write_decimal(out, num, imaginary, decimals)
}

fn write_decimal<W: Write>(out: &mut W, num: Fp, imaginary: bool, decimals: Option<usize>) -> fmt::Result {
    if !imaginary {
        return write_plain(out, num, decimals);
    }
    // `NaN` prints without a sign.
    if !(num < 0.0) {
        out.write_char('+')?;
    }
    write_plain(out, num, decimals)?;
    out.write_char('i')
}

/// `decimals` counts digits after the point, not significant digits.
fn write_plain<W: Write>(out: &mut W, num: Fp, decimals: Option<usize>) -> fmt::Result {
    match decimals {
        Some(d) => write!(out, "{:.*}", d, num),
        None => write!(out, "{}", num),
    }
}

/// Converts a raw complex value to a string.
///
/// Anything within `eps` of zero (by modulus) prints as `0`. With
/// `formatted`, both parts go through [`write_formatted`] and values on the
/// diagonals print as a factored `(1+i)` / `(1-i)`. Otherwise the parts are
/// printed as decimals, with `decimals` digits after the point if given.
/// Infinite and `NaN` parts always print as decimals.
///
/// A lone positive imaginary part prints without a sign: `i`, `i/2`, not `+i`.
pub fn complex_to_string(c: Complex64, formatted: bool, decimals: Option<usize>, tolerance: Tolerance) -> String {
    let mut out = String::new();
    // Writing into a `String` cannot fail.
    let _ = write_complex(&mut out, c, formatted, decimals, tolerance);
    out
}

fn write_complex<W: Write>(
    out: &mut W,
    c: Complex64,
    formatted: bool,
    decimals: Option<usize>,
    tolerance: Tolerance,
) -> fmt::Result {
    if c.norm() < tolerance.get() {
        return out.write_str("0");
    }

    let real_zero = tolerance.approximately_zero(c.re);
    let mut real = String::new();
    if !real_zero {
        if formatted {
            write_formatted_with(&mut real, c.re, false, decimals, tolerance)?;
        } else {
            write_plain(&mut real, c.re, decimals)?;
        }
    }

    if tolerance.approximately_zero(c.im) {
        return out.write_str(&real);
    }

    if formatted {
        let diagonal = if tolerance.approximately_equals(c.re, c.im) {
            Some("(1+i)")
        } else if tolerance.approximately_equals(c.re, -c.im) {
            Some("(1-i)")
        } else {
            None
        };
        if let Some(factor) = diagonal {
            // A unit coefficient is implied by the factor.
            let coefficient = match real.as_str() {
                "1" => "",
                "-1" => "-",
                other => other,
            };
            return write!(out, "{}{}", coefficient, factor);
        }

        let mut imag = String::new();
        write_formatted_with(&mut imag, c.im, true, decimals, tolerance)?;
        if real_zero {
            // A lone imaginary part needs no leading `+`.
            return out.write_str(imag.strip_prefix('+').unwrap_or(&imag));
        }
        return write!(out, "{}{}", real, imag);
    }

    out.write_str(&real)?;
    if !real_zero && !(c.im < 0.0) {
        out.write_char('+')?;
    }
    write_plain(out, c.im, decimals)?;
    out.write_char('i')
}

/// Display adapter printing a raw value the way [`complex_to_string`] does.
///
/// The formatter's precision, if any, is the number of decimals of decimal fallbacks.
///
/// ```
/// use qdd_rs::format::Formatted;
/// use qdd_rs::types::{Complex64, Tolerance};
///
/// let half = Formatted::new(Complex64::new(0.5, 0.0), Tolerance::default());
/// assert_eq!(half.to_string(), "1/2");
/// ```
#[derive(Debug, Copy, Clone)]
pub struct Formatted {
    pub value: Complex64,
    pub tolerance: Tolerance,
}

impl Formatted {
    pub fn new(value: Complex64, tolerance: Tolerance) -> Self {
        Self { value, tolerance }
    }
}

impl fmt::Display for Formatted {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_complex(f, self.value, true, f.precision(), self.tolerance)
    }
}
