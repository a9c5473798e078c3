//! Type-safe wrappers for stored-real indices and the comparison tolerance.
//!
//! This module provides newtype wrappers that keep arena indices and
//! floating-point tolerances from being mixed up with plain integers and floats.

use std::fmt;

use crate::error::{Error, Result};

/// Floating-point type used for all amplitudes.
pub type Fp = f64;

/// Raw complex amplitude, as produced by intermediate computations.
pub type Complex64 = num::complex::Complex<Fp>;

/// An entry identifier (index into the real-number arena).
///
/// # Invariants
///
/// - `EntryId(0)` is the immortal entry for exact `0.0`
/// - `EntryId(1)` is the immortal entry for exact `1.0`
/// - Ordinary entries start at index 2
/// - Ids fit into 31 bits, the remaining bit of a [`RealRef`][crate::reference::RealRef] holds the sign
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct EntryId(u32);

impl EntryId {
    /// The immortal zero entry.
    pub const ZERO: EntryId = EntryId(0);

    /// The immortal one entry.
    pub const ONE: EntryId = EntryId(1);

    /// Largest id representable inside a tagged reference.
    pub const MAX: u32 = 0x7FFF_FFFF;

    /// Creates a new entry id.
    ///
    /// # Panics
    ///
    /// Panics if `index` does not fit into 31 bits.
    pub const fn new(index: u32) -> Self {
        assert!(index <= Self::MAX, "Entry index does not fit into 31 bits");
        EntryId(index)
    }

    /// Creates an entry id without range checking.
    ///
    /// # Safety
    ///
    /// The caller must ensure that `index <= EntryId::MAX`.
    pub const unsafe fn from_raw_unchecked(index: u32) -> Self {
        EntryId(index)
    }

    /// Returns the raw value.
    pub const fn raw(self) -> u32 {
        self.0
    }

    /// Returns the id as a `usize` for arena indexing.
    pub const fn index(self) -> usize {
        self.0 as usize
    }

    /// Returns true for the two immortal entries.
    pub const fn is_immortal(self) -> bool {
        self.0 <= 1
    }
}

impl fmt::Display for EntryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            0 => write!(f, "#0"),
            1 => write!(f, "#1"),
            _ => write!(f, "@{}", self.0),
        }
    }
}

impl From<EntryId> for usize {
    fn from(id: EntryId) -> Self {
        id.index()
    }
}

/// Absolute tolerance under which two reals are considered the same value.
///
/// The same tolerance drives canonicalization in the unique table, the
/// approximate predicates on handles, cached-edge equality and hashing, and
/// fraction recognition when printing.
#[derive(Debug, Copy, Clone, PartialEq, PartialOrd)]
pub struct Tolerance(Fp);

impl Tolerance {
    /// `1024` machine epsilons.
    pub const DEFAULT: Tolerance = Tolerance(Fp::EPSILON * 1024.0);

    /// Creates a tolerance, rejecting values that are not finite and strictly positive.
    pub fn new(eps: Fp) -> Result<Self> {
        if eps.is_finite() && eps > 0.0 {
            Ok(Tolerance(eps))
        } else {
            Err(Error::InvalidTolerance(eps))
        }
    }

    /// Returns the raw tolerance.
    pub const fn get(self) -> Fp {
        self.0
    }

    /// `|x| < eps`
    #[inline]
    pub fn approximately_zero(self, x: Fp) -> bool {
        x.abs() < self.0
    }

    /// `|x - 1| < eps`
    #[inline]
    pub fn approximately_one(self, x: Fp) -> bool {
        (x - 1.0).abs() < self.0
    }

    /// `|x - y| < eps`, with exact equality short-circuiting.
    #[inline]
    pub fn approximately_equals(self, x: Fp, y: Fp) -> bool {
        x == y || (x - y).abs() < self.0
    }

    /// Quantizes `x` to the nearest multiple of `eps`.
    ///
    /// Values within `eps` of each other quantize to keys at most one apart.
    #[inline]
    pub fn quantize(self, x: Fp) -> i64 {
        (x / self.0).round() as i64
    }
}

impl Default for Tolerance {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl fmt::Display for Tolerance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:e}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entry_id_constants() {
        assert!(EntryId::ZERO.is_immortal());
        assert!(EntryId::ONE.is_immortal());
        assert!(!EntryId::new(2).is_immortal());
        assert_eq!(EntryId::new(42).index(), 42);
        assert_eq!(format!("{}", EntryId::new(42)), "@42");
        assert_eq!(format!("{}", EntryId::ZERO), "#0");
    }

    #[test]
    #[should_panic(expected = "Entry index does not fit into 31 bits")]
    fn test_entry_id_too_large() {
        EntryId::new(0x8000_0000);
    }

    #[test]
    fn test_tolerance_validation() {
        assert!(Tolerance::new(1e-10).is_ok());
        assert!(matches!(Tolerance::new(0.0), Err(Error::InvalidTolerance(_))));
        assert!(matches!(Tolerance::new(-1e-3), Err(Error::InvalidTolerance(_))));
        assert!(matches!(Tolerance::new(Fp::NAN), Err(Error::InvalidTolerance(_))));
        assert!(matches!(Tolerance::new(Fp::INFINITY), Err(Error::InvalidTolerance(_))));
    }

    #[test]
    fn test_tolerance_predicates() {
        let tol = Tolerance::new(1e-6).unwrap();
        assert!(tol.approximately_zero(5e-7));
        assert!(tol.approximately_zero(-5e-7));
        assert!(!tol.approximately_zero(2e-6));
        assert!(tol.approximately_one(1.0 + 5e-7));
        assert!(tol.approximately_equals(0.5, 0.5 + 9e-7));
        assert!(!tol.approximately_equals(0.5, 0.5 + 2e-6));
    }

    #[test]
    fn test_quantize_neighbours() {
        let tol = Tolerance::new(1e-3).unwrap();
        assert_eq!(tol.quantize(0.5), 500);
        assert_eq!(tol.quantize(0.5004), 500);
        assert_eq!(tol.quantize(0.5006), 501);
        assert_eq!(tol.quantize(-0.5), -500);
    }
}
