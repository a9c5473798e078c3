//! Complex handles: a pair of tagged references into the real table.

use std::fmt::{Display, Formatter};
use std::hash::{Hash, Hasher};
use std::ops::Neg;

use crate::reference::RealRef;
use crate::table::RealTable;
use crate::types::{Complex64, Tolerance};
use crate::utils::{combine_hash, murmur64, MyHash};

/// A complex number represented by two references into a [`RealTable`].
///
/// The handle owns nothing: it is a plain `Copy` value and its validity is
/// protected only by reference counting in the table. Equality is identity
/// of both references (entry and sign), never a comparison of values; use
/// the `approximately_*` methods to compare values.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct Complex {
    /// Real part.
    pub r: RealRef,
    /// Imaginary part.
    pub i: RealRef,
}

impl Complex {
    pub const ZERO: Complex = Complex::new(RealRef::ZERO, RealRef::ZERO);
    pub const ONE: Complex = Complex::new(RealRef::ONE, RealRef::ZERO);

    pub const fn new(r: RealRef, i: RealRef) -> Self {
        Self { r, i }
    }

    /// Identity test against `0 + 0i`.
    #[inline]
    pub const fn exactly_zero(self) -> bool {
        self.r.is_exactly_zero() && self.i.is_exactly_zero()
    }

    /// Identity test against `1 + 0i`.
    #[inline]
    pub const fn exactly_one(self) -> bool {
        self.r.is_exactly_one() && self.i.is_exactly_zero()
    }

    /// True if both parts point at immortal entries, such as `0`, `1`, `-i`.
    #[inline]
    pub const fn is_static(self) -> bool {
        self.r.is_immortal() && self.i.is_immortal()
    }

    /// Complex conjugate: flips the sign tag of the imaginary part.
    #[inline]
    pub const fn conj(self) -> Self {
        Self::new(self.r, self.i.flip_sign())
    }

    /// Flips both sign tags.
    #[inline]
    pub const fn neg(self) -> Self {
        Self::new(self.r.flip_sign(), self.i.flip_sign())
    }

    /// Evaluates the handle.
    #[inline]
    pub fn value(self, table: &RealTable) -> Complex64 {
        Complex64::new(table.val(self.r), table.val(self.i))
    }

    pub fn approximately_zero(self, table: &RealTable) -> bool {
        table.approximately_zero(self.r) && table.approximately_zero(self.i)
    }

    pub fn approximately_one(self, table: &RealTable) -> bool {
        table.approximately_one(self.r) && table.approximately_zero(self.i)
    }

    /// Componentwise comparison of the referenced values.
    ///
    /// Handles on different entries can still be approximately equal, e.g.
    /// when they were canonicalized under different tolerances.
    pub fn approximately_equals(self, other: Complex, table: &RealTable) -> bool {
        table.approximately_equals(self.r, other.r) && table.approximately_equals(self.i, other.i)
    }
}

impl Default for Complex {
    fn default() -> Self {
        Self::ZERO
    }
}

// -Complex
impl Neg for Complex {
    type Output = Self;

    fn neg(self) -> Self::Output {
        Complex::neg(self)
    }
}

impl MyHash for Complex {
    fn hash(&self) -> u64 {
        let h1 = murmur64(self.r.raw() as u64);
        let h2 = murmur64(self.i.raw() as u64);
        combine_hash(h1, h2)
    }
}

impl Hash for Complex {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_u64(MyHash::hash(self));
    }
}

impl Display for Complex {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.r, self.i)
    }
}

/// Componentwise `|Δ| < eps` on raw values.
pub fn approximately_equals(a: Complex64, b: Complex64, tolerance: Tolerance) -> bool {
    tolerance.approximately_equals(a.re, b.re) && tolerance.approximately_equals(a.im, b.im)
}

/// Componentwise `|x| < eps` on a raw value.
pub fn approximately_zero(c: Complex64, tolerance: Tolerance) -> bool {
    tolerance.approximately_zero(c.re) && tolerance.approximately_zero(c.im)
}
