use std::fmt::{Display, Formatter};
use std::ops::Neg;

use crate::types::EntryId;

/// A reference to a stored real, potentially negated.
///
/// Uses a 32-bit representation where the least significant bit carries the
/// sign and the remaining bits store the entry id. The referenced entry only
/// holds a magnitude, so negation never touches the table.
///
/// The zero entry has no negative form: negating [`RealRef::ZERO`] yields
/// [`RealRef::ZERO`] again, which keeps `-0` and `+0` indistinguishable.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
#[repr(transparent)]
pub struct RealRef(u32);

impl RealRef {
    /// Reference to the immortal zero entry.
    pub const ZERO: Self = Self::positive(EntryId::ZERO);

    /// Reference to the immortal one entry.
    pub const ONE: Self = Self::positive(EntryId::ONE);

    /// Reference to the immortal one entry, negated.
    pub const MINUS_ONE: Self = Self::negative(EntryId::ONE);

    /// Creates a new reference with the given entry id and sign.
    pub const fn new(id: EntryId, negated: bool) -> Self {
        Self((id.raw() << 1) | (negated as u32))
    }

    /// Creates a positive reference.
    pub const fn positive(id: EntryId) -> Self {
        Self::new(id, false)
    }

    /// Creates a negative reference.
    pub const fn negative(id: EntryId) -> Self {
        Self::new(id, true)
    }

    /// Returns the entry id this reference points to.
    #[inline]
    pub const fn id(self) -> EntryId {
        // SAFETY: the id was shifted in from an `EntryId`, so it fits into 31 bits.
        unsafe { EntryId::from_raw_unchecked(self.0 >> 1) }
    }

    /// Returns true if this reference is negated.
    #[inline]
    pub const fn is_negated(self) -> bool {
        (self.0 & 1) != 0
    }

    /// Returns the sign multiplier encoded in the tag.
    #[inline]
    pub const fn sign(self) -> f64 {
        if self.is_negated() {
            -1.0
        } else {
            1.0
        }
    }

    /// Returns the positive reference to the same entry.
    #[inline]
    pub const fn abs(self) -> Self {
        Self(self.0 & !1)
    }

    /// Returns the raw underlying value.
    #[inline]
    pub const fn raw(self) -> u32 {
        self.0
    }

    /// Exact zero, by identity.
    #[inline]
    pub const fn is_exactly_zero(self) -> bool {
        self.0 == Self::ZERO.0
    }

    /// Exact one, by identity.
    #[inline]
    pub const fn is_exactly_one(self) -> bool {
        self.0 == Self::ONE.0
    }

    /// Points at one of the two immortal entries, with any sign.
    #[inline]
    pub const fn is_immortal(self) -> bool {
        self.id().is_immortal()
    }

    /// Flips the sign tag, leaving zero untouched.
    #[inline]
    pub const fn flip_sign(self) -> Self {
        if self.is_exactly_zero() {
            self
        } else {
            Self(self.0 ^ 1)
        }
    }
}

impl Default for RealRef {
    fn default() -> Self {
        Self::ZERO
    }
}

// -RealRef
impl Neg for RealRef {
    type Output = Self;

    fn neg(self) -> Self::Output {
        self.flip_sign()
    }
}

impl Display for RealRef {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        if self.is_negated() {
            write!(f, "-{}", self.id())
        } else {
            write!(f, "{}", self.id())
        }
    }
}
