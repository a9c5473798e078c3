//! Arithmetic on complex handles.
//!
//! [`ComplexNumbers`] owns the [`RealTable`] and is the single entry point
//! for turning values into handles ([`ComplexNumbers::lookup_value`]),
//! managing reference counts, and computing with handles.
//!
//! # In-place arithmetic
//!
//! `add`, `sub`, `mul` and `div` do not create entries. They write the
//! result into the entries of a destination handle obtained once from
//! [`ComplexNumbers::get_cached`] and reused across an inner loop. Only the
//! final result is canonicalized:
//!
//! ```
//! use qdd_rs::complex_numbers::ComplexNumbers;
//! use qdd_rs::types::Complex64;
//!
//! let mut cn = ComplexNumbers::default();
//! let a = cn.lookup_parts(0.5, 0.5);
//! let b = cn.lookup_parts(0.0, 1.0);
//!
//! let tmp = cn.get_cached();
//! cn.mul(tmp, a, b);
//! let c = cn.lookup(tmp);
//! cn.return_to_cache(tmp);
//!
//! assert_eq!(cn.value(c), Complex64::new(-0.5, 0.5));
//! assert_eq!(c, cn.lookup_parts(-0.5, 0.5));
//! ```

use std::io::Write;

use log::debug;

use crate::complex::Complex;
use crate::config::Config;
use crate::error::Result;
use crate::format::{complex_to_string, Formatted};
use crate::reference::RealRef;
use crate::table::{RealTable, TableStats};
use crate::types::{Complex64, Fp, Tolerance};

pub struct ComplexNumbers {
    table: RealTable,
}

impl ComplexNumbers {
    pub fn new(config: Config) -> Self {
        debug!(
            "ComplexNumbers::new(tolerance = {}, buckets = 2^{}, gc_limit = {})",
            config.tolerance, config.bucket_bits, config.gc_limit
        );
        Self {
            table: RealTable::new(&config),
        }
    }
}

impl Default for ComplexNumbers {
    fn default() -> Self {
        ComplexNumbers::new(Config::default())
    }
}

impl std::fmt::Debug for ComplexNumbers {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ComplexNumbers").field("table", &self.table).finish()
    }
}

impl ComplexNumbers {
    pub fn table(&self) -> &RealTable {
        &self.table
    }

    pub fn tolerance(&self) -> Tolerance {
        self.table.tolerance()
    }

    /// Changes the tolerance; refused while referenced entries exist.
    ///
    /// See [`RealTable::set_tolerance`].
    pub fn set_tolerance(&mut self, eps: Fp) -> Result<()> {
        let tolerance = Tolerance::new(eps)?;
        self.table.set_tolerance(tolerance)
    }

    /// Number of stored reals, excluding the immortal ones.
    pub fn real_count(&self) -> usize {
        self.table.len()
    }

    pub fn stats(&self) -> TableStats {
        self.table.stats()
    }

    /// Frees every entry whose count is zero once the table reaches its limit
    /// (always with `force`).
    ///
    /// Lookups never collect on their own: call this where every handle still
    /// in use has been passed to [`ComplexNumbers::inc_ref`].
    pub fn garbage_collect(&mut self, force: bool) -> usize {
        self.table.garbage_collect(force)
    }

    // ─── Values ───

    #[inline]
    pub fn value(&self, c: Complex) -> Complex64 {
        c.value(&self.table)
    }

    pub fn approximately_zero(&self, c: Complex) -> bool {
        c.approximately_zero(&self.table)
    }

    pub fn approximately_one(&self, c: Complex) -> bool {
        c.approximately_one(&self.table)
    }

    pub fn approximately_equals(&self, a: Complex, b: Complex) -> bool {
        a.approximately_equals(b, &self.table)
    }

    /// `|c|²`
    pub fn mag2(&self, c: Complex) -> Fp {
        self.value(c).norm_sqr()
    }

    /// `|c|`
    pub fn mag(&self, c: Complex) -> Fp {
        self.value(c).norm()
    }

    /// Argument of `c` in `(-π, π]`.
    pub fn arg(&self, c: Complex) -> Fp {
        self.value(c).arg()
    }

    pub fn conj(c: Complex) -> Complex {
        c.conj()
    }

    pub fn neg(c: Complex) -> Complex {
        c.neg()
    }

    /// `a * v` on raw values.
    pub fn mul_value(&self, a: Complex, v: Complex64) -> Complex64 {
        self.value(a) * v
    }

    /// `a / v` on raw values.
    pub fn div_value(&self, a: Complex, v: Complex64) -> Complex64 {
        self.value(a) / v
    }

    // ─── Canonicalization ───

    /// Canonical handle for `re + im·i`.
    pub fn lookup_parts(&mut self, re: Fp, im: Fp) -> Complex {
        let r = self.table.lookup(re);
        let i = self.table.lookup(im);
        Complex::new(r, i)
    }

    /// Canonical handle for a raw value.
    pub fn lookup_value(&mut self, v: Complex64) -> Complex {
        self.lookup_parts(v.re, v.im)
    }

    /// Canonical handle for the value of `c`.
    ///
    /// Returns `c` itself when both parts already point at canonical entries,
    /// otherwise (scratch handles) canonicalizes the current value.
    pub fn lookup(&mut self, c: Complex) -> Complex {
        if c.is_static() || (self.table.is_canonical(c.r) && self.table.is_canonical(c.i)) {
            return c;
        }
        let v = self.value(c);
        self.lookup_value(v)
    }

    /// Increments the reference counts of both parts.
    pub fn inc_ref(&mut self, c: Complex) {
        self.table.inc_ref(c.r);
        self.table.inc_ref(c.i);
    }

    /// Decrements the reference counts of both parts.
    pub fn dec_ref(&mut self, c: Complex) {
        self.table.dec_ref(c.r);
        self.table.dec_ref(c.i);
    }

    // ─── Scratch handles ───

    /// A handle on two fresh scratch entries, initialized to zero.
    pub fn get_cached(&mut self) -> Complex {
        self.get_cached_value(Complex64::new(0.0, 0.0))
    }

    /// A handle on two fresh scratch entries holding `v`.
    pub fn get_cached_value(&mut self, v: Complex64) -> Complex {
        let r = self.table.alloc_scratch(v.re);
        let i = self.table.alloc_scratch(v.im);
        Complex::new(r, i)
    }

    /// Releases a handle obtained from [`ComplexNumbers::get_cached`].
    pub fn return_to_cache(&mut self, c: Complex) {
        self.table.free_scratch(c.r);
        self.table.free_scratch(c.i);
    }

    // ─── In-place arithmetic ───

    fn check_destination(r: Complex, a: Complex, b: Complex) {
        debug_assert!(!r.r.is_immortal() && !r.i.is_immortal(), "Destination {} aliases a constant", r);
        debug_assert_ne!(r.r.id(), r.i.id(), "Destination {} uses one entry for both parts", r);
        for part in [r.r, r.i] {
            for operand in [a.r, a.i, b.r, b.i] {
                debug_assert_ne!(part.id(), operand.id(), "Destination {} aliases an operand", r);
            }
        }
    }

    #[inline]
    fn write(&mut self, r: Complex, re: Fp, im: Fp) {
        self.table.set_value(r.r, re);
        self.table.set_value(r.i, im);
    }

    /// Copies the value of `c` into the scratch handle `r`.
    pub fn set_val(&mut self, r: Complex, c: Complex) {
        let v = self.value(c);
        self.write(r, v.re, v.im);
    }

    /// `r := a + b`
    pub fn add(&mut self, r: Complex, a: Complex, b: Complex) {
        Self::check_destination(r, a, b);
        let (a, b) = (self.value(a), self.value(b));
        self.write(r, a.re + b.re, a.im + b.im);
    }

    /// `r := a - b`
    pub fn sub(&mut self, r: Complex, a: Complex, b: Complex) {
        Self::check_destination(r, a, b);
        let (a, b) = (self.value(a), self.value(b));
        self.write(r, a.re - b.re, a.im - b.im);
    }

    /// `r := a * b`
    ///
    /// A factor within `eps` of one passes the other factor through
    /// unchanged, a factor within `eps` of zero gives exact zero.
    pub fn mul(&mut self, r: Complex, a: Complex, b: Complex) {
        Self::check_destination(r, a, b);
        if self.approximately_one(a) {
            self.set_val(r, b);
        } else if self.approximately_one(b) {
            self.set_val(r, a);
        } else if self.approximately_zero(a) || self.approximately_zero(b) {
            self.write(r, 0.0, 0.0);
        } else {
            let (a, b) = (self.value(a), self.value(b));
            self.write(r, a.re * b.re - a.im * b.im, a.re * b.im + a.im * b.re);
        }
    }

    /// `r := a / b`
    ///
    /// Approximately equal operands give exact one, a divisor within `eps`
    /// of one passes the dividend through unchanged.
    pub fn div(&mut self, r: Complex, a: Complex, b: Complex) {
        Self::check_destination(r, a, b);
        if self.approximately_equals(a, b) {
            self.write(r, 1.0, 0.0);
        } else if self.approximately_one(b) {
            self.set_val(r, a);
        } else {
            let (a, b) = (self.value(a), self.value(b));
            let mag2 = b.re * b.re + b.im * b.im;
            self.write(
                r,
                (a.re * b.re + a.im * b.im) / mag2,
                (a.im * b.re - a.re * b.im) / mag2,
            );
        }
    }

    // ─── Printing and serialization ───

    /// See [`complex_to_string`].
    pub fn to_string(&self, c: Complex, formatted: bool, decimals: Option<usize>) -> String {
        complex_to_string(self.value(c), formatted, decimals, self.tolerance())
    }

    /// Display adapter for the value of `c`.
    pub fn formatted(&self, c: Complex) -> Formatted {
        Formatted::new(self.value(c), self.tolerance())
    }

    /// Writes the value of `c` (16 bytes); sharing is not preserved.
    pub fn write_binary<W: Write>(&self, c: Complex, writer: &mut W) -> Result<()> {
        crate::io::write_complex(writer, self.value(c))
    }

    /// The value of a single tagged reference.
    pub fn real(&self, r: RealRef) -> Fp {
        self.table.val(r)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use std::f64::consts::{FRAC_1_SQRT_2, PI};
    use test_log::test;

    #[test]
    fn test_lookup_constants() {
        let mut cn = ComplexNumbers::default();
        assert_eq!(cn.lookup_parts(0.0, 0.0), Complex::ZERO);
        assert_eq!(cn.lookup_parts(1.0, 0.0), Complex::ONE);
        assert_eq!(cn.lookup_parts(-1.0, -0.0), Complex::ONE.neg());
        assert_eq!(cn.real_count(), 0);
    }

    #[test]
    fn test_lookup_is_idempotent() {
        let mut cn = ComplexNumbers::default();
        let c = cn.lookup_parts(FRAC_1_SQRT_2, -FRAC_1_SQRT_2);
        assert_eq!(cn.lookup(c), c);
        assert_eq!(cn.lookup(Complex::ONE), Complex::ONE);
        assert_eq!(cn.real_count(), 1);
        // Real and imaginary part share the entry, with opposite signs.
        assert_eq!(c.r, -c.i);
    }

    #[test]
    fn test_lookup_scratch_handle() {
        let mut cn = ComplexNumbers::default();
        let tmp = cn.get_cached_value(Complex64::new(0.25, 0.75));
        let c = cn.lookup(tmp);
        assert_ne!(c, tmp);
        assert_eq!(cn.value(c), Complex64::new(0.25, 0.75));
        assert!(cn.table().is_canonical(c.r));
        cn.return_to_cache(tmp);
    }

    #[test]
    fn test_ref_counts_on_both_parts() {
        let mut cn = ComplexNumbers::default();
        let c = cn.lookup_parts(0.3, 0.4);
        cn.inc_ref(c);
        assert_eq!(cn.table().ref_count(c.r), 1);
        assert_eq!(cn.table().ref_count(c.i), 1);
        cn.dec_ref(c);
        assert_eq!(cn.table().ref_count(c.r), 0);
        assert_eq!(cn.garbage_collect(true), 2);
        assert_eq!(cn.real_count(), 0);
    }

    #[test]
    fn test_lookup_parts_at_collection_limit() {
        let mut cn = ComplexNumbers::new(Config::default().with_gc_limit(1));
        let c = cn.lookup_parts(0.3, 0.4);
        assert_ne!(c.r.id(), c.i.id());
        assert_eq!(cn.value(c), Complex64::new(0.3, 0.4));
        assert_eq!(cn.lookup_parts(0.3, 0.4), c);
        assert_eq!(cn.real_count(), 2);
    }

    #[test]
    fn test_add_sub() {
        let mut cn = ComplexNumbers::default();
        let a = cn.lookup_parts(0.5, 0.25);
        let b = cn.lookup_parts(0.125, -0.5);
        let r = cn.get_cached();

        cn.add(r, a, b);
        assert_eq!(cn.value(r), Complex64::new(0.625, -0.25));

        cn.sub(r, a, b);
        assert_eq!(cn.value(r), Complex64::new(0.375, 0.75));

        cn.return_to_cache(r);
    }

    #[test]
    fn test_mul_general() {
        let mut cn = ComplexNumbers::default();
        let a = cn.lookup_parts(0.5, 0.5);
        let b = cn.lookup_parts(0.5, -0.25);
        let r = cn.get_cached();
        cn.mul(r, a, b);
        // (0.5 + 0.5i)(0.5 - 0.25i) = 0.25 + 0.125 + (0.25 - 0.125)i
        assert_eq!(cn.value(r), Complex64::new(0.375, 0.125));
    }

    #[test]
    fn test_mul_by_one_is_exact() {
        let mut cn = ComplexNumbers::default();
        let a = cn.lookup_parts(FRAC_1_SQRT_2, PI / 7.0);
        let r = cn.get_cached();

        cn.mul(r, a, Complex::ONE);
        let v = cn.value(r);
        assert_eq!(v.re.to_bits(), FRAC_1_SQRT_2.to_bits());
        assert_eq!(v.im.to_bits(), (PI / 7.0).to_bits());

        cn.mul(r, Complex::ONE, a);
        assert_eq!(cn.value(r), cn.value(a));
    }

    #[test]
    fn test_mul_by_zero_is_exact() {
        let mut cn = ComplexNumbers::default();
        let a = cn.lookup_parts(0.3, 0.7);
        let tiny = cn.get_cached_value(Complex64::new(1e-14, -1e-14));
        let r = cn.get_cached();
        cn.mul(r, a, tiny);
        assert_eq!(cn.value(r), Complex64::new(0.0, 0.0));
        assert_eq!(cn.lookup(r), Complex::ZERO);
    }

    #[test]
    fn test_div_by_self_is_one() {
        let mut cn = ComplexNumbers::default();
        let a = cn.lookup_parts(FRAC_1_SQRT_2, 0.0);
        let r = cn.get_cached();
        cn.div(r, a, a);
        assert_eq!(cn.value(r), Complex64::new(1.0, 0.0));
        assert_eq!(cn.lookup(r), Complex::ONE);
    }

    #[test]
    fn test_div() {
        let mut cn = ComplexNumbers::default();
        let a = cn.lookup_parts(0.0, 1.0);
        let b = cn.lookup_parts(0.5, 0.5);
        let r = cn.get_cached();

        cn.div(r, a, b);
        // i / (0.5 + 0.5i) = 1 + i
        let v = cn.value(r);
        approx::assert_abs_diff_eq!(v.re, 1.0, epsilon = 1e-12);
        approx::assert_abs_diff_eq!(v.im, 1.0, epsilon = 1e-12);

        cn.div(r, b, Complex::ONE);
        assert_eq!(cn.value(r), cn.value(b));
    }

    #[test]
    fn test_set_val() {
        let mut cn = ComplexNumbers::default();
        let a = cn.lookup_parts(-0.5, 0.25);
        let r = cn.get_cached();
        cn.set_val(r, a.neg());
        assert_eq!(cn.value(r), Complex64::new(0.5, -0.25));
    }

    #[test]
    fn test_mag_arg() {
        let mut cn = ComplexNumbers::default();
        let c = cn.lookup_parts(0.6, 0.8);
        approx::assert_abs_diff_eq!(cn.mag2(c), 1.0, epsilon = 1e-12);
        approx::assert_abs_diff_eq!(cn.mag(c), 1.0, epsilon = 1e-12);
        let i = cn.lookup_parts(0.0, 1.0);
        approx::assert_abs_diff_eq!(cn.arg(i), PI / 2.0, epsilon = 1e-12);
        approx::assert_abs_diff_eq!(cn.arg(ComplexNumbers::neg(Complex::ONE)), PI, epsilon = 1e-12);
    }

    #[test]
    fn test_conj_neg() {
        let mut cn = ComplexNumbers::default();
        let c = cn.lookup_parts(0.3, -0.4);
        assert_eq!(cn.value(ComplexNumbers::conj(c)), Complex64::new(0.3, 0.4));
        assert_eq!(cn.value(ComplexNumbers::neg(c)), Complex64::new(-0.3, 0.4));
        assert_eq!(ComplexNumbers::neg(ComplexNumbers::neg(c)), c);
        assert_eq!(cn.real_count(), 2);
    }

    #[test]
    fn test_mixed_arithmetic() {
        let mut cn = ComplexNumbers::default();
        let a = cn.lookup_parts(0.5, 0.0);
        assert_eq!(cn.mul_value(a, Complex64::new(0.0, 2.0)), Complex64::new(0.0, 1.0));
        assert_eq!(cn.div_value(a, Complex64::new(2.0, 0.0)), Complex64::new(0.25, 0.0));
    }

    #[test]
    fn test_to_string() {
        let mut cn = ComplexNumbers::default();
        let c = cn.lookup_parts(FRAC_1_SQRT_2, FRAC_1_SQRT_2);
        assert_eq!(cn.to_string(c, true, None), "1/√2(1+i)");
        assert_eq!(cn.formatted(Complex::ONE.neg()).to_string(), "-1");
        let half = cn.lookup_parts(0.5, 0.0);
        assert_eq!(cn.to_string(half, false, None), "0.5");
    }

    #[test]
    fn test_to_string_after_division_by_zero() {
        let mut cn = ComplexNumbers::default();
        let a = cn.lookup_parts(0.5, 0.25);
        let r = cn.get_cached();
        cn.div(r, a, Complex::ZERO);
        assert!(cn.value(r).re.is_nan());
        assert_eq!(cn.to_string(r, true, None), "NaN+NaNi");
        assert_eq!(cn.formatted(r).to_string(), "NaN+NaNi");
        cn.return_to_cache(r);
    }

    #[test]
    fn test_write_binary() {
        let mut cn = ComplexNumbers::default();
        let c = cn.lookup_parts(0.5, -0.75);
        let mut buf = Vec::new();
        cn.write_binary(c.conj(), &mut buf).unwrap();
        let v = crate::io::read_complex(&mut buf.as_slice()).unwrap();
        assert_eq!(v, Complex64::new(0.5, 0.75));
    }

    #[test]
    fn test_set_tolerance() {
        let mut cn = ComplexNumbers::default();
        assert!(matches!(cn.set_tolerance(-1.0), Err(Error::InvalidTolerance(_))));

        let c = cn.lookup_parts(0.5, 0.25);
        cn.inc_ref(c);
        assert!(matches!(cn.set_tolerance(1e-6), Err(Error::ToleranceLocked { live: 2 })));
        cn.dec_ref(c);
        assert!(cn.set_tolerance(1e-6).is_ok());
        assert_eq!(cn.tolerance().get(), 1e-6);

        let a = cn.lookup_parts(0.5, 0.0);
        assert_eq!(a, cn.lookup_parts(0.5 + 5e-7, 0.0));
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "aliases a constant")]
    fn test_destination_constant_panics() {
        let mut cn = ComplexNumbers::default();
        let a = cn.lookup_parts(0.5, 0.5);
        cn.add(Complex::ONE, a, a);
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "aliases an operand")]
    fn test_destination_operand_panics() {
        let mut cn = ComplexNumbers::default();
        let r = cn.get_cached_value(Complex64::new(0.5, 0.5));
        let b = cn.lookup_parts(0.25, 0.0);
        cn.mul(r, r, b);
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "Cannot overwrite canonical entry")]
    fn test_destination_canonical_panics() {
        let mut cn = ComplexNumbers::default();
        let r = cn.lookup_parts(0.3, 0.7);
        let a = cn.lookup_parts(0.5, 0.25);
        cn.add(r, a, a);
    }
}
