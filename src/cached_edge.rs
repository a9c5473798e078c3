//! Edges with raw, not yet canonicalized, weights.
//!
//! Intermediate results of diagram operations are mostly thrown away. Storing
//! their weights in the [`RealTable`] would fill it with garbage, so compute
//! tables work with [`CachedEdge`]s instead: a node reference plus a plain
//! [`Complex64`]. Only results that end up in a diagram are canonicalized,
//! through [`ComplexNumbers::lookup_value`][crate::complex_numbers::ComplexNumbers::lookup_value].
//!
//! # Equality and hashing
//!
//! Nodes are compared by identity, weights componentwise within the
//! tolerance. The hash quantizes each weight component to `round(x / eps)`,
//! so equal edges hash alike unless a component sits right at a rounding
//! boundary of `x / eps`.

use std::fmt;
use std::hash::{Hash, Hasher};

use crate::complex::Complex;
use crate::format::Formatted;
use crate::node::{NodeKind, NodeRef};
use crate::table::RealTable;
use crate::types::{Complex64, Tolerance};
use crate::utils::{combine_hash3, murmur64, MyHash};

/// A node reference with a raw complex weight.
///
/// `p` is `None` for the null edge.
pub struct CachedEdge<N> {
    pub p: Option<NodeRef<N>>,
    pub w: Complex64,
    tolerance: Tolerance,
}

impl<N> CachedEdge<N> {
    pub fn new(p: NodeRef<N>, w: Complex64, tolerance: Tolerance) -> Self {
        Self {
            p: Some(p),
            w,
            tolerance,
        }
    }

    /// Edge with the weight of a handle, evaluated now.
    ///
    /// The edge keeps no reference into the table, so reference counts are untouched.
    pub fn from_complex(p: NodeRef<N>, c: Complex, table: &RealTable) -> Self {
        Self::new(p, c.value(table), table.tolerance())
    }

    /// Edge to the terminal node.
    pub fn terminal(w: Complex64, tolerance: Tolerance) -> Self {
        Self::new(NodeRef::TERMINAL, w, tolerance)
    }

    /// Terminal edge with weight `0`.
    pub fn zero(tolerance: Tolerance) -> Self {
        Self::terminal(Complex64::new(0.0, 0.0), tolerance)
    }

    /// Terminal edge with weight `1`.
    pub fn one(tolerance: Tolerance) -> Self {
        Self::terminal(Complex64::new(1.0, 0.0), tolerance)
    }

    pub fn tolerance(&self) -> Tolerance {
        self.tolerance
    }

    pub fn is_terminal(&self) -> bool {
        self.p.is_some_and(NodeRef::is_terminal)
    }

    /// Terminal edge with a weight within `eps` of zero.
    pub fn is_zero_terminal(&self) -> bool {
        self.is_terminal() && crate::complex::approximately_zero(self.w, self.tolerance)
    }

    /// Terminal edge with a weight within `eps` of one.
    pub fn is_one_terminal(&self) -> bool {
        self.is_terminal() && crate::complex::approximately_equals(self.w, Complex64::new(1.0, 0.0), self.tolerance)
    }

    /// Stricter comparison: the modulus of the weight difference must be below `eps`.
    pub fn approximately_equals_strict(&self, other: &Self) -> bool {
        self.p == other.p && (self.w - other.w).norm() < self.tolerance.get()
    }
}

impl<N> Default for CachedEdge<N> {
    fn default() -> Self {
        Self {
            p: None,
            w: Complex64::new(0.0, 0.0),
            tolerance: Tolerance::default(),
        }
    }
}

impl<N> Copy for CachedEdge<N> {}

impl<N> Clone for CachedEdge<N> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<N> PartialEq for CachedEdge<N> {
    /// Edges built under different tolerances never compare equal.
    fn eq(&self, other: &Self) -> bool {
        self.p == other.p
            && self.tolerance == other.tolerance
            && crate::complex::approximately_equals(self.w, other.w, self.tolerance)
    }
}

impl<N> Eq for CachedEdge<N> {}

impl<N> MyHash for CachedEdge<N> {
    fn hash(&self) -> u64 {
        let node = self.p.map_or(u64::MAX, |p| p.index() as u64);
        let h1 = murmur64(node);
        let h2 = murmur64(self.tolerance.quantize(self.w.re) as u64);
        let h3 = murmur64(self.tolerance.quantize(self.w.im) as u64);
        combine_hash3(h1, h2, h3)
    }
}

impl<N> Hash for CachedEdge<N> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_u64(MyHash::hash(self));
    }
}

impl<N: NodeKind> fmt::Debug for CachedEdge<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CachedEdge").field("p", &self.p).field("w", &self.w).finish()
    }
}

impl<N: NodeKind> fmt::Display for CachedEdge<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.p {
            Some(p) => write!(f, "{}·{}", Formatted::new(self.w, self.tolerance), p),
            None => write!(f, "null"),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;
    use crate::node::{MatrixNode, VectorNode};
    use crate::types::Fp;

    type Edge = CachedEdge<VectorNode>;

    fn tol() -> Tolerance {
        Tolerance::new(1e-9).unwrap()
    }

    fn edge(index: u32, re: Fp, im: Fp) -> Edge {
        Edge::new(NodeRef::new(index), Complex64::new(re, im), tol())
    }

    #[test]
    fn test_equality_within_tolerance() {
        let a = edge(3, 0.5, -0.25);
        let b = edge(3, 0.5 + 1e-10, -0.25 - 1e-10);
        assert_eq!(a, b);
        assert_eq!(MyHash::hash(&a), MyHash::hash(&b));
    }

    #[test]
    fn test_inequality() {
        let a = edge(3, 0.5, -0.25);
        assert_ne!(a, edge(4, 0.5, -0.25));
        assert_ne!(a, edge(3, 0.5 + 1e-8, -0.25));
        assert_ne!(a, Edge::new(NodeRef::new(3), a.w, Tolerance::new(1e-6).unwrap()));
    }

    #[test]
    fn test_strict_equality() {
        let a = edge(1, 0.5, 0.5);
        let b = edge(1, 0.5 + 9e-10, 0.5 + 9e-10);
        // Componentwise within eps, but the modulus of the difference is not.
        assert_eq!(a, b);
        assert!(!a.approximately_equals_strict(&b));
        assert!(a.approximately_equals_strict(&edge(1, 0.5 + 1e-10, 0.5)));
    }

    #[test]
    fn test_terminals() {
        let zero = Edge::zero(tol());
        let one = Edge::one(tol());
        assert!(zero.is_terminal());
        assert!(zero.is_zero_terminal());
        assert!(!zero.is_one_terminal());
        assert!(one.is_one_terminal());
        assert_eq!(zero.p, Some(NodeRef::TERMINAL));
        assert_eq!(one.w, Complex64::new(1.0, 0.0));
        assert_ne!(zero, one);
    }

    #[test]
    fn test_default_is_null() {
        let e = Edge::default();
        assert_eq!(e.p, None);
        assert!(!e.is_terminal());
        assert_eq!(format!("{}", e), "null");
    }

    #[test]
    fn test_from_complex_does_not_touch_ref_counts() {
        let mut table = RealTable::default();
        let c = Complex::new(table.lookup(0.5), table.lookup(-0.5));
        table.inc_ref(c.r);
        let e = CachedEdge::<MatrixNode>::from_complex(NodeRef::new(2), c, &table);
        assert_eq!(e.w, Complex64::new(0.5, -0.5));
        assert_eq!(e.tolerance(), table.tolerance());
        assert_eq!(table.ref_count(c.r), 1);
    }

    #[test]
    fn test_as_hash_map_key() {
        let mut map = HashMap::new();
        map.insert(edge(5, 0.25, 0.0), "quarter");
        assert_eq!(map.get(&edge(5, 0.25 + 1e-11, -1e-11)), Some(&"quarter"));
        assert_eq!(map.get(&edge(6, 0.25, 0.0)), None);
    }

    #[test]
    fn test_display() {
        let e = edge(2, 0.5, 0.0);
        assert_eq!(format!("{}", e), "1/2·v2");
        assert_eq!(format!("{}", Edge::one(tol())), "1·vT");
    }
}
