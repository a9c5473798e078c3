//! Compute table for memoizing diagram operations.
//!
//! Keys and values are typically [`CachedEdge`][crate::cached_edge::CachedEdge]s
//! (or tuples of them): lookups then tolerate small numerical drift in the
//! weights, and cached results never hold references into the real table,
//! so the table can be cleared at any time without touching reference counts.
//!
//! # Use Cases
//!
//! - Matrix-vector and matrix-matrix products: `(CachedEdge<M>, CachedEdge<V>) -> CachedEdge<V>`
//! - Additions of two edges of the same kind
//! - Inner products and fidelities, with a raw `Complex64` as the value
//!
//! # Trade-offs
//!
//! - **Pros**: No collisions, dynamic sizing, results survive until [`ComputeTable::clear`]
//! - **Cons**: Allocation overhead, O(n) `clear()`, a lookup may miss an equal key
//!   whose weight sits on the other side of a rounding boundary of `x / eps`
//!   (see [`CachedEdge`][crate::cached_edge::CachedEdge])
//!
//! # Example
//!
//! ```
//! use qdd_rs::cache::ComputeTable;
//! use qdd_rs::cached_edge::CachedEdge;
//! use qdd_rs::node::{NodeRef, VectorNode};
//! use qdd_rs::types::{Complex64, Tolerance};
//!
//! let tol = Tolerance::default();
//! let mut table = ComputeTable::<CachedEdge<VectorNode>, Complex64>::default();
//! let e = CachedEdge::new(NodeRef::new(3), Complex64::new(0.5, 0.0), tol);
//! table.insert(e, Complex64::new(0.25, 0.0));
//!
//! let drifted = CachedEdge::new(NodeRef::new(3), Complex64::new(0.5 + 1e-15, 0.0), tol);
//! assert_eq!(table.get(&drifted), Some(Complex64::new(0.25, 0.0)));
//! assert_eq!(table.hits(), 1);
//! ```

use std::collections::HashMap;
use std::hash::Hash;

use log::debug;

/// A compute table backed by [`HashMap`], counting lookups and hits.
///
/// Values are returned by copy: cached results are small (`CachedEdge`,
/// `Complex64`, node references).
pub struct ComputeTable<K, V> {
    map: HashMap<K, V>,
    lookups: usize,
    hits: usize,
}

impl<K, V> Default for ComputeTable<K, V> {
    fn default() -> Self {
        Self::new(14)
    }
}

impl<K, V> ComputeTable<K, V> {
    /// Creates a table with room for `2^bits` entries before it grows.
    ///
    /// # Panics
    ///
    /// Panics if `bits > 31`.
    pub fn new(bits: usize) -> Self {
        assert!(bits <= 31, "Bits should be in the range 0..=31");
        Self {
            map: HashMap::with_capacity(1 << bits),
            lookups: 0,
            hits: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    pub fn lookups(&self) -> usize {
        self.lookups
    }

    pub fn hits(&self) -> usize {
        self.hits
    }

    pub fn misses(&self) -> usize {
        self.lookups - self.hits
    }

    /// Fraction of lookups that found an entry, `0` before the first lookup.
    pub fn hit_ratio(&self) -> f64 {
        if self.lookups == 0 {
            0.0
        } else {
            self.hits as f64 / self.lookups as f64
        }
    }

    /// Removes all entries. Statistics are kept.
    pub fn clear(&mut self) {
        debug!(
            "ComputeTable::clear: {} entries, {} lookups, {:.1}% hits",
            self.map.len(),
            self.lookups,
            100.0 * self.hit_ratio()
        );
        self.map.clear();
    }
}

impl<K, V> ComputeTable<K, V>
where
    K: Hash + Eq,
    V: Copy,
{
    /// Looks up a cached result.
    #[inline]
    pub fn get(&mut self, key: &K) -> Option<V> {
        self.lookups += 1;
        let value = self.map.get(key).copied();
        if value.is_some() {
            self.hits += 1;
        }
        value
    }

    /// Stores a result, replacing any previous one for an equal key.
    #[inline]
    pub fn insert(&mut self, key: K, value: V) {
        self.map.insert(key, value);
    }
}
