//! Unique table for real numbers.
//!
//! Every magnitude that ends up on a diagram edge is stored exactly once.
//! Handles ([`RealRef`]) point at entries by index and carry the sign in a
//! tag bit, so `x` and `-x` share a single entry.
//!
//! # Layout
//!
//! ```text
//! entries[0] → 0.0   (immortal)
//! entries[1] → 1.0   (immortal)
//! entries[2] → 0.7071067811865476
//! entries[3] → <free>      ← free list
//! entries[4] → <scratch>   (not indexed, written in place by arithmetic)
//! ...
//! buckets[murmur64(round(x / eps)) & mask] → entry → entry → ...
//! ```
//!
//! A magnitude `x` is quantized to `k = round(x / eps)`. Any stored value
//! within `eps` of `x` has key `k - 1`, `k` or `k + 1`, so probing those three
//! buckets finds it whenever it exists. This is what keeps "one entry per
//! tolerance class" exact instead of probabilistic.
//!
//! # Reclamation
//!
//! Reference counts are managed explicitly with [`RealTable::inc_ref`] and
//! [`RealTable::dec_ref`]. An entry whose count drops to zero stays in place
//! until the owner calls [`RealTable::garbage_collect`]; then all
//! unreferenced entries are unlinked and their slots go to the free list.
//!
//! Lookups never collect. A fresh entry has count zero until the caller
//! increments it, so collection only runs at points where the caller knows
//! every handle it still needs is counted. Without `force`, a call is
//! a no-op until the table reaches its collection limit.

use std::fmt;
use std::ops::Index;

use log::{debug, trace, warn};

use crate::config::Config;
use crate::error::{Error, Result};
use crate::reference::RealRef;
use crate::types::{EntryId, Fp, Tolerance};
use crate::utils::MyHash;

const NIL: u32 = u32::MAX;

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum EntryState {
    /// Slot is on the free list.
    Free,
    /// One of the two constants `0` and `1`.
    Immortal,
    /// Canonical entry, reachable through the buckets.
    Indexed,
    /// Scratch entry, never indexed, may be overwritten in place.
    Scratch,
}

/// A stored real: a value and its reference count.
#[derive(Debug, Clone)]
pub struct RealEntry {
    value: Fp,
    ref_count: u32,
    next: u32,
    state: EntryState,
}

impl RealEntry {
    fn new(value: Fp, state: EntryState) -> Self {
        Self {
            value,
            ref_count: 0,
            next: NIL,
            state,
        }
    }

    /// Stored value (a magnitude for indexed entries).
    pub fn value(&self) -> Fp {
        self.value
    }

    pub fn ref_count(&self) -> u32 {
        self.ref_count
    }

    pub fn state(&self) -> EntryState {
        self.state
    }
}

/// Counters describing the table.
#[derive(Debug, Default, Copy, Clone, Eq, PartialEq)]
pub struct TableStats {
    /// Indexed entries, excluding the two immortal ones.
    pub entries: usize,
    /// Maximum of `entries` ever reached.
    pub peak_entries: usize,
    /// Scratch entries currently handed out.
    pub scratch_entries: usize,
    /// Number of collections that actually ran.
    pub collections: usize,
    /// Number of lookups of non-trivial values.
    pub lookups: usize,
    /// Lookups answered by an existing entry.
    pub hits: usize,
    /// Buckets with a non-empty chain.
    pub buckets_used: usize,
}

impl fmt::Display for TableStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let hit_rate = if self.lookups == 0 {
            0.0
        } else {
            100.0 * self.hits as f64 / self.lookups as f64
        };
        write!(
            f,
            "entries={} (peak {}), scratch={}, lookups={} ({:.1}% hits), collections={}, buckets used={}",
            self.entries,
            self.peak_entries,
            self.scratch_entries,
            self.lookups,
            hit_rate,
            self.collections,
            self.buckets_used
        )
    }
}

pub struct RealTable {
    entries: Vec<RealEntry>,
    buckets: Vec<u32>,
    bitmask: u64,
    free: Vec<u32>,
    tolerance: Tolerance,
    initial_gc_limit: usize,
    gc_limit: usize,
    stats: TableStats,
}

impl RealTable {
    pub fn new(config: &Config) -> Self {
        assert!(config.bucket_bits <= 31, "Bucket bits should be in the range 0..=31");

        let buckets_size = 1usize << config.bucket_bits;
        let entries = vec![
            RealEntry::new(0.0, EntryState::Immortal),
            RealEntry::new(1.0, EntryState::Immortal),
        ];

        Self {
            entries,
            buckets: vec![NIL; buckets_size],
            bitmask: (buckets_size - 1) as u64,
            free: Vec::new(),
            tolerance: config.tolerance,
            initial_gc_limit: config.gc_limit,
            gc_limit: config.gc_limit,
            stats: TableStats::default(),
        }
    }
}

impl Default for RealTable {
    fn default() -> Self {
        RealTable::new(&Config::default())
    }
}

impl fmt::Debug for RealTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RealTable")
            .field("tolerance", &self.tolerance)
            .field("capacity", &self.entries.len())
            .field("entries", &self.stats.entries)
            .field("scratch", &self.stats.scratch_entries)
            .field("free", &self.free.len())
            .field("gc_limit", &self.gc_limit)
            .finish()
    }
}

impl RealTable {
    pub fn tolerance(&self) -> Tolerance {
        self.tolerance
    }

    /// Number of indexed entries, excluding the immortal ones.
    pub fn len(&self) -> usize {
        self.stats.entries
    }

    pub fn is_empty(&self) -> bool {
        self.stats.entries == 0
    }

    /// Number of arena slots, including free and immortal ones.
    pub fn capacity(&self) -> usize {
        self.entries.len()
    }

    pub fn gc_limit(&self) -> usize {
        self.gc_limit
    }

    pub fn stats(&self) -> TableStats {
        TableStats {
            buckets_used: self.buckets.iter().filter(|&&head| head != NIL).count(),
            ..self.stats
        }
    }

    /// Value denoted by a reference: the stored value times the sign tag.
    #[inline]
    pub fn val(&self, r: RealRef) -> Fp {
        let entry = &self.entries[r.id().index()];
        debug_assert_ne!(entry.state, EntryState::Free, "Reference {} points to a free entry", r);
        if r.is_negated() {
            -entry.value
        } else {
            entry.value
        }
    }

    pub fn ref_count(&self, r: RealRef) -> u32 {
        self.entries[r.id().index()].ref_count
    }

    /// True if `r` points to a canonical entry (indexed or immortal).
    pub fn is_canonical(&self, r: RealRef) -> bool {
        matches!(
            self.entries[r.id().index()].state,
            EntryState::Indexed | EntryState::Immortal
        )
    }

    pub fn is_scratch(&self, r: RealRef) -> bool {
        self.entries[r.id().index()].state == EntryState::Scratch
    }

    pub fn approximately_zero(&self, r: RealRef) -> bool {
        r.is_exactly_zero() || self.tolerance.approximately_zero(self.val(r))
    }

    pub fn approximately_one(&self, r: RealRef) -> bool {
        r.is_exactly_one() || self.tolerance.approximately_one(self.val(r))
    }

    pub fn approximately_equals(&self, a: RealRef, b: RealRef) -> bool {
        a == b || self.tolerance.approximately_equals(self.val(a), self.val(b))
    }

    fn bucket_index(&self, key: i64) -> usize {
        (MyHash::hash(&key) & self.bitmask) as usize
    }

    /// Returns the canonical reference for `value`.
    ///
    /// The entry is shared by every value within `eps` of `|value|`, the sign
    /// goes into the tag. Values within `eps` of zero map to [`RealRef::ZERO`]
    /// regardless of their sign, values within `eps` of `±1` map to the
    /// immortal one entry.
    ///
    /// The reference count is not changed; call [`RealTable::inc_ref`] for
    /// every reference that is kept.
    pub fn lookup(&mut self, value: Fp) -> RealRef {
        debug_assert!(value.is_finite(), "Cannot store non-finite value {}", value);

        let tol = self.tolerance;
        let magnitude = value.abs();
        if tol.approximately_zero(magnitude) {
            return RealRef::ZERO;
        }
        let negated = value < 0.0;
        if tol.approximately_one(magnitude) {
            return RealRef::new(EntryId::ONE, negated);
        }

        self.stats.lookups += 1;
        let id = self.lookup_magnitude(magnitude);
        RealRef::new(id, negated)
    }

    fn lookup_magnitude(&mut self, magnitude: Fp) -> EntryId {
        let key = self.tolerance.quantize(magnitude);

        if let Some(id) = self.find_closest(magnitude, key) {
            trace!("lookup({}) -> existing {}", magnitude, id);
            self.stats.hits += 1;
            return id;
        }

        let id = self.alloc(RealEntry::new(magnitude, EntryState::Indexed));
        let bucket = self.bucket_index(key);
        self.entries[id.index()].next = self.buckets[bucket];
        self.buckets[bucket] = id.raw();

        self.stats.entries += 1;
        self.stats.peak_entries = self.stats.peak_entries.max(self.stats.entries);
        trace!("lookup({}) -> new {}", magnitude, id);
        id
    }

    fn find_closest(&self, magnitude: Fp, key: i64) -> Option<EntryId> {
        let tol = self.tolerance;
        let mut best: Option<(EntryId, Fp)> = None;

        for k in [key, key.wrapping_sub(1), key.wrapping_add(1)] {
            let mut index = self.buckets[self.bucket_index(k)];
            while index != NIL {
                let entry = &self.entries[index as usize];
                let distance = (entry.value - magnitude).abs();
                if distance == 0.0 {
                    return Some(EntryId::new(index));
                }
                if distance < tol.get() && best.map_or(true, |(_, d)| distance < d) {
                    best = Some((EntryId::new(index), distance));
                }
                index = entry.next;
            }
        }

        best.map(|(id, _)| id)
    }

    fn alloc(&mut self, entry: RealEntry) -> EntryId {
        if let Some(index) = self.free.pop() {
            self.entries[index as usize] = entry;
            return EntryId::new(index);
        }

        let index = self.entries.len();
        if index > EntryId::MAX as usize {
            panic!("Storage is full");
        }
        self.entries.push(entry);
        EntryId::new(index as u32)
    }

    /// Increments the reference count of the entry behind `r`.
    ///
    /// Immortal entries are not counted.
    pub fn inc_ref(&mut self, r: RealRef) {
        if r.is_immortal() {
            return;
        }
        let entry = &mut self.entries[r.id().index()];
        debug_assert_ne!(entry.state, EntryState::Free, "inc_ref on free entry {}", r);
        entry.ref_count += 1;
    }

    /// Decrements the reference count of the entry behind `r`.
    ///
    /// An entry reaching zero becomes eligible for collection. Immortal entries are not counted.
    pub fn dec_ref(&mut self, r: RealRef) {
        if r.is_immortal() {
            return;
        }
        let entry = &mut self.entries[r.id().index()];
        debug_assert_ne!(entry.state, EntryState::Free, "dec_ref on free entry {}", r);
        debug_assert!(entry.ref_count > 0, "Reference count of {} would become negative", r);
        entry.ref_count = entry.ref_count.saturating_sub(1);
    }

    pub fn possibly_needs_collection(&self) -> bool {
        self.stats.entries >= self.gc_limit
    }

    /// Unlinks all unreferenced entries and returns their slots to the free list.
    ///
    /// Without `force`, nothing happens until the collection limit is reached.
    /// References returned by [`RealTable::lookup`] and not yet passed to
    /// [`RealTable::inc_ref`] are invalidated. Returns the number of collected entries.
    pub fn garbage_collect(&mut self, force: bool) -> usize {
        if !force && !self.possibly_needs_collection() {
            return 0;
        }

        let before = self.stats.entries;
        let mut collected = 0;

        for bucket in 0..self.buckets.len() {
            let mut prev = NIL;
            let mut index = self.buckets[bucket];
            while index != NIL {
                let next = self.entries[index as usize].next;
                if self.entries[index as usize].ref_count == 0 {
                    if prev == NIL {
                        self.buckets[bucket] = next;
                    } else {
                        self.entries[prev as usize].next = next;
                    }
                    let entry = &mut self.entries[index as usize];
                    entry.state = EntryState::Free;
                    entry.next = NIL;
                    self.free.push(index);
                    collected += 1;
                } else {
                    prev = index;
                }
                index = next;
            }
        }

        self.stats.entries -= collected;
        self.stats.collections += 1;

        // Mostly live table: collecting again soon would be wasted work.
        if collected * 10 < before {
            self.gc_limit = self.gc_limit.max(1) * 2;
        }

        debug!(
            "garbage_collect: collected {} of {} entries, {} remain, next limit {}",
            collected, before, self.stats.entries, self.gc_limit
        );
        collected
    }

    /// Allocates a scratch entry holding `value`.
    ///
    /// Scratch entries are never indexed, so arithmetic may overwrite them in place.
    pub fn alloc_scratch(&mut self, value: Fp) -> RealRef {
        let id = self.alloc(RealEntry::new(value, EntryState::Scratch));
        self.stats.scratch_entries += 1;
        RealRef::positive(id)
    }

    /// Returns a scratch entry to the free list.
    pub fn free_scratch(&mut self, r: RealRef) {
        let index = r.id().index();
        assert_eq!(
            self.entries[index].state,
            EntryState::Scratch,
            "Only scratch entries can be returned, got {}",
            r
        );
        self.entries[index].state = EntryState::Free;
        self.free.push(r.id().raw());
        self.stats.scratch_entries -= 1;
    }

    /// Overwrites the value of a scratch entry.
    ///
    /// The reference must be positive: the written value is what a later
    /// [`RealTable::val`] returns.
    #[inline]
    pub fn set_value(&mut self, r: RealRef, value: Fp) {
        debug_assert!(!r.is_immortal(), "Cannot overwrite immortal entry {}", r);
        debug_assert!(!r.is_negated(), "Cannot write through negated reference {}", r);
        let entry = &mut self.entries[r.id().index()];
        debug_assert_eq!(
            entry.state,
            EntryState::Scratch,
            "Cannot overwrite canonical entry {}",
            r
        );
        entry.value = value;
    }

    /// Changes the tolerance.
    ///
    /// Entries canonicalized under the old tolerance would silently violate
    /// the one-entry-per-class invariant under the new one, so the change is
    /// refused while any referenced entry remains after a forced collection.
    pub fn set_tolerance(&mut self, tolerance: Tolerance) -> Result<()> {
        self.garbage_collect(true);
        if !self.is_empty() {
            warn!(
                "set_tolerance({}) refused: {} referenced entries remain",
                tolerance,
                self.len()
            );
            return Err(Error::ToleranceLocked { live: self.len() });
        }
        debug!("set_tolerance: {} -> {}", self.tolerance, tolerance);
        self.tolerance = tolerance;
        Ok(())
    }

    /// Drops every entry except the immortal ones and resets the collection limit.
    ///
    /// All outstanding non-immortal references become invalid.
    pub fn clear(&mut self) {
        self.entries.truncate(2);
        self.buckets.fill(NIL);
        self.free.clear();
        self.gc_limit = self.initial_gc_limit;
        self.stats = TableStats {
            collections: self.stats.collections,
            peak_entries: self.stats.peak_entries,
            ..TableStats::default()
        };
    }
}

impl Index<EntryId> for RealTable {
    type Output = RealEntry;

    fn index(&self, id: EntryId) -> &Self::Output {
        &self.entries[id.index()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_log::test;

    fn table_with(eps: Fp) -> RealTable {
        RealTable::new(&Config::default().with_tolerance(Tolerance::new(eps).unwrap()))
    }

    #[test]
    fn test_constants() {
        let mut table = RealTable::default();
        assert_eq!(table.lookup(0.0), RealRef::ZERO);
        assert_eq!(table.lookup(-0.0), RealRef::ZERO);
        assert_eq!(table.lookup(1e-15), RealRef::ZERO);
        assert_eq!(table.lookup(-1e-15), RealRef::ZERO);
        assert_eq!(table.lookup(1.0), RealRef::ONE);
        assert_eq!(table.lookup(-1.0), RealRef::MINUS_ONE);
        assert!(table.is_empty());
    }

    #[test]
    fn test_lookup_is_unique() {
        let mut table = RealTable::default();
        let a = table.lookup(0.5);
        let b = table.lookup(0.5);
        assert_eq!(a, b);
        assert_eq!(table.len(), 1);
        assert_eq!(table.val(a), 0.5);
    }

    #[test]
    fn test_sign_shares_entry() {
        let mut table = RealTable::default();
        let pos = table.lookup(0.25);
        let neg = table.lookup(-0.25);
        assert_eq!(pos.id(), neg.id());
        assert!(neg.is_negated());
        assert_eq!(-pos, neg);
        assert_eq!(table.val(neg), -0.25);
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_tolerance_class() {
        let mut table = table_with(1e-6);
        let a = table.lookup(0.3);
        let b = table.lookup(0.3 + 4e-7);
        let c = table.lookup(0.3 - 4e-7);
        let d = table.lookup(0.3 + 5e-6);
        assert_eq!(a, b);
        assert_eq!(a, c);
        assert_ne!(a, d);
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn test_tolerance_class_across_bucket_boundary() {
        // Straddles a rounding boundary of `value / eps`, yet the values are within `eps`.
        let eps = 1e-3;
        let mut table = table_with(eps);
        let below = 0.1234995;
        let above = 0.1235004;
        assert_ne!(table.tolerance().quantize(below), table.tolerance().quantize(above));
        let a = table.lookup(below);
        let b = table.lookup(above);
        assert_eq!(a, b);
    }

    #[test]
    fn test_closest_entry_wins() {
        let mut table = table_with(1e-3);
        let low = table.lookup(0.2000);
        let high = table.lookup(0.2015);
        assert_ne!(low, high);
        // Within eps of both, closer to `high`.
        assert_eq!(table.lookup(0.2009), high);
        assert_eq!(table.lookup(0.2006), low);
    }

    #[test]
    fn test_ref_counting() {
        let mut table = RealTable::default();
        let r = table.lookup(0.75);
        assert_eq!(table.ref_count(r), 0);
        table.inc_ref(r);
        table.inc_ref(-r);
        assert_eq!(table.ref_count(r), 2);
        table.dec_ref(r);
        assert_eq!(table.ref_count(r), 1);
    }

    #[test]
    fn test_immortal_entries_survive() {
        let mut table = RealTable::default();
        for _ in 0..10 {
            table.dec_ref(RealRef::ZERO);
            table.dec_ref(RealRef::ONE);
            table.dec_ref(RealRef::MINUS_ONE);
        }
        table.garbage_collect(true);
        assert_eq!(table.lookup(0.0), RealRef::ZERO);
        assert_eq!(table.lookup(1.0), RealRef::ONE);
        assert_eq!(table.val(RealRef::ONE), 1.0);
        assert_eq!(table.ref_count(RealRef::ONE), 0);
    }

    #[test]
    fn test_garbage_collect() {
        let mut table = RealTable::default();
        let kept = table.lookup(0.1);
        let dropped = table.lookup(0.2);
        table.inc_ref(kept);
        table.inc_ref(dropped);
        table.dec_ref(dropped);

        // Lazy: nothing happens below the limit.
        assert_eq!(table.garbage_collect(false), 0);
        assert_eq!(table.len(), 2);

        assert_eq!(table.garbage_collect(true), 1);
        assert_eq!(table.len(), 1);
        assert_eq!(table.val(kept), 0.1);
        assert_eq!(table[dropped.id()].state(), EntryState::Free);

        // The slot is reused and the value is found again.
        let again = table.lookup(0.2);
        assert_eq!(again.id(), dropped.id());
        assert_eq!(table.lookup(0.1), kept);
    }

    #[test]
    fn test_lookup_never_collects() {
        let mut table = RealTable::new(&Config::default().with_gc_limit(1));
        let a = table.lookup(0.3);
        assert!(table.possibly_needs_collection());
        // A fresh, still uncounted entry survives further lookups.
        let b = table.lookup(0.4);
        assert_ne!(a.id(), b.id());
        assert_eq!(table.val(a), 0.3);
        assert_eq!(table.val(b), 0.4);
        assert_eq!(table.len(), 2);
        assert_eq!(table.stats().collections, 0);
    }

    #[test]
    fn test_collection_at_limit() {
        let mut table = RealTable::new(&Config::default().with_gc_limit(4));
        for i in 0..3 {
            table.lookup(0.1 * (i + 2) as Fp);
        }
        assert_eq!(table.garbage_collect(false), 0);

        let kept = table.lookup(0.5);
        table.inc_ref(kept);
        assert!(table.possibly_needs_collection());

        // The three unreferenced entries go, the counted one stays.
        assert_eq!(table.garbage_collect(false), 3);
        assert_eq!(table.len(), 1);
        assert_eq!(table.stats().collections, 1);
        assert_eq!(table.val(kept), 0.5);
    }

    #[test]
    fn test_gc_limit_grows_when_everything_is_alive() {
        let mut table = RealTable::new(&Config::default().with_gc_limit(2));
        let a = table.lookup(0.2);
        let b = table.lookup(0.3);
        table.inc_ref(a);
        table.inc_ref(b);
        assert_eq!(table.garbage_collect(false), 0);
        assert_eq!(table.gc_limit(), 4);
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn test_scratch_entries() {
        let mut table = RealTable::default();
        let s = table.alloc_scratch(0.0);
        assert!(table.is_scratch(s));
        assert!(!table.is_canonical(s));
        table.set_value(s, -0.3);
        assert_eq!(table.val(s), -0.3);
        assert_eq!(table.val(-s), 0.3);

        // Scratch values are not visible to lookups.
        let r = table.lookup(0.3);
        assert_ne!(r.id(), s.id());
        assert!(table.is_canonical(r));

        assert_eq!(table.stats().scratch_entries, 1);
        table.free_scratch(s);
        assert_eq!(table.stats().scratch_entries, 0);
    }

    #[test]
    #[should_panic(expected = "Only scratch entries can be returned")]
    fn test_free_canonical_entry_panics() {
        let mut table = RealTable::default();
        let r = table.lookup(0.3);
        table.free_scratch(r);
    }

    #[test]
    fn test_set_tolerance() {
        let mut table = RealTable::default();
        let r = table.lookup(0.3);
        table.inc_ref(r);

        let tol = Tolerance::new(1e-6).unwrap();
        assert!(matches!(table.set_tolerance(tol), Err(Error::ToleranceLocked { live: 1 })));
        assert_eq!(table.tolerance(), Tolerance::default());

        table.dec_ref(r);
        assert!(table.set_tolerance(tol).is_ok());
        assert_eq!(table.tolerance(), tol);
        assert!(table.is_empty());
    }

    #[test]
    fn test_clear() {
        let mut table = RealTable::default();
        let r = table.lookup(0.3);
        table.inc_ref(r);
        table.clear();
        assert!(table.is_empty());
        assert_eq!(table.capacity(), 2);
        assert_eq!(table.lookup(1.0), RealRef::ONE);
    }

    #[test]
    fn test_many_values() {
        let mut table = table_with(1e-9);
        let refs: Vec<RealRef> = (1..1000).map(|i| table.lookup(i as Fp / 1000.0 + 2.0)).collect();
        assert_eq!(table.len(), 999);
        for (i, &r) in refs.iter().enumerate() {
            assert_eq!(table.lookup((i + 1) as Fp / 1000.0 + 2.0), r);
        }
        assert_eq!(table.stats().hits, 999);
    }
}
