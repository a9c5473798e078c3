//! # qdd-rs: Complex numbers for quantum decision diagrams
//!
//! **`qdd-rs`** is the numeric substrate of a decision-diagram engine for quantum computing.
//! Edge weights of such diagrams are complex amplitudes, and the diagrams are only canonical
//! if numerically equal weights are *identical*. This crate provides exactly that.
//!
//! ## Key Features
//!
//! - **Tolerance-aware hash consing**: Every real is stored once per tolerance class in the
//!   [`RealTable`][crate::table::RealTable]. Values within `eps` of each other share one entry,
//!   so weights can be compared by identity.
//! - **Sign-tagged handles**: A [`RealRef`][crate::reference::RealRef] is an entry index plus a
//!   sign bit. `x` and `-x` share storage, and negation or conjugation never touch the table.
//! - **Immortal constants**: `0` and `1` live in fixed entries that are never collected.
//! - **In-place arithmetic**: [`ComplexNumbers`][crate::complex_numbers::ComplexNumbers] computes
//!   into scratch entries, so intermediate results of a loop do not pollute the table.
//! - **Cache-friendly edges**: [`CachedEdge`][crate::cached_edge::CachedEdge] keeps raw weights
//!   and compares them within the tolerance, for use as compute-table keys.
//!
//! ## Basic Usage
//!
//! ```rust
//! use qdd_rs::complex_numbers::ComplexNumbers;
//! use std::f64::consts::FRAC_1_SQRT_2;
//!
//! let mut cn = ComplexNumbers::default();
//!
//! // Equal values (up to the tolerance) give identical handles.
//! let a = cn.lookup_parts(FRAC_1_SQRT_2, 0.0);
//! let b = cn.lookup_parts(FRAC_1_SQRT_2 + 1e-15, 0.0);
//! assert_eq!(a, b);
//!
//! // Negation reuses the same entry.
//! let c = cn.lookup_parts(-FRAC_1_SQRT_2, 0.0);
//! assert_eq!(c, a.neg());
//! assert_eq!(cn.real_count(), 1);
//!
//! // Keep the handle alive while a diagram points at it.
//! cn.inc_ref(a);
//! assert_eq!(cn.to_string(a, true, None), "1/√2");
//! cn.dec_ref(a);
//! ```
//!
//! ## Core Components
//!
//! - **[`table`]**: The unique table of reals, with reference counting and garbage collection.
//! - **[`complex_numbers`]**: Canonicalization and arithmetic on [`Complex`][crate::complex::Complex] handles.
//! - **[`cached_edge`]** and **[`cache`]**: Raw-weight edges and the compute table keyed by them.
//! - **[`format`]** and **[`io`]**: Human-readable printing and the binary encoding of amplitudes.

pub mod cache;
pub mod cached_edge;
pub mod complex;
pub mod complex_numbers;
pub mod config;
pub mod error;
pub mod format;
pub mod io;
pub mod node;
pub mod reference;
pub mod table;
pub mod types;
pub mod utils;
