//! Non-owning references to decision-diagram nodes.
//!
//! Nodes themselves live in the diagram package, outside of this crate. Code
//! here only needs their identity, so a node is referred to by its index in
//! the owning package, typed by the kind of diagram it belongs to.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;

/// A kind of decision-diagram node.
pub trait NodeKind: 'static {
    /// Short name used when printing references.
    const NAME: &'static str;
}

/// Nodes of state vectors.
#[derive(Debug)]
pub enum VectorNode {}

/// Nodes of operator matrices.
#[derive(Debug)]
pub enum MatrixNode {}

/// Nodes of density matrices.
#[derive(Debug)]
pub enum DensityMatrixNode {}

impl NodeKind for VectorNode {
    const NAME: &'static str = "v";
}

impl NodeKind for MatrixNode {
    const NAME: &'static str = "m";
}

impl NodeKind for DensityMatrixNode {
    const NAME: &'static str = "d";
}

/// Index of a node of kind `N`.
///
/// Index `0` is the terminal node shared by all diagrams of that kind.
#[repr(transparent)]
pub struct NodeRef<N> {
    index: u32,
    _kind: PhantomData<fn() -> N>,
}

impl<N> NodeRef<N> {
    /// The terminal node.
    pub const TERMINAL: Self = Self::new(0);

    pub const fn new(index: u32) -> Self {
        Self {
            index,
            _kind: PhantomData,
        }
    }

    pub const fn index(self) -> u32 {
        self.index
    }

    pub const fn is_terminal(self) -> bool {
        self.index == 0
    }
}

// Manual impls: derives would require `N: Clone`, `N: Eq`, ... on the marker type.

impl<N> Copy for NodeRef<N> {}

impl<N> Clone for NodeRef<N> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<N> PartialEq for NodeRef<N> {
    fn eq(&self, other: &Self) -> bool {
        self.index == other.index
    }
}

impl<N> Eq for NodeRef<N> {}

impl<N> Hash for NodeRef<N> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.index.hash(state);
    }
}

impl<N: NodeKind> fmt::Debug for NodeRef<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NodeRef({}{})", N::NAME, self.index)
    }
}

impl<N: NodeKind> fmt::Display for NodeRef<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_terminal() {
            write!(f, "{}T", N::NAME)
        } else {
            write!(f, "{}{}", N::NAME, self.index)
        }
    }
}
