#![forbid(unsafe_code)]

//! The tree-mutation port.
//!
//! The reconciler never owns or inspects real tree nodes; every structural
//! edit it decides on is expressed through this trait, implemented by the
//! caller over its own node representation. Node values are opaque handles:
//! the engine only clones them and passes them back.

/// Mutation primitives over the caller's real tree.
///
/// All indices are child positions within `parent`. Implementations must not
/// retain the `&Node` borrows past the call and must not re-enter the
/// reconciler; the engine is single-threaded and non-reentrant.
///
/// The engine never emits a call whose `count` would be zero.
pub trait Applier {
    /// Opaque handle to a real tree node. Typically an id into a slab or a
    /// cheaply clonable reference.
    type Node: Clone;

    /// Make `child` the element at `index` under `parent`; siblings at
    /// `>= index` shift right by one. `index` may equal the current child
    /// count (append).
    fn insert(&mut self, parent: &Self::Node, index: usize, child: Self::Node);

    /// Delete the contiguous range `[index, index + count)` under `parent`;
    /// later siblings shift left by `count`.
    fn remove(&mut self, parent: &Self::Node, index: usize, count: usize);

    /// Relocate the contiguous range of length `count` starting at `from` to
    /// immediately before the element currently at `to`.
    ///
    /// Both indices are measured before the range is taken out, so when
    /// `from < to` the implementation must collapse the effective destination
    /// by `count`. Implementations should treat this as a move, not a
    /// remove-then-insert: nodes in the range must not receive
    /// removed-from-tree or inserted-into-tree lifecycle notifications where
    /// the underlying representation would otherwise trigger them.
    fn relocate(&mut self, parent: &Self::Node, from: usize, to: usize, count: usize);
}
