#![forbid(unsafe_code)]

//! Test fixtures for exercising the Retree reconciler.
//!
//! - [`TestTree`]: a slab-backed real tree whose nodes are compact
//!   [`NodeId`] handles, implementing the tree-mutation port with the exact
//!   index semantics the engine expects (including the `from < to`
//!   destination collapse on relocation).
//! - [`Recording`]: an applier wrapper that logs every port call as a
//!   [`PortCall`] for exact-sequence assertions while passing the call
//!   through to the wrapped applier.
//!
//! # Example
//!
//! ```
//! use retree_harness::{PortCall, Recording, TestTree};
//! use retree_core::Applier;
//!
//! let mut tree = Recording::new(TestTree::new());
//! let root = tree.inner().root();
//! let child = tree.inner_mut().alloc("hello");
//! tree.insert(&root, 0, child);
//!
//! assert_eq!(tree.calls(), &[PortCall::Insert { index: 0 }]);
//! assert_eq!(tree.inner().labels(root), ["hello"]);
//! ```

use retree_core::Applier;

/// Compact handle to a node in a [`TestTree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(u32);

#[derive(Debug, Clone)]
struct TestNode {
    label: String,
    children: Vec<NodeId>,
}

/// A minimal real tree: a slab of labeled nodes addressed by [`NodeId`].
///
/// Nodes are allocated detached via [`alloc`](Self::alloc) and attached by
/// the engine through the port. Slots are never reused, so a `NodeId` stays
/// valid for the lifetime of the tree even after the node is detached.
#[derive(Debug, Clone, Default)]
pub struct TestTree {
    nodes: Vec<TestNode>,
}

impl TestTree {
    /// Create a tree containing only a detached root node.
    pub fn new() -> Self {
        let mut tree = Self { nodes: Vec::new() };
        tree.alloc("root");
        tree
    }

    /// The root node handle.
    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    /// Allocate a detached node with the given label.
    pub fn alloc(&mut self, label: impl Into<String>) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(TestNode {
            label: label.into(),
            children: Vec::new(),
        });
        id
    }

    /// Label of a node.
    pub fn label(&self, id: NodeId) -> &str {
        &self.nodes[id.0 as usize].label
    }

    /// Child handles of a node, in order.
    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.nodes[id.0 as usize].children
    }

    /// Child labels of a node, in order. The usual assertion helper.
    pub fn labels(&self, id: NodeId) -> Vec<String> {
        self.children(id)
            .iter()
            .map(|&c| self.label(c).to_owned())
            .collect()
    }

    /// Total number of nodes in the subtree rooted at `id`, excluding `id`.
    pub fn descendant_count(&self, id: NodeId) -> usize {
        self.children(id)
            .iter()
            .map(|&c| 1 + self.descendant_count(c))
            .sum()
    }
}

impl Applier for TestTree {
    type Node = NodeId;

    fn insert(&mut self, parent: &NodeId, index: usize, child: NodeId) {
        self.nodes[parent.0 as usize].children.insert(index, child);
    }

    fn remove(&mut self, parent: &NodeId, index: usize, count: usize) {
        self.nodes[parent.0 as usize]
            .children
            .drain(index..index + count);
    }

    fn relocate(&mut self, parent: &NodeId, from: usize, to: usize, count: usize) {
        let children = &mut self.nodes[parent.0 as usize].children;
        let moved: Vec<NodeId> = children.drain(from..from + count).collect();
        // Both indices are measured before the drain; a forward move must
        // collapse the destination by the removed count.
        let to = if from < to { to - count } else { to };
        for (offset, node) in moved.into_iter().enumerate() {
            children.insert(to + offset, node);
        }
    }
}

/// One recorded tree-mutation-port call.
///
/// Parent and child handles are deliberately omitted: tests assert the index
/// arithmetic here and the resulting shape via [`TestTree::labels`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PortCall {
    Insert { index: usize },
    Remove { index: usize, count: usize },
    Relocate { from: usize, to: usize, count: usize },
}

/// Applier wrapper that records every call before forwarding it.
#[derive(Debug, Clone, Default)]
pub struct Recording<A> {
    inner: A,
    calls: Vec<PortCall>,
}

impl<A> Recording<A> {
    /// Wrap an applier.
    pub fn new(inner: A) -> Self {
        Self {
            inner,
            calls: Vec::new(),
        }
    }

    /// Calls recorded so far, in emission order.
    pub fn calls(&self) -> &[PortCall] {
        &self.calls
    }

    /// Drain and return the recorded calls.
    pub fn take_calls(&mut self) -> Vec<PortCall> {
        std::mem::take(&mut self.calls)
    }

    /// The wrapped applier.
    pub fn inner(&self) -> &A {
        &self.inner
    }

    /// Mutable access to the wrapped applier (e.g. to allocate nodes).
    pub fn inner_mut(&mut self) -> &mut A {
        &mut self.inner
    }

    /// Unwrap, dropping the recorded calls.
    pub fn into_inner(self) -> A {
        self.inner
    }
}

impl<A: Applier> Applier for Recording<A> {
    type Node = A::Node;

    fn insert(&mut self, parent: &Self::Node, index: usize, child: Self::Node) {
        self.calls.push(PortCall::Insert { index });
        self.inner.insert(parent, index, child);
    }

    fn remove(&mut self, parent: &Self::Node, index: usize, count: usize) {
        self.calls.push(PortCall::Remove { index, count });
        self.inner.remove(parent, index, count);
    }

    fn relocate(&mut self, parent: &Self::Node, from: usize, to: usize, count: usize) {
        self.calls.push(PortCall::Relocate { from, to, count });
        self.inner.relocate(parent, from, to, count);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn flat_tree(labels: &[&str]) -> (TestTree, NodeId) {
        let mut tree = TestTree::new();
        let root = tree.root();
        for (i, label) in labels.iter().enumerate() {
            let node = tree.alloc(*label);
            tree.insert(&root, i, node);
        }
        (tree, root)
    }

    #[test]
    fn insert_shifts_later_siblings() {
        let (mut tree, root) = flat_tree(&["a", "c"]);
        let b = tree.alloc("b");
        tree.insert(&root, 1, b);
        assert_eq!(tree.labels(root), ["a", "b", "c"]);
    }

    #[test]
    fn remove_deletes_a_contiguous_range() {
        let (mut tree, root) = flat_tree(&["a", "b", "c", "d"]);
        tree.remove(&root, 1, 2);
        assert_eq!(tree.labels(root), ["a", "d"]);
    }

    #[test]
    fn relocate_backward_keeps_indices() {
        let (mut tree, root) = flat_tree(&["a", "b", "c", "d"]);
        tree.relocate(&root, 2, 0, 2);
        assert_eq!(tree.labels(root), ["c", "d", "a", "b"]);
    }

    #[test]
    fn relocate_forward_collapses_destination() {
        let (mut tree, root) = flat_tree(&["a", "b", "c", "d", "e"]);
        // Move "b" to just before "e", both measured pre-removal.
        tree.relocate(&root, 1, 4, 1);
        assert_eq!(tree.labels(root), ["a", "c", "d", "b", "e"]);
    }

    #[test]
    fn relocate_is_not_remove_plus_insert() {
        let (mut tree, root) = flat_tree(&["a", "b"]);
        let before = tree.children(root).to_vec();
        tree.relocate(&root, 0, 2, 1);
        // Same handles, new order: no node was destroyed or recreated.
        let mut after = tree.children(root).to_vec();
        after.reverse();
        assert_eq!(before, after);
    }

    #[test]
    fn recording_passes_through_and_logs() {
        let mut rec = Recording::new(TestTree::new());
        let root = rec.inner().root();
        let a = rec.inner_mut().alloc("a");
        let b = rec.inner_mut().alloc("b");
        rec.insert(&root, 0, a);
        rec.insert(&root, 1, b);
        rec.relocate(&root, 0, 2, 1);
        rec.remove(&root, 0, 1);
        assert_eq!(
            rec.take_calls(),
            vec![
                PortCall::Insert { index: 0 },
                PortCall::Insert { index: 1 },
                PortCall::Relocate {
                    from: 0,
                    to: 2,
                    count: 1
                },
                PortCall::Remove { index: 0, count: 1 },
            ]
        );
        assert!(rec.calls().is_empty());
        assert_eq!(rec.inner().labels(root), ["a"]);
    }
}
