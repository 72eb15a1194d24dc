#![forbid(unsafe_code)]

//! Shadow tree: the reconciler's bookkeeping arena.
//!
//! The shadow tree records one entry per declared group or node from the
//! previous pass. It exists purely so the engine can compute real-tree child
//! indices and find previously declared siblings by key; it never touches the
//! real tree itself.
//!
//! Entries live in an arena addressed by stable [`EntryId`] indices with a
//! free list for slot reuse. Entries are frequently spliced (removed from one
//! child slot, reinserted at another), so arena + index avoids the ownership
//! churn a nested owned-children representation would create on every move.
//!
//! # Invariants
//!
//! 1. An entry id handed out by `alloc_*` stays valid until `free_subtree`
//!    reclaims it; reclaimed slots may be reused by later allocations.
//! 2. `node_count` of a node entry is exactly 1: its declared descendants
//!    live *inside* its real node and contribute nothing at the parent level.
//! 3. After every completed pass, for every node entry there is exactly one
//!    real node at the index given by summing `node_count` over preceding
//!    siblings within the nearest enclosing node entry.
//!
//! All queries here are pure; mutation happens only on the reconciler's
//! instructions.

use smallvec::SmallVec;
use std::fmt;

/// Stable arena index of a shadow entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EntryId(u32);

impl EntryId {
    #[inline]
    fn index(self) -> usize {
        self.0 as usize
    }
}

/// What a shadow entry stands for.
#[derive(Debug, Clone)]
pub enum EntryKind<K, N> {
    /// Pure bookkeeping boundary identified by a caller-supplied key.
    /// Corresponds to no real node.
    Group {
        /// Opaque caller key; compared by equality, first match wins.
        key: K,
    },
    /// Exactly one real tree node. `node` is `None` only in the window
    /// between enter-node and insert-payload while inserting.
    Node { node: Option<N> },
}

#[derive(Debug, Clone)]
struct Entry<K, N> {
    kind: EntryKind<K, N>,
    children: SmallVec<[EntryId; 4]>,
    parent: Option<EntryId>,
    /// Pass stamp: the id of the update pass that last declared (claimed or
    /// created) this entry. Entries whose stamp lags the current pass at
    /// done-time are stale.
    stamp: u64,
}

/// Arena of shadow entries, parallel to the caller's real tree.
///
/// The root is always a node entry wrapping the real root handle supplied at
/// construction.
#[derive(Debug, Clone)]
pub struct ShadowTree<K, N> {
    /// Slot storage. `None` marks a free slot.
    slots: Vec<Option<Entry<K, N>>>,
    /// Free slot indices for reuse.
    free: Vec<u32>,
    root: EntryId,
}

impl<K, N> ShadowTree<K, N>
where
    K: Eq + fmt::Debug,
    N: Clone,
{
    /// Create a shadow tree whose root wraps the given real root handle.
    pub fn new(root: N) -> Self {
        let entry = Entry {
            kind: EntryKind::Node { node: Some(root) },
            children: SmallVec::new(),
            parent: None,
            stamp: 0,
        };
        Self {
            slots: vec![Some(entry)],
            free: Vec::new(),
            root: EntryId(0),
        }
    }

    /// The root entry.
    #[inline]
    pub fn root(&self) -> EntryId {
        self.root
    }

    /// Number of live entries (root included).
    pub fn len(&self) -> usize {
        self.slots.len() - self.free.len()
    }

    /// Whether only the root entry is live.
    pub fn is_empty(&self) -> bool {
        self.len() <= 1
    }

    fn entry(&self, id: EntryId) -> Option<&Entry<K, N>> {
        self.slots.get(id.index()).and_then(Option::as_ref)
    }

    fn entry_mut(&mut self, id: EntryId) -> Option<&mut Entry<K, N>> {
        self.slots.get_mut(id.index()).and_then(Option::as_mut)
    }

    /// The kind of an entry, or `None` for a reclaimed id.
    pub fn kind(&self, id: EntryId) -> Option<&EntryKind<K, N>> {
        self.entry(id).map(|e| &e.kind)
    }

    /// Whether `id` is a live node entry.
    pub fn is_node(&self, id: EntryId) -> bool {
        matches!(self.kind(id), Some(EntryKind::Node { .. }))
    }

    /// The caller key of a group entry; `None` for node entries and
    /// reclaimed ids.
    pub fn key(&self, id: EntryId) -> Option<&K> {
        match self.kind(id) {
            Some(EntryKind::Group { key }) => Some(key),
            _ => None,
        }
    }

    /// The real node recorded on a node entry, if any.
    pub fn node(&self, id: EntryId) -> Option<&N> {
        match self.kind(id) {
            Some(EntryKind::Node { node }) => node.as_ref(),
            _ => None,
        }
    }

    /// Record the real node on a node entry. Returns false for reclaimed ids
    /// and group entries.
    pub fn set_node(&mut self, id: EntryId, node: N) -> bool {
        match self.entry_mut(id) {
            Some(Entry {
                kind: EntryKind::Node { node: slot },
                ..
            }) => {
                *slot = Some(node);
                true
            }
            _ => false,
        }
    }

    /// The pass stamp of an entry (0 = never declared; reclaimed ids read 0).
    pub fn stamp(&self, id: EntryId) -> u64 {
        self.entry(id).map_or(0, |e| e.stamp)
    }

    /// Stamp an entry as declared by pass `pass`.
    pub fn set_stamp(&mut self, id: EntryId, pass: u64) {
        if let Some(entry) = self.entry_mut(id) {
            entry.stamp = pass;
        }
    }

    fn alloc(&mut self, kind: EntryKind<K, N>) -> EntryId {
        let entry = Entry {
            kind,
            children: SmallVec::new(),
            parent: None,
            stamp: 0,
        };
        if let Some(slot) = self.free.pop() {
            self.slots[slot as usize] = Some(entry);
            EntryId(slot)
        } else {
            assert!(
                self.slots.len() < u32::MAX as usize,
                "shadow tree slot overflow"
            );
            let slot = self.slots.len() as u32;
            self.slots.push(Some(entry));
            EntryId(slot)
        }
    }

    /// Allocate a detached group entry.
    pub fn alloc_group(&mut self, key: K) -> EntryId {
        self.alloc(EntryKind::Group { key })
    }

    /// Allocate a detached node entry with no payload yet.
    pub fn alloc_node(&mut self) -> EntryId {
        self.alloc(EntryKind::Node { node: None })
    }

    /// Child id at `slot`, or `None` past the end.
    pub fn child_at(&self, parent: EntryId, slot: usize) -> Option<EntryId> {
        self.entry(parent)?.children.get(slot).copied()
    }

    /// Number of children of `parent` (0 for reclaimed ids).
    pub fn child_count(&self, parent: EntryId) -> usize {
        self.entry(parent).map_or(0, |e| e.children.len())
    }

    /// Parent of `id`, `None` for the root and reclaimed ids.
    pub fn parent_of(&self, id: EntryId) -> Option<EntryId> {
        self.entry(id)?.parent
    }

    /// Link `child` into `parent` at `slot`, shifting later siblings right.
    ///
    /// # Panics
    /// Panics if `parent` is reclaimed or `slot` is out of bounds; both are
    /// engine bugs, not caller errors.
    pub fn insert_child(&mut self, parent: EntryId, slot: usize, child: EntryId) {
        if let Some(entry) = self.entry_mut(child) {
            entry.parent = Some(parent);
        }
        let entry = self.entry_mut(parent);
        assert!(entry.is_some(), "insert_child on reclaimed parent entry");
        if let Some(entry) = entry {
            assert!(slot <= entry.children.len(), "child slot out of bounds");
            entry.children.insert(slot, child);
        }
    }

    /// Move the child at slot `from` to slot `to` within the same parent.
    pub fn splice(&mut self, parent: EntryId, from: usize, to: usize) {
        if let Some(entry) = self.entry_mut(parent) {
            assert!(
                from < entry.children.len() && to <= entry.children.len(),
                "splice slots out of bounds"
            );
            let child = entry.children.remove(from);
            let to = if from < to { to - 1 } else { to };
            entry.children.insert(to, child);
        }
    }

    /// Drop children `[from, len)` of `parent` and reclaim their subtrees.
    pub fn truncate_children(&mut self, parent: EntryId, from: usize) {
        let stale: Vec<EntryId> = match self.entry_mut(parent) {
            Some(entry) if from < entry.children.len() => entry.children.drain(from..).collect(),
            _ => return,
        };
        for id in stale {
            self.free_subtree(id);
        }
    }

    /// Reclaim `id` and its whole subtree. The ids become invalid and their
    /// slots are reused by later allocations.
    pub fn free_subtree(&mut self, id: EntryId) {
        let children = match self.slots.get_mut(id.index()).and_then(Option::take) {
            Some(entry) => entry.children,
            None => return,
        };
        self.free.push(id.0);
        for child in children {
            self.free_subtree(child);
        }
    }

    /// Number of real tree nodes subtended by `id` at its parent's level:
    /// 1 for a node entry, the recursive sum over children for a group.
    ///
    /// Reclaimed ids count as 0.
    pub fn node_count(&self, id: EntryId) -> usize {
        match self.kind(id) {
            Some(EntryKind::Node { .. }) => 1,
            Some(EntryKind::Group { .. }) => {
                let entry = self.entry(id).map(|e| &e.children);
                entry.map_or(0, |children| {
                    children.iter().map(|&c| self.node_count(c)).sum()
                })
            }
            None => 0,
        }
    }

    /// Real-tree index a node would occupy if inserted at child slot `slot`
    /// of `parent`: the sum of `node_count` over children before that slot.
    ///
    /// The index is relative to `parent`'s own first node; the reconciler
    /// adds the frame base to make it absolute within the current real
    /// parent.
    pub fn node_index_at(&self, parent: EntryId, slot: usize) -> usize {
        match self.entry(parent) {
            Some(entry) => entry
                .children
                .iter()
                .take(slot)
                .map(|&c| self.node_count(c))
                .sum(),
            None => 0,
        }
    }

    /// Like [`node_index_at`](Self::node_index_at), resolved by child
    /// identity. `None` if `child` is not a child of `parent`.
    pub fn node_index_of_child(&self, parent: EntryId, child: EntryId) -> Option<usize> {
        let entry = self.entry(parent)?;
        let slot = entry.children.iter().position(|&c| c == child)?;
        Some(self.node_index_at(parent, slot))
    }

    /// Absolute child index of `id`'s first real node within the real node
    /// of its nearest node ancestor.
    ///
    /// `None` for the root (it has no enclosing real parent) and for
    /// detached or reclaimed entries.
    pub fn absolute_node_index(&self, id: EntryId) -> Option<usize> {
        let mut index = 0;
        let mut current = id;
        loop {
            let parent = self.parent_of(current)?;
            index += self.node_index_of_child(parent, current)?;
            if self.is_node(parent) {
                return Some(index);
            }
            current = parent;
        }
    }

    /// Slot of the first group child of `parent` at or after `from` whose
    /// key equals `key`. Node children never match. First match wins, so
    /// duplicate sibling keys resolve in declaration order.
    pub fn first_group_after(&self, parent: EntryId, key: &K, from: usize) -> Option<usize> {
        let entry = self.entry(parent)?;
        entry
            .children
            .iter()
            .enumerate()
            .skip(from)
            .find(|&(_, &c)| self.key(c) == Some(key))
            .map(|(slot, _)| slot)
    }

    /// Slot of the first node child of `parent` at or after `from`. Node
    /// entries carry no caller key and are matched positionally.
    pub fn first_node_after(&self, parent: EntryId, from: usize) -> Option<usize> {
        let entry = self.entry(parent)?;
        entry
            .children
            .iter()
            .enumerate()
            .skip(from)
            .find(|&(_, &c)| self.is_node(c))
            .map(|(slot, _)| slot)
    }

    /// Slot of the first group child before `before` whose key equals `key`
    /// and whose stamp lags `pass` (skipped earlier in the current pass).
    ///
    /// Declaration order is preserved: the earliest such slot wins, so
    /// duplicate sibling keys resolve first-declared-first.
    pub fn first_stale_group_before(
        &self,
        parent: EntryId,
        key: &K,
        before: usize,
        pass: u64,
    ) -> Option<usize> {
        let entry = self.entry(parent)?;
        entry
            .children
            .iter()
            .enumerate()
            .take(before)
            .find(|&(_, &c)| self.stamp(c) < pass && self.key(c) == Some(key))
            .map(|(slot, _)| slot)
    }

    /// Like [`first_stale_group_before`](Self::first_stale_group_before)
    /// for node children (positional, no key).
    pub fn first_stale_node_before(
        &self,
        parent: EntryId,
        before: usize,
        pass: u64,
    ) -> Option<usize> {
        let entry = self.entry(parent)?;
        entry
            .children
            .iter()
            .enumerate()
            .take(before)
            .find(|&(_, &c)| self.stamp(c) < pass && self.is_node(c))
            .map(|(slot, _)| slot)
    }

    /// Unlink and return the child at `slot` without reclaiming it.
    pub fn remove_child(&mut self, parent: EntryId, slot: usize) -> Option<EntryId> {
        let entry = self.entry_mut(parent)?;
        if slot >= entry.children.len() {
            return None;
        }
        let child = entry.children.remove(slot);
        if let Some(entry) = self.entry_mut(child) {
            entry.parent = None;
        }
        Some(child)
    }
}
