#![forbid(unsafe_code)]

//! The reconciler state machine.
//!
//! Consumes a depth-first event stream (enter-group(key), enter-node,
//! insert-payload(node), end) and on each event decides whether to reuse,
//! relocate, insert, or delete shadow entries and the corresponding real
//! nodes. Decisions are made online, without lookahead beyond the shadow
//! tree's record of the previous pass, and real-tree mutations are applied
//! synchronously through the [`Applier`] as they are decided.
//!
//! # State model
//!
//! Exactly one frame is active per open declaration, held on an explicit
//! stack (the original's suspended-coroutine processors become plain tagged
//! variants; nesting is supplied by the caller's own recursion):
//!
//! - `Validating`: replaying a previously declared level; as long as
//!   successive keys match in order, entries are reused and the cursor
//!   advances.
//! - `Modifying`: a key mismatched at the cursor. A declared key is first
//!   looked for *ahead* of the cursor: an ahead match is claimed in place,
//!   leaving the skipped siblings where they are. A key that matches a
//!   sibling skipped earlier in the same pass relocates that sibling to the
//!   cursor (one move). A key matching nothing inserts a fresh subtree.
//!   Siblings never claimed by the end of the level are stale and removed.
//!   Claiming ahead rather than dragging matches back to the cursor is what
//!   keeps edits minimal: `[A,B,C,D,E]` redeclared as `[A,C,D,B,E]` costs
//!   exactly one move (B past D), not one per displaced sibling.
//! - `Inserting`: everything declared at this level is known to be new.
//! - `NodeInserting`: restricted sub-state after an inserting enter-node;
//!   the only event it accepts is insert-payload.
//!
//! Claims are tracked by stamping shadow entries with the current pass
//! number; the cursor only ever has unclaimed entries at or ahead of it.
//!
//! An empty stack is the dormant state; delivering any event while dormant
//! is a protocol error. A full pass runs `begin` → events → `finish` and is
//! atomic: if it fails partway, the shadow tree is in an undefined
//! intermediate state and the context must be discarded.
//!
//! # Index accounting
//!
//! Each frame carries `base`: the real-tree child index of the frame entry's
//! first node within the current real parent. A child group's base is
//! `base + node_index_at(entry, slot)` for the slot it was claimed at;
//! descending into a node entry resets the base to 0 because its real node
//! becomes the current real parent. The shadow child order mirrors the real
//! child order at every point in the pass, so all port indices are plain
//! prefix sums over the shadow. Relocations are issued before any stale
//! removal of the same done-cycle, with both indices measured against the
//! tree as it stands.

use crate::applier::Applier;
use crate::error::{EventKind, ReconcileError};
use crate::shadow::{EntryId, ShadowTree};
use std::fmt;

#[cfg(feature = "tracing")]
use tracing::trace;

/// What `enter_node` decided for the current declaration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodePhase {
    /// The node is new; the caller must supply its payload via
    /// [`Reconciler::insert_payload`] before declaring children.
    Inserting,
    /// An existing node was matched (in place or after a relocation); no
    /// payload is expected.
    Reused,
}

/// One open declaration level.
#[derive(Debug, Clone, Copy)]
enum Frame {
    Inserting {
        entry: EntryId,
        base: usize,
    },
    NodeInserting {
        entry: EntryId,
        /// Real-tree index the payload will be inserted at.
        index: usize,
    },
    Validating {
        entry: EntryId,
        cursor: usize,
        base: usize,
    },
    Modifying {
        entry: EntryId,
        cursor: usize,
        base: usize,
    },
}

impl Frame {
    fn entry(&self) -> EntryId {
        match *self {
            Self::Inserting { entry, .. }
            | Self::NodeInserting { entry, .. }
            | Self::Validating { entry, .. }
            | Self::Modifying { entry, .. } => entry,
        }
    }
}

/// The tree-reconciliation engine.
///
/// Owns the shadow tree; the real tree stays with the caller and is mutated
/// only through the [`Applier`] passed to each event. Single-threaded and
/// non-reentrant: exactly one pass may be active at a time and the applier
/// must not call back into the engine.
pub struct Reconciler<K, N> {
    shadow: ShadowTree<K, N>,
    frames: Vec<Frame>,
    /// Stack of real parents; top receives all port calls. The bottom is the
    /// root handle for the whole pass.
    parents: Vec<N>,
    /// Current pass number, used to stamp claimed entries. Starts at 0
    /// (dormant, nothing stamped) and increments on every `begin`.
    pass: u64,
}

impl<K, N> Reconciler<K, N>
where
    K: Eq + fmt::Debug,
    N: Clone,
{
    /// Create a dormant engine over the given real root handle.
    pub fn new(root: N) -> Self {
        Self {
            shadow: ShadowTree::new(root),
            frames: Vec::new(),
            parents: Vec::new(),
            pass: 0,
        }
    }

    /// Whether an update pass is in progress.
    #[inline]
    pub fn is_active(&self) -> bool {
        !self.frames.is_empty()
    }

    /// Read access to the shadow tree, for index queries and tests.
    #[inline]
    pub fn shadow(&self) -> &ShadowTree<K, N> {
        &self.shadow
    }

    /// Start an update pass. Errors if one is already active.
    pub fn begin(&mut self) -> Result<(), ReconcileError> {
        if self.is_active() {
            return Err(ReconcileError::AlreadyActive);
        }
        let root = self.shadow.root();
        let node = self
            .shadow
            .node(root)
            .cloned()
            .ok_or(ReconcileError::Desync("root entry lost its real node"))?;
        self.pass += 1;
        self.shadow.set_stamp(root, self.pass);
        self.parents.push(node);
        self.frames.push(Frame::Validating {
            entry: root,
            cursor: 0,
            base: 0,
        });
        #[cfg(feature = "tracing")]
        trace!(pass = self.pass, "update pass started");
        Ok(())
    }

    /// Finish the pass: retire the root's stale children and return to
    /// dormant.
    pub fn finish<A>(&mut self, applier: &mut A) -> Result<(), ReconcileError>
    where
        A: Applier<Node = N>,
    {
        match self.frames.len() {
            0 => Err(ReconcileError::Dormant(EventKind::Finish)),
            1 => {
                self.retire_stale(applier)?;
                self.frames.pop();
                self.parents.pop();
                #[cfg(feature = "tracing")]
                trace!(pass = self.pass, "update pass finished");
                Ok(())
            }
            _ => Err(ReconcileError::UnclosedScope),
        }
    }

    /// Reset to a freshly built state over the same real root handle,
    /// forgetting all declared structure. The caller is responsible for
    /// having cleared the corresponding real children.
    pub fn reset(&mut self) -> Result<(), ReconcileError> {
        let node = self
            .shadow
            .node(self.shadow.root())
            .cloned()
            .ok_or(ReconcileError::Desync("root entry lost its real node"))?;
        self.shadow = ShadowTree::new(node);
        self.frames.clear();
        self.parents.clear();
        self.pass = 0;
        Ok(())
    }

    fn current_parent(&self) -> Result<N, ReconcileError> {
        self.parents
            .last()
            .cloned()
            .ok_or(ReconcileError::Desync("no real parent on the stack"))
    }

    /// Declare a keyed group boundary. Must be matched by `end_group`.
    pub fn enter_group<A>(&mut self, applier: &mut A, key: K) -> Result<(), ReconcileError>
    where
        A: Applier<Node = N>,
    {
        let top = self
            .frames
            .len()
            .checked_sub(1)
            .ok_or(ReconcileError::Dormant(EventKind::EnterGroup))?;
        match self.frames[top] {
            Frame::NodeInserting { .. } => Err(ReconcileError::MissingPayload),
            Frame::Inserting { entry, base } => {
                let slot = self.shadow.child_count(entry);
                let child_base = base + self.shadow.node_index_at(entry, slot);
                let child = self.shadow.alloc_group(key);
                self.shadow.set_stamp(child, self.pass);
                self.shadow.insert_child(entry, slot, child);
                self.frames.push(Frame::Inserting {
                    entry: child,
                    base: child_base,
                });
                Ok(())
            }
            Frame::Validating {
                entry,
                cursor,
                base,
            } => {
                if let Some(child) = self.shadow.child_at(entry, cursor) {
                    if self.shadow.key(child) == Some(&key) {
                        self.claim_group(top, child, cursor)?;
                        return Ok(());
                    }
                }
                self.frames[top] = Frame::Modifying {
                    entry,
                    cursor,
                    base,
                };
                self.modify_group(applier, top, key)
            }
            Frame::Modifying { .. } => self.modify_group(applier, top, key),
        }
    }

    /// Modifying-state dispatch for `enter_group`: claim an ahead match in
    /// place, relocate a skipped sibling back to the cursor, or insert a new
    /// group.
    fn modify_group<A>(
        &mut self,
        applier: &mut A,
        top: usize,
        key: K,
    ) -> Result<(), ReconcileError>
    where
        A: Applier<Node = N>,
    {
        let Frame::Modifying {
            entry,
            cursor,
            base,
        } = self.frames[top]
        else {
            return Err(ReconcileError::Desync("group dispatch on a foreign frame"));
        };
        if let Some(found) = self.shadow.first_group_after(entry, &key, cursor) {
            // Ahead match: claim where it stands; skipped siblings are
            // either claimed later (relocated then) or retired as stale.
            let child = self
                .shadow
                .child_at(entry, found)
                .ok_or(ReconcileError::Desync("matched group child vanished"))?;
            self.claim_group(top, child, found)?;
            return Ok(());
        }
        if let Some(found) = self
            .shadow
            .first_stale_group_before(entry, &key, cursor, self.pass)
        {
            let slot = self.relocate_laggard(applier, entry, cursor, base, found)?;
            let child = self
                .shadow
                .child_at(entry, slot)
                .ok_or(ReconcileError::Desync("relocated group child vanished"))?;
            self.claim_group(top, child, slot)?;
            return Ok(());
        }
        let child_base = base + self.shadow.node_index_at(entry, cursor);
        let child = self.shadow.alloc_group(key);
        self.shadow.set_stamp(child, self.pass);
        self.shadow.insert_child(entry, cursor, child);
        self.frames.push(Frame::Inserting {
            entry: child,
            base: child_base,
        });
        Ok(())
    }

    /// Stamp a matched group child, reposition the parent cursor onto its
    /// slot, and descend into it for validation. Claims only originate from
    /// validating/modifying dispatch.
    fn claim_group(&mut self, top: usize, child: EntryId, slot: usize) -> Result<(), ReconcileError> {
        self.shadow.set_stamp(child, self.pass);
        let (entry, base) = match &mut self.frames[top] {
            Frame::Validating { entry, cursor, base }
            | Frame::Modifying {
                entry,
                cursor,
                base,
            } => {
                *cursor = slot;
                (*entry, *base)
            }
            Frame::Inserting { .. } | Frame::NodeInserting { .. } => {
                return Err(ReconcileError::Desync("group claim on a foreign frame"));
            }
        };
        let child_base = base + self.shadow.node_index_at(entry, slot);
        self.frames.push(Frame::Validating {
            entry: child,
            cursor: 0,
            base: child_base,
        });
        Ok(())
    }

    /// Relocate a sibling that was skipped earlier in this pass (slot
    /// `found`, before the cursor) to the cursor position, emitting one
    /// port move. Returns the slot the child now occupies.
    ///
    /// Port indices are measured before the splice; `from < to` here, so
    /// the applier collapses the destination by the moved count. The call is
    /// suppressed when every sibling between `found` and the cursor subtends
    /// zero real nodes (`to == from + count`): the real tree would not
    /// change.
    fn relocate_laggard<A>(
        &mut self,
        applier: &mut A,
        entry: EntryId,
        cursor: usize,
        base: usize,
        found: usize,
    ) -> Result<usize, ReconcileError>
    where
        A: Applier<Node = N>,
    {
        let child = self
            .shadow
            .child_at(entry, found)
            .ok_or(ReconcileError::Desync("skipped child slot out of range"))?;
        let count = self.shadow.node_count(child);
        if count > 0 {
            let from = base + self.shadow.node_index_at(entry, found);
            let to = base + self.shadow.node_index_at(entry, cursor);
            if to > from + count {
                let parent = self.current_parent()?;
                applier.relocate(&parent, from, to, count);
                #[cfg(feature = "tracing")]
                trace!(from, to, count, "relocate");
            }
        }
        self.shadow.splice(entry, found, cursor);
        Ok(cursor - 1)
    }

    /// Declare an entry that corresponds to exactly one real node. Must be
    /// matched by `end_node`.
    ///
    /// When the returned phase is [`NodePhase::Inserting`], the only legal
    /// next event is [`insert_payload`](Self::insert_payload).
    pub fn enter_node<A>(&mut self, applier: &mut A) -> Result<NodePhase, ReconcileError>
    where
        A: Applier<Node = N>,
    {
        let top = self
            .frames
            .len()
            .checked_sub(1)
            .ok_or(ReconcileError::Dormant(EventKind::EnterNode))?;
        match self.frames[top] {
            Frame::NodeInserting { .. } => Err(ReconcileError::MissingPayload),
            Frame::Inserting { entry, base } => {
                let slot = self.shadow.child_count(entry);
                let index = base + self.shadow.node_index_at(entry, slot);
                let child = self.shadow.alloc_node();
                self.shadow.set_stamp(child, self.pass);
                self.shadow.insert_child(entry, slot, child);
                self.frames.push(Frame::NodeInserting {
                    entry: child,
                    index,
                });
                Ok(NodePhase::Inserting)
            }
            Frame::Validating {
                entry,
                cursor,
                base,
            } => {
                if let Some(child) = self.shadow.child_at(entry, cursor) {
                    if self.shadow.is_node(child) {
                        self.claim_node(top, child, cursor)?;
                        return Ok(NodePhase::Reused);
                    }
                }
                self.frames[top] = Frame::Modifying {
                    entry,
                    cursor,
                    base,
                };
                self.modify_node(applier, top)
            }
            Frame::Modifying { .. } => self.modify_node(applier, top),
        }
    }

    /// Modifying-state dispatch for `enter_node`. Nodes carry no caller
    /// key; the first remaining node child wins (positional reuse).
    fn modify_node<A>(&mut self, applier: &mut A, top: usize) -> Result<NodePhase, ReconcileError>
    where
        A: Applier<Node = N>,
    {
        let Frame::Modifying {
            entry,
            cursor,
            base,
        } = self.frames[top]
        else {
            return Err(ReconcileError::Desync("node dispatch on a foreign frame"));
        };
        if let Some(found) = self.shadow.first_node_after(entry, cursor) {
            let child = self
                .shadow
                .child_at(entry, found)
                .ok_or(ReconcileError::Desync("matched node child vanished"))?;
            self.claim_node(top, child, found)?;
            return Ok(NodePhase::Reused);
        }
        if let Some(found) = self
            .shadow
            .first_stale_node_before(entry, cursor, self.pass)
        {
            let slot = self.relocate_laggard(applier, entry, cursor, base, found)?;
            let child = self
                .shadow
                .child_at(entry, slot)
                .ok_or(ReconcileError::Desync("relocated node child vanished"))?;
            self.claim_node(top, child, slot)?;
            return Ok(NodePhase::Reused);
        }
        let index = base + self.shadow.node_index_at(entry, cursor);
        let child = self.shadow.alloc_node();
        self.shadow.set_stamp(child, self.pass);
        self.shadow.insert_child(entry, cursor, child);
        self.frames.push(Frame::NodeInserting {
            entry: child,
            index,
        });
        Ok(NodePhase::Inserting)
    }

    /// Stamp a matched node child, reposition the parent cursor, and
    /// descend: its real node becomes the current real parent and child
    /// indexing restarts at 0.
    fn claim_node(&mut self, top: usize, child: EntryId, slot: usize) -> Result<(), ReconcileError> {
        let node = self
            .shadow
            .node(child)
            .cloned()
            .ok_or(ReconcileError::Desync("node entry has no recorded node"))?;
        self.shadow.set_stamp(child, self.pass);
        match &mut self.frames[top] {
            Frame::Validating { cursor, .. } | Frame::Modifying { cursor, .. } => *cursor = slot,
            Frame::Inserting { .. } | Frame::NodeInserting { .. } => {
                return Err(ReconcileError::Desync("node claim on a foreign frame"));
            }
        }
        self.parents.push(node);
        self.frames.push(Frame::Validating {
            entry: child,
            cursor: 0,
            base: 0,
        });
        Ok(())
    }

    /// Supply the real node for the declaration opened by an inserting
    /// `enter_node`. Legal only as the first event after that call.
    pub fn insert_payload<A>(&mut self, applier: &mut A, node: N) -> Result<(), ReconcileError>
    where
        A: Applier<Node = N>,
    {
        let top = self
            .frames
            .len()
            .checked_sub(1)
            .ok_or(ReconcileError::Dormant(EventKind::InsertPayload))?;
        let Frame::NodeInserting { entry, index } = self.frames[top] else {
            return Err(ReconcileError::UnexpectedPayload);
        };
        let parent = self.current_parent()?;
        applier.insert(&parent, index, node.clone());
        #[cfg(feature = "tracing")]
        trace!(index, "insert");
        self.shadow.set_node(entry, node.clone());
        self.parents.push(node);
        self.frames[top] = Frame::Inserting { entry, base: 0 };
        Ok(())
    }

    /// Close the innermost open group declaration.
    pub fn end_group<A>(&mut self, applier: &mut A) -> Result<(), ReconcileError>
    where
        A: Applier<Node = N>,
    {
        self.leave(applier, false, EventKind::EndGroup)
    }

    /// Close the innermost open node declaration.
    pub fn end_node<A>(&mut self, applier: &mut A) -> Result<(), ReconcileError>
    where
        A: Applier<Node = N>,
    {
        self.leave(applier, true, EventKind::EndNode)
    }

    fn leave<A>(
        &mut self,
        applier: &mut A,
        want_node: bool,
        event: EventKind,
    ) -> Result<(), ReconcileError>
    where
        A: Applier<Node = N>,
    {
        let top = self
            .frames
            .len()
            .checked_sub(1)
            .ok_or(ReconcileError::Dormant(event))?;
        if top == 0 {
            // Only the root frame is open; the caller closed more
            // declarations than it opened.
            return Err(ReconcileError::UnbalancedEnd);
        }
        if matches!(self.frames[top], Frame::NodeInserting { .. }) {
            return Err(ReconcileError::MissingPayload);
        }
        let entry = self.frames[top].entry();
        let is_node = self.shadow.is_node(entry);
        if is_node != want_node {
            return Err(ReconcileError::MismatchedEnd {
                expected_node: is_node,
            });
        }
        self.retire_stale(applier)?;
        self.frames.pop();
        if is_node {
            self.parents.pop();
        }
        if let Some(parent) = self.frames.last_mut() {
            match parent {
                Frame::Validating { cursor, .. } | Frame::Modifying { cursor, .. } => *cursor += 1,
                Frame::Inserting { .. } | Frame::NodeInserting { .. } => {}
            }
        }
        Ok(())
    }

    /// Done step: children of the top frame not stamped by the current pass
    /// are stale. Emits one removal per contiguous stale run (back to front
    /// so earlier indices stay valid), then reclaims the shadow entries.
    /// Inserting levels have nothing stale by construction.
    fn retire_stale<A>(&mut self, applier: &mut A) -> Result<(), ReconcileError>
    where
        A: Applier<Node = N>,
    {
        let (entry, base) = match self.frames.last() {
            Some(&Frame::Validating { entry, base, .. } | &Frame::Modifying { entry, base, .. }) => {
                (entry, base)
            }
            Some(&Frame::Inserting { .. } | &Frame::NodeInserting { .. }) => return Ok(()),
            None => return Err(ReconcileError::Dormant(EventKind::Finish)),
        };

        // Gather contiguous runs of stale children: (first slot, slot count,
        // real index of the run start, real node count).
        let len = self.shadow.child_count(entry);
        let mut runs: Vec<(usize, usize, usize, usize)> = Vec::new();
        let mut real = 0usize;
        for slot in 0..len {
            let child = self
                .shadow
                .child_at(entry, slot)
                .ok_or(ReconcileError::Desync("child list shrank during retire"))?;
            let nodes = self.shadow.node_count(child);
            if self.shadow.stamp(child) < self.pass {
                match runs.last_mut() {
                    Some(run) if run.0 + run.1 == slot => {
                        run.1 += 1;
                        run.3 += nodes;
                    }
                    _ => runs.push((slot, 1, real, nodes)),
                }
            }
            real += nodes;
        }
        if runs.is_empty() {
            return Ok(());
        }

        let parent = self.current_parent()?;
        for &(slot, slots, real_start, nodes) in runs.iter().rev() {
            if nodes > 0 {
                applier.remove(&parent, base + real_start, nodes);
                #[cfg(feature = "tracing")]
                trace!(index = base + real_start, count = nodes, "remove stale run");
            }
            for s in (slot..slot + slots).rev() {
                if let Some(stale) = self.shadow.remove_child(entry, s) {
                    self.shadow.free_subtree(stale);
                }
            }
        }
        Ok(())
    }
}

impl<K, N> fmt::Debug for Reconciler<K, N>
where
    K: fmt::Debug,
    N: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Reconciler")
            .field("active", &!self.frames.is_empty())
            .field("depth", &self.frames.len())
            .field("pass", &self.pass)
            .finish_non_exhaustive()
    }
}
