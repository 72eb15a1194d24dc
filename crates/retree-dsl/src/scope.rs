#![forbid(unsafe_code)]

//! The declaration scope handed to update closures.

use retree_core::{Applier, NodePhase, ReconcileError, Reconciler};
use std::fmt;

/// Cursor into an in-progress update pass.
///
/// A `Scope` does not itself track nesting; it forwards declarations to the
/// engine one event at a time, and the engine's frame stack mirrors the
/// caller's closure nesting. Structural protocol rules (matched enter/end
/// pairs, payload before children) are therefore upheld by construction:
/// content closures receive the same `&mut Scope` and simply declare in
/// order.
pub struct Scope<'a, K, A: Applier> {
    rec: &'a mut Reconciler<K, A::Node>,
    applier: &'a mut A,
}

impl<'a, K, A> Scope<'a, K, A>
where
    K: Eq + fmt::Debug,
    A: Applier,
{
    pub(crate) fn new(rec: &'a mut Reconciler<K, A::Node>, applier: &'a mut A) -> Self {
        Self { rec, applier }
    }

    /// Declare a keyed group: a relocatable, reusable boundary that
    /// corresponds to no real node. `content` declares its children.
    pub fn group<F>(&mut self, key: K, content: F) -> Result<(), ReconcileError>
    where
        F: FnOnce(&mut Self) -> Result<(), ReconcileError>,
    {
        self.rec.enter_group(self.applier, key)?;
        content(self)?;
        self.rec.end_group(self.applier)
    }

    /// Declare an entry producing exactly one real node. `create` is called
    /// only when the engine decides the node is new, and receives the
    /// applier so it can allocate; `content` declares the children living
    /// inside the node.
    pub fn node<C, F>(&mut self, create: C, content: F) -> Result<(), ReconcileError>
    where
        C: FnOnce(&mut A) -> A::Node,
        F: FnOnce(&mut Self) -> Result<(), ReconcileError>,
    {
        if self.rec.enter_node(self.applier)? == NodePhase::Inserting {
            let node = create(self.applier);
            self.rec.insert_payload(self.applier, node)?;
        }
        content(self)?;
        self.rec.end_node(self.applier)
    }

    /// Declare a childless node. Shorthand for [`node`](Self::node) with
    /// empty content.
    pub fn leaf<C>(&mut self, create: C) -> Result<(), ReconcileError>
    where
        C: FnOnce(&mut A) -> A::Node,
    {
        self.node(create, |_| Ok(()))
    }

    /// The applier, for reads or mutations between declarations.
    pub fn applier(&mut self) -> &mut A {
        self.applier
    }
}

impl<K, A> fmt::Debug for Scope<'_, K, A>
where
    K: fmt::Debug,
    A: Applier,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scope").finish_non_exhaustive()
    }
}
