#![forbid(unsafe_code)]

//! Owning wrapper tying an engine to its applier.

use crate::scope::Scope;
use retree_core::{Applier, ReconcileError, Reconciler, ShadowTree};
use std::fmt;

/// A reconciliation context: the engine, the applier, and the real root
/// handle, driven one atomic pass at a time through [`update`](Self::update).
///
/// # Poisoning
///
/// A pass that fails leaves the shadow tree out of step with the real tree
/// in an unspecified way. The context records this and refuses further
/// passes with [`ReconcileError::Poisoned`]; the only way forward is to
/// rebuild a fresh context over a cleaned-up real tree.
pub struct TreeContext<K, A: Applier> {
    rec: Reconciler<K, A::Node>,
    applier: A,
    root: A::Node,
    poisoned: bool,
}

impl<K, A> TreeContext<K, A>
where
    K: Eq + fmt::Debug,
    A: Applier,
{
    /// Create a context over the given real root handle.
    pub fn new(root: A::Node, applier: A) -> Self {
        Self {
            rec: Reconciler::new(root.clone()),
            applier,
            root,
            poisoned: false,
        }
    }

    /// Run one full update pass: the closure declares the entire desired
    /// tree under the root, and the real tree is edited to match as the
    /// declarations arrive.
    ///
    /// Any error, whether from the closure or from the engine, poisons the
    /// context.
    pub fn update<F>(&mut self, content: F) -> Result<(), ReconcileError>
    where
        F: FnOnce(&mut Scope<'_, K, A>) -> Result<(), ReconcileError>,
    {
        if self.poisoned {
            return Err(ReconcileError::Poisoned);
        }
        self.rec.begin()?;
        let result = {
            let mut scope = Scope::new(&mut self.rec, &mut self.applier);
            content(&mut scope)
        };
        let result = result.and_then(|()| self.rec.finish(&mut self.applier));
        if result.is_err() {
            self.poisoned = true;
        }
        result
    }

    /// Remove every real child of the root and forget all declared
    /// structure, as one `remove` port call. The context stays usable.
    pub fn clear(&mut self) -> Result<(), ReconcileError> {
        if self.poisoned {
            return Err(ReconcileError::Poisoned);
        }
        if self.rec.is_active() {
            return Err(ReconcileError::AlreadyActive);
        }
        let shadow = self.rec.shadow();
        let root = shadow.root();
        let count = shadow.node_index_at(root, shadow.child_count(root));
        if count > 0 {
            self.applier.remove(&self.root, 0, count);
        }
        self.rec.reset()
    }

    /// Whether a failed pass has made the context unusable.
    pub fn is_poisoned(&self) -> bool {
        self.poisoned
    }

    /// The real root handle this context reconciles under.
    pub fn root(&self) -> &A::Node {
        &self.root
    }

    /// The applier.
    pub fn applier(&self) -> &A {
        &self.applier
    }

    /// Mutable access to the applier between passes.
    pub fn applier_mut(&mut self) -> &mut A {
        &mut self.applier
    }

    /// The engine's shadow tree, for index queries and assertions.
    pub fn shadow(&self) -> &ShadowTree<K, A::Node> {
        self.rec.shadow()
    }
}

impl<K, A> fmt::Debug for TreeContext<K, A>
where
    K: fmt::Debug,
    A: Applier,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TreeContext")
            .field("poisoned", &self.poisoned)
            .finish_non_exhaustive()
    }
}
