#![forbid(unsafe_code)]

//! Retree public facade crate.
//!
//! Retree patches a caller-owned tree in place to match a declarative
//! description, reusing existing nodes wherever possible and emitting a
//! minimal sequence of insert/relocate/remove edits through a
//! caller-implemented port.
//!
//! This crate re-exports the stable surface from the internal crates and
//! offers a lightweight prelude for day-to-day usage. Most programs need
//! only [`TreeContext`], an [`Applier`] implementation over their node type,
//! and the [`Scope`] methods inside update closures.
//!
//! ```
//! use retree::prelude::*;
//!
//! struct Flat(Vec<&'static str>);
//!
//! impl Applier for Flat {
//!     type Node = &'static str;
//!     fn insert(&mut self, _parent: &&'static str, index: usize, child: &'static str) {
//!         self.0.insert(index, child);
//!     }
//!     fn remove(&mut self, _parent: &&'static str, index: usize, count: usize) {
//!         self.0.drain(index..index + count);
//!     }
//!     fn relocate(&mut self, _parent: &&'static str, from: usize, to: usize, count: usize) {
//!         let moved: Vec<_> = self.0.drain(from..from + count).collect();
//!         let to = if from < to { to - count } else { to };
//!         for (i, item) in moved.into_iter().enumerate() {
//!             self.0.insert(to + i, item);
//!         }
//!     }
//! }
//!
//! let mut ctx: TreeContext<u32, Flat> = TreeContext::new("root", Flat(Vec::new()));
//! ctx.update(|s| {
//!     s.group(1, |s| s.leaf(|_| "one"))?;
//!     s.group(2, |s| s.leaf(|_| "two"))
//! })?;
//! assert_eq!(ctx.applier().0, ["one", "two"]);
//! # Ok::<(), retree::ReconcileError>(())
//! ```

// --- Core re-exports -------------------------------------------------------

pub use retree_core::applier::Applier;
pub use retree_core::error::{EventKind, ReconcileError};
pub use retree_core::reconciler::{NodePhase, Reconciler};
pub use retree_core::shadow::{EntryId, EntryKind, ShadowTree};

// --- DSL re-exports --------------------------------------------------------

pub use retree_dsl::{Scope, TreeContext};

/// Standard result type for retree APIs.
pub type Result<T> = std::result::Result<T, ReconcileError>;

// --- Prelude ---------------------------------------------------------------

pub mod prelude {
    pub use crate::{Applier, NodePhase, ReconcileError, Result, Scope, TreeContext};
}
