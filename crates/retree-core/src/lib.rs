#![forbid(unsafe_code)]

//! Core reconciliation engine for Retree.
//!
//! A caller describes a tree declaratively in depth-first begin/end order and
//! the engine patches a previously built real tree in place to match,
//! emitting the minimum set of structural edits through a caller-supplied
//! [`Applier`].
//!
//! The engine is split into three pieces:
//!
//! - [`shadow`]: the bookkeeping arena that remembers the previous pass's
//!   structure (one entry per declared group or node).
//! - [`applier`]: the tree-mutation port the caller implements over its own
//!   node type. The engine never inspects node contents.
//! - [`reconciler`]: the event-driven state machine that decides, per
//!   declaration, whether to reuse, relocate, insert, or delete.
//!
//! Most users drive the engine through the closure-based front end in
//! `retree-dsl` rather than feeding events by hand.
//!
//! # Example
//!
//! Raw event feeding against a flat single-level tree:
//!
//! ```
//! use retree_core::applier::Applier;
//! use retree_core::reconciler::{NodePhase, Reconciler};
//!
//! struct Flat(Vec<char>);
//!
//! impl Applier for Flat {
//!     type Node = char;
//!     fn insert(&mut self, _parent: &char, index: usize, child: char) {
//!         self.0.insert(index, child);
//!     }
//!     fn remove(&mut self, _parent: &char, index: usize, count: usize) {
//!         self.0.drain(index..index + count);
//!     }
//!     fn relocate(&mut self, _parent: &char, from: usize, to: usize, count: usize) {
//!         let moved: Vec<char> = self.0.drain(from..from + count).collect();
//!         let to = if from < to { to - count } else { to };
//!         for (i, c) in moved.into_iter().enumerate() {
//!             self.0.insert(to + i, c);
//!         }
//!     }
//! }
//!
//! let mut tree = Flat(Vec::new());
//! let mut rec: Reconciler<&str, char> = Reconciler::new('/');
//!
//! rec.begin()?;
//! rec.enter_group(&mut tree, "a")?;
//! if rec.enter_node(&mut tree)? == NodePhase::Inserting {
//!     rec.insert_payload(&mut tree, 'a')?;
//! }
//! rec.end_node(&mut tree)?;
//! rec.end_group(&mut tree)?;
//! rec.finish(&mut tree)?;
//!
//! assert_eq!(tree.0, vec!['a']);
//! # Ok::<(), retree_core::ReconcileError>(())
//! ```

pub mod applier;
pub mod error;
pub mod reconciler;
pub mod shadow;

pub use applier::Applier;
pub use error::{EventKind, ReconcileError};
pub use reconciler::{NodePhase, Reconciler};
pub use shadow::{EntryId, EntryKind, ShadowTree};
