#![forbid(unsafe_code)]

//! Declarative front end for the Retree reconciler.
//!
//! The engine in `retree-core` consumes one event per declaration. This
//! crate lets callers write those declarations in ordinary nested-call
//! style: [`TreeContext::update`] opens an atomic pass and hands the closure
//! a [`Scope`] whose `group`/`node` methods emit the matching enter/end
//! event pairs around the caller's nested content.
//!
//! Where the system this was modeled on suspends the caller's call stack
//! between events, here plain synchronous calls suffice: each declaration
//! runs to a routing decision before its content executes, and Rust's own
//! nesting supplies the recursion.
//!
//! # Example
//!
//! ```
//! use retree_core::Applier;
//! use retree_dsl::TreeContext;
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
//! let mut ctx: TreeContext<&str, Flat> = TreeContext::new('/', Flat(Vec::new()));
//!
//! ctx.update(|s| {
//!     s.group("first", |s| s.leaf(|_| 'x'))?;
//!     s.group("second", |s| s.leaf(|_| 'y'))
//! })?;
//! assert_eq!(ctx.applier().0, vec!['x', 'y']);
//!
//! // Swapping the groups relocates the existing nodes instead of
//! // rebuilding them.
//! ctx.update(|s| {
//!     s.group("second", |s| s.leaf(|_| 'y'))?;
//!     s.group("first", |s| s.leaf(|_| 'x'))
//! })?;
//! assert_eq!(ctx.applier().0, vec!['y', 'x']);
//! # Ok::<(), retree_core::ReconcileError>(())
//! ```

mod context;
mod scope;

pub use context::TreeContext;
pub use scope::Scope;

// Callers of the DSL need these to name their types and handle errors.
pub use retree_core::{Applier, NodePhase, ReconcileError};
