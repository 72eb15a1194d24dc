#![forbid(unsafe_code)]

//! Error types for the reconciliation engine.
//!
//! Both error kinds are fatal within a pass: a [`ReconcileError`] means the
//! pass must be abandoned and, for structural desyncs, the whole tree context
//! discarded. There is no retry or suppression anywhere in the engine.

use std::fmt;

/// The event that was being delivered when an error occurred.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    EnterGroup,
    EnterNode,
    InsertPayload,
    EndGroup,
    EndNode,
    Finish,
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::EnterGroup => "enter-group",
            Self::EnterNode => "enter-node",
            Self::InsertPayload => "insert-payload",
            Self::EndGroup => "end-group",
            Self::EndNode => "end-node",
            Self::Finish => "finish",
        };
        f.write_str(name)
    }
}

/// Fatal reconciliation failure.
///
/// Protocol variants signal a caller bug (events delivered in a state that
/// does not accept them). [`ReconcileError::Desync`] signals that the shadow
/// tree and the real tree have drifted apart, typically after an earlier
/// partially applied pass; recovery is to discard and rebuild the tree
/// context, not to patch the desync.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileError {
    /// An event was delivered while no update pass is active.
    Dormant(EventKind),
    /// `begin` was called while a pass is already active.
    AlreadyActive,
    /// `insert_payload` was called outside the inserting-node sub-state.
    UnexpectedPayload,
    /// A freshly inserted node was closed (or declared children) before its
    /// payload was supplied.
    MissingPayload,
    /// `end_group`/`end_node` did not match the kind of the open declaration.
    MismatchedEnd {
        /// Whether the open declaration is a node (true) or a group (false).
        expected_node: bool,
    },
    /// An end event would have closed the root scope of the pass.
    UnbalancedEnd,
    /// The pass was finished with declarations still open.
    UnclosedScope,
    /// The context was poisoned by an earlier failed pass.
    Poisoned,
    /// The shadow tree and the real tree have desynchronized.
    Desync(&'static str),
}

impl fmt::Display for ReconcileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Dormant(event) => {
                write!(f, "{event} delivered while no update pass is active")
            }
            Self::AlreadyActive => write!(f, "update pass already active"),
            Self::UnexpectedPayload => {
                write!(f, "insert-payload outside the inserting-node sub-state")
            }
            Self::MissingPayload => {
                write!(f, "node declaration closed before its payload was inserted")
            }
            Self::MismatchedEnd { expected_node: true } => {
                write!(f, "end-group delivered for an open node declaration")
            }
            Self::MismatchedEnd {
                expected_node: false,
            } => {
                write!(f, "end-node delivered for an open group declaration")
            }
            Self::UnbalancedEnd => write!(f, "end event underflowed the root scope"),
            Self::UnclosedScope => {
                write!(f, "pass finished with declarations still open")
            }
            Self::Poisoned => {
                write!(f, "tree context poisoned by an earlier failed pass")
            }
            Self::Desync(detail) => {
                write!(f, "shadow tree desynchronized from real tree: {detail}")
            }
        }
    }
}

impl std::error::Error for ReconcileError {}
