//! Integration tests for the declarative front end over a recording tree.
//!
//! Exercises the observable contract of a full update pass:
//! - Idempotence: redeclaring the same tree emits zero port calls
//! - Reordering: a displaced sibling costs exactly one relocation
//! - Deletion: a dropped contiguous run costs exactly one removal
//! - Insertion: a new mid-list sibling costs exactly one insertion
//! - Index arithmetic through nested groups and node boundaries
//! - Duplicate keys resolving in declaration order

use retree_dsl::TreeContext;
use retree_harness::{PortCall, Recording, TestTree};

type Ctx = TreeContext<&'static str, Recording<TestTree>>;

fn new_ctx() -> Ctx {
    let tree = TestTree::new();
    let root = tree.root();
    TreeContext::new(root, Recording::new(tree))
}

fn labels(ctx: &Ctx) -> Vec<String> {
    let root = *ctx.root();
    ctx.applier().inner().labels(root)
}

/// Declare one flat level: one keyed group per key, each holding one leaf
/// labeled like its key.
fn render_flat(ctx: &mut Ctx, keys: &[&'static str]) {
    ctx.update(|s| {
        for &key in keys {
            s.group(key, |s| s.leaf(|t| t.inner_mut().alloc(key)))?;
        }
        Ok(())
    })
    .unwrap();
}

// ============================================================================
// Flat-level edit cost
// ============================================================================

#[test]
fn identical_redeclaration_is_silent() {
    let mut ctx = new_ctx();
    render_flat(&mut ctx, &["a", "b", "c", "d"]);
    ctx.applier_mut().take_calls();

    render_flat(&mut ctx, &["a", "b", "c", "d"]);
    assert!(ctx.applier().calls().is_empty());
    assert_eq!(labels(&ctx), ["a", "b", "c", "d"]);
}

#[test]
fn one_displaced_sibling_costs_one_move() {
    let mut ctx = new_ctx();
    render_flat(&mut ctx, &["a", "b", "c", "d", "e"]);
    ctx.applier_mut().take_calls();

    // Only "b" moved; "c" and "d" must be claimed where they stand.
    render_flat(&mut ctx, &["a", "c", "d", "b", "e"]);
    assert_eq!(
        ctx.applier_mut().take_calls(),
        vec![PortCall::Relocate {
            from: 1,
            to: 4,
            count: 1
        }]
    );
    assert_eq!(labels(&ctx), ["a", "c", "d", "b", "e"]);
}

#[test]
fn dropped_run_costs_one_remove_and_no_moves() {
    let mut ctx = new_ctx();
    render_flat(&mut ctx, &["a", "b", "c", "d"]);
    ctx.applier_mut().take_calls();

    render_flat(&mut ctx, &["a", "d"]);
    assert_eq!(
        ctx.applier_mut().take_calls(),
        vec![PortCall::Remove { index: 1, count: 2 }]
    );
    assert_eq!(labels(&ctx), ["a", "d"]);
}

#[test]
fn disjoint_dropped_runs_cost_one_remove_each() {
    let mut ctx = new_ctx();
    render_flat(&mut ctx, &["a", "b", "c", "d", "e"]);
    ctx.applier_mut().take_calls();

    render_flat(&mut ctx, &["a", "c", "e"]);
    // Back to front, so the earlier index is still valid when used.
    assert_eq!(
        ctx.applier_mut().take_calls(),
        vec![
            PortCall::Remove { index: 3, count: 1 },
            PortCall::Remove { index: 1, count: 1 },
        ]
    );
    assert_eq!(labels(&ctx), ["a", "c", "e"]);
}

#[test]
fn midlist_insertion_costs_one_insert() {
    let mut ctx = new_ctx();
    render_flat(&mut ctx, &["a", "c"]);
    ctx.applier_mut().take_calls();

    render_flat(&mut ctx, &["a", "b", "c"]);
    assert_eq!(
        ctx.applier_mut().take_calls(),
        vec![PortCall::Insert { index: 1 }]
    );
    assert_eq!(labels(&ctx), ["a", "b", "c"]);
}

#[test]
fn full_reversal_reuses_every_node() {
    let mut ctx = new_ctx();
    render_flat(&mut ctx, &["a", "b", "c"]);
    let handles: Vec<_> = ctx.applier().inner().children(*ctx.root()).to_vec();
    ctx.applier_mut().take_calls();

    render_flat(&mut ctx, &["c", "b", "a"]);
    assert_eq!(labels(&ctx), ["c", "b", "a"]);
    // No inserts or removes: the same real nodes, reordered.
    assert!(ctx
        .applier()
        .calls()
        .iter()
        .all(|call| matches!(call, PortCall::Relocate { .. })));
    let mut reversed: Vec<_> = ctx.applier().inner().children(*ctx.root()).to_vec();
    reversed.reverse();
    assert_eq!(handles, reversed);
}

// ============================================================================
// Groups and keys
// ============================================================================

#[test]
fn groups_without_nodes_reorder_silently() {
    let mut ctx = new_ctx();
    ctx.update(|s| {
        s.group("a", |s| s.leaf(|t| t.inner_mut().alloc("a")))?;
        s.group("empty", |_| Ok(()))?;
        s.group("b", |s| s.leaf(|t| t.inner_mut().alloc("b")))
    })
    .unwrap();
    assert_eq!(labels(&ctx), ["a", "b"]);
    ctx.applier_mut().take_calls();

    // Moving the empty group shuffles no real nodes, so nothing reaches the
    // port.
    ctx.update(|s| {
        s.group("empty", |_| Ok(()))?;
        s.group("a", |s| s.leaf(|t| t.inner_mut().alloc("a")))?;
        s.group("b", |s| s.leaf(|t| t.inner_mut().alloc("b")))
    })
    .unwrap();
    assert!(ctx.applier().calls().is_empty());
    assert_eq!(labels(&ctx), ["a", "b"]);
}

#[test]
fn duplicate_keys_resolve_in_declaration_order() {
    let mut ctx = new_ctx();
    ctx.update(|s| {
        s.group("x", |s| s.leaf(|t| t.inner_mut().alloc("first")))?;
        s.group("x", |s| s.leaf(|t| t.inner_mut().alloc("second")))
    })
    .unwrap();
    ctx.applier_mut().take_calls();

    // Both duplicates match positionally, in order; adding a third appends.
    ctx.update(|s| {
        s.group("x", |s| s.leaf(|t| t.inner_mut().alloc("first")))?;
        s.group("x", |s| s.leaf(|t| t.inner_mut().alloc("second")))?;
        s.group("x", |s| s.leaf(|t| t.inner_mut().alloc("third")))
    })
    .unwrap();
    assert_eq!(
        ctx.applier_mut().take_calls(),
        vec![PortCall::Insert { index: 2 }]
    );
    assert_eq!(labels(&ctx), ["first", "second", "third"]);
}

#[test]
fn group_contents_replace_when_key_changes() {
    let mut ctx = new_ctx();
    render_flat(&mut ctx, &["a", "b"]);
    ctx.applier_mut().take_calls();

    // A new key means a new group: "b" is rebuilt as "z", not reused.
    render_flat(&mut ctx, &["a", "z"]);
    assert_eq!(
        ctx.applier_mut().take_calls(),
        vec![
            PortCall::Insert { index: 1 },
            PortCall::Remove { index: 2, count: 1 },
        ]
    );
    assert_eq!(labels(&ctx), ["a", "z"]);
}

// ============================================================================
// Nesting and index arithmetic
// ============================================================================

/// Declare a header node with two inner leaves, a body group holding a
/// keyed list plus a separator leaf, and a footer leaf.
fn render_page(ctx: &mut Ctx, items: &[&'static str]) {
    ctx.update(|s| {
        s.group("header", |s| {
            s.node(
                |t| t.inner_mut().alloc("h"),
                |s| {
                    s.leaf(|t| t.inner_mut().alloc("h1"))?;
                    s.leaf(|t| t.inner_mut().alloc("h2"))
                },
            )
        })?;
        s.group("body", |s| {
            s.group("list", |s| {
                for &item in items {
                    s.group(item, |s| s.leaf(|t| t.inner_mut().alloc(item)))?;
                }
                Ok(())
            })?;
            s.leaf(|t| t.inner_mut().alloc("sep"))
        })?;
        s.group("footer", |s| s.leaf(|t| t.inner_mut().alloc("f")))
    })
    .unwrap();
}

#[test]
fn nested_levels_build_with_correct_indices() {
    let mut ctx = new_ctx();
    render_page(&mut ctx, &["i0", "i1"]);

    assert_eq!(labels(&ctx), ["h", "i0", "i1", "sep", "f"]);
    let header = ctx.applier().inner().children(*ctx.root())[0];
    assert_eq!(ctx.applier().inner().labels(header), ["h1", "h2"]);
    // Header children index inside the header node, not at the root.
    assert_eq!(
        ctx.applier_mut().take_calls(),
        vec![
            PortCall::Insert { index: 0 }, // h
            PortCall::Insert { index: 0 }, // h1, inside h
            PortCall::Insert { index: 1 }, // h2, inside h
            PortCall::Insert { index: 1 }, // i0
            PortCall::Insert { index: 2 }, // i1
            PortCall::Insert { index: 3 }, // sep
            PortCall::Insert { index: 4 }, // f
        ]
    );
}

#[test]
fn list_edits_offset_past_enclosing_siblings() {
    let mut ctx = new_ctx();
    render_page(&mut ctx, &["i0", "i1", "i2"]);
    assert_eq!(labels(&ctx), ["h", "i0", "i1", "i2", "sep", "f"]);
    ctx.applier_mut().take_calls();

    // Reorder the list to [i2, i0] and drop i1. The list lives after the
    // header's single root-level node, so every port index is shifted by 1.
    render_page(&mut ctx, &["i2", "i0"]);
    assert_eq!(
        ctx.applier_mut().take_calls(),
        vec![
            PortCall::Relocate {
                from: 1,
                to: 4,
                count: 1
            },
            PortCall::Remove { index: 1, count: 1 },
        ]
    );
    assert_eq!(labels(&ctx), ["h", "i2", "i0", "sep", "f"]);

    // The header's inner level is untouched throughout.
    let header = ctx.applier().inner().children(*ctx.root())[0];
    assert_eq!(ctx.applier().inner().labels(header), ["h1", "h2"]);
}

#[test]
fn relocating_a_group_moves_its_whole_node_range() {
    let mut ctx = new_ctx();
    ctx.update(|s| {
        s.group("pair", |s| {
            s.leaf(|t| t.inner_mut().alloc("p0"))?;
            s.leaf(|t| t.inner_mut().alloc("p1"))
        })?;
        s.group("tail", |s| s.leaf(|t| t.inner_mut().alloc("t")))
    })
    .unwrap();
    assert_eq!(labels(&ctx), ["p0", "p1", "t"]);
    ctx.applier_mut().take_calls();

    ctx.update(|s| {
        s.group("tail", |s| s.leaf(|t| t.inner_mut().alloc("t")))?;
        s.group("pair", |s| {
            s.leaf(|t| t.inner_mut().alloc("p0"))?;
            s.leaf(|t| t.inner_mut().alloc("p1"))
        })
    })
    .unwrap();
    // Both of the pair's nodes travel in one relocation.
    assert_eq!(
        ctx.applier_mut().take_calls(),
        vec![PortCall::Relocate {
            from: 0,
            to: 3,
            count: 2
        }]
    );
    assert_eq!(labels(&ctx), ["t", "p0", "p1"]);
}

#[test]
fn dropping_a_subtree_costs_one_remove_of_its_range() {
    let mut ctx = new_ctx();
    ctx.update(|s| {
        s.group("pair", |s| {
            s.leaf(|t| t.inner_mut().alloc("p0"))?;
            s.leaf(|t| t.inner_mut().alloc("p1"))
        })?;
        s.group("tail", |s| s.leaf(|t| t.inner_mut().alloc("t")))
    })
    .unwrap();
    ctx.applier_mut().take_calls();

    ctx.update(|s| s.group("tail", |s| s.leaf(|t| t.inner_mut().alloc("t"))))
        .unwrap();
    assert_eq!(
        ctx.applier_mut().take_calls(),
        vec![PortCall::Remove { index: 0, count: 2 }]
    );
    assert_eq!(labels(&ctx), ["t"]);
}

#[test]
fn node_children_survive_their_parents_relocation() {
    let mut ctx = new_ctx();
    let render = |ctx: &mut Ctx, keys: [&'static str; 2]| {
        ctx.update(|s| {
            for key in keys {
                s.group(key, |s| {
                    s.node(
                        |t| t.inner_mut().alloc(key),
                        |s| s.leaf(|t| t.inner_mut().alloc("inner")),
                    )
                })?;
            }
            Ok(())
        })
        .unwrap();
    };
    render(&mut ctx, ["a", "b"]);
    ctx.applier_mut().take_calls();

    render(&mut ctx, ["b", "a"]);
    assert_eq!(
        ctx.applier_mut().take_calls(),
        vec![PortCall::Relocate {
            from: 0,
            to: 2,
            count: 1
        }]
    );
    assert_eq!(labels(&ctx), ["b", "a"]);
    for &node in ctx.applier().inner().children(*ctx.root()) {
        assert_eq!(ctx.applier().inner().labels(node), ["inner"]);
    }
}
