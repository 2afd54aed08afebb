//! Proptest generators for clause trees
//!
//! Trees are built by replaying a random sequence of editing operations
//! through the public builder API, so every generated tree is reachable.

#![allow(dead_code)]

use proptest::collection::vec;
use proptest::prelude::*;
use table_query_builder::{
    ApiKind, BuilderConfig, ClauseTree, Combinator, NodeId, QueryBuilder, ValueMode,
};

/// Fields of the sample table schema.
pub const FIELDS: [&str; 6] = ["PartitionKey", "RowKey", "Timestamp", "Name", "Count", "Price"];

// ============================================================================
// Editing operations
// ============================================================================

/// One editing step. Indices are taken modulo the current clause count.
#[derive(Debug, Clone)]
pub enum TreeOp {
    Add { position: usize, field: usize },
    Delete { index: usize },
    Select { index: usize },
    Group,
    Ungroup { index: usize },
    Combinator { index: usize, or: bool },
    Value { index: usize, value: String },
}

pub fn arb_tree_op() -> impl Strategy<Value = TreeOp> {
    prop_oneof![
        4 => (any::<usize>(), 0..FIELDS.len())
            .prop_map(|(position, field)| TreeOp::Add { position, field }),
        1 => any::<usize>().prop_map(|index| TreeOp::Delete { index }),
        4 => any::<usize>().prop_map(|index| TreeOp::Select { index }),
        2 => Just(TreeOp::Group),
        1 => any::<usize>().prop_map(|index| TreeOp::Ungroup { index }),
        1 => (any::<usize>(), any::<bool>())
            .prop_map(|(index, or)| TreeOp::Combinator { index, or }),
        1 => (any::<usize>(), "[a-z0-9]{0,6}")
            .prop_map(|(index, value)| TreeOp::Value { index, value }),
    ]
}

pub fn arb_tree_ops(max_len: usize) -> impl Strategy<Value = Vec<TreeOp>> {
    vec(arb_tree_op(), 0..=max_len)
}

fn nth_clause(builder: &QueryBuilder, index: usize) -> Option<NodeId> {
    let ids = builder.tree().flatten();
    if ids.is_empty() {
        None
    } else {
        Some(ids[index % ids.len()])
    }
}

/// Replay `ops` on a fresh builder over the sample table schema.
pub fn build(ops: &[TreeOp]) -> QueryBuilder {
    let mut builder = QueryBuilder::from_config(BuilderConfig::sample(ApiKind::Tables));
    for op in ops {
        apply(&mut builder, op);
    }
    builder
}

pub fn apply(builder: &mut QueryBuilder, op: &TreeOp) {
    match op {
        TreeOp::Add { position, field } => {
            let count = builder.tree().len() + 1;
            builder.add_clause(position % count, Some(FIELDS[*field]));
        }
        TreeOp::Delete { index } => {
            if let Some(id) = nth_clause(builder, *index) {
                builder.delete_clause(id);
            }
        }
        TreeOp::Select { index } => {
            if let Some(id) = nth_clause(builder, *index) {
                builder.toggle_selection(id, true);
            }
        }
        TreeOp::Group => {
            builder.group_selected();
        }
        TreeOp::Ungroup { index } => {
            if let Some(id) = nth_clause(builder, *index) {
                builder.ungroup(id);
            }
        }
        TreeOp::Combinator { index, or } => {
            if let Some(id) = nth_clause(builder, *index) {
                let combinator = if *or { Combinator::Or } else { Combinator::And };
                builder.set_clause_combinator(id, combinator).unwrap();
            }
        }
        TreeOp::Value { index, value } => {
            if let Some(id) = nth_clause(builder, *index) {
                builder
                    .set_clause_value(id, ValueMode::Literal(value.clone()))
                    .unwrap();
            }
        }
    }
}

// ============================================================================
// Invariant checks
// ============================================================================

/// Structural rules every reachable tree satisfies:
/// parent links agree with child lists, the root has no parent, and every
/// non-root group holds at least two children.
pub fn check_tree_invariants(tree: &ClauseTree) -> Result<(), String> {
    let root = tree.root();
    if tree.parent(root).is_some() {
        return Err("root has a parent".to_string());
    }
    let mut clauses = 0;
    check_group(tree, root, &mut clauses)?;
    if clauses != tree.flatten().len() {
        return Err(format!(
            "walk found {} clauses, flatten found {}",
            clauses,
            tree.flatten().len()
        ));
    }
    Ok(())
}

fn check_group(tree: &ClauseTree, group: NodeId, clauses: &mut usize) -> Result<(), String> {
    let children = tree.children(group);
    if !tree.is_root(group) && children.len() < 2 {
        return Err(format!("group {} has {} children", group, children.len()));
    }
    for child in children {
        if tree.parent(*child) != Some(group) {
            return Err(format!("{} does not point back to {}", child, group));
        }
        if tree.is_group(*child) {
            check_group(tree, *child, clauses)?;
        } else if tree.clause(*child).is_some() {
            *clauses += 1;
        } else {
            return Err(format!("{} is listed but not stored", child));
        }
    }
    Ok(())
}
