//! Parentheses and group-bracket layout derived from a clause's position.

use serde::Serialize;

use crate::group::{ClauseTree, NodeId};

/// One slot of the bracket column drawn to the left of a clause row.
/// Slots with `group == None` are placeholders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct GroupMarker {
    pub group: Option<NodeId>,
    pub depth: usize,
    pub is_first_in_group: bool,
    pub show_top_border: bool,
    pub show_bottom_border: bool,
    pub show_left_border: bool,
}

impl GroupMarker {
    fn placeholder() -> Self {
        Self {
            group: None,
            depth: 0,
            is_first_in_group: false,
            show_top_border: false,
            show_bottom_border: false,
            show_left_border: false,
        }
    }
}

#[derive(Clone, Copy)]
enum Edge {
    First,
    Last,
}

impl Edge {
    fn holds(self, tree: &ClauseTree, id: NodeId) -> bool {
        let Some(parent) = tree.parent(id) else {
            return false;
        };
        let siblings = tree.children(parent);
        let expected = match self {
            Edge::First => siblings.first(),
            Edge::Last => siblings.last(),
        };
        expected == Some(&id)
    }
}

/// Number of `(` emitted before a clause.
pub fn left_parentheses(tree: &ClauseTree, clause: NodeId) -> usize {
    boundary_count(tree, clause, Edge::First)
}

/// Number of `)` emitted after a clause.
pub fn right_parentheses(tree: &ClauseTree, clause: NodeId) -> usize {
    boundary_count(tree, clause, Edge::Last)
}

/// Groups opened (or closed) exactly at this clause: one for its own group
/// if it sits on the edge, plus one per enclosing non-root ancestor that
/// sits on the same edge of its parent.
fn boundary_count(tree: &ClauseTree, clause: NodeId, edge: Edge) -> usize {
    let Some(group) = tree.parent(clause) else {
        return 0;
    };
    if tree.is_root(group) || !edge.holds(tree, clause) {
        return 0;
    }

    let mut count = 1;
    let mut current = group;
    while let Some(parent) = tree.parent(current) {
        if tree.is_root(parent) || !edge.holds(tree, current) {
            break;
        }
        count += 1;
        current = parent;
    }
    count
}

/// Whether every step from the clause up to `upto` is on the given edge.
fn on_edge_path(tree: &ClauseTree, clause: NodeId, upto: NodeId, edge: Edge) -> bool {
    if !edge.holds(tree, clause) {
        return false;
    }
    let mut group = match tree.parent(clause) {
        Some(group) => group,
        None => return false,
    };
    while group != upto {
        if !edge.holds(tree, group) {
            return false;
        }
        match tree.parent(group) {
            Some(parent) => group = parent,
            None => return false,
        }
    }
    true
}

/// Bracket column for one clause row, `tree_depth` slots wide.
///
/// Walking outwards from the clause's group, each enclosing group is drawn
/// once, and repeated when a sibling branch nests deeper, so that brackets
/// of neighbouring rows line up column by column. Filled from the right.
pub fn group_markers(tree: &ClauseTree, clause: NodeId) -> Vec<GroupMarker> {
    let width = tree.tree_depth(tree.root());
    let mut markers = vec![GroupMarker::placeholder(); width];

    let Some(mut current) = tree.parent(clause) else {
        return markers;
    };
    let mut slot = width.checked_sub(1);
    let mut skip_index = None;
    let mut last_depth = tree.group_depth(current);

    while !tree.is_root(current) {
        let deepest = tree.group_depth(tree.find_deepest_group(current, skip_index));
        let repeat = deepest.saturating_sub(last_depth);
        let leftmost = on_edge_path(tree, clause, current, Edge::First);
        let rightmost = on_edge_path(tree, clause, current, Edge::Last);

        for i in 0..=repeat {
            let Some(index) = slot else {
                break;
            };
            markers[index] = GroupMarker {
                group: Some(current),
                depth: tree.group_depth(current),
                is_first_in_group: i == 0 && leftmost,
                show_top_border: leftmost,
                show_bottom_border: rightmost,
                show_left_border: i == repeat,
            };
            slot = index.checked_sub(1);
        }

        skip_index = tree.index_in_parent(current);
        let Some(parent) = tree.parent(current) else {
            break;
        };
        current = parent;
        last_depth = last_depth.max(deepest);
    }

    markers
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clause::Clause;
    use crate::types::ApiKind;

    fn add(tree: &mut ClauseTree, count: usize) -> Vec<NodeId> {
        let root = tree.root();
        (0..count)
            .map(|_| tree.insert_before(root, Clause::new(ApiKind::Tables), None))
            .collect()
    }

    /// Mark `ids` and group them inside `parent`; returns the new group.
    fn group(tree: &mut ClauseTree, parent: NodeId, ids: &[NodeId]) -> NodeId {
        for id in ids {
            tree.clause_mut(*id).unwrap().set_selected(true);
        }
        assert!(tree.group_selected(parent));
        let mut top = ids[0];
        while tree.parent(top) != Some(parent) {
            top = tree.parent(top).unwrap();
        }
        top
    }

    #[test]
    fn test_flat_clauses_have_no_parentheses() {
        let mut tree = ClauseTree::new();
        let ids = add(&mut tree, 3);
        for id in ids {
            assert_eq!(left_parentheses(&tree, id), 0);
            assert_eq!(right_parentheses(&tree, id), 0);
            assert!(group_markers(&tree, id).is_empty());
        }
    }

    #[test]
    fn test_nested_group_parentheses() {
        // A and ((B and C) and D)
        let mut tree = ClauseTree::new();
        let root = tree.root();
        let ids = add(&mut tree, 4);
        let inner = group(&mut tree, root, &ids[1..3]);
        group(&mut tree, root, &[ids[1], ids[2], ids[3]]);
        assert!(tree.is_group(inner));

        let counts: Vec<(usize, usize)> = ids
            .iter()
            .map(|id| (left_parentheses(&tree, *id), right_parentheses(&tree, *id)))
            .collect();
        assert_eq!(counts, vec![(0, 0), (2, 0), (0, 1), (0, 1)]);
    }

    #[test]
    fn test_parentheses_balance_with_shared_closing_edge() {
        // (A and (B and C))
        let mut tree = ClauseTree::new();
        let root = tree.root();
        let ids = add(&mut tree, 3);
        group(&mut tree, root, &ids[1..3]);
        group(&mut tree, root, &ids);

        let opened: usize = ids.iter().map(|id| left_parentheses(&tree, *id)).sum();
        let closed: usize = ids.iter().map(|id| right_parentheses(&tree, *id)).sum();
        assert_eq!(opened, 2);
        assert_eq!(closed, 2);
        assert_eq!(right_parentheses(&tree, ids[2]), 2);
    }

    #[test]
    fn test_markers_single_group() {
        // A, (B, C)
        let mut tree = ClauseTree::new();
        let root = tree.root();
        let ids = add(&mut tree, 3);
        let g = group(&mut tree, root, &ids[1..3]);

        assert_eq!(group_markers(&tree, ids[0]), vec![GroupMarker::placeholder()]);

        let first = group_markers(&tree, ids[1]);
        assert_eq!(first.len(), 1);
        assert_eq!(first[0].group, Some(g));
        assert!(first[0].is_first_in_group);
        assert!(first[0].show_top_border);
        assert!(!first[0].show_bottom_border);
        assert!(first[0].show_left_border);

        let last = group_markers(&tree, ids[2]);
        assert!(!last[0].is_first_in_group);
        assert!(!last[0].show_top_border);
        assert!(last[0].show_bottom_border);
    }

    #[test]
    fn test_markers_repeat_for_deeper_sibling() {
        // (A, (B, C)) : A's row repeats the outer group to reach depth 2
        let mut tree = ClauseTree::new();
        let root = tree.root();
        let ids = add(&mut tree, 3);
        let inner = group(&mut tree, root, &ids[1..3]);
        let outer = group(&mut tree, root, &ids);

        let row_a = group_markers(&tree, ids[0]);
        assert_eq!(row_a.len(), 2);
        assert!(row_a.iter().all(|m| m.group == Some(outer)));
        assert!(row_a[1].is_first_in_group);
        assert!(!row_a[1].show_left_border);
        assert!(!row_a[0].is_first_in_group);
        assert!(row_a[0].show_left_border);

        let row_b = group_markers(&tree, ids[1]);
        assert_eq!(row_b[1].group, Some(inner));
        assert_eq!(row_b[0].group, Some(outer));
        assert!(row_b[1].is_first_in_group);
        assert!(!row_b[0].show_top_border);

        let row_c = group_markers(&tree, ids[2]);
        assert!(row_c.iter().all(|m| m.show_bottom_border));
    }
}
