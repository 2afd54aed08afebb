//! The clause tree: an arena of clauses and groups.
//!
//! Groups own their children through the ordered `children` list; every node
//! also records its parent, which is only used for traversal. Node slots are
//! never reused, so a [`NodeId`] stays unique for the life of the tree.
//!
//! ## Shape rules
//!
//! ```text
//! root ─┬─ clause
//!       ├─ group ─┬─ clause        a non-root group always holds ≥ 2 children;
//!       │         └─ group ─┬─ …   dropping to 1 promotes the survivor in place,
//!       └─ clause           └─ …   dropping to 0 removes the group
//! ```

use std::fmt;
use std::str::FromStr;

use serde::Serialize;
use tracing::{debug, warn};

use crate::clause::Clause;
use crate::error::QueryBuilderError;

/// Stable identifier of a clause or group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct NodeId(usize);

impl NodeId {
    pub fn from_raw(raw: usize) -> Self {
        NodeId(raw)
    }

    pub fn index(&self) -> usize {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

impl FromStr for NodeId {
    type Err = QueryBuilderError;

    /// Accepts `#12` or `12`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim_start_matches('#')
            .parse::<usize>()
            .map(NodeId)
            .map_err(|_| QueryBuilderError::unknown_name("node id", s))
    }
}

#[derive(Debug, Clone)]
enum NodeKind {
    Clause(Clause),
    Group(Vec<NodeId>),
}

#[derive(Debug, Clone)]
struct Node {
    parent: Option<NodeId>,
    kind: NodeKind,
}

/// How much of a group's subtree is marked for grouping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionState {
    All,
    Partial,
    None,
}

/// The contiguous run of selected siblings found by the grouping scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct SelectedRun {
    can_group: bool,
    begin: Option<usize>,
    end: Option<usize>,
}

#[derive(Debug, Clone)]
pub struct ClauseTree {
    nodes: Vec<Option<Node>>,
    root: NodeId,
}

impl Default for ClauseTree {
    fn default() -> Self {
        Self::new()
    }
}

impl ClauseTree {
    /// A tree holding only an empty root group.
    pub fn new() -> Self {
        Self {
            nodes: vec![Some(Node {
                parent: None,
                kind: NodeKind::Group(Vec::new()),
            })],
            root: NodeId(0),
        }
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn is_root(&self, id: NodeId) -> bool {
        id == self.root
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.node(id).is_some()
    }

    pub fn is_group(&self, id: NodeId) -> bool {
        matches!(self.node(id), Some(Node { kind: NodeKind::Group(_), .. }))
    }

    pub fn clause(&self, id: NodeId) -> Option<&Clause> {
        match self.node(id) {
            Some(Node { kind: NodeKind::Clause(clause), .. }) => Some(clause),
            _ => None,
        }
    }

    pub fn clause_mut(&mut self, id: NodeId) -> Option<&mut Clause> {
        match self.node_mut(id) {
            Some(Node { kind: NodeKind::Clause(clause), .. }) => Some(clause),
            _ => None,
        }
    }

    /// Children of a group in order; empty for clauses and unknown ids.
    pub fn children(&self, id: NodeId) -> &[NodeId] {
        match self.node(id) {
            Some(Node { kind: NodeKind::Group(children), .. }) => children,
            _ => &[],
        }
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).and_then(|node| node.parent)
    }

    pub fn index_in_parent(&self, id: NodeId) -> Option<usize> {
        let parent = self.parent(id)?;
        self.children(parent).iter().position(|child| *child == id)
    }

    pub fn is_empty(&self) -> bool {
        self.children(self.root).is_empty()
    }

    /// Number of clauses in the tree.
    pub fn len(&self) -> usize {
        self.flatten().len()
    }

    /// Insert `clause` before `anchor` in the anchor's own group, or append
    /// it to `group` when there is no anchor.
    pub fn insert_before(&mut self, group: NodeId, clause: Clause, anchor: Option<NodeId>) -> NodeId {
        let target = anchor.and_then(|anchor| Some((self.parent(anchor)?, self.index_in_parent(anchor)?)));

        let (parent, index) = match target {
            Some(target) => target,
            None => {
                if let Some(anchor) = anchor {
                    warn!(%anchor, "insert anchor is not in the tree, appending instead");
                }
                let group = if self.is_group(group) { group } else { self.root };
                (group, self.children(group).len())
            }
        };

        let id = self.alloc(Node {
            parent: Some(parent),
            kind: NodeKind::Clause(clause),
        });
        if let Some(children) = self.children_mut(parent) {
            children.insert(index, id);
        }
        id
    }

    /// Insert `clause` right after `anchor` inside the anchor's group.
    pub fn insert_after(&mut self, anchor: NodeId, clause: Clause) -> NodeId {
        let next = self
            .parent(anchor)
            .zip(self.index_in_parent(anchor))
            .and_then(|(parent, index)| self.children(parent).get(index + 1).copied());

        match next {
            Some(next) => self.insert_before(self.root, clause, Some(next)),
            None => {
                let group = self.parent(anchor).unwrap_or(self.root);
                self.insert_before(group, clause, None)
            }
        }
    }

    /// Remove a clause or group (with its subtree), then dissolve the former
    /// parent if it became degenerate. Unknown ids and the root are ignored.
    pub fn delete(&mut self, id: NodeId) {
        if self.is_root(id) {
            return;
        }
        let Some(parent) = self.parent(id) else {
            return;
        };
        if let Some(children) = self.children_mut(parent) {
            children.retain(|child| *child != id);
        }
        self.dispose(id);
        self.dissolve_if_degenerate(parent);
    }

    /// Drop every clause and group, leaving an empty root.
    pub fn remove_all(&mut self) {
        let root = self.root;
        let children = self.children_mut(root).map(std::mem::take).unwrap_or_default();
        for child in children {
            self.dispose(child);
        }
    }

    /// Wrap the contiguous run of selected children of `group` into a new
    /// group. Refused (returns false) when the selection has a gap, touches a
    /// partially selected sub-group, or covers fewer than two items.
    pub fn group_selected(&mut self, group: NodeId) -> bool {
        let SelectedRun {
            can_group: true,
            begin: Some(begin),
            end: Some(end),
        } = self.selected_run(group)
        else {
            return false;
        };

        let new_group = self.alloc(Node {
            parent: Some(group),
            kind: NodeKind::Group(Vec::new()),
        });
        let moved: Vec<NodeId> = match self.children_mut(group) {
            Some(children) => children
                .splice(begin..=end, std::iter::once(new_group))
                .collect(),
            None => return false,
        };
        for child in &moved {
            self.set_parent(*child, new_group);
        }
        debug!(group = %new_group, items = moved.len(), "grouped selected clauses");
        if let Some(children) = self.children_mut(new_group) {
            *children = moved;
        }

        self.unselect_all(group);
        true
    }

    pub fn can_group_selected(&self, group: NodeId) -> bool {
        self.selected_run(group).can_group
    }

    /// Splice a group's children into its parent at the group's position.
    /// The root cannot be ungrouped.
    pub fn ungroup(&mut self, group: NodeId) {
        if self.is_root(group) || !self.is_group(group) {
            return;
        }
        let (Some(parent), Some(index)) = (self.parent(group), self.index_in_parent(group)) else {
            return;
        };

        let promoted = self.children_mut(group).map(std::mem::take).unwrap_or_default();
        self.nodes[group.0] = None;
        for child in &promoted {
            self.set_parent(*child, parent);
        }
        debug!(%group, promoted = promoted.len(), "ungrouped");
        if let Some(children) = self.children_mut(parent) {
            children.splice(index..=index, promoted);
        }
    }

    pub fn selection_state(&self, group: NodeId) -> SelectionState {
        let children = self.children(group);
        let selected = children
            .iter()
            .filter(|child| self.is_fully_selected(**child))
            .count();

        if selected == children.len() {
            SelectionState::All
        } else if selected == 0 {
            SelectionState::None
        } else {
            SelectionState::Partial
        }
    }

    /// Clear every grouping mark under `group`.
    pub fn unselect_all(&mut self, group: NodeId) {
        for child in self.children(group).to_vec() {
            if self.is_group(child) {
                self.unselect_all(child);
            } else if let Some(clause) = self.clause_mut(child) {
                clause.set_selected(false);
            }
        }
    }

    /// All clauses, depth-first and left to right.
    pub fn flatten(&self) -> Vec<NodeId> {
        let mut clauses = Vec::new();
        self.flatten_into(self.root, &mut clauses);
        clauses
    }

    /// Number of groups between a node and the root; 0 for the root itself.
    pub fn group_depth(&self, id: NodeId) -> usize {
        let mut depth = 0;
        let mut current = id;
        while let Some(parent) = self.parent(current) {
            depth += 1;
            current = parent;
        }
        depth
    }

    /// Depth of the group a clause sits in.
    pub fn clause_depth(&self, clause: NodeId) -> usize {
        self.parent(clause).map_or(0, |group| self.group_depth(group))
    }

    /// The largest group depth found at or below `group`.
    pub fn tree_depth(&self, group: NodeId) -> usize {
        self.children(group)
            .iter()
            .filter(|child| self.is_group(**child))
            .map(|child| self.tree_depth(*child))
            .fold(self.group_depth(group), usize::max)
    }

    /// The deepest group at or below `group`. The first-level child at
    /// `skip_index` (and its subtree) is left out of the search.
    pub fn find_deepest_group(&self, group: NodeId, skip_index: Option<usize>) -> NodeId {
        let mut deepest = (group, self.group_depth(group));
        self.visit_deepest(group, 1, skip_index, &mut deepest);
        deepest.0
    }

    fn visit_deepest(
        &self,
        group: NodeId,
        level: usize,
        skip_index: Option<usize>,
        deepest: &mut (NodeId, usize),
    ) {
        let depth = self.group_depth(group);
        if depth > deepest.1 {
            *deepest = (group, depth);
        }
        for (index, child) in self.children(group).iter().enumerate() {
            if self.is_group(*child) && (level > 1 || Some(index) != skip_index) {
                self.visit_deepest(*child, level + 1, skip_index, deepest);
            }
        }
    }

    fn is_fully_selected(&self, id: NodeId) -> bool {
        match self.node(id) {
            Some(Node { kind: NodeKind::Clause(clause), .. }) => clause.is_selected(),
            Some(Node { kind: NodeKind::Group(_), .. }) => {
                self.selection_state(id) == SelectionState::All
            }
            None => false,
        }
    }

    /// Left-to-right scan for the selected run among `group`'s children.
    fn selected_run(&self, group: NodeId) -> SelectedRun {
        let children = self.children(group);
        let mut begin = None;
        let mut end = None;
        let mut gap = false;
        let mut count = 0;

        for (index, child) in children.iter().enumerate() {
            // (counts as selected, leaves the selection untouched)
            let (selected, untouched) = if self.is_group(*child) {
                match self.selection_state(*child) {
                    SelectionState::Partial => {
                        gap = true;
                        break;
                    }
                    SelectionState::All => (true, false),
                    SelectionState::None => (false, true),
                }
            } else {
                let selected = self.clause(*child).is_some_and(Clause::is_selected);
                (selected, !selected)
            };

            if begin.is_none() && end.is_none() && selected {
                begin = Some(index);
            }
            if begin.is_some() && end.is_none() && !selected {
                end = Some(index - 1);
            }
            if begin.is_some() && end.is_none() {
                count += 1;
            }
            if begin.is_some() && end.is_some() && !untouched {
                gap = true;
                break;
            }
        }

        if !gap && end.is_none() {
            end = children.len().checked_sub(1);
        }

        SelectedRun {
            can_group: begin.is_some() && !gap && count > 1,
            begin,
            end,
        }
    }

    fn flatten_into(&self, group: NodeId, clauses: &mut Vec<NodeId>) {
        for child in self.children(group) {
            if self.is_group(*child) {
                self.flatten_into(*child, clauses);
            } else {
                clauses.push(*child);
            }
        }
    }

    /// Collapse a non-root group left with fewer than two children.
    fn dissolve_if_degenerate(&mut self, group: NodeId) {
        if self.is_root(group) || self.children(group).len() > 1 {
            return;
        }
        let (Some(parent), Some(index)) = (self.parent(group), self.index_in_parent(group)) else {
            return;
        };

        let orphan = self.children(group).first().copied();
        self.nodes[group.0] = None;
        match orphan {
            Some(orphan) => {
                self.set_parent(orphan, parent);
                if let Some(children) = self.children_mut(parent) {
                    children[index] = orphan;
                }
                debug!(%group, promoted = %orphan, "dissolved single-child group");
            }
            None => {
                if let Some(children) = self.children_mut(parent) {
                    children.remove(index);
                }
                debug!(%group, "removed empty group");
                self.dissolve_if_degenerate(parent);
            }
        }
    }

    fn dispose(&mut self, id: NodeId) {
        let Some(node) = self.nodes.get_mut(id.0).and_then(Option::take) else {
            return;
        };
        if let NodeKind::Group(children) = node.kind {
            for child in children {
                self.dispose(child);
            }
        }
    }

    fn alloc(&mut self, node: Node) -> NodeId {
        self.nodes.push(Some(node));
        NodeId(self.nodes.len() - 1)
    }

    fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.0).and_then(Option::as_ref)
    }

    fn node_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(id.0).and_then(Option::as_mut)
    }

    fn children_mut(&mut self, id: NodeId) -> Option<&mut Vec<NodeId>> {
        match self.node_mut(id) {
            Some(Node { kind: NodeKind::Group(children), .. }) => Some(children),
            _ => None,
        }
    }

    fn set_parent(&mut self, id: NodeId, parent: NodeId) {
        if let Some(node) = self.node_mut(id) {
            node.parent = Some(parent);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ApiKind;

    /// Root with `count` blank clauses.
    fn tree_with(count: usize) -> (ClauseTree, Vec<NodeId>) {
        let mut tree = ClauseTree::new();
        let root = tree.root();
        let ids = (0..count)
            .map(|_| tree.insert_before(root, Clause::new(ApiKind::Tables), None))
            .collect();
        (tree, ids)
    }

    fn select(tree: &mut ClauseTree, ids: &[NodeId]) {
        for id in ids {
            tree.clause_mut(*id).unwrap().set_selected(true);
        }
    }

    #[test]
    fn test_insert_before_anchor_in_its_own_group() {
        let (mut tree, ids) = tree_with(3);
        select(&mut tree, &ids[1..3]);
        assert!(tree.group_selected(tree.root()));
        let group = tree.parent(ids[1]).unwrap();

        // anchor lives in the sub-group, so the new clause lands there too
        let new = tree.insert_before(tree.root(), Clause::new(ApiKind::Tables), Some(ids[2]));
        assert_eq!(tree.parent(new), Some(group));
        assert_eq!(tree.children(group), &[ids[1], new, ids[2]]);
        assert_eq!(tree.flatten(), vec![ids[0], ids[1], new, ids[2]]);
    }

    #[test]
    fn test_insert_with_stale_anchor_appends() {
        let (mut tree, ids) = tree_with(2);
        tree.delete(ids[1]);
        let new = tree.insert_before(tree.root(), Clause::new(ApiKind::Tables), Some(ids[1]));
        assert_eq!(tree.flatten(), vec![ids[0], new]);
    }

    #[test]
    fn test_insert_after_stays_in_group() {
        let (mut tree, ids) = tree_with(3);
        select(&mut tree, &ids[0..2]);
        assert!(tree.group_selected(tree.root()));
        let group = tree.parent(ids[0]).unwrap();

        let new = tree.insert_after(ids[1], Clause::new(ApiKind::Tables));
        assert_eq!(tree.children(group), &[ids[0], ids[1], new]);
        let tail = tree.insert_after(ids[2], Clause::new(ApiKind::Tables));
        assert_eq!(tree.children(tree.root()), &[group, ids[2], tail]);
    }

    #[test]
    fn test_group_selected_contiguous_run() {
        let (mut tree, ids) = tree_with(4);
        select(&mut tree, &ids[1..3]);
        assert!(tree.can_group_selected(tree.root()));
        assert!(tree.group_selected(tree.root()));

        let root_children = tree.children(tree.root()).to_vec();
        assert_eq!(root_children.len(), 3);
        assert_eq!(root_children[0], ids[0]);
        assert!(tree.is_group(root_children[1]));
        assert_eq!(tree.children(root_children[1]), &ids[1..3]);
        assert_eq!(root_children[2], ids[3]);

        // flags cleared, order kept
        assert!(ids.iter().all(|id| !tree.clause(*id).unwrap().is_selected()));
        assert_eq!(tree.flatten(), ids);
    }

    #[test]
    fn test_group_selected_refuses_gap() {
        let (mut tree, ids) = tree_with(3);
        select(&mut tree, &[ids[0], ids[2]]);
        assert!(!tree.can_group_selected(tree.root()));
        assert!(!tree.group_selected(tree.root()));
        assert_eq!(tree.children(tree.root()), ids.as_slice());
        // refusal does not clear the marks
        assert!(tree.clause(ids[0]).unwrap().is_selected());
    }

    #[test]
    fn test_group_selected_refuses_single_item() {
        let (mut tree, ids) = tree_with(3);
        select(&mut tree, &ids[1..2]);
        assert!(!tree.group_selected(tree.root()));
    }

    #[test]
    fn test_partially_selected_sub_group_blocks_grouping() {
        let (mut tree, ids) = tree_with(4);
        select(&mut tree, &ids[0..2]);
        assert!(tree.group_selected(tree.root()));

        select(&mut tree, &[ids[1], ids[2], ids[3]]);
        let group = tree.parent(ids[0]).unwrap();
        assert_eq!(tree.selection_state(group), SelectionState::Partial);
        assert!(!tree.can_group_selected(tree.root()));
    }

    #[test]
    fn test_fully_selected_sub_group_joins_run() {
        let (mut tree, ids) = tree_with(4);
        select(&mut tree, &ids[0..2]);
        assert!(tree.group_selected(tree.root()));
        let inner = tree.parent(ids[0]).unwrap();

        select(&mut tree, &[ids[0], ids[1], ids[2]]);
        assert!(tree.group_selected(tree.root()));
        let outer = tree.parent(inner).unwrap();
        assert_eq!(tree.children(outer), &[inner, ids[2]]);
        assert_eq!(tree.children(tree.root()), &[outer, ids[3]]);
        assert_eq!(tree.tree_depth(tree.root()), 2);
    }

    #[test]
    fn test_delete_dissolves_two_child_group() {
        let (mut tree, ids) = tree_with(4);
        select(&mut tree, &ids[1..3]);
        assert!(tree.group_selected(tree.root()));
        let group = tree.parent(ids[1]).unwrap();

        tree.delete(ids[1]);
        assert!(!tree.contains(group));
        assert_eq!(tree.children(tree.root()), &[ids[0], ids[2], ids[3]]);
        assert_eq!(tree.parent(ids[2]), Some(tree.root()));
    }

    #[test]
    fn test_delete_promotes_sub_group() {
        let (mut tree, ids) = tree_with(3);
        select(&mut tree, &ids[1..3]);
        assert!(tree.group_selected(tree.root()));
        let inner = tree.parent(ids[1]).unwrap();
        select(&mut tree, &ids[0..3]);
        assert!(tree.group_selected(tree.root()));
        let outer = tree.parent(inner).unwrap();

        tree.delete(ids[0]);
        assert!(!tree.contains(outer));
        assert_eq!(tree.children(tree.root()), &[inner]);
        assert_eq!(tree.parent(inner), Some(tree.root()));
    }

    #[test]
    fn test_delete_unknown_and_root_are_noops() {
        let (mut tree, ids) = tree_with(2);
        tree.delete(NodeId::from_raw(99));
        tree.delete(tree.root());
        tree.delete(ids[0]);
        tree.delete(ids[0]);
        assert_eq!(tree.flatten(), vec![ids[1]]);
    }

    #[test]
    fn test_ungroup_restores_order_and_parents() {
        let (mut tree, ids) = tree_with(4);
        select(&mut tree, &ids[1..3]);
        assert!(tree.group_selected(tree.root()));
        let group = tree.parent(ids[1]).unwrap();

        tree.ungroup(group);
        assert!(!tree.contains(group));
        assert_eq!(tree.children(tree.root()), ids.as_slice());
        assert!(ids.iter().all(|id| tree.parent(*id) == Some(tree.root())));

        tree.ungroup(tree.root());
        assert_eq!(tree.flatten(), ids);
    }

    #[test]
    fn test_remove_all_keeps_ids_unique() {
        let (mut tree, ids) = tree_with(3);
        tree.remove_all();
        assert!(tree.is_empty());
        assert!(ids.iter().all(|id| !tree.contains(*id)));

        let new = tree.insert_before(tree.root(), Clause::new(ApiKind::Tables), None);
        assert!(!ids.contains(&new));
    }

    #[test]
    fn test_depths_and_deepest_group() {
        let (mut tree, ids) = tree_with(4);
        select(&mut tree, &ids[2..4]);
        assert!(tree.group_selected(tree.root()));
        let inner = tree.parent(ids[2]).unwrap();
        select(&mut tree, &[ids[1], ids[2], ids[3]]);
        assert!(tree.group_selected(tree.root()));
        let outer = tree.parent(inner).unwrap();

        assert_eq!(tree.group_depth(tree.root()), 0);
        assert_eq!(tree.group_depth(outer), 1);
        assert_eq!(tree.clause_depth(ids[2]), 2);
        assert_eq!(tree.clause_depth(ids[0]), 0);
        assert_eq!(tree.tree_depth(tree.root()), 2);
        assert_eq!(tree.tree_depth(inner), 2);

        assert_eq!(tree.find_deepest_group(tree.root(), None), inner);
        // skipping the outer group's slot leaves only the root
        assert_eq!(tree.find_deepest_group(tree.root(), Some(1)), tree.root());
    }

    #[test]
    fn test_node_id_parse_and_display() {
        assert_eq!("#4".parse::<NodeId>().unwrap(), NodeId::from_raw(4));
        assert_eq!("4".parse::<NodeId>().unwrap(), NodeId::from_raw(4));
        assert!("four".parse::<NodeId>().is_err());
        assert_eq!(NodeId::from_raw(4).to_string(), "#4");
    }
}
