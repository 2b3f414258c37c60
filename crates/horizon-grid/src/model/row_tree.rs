//! Hierarchical row storage.
//!
//! [`RowTree`] owns every row of a grid as an id-addressed arena. Each node
//! keeps the ordered ids of its children; parent links live in a separate
//! `child -> parent` map so no node holds a reference to another. All
//! structural mutation (insert, remove, move) goes through this type.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt;

use horizon_grid_core::logging::{OutlineWriter, TreeFormatOptions, targets};
use serde::{Deserialize, Serialize};

use super::expansion::ExpansionState;
use super::value::CellValue;
use crate::error::{GridError, Result};

/// Identifier of a row, unique across its tree.
///
/// Ids are assigned by the tree on insert and not reused by it until the
/// `u64` id space above the largest id ever handed out is exhausted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RowId(u64);

impl RowId {
    /// Wraps a raw id, e.g. one read back from serialized data.
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// Returns the raw numeric id.
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for RowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A stored row.
#[derive(Debug, Clone, PartialEq)]
pub struct RowNode {
    id: RowId,
    values: BTreeMap<String, CellValue>,
    children: Vec<RowId>,
}

impl RowNode {
    /// The row's id.
    pub fn id(&self) -> RowId {
        self.id
    }

    /// All cell values, keyed by column.
    pub fn values(&self) -> &BTreeMap<String, CellValue> {
        &self.values
    }

    /// The value in one column, if set.
    pub fn value(&self, key: &str) -> Option<&CellValue> {
        self.values.get(key)
    }

    /// Child ids in display order.
    pub fn children(&self) -> &[RowId] {
        &self.children
    }

    /// Returns `true` if the row has at least one child.
    pub fn has_children(&self) -> bool {
        !self.children.is_empty()
    }
}

/// Payload for inserting a row, optionally with nested children.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NewRow {
    /// Initial cell values.
    pub values: BTreeMap<String, CellValue>,
    /// Rows to insert beneath this one, in order.
    pub children: Vec<NewRow>,
}

impl NewRow {
    /// An empty row.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets one cell value.
    pub fn with_value(mut self, key: impl Into<String>, value: impl Into<CellValue>) -> Self {
        self.values.insert(key.into(), value.into());
        self
    }

    /// Appends a child row.
    pub fn with_child(mut self, child: NewRow) -> Self {
        self.children.push(child);
        self
    }

    /// Total number of rows in this payload, including itself.
    pub fn count(&self) -> usize {
        let mut count = 0;
        let mut stack = vec![self];
        while let Some(row) = stack.pop() {
            count += 1;
            stack.extend(row.children.iter());
        }
        count
    }
}

/// Serialized form of a row subtree: `{ id, values, children }`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RowRecord {
    /// The row id.
    pub id: RowId,
    /// Cell values keyed by column.
    #[serde(default)]
    pub values: BTreeMap<String, CellValue>,
    /// Child records in order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<RowRecord>,
}

impl Drop for RowRecord {
    fn drop(&mut self) {
        // Unnest before dropping so deep subtrees don't recurse.
        let mut stack = std::mem::take(&mut self.children);
        while let Some(mut record) = stack.pop() {
            stack.append(&mut record.children);
        }
    }
}

/// One entry of a pre-order walk.
#[derive(Debug, Clone, Copy)]
pub struct FlatRow<'a> {
    /// The row itself.
    pub row: &'a RowNode,
    /// Distance from the root level (roots are depth 0).
    pub depth: usize,
    /// Parent id, `None` for roots.
    pub parent: Option<RowId>,
}

/// Arena-backed forest of rows.
#[derive(Debug, Clone)]
pub struct RowTree {
    nodes: HashMap<RowId, RowNode>,
    parents: HashMap<RowId, RowId>,
    roots: Vec<RowId>,
    /// `None` once the counter has handed out `u64::MAX`.
    next_id: Option<u64>,
}

impl Default for RowTree {
    fn default() -> Self {
        Self::new()
    }
}

impl RowTree {
    /// Creates an empty tree.
    pub fn new() -> Self {
        Self {
            nodes: HashMap::new(),
            parents: HashMap::new(),
            roots: Vec::new(),
            next_id: Some(1),
        }
    }

    /// Rebuilds a tree from serialized records, keeping their ids.
    ///
    /// Fails with [`GridError::DuplicateRowId`] if an id appears twice.
    /// Rows inserted afterwards get ids above the largest loaded one. A
    /// loaded id of `u64::MAX` leaves no room above it, so new rows then take
    /// the lowest free id instead.
    pub fn from_records(records: Vec<RowRecord>) -> Result<Self> {
        let mut seen = HashSet::new();
        let mut stack: Vec<&RowRecord> = records.iter().collect();
        while let Some(record) = stack.pop() {
            if !seen.insert(record.id) {
                return Err(GridError::DuplicateRowId(record.id));
            }
            stack.extend(record.children.iter());
        }

        let mut tree = Self::new();
        tree.next_id = seen
            .iter()
            .map(|id| id.0)
            .max()
            .map_or(Some(1), |max| max.checked_add(1));
        tree.roots = records.iter().map(|record| record.id).collect();
        tree.attach_records(records, None);
        tracing::debug!(target: targets::ROWS, rows = tree.len(), "loaded row records");
        Ok(tree)
    }

    fn attach_records(&mut self, records: Vec<RowRecord>, parent: Option<RowId>) {
        let mut stack: Vec<(RowRecord, Option<RowId>)> =
            records.into_iter().map(|record| (record, parent)).collect();
        while let Some((mut record, parent)) = stack.pop() {
            let id = record.id;
            let children = std::mem::take(&mut record.children);
            self.nodes.insert(
                id,
                RowNode {
                    id,
                    values: std::mem::take(&mut record.values),
                    children: children.iter().map(|child| child.id).collect(),
                },
            );
            if let Some(parent) = parent {
                self.parents.insert(id, parent);
            }
            stack.extend(children.into_iter().map(|child| (child, Some(id))));
        }
    }

    /// Serializes the whole forest.
    pub fn to_records(&self) -> Vec<RowRecord> {
        self.roots.iter().filter_map(|&id| self.record(id).ok()).collect()
    }

    /// Serializes one subtree.
    pub fn record(&self, id: RowId) -> Result<RowRecord> {
        let order: Vec<&RowNode> = self.subtree(id)?.map(|entry| entry.row).collect();
        // Reverse pre-order finishes every child before its parent.
        let mut built: HashMap<RowId, RowRecord> = HashMap::with_capacity(order.len());
        for node in order.into_iter().rev() {
            let children = node
                .children
                .iter()
                .filter_map(|child| built.remove(child))
                .collect();
            built.insert(
                node.id,
                RowRecord {
                    id: node.id,
                    values: node.values.clone(),
                    children,
                },
            );
        }
        built.remove(&id).ok_or(GridError::RowNotFound(id))
    }

    // =========================================================================
    // Queries
    // =========================================================================

    /// Number of rows in the tree.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Returns `true` if the tree holds no rows.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Returns `true` if the row exists.
    pub fn contains(&self, id: RowId) -> bool {
        self.nodes.contains_key(&id)
    }

    /// Looks up a row.
    pub fn get(&self, id: RowId) -> Option<&RowNode> {
        self.nodes.get(&id)
    }

    /// Looks up a row, failing with `NotFound`.
    pub fn row(&self, id: RowId) -> Result<&RowNode> {
        self.nodes.get(&id).ok_or(GridError::RowNotFound(id))
    }

    /// Root ids in order.
    pub fn roots(&self) -> &[RowId] {
        &self.roots
    }

    /// Children of a row in order.
    pub fn children(&self, id: RowId) -> Result<&[RowId]> {
        Ok(&self.row(id)?.children)
    }

    /// Sibling list under `parent`, or the root list for `None`.
    pub fn children_of(&self, parent: Option<RowId>) -> Result<&[RowId]> {
        match parent {
            None => Ok(&self.roots),
            Some(id) => self.children(id),
        }
    }

    /// Parent of a row, `None` for roots.
    pub fn parent(&self, id: RowId) -> Result<Option<RowId>> {
        if !self.contains(id) {
            return Err(GridError::RowNotFound(id));
        }
        Ok(self.parents.get(&id).copied())
    }

    /// Position of a row within its sibling list.
    pub fn sibling_index(&self, id: RowId) -> Result<usize> {
        let parent = self.parent(id)?;
        self.children_of(parent)?
            .iter()
            .position(|&sibling| sibling == id)
            .ok_or(GridError::RowNotFound(id))
    }

    /// Ancestor chain from the root down to `id`, inclusive.
    pub fn find_path(&self, id: RowId) -> Result<Vec<RowId>> {
        if !self.contains(id) {
            return Err(GridError::RowNotFound(id));
        }
        let mut path = vec![id];
        let mut current = id;
        while let Some(&parent) = self.parents.get(&current) {
            path.push(parent);
            current = parent;
        }
        path.reverse();
        Ok(path)
    }

    /// Returns `true` if `ancestor` lies on the path above `id`.
    pub fn is_ancestor(&self, ancestor: RowId, id: RowId) -> bool {
        let mut current = id;
        while let Some(&parent) = self.parents.get(&current) {
            if parent == ancestor {
                return true;
            }
            current = parent;
        }
        false
    }

    /// The value of one cell, if set.
    pub fn value(&self, id: RowId, key: &str) -> Option<&CellValue> {
        self.nodes.get(&id).and_then(|node| node.values.get(key))
    }

    /// Pre-order walk over every row, ignoring expansion.
    pub fn preorder(&self) -> Preorder<'_> {
        Preorder::new(self, &self.roots, None)
    }

    /// Pre-order walk over a subtree rooted at `id` (included), ignoring
    /// expansion. Depths are relative to the tree, not to `id`.
    pub fn subtree(&self, id: RowId) -> Result<Preorder<'_>> {
        let node = self.row(id)?;
        let depth = self.find_path(id)?.len() - 1;
        Ok(Preorder {
            tree: self,
            stack: vec![(node.id, depth, self.parents.get(&id).copied())],
            expansion: None,
        })
    }

    /// Pre-order walk that descends into a row's children only while the row
    /// is expanded.
    pub fn flatten<'a>(&'a self, expansion: &'a ExpansionState) -> Vec<FlatRow<'a>> {
        Preorder::new(self, &self.roots, Some(expansion)).collect()
    }

    // =========================================================================
    // Mutation
    // =========================================================================

    fn allocate_id(&mut self) -> RowId {
        if let Some(next) = self.next_id {
            self.next_id = next.checked_add(1);
            return RowId(next);
        }
        // Counter exhausted: fall back to the lowest free id.
        let mut candidate = 1;
        while self.nodes.contains_key(&RowId(candidate)) {
            candidate += 1;
        }
        RowId(candidate)
    }

    fn place(&mut self, values: BTreeMap<String, CellValue>, parent: Option<RowId>) -> RowId {
        let id = self.allocate_id();
        self.nodes.insert(
            id,
            RowNode {
                id,
                values,
                children: Vec::new(),
            },
        );
        if let Some(parent) = parent {
            self.parents.insert(id, parent);
        }
        id
    }

    /// Stores a payload in pre-order, so ids grow from the top row down.
    /// The top row is left for the caller to link into its sibling list.
    fn build(&mut self, row: NewRow, parent: Option<RowId>) -> RowId {
        let NewRow { values, children } = row;
        let id = self.place(values, parent);
        let mut stack: Vec<(NewRow, RowId)> =
            children.into_iter().rev().map(|child| (child, id)).collect();
        while let Some((row, parent)) = stack.pop() {
            let NewRow { values, children } = row;
            let child = self.place(values, Some(parent));
            if let Some(node) = self.nodes.get_mut(&parent) {
                node.children.push(child);
            }
            stack.extend(children.into_iter().rev().map(|grandchild| (grandchild, child)));
        }
        id
    }

    /// Appends a row (and any nested children) at the end of the root list.
    pub fn insert_root(&mut self, row: NewRow) -> RowId {
        let count = row.count();
        let id = self.build(row, None);
        self.roots.push(id);
        tracing::debug!(target: targets::ROWS, %id, count, "inserted root row");
        id
    }

    /// Appends a row (and any nested children) at the end of `parent`'s
    /// children.
    pub fn insert_child(&mut self, parent: RowId, row: NewRow) -> Result<RowId> {
        if !self.contains(parent) {
            return Err(GridError::RowNotFound(parent));
        }
        let count = row.count();
        let id = self.build(row, Some(parent));
        if let Some(node) = self.nodes.get_mut(&parent) {
            node.children.push(id);
        }
        tracing::debug!(target: targets::ROWS, %id, %parent, count, "inserted child row");
        Ok(id)
    }

    /// Removes a row and its entire subtree, returning the removed ids in
    /// pre-order.
    pub fn remove_subtree(&mut self, id: RowId) -> Result<Vec<RowId>> {
        let removed: Vec<RowId> = self.subtree(id)?.map(|entry| entry.row.id).collect();

        match self.parents.get(&id).copied() {
            Some(parent) => {
                if let Some(node) = self.nodes.get_mut(&parent) {
                    node.children.retain(|&child| child != id);
                }
            }
            None => self.roots.retain(|&root| root != id),
        }
        for gone in &removed {
            self.nodes.remove(gone);
            self.parents.remove(gone);
        }

        tracing::debug!(target: targets::ROWS, %id, count = removed.len(), "removed subtree");
        Ok(removed)
    }

    /// Removes a row and its entire subtree, returning how many rows went
    /// away.
    pub fn remove_node(&mut self, id: RowId) -> Result<usize> {
        self.remove_subtree(id).map(|removed| removed.len())
    }

    /// Moves a row within its current sibling list.
    ///
    /// The row is taken out and re-inserted at `new_index`, so the relative
    /// order of the other siblings is unchanged. Indices past the end land on
    /// the last position. Returns the index the row ends up at.
    pub fn move_sibling(&mut self, id: RowId, new_index: usize) -> Result<usize> {
        let parent = self.parent(id)?;
        let siblings = match parent {
            None => &mut self.roots,
            Some(parent) => match self.nodes.get_mut(&parent) {
                Some(node) => &mut node.children,
                None => return Err(GridError::RowNotFound(parent)),
            },
        };
        let old_index = siblings
            .iter()
            .position(|&sibling| sibling == id)
            .ok_or(GridError::RowNotFound(id))?;

        siblings.remove(old_index);
        let target = new_index.min(siblings.len());
        siblings.insert(target, id);

        tracing::debug!(target: targets::ROWS, %id, from = old_index, to = target, "moved row");
        Ok(target)
    }

    /// Moves a row to `index` under `parent`.
    ///
    /// Only moves within the current sibling list are allowed; any other
    /// parent fails with `ScopeViolation` and leaves the tree unchanged.
    pub fn move_to(&mut self, id: RowId, parent: Option<RowId>, index: usize) -> Result<usize> {
        let current = self.parent(id)?;
        if let Some(parent) = parent
            && !self.contains(parent)
        {
            return Err(GridError::RowNotFound(parent));
        }
        if current != parent {
            return Err(GridError::scope(format!(
                "row {id} cannot leave its sibling list ({} -> {})",
                describe_parent(current),
                describe_parent(parent)
            )));
        }
        self.move_sibling(id, index)
    }

    /// Sets one cell, returning the previous value. Storing `Null` clears
    /// the cell.
    pub fn set_value(
        &mut self,
        id: RowId,
        key: impl Into<String>,
        value: CellValue,
    ) -> Result<Option<CellValue>> {
        let node = self.nodes.get_mut(&id).ok_or(GridError::RowNotFound(id))?;
        let key = key.into();
        let previous = if value.is_null() {
            node.values.remove(&key)
        } else {
            node.values.insert(key, value)
        };
        Ok(previous)
    }

    /// Drops a column's value from every row. Returns how many rows held one.
    pub fn strip_column(&mut self, key: &str) -> usize {
        let stripped = self
            .nodes
            .values_mut()
            .filter_map(|node| node.values.remove(key))
            .count();
        tracing::debug!(target: targets::ROWS, key, stripped, "stripped column from rows");
        stripped
    }

    // =========================================================================
    // Debugging
    // =========================================================================

    /// Renders the forest as an indented outline.
    ///
    /// Each line shows the display value of `label_column` (or the row's
    /// first value when `None`), followed by the id when
    /// [`TreeFormatOptions::show_ids`] is set.
    pub fn debug_outline(&self, label_column: Option<&str>, options: TreeFormatOptions) -> String {
        let mut writer = OutlineWriter::new(options);
        for entry in self.preorder() {
            let node = entry.row;
            let siblings = self.children_of(entry.parent).unwrap_or_default();
            let is_last = siblings.last() == Some(&node.id);

            let value = match label_column {
                Some(key) => node.values.get(key),
                None => node.values.values().next(),
            };
            let mut label = value.map(CellValue::to_display_string).unwrap_or_default();
            if writer.options().show_ids {
                if !label.is_empty() {
                    label.push(' ');
                }
                label.push_str(&format!("#{}", node.id));
            }
            writer.line(entry.depth, is_last, &label);
        }
        writer.finish()
    }
}

fn describe_parent(parent: Option<RowId>) -> String {
    match parent {
        Some(id) => format!("row {id}"),
        None => "root".to_string(),
    }
}

/// Pre-order iterator over a [`RowTree`].
///
/// Created by [`RowTree::preorder`], [`RowTree::subtree`] and used by
/// [`RowTree::flatten`].
pub struct Preorder<'a> {
    tree: &'a RowTree,
    stack: Vec<(RowId, usize, Option<RowId>)>,
    expansion: Option<&'a ExpansionState>,
}

impl<'a> Preorder<'a> {
    fn new(tree: &'a RowTree, level: &[RowId], expansion: Option<&'a ExpansionState>) -> Self {
        Self {
            tree,
            stack: level.iter().rev().map(|&id| (id, 0, None)).collect(),
            expansion,
        }
    }
}

impl<'a> Iterator for Preorder<'a> {
    type Item = FlatRow<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let (id, depth, parent) = self.stack.pop()?;
            let Some(row) = self.tree.nodes.get(&id) else {
                continue;
            };
            let descend = self.expansion.is_none_or(|state| state.is_expanded(id));
            if descend {
                self.stack
                    .extend(row.children.iter().rev().map(|&child| (child, depth + 1, Some(id))));
            }
            return Some(FlatRow { row, depth, parent });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use horizon_grid_core::TreeStyle;

    fn named(name: &str) -> NewRow {
        NewRow::new().with_value("name", name)
    }

    fn ids(rows: &[FlatRow<'_>]) -> Vec<(RowId, usize)> {
        rows.iter().map(|r| (r.row.id(), r.depth)).collect()
    }

    #[test]
    fn test_insert_assigns_fresh_ids() {
        let mut tree = RowTree::new();
        let root = tree.insert_root(named("Launch").with_child(named("Copy")).with_child(named("QA")));
        let extra = tree.insert_child(root, named("Ship")).unwrap();

        let all: Vec<RowId> = tree.preorder().map(|r| r.row.id()).collect();
        let unique: HashSet<RowId> = all.iter().copied().collect();
        assert_eq!(all.len(), 4);
        assert_eq!(unique.len(), 4);
        assert_eq!(tree.children(root).unwrap().len(), 3);
        assert_eq!(tree.children(root).unwrap()[2], extra);
        assert_eq!(tree.parent(extra).unwrap(), Some(root));
    }

    #[test]
    fn test_insert_child_unknown_parent() {
        let mut tree = RowTree::new();
        let err = tree.insert_child(RowId::new(99), NewRow::new()).unwrap_err();
        assert!(matches!(err, GridError::RowNotFound(id) if id == RowId::new(99)));
        assert!(tree.is_empty());
    }

    #[test]
    fn test_flatten_follows_expansion() {
        let mut tree = RowTree::new();
        let root = tree.insert_root(named("1"));
        let child = tree.insert_child(root, named("10")).unwrap();

        let mut expansion = ExpansionState::new();
        expansion.expand(root);
        assert_eq!(ids(&tree.flatten(&expansion)), vec![(root, 0), (child, 1)]);

        expansion.collapse(root);
        assert_eq!(ids(&tree.flatten(&expansion)), vec![(root, 0)]);
    }

    #[test]
    fn test_flatten_requires_every_ancestor_expanded() {
        let mut tree = RowTree::new();
        let a = tree.insert_root(named("a"));
        let b = tree.insert_child(a, named("b")).unwrap();
        let c = tree.insert_child(b, named("c")).unwrap();
        let d = tree.insert_root(named("d"));

        let mut expansion = ExpansionState::new();
        expansion.expand(b);
        assert_eq!(ids(&tree.flatten(&expansion)), vec![(a, 0), (d, 0)]);

        expansion.expand(a);
        let flat = tree.flatten(&expansion);
        assert_eq!(ids(&flat), vec![(a, 0), (b, 1), (c, 2), (d, 0)]);
        assert_eq!(flat[2].parent, Some(b));
    }

    #[test]
    fn test_remove_node_removes_subtree() {
        let mut tree = RowTree::new();
        let root = tree.insert_root(named("1"));
        let child = tree.insert_child(root, named("10")).unwrap();
        let other = tree.insert_root(named("2"));

        assert_eq!(tree.remove_node(root).unwrap(), 2);
        assert!(matches!(tree.find_path(child), Err(GridError::RowNotFound(_))));
        assert_eq!(tree.roots(), &[other]);
        assert_eq!(tree.len(), 1);
        assert!(tree.remove_node(root).is_err());
    }

    #[test]
    fn test_ids_not_reused_after_remove() {
        let mut tree = RowTree::new();
        let first = tree.insert_root(NewRow::new());
        tree.remove_node(first).unwrap();
        let second = tree.insert_root(NewRow::new());
        assert_ne!(first, second);
    }

    #[test]
    fn test_move_sibling_round_trip() {
        let mut tree = RowTree::new();
        let rows: Vec<RowId> = (0..4).map(|i| tree.insert_root(named(&i.to_string()))).collect();

        assert_eq!(tree.move_sibling(rows[0], 2).unwrap(), 2);
        assert_eq!(tree.roots(), &[rows[1], rows[2], rows[0], rows[3]]);

        tree.move_sibling(rows[0], 0).unwrap();
        assert_eq!(tree.roots(), rows.as_slice());
    }

    #[test]
    fn test_move_sibling_clamps() {
        let mut tree = RowTree::new();
        let parent = tree.insert_root(named("p"));
        let a = tree.insert_child(parent, named("a")).unwrap();
        let b = tree.insert_child(parent, named("b")).unwrap();

        assert_eq!(tree.move_sibling(a, 50).unwrap(), 1);
        assert_eq!(tree.children(parent).unwrap(), &[b, a]);
    }

    #[test]
    fn test_move_to_foreign_parent_is_scope_violation() {
        let mut tree = RowTree::new();
        let p1 = tree.insert_root(named("p1"));
        let p2 = tree.insert_root(named("p2"));
        let a = tree.insert_child(p1, named("a")).unwrap();

        let err = tree.move_to(a, Some(p2), 0).unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::ScopeViolation);
        assert_eq!(tree.children(p1).unwrap(), &[a]);
        assert!(tree.children(p2).unwrap().is_empty());

        let err = tree.move_to(a, None, 0).unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::ScopeViolation);

        assert_eq!(tree.move_to(a, Some(p1), 0).unwrap(), 0);
    }

    #[test]
    fn test_find_path() {
        let mut tree = RowTree::new();
        let a = tree.insert_root(named("a"));
        let b = tree.insert_child(a, named("b")).unwrap();
        let c = tree.insert_child(b, named("c")).unwrap();

        assert_eq!(tree.find_path(c).unwrap(), vec![a, b, c]);
        assert_eq!(tree.find_path(a).unwrap(), vec![a]);
        assert!(tree.is_ancestor(a, c));
        assert!(!tree.is_ancestor(c, a));
    }

    #[test]
    fn test_set_value_and_strip_column() {
        let mut tree = RowTree::new();
        let a = tree.insert_root(named("a").with_value("risk", "high"));
        let b = tree.insert_root(named("b"));

        let previous = tree.set_value(b, "risk", CellValue::from("low")).unwrap();
        assert_eq!(previous, None);
        let previous = tree.set_value(a, "risk", CellValue::Null).unwrap();
        assert_eq!(previous, Some(CellValue::from("high")));
        assert_eq!(tree.value(a, "risk"), None);

        assert_eq!(tree.strip_column("risk"), 1);
        assert_eq!(tree.value(b, "risk"), None);
        assert_eq!(tree.value(b, "name"), Some(&CellValue::from("b")));
    }

    #[test]
    fn test_records_preserve_ids() {
        let json = r#"[
            {"id": 7, "values": {"name": "Q3 close"}, "children": [
                {"id": 3, "values": {"name": "Bank feed", "amount": 1250.5}}
            ]},
            {"id": 12, "values": {"name": "Payroll"}}
        ]"#;
        let records: Vec<RowRecord> = serde_json::from_str(json).unwrap();
        let mut tree = RowTree::from_records(records.clone()).unwrap();

        assert_eq!(tree.roots(), &[RowId::new(7), RowId::new(12)]);
        assert_eq!(tree.parent(RowId::new(3)).unwrap(), Some(RowId::new(7)));
        assert_eq!(tree.to_records(), records);

        let fresh = tree.insert_root(NewRow::new());
        assert_eq!(fresh, RowId::new(13));
    }

    #[test]
    fn test_records_at_id_ceiling_keep_ids_unique() {
        let records: Vec<RowRecord> =
            serde_json::from_str(r#"[{"id": 1}, {"id": 18446744073709551615}]"#).unwrap();
        let mut tree = RowTree::from_records(records).unwrap();

        assert_eq!(tree.insert_root(NewRow::new()), RowId::new(2));
        assert_eq!(tree.insert_root(NewRow::new()), RowId::new(3));
        assert_eq!(tree.len(), 4);

        let records: Vec<RowRecord> =
            serde_json::from_str(r#"[{"id": 1}, {"id": 18446744073709551614}]"#).unwrap();
        let mut tree = RowTree::from_records(records).unwrap();
        let last = tree.insert_root(NewRow::new().with_child(NewRow::new()));
        assert_eq!(last, RowId::new(u64::MAX));
        assert_eq!(tree.children(last).unwrap(), &[RowId::new(2)]);
        assert_eq!(tree.insert_root(NewRow::new()), RowId::new(3));

        let all: HashSet<RowId> = tree.preorder().map(|r| r.row.id()).collect();
        assert_eq!(all.len(), tree.len());
    }

    #[test]
    fn test_deep_chain_walks_without_recursion() {
        const DEPTH: usize = 20_000;

        let worker = std::thread::Builder::new()
            .stack_size(256 * 1024)
            .spawn(|| {
                let mut tree = RowTree::new();
                let mut last = tree.insert_root(named("level 0"));
                for level in 1..DEPTH {
                    last = tree.insert_child(last, named(&format!("level {level}"))).unwrap();
                }

                let mut expansion = ExpansionState::new();
                assert_eq!(expansion.expand_all(&tree), DEPTH - 1);
                let flat = tree.flatten(&expansion);
                assert_eq!(flat.len(), DEPTH);
                assert_eq!(flat[DEPTH - 1].depth, DEPTH - 1);
                assert_eq!(tree.find_path(last).unwrap().len(), DEPTH);

                let records = tree.to_records();
                let copy = RowTree::from_records(records).unwrap();
                assert_eq!(copy.len(), DEPTH);
                assert_eq!(copy.parent(last).unwrap(), tree.parent(last).unwrap());

                let outline = tree.debug_outline(
                    Some("name"),
                    TreeFormatOptions {
                        max_depth: Some(1),
                        ..TreeFormatOptions::minimal()
                    },
                );
                assert_eq!(outline.lines().count(), 2);

                let mut nested = named("leaf");
                for _ in 1..DEPTH {
                    nested = named("wrapper").with_child(nested);
                }
                assert_eq!(nested.count(), DEPTH);
                let top = tree.insert_root(nested);
                assert_eq!(tree.subtree(top).unwrap().count(), DEPTH);
                assert_eq!(tree.len(), 2 * DEPTH);
            })
            .unwrap();
        worker.join().unwrap();
    }

    #[test]
    fn test_records_reject_duplicate_ids() {
        let records = vec![
            RowRecord {
                id: RowId::new(1),
                values: BTreeMap::new(),
                children: vec![RowRecord {
                    id: RowId::new(1),
                    values: BTreeMap::new(),
                    children: Vec::new(),
                }],
            },
        ];
        assert!(matches!(
            RowTree::from_records(records),
            Err(GridError::DuplicateRowId(_))
        ));
    }

    #[test]
    fn test_debug_outline() {
        let mut tree = RowTree::new();
        tree.insert_root(named("Launch").with_child(named("Copy")).with_child(named("QA")));

        let outline = tree.debug_outline(
            Some("name"),
            TreeFormatOptions {
                style: TreeStyle::Ascii,
                show_ids: false,
                ..Default::default()
            },
        );
        assert_eq!(outline, "Launch\n+-- Copy\n`-- QA\n");

        let with_ids = tree.debug_outline(Some("name"), TreeFormatOptions::default());
        assert!(with_ids.starts_with("Launch #1\n"));
    }
}
