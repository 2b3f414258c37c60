//! Row selection.
//!
//! [`SelectionSet`] is a flat set of row ids. Selecting a parent never
//! selects its descendants, and bulk operations read the set back in tree
//! pre-order through [`SelectionSet::in_tree_order`].

use std::collections::HashSet;

use super::row_tree::{RowId, RowTree};

/// The set of selected rows plus the anchor used for range selection.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectionSet {
    selected: HashSet<RowId>,
    anchor: Option<RowId>,
}

impl SelectionSet {
    /// Creates an empty selection.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns whether a row is selected.
    pub fn is_selected(&self, id: RowId) -> bool {
        self.selected.contains(&id)
    }

    /// Number of selected rows.
    pub fn len(&self) -> usize {
        self.selected.len()
    }

    /// Returns `true` if nothing is selected.
    pub fn is_empty(&self) -> bool {
        self.selected.is_empty()
    }

    /// The row range selection extends from.
    pub fn anchor(&self) -> Option<RowId> {
        self.anchor
    }

    /// Adds a row and makes it the anchor. Returns `true` if it was not
    /// already selected.
    pub fn select(&mut self, id: RowId) -> bool {
        self.anchor = Some(id);
        self.selected.insert(id)
    }

    /// Removes a row. Returns `true` if it was selected.
    pub fn deselect(&mut self, id: RowId) -> bool {
        if self.anchor == Some(id) {
            self.anchor = None;
        }
        self.selected.remove(&id)
    }

    /// Flips a row's membership and returns the new state.
    pub fn toggle(&mut self, id: RowId) -> bool {
        if self.deselect(id) {
            false
        } else {
            self.select(id)
        }
    }

    /// Selects every given row. Returns how many were newly added.
    pub fn select_all(&mut self, visible: impl IntoIterator<Item = RowId>) -> usize {
        visible
            .into_iter()
            .filter(|id| self.selected.insert(*id))
            .count()
    }

    /// Selects the rows between the anchor and `to` (inclusive) in the given
    /// visible order. Without an anchor, or when either end is not visible,
    /// only `to` is selected. Returns how many rows were newly added.
    pub fn select_range(&mut self, to: RowId, visible: &[RowId]) -> usize {
        let end = visible.iter().position(|&id| id == to);
        let start = self
            .anchor
            .and_then(|anchor| visible.iter().position(|&id| id == anchor));
        match (start, end) {
            (Some(start), Some(end)) => {
                let (lo, hi) = if start <= end { (start, end) } else { (end, start) };
                visible[lo..=hi]
                    .iter()
                    .filter(|id| self.selected.insert(**id))
                    .count()
            }
            _ => {
                self.anchor = Some(to);
                usize::from(self.selected.insert(to))
            }
        }
    }

    /// Deselects everything. Returns `true` if anything was selected.
    pub fn clear(&mut self) -> bool {
        self.anchor = None;
        let changed = !self.selected.is_empty();
        self.selected.clear();
        changed
    }

    /// Removes the given rows, e.g. after they were deleted.
    pub fn forget(&mut self, ids: &[RowId]) -> usize {
        ids.iter().filter(|&&id| self.deselect(id)).count()
    }

    /// Drops ids of rows that no longer exist. Returns how many went away.
    pub fn prune(&mut self, tree: &RowTree) -> usize {
        let before = self.selected.len();
        self.selected.retain(|id| tree.contains(*id));
        if self.anchor.is_some_and(|anchor| !tree.contains(anchor)) {
            self.anchor = None;
        }
        before - self.selected.len()
    }

    /// Iterates over selected ids in no particular order.
    pub fn iter(&self) -> impl Iterator<Item = RowId> + '_ {
        self.selected.iter().copied()
    }

    /// Materializes the selection in tree pre-order. Ids of rows missing from
    /// `tree` are skipped.
    pub fn in_tree_order(&self, tree: &RowTree) -> Vec<RowId> {
        if self.selected.is_empty() {
            return Vec::new();
        }
        tree.preorder()
            .map(|entry| entry.row.id())
            .filter(|id| self.selected.contains(id))
            .collect()
    }
}
