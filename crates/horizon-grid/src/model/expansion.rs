//! Per-row expanded/collapsed flags.

use std::collections::HashSet;

use super::row_tree::{RowId, RowTree};

/// Tracks which rows are expanded.
///
/// Absence means collapsed. Flags are independent of each other: collapsing a
/// parent leaves its descendants' flags untouched, so re-expanding the parent
/// restores the previous shape of the subtree.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExpansionState {
    expanded_ids: HashSet<RowId>,
}

impl ExpansionState {
    /// Creates a state with every row collapsed.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns whether the row is expanded.
    pub fn is_expanded(&self, id: RowId) -> bool {
        self.expanded_ids.contains(&id)
    }

    /// Expands a row. Returns `true` if the flag changed.
    pub fn expand(&mut self, id: RowId) -> bool {
        self.expanded_ids.insert(id)
    }

    /// Collapses a row. Returns `true` if the flag changed.
    pub fn collapse(&mut self, id: RowId) -> bool {
        self.expanded_ids.remove(&id)
    }

    /// Sets the flag explicitly. Returns `true` if it changed.
    pub fn set_expanded(&mut self, id: RowId, expanded: bool) -> bool {
        if expanded {
            self.expand(id)
        } else {
            self.collapse(id)
        }
    }

    /// Flips a row's flag and returns the new state.
    pub fn toggle(&mut self, id: RowId) -> bool {
        if self.collapse(id) {
            false
        } else {
            self.expand(id)
        }
    }

    /// Expands every row that has children. Returns the number of flags set.
    pub fn expand_all(&mut self, tree: &RowTree) -> usize {
        let mut changed = 0;
        for entry in tree.preorder() {
            if entry.row.has_children() && self.expanded_ids.insert(entry.row.id()) {
                changed += 1;
            }
        }
        changed
    }

    /// Collapses every row.
    pub fn collapse_all(&mut self) -> bool {
        let changed = !self.expanded_ids.is_empty();
        self.expanded_ids.clear();
        changed
    }

    /// Expands every ancestor on a root-to-row path so its last row becomes
    /// visible. The row itself keeps its own flag.
    pub fn expand_to(&mut self, path: &[RowId]) -> bool {
        let Some((_, ancestors)) = path.split_last() else {
            return false;
        };
        let mut changed = false;
        for &id in ancestors {
            changed |= self.expanded_ids.insert(id);
        }
        changed
    }

    /// Drops the flags of the given rows.
    pub fn forget(&mut self, ids: &[RowId]) {
        for id in ids {
            self.expanded_ids.remove(id);
        }
    }

    /// Drops flags for rows that no longer exist. Returns how many went away.
    pub fn prune(&mut self, tree: &RowTree) -> usize {
        let before = self.expanded_ids.len();
        self.expanded_ids.retain(|id| tree.contains(*id));
        before - self.expanded_ids.len()
    }

    /// Returns the number of expanded rows.
    pub fn len(&self) -> usize {
        self.expanded_ids.len()
    }

    /// Returns `true` if every row is collapsed.
    pub fn is_empty(&self) -> bool {
        self.expanded_ids.is_empty()
    }

    /// Iterates over expanded row ids in no particular order.
    pub fn iter(&self) -> impl Iterator<Item = RowId> + '_ {
        self.expanded_ids.iter().copied()
    }
}
