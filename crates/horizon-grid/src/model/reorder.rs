//! Drag-and-drop reordering of rows and columns.
//!
//! A drag runs `Idle -> Dragging -> Idle`. Column drags share one scope, the
//! column order. Row drags are scoped to the sibling list the row sits in
//! when the drag begins; dropping onto a row with a different parent, or
//! onto a column, is a scope violation and leaves the data untouched.
//!
//! ```
//! use horizon_grid::model::{ColumnRegistry, DragSource, DropTarget, NewRow, ReorderEngine, RowTree};
//!
//! let mut rows = RowTree::new();
//! let a = rows.insert_root(NewRow::new());
//! let b = rows.insert_root(NewRow::new());
//! let c = rows.insert_root(NewRow::new());
//! let mut columns = ColumnRegistry::new();
//!
//! let mut engine = ReorderEngine::new();
//! engine.begin_drag(&rows, &columns, DragSource::Row(a)).unwrap();
//! assert!(engine.update_drag(&rows, &columns, &DropTarget::Row(c)).unwrap());
//! engine.end_drag(&mut rows, &mut columns, &DropTarget::Row(c)).unwrap();
//! assert_eq!(rows.roots(), &[b, c, a]);
//! ```

use horizon_grid_core::logging::targets;

use super::column::ColumnRegistry;
use super::row_tree::{RowId, RowTree};
use crate::error::{GridError, Result};

/// What is being dragged.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum DragSource {
    /// A row, moved within its sibling list.
    Row(RowId),
    /// A column, moved within the column order.
    Column(String),
}

/// Where a dragged item is hovering or dropped. The source takes the
/// target's position.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum DropTarget {
    /// Onto a row.
    Row(RowId),
    /// Onto a column header.
    Column(String),
}

/// The list a drag may reorder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DragScope {
    /// The global column order.
    Columns,
    /// The children of a row, or the root list for `None`.
    Siblings(Option<RowId>),
}

/// An in-progress drag.
#[derive(Debug, Clone, PartialEq)]
pub struct DragState {
    /// The dragged item.
    pub source: DragSource,
    /// The list it may move within.
    pub scope: DragScope,
    /// Last hovered target and whether it is a legal drop.
    pub hover: Option<(DropTarget, bool)>,
}

/// Result of a successful drop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DropOutcome {
    /// A row moved within its sibling list.
    Row {
        /// The moved row.
        id: RowId,
        /// Its parent (`None` for roots).
        parent: Option<RowId>,
        /// Index before the move.
        from: usize,
        /// Index after the move.
        to: usize,
    },
    /// A column moved within the column order.
    Column {
        /// The moved column.
        key: String,
        /// Index before the move.
        from: usize,
        /// Index after the move.
        to: usize,
    },
}

impl DropOutcome {
    /// Returns `true` if the drop changed any order.
    pub fn moved(&self) -> bool {
        match self {
            DropOutcome::Row { from, to, .. } | DropOutcome::Column { from, to, .. } => from != to,
        }
    }
}

/// Drag-and-drop state machine.
#[derive(Debug, Clone, Default)]
pub struct ReorderEngine {
    drag: Option<DragState>,
}

impl ReorderEngine {
    /// Creates an idle engine.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` while a drag is in progress.
    pub fn is_dragging(&self) -> bool {
        self.drag.is_some()
    }

    /// The in-progress drag, if any.
    pub fn current(&self) -> Option<&DragState> {
        self.drag.as_ref()
    }

    /// Starts a drag, replacing any unfinished one (which is returned).
    ///
    /// Fails with `NotFound` if the source does not exist.
    pub fn begin_drag(
        &mut self,
        rows: &RowTree,
        columns: &ColumnRegistry,
        source: DragSource,
    ) -> Result<Option<DragState>> {
        let scope = match &source {
            DragSource::Row(id) => DragScope::Siblings(rows.parent(*id)?),
            DragSource::Column(key) => {
                columns.column(key)?;
                DragScope::Columns
            }
        };
        tracing::debug!(target: targets::REORDER, ?source, ?scope, "drag started");
        Ok(self.drag.replace(DragState {
            source,
            scope,
            hover: None,
        }))
    }

    /// Records the hovered target and reports whether dropping there is
    /// allowed.
    pub fn update_drag(
        &mut self,
        rows: &RowTree,
        columns: &ColumnRegistry,
        target: &DropTarget,
    ) -> Result<bool> {
        let drag = self.drag.as_mut().ok_or(GridError::NotDragging)?;
        let legal = check_drop(drag.scope, rows, columns, target).is_ok();
        tracing::trace!(target: targets::REORDER, ?target, legal, "drag hover");
        drag.hover = Some((target.clone(), legal));
        Ok(legal)
    }

    /// Drops the dragged item onto `target` and ends the drag.
    ///
    /// The source is removed from its list and re-inserted at the target's
    /// index. A drop outside the drag's scope fails with `ScopeViolation`
    /// and changes nothing; the drag still ends.
    pub fn end_drag(
        &mut self,
        rows: &mut RowTree,
        columns: &mut ColumnRegistry,
        target: &DropTarget,
    ) -> Result<DropOutcome> {
        let drag = self.drag.take().ok_or(GridError::NotDragging)?;
        if let Err(e) = check_drop(drag.scope, rows, columns, target) {
            tracing::warn!(target: targets::REORDER, source = ?drag.source, ?target, error = %e, "drop rejected");
            return Err(e);
        }

        let outcome = match (drag.source, target) {
            (DragSource::Row(id), DropTarget::Row(onto)) => {
                let parent = rows.parent(id)?;
                let from = rows.sibling_index(id)?;
                let index = rows.sibling_index(*onto)?;
                let to = rows.move_to(id, parent, index)?;
                DropOutcome::Row { id, parent, from, to }
            }
            (DragSource::Column(key), DropTarget::Column(onto)) => {
                let from = columns
                    .index_of(&key)
                    .ok_or_else(|| GridError::ColumnNotFound(key.clone()))?;
                let index = columns
                    .index_of(onto)
                    .ok_or_else(|| GridError::ColumnNotFound(onto.clone()))?;
                let to = columns.move_column(&key, index)?;
                DropOutcome::Column { key, from, to }
            }
            (source, target) => {
                return Err(GridError::scope(format!("cannot drop {source:?} onto {target:?}")));
            }
        };
        tracing::debug!(target: targets::REORDER, ?outcome, "drop applied");
        Ok(outcome)
    }

    /// Abandons the drag without changing anything.
    pub fn cancel_drag(&mut self) -> Option<DragState> {
        let drag = self.drag.take();
        if drag.is_some() {
            tracing::debug!(target: targets::REORDER, "drag cancelled");
        }
        drag
    }

    /// Cancels the drag if its source, or the row owning its scope, is gone.
    pub fn cancel_if_stale(&mut self, rows: &RowTree, columns: &ColumnRegistry) -> Option<DragState> {
        let stale = self.drag.as_ref().is_some_and(|drag| {
            let source_gone = match &drag.source {
                DragSource::Row(id) => !rows.contains(*id),
                DragSource::Column(key) => !columns.contains(key),
            };
            let scope_gone = matches!(drag.scope, DragScope::Siblings(Some(parent)) if !rows.contains(parent));
            source_gone || scope_gone
        });
        if stale { self.cancel_drag() } else { None }
    }
}

fn check_drop(
    scope: DragScope,
    rows: &RowTree,
    columns: &ColumnRegistry,
    target: &DropTarget,
) -> Result<()> {
    match (scope, target) {
        (DragScope::Columns, DropTarget::Column(key)) => columns.column(key).map(|_| ()),
        (DragScope::Siblings(parent), DropTarget::Row(id)) => {
            let target_parent = rows.parent(*id)?;
            if target_parent == parent {
                Ok(())
            } else {
                Err(GridError::scope(format!(
                    "row {id} is not a sibling of the dragged row"
                )))
            }
        }
        (DragScope::Columns, DropTarget::Row(_)) => {
            Err(GridError::scope("a column cannot be dropped onto a row"))
        }
        (DragScope::Siblings(_), DropTarget::Column(_)) => {
            Err(GridError::scope("a row cannot be dropped onto a column"))
        }
    }
}
