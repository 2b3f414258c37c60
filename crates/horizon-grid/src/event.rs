//! Normalized gesture events.
//!
//! Hosts translate raw input (clicks, key presses, pointer drags) into
//! [`GridEvent`]s and feed them to
//! [`GridController::dispatch`](crate::GridController::dispatch). Each event
//! maps onto exactly one controller operation, and the operation's result is
//! reported back as an [`EventOutcome`].

use crate::model::{
    CellType, CellValue, ColumnDef, CommitOutcome, DragSource, DropOutcome, DropTarget, NewRow,
    RowId, SortSpec,
};

/// A user gesture, already normalized by the host.
#[derive(Debug, Clone, PartialEq)]
pub enum GridEvent {
    // -- Editing --
    /// Cell clicked to edit. The draft starts as the stored value.
    BeginEdit { row: RowId, column: String },
    /// Editor content changed.
    EditInput(CellValue),
    /// Editor confirmed (Enter, focus out).
    CommitEdit,
    /// Editor dismissed (Escape).
    CancelEdit,

    // -- Drag and drop --
    /// Pointer pressed on a drag handle.
    DragStart(DragSource),
    /// Pointer moved over a potential target.
    DragMove(DropTarget),
    /// Pointer released over a target.
    Drop(DropTarget),
    /// Drag abandoned.
    DragCancel,

    // -- View --
    /// Search box changed.
    SetSearch(String),
    /// Column filter changed. A blank value clears the filter.
    SetFilter { column: String, value: String },
    /// Column filter cleared.
    ClearFilter(String),
    /// Column header clicked.
    SortClick(String),
    /// Sort removed.
    ClearSort,
    /// Expander clicked.
    ToggleExpand(RowId),

    // -- Rows --
    /// Row added under `parent`, or as a root.
    InsertRow { parent: Option<RowId>, row: NewRow },
    /// Row deleted together with its subtree.
    RemoveRow(RowId),

    // -- Columns --
    /// Column added from a full definition.
    AddColumn(ColumnDef),
    /// Column added from a header label; the key is derived.
    AddColumnFromLabel { label: String, cell_type: CellType },
    /// Column deleted together with its data.
    RemoveColumn(String),
    /// Column shown or hidden.
    SetColumnVisible { column: String, visible: bool },

    // -- Selection --
    /// Row checkbox checked.
    Select(RowId),
    /// Row checkbox unchecked.
    Deselect(RowId),
    /// Row clicked with the toggle modifier.
    ToggleSelect(RowId),
    /// Row clicked with the range modifier.
    SelectRange(RowId),
    /// Header checkbox checked; selects the painted rows.
    SelectAll,
    /// Header checkbox unchecked.
    ClearSelection,
    /// Bulk delete of the selection.
    DeleteSelected,
}

/// What a dispatched event did.
#[derive(Debug, Clone, PartialEq)]
pub enum EventOutcome {
    /// The event was applied; nothing further to report.
    Applied,
    /// The event was valid but changed nothing.
    Unchanged,
    /// An edit was committed.
    Committed(CommitOutcome),
    /// Whether the hovered drop target is legal.
    DropAllowed(bool),
    /// A drop was applied.
    Dropped(DropOutcome),
    /// The new sort.
    Sorted(SortSpec),
    /// The row's new expansion state.
    Expanded(bool),
    /// A row was inserted.
    RowInserted(RowId),
    /// Rows were removed, in pre-order.
    RowsRemoved(Vec<RowId>),
    /// A column was added under this key.
    ColumnAdded(String),
    /// A column was removed.
    ColumnRemoved(ColumnDef),
    /// The number of selected rows after the event.
    Selection(usize),
}

impl EventOutcome {
    pub(crate) fn from_changed(changed: bool) -> Self {
        if changed { Self::Applied } else { Self::Unchanged }
    }
}
