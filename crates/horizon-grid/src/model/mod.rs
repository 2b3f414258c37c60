//! Grid state components.
//!
//! Each component owns one concern and exposes it through explicit
//! operations:
//!
//! - [`RowTree`]: the row forest and every structural mutation
//! - [`ColumnRegistry`]: typed column definitions, order and visibility
//! - [`ExpansionState`]: expanded/collapsed flags per row
//! - [`EditSession`]: the single in-place edit transaction
//! - [`SelectionSet`]: selected rows feeding bulk operations
//! - [`ReorderEngine`]: drag-and-drop of rows and columns
//! - [`project`]: the pure view pipeline
//!
//! Components never reach into each other. Operations that need more than one
//! of them take the others as arguments, and
//! [`GridController`](crate::GridController) keeps them consistent.

mod cell_type;
mod column;
mod edit;
mod expansion;
mod reorder;
mod row_tree;
mod selection;
mod value;
mod view;

pub use cell_type::{
    CellCapabilities, CellType, CoerceFn, DisplayFn, RATING_MAX, SortKey,
};
pub use column::{ColumnDef, ColumnRegistry, slugify};
pub use edit::{CellEdit, CommitOutcome, EditSession, EditState};
pub use expansion::ExpansionState;
pub use reorder::{DragScope, DragSource, DragState, DropOutcome, DropTarget, ReorderEngine};
pub use row_tree::{FlatRow, NewRow, Preorder, RowId, RowNode, RowRecord, RowTree};
pub use selection::SelectionSet;
pub use value::CellValue;
pub use view::{GridView, SortOrder, SortSpec, ViewQuery, VisibleRow, project};

static_assertions::assert_impl_all!(RowTree: Send, Sync);
static_assertions::assert_impl_all!(ColumnRegistry: Send, Sync);
static_assertions::assert_impl_all!(EditSession: Send, Sync);
static_assertions::assert_impl_all!(ReorderEngine: Send, Sync);
