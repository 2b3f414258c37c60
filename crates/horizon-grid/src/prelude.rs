//! Prelude module for Horizon Grid.
//!
//! Re-exports the types most hosts need:
//!
//! ```
//! use horizon_grid::prelude::*;
//! ```

// ============================================================================
// Controller and Gestures
// ============================================================================

pub use crate::config::GridConfig;
pub use crate::controller::{GridController, GridSignals};
pub use crate::error::{ErrorKind, GridError};
pub use crate::event::{EventOutcome, GridEvent};

// ============================================================================
// Rows and Columns
// ============================================================================

pub use crate::model::{CellType, CellValue, ColumnDef, NewRow, RowId, RowRecord};

// ============================================================================
// View, Drag and Drop
// ============================================================================

pub use crate::model::{DragSource, DropTarget, SortOrder, SortSpec, ViewQuery};

// ============================================================================
// Persistence and Signals
// ============================================================================

pub use crate::layout::{FileLayoutStore, LayoutFormat, LayoutStore, MemoryLayoutStore};
pub use horizon_grid_core::Signal;
