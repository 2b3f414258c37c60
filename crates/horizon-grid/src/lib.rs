//! Horizon Grid - a hierarchical, editable data grid engine.
//!
//! The engine holds the state behind a spreadsheet-like grid whose rows form
//! a tree: typed columns, expand/collapse, in-place editing, drag-and-drop
//! reordering, selection with bulk actions, and composable search, filter and
//! sort. Rendering is left to the host, which feeds normalized gestures in and
//! paints the projected view.
//!
//! # Example
//!
//! ```
//! use horizon_grid::prelude::*;
//!
//! fn main() -> Result<(), GridError> {
//!     let config = GridConfig::new("bank-reconciliation")
//!         .with_column(ColumnDef::new("payee", "Payee", CellType::Text))
//!         .with_column(ColumnDef::new("amount", "Amount", CellType::Number));
//!     let mut grid = GridController::new(config)?;
//!
//!     let rent = grid.insert_row(None, NewRow::new().with_value("payee", "Rent"))?;
//!     grid.insert_row(None, NewRow::new().with_value("payee", "Coffee"))?;
//!
//!     grid.dispatch(GridEvent::BeginEdit { row: rent, column: "amount".into() })?;
//!     grid.dispatch(GridEvent::EditInput("1,200".into()))?;
//!     grid.dispatch(GridEvent::CommitEdit)?;
//!     grid.dispatch(GridEvent::SortClick("payee".into()))?;
//!
//!     let view = grid.view();
//!     assert_eq!(view.cells(0).unwrap(), vec!["Coffee", ""]);
//!     assert_eq!(view.cells(1).unwrap(), vec!["Rent", "1200"]);
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod controller;
pub mod error;
pub mod event;
pub mod layout;
pub mod model;
pub mod prelude;

pub use config::{GridConfig, LayoutConfig};
pub use controller::{GridController, GridSignals};
pub use error::{ErrorKind, GridError, Result};
pub use event::{EventOutcome, GridEvent};
pub use horizon_grid_core::{ConnectionGuard, ConnectionId, Signal};
