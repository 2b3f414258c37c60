//! In-place cell editing.
//!
//! [`EditSession`] is a single-slot state machine:
//!
//! ```text
//! Idle --begin_edit--> Editing --commit/cancel--> Idle
//!                      Editing --begin_edit(other cell)--> Editing (prior draft dropped)
//! ```
//!
//! Drafts are held untyped. Coercion to the column's type happens on commit,
//! and a failed commit discards the draft.

use horizon_grid_core::logging::targets;

use super::column::ColumnRegistry;
use super::row_tree::{RowId, RowTree};
use super::value::CellValue;
use crate::error::{GridError, Result};

/// The cell being edited and its uncommitted value.
#[derive(Debug, Clone, PartialEq)]
pub struct CellEdit {
    /// Row being edited.
    pub row: RowId,
    /// Column being edited.
    pub column: String,
    /// Uncommitted value.
    pub draft: CellValue,
}

impl CellEdit {
    /// Returns `true` if this edit targets the given cell.
    pub fn is_cell(&self, row: RowId, column: &str) -> bool {
        self.row == row && self.column == column
    }
}

/// Current state of an [`EditSession`].
#[derive(Debug, Clone, PartialEq, Default)]
pub enum EditState {
    /// No cell is being edited.
    #[default]
    Idle,
    /// One cell holds a draft.
    Editing(CellEdit),
}

/// Result of a successful commit.
#[derive(Debug, Clone, PartialEq)]
pub struct CommitOutcome {
    /// Row that changed.
    pub row: RowId,
    /// Column that changed.
    pub column: String,
    /// Value before the commit.
    pub previous: Option<CellValue>,
    /// Coerced value now stored.
    pub value: CellValue,
}

impl CommitOutcome {
    /// Returns `true` if the stored value actually changed.
    pub fn changed(&self) -> bool {
        match &self.previous {
            Some(previous) => *previous != self.value,
            None => !self.value.is_null(),
        }
    }
}

/// Single-slot edit state machine.
#[derive(Debug, Clone, Default)]
pub struct EditSession {
    state: EditState,
}

impl EditSession {
    /// Creates an idle session.
    pub fn new() -> Self {
        Self::default()
    }

    /// The current state.
    pub fn state(&self) -> &EditState {
        &self.state
    }

    /// Returns `true` while a cell is in edit mode.
    pub fn is_editing(&self) -> bool {
        matches!(self.state, EditState::Editing(_))
    }

    /// The active edit, if any.
    pub fn current(&self) -> Option<&CellEdit> {
        match &self.state {
            EditState::Editing(edit) => Some(edit),
            EditState::Idle => None,
        }
    }

    /// Puts a cell into edit mode.
    ///
    /// The draft starts as `initial`, or as the stored value when `None`. An
    /// edit already in progress on another cell is cancelled and returned.
    /// Fails with `NotFound` if the row or column does not exist, leaving the
    /// session unchanged.
    pub fn begin_edit(
        &mut self,
        rows: &RowTree,
        columns: &ColumnRegistry,
        row: RowId,
        column: &str,
        initial: Option<CellValue>,
    ) -> Result<Option<CellEdit>> {
        let node = rows.row(row)?;
        columns.column(column)?;

        let draft = initial.unwrap_or_else(|| node.value(column).cloned().unwrap_or_default());
        let next = CellEdit {
            row,
            column: column.to_string(),
            draft,
        };
        let previous = match std::mem::replace(&mut self.state, EditState::Editing(next)) {
            EditState::Editing(prior) if !prior.is_cell(row, column) => {
                tracing::debug!(target: targets::EDIT, row = %prior.row, column = %prior.column, "discarded draft for new edit");
                Some(prior)
            }
            _ => None,
        };
        tracing::debug!(target: targets::EDIT, %row, column, "began edit");
        Ok(previous)
    }

    /// Replaces the draft of the active edit.
    pub fn set_draft(&mut self, value: CellValue) -> Result<()> {
        match &mut self.state {
            EditState::Editing(edit) => {
                edit.draft = value;
                Ok(())
            }
            EditState::Idle => Err(GridError::NotEditing),
        }
    }

    /// Coerces the draft and writes it to the row.
    ///
    /// The session returns to idle whether or not the commit succeeds; on
    /// error the row is left unchanged and the draft is lost.
    pub fn commit(&mut self, rows: &mut RowTree, columns: &ColumnRegistry) -> Result<CommitOutcome> {
        let EditState::Editing(edit) = std::mem::take(&mut self.state) else {
            return Err(GridError::NotEditing);
        };
        let CellEdit { row, column, draft } = edit;

        let def = columns.column(&column)?;
        rows.row(row)?;
        let value = match def.coerce(&draft) {
            Ok(value) => value,
            Err(e) => {
                tracing::warn!(target: targets::EDIT, %row, column = %column, error = %e, "commit rejected");
                return Err(e);
            }
        };
        let previous = rows.set_value(row, column.clone(), value.clone())?;

        tracing::debug!(target: targets::EDIT, %row, column = %column, "committed edit");
        Ok(CommitOutcome {
            row,
            column,
            previous,
            value,
        })
    }

    /// Leaves edit mode without touching the row. Returns the dropped edit.
    pub fn cancel(&mut self) -> Option<CellEdit> {
        match std::mem::take(&mut self.state) {
            EditState::Editing(edit) => {
                tracing::debug!(target: targets::EDIT, row = %edit.row, column = %edit.column, "cancelled edit");
                Some(edit)
            }
            EditState::Idle => None,
        }
    }

    /// Cancels the active edit if its row or column no longer exists.
    pub fn cancel_if_stale(&mut self, rows: &RowTree, columns: &ColumnRegistry) -> Option<CellEdit> {
        let stale = self
            .current()
            .is_some_and(|edit| !rows.contains(edit.row) || !columns.contains(&edit.column));
        if stale { self.cancel() } else { None }
    }

    /// Cancels the active edit if it targets the given column.
    pub fn cancel_if_column(&mut self, column: &str) -> Option<CellEdit> {
        if self.current().is_some_and(|edit| edit.column == column) {
            self.cancel()
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::model::{CellType, ColumnDef, NewRow};

    fn fixture() -> (RowTree, ColumnRegistry, RowId, RowId) {
        let columns = ColumnRegistry::from_defs([
            ColumnDef::new("name", "Name", CellType::Text),
            ColumnDef::new("amount", "Amount", CellType::Number),
        ])
        .unwrap();
        let mut rows = RowTree::new();
        let a = rows.insert_root(NewRow::new().with_value("name", "Deposit").with_value("amount", 10));
        let b = rows.insert_root(NewRow::new().with_value("name", "Fee"));
        (rows, columns, a, b)
    }

    #[test]
    fn test_begin_commit() {
        let (mut rows, columns, a, _) = fixture();
        let mut session = EditSession::new();

        session.begin_edit(&rows, &columns, a, "amount", None).unwrap();
        assert_eq!(session.current().unwrap().draft, CellValue::from(10));
        session.set_draft("1,250.75".into()).unwrap();

        let outcome = session.commit(&mut rows, &columns).unwrap();
        assert!(outcome.changed());
        assert_eq!(outcome.previous, Some(CellValue::from(10)));
        assert_eq!(rows.value(a, "amount"), Some(&CellValue::Number(1250.75)));
        assert!(!session.is_editing());
    }

    #[test]
    fn test_cancel_leaves_row_unchanged() {
        let (rows, columns, a, _) = fixture();
        let mut session = EditSession::new();
        session.begin_edit(&rows, &columns, a, "name", Some("Changed".into())).unwrap();
        let dropped = session.cancel().unwrap();
        assert_eq!(dropped.draft, CellValue::from("Changed"));
        assert_eq!(rows.value(a, "name"), Some(&CellValue::from("Deposit")));
        assert!(session.cancel().is_none());
    }

    #[test]
    fn test_switching_cells_discards_only_prior_draft() {
        let (mut rows, columns, a, b) = fixture();
        let mut session = EditSession::new();

        session.begin_edit(&rows, &columns, a, "name", None).unwrap();
        session.set_draft("Deposit (March)".into()).unwrap();
        session.commit(&mut rows, &columns).unwrap();

        session.begin_edit(&rows, &columns, a, "name", Some("draft A".into())).unwrap();
        let prior = session.begin_edit(&rows, &columns, b, "name", Some("draft B".into())).unwrap();
        assert_eq!(prior.unwrap().draft, CellValue::from("draft A"));

        session.commit(&mut rows, &columns).unwrap();
        assert_eq!(rows.value(a, "name"), Some(&CellValue::from("Deposit (March)")));
        assert_eq!(rows.value(b, "name"), Some(&CellValue::from("draft B")));
    }

    #[test]
    fn test_invalid_commit_discards_draft() {
        let (mut rows, columns, a, _) = fixture();
        let mut session = EditSession::new();
        session.begin_edit(&rows, &columns, a, "amount", Some("twelve".into())).unwrap();

        let err = session.commit(&mut rows, &columns).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidValue);
        assert!(!session.is_editing());
        assert_eq!(rows.value(a, "amount"), Some(&CellValue::from(10)));
    }

    #[test]
    fn test_not_editing_and_not_found() {
        let (mut rows, columns, a, _) = fixture();
        let mut session = EditSession::new();
        assert!(matches!(session.commit(&mut rows, &columns), Err(GridError::NotEditing)));
        assert!(matches!(session.set_draft(CellValue::Null), Err(GridError::NotEditing)));

        let err = session.begin_edit(&rows, &columns, RowId::new(99), "name", None).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
        let err = session.begin_edit(&rows, &columns, a, "missing", None).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert!(!session.is_editing());
    }

    #[test]
    fn test_blank_commit_clears_cell() {
        let (mut rows, columns, a, _) = fixture();
        let mut session = EditSession::new();
        session.begin_edit(&rows, &columns, a, "amount", Some("  ".into())).unwrap();
        let outcome = session.commit(&mut rows, &columns).unwrap();
        assert_eq!(outcome.value, CellValue::Null);
        assert_eq!(rows.value(a, "amount"), None);
    }

    #[test]
    fn test_stale_edit_cancelled() {
        let (mut rows, columns, a, _) = fixture();
        let mut session = EditSession::new();
        session.begin_edit(&rows, &columns, a, "name", None).unwrap();
        assert!(session.cancel_if_stale(&rows, &columns).is_none());

        rows.remove_node(a).unwrap();
        assert!(session.cancel_if_stale(&rows, &columns).is_some());
        assert!(!session.is_editing());
    }
}
