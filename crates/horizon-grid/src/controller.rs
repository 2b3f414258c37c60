//! The grid controller.
//!
//! [`GridController`] is the exclusive owner of one grid's state: its rows,
//! columns, expansion flags, selection, edit session, drag state and view
//! query. Every mutation goes through it so that the components stay
//! consistent with each other:
//!
//! - removing rows prunes selection and expansion, and cancels edits or
//!   drags that touched them
//! - removing or hiding a column drops its filter, sort and edit
//! - every column layout change is saved through the attached
//!   [`LayoutStore`]
//!
//! State changes are announced through [`GridSignals`].
//!
//! # Example
//!
//! ```
//! use horizon_grid::prelude::*;
//!
//! let config = GridConfig::new("tasks")
//!     .with_column(ColumnDef::new("name", "Name", CellType::Text))
//!     .with_column(ColumnDef::new("done", "Done", CellType::Checkbox));
//! let mut grid = GridController::new(config).unwrap();
//!
//! let site = grid.insert_row(None, NewRow::new().with_value("name", "Website")).unwrap();
//! grid.insert_row(Some(site), NewRow::new().with_value("name", "Wireframes")).unwrap();
//!
//! // Inserting a child expands its parent.
//! assert_eq!(grid.view().len(), 2);
//!
//! grid.toggle_expanded(site).unwrap();
//! assert_eq!(grid.view().len(), 1);
//! ```

use horizon_grid_core::Signal;
use horizon_grid_core::logging::{span_names, targets};

use crate::config::GridConfig;
use crate::error::{GridError, Result};
use crate::event::{EventOutcome, GridEvent};
use crate::layout::LayoutStore;
use crate::model::{
    CellEdit, CellType, CellValue, ColumnDef, ColumnRegistry, CommitOutcome, DragSource,
    DropOutcome, DropTarget, EditSession, ExpansionState, GridView, NewRow, ReorderEngine, RowId,
    RowRecord, RowTree, SelectionSet, SortSpec, ViewQuery, project,
};

/// Change notifications emitted by a [`GridController`].
///
/// Slots run synchronously inside the mutating call, after the state has
/// changed.
#[derive(Debug, Default)]
pub struct GridSignals {
    /// Emitted after a row (and any nested children) has been inserted.
    /// Args: (parent id, or `None` for a root; new row id)
    pub rows_inserted: Signal<(Option<RowId>, RowId)>,
    /// Emitted after rows have been removed.
    /// Args: removed ids in pre-order
    pub rows_removed: Signal<Vec<RowId>>,
    /// Emitted after a row has moved within its sibling list.
    /// Args: (row id, old index, new index)
    pub row_moved: Signal<(RowId, usize, usize)>,
    /// Emitted after a cell value has changed.
    /// Args: (row id, column key)
    pub cell_changed: Signal<(RowId, String)>,
    /// Emitted after columns were added, removed, reordered, resized, shown
    /// or hidden.
    pub columns_changed: Signal<()>,
    /// Emitted after the selection has changed.
    /// Args: number of selected rows
    pub selection_changed: Signal<usize>,
    /// Emitted after a row was expanded or collapsed, once per row for
    /// expand-all, collapse-all and reveal.
    /// Args: (row id, expanded)
    pub expansion_changed: Signal<(RowId, bool)>,
    /// Emitted when a cell enters edit mode or the session goes idle.
    /// Args: the cell now being edited, or `None`
    pub edit_state_changed: Signal<Option<(RowId, String)>>,
    /// Emitted whenever [`GridController::view`] would return something
    /// different.
    pub view_invalidated: Signal<()>,
}

/// Owner and coordinator of one grid instance.
pub struct GridController {
    config: GridConfig,
    rows: RowTree,
    columns: ColumnRegistry,
    expansion: ExpansionState,
    selection: SelectionSet,
    edit: EditSession,
    reorder: ReorderEngine,
    query: ViewQuery,
    layout_store: Option<Box<dyn LayoutStore>>,
    signals: GridSignals,
}

impl std::fmt::Debug for GridController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GridController")
            .field("grid_id", &self.config.grid_id)
            .field("rows", &self.rows.len())
            .field("columns", &self.columns.len())
            .field("selected", &self.selection.len())
            .field("editing", &self.edit.is_editing())
            .field("dragging", &self.reorder.is_dragging())
            .field("persisted", &self.layout_store.is_some())
            .finish_non_exhaustive()
    }
}

static_assertions::assert_impl_all!(GridController: Send);

impl GridController {
    /// Creates a grid from its configuration.
    ///
    /// The layout store is the one the configuration asks for, if any. A
    /// stored layout is applied on top of the configured columns; a layout
    /// that cannot be read is logged and ignored.
    pub fn new(config: GridConfig) -> Result<Self> {
        let store = config.layout_store();
        Self::build(config, store)
    }

    /// Creates a grid that persists its layout through `store`, regardless of
    /// the configuration's layout section.
    pub fn with_layout_store(config: GridConfig, store: Box<dyn LayoutStore>) -> Result<Self> {
        Self::build(config, Some(store))
    }

    fn build(config: GridConfig, layout_store: Option<Box<dyn LayoutStore>>) -> Result<Self> {
        let columns = ColumnRegistry::from_defs(config.columns.iter().cloned())?;
        let mut controller = Self {
            config,
            rows: RowTree::new(),
            columns,
            expansion: ExpansionState::new(),
            selection: SelectionSet::new(),
            edit: EditSession::new(),
            reorder: ReorderEngine::new(),
            query: ViewQuery::new(),
            layout_store,
            signals: GridSignals::default(),
        };
        if let Err(e) = controller.reload_layout() {
            tracing::warn!(
                target: targets::LAYOUT,
                grid_id = %controller.config.grid_id,
                error = %e,
                "ignoring unreadable column layout"
            );
        }
        tracing::debug!(
            target: targets::CONTROLLER,
            grid_id = %controller.config.grid_id,
            columns = controller.columns.len(),
            "grid created"
        );
        Ok(controller)
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    /// The configuration this grid was created with.
    pub fn config(&self) -> &GridConfig {
        &self.config
    }

    /// The row forest.
    pub fn rows(&self) -> &RowTree {
        &self.rows
    }

    /// The column definitions.
    pub fn columns(&self) -> &ColumnRegistry {
        &self.columns
    }

    /// Expansion flags.
    pub fn expansion(&self) -> &ExpansionState {
        &self.expansion
    }

    /// The selection.
    pub fn selection(&self) -> &SelectionSet {
        &self.selection
    }

    /// The edit session.
    pub fn edit_session(&self) -> &EditSession {
        &self.edit
    }

    /// The drag state machine.
    pub fn reorder_engine(&self) -> &ReorderEngine {
        &self.reorder
    }

    /// The active search, filters and sort.
    pub fn query(&self) -> &ViewQuery {
        &self.query
    }

    /// The attached layout store, if any.
    pub fn layout_store(&self) -> Option<&dyn LayoutStore> {
        self.layout_store.as_deref()
    }

    /// Change notifications.
    pub fn signals(&self) -> &GridSignals {
        &self.signals
    }

    /// Runs the view pipeline over the current state.
    pub fn view(&self) -> GridView<'_> {
        project(&self.rows, &self.columns, &self.expansion, &self.query)
    }

    // =========================================================================
    // Row data
    // =========================================================================

    /// Replaces every row.
    ///
    /// Selection and expansion flags survive for ids present in the new
    /// tree. Any edit or drag is cancelled.
    pub fn set_rows(&mut self, rows: RowTree) {
        self.rows = rows;
        self.expansion.prune(&self.rows);
        let deselected = self.selection.prune(&self.rows);
        if self.edit.cancel().is_some() {
            self.signals.edit_state_changed.emit(None);
        }
        self.reorder.cancel_drag();

        tracing::debug!(target: targets::CONTROLLER, rows = self.rows.len(), "rows replaced");
        if deselected > 0 {
            self.signals.selection_changed.emit(self.selection.len());
        }
        self.signals.view_invalidated.emit(());
    }

    /// Replaces every row from serialized records, keeping their ids.
    pub fn load_records(&mut self, records: Vec<RowRecord>) -> Result<()> {
        let rows = RowTree::from_records(records)?;
        self.set_rows(rows);
        Ok(())
    }

    /// Replaces every row from a JSON array of `{ id, values, children }`.
    pub fn load_rows_json(&mut self, json: &str) -> Result<()> {
        let records: Vec<RowRecord> =
            serde_json::from_str(json).map_err(|e| GridError::format("<rows>", e.to_string()))?;
        self.load_records(records)
    }

    /// Serializes every row as a JSON array of `{ id, values, children }`.
    pub fn rows_json(&self) -> Result<String> {
        serde_json::to_string_pretty(&self.rows.to_records())
            .map_err(|e| GridError::format("<rows>", e.to_string()))
    }

    // =========================================================================
    // Row mutation
    // =========================================================================

    /// Appends a row under `parent`, or as a root when `None`.
    ///
    /// With `expand_parent_on_insert` set, the parent is expanded so the new
    /// row is visible.
    pub fn insert_row(&mut self, parent: Option<RowId>, row: NewRow) -> Result<RowId> {
        let id = match parent {
            Some(parent) => self.rows.insert_child(parent, row)?,
            None => self.rows.insert_root(row),
        };
        if let Some(parent) = parent
            && self.config.expand_parent_on_insert
            && self.expansion.expand(parent)
        {
            self.signals.expansion_changed.emit((parent, true));
        }
        self.signals.rows_inserted.emit((parent, id));
        self.signals.view_invalidated.emit(());
        Ok(id)
    }

    /// Deletes a row and its subtree. Returns the removed ids in pre-order.
    pub fn remove_row(&mut self, id: RowId) -> Result<Vec<RowId>> {
        let removed = self.rows.remove_subtree(id)?;
        self.rows_removed(&removed);
        Ok(removed)
    }

    /// Moves a row within its sibling list. Returns its final index.
    pub fn move_row(&mut self, id: RowId, new_index: usize) -> Result<usize> {
        let from = self.rows.sibling_index(id)?;
        let to = self.rows.move_sibling(id, new_index)?;
        if from != to {
            self.signals.row_moved.emit((id, from, to));
            self.signals.view_invalidated.emit(());
        }
        Ok(to)
    }

    /// Sets one cell outside of an edit session.
    ///
    /// The value is coerced to the column's type first; on failure nothing
    /// changes.
    pub fn set_cell(&mut self, row: RowId, column: &str, value: CellValue) -> Result<CommitOutcome> {
        self.rows.row(row)?;
        let value = self.columns.column(column)?.coerce(&value)?;
        let previous = self.rows.set_value(row, column, value.clone())?;
        let outcome = CommitOutcome {
            row,
            column: column.to_string(),
            previous,
            value,
        };
        self.cell_updated(&outcome);
        Ok(outcome)
    }

    fn rows_removed(&mut self, removed: &[RowId]) {
        self.expansion.forget(removed);
        let deselected = self.selection.forget(removed);
        let edit_cancelled = self.edit.cancel_if_stale(&self.rows, &self.columns).is_some();
        self.reorder.cancel_if_stale(&self.rows, &self.columns);

        self.signals.rows_removed.emit(removed.to_vec());
        if deselected > 0 {
            self.signals.selection_changed.emit(self.selection.len());
        }
        if edit_cancelled {
            self.signals.edit_state_changed.emit(None);
        }
        self.signals.view_invalidated.emit(());
    }

    fn cell_updated(&self, outcome: &CommitOutcome) {
        if outcome.changed() {
            self.signals.cell_changed.emit((outcome.row, outcome.column.clone()));
            self.signals.view_invalidated.emit(());
        }
    }

    // =========================================================================
    // Columns
    // =========================================================================

    /// Appends a column.
    pub fn add_column(&mut self, def: ColumnDef) -> Result<()> {
        self.columns.add_column(def)?;
        self.columns_updated();
        Ok(())
    }

    /// Appends a column whose key is derived from `label`. Returns the key.
    pub fn add_column_from_label(&mut self, label: &str, cell_type: CellType) -> Result<String> {
        let key = self.columns.add_column_from_label(label, cell_type)?;
        self.columns_updated();
        Ok(key)
    }

    /// Deletes a column and its values in every row.
    pub fn remove_column(&mut self, key: &str) -> Result<ColumnDef> {
        let def = self.columns.remove_column(key, &mut self.rows)?;
        if self.edit.cancel_if_stale(&self.rows, &self.columns).is_some() {
            self.signals.edit_state_changed.emit(None);
        }
        self.reorder.cancel_if_stale(&self.rows, &self.columns);
        self.reconcile_query();
        self.columns_updated();
        Ok(def)
    }

    /// Shows or hides a column. Returns `true` if visibility changed.
    ///
    /// Hiding a column drops its filter, its sort and any edit on it.
    pub fn set_column_visible(&mut self, key: &str, visible: bool) -> Result<bool> {
        let changed = self.columns.set_visible(key, visible)?;
        if !visible && self.edit.cancel_if_column(key).is_some() {
            self.signals.edit_state_changed.emit(None);
        }
        let query_changed = self.reconcile_query();
        if changed {
            self.columns_updated();
        } else if query_changed {
            self.signals.view_invalidated.emit(());
        }
        Ok(changed)
    }

    /// Replaces the column order with a permutation of the existing keys.
    pub fn reorder_columns<S: AsRef<str>>(&mut self, new_order: &[S]) -> Result<()> {
        self.columns.reorder(new_order)?;
        self.columns_updated();
        Ok(())
    }

    /// Moves one column. Returns its final index.
    pub fn move_column(&mut self, key: &str, new_index: usize) -> Result<usize> {
        let from = self.columns.index_of(key);
        let to = self.columns.move_column(key, new_index)?;
        if from != Some(to) {
            self.columns_updated();
        }
        Ok(to)
    }

    /// Sets or clears a column's width.
    pub fn set_column_width(&mut self, key: &str, width: Option<f32>) -> Result<()> {
        self.columns.set_width(key, width)?;
        self.columns_updated();
        Ok(())
    }

    /// Saves the column layout now. Returns `false` if no store is attached.
    pub fn save_layout(&self) -> Result<bool> {
        let Some(store) = self.layout_store.as_deref() else {
            return Ok(false);
        };
        self.columns.save(store, &self.config.grid_id)?;
        Ok(true)
    }

    /// Re-applies the stored column layout. Returns `false` if no store is
    /// attached or nothing was stored.
    pub fn reload_layout(&mut self) -> Result<bool> {
        let Some(store) = self.layout_store.as_deref() else {
            return Ok(false);
        };
        if !self.columns.load(store, &self.config.grid_id)? {
            return Ok(false);
        }
        if let Some(edit) = self.edit.current()
            && !self.columns.is_visible(&edit.column)
        {
            self.edit.cancel();
            self.signals.edit_state_changed.emit(None);
        }
        self.reconcile_query();
        self.signals.columns_changed.emit(());
        self.signals.view_invalidated.emit(());
        Ok(true)
    }

    fn columns_updated(&self) {
        self.autosave_layout();
        self.signals.columns_changed.emit(());
        self.signals.view_invalidated.emit(());
    }

    fn autosave_layout(&self) {
        if let Err(e) = self.save_layout() {
            tracing::error!(
                target: targets::LAYOUT,
                grid_id = %self.config.grid_id,
                "Failed to auto-save column layout: {}",
                e
            );
        }
    }

    /// Drops filters and sort on columns that are gone or hidden. Returns
    /// `true` if the query changed.
    fn reconcile_query(&mut self) -> bool {
        let columns = &self.columns;
        let before = self.query.filters.len();
        self.query.filters.retain(|key, _| columns.is_visible(key));
        let mut changed = self.query.filters.len() != before;
        if self
            .query
            .sort
            .as_ref()
            .is_some_and(|sort| !columns.is_visible(&sort.column))
        {
            self.query.sort = None;
            changed = true;
        }
        if changed {
            tracing::debug!(target: targets::VIEW, "dropped query terms on unavailable columns");
        }
        changed
    }

    // =========================================================================
    // Search, filter and sort
    // =========================================================================

    /// Sets the search term. Returns `true` if it changed.
    pub fn set_search(&mut self, search: impl Into<String>) -> bool {
        let search = search.into();
        if self.query.search == search {
            return false;
        }
        tracing::debug!(target: targets::VIEW, search = %search, "search changed");
        self.query.search = search;
        self.signals.view_invalidated.emit(());
        true
    }

    /// Sets a column filter; a blank value clears it. Returns `true` if the
    /// query changed.
    ///
    /// Fails with `Unsupported` if the column is not filterable.
    pub fn set_filter(&mut self, column: &str, value: impl Into<String>) -> Result<bool> {
        let def = self.columns.column(column)?;
        if !def.filterable {
            return Err(GridError::Unsupported {
                column: column.to_string(),
                capability: "filterable",
            });
        }
        let value = value.into();
        let changed = if value.trim().is_empty() {
            self.query.filters.remove(column).is_some()
        } else if self.query.filters.get(column) == Some(&value) {
            false
        } else {
            self.query.filters.insert(column.to_string(), value);
            true
        };
        if changed {
            tracing::debug!(target: targets::VIEW, column, "filter changed");
            self.signals.view_invalidated.emit(());
        }
        Ok(changed)
    }

    /// Removes a column filter. Returns `true` if one was set.
    pub fn clear_filter(&mut self, column: &str) -> bool {
        let changed = self.query.filters.remove(column).is_some();
        if changed {
            self.signals.view_invalidated.emit(());
        }
        changed
    }

    /// Removes every filter. Returns `true` if any was set.
    pub fn clear_filters(&mut self) -> bool {
        let changed = !self.query.filters.is_empty();
        self.query.filters.clear();
        if changed {
            self.signals.view_invalidated.emit(());
        }
        changed
    }

    /// Handles a header click: the same column toggles direction, another
    /// column sorts ascending. Returns the new sort.
    ///
    /// Fails with `Unsupported` if the column is not sortable.
    pub fn click_sort(&mut self, column: &str) -> Result<SortSpec> {
        let def = self.columns.column(column)?;
        if !def.sortable {
            return Err(GridError::Unsupported {
                column: column.to_string(),
                capability: "sortable",
            });
        }
        let spec = SortSpec::click(self.query.sort.as_ref(), column);
        tracing::debug!(target: targets::VIEW, column, order = ?spec.order, "sort changed");
        self.query.sort = Some(spec.clone());
        self.signals.view_invalidated.emit(());
        Ok(spec)
    }

    /// Restores tree order. Returns `true` if a sort was set.
    pub fn clear_sort(&mut self) -> bool {
        let changed = self.query.sort.take().is_some();
        if changed {
            self.signals.view_invalidated.emit(());
        }
        changed
    }

    // =========================================================================
    // Expansion
    // =========================================================================

    /// Flips a row's expander. Returns the new state.
    pub fn toggle_expanded(&mut self, id: RowId) -> Result<bool> {
        self.rows.row(id)?;
        let expanded = self.expansion.toggle(id);
        self.signals.expansion_changed.emit((id, expanded));
        self.signals.view_invalidated.emit(());
        Ok(expanded)
    }

    /// Sets a row's expander. Returns `true` if it changed.
    pub fn set_expanded(&mut self, id: RowId, expanded: bool) -> Result<bool> {
        self.rows.row(id)?;
        let changed = self.expansion.set_expanded(id, expanded);
        if changed {
            self.signals.expansion_changed.emit((id, expanded));
            self.signals.view_invalidated.emit(());
        }
        Ok(changed)
    }

    /// Expands every row with children. Returns how many were expanded.
    pub fn expand_all(&mut self) -> usize {
        let opened: Vec<RowId> = self
            .rows
            .preorder()
            .filter(|entry| entry.row.has_children() && !self.expansion.is_expanded(entry.row.id()))
            .map(|entry| entry.row.id())
            .collect();
        self.expansion.expand_all(&self.rows);
        self.expansion_updated(&opened, true);
        opened.len()
    }

    /// Collapses every row. Returns `true` if anything was expanded.
    pub fn collapse_all(&mut self) -> bool {
        let closed: Vec<RowId> = self
            .rows
            .preorder()
            .map(|entry| entry.row.id())
            .filter(|&id| self.expansion.is_expanded(id))
            .collect();
        let changed = self.expansion.collapse_all();
        self.expansion_updated(&closed, false);
        changed
    }

    /// Expands every ancestor of a row so it is painted (unless filtered
    /// out). Returns `true` if any flag changed.
    pub fn reveal(&mut self, id: RowId) -> Result<bool> {
        let path = self.rows.find_path(id)?;
        let opened: Vec<RowId> = path[..path.len() - 1]
            .iter()
            .copied()
            .filter(|&ancestor| !self.expansion.is_expanded(ancestor))
            .collect();
        let changed = self.expansion.expand_to(&path);
        self.expansion_updated(&opened, true);
        Ok(changed)
    }

    /// One `expansion_changed` per flipped row, then a single invalidation.
    fn expansion_updated(&self, ids: &[RowId], expanded: bool) {
        for &id in ids {
            self.signals.expansion_changed.emit((id, expanded));
        }
        if !ids.is_empty() {
            self.signals.view_invalidated.emit(());
        }
    }

    // =========================================================================
    // Editing
    // =========================================================================

    /// Puts a cell into edit mode with its stored value as the draft.
    pub fn begin_edit(&mut self, row: RowId, column: &str) -> Result<()> {
        self.begin_edit_with(row, column, None)
    }

    /// Puts a cell into edit mode with an explicit initial draft.
    pub fn begin_edit_with(
        &mut self,
        row: RowId,
        column: &str,
        initial: Option<CellValue>,
    ) -> Result<()> {
        self.edit.begin_edit(&self.rows, &self.columns, row, column, initial)?;
        self.signals.edit_state_changed.emit(Some((row, column.to_string())));
        Ok(())
    }

    /// Replaces the draft of the active edit.
    pub fn set_draft(&mut self, value: CellValue) -> Result<()> {
        self.edit.set_draft(value)
    }

    /// Commits the active edit.
    ///
    /// The session goes idle either way; a draft that fails coercion is lost
    /// and the row is left unchanged.
    pub fn commit_edit(&mut self) -> Result<CommitOutcome> {
        if !self.edit.is_editing() {
            return Err(GridError::NotEditing);
        }
        let result = self.edit.commit(&mut self.rows, &self.columns);
        self.signals.edit_state_changed.emit(None);
        let outcome = result?;
        self.cell_updated(&outcome);
        Ok(outcome)
    }

    /// Leaves edit mode without writing. Returns the dropped edit.
    pub fn cancel_edit(&mut self) -> Option<CellEdit> {
        let dropped = self.edit.cancel();
        if dropped.is_some() {
            self.signals.edit_state_changed.emit(None);
        }
        dropped
    }

    // =========================================================================
    // Drag and drop
    // =========================================================================

    /// Starts dragging a row or column.
    pub fn begin_drag(&mut self, source: DragSource) -> Result<()> {
        self.reorder.begin_drag(&self.rows, &self.columns, source)?;
        Ok(())
    }

    /// Reports whether dropping on `target` is allowed.
    pub fn update_drag(&mut self, target: &DropTarget) -> Result<bool> {
        self.reorder.update_drag(&self.rows, &self.columns, target)
    }

    /// Drops onto `target`. The drag ends whether or not the drop is legal.
    pub fn end_drag(&mut self, target: &DropTarget) -> Result<DropOutcome> {
        let outcome = self.reorder.end_drag(&mut self.rows, &mut self.columns, target)?;
        match &outcome {
            DropOutcome::Row { id, from, to, .. } if outcome.moved() => {
                self.signals.row_moved.emit((*id, *from, *to));
                self.signals.view_invalidated.emit(());
            }
            DropOutcome::Column { .. } if outcome.moved() => self.columns_updated(),
            _ => {}
        }
        Ok(outcome)
    }

    /// Abandons the drag. Returns `true` if one was in progress.
    pub fn cancel_drag(&mut self) -> bool {
        self.reorder.cancel_drag().is_some()
    }

    // =========================================================================
    // Selection
    // =========================================================================

    /// Selects a row. Returns `true` if it was not already selected.
    pub fn select(&mut self, id: RowId) -> Result<bool> {
        self.rows.row(id)?;
        let changed = self.selection.select(id);
        self.selection_updated(changed);
        Ok(changed)
    }

    /// Deselects a row. Returns `true` if it was selected.
    pub fn deselect(&mut self, id: RowId) -> bool {
        let changed = self.selection.deselect(id);
        self.selection_updated(changed);
        changed
    }

    /// Flips a row's selection. Returns the new state.
    pub fn toggle_selected(&mut self, id: RowId) -> Result<bool> {
        self.rows.row(id)?;
        let selected = self.selection.toggle(id);
        self.selection_updated(true);
        Ok(selected)
    }

    /// Selects the painted rows between the anchor and `to`. Returns how
    /// many were newly selected.
    pub fn select_range(&mut self, to: RowId) -> Result<usize> {
        self.rows.row(to)?;
        let visible = self.view().row_ids();
        let added = self.selection.select_range(to, &visible);
        self.selection_updated(added > 0);
        Ok(added)
    }

    /// Selects every painted row. Returns how many were newly selected.
    pub fn select_all_visible(&mut self) -> usize {
        let visible = self.view().row_ids();
        let added = self.selection.select_all(visible);
        self.selection_updated(added > 0);
        added
    }

    /// Deselects everything. Returns `true` if anything was selected.
    pub fn clear_selection(&mut self) -> bool {
        let changed = self.selection.clear();
        self.selection_updated(changed);
        changed
    }

    /// Selected ids in tree pre-order.
    pub fn selected_ids(&self) -> Vec<RowId> {
        self.selection.in_tree_order(&self.rows)
    }

    fn selection_updated(&self, changed: bool) {
        if changed {
            tracing::trace!(target: targets::SELECTION, selected = self.selection.len(), "selection changed");
            self.signals.selection_changed.emit(self.selection.len());
        }
    }

    // =========================================================================
    // Bulk operations
    // =========================================================================

    /// Deletes every selected row with its subtree. Returns the removed ids.
    ///
    /// Selected rows under another selected row go with their ancestor.
    pub fn delete_selected(&mut self) -> Result<Vec<RowId>> {
        let targets = self.selected_ids();
        let mut removed = Vec::new();
        for id in targets {
            if self.rows.contains(id) {
                removed.extend(self.rows.remove_subtree(id)?);
            }
        }
        if !removed.is_empty() {
            tracing::debug!(target: targets::SELECTION, removed = removed.len(), "deleted selected rows");
            self.rows_removed(&removed);
        }
        Ok(removed)
    }

    /// Writes one value into a column of every selected row, e.g. marking
    /// them reconciled. Returns how many cells changed.
    ///
    /// The value is coerced once up front; if that fails nothing changes.
    pub fn bulk_set(&mut self, column: &str, value: CellValue) -> Result<usize> {
        let value = self.columns.column(column)?.coerce(&value)?;
        let targets = self.selected_ids();
        let mut changed = 0;
        for id in targets {
            let previous = self.rows.set_value(id, column, value.clone())?;
            if previous.as_ref().unwrap_or(&CellValue::Null) != &value {
                changed += 1;
                self.signals.cell_changed.emit((id, column.to_string()));
            }
        }
        tracing::debug!(target: targets::SELECTION, column, changed, "bulk set");
        if changed > 0 {
            self.signals.view_invalidated.emit(());
        }
        Ok(changed)
    }

    /// The selected rows' own values in pre-order, without children.
    pub fn export_selected(&self) -> Vec<RowRecord> {
        self.selected_ids()
            .into_iter()
            .filter_map(|id| self.rows.get(id))
            .map(|node| RowRecord {
                id: node.id(),
                values: node.values().clone(),
                children: Vec::new(),
            })
            .collect()
    }

    /// [`export_selected`](Self::export_selected) as a JSON array.
    pub fn export_selected_json(&self) -> Result<String> {
        serde_json::to_string_pretty(&self.export_selected())
            .map_err(|e| GridError::format("<export>", e.to_string()))
    }

    // =========================================================================
    // Gesture dispatch
    // =========================================================================

    /// Applies one normalized gesture.
    ///
    /// Rejected gestures return their error and leave the grid unchanged.
    /// Hosts usually ignore `ScopeViolation` drops.
    pub fn dispatch(&mut self, event: GridEvent) -> Result<EventOutcome> {
        let span = tracing::debug_span!(target: targets::CONTROLLER, span_names::DISPATCH);
        let _guard = span.enter();

        tracing::trace!(target: targets::CONTROLLER, ?event, "dispatching gesture");
        let result = self.apply(event);
        if let Err(e) = &result {
            tracing::debug!(target: targets::CONTROLLER, error = %e, kind = ?e.kind(), "gesture rejected");
        }
        result
    }

    fn apply(&mut self, event: GridEvent) -> Result<EventOutcome> {
        let outcome = match event {
            GridEvent::BeginEdit { row, column } => {
                self.begin_edit(row, &column)?;
                EventOutcome::Applied
            }
            GridEvent::EditInput(value) => {
                self.set_draft(value)?;
                EventOutcome::Applied
            }
            GridEvent::CommitEdit => EventOutcome::Committed(self.commit_edit()?),
            GridEvent::CancelEdit => EventOutcome::from_changed(self.cancel_edit().is_some()),

            GridEvent::DragStart(source) => {
                self.begin_drag(source)?;
                EventOutcome::Applied
            }
            GridEvent::DragMove(target) => EventOutcome::DropAllowed(self.update_drag(&target)?),
            GridEvent::Drop(target) => EventOutcome::Dropped(self.end_drag(&target)?),
            GridEvent::DragCancel => EventOutcome::from_changed(self.cancel_drag()),

            GridEvent::SetSearch(search) => EventOutcome::from_changed(self.set_search(search)),
            GridEvent::SetFilter { column, value } => {
                EventOutcome::from_changed(self.set_filter(&column, value)?)
            }
            GridEvent::ClearFilter(column) => EventOutcome::from_changed(self.clear_filter(&column)),
            GridEvent::SortClick(column) => EventOutcome::Sorted(self.click_sort(&column)?),
            GridEvent::ClearSort => EventOutcome::from_changed(self.clear_sort()),
            GridEvent::ToggleExpand(id) => EventOutcome::Expanded(self.toggle_expanded(id)?),

            GridEvent::InsertRow { parent, row } => {
                EventOutcome::RowInserted(self.insert_row(parent, row)?)
            }
            GridEvent::RemoveRow(id) => EventOutcome::RowsRemoved(self.remove_row(id)?),

            GridEvent::AddColumn(def) => {
                let key = def.key.clone();
                self.add_column(def)?;
                EventOutcome::ColumnAdded(key)
            }
            GridEvent::AddColumnFromLabel { label, cell_type } => {
                EventOutcome::ColumnAdded(self.add_column_from_label(&label, cell_type)?)
            }
            GridEvent::RemoveColumn(key) => EventOutcome::ColumnRemoved(self.remove_column(&key)?),
            GridEvent::SetColumnVisible { column, visible } => {
                EventOutcome::from_changed(self.set_column_visible(&column, visible)?)
            }

            GridEvent::Select(id) => {
                self.select(id)?;
                EventOutcome::Selection(self.selection.len())
            }
            GridEvent::Deselect(id) => {
                self.deselect(id);
                EventOutcome::Selection(self.selection.len())
            }
            GridEvent::ToggleSelect(id) => {
                self.toggle_selected(id)?;
                EventOutcome::Selection(self.selection.len())
            }
            GridEvent::SelectRange(id) => {
                self.select_range(id)?;
                EventOutcome::Selection(self.selection.len())
            }
            GridEvent::SelectAll => {
                self.select_all_visible();
                EventOutcome::Selection(self.selection.len())
            }
            GridEvent::ClearSelection => {
                self.clear_selection();
                EventOutcome::Selection(self.selection.len())
            }
            GridEvent::DeleteSelected => EventOutcome::RowsRemoved(self.delete_selected()?),
        };
        Ok(outcome)
    }
}
