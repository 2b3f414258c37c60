//! Column definitions and the ordered column registry.

use std::collections::{HashMap, HashSet};
use std::sync::OnceLock;

use horizon_grid_core::logging::targets;
use regex::Regex;
use serde::{Deserialize, Serialize};

use super::cell_type::{CellCapabilities, CellType};
use super::row_tree::RowTree;
use super::value::CellValue;
use crate::error::{GridError, Result};
use crate::layout::{ColumnLayout, LayoutStore};

fn default_true() -> bool {
    true
}

/// Declaration of one grid column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnDef {
    /// Unique key used in row value maps.
    pub key: String,
    /// Header text.
    pub label: String,
    /// Semantic type of the column's values.
    #[serde(rename = "type", default)]
    pub cell_type: CellType,
    /// Allowed values for select columns.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<String>,
    /// Whether clicking the header sorts by this column.
    #[serde(default = "default_true")]
    pub sortable: bool,
    /// Whether the column accepts filter values.
    #[serde(default = "default_true")]
    pub filterable: bool,
    /// Preferred width in logical pixels.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<f32>,
}

impl ColumnDef {
    /// Creates a sortable, filterable column with no width preference.
    pub fn new(key: impl Into<String>, label: impl Into<String>, cell_type: CellType) -> Self {
        Self {
            key: key.into(),
            label: label.into(),
            cell_type,
            options: Vec::new(),
            sortable: true,
            filterable: true,
            width: None,
        }
    }

    /// Sets the select options.
    pub fn with_options<I, S>(mut self, options: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.options = options.into_iter().map(Into::into).collect();
        self
    }

    /// Sets whether the column can be sorted.
    pub fn with_sortable(mut self, sortable: bool) -> Self {
        self.sortable = sortable;
        self
    }

    /// Sets whether the column can be filtered.
    pub fn with_filterable(mut self, filterable: bool) -> Self {
        self.filterable = filterable;
        self
    }

    /// Sets the preferred width.
    pub fn with_width(mut self, width: f32) -> Self {
        self.width = Some(width);
        self
    }

    /// The capability table entry for this column's type.
    pub fn capabilities(&self) -> &'static CellCapabilities {
        self.cell_type.capabilities()
    }

    /// Validates and normalizes a value for this column.
    pub fn coerce(&self, value: &CellValue) -> Result<CellValue> {
        self.capabilities()
            .coerce(value, &self.options)
            .map_err(|message| GridError::invalid_value(&self.key, self.cell_type, message))
    }

    /// Display string for a stored value.
    pub fn display(&self, value: &CellValue) -> String {
        self.capabilities().display(value)
    }
}

fn non_slug_chars() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"[^a-z0-9]+").expect("slug pattern is valid"))
}

/// Derives a column key from a header label: lowercase ASCII letters and
/// digits joined by underscores.
///
/// ```
/// use horizon_grid::model::slugify;
///
/// assert_eq!(slugify("Due Date"), "due_date");
/// assert_eq!(slugify("  % Done!"), "done");
/// ```
pub fn slugify(label: &str) -> String {
    let lowered = label.to_lowercase();
    non_slug_chars()
        .replace_all(&lowered, "_")
        .trim_matches('_')
        .to_string()
}

/// Ordered set of column definitions with visibility and widths.
///
/// The order always holds every known key exactly once.
#[derive(Debug, Clone, Default)]
pub struct ColumnRegistry {
    columns: HashMap<String, ColumnDef>,
    order: Vec<String>,
    hidden: HashSet<String>,
}

impl ColumnRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a registry from definitions, in the given order.
    pub fn from_defs(defs: impl IntoIterator<Item = ColumnDef>) -> Result<Self> {
        let mut registry = Self::new();
        for def in defs {
            registry.add_column(def)?;
        }
        Ok(registry)
    }

    // =========================================================================
    // Queries
    // =========================================================================

    /// Number of columns, hidden ones included.
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// Returns `true` if there are no columns.
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Returns `true` if a column with this key exists.
    pub fn contains(&self, key: &str) -> bool {
        self.columns.contains_key(key)
    }

    /// Looks up a column.
    pub fn get(&self, key: &str) -> Option<&ColumnDef> {
        self.columns.get(key)
    }

    /// Looks up a column, failing with `NotFound`.
    pub fn column(&self, key: &str) -> Result<&ColumnDef> {
        self.columns
            .get(key)
            .ok_or_else(|| GridError::ColumnNotFound(key.to_string()))
    }

    /// Keys in display order, hidden ones included.
    pub fn order(&self) -> &[String] {
        &self.order
    }

    /// Position of a column in the order.
    pub fn index_of(&self, key: &str) -> Option<usize> {
        self.order.iter().position(|k| k == key)
    }

    /// All columns in display order.
    pub fn columns(&self) -> impl Iterator<Item = &ColumnDef> + '_ {
        self.order.iter().filter_map(|key| self.columns.get(key))
    }

    /// Visible columns in display order.
    pub fn visible_columns(&self) -> Vec<&ColumnDef> {
        self.columns().filter(|def| !self.hidden.contains(&def.key)).collect()
    }

    /// Returns whether a column is shown. Unknown keys are not visible.
    pub fn is_visible(&self, key: &str) -> bool {
        self.contains(key) && !self.hidden.contains(key)
    }

    // =========================================================================
    // Mutation
    // =========================================================================

    /// Appends a column at the end of the order.
    pub fn add_column(&mut self, def: ColumnDef) -> Result<()> {
        if def.key.trim().is_empty() {
            return Err(GridError::invalid_value(
                &def.key,
                def.cell_type,
                "column key must not be empty",
            ));
        }
        if self.columns.contains_key(&def.key) {
            return Err(GridError::DuplicateKey(def.key));
        }
        if let Some(width) = def.width {
            validate_width(&def, width)?;
        }

        tracing::debug!(target: targets::COLUMNS, key = %def.key, cell_type = %def.cell_type, "added column");
        self.order.push(def.key.clone());
        self.columns.insert(def.key.clone(), def);
        Ok(())
    }

    /// Adds a column whose key is derived from `label`, suffixing `_2`,
    /// `_3`, ... until it is unique. Returns the key.
    pub fn add_column_from_label(&mut self, label: &str, cell_type: CellType) -> Result<String> {
        let base = slugify(label);
        if base.is_empty() {
            return Err(GridError::invalid_value(
                label,
                cell_type,
                "label does not contain any letters or digits",
            ));
        }
        let mut key = base.clone();
        let mut suffix = 2;
        while self.columns.contains_key(&key) {
            key = format!("{base}_{suffix}");
            suffix += 1;
        }
        self.add_column(ColumnDef::new(key.clone(), label.trim(), cell_type))?;
        Ok(key)
    }

    /// Permanently deletes a column and strips its values from every row.
    pub fn remove_column(&mut self, key: &str, rows: &mut RowTree) -> Result<ColumnDef> {
        let def = self
            .columns
            .remove(key)
            .ok_or_else(|| GridError::ColumnNotFound(key.to_string()))?;
        self.order.retain(|k| k != key);
        self.hidden.remove(key);
        rows.strip_column(key);
        tracing::debug!(target: targets::COLUMNS, key, "removed column");
        Ok(def)
    }

    /// Shows or hides a column. Returns `true` if visibility changed.
    pub fn set_visible(&mut self, key: &str, visible: bool) -> Result<bool> {
        self.column(key)?;
        let changed = if visible {
            self.hidden.remove(key)
        } else {
            self.hidden.insert(key.to_string())
        };
        if changed {
            tracing::debug!(target: targets::COLUMNS, key, visible, "column visibility changed");
        }
        Ok(changed)
    }

    /// Replaces the column order.
    ///
    /// `new_order` must contain every known key exactly once; otherwise the
    /// order is left untouched and `InvalidPermutation` is returned.
    pub fn reorder<S: AsRef<str>>(&mut self, new_order: &[S]) -> Result<()> {
        if new_order.len() != self.order.len() {
            return Err(GridError::InvalidPermutation(format!(
                "expected {} keys, got {}",
                self.order.len(),
                new_order.len()
            )));
        }
        let mut seen = HashSet::with_capacity(new_order.len());
        for key in new_order {
            let key = key.as_ref();
            if !self.columns.contains_key(key) {
                return Err(GridError::InvalidPermutation(format!("unknown column '{key}'")));
            }
            if !seen.insert(key) {
                return Err(GridError::InvalidPermutation(format!("column '{key}' listed twice")));
            }
        }

        self.order = new_order.iter().map(|k| k.as_ref().to_string()).collect();
        tracing::debug!(target: targets::COLUMNS, order = ?self.order, "columns reordered");
        Ok(())
    }

    /// Moves one column to `new_index` by remove-then-insert. Indices past
    /// the end land on the last position. Returns the final index.
    pub fn move_column(&mut self, key: &str, new_index: usize) -> Result<usize> {
        let old_index = self
            .index_of(key)
            .ok_or_else(|| GridError::ColumnNotFound(key.to_string()))?;
        let moved = self.order.remove(old_index);
        let target = new_index.min(self.order.len());
        self.order.insert(target, moved);
        tracing::debug!(target: targets::COLUMNS, key, from = old_index, to = target, "moved column");
        Ok(target)
    }

    /// Sets or clears a column's width.
    pub fn set_width(&mut self, key: &str, width: Option<f32>) -> Result<()> {
        let def = self
            .columns
            .get_mut(key)
            .ok_or_else(|| GridError::ColumnNotFound(key.to_string()))?;
        if let Some(width) = width {
            validate_width(def, width)?;
        }
        def.width = width;
        Ok(())
    }

    // =========================================================================
    // Layout
    // =========================================================================

    /// Snapshot of order, visibility and widths.
    pub fn layout(&self) -> ColumnLayout {
        let mut hidden: Vec<String> = self.hidden.iter().cloned().collect();
        hidden.sort();
        ColumnLayout {
            order: self.order.clone(),
            hidden,
            widths: self
                .columns()
                .filter_map(|def| def.width.map(|w| (def.key.clone(), w)))
                .collect(),
        }
    }

    /// Applies a saved layout.
    ///
    /// Saved keys that no longer exist are ignored; known columns missing
    /// from the saved order keep their relative order at the end.
    pub fn apply_layout(&mut self, layout: &ColumnLayout) {
        let mut order = Vec::with_capacity(self.order.len());
        let mut placed = HashSet::new();
        for key in &layout.order {
            if self.columns.contains_key(key) && placed.insert(key.as_str()) {
                order.push(key.clone());
            }
        }
        for key in &self.order {
            if !placed.contains(key.as_str()) {
                order.push(key.clone());
            }
        }
        self.order = order;

        self.hidden = layout
            .hidden
            .iter()
            .filter(|key| self.columns.contains_key(key.as_str()))
            .cloned()
            .collect();

        for (key, width) in &layout.widths {
            if let Some(def) = self.columns.get_mut(key)
                && width.is_finite()
                && *width > 0.0
            {
                def.width = Some(*width);
            }
        }
        tracing::debug!(target: targets::LAYOUT, order = ?self.order, hidden = self.hidden.len(), "applied column layout");
    }

    /// Loads and applies the layout stored for `grid_id`. Returns `false` if
    /// nothing was stored.
    pub fn load(&mut self, store: &dyn LayoutStore, grid_id: &str) -> Result<bool> {
        match store.load(grid_id)? {
            Some(layout) => {
                self.apply_layout(&layout);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Saves the current layout under `grid_id`.
    pub fn save(&self, store: &dyn LayoutStore, grid_id: &str) -> Result<()> {
        store.save(grid_id, &self.layout())
    }
}

fn validate_width(def: &ColumnDef, width: f32) -> Result<()> {
    if width.is_finite() && width > 0.0 {
        Ok(())
    } else {
        Err(GridError::invalid_value(
            &def.key,
            def.cell_type,
            format!("width must be positive, got {width}"),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::layout::MemoryLayoutStore;
    use crate::model::NewRow;

    fn registry() -> ColumnRegistry {
        ColumnRegistry::from_defs([
            ColumnDef::new("name", "Name", CellType::Text),
            ColumnDef::new("status", "Status", CellType::Select).with_options(["Open", "Done"]),
            ColumnDef::new("due", "Due", CellType::Date),
        ])
        .unwrap()
    }

    fn keys(defs: &[&ColumnDef]) -> Vec<String> {
        defs.iter().map(|d| d.key.clone()).collect()
    }

    #[test]
    fn test_add_duplicate_key() {
        let mut columns = registry();
        let err = columns.add_column(ColumnDef::new("name", "Other", CellType::Text)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DuplicateKey);
        assert_eq!(columns.len(), 3);
    }

    #[test]
    fn test_add_then_reorder_first() {
        let mut columns = registry();
        columns.add_column(ColumnDef::new("risk", "Risk", CellType::Rating)).unwrap();
        columns.reorder(&["risk", "name", "status", "due"]).unwrap();
        assert_eq!(keys(&columns.visible_columns()), ["risk", "name", "status", "due"]);
    }

    #[test]
    fn test_reorder_rejects_non_permutation() {
        let mut columns = registry();
        for bad in [
            vec!["name", "status"],
            vec!["name", "status", "status"],
            vec!["name", "status", "owner"],
        ] {
            let err = columns.reorder(&bad).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::InvalidPermutation);
        }
        assert_eq!(columns.order(), ["name", "status", "due"]);
    }

    #[test]
    fn test_reorder_inverse_restores() {
        let mut columns = registry();
        let original = columns.order().to_vec();
        columns.reorder(&["due", "name", "status"]).unwrap();
        columns.reorder(&original).unwrap();
        assert_eq!(columns.order(), original.as_slice());
    }

    #[test]
    fn test_label_slugs_are_unique() {
        let mut columns = registry();
        assert_eq!(columns.add_column_from_label("Due", CellType::Date).unwrap(), "due_2");
        assert_eq!(columns.add_column_from_label("Due", CellType::Date).unwrap(), "due_3");
        assert_eq!(
            columns.add_column_from_label("Owner E-mail", CellType::Url).unwrap(),
            "owner_e_mail"
        );
        let err = columns.add_column_from_label("!!!", CellType::Text).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidValue);
    }

    #[test]
    fn test_hide_keeps_data() {
        let mut columns = registry();
        assert!(columns.set_visible("status", false).unwrap());
        assert!(!columns.set_visible("status", false).unwrap());
        assert_eq!(keys(&columns.visible_columns()), ["name", "due"]);
        assert_eq!(columns.order().len(), 3);
        assert!(columns.set_visible("status", true).unwrap());
        assert!(columns.set_visible("nope", true).is_err());
    }

    #[test]
    fn test_remove_strips_rows() {
        let mut columns = registry();
        let mut rows = RowTree::new();
        let id = rows.insert_root(NewRow::new().with_value("name", "a").with_value("due", "2024-01-01"));

        columns.remove_column("due", &mut rows).unwrap();
        assert!(!columns.contains("due"));
        assert_eq!(columns.order(), ["name", "status"]);
        assert_eq!(rows.value(id, "due"), None);
        assert!(columns.remove_column("due", &mut rows).is_err());
    }

    #[test]
    fn test_move_column() {
        let mut columns = registry();
        assert_eq!(columns.move_column("name", 9).unwrap(), 2);
        assert_eq!(columns.order(), ["status", "due", "name"]);
        columns.move_column("name", 0).unwrap();
        assert_eq!(columns.order(), ["name", "status", "due"]);
    }

    #[test]
    fn test_coerce_reports_column() {
        let columns = registry();
        let status = columns.column("status").unwrap();
        assert_eq!(status.coerce(&"done".into()).unwrap(), CellValue::from("Done"));
        let err = status.coerce(&"Blocked".into()).unwrap_err();
        assert!(err.to_string().starts_with("Invalid value for column 'status' (select)"));
    }

    #[test]
    fn test_layout_round_trip_through_store() {
        let store = MemoryLayoutStore::new();
        let mut columns = registry();
        columns.move_column("due", 0).unwrap();
        columns.set_visible("status", false).unwrap();
        columns.set_width("name", Some(180.0)).unwrap();
        columns.save(&store, "tasks").unwrap();

        let mut restored = registry();
        assert!(restored.load(&store, "tasks").unwrap());
        assert_eq!(restored.order(), ["due", "name", "status"]);
        assert!(!restored.is_visible("status"));
        assert_eq!(restored.column("name").unwrap().width, Some(180.0));

        assert!(!restored.load(&store, "other").unwrap());
    }

    #[test]
    fn test_apply_layout_reconciles_keys() {
        let mut columns = registry();
        columns.apply_layout(&ColumnLayout {
            order: vec!["due".into(), "gone".into(), "name".into()],
            hidden: vec!["gone".into()],
            widths: Default::default(),
        });
        assert_eq!(columns.order(), ["due", "name", "status"]);
        assert!(columns.is_visible("status"));
    }

    #[test]
    fn test_width_validation() {
        let mut columns = registry();
        assert!(columns.set_width("name", Some(-4.0)).is_err());
        assert!(columns.set_width("name", Some(f32::NAN)).is_err());
        columns.set_width("name", Some(90.0)).unwrap();
        columns.set_width("name", None).unwrap();
        assert_eq!(columns.column("name").unwrap().width, None);
    }

    #[test]
    fn test_def_json() {
        let def: ColumnDef = serde_json::from_str(
            r#"{"key": "state", "label": "State", "type": "select", "options": ["Matched", "Unmatched"]}"#,
        )
        .unwrap();
        assert_eq!(def.cell_type, CellType::Select);
        assert!(def.sortable && def.filterable);
        assert_eq!(def.width, None);
    }
}
