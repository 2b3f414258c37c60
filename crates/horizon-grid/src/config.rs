//! Grid configuration.
//!
//! A [`GridConfig`] names the grid instance, chooses where its column layout
//! is persisted and carries the initial column definitions. It can be built
//! in code or loaded from TOML or JSON:
//!
//! ```
//! use horizon_grid::config::GridConfig;
//! use horizon_grid::layout::LayoutFormat;
//!
//! let config = GridConfig::from_toml_str(r#"
//!     grid_id = "bank-reconciliation"
//!
//!     [layout]
//!     persist = true
//!     format = "toml"
//!
//!     [[columns]]
//!     key = "state"
//!     label = "State"
//!     type = "select"
//!     options = ["Matched", "Unmatched"]
//! "#).unwrap();
//!
//! assert_eq!(config.grid_id, "bank-reconciliation");
//! assert_eq!(config.layout.format, LayoutFormat::Toml);
//! assert_eq!(config.columns.len(), 1);
//! assert!(config.expand_parent_on_insert);
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{GridError, Result};
use crate::layout::{FileLayoutStore, LayoutFormat, LayoutStore};
use crate::model::ColumnDef;

/// Where and how the column layout is persisted.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
    /// Save the layout on every change and restore it on startup.
    pub persist: bool,
    /// Directory for layout files. Defaults to the per-user config dir.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dir: Option<PathBuf>,
    /// File format.
    pub format: LayoutFormat,
}

/// Configuration for one grid instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GridConfig {
    /// Identifies the grid's persisted layout.
    pub grid_id: String,
    /// Expand a row when a child is inserted under it.
    pub expand_parent_on_insert: bool,
    /// Layout persistence.
    pub layout: LayoutConfig,
    /// Initial columns, in order.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub columns: Vec<ColumnDef>,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            grid_id: "grid".to_string(),
            expand_parent_on_insert: true,
            layout: LayoutConfig::default(),
            columns: Vec::new(),
        }
    }
}

impl GridConfig {
    /// Default configuration for the given grid id.
    pub fn new(grid_id: impl Into<String>) -> Self {
        Self {
            grid_id: grid_id.into(),
            ..Default::default()
        }
    }

    /// Adds an initial column.
    pub fn with_column(mut self, column: ColumnDef) -> Self {
        self.columns.push(column);
        self
    }

    /// Enables layout persistence in `dir`.
    pub fn with_layout_dir(mut self, dir: impl Into<PathBuf>, format: LayoutFormat) -> Self {
        self.layout = LayoutConfig {
            persist: true,
            dir: Some(dir.into()),
            format,
        };
        self
    }

    /// Parses a TOML document.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| GridError::format("<inline>", e.to_string()))
    }

    /// Parses a JSON document.
    pub fn from_json_str(content: &str) -> Result<Self> {
        serde_json::from_str(content).map_err(|e| GridError::format("<inline>", e.to_string()))
    }

    /// Loads a TOML file.
    pub fn load_toml(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| GridError::io(path, e))?;
        toml::from_str(&content).map_err(|e| GridError::format(path, e.to_string()))
    }

    /// Loads a JSON file.
    pub fn load_json(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| GridError::io(path, e))?;
        serde_json::from_str(&content).map_err(|e| GridError::format(path, e.to_string()))
    }

    /// Builds the layout store this configuration asks for.
    ///
    /// Returns `None` when persistence is off, or when no directory is
    /// configured and the platform has no per-user config directory.
    pub fn layout_store(&self) -> Option<Box<dyn LayoutStore>> {
        if !self.layout.persist {
            return None;
        }
        let store = match &self.layout.dir {
            Some(dir) => FileLayoutStore::new(dir.clone(), self.layout.format),
            None => FileLayoutStore::in_user_config(self.layout.format)?,
        };
        Some(Box::new(store))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::CellType;

    #[test]
    fn test_defaults() {
        let config = GridConfig::from_json_str("{}").unwrap();
        assert_eq!(config, GridConfig::default());
        assert!(!config.layout.persist);
        assert!(config.layout_store().is_none());
    }

    #[test]
    fn test_json_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("grid.json");
        fs::write(
            &path,
            r#"{
                "grid_id": "tasks",
                "expand_parent_on_insert": false,
                "layout": {"persist": true, "dir": "layouts"},
                "columns": [{"key": "due", "label": "Due", "type": "date", "sortable": false}]
            }"#,
        )
        .unwrap();

        let config = GridConfig::load_json(&path).unwrap();
        assert_eq!(config.grid_id, "tasks");
        assert!(!config.expand_parent_on_insert);
        assert_eq!(config.layout.dir, Some(PathBuf::from("layouts")));
        assert_eq!(config.columns[0].cell_type, CellType::Date);
        assert!(!config.columns[0].sortable);
        assert!(config.layout_store().is_some());
    }

    #[test]
    fn test_toml_round_trip() {
        let config = GridConfig::new("board")
            .with_column(ColumnDef::new("risk", "Risk", CellType::Rating))
            .with_layout_dir("/tmp/layouts", LayoutFormat::Toml);
        let text = toml::to_string(&config).unwrap();

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("grid.toml");
        fs::write(&path, text).unwrap();
        assert_eq!(GridConfig::load_toml(&path).unwrap(), config);
    }

    #[test]
    fn test_errors() {
        let err = GridConfig::load_toml("/definitely/not/here.toml").unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::Persistence);
        assert!(matches!(err, GridError::Io { .. }));

        let err = GridConfig::from_toml_str("grid_id = [").unwrap_err();
        assert!(matches!(err, GridError::Format { .. }));
    }
}
