//! Column layout persistence.
//!
//! A [`ColumnLayout`] captures the user-adjustable part of a column registry
//! (order, hidden columns and widths). Layouts are stored per grid instance
//! through a [`LayoutStore`]; the crate ships an in-memory store and a
//! file-backed store.
//!
//! # Example
//!
//! ```
//! use horizon_grid::layout::{ColumnLayout, LayoutStore, MemoryLayoutStore};
//!
//! let store = MemoryLayoutStore::new();
//! let layout = ColumnLayout {
//!     order: vec!["status".into(), "name".into()],
//!     ..Default::default()
//! };
//! store.save("reconciliation", &layout).unwrap();
//! assert_eq!(store.load("reconciliation").unwrap(), Some(layout));
//! assert_eq!(store.load("tasks").unwrap(), None);
//! ```

mod file;

use std::collections::{BTreeMap, HashMap};

use horizon_grid_core::logging::targets;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::error::Result;

pub use file::{FileLayoutStore, LayoutFormat, sanitize_grid_id};

/// Persisted column order, visibility and widths for one grid.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ColumnLayout {
    /// Column keys in display order.
    #[serde(default)]
    pub order: Vec<String>,
    /// Keys of hidden columns.
    #[serde(default)]
    pub hidden: Vec<String>,
    /// Column widths by key.
    #[serde(default)]
    pub widths: BTreeMap<String, f32>,
}

/// Storage backend for column layouts, keyed by grid id.
pub trait LayoutStore: Send + Sync {
    /// Returns the stored layout, or `None` if nothing was saved.
    fn load(&self, grid_id: &str) -> Result<Option<ColumnLayout>>;

    /// Stores a layout, replacing any previous one.
    fn save(&self, grid_id: &str, layout: &ColumnLayout) -> Result<()>;

    /// Deletes a stored layout. Returns `true` if one existed.
    fn remove(&self, grid_id: &str) -> Result<bool>;
}

/// Layout store that keeps everything in memory.
#[derive(Debug, Default)]
pub struct MemoryLayoutStore {
    layouts: RwLock<HashMap<String, ColumnLayout>>,
}

impl MemoryLayoutStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored layouts.
    pub fn len(&self) -> usize {
        self.layouts.read().len()
    }

    /// Returns `true` if nothing is stored.
    pub fn is_empty(&self) -> bool {
        self.layouts.read().is_empty()
    }
}

impl LayoutStore for MemoryLayoutStore {
    fn load(&self, grid_id: &str) -> Result<Option<ColumnLayout>> {
        Ok(self.layouts.read().get(grid_id).cloned())
    }

    fn save(&self, grid_id: &str, layout: &ColumnLayout) -> Result<()> {
        tracing::trace!(target: targets::LAYOUT, grid_id, "storing layout in memory");
        self.layouts.write().insert(grid_id.to_string(), layout.clone());
        Ok(())
    }

    fn remove(&self, grid_id: &str) -> Result<bool> {
        Ok(self.layouts.write().remove(grid_id).is_some())
    }
}

static_assertions::assert_impl_all!(MemoryLayoutStore: LayoutStore, Send, Sync);
static_assertions::assert_impl_all!(FileLayoutStore: LayoutStore, Send, Sync);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_store_replace_and_remove() {
        let store = MemoryLayoutStore::new();
        assert!(store.is_empty());

        let first = ColumnLayout {
            order: vec!["a".into(), "b".into()],
            ..Default::default()
        };
        let second = ColumnLayout {
            order: vec!["b".into(), "a".into()],
            hidden: vec!["a".into()],
            ..Default::default()
        };
        store.save("grid", &first).unwrap();
        store.save("grid", &second).unwrap();
        assert_eq!(store.len(), 1);
        assert_eq!(store.load("grid").unwrap(), Some(second));

        assert!(store.remove("grid").unwrap());
        assert!(!store.remove("grid").unwrap());
        assert_eq!(store.load("grid").unwrap(), None);
    }

    #[test]
    fn test_layout_defaults_when_fields_missing() {
        let layout: ColumnLayout = serde_json::from_str(r#"{"order": ["name"]}"#).unwrap();
        assert_eq!(layout.order, vec!["name".to_string()]);
        assert!(layout.hidden.is_empty());
        assert!(layout.widths.is_empty());
    }
}
