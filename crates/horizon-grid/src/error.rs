//! Error types for grid operations.

use std::path::PathBuf;

use crate::model::{CellType, RowId};

/// Result type alias for grid operations.
pub type Result<T> = std::result::Result<T, GridError>;

/// Coarse classification of a [`GridError`].
///
/// Hosts usually branch on the kind (e.g. to silence `ScopeViolation` drops)
/// rather than on the exact variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// A row or column id is absent.
    NotFound,
    /// A column key collides with an existing one.
    DuplicateKey,
    /// A reorder argument is not a permutation of the existing keys.
    InvalidPermutation,
    /// A cell value failed type coercion, or an argument is malformed.
    InvalidValue,
    /// A move crossed incompatible scopes.
    ScopeViolation,
    /// The operation is not valid in the current state.
    InvalidState,
    /// Reading or writing persisted data failed.
    Persistence,
}

/// Errors that can occur in the grid engine.
#[derive(Debug, thiserror::Error)]
pub enum GridError {
    /// No row with this id exists.
    #[error("Row {0} not found")]
    RowNotFound(RowId),

    /// No column with this key exists.
    #[error("Column '{0}' not found")]
    ColumnNotFound(String),

    /// A column with this key already exists.
    #[error("Column key '{0}' already exists")]
    DuplicateKey(String),

    /// Loaded row data carries the same id twice.
    #[error("Row id {0} appears more than once")]
    DuplicateRowId(RowId),

    /// The requested column order is not a permutation of the known keys.
    #[error("Invalid column order: {0}")]
    InvalidPermutation(String),

    /// A value could not be coerced to the column's type.
    #[error("Invalid value for column '{column}' ({cell_type}): {message}")]
    InvalidValue {
        column: String,
        cell_type: CellType,
        message: String,
    },

    /// A move crossed sibling lists, or mixed rows with columns.
    #[error("Scope violation: {0}")]
    ScopeViolation(String),

    /// The column does not allow the requested operation.
    #[error("Column '{column}' is not {capability}")]
    Unsupported {
        column: String,
        capability: &'static str,
    },

    /// A commit or draft update arrived while no cell was in edit mode.
    #[error("No cell is being edited")]
    NotEditing,

    /// A drop or hover arrived while no drag was in progress.
    #[error("No drag is in progress")]
    NotDragging,

    /// File I/O failed.
    #[error("Failed to access '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A file was read but its contents could not be parsed or produced.
    #[error("Malformed data in '{path}': {message}")]
    Format { path: PathBuf, message: String },
}

impl GridError {
    /// Create a value error.
    pub fn invalid_value(
        column: impl Into<String>,
        cell_type: CellType,
        message: impl Into<String>,
    ) -> Self {
        Self::InvalidValue {
            column: column.into(),
            cell_type,
            message: message.into(),
        }
    }

    /// Create a scope error.
    pub fn scope(message: impl Into<String>) -> Self {
        Self::ScopeViolation(message.into())
    }

    /// Create an I/O error.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Create a format error.
    pub fn format(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::Format {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Returns the coarse kind of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::RowNotFound(_) | Self::ColumnNotFound(_) => ErrorKind::NotFound,
            Self::DuplicateKey(_) | Self::DuplicateRowId(_) => ErrorKind::DuplicateKey,
            Self::InvalidPermutation(_) => ErrorKind::InvalidPermutation,
            Self::InvalidValue { .. } => ErrorKind::InvalidValue,
            Self::ScopeViolation(_) => ErrorKind::ScopeViolation,
            Self::Unsupported { .. } | Self::NotEditing | Self::NotDragging => {
                ErrorKind::InvalidState
            }
            Self::Io { .. } | Self::Format { .. } => ErrorKind::Persistence,
        }
    }
}
