//! Cell values.
//!
//! [`CellValue`] is the JSON-shaped container every cell holds. The meaning of
//! a value depends on the column's [`CellType`](super::CellType): a date is a
//! `Text` in ISO form, a checklist is a `List` of `Record`s, and so on.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// A value stored in a grid cell.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CellValue {
    /// An empty cell.
    #[default]
    Null,
    /// A boolean value.
    Bool(bool),
    /// A number.
    Number(f64),
    /// A string value.
    Text(String),
    /// An ordered list of values.
    List(Vec<CellValue>),
    /// A nested record.
    Record(BTreeMap<String, CellValue>),
}

impl CellValue {
    /// Returns true if this value is null.
    pub fn is_null(&self) -> bool {
        matches!(self, CellValue::Null)
    }

    /// Returns true for null and whitespace-only text.
    pub fn is_blank(&self) -> bool {
        match self {
            CellValue::Null => true,
            CellValue::Text(s) => s.trim().is_empty(),
            _ => false,
        }
    }

    /// Returns this value as a boolean, if it is one.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            CellValue::Bool(v) => Some(*v),
            _ => None,
        }
    }

    /// Returns this value as a number, if it is one.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            CellValue::Number(v) => Some(*v),
            _ => None,
        }
    }

    /// Returns this value as a string, if it is one.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            CellValue::Text(v) => Some(v),
            _ => None,
        }
    }

    /// Returns this value as a list, if it is one.
    pub fn as_list(&self) -> Option<&[CellValue]> {
        match self {
            CellValue::List(v) => Some(v),
            _ => None,
        }
    }

    /// Returns this value as a record, if it is one.
    pub fn as_record(&self) -> Option<&BTreeMap<String, CellValue>> {
        match self {
            CellValue::Record(v) => Some(v),
            _ => None,
        }
    }

    /// Type-agnostic display string.
    ///
    /// Column-aware rendering goes through
    /// [`CellCapabilities::display`](super::CellCapabilities::display), which
    /// falls back to this for most types.
    pub fn to_display_string(&self) -> String {
        match self {
            CellValue::Null => String::new(),
            CellValue::Bool(b) => b.to_string(),
            CellValue::Number(n) => format_number(*n),
            CellValue::Text(s) => s.clone(),
            CellValue::List(items) => items
                .iter()
                .map(CellValue::to_display_string)
                .collect::<Vec<_>>()
                .join(", "),
            CellValue::Record(fields) => fields
                .iter()
                .map(|(k, v)| format!("{k}: {}", v.to_display_string()))
                .collect::<Vec<_>>()
                .join(", "),
        }
    }
}

/// Formats a number without a trailing `.0` for whole values.
pub(crate) fn format_number(n: f64) -> String {
    if n.is_finite() && n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{n}")
    }
}

impl From<bool> for CellValue {
    fn from(v: bool) -> Self {
        CellValue::Bool(v)
    }
}

impl From<i32> for CellValue {
    fn from(v: i32) -> Self {
        CellValue::Number(v as f64)
    }
}

impl From<i64> for CellValue {
    fn from(v: i64) -> Self {
        CellValue::Number(v as f64)
    }
}

impl From<f64> for CellValue {
    fn from(v: f64) -> Self {
        CellValue::Number(v)
    }
}

impl From<String> for CellValue {
    fn from(v: String) -> Self {
        CellValue::Text(v)
    }
}

impl From<&str> for CellValue {
    fn from(v: &str) -> Self {
        CellValue::Text(v.to_string())
    }
}

impl<T: Into<CellValue>> From<Vec<T>> for CellValue {
    fn from(v: Vec<T>) -> Self {
        CellValue::List(v.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<CellValue>> From<Option<T>> for CellValue {
    fn from(v: Option<T>) -> Self {
        v.map_or(CellValue::Null, Into::into)
    }
}
