//! Columnar frame types
//!
//! A [`Frame`] is a time axis plus named, typed, null-aware columns all
//! aligned to that axis. Column values are a closed tagged variant over
//! the three scalar kinds the backend can return; absence is modelled
//! with `Option`, independent of zero, the empty string and `false`.

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Name of the reserved time column in backend responses
pub const TIME_COLUMN: &str = "time";

/// Scalar kind of a column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnKind {
    Float,
    Text,
    Bool,
}

impl std::fmt::Display for ColumnKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Float => write!(f, "float64"),
            Self::Text => write!(f, "string"),
            Self::Bool => write!(f, "bool"),
        }
    }
}

/// Values of one column, tagged by scalar kind
///
/// The kind is fixed when the column is first seen and never changes;
/// every array has exactly one entry per row.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnValues {
    Float(Vec<Option<f64>>),
    Text(Vec<Option<String>>),
    Bool(Vec<Option<bool>>),
}

impl ColumnValues {
    /// Allocate an all-absent column of the given kind and length
    pub fn absent(kind: ColumnKind, rows: usize) -> Self {
        match kind {
            ColumnKind::Float => Self::Float(vec![None; rows]),
            ColumnKind::Text => Self::Text(vec![None; rows]),
            ColumnKind::Bool => Self::Bool(vec![None; rows]),
        }
    }

    /// The column's scalar kind
    pub fn kind(&self) -> ColumnKind {
        match self {
            Self::Float(_) => ColumnKind::Float,
            Self::Text(_) => ColumnKind::Text,
            Self::Bool(_) => ColumnKind::Bool,
        }
    }

    /// Number of positions (equals the frame's row count)
    pub fn len(&self) -> usize {
        match self {
            Self::Float(v) => v.len(),
            Self::Text(v) => v.len(),
            Self::Bool(v) => v.len(),
        }
    }

    /// True when the column has no positions
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// True when the position holds no value
    pub fn is_absent(&self, index: usize) -> bool {
        match self {
            Self::Float(v) => v.get(index).map_or(true, |c| c.is_none()),
            Self::Text(v) => v.get(index).map_or(true, |c| c.is_none()),
            Self::Bool(v) => v.get(index).map_or(true, |c| c.is_none()),
        }
    }
}

/// A named, typed column
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Column {
    pub name: String,
    pub values: ColumnValues,
}

/// Severity of a notice attached to a frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NoticeSeverity {
    Info,
    Warning,
    Error,
}

/// A soft diagnostic carried alongside otherwise-valid data
///
/// Used for conditions that should reach the user without failing the
/// query, e.g. a fill directive that could not be parsed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Notice {
    pub severity: NoticeSeverity,
    pub text: String,
}

/// A time-indexed columnar table
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Frame {
    /// Timestamps in input row order (not sorted)
    pub time: Vec<DateTime<Utc>>,
    /// Columns in order of first appearance
    pub columns: Vec<Column>,
    /// Soft diagnostics attached to this frame
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub notices: Vec<Notice>,
}

impl Frame {
    /// An empty frame: zero rows, zero columns
    pub fn empty() -> Self {
        Self::default()
    }

    /// Number of rows
    pub fn row_count(&self) -> usize {
        self.time.len()
    }

    /// True when the frame has no rows
    pub fn is_empty(&self) -> bool {
        self.time.is_empty()
    }

    /// Look up a column by name
    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Attach a notice
    pub fn add_notice(&mut self, severity: NoticeSeverity, text: impl Into<String>) {
        self.notices.push(Notice {
            severity,
            text: text.into(),
        });
    }
}
