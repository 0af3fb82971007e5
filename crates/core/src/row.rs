//! Result-set model shared by the executors and the binner.
//!
//! Rows are kept in their driver-neutral form: an ordered tuple of [`Cell`]s
//! plus the column names of the statement that produced them.

use std::fmt;

use serde::Serialize;

/// One value of a result row.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Cell {
    Null,
    Int(i64),
    Float(f64),
    Text(String),
}

impl Cell {
    /// Integer view of the cell. Text is parsed, floats are truncated.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Cell::Null => None,
            Cell::Int(v) => Some(*v),
            Cell::Float(v) => Some(*v as i64),
            Cell::Text(s) => s.trim().parse().ok(),
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Cell::Null => None,
            Cell::Int(v) => Some(*v as f64),
            Cell::Float(v) => Some(*v),
            Cell::Text(s) => s.trim().parse().ok(),
        }
    }

    /// Text view of the cell; `None` only for SQL NULL.
    pub fn as_text(&self) -> Option<String> {
        match self {
            Cell::Null => None,
            other => Some(other.to_string()),
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Cell::Null)
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cell::Null => Ok(()),
            Cell::Int(v) => write!(f, "{v}"),
            Cell::Float(v) => write!(f, "{v}"),
            Cell::Text(s) => f.write_str(s),
        }
    }
}

impl From<i64> for Cell {
    fn from(v: i64) -> Self {
        Cell::Int(v)
    }
}

impl From<f64> for Cell {
    fn from(v: f64) -> Self {
        Cell::Float(v)
    }
}

impl From<&str> for Cell {
    fn from(v: &str) -> Self {
        Cell::Text(v.to_string())
    }
}

impl From<String> for Cell {
    fn from(v: String) -> Self {
        Cell::Text(v)
    }
}

impl<T: Into<Cell>> From<Option<T>> for Cell {
    fn from(v: Option<T>) -> Self {
        v.map_or(Cell::Null, Into::into)
    }
}

/// An ordered tuple of cells.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResultRow(pub Vec<Cell>);

impl ResultRow {
    pub fn get(&self, index: usize) -> &Cell {
        self.0.get(index).unwrap_or(&Cell::Null)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Rows of one executed statement with their column names.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ResultSet {
    pub columns: Vec<String>,
    pub rows: Vec<ResultRow>,
}

impl ResultSet {
    pub fn new(columns: Vec<String>, rows: Vec<ResultRow>) -> Self {
        Self { columns, rows }
    }

    /// Build a result set from string column names and literal rows.
    pub fn from_rows<C, R>(columns: &[&str], rows: R) -> Self
    where
        R: IntoIterator<Item = C>,
        C: IntoIterator<Item = Cell>,
    {
        Self {
            columns: columns.iter().map(|c| (*c).to_string()).collect(),
            rows: rows
                .into_iter()
                .map(|r| ResultRow(r.into_iter().collect()))
                .collect(),
        }
    }

    /// Position of a column, matched case-insensitively (Oracle upper-cases
    /// unquoted aliases).
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns
            .iter()
            .position(|c| c.eq_ignore_ascii_case(name))
    }

    /// Value of the named column in row `row`, or `Null` when either is
    /// missing.
    pub fn value(&self, row: usize, name: &str) -> &Cell {
        match (self.rows.get(row), self.column_index(name)) {
            (Some(r), Some(i)) => r.get(i),
            _ => &Cell::Null,
        }
    }

    pub fn rows(&self) -> impl Iterator<Item = &ResultRow> {
        self.rows.iter()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}
