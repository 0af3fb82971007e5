//! Cross-tabulation of `(row, column, value)` triples.
//!
//! Labels are discovered from the data in first-seen order. A square table
//! shares one label list between both axes (pool-to-pool transfers); a
//! rectangular one keeps them apart (service class by request type).

use indexmap::IndexSet;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CrossTab {
    pub rows: Vec<String>,
    pub columns: Vec<String>,
    /// `cells[r][c]`; cells never seen hold 0.
    pub cells: Vec<Vec<i64>>,
}

impl CrossTab {
    pub fn build<I>(entries: I, square: bool) -> Self
    where
        I: IntoIterator<Item = (String, String, i64)>,
    {
        let entries: Vec<(String, String, i64)> = entries.into_iter().collect();

        let mut rows: IndexSet<String> = IndexSet::new();
        let mut columns: IndexSet<String> = IndexSet::new();
        for (row, column, _) in &entries {
            if square {
                rows.insert(row.clone());
                rows.insert(column.clone());
            } else {
                rows.insert(row.clone());
                columns.insert(column.clone());
            }
        }
        if square {
            columns = rows.clone();
        }

        let mut cells = vec![vec![0_i64; columns.len()]; rows.len()];
        for (row, column, value) in &entries {
            if let (Some(r), Some(c)) = (rows.get_index_of(row), columns.get_index_of(column)) {
                cells[r][c] += value;
            }
        }

        Self {
            rows: rows.into_iter().collect(),
            columns: columns.into_iter().collect(),
            cells,
        }
    }

    /// Rows discovered from the data against a fixed column list. Entries
    /// naming an unknown column are dropped.
    pub fn with_columns<I>(entries: I, columns: Vec<String>) -> Self
    where
        I: IntoIterator<Item = (String, String, i64)>,
    {
        let columns: IndexSet<String> = columns.into_iter().collect();
        let mut rows: IndexSet<String> = IndexSet::new();
        let mut cells: Vec<Vec<i64>> = Vec::new();
        for (row, column, value) in entries {
            let Some(c) = columns.get_index_of(&column) else {
                continue;
            };
            let (r, added) = rows.insert_full(row);
            if added {
                cells.push(vec![0; columns.len()]);
            }
            cells[r][c] += value;
        }

        Self {
            rows: rows.into_iter().collect(),
            columns: columns.into_iter().collect(),
            cells,
        }
    }

    /// Cell by labels; 0 when either label is unknown.
    pub fn get(&self, row: &str, column: &str) -> i64 {
        let r = self.rows.iter().position(|l| l == row);
        let c = self.columns.iter().position(|l| l == column);
        match (r, c) {
            (Some(r), Some(c)) => self.cells[r][c],
            _ => 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}
