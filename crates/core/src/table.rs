//! The paginated log table.
//!
//! Message rows are keyed by message id in first-seen order. Each row
//! carries the mandatory fields, the display columns the request selected
//! and, when asked for, the message's parameters gathered from the
//! secondary parameter queries.

use indexmap::IndexMap;
use serde::Serialize;

use crate::filter::{ColumnSpec, FilterPlan};
use crate::pagination::PageSummary;
use crate::row::{Cell, ResultRow, ResultSet};

// ---------------------------------------------------------------------------
// Rows
// ---------------------------------------------------------------------------

/// Filter parameters and values that narrow the log to one cell's value
/// around the row's timestamp.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DrillLink {
    pub param: &'static str,
    pub value: String,
    /// `YYYY-MM-DD HH:MM:SS`, without microseconds.
    pub drilltime: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LogRow {
    pub id: i64,
    /// `YYYY-MM-DD HH:MM:SS.uuuuuu`
    pub timestamp: String,
    pub severity: Cell,
    pub facility: Cell,
    pub hostid: Cell,
    pub nshostid: Cell,
    /// Display columns by label.
    pub values: IndexMap<&'static str, Cell>,
    #[serde(skip_serializing_if = "IndexMap::is_empty")]
    pub links: IndexMap<&'static str, DrillLink>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parameters: Option<Vec<String>>,
}

impl LogRow {
    fn from_row(row: &ResultRow, display: &[&'static ColumnSpec]) -> Option<Self> {
        let id = row.get(0).as_i64()?;
        let seconds = row.get(1).as_text().unwrap_or_default();
        let timestamp = match row.get(2).as_i64() {
            Some(usec) => format!("{seconds}.{usec:06}"),
            None => seconds.clone(),
        };

        let mut log_row = Self {
            id,
            timestamp,
            severity: row.get(3).clone(),
            facility: row.get(4).clone(),
            hostid: row.get(5).clone(),
            nshostid: row.get(6).clone(),
            values: IndexMap::new(),
            links: IndexMap::new(),
            parameters: None,
        };

        for (offset, column) in display.iter().enumerate() {
            let cell = row.get(7 + offset).clone();
            if let Some(param) = column.link {
                if let Some(value) = log_row.link_value(param, &cell) {
                    log_row.links.insert(
                        column.label,
                        DrillLink {
                            param,
                            value,
                            drilltime: seconds.clone(),
                        },
                    );
                }
            }
            log_row.values.insert(column.label, cell);
        }
        Some(log_row)
    }

    /// Links on lookup columns carry the row's numeric key rather than
    /// the displayed name.
    fn link_value(&self, param: &str, cell: &Cell) -> Option<String> {
        let keyed = match param {
            "facility" => Some(&self.facility),
            "hostid" => Some(&self.hostid),
            "nshostid" => Some(&self.nshostid),
            _ => None,
        };
        keyed
            .and_then(Cell::as_text)
            .or_else(|| cell.as_text())
            .filter(|v| !v.is_empty())
    }
}

/// Render one parameter; values containing a space are quoted.
pub fn format_parameter(name: &str, value: &str) -> String {
    if value.contains(' ') {
        format!("{name}=\"{value}\"")
    } else {
        format!("{name}={value}")
    }
}

// ---------------------------------------------------------------------------
// Table
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LogTable {
    /// Header labels in display order.
    pub columns: Vec<&'static str>,
    #[serde(serialize_with = "serialize_rows")]
    pub rows: IndexMap<i64, LogRow>,
}

fn serialize_rows<S: serde::Serializer>(
    rows: &IndexMap<i64, LogRow>,
    s: S,
) -> Result<S::Ok, S::Error> {
    s.collect_seq(rows.values())
}

impl LogTable {
    /// Build the table from a page query's result. Rows repeat when a join
    /// fans out; the first occurrence of an id wins.
    pub fn assemble(plan: &FilterPlan, rs: &ResultSet, with_parameters: bool) -> Self {
        let mut columns = vec!["Timestamp"];
        columns.extend(plan.display.iter().map(|c| c.label));
        if with_parameters {
            columns.push("Parameters");
        }

        let mut rows = IndexMap::new();
        for row in rs.rows() {
            let Some(mut log_row) = LogRow::from_row(row, &plan.display) else {
                continue;
            };
            if with_parameters {
                log_row.parameters = Some(Vec::new());
            }
            rows.entry(log_row.id).or_insert(log_row);
        }
        Self { columns, rows }
    }

    pub fn ids(&self) -> Vec<i64> {
        self.rows.keys().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Append `id, name, value` rows from a parameter query. Ids not on
    /// this page are ignored.
    pub fn attach_parameters(&mut self, rs: &ResultSet) {
        for i in 0..rs.len() {
            let Some(id) = rs.value(i, "id").as_i64() else {
                continue;
            };
            let Some(row) = self.rows.get_mut(&id) else {
                continue;
            };
            let name = rs.value(i, "name").as_text().unwrap_or_default();
            let value = rs.value(i, "value").as_text().unwrap_or_default();
            row.parameters
                .get_or_insert_with(Vec::new)
                .push(format_parameter(&name, &value));
        }
    }
}

/// One page of the log viewer.
#[derive(Debug, Clone, Serialize)]
pub struct LogPage {
    pub window: String,
    pub summary: PageSummary,
    #[serde(flatten)]
    pub table: LogTable,
}
