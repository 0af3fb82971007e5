//! Parameterized SQL assembly.
//!
//! [`SqlBuilder`] appends SQL text in reading order and records every bound
//! value as it goes, rendering the dialect's placeholder at the point of
//! binding. Placeholders therefore always line up with the bind list, which
//! matters for MySQL's positional `?` as much as for Oracle's `:n`.

use serde::Serialize;

use crate::dialect::Dialect;

/// A value bound to a query placeholder.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(untagged)]
pub enum SqlValue {
    Int(i64),
    Text(String),
}

impl From<i64> for SqlValue {
    fn from(v: i64) -> Self {
        SqlValue::Int(v)
    }
}

impl From<u32> for SqlValue {
    fn from(v: u32) -> Self {
        SqlValue::Int(i64::from(v))
    }
}

impl From<u64> for SqlValue {
    fn from(v: u64) -> Self {
        SqlValue::Int(i64::try_from(v).unwrap_or(i64::MAX))
    }
}

impl From<&str> for SqlValue {
    fn from(v: &str) -> Self {
        SqlValue::Text(v.to_string())
    }
}

impl From<String> for SqlValue {
    fn from(v: String) -> Self {
        SqlValue::Text(v)
    }
}

/// An SQL template and its ordered bind list, ready for execution.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct CompiledQuery {
    pub sql: String,
    pub binds: Vec<SqlValue>,
}

impl CompiledQuery {
    /// A query without bound values (lookups, version checks).
    pub fn plain(sql: impl Into<String>) -> Self {
        Self {
            sql: sql.into(),
            binds: Vec::new(),
        }
    }
}

/// Incremental builder for a [`CompiledQuery`].
#[derive(Debug)]
pub struct SqlBuilder {
    dialect: Dialect,
    sql: String,
    binds: Vec<SqlValue>,
    where_started: bool,
}

impl SqlBuilder {
    pub fn new(dialect: Dialect) -> Self {
        Self {
            dialect,
            sql: String::new(),
            binds: Vec::new(),
            where_started: false,
        }
    }

    /// Continue an already compiled query, keeping its placeholder numbering.
    pub fn resume(dialect: Dialect, query: CompiledQuery) -> Self {
        Self {
            dialect,
            sql: query.sql,
            binds: query.binds,
            where_started: false,
        }
    }

    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    /// Append raw SQL text. Never pass request-supplied values here.
    pub fn push(&mut self, sql: &str) -> &mut Self {
        self.sql.push_str(sql);
        self
    }

    /// Record a bound value and return its placeholder text.
    ///
    /// The placeholder must be pushed before any other value is bound.
    pub fn bind(&mut self, value: impl Into<SqlValue>) -> String {
        self.binds.push(value.into());
        self.dialect.placeholder(self.binds.len())
    }

    /// Bind a value and append its placeholder in one step.
    pub fn push_bind(&mut self, value: impl Into<SqlValue>) -> &mut Self {
        let placeholder = self.bind(value);
        self.sql.push_str(&placeholder);
        self
    }

    /// Append ` WHERE ` for the first condition and ` AND ` afterwards.
    pub fn and_where(&mut self) -> &mut Self {
        if self.where_started {
            self.sql.push_str(" AND ");
        } else {
            self.sql.push_str(" WHERE ");
            self.where_started = true;
        }
        self
    }

    pub fn bind_count(&self) -> usize {
        self.binds.len()
    }

    pub fn build(self) -> CompiledQuery {
        CompiledQuery {
            sql: self.sql,
            binds: self.binds,
        }
    }
}
