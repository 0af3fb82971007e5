//! SQL dialect strategy.
//!
//! DLF instances run on MySQL or Oracle. The two differ in placeholder
//! syntax, date literals, "now minus N minutes", pagination and date
//! truncation; everything else the compiler emits is shared ANSI SQL.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::pagination::Page;
use crate::series::Granularity;
use crate::sql::{CompiledQuery, SqlBuilder};

/// The SQL variant spoken by an instance, selected once per request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Dialect {
    #[serde(rename = "mysql", alias = "MySQL", alias = "MYSQL")]
    MySql,
    #[serde(rename = "oracle", alias = "Oracle", alias = "ORACLE")]
    Oracle,
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Dialect {
    pub fn as_str(&self) -> &'static str {
        match self {
            Dialect::MySql => "mysql",
            Dialect::Oracle => "oracle",
        }
    }

    pub fn parse(s: &str) -> Result<Self, CoreError> {
        match s.trim().to_ascii_lowercase().as_str() {
            "mysql" => Ok(Dialect::MySql),
            "oracle" => Ok(Dialect::Oracle),
            other => Err(CoreError::Configuration(format!(
                "unknown database type '{other}' (expected mysql or oracle)"
            ))),
        }
    }

    /// Placeholder for the `n`-th bound value (1-based).
    pub fn placeholder(&self, n: usize) -> String {
        match self {
            Dialect::MySql => "?".to_string(),
            Dialect::Oracle => format!(":{n}"),
        }
    }

    /// Date literal parsed from a bound `YYYY-MM-DD HH:MM:SS` string.
    pub fn date_literal(&self, placeholder: &str) -> String {
        match self {
            Dialect::MySql => format!("STR_TO_DATE({placeholder}, '%Y-%m-%d %H:%i:%s')"),
            Dialect::Oracle => format!("TO_DATE({placeholder}, 'YYYY-MM-DD HH24:MI:SS')"),
        }
    }

    /// The database's current time minus a bound number of minutes.
    ///
    /// Evaluated by the server at execution time, so relative windows are
    /// never memoized on the application side.
    pub fn relative_time_expr(&self, placeholder: &str) -> String {
        match self {
            Dialect::MySql => format!("DATE_SUB(NOW(), INTERVAL {placeholder} MINUTE)"),
            Dialect::Oracle => format!("(SYSDATE - {placeholder}/1440)"),
        }
    }

    /// Truncate a time column to the start of its bucket, rendered as
    /// `YYYY-MM-DD HH:MM:SS` text.
    pub fn truncate_time(&self, column: &str, granularity: Granularity) -> String {
        match self {
            Dialect::MySql => match granularity {
                Granularity::Minute => format!("DATE_FORMAT({column}, '%Y-%m-%d %H:%i:00')"),
                Granularity::Hour => format!("DATE_FORMAT({column}, '%Y-%m-%d %H:00:00')"),
                Granularity::Day => format!("DATE_FORMAT({column}, '%Y-%m-%d 00:00:00')"),
                Granularity::Week => format!(
                    "DATE_FORMAT(DATE_SUB({column}, INTERVAL WEEKDAY({column}) DAY), '%Y-%m-%d 00:00:00')"
                ),
            },
            Dialect::Oracle => {
                let unit = match granularity {
                    Granularity::Minute => "MI",
                    Granularity::Hour => "HH24",
                    Granularity::Day => "DD",
                    Granularity::Week => "IW",
                };
                format!("TO_CHAR(TRUNC({column}, '{unit}'), 'YYYY-MM-DD HH24:MI:SS')")
            }
        }
    }

    /// Whole seconds from `start` to `end`. Oracle `DATE` arithmetic
    /// yields days.
    pub fn seconds_between(&self, start: &str, end: &str) -> String {
        match self {
            Dialect::MySql => format!("TIMESTAMPDIFF(SECOND, {start}, {end})"),
            Dialect::Oracle => format!("ROUND(({end} - {start}) * 86400)"),
        }
    }

    /// Integer sum of a column. MySQL widens `SUM` over integers to DECIMAL.
    pub fn sum_expr(&self, column: &str) -> String {
        match self {
            Dialect::MySql => format!("CAST(SUM({column}) AS SIGNED)"),
            Dialect::Oracle => format!("SUM({column})"),
        }
    }

    /// Order `inner` and select the rows of one page.
    ///
    /// Both forms select rows `(offset, offset + size]` by 1-based row number:
    /// MySQL through `LIMIT offset, size`, Oracle through `ROWNUM` over the
    /// ordered subquery.
    pub fn paginate(&self, inner: CompiledQuery, order_by: &str, page: &Page) -> CompiledQuery {
        match self {
            Dialect::MySql => {
                let mut b = SqlBuilder::resume(*self, inner);
                b.push(" ORDER BY ").push(order_by);
                b.push(" LIMIT ").push_bind(page.offset());
                b.push(", ").push_bind(u64::from(page.size()));
                b.build()
            }
            Dialect::Oracle => {
                let sql = format!(
                    "SELECT * FROM (SELECT p.*, ROWNUM RNUM FROM ({} ORDER BY {order_by}) p)",
                    inner.sql
                );
                let mut b = SqlBuilder::resume(
                    *self,
                    CompiledQuery {
                        sql,
                        binds: inner.binds,
                    },
                );
                b.push(" WHERE RNUM > ").push_bind(page.offset());
                b.push(" AND RNUM <= ").push_bind(page.end());
                b.build()
            }
        }
    }

    /// Order `inner` and keep its first `limit` rows.
    pub fn limit(&self, inner: CompiledQuery, order_by: &str, limit: u32) -> CompiledQuery {
        match self {
            Dialect::MySql => {
                let mut b = SqlBuilder::resume(*self, inner);
                b.push(" ORDER BY ").push(order_by);
                b.push(" LIMIT ").push_bind(limit);
                b.build()
            }
            Dialect::Oracle => {
                let sql = format!("SELECT * FROM ({} ORDER BY {order_by})", inner.sql);
                let mut b = SqlBuilder::resume(
                    *self,
                    CompiledQuery {
                        sql,
                        binds: inner.binds,
                    },
                );
                b.push(" WHERE ROWNUM <= ").push_bind(limit);
                b.build()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sql::SqlValue;

    fn inner(dialect: Dialect) -> CompiledQuery {
        let mut b = SqlBuilder::new(dialect);
        b.push("SELECT t1.id FROM dlf_messages t1");
        b.and_where().push("t1.severity = ").push_bind("3");
        b.build()
    }

    #[test]
    fn mysql_page_two_of_fifty_selects_rows_51_to_100() {
        let page = Page::new(2, 50).unwrap();
        let q = Dialect::MySql.paginate(inner(Dialect::MySql), "t1.timestamp DESC", &page);
        assert!(q.sql.ends_with("ORDER BY t1.timestamp DESC LIMIT ?, ?"));
        assert_eq!(
            q.binds,
            vec![SqlValue::from("3"), SqlValue::Int(50), SqlValue::Int(50)]
        );
    }

    #[test]
    fn oracle_page_two_of_fifty_selects_rows_51_to_100() {
        let page = Page::new(2, 50).unwrap();
        let q = Dialect::Oracle.paginate(inner(Dialect::Oracle), "t1.timestamp DESC", &page);
        assert_eq!(
            q.sql,
            "SELECT * FROM (SELECT p.*, ROWNUM RNUM FROM (SELECT t1.id FROM dlf_messages t1 \
             WHERE t1.severity = :1 ORDER BY t1.timestamp DESC) p) WHERE RNUM > :2 AND RNUM <= :3"
        );
        assert_eq!(
            q.binds,
            vec![SqlValue::from("3"), SqlValue::Int(50), SqlValue::Int(100)]
        );
    }

    #[test]
    fn limit_wraps_oracle_in_rownum_filter() {
        let q = Dialect::Oracle.limit(CompiledQuery::plain("SELECT a FROM t"), "a DESC", 10);
        assert_eq!(q.sql, "SELECT * FROM (SELECT a FROM t ORDER BY a DESC) WHERE ROWNUM <= :1");
        assert_eq!(q.binds, vec![SqlValue::Int(10)]);

        let q = Dialect::MySql.limit(CompiledQuery::plain("SELECT a FROM t"), "a DESC", 10);
        assert_eq!(q.sql, "SELECT a FROM t ORDER BY a DESC LIMIT ?");
    }

    #[test]
    fn relative_time_expressions() {
        assert_eq!(
            Dialect::MySql.relative_time_expr("?"),
            "DATE_SUB(NOW(), INTERVAL ? MINUTE)"
        );
        assert_eq!(Dialect::Oracle.relative_time_expr(":4"), "(SYSDATE - :4/1440)");
    }

    #[test]
    fn seconds_between_per_dialect() {
        assert_eq!(
            Dialect::MySql.seconds_between("g.timestamp", "r.timestamp"),
            "TIMESTAMPDIFF(SECOND, g.timestamp, r.timestamp)"
        );
        assert_eq!(
            Dialect::Oracle.seconds_between("g.timestamp", "r.timestamp"),
            "ROUND((r.timestamp - g.timestamp) * 86400)"
        );
    }

    #[test]
    fn oracle_truncates_weeks_to_iso_monday() {
        assert_eq!(
            Dialect::Oracle.truncate_time("timestamp", Granularity::Week),
            "TO_CHAR(TRUNC(timestamp, 'IW'), 'YYYY-MM-DD HH24:MI:SS')"
        );
    }

    #[test]
    fn parse_accepts_legacy_spellings() {
        assert_eq!(Dialect::parse("MySQL").unwrap(), Dialect::MySql);
        assert_eq!(Dialect::parse(" oracle ").unwrap(), Dialect::Oracle);
        assert!(Dialect::parse("postgres").is_err());
    }
}
