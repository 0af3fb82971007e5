//! MySQL executor backed by a lazily connecting sqlx pool.

use std::time::Duration;

use async_trait::async_trait;
use castormon_core::dialect::Dialect;
use castormon_core::instance::InstanceConfig;
use castormon_core::row::{Cell, ResultRow, ResultSet};
use castormon_core::sql::{CompiledQuery, SqlValue};
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use sqlx::mysql::{MySqlConnectOptions, MySqlPool, MySqlPoolOptions, MySqlRow};
use sqlx::{Column, Row, TypeInfo, ValueRef};

use crate::decode::{decimal_cell, timestamp_cell};
use crate::error::DbError;
use crate::executor::QueryExecutor;

/// How long a request waits for a pooled connection.
const ACQUIRE_TIMEOUT: Duration = Duration::from_secs(10);

pub struct MySqlExecutor {
    pool: MySqlPool,
}

impl MySqlExecutor {
    /// Build the pool without connecting. The first query opens the first
    /// connection, so an unreachable instance only fails the requests that
    /// use it.
    pub fn connect_lazy(config: &InstanceConfig) -> Self {
        let mut options = MySqlConnectOptions::new()
            .host(&config.server)
            .username(&config.username)
            .password(&config.password)
            .database(&config.database);
        if let Some(port) = config.port {
            options = options.port(port);
        }

        let pool = MySqlPoolOptions::new()
            .max_connections(config.max_connections())
            .acquire_timeout(ACQUIRE_TIMEOUT)
            .connect_lazy_with(options);

        Self { pool }
    }
}

#[async_trait]
impl QueryExecutor for MySqlExecutor {
    fn dialect(&self) -> Dialect {
        Dialect::MySql
    }

    async fn fetch(&self, query: &CompiledQuery) -> Result<ResultSet, DbError> {
        let mut q = sqlx::query(&query.sql);
        for value in &query.binds {
            q = match value {
                SqlValue::Int(v) => q.bind(*v),
                SqlValue::Text(v) => q.bind(v.as_str()),
            };
        }
        let rows = q.fetch_all(&self.pool).await.map_err(DbError::from_sqlx)?;

        let columns: Vec<String> = rows
            .first()
            .map(|row| row.columns().iter().map(|c| c.name().to_string()).collect())
            .unwrap_or_default();

        let rows = rows
            .iter()
            .map(decode_row)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(ResultSet::new(columns, rows))
    }

    async fn server_version(&self) -> Result<String, DbError> {
        let row = sqlx::query("SELECT VERSION()")
            .fetch_one(&self.pool)
            .await
            .map_err(DbError::from_sqlx)?;
        row.try_get::<String, _>(0).map_err(DbError::from_sqlx)
    }
}

// ---------------------------------------------------------------------------
// Decoding
// ---------------------------------------------------------------------------

fn decode_row(row: &MySqlRow) -> Result<ResultRow, DbError> {
    (0..row.len())
        .map(|i| decode_cell(row, i))
        .collect::<Result<Vec<_>, _>>()
        .map(ResultRow)
}

/// Convert one column by its declared MySQL type.
///
/// Temporal values become `YYYY-MM-DD HH:MM:SS` text, which is also the
/// format the dialects render for bucket labels.
fn decode_cell(row: &MySqlRow, index: usize) -> Result<Cell, DbError> {
    let raw = row.try_get_raw(index).map_err(DbError::from_sqlx)?;
    if raw.is_null() {
        return Ok(Cell::Null);
    }
    let type_name = raw.type_info().name().to_string();
    let column = || row.columns()[index].name().to_string();
    let decode_err = |e: sqlx::Error| DbError::Decode {
        column: column(),
        message: e.to_string(),
    };

    let cell = match type_name.as_str() {
        "BOOLEAN" | "TINYINT" | "SMALLINT" | "MEDIUMINT" | "INT" | "BIGINT" => {
            Cell::Int(row.try_get::<i64, _>(index).map_err(decode_err)?)
        }
        t if t.ends_with("UNSIGNED") => {
            let v = row.try_get::<u64, _>(index).map_err(decode_err)?;
            match i64::try_from(v) {
                Ok(v) => Cell::Int(v),
                Err(_) => Cell::Float(v as f64),
            }
        }
        "FLOAT" => Cell::Float(f64::from(
            row.try_get::<f32, _>(index).map_err(decode_err)?,
        )),
        "DOUBLE" => Cell::Float(row.try_get::<f64, _>(index).map_err(decode_err)?),
        // DECIMAL travels as text on the wire.
        "DECIMAL" => {
            let text = row
                .try_get_unchecked::<String, _>(index)
                .map_err(decode_err)?;
            decimal_cell(text)
        }
        "DATETIME" | "TIMESTAMP" => {
            timestamp_cell(row.try_get::<NaiveDateTime, _>(index).map_err(decode_err)?)
        }
        "DATE" => {
            let v = row.try_get::<NaiveDate, _>(index).map_err(decode_err)?;
            Cell::Text(v.format("%Y-%m-%d").to_string())
        }
        "TIME" => {
            let v = row.try_get::<NaiveTime, _>(index).map_err(decode_err)?;
            Cell::Text(v.format("%H:%M:%S").to_string())
        }
        "BINARY" | "VARBINARY" | "TINYBLOB" | "BLOB" | "MEDIUMBLOB" | "LONGBLOB" | "BIT" => {
            let bytes = row.try_get::<Vec<u8>, _>(index).map_err(decode_err)?;
            Cell::Text(String::from_utf8_lossy(&bytes).into_owned())
        }
        _ => Cell::Text(
            row.try_get_unchecked::<String, _>(index)
                .map_err(decode_err)?,
        ),
    };
    Ok(cell)
}
