//! Oracle executor backed by an ODPI-C session pool.
//!
//! The driver is blocking, so every call runs on tokio's blocking pool.
//! The session pool is built on first use; a failed build is retried by
//! the next request.

use std::sync::{Arc, Mutex, PoisonError};

use ::oracle::pool::{Pool, PoolBuilder};
use ::oracle::sql_type::{OracleType, ToSql};
use ::oracle::Row;
use async_trait::async_trait;
use castormon_core::dialect::Dialect;
use castormon_core::instance::InstanceConfig;
use castormon_core::row::{Cell, ResultRow, ResultSet};
use castormon_core::sql::{CompiledQuery, SqlValue};
use chrono::NaiveDateTime;

use crate::decode::{decimal_cell, timestamp_cell};
use crate::error::DbError;
use crate::executor::QueryExecutor;

/// Error prefixes that mean the instance could not be reached or refused
/// the session, rather than that a statement failed.
const CONNECTION_ERRORS: &[&str] = &[
    "DPI-",      // client library missing, session dropped
    "ORA-12",    // TNS and listener failures
    "ORA-01017", // invalid username/password
    "ORA-01033", // initialization or shutdown in progress
    "ORA-01034", // ORACLE not available
    "ORA-03113", // end-of-file on communication channel
    "ORA-03114", // not connected
    "ORA-03135", // connection lost contact
];

struct PoolSettings {
    username: String,
    password: String,
    connect_string: String,
    max_connections: u32,
}

pub struct OracleExecutor {
    settings: Arc<PoolSettings>,
    pool: Arc<Mutex<Option<Arc<Pool>>>>,
}

impl OracleExecutor {
    /// Record the settings without contacting the server.
    pub fn connect_lazy(config: &InstanceConfig) -> Self {
        Self {
            settings: Arc::new(PoolSettings {
                username: config.username.clone(),
                password: config.password.clone(),
                connect_string: connect_string(config),
                max_connections: config.max_connections(),
            }),
            pool: Arc::new(Mutex::new(None)),
        }
    }

    /// Run `f` with a pooled session on the blocking thread pool.
    async fn with_connection<T, F>(&self, f: F) -> Result<T, DbError>
    where
        T: Send + 'static,
        F: FnOnce(&::oracle::Connection) -> Result<T, DbError> + Send + 'static,
    {
        let settings = Arc::clone(&self.settings);
        let pool = Arc::clone(&self.pool);

        tokio::task::spawn_blocking(move || {
            let conn = session(&settings, &pool)?;
            f(&conn)
        })
        .await
        .map_err(|e| DbError::Query(Box::new(e)))?
    }
}

/// Easy Connect string: `//server[:port]/service`.
fn connect_string(config: &InstanceConfig) -> String {
    match config.port {
        Some(port) => format!("//{}:{}/{}", config.server, port, config.database),
        None => format!("//{}/{}", config.server, config.database),
    }
}

/// A session from the pool, building the pool first if needed.
fn session(
    settings: &PoolSettings,
    slot: &Mutex<Option<Arc<Pool>>>,
) -> Result<::oracle::Connection, DbError> {
    let pool = {
        let mut slot = slot.lock().unwrap_or_else(PoisonError::into_inner);
        match slot.as_ref() {
            Some(pool) => Arc::clone(pool),
            None => {
                let pool = Arc::new(
                    PoolBuilder::new(
                        settings.username.as_str(),
                        settings.password.as_str(),
                        settings.connect_string.as_str(),
                    )
                    .max_connections(settings.max_connections)
                    .build()
                    .map_err(from_oracle)?,
                );
                tracing::debug!(connect_string = %settings.connect_string, "Built Oracle session pool");
                *slot = Some(Arc::clone(&pool));
                pool
            }
        }
    };
    pool.get().map_err(from_oracle)
}

/// Classify a driver error by its ORA/DPI code.
fn from_oracle(err: ::oracle::Error) -> DbError {
    if is_connection_failure(&err.to_string()) {
        DbError::Connection(Box::new(err))
    } else {
        DbError::Query(Box::new(err))
    }
}

fn is_connection_failure(message: &str) -> bool {
    CONNECTION_ERRORS.iter().any(|code| message.contains(code))
}

#[async_trait]
impl QueryExecutor for OracleExecutor {
    fn dialect(&self) -> Dialect {
        Dialect::Oracle
    }

    async fn fetch(&self, query: &CompiledQuery) -> Result<ResultSet, DbError> {
        let query = query.clone();
        self.with_connection(move |conn| {
            let binds: Vec<&dyn ToSql> = query
                .binds
                .iter()
                .map(|value| match value {
                    SqlValue::Int(v) => v as &dyn ToSql,
                    SqlValue::Text(v) => v as &dyn ToSql,
                })
                .collect();
            let rows = conn.query(&query.sql, &binds).map_err(from_oracle)?;

            // Unquoted aliases come back upper-cased.
            let columns: Vec<(String, OracleType)> = rows
                .column_info()
                .iter()
                .map(|c| (c.name().to_lowercase(), c.oracle_type().clone()))
                .collect();

            let mut decoded = Vec::new();
            for row in rows {
                let row = row.map_err(from_oracle)?;
                decoded.push(decode_row(&row, &columns)?);
            }
            let names = columns.into_iter().map(|(name, _)| name).collect();
            Ok(ResultSet::new(names, decoded))
        })
        .await
    }

    async fn server_version(&self) -> Result<String, DbError> {
        self.with_connection(|conn| {
            let (version, banner) = conn.server_version().map_err(from_oracle)?;
            Ok(if banner.is_empty() {
                version.to_string()
            } else {
                banner
            })
        })
        .await
    }
}

// ---------------------------------------------------------------------------
// Decoding
// ---------------------------------------------------------------------------

fn decode_row(row: &Row, columns: &[(String, OracleType)]) -> Result<ResultRow, DbError> {
    columns
        .iter()
        .enumerate()
        .map(|(index, (name, oracle_type))| decode_cell(row, index, name, oracle_type))
        .collect::<Result<Vec<_>, _>>()
        .map(ResultRow)
}

/// Convert one column by its declared Oracle type.
///
/// `NUMBER` is read as text so integer counts stay exact whatever the
/// declared precision.
fn decode_cell(
    row: &Row,
    index: usize,
    column: &str,
    oracle_type: &OracleType,
) -> Result<Cell, DbError> {
    let decode_err = |e: ::oracle::Error| DbError::Decode {
        column: column.to_string(),
        message: e.to_string(),
    };

    let cell = match oracle_type {
        OracleType::Number(..)
        | OracleType::Float(_)
        | OracleType::BinaryFloat
        | OracleType::BinaryDouble
        | OracleType::Int64
        | OracleType::UInt64 => row
            .get::<usize, Option<String>>(index)
            .map_err(decode_err)?
            .map(decimal_cell),
        OracleType::Date
        | OracleType::Timestamp(_)
        | OracleType::TimestampTZ(_)
        | OracleType::TimestampLTZ(_) => row
            .get::<usize, Option<NaiveDateTime>>(index)
            .map_err(decode_err)?
            .map(timestamp_cell),
        OracleType::Raw(_) | OracleType::LongRaw | OracleType::BLOB => row
            .get::<usize, Option<Vec<u8>>>(index)
            .map_err(decode_err)?
            .map(|bytes| Cell::Text(String::from_utf8_lossy(&bytes).into_owned())),
        _ => row
            .get::<usize, Option<String>>(index)
            .map_err(decode_err)?
            .map(Cell::Text),
    };
    Ok(cell.unwrap_or(Cell::Null))
}

#[cfg(test)]
mod tests {
    use super::*;
    use castormon_core::instance::parse_instances;

    fn config(json: &str) -> InstanceConfig {
        parse_instances(json)
            .unwrap()
            .swap_remove("c2atlas")
            .unwrap()
    }

    #[test]
    fn easy_connect_string_with_and_without_port() {
        let with_port = config(
            r#"{"c2atlas": {"type": "oracle", "server": "atlasdb", "port": 10121,
                "username": "u", "password": "p", "database": "DLF_ATLAS"}}"#,
        );
        assert_eq!(connect_string(&with_port), "//atlasdb:10121/DLF_ATLAS");

        let default_port = config(
            r#"{"c2atlas": {"type": "oracle", "server": "atlasdb",
                "username": "u", "password": "p", "database": "DLF_ATLAS"}}"#,
        );
        assert_eq!(connect_string(&default_port), "//atlasdb/DLF_ATLAS");
    }

    #[test]
    fn listener_and_login_failures_are_connection_errors() {
        assert!(is_connection_failure("ORA-12541: TNS:no listener"));
        assert!(is_connection_failure("ORA-01017: invalid username/password; logon denied"));
        assert!(is_connection_failure(
            "DPI-1047: Cannot locate a 64-bit Oracle Client library"
        ));
        assert!(!is_connection_failure("ORA-00942: table or view does not exist"));
        assert!(!is_connection_failure("ORA-01722: invalid number"));
    }

    #[tokio::test]
    async fn executor_is_created_without_contacting_the_server() {
        let executor = OracleExecutor::connect_lazy(&config(
            r#"{"c2atlas": {"type": "oracle", "server": "atlasdb",
                "username": "u", "password": "p", "database": "DLF_ATLAS"}}"#,
        ));
        assert_eq!(executor.dialect(), Dialect::Oracle);
        assert!(executor
            .pool
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_none());
    }
}
