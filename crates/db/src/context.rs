//! Request-scoped database access.

use std::sync::Arc;
use std::time::Instant;

use castormon_core::dialect::Dialect;
use castormon_core::error::CoreError;
use castormon_core::instance::InstanceConfig;
use castormon_core::row::ResultSet;
use castormon_core::sql::CompiledQuery;
use serde::Serialize;

use crate::error::DbError;
use crate::executor::QueryExecutor;

/// Per-request diagnostics returned alongside the data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostics {
    pub queries: u32,
    pub elapsed_ms: u64,
    pub connected_to: String,
}

/// Everything one request needs to talk to its instance.
///
/// Queries go through [`RequestContext::fetch`], which takes `&mut self`:
/// a request has at most one query in flight.
pub struct RequestContext {
    instance: String,
    config: Arc<InstanceConfig>,
    executor: Arc<dyn QueryExecutor>,
    queries: u32,
    started: Instant,
}

impl RequestContext {
    pub fn new(instance: &str, config: Arc<InstanceConfig>, executor: Arc<dyn QueryExecutor>) -> Self {
        Self {
            instance: instance.to_string(),
            config,
            executor,
            queries: 0,
            started: Instant::now(),
        }
    }

    pub fn instance(&self) -> &str {
        &self.instance
    }

    pub fn dialect(&self) -> Dialect {
        self.executor.dialect()
    }

    /// Monitoring schema for report queries.
    pub fn report_schema(&self) -> Result<&str, CoreError> {
        self.config.report_schema(&self.instance)
    }

    pub async fn fetch(&mut self, query: &CompiledQuery) -> Result<ResultSet, DbError> {
        self.queries += 1;
        tracing::debug!(
            instance = %self.instance,
            query_no = self.queries,
            sql = %query.sql,
            binds = ?query.binds,
            "Executing query"
        );

        match self.executor.fetch(query).await {
            Ok(rs) => {
                tracing::debug!(
                    instance = %self.instance,
                    query_no = self.queries,
                    rows = rs.len(),
                    "Query complete"
                );
                Ok(rs)
            }
            Err(err) => {
                tracing::error!(
                    instance = %self.instance,
                    query_no = self.queries,
                    sql = %query.sql,
                    error = %err,
                    "Query failed"
                );
                Err(err)
            }
        }
    }

    pub async fn server_version(&mut self) -> Result<String, DbError> {
        self.queries += 1;
        self.executor.server_version().await
    }

    pub fn query_count(&self) -> u32 {
        self.queries
    }

    pub fn diagnostics(&self) -> Diagnostics {
        Diagnostics {
            queries: self.queries,
            elapsed_ms: u64::try_from(self.started.elapsed().as_millis()).unwrap_or(u64::MAX),
            connected_to: self.config.connected_to(),
        }
    }
}
