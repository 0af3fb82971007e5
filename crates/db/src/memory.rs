//! In-memory executor for tests and demos.
//!
//! Answers queries from a queue of canned result sets, in order, and
//! records every query it was asked to run.

use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use castormon_core::dialect::Dialect;
use castormon_core::row::ResultSet;
use castormon_core::sql::CompiledQuery;

use crate::error::DbError;
use crate::executor::QueryExecutor;

pub struct MemoryExecutor {
    dialect: Dialect,
    /// `None` makes the instance unreachable.
    version: Option<String>,
    responses: Mutex<VecDeque<Result<ResultSet, DbError>>>,
    executed: Mutex<Vec<CompiledQuery>>,
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

impl MemoryExecutor {
    pub fn new(dialect: Dialect) -> Self {
        Self {
            dialect,
            version: Some(format!("{dialect} (in-memory)")),
            responses: Mutex::new(VecDeque::new()),
            executed: Mutex::new(Vec::new()),
        }
    }

    /// An instance that refuses every connection.
    pub fn unreachable(dialect: Dialect) -> Self {
        Self {
            version: None,
            ..Self::new(dialect)
        }
    }

    /// Queue result sets answered in order.
    pub fn with_responses(dialect: Dialect, responses: impl IntoIterator<Item = ResultSet>) -> Self {
        let executor = Self::new(dialect);
        for rs in responses {
            executor.push(rs);
        }
        executor
    }

    pub fn push(&self, rs: ResultSet) {
        lock(&self.responses).push_back(Ok(rs));
    }

    /// Queue a failure for the next query.
    pub fn push_error(&self, err: DbError) {
        lock(&self.responses).push_back(Err(err));
    }

    /// Queries run so far, oldest first.
    pub fn executed(&self) -> Vec<CompiledQuery> {
        lock(&self.executed).clone()
    }

    pub fn pending(&self) -> usize {
        lock(&self.responses).len()
    }
}

#[async_trait]
impl QueryExecutor for MemoryExecutor {
    fn dialect(&self) -> Dialect {
        self.dialect
    }

    /// An exhausted queue answers with an empty result set.
    async fn fetch(&self, query: &CompiledQuery) -> Result<ResultSet, DbError> {
        lock(&self.executed).push(query.clone());
        if self.version.is_none() {
            return Err(refused());
        }
        lock(&self.responses)
            .pop_front()
            .unwrap_or_else(|| Ok(ResultSet::default()))
    }

    async fn server_version(&self) -> Result<String, DbError> {
        self.version.clone().ok_or_else(refused)
    }
}

fn refused() -> DbError {
    DbError::Connection("connection refused".into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use castormon_core::row::Cell;

    #[tokio::test]
    async fn answers_in_order_then_empty() {
        let executor = MemoryExecutor::with_responses(
            Dialect::MySql,
            [ResultSet::from_rows(&["total"], [[Cell::Int(4)]])],
        );
        executor.push_error(DbError::Query("table is marked as crashed".into()));

        let first = executor.fetch(&CompiledQuery::plain("SELECT 1")).await.unwrap();
        assert_eq!(first.value(0, "total"), &Cell::Int(4));
        assert_matches!(
            executor.fetch(&CompiledQuery::plain("SELECT 2")).await,
            Err(DbError::Query(_))
        );
        assert!(executor
            .fetch(&CompiledQuery::plain("SELECT 3"))
            .await
            .unwrap()
            .is_empty());

        let sql: Vec<String> = executor.executed().into_iter().map(|q| q.sql).collect();
        assert_eq!(sql, vec!["SELECT 1", "SELECT 2", "SELECT 3"]);
        assert_eq!(executor.pending(), 0);
    }

    #[tokio::test]
    async fn unreachable_instance_refuses_queries() {
        let executor = MemoryExecutor::unreachable(Dialect::Oracle);
        assert_matches!(
            executor.server_version().await,
            Err(e) if e.is_connection()
        );
        assert_matches!(
            executor.fetch(&CompiledQuery::plain("SELECT 1")).await,
            Err(DbError::Connection(_))
        );
        assert_eq!(executor.executed().len(), 1);
    }
}
