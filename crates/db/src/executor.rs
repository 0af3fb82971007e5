use async_trait::async_trait;
use castormon_core::dialect::Dialect;
use castormon_core::row::ResultSet;
use castormon_core::sql::CompiledQuery;

use crate::error::DbError;

/// Runs compiled queries against one database instance.
///
/// Implementations bind [`CompiledQuery::binds`] in order and return every
/// row in driver-neutral form. Rows are read to completion before
/// returning, so a caller never holds a cursor across awaits.
#[async_trait]
pub trait QueryExecutor: Send + Sync {
    /// The SQL variant the instance speaks.
    fn dialect(&self) -> Dialect;

    async fn fetch(&self, query: &CompiledQuery) -> Result<ResultSet, DbError>;

    /// Version string reported by the server.
    async fn server_version(&self) -> Result<String, DbError>;
}
