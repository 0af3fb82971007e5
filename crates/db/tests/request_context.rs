//! Registry and request-context behaviour against the in-memory executor.

use std::io::Write;
use std::sync::Arc;

use assert_matches::assert_matches;
use castormon_core::dialect::Dialect;
use castormon_core::error::CoreError;
use castormon_core::row::{Cell, ResultSet};
use castormon_core::sql::CompiledQuery;
use castormon_db::{DbError, InstanceRegistry, MemoryExecutor};

const INSTANCES: &str = r#"{
    "c2public": {
        "type": "mysql",
        "server": "dlfdb.example.org",
        "port": 3306,
        "username": "dlf_reader",
        "password": "secret",
        "database": "dlf",
        "schema": "castormon"
    }
}"#;

fn registry_with(executor: Arc<MemoryExecutor>) -> InstanceRegistry {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(INSTANCES.as_bytes()).unwrap();
    let registry = InstanceRegistry::from_file(file.path()).unwrap();
    registry.insert_executor("c2public", executor);
    registry
}

// ---------------------------------------------------------------------------
// Test: every query is counted and reported in the diagnostics
// ---------------------------------------------------------------------------

#[tokio::test]
async fn context_counts_queries() {
    let executor = Arc::new(MemoryExecutor::with_responses(
        Dialect::MySql,
        [ResultSet::from_rows(&["total"], [[Cell::Int(12)]])],
    ));
    let registry = registry_with(Arc::clone(&executor));

    let mut ctx = registry.context(Some("c2public")).unwrap();
    assert_eq!(ctx.instance(), "c2public");
    assert_eq!(ctx.dialect(), Dialect::MySql);
    assert_eq!(ctx.report_schema().unwrap(), "castormon");

    let rs = ctx.fetch(&CompiledQuery::plain("SELECT COUNT(*) AS total")).await.unwrap();
    assert_eq!(rs.value(0, "total").as_i64(), Some(12));
    ctx.fetch(&CompiledQuery::plain("SELECT 2")).await.unwrap();

    let diagnostics = ctx.diagnostics();
    assert_eq!(diagnostics.queries, 2);
    assert_eq!(diagnostics.connected_to, "dlf_reader@dlfdb.example.org:3306/dlf");
    assert_eq!(executor.executed().len(), 2);
}

// ---------------------------------------------------------------------------
// Test: executor failures surface as DbError and map into CoreError
// ---------------------------------------------------------------------------

#[tokio::test]
async fn failures_propagate_with_their_class() {
    let executor = Arc::new(MemoryExecutor::new(Dialect::MySql));
    executor.push_error(DbError::from_sqlx(sqlx::Error::PoolTimedOut));
    let registry = registry_with(executor);

    let mut ctx = registry.context(None).unwrap();
    let err = ctx.fetch(&CompiledQuery::plain("SELECT 1")).await.unwrap_err();
    assert!(err.is_connection());
    assert_matches!(CoreError::from(err), CoreError::Connection(_));
    assert_eq!(ctx.query_count(), 1);
}

// ---------------------------------------------------------------------------
// Test: unknown instances and unreadable files are configuration errors
// ---------------------------------------------------------------------------

#[tokio::test]
async fn unknown_instance_is_a_configuration_error() {
    let registry = registry_with(Arc::new(MemoryExecutor::new(Dialect::MySql)));
    let err = registry.context(Some("c2cms")).err().unwrap();
    assert_matches!(CoreError::from(err), CoreError::Configuration(msg) if msg.contains("c2cms"));

    assert_matches!(
        InstanceRegistry::from_file(std::path::Path::new("/nonexistent/instances.json")).err(),
        Some(CoreError::Configuration(_))
    );
}
