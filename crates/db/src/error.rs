use castormon_core::error::CoreError;

/// Driver error behind a connection or query failure.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Failures of the database layer.
///
/// Converted into [`CoreError`] at the crate boundary so the API maps
/// every failure through one taxonomy.
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    #[error("unknown instance '{0}'")]
    UnknownInstance(String),

    #[error("no database instances are configured")]
    NoInstances,

    #[error("connection failed: {0}")]
    Connection(#[source] BoxError),

    #[error("query failed: {0}")]
    Query(#[source] BoxError),

    /// A column value the executor cannot represent.
    #[error("cannot decode column '{column}': {message}")]
    Decode { column: String, message: String },
}

impl DbError {
    /// Classify a driver error as a connection or a query failure.
    ///
    /// SQLSTATE class `08` (connection exception) and `28000` (access
    /// denied) are reported as connection failures like I/O and pool errors.
    pub fn from_sqlx(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::Io(_)
            | sqlx::Error::Tls(_)
            | sqlx::Error::PoolTimedOut
            | sqlx::Error::PoolClosed
            | sqlx::Error::Configuration(_)
            | sqlx::Error::Protocol(_) => DbError::Connection(Box::new(err)),
            sqlx::Error::Database(db_err) => {
                let code = db_err.code();
                match code.as_deref() {
                    Some(c) if c.starts_with("08") || c == "28000" => {
                        DbError::Connection(Box::new(err))
                    }
                    _ => DbError::Query(Box::new(err)),
                }
            }
            _ => DbError::Query(Box::new(err)),
        }
    }

    pub fn is_connection(&self) -> bool {
        matches!(self, DbError::Connection(_))
    }
}

impl From<DbError> for CoreError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::UnknownInstance(name) => {
                CoreError::Configuration(format!("unknown instance '{name}'"))
            }
            e @ DbError::NoInstances => CoreError::Configuration(e.to_string()),
            DbError::Connection(e) => CoreError::Connection(e.to_string()),
            DbError::Query(e) => CoreError::Query(e.to_string()),
            e @ DbError::Decode { .. } => CoreError::Query(e.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn pool_failures_are_connection_errors() {
        assert_matches!(
            DbError::from_sqlx(sqlx::Error::PoolTimedOut),
            DbError::Connection(_)
        );
        assert_matches!(
            DbError::from_sqlx(sqlx::Error::RowNotFound),
            DbError::Query(_)
        );
    }

    #[test]
    fn converts_into_core_taxonomy() {
        assert_matches!(
            CoreError::from(DbError::UnknownInstance("c2x".into())),
            CoreError::Configuration(msg) if msg.contains("c2x")
        );
        assert_matches!(
            CoreError::from(DbError::Connection("ORA-12541: TNS:no listener".into())),
            CoreError::Connection(msg) if msg == "ORA-12541: TNS:no listener"
        );
        assert_matches!(
            CoreError::from(DbError::Decode {
                column: "value".into(),
                message: "BLOB".into()
            }),
            CoreError::Query(_)
        );
    }
}
