#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    /// Unknown or unusable instance configuration.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Backend unreachable or credentials rejected.
    #[error("Connection error: {0}")]
    Connection(String),

    /// Required filter or time fields missing or unparsable.
    #[error("Invalid query parameters: {0}")]
    InvalidInput(String),

    /// SQL execution failure.
    #[error("Query error: {0}")]
    Query(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl CoreError {
    pub fn invalid(msg: impl Into<String>) -> Self {
        CoreError::InvalidInput(msg.into())
    }
}
