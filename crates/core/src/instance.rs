//! Database instance configuration.
//!
//! Instances are described in a JSON document mapping an instance name to
//! its connection settings. Passwords are read but never serialized back
//! out nor printed by `Debug`.

use std::fmt;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::dialect::Dialect;
use crate::error::CoreError;
use crate::report::validate_schema;

/// Pool size when an instance does not set one.
pub const DEFAULT_MAX_CONNECTIONS: u32 = 5;

#[derive(Clone, Deserialize)]
pub struct InstanceConfig {
    #[serde(rename = "type")]
    pub dialect: Dialect,
    pub server: String,
    #[serde(default)]
    pub port: Option<u16>,
    pub username: String,
    #[serde(default)]
    pub password: String,
    pub database: String,
    /// Monitoring schema qualifying report tables.
    #[serde(default)]
    pub schema: Option<String>,
    #[serde(default)]
    pub max_connections: Option<u32>,
}

impl fmt::Debug for InstanceConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InstanceConfig")
            .field("dialect", &self.dialect)
            .field("server", &self.server)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("database", &self.database)
            .field("schema", &self.schema)
            .field("max_connections", &self.max_connections)
            .finish()
    }
}

impl InstanceConfig {
    /// `user@server[:port]/database`, for diagnostics.
    pub fn connected_to(&self) -> String {
        match self.port {
            Some(port) => format!(
                "{}@{}:{}/{}",
                self.username, self.server, port, self.database
            ),
            None => format!("{}@{}/{}", self.username, self.server, self.database),
        }
    }

    pub fn max_connections(&self) -> u32 {
        self.max_connections.unwrap_or(DEFAULT_MAX_CONNECTIONS).max(1)
    }

    /// The monitoring schema, required by report queries.
    pub fn report_schema(&self, name: &str) -> Result<&str, CoreError> {
        self.schema.as_deref().ok_or_else(|| {
            CoreError::Configuration(format!("instance '{name}' has no monitoring schema"))
        })
    }

    fn validate(&self, name: &str) -> Result<(), CoreError> {
        if self.server.trim().is_empty() {
            return Err(CoreError::Configuration(format!(
                "instance '{name}' has an empty server"
            )));
        }
        if self.database.trim().is_empty() {
            return Err(CoreError::Configuration(format!(
                "instance '{name}' has an empty database"
            )));
        }
        if let Some(schema) = &self.schema {
            validate_schema(schema)?;
        }
        Ok(())
    }
}

/// Parse and validate an instances document.
pub fn parse_instances(json: &str) -> Result<IndexMap<String, InstanceConfig>, CoreError> {
    let instances: IndexMap<String, InstanceConfig> = serde_json::from_str(json)
        .map_err(|e| CoreError::Configuration(format!("invalid instances file: {e}")))?;
    for (name, config) in &instances {
        if name.trim().is_empty() {
            return Err(CoreError::Configuration("instance names must not be empty".into()));
        }
        config.validate(name)?;
    }
    Ok(instances)
}

/// What the API reveals about an instance.
#[derive(Debug, Clone, Serialize)]
pub struct InstanceSummary {
    pub name: String,
    #[serde(rename = "type")]
    pub dialect: Dialect,
    pub server: String,
    pub username: String,
    pub database: String,
    pub schema: Option<String>,
}

impl InstanceSummary {
    pub fn new(name: &str, config: &InstanceConfig) -> Self {
        Self {
            name: name.to_string(),
            dialect: config.dialect,
            server: config.server.clone(),
            username: config.username.clone(),
            database: config.database.clone(),
            schema: config.schema.clone(),
        }
    }
}
