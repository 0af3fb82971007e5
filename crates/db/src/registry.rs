//! Configured instances and their lazily created executors.

use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, PoisonError, RwLock};

use castormon_core::dialect::Dialect;
use castormon_core::error::CoreError;
use castormon_core::instance::{parse_instances, InstanceConfig, InstanceSummary};
use indexmap::IndexMap;

use crate::context::RequestContext;
use crate::error::DbError;
use crate::executor::QueryExecutor;
use crate::mysql::MySqlExecutor;
use crate::oracle::OracleExecutor;

/// The instance registry is the only state shared between requests.
///
/// Executors are created on first use and kept for the life of the
/// process. Their pools are lazy, so a registry can list an instance that
/// is currently unreachable.
pub struct InstanceRegistry {
    configs: IndexMap<String, Arc<InstanceConfig>>,
    executors: RwLock<HashMap<String, Arc<dyn QueryExecutor>>>,
}

impl InstanceRegistry {
    pub fn new(configs: IndexMap<String, InstanceConfig>) -> Self {
        Self {
            configs: configs
                .into_iter()
                .map(|(name, config)| (name, Arc::new(config)))
                .collect(),
            executors: RwLock::new(HashMap::new()),
        }
    }

    /// Load and validate an instances file.
    pub fn from_file(path: &Path) -> Result<Self, CoreError> {
        let json = std::fs::read_to_string(path).map_err(|e| {
            CoreError::Configuration(format!("cannot read {}: {e}", path.display()))
        })?;
        Ok(Self::new(parse_instances(&json)?))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.configs.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.configs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.configs.is_empty()
    }

    pub fn summaries(&self) -> Vec<InstanceSummary> {
        self.configs
            .iter()
            .map(|(name, config)| InstanceSummary::new(name, config))
            .collect()
    }

    /// The named instance, or the first configured one when no name is given.
    pub fn resolve(&self, name: Option<&str>) -> Result<(&str, &Arc<InstanceConfig>), DbError> {
        match name {
            Some(name) => self
                .configs
                .get_key_value(name)
                .map(|(k, v)| (k.as_str(), v))
                .ok_or_else(|| DbError::UnknownInstance(name.to_string())),
            None => self
                .configs
                .first()
                .map(|(k, v)| (k.as_str(), v))
                .ok_or(DbError::NoInstances),
        }
    }

    /// Install an executor for an instance, replacing any existing one.
    pub fn insert_executor(&self, name: &str, executor: Arc<dyn QueryExecutor>) {
        self.executors
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(name.to_string(), executor);
    }

    pub fn executor(&self, name: &str) -> Result<Arc<dyn QueryExecutor>, DbError> {
        let (name, config) = self.resolve(Some(name))?;

        if let Some(executor) = self
            .executors
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
        {
            return Ok(Arc::clone(executor));
        }

        let created: Arc<dyn QueryExecutor> = match config.dialect {
            Dialect::MySql => Arc::new(MySqlExecutor::connect_lazy(config)),
            Dialect::Oracle => Arc::new(OracleExecutor::connect_lazy(config)),
        };
        tracing::info!(
            instance = %name,
            connected_to = %config.connected_to(),
            "Created connection pool"
        );

        let mut executors = self.executors.write().unwrap_or_else(PoisonError::into_inner);
        let executor = executors
            .entry(name.to_string())
            .or_insert(created);
        Ok(Arc::clone(executor))
    }

    /// Open a request context on an instance (see [`InstanceRegistry::resolve`]).
    pub fn context(&self, name: Option<&str>) -> Result<RequestContext, DbError> {
        let (name, config) = self.resolve(name)?;
        let executor = self.executor(name)?;
        Ok(RequestContext::new(name, Arc::clone(config), executor))
    }
}
