use std::sync::Arc;

use castormon_db::InstanceRegistry;

use crate::cache::ReportCache;
use crate::config::ServerConfig;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// Cheaply cloneable; everything is behind `Arc`.
#[derive(Clone)]
pub struct AppState {
    /// Configured instances and their connection pools.
    pub registry: Arc<InstanceRegistry>,
    /// Server configuration.
    pub config: Arc<ServerConfig>,
    /// Shaped report results, keyed by instance and compiled query.
    pub report_cache: Arc<ReportCache>,
}

impl AppState {
    pub fn new(registry: InstanceRegistry, config: ServerConfig) -> Self {
        let ttl = std::time::Duration::from_secs(config.report_cache_ttl_secs);
        Self {
            registry: Arc::new(registry),
            config: Arc::new(config),
            report_cache: Arc::new(ReportCache::new(ttl)),
        }
    }
}
