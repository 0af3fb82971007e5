use std::path::PathBuf;

use castormon_core::pagination::{clamp_limit, DEFAULT_PAGE_SIZE};

/// Server configuration loaded from environment variables.
///
/// All fields have defaults suitable for local development.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `3000`).
    pub port: u16,
    /// Allowed CORS origins, parsed from comma-separated `CORS_ORIGINS` env var.
    pub cors_origins: Vec<String>,
    /// HTTP request timeout in seconds (default: `30`). Bounds slow queries.
    pub request_timeout_secs: u64,
    /// Half-width of a drill-down window in hours (default: `1`).
    pub drilldown_hours: i64,
    /// Log viewer page size when `limit` is absent (default: `500`).
    pub default_page_size: u32,
    /// Report cache lifetime in seconds; `0` disables it (default: `60`).
    pub report_cache_ttl_secs: u64,
    /// JSON document describing the database instances.
    pub instances_file: PathBuf,
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                 | Default                 |
    /// |-------------------------|-------------------------|
    /// | `HOST`                  | `0.0.0.0`               |
    /// | `PORT`                  | `3000`                  |
    /// | `CORS_ORIGINS`          | `http://localhost:5173` |
    /// | `REQUEST_TIMEOUT_SECS`  | `30`                    |
    /// | `DRILLDOWN_HOURS`       | `1`                     |
    /// | `DEFAULT_PAGE_SIZE`     | `500`                   |
    /// | `REPORT_CACHE_TTL_SECS` | `60`                    |
    /// | `INSTANCES_FILE`        | `instances.json`        |
    pub fn from_env() -> Self {
        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into());

        let port: u16 = std::env::var("PORT")
            .unwrap_or_else(|_| "3000".into())
            .parse()
            .expect("PORT must be a valid u16");

        let cors_origins: Vec<String> = std::env::var("CORS_ORIGINS")
            .unwrap_or_else(|_| "http://localhost:5173".into())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let request_timeout_secs: u64 = std::env::var("REQUEST_TIMEOUT_SECS")
            .unwrap_or_else(|_| "30".into())
            .parse()
            .expect("REQUEST_TIMEOUT_SECS must be a valid u64");

        let drilldown_hours: i64 = std::env::var("DRILLDOWN_HOURS")
            .unwrap_or_else(|_| "1".into())
            .parse()
            .expect("DRILLDOWN_HOURS must be a valid i64");
        assert!(drilldown_hours > 0, "DRILLDOWN_HOURS must be positive");

        let default_page_size: i64 = std::env::var("DEFAULT_PAGE_SIZE")
            .unwrap_or_else(|_| DEFAULT_PAGE_SIZE.to_string())
            .parse()
            .expect("DEFAULT_PAGE_SIZE must be a valid integer");
        let default_page_size = clamp_limit(Some(default_page_size), DEFAULT_PAGE_SIZE);

        let report_cache_ttl_secs: u64 = std::env::var("REPORT_CACHE_TTL_SECS")
            .unwrap_or_else(|_| "60".into())
            .parse()
            .expect("REPORT_CACHE_TTL_SECS must be a valid u64");

        let instances_file = std::env::var("INSTANCES_FILE")
            .unwrap_or_else(|_| "instances.json".into())
            .into();

        Self {
            host,
            port,
            cors_origins,
            request_timeout_secs,
            drilldown_hours,
            default_page_size,
            report_cache_ttl_secs,
            instances_file,
        }
    }
}
