//! Query execution against the configured DLF and monitoring instances.
//!
//! Each instance gets one lazily created connection pool behind the
//! [`QueryExecutor`] trait: sqlx for MySQL, an ODPI-C session pool for
//! Oracle. Handlers never touch a pool directly: they open a
//! [`RequestContext`] for the requested instance and run compiled queries
//! through it, one at a time.

pub mod context;
mod decode;
pub mod error;
pub mod executor;
pub mod memory;
pub mod mysql;
pub mod oracle;
pub mod registry;

pub use context::{Diagnostics, RequestContext};
pub use error::DbError;
pub use executor::QueryExecutor;
pub use memory::MemoryExecutor;
pub use registry::InstanceRegistry;
