//! Request handlers.
//!
//! Each submodule provides the async handler functions for one area of the
//! API. Handlers resolve the instance, run compiled queries through a
//! [`castormon_db::RequestContext`] and map errors via
//! [`crate::error::AppError`].

pub mod dlf;
pub mod instances;
pub mod reports;

use castormon_core::types::Timestamp;

/// Wall-clock time used to label windows and lay out time series.
///
/// SQL windows are evaluated against the database clock; this only
/// describes them.
pub(crate) fn local_now() -> Timestamp {
    chrono::Local::now().naive_local()
}
