//! Domain logic for the CASTOR DLF log viewer and monitoring reports.
//!
//! Everything here is pure: request parameters go in, compiled SQL comes
//! out, and result rows are reshaped into chart-ready structures. Database
//! access lives in `castormon-db`, HTTP in `castormon-api`.

pub mod crosstab;
pub mod dialect;
pub mod dlf;
pub mod error;
pub mod filter;
pub mod histogram;
pub mod instance;
pub mod outcome;
pub mod pagination;
pub mod params;
pub mod ranking;
pub mod report;
pub mod row;
pub mod series;
pub mod sql;
pub mod table;
pub mod types;
pub mod window;
