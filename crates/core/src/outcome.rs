//! Query outcomes that are not errors.

use serde::Serialize;

/// A successful query either produced data or matched nothing. An empty
/// result is reported as `{"status":"no_data"}`, never as an error.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Outcome<T> {
    #[serde(rename = "ok")]
    Data(T),
    NoData,
}

impl<T> Outcome<T> {
    pub fn is_no_data(&self) -> bool {
        matches!(self, Outcome::NoData)
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Outcome<U> {
        match self {
            Outcome::Data(v) => Outcome::Data(f(v)),
            Outcome::NoData => Outcome::NoData,
        }
    }
}
