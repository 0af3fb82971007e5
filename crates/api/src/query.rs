//! Request parameter extraction shared by the query endpoints.
//!
//! The log viewer and report pages take a free-form, partly repeated
//! parameter set (`severity[]=2&severity[]=3`), so handlers receive the raw
//! pairs as [`RequestParams`] instead of a typed struct. The pairs come from
//! the query string and, for a POST, from a form-encoded body.

use axum::extract::{FromRequest, FromRequestParts, Form, Query, Request};
use axum::http::Method;
use castormon_core::params::RequestParams;

use crate::error::AppError;

/// Parameter names that select the database instance, in priority order.
pub const INSTANCE_PARAMS: [&str; 2] = ["instance", "service"];

/// All parameters of a request. Body values override query-string ones.
#[derive(Debug, Clone)]
pub struct Params(pub RequestParams);

impl Params {
    /// The requested instance, if any.
    pub fn instance(&self) -> Option<&str> {
        self.0.first_of(&INSTANCE_PARAMS).map(|(_, name)| name)
    }
}

impl<S> FromRequest<S> for Params
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let (mut parts, body) = req.into_parts();
        let Query(mut pairs) =
            Query::<Vec<(String, String)>>::from_request_parts(&mut parts, state)
                .await
                .map_err(|e| AppError::BadRequest(e.body_text()))?;

        if parts.method == Method::POST {
            let req = Request::from_parts(parts, body);
            let Form(form) = Form::<Vec<(String, String)>>::from_request(req, state)
                .await
                .map_err(|e| AppError::BadRequest(e.body_text()))?;
            pairs.extend(form);
        }
        Ok(Params(RequestParams::from_pairs(pairs)))
    }
}
