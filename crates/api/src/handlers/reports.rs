//! Handlers for the monitoring reports.

use axum::extract::{Path, State};
use axum::response::IntoResponse;
use axum::Json;
use castormon_core::outcome::Outcome;
use castormon_core::report::{self, ReportData, ReportRequest, ReportSummary, REPORTS};
use serde::Serialize;

use crate::cache::ReportCacheKey;
use crate::error::{AppError, AppResult};
use crate::handlers::local_now;
use crate::query::Params;
use crate::response::{DataResponse, DiagnosedResponse};
use crate::state::AppState;

/// One report's chart data.
#[derive(Debug, Serialize)]
pub struct ReportResponse {
    pub report: ReportSummary,
    /// Human-readable window, e.g. "between 01/03/2024 10:00 and ...".
    pub window: String,
    pub result: Outcome<ReportData>,
    /// Whether the result came from the report cache.
    pub cached: bool,
}

/// GET /api/v1/reports
pub async fn list_reports() -> AppResult<impl IntoResponse> {
    let reports: Vec<ReportSummary> = REPORTS.iter().map(ReportSummary::from).collect();
    Ok(Json(DataResponse { data: reports }))
}

/// GET /api/v1/reports/{key}?service=...
///
/// Compiles the report against the instance's monitoring schema, runs it
/// unless a fresh cached result exists, and shapes the rows.
pub async fn get_report(
    State(state): State<AppState>,
    Path(key): Path<String>,
    params: Params,
) -> AppResult<impl IntoResponse> {
    let descriptor =
        report::find(&key).ok_or_else(|| AppError::NotFound(format!("unknown report '{key}'")))?;
    let request = ReportRequest::from_params(descriptor, &params.0, state.config.drilldown_hours)?;

    let mut ctx = state.registry.context(params.instance())?;
    let schema = ctx.report_schema()?.to_string();
    let now = local_now();
    let query = request.compile(ctx.dialect(), &schema, now)?;

    let cache_key = ReportCacheKey {
        instance: ctx.instance().to_string(),
        report: descriptor.key,
        query,
        fill: request.fill,
    };

    let (result, cached) = match state.report_cache.get(&cache_key) {
        Some(hit) => {
            tracing::debug!(report = descriptor.key, instance = %ctx.instance(), "Report cache hit");
            (hit, true)
        }
        None => {
            let rs = ctx.fetch(&cache_key.query).await?;
            let outcome = request.shape(&rs, now);
            state.report_cache.insert(cache_key, outcome.clone());
            (outcome, false)
        }
    };

    Ok(Json(DiagnosedResponse {
        data: ReportResponse {
            report: ReportSummary::from(descriptor),
            window: request.window.describe(now),
            result,
            cached,
        },
        meta: ctx.diagnostics(),
    }))
}
